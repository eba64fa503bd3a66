//! Highlight projection.
//!
//! Maps a search result set onto the renderer's per-object highlight index buffer.
//! The projection is inverted on purpose: a non-empty selection paints the
//! *complement* of the selected ids with the override style and leaves the selected
//! ids neutral. That is the observable contract with the renderer and is preserved
//! exactly; only the two style registrations are configurable.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::engine::{HighlightIndex, HighlightStyle, ObjectHighlighter, ObjectId, View};

/// Style index written for objects that keep their default appearance.
pub const NEUTRAL: HighlightIndex = HighlightIndex(0);
/// Style index written for objects painted with the override style.
pub const OVERRIDE: HighlightIndex = HighlightIndex(1);

/// The two styles registered with the renderer at indices 0 and 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightConfig {
	pub neutral: HighlightStyle,
	pub selected: HighlightStyle,
}

impl Default for HighlightConfig {
	fn default() -> Self {
		Self {
			neutral: HighlightStyle::Neutral,
			// Fully transparent override: non-selected objects are visually
			// suppressed so an overlay or outline technique can be layered on top.
			selected: HighlightStyle::Color([0.0, 0.0, 0.0, 0.0]),
		}
	}
}

#[derive(Debug)]
pub struct HighlightProjector {
	object_count: u32,
}

impl HighlightProjector {
	/// Register the style pair with the view. Call once the scene is available.
	pub fn initialize<V: View>(view: &V, config: &HighlightConfig, object_count: u32) -> Self {
		view.set_highlight_styles(&[config.neutral.clone(), config.selected.clone()]);
		debug!(object_count, "highlight projector initialized");

		Self { object_count }
	}

	/// Project `ids` onto the highlight buffer and commit it.
	///
	/// An empty selection neutralizes every object. Ids outside the scene's object
	/// range are skipped; one bad id from an external search result must never abort
	/// a whole highlight pass.
	pub fn apply<H: ObjectHighlighter>(&self, highlighter: &H, ids: &[ObjectId]) {
		if ids.is_empty() {
			highlighter.fill(NEUTRAL);
			highlighter.commit();
			trace!("selection cleared");
			return;
		}

		highlighter.fill(OVERRIDE);
		for &id in ids {
			if !highlighter.set(id, NEUTRAL) {
				trace!(
					id,
					object_count = self.object_count,
					"highlight id out of range, skipped"
				);
			}
		}
		highlighter.commit();
		trace!(selected = ids.len(), "selection projected");
	}
}
