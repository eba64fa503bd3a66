//! Camera bookmark storage.
//!
//! A small fixed table mapping a bookmark slot (one per UI button) to a saved camera
//! pose. Slots are created empty, overwritten on save and never deleted.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// An immutable camera pose, captured by value at save time so later camera movement
/// cannot mutate a stored bookmark.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
	pub position: Vec3,
	/// Unit quaternion.
	pub rotation: Quat,
}

impl CameraPose {
	pub const fn new(position: Vec3, rotation: Quat) -> Self {
		Self { position, rotation }
	}
}

impl Default for CameraPose {
	fn default() -> Self {
		Self {
			position: Vec3::ZERO,
			rotation: Quat::IDENTITY,
		}
	}
}

/// Fixed-size table of camera bookmarks.
#[derive(Debug)]
pub struct BookmarkStore {
	slots: Vec<Option<CameraPose>>,
}

impl BookmarkStore {
	pub fn new(slot_count: usize) -> Self {
		Self {
			slots: vec![None; slot_count],
		}
	}

	pub fn slot_count(&self) -> usize {
		self.slots.len()
	}

	/// Store `pose` into `slot`, overwriting any prior value.
	///
	/// Slot indices are pre-validated by the session against the fixed button set;
	/// an out-of-range slot is logged and ignored.
	pub fn save(&mut self, slot: usize, pose: CameraPose) {
		match self.slots.get_mut(slot) {
			Some(entry) => {
				*entry = Some(pose);
				debug!(slot, "camera bookmark saved");
			}
			None => warn!(slot, "bookmark save ignored, slot out of range"),
		}
	}

	/// The pose stored in `slot`, or `None` when the slot was never saved.
	pub fn recall(&self, slot: usize) -> Option<CameraPose> {
		self.slots.get(slot).copied().flatten()
	}
}
