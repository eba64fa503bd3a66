//! Session event bus for decoupled observation of the viewer.

use tokio::sync::broadcast;

use crate::engine::ObjectId;

#[derive(Debug, Clone)]
pub enum SessionEvent {
	/// The scene finished loading and the session is live.
	SceneLoaded { object_count: u32 },

	/// A camera pose was stored into a bookmark slot.
	BookmarkSaved { slot: usize },

	/// A stored camera pose was recalled from a bookmark slot.
	BookmarkRecalled { slot: usize },

	/// A search ran to completion and its result was projected.
	SearchCompleted { count: usize },

	/// A search was preempted by a later one before completing.
	SearchSuperseded,

	/// A search failed with a non-cancellation source error.
	SearchFailed { reason: String },

	/// The most recently selected object was forwarded to the property panel.
	SelectionShown { id: ObjectId },
}

/// Broadcast bus for [`SessionEvent`]s.
pub struct EventBus {
	sender: broadcast::Sender<SessionEvent>,
}

impl EventBus {
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	/// Emit an event. Send errors are ignored, nobody may be listening.
	pub fn emit(&self, event: SessionEvent) {
		let _ = self.sender.send(event);
	}

	pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
		self.sender.subscribe()
	}
}

impl Default for EventBus {
	fn default() -> Self {
		Self::new(256)
	}
}
