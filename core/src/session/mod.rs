//! Viewport session controller.
//!
//! Composes the bookmark store, search pipeline and highlight projector with the
//! pointer/keyboard/form inputs and the render/resize loop. Inputs arrive over a
//! channel; the render loop runs as its own task and is stopped through a
//! cancellation token held by the session as a drop guard.

use std::sync::Arc;

use async_channel as chan;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, error, trace, warn};

use crate::{
	bookmark::BookmarkStore,
	config::SessionConfig,
	engine::{Canvas, DisplaySize, FrameImage, ObjectId, RenderOutput, Scene, View},
	events::{EventBus, SessionEvent},
	highlight::HighlightProjector,
	search::{ResultCallback, SearchPipeline, SubmitOutcome},
};

pub use crate::engine::PropertyPanel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
	Primary,
	Secondary,
	Auxiliary,
}

/// A pointer click as reported by the UI surface.
#[derive(Debug, Clone, Copy)]
pub struct PointerClick {
	pub button: PointerButton,
	/// Whether the save modifier key was held.
	pub modifier: bool,
}

/// Inputs fed into the session by the UI surface.
#[derive(Debug, Clone)]
pub enum SessionInput {
	/// A click on one of the bookmark buttons.
	BookmarkClick { slot: usize, click: PointerClick },
	/// A search form submission.
	SearchSubmit { query: String },
	/// The canvas display box changed size.
	CanvasResized { size: DisplaySize },
}

/// A live viewer session.
///
/// Dropping the session stops the render loop.
pub struct Session<S, V, C>
where
	S: Scene,
	V: View,
	C: Canvas<<V::Output as RenderOutput>::Image>,
{
	view: Arc<V>,
	canvas: Arc<C>,
	bookmarks: BookmarkStore,
	pipeline: SearchPipeline<S>,
	events: Arc<EventBus>,
	input_rx: chan::Receiver<SessionInput>,
	_stop_render: DropGuard,
}

impl<S, V, C> Session<S, V, C>
where
	S: Scene,
	V: View,
	C: Canvas<<V::Output as RenderOutput>::Image>,
{
	/// Assemble a session around an already loaded scene and view, registering the
	/// highlight styles and spawning the render loop.
	pub fn new<P: PropertyPanel + 'static>(
		scene: Arc<S>,
		view: Arc<V>,
		canvas: Arc<C>,
		panel: Arc<P>,
		config: &SessionConfig,
	) -> (Self, chan::Sender<SessionInput>) {
		let events = Arc::new(EventBus::default());
		let object_count = scene.object_count();

		let projector = Arc::new(HighlightProjector::initialize(
			&*view,
			&config.highlight,
			object_count,
		));

		let on_results: ResultCallback = {
			let scene = Arc::clone(&scene);
			let events = Arc::clone(&events);
			Arc::new(move |refs| {
				let ids = refs.iter().map(|obj| obj.id).collect::<Vec<ObjectId>>();
				projector.apply(scene.highlighter(), &ids);
				if let Some(&id) = ids.last() {
					panel.show_object(id);
					events.emit(SessionEvent::SelectionShown { id });
				}
				events.emit(SessionEvent::SearchCompleted { count: ids.len() });
			})
		};

		let pipeline = SearchPipeline::new(Arc::clone(&scene), on_results);

		let stop = CancellationToken::new();
		tokio::spawn(render_loop(
			Arc::clone(&view),
			Arc::clone(&canvas),
			stop.child_token(),
		));

		let (input_tx, input_rx) = chan::unbounded();

		events.emit(SessionEvent::SceneLoaded { object_count });

		(
			Self {
				view,
				canvas,
				bookmarks: BookmarkStore::new(config.bookmark_slots),
				pipeline,
				events,
				input_rx,
				_stop_render: stop.drop_guard(),
			},
			input_tx,
		)
	}

	pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<SessionEvent> {
		self.events.subscribe()
	}

	/// Process inputs until every sender is dropped.
	pub async fn run(mut self) {
		while let Ok(input) = self.input_rx.recv().await {
			self.handle_input(input);
		}
		debug!("session input channel closed, shutting down");
	}

	fn handle_input(&mut self, input: SessionInput) {
		match input {
			SessionInput::BookmarkClick { slot, click } => self.on_bookmark_click(slot, click),
			SessionInput::SearchSubmit { query } => self.on_search_submit(query),
			SessionInput::CanvasResized { size } => self.on_canvas_resized(size),
		}
	}

	/// One UI affordance serves dual save/recall duty: a primary click with the
	/// modifier held saves the live pose, without it recalls.
	fn on_bookmark_click(&mut self, slot: usize, click: PointerClick) {
		if click.button != PointerButton::Primary {
			return;
		}

		if click.modifier {
			self.bookmarks.save(slot, self.view.camera_pose());
			self.events.emit(SessionEvent::BookmarkSaved { slot });
		} else if let Some(pose) = self.bookmarks.recall(slot) {
			self.events.emit(SessionEvent::BookmarkRecalled { slot });
			let view = Arc::clone(&self.view);
			// Fire and forget: further input must not wait on the camera animation.
			tokio::spawn(async move {
				if let Err(e) = view.move_camera_to(pose).await {
					warn!(%e, "camera move failed");
				}
			});
		} else {
			debug!(slot, "recall on empty bookmark slot, nothing to do");
		}
	}

	fn on_search_submit(&self, query: String) {
		// Claim synchronously so preemption follows input order; only the drain
		// runs concurrently.
		let Some(run) = self.pipeline.begin(&query) else {
			return;
		};

		let pipeline = self.pipeline.clone();
		let events = Arc::clone(&self.events);
		tokio::spawn(async move {
			match pipeline.drive(run).await {
				Ok(SubmitOutcome::Completed { .. } | SubmitOutcome::Ignored) => {}
				Ok(SubmitOutcome::Superseded) => events.emit(SessionEvent::SearchSuperseded),
				Err(e) => {
					error!(%e, query, "search failed");
					events.emit(SessionEvent::SearchFailed {
						reason: e.to_string(),
					});
				}
			}
		});
	}

	/// Each firing is independent and idempotent, last write wins.
	fn on_canvas_resized(&self, size: DisplaySize) {
		self.canvas.set_backing_size(size);
		self.view.apply_display_size(size);
		trace!(?size, "display size applied");
	}
}

/// Single-flight render loop: render a frame, extract its image, present it,
/// release it, repeat. Exactly one frame request is in flight at a time; the loop
/// runs until `stop` fires.
pub async fn render_loop<V, C>(view: Arc<V>, canvas: Arc<C>, stop: CancellationToken)
where
	V: View,
	C: Canvas<<V::Output as RenderOutput>::Image>,
{
	debug!("render loop started");

	loop {
		let output = tokio::select! {
			() = stop.cancelled() => break,
			output = view.render() => output,
		};

		let output = match output {
			Ok(output) => output,
			Err(e) => {
				// Frame failures must not kill the loop once it is running.
				warn!(%e, "frame render failed");
				continue;
			}
		};

		let image = tokio::select! {
			() = stop.cancelled() => break,
			image = output.image() => image,
		};

		match image {
			Ok(Some(image)) => {
				canvas.present(&image);
				image.close();
			}
			Ok(None) => trace!("frame produced no image"),
			Err(e) => warn!(%e, "frame image extraction failed"),
		}
	}

	debug!("render loop stopped");
}
