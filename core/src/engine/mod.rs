//! Contracts for the external rendering engine, scene and data service.
//!
//! The viewer core never talks to a GPU or a wire protocol directly. Everything it
//! needs from the vendor SDK is enumerated here as capability traits, so the whole
//! session can run against test doubles.

use serde::{Deserialize, Serialize};

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::bookmark::CameraPose;

/// Object identifier in the external scene's numbering.
pub type ObjectId = u32;

/// One node of the externally maintained scene object tree, as yielded by a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HierarchicalObjectRef {
	pub id: ObjectId,
	/// Path of the node inside the object tree.
	pub path: String,
}

impl HierarchicalObjectRef {
	pub fn new(id: ObjectId, path: impl Into<String>) -> Self {
		Self {
			id,
			path: path.into(),
		}
	}
}

/// Index into the view's registered highlight styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightIndex(pub u8);

/// A highlight style registration value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HighlightStyle {
	/// Default object appearance.
	Neutral,
	/// RGBA override color.
	Color([f32; 4]),
}

/// Display dimensions in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplaySize {
	pub width: u32,
	pub height: u32,
}

impl DisplaySize {
	pub const fn new(width: u32, height: u32) -> Self {
		Self { width, height }
	}
}

/// Camera controller parameters saved with a scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraInit {
	pub kind: String,
	pub pose: Option<CameraPose>,
}

impl Default for CameraInit {
	fn default() -> Self {
		Self {
			kind: "flight".to_string(),
			pose: None,
		}
	}
}

/// Load parameters resolved by the scene/data service for one scene id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneLoadParams {
	/// Resource URL of the scene geometry.
	pub url: String,
	/// Database handle for the object index.
	pub db: String,
	/// Saved view settings, passed through opaquely to the engine.
	pub settings: Option<serde_json::Value>,
	/// Saved camera parameters, when the scene has any.
	pub camera: Option<CameraInit>,
}

#[derive(Debug, Error)]
pub enum EngineError {
	#[error("scene load failed: {0}")]
	SceneLoad(String),
	#[error("render failed: {0}")]
	Render(String),
	#[error("image extraction failed: {0}")]
	ImageExtraction(String),
	#[error("camera move rejected: {0}")]
	CameraMove(String),
	#[error("search source failed: {0}")]
	Search(String),
}

#[derive(Debug, Error)]
pub enum DataServiceError {
	#[error("not authorized")]
	NotAuthorized,
	#[error("scene lookup failed: {0}")]
	Lookup(String),
}

/// Per-object highlight index buffer owned by the external scene.
///
/// The buffer length always equals the scene's object count; the core only rewrites
/// contents, it never resizes.
pub trait ObjectHighlighter: Send + Sync {
	/// Set every entry to `style`.
	fn fill(&self, style: HighlightIndex);

	/// Set the entry for `id`, returning `false` when `id` is out of range.
	fn set(&self, id: ObjectId, style: HighlightIndex) -> bool;

	/// Signal the renderer that the buffer changed. Synchronous handoff, the next
	/// render reflects it.
	fn commit(&self);
}

/// A loaded scene: object count, highlight buffer and hierarchical search.
pub trait Scene: Send + Sync + 'static {
	type Highlighter: ObjectHighlighter;

	fn object_count(&self) -> u32;

	fn highlighter(&self) -> &Self::Highlighter;

	/// Incremental hierarchical search matching `pattern`.
	///
	/// The returned stream is possibly unbounded and is expected to observe `cancel`
	/// and stop producing further items; the core never force-terminates it.
	fn search(
		&self,
		pattern: &str,
		cancel: CancellationToken,
	) -> BoxStream<'static, Result<HierarchicalObjectRef, EngineError>>;
}

/// A rendered frame, before the displayable image was extracted from it.
#[async_trait]
pub trait RenderOutput: Send {
	type Image: FrameImage;

	/// Finalize the frame into a displayable image, when one was produced.
	async fn image(self) -> Result<Option<Self::Image>, EngineError>;
}

/// A displayable frame image. Must be released after presentation.
pub trait FrameImage: Send {
	/// Release the underlying image resource.
	fn close(self);
}

/// The engine's view: camera, settings and per-frame rendering.
#[async_trait]
pub trait View: Send + Sync + 'static {
	type Output: RenderOutput;

	/// Snapshot of the live camera pose.
	fn camera_pose(&self) -> CameraPose;

	/// Install the camera controller described by `init`.
	fn init_camera(&self, init: &CameraInit);

	/// Ask the camera controller to animate to `pose`.
	async fn move_camera_to(&self, pose: CameraPose) -> Result<(), EngineError>;

	fn apply_display_size(&self, size: DisplaySize);

	fn set_quality_resolution(&self, value: f32);

	/// Register the highlight style table; index in the slice is the index written
	/// into the highlight buffer.
	fn set_highlight_styles(&self, styles: &[HighlightStyle]);

	/// Render one frame. The session keeps exactly one request in flight.
	async fn render(&self) -> Result<Self::Output, EngineError>;
}

/// The canvas the session presents frames on.
pub trait Canvas<I: FrameImage>: Send + Sync + 'static {
	/// Resize the backing pixel buffer.
	fn set_backing_size(&self, size: DisplaySize);

	fn present(&self, image: &I);
}

/// Entry points of the rendering engine itself.
#[async_trait]
pub trait RenderEngine: Send + Sync {
	type Scene: Scene;
	type View: View;

	async fn load_scene(&self, url: &str, db: &str) -> Result<Self::Scene, EngineError>;

	async fn create_view(
		&self,
		settings: Option<&serde_json::Value>,
	) -> Result<Self::View, EngineError>;
}

/// The remote scene/data service, queried once at session start.
#[async_trait]
pub trait SceneDataService: Send + Sync {
	async fn load_scene(&self, scene_id: &str) -> Result<SceneLoadParams, DataServiceError>;
}

/// Local credential storage for the data service.
pub trait CredentialStore: Send + Sync {
	fn access_token(&self) -> Option<String>;

	fn clear(&self);
}

/// The surrounding UI surface: login redirect and HUD visibility.
pub trait UiShell: Send + Sync {
	fn reveal_hud(&self);

	fn redirect_to_login(&self);
}

/// Optional display of the most recently selected object.
pub trait PropertyPanel: Send + Sync {
	fn show_object(&self, id: ObjectId);
}
