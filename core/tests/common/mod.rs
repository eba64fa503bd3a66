//! Collaborator doubles for session and pipeline tests.

#![allow(dead_code)] // each test binary uses its own subset

use std::{
	collections::HashMap,
	sync::{
		atomic::{AtomicBool, AtomicU32, Ordering},
		Arc, Mutex,
	},
	time::Duration,
};

use async_channel as chan;
use async_trait::async_trait;
use futures::{stream, stream::BoxStream, StreamExt};
use glam::{Quat, Vec3};
use tokio_util::sync::CancellationToken;

use sv_core::{
	bookmark::CameraPose,
	engine::{
		CameraInit, Canvas, CredentialStore, DataServiceError, DisplaySize, EngineError,
		FrameImage, HierarchicalObjectRef, HighlightIndex, HighlightStyle, ObjectHighlighter,
		ObjectId, PropertyPanel, RenderEngine, RenderOutput, Scene, SceneDataService,
		SceneLoadParams, UiShell, View,
	},
	search::ResultCallback,
};

pub fn pose(x: f32) -> CameraPose {
	CameraPose::new(Vec3::new(x, 2.0, 3.0), Quat::from_rotation_y(x))
}

pub fn obj(id: ObjectId) -> HierarchicalObjectRef {
	HierarchicalObjectRef::new(id, format!("objects/{id}"))
}

/// Poll `cond` until it holds, failing the test after a couple of seconds.
pub async fn wait_until(mut cond: impl FnMut() -> bool) {
	for _ in 0..400 {
		if cond() {
			return;
		}
		tokio::time::sleep(Duration::from_millis(5)).await;
	}
	panic!("condition not reached in time");
}

// ---- highlight buffer ----

pub struct TestHighlighter {
	indices: Mutex<Vec<u8>>,
	commits: AtomicU32,
}

impl TestHighlighter {
	pub fn new(len: usize) -> Self {
		Self {
			indices: Mutex::new(vec![0; len]),
			commits: AtomicU32::new(0),
		}
	}

	pub fn snapshot(&self) -> Vec<u8> {
		self.indices.lock().unwrap().clone()
	}

	pub fn commit_count(&self) -> u32 {
		self.commits.load(Ordering::SeqCst)
	}
}

impl ObjectHighlighter for TestHighlighter {
	fn fill(&self, style: HighlightIndex) {
		self.indices.lock().unwrap().fill(style.0);
	}

	fn set(&self, id: ObjectId, style: HighlightIndex) -> bool {
		match self.indices.lock().unwrap().get_mut(id as usize) {
			Some(entry) => {
				*entry = style.0;
				true
			}
			None => false,
		}
	}

	fn commit(&self) {
		self.commits.fetch_add(1, Ordering::SeqCst);
	}
}

// ---- scene ----

/// Scripted behavior of one search pattern.
pub enum SearchScript {
	/// Yield these refs, then end.
	Results(Vec<HierarchicalObjectRef>),
	/// Never yield and never end.
	Never,
	/// Fail immediately.
	Fail(String),
	/// Yield whatever is sent on the channel; ends when the sender is dropped.
	Channel(chan::Receiver<HierarchicalObjectRef>),
}

struct SceneInner {
	object_count: u32,
	highlighter: TestHighlighter,
	scripts: Mutex<HashMap<String, SearchScript>>,
}

#[derive(Clone)]
pub struct TestScene {
	inner: Arc<SceneInner>,
}

impl TestScene {
	pub fn new(object_count: u32) -> Self {
		Self {
			inner: Arc::new(SceneInner {
				object_count,
				highlighter: TestHighlighter::new(object_count as usize),
				scripts: Mutex::new(HashMap::new()),
			}),
		}
	}

	pub fn script(&self, pattern: &str, script: SearchScript) {
		self.inner
			.scripts
			.lock()
			.unwrap()
			.insert(pattern.to_string(), script);
	}

	pub fn highlight_snapshot(&self) -> Vec<u8> {
		self.inner.highlighter.snapshot()
	}

	pub fn commit_count(&self) -> u32 {
		self.inner.highlighter.commit_count()
	}
}

impl Scene for TestScene {
	type Highlighter = TestHighlighter;

	fn object_count(&self) -> u32 {
		self.inner.object_count
	}

	fn highlighter(&self) -> &TestHighlighter {
		&self.inner.highlighter
	}

	fn search(
		&self,
		pattern: &str,
		_cancel: CancellationToken,
	) -> BoxStream<'static, Result<HierarchicalObjectRef, EngineError>> {
		match self.inner.scripts.lock().unwrap().remove(pattern) {
			Some(SearchScript::Results(refs)) => stream::iter(refs.into_iter().map(Ok)).boxed(),
			Some(SearchScript::Never) => stream::pending().boxed(),
			Some(SearchScript::Fail(msg)) => {
				stream::once(async move { Err(EngineError::Search(msg)) }).boxed()
			}
			Some(SearchScript::Channel(rx)) => rx.map(Ok).boxed(),
			// Unscripted patterns match nothing.
			None => stream::empty().boxed(),
		}
	}
}

// ---- view, frames, canvas ----

pub struct TestFrameImage {
	pub id: u32,
	closed: Arc<AtomicU32>,
}

impl FrameImage for TestFrameImage {
	fn close(self) {
		self.closed.fetch_add(1, Ordering::SeqCst);
	}
}

pub struct TestRenderOutput {
	image: Option<TestFrameImage>,
}

#[async_trait]
impl RenderOutput for TestRenderOutput {
	type Image = TestFrameImage;

	async fn image(self) -> Result<Option<TestFrameImage>, EngineError> {
		Ok(self.image)
	}
}

struct ViewInner {
	pose: Mutex<CameraPose>,
	moves: Mutex<Vec<CameraPose>>,
	display_sizes: Mutex<Vec<DisplaySize>>,
	styles: Mutex<Vec<HighlightStyle>>,
	quality: Mutex<Option<f32>>,
	camera_inits: Mutex<Vec<CameraInit>>,
	frame_tx: chan::Sender<u32>,
	frame_rx: chan::Receiver<u32>,
	closed_images: Arc<AtomicU32>,
}

#[derive(Clone)]
pub struct TestView {
	inner: Arc<ViewInner>,
}

impl TestView {
	pub fn new() -> Self {
		let (frame_tx, frame_rx) = chan::unbounded();
		Self {
			inner: Arc::new(ViewInner {
				pose: Mutex::new(CameraPose::default()),
				moves: Mutex::new(Vec::new()),
				display_sizes: Mutex::new(Vec::new()),
				styles: Mutex::new(Vec::new()),
				quality: Mutex::new(None),
				camera_inits: Mutex::new(Vec::new()),
				frame_tx,
				frame_rx,
				closed_images: Arc::new(AtomicU32::new(0)),
			}),
		}
	}

	pub fn set_pose(&self, pose: CameraPose) {
		*self.inner.pose.lock().unwrap() = pose;
	}

	pub fn moves(&self) -> Vec<CameraPose> {
		self.inner.moves.lock().unwrap().clone()
	}

	pub fn display_sizes(&self) -> Vec<DisplaySize> {
		self.inner.display_sizes.lock().unwrap().clone()
	}

	pub fn styles(&self) -> Vec<HighlightStyle> {
		self.inner.styles.lock().unwrap().clone()
	}

	pub fn quality(&self) -> Option<f32> {
		*self.inner.quality.lock().unwrap()
	}

	pub fn camera_inits(&self) -> Vec<CameraInit> {
		self.inner.camera_inits.lock().unwrap().clone()
	}

	/// Allow the render loop to produce one frame carrying `id`.
	pub async fn push_frame(&self, id: u32) {
		self.inner.frame_tx.send(id).await.unwrap();
	}

	pub fn closed_images(&self) -> u32 {
		self.inner.closed_images.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl View for TestView {
	type Output = TestRenderOutput;

	fn camera_pose(&self) -> CameraPose {
		*self.inner.pose.lock().unwrap()
	}

	fn init_camera(&self, init: &CameraInit) {
		self.inner.camera_inits.lock().unwrap().push(init.clone());
	}

	async fn move_camera_to(&self, pose: CameraPose) -> Result<(), EngineError> {
		self.inner.moves.lock().unwrap().push(pose);
		*self.inner.pose.lock().unwrap() = pose;
		Ok(())
	}

	fn apply_display_size(&self, size: DisplaySize) {
		self.inner.display_sizes.lock().unwrap().push(size);
	}

	fn set_quality_resolution(&self, value: f32) {
		*self.inner.quality.lock().unwrap() = Some(value);
	}

	fn set_highlight_styles(&self, styles: &[HighlightStyle]) {
		*self.inner.styles.lock().unwrap() = styles.to_vec();
	}

	async fn render(&self) -> Result<TestRenderOutput, EngineError> {
		match self.inner.frame_rx.recv().await {
			Ok(id) => Ok(TestRenderOutput {
				image: Some(TestFrameImage {
					id,
					closed: Arc::clone(&self.inner.closed_images),
				}),
			}),
			// Frame source gone; stall until the loop's stop token fires.
			Err(_) => futures::future::pending().await,
		}
	}
}

struct CanvasInner {
	backing_sizes: Mutex<Vec<DisplaySize>>,
	presented: Mutex<Vec<u32>>,
}

#[derive(Clone)]
pub struct TestCanvas {
	inner: Arc<CanvasInner>,
}

impl TestCanvas {
	pub fn new() -> Self {
		Self {
			inner: Arc::new(CanvasInner {
				backing_sizes: Mutex::new(Vec::new()),
				presented: Mutex::new(Vec::new()),
			}),
		}
	}

	pub fn backing_sizes(&self) -> Vec<DisplaySize> {
		self.inner.backing_sizes.lock().unwrap().clone()
	}

	pub fn presented(&self) -> Vec<u32> {
		self.inner.presented.lock().unwrap().clone()
	}
}

impl Canvas<TestFrameImage> for TestCanvas {
	fn set_backing_size(&self, size: DisplaySize) {
		self.inner.backing_sizes.lock().unwrap().push(size);
	}

	fn present(&self, image: &TestFrameImage) {
		self.inner.presented.lock().unwrap().push(image.id);
	}
}

// ---- ui surface ----

#[derive(Clone, Default)]
pub struct TestPanel {
	shown: Arc<Mutex<Vec<ObjectId>>>,
}

impl TestPanel {
	pub fn shown(&self) -> Vec<ObjectId> {
		self.shown.lock().unwrap().clone()
	}
}

impl PropertyPanel for TestPanel {
	fn show_object(&self, id: ObjectId) {
		self.shown.lock().unwrap().push(id);
	}
}

#[derive(Clone)]
pub struct TestCredentials {
	token: Arc<Mutex<Option<String>>>,
}

impl TestCredentials {
	pub fn with_token(token: &str) -> Self {
		Self {
			token: Arc::new(Mutex::new(Some(token.to_string()))),
		}
	}

	pub fn token(&self) -> Option<String> {
		self.token.lock().unwrap().clone()
	}
}

impl CredentialStore for TestCredentials {
	fn access_token(&self) -> Option<String> {
		self.token.lock().unwrap().clone()
	}

	fn clear(&self) {
		*self.token.lock().unwrap() = None;
	}
}

#[derive(Clone, Default)]
pub struct TestShell {
	hud_revealed: Arc<AtomicBool>,
	login_redirects: Arc<AtomicU32>,
}

impl TestShell {
	pub fn hud_revealed(&self) -> bool {
		self.hud_revealed.load(Ordering::SeqCst)
	}

	pub fn login_redirects(&self) -> u32 {
		self.login_redirects.load(Ordering::SeqCst)
	}
}

impl UiShell for TestShell {
	fn reveal_hud(&self) {
		self.hud_revealed.store(true, Ordering::SeqCst);
	}

	fn redirect_to_login(&self) {
		self.login_redirects.fetch_add(1, Ordering::SeqCst);
	}
}

// ---- data service and engine ----

pub struct TestDataService {
	response: Mutex<Option<Result<SceneLoadParams, DataServiceError>>>,
	requested: Mutex<Vec<String>>,
}

impl TestDataService {
	pub fn responding(response: Result<SceneLoadParams, DataServiceError>) -> Self {
		Self {
			response: Mutex::new(Some(response)),
			requested: Mutex::new(Vec::new()),
		}
	}

	pub fn requested(&self) -> Vec<String> {
		self.requested.lock().unwrap().clone()
	}
}

pub fn load_params() -> SceneLoadParams {
	SceneLoadParams {
		url: "https://assets.test/scene".to_string(),
		db: "db-0".to_string(),
		settings: None,
		camera: None,
	}
}

#[async_trait]
impl SceneDataService for TestDataService {
	async fn load_scene(&self, scene_id: &str) -> Result<SceneLoadParams, DataServiceError> {
		self.requested.lock().unwrap().push(scene_id.to_string());
		self.response
			.lock()
			.unwrap()
			.take()
			.unwrap_or_else(|| Ok(load_params()))
	}
}

pub struct TestEngine {
	pub scene: TestScene,
	pub view: TestView,
}

impl TestEngine {
	pub fn new(scene: TestScene, view: TestView) -> Self {
		Self { scene, view }
	}
}

#[async_trait]
impl RenderEngine for TestEngine {
	type Scene = TestScene;
	type View = TestView;

	async fn load_scene(&self, _url: &str, _db: &str) -> Result<TestScene, EngineError> {
		Ok(self.scene.clone())
	}

	async fn create_view(
		&self,
		_settings: Option<&serde_json::Value>,
	) -> Result<TestView, EngineError> {
		Ok(self.view.clone())
	}
}

// ---- result recording ----

#[derive(Clone, Default)]
pub struct ResultRecorder {
	calls: Arc<Mutex<Vec<Vec<ObjectId>>>>,
}

impl ResultRecorder {
	pub fn callback(&self) -> ResultCallback {
		let calls = Arc::clone(&self.calls);
		Arc::new(move |refs| {
			calls
				.lock()
				.unwrap()
				.push(refs.iter().map(|obj| obj.id).collect());
		})
	}

	pub fn calls(&self) -> Vec<Vec<ObjectId>> {
		self.calls.lock().unwrap().clone()
	}
}
