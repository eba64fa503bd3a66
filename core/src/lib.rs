//! SceneView core
//!
//! The interaction layer of a browser-hosted 3D scene viewer: camera bookmarks, a
//! cancel-and-replace search pipeline and an object-highlight projector, composed
//! into a viewport session driven by an external render engine and scene/data
//! service. Rendering, scene parsing and transport stay behind the [`engine`]
//! traits.

pub mod bookmark;
pub mod config;
pub mod engine;
pub mod events;
pub mod highlight;
pub mod search;
pub mod session;

use std::sync::Arc;

use async_channel as chan;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
	config::{ConfigError, SessionConfig},
	engine::{
		Canvas, CredentialStore, DataServiceError, EngineError, PropertyPanel, RenderEngine,
		RenderOutput, SceneDataService, UiShell, View,
	},
	session::{Session, SessionInput},
};

#[derive(Debug, Error)]
pub enum SessionError {
	/// The data service rejected the session; credentials were cleared and the
	/// shell was redirected to the login surface.
	#[error("not authorized")]
	NotAuthorized,
	#[error(transparent)]
	Data(DataServiceError),
	#[error(transparent)]
	Engine(#[from] EngineError),
	#[error(transparent)]
	Config(#[from] ConfigError),
}

/// Resolve the configured scene through the data service, load it into the engine
/// and start a session.
///
/// The one distinguished failure is the data service's not-authorized condition: it
/// clears the credential store and redirects to the login surface before returning.
/// Every other initialization failure is surfaced as-is.
pub async fn connect<E, D, C, P>(
	config: &SessionConfig,
	engine: &E,
	data_service: &D,
	credentials: &dyn CredentialStore,
	shell: &dyn UiShell,
	canvas: Arc<C>,
	panel: Arc<P>,
) -> Result<(Session<E::Scene, E::View, C>, chan::Sender<SessionInput>), SessionError>
where
	E: RenderEngine,
	D: SceneDataService,
	C: Canvas<<<E::View as View>::Output as RenderOutput>::Image>,
	P: PropertyPanel + 'static,
{
	info!(scene_id = %config.scene_id, "connecting viewer session");

	if credentials.access_token().is_none() {
		debug!("no access token present, proceeding unauthenticated");
	}

	let params = match data_service.load_scene(&config.scene_id).await {
		Ok(params) => params,
		Err(DataServiceError::NotAuthorized) => {
			warn!("data service rejected the session, clearing credentials");
			credentials.clear();
			shell.redirect_to_login();
			return Err(SessionError::NotAuthorized);
		}
		Err(e) => return Err(SessionError::Data(e)),
	};

	let scene = engine.load_scene(&params.url, &params.db).await?;
	let view = engine.create_view(params.settings.as_ref()).await?;

	view.set_quality_resolution(config.quality_resolution);
	view.init_camera(&params.camera.unwrap_or_default());

	let (session, input_tx) = Session::new(Arc::new(scene), Arc::new(view), canvas, panel, config);

	shell.reveal_hud();
	info!("viewer session ready");

	Ok((session, input_tx))
}
