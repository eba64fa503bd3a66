//! Session configuration, persisted as a versioned JSON file.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::highlight::HighlightConfig;

pub const CONFIG_FILE_NAME: &str = "sceneview.json";

const CONFIG_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("config io error: {0}")]
	Io(#[from] std::io::Error),
	#[error("config serialization error: {0}")]
	Serde(#[from] serde_json::Error),
	#[error("unknown config version: {0}")]
	UnknownVersion(u32),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
	/// Config schema version.
	pub version: u32,

	/// Scene identifier resolved through the data service at session start.
	pub scene_id: String,

	/// Base URL of the scene/data service.
	pub data_service_url: String,

	/// Render quality resolution factor.
	pub quality_resolution: f32,

	/// Number of bookmark buttons, one slot each.
	pub bookmark_slots: usize,

	/// Highlight style registrations.
	pub highlight: HighlightConfig,
}

impl Default for SessionConfig {
	fn default() -> Self {
		Self {
			version: CONFIG_VERSION,
			scene_id: String::new(),
			data_service_url: "https://data.sceneview.dev/api".to_string(),
			quality_resolution: 1.0,
			bookmark_slots: 3,
			highlight: HighlightConfig::default(),
		}
	}
}

impl SessionConfig {
	/// Load the config from `dir`, creating a default one when none exists.
	pub fn load_from(dir: &Path) -> Result<Self, ConfigError> {
		let config_path = dir.join(CONFIG_FILE_NAME);

		if config_path.exists() {
			info!("Loading config from {config_path:?}");
			let json = fs::read_to_string(&config_path)?;
			let mut config: Self = serde_json::from_str(&json)?;

			if config.version < CONFIG_VERSION {
				info!(
					"Migrating config from v{} to v{CONFIG_VERSION}",
					config.version
				);
				config.migrate()?;
				config.save_to(dir)?;
			} else if config.version > CONFIG_VERSION {
				return Err(ConfigError::UnknownVersion(config.version));
			}

			Ok(config)
		} else {
			warn!("No config found, creating default at {config_path:?}");
			let config = Self::default();
			config.save_to(dir)?;
			Ok(config)
		}
	}

	/// Load the config from `dir`, falling back to a freshly saved default when the
	/// existing file cannot be read.
	pub fn load_or_create(dir: &Path) -> Result<Self, ConfigError> {
		Self::load_from(dir).or_else(|_| {
			let config = Self::default();
			config.save_to(dir)?;
			Ok(config)
		})
	}

	pub fn save_to(&self, dir: &Path) -> Result<(), ConfigError> {
		fs::create_dir_all(dir)?;

		let config_path = dir.join(CONFIG_FILE_NAME);
		let json = serde_json::to_string_pretty(self)?;
		fs::write(&config_path, json)?;
		info!("Saved config to {config_path:?}");
		Ok(())
	}

	fn migrate(&mut self) -> Result<(), ConfigError> {
		match self.version {
			0 => {
				// v0 predates configurable highlight styles; nothing to rewrite.
				self.version = 1;
				Ok(())
			}
			CONFIG_VERSION => Ok(()),
			v => Err(ConfigError::UnknownVersion(v)),
		}
	}
}
