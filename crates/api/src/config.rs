//! Layered application configuration
//!
//! Built-in defaults, then an optional TOML file, then environment
//! variables of the form `FATIGUE__SECTION__KEY`.

use camera_capture::CameraConfig;
use detection::{DetectionSettings, OverlayConfig, StreamConfig};
use fatigue::{DetectionConfig, FaceMeshConfig};
use serde::{Deserialize, Serialize};

use crate::rate_limit::RateLimitConfig;

/// Default config file, read when present
pub const DEFAULT_CONFIG_FILE: &str = "fatigue-monitor.toml";
/// Environment variable overriding the config file path
pub const CONFIG_PATH_ENV: &str = "FATIGUE_MONITOR_CONFIG";
const ENV_PREFIX: &str = "FATIGUE";

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub stream: StreamConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:5003".to_string(),
            stream: StreamConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Port part of the bind address
    pub fn port(&self) -> Option<u16> {
        self.bind.rsplit_once(':').and_then(|(_, port)| port.parse().ok())
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter directive; `RUST_LOG` takes precedence
    pub level: String,
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub camera: CameraConfig,
    pub detection: DetectionConfig,
    pub landmarks: FaceMeshConfig,
    pub overlay: OverlayConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LogConfig,
}

impl AppConfig {
    /// Load from the default file location and the environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(&path)
    }

    /// Load from `path` (optional) layered under the environment
    pub fn load_from(path: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Settings for the detection service
    pub fn detection_settings(&self) -> DetectionSettings {
        DetectionSettings {
            camera: self.camera.clone(),
            detection: self.detection.clone(),
            overlay: self.overlay.clone(),
            stream: self.server.stream.clone(),
        }
    }
}
