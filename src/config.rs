use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "config.json5";

/// Default number of seconds between two camera refresh steps.
pub const DEFAULT_RELOAD_INTERVAL_SECS: u64 = 5;

/// Default number of seconds between two `time` sync events.
pub const DEFAULT_TIME_SYNC_INTERVAL_SECS: u64 = 30;

/// Application configuration structure
///
/// Contains all configuration parameters for the Watchpost dashboard
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Name of the dashboard displayed in the page title
    pub site_name: String,
    /// Cameras to monitor; the set is fixed for the lifetime of the process
    pub cameras: Vec<CameraSource>,
    /// Seconds between two refresh steps of the round-robin reloader
    #[serde(default = "default_reload_interval_secs")]
    pub reload_interval_secs: u64,
    /// Seconds between two clock sync events pushed to clients
    #[serde(default = "default_time_sync_interval_secs")]
    pub time_sync_interval_secs: u64,
    /// Directory snapshots are written to and served from
    #[serde(default = "default_snapshot_dir")]
    pub snapshot_dir: PathBuf,
    /// Disables the reload scheduler entirely when true
    #[serde(default)]
    pub no_reload: bool,
}

/// A single camera as declared in the configuration file
///
/// The `uuid` is the opaque identifier used everywhere else in the system;
/// `source_url` is where the reloader fetches fresh snapshots from.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CameraSource {
    /// Opaque identifier, unique within the configuration
    pub uuid: String,
    /// Display name for the dashboard
    pub name: String,
    /// HTTP(S) endpoint that returns the current snapshot image
    pub source_url: String,
}

fn default_reload_interval_secs() -> u64 {
    DEFAULT_RELOAD_INTERVAL_SECS
}

fn default_time_sync_interval_secs() -> u64 {
    DEFAULT_TIME_SYNC_INTERVAL_SECS
}

fn default_snapshot_dir() -> PathBuf {
    PathBuf::from("snapshots")
}

impl Config {
    /// Load the application configuration from the given JSON5 file.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be read, parsed or
    /// fails validation.
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        tracing::debug!("Loading application configuration from {}", path.display());
        let config_str = fs::read_to_string(path)?;

        let config: Config = json5::from_str(&config_str)?;
        config.validate()?;

        tracing::info!(
            "Configuration loaded successfully with {} cameras",
            config.cameras.len()
        );
        Ok(config)
    }

    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the site name is empty, a camera entry is
    /// incomplete, a camera uuid is duplicated, or a source URL is not a
    /// valid http(s) URL.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.site_name.trim().is_empty() {
            return Err(crate::error::WatchpostError::from(
                "Site name cannot be empty",
            ));
        }

        for camera in &self.cameras {
            if camera.uuid.trim().is_empty() {
                return Err(crate::error::WatchpostError::from(
                    "Camera uuid cannot be empty",
                ));
            }
            if camera.name.trim().is_empty() {
                return Err(crate::error::WatchpostError::from(format!(
                    "Camera {} has an empty name",
                    camera.uuid
                )));
            }

            let url = Url::parse(&camera.source_url).map_err(|_| {
                crate::error::WatchpostError::from(format!(
                    "Invalid source URL for camera {}: {}",
                    camera.uuid, camera.source_url
                ))
            })?;
            match url.scheme() {
                "http" | "https" => {}
                other => {
                    return Err(crate::error::WatchpostError::from(format!(
                        "Unsupported source URL scheme for camera {}: {other}",
                        camera.uuid
                    )))
                }
            }
        }

        let mut seen = std::collections::HashSet::new();
        for camera in &self.cameras {
            if !seen.insert(camera.uuid.as_str()) {
                return Err(crate::error::WatchpostError::from(format!(
                    "Duplicate camera uuid: {}",
                    camera.uuid
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> Config {
        Config {
            site_name: "Warehouse".to_string(),
            cameras: vec![
                CameraSource {
                    uuid: "cam-entrance".to_string(),
                    name: "Entrance".to_string(),
                    source_url: "http://10.0.0.11/snapshot.jpg".to_string(),
                },
                CameraSource {
                    uuid: "cam-yard".to_string(),
                    name: "Yard".to_string(),
                    source_url: "https://10.0.0.12/snapshot.jpg".to_string(),
                },
            ],
            reload_interval_secs: DEFAULT_RELOAD_INTERVAL_SECS,
            time_sync_interval_secs: DEFAULT_TIME_SYNC_INTERVAL_SECS,
            snapshot_dir: PathBuf::from("snapshots"),
            no_reload: false,
        }
    }

    #[test]
    fn test_parse_minimal_config_applies_defaults() {
        let raw = r#"{
            site_name: "Warehouse",
            cameras: [
                { uuid: "cam-entrance", name: "Entrance", source_url: "http://10.0.0.11/snapshot.jpg" },
            ],
        }"#;

        let config: Config = json5::from_str(raw).expect("minimal config should parse");
        assert_eq!(config.site_name, "Warehouse");
        assert_eq!(config.cameras.len(), 1);
        assert_eq!(config.reload_interval_secs, DEFAULT_RELOAD_INTERVAL_SECS);
        assert_eq!(
            config.time_sync_interval_secs,
            DEFAULT_TIME_SYNC_INTERVAL_SECS
        );
        assert_eq!(config.snapshot_dir, PathBuf::from("snapshots"));
        assert!(!config.no_reload);
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(sample_config().validate().is_ok());
    }

    #[test]
    fn test_validate_empty_site_name() {
        let mut config = sample_config();
        config.site_name = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_duplicate_uuid() {
        let mut config = sample_config();
        config.cameras[1].uuid = config.cameras[0].uuid.clone();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Duplicate camera uuid"));
    }

    #[test]
    fn test_validate_rejects_bad_source_url() {
        let mut config = sample_config();
        config.cameras[0].source_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_non_http_scheme() {
        let mut config = sample_config();
        config.cameras[0].source_url = "ftp://10.0.0.11/snapshot.jpg".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Unsupported source URL scheme"));
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load(Path::new("/definitely/not/here/config.json5"));
        assert!(matches!(
            result,
            Err(crate::error::WatchpostError::Io(_))
        ));
    }
}
