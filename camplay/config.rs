use crate::error::App;
use log::info;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

pub const DEFAULT_DEVICE: &str = "/dev/video2";
pub const DEFAULT_CAPS: &str = "image/jpeg,width=1920,height=1080,framerate=30/1";

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub poll_interval_ms: u64,
    pub log_dir: Option<PathBuf>,
    pub pipeline: PipelineConfig,
}

/// Element names and properties of the capture graph.
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub device: String,
    pub caps: String,
    pub queue_max_buffers: u32,
    pub parser: String,
    pub decoder: String,
    pub postproc: String,
    pub video_sink: String,
    pub text_overlay: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval_ms: 10,
            log_dir: None,
            pipeline: PipelineConfig::default(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            device: DEFAULT_DEVICE.to_string(),
            caps: DEFAULT_CAPS.to_string(),
            queue_max_buffers: 3,
            parser: "jpegparse".to_string(),
            decoder: "vaapijpegdec".to_string(),
            postproc: "vaapipostproc".to_string(),
            video_sink: "vaapisink".to_string(),
            text_overlay: true,
        }
    }
}

impl Config {
    // An explicit path must exist; the default file is optional.
    pub async fn load(path: Option<&Path>, config_dir: Option<&Path>) -> Result<Self, App> {
        let config = match (path, config_dir) {
            (Some(path), _) => Self::load_from_file(path).await?,
            (None, Some(dir)) => {
                let default_path = dir.join("config.toml");
                if fs::try_exists(&default_path).await? {
                    Self::load_from_file(&default_path).await?
                } else {
                    Self::default()
                }
            }
            (None, None) => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    async fn load_from_file(path: &Path) -> Result<Self, App> {
        info!("Loading configuration from {}", path.display());
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| App::Config(format!("failed to read {}: {e}", path.display())))?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), App> {
        if self.poll_interval_ms == 0 {
            return Err(App::Config("poll_interval_ms must be greater than zero".to_string()));
        }
        if self.pipeline.queue_max_buffers == 0 {
            return Err(App::Config("queue_max_buffers must be greater than zero".to_string()));
        }
        if self.pipeline.device.trim().is_empty() {
            return Err(App::Config("device must not be empty".to_string()));
        }
        if self.pipeline.caps.trim().is_empty() {
            return Err(App::Config("caps must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

pub fn default_config_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config").join("camplay"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn defaults_match_the_reference_camera_setup() {
        let config = Config::load(None, None).await.unwrap();
        assert_eq!(config.pipeline.device, "/dev/video2");
        assert_eq!(
            config.pipeline.caps,
            "image/jpeg,width=1920,height=1080,framerate=30/1"
        );
        assert_eq!(config.pipeline.queue_max_buffers, 3);
        assert_eq!(config.poll_interval(), Duration::from_millis(10));
    }

    #[tokio::test]
    async fn partial_file_keeps_remaining_defaults() {
        let file = write_config(
            r#"
poll_interval_ms = 25

[pipeline]
device = "/dev/video0"
decoder = "jpegdec"
"#,
        );
        let config = Config::load(Some(file.path()), None).await.unwrap();
        assert_eq!(config.poll_interval_ms, 25);
        assert_eq!(config.pipeline.device, "/dev/video0");
        assert_eq!(config.pipeline.decoder, "jpegdec");
        assert_eq!(config.pipeline.postproc, "vaapipostproc");
        assert!(config.pipeline.text_overlay);
    }

    #[tokio::test]
    async fn missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let result = Config::load(Some(&dir.path().join("nope.toml")), None).await;
        assert!(matches!(result, Err(App::Config(_))));
    }

    #[tokio::test]
    async fn missing_default_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(None, Some(dir.path())).await.unwrap();
        assert_eq!(config, Config::default());
    }

    #[tokio::test]
    async fn default_file_in_config_dir_is_read() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("config.toml"), "poll_interval_ms = 40\n").unwrap();
        let config = Config::load(None, Some(dir.path())).await.unwrap();
        assert_eq!(config.poll_interval_ms, 40);
    }

    #[tokio::test]
    async fn unknown_keys_are_rejected() {
        let file = write_config("pol_interval_ms = 5\n");
        let result = Config::load(Some(file.path()), None).await;
        assert!(matches!(result, Err(App::TomlParsing(_))));
    }

    #[tokio::test]
    async fn zero_poll_interval_is_rejected() {
        let file = write_config("poll_interval_ms = 0\n");
        let result = Config::load(Some(file.path()), None).await;
        assert!(matches!(result, Err(App::Config(_))));
    }

    #[test]
    fn empty_device_is_rejected() {
        let mut config = Config::default();
        config.pipeline.device = "  ".to_string();
        assert!(config.validate().is_err());
    }
}
