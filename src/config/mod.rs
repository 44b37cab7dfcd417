mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use stupff_av::tools::{get_tool_path, FFMPEG, FFPROBE};
use stupff_av::TranscoderSettings;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = ["./stupff.toml", "~/.config/stupff/config.toml"];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.transcode.poll_interval_ms == 0 {
        anyhow::bail!("transcode.poll_interval_ms cannot be 0");
    }

    if config.transcode.log_level.trim().is_empty() {
        anyhow::bail!("transcode.log_level cannot be empty");
    }

    if config.transcode.auto_size && !config.transcode.video.has_size_bounds() {
        anyhow::bail!("transcode.auto_size needs video.max_width or video.max_height");
    }

    if config.thumbnail.seek_candidates.is_empty() {
        tracing::warn!("thumbnail.seek_candidates is empty, thumbnails will seek to 0");
    }

    for (name, path) in [
        ("ffmpeg_path", &config.tools.ffmpeg_path),
        ("ffprobe_path", &config.tools.ffprobe_path),
    ] {
        if let Some(path) = path {
            if !path.exists() {
                tracing::warn!("tools.{} does not exist: {:?}", name, path);
            }
        }
    }

    Ok(())
}

impl Config {
    /// Configured ffmpeg, or the one on `PATH`.
    pub fn ffmpeg_path(&self) -> Result<PathBuf> {
        Ok(get_tool_path(FFMPEG, self.tools.ffmpeg_path.as_deref())?)
    }

    /// Configured ffprobe, or the one on `PATH`.
    pub fn ffprobe_path(&self) -> Result<PathBuf> {
        Ok(get_tool_path(FFPROBE, self.tools.ffprobe_path.as_deref())?)
    }

    /// Resolve tool paths and build the library settings.
    pub fn transcoder_settings(&self) -> Result<TranscoderSettings> {
        Ok(TranscoderSettings {
            ffmpeg: self.ffmpeg_path()?,
            ffprobe: self.ffprobe_path()?,
            log_level: self.transcode.log_level.clone(),
            poll_interval: Duration::from_millis(self.transcode.poll_interval_ms),
            probe_backend: self.transcode.probe_backend,
            thumbnail_seeks: self.thumbnail.seek_candidates.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stupff_av::ProbeBackend;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.transcode.log_level, "10");
        assert_eq!(config.transcode.poll_interval_ms, 250);
        assert_eq!(config.thumbnail.seek_candidates, vec![10, 5, 1, 0]);
        validate_config(&config).unwrap();
    }

    #[test]
    fn test_parse_sections() {
        let config: Config = toml::from_str(
            r#"
            [tools]
            ffmpeg_path = "/opt/ffmpeg/bin/ffmpeg"

            [transcode]
            log_level = "error"
            probe_backend = "json"

            [transcode.audio]
            codec = "libvorbis"
            bitrate = 128000

            [transcode.video]
            codec = "libvpx"
            max_width = 1280

            [thumbnail]
            seek_candidates = [30, 0]
            "#,
        )
        .unwrap();

        assert_eq!(
            config.tools.ffmpeg_path.as_deref(),
            Some(Path::new("/opt/ffmpeg/bin/ffmpeg"))
        );
        assert_eq!(config.transcode.log_level, "error");
        assert_eq!(config.transcode.probe_backend, ProbeBackend::Json);
        assert_eq!(config.transcode.audio.bitrate, Some(128_000));
        assert_eq!(config.transcode.video.max_width, Some(1280));
        assert_eq!(config.thumbnail.seek_candidates, vec![30, 0]);
    }

    #[test]
    fn test_unknown_option_rejected() {
        let result: std::result::Result<Config, _> =
            toml::from_str("[transcode.video]\nresolution = \"4k\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_zero_poll_interval() {
        let mut config = Config::default();
        config.transcode.poll_interval_ms = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_rejects_auto_size_without_bounds() {
        let mut config = Config::default();
        config.transcode.auto_size = true;
        assert!(validate_config(&config).is_err());

        config.transcode.video.max_height = Some(480);
        assert!(validate_config(&config).is_ok());
    }
}
