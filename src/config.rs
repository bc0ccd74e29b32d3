use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::session::Credentials;
use crate::track::TrackName;

/// Prefix of environment overrides, e.g. `KVS_AUDIO__EXTRACTION__CONTACT_ID`.
pub const ENV_PREFIX: &str = "KVS_AUDIO";

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub stream: StreamConfig,
    #[serde(default)]
    pub credentials: Option<Credentials>,
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub forward: ForwardConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StreamConfig {
    pub name: String,
    pub region: String,
    /// "EARLIEST" or "FRAGMENT_NUMBER"; anything else reads from the earliest data.
    #[serde(default)]
    pub start_selector: Option<String>,
    pub start_fragment_number: Option<String>,
    #[serde(default = "default_replay_dir")]
    pub replay_dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExtractionConfig {
    pub contact_id: String,
    #[serde(default = "default_track")]
    pub track: TrackName,
    /// Frames per chunk.
    #[serde(default = "default_chunk_frames")]
    pub chunk_frames: usize,
    /// Extraction calls allowed per chunk; 0 leaves it unbounded.
    #[serde(default)]
    pub max_attempts: usize,
}

impl ExtractionConfig {
    pub fn attempt_limit(&self) -> Option<NonZeroUsize> {
        NonZeroUsize::new(self.max_attempts)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ForwardConfig {
    /// Speech pipeline websocket; chunks go to `output_path` when unset.
    #[serde(default)]
    pub ws_url: Option<String>,
    #[serde(default)]
    pub ws_token: String,
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_channels")]
    pub channels: u8,
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for ForwardConfig {
    fn default() -> Self {
        Self {
            ws_url: None,
            ws_token: String::new(),
            output_path: default_output_path(),
            sample_rate: default_sample_rate(),
            channels: default_channels(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_replay_dir() -> PathBuf {
    PathBuf::from("recordings")
}

fn default_track() -> TrackName {
    TrackName::AudioFromCustomer
}

fn default_chunk_frames() -> usize {
    4
}

fn default_output_path() -> PathBuf {
    PathBuf::from("call_audio.raw")
}

// Contact center call audio is 8kHz mono 16-bit PCM.
fn default_sample_rate() -> u32 {
    8000
}

fn default_channels() -> u8 {
    1
}

fn default_channel_capacity() -> usize {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load from an optional TOML file, overlaid with `KVS_AUDIO__*`
    /// environment variables.
    pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn minimal_file_fills_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[stream]
name = "connect-contact-stream"
region = "us-east-1"
start_fragment_number = "0"

[extraction]
contact_id = "f5b2c1e0"
"#
        )
        .unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.stream.name, "connect-contact-stream");
        assert_eq!(config.stream.start_selector, None);
        assert_eq!(config.stream.replay_dir, PathBuf::from("recordings"));
        assert_eq!(config.extraction.track, TrackName::AudioFromCustomer);
        assert_eq!(config.extraction.chunk_frames, 4);
        assert_eq!(config.extraction.attempt_limit(), None);
        assert!(config.credentials.is_none());
        assert!(config.forward.ws_url.is_none());
        assert_eq!(config.forward.sample_rate, 8000);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn explicit_values_override_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[stream]
name = "s"
region = "eu-west-2"
start_selector = "FRAGMENT_NUMBER"
start_fragment_number = "9134"

[credentials]
access_key_id = "AKID"
secret_access_key = "secret"

[extraction]
contact_id = "c"
track = "AUDIO_TO_CUSTOMER"
chunk_frames = 10
max_attempts = 500

[forward]
ws_url = "ws://127.0.0.1:9000/stream"
"#
        )
        .unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.stream.start_selector.as_deref(), Some("FRAGMENT_NUMBER"));
        assert_eq!(config.extraction.track, TrackName::AudioToCustomer);
        assert_eq!(config.extraction.attempt_limit(), NonZeroUsize::new(500));
        assert_eq!(
            config.credentials.map(|c| c.access_key_id),
            Some("AKID".to_string())
        );
        assert_eq!(config.forward.ws_url.as_deref(), Some("ws://127.0.0.1:9000/stream"));
    }
}
