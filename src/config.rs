//! Configuration types for vidvault

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::Path, path::PathBuf, time::Duration};

/// Download behavior configuration (output directory, concurrency, transcoding)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Output directory for finished artifacts (default: "./downloads")
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Maximum jobs running at once (default: 4)
    ///
    /// Jobs beyond this limit stay in `starting` until a slot frees up.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_jobs: usize,

    /// Codec for `audio` downloads (default: "mp3")
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// Audio bitrate in kbps for `audio` downloads (default: "192")
    #[serde(default = "default_audio_quality")]
    pub audio_quality: String,

    /// How long shutdown waits for running jobs (default: 30 seconds)
    #[serde(default = "default_shutdown_timeout", with = "duration_serde")]
    pub shutdown_timeout: Duration,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            max_concurrent_jobs: default_max_concurrent(),
            audio_codec: default_audio_codec(),
            audio_quality: default_audio_quality(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

/// Fetcher (yt-dlp) configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetcherConfig {
    /// Path to the yt-dlp executable (auto-detected if None)
    #[serde(default)]
    pub ytdlp_path: Option<PathBuf>,

    /// Whether to search PATH for yt-dlp if no explicit path is set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,

    /// Retry count passed to yt-dlp for extractor, fragment and HTTP retries (default: 3)
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Extra arguments appended to every yt-dlp invocation
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: None,
            search_path: true,
            retries: default_retries(),
            extra_args: Vec::new(),
        }
    }
}

/// Main configuration for the [`Downloader`](crate::Downloader)
///
/// Every field has a default, so `{}` is a valid configuration file.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Download behavior settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// Fetcher settings
    #[serde(default)]
    pub fetcher: FetcherConfig,

    /// API server settings
    #[serde(default)]
    pub server: ServerIntegrationConfig,
}

impl Config {
    /// Output directory
    pub fn download_dir(&self) -> &PathBuf {
        &self.download.download_dir
    }

    /// Load a configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read '{}': {}", path.display(), e),
            key: None,
        })?;
        let config: Config = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the downloader cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.download.max_concurrent_jobs == 0 {
            return Err(Error::Config {
                message: "max_concurrent_jobs must be at least 1".to_string(),
                key: Some("max_concurrent_jobs".to_string()),
            });
        }
        if self.download.audio_codec.trim().is_empty() {
            return Err(Error::Config {
                message: "audio_codec must not be empty".to_string(),
                key: Some("audio_codec".to_string()),
            });
        }
        Ok(())
    }
}

/// API and external server integration configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ServerIntegrationConfig {
    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:8000)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_max_concurrent() -> usize {
    4
}

fn default_audio_codec() -> String {
    "mp3".into()
}

fn default_audio_quality() -> String {
    "192".into()
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_retries() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8000))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".into()]
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
