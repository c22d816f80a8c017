use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::db::DbId;

pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 200 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub upload_folder: PathBuf,
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: u64,
    /// Delay before the background job settles a new evaluation.
    pub analysis_delay: Duration,
    /// Owner of uploads that do not name a user.
    pub default_user_id: DbId,
    pub analyzer_seed: Option<u64>,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        dotenvy::dotenv().ok();

        let base_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let upload_folder = base_dir.join(
            std::env::var("UPLOAD_FOLDER").unwrap_or_else(|_| "uploads".to_string()),
        );

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 = env_or("PORT", 5000)?;
        let max_upload_bytes: u64 = env_or("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?;
        let analysis_delay = Duration::from_secs(env_or("ANALYSIS_DELAY_SECS", 5u64)?);
        let default_user_id: DbId = env_or("DEFAULT_USER_ID", 1)?;
        let analyzer_seed = match std::env::var("ANALYZER_SEED") {
            Ok(raw) => Some(
                raw.parse()
                    .map_err(|_| format!("ANALYZER_SEED must be an integer, got {raw:?}"))?,
            ),
            Err(_) => None,
        };

        Ok(Self {
            upload_folder,
            host,
            port,
            max_upload_bytes,
            analysis_delay,
            default_user_id,
            analyzer_seed,
        })
    }

    /// Defaults with uploads stored under `upload_folder`.
    pub fn with_upload_folder(upload_folder: impl Into<PathBuf>) -> Self {
        Self {
            upload_folder: upload_folder.into(),
            host: "127.0.0.1".to_string(),
            port: 5000,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            analysis_delay: Duration::from_secs(5),
            default_user_id: 1,
            analyzer_seed: None,
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> Result<T, String> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| format!("{key} has an invalid value: {raw:?}")),
        Err(_) => Ok(default),
    }
}
