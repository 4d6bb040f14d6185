//! Environment-supplied run configuration.
//!
//! Base URL, debugging endpoint, credentials and the driver settings all
//! live in one `VerifyEnv`, built once per run and passed explicitly.

use std::env;
use std::path::PathBuf;

use helmsman::{Credentials, DeviceProfile, DriverConfig};
use tracing::Level;
use tracing_subscriber::EnvFilter;

const DEFAULT_BASE_URL: &str = "http://localhost:5173/diary/";
const DEFAULT_CDP_URL: &str = "http://127.0.0.1:9222";
const DEFAULT_ARTIFACT_DIR: &str = "verification";

const MOBILE_USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 15_0 like Mac OS X) \
AppleWebKit/605.1.15 (KHTML, like Gecko) Version/15.0 Mobile/15E148 Safari/604.1";

#[derive(Debug, Clone)]
pub struct VerifyEnv {
    /// Base path the client app is served under, trailing slash included
    pub base_url: String,
    /// Browser debugging endpoint the surface attaches to
    pub cdp_endpoint: String,
    /// Where screenshots land
    pub artifact_dir: PathBuf,
    /// Where intercepted downloads land
    pub download_dir: PathBuf,
    pub config: DriverConfig,
}

impl VerifyEnv {
    pub fn load(device: DeviceProfile) -> Self {
        dotenvy::dotenv().ok();

        let base_url = env_or("DIARY_BASE_URL", DEFAULT_BASE_URL);
        let cdp_endpoint = env_or("HELMSMAN_CDP_URL", DEFAULT_CDP_URL);
        let artifact_dir = PathBuf::from(env_or("HELMSMAN_ARTIFACT_DIR", DEFAULT_ARTIFACT_DIR));
        let download_dir = artifact_dir.join("downloads");

        let credentials = Credentials {
            email: env_or("DIARY_EMAIL", "testuser@diary.com"),
            password: env_or("DIARY_PASSWORD", "test1234"),
        };
        let max_iterations = env::var("HELMSMAN_MAX_ITERATIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);

        Self {
            base_url,
            cdp_endpoint,
            artifact_dir,
            download_dir,
            config: DriverConfig {
                max_iterations,
                device,
                credentials,
                ..DriverConfig::default()
            },
        }
    }

    /// Resolve a path (e.g. `#/app/calendar`) against the base URL.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), ensure_leading_slash(path))
    }

    pub fn screenshot_path(&self, run: &str) -> PathBuf {
        self.artifact_dir.join(format!("{run}.png"))
    }
}

fn ensure_leading_slash(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn desktop() -> DeviceProfile {
    DeviceProfile::default()
}

pub fn mobile() -> DeviceProfile {
    DeviceProfile {
        width: 375,
        height: 667,
        user_agent: Some(MOBILE_USER_AGENT.to_string()),
        mobile: true,
    }
}

pub fn init_logging() {
    let log_level = env::var("LOG_LEVEL")
        .map(|level| match level.to_lowercase().as_str() {
            "error" => Level::ERROR,
            "warn" => Level::WARN,
            "info" => Level::INFO,
            "debug" => Level::DEBUG,
            _ => Level::INFO,
        })
        .unwrap_or(Level::INFO);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(log_level.into()))
        .init();
}
