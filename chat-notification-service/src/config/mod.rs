use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

pub const DEFAULT_FCM_API_BASE_URL: &str = "https://fcm.googleapis.com";
pub const DEFAULT_METADATA_BASE_URL: &str = "http://metadata.google.internal";

#[derive(Debug, Clone, Deserialize)]
pub struct DispatcherConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub fcm: FcmConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FcmConfig {
    /// When false the service runs against the mock push provider.
    pub enabled: bool,
    /// Explicit project (`FCM_PROJECT_ID`); wins over the key file.
    pub project_id: Option<String>,
    /// Project from `GOOGLE_CLOUD_PROJECT` / `GCLOUD_PROJECT`, used only when
    /// neither `project_id` nor the service-account key names one.
    #[serde(default)]
    pub environment_project_id: Option<String>,
    /// Refuse to start without a resolvable project.
    #[serde(default)]
    pub require_project_id: bool,
    /// Static bearer token; skips the OAuth2 exchange entirely.
    pub access_token: Option<String>,
    /// Path to a service-account JSON key.
    pub credentials_path: Option<String>,
    pub api_base_url: String,
    pub metadata_base_url: String,
    pub request_timeout_secs: u64,
    pub max_concurrency: usize,
}

impl Default for FcmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            project_id: None,
            environment_project_id: None,
            require_project_id: false,
            access_token: None,
            credentials_path: None,
            api_base_url: DEFAULT_FCM_API_BASE_URL.to_string(),
            metadata_base_url: DEFAULT_METADATA_BASE_URL.to_string(),
            request_timeout_secs: 30,
            max_concurrency: 100,
        }
    }
}

impl DispatcherConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        let enabled = env::var("FCM_ENABLED")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .unwrap_or(false);

        Ok(DispatcherConfig {
            common: common_config,
            fcm: FcmConfig {
                enabled,
                project_id: optional_env("FCM_PROJECT_ID"),
                environment_project_id: optional_env("GOOGLE_CLOUD_PROJECT")
                    .or_else(|| optional_env("GCLOUD_PROJECT")),
                // The key file may supply the project, so the check runs when
                // the provider is built.
                require_project_id: is_prod,
                access_token: optional_env("FCM_ACCESS_TOKEN"),
                credentials_path: optional_env("GOOGLE_APPLICATION_CREDENTIALS"),
                api_base_url: get_env("FCM_API_BASE_URL", DEFAULT_FCM_API_BASE_URL),
                metadata_base_url: get_env("FCM_METADATA_BASE_URL", DEFAULT_METADATA_BASE_URL),
                request_timeout_secs: get_env("FCM_REQUEST_TIMEOUT_SECS", "30")
                    .parse()
                    .unwrap_or(30),
                max_concurrency: get_env("FCM_MAX_CONCURRENCY", "100")
                    .parse()
                    .ok()
                    .filter(|n: &usize| *n > 0)
                    .unwrap_or(100),
            },
        })
    }
}

fn optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn get_env(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
