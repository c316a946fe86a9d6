use std::env;
use std::time::Duration;

use celoris_core::AppError;
use celoris_domain::AppRoute;
use tracing_subscriber::EnvFilter;
use url::Url;

const DEFAULT_APP_ORIGIN: &str = "http://localhost:5173";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;
const AUTH_CALLBACK_PATH: &str = "/auth/callback";

#[derive(Debug, Clone)]
pub enum BackendConfig {
    Appwrite { endpoint: Url, project_id: String },
    Supabase { url: Url, anon_key: String },
    InMemory,
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    pub backend: BackendConfig,
    pub app_origin: Url,
    pub http_timeout: Duration,
    pub credentials: Option<Credentials>,
    pub route: AppRoute,
}

impl ConsoleConfig {
    pub fn load() -> Result<Self, AppError> {
        let backend = match env::var("CELORIS_BACKEND")
            .unwrap_or_else(|_| "appwrite".to_owned())
            .trim()
            .to_ascii_lowercase()
            .as_str()
        {
            "appwrite" => BackendConfig::Appwrite {
                endpoint: parse_url(
                    "APPWRITE_ENDPOINT",
                    &required_non_empty_env("APPWRITE_ENDPOINT")?,
                )?,
                project_id: required_non_empty_env("APPWRITE_PROJECT_ID")?,
            },
            "supabase" => BackendConfig::Supabase {
                url: parse_url("SUPABASE_URL", &required_non_empty_env("SUPABASE_URL")?)?,
                anon_key: required_non_empty_env("SUPABASE_ANON_KEY")?,
            },
            "memory" => BackendConfig::InMemory,
            other => {
                return Err(AppError::Validation(format!(
                    "CELORIS_BACKEND must be 'appwrite', 'supabase' or 'memory', got '{other}'"
                )));
            }
        };

        let app_origin = parse_url(
            "APP_ORIGIN",
            &env::var("APP_ORIGIN").unwrap_or_else(|_| DEFAULT_APP_ORIGIN.to_owned()),
        )?;

        let http_timeout = Duration::from_secs(
            env::var("HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|value| value.parse::<u64>().ok())
                .filter(|seconds| *seconds > 0)
                .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
        );

        let credentials = match (optional_env("CELORIS_EMAIL"), optional_env("CELORIS_PASSWORD")) {
            (Some(email), Some(password)) => Some(Credentials { email, password }),
            (None, None) => None,
            _ => {
                return Err(AppError::Validation(
                    "CELORIS_EMAIL and CELORIS_PASSWORD must be set together".to_owned(),
                ));
            }
        };

        let route = AppRoute::parse(
            optional_env("CELORIS_ROUTE")
                .as_deref()
                .unwrap_or("/"),
        );

        Ok(Self {
            backend,
            app_origin,
            http_timeout,
            credentials,
            route,
        })
    }

    /// Where verification links send the user back to.
    pub fn verification_redirect_url(&self) -> String {
        callback_url(&self.app_origin)
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn callback_url(origin: &Url) -> String {
    format!(
        "{}{AUTH_CALLBACK_PATH}",
        origin.as_str().trim_end_matches('/')
    )
}

fn parse_url(name: &str, value: &str) -> Result<Url, AppError> {
    let url = Url::parse(value.trim())
        .map_err(|error| AppError::Validation(format!("invalid {name} '{value}': {error}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(AppError::Validation(format!(
            "{name} must be an http(s) URL, got '{value}'"
        )));
    }
    Ok(url)
}

fn optional_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn required_env(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn required_non_empty_env(name: &str) -> Result<String, AppError> {
    let value = required_env(name)?;
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{name} must not be empty")));
    }

    Ok(value)
}
