use std::sync::Arc;
use std::time::Duration;

use celoris_core::{AppError, AppResult};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder};
use tokio::sync::RwLock;
use url::Url;

/// HTTP client for one Supabase project.
///
/// Every request carries the anon key in `apikey`. Requests built with
/// [`SupabaseClient::authorized`] also carry the session access token, or
/// the anon key when signed out. Clones share the token.
#[derive(Debug, Clone)]
pub struct SupabaseClient {
    http_client: reqwest::Client,
    base_url: String,
    anon_key: String,
    access_token: Arc<RwLock<Option<String>>>,
}

impl SupabaseClient {
    /// Creates a client for the project at `base_url`.
    pub fn new(base_url: &Url, anon_key: &str, timeout: Duration) -> AppResult<Self> {
        let api_key = HeaderValue::from_str(anon_key).map_err(|error| {
            AppError::Validation(format!("invalid Supabase anon key: {error}"))
        })?;
        let mut headers = HeaderMap::new();
        headers.insert("apikey", api_key);

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))?;

        Ok(Self {
            http_client,
            base_url: base_url.as_str().trim_end_matches('/').to_owned(),
            anon_key: anon_key.to_owned(),
            access_token: Arc::new(RwLock::new(None)),
        })
    }

    /// Builds a request carrying only the anon key.
    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http_client.request(method, self.url(path))
    }

    /// Builds a request carrying the session token when there is one.
    pub(crate) async fn authorized(&self, method: Method, path: &str) -> RequestBuilder {
        let token = self
            .access_token
            .read()
            .await
            .clone()
            .unwrap_or_else(|| self.anon_key.clone());

        self.request(method, path)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
    }

    pub(crate) async fn access_token(&self) -> Option<String> {
        self.access_token.read().await.clone()
    }

    pub(crate) async fn set_access_token(&self, token: Option<String>) {
        *self.access_token.write().await = token;
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}
