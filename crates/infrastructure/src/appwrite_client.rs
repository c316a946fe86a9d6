use std::time::Duration;

use celoris_core::{AppError, AppResult};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder};
use url::Url;

const PROJECT_HEADER: &str = "X-Appwrite-Project";

/// HTTP client for one Appwrite project.
///
/// Clones share the connection pool and the cookie jar holding the
/// account session, so the auth provider and the record store built from
/// the same client act as the same user.
#[derive(Debug, Clone)]
pub struct AppwriteClient {
    http_client: reqwest::Client,
    endpoint: String,
}

impl AppwriteClient {
    /// Creates a client for `endpoint` (including the `/v1` suffix) and `project_id`.
    pub fn new(endpoint: &Url, project_id: &str, timeout: Duration) -> AppResult<Self> {
        let project = HeaderValue::from_str(project_id).map_err(|error| {
            AppError::Validation(format!("invalid Appwrite project id '{project_id}': {error}"))
        })?;
        let mut headers = HeaderMap::new();
        headers.insert(PROJECT_HEADER, project);

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .cookie_store(true)
            .timeout(timeout)
            .build()
            .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))?;

        Ok(Self {
            http_client,
            endpoint: endpoint.as_str().trim_end_matches('/').to_owned(),
        })
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http_client.request(method, self.url(path))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoint, path.trim_start_matches('/'))
    }
}
