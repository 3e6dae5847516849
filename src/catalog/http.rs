// JSON-over-HTTP catalog client
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{Catalog, NextResult, WatchEndpoint};
use crate::error::CatalogError;
use crate::settings::CatalogSettings;

#[derive(Serialize)]
struct NextRequest<'a> {
    endpoint: &'a WatchEndpoint,
    continuation: Option<&'a str>,
}

#[derive(Deserialize)]
struct AlbumResponse {
    playlist_id: String,
}

#[derive(Clone)]
pub struct HttpCatalog {
    http: reqwest::Client,
    base_url: String,
}

impl HttpCatalog {
    pub fn new(settings: &CatalogSettings) -> Result<Self, CatalogError> {
        if settings.base_url.trim().is_empty() {
            return Err(CatalogError::Unavailable("no catalog base url configured".to_string()));
        }

        let mut headers = HeaderMap::new();
        if let Ok(agent) = HeaderValue::from_str(&settings.user_agent) {
            headers.insert(USER_AGENT, agent);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(settings.timeout_secs.max(1)))
            .build()?;

        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Decode a response body, keeping the request path for diagnostics
    fn parse_response<T: DeserializeOwned>(path: &str, text: &str) -> Result<T, CatalogError> {
        serde_json::from_str(text).map_err(|source| CatalogError::Parse {
            path: path.to_string(),
            source,
        })
    }

    async fn read_body(path: &str, resp: reqwest::Response) -> Result<String, CatalogError> {
        let status = resp.status();
        if !status.is_success() {
            return Err(CatalogError::Status {
                status: status.as_u16(),
                path: path.to_string(),
            });
        }
        Ok(resp.text().await?)
    }
}

#[async_trait]
impl Catalog for HttpCatalog {
    async fn next(
        &self,
        endpoint: &WatchEndpoint,
        continuation: Option<&str>,
    ) -> Result<NextResult, CatalogError> {
        let path = "/next";
        debug!(?endpoint, has_continuation = continuation.is_some(), "catalog next");

        let resp = self
            .http
            .post(self.url(path))
            .json(&NextRequest {
                endpoint,
                continuation,
            })
            .send()
            .await?;
        let text = Self::read_body(path, resp).await?;
        Self::parse_response(path, &text)
    }

    async fn album_playlist_id(&self, browse_id: &str) -> Result<String, CatalogError> {
        let path = format!("/album/{browse_id}");
        debug!("catalog album lookup {browse_id}");

        let resp = self.http.get(self.url(&path)).send().await?;
        let text = Self::read_body(&path, resp).await?;
        let album: AlbumResponse = Self::parse_response(&path, &text)?;
        Ok(album.playlist_id)
    }
}
