use anyhow::{Context, Result};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::Config;
use crate::error::RepositoryError;
use crate::peak::{BoundingBox, Peak, PeakId, PeakInput};
use crate::repository::PeakRepository;

const JSON: &str = "application/json";

/// `PeakRepository` over the peak REST API.
#[derive(Clone)]
pub struct PeakClient {
    base_url: String,
    http: reqwest::Client,
}

impl PeakClient {
    pub fn new(base_url: &str, http: reqwest::Client) -> Result<Self, RepositoryError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        Url::parse(&base_url)?;
        Ok(Self { base_url, http })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .context("failed to build HTTP client")?;
        Self::new(&config.api_base_url(), http)
            .with_context(|| format!("invalid peak API url {}", config.api_base_url()))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn list_url(&self, bounds: &BoundingBox) -> Result<Url, RepositoryError> {
        let mut url = Url::parse(&format!("{}/peaks", self.base_url))?;
        url.query_pairs_mut()
            .append_pair("n", &bounds.north.to_string())
            .append_pair("s", &bounds.south.to_string())
            .append_pair("w", &bounds.west.to_string())
            .append_pair("e", &bounds.east.to_string());
        Ok(url)
    }

    fn collection_url(&self) -> String {
        format!("{}/peaks/", self.base_url)
    }

    fn item_url(&self, id: PeakId) -> String {
        format!("{}/peaks/{}/", self.base_url, id)
    }

    /// Every request speaks JSON both ways, bodiless ones included.
    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .header(ACCEPT, JSON)
            .header(CONTENT_TYPE, JSON)
    }

    async fn send(
        &self,
        method: &'static str,
        url: &str,
        request: RequestBuilder,
    ) -> Result<Response, RepositoryError> {
        let response = request
            .send()
            .await
            .map_err(|source| RepositoryError::Network {
                method,
                url: url.to_string(),
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RepositoryError::Server {
                method,
                url: url.to_string(),
                status,
                body,
            });
        }
        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(
        method: &'static str,
        url: &str,
        response: Response,
    ) -> Result<T, RepositoryError> {
        response
            .json::<T>()
            .await
            .map_err(|source| RepositoryError::Decode {
                method,
                url: url.to_string(),
                source,
            })
    }
}

impl PeakRepository for PeakClient {
    async fn list_in_bounds(&self, bounds: BoundingBox) -> Result<Vec<Peak>, RepositoryError> {
        let url = self.list_url(&bounds)?;
        let url = url.as_str();
        let response = self.send("GET", url, self.request(Method::GET, url)).await?;
        let peaks: Vec<Peak> = Self::decode("GET", url, response).await?;
        tracing::debug!(count = peaks.len(), url, "listed peaks");
        Ok(peaks)
    }

    async fn create(&self, input: PeakInput) -> Result<Peak, RepositoryError> {
        let url = self.collection_url();
        let response = self
            .send("POST", &url, self.request(Method::POST, &url).json(&input))
            .await?;
        let peak: Peak = Self::decode("POST", &url, response).await?;
        tracing::debug!(id = peak.id, name = %peak.name, "created peak");
        Ok(peak)
    }

    async fn update(&self, peak: Peak) -> Result<Peak, RepositoryError> {
        let url = self.item_url(peak.id);
        let response = self
            .send("PUT", &url, self.request(Method::PUT, &url).json(&peak))
            .await?;
        let updated: Peak = Self::decode("PUT", &url, response).await?;
        tracing::debug!(id = updated.id, name = %updated.name, "updated peak");
        Ok(updated)
    }

    async fn delete(&self, id: PeakId) -> Result<(), RepositoryError> {
        let url = self.item_url(id);
        self.send("DELETE", &url, self.request(Method::DELETE, &url)).await?;
        tracing::debug!(id, "deleted peak");
        Ok(())
    }
}
