use async_trait::async_trait;
use log::{debug, error, warn};
use reqwest::{header, Client};
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

use crate::entities::model::{EntitySet, DEFAULT_CATEGORY};
use crate::entities::store::{AddReport, EntityStore};
use crate::errors::EntityStoreError;

/// Default request timeout of the storage API
pub const DEFAULT_STORE_TIMEOUT_SECS: u64 = 10;

/// Entity store backed by the novel storage API
///
/// `GET`/`POST {base}/api/novels/{title}/entities`, with an optional bearer
/// token.
#[derive(Debug)]
pub struct HttpEntityStore {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl HttpEntityStore {
    /// Create a store client; fails only on an unparsable base URL
    pub fn new(base_url: &str, api_key: Option<String>, timeout_secs: u64) -> Result<Self, EntityStoreError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| EntityStoreError::RequestFailed(format!("Invalid storage base URL '{}': {}", base_url, e)))?;

        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
            base_url,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        })
    }

    /// Entities endpoint of a title, with the title percent-encoded
    pub fn entities_url(&self, title: &str) -> Result<Url, EntityStoreError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| EntityStoreError::RequestFailed(format!("Storage base URL cannot have a path: {}", self.base_url)))?
            .pop_if_empty()
            .extend(["api", "novels", title, "entities"]);
        Ok(url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header(header::AUTHORIZATION, format!("Bearer {}", key)),
            None => request,
        }
    }

    async fn post_one(&self, url: &Url, name: &str) -> Result<(), String> {
        let body = json!({
            "source_text": name,
            "translations": {},
            "category": DEFAULT_CATEGORY,
        });

        let response = self.authorize(self.client.post(url.clone()))
            .json(&body)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let error_text = response.text().await.unwrap_or_default();
            Err(format!("{}: {}", status, error_text))
        }
    }
}

#[async_trait]
impl EntityStore for HttpEntityStore {
    async fn load(&self, title: &str) -> Result<EntitySet, EntityStoreError> {
        let url = self.entities_url(title)?;
        debug!("Loading entities from {}", url);

        let response = self.authorize(self.client.get(url))
            .send()
            .await
            .map_err(|e| EntityStoreError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Entity store error ({}): {}", status, error_text);
            return Err(EntityStoreError::RequestFailed(format!("{}: {}", status, error_text)));
        }

        let payload: Value = response.json()
            .await
            .map_err(|e| EntityStoreError::ParseError(e.to_string()))?;

        EntitySet::from_payload(&payload)
    }

    async fn add(&self, title: &str, names: &[String]) -> AddReport {
        let url = match self.entities_url(title) {
            Ok(url) => url,
            Err(e) => return AddReport::all_failed(names, &e.to_string()),
        };

        let mut report = AddReport::default();
        for name in names {
            match self.post_one(&url, name).await {
                Ok(()) => report.added.push(name.clone()),
                Err(reason) => {
                    warn!("Failed to register entity '{}': {}", name, reason);
                    report.failed.push((name.clone(), reason));
                }
            }
        }

        report
    }
}
