// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP adapters for the template-rendering collaborator and the
//! prepared-HTML object store.

use async_trait::async_trait;
use courier_store::{ObjectStore, StoreError, TemplateService};
use reqwest::StatusCode;

/// Rendering collaborator reached as `GET {base_url}/{template_name}`.
pub struct HttpTemplateService {
    base_url: String,
    client: reqwest::Client,
}

impl HttpTemplateService {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self { base_url: base_url.trim_end_matches('/').to_string(), client: reqwest::Client::new() }
    }
}

#[async_trait]
impl TemplateService for HttpTemplateService {
    async fn fetch_template(&self, name: &str) -> Result<Option<String>, StoreError> {
        let url = format!("{}/{name}", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| StoreError::unavailable(format!("template service: {e}")))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(StoreError::unavailable(format!(
                "template service returned {} for {url}",
                response.status()
            )));
        }
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::unavailable(format!("template service body: {e}")))?;
        Ok(Some(body))
    }
}

/// Object store addressed by public URL: `https://{bucket}/{key}`.
pub struct HttpObjectStore {
    bucket: String,
    client: reqwest::Client,
}

impl HttpObjectStore {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self { bucket: bucket.into(), client: reqwest::Client::new() }
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn fetch(&self, url: &str) -> Result<String, StoreError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| StoreError::unavailable(format!("object fetch: {e}")))?;
        if !response.status().is_success() {
            return Err(StoreError::unavailable(format!(
                "object fetch returned {} for {url}",
                response.status()
            )));
        }
        response
            .text()
            .await
            .map_err(|e| StoreError::unavailable(format!("object body: {e}")))
    }

    async fn put_html(&self, key: &str, body: &str) -> Result<String, StoreError> {
        let url = format!("https://{}/{key}", self.bucket);
        let response = self
            .client
            .put(&url)
            .header("content-type", "text/html")
            .body(body.to_string())
            .send()
            .await
            .map_err(|e| StoreError::unavailable(format!("object put: {e}")))?;
        if !response.status().is_success() {
            return Err(StoreError::unavailable(format!(
                "object put returned {} for {url}",
                response.status()
            )));
        }
        Ok(url)
    }
}
