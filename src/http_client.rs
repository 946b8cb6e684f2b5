//! A thin wrapper around `reqwest::Client` that centralizes the three
//! headers every request in this crate carries, so transfer code never
//! re-derives them.

use reqwest::{Body, Response, header};

use crate::config::Config;

#[derive(Clone)]
pub struct StorageClient {
    client: reqwest::Client,
    endpoint: url::Url,
    token: String,
    user_agent: String,
    origin: String,
}

impl StorageClient {
    pub fn new(config: &Config) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            token: config.token.clone(),
            user_agent: config.user_agent(),
            origin: config.origin.clone(),
        })
    }

    fn resolve(&self, path: &str) -> String {
        crate::path_codec::resolve(self.endpoint.as_str(), path)
    }

    fn fixed_headers(&self) -> header::HeaderMap {
        let mut headers = header::HeaderMap::new();
        if let Ok(value) = header::HeaderValue::from_str(&format!("Bearer {}", self.token)) {
            headers.insert(header::AUTHORIZATION, value);
        }
        if let Ok(value) = header::HeaderValue::from_str(&self.user_agent) {
            headers.insert(header::USER_AGENT, value);
        }
        if let Ok(value) = header::HeaderValue::from_str(&self.origin) {
            headers.insert(header::ORIGIN, value);
        }
        headers
    }

    /// GET for Backup.
    pub async fn get(&self, path: &str) -> reqwest::Result<Response> {
        self.client
            .get(self.resolve(path))
            .headers(self.fixed_headers())
            .send()
            .await
    }

    /// PUT for Restore. `if_none_match` is the client's computed/saved
    /// ETag, when present.
    pub async fn put(
        &self,
        path: &str,
        body: Body,
        content_type: &str,
        content_length: u64,
        if_none_match: Option<&str>,
    ) -> reqwest::Result<Response> {
        let mut request = self
            .client
            .put(self.resolve(path))
            .headers(self.fixed_headers())
            .header(header::CONTENT_TYPE, content_type)
            .header(header::CONTENT_LENGTH, content_length)
            .body(body);

        if let Some(etag) = if_none_match {
            request = request.header(header::IF_NONE_MATCH, etag);
        }

        request.send().await
    }
}
