//! reqwest-backed [`HttpClient`]
//!
//! Each pooled `ReqwestClient` owns a direct `reqwest::Client` and lazily
//! builds one more per proxy URL it is asked to use. Non-2xx responses are
//! mapped to transport errors so proxied attempts move on to the next proxy.

use crate::error::{Error, Result};
use crate::proxy::ProxyRef;
use crate::traits::{HttpClient, PostRequest};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use std::collections::HashMap;
use std::time::Duration;

/// Pooled HTTP client
pub struct ReqwestClient {
    timeout: Duration,
    direct: reqwest::Client,
    via_proxy: HashMap<ProxyRef, reqwest::Client>,
}

impl std::fmt::Debug for ReqwestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestClient")
            .field("timeout", &self.timeout)
            .field("proxies", &self.via_proxy.len())
            .finish()
    }
}

impl ReqwestClient {
    /// Build a client whose requests time out after `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let direct = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            timeout,
            direct,
            via_proxy: HashMap::new(),
        })
    }

    fn client_for(&mut self, proxy: Option<&ProxyRef>) -> Result<&reqwest::Client> {
        let Some(proxy) = proxy else {
            return Ok(&self.direct);
        };

        if !self.via_proxy.contains_key(proxy) {
            let route = reqwest::Proxy::all(proxy.url())
                .map_err(|e| Error::transport(format!("invalid proxy {proxy}: {e}")))?;
            let client = reqwest::Client::builder()
                .timeout(self.timeout)
                .proxy(route)
                .build()
                .map_err(|e| {
                    Error::transport(format!("failed to build HTTP client for proxy {proxy}: {e}"))
                })?;
            self.via_proxy.insert(proxy.clone(), client);
        }

        self.via_proxy
            .get(proxy)
            .ok_or_else(|| Error::transport(format!("no client for proxy {proxy}")))
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn post(&mut self, request: PostRequest<'_>) -> Result<Vec<u8>> {
        let client = self.client_for(request.proxy)?;

        let response = client
            .post(request.url)
            .header(CONTENT_TYPE, request.content_type)
            .body(request.body.to_vec())
            .send()
            .await
            .map_err(|e| Error::transport(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());

            return Err(match status.as_u16() {
                401 | 403 => Error::transport(format!(
                    "Authentication failed or access denied. Status: {status}"
                )),
                429 => Error::transport(format!(
                    "Rate limit exceeded. Please retry later. Status: {status}"
                )),
                500..=599 => Error::transport(format!(
                    "Server error (transient): {status} - {error_text}"
                )),
                _ => Error::transport(format!("Request failed: {status} - {error_text}")),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::transport(format!("Failed to read response body: {e}")))?;

        tracing::trace!(url = request.url, bytes = body.len(), "response received");
        Ok(body.to_vec())
    }
}
