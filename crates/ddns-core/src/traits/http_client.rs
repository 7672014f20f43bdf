// # HTTP Client Trait
//
// The outbound seam of the orchestrator. Pooled clients implement it; the
// production implementation is `transport::ReqwestClient`, tests use
// scripted doubles.
//
// A client is only ever used by the one caller that checked it out, so
// `post` takes `&mut self` and may keep per-proxy state.

use crate::error::Result;
use crate::proxy::ProxyRef;
use async_trait::async_trait;

/// One POST to send
#[derive(Debug, Clone, Copy)]
pub struct PostRequest<'a> {
    /// Target endpoint
    pub url: &'a str,
    /// Value of the `Content-Type` header
    pub content_type: &'a str,
    /// Encoded request body
    pub body: &'a [u8],
    /// Route the request through this proxy instead of connecting directly
    pub proxy: Option<&'a ProxyRef>,
}

/// Outbound client able to POST a body and return the response body
#[async_trait]
pub trait HttpClient: Send {
    /// Send one POST
    ///
    /// Network-layer failures (including non-2xx HTTP statuses) must be
    /// returned as `Error::Transport`, the class that proxy failover recovers.
    async fn post(&mut self, request: PostRequest<'_>) -> Result<Vec<u8>>;
}
