//! Transport step shared by both phases: one direct POST, or a single
//! pass over the proxy list stopping at the first POST that goes through.

use super::events::{AttemptEvent, EventSink};
use crate::error::Result;
use crate::proxy::ProxyList;
use crate::status::Status;
use crate::traits::{HttpClient, PostRequest};
use tracing::{debug, error, warn};

/// How POSTs leave the process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TransportMode {
    /// Straight to the endpoint
    #[default]
    Direct,
    /// Through each proxy in order until one succeeds
    Proxied(ProxyList),
}

/// Send `request` according to `mode`
///
/// - `Ok(Some(body))`: a POST went through
/// - `Ok(None)`: proxied mode ran out of proxies; each failure is already in
///   `status`, and the caller decides the outcome from the (empty) response
/// - `Err(e)`: the direct POST failed; the failure is already in `status`
pub(crate) async fn send<C: HttpClient + ?Sized>(
    client: &mut C,
    mode: &TransportMode,
    request: PostRequest<'_>,
    target: &str,
    status: &mut Status,
    events: &EventSink,
) -> Result<Option<Vec<u8>>> {
    match mode {
        TransportMode::Direct => {
            let result = client.post(request).await;
            events.emit(AttemptEvent::PostAttempted {
                target: target.to_string(),
                url: request.url.to_string(),
                proxy: None,
                succeeded: result.is_ok(),
            });

            match result {
                Ok(body) => Ok(Some(body)),
                Err(e) => {
                    let msg = format!("request to {} for {} failed: {}", request.url, target, e);
                    error!("{}", msg);
                    status.add_error(msg);
                    Err(e)
                }
            }
        }
        TransportMode::Proxied(proxies) => {
            for proxy in proxies.iter() {
                let result = client
                    .post(PostRequest {
                        proxy: Some(&proxy),
                        ..request
                    })
                    .await;
                events.emit(AttemptEvent::PostAttempted {
                    target: target.to_string(),
                    url: request.url.to_string(),
                    proxy: Some(proxy.to_string()),
                    succeeded: result.is_ok(),
                });

                match result {
                    Ok(body) => {
                        debug!(%proxy, url = request.url, "request went through proxy");
                        return Ok(Some(body));
                    }
                    Err(e) => {
                        let msg = format!("request error through proxy {}: {}", proxy, e);
                        warn!("{}", msg);
                        status.add_error(msg);
                    }
                }
            }

            warn!(
                "All {} proxies failed for {} ({})",
                proxies.len(),
                target,
                request.url
            );
            Ok(None)
        }
    }
}
