//! Ordered proxy list and its single-pass cursor
//!
//! A [`ProxyList`] is built once from configuration and shared cheaply. Each
//! phase of each attempt takes its own [`ProxyIter`]; iterators are owned
//! values, so one cursor is never advanced by two callers.

use crate::error::{Error, Result};
use std::fmt;
use std::sync::Arc;

const SUPPORTED_SCHEMES: &[&str] = &["http://", "https://", "socks5://", "socks5h://"];

/// One proxy endpoint
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProxyRef {
    url: Arc<str>,
}

impl ProxyRef {
    /// Parse a proxy URL, accepting http, https and socks5 schemes
    pub fn parse(url: &str) -> Result<Self> {
        let url = url.trim();
        let Some(scheme) = SUPPORTED_SCHEMES.iter().find(|s| url.starts_with(**s)) else {
            return Err(Error::config(format!(
                "Proxy URL must use one of {SUPPORTED_SCHEMES:?}, got {url:?}"
            )));
        };
        if url.len() == scheme.len() {
            return Err(Error::config(format!("Proxy URL has no host: {url:?}")));
        }
        Ok(Self { url: url.into() })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl fmt::Display for ProxyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

/// Proxies in priority order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyList {
    proxies: Arc<[ProxyRef]>,
}

impl ProxyList {
    pub fn new(proxies: Vec<ProxyRef>) -> Self {
        Self {
            proxies: proxies.into(),
        }
    }

    /// Parse every URL, failing on the first invalid one
    pub fn parse<S: AsRef<str>>(urls: &[S]) -> Result<Self> {
        urls.iter()
            .map(|u| ProxyRef::parse(u.as_ref()))
            .collect::<Result<Vec<_>>>()
            .map(Self::new)
    }

    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    /// A fresh cursor positioned before the first proxy
    pub fn iter(&self) -> ProxyIter {
        ProxyIter {
            proxies: Arc::clone(&self.proxies),
            cursor: 0,
        }
    }
}

/// Forward-only cursor over a [`ProxyList`]
///
/// The cursor never wraps: once `has_next` is false it stays false.
#[derive(Debug)]
pub struct ProxyIter {
    proxies: Arc<[ProxyRef]>,
    cursor: usize,
}

impl ProxyIter {
    /// Whether another proxy remains
    pub fn has_next(&self) -> bool {
        self.cursor < self.proxies.len()
    }

    /// Number of proxies already handed out
    pub fn position(&self) -> usize {
        self.cursor
    }
}

impl Iterator for ProxyIter {
    type Item = ProxyRef;

    /// Advance and return the proxy under the cursor
    fn next(&mut self) -> Option<ProxyRef> {
        let proxy = self.proxies.get(self.cursor)?.clone();
        self.cursor += 1;
        Some(proxy)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.proxies.len() - self.cursor;
        (left, Some(left))
    }
}

impl ExactSizeIterator for ProxyIter {}
