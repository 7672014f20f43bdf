//! Core traits for the DDNS system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`Codec`]: Provider-specific request/response wire format
//! - [`HttpClient`]: Pooled outbound client used for every POST

pub mod codec;
pub mod http_client;

pub use codec::{
    Codec, CodecFactory, CodeMapping, FORM_URLENCODED, ResolveResponse, StatusCodeTable,
    UpdateResponse,
};
pub use http_client::{HttpClient, PostRequest};
