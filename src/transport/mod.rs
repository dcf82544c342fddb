//! Transport seam between the runner and the network
//!
//! The runner builds an [`HttpRequest`] per attempt and hands it over by
//! value; a [`Transport`] returns the raw response or a transport error.
//! Decoding the body is a separate step (see [`decode`]).

pub mod decode;
pub mod http;

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::common::Result;

pub use decode::{JsonDecoder, ResponseDecoder};
pub use http::HttpTransport;

/// A fully resolved request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    /// Absolute URL without query string
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    /// Encoded JSON body
    pub body: Option<Vec<u8>>,
}

/// Raw response as received
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: BTreeMap<String, Vec<String>>,
    pub body: Vec<u8>,
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request.
    ///
    /// Connectivity failures must be reported as `Error::Transport` so the
    /// runner can retry them; any response, whatever its status, is `Ok`.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}
