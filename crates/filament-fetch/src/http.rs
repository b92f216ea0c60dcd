use std::fmt;
use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::Stream;
use thiserror::Error;

/// A boxed stream type for HTTP response bodies.
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = T> + Send + 'a>>;

/// Transport-level failure below the HTTP status layer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url:     String,
    pub headers: Vec<(String, String)>,
}

/// Response headers of interest plus the streaming body.
pub struct HttpResponse {
    pub status:         u16,
    pub etag:           Option<String>,
    pub content_length: Option<u64>,
    pub body:           BoxStream<'static, Result<Bytes, TransportError>>,
}

impl fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("etag", &self.etag)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Asynchronous HTTP client abstraction.
///
/// Implementations follow redirects themselves and report every final status, including
/// errors, as an [`HttpResponse`]. Only failures below HTTP become [`TransportError`]s.
///
/// # Implementations
///
/// - [`ReqwestClient`]: production implementation using `reqwest`
/// - scripted fakes in tests
pub trait HttpClient: Send + Sync + 'static {
    fn get(&self, request: HttpRequest) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}

#[cfg(feature = "reqwest")]
mod reqwest_impl {
    use futures_util::StreamExt;

    use super::*;
    use crate::FetchConfig;

    /// Production HTTP client implementation using reqwest.
    #[derive(Debug, Clone)]
    pub struct ReqwestClient {
        client: reqwest::Client,
    }

    impl ReqwestClient {
        /// Build a client honouring the connect timeout and user agent from `config`.
        pub fn new(config: &FetchConfig) -> Result<Self, TransportError> {
            let user_agent = config
                .user_agent
                .clone()
                .unwrap_or_else(|| concat!("filament/", env!("CARGO_PKG_VERSION")).to_string());
            let client = reqwest::Client::builder()
                .connect_timeout(config.connect_timeout_duration())
                .user_agent(user_agent)
                .build()
                .map_err(map_error)?;
            Ok(Self { client })
        }

        pub fn with_client(client: reqwest::Client) -> Self { Self { client } }
    }

    impl HttpClient for ReqwestClient {
        async fn get(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            let mut builder = self.client.get(&request.url);
            for (key, value) in &request.headers {
                builder = builder.header(key, value);
            }

            let response = builder.send().await.map_err(map_error)?;
            let etag = response
                .headers()
                .get(reqwest::header::ETAG)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string);

            Ok(HttpResponse {
                status: response.status().as_u16(),
                etag,
                content_length: response.content_length(),
                body: Box::pin(response.bytes_stream().map(|chunk| chunk.map_err(map_error))),
            })
        }
    }

    fn map_error(error: reqwest::Error) -> TransportError {
        if error.is_timeout() {
            TransportError::Timeout
        } else if error.is_connect() {
            TransportError::Connect(error.to_string())
        } else {
            TransportError::Other(error.to_string())
        }
    }
}

#[cfg(feature = "reqwest")]
pub use reqwest_impl::ReqwestClient;
