//! Streaming transport to the assistant endpoint.
//!
//! The endpoint is a single POST route accepting `{ "message": ... }` with an
//! optional bearer header and answering with a body of newline-delimited JSON
//! fragments. The transport only moves bytes; framing and interpretation live
//! in the decoder and the assembler.

use crate::{Result, ShopchatError};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use shopchat_types::ChatRequest;
use std::time::Duration;

/// Raw response byte stream yielded by a transport.
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// Synchronous source of the bearer credential.
///
/// `None` means guest mode: the request goes out without an Authorization
/// header and the endpoint answers unauthenticated. Composing and sending
/// work either way.
pub trait CredentialProvider: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

/// Fixed credential, or guest mode when constructed with [`guest`].
///
/// [`guest`]: StaticCredentials::guest
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    token: Option<String>,
}

impl StaticCredentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    pub fn guest() -> Self {
        Self { token: None }
    }
}

impl CredentialProvider for StaticCredentials {
    fn bearer_token(&self) -> Option<String> {
        self.token.clone()
    }
}

/// Opens one response stream per send.
#[async_trait]
pub trait StreamingTransport: Send + Sync {
    /// Issue the request and return the raw response byte stream.
    ///
    /// A non-success HTTP status is a transport error; the caller never sees
    /// the body of a failed response.
    async fn open(&self, message: &str, bearer: Option<&str>) -> Result<ByteStream>;
}

/// Production transport: POST to the streaming endpoint over HTTP.
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    /// Transport with a connect timeout.
    pub fn with_connect_timeout(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl StreamingTransport for HttpTransport {
    async fn open(&self, message: &str, bearer: Option<&str>) -> Result<ByteStream> {
        let mut request = self.client.post(&self.endpoint).json(&ChatRequest {
            message: message.to_string(),
        });
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(
                target: "shopchat::transport",
                "Endpoint answered {} for {}",
                status,
                self.endpoint
            );
            return Err(ShopchatError::BadStatus(status.as_u16()));
        }

        Ok(response
            .bytes_stream()
            .map(|item| item.map_err(|e| ShopchatError::StreamRead(e.to_string())))
            .boxed())
    }
}
