use std::future::Future;

use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use serde_json::{Map, Value};
use url::Url;

use crate::request::ParameterEncoding;

/// One fully-resolved HTTP call handed to an [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub params: Option<Map<String, Value>>,
    pub encoding: ParameterEncoding,
}

/// Raw HTTP response: status plus undecoded body.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl TransportResponse {
    #[must_use]
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Body as (lossy) UTF-8 text.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// No usable HTTP response was obtained.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
    /// Set when the status line arrived but the body could not be read.
    pub status: Option<StatusCode>,
}

impl TransportError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }
}

impl From<TransportError> for crate::Error {
    fn from(e: TransportError) -> Self {
        Self::Transport {
            message: e.message,
            status: e.status.map(|s| s.as_u16()),
        }
    }
}

/// Consumer-replaceable HTTP layer.
///
/// The executor never touches the network directly; it builds a
/// [`TransportRequest`] and lets the transport encode parameters per
/// [`ParameterEncoding`] and perform I/O.
pub trait HttpTransport: Send + Sync + 'static {
    fn send(
        &self,
        request: TransportRequest,
    ) -> impl Future<Output = Result<TransportResponse, TransportError>> + Send;
}

#[cfg(feature = "reqwest")]
pub use self::reqwest_transport::ReqwestTransport;

#[cfg(feature = "reqwest")]
mod reqwest_transport {
    use super::{HttpTransport, TransportError, TransportRequest, TransportResponse};
    use crate::config::ClientConfig;
    use crate::error::Error;
    use crate::request::{ParameterEncoding, url_encoded_pairs};

    /// [`HttpTransport`] backed by a [`reqwest::Client`].
    #[derive(Debug, Clone, Default)]
    pub struct ReqwestTransport {
        http: reqwest::Client,
    }

    impl ReqwestTransport {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Build a client with the configured timeout and user agent.
        ///
        /// # Errors
        ///
        /// Returns [`Error::Config`] if the TLS backend fails to initialise.
        pub fn from_config(config: &ClientConfig) -> Result<Self, Error> {
            let http = reqwest::Client::builder()
                .timeout(config.timeout())
                .user_agent(config.user_agent())
                .build()
                .map_err(|e| Error::Config(format!("http client: {e}")))?;
            Ok(Self { http })
        }

        /// Use a custom HTTP client (for connection pool reuse or testing).
        #[must_use]
        pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
            self.http = client;
            self
        }
    }

    impl HttpTransport for ReqwestTransport {
        async fn send(
            &self,
            request: TransportRequest,
        ) -> Result<TransportResponse, TransportError> {
            let TransportRequest {
                method,
                url,
                headers,
                params,
                encoding,
            } = request;

            let uses_query = encoding.uses_query(&method);
            let mut builder = self.http.request(method, url).headers(headers);

            if let Some(params) = params {
                builder = match encoding {
                    ParameterEncoding::Json => builder.json(&params),
                    ParameterEncoding::Url if uses_query => {
                        builder.query(&url_encoded_pairs(&params))
                    }
                    ParameterEncoding::Url => builder.form(&url_encoded_pairs(&params)),
                };
            }

            let response = builder.send().await.map_err(from_reqwest)?;
            let status = response.status();
            let body = response
                .bytes()
                .await
                .map_err(|e| from_reqwest(e).with_status(status))?;

            Ok(TransportResponse { status, body })
        }
    }

    fn from_reqwest(e: reqwest::Error) -> TransportError {
        let err = TransportError::new(e.to_string());
        match e.status() {
            Some(status) => err.with_status(status),
            None => err,
        }
    }
}
