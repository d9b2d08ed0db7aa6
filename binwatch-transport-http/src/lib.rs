//! Transport implementation posting status documents with a blocking reqwest client.

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::trace;

use binwatch_core::{
    ports::{RequestConfig, RequestHandle, Transport, TransportError, TransportResponse},
    settings::DeliverySettings,
};

/// HTTP transport sharing one connection pool between all requests.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport bound to the given HTTP client.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the delivery settings.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when the client cannot be constructed.
    pub fn from_settings(settings: &DeliverySettings) -> Result<Self, TransportError> {
        let client = Client::builder()
            .user_agent(settings.user_agent.as_str())
            .connect_timeout(settings.timeout())
            .build()?;
        Ok(Self::new(client))
    }
}

impl Transport for HttpTransport {
    fn open(&self, config: &RequestConfig) -> Result<Box<dyn RequestHandle>, TransportError> {
        trace!(url = %config.url, method = %config.method, "opening request");
        Ok(Box::new(HttpRequest {
            client: self.client.clone(),
            config: config.clone(),
            headers: HeaderMap::new(),
        }))
    }
}

/// One request; headers accumulate until [`RequestHandle::perform`] sends it.
struct HttpRequest {
    client: Client,
    config: RequestConfig,
    headers: HeaderMap,
}

impl RequestHandle for HttpRequest {
    fn set_header(&mut self, name: &str, value: &str) -> Result<(), TransportError> {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|err| TransportError::Request(format!("header name {name:?}: {err}")))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|err| TransportError::Request(format!("header {name}: {err}")))?;
        self.headers.insert(header_name, header_value);
        Ok(())
    }

    fn perform(&mut self, body: &[u8]) -> Result<TransportResponse, TransportError> {
        let response = self
            .client
            .request(self.config.method.clone(), self.config.url.clone())
            .headers(self.headers.clone())
            .timeout(self.config.timeout)
            .body(body.to_vec())
            .send()?;

        // The response body carries nothing the device needs.
        Ok(TransportResponse {
            status: response.status().as_u16(),
        })
    }
}
