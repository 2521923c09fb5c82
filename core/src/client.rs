//! Request dispatch: composition, authentication, transport and decoding.
//!
//! # Design
//! `Client` holds the frozen configuration and a `Transport`, nothing else.
//! Every call composes a fresh `HttpRequest` (absolute URL, credential,
//! JSON body), hands it to the transport and classifies the response:
//!
//! 1. status `>= 300` is an `HttpStatus` error, the body is never decoded;
//! 2. a 204 yields the target's default value, anything else is decoded;
//! 3. only 200 and 204 count as success. Other 2xx codes, 201 included, are
//!    reported as `HttpStatus` anomalies. This strict allow-list is kept on
//!    purpose until the product owner confirms whether 201 should pass.
//!
//! Nothing is retried; every error goes back to the caller.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::companies::Companies;
use crate::config::ClientConfig;
use crate::endpoint::{compose_url, resolve_object_path};
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, APPLICATION_JSON, CONTENT_TYPE};
use crate::resource::Resource;
use crate::transport::{Transport, UreqTransport};

/// Status codes accepted as success.
const SUCCESS_STATUSES: [u16; 2] = [200, 204];

/// Authenticated dispatcher for the CRM API.
///
/// Cheap to clone; clones share the configuration. Safe to use from several
/// threads at once: building a request touches no shared mutable state.
#[derive(Clone)]
pub struct Client<T = UreqTransport> {
    config: Arc<ClientConfig>,
    transport: T,
}

impl Client<UreqTransport> {
    /// Client over the blocking ureq transport, bounded by the configured
    /// timeouts.
    pub fn new(config: ClientConfig) -> Self {
        let transport = UreqTransport::new(&config.timeouts);
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> Client<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self {
            config: Arc::new(config),
            transport,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Object path for `object` under `version` (empty selects the default).
    pub fn object_path(&self, object: &str, subpath: &str, version: &str) -> Result<String, ApiError> {
        resolve_object_path(object, subpath, version)
    }

    /// Facade over an arbitrary object type, e.g. `"contacts"`.
    pub fn resource(&self, object: &str) -> Resource<'_, T> {
        Resource::new(self, object)
    }

    pub fn companies(&self) -> Companies<'_, T> {
        Companies::new(self)
    }

    /// Compose the request for `endpoint` on the configured host and attach
    /// the configured credential.
    pub fn build_request(
        &self,
        method: HttpMethod,
        endpoint: &str,
        body: Option<String>,
    ) -> Result<HttpRequest, ApiError> {
        let mut url = compose_url(&self.config.api_host, endpoint)?;
        let mut headers = Vec::new();
        if body.is_some() {
            headers.push((CONTENT_TYPE.to_string(), APPLICATION_JSON.to_string()));
        }
        self.config.credentials().apply(&mut url, &mut headers);
        Ok(HttpRequest {
            method,
            url: url.into(),
            headers,
            body,
        })
    }

    /// Dispatch a body-less request and decode the response into `R`.
    pub fn request<R>(&self, method: HttpMethod, endpoint: &str) -> Result<R, ApiError>
    where
        R: DeserializeOwned + Default,
    {
        let request = self.build_request(method, endpoint, None)?;
        self.exchange(&request)
    }

    /// Dispatch `data` as a JSON body and decode the response into `R`.
    pub fn request_with<D, R>(&self, method: HttpMethod, endpoint: &str, data: &D) -> Result<R, ApiError>
    where
        D: Serialize + ?Sized,
        R: DeserializeOwned + Default,
    {
        let body = encode_body(data)?;
        let request = self.build_request(method, endpoint, Some(body))?;
        self.exchange(&request)
    }

    /// Dispatch a body-less request whose response body is not needed.
    pub fn request_no_content(&self, method: HttpMethod, endpoint: &str) -> Result<(), ApiError> {
        let request = self.build_request(method, endpoint, None)?;
        let response = self.send(&request)?;
        check_allow_list(&request, &response)
    }

    fn exchange<R>(&self, request: &HttpRequest) -> Result<R, ApiError>
    where
        R: DeserializeOwned + Default,
    {
        let response = self.send(request)?;
        let value = decode(request, &response)?;
        check_allow_list(request, &response)?;
        Ok(value)
    }

    /// Run the exchange and turn any status `>= 300` into an error.
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        debug!(method = %request.method, url = %request.redacted_url(), "dispatching request");
        let response = self.transport.execute(request)?;
        debug!(status = response.status, bytes = response.body.len(), "received response");
        if response.status >= 300 {
            return Err(status_error(request, &response));
        }
        Ok(response)
    }
}

fn encode_body<D: Serialize + ?Sized>(data: &D) -> Result<String, ApiError> {
    serde_json::to_string(data).map_err(|e| ApiError::Serialization(e.to_string()))
}

fn decode<R>(request: &HttpRequest, response: &HttpResponse) -> Result<R, ApiError>
where
    R: DeserializeOwned + Default,
{
    if response.status == 204 {
        return Ok(R::default());
    }
    serde_json::from_str(&response.body).map_err(|e| ApiError::Decode {
        message: e.to_string(),
        url: request.redacted_url(),
        body: response.body.clone(),
    })
}

fn check_allow_list(request: &HttpRequest, response: &HttpResponse) -> Result<(), ApiError> {
    if SUCCESS_STATUSES.contains(&response.status) {
        return Ok(());
    }
    warn!(
        status = response.status,
        url = %request.redacted_url(),
        "status outside the success allow-list"
    );
    Err(status_error(request, response))
}

fn status_error(request: &HttpRequest, response: &HttpResponse) -> ApiError {
    ApiError::HttpStatus {
        status: response.status,
        reason: response.reason().to_string(),
        url: request.redacted_url(),
        body: response.body.clone(),
    }
}
