use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};

use crate::{config::ZkLoginConfig, error::ZkLoginError};

/// A simple wrapper on an HTTP client for making requests. Sets sensible defaults such as timeouts,
/// user-agent & ensuring HTTPS.
///
/// Requests are never retried: every retry is a fresh, user-initiated attempt.
#[derive(Debug, Clone)]
pub struct Request {
    client: reqwest::Client,
    timeout: Duration,
    allow_insecure_http: bool,
}

impl Request {
    /// Initializes a new `Request` instance from the crate configuration.
    pub(crate) fn new(config: &ZkLoginConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout: config.request_timeout(),
            allow_insecure_http: config.allow_insecure_http,
        }
    }

    /// Creates a request builder with defaults applied.
    pub(crate) fn req(&self, method: Method, url: &str) -> Result<RequestBuilder, ZkLoginError> {
        let secure = url.starts_with("https://");
        if !secure && !(self.allow_insecure_http && url.starts_with("http://")) {
            return Err(ZkLoginError::invalid_input(
                "url",
                format!("refusing non-https request to {url}"),
            ));
        }

        Ok(self
            .client
            .request(method, url)
            .timeout(self.timeout)
            .header(
                "User-Agent",
                format!("zklogin-core/{}", env!("CARGO_PKG_VERSION")),
            ))
    }

    /// Creates a POST request builder with a JSON body and defaults applied.
    pub(crate) fn post_json<T: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
    ) -> Result<RequestBuilder, ZkLoginError> {
        Ok(self.req(Method::POST, url)?.json(body))
    }

    /// Sends a request built by `req`/`post_json`. Non-2xx responses become
    /// [`ZkLoginError::NetworkFailure`]; elapsed timeouts become [`ZkLoginError::Timeout`].
    pub(crate) async fn handle(
        &self,
        request_builder: RequestBuilder,
    ) -> Result<Response, ZkLoginError> {
        let (client, request) = request_builder.build_split();
        let request = request.map_err(|err| ZkLoginError::NetworkFailure {
            url: err
                .url()
                .map_or_else(|| "<unknown>".to_string(), ToString::to_string),
            status: None,
            error: format!("request build failed: {err}"),
        })?;
        let url = request.url().to_string();

        let response = client.execute(request).await.map_err(|err| {
            if err.is_timeout() {
                ZkLoginError::Timeout { url: url.clone() }
            } else {
                ZkLoginError::NetworkFailure {
                    url: url.clone(),
                    status: None,
                    error: format!("request failed: {err}"),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("Unknown error"));
            return Err(ZkLoginError::NetworkFailure {
                url,
                status: Some(status.as_u16()),
                error: body,
            });
        }
        Ok(response)
    }

    /// Sends a request and returns the raw response body.
    pub(crate) async fn handle_text(
        &self,
        request_builder: RequestBuilder,
    ) -> Result<String, ZkLoginError> {
        let response = self.handle(request_builder).await?;
        let url = response.url().to_string();
        response.text().await.map_err(|err| {
            if err.is_timeout() {
                ZkLoginError::Timeout { url }
            } else {
                ZkLoginError::NetworkFailure {
                    url,
                    status: None,
                    error: format!("failed to read response body: {err}"),
                }
            }
        })
    }

    /// Sends a request and decodes the JSON response body.
    pub(crate) async fn handle_json<T: DeserializeOwned>(
        &self,
        request_builder: RequestBuilder,
    ) -> Result<T, ZkLoginError> {
        let body = self.handle_text(request_builder).await?;
        serde_json::from_str(&body).map_err(|e| ZkLoginError::SerializationError {
            error: format!("unexpected response body: {e}"),
        })
    }
}
