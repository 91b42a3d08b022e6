use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde_json::{Value, json};
use sgmcp_core::constants;
use sgmcp_core::error::ConfigError;
use std::time::Duration;
use thiserror::Error;

/// Longest slice of an error body kept for logs.
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Why a GraphQL round trip failed before a JSON document came back.
#[derive(Error, Debug)]
pub(crate) enum GraphqlFailure {
    #[error("request failed: {0}")]
    Request(String),

    #[error("http {status}: {body}")]
    Status { status: u16, body: String },

    #[error("response is not JSON: {0}")]
    Decode(String),
}

/// Blocking GraphQL transport shared by the search and content backends.
///
/// Holds only fixed configuration; safe to share between threads.
#[derive(Debug, Clone)]
pub(crate) struct GraphqlTransport {
    client: Client,
    endpoint: String,
    api_url: String,
    token: Option<String>,
}

impl GraphqlTransport {
    pub(crate) fn new(
        endpoint: &str,
        token: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let endpoint = endpoint.trim().trim_end_matches('/').to_string();
        if endpoint.is_empty() {
            return Err(ConfigError::MissingRequired("upstream.endpoint".into()));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::invalid_value("upstream", e.to_string()))?;
        Ok(Self {
            client,
            api_url: format!("{}{}", endpoint, constants::GRAPHQL_API_PATH),
            endpoint,
            token: token
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
        })
    }

    pub(crate) fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST a GraphQL document and return the decoded JSON body as-is.
    pub(crate) fn execute(&self, document: &str, variables: Value) -> Result<Value, GraphqlFailure> {
        let payload = json!({
            "query": document,
            "variables": variables,
        });

        let mut request = self
            .client
            .post(&self.api_url)
            .header(CONTENT_TYPE, "application/json")
            .header(USER_AGENT, concat!("sgmcp/", env!("CARGO_PKG_VERSION")))
            .json(&payload);
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("token {}", token));
        }

        let response = request
            .send()
            .map_err(|e| GraphqlFailure::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(GraphqlFailure::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        response
            .json::<Value>()
            .map_err(|e| GraphqlFailure::Decode(e.to_string()))
    }
}

/// Messages from a GraphQL `errors` array, in order.
pub(crate) fn graphql_errors(body: &Value) -> Vec<String> {
    body.get("errors")
        .and_then(Value::as_array)
        .map(|errors| {
            errors
                .iter()
                .map(|e| {
                    e.get("message")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .unwrap_or_else(|| e.to_string())
                })
                .collect()
        })
        .unwrap_or_default()
}
