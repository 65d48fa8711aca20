//! `http-request` action: send a GET or POST and log the response body.
//!
//! args:
//! - `url`: request URL
//! - `method`: `get` (default) or `post`, case-insensitive
//! - `headers`: object of string header values, optional
//! - `payload`: request body for `post`, optional

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use vocalis_core::Arguments;

use crate::error::ActionError;
use crate::handler::{required_str_arg, str_arg, Action};
use crate::types::ActionResult;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Method {
    Get,
    Post,
}

impl Method {
    fn parse(raw: Option<&str>) -> Result<Self, ActionError> {
        match raw.map(str::to_lowercase).as_deref() {
            None | Some("get") => Ok(Method::Get),
            Some("post") => Ok(Method::Post),
            Some(other) => Err(ActionError::InvalidArguments(format!(
                "unsupported method `{}`, expected get or post",
                other
            ))),
        }
    }
}

/// Sends one HTTP request per dispatch.
pub struct HttpRequestAction {
    timeout: Duration,
}

impl Default for HttpRequestAction {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl HttpRequestAction {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

fn headers(args: Option<&Arguments>) -> Result<Vec<(String, String)>, ActionError> {
    match args.and_then(|a| a.get("headers")) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Object(map)) => map
            .iter()
            .map(|(name, value)| match value {
                Value::String(v) => Ok((name.clone(), v.clone())),
                _ => Err(ActionError::InvalidArguments(format!(
                    "header `{}` must be a string",
                    name
                ))),
            })
            .collect(),
        Some(_) => Err(ActionError::InvalidArguments(
            "`headers` must be an object".into(),
        )),
    }
}

#[async_trait]
impl Action for HttpRequestAction {
    fn name(&self) -> &str {
        "http-request"
    }

    async fn perform(&self, args: Option<&Arguments>) -> Result<ActionResult, ActionError> {
        let url = required_str_arg(args, "url")?;
        let method = Method::parse(str_arg(args, "method")?)?;
        let headers = headers(args)?;
        let payload = str_arg(args, "payload")?.unwrap_or_default();

        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| ActionError::Failed(format!("failed to build http client: {}", e)))?;

        let mut request = match method {
            Method::Get => client.get(url),
            Method::Post => client.post(url).body(payload.to_string()),
        };
        for (name, value) in &headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| ActionError::Failed(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ActionError::Failed(format!(
                "{} answered with status {}",
                url, status
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ActionError::Failed(format!("failed to read response: {}", e)))?;

        tracing::info!(url = %url, status = status.as_u16(), body = %body, "HTTP response");

        Ok(ActionResult::message(format!(
            "{:?} {} -> {}",
            method,
            url,
            status.as_u16()
        )))
    }

    fn describe(&self, args: Option<&Arguments>) -> String {
        let url = required_str_arg(args, "url").unwrap_or("<no url>");
        let method = str_arg(args, "method").ok().flatten().unwrap_or("get");
        format!("HTTP {}: {}", method.to_uppercase(), url)
    }
}
