//! HTTP client action.
//!
//! Parameters: `url` (required), `method` (default `GET`), `headers`
//! (string-keyed mapping), `body` (arbitrary JSON), and an optional `expect`
//! shape evaluated against the response output through the assertion
//! evaluator.
//!
//! Output shape: `{ status_code, headers, body }`, plus an `assertions` list
//! when an `expect` block is present. Without `expect` the step succeeds on a
//! 2xx status; with it, the assertions decide.

use std::future::Future;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use reqwest::Method;
use serde_json::{Map as JsonMap, Value};
use tokio::runtime::Handle;
use tracing::debug;

use caseflow_engine::{Action, ExecutionContext, assertion};
use caseflow_types::{ActionResult, Step};

pub struct HttpAction {
    client: reqwest::Client,
}

impl HttpAction {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpAction {
    fn default() -> Self {
        Self::new()
    }
}

impl Action for HttpAction {
    fn execute(&self, step: &Step, context: &ExecutionContext) -> Result<ActionResult> {
        let params = step
            .params
            .as_object()
            .ok_or_else(|| anyhow!("http action requires mapping params"))?;
        let url = params
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("http action requires a 'url' parameter"))?;
        let method = params
            .get("method")
            .and_then(Value::as_str)
            .map(|raw| Method::from_str(&raw.to_ascii_uppercase()).map_err(|_| anyhow!("invalid http method '{raw}'")))
            .transpose()?
            .unwrap_or(Method::GET);

        let mut request = self.client.request(method.clone(), url);
        if let Some(Value::Object(headers)) = params.get("headers") {
            for (name, value) in headers {
                let text = match value {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                };
                request = request.header(name, text);
            }
        }
        if let Some(body) = params.get("body") {
            request = request.json(body);
        }

        debug!(step_id = %step.id, method = %method, url, "http request dispatch");

        let response = block_on_request(async move {
            let response = request.send().await.map_err(|error| anyhow!(error))?;
            let status = response.status();
            let mut headers = JsonMap::new();
            for (name, value) in response.headers() {
                if let Ok(text) = value.to_str() {
                    headers.insert(name.to_string(), Value::String(text.to_string()));
                }
            }
            let text = response.text().await.unwrap_or_default();
            let body = serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));
            Ok::<_, anyhow::Error>((status, headers, body))
        });

        let (status, headers, body) = match response {
            Ok(parts) => parts,
            Err(error) => return Ok(ActionResult::failure(format!("http request failed: {error}"))),
        };

        let mut output = JsonMap::new();
        output.insert("status_code".into(), Value::Number(status.as_u16().into()));
        output.insert("headers".into(), Value::Object(headers));
        output.insert("body".into(), body);

        let mut success = status.is_success();
        if let Some(expect) = params.get("expect") {
            let actual = Value::Object(output.clone());
            let results = assertion::evaluate(expect, Some(&actual), context);
            success = assertion::all_passed(&results);
            output.insert("assertions".into(), serde_json::to_value(&results)?);
        }

        Ok(ActionResult {
            success,
            output: Value::Object(output),
        })
    }
}

/// Drives a request future to completion from the synchronous action
/// boundary, reusing the ambient runtime when one is present.
fn block_on_request<T>(future: impl Future<Output = Result<T>>) -> Result<T> {
    if let Ok(handle) = Handle::try_current() {
        handle.block_on(future)
    } else {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("build http runtime")?
            .block_on(future)
    }
}
