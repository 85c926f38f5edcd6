use anyhow::Result;
use serde_json::{json, Value};
use stockscraper_lib::InvocationResponse;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// The response exactly as a function runtime would return it.
    Raw,
    /// The response with its body decoded, pretty-printed.
    Json,
}

pub fn render_response(resp: &InvocationResponse, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Raw => Ok(serde_json::to_string(resp)?),
        OutputFormat::Json => {
            // Non-JSON bodies are shown as plain strings
            let body = resp
                .body_json()
                .unwrap_or_else(|_| Value::String(resp.body.clone()));
            let decoded = json!({ "statusCode": resp.status_code, "body": body });
            Ok(serde_json::to_string_pretty(&decoded)?)
        }
    }
}

pub fn print_response(resp: &InvocationResponse, format: OutputFormat) -> Result<()> {
    println!("{}", render_response(resp, format)?);
    Ok(())
}
