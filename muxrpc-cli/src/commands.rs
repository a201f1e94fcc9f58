//! Command execution.

use crate::Commands;
use bytes::Bytes;
use colored::Colorize;
use muxrpc_client::Client;
use muxrpc_protocol::{BoxError, CallContext};
use serde_json::Value;

/// Request bodies go out unchanged.
pub fn encode_body(_ctx: &CallContext, body: &Bytes) -> Result<Bytes, BoxError> {
    Ok(body.clone())
}

pub fn decode_body(_ctx: &CallContext, body: &[u8]) -> Result<Bytes, BoxError> {
    Ok(Bytes::copy_from_slice(body))
}

/// Executes a command and returns the formatted output.
pub async fn execute(
    client: &Client<Bytes, Bytes>,
    cmd: Commands,
) -> Result<String, Box<dyn std::error::Error>> {
    match cmd {
        Commands::Ping => {
            let reply = client.invoke("ping", &Bytes::new()).await?;
            Ok(String::from_utf8_lossy(&reply).to_uppercase().green().to_string())
        }

        Commands::Info => {
            let reply = client.invoke("info", &Bytes::new()).await?;
            let info: Value = serde_json::from_slice(&reply)?;
            Ok(format_json(&info))
        }

        Commands::Call {
            operation,
            body,
            json,
        } => {
            let request = match body {
                Some(arg) => read_body_arg(&arg)?,
                None => Bytes::new(),
            };
            let reply = client.invoke(&operation, &request).await?;
            Ok(format_reply(&reply, json))
        }
    }
}

/// Reads a body argument (either inline text or @file).
fn read_body_arg(arg: &str) -> Result<Bytes, Box<dyn std::error::Error>> {
    if let Some(path) = arg.strip_prefix('@') {
        Ok(Bytes::from(std::fs::read(path)?))
    } else {
        Ok(Bytes::copy_from_slice(arg.as_bytes()))
    }
}

/// Formats a reply body for display.
fn format_reply(reply: &[u8], json: bool) -> String {
    if json {
        if let Ok(value) = serde_json::from_slice::<Value>(reply) {
            return format_json(&value);
        }
    }
    match std::str::from_utf8(reply) {
        Ok(text) => text.to_string(),
        Err(_) => format!("{} ({} bytes)", hex_dump(reply), reply.len()),
    }
}

fn hex_dump(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Formats JSON for display.
fn format_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
