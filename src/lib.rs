//! # muxrpc
//!
//! Multiplexed request/response calls over one persistent connection.
//!
//! This crate bundles the `muxrpc` server binary's built-in operations:
//! - `echo`: returns the request body unchanged
//! - `ping`: returns `pong`
//! - `info`: returns the server name and version as JSON

use bytes::Bytes;
use muxrpc_protocol::{BoxError, CallContext};
use muxrpc_server::{ServerError, Service, ServiceOptions};

/// Service name reported by `info`.
pub const NAME: &str = "muxrpc";

/// Version reported by `info`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Creates a service whose requests and responses are raw bytes.
pub fn bytes_service(options: ServiceOptions<Bytes>) -> Service<Bytes, Bytes> {
    Service::new(
        |_ctx, body: &[u8]| Ok(Bytes::copy_from_slice(body)),
        |_ctx, resp: &Bytes| Ok(resp.clone()),
        options,
    )
}

/// Registers `echo`, `ping` and `info` on `service`.
pub fn register_builtins(service: &Service<Bytes, Bytes>) -> Result<(), ServerError> {
    service.register("echo", echo)?;
    service.register("ping", ping)?;
    service.register("info", info)?;
    Ok(())
}

fn echo(_ctx: &CallContext, request: Bytes) -> Result<Bytes, BoxError> {
    Ok(request)
}

fn ping(_ctx: &CallContext, _request: Bytes) -> Result<Bytes, BoxError> {
    Ok(Bytes::from_static(b"pong"))
}

fn info(_ctx: &CallContext, _request: Bytes) -> Result<Bytes, BoxError> {
    let info = serde_json::json!({
        "name": NAME,
        "version": VERSION,
    });
    Ok(Bytes::from(serde_json::to_vec(&info)?))
}
