//! JSON-RPC server over Unix socket.
//!
//! Listens on a Unix domain socket, accepts connections, and dispatches
//! JSON-RPC method calls to the appropriate command handlers. One request
//! or response per line. `subscribe_events` turns the connection into a
//! one-way stream of event notifications.

use std::path::PathBuf;
use std::sync::Arc;

use cadence_oracle::OracleError;
use cadence_sentry::SentryError;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};

use crate::commands;
use crate::events::EventFilter;
use crate::DaemonState;

/// JSON-RPC request.
#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    /// JSON-RPC version (must be "2.0").
    pub jsonrpc: String,
    /// Request ID.
    pub id: serde_json::Value,
    /// Method name.
    pub method: String,
    /// Parameters.
    #[serde(default)]
    pub params: serde_json::Value,
}

/// JSON-RPC success response.
#[derive(Debug, Serialize)]
pub struct RpcResponse {
    /// JSON-RPC version.
    pub jsonrpc: String,
    /// Request ID.
    pub id: serde_json::Value,
    /// Result or error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

/// JSON-RPC error object.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RpcError {
    /// Error code.
    pub code: i32,
    /// Error name.
    pub message: String,
    /// Optional structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcResponse {
    /// Create a success response.
    pub fn success(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: serde_json::Value, error: RpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

impl RpcError {
    fn new(code: i32, message: &str, data: Option<serde_json::Value>) -> Self {
        Self {
            code,
            message: message.to_string(),
            data,
        }
    }

    // Standard JSON-RPC errors

    /// Parse error (-32700).
    pub fn parse_error() -> Self {
        Self::new(-32700, "PARSE_ERROR", None)
    }

    /// Invalid request (-32600).
    pub fn invalid_request() -> Self {
        Self::new(-32600, "INVALID_REQUEST", None)
    }

    /// Method not found (-32601).
    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            -32601,
            "METHOD_NOT_FOUND",
            Some(serde_json::json!({"method": method})),
        )
    }

    /// Invalid params (-32602).
    pub fn invalid_params(detail: &str) -> Self {
        Self::new(
            -32602,
            "INVALID_PARAMS",
            Some(serde_json::json!({"detail": detail})),
        )
    }

    /// Internal error (-32603).
    pub fn internal_error(detail: &str) -> Self {
        Self::new(
            -32603,
            "INTERNAL_ERROR",
            Some(serde_json::json!({"detail": detail})),
        )
    }

    /// Sentry refused the caller's action (-32074).
    pub fn sentry_rejected(account: &str) -> Self {
        Self::new(
            -32074,
            "SENTRY_REJECTED",
            Some(serde_json::json!({"account": account})),
        )
    }
}

impl From<OracleError> for RpcError {
    fn from(err: OracleError) -> Self {
        let detail = Some(serde_json::json!({"detail": err.to_string()}));
        match &err {
            OracleError::EpochNotElapsed { now, next_epoch_at } => Self::new(
                -32070,
                "EPOCH_NOT_ELAPSED",
                Some(serde_json::json!({"now": now, "next_epoch_at": next_epoch_at})),
            ),
            OracleError::DivisionByZero => Self::new(-32071, "DIVISION_BY_ZERO", None),
            OracleError::UnknownAsset(asset) => Self::new(
                -32072,
                "UNKNOWN_ASSET",
                Some(serde_json::json!({"asset": asset})),
            ),
            OracleError::ReserveOverflow(_) | OracleError::Configuration(_) => {
                Self::new(-32602, "INVALID_PARAMS", detail)
            }
            OracleError::Source(_) => Self::new(-32603, "INTERNAL_ERROR", detail),
        }
    }
}

impl From<SentryError> for RpcError {
    fn from(err: SentryError) -> Self {
        match &err {
            SentryError::Unauthorized(caller) => Self::new(
                -32073,
                "UNAUTHORIZED",
                Some(serde_json::json!({"caller": caller})),
            ),
            SentryError::StrategyState(_) => Self::internal_error(&err.to_string()),
            _ => Self::invalid_params(&err.to_string()),
        }
    }
}

/// The RPC server.
pub struct RpcServer {
    state: Arc<DaemonState>,
    socket_path: PathBuf,
}

impl RpcServer {
    /// Create a new RPC server.
    pub fn new(state: Arc<DaemonState>, socket_path: PathBuf) -> Self {
        Self { state, socket_path }
    }

    /// Run the server, accepting connections.
    pub async fn run(&self) -> anyhow::Result<()> {
        // Remove stale socket file
        let _ = std::fs::remove_file(&self.socket_path);

        let listener = UnixListener::bind(&self.socket_path)?;
        info!("IPC server listening on {:?}", self.socket_path);

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    let state = self.state.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(state, stream).await {
                            warn!("Connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }
    }
}

/// Handle a single client connection.
async fn handle_connection(
    state: Arc<DaemonState>,
    stream: tokio::net::UnixStream,
) -> anyhow::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            break; // EOF
        }

        let request = match serde_json::from_str::<RpcRequest>(&line) {
            Ok(request) => request,
            Err(_) => {
                let response = RpcResponse::error(serde_json::Value::Null, RpcError::parse_error());
                write_line(&mut writer, &response).await?;
                continue;
            }
        };

        if request.method == "subscribe_events" {
            let filter: EventFilter = match serde_json::from_value(request.params.clone()) {
                Ok(filter) => filter,
                Err(_) if request.params.is_null() => EventFilter::default(),
                Err(e) => {
                    let err = RpcError::invalid_params(&e.to_string());
                    write_line(&mut writer, &RpcResponse::error(request.id, err)).await?;
                    continue;
                }
            };
            let ack = serde_json::json!({"subscribed": true});
            write_line(&mut writer, &RpcResponse::success(request.id, ack)).await?;
            return stream_events(&state, filter, &mut writer).await;
        }

        let response = dispatch_request(&state, request).await;
        write_line(&mut writer, &response).await?;
    }

    Ok(())
}

/// Forward matching events as `event` notifications until the client goes
/// away or the bus closes.
async fn stream_events<W: AsyncWrite + Unpin>(
    state: &DaemonState,
    filter: EventFilter,
    writer: &mut W,
) -> anyhow::Result<()> {
    let mut rx = state.event_bus.subscribe();
    loop {
        match rx.recv().await {
            Ok(event) if filter.matches(&event) => {
                let notification = serde_json::json!({
                    "jsonrpc": "2.0",
                    "method": "event",
                    "params": event,
                });
                write_line(writer, &notification).await?;
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "event subscriber lagged");
            }
            Err(RecvError::Closed) => return Ok(()),
        }
    }
}

async fn write_line<W: AsyncWrite + Unpin, T: Serialize>(
    writer: &mut W,
    value: &T,
) -> anyhow::Result<()> {
    let mut json = serde_json::to_string(value)?;
    json.push('\n');
    writer.write_all(json.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Dispatch a JSON-RPC request to the appropriate command handler.
pub async fn dispatch_request(state: &Arc<DaemonState>, request: RpcRequest) -> RpcResponse {
    let id = request.id.clone();
    if request.jsonrpc != "2.0" {
        return RpcResponse::error(id, RpcError::invalid_request());
    }
    let method = request.method.as_str();
    let params = &request.params;

    debug!("Dispatching RPC method: {}", method);

    let result = match method {
        // Oracle commands
        "get_oracle_state" => commands::oracle::get_oracle_state(state).await,
        "consult" => commands::oracle::consult(state, params).await,
        "twap" => commands::oracle::twap(state, params).await,
        "update" => commands::oracle::update(state).await,

        // Venue commands
        "sync_reserves" => commands::oracle::sync_reserves(state, params).await,
        "swap" => commands::oracle::swap(state, params).await,

        // Sentry commands
        "is_allowed" => commands::sentry::is_allowed(state, params).await,
        "get_sentry_strategies" => commands::sentry::get_sentry_strategies(state).await,
        "add_allow_list_strategy" => commands::sentry::add_allow_list_strategy(state, params).await,
        "remove_sentry_strategy" => commands::sentry::remove_sentry_strategy(state, params).await,
        "update_sanctions_list" => commands::sentry::update_sanctions_list(state, params).await,
        "grant_admin" => commands::sentry::grant_admin(state, params).await,
        "revoke_admin" => commands::sentry::revoke_admin(state, params).await,

        // System
        "shutdown" => {
            let _ = state.shutdown_tx.send(());
            Ok(serde_json::json!({"stopping": true}))
        }

        _ => Err(RpcError::method_not_found(method)),
    };

    match result {
        Ok(value) => RpcResponse::success(id, value),
        Err(err) => RpcResponse::error(id, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::state_at;
    use cadence_types::Address;

    fn request(method: &str, params: serde_json::Value) -> RpcRequest {
        RpcRequest {
            jsonrpc: "2.0".to_string(),
            id: serde_json::json!(1),
            method: method.to_string(),
            params,
        }
    }

    #[test]
    fn test_rpc_error_codes() {
        let err = RpcError::method_not_found("unknown");
        assert_eq!(err.code, -32601);

        let err: RpcError = OracleError::DivisionByZero.into();
        assert_eq!(err.code, -32071);
        assert_eq!(err.message, "DIVISION_BY_ZERO");

        let err: RpcError = OracleError::EpochNotElapsed {
            now: 1,
            next_epoch_at: 2,
        }
        .into();
        assert_eq!(err.code, -32070);

        let err: RpcError = OracleError::UnknownAsset(Address::ZERO).into();
        assert_eq!(err.code, -32072);

        let err: RpcError = SentryError::Unauthorized(Address::ZERO).into();
        assert_eq!(err.code, -32073);

        let err: RpcError = SentryError::CapacityReached { max: 10 }.into();
        assert_eq!(err.code, -32602);
    }

    #[test]
    fn test_rpc_response_success() {
        let resp = RpcResponse::success(serde_json::json!(1), serde_json::json!({"epoch": 0}));
        assert!(resp.result.is_some());
        assert!(resp.error.is_none());
    }

    #[tokio::test]
    async fn test_dispatch_unknown_method() {
        let (state, _clock) = state_at(1_700_000_000);
        let resp = dispatch_request(&state, request("nope", serde_json::Value::Null)).await;
        assert_eq!(resp.error.expect("error").code, -32601);
    }

    #[tokio::test]
    async fn test_dispatch_rejects_wrong_version() {
        let (state, _clock) = state_at(1_700_000_000);
        let mut req = request("get_oracle_state", serde_json::Value::Null);
        req.jsonrpc = "1.0".to_string();
        let resp = dispatch_request(&state, req).await;
        assert_eq!(resp.error.expect("error").code, -32600);
    }

    #[tokio::test]
    async fn test_dispatch_update_before_epoch() {
        let (state, _clock) = state_at(1_700_000_000);
        let resp = dispatch_request(&state, request("update", serde_json::Value::Null)).await;
        assert_eq!(resp.error.expect("error").code, -32070);
    }

    #[tokio::test]
    async fn test_stream_events_forwards_matching() {
        let (state, _clock) = state_at(1_700_000_000);
        let (client, mut server) = tokio::io::duplex(4096);
        let filter = EventFilter {
            categories: Some(vec!["sentry".to_string()]),
        };

        let stream_state = state.clone();
        let task = tokio::spawn(async move {
            stream_events(&stream_state, filter, &mut server).await
        });
        // Let the stream subscribe before emitting.
        while state.event_bus.subscriber_count() == 0 {
            tokio::task::yield_now().await;
        }

        state.event_bus.emit(cadence_types::events::Event::new(
            cadence_types::events::EventType::Updated,
            1,
            serde_json::json!({}),
        ));
        state.event_bus.emit(cadence_types::events::Event::new(
            cadence_types::events::EventType::AddSentryStrategy,
            2,
            serde_json::json!({"strategy": "x"}),
        ));

        let mut lines = BufReader::new(client).lines();
        let first = lines.next_line().await.expect("read").expect("line");
        let value: serde_json::Value = serde_json::from_str(&first).expect("json");
        assert_eq!(value["method"], "event");
        assert_eq!(value["params"]["event_type"], "add_sentry_strategy");

        task.abort();
    }
}
