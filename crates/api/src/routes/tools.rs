//! `/tools/:name` (spec.md §6): both routes decode the same
//! `{"tool": name, "input": <body>}` shape into a `ToolRequest` and dispatch
//! it through `ragsmith_mcp_tools`. The envelope itself is the contract —
//! this layer always answers 200 with `{success, ...}` or `{success:false,
//! error, error_type}`, except for a body that isn't even valid JSON.

use crate::server::AppState;
use async_stream::stream;
use axum::{
    extract::{Path, State},
    response::sse::{Event, Sse},
    response::Json,
};
use futures::stream::Stream;
use ragsmith_mcp_tools::{dispatch, ToolRequest};
use serde_json::{json, Value};
use std::convert::Infallible;
use tracing::{info, instrument, warn};

fn build_request(name: &str, input: Value) -> Result<ToolRequest, serde_json::Error> {
    serde_json::from_value(json!({"tool": name, "input": input}))
}

#[instrument(skip(state, body), fields(tool = %name))]
pub async fn call_tool(State(state): State<AppState>, Path(name): Path<String>, body: Option<Json<Value>>) -> Json<Value> {
    let input = body.map(|Json(v)| v).unwrap_or_else(|| json!({}));
    let response = match build_request(&name, input) {
        Ok(request) => {
            info!("dispatching tool call");
            dispatch(&state.deps, request).await
        }
        Err(e) => {
            warn!(error = %e, "unknown tool or malformed input");
            json!({
                "success": false,
                "error": format!("unknown tool `{name}` or malformed input: {e}"),
                "error_type": "validation_error",
            })
        }
    };
    Json(response)
}

/// Same dispatch as `call_tool`, wrapped in a single server-sent event so
/// clients that hold a long-lived SSE connection for every call get a
/// uniform transport (spec.md §6 names SSE-over-HTTP as a transport choice,
/// not a multi-event push protocol for these request/response operations).
#[instrument(skip(state, body), fields(tool = %name))]
pub async fn stream_tool(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Option<Json<Value>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let input = body.map(|Json(v)| v).unwrap_or_else(|| json!({}));
    let stream = stream! {
        let response = match build_request(&name, input) {
            Ok(request) => dispatch(&state.deps, request).await,
            Err(e) => json!({
                "success": false,
                "error": format!("unknown tool `{name}` or malformed input: {e}"),
                "error_type": "validation_error",
            }),
        };
        yield Ok(Event::default().data(response.to_string()));
    };
    Sse::new(stream)
}
