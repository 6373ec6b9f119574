//! Newline-delimited JSON-RPC loop over stdin/stdout (spec.md §6
//! "Transport framing"). Each input line decodes to a
//! [`ragsmith_mcp_tools::ToolRequest`]; each output line is the dispatched
//! envelope. A line that fails to parse gets a `validation_error` envelope
//! rather than killing the loop.
use ragsmith_mcp_tools::{dispatch, Deps, ToolRequest};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// Read requests from `stdin` until EOF, writing one envelope per line to
/// `stdout`. Blank lines are skipped.
pub async fn serve(deps: &Deps) -> anyhow::Result<()> {
    let stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(stdin).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<ToolRequest>(&line) {
            Ok(request) => dispatch(deps, request).await,
            Err(e) => json!({
                "success": false,
                "error": format!("malformed request: {e}"),
                "error_type": "validation_error",
            }),
        };

        let mut out = serde_json::to_vec(&response)?;
        out.push(b'\n');
        stdout.write_all(&out).await?;
        stdout.flush().await?;
    }

    Ok(())
}
