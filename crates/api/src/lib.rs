//! SSE-over-HTTP transport (spec.md §6) for the ingestion & retrieval
//! engine's tool-call surface. `ragsmith_cli` is the stdio JSON-RPC
//! counterpart; both dispatch through `ragsmith_mcp_tools::dispatch`.
//!
//! - `POST /tools/:name` — call a tool once, return its envelope.
//! - `GET /tools/:name/stream` — call a tool, stream its envelope back as a
//!   single server-sent event (spec.md's operations are request/response,
//!   not multi-event; SSE here exists for clients that want the same
//!   long-lived-connection handling for every call, per the transport
//!   choice in spec.md §6).
//! - `GET /health` — liveness probe.

pub mod middleware;
pub mod routes;
pub mod server;

pub use server::ApiServer;
