//! Stdio JSON-RPC transport (spec.md §6): one [`ToolRequest`] per line on
//! standard input, one envelope response per line on standard output.
//! Nothing but tool-protocol bytes ever reaches stdout — all logging goes
//! to standard error.

pub mod stdio;
