//! Purpose: Library crate behind the `certlogic-fiddle` CLI and playground server.
//! Exports: `api` (pipeline, share codec, CertLogic engine, errors).
//! Role: Pure, synchronous core; binaries add I/O, rendering, and HTTP on top.
//! Invariants: Derived outcomes are recomputed from buffer text on every read.
//! Invariants: Core modules prefer explicit inputs/outputs over hidden state.
pub mod api;
mod certlogic;
mod core;
mod json;
