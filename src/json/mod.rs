//! Purpose: Internal JSON parsing boundary shared by the pipeline and share codec.
//! Exports: `parse` module with the malformed-text-safe decode helpers.
//! Role: Single seam for parser usage so callsites avoid ad hoc `serde_json` calls.
//! Invariants: Buffer text is decoded only through this module.
//! Invariants: Helper APIs stay small and deterministic (no hidden global state).

pub(crate) mod parse;
