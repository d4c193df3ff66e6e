//! Lexdraft auth core.
//!
//! Dual-token (access + refresh) session authentication for the Lexdraft
//! platform: token issuance, silent rotation, pairing validation, and
//! terminal revocation, exposed as an axum router plus a gate middleware the
//! rest of the product mounts its handlers behind.

pub mod core;
