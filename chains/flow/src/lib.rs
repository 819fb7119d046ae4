//! Flow chain access through the `flow` CLI.
//!
//! Every call renders a small Cadence transaction or script into a temporary
//! `.cdc` file inside the account directory and runs the CLI against it.

pub mod cadence;
pub mod client;

pub use client::{FlowCliClient, FlowConfig};
