//! # Core Logic - Shared Utilities for the Arena Bots
//!
//! This crate provides the pieces shared by the duel bot, the address bot,
//! the EVM contract clients and the Flow CLI client.
//!
//! ## Modules
//!
//! - [`config`] - Chain configuration and environment helpers
//! - [`error`] - Typed error handling with thiserror
//! - [`store`] - JSON-file bookkeeping (processed tweets, thread replies)
//! - [`text`] - Address and handle extraction from tweet text
//! - [`traits`] - Recorder seams implemented by each chain backend
//! - [`utils`] - Logger, retry and poll runner

pub mod config;
pub mod error;
pub mod store;
pub mod text;
pub mod traits;
pub(crate) mod utils;

pub use config::{env_opt, env_required, ChainConfig};
pub use error::{ChainError, ConfigError, CoreError, NetworkError, StoreError};
pub use store::{ProcessedTweetStore, ReplyRecord, ReplyStore};
pub use traits::{AddressRegistry, MatchRecord, MatchRecorder, RecordReceipt, StoredMatch};

pub use utils::{setup_logger, PollRunner};

pub use utils::retry::{is_transient_error, with_retry, RetryConfig};
