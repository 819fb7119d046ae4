pub mod client;
pub mod config;
pub mod contracts;
pub mod match_history;
pub mod sync;
pub mod user_sync;

pub use client::ChainClient;
pub use core_logic::ChainConfig as EvmChainConfig;
pub use match_history::MatchHistoryContract;
pub use sync::{MatchSource, MatchSyncer, RewardsLedger, SyncReport, SyncTarget};
pub use user_sync::{UserProfile, UserSyncContract};
