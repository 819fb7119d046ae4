//! Client-side ABIs of the arena contracts.

use anyhow::{Context, Result};
use ethers::abi::Abi;

/// `MatchHistory`: append-only list of duel results.
pub const MATCH_HISTORY_ABI: &str = r#"[
    {"type":"function","name":"addMatch","stateMutability":"nonpayable","inputs":[
        {"name":"challengerName","type":"string"},
        {"name":"challengerUserId","type":"string"},
        {"name":"opponentName","type":"string"},
        {"name":"opponentUserId","type":"string"},
        {"name":"matchWinner","type":"string"},
        {"name":"aiPrompt","type":"string"}
    ],"outputs":[]},
    {"type":"function","name":"getRecentMatches","stateMutability":"view","inputs":[
        {"name":"count","type":"uint256"}
    ],"outputs":[{"name":"","type":"tuple[]","components":[
        {"name":"matchId","type":"uint256"},
        {"name":"challengerName","type":"string"},
        {"name":"challengerUserId","type":"string"},
        {"name":"opponentName","type":"string"},
        {"name":"opponentUserId","type":"string"},
        {"name":"matchWinner","type":"string"},
        {"name":"aiPrompt","type":"string"}
    ]}]},
    {"type":"function","name":"getMatch","stateMutability":"view","inputs":[
        {"name":"matchId","type":"uint256"}
    ],"outputs":[{"name":"","type":"tuple","components":[
        {"name":"matchId","type":"uint256"},
        {"name":"challengerName","type":"string"},
        {"name":"challengerUserId","type":"string"},
        {"name":"opponentName","type":"string"},
        {"name":"opponentUserId","type":"string"},
        {"name":"matchWinner","type":"string"},
        {"name":"aiPrompt","type":"string"}
    ]}]},
    {"type":"function","name":"matchCount","stateMutability":"view","inputs":[],
     "outputs":[{"name":"","type":"uint256"}]}
]"#;

/// User-sync contract. The rewards chain deploys the same contract, which
/// also carries `batchIncrementUnclaimedTokens`.
pub const USER_SYNC_ABI: &str = r#"[
    {"type":"function","name":"syncMatches","stateMutability":"nonpayable","inputs":[
        {"name":"matches","type":"tuple[]","components":[
            {"name":"matchId","type":"uint256"},
            {"name":"challengerName","type":"string"},
            {"name":"challengerUserId","type":"string"},
            {"name":"opponentName","type":"string"},
            {"name":"opponentUserId","type":"string"},
            {"name":"matchWinner","type":"string"},
            {"name":"aiPrompt","type":"string"}
        ]},
        {"name":"latestMatchId","type":"uint256"}
    ],"outputs":[]},
    {"type":"function","name":"updateEthereumAddress","stateMutability":"nonpayable","inputs":[
        {"name":"userId","type":"string"},
        {"name":"ethereumAddress","type":"address"}
    ],"outputs":[]},
    {"type":"function","name":"lastSyncedMatchId","stateMutability":"view","inputs":[],
     "outputs":[{"name":"","type":"uint256"}]},
    {"type":"function","name":"getUserProfile","stateMutability":"view","inputs":[
        {"name":"userId","type":"string"}
    ],"outputs":[
        {"name":"userId","type":"string"},
        {"name":"twitterHandle","type":"string"},
        {"name":"ethereumAddress","type":"address"},
        {"name":"matchCount","type":"uint256"},
        {"name":"winCount","type":"uint256"},
        {"name":"unclaimedTokens","type":"uint256"}
    ]},
    {"type":"function","name":"getUserMatches","stateMutability":"view","inputs":[
        {"name":"userId","type":"string"}
    ],"outputs":[{"name":"","type":"uint256[]"}]},
    {"type":"function","name":"getUserWins","stateMutability":"view","inputs":[
        {"name":"userId","type":"string"}
    ],"outputs":[{"name":"","type":"uint256[]"}]},
    {"type":"function","name":"batchIncrementUnclaimedTokens","stateMutability":"nonpayable","inputs":[
        {"name":"userIds","type":"string[]"}
    ],"outputs":[]}
]"#;

pub fn parse_abi(json: &str) -> Result<Abi> {
    serde_json::from_str(json).context("Invalid contract ABI")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abis_parse_and_expose_functions() {
        let history = parse_abi(MATCH_HISTORY_ABI).unwrap();
        for name in ["addMatch", "getRecentMatches", "getMatch", "matchCount"] {
            assert!(history.function(name).is_ok(), "missing {}", name);
        }

        let sync = parse_abi(USER_SYNC_ABI).unwrap();
        assert_eq!(sync.function("getUserProfile").unwrap().outputs.len(), 6);
        assert_eq!(sync.function("syncMatches").unwrap().inputs.len(), 2);
    }
}
