//! Extraction helpers for tweet text: Ethereum addresses and @handles.

use crate::error::ChainError;
use once_cell::sync::Lazy;
use regex::Regex;

static ETH_ADDRESS: Lazy<Regex> = Lazy::new(|| Regex::new(r"0x[a-fA-F0-9]{40}").unwrap());
static ETH_ADDRESS_EXACT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^0x[a-fA-F0-9]{40}$").unwrap());
static MENTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"@([a-zA-Z0-9_]+)").unwrap());
static HANDLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_]{1,15}$").unwrap());

/// Every `0x` + 40 hex digit run in `text`, in order of appearance.
pub fn extract_eth_addresses(text: &str) -> Vec<String> {
    ETH_ADDRESS
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

pub fn is_valid_eth_address(address: &str) -> bool {
    ETH_ADDRESS_EXACT.is_match(address)
}

/// Lowercases a valid address for consistent contract storage.
pub fn normalize_eth_address(address: &str) -> Result<String, ChainError> {
    if !is_valid_eth_address(address) {
        return Err(ChainError::InvalidAddress {
            address: address.to_string(),
        });
    }
    Ok(address.to_lowercase())
}

pub fn extract_and_normalize_eth_addresses(text: &str) -> Vec<String> {
    extract_eth_addresses(text)
        .iter()
        .filter_map(|a| normalize_eth_address(a).ok())
        .collect()
}

/// Handles mentioned in `text`, without the leading `@`.
pub fn extract_mentions(text: &str) -> Vec<&str> {
    MENTION
        .captures_iter(text)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect()
}

/// First mentioned handle that is not the bot itself (case-insensitive).
pub fn find_opponent<'a>(text: &'a str, bot_handle: &str) -> Option<&'a str> {
    let me = normalize_twitter_handle(bot_handle).to_lowercase();
    extract_mentions(text)
        .into_iter()
        .find(|handle| handle.to_lowercase() != me)
}

pub fn is_valid_twitter_handle(handle: &str) -> bool {
    HANDLE.is_match(handle)
}

pub fn normalize_twitter_handle(handle: &str) -> &str {
    handle.strip_prefix('@').unwrap_or(handle)
}
