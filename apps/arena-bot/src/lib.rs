//! # Arena Bot
//!
//! Twitter duel bot: picks up challenge mentions, lets the Emperor Agent
//! judge the audience, posts a winner image and records the result on the
//! configured chains. Also hosts the address-linking bot.

pub mod address_bot;
pub mod bot;
pub mod challenge;
pub mod config;
pub mod duel;
pub mod emperor;
pub mod image;
pub mod openai;
pub mod recorders;
pub mod twitter;

pub use address_bot::{AddressBot, AddressScanSummary};
pub use bot::ArenaBot;
pub use config::{AddressBotConfig, BotConfig};
pub use emperor::{EmperorAgent, Judge, Verdict};
pub use image::{ImageGenerator, ImageMaker};
pub use twitter::{Profile, SocialPlatform, Tweet, TwitterClient};
