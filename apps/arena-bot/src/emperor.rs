//! The Emperor Agent: an LLM judge that scores audience sentiment for both
//! gladiators and names the winner.

use crate::openai::{ChatMessage, OpenAiClient};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use core_logic::ReplyRecord;
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use serde_json::Value;
use tracing::{info, warn};

pub const EMPEROR_INSTRUCTIONS: &str = "Given audience text about two gladiators, analyze the sentiment and assign a base score (0-100) for each gladiator based on how much the audience likes them.
Return a JSON object like:
{
  \"challenger\": {\"name\": \"challenger_name\", \"baseScore\": number},
  \"opponent\": {\"name\": \"opponent_name\", \"baseScore\": number}
}
IMPORTANT: There cannot be a tie. If the scores would be equal, slightly favor the gladiator with even a marginally more positive sentiment or, if sentiment is truly equal, favor the challenger.";

pub const FALLBACK_MARKER: &str = "[FALLBACK: Emperor Agent failed, random selection used]";

static JSON_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{[\s\S]*\}").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scores {
    pub challenger: f64,
    pub opponent: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub winner: String,
    /// Prompt sent to the model; this is what gets stored on chain.
    pub prompt: String,
    pub scores: Option<Scores>,
    pub fallback: bool,
}

#[async_trait]
pub trait Judge: Send + Sync {
    async fn judge(&self, challenger: &str, opponent: &str, replies: &[ReplyRecord]) -> Verdict;
}

pub fn audience_dialogue(replies: &[ReplyRecord]) -> String {
    replies
        .iter()
        .map(|r| {
            format!(
                "{} says: \"{}\" [likes: {}]",
                r.username,
                r.text,
                r.likes.unwrap_or(0)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn build_prompt(dialogue: &str, challenger: &str, opponent: &str) -> String {
    format!(
        "Audience text: \"{}\"\nGladiators: {} vs {}",
        dialogue, challenger, opponent
    )
}

/// Parses the model output, falling back to the outermost `{...}` span when
/// the JSON is wrapped in prose or code fences. Missing scores count as 0.
pub fn parse_scores(raw: &str) -> Result<Scores> {
    let value: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(_) => {
            let span = JSON_SPAN
                .find(raw)
                .ok_or_else(|| anyhow!("Emperor Agent did not return valid JSON. Raw response: {}", raw))?;
            serde_json::from_str(span.as_str()).map_err(|_| {
                anyhow!("Emperor Agent did not return valid JSON. Raw response: {}", raw)
            })?
        }
    };

    let score = |side: &str| -> Result<f64> {
        let entry = value
            .get(side)
            .ok_or_else(|| anyhow!("Emperor Agent response has no '{}' entry", side))?;
        Ok(entry.get("baseScore").and_then(Value::as_f64).unwrap_or(0.0))
    };

    Ok(Scores {
        challenger: score("challenger")?,
        opponent: score("opponent")?,
    })
}

/// Strictly higher challenger score wins; anything else goes to the opponent.
pub fn decide_winner<'a>(challenger: &'a str, opponent: &'a str, scores: Scores) -> &'a str {
    if scores.challenger > scores.opponent {
        challenger
    } else {
        opponent
    }
}

pub struct EmperorAgent {
    client: OpenAiClient,
    model: String,
}

impl EmperorAgent {
    pub fn new(client: OpenAiClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    async fn ask(&self, prompt: &str) -> Result<Scores> {
        let messages = [ChatMessage::system(EMPEROR_INSTRUCTIONS), ChatMessage::user(prompt)];
        let raw = self.client.chat(&self.model, &messages, None).await?;
        info!("🤖 Emperor Agent response: {}", raw);
        parse_scores(&raw)
    }
}

#[async_trait]
impl Judge for EmperorAgent {
    async fn judge(&self, challenger: &str, opponent: &str, replies: &[ReplyRecord]) -> Verdict {
        let prompt = build_prompt(&audience_dialogue(replies), challenger, opponent);

        match self.ask(&prompt).await {
            Ok(scores) => Verdict {
                winner: decide_winner(challenger, opponent, scores).to_string(),
                prompt,
                scores: Some(scores),
                fallback: false,
            },
            Err(e) => {
                warn!("Emperor Agent FAILED, picking at random: {:#}", e);
                random_verdict(challenger, opponent, prompt)
            }
        }
    }
}

pub fn random_verdict(challenger: &str, opponent: &str, prompt: String) -> Verdict {
    let winner = if rand::thread_rng().gen_bool(0.5) {
        challenger
    } else {
        opponent
    };
    Verdict {
        winner: winner.to_string(),
        prompt: format!("{}\n{}", prompt, FALLBACK_MARKER),
        scores: None,
        fallback: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(user: &str, text: &str, likes: Option<u64>) -> ReplyRecord {
        ReplyRecord {
            conversation_id: Some("1".into()),
            likes,
            name: None,
            permanent_url: None,
            text: text.into(),
            username: user.into(),
            is_reply: true,
            timestamp: None,
        }
    }

    #[test]
    fn test_dialogue_and_prompt_format() {
        let replies = vec![
            reply("fan1", "Maximus all the way", Some(3)),
            reply("fan2", "Lucius!", None),
        ];
        let dialogue = audience_dialogue(&replies);
        assert_eq!(
            dialogue,
            "fan1 says: \"Maximus all the way\" [likes: 3]\nfan2 says: \"Lucius!\" [likes: 0]"
        );
        assert_eq!(
            build_prompt("", "maximus", "lucius"),
            "Audience text: \"\"\nGladiators: maximus vs lucius"
        );
    }

    #[test]
    fn test_parse_scores_plain_and_wrapped() {
        let plain = r#"{"challenger":{"name":"a","baseScore":70},"opponent":{"name":"b","baseScore":30}}"#;
        assert_eq!(
            parse_scores(plain).unwrap(),
            Scores { challenger: 70.0, opponent: 30.0 }
        );

        let wrapped = "Here you go:\n```json\n{\"challenger\":{\"baseScore\":40},\n\"opponent\":{\"name\":\"b\"}}\n```";
        assert_eq!(
            parse_scores(wrapped).unwrap(),
            Scores { challenger: 40.0, opponent: 0.0 }
        );

        assert!(parse_scores("no json here").is_err());
        assert!(parse_scores(r#"{"winner":"a"}"#).is_err());
    }

    #[test]
    fn test_decide_winner_tie_goes_to_opponent() {
        let s = |c, o| Scores { challenger: c, opponent: o };
        assert_eq!(decide_winner("a", "b", s(51.0, 49.0)), "a");
        assert_eq!(decide_winner("a", "b", s(50.0, 50.0)), "b");
        assert_eq!(decide_winner("a", "b", s(10.0, 90.0)), "b");
    }

    #[test]
    fn test_random_verdict_marks_fallback() {
        let v = random_verdict("a", "b", "p".into());
        assert!(v.fallback);
        assert!(v.winner == "a" || v.winner == "b");
        assert_eq!(v.prompt, format!("p\n{}", FALLBACK_MARKER));
    }
}
