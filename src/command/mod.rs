//! Voice commands and their interpretation
//!
//! This module provides:
//! - The `Command` value produced for every final transcript
//! - Per-language trigger phrase tables
//! - The transcript parser
//! - Address/amount checks for whoever executes the command

pub mod parser;
pub mod patterns;

pub use parser::CommandParser;
pub use patterns::{IntentPhrases, Language, PatternTable, SUPPORTED_LANGUAGES};

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Upper bound the wallet side accepts for a single transfer
pub const MAX_SEND_AMOUNT: f64 = 1_000_000.0;

static WALLET_ADDRESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^0x[a-fA-F0-9]{40}$").expect("valid regex"));

/// Intent a transcript was classified as
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandType {
    Connect,
    Disconnect,
    Balance,
    Account,
    Send,
    Unknown,
}

impl CommandType {
    /// Intents in the order the parser tries them
    pub const PRIORITY: [CommandType; 5] = [
        CommandType::Connect,
        CommandType::Disconnect,
        CommandType::Balance,
        CommandType::Account,
        CommandType::Send,
    ];

    /// Check if this is the unknown intent
    pub fn is_unknown(&self) -> bool {
        matches!(self, CommandType::Unknown)
    }
}

impl std::fmt::Display for CommandType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandType::Connect => write!(f, "connect"),
            CommandType::Disconnect => write!(f, "disconnect"),
            CommandType::Balance => write!(f, "balance"),
            CommandType::Account => write!(f, "account"),
            CommandType::Send => write!(f, "send"),
            CommandType::Unknown => write!(f, "unknown"),
        }
    }
}

/// A parsed voice command
///
/// `amount` is always present for `Send` and absent otherwise. `address` is
/// only ever set for `Send`, and only to a well-formed 40-hex-digit address.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    #[serde(rename = "type")]
    pub command_type: CommandType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub original_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl Command {
    /// Create a command without send details
    pub fn new(command_type: CommandType, original_text: impl Into<String>) -> Self {
        Self {
            command_type,
            amount: None,
            address: None,
            original_text: original_text.into(),
            confidence: None,
        }
    }

    /// Create an unrecognized command
    pub fn unknown(original_text: impl Into<String>) -> Self {
        Self::new(CommandType::Unknown, original_text)
    }

    /// Create a send command
    pub fn send(amount: f64, address: Option<String>, original_text: impl Into<String>) -> Self {
        Self {
            command_type: CommandType::Send,
            amount: Some(amount),
            address,
            original_text: original_text.into(),
            confidence: None,
        }
    }

    /// Attach a confidence estimate, clamped to [0, 1]
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence.clamp(0.0, 1.0));
        self
    }

    /// Check if nothing was recognized
    pub fn is_unknown(&self) -> bool {
        self.command_type.is_unknown()
    }
}

/// Check that an address is `0x` followed by exactly 40 hex digits
pub fn is_valid_address(address: &str) -> bool {
    WALLET_ADDRESS.is_match(address)
}

/// Check that an amount is positive and within the wallet's transfer limit
///
/// The parser only guarantees positivity; this is the stricter check the
/// wallet applies before executing a transfer.
pub fn is_valid_amount(amount: f64) -> bool {
    amount.is_finite() && amount > 0.0 && amount <= MAX_SEND_AMOUNT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_validation() {
        assert!(is_valid_address("0x1111111111111111111111111111111111111111"));
        assert!(is_valid_address("0xAbCdEf0123456789abcdef0123456789ABCDEF01"));
        // 39 hex digits
        assert!(!is_valid_address("0x111111111111111111111111111111111111111"));
        // 41 hex digits
        assert!(!is_valid_address("0x11111111111111111111111111111111111111111"));
        assert!(!is_valid_address("1111111111111111111111111111111111111111"));
        assert!(!is_valid_address("0xZZ11111111111111111111111111111111111111"));
    }

    #[test]
    fn test_amount_validation() {
        assert!(is_valid_amount(0.5));
        assert!(is_valid_amount(1_000_000.0));
        assert!(!is_valid_amount(0.0));
        assert!(!is_valid_amount(-1.0));
        assert!(!is_valid_amount(1_000_000.01));
        assert!(!is_valid_amount(f64::NAN));
    }

    #[test]
    fn test_confidence_clamped() {
        let cmd = Command::new(CommandType::Balance, "balance").with_confidence(1.5);
        assert_eq!(cmd.confidence, Some(1.0));
    }

    #[test]
    fn test_command_json_shape() {
        let cmd = Command::send(0.5, None, "send 0.5 eth").with_confidence(0.9);
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["type"], "send");
        assert_eq!(json["amount"], 0.5);
        assert_eq!(json["originalText"], "send 0.5 eth");
        assert!(json.get("address").is_none());
    }

    #[test]
    fn test_command_type_display() {
        assert_eq!(CommandType::Disconnect.to_string(), "disconnect");
        assert_eq!(CommandType::Unknown.to_string(), "unknown");
    }
}
