//! Transcript to command parser
//!
//! The parser is a pure function of `(text, language tag)` and never fails:
//! anything it cannot interpret comes back as an `Unknown` command that keeps
//! the original text.
//!
//! Phrase matching is substring based, not whole-word. Noisy recognition
//! output favours recall, so a phrase buried in a longer unrelated word still
//! matches. Tests rely on that behaviour.

use super::patterns::PatternTable;
use super::{Command, CommandType};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::debug;

/// Confidence reported for any phrase match
pub const MATCH_CONFIDENCE: f32 = 0.9;

/// Confidence reported when nothing matched
pub const UNKNOWN_CONFIDENCE: f32 = 0.1;

const NUMBER: &str = r"([0-9]+(?:\.[0-9]+)?)";

/// Stand-in for hex tokens while looking for amounts
const ADDRESS_MASK: &str = " @addr ";

/// Any `0x` hex run, well-formed or not
static HEX_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"0x[0-9a-fA-F]+").expect("valid regex"));

static UNIT_AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"{NUMBER}\s*(?:ether|eth|ईटीएच|이더|イーサ|以太)")).expect("valid regex")
});

static AMOUNT_BEFORE_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"{NUMBER}\s*(?:(?:to|para|an|à|a|на)\s*)?@addr")).expect("valid regex")
});

static BARE_AMOUNT: LazyLock<Regex> = LazyLock::new(|| Regex::new(NUMBER).expect("valid regex"));

/// Address patterns, tried in order against the original text
///
/// An address ends at any non-hex character, including a particle written
/// directly after it (`0x…에게`, `0x…に`, `0x…को`).
static ADDRESS_PATTERNS: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(r"(?:^|[^0-9a-fA-Fx])(0x[a-fA-F0-9]{40})(?:[^0-9a-fA-F]|$)")
            .expect("valid regex"),
        Regex::new(r"(?i)(?:to|para|an|à|a|на|给|に|에게)\s*(0x[a-fA-F0-9]{40})(?:[^0-9a-fA-F]|$)")
            .expect("valid regex"),
    ]
});

/// Parses final transcripts into commands
///
/// Holds the pattern table it was built with plus one compiled
/// "send verb followed by a number" pattern per table language.
#[derive(Clone, Debug)]
pub struct CommandParser {
    table: PatternTable,
    verb_amounts: HashMap<String, Regex>,
}

impl Default for CommandParser {
    fn default() -> Self {
        Self::new(PatternTable::builtin())
    }
}

impl CommandParser {
    /// Create a parser over a pattern table
    pub fn new(table: PatternTable) -> Self {
        let verb_amounts = table
            .languages()
            .filter_map(|code| {
                let phrases = table.phrases(CommandType::Send, code)?;
                if phrases.phrases.is_empty() {
                    return None;
                }
                let verbs = phrases
                    .phrases
                    .iter()
                    .map(|p| regex::escape(p))
                    .collect::<Vec<_>>()
                    .join("|");
                let pattern = format!(r"(?:{verbs})\s*{NUMBER}");
                Regex::new(&pattern).ok().map(|re| (code.to_string(), re))
            })
            .collect();

        Self {
            table,
            verb_amounts,
        }
    }

    /// The pattern table this parser matches against
    pub fn table(&self) -> &PatternTable {
        &self.table
    }

    /// Parse a transcript spoken in the given language
    pub fn parse(&self, text: &str, language_tag: &str) -> Command {
        let normalized = normalize(text);
        if normalized.is_empty() {
            return Command::unknown(text).with_confidence(UNKNOWN_CONFIDENCE);
        }

        let code = self.table.resolve_language(language_tag);

        for intent in CommandType::PRIORITY {
            let Some(phrases) = self.table.phrases(intent, &code) else {
                continue;
            };
            let Some(phrase) = phrases.first_match(&normalized) else {
                continue;
            };
            debug!("Matched {} via '{}' ({})", intent, phrase, code);

            if intent != CommandType::Send {
                return Command::new(intent, text).with_confidence(MATCH_CONFIDENCE);
            }

            // A send without an amount means nothing; it never falls through
            // to a lower-priority intent either.
            return match self.extract_amount(&normalized, &code) {
                Some(amount) => Command::send(amount, extract_address(text), text)
                    .with_confidence(MATCH_CONFIDENCE),
                None => {
                    debug!("Send phrase without an amount: '{}'", text);
                    Command::unknown(text).with_confidence(UNKNOWN_CONFIDENCE)
                }
            };
        }

        Command::unknown(text).with_confidence(UNKNOWN_CONFIDENCE)
    }

    /// First positive amount found by the ordered amount patterns
    fn extract_amount(&self, normalized: &str, code: &str) -> Option<f64> {
        let masked = HEX_TOKEN.replace_all(normalized, ADDRESS_MASK);

        let verb_amount = self.verb_amounts.get(code);
        let patterns = [
            Some(&*UNIT_AMOUNT),
            Some(&*AMOUNT_BEFORE_ADDRESS),
            verb_amount,
            Some(&*BARE_AMOUNT),
        ];

        let captured = patterns
            .into_iter()
            .flatten()
            .find_map(|re| re.captures(&masked))
            .and_then(|caps| caps.get(1))?;

        let amount: f64 = captured.as_str().parse().ok()?;
        (amount.is_finite() && amount > 0.0).then_some(amount)
    }
}

/// Trim and lowercase a transcript for matching
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// First well-formed address found by the ordered address patterns
fn extract_address(text: &str) -> Option<String> {
    ADDRESS_PATTERNS
        .iter()
        .find_map(|re| re.captures(text))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
