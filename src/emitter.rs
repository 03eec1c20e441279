//! Final transcript to command
//!
//! Every final transcript passes through here exactly once: the duplicate
//! filter first, then the parser, then the noise filter for unrecognized
//! speech. Whatever comes out is delivered to the consumer.

use crate::command::{Command, CommandParser};
use crate::session::SessionState;
use std::time::Instant;
use tracing::{debug, info};

/// Unknown commands shorter than this (in characters) are treated as noise
pub const DEFAULT_MIN_UNKNOWN_CHARS: usize = 4;

/// Turns accepted final transcripts into commands
pub struct CommandEmitter {
    parser: CommandParser,
    min_unknown_chars: usize,
}

impl Default for CommandEmitter {
    fn default() -> Self {
        Self::new(CommandParser::default())
    }
}

impl CommandEmitter {
    /// Create an emitter around a parser
    pub fn new(parser: CommandParser) -> Self {
        Self {
            parser,
            min_unknown_chars: DEFAULT_MIN_UNKNOWN_CHARS,
        }
    }

    /// Set the minimum length for surfacing an unrecognized transcript
    pub fn with_min_unknown_chars(mut self, chars: usize) -> Self {
        self.min_unknown_chars = chars;
        self
    }

    /// The parser in use
    pub fn parser(&self) -> &CommandParser {
        &self.parser
    }

    /// Process one final transcript
    ///
    /// Returns the command to deliver, or `None` when the transcript was a
    /// duplicate inside the suppression window or unrecognized noise.
    pub fn process(
        &self,
        state: &mut SessionState,
        transcript: &str,
        now: Instant,
    ) -> Option<Command> {
        let trimmed = transcript.trim();
        if trimmed.is_empty() {
            return None;
        }

        if !state.suppressor.accept(trimmed, now) {
            return None;
        }

        let command = self.parser.parse(trimmed, &state.language_tag);

        if command.is_unknown() && trimmed.chars().count() < self.min_unknown_chars {
            debug!("Dropping short unrecognized transcript '{}'", trimmed);
            return None;
        }

        info!("Command: {} ('{}')", command.command_type, trimmed);
        Some(command)
    }
}
