//! Nebula Voice - voice command layer for a crypto wallet assistant
//!
//! This crate keeps a speech recognizer listening across its frequent
//! self-terminations, turns final transcripts into wallet commands in
//! twelve languages, and reports status, errors and feedback cues for UIs.

pub mod command;
pub mod config;
pub mod dedup;
pub mod emitter;
pub mod error;
pub mod feedback;
pub mod processor;
pub mod session;

// Re-export error types
pub use error::{Result, VoiceError};

// Re-export command types
pub use command::{Command, CommandParser, CommandType, Language, PatternTable};

pub use config::VoiceConfig;
pub use dedup::DuplicateSuppressor;
pub use emitter::CommandEmitter;
pub use feedback::AudioCue;

// Re-export session types
pub use processor::{
    EmittedCommand, SessionCommand, SessionEvent, SessionHandle, SessionWorker, VoiceSession,
};
pub use session::{
    EngineEvent, EngineEventSender, LoopbackEngine, RecognitionEngine, SessionMachine,
    SessionStatus, SharedSessionState,
};
