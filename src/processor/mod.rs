//! Session runtime
//!
//! This module contains the worker that runs a listening session on its own
//! thread and the handle the UI talks to it through.

pub mod orchestrator;

// Re-export commonly used types
pub use orchestrator::{
    EmittedCommand, SessionCommand, SessionEvent, SessionHandle, SessionWorker, VoiceSession,
};
