//! Continuous-listening session
//!
//! This module provides:
//! - The recognition engine abstraction and its callback events
//! - The session state and the thread-safe view published for UIs
//! - The state machine that keeps the engine listening across restarts

pub mod engine;
pub mod machine;
pub mod state;

pub use engine::{
    EngineErrorKind, EngineEvent, EngineEventSender, EngineStartError, ErrorDisposition,
    LoopbackEngine, RecognitionEngine,
};
pub use machine::{RestartPolicy, SessionMachine};
pub use state::{SessionState, SessionStatus, SessionView, SharedSessionState};
