//! Listening session state
//!
//! `SessionState` is owned by the session machine and lent to the command
//! emitter. `SharedSessionState` is the read-only view the worker publishes
//! for UIs, which can be queried from any thread without touching the
//! machine.

use crate::command::Command;
use crate::dedup::{DuplicateSuppressor, SuppressedTranscript};
use crate::error::VoiceError;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;

/// Lifecycle of the listening session
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionStatus {
    /// Engine not running
    #[default]
    Idle,
    /// Engine active and emitting transcripts
    Listening,
    /// Engine stopped by a recoverable fault, restart scheduled
    Restarting,
    /// Engine stopped by an unrecoverable fault, no auto-restart
    Fatal,
}

impl SessionStatus {
    /// Check if idle
    pub fn is_idle(&self) -> bool {
        matches!(self, SessionStatus::Idle)
    }

    /// Check if listening
    pub fn is_listening(&self) -> bool {
        matches!(self, SessionStatus::Listening)
    }

    /// Check if a restart is underway
    pub fn is_restarting(&self) -> bool {
        matches!(self, SessionStatus::Restarting)
    }

    /// Check if stopped by a fatal fault
    pub fn is_fatal(&self) -> bool {
        matches!(self, SessionStatus::Fatal)
    }

    /// Listening or about to listen again
    pub fn is_active(&self) -> bool {
        self.is_listening() || self.is_restarting()
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Idle => write!(f, "Idle"),
            SessionStatus::Listening => write!(f, "Listening"),
            SessionStatus::Restarting => write!(f, "Restarting"),
            SessionStatus::Fatal => write!(f, "Fatal"),
        }
    }
}

/// Mutable state of one listening session
#[derive(Clone, Debug)]
pub struct SessionState {
    /// Current lifecycle status
    pub status: SessionStatus,
    /// Recognition language tag
    pub language_tag: String,
    /// Last error surfaced to the user
    pub last_error: Option<VoiceError>,
    /// Most recent transcript text, interim or final
    pub preview: String,
    /// Duplicate filter for final transcripts
    pub suppressor: DuplicateSuppressor,
}

impl SessionState {
    /// Create an idle session state
    pub fn new(language_tag: impl Into<String>, suppression_window: Duration) -> Self {
        Self {
            status: SessionStatus::Idle,
            language_tag: language_tag.into(),
            last_error: None,
            preview: String::new(),
            suppressor: DuplicateSuppressor::new(suppression_window),
        }
    }

    /// Last accepted transcript still inside its suppression window
    pub fn suppressed_transcript(&self) -> Option<&SuppressedTranscript> {
        self.suppressor.last()
    }

    /// Set the surfaced error
    pub fn set_error(&mut self, error: VoiceError) {
        self.last_error = Some(error);
    }

    /// Clear the surfaced error
    pub fn clear_error(&mut self) {
        self.last_error = None;
    }
}

/// What UIs see of the session
#[derive(Clone, Debug, Default)]
pub struct SessionView {
    pub status: SessionStatus,
    pub language_tag: String,
    pub last_error: Option<VoiceError>,
    pub preview: String,
    pub last_command: Option<Command>,
}

/// Thread-safe published view of the session
///
/// Written only by the session worker.
#[derive(Clone, Default)]
pub struct SharedSessionState {
    inner: Arc<RwLock<SessionView>>,
}

impl SharedSessionState {
    /// Create a shared view for a session in the given language
    pub fn new(language_tag: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(SessionView {
                language_tag: language_tag.into(),
                ..SessionView::default()
            })),
        }
    }

    /// Copy the machine-owned fields into the view
    pub fn publish(&self, state: &SessionState) {
        let mut view = self.inner.write();
        view.status = state.status;
        view.language_tag.clone_from(&state.language_tag);
        view.last_error.clone_from(&state.last_error);
        view.preview.clone_from(&state.preview);
    }

    /// Record the most recently emitted command
    pub fn set_last_command(&self, command: Command) {
        self.inner.write().last_command = Some(command);
    }

    /// Copy of the whole view (no lock held after return)
    pub fn snapshot(&self) -> SessionView {
        self.inner.read().clone()
    }

    /// Current status
    pub fn status(&self) -> SessionStatus {
        self.inner.read().status
    }

    /// Check if listening
    pub fn is_listening(&self) -> bool {
        self.inner.read().status.is_listening()
    }

    /// Current language tag
    pub fn language_tag(&self) -> String {
        self.inner.read().language_tag.clone()
    }

    /// Last surfaced error
    pub fn last_error(&self) -> Option<VoiceError> {
        self.inner.read().last_error.clone()
    }

    /// Live transcript preview
    pub fn preview(&self) -> String {
        self.inner.read().preview.clone()
    }

    /// Most recently emitted command
    pub fn last_command(&self) -> Option<Command> {
        self.inner.read().last_command.clone()
    }
}
