//! Continuous-listening state machine
//!
//! The machine owns the recognition engine and hides its instability: the
//! engine ends after every utterance and reports ambiguous faults, while
//! callers only see `Idle -> Listening -> Restarting -> Listening` or a
//! terminal `Fatal`.
//!
//! All timing goes through the caller-supplied `now`, and timers are plain
//! deadlines that the owner fires with [`SessionMachine::poll_timers`]. There
//! is never more than one pending restart, and `stop` cancels it
//! synchronously.

use super::engine::{EngineErrorKind, ErrorDisposition, RecognitionEngine};
use super::state::{SessionState, SessionStatus};
use crate::command::Language;
use crate::error::{Result, VoiceError};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Timing and bounds for automatic restarts
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RestartPolicy {
    /// Delay before a scheduled restart fires
    pub restart_delay: Duration,
    /// Delay before retrying a `start` that failed synchronously
    pub start_retry_delay: Duration,
    /// Give up after this many fault-driven restarts without a transcript (None = never)
    pub max_restart_attempts: Option<u32>,
    /// Consecutive network failures before the fault is surfaced
    pub network_failure_report_threshold: u32,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self {
            restart_delay: Duration::from_millis(300),
            start_retry_delay: Duration::from_millis(500),
            max_restart_attempts: None,
            network_failure_report_threshold: 3,
        }
    }
}

impl RestartPolicy {
    /// Bound the number of consecutive restart attempts
    pub fn with_max_restart_attempts(mut self, attempts: u32) -> Self {
        self.max_restart_attempts = Some(attempts);
        self
    }
}

/// Unclassified faults surface on this consecutive occurrence
const UNCLASSIFIED_REPORT_THRESHOLD: u32 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TimerKind {
    /// Auto-restart; only fault-driven ones count toward the bound
    Restart { fault: bool },
    /// Single retry of a failed explicit start
    StartRetry,
}

#[derive(Clone, Copy, Debug)]
struct PendingTimer {
    kind: TimerKind,
    deadline: Instant,
}

/// State machine for one listening session
pub struct SessionMachine<E: RecognitionEngine> {
    engine: E,
    state: SessionState,
    policy: RestartPolicy,
    /// Cleared only by `stop` or a fatal fault
    wants_listening: bool,
    /// The single restart slot
    timer: Option<PendingTimer>,
    restart_attempts: u32,
    network_failures: u32,
    unclassified_failures: u32,
}

impl<E: RecognitionEngine> SessionMachine<E> {
    /// Create an idle machine around an engine
    pub fn new(engine: E, state: SessionState, policy: RestartPolicy) -> Self {
        Self {
            engine,
            state,
            policy,
            wants_listening: false,
            timer: None,
            restart_attempts: 0,
            network_failures: 0,
            unclassified_failures: 0,
        }
    }

    /// Session state
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Session state, for the command emitter
    pub fn state_mut(&mut self) -> &mut SessionState {
        &mut self.state
    }

    /// Current status
    pub fn status(&self) -> SessionStatus {
        self.state.status
    }

    /// Last surfaced error
    pub fn last_error(&self) -> Option<&VoiceError> {
        self.state.last_error.as_ref()
    }

    /// The engine (for inspection)
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Restart policy in effect
    pub fn policy(&self) -> &RestartPolicy {
        &self.policy
    }

    /// Check if a restart (or start retry) is scheduled
    pub fn has_pending_restart(&self) -> bool {
        self.timer.is_some()
    }

    /// Restarts fired since the last transcript
    pub fn restart_attempts(&self) -> u32 {
        self.restart_attempts
    }

    /// Earliest instant at which `poll_timers` has work to do
    pub fn next_deadline(&self) -> Option<Instant> {
        let restart = self.timer.map(|t| t.deadline);
        let suppression = self.state.suppressor.deadline();
        match (restart, suppression) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Begin listening in the given language
    ///
    /// Starting while a session is already active is a no-op. A synchronous
    /// engine failure is retried once after `start_retry_delay`; the outcome
    /// of that retry arrives through `poll_timers`.
    pub fn start(&mut self, language_tag: &str, now: Instant) -> Result<()> {
        if self.state.status.is_active() || self.timer.is_some() {
            warn!(
                "Start requested while session is {}, ignoring",
                self.state.status
            );
            return Ok(());
        }

        if !self.engine.is_supported() {
            error!("Speech recognition engine not supported");
            self.state.status = SessionStatus::Idle;
            self.state.set_error(VoiceError::EngineUnsupported);
            return Err(VoiceError::EngineUnsupported);
        }

        if !Language::is_supported(language_tag) {
            return Err(VoiceError::ConfigError(format!(
                "Unsupported language: {}",
                language_tag
            )));
        }

        self.state.language_tag = language_tag.to_string();
        self.state.clear_error();
        self.reset_counters();
        self.wants_listening = true;

        self.engine.set_language(language_tag);
        match self.engine.start() {
            Ok(()) => {
                info!("Listening started ({})", language_tag);
                self.state.status = SessionStatus::Listening;
            }
            Err(e) => {
                warn!(
                    "Engine start failed ({}), retrying in {:?}",
                    e, self.policy.start_retry_delay
                );
                self.state.status = SessionStatus::Restarting;
                self.timer = Some(PendingTimer {
                    kind: TimerKind::StartRetry,
                    deadline: now + self.policy.start_retry_delay,
                });
            }
        }
        Ok(())
    }

    /// Stop listening and cancel every pending timer
    ///
    /// Idempotent: stopping an idle session does nothing.
    pub fn stop(&mut self) {
        if self.state.status.is_idle() && self.timer.is_none() && !self.wants_listening {
            return;
        }

        info!("Stopping listening session (was {})", self.state.status);
        let engine_running = self.state.status.is_active();

        self.wants_listening = false;
        self.timer = None;
        self.state.suppressor.clear();
        self.state.status = SessionStatus::Idle;

        if engine_running {
            self.engine.stop();
        }
    }

    /// Change the recognition language
    ///
    /// While listening the engine is stopped; its `End` then schedules a
    /// restart that picks up the new language.
    pub fn set_language(&mut self, language_tag: &str) -> Result<()> {
        if !Language::is_supported(language_tag) {
            return Err(VoiceError::ConfigError(format!(
                "Unsupported language: {}",
                language_tag
            )));
        }
        if self.state.language_tag == language_tag {
            return Ok(());
        }

        info!(
            "Language changed {} -> {}",
            self.state.language_tag, language_tag
        );
        self.state.language_tag = language_tag.to_string();

        // A restart that already fired is running in the old language too
        let engine_running = self.state.status.is_listening()
            || (self.state.status.is_restarting() && self.timer.is_none());
        if engine_running {
            self.state.status = SessionStatus::Restarting;
            self.engine.stop();
        }
        Ok(())
    }

    /// Engine callback: capture began
    pub fn on_engine_started(&mut self) {
        if !self.wants_listening {
            // A start that raced with stop()
            debug!("Engine started after stop, stopping it again");
            self.engine.stop();
            return;
        }
        if !self.state.status.is_listening() {
            info!("Listening ({})", self.state.language_tag);
        }
        self.state.status = SessionStatus::Listening;
    }

    /// Engine callback: a transcript
    ///
    /// Interim transcripts only update the preview. Returns the text of a
    /// final transcript that should go on to the command emitter.
    pub fn on_transcript(&mut self, text: &str, is_final: bool) -> Option<String> {
        if !self.wants_listening {
            debug!("Dropping transcript outside an active session");
            return None;
        }

        // Any transcript proves the engine works again
        self.reset_counters();
        self.state.preview = text.to_string();

        if !is_final {
            return None;
        }

        if self
            .state
            .last_error
            .as_ref()
            .is_some_and(VoiceError::is_recoverable)
        {
            self.state.clear_error();
        }

        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(trimmed.to_string())
    }

    /// Engine callback: a fault
    pub fn on_engine_error(&mut self, code: &str, now: Instant) {
        let kind = EngineErrorKind::from_code(code);

        match kind.disposition() {
            ErrorDisposition::Ignore => {
                debug!("Engine reported '{}', ignoring", kind);
            }
            ErrorDisposition::Fatal => {
                if !self.wants_listening && self.state.status.is_idle() {
                    debug!("Engine reported '{}' after stop, ignoring", kind);
                    return;
                }
                let error = match kind {
                    EngineErrorKind::PermissionDenied => VoiceError::PermissionDenied,
                    _ => VoiceError::AudioCaptureUnavailable,
                };
                self.enter_fatal(error);
            }
            ErrorDisposition::Restart => {
                if !self.wants_listening {
                    debug!("Engine reported '{}' after stop, ignoring", kind);
                    return;
                }
                self.track_recoverable(&kind);
                debug!("Recoverable engine error '{}'", kind);
                self.schedule_restart(now, true);
            }
        }
    }

    /// Engine callback: the engine stopped
    pub fn on_engine_end(&mut self, now: Instant) {
        if !self.wants_listening || self.state.status.is_fatal() {
            debug!("Engine ended, session not listening");
            return;
        }
        if self.timer.is_some() {
            debug!("Engine ended, restart already pending");
            return;
        }
        self.schedule_restart(now, false);
    }

    /// Fire every timer that is due
    pub fn poll_timers(&mut self, now: Instant) {
        self.state.suppressor.expire(now);

        let Some(timer) = self.timer else {
            return;
        };
        if now < timer.deadline {
            return;
        }
        self.timer = None;

        match timer.kind {
            TimerKind::Restart { fault } => self.fire_restart(now, fault),
            TimerKind::StartRetry => self.fire_start_retry(),
        }
    }

    fn schedule_restart(&mut self, now: Instant, fault: bool) {
        if self.timer.is_some() {
            return;
        }

        if let Some(max) = self.policy.max_restart_attempts.filter(|_| fault) {
            if self.restart_attempts >= max {
                error!("Restart limit of {} reached, giving up", max);
                self.enter_fatal(VoiceError::RestartLimitExceeded(self.restart_attempts));
                return;
            }
        }

        debug!("Restart scheduled in {:?}", self.policy.restart_delay);
        self.state.status = SessionStatus::Restarting;
        self.timer = Some(PendingTimer {
            kind: TimerKind::Restart { fault },
            deadline: now + self.policy.restart_delay,
        });
    }

    fn fire_restart(&mut self, now: Instant, fault: bool) {
        if !self.wants_listening {
            return;
        }
        if fault {
            self.restart_attempts += 1;
        }
        debug!(
            "Restarting engine ({}, attempt {})",
            self.state.language_tag, self.restart_attempts
        );

        self.engine.set_language(&self.state.language_tag);
        if let Err(e) = self.engine.start() {
            // No End will follow a start that never happened
            warn!("Engine restart failed: {}", e);
            self.schedule_restart(now, true);
        }
    }

    fn fire_start_retry(&mut self) {
        if !self.wants_listening {
            return;
        }
        self.engine.set_language(&self.state.language_tag);
        match self.engine.start() {
            Ok(()) => {
                info!("Listening started on retry ({})", self.state.language_tag);
                self.state.status = SessionStatus::Listening;
            }
            Err(e) => {
                error!("Engine start retry failed: {}", e);
                self.wants_listening = false;
                self.state.status = SessionStatus::Idle;
                self.state.set_error(VoiceError::StartFailed(e.to_string()));
            }
        }
    }

    fn enter_fatal(&mut self, error: VoiceError) {
        error!("Listening stopped: {}", error);
        self.wants_listening = false;
        self.timer = None;
        self.state.status = SessionStatus::Fatal;
        self.state.set_error(error);
    }

    fn track_recoverable(&mut self, kind: &EngineErrorKind) {
        match kind {
            EngineErrorKind::NetworkFailure => {
                self.network_failures += 1;
                if self.network_failures == self.policy.network_failure_report_threshold {
                    warn!("{} network failures in a row", self.network_failures);
                    self.state
                        .set_error(VoiceError::NetworkFailure(self.network_failures));
                }
            }
            EngineErrorKind::Unclassified(code) => {
                self.unclassified_failures += 1;
                if self.unclassified_failures == UNCLASSIFIED_REPORT_THRESHOLD {
                    warn!("Engine error '{}' recurred", code);
                    self.state.set_error(VoiceError::EngineFault(code.clone()));
                }
            }
            _ => {}
        }
    }

    fn reset_counters(&mut self) {
        self.restart_attempts = 0;
        self.network_failures = 0;
        self.unclassified_failures = 0;
    }
}

impl<E: RecognitionEngine> Drop for SessionMachine<E> {
    fn drop(&mut self) {
        self.stop();
    }
}
