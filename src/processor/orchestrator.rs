//! Session worker that drives the listening state machine
//!
//! One thread owns the recognition engine, the state machine and the command
//! emitter. It reacts to:
//! - Commands from the UI (start, stop, language changes, wallet outcomes)
//! - Callbacks from the recognition engine
//! - Its own restart and suppression deadlines
//!
//! After every step it publishes the session into a `SharedSessionState`
//! and emits `SessionEvent`s for whatever changed.

use crate::command::Command;
use crate::config::VoiceConfig;
use crate::emitter::CommandEmitter;
use crate::error::{Result, VoiceError};
use crate::feedback::AudioCue;
use crate::session::{
    EngineEvent, EngineEventSender, RecognitionEngine, SessionMachine, SessionState,
    SessionStatus, SharedSessionState,
};
use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, select, unbounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, info_span, warn};
use uuid::Uuid;

/// Longest the worker sleeps when no deadline is pending
const IDLE_WAIT: Duration = Duration::from_secs(1);

/// Commands that can be sent to the session worker
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionCommand {
    /// Begin listening in the configured language
    Start,
    /// Stop listening
    Stop,
    /// Switch the recognition language
    SetLanguage(String),
    /// Deliver an engine callback through the command channel
    Engine(EngineEvent),
    /// Result of executing the last command on the wallet
    WalletOutcome { success: bool },
    /// Stop listening and end the worker
    Shutdown,
}

/// A command delivered to the consumer
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmittedCommand {
    #[serde(flatten)]
    pub command: Command,
    pub session_id: Uuid,
    pub timestamp: DateTime<Utc>,
}

/// Events emitted by the session worker
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    /// The session status changed
    StatusChanged(SessionStatus),
    /// Live transcript preview changed
    Preview(String),
    /// A command was recognized (or unrecognized speech surfaced)
    Command(EmittedCommand),
    /// An error was surfaced to the user
    Error(VoiceError),
    /// A feedback sound should be played
    Cue(AudioCue),
    /// Worker has shut down
    Shutdown,
}

/// Entry point for creating a voice session
pub struct VoiceSession;

impl VoiceSession {
    /// Create a session around the engine built by `make_engine`
    ///
    /// The factory receives the sender through which the engine reports its
    /// callbacks. Returns the handle (for the UI) and the worker (to be
    /// started on its own thread).
    pub fn new<E, F>(config: VoiceConfig, make_engine: F) -> Result<(SessionHandle, SessionWorker<E>)>
    where
        E: RecognitionEngine + 'static,
        F: FnOnce(EngineEventSender) -> E,
    {
        config.validate()?;

        let session_id = Uuid::new_v4();
        let buffer_size = config.channel_buffer_size;

        let (command_tx, command_rx) = bounded(buffer_size);
        let (event_tx, event_rx) = bounded(buffer_size);
        // The engine reports from the worker thread itself, so this one
        // must never block.
        let (engine_tx, engine_rx) = unbounded();
        let engine_events = EngineEventSender::new(engine_tx);

        let engine = make_engine(engine_events.clone());
        let state = SessionState::new(config.language.clone(), config.suppression_window());
        let machine = SessionMachine::new(engine, state, config.restart_policy());
        let emitter = CommandEmitter::default().with_min_unknown_chars(config.min_unknown_chars);

        let shared = SharedSessionState::new(config.language.clone());

        info!("Voice session {} created ({})", session_id, config.language);

        let handle = SessionHandle {
            session_id,
            command_tx,
            event_rx,
            engine_events,
            state: shared.clone(),
        };

        let worker = SessionWorker {
            session_id,
            machine,
            emitter,
            command_rx,
            engine_rx,
            event_tx,
            shared,
            announced_startup: false,
        };

        Ok((handle, worker))
    }
}

/// Handle for controlling the session from the UI or tests
pub struct SessionHandle {
    session_id: Uuid,
    command_tx: Sender<SessionCommand>,
    event_rx: Receiver<SessionEvent>,
    engine_events: EngineEventSender,
    state: SharedSessionState,
}

impl SessionHandle {
    /// Send a command to the worker
    pub fn send_command(&self, cmd: SessionCommand) -> Result<()> {
        self.command_tx
            .send(cmd)
            .map_err(|e| VoiceError::ChannelError(format!("Failed to send command: {}", e)))
    }

    /// Start listening
    pub fn start(&self) -> Result<()> {
        self.send_command(SessionCommand::Start)
    }

    /// Stop listening
    pub fn stop(&self) -> Result<()> {
        self.send_command(SessionCommand::Stop)
    }

    /// Change the recognition language
    pub fn set_language(&self, tag: impl Into<String>) -> Result<()> {
        self.send_command(SessionCommand::SetLanguage(tag.into()))
    }

    /// Report whether the wallet executed the last command
    pub fn report_wallet_outcome(&self, success: bool) -> Result<()> {
        self.send_command(SessionCommand::WalletOutcome { success })
    }

    /// Request shutdown
    pub fn shutdown(&self) -> Result<()> {
        self.send_command(SessionCommand::Shutdown)
    }

    /// Try to receive an event (non-blocking)
    pub fn try_recv_event(&self) -> Option<SessionEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Receive an event (blocking)
    pub fn recv_event(&self) -> Result<SessionEvent> {
        self.event_rx
            .recv()
            .map_err(|e| VoiceError::ChannelError(format!("Failed to receive event: {}", e)))
    }

    /// Receive an event, waiting at most `timeout`
    pub fn recv_event_timeout(&self, timeout: Duration) -> Option<SessionEvent> {
        match self.event_rx.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Event receiver, for use in `select!`
    pub fn event_receiver(&self) -> Receiver<SessionEvent> {
        self.event_rx.clone()
    }

    /// Sender an engine (or a test) uses to deliver callbacks
    pub fn engine_events(&self) -> EngineEventSender {
        self.engine_events.clone()
    }

    /// Session identifier used in logs and emitted commands
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Get the shared session state
    pub fn state(&self) -> &SharedSessionState {
        &self.state
    }

    /// Current status
    pub fn status(&self) -> SessionStatus {
        self.state.status()
    }

    /// Check if listening
    pub fn is_listening(&self) -> bool {
        self.state.is_listening()
    }
}

/// What the worker last published, for change detection
struct Published {
    status: SessionStatus,
    last_error: Option<VoiceError>,
    preview: String,
}

/// Worker that owns the engine and runs the session loop
pub struct SessionWorker<E: RecognitionEngine> {
    session_id: Uuid,
    machine: SessionMachine<E>,
    emitter: CommandEmitter,
    command_rx: Receiver<SessionCommand>,
    engine_rx: Receiver<EngineEvent>,
    event_tx: Sender<SessionEvent>,
    shared: SharedSessionState,
    announced_startup: bool,
}

impl<E: RecognitionEngine + 'static> SessionWorker<E> {
    /// Start the worker thread
    pub fn start(self) -> JoinHandle<()> {
        thread::spawn(move || {
            if let Err(e) = self.run() {
                error!("Session worker error: {}", e);
            }
        })
    }

    /// Main worker loop
    fn run(mut self) -> Result<()> {
        let span = info_span!("session", id = %self.session_id);
        let _enter = span.enter();
        info!("Session worker starting");

        let command_rx = self.command_rx.clone();
        let engine_rx = self.engine_rx.clone();

        loop {
            let before = self.published();

            let timeout = self
                .machine
                .next_deadline()
                .map(|deadline| deadline.saturating_duration_since(Instant::now()))
                .unwrap_or(IDLE_WAIT);

            select! {
                recv(command_rx) -> cmd => match cmd {
                    Ok(SessionCommand::Shutdown) => {
                        info!("Shutdown requested");
                        self.machine.stop();
                        self.sync(before);
                        self.emit(SessionEvent::Shutdown);
                        info!("Session worker stopped");
                        return Ok(());
                    }
                    Ok(cmd) => self.handle_command(cmd),
                    Err(_) => {
                        info!("Command channel closed, stopping session");
                        self.machine.stop();
                        return Ok(());
                    }
                },
                recv(engine_rx) -> event => match event {
                    Ok(event) => self.handle_engine_event(event),
                    Err(e) => {
                        return Err(VoiceError::ChannelError(format!(
                            "Engine channel closed: {}",
                            e
                        )));
                    }
                },
                default(timeout) => {}
            }

            self.machine.poll_timers(Instant::now());
            self.sync(before);
        }
    }

    fn handle_command(&mut self, cmd: SessionCommand) {
        let now = Instant::now();
        match cmd {
            SessionCommand::Start => {
                let language = self.machine.state().language_tag.clone();
                if let Err(e) = self.machine.start(&language, now) {
                    self.emit_unrecorded_error(e);
                }
            }
            SessionCommand::Stop => self.machine.stop(),
            SessionCommand::SetLanguage(tag) => {
                if let Err(e) = self.machine.set_language(&tag) {
                    warn!("Language change rejected: {}", e);
                    self.emit(SessionEvent::Error(e));
                }
            }
            SessionCommand::Engine(event) => self.handle_engine_event(event),
            SessionCommand::WalletOutcome { success } => {
                debug!("Wallet outcome: {}", if success { "success" } else { "failure" });
                self.emit(SessionEvent::Cue(if success {
                    AudioCue::Success
                } else {
                    AudioCue::Error
                }));
            }
            SessionCommand::Shutdown => {}
        }
    }

    fn handle_engine_event(&mut self, event: EngineEvent) {
        let now = Instant::now();
        match event {
            EngineEvent::Started => self.machine.on_engine_started(),
            EngineEvent::Result {
                transcript,
                is_final,
            } => {
                let Some(text) = self.machine.on_transcript(&transcript, is_final) else {
                    return;
                };
                if let Some(command) = self.emitter.process(self.machine.state_mut(), &text, now) {
                    self.deliver(command);
                }
            }
            EngineEvent::Error(code) => self.machine.on_engine_error(&code, now),
            EngineEvent::End => self.machine.on_engine_end(now),
        }
    }

    fn deliver(&mut self, command: Command) {
        let cue = if command.is_unknown() {
            AudioCue::Error
        } else {
            AudioCue::Command
        };
        self.shared.set_last_command(command.clone());
        self.emit(SessionEvent::Command(EmittedCommand {
            command,
            session_id: self.session_id,
            timestamp: Utc::now(),
        }));
        self.emit(SessionEvent::Cue(cue));
    }

    /// Errors the machine rejected without recording them in its state
    fn emit_unrecorded_error(&mut self, error: VoiceError) {
        warn!("Start rejected: {}", error);
        if self.machine.last_error() != Some(&error) {
            self.emit(SessionEvent::Error(error));
        }
    }

    fn published(&self) -> Published {
        let state = self.machine.state();
        Published {
            status: state.status,
            last_error: state.last_error.clone(),
            preview: state.preview.clone(),
        }
    }

    /// Publish the machine state and emit events for what changed
    fn sync(&mut self, before: Published) {
        let after = self.published();
        self.shared.publish(self.machine.state());

        if after.preview != before.preview {
            self.emit(SessionEvent::Preview(after.preview.clone()));
        }

        if after.status != before.status {
            debug!("Status {} -> {}", before.status, after.status);
            self.emit(SessionEvent::StatusChanged(after.status));

            if after.status.is_listening() && !self.announced_startup {
                self.announced_startup = true;
                self.emit(SessionEvent::Cue(AudioCue::Startup));
            }
        }

        if after.last_error != before.last_error {
            if let Some(error) = after.last_error {
                // Recoverable faults keep the session listening
                let recoverable = error.is_recoverable();
                self.emit(SessionEvent::Error(error));
                if recoverable {
                    self.emit(SessionEvent::Cue(AudioCue::Notification));
                }
            }
        }
    }

    fn emit(&self, event: SessionEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!("Event channel full, dropping {:?}", event);
            }
            Err(TrySendError::Disconnected(_)) => {
                debug!("No event receiver");
            }
        }
    }
}
