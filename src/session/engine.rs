//! Recognition engine abstraction
//!
//! A continuous speech recognizer exposes `start`/`stop` and a language tag,
//! and reports back through four callbacks: started, result, error and end.
//! Engines deliver those callbacks as [`EngineEvent`]s through an
//! [`EngineEventSender`]; the session worker is the only consumer.

use crossbeam_channel::Sender;
use tracing::debug;

/// Callback from the recognition engine
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineEvent {
    /// The engine began capturing
    Started,
    /// A transcript; interim ones may still be revised
    Result { transcript: String, is_final: bool },
    /// The engine reported a fault (raw error code)
    Error(String),
    /// The engine stopped, for whatever reason
    End,
}

impl EngineEvent {
    /// Final transcript event
    pub fn final_result(transcript: impl Into<String>) -> Self {
        EngineEvent::Result {
            transcript: transcript.into(),
            is_final: true,
        }
    }

    /// Interim transcript event
    pub fn interim_result(transcript: impl Into<String>) -> Self {
        EngineEvent::Result {
            transcript: transcript.into(),
            is_final: false,
        }
    }
}

/// What the session does about an engine fault
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorDisposition {
    /// Schedule a restart
    Restart,
    /// Stop listening and report
    Fatal,
    /// Expected during deliberate stops
    Ignore,
}

/// Classified engine error code
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum EngineErrorKind {
    NoSpeechTimeout,
    AudioCaptureUnavailable,
    PermissionDenied,
    NetworkFailure,
    Aborted,
    Unclassified(String),
}

impl EngineErrorKind {
    /// Classify a raw engine error code
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "no-speech" => EngineErrorKind::NoSpeechTimeout,
            "audio-capture" => EngineErrorKind::AudioCaptureUnavailable,
            "not-allowed" => EngineErrorKind::PermissionDenied,
            "network" => EngineErrorKind::NetworkFailure,
            "aborted" => EngineErrorKind::Aborted,
            other => EngineErrorKind::Unclassified(other.to_string()),
        }
    }

    /// How the session reacts to this kind
    pub fn disposition(&self) -> ErrorDisposition {
        match self {
            EngineErrorKind::NoSpeechTimeout => ErrorDisposition::Restart,
            EngineErrorKind::NetworkFailure => ErrorDisposition::Restart,
            // Optimistic retry
            EngineErrorKind::Unclassified(_) => ErrorDisposition::Restart,
            EngineErrorKind::AudioCaptureUnavailable => ErrorDisposition::Fatal,
            EngineErrorKind::PermissionDenied => ErrorDisposition::Fatal,
            EngineErrorKind::Aborted => ErrorDisposition::Ignore,
        }
    }
}

impl std::fmt::Display for EngineErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineErrorKind::NoSpeechTimeout => write!(f, "no-speech"),
            EngineErrorKind::AudioCaptureUnavailable => write!(f, "audio-capture"),
            EngineErrorKind::PermissionDenied => write!(f, "not-allowed"),
            EngineErrorKind::NetworkFailure => write!(f, "network"),
            EngineErrorKind::Aborted => write!(f, "aborted"),
            EngineErrorKind::Unclassified(code) => write!(f, "{}", code),
        }
    }
}

/// Synchronous failure of `RecognitionEngine::start`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineStartError(pub String);

impl std::fmt::Display for EngineStartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for EngineStartError {}

/// A continuous speech recognizer
///
/// `start` and `stop` return immediately; outcomes arrive later as
/// [`EngineEvent`]s. Only the session machine calls these methods.
pub trait RecognitionEngine: Send {
    /// Whether the runtime provides recognition at all
    fn is_supported(&self) -> bool;

    /// Set the language for the next `start`
    fn set_language(&mut self, language_tag: &str);

    /// Begin capturing
    fn start(&mut self) -> Result<(), EngineStartError>;

    /// Stop capturing; the engine still reports `End` afterwards
    fn stop(&mut self);
}

impl<E: RecognitionEngine + ?Sized> RecognitionEngine for Box<E> {
    fn is_supported(&self) -> bool {
        (**self).is_supported()
    }

    fn set_language(&mut self, language_tag: &str) {
        (**self).set_language(language_tag)
    }

    fn start(&mut self) -> Result<(), EngineStartError> {
        (**self).start()
    }

    fn stop(&mut self) {
        (**self).stop()
    }
}

/// Channel through which an engine delivers its callbacks
#[derive(Clone, Debug)]
pub struct EngineEventSender {
    tx: Sender<EngineEvent>,
}

impl EngineEventSender {
    /// Wrap a raw sender
    pub fn new(tx: Sender<EngineEvent>) -> Self {
        Self { tx }
    }

    /// Deliver an event; returns false once the session is gone
    pub fn send(&self, event: EngineEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    /// Report a transcript
    pub fn result(&self, transcript: impl Into<String>, is_final: bool) -> bool {
        self.send(EngineEvent::Result {
            transcript: transcript.into(),
            is_final,
        })
    }

    /// Report an error code
    pub fn error(&self, code: impl Into<String>) -> bool {
        self.send(EngineEvent::Error(code.into()))
    }

    /// Report that the engine stopped
    pub fn end(&self) -> bool {
        self.send(EngineEvent::End)
    }
}

/// Engine whose transcripts are injected from outside
///
/// `start` acknowledges with `Started`, `stop` with `End`, the way browser
/// recognizers do. Transcripts and faults are fed in by whoever holds a clone
/// of the event sender (the CLI reads them from stdin).
pub struct LoopbackEngine {
    events: EngineEventSender,
    language: String,
    starts: u32,
}

impl LoopbackEngine {
    /// Create an engine reporting through `events`
    pub fn new(events: EngineEventSender) -> Self {
        Self {
            events,
            language: String::new(),
            starts: 0,
        }
    }

    /// Language most recently configured
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Number of times the engine was started
    pub fn starts(&self) -> u32 {
        self.starts
    }
}

impl RecognitionEngine for LoopbackEngine {
    fn is_supported(&self) -> bool {
        true
    }

    fn set_language(&mut self, language_tag: &str) {
        self.language = language_tag.to_string();
    }

    fn start(&mut self) -> Result<(), EngineStartError> {
        self.starts += 1;
        debug!("Loopback engine started ({}, #{})", self.language, self.starts);
        if self.events.send(EngineEvent::Started) {
            Ok(())
        } else {
            Err(EngineStartError("session channel closed".into()))
        }
    }

    fn stop(&mut self) {
        debug!("Loopback engine stopped");
        self.events.end();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn test_error_classification() {
        assert_eq!(EngineErrorKind::from_code("no-speech"), EngineErrorKind::NoSpeechTimeout);
        assert_eq!(
            EngineErrorKind::from_code("audio-capture"),
            EngineErrorKind::AudioCaptureUnavailable
        );
        assert_eq!(EngineErrorKind::from_code("not-allowed"), EngineErrorKind::PermissionDenied);
        assert_eq!(EngineErrorKind::from_code("network"), EngineErrorKind::NetworkFailure);
        assert_eq!(EngineErrorKind::from_code("aborted"), EngineErrorKind::Aborted);
        assert_eq!(
            EngineErrorKind::from_code("bad-grammar"),
            EngineErrorKind::Unclassified("bad-grammar".into())
        );
    }

    #[test]
    fn test_dispositions() {
        assert_eq!(EngineErrorKind::NoSpeechTimeout.disposition(), ErrorDisposition::Restart);
        assert_eq!(EngineErrorKind::NetworkFailure.disposition(), ErrorDisposition::Restart);
        assert_eq!(
            EngineErrorKind::Unclassified("x".into()).disposition(),
            ErrorDisposition::Restart
        );
        assert_eq!(EngineErrorKind::PermissionDenied.disposition(), ErrorDisposition::Fatal);
        assert_eq!(
            EngineErrorKind::AudioCaptureUnavailable.disposition(),
            ErrorDisposition::Fatal
        );
        assert_eq!(EngineErrorKind::Aborted.disposition(), ErrorDisposition::Ignore);
    }

    #[test]
    fn test_kind_display_roundtrips_code() {
        for code in ["no-speech", "audio-capture", "not-allowed", "network", "aborted", "other"] {
            assert_eq!(EngineErrorKind::from_code(code).to_string(), code);
        }
    }

    #[test]
    fn test_loopback_engine_acknowledges() {
        let (tx, rx) = unbounded();
        let mut engine = LoopbackEngine::new(EngineEventSender::new(tx));
        engine.set_language("hi-IN");
        assert_eq!(engine.language(), "hi-IN");

        engine.start().unwrap();
        assert_eq!(rx.try_recv().unwrap(), EngineEvent::Started);
        assert_eq!(engine.starts(), 1);

        engine.stop();
        assert_eq!(rx.try_recv().unwrap(), EngineEvent::End);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_loopback_start_fails_without_session() {
        let (tx, rx) = unbounded();
        let mut engine = LoopbackEngine::new(EngineEventSender::new(tx));
        drop(rx);
        assert!(engine.start().is_err());
    }

    #[test]
    fn test_sender_reports_closed_channel() {
        let (tx, rx) = unbounded();
        let events = EngineEventSender::new(tx);
        assert!(events.result("hello", true));
        assert_eq!(rx.try_recv().unwrap(), EngineEvent::final_result("hello"));
        drop(rx);
        assert!(!events.end());
    }
}
