//! End-to-end session tests
//!
//! Run a real worker thread over a loopback engine and drive it the way a
//! browser recognizer would: start, transcripts, faults and ends.

use nebula_voice::{
    CommandType, LoopbackEngine, SessionEvent, SessionHandle, SessionStatus, VoiceConfig,
    VoiceError, VoiceSession,
};
use nebula_voice::feedback::AudioCue;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const WAIT: Duration = Duration::from_secs(2);

fn spawn(config: VoiceConfig) -> (SessionHandle, JoinHandle<()>) {
    let (handle, worker) = VoiceSession::new(config, LoopbackEngine::new).unwrap();
    (handle, worker.start())
}

fn fast_config() -> VoiceConfig {
    VoiceConfig::new()
        .with_language("en-US")
        .with_restart_delay_ms(20)
        .with_start_retry_delay_ms(20)
        .with_suppression_window_ms(300)
}

/// Collect events until `pred` matches (inclusive)
fn collect_until(handle: &SessionHandle, pred: impl Fn(&SessionEvent) -> bool) -> Vec<SessionEvent> {
    let deadline = Instant::now() + WAIT;
    let mut events = Vec::new();
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let Some(event) = handle.recv_event_timeout(remaining) else {
            panic!("Timed out; received so far: {:?}", events);
        };
        let done = pred(&event);
        events.push(event);
        if done {
            return events;
        }
    }
}

/// Collect everything that arrives within `window`
fn drain_for(handle: &SessionHandle, window: Duration) -> Vec<SessionEvent> {
    let deadline = Instant::now() + window;
    let mut events = Vec::new();
    while let Some(event) =
        handle.recv_event_timeout(deadline.saturating_duration_since(Instant::now()))
    {
        events.push(event);
    }
    events
}

fn commands(events: &[SessionEvent]) -> Vec<CommandType> {
    events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::Command(c) => Some(c.command.command_type),
            _ => None,
        })
        .collect()
}

fn start_listening(handle: &SessionHandle) {
    handle.start().unwrap();
    collect_until(handle, |e| {
        matches!(e, SessionEvent::StatusChanged(SessionStatus::Listening))
    });
    // Startup cue and the engine's acknowledgement
    drain_for(handle, Duration::from_millis(50));
}

fn shutdown(handle: SessionHandle, join: JoinHandle<()>) {
    handle.shutdown().unwrap();
    collect_until(&handle, |e| matches!(e, SessionEvent::Shutdown));
    join.join().unwrap();
}

#[test]
fn test_duplicate_transcript_emitted_once() {
    let (handle, join) = spawn(fast_config());
    start_listening(&handle);

    let engine = handle.engine_events();
    engine.result("Check balance", true);
    engine.result("check balance", true);

    let events = drain_for(&handle, Duration::from_millis(150));
    assert_eq!(commands(&events), vec![CommandType::Balance]);

    // Same words after the window are a new command
    thread::sleep(Duration::from_millis(300));
    engine.result("check balance", true);
    let events = collect_until(&handle, |e| matches!(e, SessionEvent::Command(_)));
    assert_eq!(commands(&events), vec![CommandType::Balance]);

    shutdown(handle, join);
}

#[test]
fn test_restart_survives_utterance_ends() {
    let (handle, join) = spawn(fast_config());
    start_listening(&handle);
    let engine = handle.engine_events();

    for _ in 0..3 {
        engine.end();
        let events = collect_until(&handle, |e| {
            matches!(e, SessionEvent::StatusChanged(SessionStatus::Listening))
        });
        assert!(events.contains(&SessionEvent::StatusChanged(SessionStatus::Restarting)));
        // Only the first start plays the startup sound
        assert!(!events.contains(&SessionEvent::Cue(AudioCue::Startup)));
    }

    engine.result("connect wallet", true);
    let events = collect_until(&handle, |e| matches!(e, SessionEvent::Command(_)));
    assert_eq!(commands(&events), vec![CommandType::Connect]);

    shutdown(handle, join);
}

#[test]
fn test_fatal_error_stops_restarts() {
    let (handle, join) = spawn(fast_config());
    start_listening(&handle);
    let engine = handle.engine_events();

    engine.error("audio-capture");
    engine.end();

    collect_until(&handle, |e| {
        matches!(e, SessionEvent::Error(VoiceError::AudioCaptureUnavailable))
    });
    let later = drain_for(&handle, Duration::from_millis(150));
    assert!(later.iter().all(|e| !matches!(e, SessionEvent::StatusChanged(_))));
    assert_eq!(handle.status(), SessionStatus::Fatal);

    // A fresh start recovers
    start_listening(&handle);
    assert!(handle.state().last_error().is_none());

    shutdown(handle, join);
}

#[test]
fn test_stop_cancels_pending_restart() {
    let config = fast_config().with_restart_delay_ms(200);
    let (handle, join) = spawn(config);
    start_listening(&handle);

    handle.engine_events().error("network");
    collect_until(&handle, |e| {
        matches!(e, SessionEvent::StatusChanged(SessionStatus::Restarting))
    });

    handle.stop().unwrap();
    collect_until(&handle, |e| matches!(e, SessionEvent::StatusChanged(SessionStatus::Idle)));

    let later = drain_for(&handle, Duration::from_millis(350));
    assert!(later.is_empty(), "unexpected events after stop: {:?}", later);
    assert_eq!(handle.status(), SessionStatus::Idle);

    shutdown(handle, join);
}

#[test]
fn test_short_noise_never_surfaces() {
    let (handle, join) = spawn(fast_config());
    start_listening(&handle);
    let engine = handle.engine_events();

    engine.result("uh", true);
    engine.result("hmm", true);
    engine.result("what is the weather", true);

    let events = collect_until(&handle, |e| matches!(e, SessionEvent::Command(_)));
    assert_eq!(commands(&events), vec![CommandType::Unknown]);
    collect_until(&handle, |e| matches!(e, SessionEvent::Cue(AudioCue::Error)));

    shutdown(handle, join);
}

#[test]
fn test_send_command_carries_amount_and_address() {
    let (handle, join) = spawn(fast_config());
    start_listening(&handle);

    handle
        .engine_events()
        .result("send 0.25 eth to 0xAbCdEf0123456789abcdef0123456789ABCDEF01", true);

    let events = collect_until(&handle, |e| matches!(e, SessionEvent::Command(_)));
    let Some(SessionEvent::Command(emitted)) = events.last() else {
        panic!("expected command");
    };
    assert_eq!(emitted.command.command_type, CommandType::Send);
    assert_eq!(emitted.command.amount, Some(0.25));
    assert_eq!(
        emitted.command.address.as_deref(),
        Some("0xAbCdEf0123456789abcdef0123456789ABCDEF01")
    );

    shutdown(handle, join);
}

#[test]
fn test_language_switch_while_listening() {
    let (handle, join) = spawn(fast_config());
    start_listening(&handle);

    handle.set_language("es-ES").unwrap();
    // The engine is stopped and restarted in the new language
    collect_until(&handle, |e| {
        matches!(e, SessionEvent::StatusChanged(SessionStatus::Restarting))
    });
    collect_until(&handle, |e| {
        matches!(e, SessionEvent::StatusChanged(SessionStatus::Listening))
    });
    assert_eq!(handle.state().language_tag(), "es-ES");

    handle.engine_events().result("mostrar saldo", true);
    let events = collect_until(&handle, |e| matches!(e, SessionEvent::Command(_)));
    assert_eq!(commands(&events), vec![CommandType::Balance]);

    shutdown(handle, join);
}

#[test]
fn test_network_failures_reported_then_cleared() {
    let (handle, join) = spawn(fast_config().with_network_failure_report_threshold(2));
    start_listening(&handle);
    let engine = handle.engine_events();

    for _ in 0..2 {
        engine.error("network");
        engine.end();
        collect_until(&handle, |e| {
            matches!(e, SessionEvent::StatusChanged(SessionStatus::Listening))
        });
    }
    assert_eq!(handle.state().last_error(), Some(VoiceError::NetworkFailure(2)));

    engine.result("my account", true);
    collect_until(&handle, |e| matches!(e, SessionEvent::Command(_)));
    assert!(handle.state().last_error().is_none());

    shutdown(handle, join);
}
