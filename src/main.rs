//! Nebula - interactive voice command console
//!
//! Drives a listening session over a loopback engine. Each stdin line is a
//! final transcript unless it starts with `:`:
//!
//! ```text
//! :partial <text>   interim transcript
//! :error <code>     engine error (no-speech, not-allowed, network, ...)
//! :end              engine ended
//! :start / :stop    start or stop listening
//! :lang <tag>       switch language
//! :ok / :fail       report the wallet outcome of the last command
//! :quit             exit
//! ```

use anyhow::{Context, Result};
use nebula_voice::{
    EngineEventSender, LoopbackEngine, SessionEvent, SessionHandle, VoiceConfig, VoiceSession,
};
use std::io::{self, BufRead};
use std::thread;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nebula_voice=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => VoiceConfig::load(&path)
            .with_context(|| format!("Failed to load configuration from {}", path))?,
        None => VoiceConfig::default(),
    };

    info!("Starting Nebula voice console ({})", config.language);

    let (handle, worker) = VoiceSession::new(config, LoopbackEngine::new)?;
    let worker_handle = worker.start();

    let events = handle.event_receiver();
    let printer = thread::spawn(move || {
        for event in events.iter() {
            match event {
                SessionEvent::Command(emitted) => match serde_json::to_string(&emitted) {
                    Ok(json) => println!("{}", json),
                    Err(e) => warn!("Failed to serialize command: {}", e),
                },
                SessionEvent::StatusChanged(status) => eprintln!("[status] {}", status),
                SessionEvent::Preview(text) => eprintln!("[preview] {}", text),
                SessionEvent::Error(e) => eprintln!("[error] {}", e.user_message()),
                SessionEvent::Cue(cue) => eprintln!("[cue] {}", cue),
                SessionEvent::Shutdown => break,
            }
        }
    });

    handle.start()?;

    let engine = handle.engine_events();
    for line in io::stdin().lock().lines() {
        let line = line.context("Failed to read stdin")?;
        if !dispatch(&handle, &engine, line.trim())? {
            break;
        }
    }

    handle.shutdown()?;
    if worker_handle.join().is_err() {
        warn!("Session worker panicked");
    }
    if printer.join().is_err() {
        warn!("Event printer panicked");
    }

    info!("Nebula voice console stopped");
    Ok(())
}

/// Act on one console line; returns false to exit
fn dispatch(handle: &SessionHandle, engine: &EngineEventSender, line: &str) -> Result<bool> {
    let Some(directive) = line.strip_prefix(':') else {
        if !line.is_empty() {
            engine.result(line, true);
        }
        return Ok(true);
    };

    let (name, arg) = directive
        .split_once(char::is_whitespace)
        .map(|(n, a)| (n, a.trim()))
        .unwrap_or((directive, ""));

    match name {
        "partial" => {
            engine.result(arg, false);
        }
        "error" => {
            engine.error(arg);
        }
        "end" => {
            engine.end();
        }
        "start" => handle.start()?,
        "stop" => handle.stop()?,
        "lang" => handle.set_language(arg)?,
        "ok" => handle.report_wallet_outcome(true)?,
        "fail" => handle.report_wallet_outcome(false)?,
        "quit" | "exit" => return Ok(false),
        other => eprintln!("Unknown directive ':{}'", other),
    }
    Ok(true)
}
