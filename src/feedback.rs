//! Audio feedback cues
//!
//! Short tone sequences that accompany session activity. The session only
//! announces which cue to play; rendering to samples is offered for hosts
//! that have an output device.

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::time::Duration;

/// Peak gain of every tone
const START_GAIN: f32 = 0.1;

/// Gain a tone decays to by its end
const END_GAIN: f32 = 0.01;

/// Oscillator shape
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    Sine,
    Square,
    Sawtooth,
}

impl Waveform {
    /// Value at `phase` (in cycles), in [-1, 1]
    fn sample(&self, phase: f32) -> f32 {
        let frac = phase.fract();
        match self {
            Waveform::Sine => (2.0 * PI * frac).sin(),
            Waveform::Square => {
                if frac < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Sawtooth => 2.0 * frac - 1.0,
        }
    }
}

/// One tone of a cue
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tone {
    pub frequency_hz: f32,
    pub duration: Duration,
    pub waveform: Waveform,
    /// Offset from the start of the cue
    pub offset: Duration,
}

impl Tone {
    const fn new(frequency_hz: f32, duration_ms: u64, waveform: Waveform, offset_ms: u64) -> Self {
        Self {
            frequency_hz,
            duration: Duration::from_millis(duration_ms),
            waveform,
            offset: Duration::from_millis(offset_ms),
        }
    }

    /// When this tone stops, relative to the start of the cue
    pub fn end(&self) -> Duration {
        self.offset + self.duration
    }
}

const STARTUP: &[Tone] = &[
    Tone::new(440.0, 200, Waveform::Sine, 0),
    Tone::new(554.0, 200, Waveform::Sine, 200),
    Tone::new(659.0, 300, Waveform::Sine, 400),
    Tone::new(880.0, 400, Waveform::Sine, 700),
];

const COMMAND: &[Tone] = &[Tone::new(800.0, 100, Waveform::Square, 0)];

const SUCCESS: &[Tone] = &[
    Tone::new(523.0, 150, Waveform::Sine, 0),
    Tone::new(659.0, 150, Waveform::Sine, 150),
    Tone::new(784.0, 200, Waveform::Sine, 300),
];

const ERROR: &[Tone] = &[
    Tone::new(300.0, 200, Waveform::Sawtooth, 0),
    Tone::new(250.0, 200, Waveform::Sawtooth, 200),
];

const NOTIFICATION: &[Tone] = &[Tone::new(1000.0, 100, Waveform::Sine, 0)];

/// Feedback sound for a session event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioCue {
    /// First successful start of listening
    Startup,
    /// A command was recognized
    Command,
    /// The wallet completed an action
    Success,
    /// Unrecognized speech or a failed wallet action
    Error,
    /// A recoverable fault was surfaced while listening continues
    Notification,
}

impl AudioCue {
    /// Tones making up this cue, ordered by offset
    pub fn tones(&self) -> &'static [Tone] {
        match self {
            AudioCue::Startup => STARTUP,
            AudioCue::Command => COMMAND,
            AudioCue::Success => SUCCESS,
            AudioCue::Error => ERROR,
            AudioCue::Notification => NOTIFICATION,
        }
    }

    /// Total length of the cue
    pub fn duration(&self) -> Duration {
        self.tones()
            .iter()
            .map(Tone::end)
            .max()
            .unwrap_or(Duration::ZERO)
    }

    /// Render the cue as mono f32 samples
    ///
    /// Each tone decays exponentially from its peak gain; overlapping tones
    /// are summed.
    pub fn render(&self, sample_rate: u32) -> Vec<f32> {
        let rate = sample_rate as f32;
        let total = (self.duration().as_secs_f32() * rate).ceil() as usize;
        let mut samples = vec![0.0f32; total];

        for tone in self.tones() {
            let start = (tone.offset.as_secs_f32() * rate) as usize;
            let len = (tone.duration.as_secs_f32() * rate) as usize;
            if len == 0 {
                continue;
            }
            let decay = (END_GAIN / START_GAIN).ln() / len as f32;

            for (i, out) in samples.iter_mut().skip(start).take(len).enumerate() {
                let phase = tone.frequency_hz * i as f32 / rate;
                let gain = START_GAIN * (decay * i as f32).exp();
                *out += tone.waveform.sample(phase) * gain;
            }
        }

        samples
    }
}

impl std::fmt::Display for AudioCue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AudioCue::Startup => write!(f, "startup"),
            AudioCue::Command => write!(f, "command"),
            AudioCue::Success => write!(f, "success"),
            AudioCue::Error => write!(f, "error"),
            AudioCue::Notification => write!(f, "notification"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startup_arpeggio() {
        let freqs: Vec<f32> = AudioCue::Startup.tones().iter().map(|t| t.frequency_hz).collect();
        assert_eq!(freqs, vec![440.0, 554.0, 659.0, 880.0]);
        assert_eq!(AudioCue::Startup.duration(), Duration::from_millis(1100));
    }

    #[test]
    fn test_command_blip() {
        let tones = AudioCue::Command.tones();
        assert_eq!(tones.len(), 1);
        assert_eq!(tones[0].waveform, Waveform::Square);
        assert_eq!(tones[0].frequency_hz, 800.0);
        assert_eq!(AudioCue::Command.duration(), Duration::from_millis(100));
    }

    #[test]
    fn test_error_is_descending_sawtooth() {
        let tones = AudioCue::Error.tones();
        assert!(tones.iter().all(|t| t.waveform == Waveform::Sawtooth));
        assert!(tones[0].frequency_hz > tones[1].frequency_hz);
    }

    #[test]
    fn test_tones_ordered_by_offset() {
        for cue in [
            AudioCue::Startup,
            AudioCue::Command,
            AudioCue::Success,
            AudioCue::Error,
            AudioCue::Notification,
        ] {
            let offsets: Vec<Duration> = cue.tones().iter().map(|t| t.offset).collect();
            assert!(offsets.windows(2).all(|w| w[0] <= w[1]), "{cue}");
        }
    }

    #[test]
    fn test_render_length_and_level() {
        let samples = AudioCue::Success.render(16000);
        assert_eq!(samples.len(), 8000);
        assert!(samples.iter().all(|s| s.abs() <= START_GAIN + f32::EPSILON));
        assert!(samples.iter().any(|s| s.abs() > 0.05));
    }

    #[test]
    fn test_render_decays() {
        let samples = AudioCue::Command.render(16000);
        let head = samples[..200].iter().fold(0.0f32, |m, s| m.max(s.abs()));
        let tail = samples[samples.len() - 200..]
            .iter()
            .fold(0.0f32, |m, s| m.max(s.abs()));
        assert!(head > tail * 5.0);
    }

    #[test]
    fn test_waveform_samples() {
        assert!(Waveform::Sine.sample(0.0).abs() < 1e-6);
        assert!((Waveform::Sine.sample(0.25) - 1.0).abs() < 1e-6);
        assert_eq!(Waveform::Square.sample(0.25), 1.0);
        assert_eq!(Waveform::Square.sample(0.75), -1.0);
        assert_eq!(Waveform::Sawtooth.sample(0.0), -1.0);
        assert_eq!(Waveform::Sawtooth.sample(0.5), 0.0);
    }

    #[test]
    fn test_cue_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&AudioCue::Startup).unwrap(), "\"startup\"");
        assert_eq!(AudioCue::Notification.to_string(), "notification");
    }
}
