//! Merge tones
//!
//! Procedurally generated - no sound files. Bigger fruit ring lower-to-higher
//! with longer notes and extra harmonics. The engine only talks to a
//! `ToneSink`; on wasm32 that is the Web Audio API, elsewhere nothing plays.

use std::fmt;

use crate::ladder::Rank;

/// One oscillator note
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneNote {
    /// Frequency (Hz)
    pub freq: f32,
    /// Length (seconds)
    pub duration: f32,
    /// Start offset from now (seconds)
    pub delay: f32,
}

/// Notes played when a merge produces a fruit of `rank`
pub fn merge_tone(rank: Rank) -> Vec<ToneNote> {
    let rank = rank as f32;
    let freq = 200.0 + rank * 100.0;
    let duration = 0.3 + rank * 0.1;

    let mut notes = vec![ToneNote {
        freq,
        duration,
        delay: 0.0,
    }];
    if rank >= 3.0 {
        notes.push(ToneNote {
            freq: freq * 1.5,
            duration: duration * 0.7,
            delay: 0.05,
        });
    }
    if rank >= 6.0 {
        notes.push(ToneNote {
            freq: freq * 2.0,
            duration: duration * 0.5,
            delay: 0.1,
        });
    }
    notes
}

/// Audio backend failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioError {
    /// No audio context could be created
    Unavailable(String),
    /// The context refused to start or a node failed
    Playback(String),
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioError::Unavailable(why) => write!(f, "audio unavailable: {why}"),
            AudioError::Playback(why) => write!(f, "audio playback failed: {why}"),
        }
    }
}

impl std::error::Error for AudioError {}

/// Something that can play a note
pub trait ToneSink {
    fn play(&mut self, note: &ToneNote, volume: f32) -> Result<(), AudioError>;
}

/// Merge sound player. Silent until a sink is attached.
pub struct MergeAudio {
    sink: Option<Box<dyn ToneSink>>,
    volume: f32,
    muted: bool,
}

impl Default for MergeAudio {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MergeAudio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MergeAudio")
            .field("enabled", &self.is_enabled())
            .field("volume", &self.volume)
            .field("muted", &self.muted)
            .finish()
    }
}

impl MergeAudio {
    pub fn new() -> Self {
        Self {
            sink: None,
            volume: 0.8,
            muted: false,
        }
    }

    /// Attach a started backend
    pub fn enable(&mut self, sink: Box<dyn ToneSink>) {
        self.sink = Some(sink);
        log::info!("Audio enabled");
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    /// Set volume (0.0 - 1.0)
    pub fn set_volume(&mut self, vol: f32) {
        self.volume = vol.clamp(0.0, 1.0);
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Play the merge tone for a produced fruit; failures are logged only
    pub fn play_merge(&mut self, rank: Rank) {
        if self.muted || self.volume <= 0.0 {
            return;
        }
        let Some(sink) = self.sink.as_mut() else {
            return;
        };
        for note in merge_tone(rank) {
            if let Err(e) = sink.play(&note, self.volume) {
                log::warn!("Merge tone skipped: {e}");
                return;
            }
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub use web::WebAudioSink;

#[cfg(target_arch = "wasm32")]
mod web {
    use wasm_bindgen_futures::JsFuture;
    use web_sys::{AudioContext, GainNode, OscillatorNode, OscillatorType};

    use super::{AudioError, ToneNote, ToneSink};

    /// Envelope (seconds)
    const ATTACK: f64 = 0.01;
    const DECAY: f64 = 0.2;
    const SUSTAIN: f32 = 0.1;
    const RELEASE: f64 = 0.3;

    /// Web Audio backend: one sine oscillator per note
    pub struct WebAudioSink {
        ctx: AudioContext,
    }

    impl WebAudioSink {
        /// Create and resume a context. Must run inside a user gesture.
        pub async fn start() -> Result<Self, AudioError> {
            let ctx = AudioContext::new()
                .map_err(|e| AudioError::Unavailable(format!("{e:?}")))?;
            if ctx.state() != web_sys::AudioContextState::Running {
                let resume = ctx
                    .resume()
                    .map_err(|e| AudioError::Playback(format!("{e:?}")))?;
                JsFuture::from(resume)
                    .await
                    .map_err(|e| AudioError::Playback(format!("{e:?}")))?;
            }
            Ok(Self { ctx })
        }

        /// Create an oscillator with gain envelope
        fn create_osc(&self, freq: f32) -> Option<(OscillatorNode, GainNode)> {
            let osc = self.ctx.create_oscillator().ok()?;
            let gain = self.ctx.create_gain().ok()?;

            osc.set_type(OscillatorType::Sine);
            osc.frequency().set_value(freq);
            osc.connect_with_audio_node(&gain).ok()?;
            gain.connect_with_audio_node(&self.ctx.destination()).ok()?;

            Some((osc, gain))
        }
    }

    impl ToneSink for WebAudioSink {
        fn play(&mut self, note: &ToneNote, volume: f32) -> Result<(), AudioError> {
            let (osc, gain) = self
                .create_osc(note.freq)
                .ok_or_else(|| AudioError::Playback("oscillator setup".into()))?;

            let t = self.ctx.current_time() + note.delay as f64;
            let hold = (note.duration as f64).max(ATTACK + DECAY);
            let peak = volume * 0.3;

            let g = gain.gain();
            g.set_value_at_time(0.0, t).ok();
            g.linear_ramp_to_value_at_time(peak, t + ATTACK).ok();
            g.exponential_ramp_to_value_at_time((peak * SUSTAIN).max(0.001), t + ATTACK + DECAY)
                .ok();
            g.set_value_at_time((peak * SUSTAIN).max(0.001), t + hold).ok();
            g.exponential_ramp_to_value_at_time(0.001, t + hold + RELEASE).ok();

            osc.start_with_when(t)
                .map_err(|e| AudioError::Playback(format!("{e:?}")))?;
            osc.stop_with_when(t + hold + RELEASE)
                .map_err(|e| AudioError::Playback(format!("{e:?}")))?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default, Clone)]
    struct Recorder {
        notes: Rc<RefCell<Vec<ToneNote>>>,
        fail: bool,
    }

    impl ToneSink for Recorder {
        fn play(&mut self, note: &ToneNote, _volume: f32) -> Result<(), AudioError> {
            if self.fail {
                return Err(AudioError::Playback("test".into()));
            }
            self.notes.borrow_mut().push(*note);
            Ok(())
        }
    }

    #[test]
    fn test_small_fruit_single_note() {
        let notes = merge_tone(1);
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].freq, 300.0);
        assert!((notes[0].duration - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_harmonics_for_big_fruit() {
        assert_eq!(merge_tone(3).len(), 2);
        let notes = merge_tone(6);
        assert_eq!(notes.len(), 3);
        assert_eq!(notes[1].freq, 800.0 * 1.5);
        assert_eq!(notes[2].freq, 1600.0);
        assert!((notes[2].delay - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_silent_until_enabled() {
        let recorder = Recorder::default();
        let mut audio = MergeAudio::new();
        audio.play_merge(4);
        assert!(!audio.is_enabled());

        audio.enable(Box::new(recorder.clone()));
        audio.play_merge(4);
        assert_eq!(recorder.notes.borrow().len(), 2);
    }

    #[test]
    fn test_muted_plays_nothing() {
        let recorder = Recorder::default();
        let mut audio = MergeAudio::new();
        audio.enable(Box::new(recorder.clone()));
        audio.set_muted(true);
        audio.play_merge(7);
        assert!(recorder.notes.borrow().is_empty());
    }

    #[test]
    fn test_volume_clamped() {
        let mut audio = MergeAudio::new();
        audio.set_volume(1.7);
        assert_eq!(audio.volume(), 1.0);
        audio.set_volume(-0.2);
        assert_eq!(audio.volume(), 0.0);

        let recorder = Recorder::default();
        audio.enable(Box::new(recorder.clone()));
        audio.play_merge(1);
        assert!(recorder.notes.borrow().is_empty());
    }

    #[test]
    fn test_failing_sink_is_swallowed() {
        let mut audio = MergeAudio::new();
        audio.enable(Box::new(Recorder {
            fail: true,
            ..Default::default()
        }));
        audio.play_merge(2);
        assert!(audio.is_enabled());
    }
}
