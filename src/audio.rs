//! Gong cues: a synthesized struck-gong tone played through the default
//! output device, plus a recording double for headless runs.

use std::cell::RefCell;
use std::f32::consts::TAU;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    FromSample, SizedSample,
};
use tracing::{debug, warn};

use crate::error::{Capability, CapabilityError};

pub const GONG_SECONDS: f32 = 7.0;

/// (frequency Hz, relative amplitude, decay per second)
const GONG_PARTIALS: [(f32, f32, f32); 6] = [
    (110.0, 1.0, 0.55),
    (172.5, 0.6, 0.8),
    (231.0, 0.45, 1.1),
    (297.0, 0.3, 1.5),
    (419.0, 0.2, 2.2),
    (563.0, 0.12, 3.0),
];

const ATTACK_SECONDS: f32 = 0.005;
const PEAK: f32 = 0.8;

/// A short sound that can be loaded ahead of time and replayed.
pub trait AudioCue {
    /// Loads the sound without playing it.
    fn prime(&mut self) -> Result<(), CapabilityError>;
    fn play(&mut self, from_start: bool) -> Result<(), CapabilityError>;
    fn pause(&mut self);
    /// Gain in `0.0..=1.0`, applied to whatever is playing now and later.
    fn set_volume(&mut self, volume: f32);
}

/// Renders the gong as mono samples at `sample_rate`.
pub fn gong_samples(sample_rate: u32) -> Vec<f32> {
    let sample_rate = sample_rate.max(1) as f32;
    let len = (GONG_SECONDS * sample_rate) as usize;

    let mut samples: Vec<f32> = (0..len)
        .map(|i| {
            let t = i as f32 / sample_rate;
            let attack = (t / ATTACK_SECONDS).min(1.0);
            let tone: f32 = GONG_PARTIALS
                .iter()
                .map(|&(freq, amp, decay)| amp * (-decay * t).exp() * (TAU * freq * t).sin())
                .sum();
            attack * tone
        })
        .collect();

    let peak = samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
    if peak > 0.0 {
        let gain = PEAK / peak;
        samples.iter_mut().for_each(|s| *s *= gain);
    }
    samples
}

/// State shared with the device callback.
#[derive(Debug)]
struct PlaybackState {
    playing: AtomicBool,
    position: AtomicUsize,
    volume_bits: AtomicU32,
}

impl PlaybackState {
    fn new(volume: f32) -> Self {
        Self {
            playing: AtomicBool::new(false),
            position: AtomicUsize::new(0),
            volume_bits: AtomicU32::new(volume.to_bits()),
        }
    }

    fn volume(&self) -> f32 {
        f32::from_bits(self.volume_bits.load(Ordering::Relaxed))
    }

    fn set_volume(&self, volume: f32) {
        self.volume_bits.store(volume.to_bits(), Ordering::Relaxed);
    }
}

/// Fills one interleaved output buffer from `samples`, advancing the shared
/// play head. Volume is read once per buffer.
fn fill_buffer<T>(state: &PlaybackState, samples: &[f32], data: &mut [T], channels: usize)
where
    T: SizedSample + FromSample<f32>,
{
    let channels = channels.max(1);
    if !state.playing.load(Ordering::Acquire) {
        data.iter_mut().for_each(|s| *s = T::from_sample(0.0));
        return;
    }

    let volume = state.volume();
    let mut position = state.position.load(Ordering::Acquire);
    for frame in data.chunks_mut(channels) {
        let value = match samples.get(position) {
            Some(sample) => {
                position += 1;
                sample * volume
            }
            None => 0.0,
        };
        frame.iter_mut().for_each(|s| *s = T::from_sample(value));
    }

    state.position.store(position, Ordering::Release);
    if position >= samples.len() {
        state.playing.store(false, Ordering::Release);
    }
}

/// The gong played through `cpal`. The output stream is opened on
/// [`AudioCue::prime`] (or lazily on the first `play`).
pub struct GongCue {
    name: &'static str,
    state: Arc<PlaybackState>,
    stream: Option<cpal::Stream>,
}

impl GongCue {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: Arc::new(PlaybackState::new(1.0)),
            stream: None,
        }
    }

    fn open_stream(&self) -> Result<cpal::Stream, CapabilityError> {
        let unavailable = |reason: String| CapabilityError::unavailable(Capability::Audio, reason);

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| unavailable("no output device found".to_string()))?;
        let config = device
            .default_output_config()
            .map_err(|e| unavailable(e.to_string()))?;

        let sample_format = config.sample_format();
        let config: cpal::StreamConfig = config.into();
        let samples = Arc::new(gong_samples(config.sample_rate.0));

        let stream = match sample_format {
            cpal::SampleFormat::F32 => self.build_stream::<f32>(&device, &config, samples),
            cpal::SampleFormat::I16 => self.build_stream::<i16>(&device, &config, samples),
            cpal::SampleFormat::U16 => self.build_stream::<u16>(&device, &config, samples),
            other => Err(unavailable(format!("unsupported sample format '{other}'"))),
        }?;

        stream
            .play()
            .map_err(|e| CapabilityError::rejected(Capability::Audio, e))?;
        Ok(stream)
    }

    fn build_stream<T>(
        &self,
        device: &cpal::Device,
        config: &cpal::StreamConfig,
        samples: Arc<Vec<f32>>,
    ) -> Result<cpal::Stream, CapabilityError>
    where
        T: SizedSample + FromSample<f32>,
    {
        let channels = config.channels as usize;
        let state = Arc::clone(&self.state);
        let name = self.name;

        device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    fill_buffer(&state, &samples, data, channels);
                },
                move |err| warn!(cue = name, error = %err, "audio stream error"),
                None,
            )
            .map_err(|e| CapabilityError::unavailable(Capability::Audio, e))
    }
}

impl AudioCue for GongCue {
    fn prime(&mut self) -> Result<(), CapabilityError> {
        if self.stream.is_none() {
            self.stream = Some(self.open_stream()?);
            debug!(cue = self.name, "audio cue primed");
        }
        self.state.playing.store(false, Ordering::Release);
        self.state.position.store(0, Ordering::Release);
        Ok(())
    }

    fn play(&mut self, from_start: bool) -> Result<(), CapabilityError> {
        if self.stream.is_none() {
            self.stream = Some(self.open_stream()?);
        }
        if from_start {
            self.state.position.store(0, Ordering::Release);
        }
        self.state.playing.store(true, Ordering::Release);
        Ok(())
    }

    fn pause(&mut self) {
        self.state.playing.store(false, Ordering::Release);
    }

    fn set_volume(&mut self, volume: f32) {
        self.state.set_volume(volume.clamp(0.0, 1.0));
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CueCall {
    Prime,
    Play { from_start: bool },
    Pause,
    SetVolume(f32),
}

#[derive(Debug, Default)]
struct CueLog {
    calls: Vec<CueCall>,
    volume: f32,
    playing: bool,
    fail: bool,
}

/// Cue double that records every call. Clones share the same log.
#[derive(Debug, Clone)]
pub struct RecordingCue {
    log: Rc<RefCell<CueLog>>,
}

impl RecordingCue {
    pub fn new() -> Self {
        Self {
            log: Rc::new(RefCell::new(CueLog {
                volume: 1.0,
                ..CueLog::default()
            })),
        }
    }

    /// A cue whose `prime` and `play` always fail, as with no audio device.
    pub fn failing() -> Self {
        let cue = Self::new();
        cue.log.borrow_mut().fail = true;
        cue
    }

    pub fn calls(&self) -> Vec<CueCall> {
        self.log.borrow().calls.clone()
    }

    pub fn clear(&self) {
        self.log.borrow_mut().calls.clear();
    }

    pub fn volume(&self) -> f32 {
        self.log.borrow().volume
    }

    pub fn is_playing(&self) -> bool {
        self.log.borrow().playing
    }
}

impl Default for RecordingCue {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioCue for RecordingCue {
    fn prime(&mut self) -> Result<(), CapabilityError> {
        let mut log = self.log.borrow_mut();
        log.calls.push(CueCall::Prime);
        if log.fail {
            return Err(CapabilityError::unavailable(Capability::Audio, "no output device found"));
        }
        Ok(())
    }

    fn play(&mut self, from_start: bool) -> Result<(), CapabilityError> {
        let mut log = self.log.borrow_mut();
        log.calls.push(CueCall::Play { from_start });
        if log.fail {
            return Err(CapabilityError::unavailable(Capability::Audio, "no output device found"));
        }
        log.playing = true;
        Ok(())
    }

    fn pause(&mut self) {
        let mut log = self.log.borrow_mut();
        log.calls.push(CueCall::Pause);
        log.playing = false;
    }

    fn set_volume(&mut self, volume: f32) {
        let mut log = self.log.borrow_mut();
        log.calls.push(CueCall::SetVolume(volume));
        log.volume = volume;
    }
}
