//! Audio sources feeding the pipeline.

use crate::error::{CoachError, Result};
use std::io::Read;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

/// Trait for anything that can supply mono 16-bit PCM samples.
///
/// `read_samples` returns whatever is available without blocking for a full
/// chunk. An empty batch from a finite source means end of stream; an empty
/// batch from a live source means no samples yet.
pub trait AudioSource: Send {
    fn start(&mut self) -> Result<()>;
    fn stop(&mut self);

    /// Read the next batch of samples. May return fewer than requested.
    fn read_samples(&mut self) -> Result<Vec<i16>>;

    fn sample_rate(&self) -> u32;

    /// Whether this source ends on its own (file playback) rather than
    /// running until stopped (live capture).
    fn is_finite(&self) -> bool {
        false
    }
}

/// Batch size for WAV playback, roughly 100ms at 16kHz.
const WAV_BATCH_SAMPLES: usize = 1600;

/// Audio source backed by a WAV file.
///
/// The whole file is decoded up front and handed out in fixed batches, so
/// playback runs as fast as the pipeline can consume it.
pub struct WavAudioSource {
    samples: Vec<i16>,
    position: usize,
    sample_rate: u32,
}

impl WavAudioSource {
    pub fn from_path(path: &Path) -> Result<Self> {
        let reader = hound::WavReader::open(path)
            .map_err(|e| CoachError::AudioSource {
                message: format!("cannot open {}: {e}", path.display()),
            })?;
        Self::from_reader(reader)
    }

    pub fn from_reader<R: Read>(reader: hound::WavReader<R>) -> Result<Self> {
        let spec = reader.spec();
        if spec.channels != 1 || spec.bits_per_sample != 16 {
            return Err(CoachError::AudioFormatMismatch {
                expected: "mono 16-bit PCM".to_string(),
                actual: format!("{} channels, {} bits", spec.channels, spec.bits_per_sample),
            });
        }
        let samples = reader
            .into_samples::<i16>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| CoachError::AudioSource {
                message: format!("failed to decode samples: {e}"),
            })?;
        Ok(Self {
            samples,
            position: 0,
            sample_rate: spec.sample_rate,
        })
    }

    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

impl AudioSource for WavAudioSource {
    fn start(&mut self) -> Result<()> {
        self.position = 0;
        Ok(())
    }

    fn stop(&mut self) {}

    fn read_samples(&mut self) -> Result<Vec<i16>> {
        let end = (self.position + WAV_BATCH_SAMPLES).min(self.samples.len());
        let batch = self.samples[self.position..end].to_vec();
        self.position = end;
        Ok(batch)
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn is_finite(&self) -> bool {
        true
    }
}

/// One stretch of identical frames emitted by `MockAudioSource`.
#[derive(Clone)]
pub struct FramePhase {
    pub samples: Vec<i16>,
    pub count: u32,
}

impl FramePhase {
    /// A phase of loud frames at a fixed amplitude.
    pub fn loud(amplitude: i16, frame_len: usize, count: u32) -> Self {
        Self {
            samples: vec![amplitude; frame_len],
            count,
        }
    }

    /// A phase of silent frames.
    pub fn quiet(frame_len: usize, count: u32) -> Self {
        Self {
            samples: vec![0i16; frame_len],
            count,
        }
    }
}

/// Mock audio source for testing.
///
/// Plays configured phases in order, then ends (finite) or keeps returning
/// empty batches (live).
pub struct MockAudioSource {
    phases: Mutex<Vec<FramePhase>>,
    emitted_in_phase: AtomicU32,
    sample_rate: u32,
    live: bool,
    fail_on_read: Option<String>,
}

impl MockAudioSource {
    pub fn new(phases: Vec<FramePhase>) -> Self {
        Self {
            phases: Mutex::new(phases),
            emitted_in_phase: AtomicU32::new(0),
            sample_rate: crate::defaults::SAMPLE_RATE,
            live: false,
            fail_on_read: None,
        }
    }

    /// Keep the source open after the phases run out, like live capture.
    pub fn as_live_source(mut self) -> Self {
        self.live = true;
        self
    }

    /// Fail every read with the given message.
    pub fn with_read_failure(message: &str) -> Self {
        let mut source = Self::new(Vec::new());
        source.fail_on_read = Some(message.to_string());
        source
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }
}

impl AudioSource for MockAudioSource {
    fn start(&mut self) -> Result<()> {
        Ok(())
    }

    fn stop(&mut self) {}

    fn read_samples(&mut self) -> Result<Vec<i16>> {
        if let Some(message) = &self.fail_on_read {
            return Err(CoachError::AudioSource {
                message: message.clone(),
            });
        }
        let mut phases = self.phases.lock().map_err(|_| CoachError::AudioSource {
            message: "mock source poisoned".to_string(),
        })?;
        loop {
            let Some(phase) = phases.first() else {
                return Ok(Vec::new());
            };
            if self.emitted_in_phase.load(Ordering::SeqCst) < phase.count {
                self.emitted_in_phase.fetch_add(1, Ordering::SeqCst);
                return Ok(phase.samples.clone());
            }
            phases.remove(0);
            self.emitted_in_phase.store(0, Ordering::SeqCst);
        }
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn is_finite(&self) -> bool {
        !self.live
    }
}
