use crate::defaults;
use crate::error::{CoachError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Root configuration structure.
///
/// All tunables are read once at session start and treated as immutable for
/// the session's lifetime.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub gate: GateConfig,
    pub advice: AdviceConfig,
    pub queues: QueueConfig,
}

/// Audio chunking configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub chunk_secs: f32,
}

/// Activity gate and segmenter configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GateConfig {
    pub noise_floor: f32,
    pub vad_threshold: f32,
    pub energy_threshold: f32,
    pub silence_gap_ms: u32,
    pub min_segment_ms: u32,
    pub max_segment_ms: u32,
}

/// Advice engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AdviceConfig {
    pub context_turns: usize,
    pub model_timeout_secs: u64,
    pub failure_threshold: u32,
    pub max_tokens: u32,
    /// External inference command for the isolated primary path.
    /// When unset, the session runs rule-based advice only.
    pub model_command: Option<String>,
    pub model_args: Vec<String>,
}

/// Bounded queue capacities between pipeline workers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QueueConfig {
    pub chunk_capacity: usize,
    pub segment_capacity: usize,
    pub transcript_capacity: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: defaults::SAMPLE_RATE,
            chunk_secs: defaults::CHUNK_SECS,
        }
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            noise_floor: defaults::NOISE_FLOOR,
            vad_threshold: defaults::VAD_THRESHOLD,
            energy_threshold: defaults::ENERGY_THRESHOLD,
            silence_gap_ms: defaults::SILENCE_GAP_MS,
            min_segment_ms: defaults::MIN_SEGMENT_MS,
            max_segment_ms: defaults::MAX_SEGMENT_MS,
        }
    }
}

impl Default for AdviceConfig {
    fn default() -> Self {
        Self {
            context_turns: defaults::CONTEXT_TURNS,
            model_timeout_secs: defaults::MODEL_TIMEOUT_SECS,
            failure_threshold: defaults::FAILURE_THRESHOLD,
            max_tokens: defaults::MAX_TOKENS,
            model_command: None,
            model_args: Vec::new(),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            chunk_capacity: defaults::CHUNK_QUEUE_CAPACITY,
            segment_capacity: defaults::SEGMENT_QUEUE_CAPACITY,
            transcript_capacity: defaults::TRANSCRIPT_QUEUE_CAPACITY,
        }
    }
}

impl AdviceConfig {
    /// Wall-clock timeout for one isolated model call.
    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.model_timeout_secs)
    }
}

impl AudioConfig {
    /// Number of samples per audio chunk.
    pub fn chunk_samples(&self) -> usize {
        (self.sample_rate as f32 * self.chunk_secs) as usize
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// Missing fields use default values; invalid TOML is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CoachError::ConfigFileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                CoachError::Io(e)
            }
        })?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if the file is missing.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(CoachError::ConfigFileNotFound { .. }) => Ok(Self::default()),
            Err(e) => Err(e),
        }
    }

    /// Apply environment variable overrides.
    ///
    /// Supported environment variables:
    /// - LIVECOACH_MODEL_COMMAND → advice.model_command
    /// - LIVECOACH_MODEL_TIMEOUT_SECS → advice.model_timeout_secs
    /// - LIVECOACH_FAILURE_THRESHOLD → advice.failure_threshold
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(command) = std::env::var("LIVECOACH_MODEL_COMMAND")
            && !command.is_empty()
        {
            self.advice.model_command = Some(command);
        }
        if let Ok(secs) = std::env::var("LIVECOACH_MODEL_TIMEOUT_SECS")
            && let Ok(secs) = secs.parse::<u64>()
        {
            self.advice.model_timeout_secs = secs;
        }
        if let Ok(threshold) = std::env::var("LIVECOACH_FAILURE_THRESHOLD")
            && let Ok(threshold) = threshold.parse::<u32>()
        {
            self.advice.failure_threshold = threshold;
        }
        self
    }

    /// Validate tunables. Misconfiguration is fatal at session start.
    pub fn validate(&self) -> Result<()> {
        fn invalid(key: &str, message: &str) -> CoachError {
            CoachError::ConfigInvalidValue {
                key: key.to_string(),
                message: message.to_string(),
            }
        }

        if ![8000, 16000, 22050, 44100, 48000].contains(&self.audio.sample_rate) {
            return Err(invalid(
                "audio.sample_rate",
                "must be one of 8000, 16000, 22050, 44100, 48000",
            ));
        }
        if self.audio.chunk_secs <= 0.0 || self.audio.chunk_secs > 30.0 {
            return Err(invalid("audio.chunk_secs", "must be in (0, 30]"));
        }
        if !(0.0..=1.0).contains(&self.gate.noise_floor) {
            return Err(invalid("gate.noise_floor", "must be in [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.gate.vad_threshold) {
            return Err(invalid("gate.vad_threshold", "must be in [0, 1]"));
        }
        if self.gate.energy_threshold < self.gate.noise_floor {
            return Err(invalid(
                "gate.energy_threshold",
                "must not be below gate.noise_floor",
            ));
        }
        if self.gate.min_segment_ms >= self.gate.max_segment_ms {
            return Err(invalid(
                "gate.min_segment_ms",
                "must be below gate.max_segment_ms",
            ));
        }
        if self.advice.context_turns == 0 {
            return Err(invalid("advice.context_turns", "must be at least 1"));
        }
        if self.advice.model_timeout_secs == 0 {
            return Err(invalid("advice.model_timeout_secs", "must be at least 1"));
        }
        if self.advice.failure_threshold == 0 {
            return Err(invalid("advice.failure_threshold", "must be at least 1"));
        }
        if self.queues.chunk_capacity == 0
            || self.queues.segment_capacity == 0
            || self.queues.transcript_capacity == 0
        {
            return Err(invalid("queues", "capacities must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.audio.sample_rate, 16000);
        assert_eq!(config.advice.failure_threshold, 3);
        assert!(config.advice.model_command.is_none());
    }

    #[test]
    fn test_chunk_samples() {
        let audio = AudioConfig {
            sample_rate: 16000,
            chunk_secs: 0.5,
        };
        assert_eq!(audio.chunk_samples(), 8000);
    }

    #[test]
    fn test_load_missing_file_is_not_found() {
        let result = Config::load(Path::new("/nonexistent/livecoach.toml"));
        assert!(matches!(
            result,
            Err(CoachError::ConfigFileNotFound { .. })
        ));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = Config::load_or_default(Path::new("/nonexistent/livecoach.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_partial_file_uses_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[advice]\nfailure_threshold = 5").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.advice.failure_threshold, 5);
        assert_eq!(config.audio.sample_rate, 16000);
    }

    #[test]
    fn test_load_invalid_toml_is_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not = valid = toml").unwrap();

        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_sample_rate() {
        let mut config = Config::default();
        config.audio.sample_rate = 12345;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_failure_threshold() {
        let mut config = Config::default();
        config.advice.failure_threshold = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_energy_below_noise_floor() {
        let mut config = Config::default();
        config.gate.noise_floor = 0.1;
        config.gate.energy_threshold = 0.05;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_min_segment_above_max() {
        let mut config = Config::default();
        config.gate.min_segment_ms = 20000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_roundtrip_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }
}
