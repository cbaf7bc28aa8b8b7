use crate::error::{EngineError, EngineResult};

/// Decoded mono PCM: signed 16-bit samples at a known sample rate.
///
/// This is the only audio shape the engine accepts. Container parsing
/// (WAV headers and the like) happens before a `PcmBuffer` is built.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    samples: Vec<i16>,
    sample_rate: u32,
}

impl PcmBuffer {
    /// Wrap already-decoded mono samples.
    pub fn new(samples: Vec<i16>, sample_rate: u32) -> EngineResult<Self> {
        if sample_rate == 0 {
            return Err(EngineError::InputFormat("sample rate must be positive".into()));
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Decode raw little-endian 16-bit bytes.
    ///
    /// `channels` must be 1: the engine does not downmix.
    pub fn from_le_bytes(bytes: &[u8], sample_rate: u32, channels: u16) -> EngineResult<Self> {
        if channels != 1 {
            return Err(EngineError::InputFormat(format!(
                "expected mono PCM, got {channels} channels"
            )));
        }
        if bytes.len() % 2 != 0 {
            return Err(EngineError::InputFormat(format!(
                "odd byte count {} for 16-bit samples",
                bytes.len()
            )));
        }

        let samples = bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();

        Self::new(samples, sample_rate)
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}
