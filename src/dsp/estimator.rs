use std::fmt;

use pitch_detection::detector::mcleod::McLeodDetector;
use pitch_detection::detector::PitchDetector;

use super::windowing;

/// Raw values above this are treated as the legacy detector's scaling bug.
pub const QUIRK_THRESHOLD_HZ: f64 = 5000.0;

/// Divisor the legacy detector's output must be corrected by.
pub const QUIRK_SCALE_FACTOR: f64 = 338.0;

/// One raw F0 estimate, before any range or octave correction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawEstimate {
    pub pitch_hz: f64,
    /// Whether the estimator considers the chunk periodic.
    pub pitched: bool,
    /// Estimator confidence in [0, 1].
    pub probability: f64,
}

impl RawEstimate {
    pub fn unpitched() -> Self {
        Self {
            pitch_hz: 0.0,
            pitched: false,
            probability: 0.0,
        }
    }
}

/// Why an estimator could not produce a value for a chunk.
#[derive(Debug, Clone, PartialEq)]
pub enum EstimateError {
    /// Chunk was empty or too short for the estimator.
    ChunkTooShort(usize),
    /// Estimator returned a NaN or infinite frequency.
    NonFinite,
}

impl fmt::Display for EstimateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EstimateError::ChunkTooShort(n) => write!(f, "chunk of {} samples is too short", n),
            EstimateError::NonFinite => write!(f, "estimator returned a non-finite pitch"),
        }
    }
}

impl std::error::Error for EstimateError {}

/// Source of raw per-chunk F0 estimates.
///
/// The raw value may still be off by an octave or outside the vocal range.
/// Correcting that is the detector's job, not the estimator's.
///
/// Implementations must be stateless with respect to chunk order: the
/// detector may call `estimate` for different chunks concurrently.
pub trait RawPitchEstimator: Send + Sync {
    fn estimate(&self, chunk: &[i16], sample_rate: u32) -> Result<RawEstimate, EstimateError>;
}

impl<E: RawPitchEstimator + ?Sized> RawPitchEstimator for Box<E> {
    fn estimate(&self, chunk: &[i16], sample_rate: u32) -> Result<RawEstimate, EstimateError> {
        (**self).estimate(chunk, sample_rate)
    }
}

/// McLeod Pitch Method estimator from the `pitch-detection` crate.
///
/// MPM looks for the first strong peak of the normalized square difference
/// function, which is the lag where the signal best matches a shifted copy
/// of itself. That lag is the period. Normalizing makes the peak height a
/// clarity measure in [0, 1], which we report as the probability.
///
/// The chunk is Hann-windowed first so its edges do not add a spurious
/// correlation at short lags.
///
/// Runs once with the strict thresholds. If that finds nothing, a second
/// pass with relaxed thresholds reports its value as unpitched. Breathy or
/// quiet singing often fails the strict pass while still carrying a usable
/// period, and the detector accepts such values without harmonics.
#[derive(Debug, Clone)]
pub struct McLeodEstimator {
    pub power_threshold: f64,
    pub clarity_threshold: f64,
    pub relaxed_power_threshold: f64,
    pub relaxed_clarity_threshold: f64,
}

impl Default for McLeodEstimator {
    fn default() -> Self {
        Self {
            power_threshold: 0.2,
            clarity_threshold: 0.5,
            relaxed_power_threshold: 0.01,
            relaxed_clarity_threshold: 0.05,
        }
    }
}

impl McLeodEstimator {
    pub fn new(power_threshold: f64, clarity_threshold: f64) -> Self {
        Self {
            power_threshold,
            clarity_threshold,
            ..Self::default()
        }
    }
}

impl RawPitchEstimator for McLeodEstimator {
    fn estimate(&self, chunk: &[i16], sample_rate: u32) -> Result<RawEstimate, EstimateError> {
        // Autocorrelation needs a few periods worth of signal at minimum
        if chunk.len() < 64 {
            return Err(EstimateError::ChunkTooShort(chunk.len()));
        }

        let normalized: Vec<f32> = chunk.iter().map(|&s| s as f32 / 32768.0).collect();
        let signal: Vec<f64> = windowing::hanning(&normalized)
            .iter()
            .map(|&s| s as f64)
            .collect();

        let size = signal.len();
        let mut detector = McLeodDetector::new(size, size / 2);

        let strict = detector.get_pitch(
            &signal,
            sample_rate as usize,
            self.power_threshold,
            self.clarity_threshold,
        );
        let (pitch, pitched) = match strict {
            Some(p) => (Some(p), true),
            None => (
                detector.get_pitch(
                    &signal,
                    sample_rate as usize,
                    self.relaxed_power_threshold,
                    self.relaxed_clarity_threshold,
                ),
                false,
            ),
        };

        let Some(pitch) = pitch else {
            return Ok(RawEstimate::unpitched());
        };

        if !pitch.frequency.is_finite() {
            return Err(EstimateError::NonFinite);
        }

        Ok(RawEstimate {
            pitch_hz: pitch.frequency.max(0.0),
            pitched,
            probability: pitch.clarity.clamp(0.0, 1.0),
        })
    }
}

/// Compatibility shim for a third-party detector that reports some
/// frequencies 338x too high.
///
/// Wrap only that detector. A correct estimator must not be wrapped,
/// since genuine readings above 5 kHz would then be rescaled.
#[derive(Debug, Clone)]
pub struct ScaleQuirkShim<E> {
    inner: E,
}

impl<E: RawPitchEstimator> ScaleQuirkShim<E> {
    pub fn new(inner: E) -> Self {
        Self { inner }
    }
}

/// Undo the 338x scaling for values above the quirk threshold.
pub fn correct_quirk_scale(pitch_hz: f64) -> f64 {
    if pitch_hz > QUIRK_THRESHOLD_HZ {
        pitch_hz / QUIRK_SCALE_FACTOR
    } else {
        pitch_hz
    }
}

impl<E: RawPitchEstimator> RawPitchEstimator for ScaleQuirkShim<E> {
    fn estimate(&self, chunk: &[i16], sample_rate: u32) -> Result<RawEstimate, EstimateError> {
        let mut raw = self.inner.estimate(chunk, sample_rate)?;
        raw.pitch_hz = correct_quirk_scale(raw.pitch_hz);
        Ok(raw)
    }
}
