/// Default silence threshold on the mean absolute 16-bit amplitude.
pub const DEFAULT_SILENCE_THRESHOLD: f64 = 50.0;

/// Mean absolute sample magnitude of a 16-bit chunk.
///
/// Uses i32 for the absolute value so `i16::MIN` does not overflow.
pub fn chunk_volume(chunk: &[i16]) -> f64 {
    if chunk.is_empty() {
        return 0.0;
    }
    let sum: u64 = chunk.iter().map(|&s| (s as i32).unsigned_abs() as u64).sum();
    sum as f64 / chunk.len() as f64
}

/// Classifies PCM chunks as silent or sounding.
///
/// Volume is the mean absolute amplitude, which is cheap enough to run on
/// every chunk before deciding whether to invoke the pitch estimator.
#[derive(Debug, Clone, Copy)]
pub struct FrameVolumeGate {
    threshold: f64,
}

impl Default for FrameVolumeGate {
    fn default() -> Self {
        Self::new(DEFAULT_SILENCE_THRESHOLD)
    }
}

impl FrameVolumeGate {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Silent when the chunk's volume falls below the threshold.
    pub fn is_silent(&self, volume: f64) -> bool {
        volume < self.threshold
    }

    /// Strictly above the threshold. Gates the reference-position fallback.
    pub fn is_sounding(&self, volume: f64) -> bool {
        volume > self.threshold
    }

    /// Index of the first chunk that is not silent, if any.
    pub fn first_sound(&self, volumes: &[f64]) -> Option<usize> {
        volumes.iter().position(|&v| !self.is_silent(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_of_silence_is_zero() {
        assert_eq!(chunk_volume(&[0; 256]), 0.0);
        assert_eq!(chunk_volume(&[]), 0.0);
    }

    #[test]
    fn volume_is_mean_absolute() {
        assert_eq!(chunk_volume(&[100, -100, 50, -50]), 75.0);
    }

    #[test]
    fn volume_handles_i16_min() {
        assert_eq!(chunk_volume(&[i16::MIN]), 32768.0);
    }

    #[test]
    fn gate_classification() {
        let gate = FrameVolumeGate::default();
        assert!(gate.is_silent(49.9));
        assert!(!gate.is_silent(50.0));
        assert!(!gate.is_sounding(50.0));
        assert!(gate.is_sounding(50.1));
    }

    #[test]
    fn first_sound_skips_leading_silence() {
        let gate = FrameVolumeGate::default();
        assert_eq!(gate.first_sound(&[0.0, 10.0, 200.0, 0.0]), Some(2));
        assert_eq!(gate.first_sound(&[0.0, 10.0]), None);
    }
}
