/// Sliding-window averaging over a pitch sequence.
///
/// Frame-to-frame detector jitter makes DTW wander between neighbouring
/// cells. Averaging over a short window evens that out before alignment.
/// Silent samples and samples outside `[min_hz, max_hz]` are excluded from
/// every average and come out as 0.0 themselves, so smoothing never invents
/// pitch inside a rest or drags a note toward a stray detection.
///
/// A sequence shorter than the window is only range-filtered: averaging it
/// would collapse every note into one mean.
#[derive(Debug, Clone)]
pub struct PitchSequenceSmoother {
    /// Total window length, centred on each sample.
    pub window: usize,
    pub min_hz: f64,
    pub max_hz: f64,
}

impl Default for PitchSequenceSmoother {
    fn default() -> Self {
        Self {
            window: 5,
            min_hz: 60.0,
            max_hz: 1000.0,
        }
    }
}

impl PitchSequenceSmoother {
    pub fn new(window: usize, min_hz: f64, max_hz: f64) -> Self {
        Self {
            window,
            min_hz,
            max_hz,
        }
    }

    fn in_range(&self, p: f64) -> bool {
        p.is_finite() && p > 0.0 && p >= self.min_hz && p <= self.max_hz
    }

    /// Zero out silent, non-finite and out-of-range samples without
    /// averaging.
    pub fn filter(&self, pitches: &[f64]) -> Vec<f64> {
        pitches
            .iter()
            .map(|&p| if self.in_range(p) { p } else { 0.0 })
            .collect()
    }

    pub fn smooth(&self, pitches: &[f64]) -> Vec<f64> {
        if self.window <= 1 || pitches.len() < self.window {
            return self.filter(pitches);
        }

        let half = self.window / 2;
        (0..pitches.len())
            .map(|i| {
                if !self.in_range(pitches[i]) {
                    return 0.0;
                }
                let start = i.saturating_sub(half);
                let end = (i + half + 1).min(pitches.len());
                let (sum, count) = pitches[start..end]
                    .iter()
                    .filter(|&&p| self.in_range(p))
                    .fold((0.0, 0usize), |(s, c), &p| (s + p, c + 1));
                sum / count as f64
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_sequence_is_unchanged() {
        let smoothed = PitchSequenceSmoother::default().smooth(&[220.0; 12]);
        assert!(smoothed.iter().all(|&p| (p - 220.0).abs() < 1e-9));
    }

    #[test]
    fn silence_is_preserved_and_excluded() {
        let input = [200.0, 0.0, 220.0, 0.0, 0.0];
        let smoothed = PitchSequenceSmoother::new(3, 60.0, 1000.0).smooth(&input);
        assert_eq!(smoothed[1], 0.0);
        assert_eq!(smoothed[0], 200.0);
        // Neighbours of index 2 are both silent
        assert_eq!(smoothed[2], 220.0);
    }

    #[test]
    fn out_of_range_outlier_is_dropped() {
        let input = [300.0, 300.0, 1500.0, 300.0, 300.0];
        let smoothed = PitchSequenceSmoother::default().smooth(&input);
        assert_eq!(smoothed[2], 0.0);
        assert_eq!(smoothed[1], 300.0);
    }

    #[test]
    fn spike_is_averaged_down() {
        let input = [200.0, 200.0, 260.0, 200.0, 200.0];
        let smoothed = PitchSequenceSmoother::default().smooth(&input);
        assert!((smoothed[2] - 212.0).abs() < 1e-9);
    }

    #[test]
    fn sequence_shorter_than_window_keeps_its_notes() {
        let melody = [440.0, 493.88, 523.25];
        assert_eq!(PitchSequenceSmoother::default().smooth(&melody), melody.to_vec());
        assert_eq!(
            PitchSequenceSmoother::default().smooth(&[440.0, 2000.0]),
            vec![440.0, 0.0]
        );
    }

    #[test]
    fn empty_input() {
        assert!(PitchSequenceSmoother::default().smooth(&[]).is_empty());
    }
}
