use super::result::{AlignedPair, StabilityAnalysis, StabilitySegment};
use crate::util::{hz_to_cents, mean, std_dev};

/// Windowed pitch-steadiness analysis in cents.
///
/// Working in cents rather than Hz makes one threshold fit every register:
/// a 5 Hz wobble is over a quarter tone at 110 Hz but barely audible at 880 Hz.
/// Each window's standard deviation is compared with the threshold, and
/// the overall figure is the share of windows that pass.
#[derive(Debug, Clone)]
pub struct StabilityAnalyzer {
    pub window: usize,
    /// Windows advance by this many samples; half a window by default.
    pub stride: usize,
    /// A window is stable when its deviation is strictly below this.
    pub stable_threshold_cents: f64,
    /// Fewer valid samples than this gives the empty analysis.
    pub min_samples: usize,
}

impl Default for StabilityAnalyzer {
    fn default() -> Self {
        Self {
            window: 10,
            stride: 5,
            stable_threshold_cents: 10.0,
            min_samples: 3,
        }
    }
}

fn score_for(std_dev_cents: f64) -> f64 {
    (100.0 - 2.0 * std_dev_cents).max(0.0)
}

impl StabilityAnalyzer {
    /// Steadiness of a raw pitch sequence. Silent samples are skipped;
    /// segment indices refer to positions in `pitches`.
    pub fn analyze_pitches(&self, pitches: &[f64]) -> StabilityAnalysis {
        let cents: Vec<Option<f64>> = pitches
            .iter()
            .map(|&p| (p > 0.0 && p.is_finite()).then(|| hz_to_cents(p)))
            .collect();
        self.analyze_cents(&cents)
    }

    /// Steadiness of the singer's deviation from the reference along an
    /// alignment path. A melody sung in tune is perfectly stable here even
    /// though its raw pitch moves. Segment indices are path positions.
    pub fn analyze_deviations(&self, pairs: &[AlignedPair]) -> StabilityAnalysis {
        let cents: Vec<Option<f64>> = pairs
            .iter()
            .map(|p| p.is_voiced().then_some(p.cent_difference))
            .collect();
        self.analyze_cents(&cents)
    }

    fn analyze_cents(&self, cents: &[Option<f64>]) -> StabilityAnalysis {
        let valid: Vec<f64> = cents.iter().flatten().copied().collect();
        if valid.len() < self.min_samples {
            return StabilityAnalysis::empty();
        }

        let global_std = std_dev(&valid);
        let segments: Vec<StabilitySegment> = self
            .window_ranges(cents.len())
            .into_iter()
            .filter_map(|(start, end)| {
                let local: Vec<f64> = cents[start..=end].iter().flatten().copied().collect();
                if local.len() < self.min_samples {
                    return None;
                }
                let sd = std_dev(&local);
                Some(StabilitySegment {
                    start_index: start,
                    end_index: end,
                    std_dev_cents: sd,
                    score: score_for(sd),
                    is_stable: sd < self.stable_threshold_cents,
                })
            })
            .collect();

        let (stable_ratio, avg_variation) = if segments.is_empty() {
            (0.0, 0.0)
        } else {
            let stable = segments.iter().filter(|s| s.is_stable).count();
            let deviations: Vec<f64> = segments.iter().map(|s| s.std_dev_cents).collect();
            (stable as f64 / segments.len() as f64, mean(&deviations))
        };

        StabilityAnalysis {
            valid_samples: valid.len(),
            std_dev_cents: global_std,
            stability_score: score_for(global_std),
            segments,
            stable_ratio,
            avg_variation,
        }
    }

    /// Inclusive window ranges covering `0..len`. Sequences shorter than a
    /// window get a single range; a final window is added when the stride
    /// would leave the tail uncovered.
    fn window_ranges(&self, len: usize) -> Vec<(usize, usize)> {
        let window = self.window.max(1);
        let stride = self.stride.max(1);
        if len == 0 {
            return Vec::new();
        }
        if len <= window {
            return vec![(0, len - 1)];
        }

        let mut ranges = Vec::new();
        let mut start = 0;
        while start + window <= len {
            ranges.push((start, start + window - 1));
            start += stride;
        }
        if ranges.last().is_some_and(|&(_, end)| end < len - 1) {
            ranges.push((len - window, len - 1));
        }
        ranges
    }
}
