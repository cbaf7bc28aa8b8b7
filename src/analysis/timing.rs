use super::result::{AlignedPair, TimingAnalysis};

/// Classifies each aligned pair as early, late or on time from its index
/// offset along the DTW path.
#[derive(Debug, Clone)]
pub struct TimingAnalyzer {
    /// Offsets within ±this many milliseconds count as on time.
    pub tolerance_ms: f64,
}

impl Default for TimingAnalyzer {
    fn default() -> Self {
        Self { tolerance_ms: 200.0 }
    }
}

impl TimingAnalyzer {
    /// Only voiced pairs are considered. No voiced pairs gives the empty
    /// analysis.
    pub fn analyze(&self, pairs: &[AlignedPair], frame_duration_secs: f64) -> TimingAnalysis {
        let frame_ms = frame_duration_secs * 1000.0;
        let offsets: Vec<f64> = pairs
            .iter()
            .filter(|p| p.is_voiced())
            .map(|p| (p.singing_index as f64 - p.reference_index as f64) * frame_ms)
            .collect();

        if offsets.is_empty() {
            return TimingAnalysis::empty();
        }

        let mut on_time = 0;
        let mut early = 0;
        let mut late = 0;
        for &o in &offsets {
            if o.abs() <= self.tolerance_ms {
                on_time += 1;
            } else if o < 0.0 {
                early += 1;
            } else {
                late += 1;
            }
        }

        let n = offsets.len() as f64;
        let mean_abs = offsets.iter().map(|o| o.abs()).sum::<f64>() / n;

        TimingAnalysis {
            pairs: offsets.len(),
            on_time_count: on_time,
            early_count: early,
            late_count: late,
            on_time_ratio: on_time as f64 / n,
            mean_offset_ms: offsets.iter().sum::<f64>() / n,
            mean_abs_offset_ms: mean_abs,
            max_abs_offset_ms: offsets.iter().fold(0.0, |m, o| o.abs().max(m)),
            accuracy_score: (100.0 - mean_abs / 10.0).max(0.0),
        }
    }
}
