use super::result::{AlignedPair, PitchAccuracyAnalysis};

/// Intonation statistics over the voiced pairs of an alignment.
#[derive(Debug, Clone)]
pub struct PitchAccuracyAnalyzer {
    /// Pairs within ±this many cents count as accurate.
    pub tolerance_cents: f64,
}

impl Default for PitchAccuracyAnalyzer {
    fn default() -> Self {
        Self {
            tolerance_cents: 50.0,
        }
    }
}

impl PitchAccuracyAnalyzer {
    pub fn new(tolerance_cents: f64) -> Self {
        Self { tolerance_cents }
    }

    pub fn analyze(&self, pairs: &[AlignedPair]) -> PitchAccuracyAnalysis {
        let errors: Vec<f64> = pairs
            .iter()
            .filter(|p| p.is_voiced())
            .map(|p| p.cent_difference)
            .collect();

        if errors.is_empty() {
            return PitchAccuracyAnalysis::empty();
        }

        let n = errors.len() as f64;
        let accurate = errors
            .iter()
            .filter(|e| e.abs() <= self.tolerance_cents)
            .count();

        PitchAccuracyAnalysis {
            voiced_pairs: errors.len(),
            accurate_pairs: accurate,
            accuracy_ratio: accurate as f64 / n,
            mean_abs_cent_error: errors.iter().map(|e| e.abs()).sum::<f64>() / n,
            max_abs_cent_error: errors.iter().fold(0.0, |m, e| e.abs().max(m)),
            mean_cent_bias: errors.iter().sum::<f64>() / n,
        }
    }
}
