use super::result::{
    Grade, PitchAccuracyAnalysis, ScoreBreakdown, ScoringMode, StabilityAnalysis, TimingAnalysis,
};

/// Maximum-deviation cliffs: a single gross error (an octave slip, say)
/// costs points even when the average error is small.
const SEVERE_PENALTIES: [(f64, f64); 3] = [(1200.0, 80.0), (600.0, 40.0), (200.0, 20.0)];

/// Timing offsets beyond this start costing points.
const MAX_LATENCY_FREE_MS: f64 = 500.0;

/// Combines the sub-analyses into weighted scores and a grade.
#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    pub mode: ScoringMode,
}

fn severe_penalty(max_abs_cents: f64) -> f64 {
    SEVERE_PENALTIES
        .iter()
        .find(|&&(threshold, _)| max_abs_cents >= threshold)
        .map_or(0.0, |&(_, penalty)| penalty)
}

impl ScoringEngine {
    pub fn new(mode: ScoringMode) -> Self {
        Self { mode }
    }

    /// Every sub-score and the total land in [0, 100]. Empty analyses
    /// score 0.
    pub fn score(
        &self,
        pitch: &PitchAccuracyAnalysis,
        stability: &StabilityAnalysis,
        timing: &TimingAnalysis,
    ) -> ScoreBreakdown {
        let weights = self.mode.weights();
        let pitch_score = Self::pitch_score(pitch);
        let stability_score = Self::stability_score(stability);
        let timing_score = Self::timing_score(timing);

        let total_score = (weights.pitch * pitch_score
            + weights.stability * stability_score
            + weights.timing * timing_score)
            .clamp(0.0, 100.0);

        ScoreBreakdown {
            pitch_score,
            stability_score,
            timing_score,
            weights,
            total_score,
            grade: Grade::from_score(total_score),
        }
    }

    /// `accuracyRatio*60 + 40*exp(-meanAbsCents/50) - severePenalty`.
    pub fn pitch_score(pitch: &PitchAccuracyAnalysis) -> f64 {
        if pitch.is_empty() {
            return 0.0;
        }
        let raw = pitch.accuracy_ratio * 60.0 + 40.0 * (-pitch.mean_abs_cent_error / 50.0).exp()
            - severe_penalty(pitch.max_abs_cent_error);
        clamp_score(raw)
    }

    /// `stableRatio*100 - min(15, avgVariation/10*15)`.
    pub fn stability_score(stability: &StabilityAnalysis) -> f64 {
        if stability.is_empty() {
            return 0.0;
        }
        let raw = stability.stable_ratio * 100.0 - (stability.avg_variation / 10.0 * 15.0).min(15.0);
        clamp_score(raw)
    }

    /// On-time share (60) + latency bonus (30) + early/late balance (10),
    /// minus up to 20 for the single worst offset past 500 ms.
    pub fn timing_score(timing: &TimingAnalysis) -> f64 {
        if timing.is_empty() {
            return 0.0;
        }

        let on_time = timing.on_time_ratio * 60.0;
        let latency_bonus = 30.0 * (-timing.mean_abs_offset_ms / 100.0).exp();

        let off = timing.early_count + timing.late_count;
        let balance = if off == 0 {
            1.0
        } else {
            1.0 - (timing.early_count as f64 - timing.late_count as f64).abs() / off as f64
        };

        let max_penalty = if timing.max_abs_offset_ms > MAX_LATENCY_FREE_MS {
            ((timing.max_abs_offset_ms - MAX_LATENCY_FREE_MS) / 50.0).min(20.0)
        } else {
            0.0
        };

        clamp_score(on_time + latency_bonus + 10.0 * balance - max_penalty)
    }
}

fn clamp_score(v: f64) -> f64 {
    if v.is_finite() {
        v.clamp(0.0, 100.0)
    } else {
        0.0
    }
}
