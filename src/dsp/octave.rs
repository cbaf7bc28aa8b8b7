use serde::{Deserialize, Serialize};

use super::harmonics::HarmonicsResult;
use crate::util::octave_distance;

/// Widest band any octave candidate may land in.
pub const CANDIDATE_FLOOR_HZ: f64 = 30.0;
pub const CANDIDATE_CEILING_HZ: f64 = 2000.0;

/// Detections inside this band are returned untouched. Low male voices
/// sit here and octave correction tends to push them up by mistake.
pub const PROTECTED_LOW_BAND_HZ: (f64, f64) = (58.0, 77.0);

const RANGE_WEIGHT: f64 = 0.3;
const WIDE_RANGE_WEIGHT: f64 = 0.15;
const HARMONICS_WEIGHT: f64 = 0.25;
const REFERENCE_WEIGHT: f64 = 0.25;
const CONTEXT_WEIGHT: f64 = 0.2;

/// Decay rate per octave of distance for the proximity terms.
const PROXIMITY_DECAY: f64 = 3.0;

/// Harmonics fundamentals below this confidence are not offered as candidates.
const HARMONICS_CANDIDATE_CONFIDENCE: f64 = 0.5;

/// How an octave-ambiguous detection is corrected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OctaveStrategy {
    /// Halve or double until the pitch lands in the configured range.
    RangeFold,
    /// Score octave-shifted candidates against range, harmonics, reference
    /// and recent context.
    #[default]
    HarmonicWeighted,
}

/// Picks the most plausible octave of a detected pitch.
#[derive(Debug, Clone)]
pub struct OctaveResolver {
    pub min_pitch_hz: f64,
    pub max_pitch_hz: f64,
    pub strategy: OctaveStrategy,
}

impl Default for OctaveResolver {
    fn default() -> Self {
        Self {
            min_pitch_hz: 60.0,
            max_pitch_hz: 1000.0,
            strategy: OctaveStrategy::default(),
        }
    }
}

/// `exp(-k * octaves)` proximity in (0, 1]; 0 when either side is silent.
fn proximity(candidate: f64, target: f64) -> f64 {
    let d = octave_distance(candidate, target);
    if d.is_finite() {
        (-PROXIMITY_DECAY * d).exp()
    } else {
        0.0
    }
}

/// Fold `freq_hz` by powers of two into `[min_hz, max_hz]`.
///
/// Returns `None` for non-positive input or when the range is narrower
/// than an octave and no power of two lands inside it.
pub fn range_fold(freq_hz: f64, min_hz: f64, max_hz: f64) -> Option<f64> {
    if !(freq_hz > 0.0 && freq_hz.is_finite()) || min_hz <= 0.0 || max_hz < min_hz {
        return None;
    }
    let mut f = freq_hz;
    while f > max_hz {
        f /= 2.0;
    }
    while f < min_hz {
        f *= 2.0;
    }
    (f <= max_hz).then_some(f)
}

impl OctaveResolver {
    pub fn new(min_pitch_hz: f64, max_pitch_hz: f64, strategy: OctaveStrategy) -> Self {
        Self {
            min_pitch_hz,
            max_pitch_hz,
            strategy,
        }
    }

    /// Resolve the octave of `detected`.
    ///
    /// `context` holds the most recent emitted pitches; silent entries are
    /// ignored. Non-positive detections are returned unchanged.
    pub fn resolve(
        &self,
        detected: f64,
        reference: Option<f64>,
        harmonics: &HarmonicsResult,
        context: &[f64],
    ) -> f64 {
        if !(detected > 0.0 && detected.is_finite()) {
            return detected;
        }
        let (lo, hi) = PROTECTED_LOW_BAND_HZ;
        if (lo..=hi).contains(&detected) {
            return detected;
        }

        match self.strategy {
            OctaveStrategy::RangeFold => {
                range_fold(detected, self.min_pitch_hz, self.max_pitch_hz).unwrap_or(detected)
            }
            OctaveStrategy::HarmonicWeighted => {
                self.resolve_weighted(detected, reference, harmonics, context)
            }
        }
    }

    /// Candidates in generation order: raw detection, octave shifts
    /// -3..=3, then the harmonics fundamental when it is confident.
    pub fn candidates(&self, detected: f64, harmonics: &HarmonicsResult) -> Vec<f64> {
        let mut candidates = vec![detected];
        for k in -3_i32..=3 {
            if k == 0 {
                continue;
            }
            let c = detected * 2f64.powi(k);
            if (CANDIDATE_FLOOR_HZ..=CANDIDATE_CEILING_HZ).contains(&c) {
                candidates.push(c);
            }
        }
        if harmonics.confidence > HARMONICS_CANDIDATE_CONFIDENCE
            && harmonics.fundamental_frequency > 0.0
        {
            candidates.push(harmonics.fundamental_frequency);
        }
        candidates
    }

    /// Weighted plausibility of one candidate.
    pub fn score(
        &self,
        candidate: f64,
        reference: Option<f64>,
        harmonics: &HarmonicsResult,
        context_avg: Option<f64>,
    ) -> f64 {
        let mut score = 0.0;

        if (self.min_pitch_hz..=self.max_pitch_hz).contains(&candidate) {
            score += RANGE_WEIGHT;
        } else if (CANDIDATE_FLOOR_HZ..=CANDIDATE_CEILING_HZ).contains(&candidate) {
            score += WIDE_RANGE_WEIGHT;
        }

        if harmonics.fundamental_frequency > 0.0 {
            score += HARMONICS_WEIGHT
                * harmonics.confidence
                * proximity(candidate, harmonics.fundamental_frequency);
        }

        if let Some(r) = reference.filter(|&r| r > 0.0) {
            score += REFERENCE_WEIGHT * proximity(candidate, r);
        }

        if let Some(avg) = context_avg {
            score += CONTEXT_WEIGHT * proximity(candidate, avg);
        }

        score
    }

    fn resolve_weighted(
        &self,
        detected: f64,
        reference: Option<f64>,
        harmonics: &HarmonicsResult,
        context: &[f64],
    ) -> f64 {
        let voiced: Vec<f64> = context.iter().copied().filter(|&p| p > 0.0).collect();
        let context_avg = (!voiced.is_empty()).then(|| crate::util::mean(&voiced));

        let mut best = detected;
        let mut best_score = f64::NEG_INFINITY;
        // Strict comparison: earlier candidates (the raw detection first) win ties
        for candidate in self.candidates(detected, harmonics) {
            let s = self.score(candidate, reference, harmonics, context_avg);
            if s > best_score {
                best = candidate;
                best_score = s;
            }
        }
        best
    }
}
