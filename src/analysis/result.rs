use std::fmt;

use serde::{Deserialize, Serialize};

/// One step of a DTW alignment path.
///
/// Across the pairs of one alignment run both indices are non-decreasing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedPair {
    pub reference_pitch: f64,
    pub singing_pitch: f64,
    /// `1200 * log2(singing / reference)`; 0.0 when either side is silent.
    pub cent_difference: f64,
    pub reference_index: usize,
    pub singing_index: usize,
    /// Accumulated DTW cost at this cell.
    pub alignment_cost: f64,
}

impl AlignedPair {
    /// Both sides carry a pitch.
    pub fn is_voiced(&self) -> bool {
        self.reference_pitch > 0.0 && self.singing_pitch > 0.0
    }
}

/// Intonation against the reference over the voiced aligned pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PitchAccuracyAnalysis {
    pub voiced_pairs: usize,
    /// Pairs within the cent tolerance.
    pub accurate_pairs: usize,
    pub accuracy_ratio: f64,
    pub mean_abs_cent_error: f64,
    pub max_abs_cent_error: f64,
    /// Positive when the singer is sharp on average.
    pub mean_cent_bias: f64,
}

impl PitchAccuracyAnalysis {
    pub fn empty() -> Self {
        Self {
            voiced_pairs: 0,
            accurate_pairs: 0,
            accuracy_ratio: 0.0,
            mean_abs_cent_error: 0.0,
            max_abs_cent_error: 0.0,
            mean_cent_bias: 0.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.voiced_pairs == 0
    }
}

/// Local steadiness over one window of the analyzed sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StabilitySegment {
    pub start_index: usize,
    /// Inclusive.
    pub end_index: usize,
    pub std_dev_cents: f64,
    pub score: f64,
    pub is_stable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StabilityAnalysis {
    pub valid_samples: usize,
    /// Standard deviation over all valid samples, in cents.
    pub std_dev_cents: f64,
    /// `max(0, 100 - 2 * std_dev_cents)`.
    pub stability_score: f64,
    pub segments: Vec<StabilitySegment>,
    /// Fraction of segments marked stable.
    pub stable_ratio: f64,
    /// Mean of the segment deviations, in cents.
    pub avg_variation: f64,
}

impl StabilityAnalysis {
    pub fn empty() -> Self {
        Self {
            valid_samples: 0,
            std_dev_cents: 0.0,
            stability_score: 0.0,
            segments: Vec::new(),
            stable_ratio: 0.0,
            avg_variation: 0.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Oscillation estimate over one vibrato scan window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VibratoSegment {
    pub start_index: usize,
    /// Inclusive.
    pub end_index: usize,
    pub rate_hz: f64,
    /// Twice the RMS of the detrended pitch, in cents.
    pub depth_cents: f64,
    pub is_vibrato: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VibratoAnalysis {
    pub has_vibrato: bool,
    /// Mean rate over qualifying windows.
    pub rate_hz: f64,
    /// Mean depth over qualifying windows.
    pub depth_cents: f64,
    /// 0-100, higher when peak-to-peak intervals are even.
    pub regularity_score: f64,
    pub segments: Vec<VibratoSegment>,
}

impl VibratoAnalysis {
    pub fn empty() -> Self {
        Self {
            has_vibrato: false,
            rate_hz: 0.0,
            depth_cents: 0.0,
            regularity_score: 0.0,
            segments: Vec::new(),
        }
    }
}

/// Early/late behaviour derived from the alignment path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingAnalysis {
    pub pairs: usize,
    pub on_time_count: usize,
    pub early_count: usize,
    pub late_count: usize,
    pub on_time_ratio: f64,
    /// Positive means the singer lags the reference.
    pub mean_offset_ms: f64,
    pub mean_abs_offset_ms: f64,
    pub max_abs_offset_ms: f64,
    /// `max(0, 100 - mean_abs_offset_ms / 10)`.
    pub accuracy_score: f64,
}

impl TimingAnalysis {
    pub fn empty() -> Self {
        Self {
            pairs: 0,
            on_time_count: 0,
            early_count: 0,
            late_count: 0,
            on_time_ratio: 0.0,
            mean_offset_ms: 0.0,
            mean_abs_offset_ms: 0.0,
            max_abs_offset_ms: 0.0,
            accuracy_score: 0.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pairs == 0
    }
}

/// Named weighting of the three sub-scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMode {
    /// pitch 0.7, stability 0.2, timing 0.1
    #[default]
    Standard,
    /// pitch 0.6, stability 0.2, timing 0.2
    DtwComparison,
}

impl ScoringMode {
    pub fn weights(self) -> ScoreWeights {
        match self {
            ScoringMode::Standard => ScoreWeights {
                pitch: 0.7,
                stability: 0.2,
                timing: 0.1,
            },
            ScoringMode::DtwComparison => ScoreWeights {
                pitch: 0.6,
                stability: 0.2,
                timing: 0.2,
            },
        }
    }
}

impl fmt::Display for ScoringMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoringMode::Standard => write!(f, "standard"),
            ScoringMode::DtwComparison => write!(f, "dtw-comparison"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub pitch: f64,
    pub stability: f64,
    pub timing: f64,
}

/// Letter grade for a composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    F,
    D,
    #[serde(rename = "D+")]
    DPlus,
    C,
    #[serde(rename = "C+")]
    CPlus,
    B,
    #[serde(rename = "B+")]
    BPlus,
    A,
    #[serde(rename = "A+")]
    APlus,
    S,
}

impl Grade {
    /// Fixed step function, monotonic in `score`.
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 95.0 => Grade::S,
            s if s >= 90.0 => Grade::APlus,
            s if s >= 85.0 => Grade::A,
            s if s >= 80.0 => Grade::BPlus,
            s if s >= 75.0 => Grade::B,
            s if s >= 70.0 => Grade::CPlus,
            s if s >= 65.0 => Grade::C,
            s if s >= 60.0 => Grade::DPlus,
            s if s >= 50.0 => Grade::D,
            _ => Grade::F,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Grade::S => "S",
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::CPlus => "C+",
            Grade::C => "C",
            Grade::DPlus => "D+",
            Grade::D => "D",
            Grade::F => "F",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub pitch_score: f64,
    pub stability_score: f64,
    pub timing_score: f64,
    pub weights: ScoreWeights,
    /// Weighted sum of the sub-scores, in [0, 100].
    pub total_score: f64,
    pub grade: Grade,
}

impl ScoreBreakdown {
    pub fn zero(mode: ScoringMode) -> Self {
        Self {
            pitch_score: 0.0,
            stability_score: 0.0,
            timing_score: 0.0,
            weights: mode.weights(),
            total_score: 0.0,
            grade: Grade::F,
        }
    }
}

/// Everything one comparison produced. Built once and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComprehensiveResult {
    pub mode: ScoringMode,
    pub breakdown: ScoreBreakdown,
    pub pitch: PitchAccuracyAnalysis,
    pub stability: StabilityAnalysis,
    pub vibrato: VibratoAnalysis,
    pub timing: TimingAnalysis,
    pub aligned_pairs: Vec<AlignedPair>,
    pub frame_duration_secs: f64,
}

impl ComprehensiveResult {
    /// Result for a comparison with nothing to align: every score is 0.
    pub fn empty(mode: ScoringMode, frame_duration_secs: f64) -> Self {
        Self {
            mode,
            breakdown: ScoreBreakdown::zero(mode),
            pitch: PitchAccuracyAnalysis::empty(),
            stability: StabilityAnalysis::empty(),
            vibrato: VibratoAnalysis::empty(),
            timing: TimingAnalysis::empty(),
            aligned_pairs: Vec::new(),
            frame_duration_secs,
        }
    }

    /// Per-pair cent differences in path order.
    pub fn cent_differences(&self) -> Vec<f64> {
        self.aligned_pairs.iter().map(|p| p.cent_difference).collect()
    }
}
