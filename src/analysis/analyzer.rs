use std::ops::Range;

use super::alignment::SequenceAligner;
use super::pitch_accuracy::PitchAccuracyAnalyzer;
use super::result::{ComprehensiveResult, ScoringMode};
use super::scoring::ScoringEngine;
use super::stability::StabilityAnalyzer;
use super::timing::TimingAnalyzer;
use super::vibrato::VibratoAnalyzer;
use crate::audio::pcm::PcmBuffer;
use crate::cancel::CancelToken;
use crate::dsp::estimator::RawPitchEstimator;
use crate::dsp::pitch::{PitchDetector, PitchTrack};
use crate::dsp::smoothing::PitchSequenceSmoother;
use crate::error::EngineResult;
use crate::util::{cent_diff, is_voiced, sanitize_pitch};

/// Compares a recorded pitch sequence against a reference and scores it.
///
/// Stages: range-filter the reference and smooth the recording, trim
/// leading and trailing silence, align with DTW, run the sub-analyses on
/// the alignment, then score. Every stage is a plain value owned by the
/// pipeline, so one pipeline can serve any number of comparisons from any
/// thread.
///
/// Smoothing only steers the alignment path. The pairs handed to the
/// analyses carry the unsmoothed pitches, so a wrong note is scored as
/// sung rather than blended with its neighbours.
#[derive(Debug, Clone, Default)]
pub struct ComparisonPipeline {
    pub smoother: PitchSequenceSmoother,
    pub aligner: SequenceAligner,
    pub pitch_accuracy: PitchAccuracyAnalyzer,
    pub stability: StabilityAnalyzer,
    pub vibrato: VibratoAnalyzer,
    pub timing: TimingAnalyzer,
    pub scoring: ScoringEngine,
}

/// Detection output together with the comparison built from it.
#[derive(Debug, Clone)]
pub struct PerformanceAnalysis {
    pub track: PitchTrack,
    pub result: ComprehensiveResult,
}

/// Index range from the first to the last voiced sample, if any.
fn voiced_span(pitches: &[f64]) -> Option<Range<usize>> {
    let first = pitches.iter().position(|&p| is_voiced(p))?;
    let last = pitches.iter().rposition(|&p| is_voiced(p))?;
    Some(first..last + 1)
}

impl ComparisonPipeline {
    pub fn new(mode: ScoringMode) -> Self {
        Self {
            scoring: ScoringEngine::new(mode),
            ..Self::default()
        }
    }

    pub fn mode(&self) -> ScoringMode {
        self.scoring.mode
    }

    /// Run a comparison to completion.
    pub fn compare(
        &self,
        reference: &[f64],
        recorded: &[f64],
        frame_duration_secs: f64,
    ) -> ComprehensiveResult {
        // A fresh token never fires
        self.compare_with_cancel(reference, recorded, frame_duration_secs, &CancelToken::new())
            .unwrap_or_else(|_| ComprehensiveResult::empty(self.mode(), frame_duration_secs))
    }

    /// Run a comparison, honouring `cancel` between alignment rows.
    ///
    /// A side with no voiced samples yields the empty result with every
    /// score at 0 rather than an error. Pair indices in the result refer
    /// to positions in the untrimmed input sequences.
    pub fn compare_with_cancel(
        &self,
        reference: &[f64],
        recorded: &[f64],
        frame_duration_secs: f64,
        cancel: &CancelToken,
    ) -> EngineResult<ComprehensiveResult> {
        let mode = self.mode();
        let reference = self.smoother.filter(reference);
        let recorded_raw: Vec<f64> = recorded.iter().map(|&p| sanitize_pitch(p)).collect();
        let recorded_filtered = self.smoother.filter(&recorded_raw);
        let recorded = self.smoother.smooth(&recorded_raw);

        let (Some(ref_span), Some(rec_span)) = (voiced_span(&reference), voiced_span(&recorded)) else {
            log::warn!(
                "Nothing to align ({} reference / {} recorded samples, no voiced pitch on one side)",
                reference.len(),
                recorded.len()
            );
            return Ok(ComprehensiveResult::empty(mode, frame_duration_secs));
        };

        log::debug!(
            "Aligning reference {:?} against recording {:?}",
            ref_span,
            rec_span
        );

        let mut pairs = self.aligner.align_with_cancel(
            &reference[ref_span.clone()],
            &recorded[rec_span.clone()],
            cancel,
        )?;
        for pair in &mut pairs {
            pair.reference_index += ref_span.start;
            pair.singing_index += rec_span.start;
            // Filtering and smoothing zero the same samples
            pair.singing_pitch = recorded_filtered[pair.singing_index];
            pair.cent_difference = cent_diff(pair.singing_pitch, pair.reference_pitch);
        }

        let pitch = self.pitch_accuracy.analyze(&pairs);
        let stability = self.stability.analyze_deviations(&pairs);
        // Smoothing flattens the oscillation vibrato looks for
        let vibrato = self.vibrato.analyze(&recorded_raw, frame_duration_secs);
        let timing = self.timing.analyze(&pairs, frame_duration_secs);
        let breakdown = self.scoring.score(&pitch, &stability, &timing);

        log::debug!(
            "Scored {} pairs: total {:.1} ({})",
            pairs.len(),
            breakdown.total_score,
            breakdown.grade
        );

        Ok(ComprehensiveResult {
            mode,
            breakdown,
            pitch,
            stability,
            vibrato,
            timing,
            aligned_pairs: pairs,
            frame_duration_secs,
        })
    }
}

/// Detect the pitch of a recorded performance and score it against a
/// reference sequence, as one cancellable task.
pub fn analyze_performance<E: RawPitchEstimator>(
    detector: &PitchDetector<E>,
    pipeline: &ComparisonPipeline,
    pcm: &PcmBuffer,
    reference: &[f64],
    cancel: &CancelToken,
) -> EngineResult<PerformanceAnalysis> {
    let track = detector.detect_with_cancel(pcm, Some(reference), cancel)?;
    let result =
        pipeline.compare_with_cancel(reference, &track.pitches, track.frame_duration_secs(), cancel)?;
    Ok(PerformanceAnalysis { track, result })
}

/// Detect a recording against a reference detected from audio and score
/// it. Both tracks share one frame layout, so the comparison runs on a
/// single time base.
pub fn analyze_against_track<E: RawPitchEstimator>(
    detector: &PitchDetector<E>,
    pipeline: &ComparisonPipeline,
    pcm: &PcmBuffer,
    reference: &PitchTrack,
    cancel: &CancelToken,
) -> EngineResult<PerformanceAnalysis> {
    let track = detector.detect_against(pcm, reference, cancel)?;
    let result = pipeline.compare_with_cancel(
        &reference.pitches,
        &track.pitches,
        track.frame_duration_secs(),
        cancel,
    )?;
    Ok(PerformanceAnalysis { track, result })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::result::{Grade, StabilityAnalysis, TimingAnalysis};
    use crate::dsp::estimator::{EstimateError, RawEstimate};
    use crate::dsp::pitch::PitchDetectorConfig;
    use crate::error::EngineError;

    const FRAME: f64 = 0.02;

    #[test]
    fn perfect_match_scores_s() {
        let seq = [440.0, 493.88, 523.25];
        let result = ComparisonPipeline::default().compare(&seq, &seq, FRAME);
        assert_eq!(result.cent_differences(), vec![0.0, 0.0, 0.0]);
        assert!((result.breakdown.total_score - 100.0).abs() < 1e-9);
        assert_eq!(result.breakdown.grade, Grade::S);
    }

    #[test]
    fn reversed_melody_is_not_a_perfect_match() {
        let melody = [440.0, 493.88, 523.25];
        let reversed = [523.25, 493.88, 440.0];
        let result = ComparisonPipeline::default().compare(&melody, &reversed, FRAME);

        assert_ne!(result.breakdown.grade, Grade::S);
        assert!(result.breakdown.total_score < 60.0, "{:?}", result.breakdown);
        assert!(result.pitch.max_abs_cent_error > 290.0);
    }

    #[test]
    fn pairs_report_unsmoothed_pitches() {
        let reference = vec![440.0; 8];
        let mut recorded = vec![440.0; 8];
        recorded[4] = 466.16;
        let result = ComparisonPipeline::default().compare(&reference, &recorded, FRAME);

        let wrong = result
            .aligned_pairs
            .iter()
            .find(|p| p.singing_index == 4)
            .unwrap();
        assert_eq!(wrong.singing_pitch, 466.16);
        assert!((wrong.cent_difference - 100.0).abs() < 0.1);
        assert!(result
            .aligned_pairs
            .iter()
            .filter(|p| p.singing_index != 4)
            .all(|p| p.cent_difference == 0.0));
    }

    #[test]
    fn silent_recording_is_degenerate() {
        let result = ComparisonPipeline::default().compare(&[440.0], &[0.0, 0.0, 0.0], FRAME);
        assert_eq!(result.breakdown.total_score, 0.0);
        assert_eq!(result.stability, StabilityAnalysis::empty());
        assert_eq!(result.timing, TimingAnalysis::empty());
        assert!(result.aligned_pairs.is_empty());
    }

    #[test]
    fn empty_reference_is_degenerate() {
        let result = ComparisonPipeline::new(ScoringMode::DtwComparison).compare(&[], &[440.0; 5], FRAME);
        assert_eq!(result.mode, ScoringMode::DtwComparison);
        assert_eq!(result.breakdown.total_score, 0.0);
    }

    #[test]
    fn indices_refer_to_untrimmed_sequences() {
        let reference = vec![330.0; 10];
        let mut recorded = vec![0.0; 4];
        recorded.extend(vec![330.0; 10]);
        recorded.extend([0.0; 3]);

        let result = ComparisonPipeline::default().compare(&reference, &recorded, FRAME);
        let first = result.aligned_pairs.first().unwrap();
        let last = result.aligned_pairs.last().unwrap();
        assert_eq!((first.reference_index, first.singing_index), (0, 4));
        assert_eq!((last.reference_index, last.singing_index), (9, 13));
        // 4 frames of 20 ms late
        assert!((result.timing.mean_offset_ms - 80.0).abs() < 1e-9);
    }

    #[test]
    fn flat_singer_loses_pitch_points() {
        let reference = vec![440.0; 20];
        let flat = vec![440.0 * 2f64.powf(-100.0 / 1200.0); 20];
        let result = ComparisonPipeline::default().compare(&reference, &flat, FRAME);
        assert_eq!(result.pitch.accuracy_ratio, 0.0);
        assert!(result.pitch.mean_cent_bias < -99.0);
        assert!(result.breakdown.pitch_score < 50.0);
        assert!(result.breakdown.stability_score > 99.0);
    }

    #[test]
    fn cancelled_comparison_returns_error() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = ComparisonPipeline::default()
            .compare_with_cancel(&[440.0; 8], &[440.0; 8], FRAME, &cancel)
            .unwrap_err();
        assert_eq!(err, EngineError::Cancelled);
    }

    #[test]
    fn non_finite_recorded_values_are_treated_as_silence() {
        let reference = [440.0, 440.0, 440.0];
        let recorded = [f64::NAN, 440.0, f64::INFINITY, 440.0, 440.0];
        let result = ComparisonPipeline::default().compare(&reference, &recorded, FRAME);
        for s in [
            result.breakdown.pitch_score,
            result.breakdown.stability_score,
            result.breakdown.timing_score,
            result.breakdown.total_score,
        ] {
            assert!((0.0..=100.0).contains(&s));
        }
    }

    struct Constant(f64);

    impl RawPitchEstimator for Constant {
        fn estimate(&self, _chunk: &[i16], _sample_rate: u32) -> Result<RawEstimate, EstimateError> {
            Ok(RawEstimate {
                pitch_hz: self.0,
                pitched: true,
                probability: 0.9,
            })
        }
    }

    #[test]
    fn performance_runs_detection_then_comparison() {
        let sample_rate = 16_000;
        let samples: Vec<i16> = (0..16_000)
            .map(|i| {
                let t = i as f64 / sample_rate as f64;
                ((2.0 * std::f64::consts::PI * 220.0 * t).sin() * 8000.0) as i16
            })
            .collect();
        let pcm = PcmBuffer::new(samples, sample_rate).unwrap();
        let detector = PitchDetector::with_estimator(PitchDetectorConfig::default(), Constant(220.0));
        let reference = vec![220.0; 20];

        let analysis = analyze_performance(
            &detector,
            &ComparisonPipeline::default(),
            &pcm,
            &reference,
            &CancelToken::new(),
        )
        .unwrap();

        assert!(!analysis.track.pitches.is_empty());
        assert!(analysis.result.pitch.accuracy_ratio > 0.9, "{:?}", analysis.result.pitch);
        assert_eq!(
            analysis.result.frame_duration_secs,
            analysis.track.frame_duration_secs()
        );
    }
}
