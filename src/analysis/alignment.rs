use super::result::AlignedPair;
use crate::cancel::CancelToken;
use crate::error::EngineResult;
use crate::util::{cent_diff, hz_to_cents};

/// Cost of pairing a pitch with silence (or silence with silence).
pub const SILENCE_PENALTY: f64 = 1000.0;

/// DTW local distance: absolute cent difference when both pitches are
/// voiced, otherwise the fixed silence penalty.
pub fn pitch_distance(reference: f64, recorded: f64) -> f64 {
    if reference > 0.0 && recorded > 0.0 {
        (hz_to_cents(reference) - hz_to_cents(recorded)).abs()
    } else {
        SILENCE_PENALTY
    }
}

/// Dynamic-time-warping alignment of a recorded pitch sequence against a
/// reference.
///
/// The default is the unbounded algorithm: the full `(R+1) x (S+1)` cost
/// matrix is filled, so time and memory are O(R*S). Long recordings with
/// a large length mismatch are the main scaling limit of the engine. An
/// optional Sakoe-Chiba band restricts each row to cells near the
/// diagonal; it changes results whenever the optimal path leaves the band.
#[derive(Debug, Clone, Default)]
pub struct SequenceAligner {
    /// Band radius in recorded samples. `None` = unbounded.
    pub band: Option<usize>,
}

/// Row-major `(rows x cols)` cost matrix.
struct CostMatrix {
    cols: usize,
    cells: Vec<f64>,
}

impl CostMatrix {
    fn new(rows: usize, cols: usize) -> Self {
        Self {
            cols,
            cells: vec![f64::INFINITY; rows * cols],
        }
    }

    fn get(&self, i: usize, j: usize) -> f64 {
        self.cells[i * self.cols + j]
    }

    fn set(&mut self, i: usize, j: usize, v: f64) {
        self.cells[i * self.cols + j] = v;
    }
}

impl SequenceAligner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_band(radius: usize) -> Self {
        Self { band: Some(radius) }
    }

    /// Align without a cancellation checkpoint.
    pub fn align(&self, reference: &[f64], recorded: &[f64]) -> Vec<AlignedPair> {
        // A fresh token never fires, so the error arm is unreachable
        self.align_with_cancel(reference, recorded, &CancelToken::new())
            .unwrap_or_default()
    }

    /// Align, checking `cancel` once per matrix row.
    ///
    /// Returns pairs in increasing time order. Empty input on either side
    /// yields no pairs.
    pub fn align_with_cancel(
        &self,
        reference: &[f64],
        recorded: &[f64],
        cancel: &CancelToken,
    ) -> EngineResult<Vec<AlignedPair>> {
        let (r, s) = (reference.len(), recorded.len());
        if r == 0 || s == 0 {
            return Ok(Vec::new());
        }

        log::debug!("DTW over {}x{} cells (band {:?})", r, s, self.band);

        let mut cost = CostMatrix::new(r + 1, s + 1);
        cost.set(0, 0, 0.0);

        for i in 1..=r {
            cancel.check()?;
            let (lo, hi) = self.row_bounds(i, r, s);
            for j in lo..=hi {
                let best_prev = cost
                    .get(i - 1, j - 1)
                    .min(cost.get(i - 1, j))
                    .min(cost.get(i, j - 1));
                cost.set(i, j, pitch_distance(reference[i - 1], recorded[j - 1]) + best_prev);
            }
        }

        let mut pairs = Vec::with_capacity(r.max(s));
        let (mut i, mut j) = (r, s);
        while i > 0 && j > 0 {
            let (ref_pitch, rec_pitch) = (reference[i - 1], recorded[j - 1]);
            pairs.push(AlignedPair {
                reference_pitch: ref_pitch,
                singing_pitch: rec_pitch,
                cent_difference: cent_diff(rec_pitch, ref_pitch),
                reference_index: i - 1,
                singing_index: j - 1,
                alignment_cost: cost.get(i, j),
            });

            let diag = cost.get(i - 1, j - 1);
            let up = cost.get(i - 1, j);
            let left = cost.get(i, j - 1);
            if diag <= up && diag <= left {
                i -= 1;
                j -= 1;
            } else if up <= left {
                i -= 1;
            } else {
                j -= 1;
            }
        }

        pairs.reverse();
        Ok(pairs)
    }

    /// Inclusive column range filled for row `i`.
    fn row_bounds(&self, i: usize, r: usize, s: usize) -> (usize, usize) {
        let Some(band) = self.band else {
            return (1, s);
        };
        // The band must be at least one row's slope wide to stay connected
        let radius = band.max(s.div_ceil(r));
        let centre = i * s / r;
        let lo = centre.saturating_sub(radius).max(1);
        let hi = (centre + radius).min(s);
        (lo, hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;

    fn assert_monotonic(pairs: &[AlignedPair]) {
        for w in pairs.windows(2) {
            assert!(w[1].reference_index >= w[0].reference_index);
            assert!(w[1].singing_index >= w[0].singing_index);
        }
    }

    #[test]
    fn identical_sequences_align_on_diagonal() {
        let seq = [440.0, 493.88, 523.25];
        let pairs = SequenceAligner::new().align(&seq, &seq);
        assert_eq!(pairs.len(), 3);
        for (k, p) in pairs.iter().enumerate() {
            assert_eq!((p.reference_index, p.singing_index), (k, k));
            assert_eq!(p.cent_difference, 0.0);
        }
    }

    #[test]
    fn path_spans_both_sequences() {
        let reference = [220.0, 220.0, 247.0, 262.0, 262.0, 294.0];
        let recorded = [220.0, 247.0, 247.0, 262.0, 294.0, 294.0, 294.0, 294.0];
        let pairs = SequenceAligner::new().align(&reference, &recorded);

        assert_monotonic(&pairs);
        let first = pairs.first().unwrap();
        let last = pairs.last().unwrap();
        assert_eq!((first.reference_index, first.singing_index), (0, 0));
        assert_eq!(
            (last.reference_index, last.singing_index),
            (reference.len() - 1, recorded.len() - 1)
        );
    }

    #[test]
    fn stretched_recording_maps_back_to_reference() {
        let reference = [200.0, 300.0];
        let recorded = [200.0, 200.0, 200.0, 300.0, 300.0];
        let pairs = SequenceAligner::new().align(&reference, &recorded);
        assert!(pairs.iter().all(|p| p.cent_difference == 0.0));
        assert_eq!(pairs.len(), 5);
    }

    #[test]
    fn cost_accumulates_along_path() {
        let pairs = SequenceAligner::new().align(&[440.0, 440.0], &[466.16, 466.16]);
        assert_monotonic(&pairs);
        assert!((pairs[0].alignment_cost - 100.0).abs() < 0.1);
        assert!((pairs[1].alignment_cost - 200.0).abs() < 0.2);
    }

    #[test]
    fn silence_pays_fixed_penalty() {
        assert_eq!(pitch_distance(440.0, 0.0), SILENCE_PENALTY);
        assert_eq!(pitch_distance(0.0, 0.0), SILENCE_PENALTY);
        assert!((pitch_distance(880.0, 440.0) - 1200.0).abs() < 1e-9);
    }

    #[test]
    fn empty_input_yields_no_pairs() {
        assert!(SequenceAligner::new().align(&[], &[440.0]).is_empty());
        assert!(SequenceAligner::new().align(&[440.0], &[]).is_empty());
    }

    #[test]
    fn band_matches_unbounded_on_near_diagonal_paths() {
        let reference: Vec<f64> = (0..40).map(|i| 200.0 + (i % 7) as f64 * 15.0).collect();
        let mut recorded = reference.clone();
        recorded.insert(10, recorded[10]);
        recorded.remove(30);

        let full = SequenceAligner::new().align(&reference, &recorded);
        let banded = SequenceAligner::with_band(5).align(&reference, &recorded);
        assert_eq!(full, banded);
    }

    #[test]
    fn banded_path_still_reaches_corners() {
        let reference = vec![300.0; 10];
        let recorded = vec![300.0; 35];
        let pairs = SequenceAligner::with_band(1).align(&reference, &recorded);
        assert_monotonic(&pairs);
        assert_eq!(pairs.first().map(|p| (p.reference_index, p.singing_index)), Some((0, 0)));
        assert_eq!(pairs.last().map(|p| (p.reference_index, p.singing_index)), Some((9, 34)));
    }

    #[test]
    fn cancellation_between_rows() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = SequenceAligner::new()
            .align_with_cancel(&[440.0; 4], &[440.0; 4], &cancel)
            .unwrap_err();
        assert_eq!(err, EngineError::Cancelled);
    }
}
