use super::result::{VibratoAnalysis, VibratoSegment};
use crate::util::{hz_to_cents, mean, std_dev};

/// Periodic pitch-oscillation detection over a pitch sequence.
///
/// The sequence is detrended with a centred moving average so note
/// changes and slow drift do not count as oscillation. Each scan window
/// then estimates a rate from zero crossings of the residual and a depth
/// from its RMS.
#[derive(Debug, Clone)]
pub struct VibratoAnalyzer {
    pub min_samples: usize,
    pub trend_window: usize,
    pub scan_window: usize,
    pub scan_stride: usize,
    pub min_rate_hz: f64,
    pub max_rate_hz: f64,
    pub min_depth_cents: f64,
}

impl Default for VibratoAnalyzer {
    fn default() -> Self {
        Self {
            min_samples: 20,
            trend_window: 10,
            scan_window: 40,
            scan_stride: 20,
            min_rate_hz: 4.0,
            max_rate_hz: 8.0,
            min_depth_cents: 20.0,
        }
    }
}

fn centred_moving_average(values: &[f64], window: usize) -> Vec<f64> {
    let half = window / 2;
    (0..values.len())
        .map(|i| {
            let start = i.saturating_sub(half);
            let end = (i + window - half).min(values.len());
            mean(&values[start..end])
        })
        .collect()
}

fn zero_crossings(values: &[f64]) -> usize {
    values
        .windows(2)
        .filter(|w| (w[0] < 0.0) != (w[1] < 0.0))
        .count()
}

fn rms(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    (values.iter().map(|v| v * v).sum::<f64>() / values.len() as f64).sqrt()
}

impl VibratoAnalyzer {
    /// `frame_duration_secs` is the time between consecutive samples.
    /// Fewer than `min_samples` voiced samples gives the empty analysis.
    pub fn analyze(&self, pitches: &[f64], frame_duration_secs: f64) -> VibratoAnalysis {
        let (indices, cents): (Vec<usize>, Vec<f64>) = pitches
            .iter()
            .enumerate()
            .filter(|(_, &p)| p > 0.0 && p.is_finite())
            .map(|(i, &p)| (i, hz_to_cents(p)))
            .unzip();

        if cents.len() < self.min_samples || frame_duration_secs <= 0.0 {
            return VibratoAnalysis::empty();
        }

        let trend = centred_moving_average(&cents, self.trend_window.max(1));
        let residual: Vec<f64> = cents.iter().zip(&trend).map(|(c, t)| c - t).collect();

        let window = self.scan_window.max(2).min(residual.len());
        let stride = self.scan_stride.max(1);

        let mut segments = Vec::new();
        let mut start = 0;
        while start + window <= residual.len() {
            let slice = &residual[start..start + window];
            let duration = window as f64 * frame_duration_secs;
            let rate_hz = zero_crossings(slice) as f64 / 2.0 / duration;
            let depth_cents = 2.0 * rms(slice);
            let is_vibrato = (self.min_rate_hz..=self.max_rate_hz).contains(&rate_hz)
                && depth_cents >= self.min_depth_cents;

            segments.push((start, start + window - 1, rate_hz, depth_cents, is_vibrato));
            start += stride;
        }

        let qualifying: Vec<_> = segments.iter().filter(|s| s.4).collect();
        let has_vibrato = !qualifying.is_empty();
        let (rate_hz, depth_cents) = if has_vibrato {
            (
                mean(&qualifying.iter().map(|s| s.2).collect::<Vec<_>>()),
                mean(&qualifying.iter().map(|s| s.3).collect::<Vec<_>>()),
            )
        } else {
            (0.0, 0.0)
        };

        let regularity_score = if has_vibrato {
            let in_vibrato = |i: usize| qualifying.iter().any(|s| (s.0..=s.1).contains(&i));
            let peaks: Vec<usize> = (1..residual.len() - 1)
                .filter(|&i| {
                    residual[i] > 0.0
                        && residual[i] > residual[i - 1]
                        && residual[i] >= residual[i + 1]
                        && in_vibrato(i)
                })
                .collect();
            regularity(&peaks)
        } else {
            0.0
        };

        VibratoAnalysis {
            has_vibrato,
            rate_hz,
            depth_cents,
            regularity_score,
            segments: segments
                .into_iter()
                .map(|(s, e, rate_hz, depth_cents, is_vibrato)| VibratoSegment {
                    start_index: indices[s],
                    end_index: indices[e],
                    rate_hz,
                    depth_cents,
                    is_vibrato,
                })
                .collect(),
        }
    }
}

/// 0-100 score from the spread of peak-to-peak intervals; even spacing
/// scores 100 and the score drops with the coefficient of variation.
fn regularity(peaks: &[usize]) -> f64 {
    let intervals: Vec<f64> = peaks.windows(2).map(|w| (w[1] - w[0]) as f64).collect();
    if intervals.is_empty() {
        return 0.0;
    }
    let m = mean(&intervals);
    if m <= 0.0 {
        return 0.0;
    }
    (100.0 * (1.0 - std_dev(&intervals) / m)).clamp(0.0, 100.0)
}
