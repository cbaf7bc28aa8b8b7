use rayon::prelude::*;

use super::estimator::{EstimateError, McLeodEstimator, RawEstimate, RawPitchEstimator};
use super::harmonics::{HarmonicsAnalyzer, HarmonicsResult};
use super::octave::{range_fold, OctaveResolver, OctaveStrategy};
use super::volume::{chunk_volume, FrameVolumeGate, DEFAULT_SILENCE_THRESHOLD};
use crate::audio::pcm::PcmBuffer;
use crate::cancel::CancelToken;
use crate::error::{EngineError, EngineResult};
use crate::util::sanitize_pitch;

/// Configuration for pitch detection.
#[derive(Debug, Clone)]
pub struct PitchDetectorConfig {
    /// Lowest pitch the detector will emit.
    pub min_pitch_hz: f64,

    /// Highest pitch the detector will emit.
    pub max_pitch_hz: f64,

    /// Mean absolute 16-bit amplitude below which a chunk is silent.
    pub silence_threshold: f64,

    /// Fraction of each chunk shared with the next one.
    /// 0.5 means the step is half a chunk.
    pub overlap_ratio: f64,

    /// Chunk size used when no reference sequence is supplied.
    pub default_chunk_size: usize,

    /// Emitted for sounding chunks without a pitch when there is no
    /// reference to borrow one from.
    pub fallback_pitch_hz: f64,

    pub octave_strategy: OctaveStrategy,

    /// Estimates at or below this probability skip harmonics and octave
    /// resolution.
    pub min_probability: f64,

    /// Harmonics fundamental replaces the raw estimate above this confidence.
    pub harmonics_override_confidence: f64,

    /// How many reference samples either side to search when the reference
    /// is silent at a chunk's time position.
    pub reference_search_radius: usize,

    /// Number of recent emitted pitches the octave resolver sees.
    pub context_len: usize,
}

impl Default for PitchDetectorConfig {
    fn default() -> Self {
        Self {
            min_pitch_hz: 60.0,
            max_pitch_hz: 1000.0,
            silence_threshold: DEFAULT_SILENCE_THRESHOLD,
            overlap_ratio: 0.5,
            default_chunk_size: 2048,
            fallback_pitch_hz: 190.0,
            octave_strategy: OctaveStrategy::HarmonicWeighted,
            min_probability: 0.1,
            harmonics_override_confidence: 0.6,
            reference_search_radius: 10,
            context_len: 5,
        }
    }
}

/// Summary of the voiced part of a reference sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceProfile {
    pub min_hz: f64,
    pub avg_hz: f64,
    pub max_hz: f64,
}

impl ReferenceProfile {
    /// `None` when the reference has no voiced samples.
    pub fn from_sequence(reference: &[f64]) -> Option<Self> {
        let voiced: Vec<f64> = reference.iter().copied().filter(|&p| p > 0.0).collect();
        if voiced.is_empty() {
            return None;
        }
        Some(Self {
            min_hz: voiced.iter().copied().fold(f64::INFINITY, f64::min),
            avg_hz: crate::util::mean(&voiced),
            max_hz: voiced.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        })
    }
}

/// Expected vocal register, used to trade time for frequency resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceRegister {
    VeryLow,
    Low,
    Mid,
    High,
}

impl VoiceRegister {
    pub fn classify(profile: &ReferenceProfile) -> Self {
        if profile.avg_hz < 120.0 || profile.min_hz < 80.0 {
            VoiceRegister::VeryLow
        } else if profile.avg_hz < 165.0 || profile.min_hz < 110.0 {
            VoiceRegister::Low
        } else if profile.avg_hz > 300.0 || profile.max_hz > 400.0 {
            VoiceRegister::High
        } else {
            VoiceRegister::Mid
        }
    }

    /// Detection window in samples. Lower voices need longer windows to
    /// hold enough periods for the autocorrelation.
    pub fn chunk_size(self) -> usize {
        match self {
            VoiceRegister::VeryLow => 2048,
            VoiceRegister::Low => 1536,
            VoiceRegister::Mid => 1024,
            VoiceRegister::High => 512,
        }
    }
}

/// Chunking used for one detection run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    pub chunk_size: usize,
    pub step_size: usize,
}

impl FrameLayout {
    /// Number of chunks for `n` samples: positions `k * step` with
    /// `k * step + chunk < n`, i.e. `ceil((n - chunk) / step)`.
    pub fn chunk_count(&self, n: usize) -> usize {
        if n <= self.chunk_size {
            return 0;
        }
        (n - self.chunk_size).div_ceil(self.step_size)
    }

    /// The same chunk and step durations at another sample rate.
    pub fn for_sample_rate(&self, from_rate: u32, to_rate: u32) -> Self {
        if from_rate == to_rate || from_rate == 0 || to_rate == 0 {
            return *self;
        }
        let scale = to_rate as f64 / from_rate as f64;
        let rescale = |n: usize| ((n as f64 * scale).round() as usize).max(1);
        Self {
            chunk_size: rescale(self.chunk_size),
            step_size: rescale(self.step_size),
        }
    }
}

/// Output of a detection run: one pitch per chunk plus its time base.
#[derive(Debug, Clone, PartialEq)]
pub struct PitchTrack {
    /// Hz per chunk; 0.0 means silence or no pitch.
    pub pitches: Vec<f64>,
    pub layout: FrameLayout,
    pub sample_rate: u32,
}

impl PitchTrack {
    /// Seconds between consecutive pitch samples.
    pub fn frame_duration_secs(&self) -> f64 {
        self.layout.step_size as f64 / self.sample_rate as f64
    }
}

/// What the parallel pass learned about one chunk.
enum ChunkObservation {
    /// Leading silence before the first sounding chunk.
    Skipped,
    Observed {
        volume: f64,
        raw: Result<RawEstimate, EstimateError>,
        harmonics: Option<HarmonicsResult>,
    },
}

/// Per-chunk F0 detection with octave correction and reference fallback.
///
/// Detection runs in two passes. The expensive pass (estimator plus
/// harmonics FFT) is independent per chunk and runs on the rayon pool.
/// The correction pass is sequential because octave resolution looks at
/// the pitches already emitted. Output order always follows chunk order.
pub struct PitchDetector<E = McLeodEstimator> {
    config: PitchDetectorConfig,
    estimator: E,
    gate: FrameVolumeGate,
    harmonics: HarmonicsAnalyzer,
    resolver: OctaveResolver,
}

impl PitchDetector<McLeodEstimator> {
    pub fn new(config: PitchDetectorConfig) -> Self {
        Self::with_estimator(config, McLeodEstimator::default())
    }
}

impl<E: RawPitchEstimator> PitchDetector<E> {
    pub fn with_estimator(config: PitchDetectorConfig, estimator: E) -> Self {
        let gate = FrameVolumeGate::new(config.silence_threshold);
        let harmonics = HarmonicsAnalyzer::new(config.min_pitch_hz, config.max_pitch_hz);
        let resolver = OctaveResolver::new(
            config.min_pitch_hz,
            config.max_pitch_hz,
            config.octave_strategy,
        );
        Self {
            config,
            estimator,
            gate,
            harmonics,
            resolver,
        }
    }

    pub fn config(&self) -> &PitchDetectorConfig {
        &self.config
    }

    /// Chunk and step sizes for a run against `reference`.
    pub fn frame_layout(&self, reference: Option<&[f64]>) -> FrameLayout {
        let chunk_size = reference
            .and_then(ReferenceProfile::from_sequence)
            .map(|p| VoiceRegister::classify(&p).chunk_size())
            .unwrap_or(self.config.default_chunk_size)
            .max(1);
        let overlap = self.config.overlap_ratio.clamp(0.0, 0.95);
        let step_size = ((chunk_size as f64 * (1.0 - overlap)).round() as usize).max(1);
        FrameLayout {
            chunk_size,
            step_size,
        }
    }

    pub fn detect(&self, pcm: &PcmBuffer, reference: Option<&[f64]>) -> EngineResult<PitchTrack> {
        self.detect_with_cancel(pcm, reference, &CancelToken::new())
    }

    /// Detect a pitch sequence, checking `cancel` between chunks.
    ///
    /// Fails only on input that cannot be chunked or on cancellation.
    /// Estimator failures turn into 0.0 for the affected chunk.
    pub fn detect_with_cancel(
        &self,
        pcm: &PcmBuffer,
        reference: Option<&[f64]>,
        cancel: &CancelToken,
    ) -> EngineResult<PitchTrack> {
        self.detect_with_layout(pcm, self.frame_layout(reference), reference, cancel)
    }

    /// Detect a reference melody from audio.
    ///
    /// A first pass at the default layout profiles the melody. When that
    /// profile calls for a different chunk size the audio is detected again
    /// at that layout, so a recording detected against the result (see
    /// [`detect_against`](Self::detect_against)) gets the same resolution.
    pub fn detect_reference(&self, pcm: &PcmBuffer, cancel: &CancelToken) -> EngineResult<PitchTrack> {
        let first = self.detect_with_layout(pcm, self.frame_layout(None), None, cancel)?;
        let layout = self.frame_layout(Some(first.pitches.as_slice()));
        if layout == first.layout {
            return Ok(first);
        }
        log::debug!(
            "Reference profile asks for chunk {} / step {}, detecting again",
            layout.chunk_size,
            layout.step_size
        );
        self.detect_with_layout(pcm, layout, None, cancel)
    }

    /// Detect a recording against a reference that has its own time base.
    ///
    /// The recording is chunked with the reference's layout, rescaled to
    /// the recording's sample rate, so index `i` of both tracks covers the
    /// same stretch of time and the two can be aligned frame for frame.
    pub fn detect_against(
        &self,
        pcm: &PcmBuffer,
        reference: &PitchTrack,
        cancel: &CancelToken,
    ) -> EngineResult<PitchTrack> {
        let layout = reference
            .layout
            .for_sample_rate(reference.sample_rate, pcm.sample_rate());
        self.detect_with_layout(pcm, layout, Some(reference.pitches.as_slice()), cancel)
    }

    /// Detect with an explicit chunk layout.
    pub fn detect_with_layout(
        &self,
        pcm: &PcmBuffer,
        layout: FrameLayout,
        reference: Option<&[f64]>,
        cancel: &CancelToken,
    ) -> EngineResult<PitchTrack> {
        let samples = pcm.samples();

        if samples.len() <= layout.chunk_size {
            return Err(EngineError::InputFormat(format!(
                "{} samples is not longer than one detection chunk of {}",
                samples.len(),
                layout.chunk_size
            )));
        }

        let total = layout.chunk_count(samples.len());
        log::debug!(
            "Detecting {} chunks (chunk {} / step {}) at {} Hz",
            total,
            layout.chunk_size,
            layout.step_size,
            pcm.sample_rate()
        );

        let chunk_at = |i: usize| {
            let start = i * layout.step_size;
            &samples[start..start + layout.chunk_size]
        };

        // Leading-silence skip is the only order-dependent state, and a
        // volume scan resolves it up front
        let volumes: Vec<f64> = (0..total).map(|i| chunk_volume(chunk_at(i))).collect();
        let first_sound = self.gate.first_sound(&volumes).unwrap_or(total);

        let observations: Vec<ChunkObservation> = (0..total)
            .into_par_iter()
            .map(|i| -> EngineResult<ChunkObservation> {
                cancel.check()?;
                if i < first_sound {
                    return Ok(ChunkObservation::Skipped);
                }
                Ok(self.observe(chunk_at(i), volumes[i], pcm.sample_rate()))
            })
            .collect::<EngineResult<Vec<_>>>()?;

        let mut pitches = Vec::with_capacity(total);
        let mut context: Vec<f64> = Vec::with_capacity(self.config.context_len + 1);

        for (i, obs) in observations.into_iter().enumerate() {
            cancel.check()?;
            let pitch = sanitize_pitch(self.correct(i, total, obs, reference, &context));
            if pitch > 0.0 {
                context.push(pitch);
                if context.len() > self.config.context_len {
                    context.remove(0);
                }
            }
            pitches.push(pitch);
        }

        Ok(PitchTrack {
            pitches,
            layout,
            sample_rate: pcm.sample_rate(),
        })
    }

    fn observe(&self, chunk: &[i16], volume: f64, sample_rate: u32) -> ChunkObservation {
        let raw = self.estimator.estimate(chunk, sample_rate);
        let harmonics = match &raw {
            Ok(r) if r.pitched && r.probability > self.config.min_probability => {
                Some(self.harmonics.analyze(chunk, sample_rate))
            }
            _ => None,
        };
        ChunkObservation::Observed {
            volume,
            raw,
            harmonics,
        }
    }

    fn correct(
        &self,
        index: usize,
        total: usize,
        obs: ChunkObservation,
        reference: Option<&[f64]>,
        context: &[f64],
    ) -> f64 {
        let ChunkObservation::Observed {
            volume,
            raw,
            harmonics,
        } = obs
        else {
            return 0.0;
        };

        let raw = match raw {
            Ok(r) => r,
            Err(e) => {
                log::warn!("Pitch estimate failed for chunk {index}: {e}");
                return 0.0;
            }
        };

        // A confident harmonic series is the stronger witness for the
        // fundamental: autocorrelation locks onto a multiple of the period
        // when the fundamental is weak, the harmonic sum does not. The
        // resolver then weighs the octave against reference and context.
        if let Some(harmonics) = harmonics {
            let mut pitch = raw.pitch_hz;
            if harmonics.confidence > self.config.harmonics_override_confidence
                && harmonics.fundamental_frequency > 0.0
            {
                pitch = harmonics.fundamental_frequency;
            }
            let ref_pitch = reference.and_then(|r| self.reference_at(r, index, total));
            let resolved = self.resolver.resolve(pitch, ref_pitch, &harmonics, context);
            return self.accept(resolved);
        }

        if raw.pitch_hz > 0.0 {
            return self.accept(raw.pitch_hz);
        }

        if self.gate.is_sounding(volume) {
            return self.time_position_estimate(index, total, reference);
        }

        0.0
    }

    /// Fold into the configured range, or reject as 0.0.
    fn accept(&self, pitch_hz: f64) -> f64 {
        range_fold(pitch_hz, self.config.min_pitch_hz, self.config.max_pitch_hz).unwrap_or(0.0)
    }

    /// Reference pitch at the chunk's proportional time position.
    ///
    /// Interpolates between neighbours when both are voiced, otherwise
    /// searches outward for the nearest voiced sample within the radius.
    pub fn reference_at(&self, reference: &[f64], index: usize, total: usize) -> Option<f64> {
        if reference.is_empty() || total == 0 {
            return None;
        }
        let pos = index as f64 / total as f64 * reference.len() as f64;
        let idx = (pos.floor() as usize).min(reference.len() - 1);
        let frac = pos - idx as f64;

        let here = reference[idx];
        if here > 0.0 {
            return match reference.get(idx + 1) {
                Some(&next) if next > 0.0 => Some(here + (next - here) * frac),
                _ => Some(here),
            };
        }

        for d in 1..=self.config.reference_search_radius {
            if let Some(&p) = idx.checked_sub(d).and_then(|j| reference.get(j)) {
                if p > 0.0 {
                    return Some(p);
                }
            }
            if let Some(&p) = reference.get(idx + d) {
                if p > 0.0 {
                    return Some(p);
                }
            }
        }
        None
    }

    /// Pitch for a sounding chunk the estimator could not read.
    fn time_position_estimate(&self, index: usize, total: usize, reference: Option<&[f64]>) -> f64 {
        match reference {
            Some(r) if !r.is_empty() => self.reference_at(r, index, total).unwrap_or(0.0),
            _ => self.config.fallback_pitch_hz,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn sine_pcm(freq_hz: f64, sample_rate: u32, duration_secs: f64) -> PcmBuffer {
        let n = (sample_rate as f64 * duration_secs) as usize;
        let samples = (0..n)
            .map(|i| {
                let t = i as f64 / sample_rate as f64;
                ((2.0 * PI * freq_hz * t).sin() * 12000.0) as i16
            })
            .collect();
        PcmBuffer::new(samples, sample_rate).unwrap()
    }

    /// Reports the first sample of each chunk as an unpitched frequency.
    struct FirstSample;

    impl RawPitchEstimator for FirstSample {
        fn estimate(&self, chunk: &[i16], _: u32) -> Result<RawEstimate, EstimateError> {
            Ok(RawEstimate {
                pitch_hz: chunk[0] as f64,
                pitched: false,
                probability: 0.0,
            })
        }
    }

    struct NeverPitched;

    impl RawPitchEstimator for NeverPitched {
        fn estimate(&self, _: &[i16], _: u32) -> Result<RawEstimate, EstimateError> {
            Ok(RawEstimate::unpitched())
        }
    }

    struct AlwaysFails;

    impl RawPitchEstimator for AlwaysFails {
        fn estimate(&self, _: &[i16], _: u32) -> Result<RawEstimate, EstimateError> {
            Err(EstimateError::NonFinite)
        }
    }

    fn constant_pcm(value: i16, n: usize) -> PcmBuffer {
        PcmBuffer::new(vec![value; n], 44100).unwrap()
    }

    #[test]
    fn detects_220hz_sine() {
        let detector = PitchDetector::new(PitchDetectorConfig::default());
        let track = detector.detect(&sine_pcm(220.0, 44100, 1.0), None).unwrap();

        let voiced: Vec<f64> = track.pitches.iter().copied().filter(|&p| p > 0.0).collect();
        assert!(voiced.len() > track.pitches.len() / 2, "Too few voiced frames");

        let mean = crate::util::mean(&voiced);
        assert!((mean - 220.0).abs() < 5.0, "Mean pitch should be ~220 Hz, got {mean:.1} Hz");
    }

    #[test]
    fn output_length_follows_chunk_formula() {
        let detector = PitchDetector::with_estimator(PitchDetectorConfig::default(), NeverPitched);
        let track = detector.detect(&constant_pcm(0, 10_000), None).unwrap();
        // ceil((10000 - 2048) / 1024) = 8
        assert_eq!(track.pitches.len(), 8);
        assert_eq!(track.layout.step_size, 1024);
    }

    #[test]
    fn too_short_buffer_is_input_error() {
        let detector = PitchDetector::new(PitchDetectorConfig::default());
        let err = detector.detect(&constant_pcm(0, 2048), None).unwrap_err();
        assert!(matches!(err, EngineError::InputFormat(_)));
    }

    #[test]
    fn leading_silence_is_zero() {
        let mut samples = vec![0_i16; 8192];
        samples.extend(sine_pcm(220.0, 44100, 0.5).samples());
        let pcm = PcmBuffer::new(samples, 44100).unwrap();

        let detector = PitchDetector::new(PitchDetectorConfig::default());
        let track = detector.detect(&pcm, None).unwrap();
        assert!(track.pitches[..6].iter().all(|&p| p == 0.0));
        assert!(track.pitches.iter().any(|&p| p > 0.0));
    }

    #[test]
    fn parallel_detection_preserves_order() {
        let layout = FrameLayout {
            chunk_size: 2048,
            step_size: 1024,
        };
        // Segment k of one step holds the constant 100 + 10k
        let samples: Vec<i16> = (0..40)
            .flat_map(|k| std::iter::repeat(100 + 10 * k as i16).take(layout.step_size))
            .collect();
        let pcm = PcmBuffer::new(samples, 44100).unwrap();

        let detector = PitchDetector::with_estimator(PitchDetectorConfig::default(), FirstSample);
        let track = detector.detect(&pcm, None).unwrap();

        assert_eq!(track.pitches.len(), layout.chunk_count(pcm.len()));
        for (k, &p) in track.pitches.iter().enumerate() {
            assert_eq!(p, 100.0 + 10.0 * k as f64, "Chunk {k} out of order");
        }
    }

    #[test]
    fn sounding_chunk_without_pitch_uses_default() {
        let detector = PitchDetector::with_estimator(PitchDetectorConfig::default(), NeverPitched);
        let track = detector.detect(&constant_pcm(1000, 8192), None).unwrap();
        assert!(track.pitches.iter().all(|&p| p == 190.0));
    }

    #[test]
    fn sounding_chunk_without_pitch_borrows_reference() {
        let detector = PitchDetector::with_estimator(PitchDetectorConfig::default(), NeverPitched);
        let reference = vec![220.0; 20];
        let track = detector.detect(&constant_pcm(1000, 8192), Some(reference.as_slice())).unwrap();
        assert!(track.pitches.iter().all(|&p| p == 220.0));
    }

    #[test]
    fn estimator_failure_degrades_to_zero() {
        let detector = PitchDetector::with_estimator(PitchDetectorConfig::default(), AlwaysFails);
        let track = detector.detect(&constant_pcm(1000, 8192), None).unwrap();
        assert!(!track.pitches.is_empty());
        assert!(track.pitches.iter().all(|&p| p == 0.0));
    }

    #[test]
    fn cancelled_token_aborts() {
        let detector = PitchDetector::new(PitchDetectorConfig::default());
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = detector
            .detect_with_cancel(&sine_pcm(220.0, 44100, 0.5), None, &cancel)
            .unwrap_err();
        assert_eq!(err, EngineError::Cancelled);
    }

    #[test]
    fn chunk_size_follows_reference_register() {
        let detector = PitchDetector::new(PitchDetectorConfig::default());
        let size = |r: &[f64]| detector.frame_layout(Some(r)).chunk_size;
        assert_eq!(size(&[100.0; 4]), 2048);
        assert_eq!(size(&[140.0; 4]), 1536);
        assert_eq!(size(&[220.0; 4]), 1024);
        assert_eq!(size(&[500.0; 4]), 512);
        assert_eq!(size(&[0.0; 4]), 2048);
        assert_eq!(detector.frame_layout(None).chunk_size, 2048);
    }

    #[test]
    fn reference_lookup_searches_outward() {
        let detector = PitchDetector::new(PitchDetectorConfig::default());
        let reference = [0.0, 0.0, 0.0, 330.0, 0.0];
        assert_eq!(detector.reference_at(&reference, 0, 5), Some(330.0));
        assert_eq!(detector.reference_at(&[0.0; 30], 0, 5), None);
    }

    #[test]
    fn reference_lookup_interpolates() {
        let detector = PitchDetector::new(PitchDetectorConfig::default());
        // Chunk 1 of 4 lands halfway between samples 0 and 1
        let reference = [200.0, 300.0];
        let p = detector.reference_at(&reference, 1, 4).unwrap();
        assert!((p - 250.0).abs() < 1e-9);
    }

    #[test]
    fn every_sample_is_finite_and_non_negative() {
        let detector = PitchDetector::new(PitchDetectorConfig::default());
        let track = detector
            .detect(&sine_pcm(330.0, 22050, 0.5), Some(&[330.0, 0.0, 335.0][..]))
            .unwrap();
        assert!(track.pitches.iter().all(|p| p.is_finite() && *p >= 0.0));
    }

    /// Always reports `hz` as a confident, pitched estimate.
    struct Fixed(f64);

    impl RawPitchEstimator for Fixed {
        fn estimate(&self, _: &[i16], _: u32) -> Result<RawEstimate, EstimateError> {
            Ok(RawEstimate {
                pitch_hz: self.0,
                pitched: true,
                probability: 0.9,
            })
        }
    }

    fn voiced_mean(track: &PitchTrack) -> f64 {
        let voiced: Vec<f64> = track.pitches.iter().copied().filter(|&p| p > 0.0).collect();
        assert!(voiced.len() > track.pitches.len() / 2, "Too few voiced frames");
        crate::util::mean(&voiced)
    }

    #[test]
    fn detects_sines_at_every_register_chunk_size() {
        let detector = PitchDetector::new(PitchDetectorConfig::default());
        for (freq, chunk) in [(150.0, 1536), (220.0, 1024), (330.0, 512), (500.0, 512)] {
            let reference = vec![freq; 20];
            assert_eq!(detector.frame_layout(Some(reference.as_slice())).chunk_size, chunk);

            let track = detector
                .detect(&sine_pcm(freq, 44100, 1.0), Some(reference.as_slice()))
                .unwrap();
            let mean = voiced_mean(&track);
            assert!(
                (mean - freq).abs() < freq * 0.02,
                "{freq} Hz at chunk {chunk}: mean {mean:.1} Hz"
            );
        }
    }

    #[test]
    fn confident_harmonics_override_an_octave_high_estimate() {
        let detector = PitchDetector::with_estimator(PitchDetectorConfig::default(), Fixed(440.0));
        let track = detector.detect(&sine_pcm(220.0, 44100, 0.5), None).unwrap();
        assert!(track
            .pitches
            .iter()
            .all(|&p| (p - 220.0).abs() < 4.0), "{:?}", track.pitches);
    }

    #[test]
    fn range_fold_strategy_only_folds_into_range() {
        let config = PitchDetectorConfig {
            octave_strategy: OctaveStrategy::RangeFold,
            // Keep the harmonics fundamental out of it
            harmonics_override_confidence: 2.0,
            ..PitchDetectorConfig::default()
        };
        let detector = PitchDetector::with_estimator(config, Fixed(1760.0));
        let track = detector.detect(&sine_pcm(220.0, 44100, 0.5), None).unwrap();
        assert!(track.pitches.iter().all(|&p| p == 880.0), "{:?}", track.pitches);
    }

    #[test]
    fn reference_detection_uses_its_own_register() {
        let detector = PitchDetector::new(PitchDetectorConfig::default());
        let reference = detector
            .detect_reference(&sine_pcm(220.0, 44100, 1.0), &CancelToken::new())
            .unwrap();
        assert_eq!(reference.layout.chunk_size, 1024);
        assert_eq!(reference.layout.step_size, 512);
    }

    #[test]
    fn recording_shares_the_reference_time_base() {
        let detector = PitchDetector::new(PitchDetectorConfig::default());
        let reference = detector
            .detect_reference(&sine_pcm(220.0, 44100, 1.0), &CancelToken::new())
            .unwrap();

        let recording = detector
            .detect_against(&sine_pcm(220.0, 22050, 1.0), &reference, &CancelToken::new())
            .unwrap();
        assert_eq!(recording.layout.chunk_size, 512);
        assert_eq!(recording.layout.step_size, 256);
        assert!((recording.frame_duration_secs() - reference.frame_duration_secs()).abs() < 1e-12);
    }

    #[test]
    fn layout_rescales_with_sample_rate() {
        let layout = FrameLayout {
            chunk_size: 1024,
            step_size: 512,
        };
        assert_eq!(layout.for_sample_rate(44100, 44100), layout);
        assert_eq!(
            layout.for_sample_rate(44100, 88200),
            FrameLayout {
                chunk_size: 2048,
                step_size: 1024
            }
        );
    }
}
