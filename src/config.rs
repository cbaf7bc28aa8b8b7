use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::analysis::alignment::SequenceAligner;
use crate::analysis::analyzer::ComparisonPipeline;
use crate::analysis::pitch_accuracy::PitchAccuracyAnalyzer;
use crate::analysis::result::ScoringMode;
use crate::analysis::scoring::ScoringEngine;
use crate::dsp::estimator::{McLeodEstimator, RawPitchEstimator, ScaleQuirkShim};
use crate::dsp::octave::OctaveStrategy;
use crate::dsp::pitch::{PitchDetector, PitchDetectorConfig};
use crate::dsp::smoothing::PitchSequenceSmoother;
use crate::paths;

/// Application configuration, loaded from config.toml.
///
/// Every section uses `#[serde(default)]`, so a partial file only overrides
/// the fields it names and a missing file means factory settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub detection: DetectionConfig,
    pub scoring: ScoringConfig,
    pub alignment: AlignmentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub min_pitch_hz: f64,
    pub max_pitch_hz: f64,
    /// Mean absolute 16-bit amplitude below which a chunk is silent
    pub silence_threshold: f64,
    pub overlap_ratio: f64,
    pub default_chunk_size: usize,
    /// Emitted for sounding but unpitched chunks when there is no reference
    pub fallback_pitch_hz: f64,
    pub octave_strategy: OctaveStrategy,
    /// Divide raw estimates above 5 kHz by 338. Only for the detector
    /// that has that scaling bug.
    pub legacy_scale_correction: bool,
    /// McLeod power threshold for a confident pitch
    pub power_threshold: f64,
    /// McLeod clarity threshold for a confident pitch
    pub clarity_threshold: f64,
    /// Smoother window applied before alignment; 1 disables smoothing
    pub smoothing_window: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub mode: ScoringMode,
    /// Aligned pairs within this many cents count as in tune
    pub pitch_tolerance_cents: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentConfig {
    /// Sakoe-Chiba band radius in recorded frames. Unset means unbounded DTW.
    pub band: Option<usize>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        let pitch = PitchDetectorConfig::default();
        let mcleod = McLeodEstimator::default();
        Self {
            min_pitch_hz: pitch.min_pitch_hz,
            max_pitch_hz: pitch.max_pitch_hz,
            silence_threshold: pitch.silence_threshold,
            overlap_ratio: pitch.overlap_ratio,
            default_chunk_size: pitch.default_chunk_size,
            fallback_pitch_hz: pitch.fallback_pitch_hz,
            octave_strategy: pitch.octave_strategy,
            legacy_scale_correction: false,
            power_threshold: mcleod.power_threshold,
            clarity_threshold: mcleod.clarity_threshold,
            smoothing_window: 5,
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            mode: ScoringMode::Standard,
            pitch_tolerance_cents: 50.0,
        }
    }
}

/// Bridge between the user-facing config and the detector parameters.
impl From<&DetectionConfig> for PitchDetectorConfig {
    fn from(cfg: &DetectionConfig) -> Self {
        PitchDetectorConfig {
            min_pitch_hz: cfg.min_pitch_hz,
            max_pitch_hz: cfg.max_pitch_hz,
            silence_threshold: cfg.silence_threshold,
            overlap_ratio: cfg.overlap_ratio,
            default_chunk_size: cfg.default_chunk_size,
            fallback_pitch_hz: cfg.fallback_pitch_hz,
            octave_strategy: cfg.octave_strategy,
            ..PitchDetectorConfig::default()
        }
    }
}

impl DetectionConfig {
    /// The McLeod estimator, wrapped in the scale shim when requested.
    pub fn estimator(&self) -> Box<dyn RawPitchEstimator> {
        let mcleod = McLeodEstimator::new(self.power_threshold, self.clarity_threshold);
        if self.legacy_scale_correction {
            Box::new(ScaleQuirkShim::new(mcleod))
        } else {
            Box::new(mcleod)
        }
    }
}

impl AppConfig {
    pub fn detector(&self) -> PitchDetector<Box<dyn RawPitchEstimator>> {
        PitchDetector::with_estimator((&self.detection).into(), self.detection.estimator())
    }

    /// Comparison pipeline with `mode` overriding the configured one.
    pub fn pipeline(&self, mode: Option<ScoringMode>) -> ComparisonPipeline {
        ComparisonPipeline {
            smoother: PitchSequenceSmoother::new(
                self.detection.smoothing_window,
                self.detection.min_pitch_hz,
                self.detection.max_pitch_hz,
            ),
            aligner: SequenceAligner {
                band: self.alignment.band,
            },
            pitch_accuracy: PitchAccuracyAnalyzer::new(self.scoring.pitch_tolerance_cents),
            scoring: ScoringEngine::new(mode.unwrap_or(self.scoring.mode)),
            ..ComparisonPipeline::default()
        }
    }
}

/// Load config from `path`, or from $XDG_CONFIG_HOME/singscore/config.toml
/// when no path is given. A missing default file yields defaults; a
/// missing explicit file is an error.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let default_path = paths::config_file();
    let path = match path {
        Some(p) => p,
        None if !default_path.exists() => return Ok(AppConfig::default()),
        None => default_path.as_path(),
    };

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.detection.min_pitch_hz, 60.0);
        assert_eq!(cfg.detection.fallback_pitch_hz, 190.0);
        assert_eq!(cfg.scoring.mode, ScoringMode::Standard);
        assert!(cfg.alignment.band.is_none());
        assert!(!cfg.detection.legacy_scale_correction);
    }

    #[test]
    fn parse_partial_toml() {
        let toml_str = r#"
[detection]
max_pitch_hz = 1200.0
octave_strategy = "range_fold"

[scoring]
mode = "dtw_comparison"

[alignment]
band = 40
"#;
        let cfg: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.detection.max_pitch_hz, 1200.0);
        assert_eq!(cfg.detection.octave_strategy, OctaveStrategy::RangeFold);
        assert_eq!(cfg.scoring.mode, ScoringMode::DtwComparison);
        assert_eq!(cfg.alignment.band, Some(40));
        // Unspecified fields keep their defaults
        assert_eq!(cfg.detection.min_pitch_hz, 60.0);
        assert_eq!(cfg.scoring.pitch_tolerance_cents, 50.0);
    }

    #[test]
    fn detector_config_conversion() {
        let cfg = DetectionConfig {
            silence_threshold: 80.0,
            overlap_ratio: 0.75,
            ..DetectionConfig::default()
        };
        let pitch_cfg: PitchDetectorConfig = (&cfg).into();
        assert_eq!(pitch_cfg.silence_threshold, 80.0);
        assert_eq!(pitch_cfg.overlap_ratio, 0.75);
        assert_eq!(pitch_cfg.reference_search_radius, 10);
    }

    #[test]
    fn roundtrip_toml() {
        let cfg = AppConfig {
            alignment: AlignmentConfig { band: Some(12) },
            ..AppConfig::default()
        };
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let loaded: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(loaded.alignment.band, Some(12));
        assert_eq!(loaded.detection.smoothing_window, cfg.detection.smoothing_window);
    }

    #[test]
    fn pipeline_follows_config_and_override() {
        let mut cfg = AppConfig::default();
        cfg.scoring.mode = ScoringMode::DtwComparison;
        cfg.alignment.band = Some(8);

        let pipeline = cfg.pipeline(None);
        assert_eq!(pipeline.mode(), ScoringMode::DtwComparison);
        assert_eq!(pipeline.aligner.band, Some(8));

        let overridden = cfg.pipeline(Some(ScoringMode::Standard));
        assert_eq!(overridden.mode(), ScoringMode::Standard);
    }

    #[test]
    fn load_explicit_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[scoring]\npitch_tolerance_cents = 25.0\n").unwrap();
        let cfg = load_config(Some(&path)).unwrap();
        assert_eq!(cfg.scoring.pitch_tolerance_cents, 25.0);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        assert!(load_config(Some(&tmp.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[scoring]\nmode = \"loudest\"\n").unwrap();
        let err = load_config(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse"));
    }
}
