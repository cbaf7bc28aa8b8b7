use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::analysis::result::{ComprehensiveResult, ScoringMode};
use crate::util::is_voiced;

/// Count, voiced rate and range of a pitch sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceStatistics {
    pub count: usize,
    pub valid_count: usize,
    /// `valid_count / count`, 0.0 for an empty sequence.
    pub valid_rate: f64,
    pub min_hz: f64,
    pub max_hz: f64,
    pub avg_hz: f64,
}

impl SequenceStatistics {
    /// Min/max/avg cover voiced samples only and are 0.0 when there are none.
    pub fn from_sequence(pitches: &[f64]) -> Self {
        let voiced: Vec<f64> = pitches.iter().copied().filter(|&p| is_voiced(p)).collect();
        let count = pitches.len();
        let valid_count = voiced.len();

        let (min_hz, max_hz, avg_hz) = if voiced.is_empty() {
            (0.0, 0.0, 0.0)
        } else {
            (
                voiced.iter().copied().fold(f64::INFINITY, f64::min),
                voiced.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                voiced.iter().sum::<f64>() / valid_count as f64,
            )
        };

        Self {
            count,
            valid_count,
            valid_rate: if count == 0 {
                0.0
            } else {
                valid_count as f64 / count as f64
            },
            min_hz,
            max_hz,
            avg_hz,
        }
    }
}

/// Serializable snapshot of one comparison plus input statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSnapshot {
    pub generated_by: String,
    /// RFC 3339 local time.
    pub generated_at: String,
    pub mode: ScoringMode,
    pub reference_stats: SequenceStatistics,
    pub recorded_stats: SequenceStatistics,
    pub result: ComprehensiveResult,
}

impl ExportSnapshot {
    pub fn new(result: &ComprehensiveResult, reference: &[f64], recorded: &[f64]) -> Self {
        Self {
            generated_by: format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            generated_at: chrono::Local::now().to_rfc3339(),
            mode: result.mode,
            reference_stats: SequenceStatistics::from_sequence(reference),
            recorded_stats: SequenceStatistics::from_sequence(recorded),
            result: result.clone(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize export snapshot")
    }

    /// Write the snapshot as pretty JSON, creating parent directories.
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        std::fs::write(path, self.to_json()?)
            .with_context(|| format!("Failed to write export: {}", path.display()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read export: {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse export: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyzer::ComparisonPipeline;
    use tempfile::TempDir;

    #[test]
    fn statistics_ignore_silence() {
        let stats = SequenceStatistics::from_sequence(&[0.0, 220.0, 440.0, 0.0]);
        assert_eq!(stats.count, 4);
        assert_eq!(stats.valid_count, 2);
        assert_eq!(stats.valid_rate, 0.5);
        assert_eq!((stats.min_hz, stats.max_hz, stats.avg_hz), (220.0, 440.0, 330.0));
    }

    #[test]
    fn statistics_of_empty_sequence_are_zero() {
        let stats = SequenceStatistics::from_sequence(&[]);
        assert_eq!(stats.valid_rate, 0.0);
        assert_eq!(stats.avg_hz, 0.0);
    }

    #[test]
    fn snapshot_written_and_reloaded() {
        let reference = [440.0, 493.88, 523.25];
        let result = ComparisonPipeline::default().compare(&reference, &reference, 0.02);
        let snapshot = ExportSnapshot::new(&result, &reference, &reference);

        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("exports/run.json");
        snapshot.write(&path).unwrap();

        let loaded = ExportSnapshot::load(&path).unwrap();
        assert_eq!(loaded, snapshot);
        assert!(loaded.generated_by.starts_with("singscore"));
        assert_eq!(loaded.reference_stats.valid_count, 3);
    }

    #[test]
    fn floats_reload_bit_for_bit() {
        // The mean of these three is not exactly representable
        let reference = [440.0, 493.88, 523.25];
        let result = ComparisonPipeline::default().compare(&reference, &reference, 0.02);
        let snapshot = ExportSnapshot::new(&result, &reference, &reference);

        let json = snapshot.to_json().unwrap();
        let loaded: ExportSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(
            loaded.reference_stats.avg_hz.to_bits(),
            snapshot.reference_stats.avg_hz.to_bits()
        );
    }

    #[test]
    fn grade_is_exported_as_label() {
        let result = ComparisonPipeline::default().compare(&[330.0; 4], &[330.0; 4], 0.02);
        let json = ExportSnapshot::new(&result, &[330.0; 4], &[330.0; 4]).to_json().unwrap();
        assert!(json.contains("\"grade\": \"S\""), "{json}");
    }
}
