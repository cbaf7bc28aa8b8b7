//! Singing pitch analysis and scoring.
//!
//! The engine turns mono 16-bit PCM into a pitch sequence
//! ([`dsp::pitch::PitchDetector`]), aligns it against a reference melody with
//! DTW and scores intonation, stability and timing
//! ([`analysis::analyzer::ComparisonPipeline`]). Everything runs in process
//! and owns its buffers per call, so results can be shared across threads.

pub mod analysis;
pub mod audio;
pub mod cancel;
pub mod config;
pub mod dsp;
pub mod error;
pub mod paths;
pub mod report;
pub mod util;

pub use analysis::analyzer::{
    analyze_against_track, analyze_performance, ComparisonPipeline, PerformanceAnalysis,
};
pub use analysis::result::{ComprehensiveResult, Grade, ScoreBreakdown, ScoringMode};
pub use audio::pcm::PcmBuffer;
pub use cancel::CancelToken;
pub use dsp::pitch::{PitchDetector, PitchDetectorConfig, PitchTrack};
pub use error::{EngineError, EngineResult};
