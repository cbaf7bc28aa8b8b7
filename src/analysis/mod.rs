pub mod alignment;
pub mod analyzer;
pub mod pitch_accuracy;
pub mod result;
pub mod scoring;
pub mod stability;
pub mod timing;
pub mod vibrato;
