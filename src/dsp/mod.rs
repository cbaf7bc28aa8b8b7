pub mod estimator;
pub mod harmonics;
pub mod octave;
pub mod pitch;
pub mod smoothing;
pub mod volume;
pub mod windowing;
