//! Audio-to-motion-channel engine: feature extraction over a master mix and
//! its stems, per-channel refinement, and display-state resolution.

pub mod audio;
pub mod channels;
pub mod config;
pub mod error;
pub mod export;
pub mod refine;
pub mod templates;

pub use error::MotionError;
