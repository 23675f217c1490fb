//! Audio side: the sample algebra and the audio-first pass.

pub mod build;
pub mod segment;
