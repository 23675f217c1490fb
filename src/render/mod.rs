//! Video side: pixel buffers, the compositor, raster nodes and frame rendering.

/// Video pass over the scene tree.
pub mod build;
/// Alpha compositing primitive.
pub mod composite;
/// Raster node variants.
pub mod node;
/// Engine and range rendering.
pub mod pipeline;
/// Pixel buffers.
pub mod raster;
