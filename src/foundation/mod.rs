/// Engine configuration.
pub mod config;
/// Frame grid and extent primitives.
pub mod core;
/// Error taxonomy.
pub mod error;
/// Time and gain attribute parsing.
pub mod units;
