//! External collaborators: decoding, text drawing and speech synthesis.

use std::path::{Path, PathBuf};

/// Video, audio and still decoding.
pub mod media;
/// Text-to-speech backends.
pub mod speech;
/// Text rasterization.
pub mod text;

/// Resolve a scene `src` against the assets root; absolute paths pass through.
pub fn resolve_source(root: &Path, src: &Path) -> PathBuf {
    if src.is_absolute() {
        src.to_path_buf()
    } else {
        root.join(src)
    }
}
