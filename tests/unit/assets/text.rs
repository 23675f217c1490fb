use super::*;

#[test]
fn unpremultiply_restores_straight_color() {
    let mut px = vec![64, 32, 0, 128, 9, 9, 9, 0, 10, 20, 30, 255];
    unpremultiply_in_place(&mut px);
    assert_eq!(&px[0..4], &[128, 64, 0, 128]);
    assert_eq!(&px[4..8], &[0, 0, 0, 0]);
    assert_eq!(&px[8..12], &[10, 20, 30, 255]);
}

#[test]
fn missing_font_is_a_config_error() {
    let mut r = ParleyTextRasterizer::new(&EngineConfig::default());
    let err = r.rasterize("hello").unwrap_err();
    assert!(matches!(err, ThalaError::Config(_)), "{err}");
}

#[test]
fn unreadable_font_is_a_config_error() {
    let cfg = EngineConfig {
        font_path: Some(PathBuf::from("/nonexistent/thala/font.ttf")),
        ..EngineConfig::default()
    };
    let mut r = ParleyTextRasterizer::new(&cfg);
    let err = r.rasterize("hello").unwrap_err();
    assert!(matches!(err, ThalaError::Config(_)), "{err}");
}

fn system_font() -> Option<PathBuf> {
    [
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/Library/Fonts/Arial.ttf",
        "C:\\Windows\\Fonts\\arial.ttf",
    ]
    .into_iter()
    .map(PathBuf::from)
    .find(|p| p.exists())
}

#[test]
fn font_without_the_configured_face_is_a_config_error() {
    let dir = std::env::temp_dir().join(format!("thala_font_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let junk = dir.join("junk.ttf");
    std::fs::write(&junk, b"not a font").unwrap();

    let mut r = ParleyTextRasterizer::new(&EngineConfig {
        font_path: Some(junk),
        ..EngineConfig::default()
    });
    let err = r.rasterize("hello").unwrap_err();
    assert!(matches!(err, ThalaError::Config(_)), "{err}");

    let Some(font) = system_font() else {
        return;
    };
    let mut r = ParleyTextRasterizer::new(&EngineConfig {
        font_path: Some(font),
        font_index: 7,
        ..EngineConfig::default()
    });
    let err = r.rasterize("hello").unwrap_err();
    assert!(err.to_string().contains("no face with index 7"), "{err}");
}
