use super::*;

#[test]
fn fps_rejects_zero_parts() {
    assert!(matches!(
        Fps::new(0, 1),
        Err(ThalaError::ParameterRange(_))
    ));
    assert!(matches!(
        Fps::new(30, 0),
        Err(ThalaError::ParameterRange(_))
    ));
}

#[test]
fn frames_covering_is_half_open() {
    let fps = Fps::new(16, 1).unwrap();
    assert_eq!(fps.frames_covering(1.0), 16);
    assert_eq!(fps.frames_covering(1.01), 17);
    assert_eq!(fps.frames_covering(0.0), 0);
    assert_eq!(fps.frames_covering(-3.0), 0);
    assert_eq!(fps.frames_covering(f64::INFINITY), 0);
}

#[test]
fn rational_fps_frame_time() {
    let fps = Fps::new(30000, 1001).unwrap();
    assert!((fps.frames_to_secs(30) - 1.001).abs() < 1e-9);
}

#[test]
fn extent_max_is_elementwise() {
    let a = Extent::new(10, 50, 2.0);
    let b = Extent::new(30, 20, 1.5);
    assert_eq!(a.max(b), Extent::new(30, 50, 2.0));
}
