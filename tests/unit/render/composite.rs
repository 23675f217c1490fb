use super::*;

#[test]
fn opaque_source_overwrites_and_forces_alpha() {
    let mut dst = Raster::blank(3, 3);
    let src = Raster::filled(2, 2, Channels::Rgb, &[9, 8, 7]).unwrap();
    alpha_blend(&mut dst, &src, 1, 1);
    assert_eq!(dst.pixel(0, 0), Some([0, 0, 0, 0]));
    assert_eq!(dst.pixel(1, 1), Some([9, 8, 7, 255]));
    assert_eq!(dst.pixel(2, 2), Some([9, 8, 7, 255]));
    assert_eq!(dst.pixel(0, 2), Some([0, 0, 0, 0]));
}

#[test]
fn opaque_source_onto_rgb_destination_keeps_three_channels() {
    let mut dst = Raster::filled(2, 1, Channels::Rgb, &[1, 1, 1]).unwrap();
    let src = Raster::filled(1, 1, Channels::Rgb, &[200, 100, 50]).unwrap();
    alpha_blend(&mut dst, &src, 1, 0);
    assert_eq!(dst.channels(), Channels::Rgb);
    assert_eq!(dst.data(), &[1, 1, 1, 200, 100, 50]);
}

#[test]
fn transparent_source_is_noop() {
    let mut dst = Raster::filled(2, 2, Channels::Rgba, &[10, 20, 30, 40]).unwrap();
    let before = dst.clone();
    let src = Raster::filled(2, 2, Channels::Rgba, &[255, 255, 255, 0]).unwrap();
    alpha_blend(&mut dst, &src, 0, 0);
    assert_eq!(dst, before);
}

#[test]
fn half_alpha_blends_color_and_accumulates_alpha() {
    let mut dst = Raster::filled(1, 1, Channels::Rgba, &[0, 0, 0, 0]).unwrap();
    let src = Raster::filled(1, 1, Channels::Rgba, &[200, 100, 0, 51]).unwrap();
    alpha_blend(&mut dst, &src, 0, 0);
    // mask = 0.2
    assert_eq!(dst.pixel(0, 0), Some([40, 20, 0, 51]));

    alpha_blend(&mut dst, &src, 0, 0);
    let px = dst.pixel(0, 0).unwrap();
    // 1 - 0.8 * 0.8 = 0.36
    assert!((i32::from(px[3]) - 91).abs() <= 1);
}

#[test]
fn offsets_outside_destination_are_clipped() {
    let mut dst = Raster::blank(2, 2);
    let src = Raster::filled(4, 4, Channels::Rgb, &[1, 2, 3]).unwrap();
    alpha_blend(&mut dst, &src, 5, 0);
    assert!(dst.data().iter().all(|&b| b == 0));
    alpha_blend(&mut dst, &src, 1, 1);
    assert_eq!(dst.pixel(1, 1), Some([1, 2, 3, 255]));
    assert_eq!(dst.pixel(0, 1), Some([0, 0, 0, 0]));
}
