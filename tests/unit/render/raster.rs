use super::*;

#[test]
fn blank_is_transparent_rgba() {
    let r = Raster::blank(3, 2);
    assert_eq!(r.channels(), Channels::Rgba);
    assert_eq!(r.data().len(), 3 * 2 * 4);
    assert!(r.data().iter().all(|&b| b == 0));
}

#[test]
fn from_raw_validates_length() {
    assert!(Raster::from_raw(2, 2, Channels::Rgb, vec![0; 12]).is_ok());
    assert!(matches!(
        Raster::from_raw(2, 2, Channels::Rgba, vec![0; 12]),
        Err(ThalaError::UpstreamService(_))
    ));
}

#[test]
fn crop_extracts_subrectangle_and_clips() {
    let mut data = Vec::new();
    for y in 0..3u8 {
        for x in 0..4u8 {
            data.extend_from_slice(&[x, y, 0]);
        }
    }
    let r = Raster::from_raw(4, 3, Channels::Rgb, data).unwrap();

    let c = r.crop(1, 1, 3, 3);
    assert_eq!((c.width(), c.height()), (2, 2));
    assert_eq!(c.pixel(0, 0), Some([1, 1, 0, 255]));
    assert_eq!(c.pixel(1, 1), Some([2, 2, 0, 255]));

    let clipped = r.crop(2, 0, 10, 10);
    assert_eq!((clipped.width(), clipped.height()), (2, 3));
}

#[test]
fn resize_keeps_solid_color_and_channels() {
    let r = Raster::filled(4, 4, Channels::Rgba, &[10, 20, 30, 255]).unwrap();
    let s = r.resize(2, 6);
    assert_eq!((s.width(), s.height()), (2, 6));
    assert_eq!(s.channels(), Channels::Rgba);
    for y in 0..6 {
        for x in 0..2 {
            assert_eq!(s.pixel(x, y), Some([10, 20, 30, 255]));
        }
    }
}

#[test]
fn resize_to_same_size_is_identity() {
    let r = Raster::filled(3, 3, Channels::Rgb, &[1, 2, 3]).unwrap();
    assert_eq!(r.resize(3, 3), r);
}

#[test]
fn rgb24_conversion_drops_alpha() {
    let r = Raster::filled(1, 2, Channels::Rgba, &[5, 6, 7, 0]).unwrap();
    assert_eq!(r.to_rgb24(), vec![5, 6, 7, 5, 6, 7]);
    let o = Raster::filled(1, 1, Channels::Rgb, &[5, 6, 7]).unwrap();
    assert_eq!(o.to_rgba8(), vec![5, 6, 7, 255]);
}
