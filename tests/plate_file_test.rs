//! Reading a plate-measurement file from disk.

mod common;

use approx::assert_relative_eq;
use camino::Utf8Path;
use common::{assert_sky_close, MAS};
use skypix::{CalOrigin, Calibration, PixelPos, ProjectionType};

#[test]
fn plate_file_reads_like_a_stream() {
    let path = Utf8Path::new("tests/data/dss_linear.plate");
    let cal = Calibration::from_plate_file(path).unwrap();

    assert_eq!(cal.origin(), CalOrigin::PlateStream);
    assert_eq!(*cal.projection(), ProjectionType::Tan);
    assert_eq!(cal.image_size(), (1000, 1000));
    assert_eq!(cal.epoch(), Some(1954.123));

    // Plate center: 04h41m04.77s, +62°12'36".
    let crval = cal.reference_sky();
    assert_relative_eq!(crval.lon, 70.269875, epsilon = 1e-9);
    assert_relative_eq!(crval.lat, 62.21, epsilon = 1e-9);

    // The linear solution reduces to a TAN plate with the focal/pitch
    // scale.
    let (sx, sy) = cal.pixel_scale();
    let expected = (0.015_f64 / 1000.0).to_degrees();
    assert_relative_eq!(sx, expected, epsilon = 1e-12);
    assert_relative_eq!(sy, expected, epsilon = 1e-12);

    let p = cal.sky_to_pixel(crval).unwrap();
    assert_relative_eq!(p.x, 501.0, epsilon = 1e-9);
    assert_relative_eq!(p.y, 501.0, epsilon = 1e-9);

    for (x, y) in [(80.0, 920.0), (501.0, 501.0), (990.5, 10.25)] {
        let sky = cal.pixel_to_sky(PixelPos::new(x, y)).unwrap();
        let back = cal.sky_to_pixel(sky).unwrap();
        assert!(
            (back.x - x).abs() < 1e-7 && (back.y - y).abs() < 1e-7,
            "pixel residual ({}, {})",
            back.x - x,
            back.y - y
        );
    }

    // Consistency with the general TAN path: a plate model and an
    // explicit model with the same geometry agree away from the center.
    let explicit = skypix::Calibration::builder(ProjectionType::Tan, cal.system())
        .image_size(1000, 1000)
        .reference_pixel(501.0, 501.0)
        .reference_sky(crval.lon, crval.lat)
        .scale(-sx, sy)
        .build()
        .unwrap();
    let a = cal.pixel_to_sky(PixelPos::new(900.0, 900.0)).unwrap();
    let b = explicit.pixel_to_sky(PixelPos::new(900.0, 900.0)).unwrap();
    assert_sky_close(a, b, MAS);
}

#[test]
fn missing_plate_file_is_an_io_error() {
    let res = Calibration::from_plate_file(Utf8Path::new("tests/data/absent.plate"));
    assert!(matches!(res, Err(skypix::SkypixError::IoError(_))));
}
