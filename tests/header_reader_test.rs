//! Header ingestion scenarios: the matrix fallback chain, the legacy
//! projection/system heuristics, and the emission round trip.

mod common;

use approx::assert_relative_eq;
use common::{assert_sky_close, MAS};
use skypix::{
    Calibration, CardValue, HeaderMap, PixelPos, ProjectionType, SkyPos, SkySystem, SkypixError,
};

fn base_header(ctype: &str) -> HeaderMap {
    let mut map = HeaderMap::new();
    map.set_i64("NAXIS1", 2048)
        .set_i64("NAXIS2", 2048)
        .set_str("CTYPE1", format!("RA---{ctype}"))
        .set_str("CTYPE2", format!("DEC--{ctype}"))
        .set_f64("CRPIX1", 1024.5)
        .set_f64("CRPIX2", 1024.5)
        .set_f64("CRVAL1", 202.47)
        .set_f64("CRVAL2", 47.19);
    map
}

#[test]
fn explicit_cd_matrix_copied_verbatim() {
    let mut map = base_header("TAN");
    map.set_f64("CD1_1", -1.1e-4)
        .set_f64("CD1_2", 3.0e-6)
        .set_f64("CD2_1", 3.1e-6)
        .set_f64("CD2_2", 1.1e-4);
    let cal = Calibration::from_header(&map).unwrap();

    assert_eq!(*cal.projection(), ProjectionType::Tan);
    assert_eq!(cal.system(), SkySystem::Icrs);
    let cd = cal.cd_matrix();
    assert_eq!(cd[(0, 0)], -1.1e-4);
    assert_eq!(cd[(0, 1)], 3.0e-6);
    assert_eq!(cd[(1, 0)], 3.1e-6);
    assert_eq!(cd[(1, 1)], 1.1e-4);
}

#[test]
fn cdelt_crota_derives_rotation_composed_matrix() {
    let mut map = base_header("TAN");
    map.set_f64("CDELT1", -5.0e-4)
        .set_f64("CDELT2", 5.0e-4)
        .set_f64("CROTA2", 45.0);
    let cal = Calibration::from_header(&map).unwrap();

    let (sin_r, cos_r) = 45.0_f64.to_radians().sin_cos();
    let cd = cal.cd_matrix();
    assert_relative_eq!(cd[(0, 0)], -5.0e-4 * cos_r, epsilon = 1e-19);
    assert_relative_eq!(cd[(0, 1)], -5.0e-4 * sin_r, epsilon = 1e-19);
    assert_relative_eq!(cd[(1, 0)], -5.0e-4 * sin_r, epsilon = 1e-19);
    assert_relative_eq!(cd[(1, 1)], 5.0e-4 * cos_r, epsilon = 1e-19);
    assert_relative_eq!(cal.rotation(), 45.0, epsilon = 1e-10);
}

#[test]
fn crota1_accepted_when_crota2_missing() {
    let mut map = base_header("TAN");
    map.set_f64("CDELT1", -5.0e-4)
        .set_f64("CDELT2", 5.0e-4)
        .set_f64("CROTA1", -30.0);
    let cal = Calibration::from_header(&map).unwrap();
    assert_relative_eq!(cal.rotation(), -30.0, epsilon = 1e-10);
}

#[test]
fn dss_plate_sign_patch_forces_east_left() {
    let mut map = base_header("TAN");
    map.set_f64("CDELT1", 4.7e-4)
        .set_f64("CDELT2", 4.7e-4)
        .set_str("PLTLABEL", "E1234")
        .set_str("ORIGIN", "STScI-DSS");
    let cal = Calibration::from_header(&map).unwrap();
    assert!(cal.cd_matrix()[(0, 0)] < 0.0);
    assert!(cal.cd_matrix()[(1, 1)] > 0.0);
}

#[test]
fn tnx_marker_reads_as_tan() {
    let map = base_header("TNX");
    let cal = Calibration::from_header(&map).unwrap();
    assert_eq!(*cal.projection(), ProjectionType::Tan);
}

#[test]
fn unsupported_projection_is_fatal_and_named() {
    let map = base_header("COE");
    match Calibration::from_header(&map) {
        Err(SkypixError::UnsupportedProjection(s)) => assert!(s.contains("COE")),
        other => panic!("expected UnsupportedProjection, got {other:?}"),
    }
}

#[test]
fn missing_reference_pixel_is_fatal() {
    let mut map = HeaderMap::new();
    map.set_i64("NAXIS1", 100)
        .set_i64("NAXIS2", 100)
        .set_str("CTYPE1", "RA---TAN");
    assert!(matches!(
        Calibration::from_header(&map),
        Err(SkypixError::MissingCard(_))
    ));
}

#[test]
fn equinox_rule_resolves_system() {
    let mut map = base_header("TAN");
    map.set_f64("CDELT1", -1e-3).set_f64("CDELT2", 1e-3);
    map.set_f64("EQUINOX", 1950.0);
    assert_eq!(
        Calibration::from_header(&map).unwrap().system(),
        SkySystem::Fk4
    );

    map.set_f64("EQUINOX", 2000.0);
    assert_eq!(
        Calibration::from_header(&map).unwrap().system(),
        SkySystem::Fk5
    );
}

#[test]
fn emission_roundtrip_preserves_the_transform() {
    let mut map = base_header("STG");
    map.set_f64("CD1_1", -2.4e-4)
        .set_f64("CD1_2", 1.3e-5)
        .set_f64("CD2_1", 1.2e-5)
        .set_f64("CD2_2", 2.4e-4)
        .set_f64("EQUINOX", 2000.0)
        .set_f64("EPOCH", 1993.6);
    let cal = Calibration::from_header(&map).unwrap();

    let out = cal.to_header();
    assert_eq!(
        out.get("CTYPE1"),
        Some(&CardValue::Str("RA---STG".to_string()))
    );
    assert_eq!(out.get("EPOCH"), Some(&CardValue::Real(1993.6)));

    let rebuilt = Calibration::from_header(&out).unwrap();
    assert_eq!(rebuilt.system(), cal.system());
    assert_eq!(rebuilt.epoch(), cal.epoch());
    for (x, y) in [(33.0, 40.0), (1500.5, 998.25), (2000.0, 6.0)] {
        let a = cal.pixel_to_sky(PixelPos::new(x, y)).unwrap();
        let b = rebuilt.pixel_to_sky(PixelPos::new(x, y)).unwrap();
        assert_sky_close(a, b, MAS / 1000.0);
    }
}

#[test]
fn galactic_header_roundtrip() {
    let mut map = HeaderMap::new();
    map.set_i64("NAXIS1", 720)
        .set_i64("NAXIS2", 360)
        .set_str("CTYPE1", "GLON-CAR")
        .set_str("CTYPE2", "GLAT-CAR")
        .set_f64("CRPIX1", 360.5)
        .set_f64("CRPIX2", 180.5)
        .set_f64("CRVAL1", 0.0)
        .set_f64("CRVAL2", 0.0)
        .set_f64("CDELT1", -0.5)
        .set_f64("CDELT2", 0.5);
    let cal = Calibration::from_header(&map).unwrap();
    assert_eq!(cal.system(), SkySystem::Galactic);

    let out = cal.to_header();
    assert_eq!(
        out.get("CTYPE1"),
        Some(&CardValue::Str("GLON-CAR".to_string()))
    );

    // The galactic center sits at the reference pixel.
    let p = cal.sky_to_pixel(SkyPos::new(0.0, 0.0)).unwrap();
    assert_relative_eq!(p.x, 360.5, epsilon = 1e-9);
    assert_relative_eq!(p.y, 180.5, epsilon = 1e-9);
}

#[test]
fn plate_origin_emits_synthesized_cd() {
    let record = plate_record();
    let cal = Calibration::from_plate_stream(record.as_bytes()).unwrap();
    let out = cal.to_header();

    // CD synthesized from focal length and pixel pitch: 15 µm on 1 m.
    let expected = (0.015_f64 / 1000.0).to_degrees();
    match out.get("CD1_1") {
        Some(CardValue::Real(v)) => assert_relative_eq!(*v, -expected, epsilon = 1e-12),
        other => panic!("CD1_1 missing or mistyped: {other:?}"),
    }
    match out.get("CD2_2") {
        Some(CardValue::Real(v)) => assert_relative_eq!(*v, expected, epsilon = 1e-12),
        other => panic!("CD2_2 missing or mistyped: {other:?}"),
    }
}

/// Same minimal linear record as the unit tests: 1 m focal length, 15 µm
/// pixels.
fn plate_record() -> String {
    let mut fields: Vec<String> = vec!["1954.123".into(), "1000.0".into()];
    fields.extend(["04", "41", "04.77"].map(String::from));
    fields.extend(["+", "62", "12", "36.0"].map(String::from));
    fields.extend(["0.0", "0.0"].map(String::from));
    fields.extend(vec!["0.0".to_string(); 6]);
    let mut fwd = vec![0.0; 20];
    fwd[2] = 1.0;
    fwd[5] = 1.0;
    fields.extend(fwd.iter().map(|v| v.to_string()));
    let mut inv = vec![0.0; 24];
    inv[2] = 1.0;
    inv[5] = 1.0;
    fields.extend(inv.iter().map(|v| v.to_string()));
    fields.extend(["15.0", "15.0"].map(String::from));
    fields.extend(["-7500.0", "-7500.0"].map(String::from));
    fields.extend(["501.0", "501.0", "51.5", "51.5"].map(String::from));
    fields.extend(["1000", "1000"].map(String::from));
    fields.join(" ")
}
