use approx::assert_relative_eq;
use skypix::{Calibration, ProjectionType, SkyPos, SkySystem};

/// One milliarcsecond, in degrees.
pub const MAS: f64 = 1.0 / 3_600_000.0;

/// Build a distortion-free calibration around a reference point.
pub fn make_cal(
    proj: ProjectionType,
    lon0: f64,
    lat0: f64,
    scale_arcsec: f64,
    rota: f64,
) -> Calibration {
    Calibration::builder(proj, SkySystem::Icrs)
        .image_size(2000, 2000)
        .reference_pixel(1000.5, 1000.5)
        .reference_sky(lon0, lat0)
        .scale(-scale_arcsec / 3600.0, scale_arcsec / 3600.0)
        .rotation(rota)
        .build()
        .unwrap()
}

/// Every projection convention the engine supports.
pub fn all_projections() -> Vec<ProjectionType> {
    vec![
        ProjectionType::Sin,
        ProjectionType::Tan,
        ProjectionType::Arc,
        ProjectionType::Ait,
        ProjectionType::Zea,
        ProjectionType::Stg,
        ProjectionType::Car,
        ProjectionType::Ncp,
        ProjectionType::Zpn {
            coeffs: [0.0, 1.0, 0.0, 0.02].into_iter().collect(),
        },
        ProjectionType::Sol,
        ProjectionType::Mol,
        ProjectionType::Sip,
        ProjectionType::Fie,
        ProjectionType::Tpv,
        ProjectionType::SinSip,
        ProjectionType::Gls,
    ]
}

pub fn assert_sky_close(actual: SkyPos, expected: SkyPos, tolerance_deg: f64) {
    assert_relative_eq!(
        actual.separation(&expected),
        0.0,
        epsilon = tolerance_deg
    );
}
