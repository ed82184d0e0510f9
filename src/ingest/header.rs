//! # Header ingestion and emission
//!
//! [`from_header`](Calibration::from_header) builds a calibration from any
//! [`HeaderProvider`], typically a FITS-style keyword map, resolving the
//! linear matrix through the historical fallback chain and the projection
//! through the legacy matching rules of `ingest::compat`.
//! [`to_header`](Calibration::to_header) writes the model back out, always
//! in CD-matrix form.
//!
//! ## Matrix fallback chain
//!
//! 1. explicit `CD1_1 … CD2_2`;
//! 2. `CDELT1/CDELT2` with a rotation angle (`CROTA2`, falling back to
//!    `CROTA1`);
//! 3. a PC matrix under either historical spelling (`PC1_1` or
//!    `PC001001`), scaled by CDELT when present;
//! 4. the axis-aligned homothety from CDELT alone (unity steps when even
//!    CDELT is absent).
//!
//! The Digitized Sky Survey sign patch (see `compat`) applies inside
//! steps 2–4, where no explicit sign information exists.

use itertools::Itertools;

use crate::calibration::{CalOrigin, CalParts, Calibration};
use crate::constants::RADEG;
use crate::coord::SkyPos;
use crate::distortion::{Distortion, PlatePoly, PvPoly, SipPoly};
use crate::frames::SkySystem;
use crate::projection::ProjectionType;
use crate::skypix_errors::SkypixError;

use nalgebra::Matrix2;

use super::compat;

/// Typed keyword lookup over fixed-width header cards.
///
/// An absent key is `Ok(None)`; a present key of the wrong type is an
/// error. The two must never be conflated, since the matrix fallback
/// chain probes many optional keys.
pub trait HeaderProvider {
    fn get_str(&self, key: &str) -> Option<String>;
    fn get_f64(&self, key: &str) -> Result<Option<f64>, SkypixError>;
    fn get_i64(&self, key: &str) -> Result<Option<i64>, SkypixError>;

    fn require_f64(&self, key: &str) -> Result<f64, SkypixError> {
        self.get_f64(key)?
            .ok_or_else(|| SkypixError::MissingCard(key.to_string()))
    }

    fn require_i64(&self, key: &str) -> Result<i64, SkypixError> {
        self.get_i64(key)?
            .ok_or_else(|| SkypixError::MissingCard(key.to_string()))
    }
}

/// One header card value.
#[derive(Debug, Clone, PartialEq)]
pub enum CardValue {
    Str(String),
    Real(f64),
    Int(i64),
}

/// An order-preserving keyword map, usable both as a [`HeaderProvider`]
/// and as the output of [`Calibration::to_header`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderMap {
    cards: Vec<(String, CardValue)>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn upsert(&mut self, key: &str, value: CardValue) {
        match self.cards.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value,
            None => self.cards.push((key.to_string(), value)),
        }
    }

    pub fn set_str(&mut self, key: &str, value: impl Into<String>) -> &mut Self {
        self.upsert(key, CardValue::Str(value.into()));
        self
    }

    pub fn set_f64(&mut self, key: &str, value: f64) -> &mut Self {
        self.upsert(key, CardValue::Real(value));
        self
    }

    pub fn set_i64(&mut self, key: &str, value: i64) -> &mut Self {
        self.upsert(key, CardValue::Int(value));
        self
    }

    pub fn get(&self, key: &str) -> Option<&CardValue> {
        self.cards.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Cards in emission order.
    pub fn cards(&self) -> impl Iterator<Item = (&str, &CardValue)> {
        self.cards.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

impl HeaderProvider for HeaderMap {
    fn get_str(&self, key: &str) -> Option<String> {
        match self.get(key) {
            Some(CardValue::Str(s)) => Some(s.clone()),
            _ => None,
        }
    }

    fn get_f64(&self, key: &str) -> Result<Option<f64>, SkypixError> {
        match self.get(key) {
            None => Ok(None),
            Some(CardValue::Real(v)) => Ok(Some(*v)),
            Some(CardValue::Int(v)) => Ok(Some(*v as f64)),
            Some(CardValue::Str(_)) => Err(SkypixError::WrongCardType {
                key: key.to_string(),
                expected: "real",
            }),
        }
    }

    fn get_i64(&self, key: &str) -> Result<Option<i64>, SkypixError> {
        match self.get(key) {
            None => Ok(None),
            Some(CardValue::Int(v)) => Ok(Some(*v)),
            _ => Err(SkypixError::WrongCardType {
                key: key.to_string(),
                expected: "integer",
            }),
        }
    }
}

impl Calibration {
    /// Build a calibration from a header keyword map.
    ///
    /// Requires the axis sizes and the reference pixel; everything else
    /// has a documented fallback. Fails with
    /// [`SkypixError::UnsupportedProjection`] when the axis-type string
    /// matches no known or guessable projection.
    pub fn from_header(header: &impl HeaderProvider) -> Result<Calibration, SkypixError> {
        let xnpix = header.require_i64("NAXIS1")?;
        let ynpix = header.require_i64("NAXIS2")?;
        if xnpix <= 0 || ynpix <= 0 {
            return Err(SkypixError::InvalidImageSize(xnpix, ynpix));
        }
        let xcen = header.require_f64("CRPIX1")?;
        let ycen = header.require_f64("CRPIX2")?;

        let crval = SkyPos::new(
            header.get_f64("CRVAL1")?.unwrap_or(0.0),
            header.get_f64("CRVAL2")?.unwrap_or(0.0),
        );

        let ctype1 = header.get_str("CTYPE1");
        let equinox_card = header.get_f64("EQUINOX")?;
        let radesys = header
            .get_str("RADESYS")
            .or_else(|| header.get_str("RADECSYS"));

        let system =
            compat::system_from_header(ctype1.as_deref(), radesys.as_deref(), equinox_card)?;
        // Old headers spell the equinox EPOCH; when both exist EPOCH is
        // the observation date.
        let equinox = match equinox_card {
            Some(e) => e,
            None => header.get_f64("EPOCH")?.unwrap_or(2000.0),
        };
        let epoch = if equinox_card.is_some() {
            header.get_f64("EPOCH")?
        } else {
            None
        };

        let mut proj = match &ctype1 {
            Some(ctype) => compat::projection_from_ctype(ctype)?,
            // No axis type at all: a plain linear image.
            None => ProjectionType::Sol,
        };

        if let ProjectionType::Zpn { coeffs } = &mut proj {
            coeffs.clear();
            for i in 0..10 {
                let term = match header.get_f64(&format!("PV2_{i}"))? {
                    Some(v) => Some(v),
                    None => header.get_f64(&format!("PROJP{i}"))?,
                };
                coeffs.push(term.unwrap_or(0.0));
            }
            if coeffs.iter().all(|&c| c == 0.0) {
                coeffs.clear();
                coeffs.extend_from_slice(&[0.0, 1.0]);
            }
        }

        let cd = resolve_matrix(header)?;
        let distortion = resolve_distortion(header, &proj)?;

        Calibration::assemble(CalParts {
            cd,
            xcen,
            ycen,
            crval,
            xnpix: xnpix as u32,
            ynpix: ynpix as u32,
            proj,
            system,
            equinox,
            epoch,
            distortion,
            origin: CalOrigin::Header,
        })
    }

    /// Emit the calibration as an ordered keyword map, always in
    /// CD-matrix form. Plate-origin models synthesize their equivalent CD
    /// matrix and PV terms from the plate solution.
    pub fn to_header(&self) -> HeaderMap {
        let mut map = HeaderMap::new();
        let (xnpix, ynpix) = self.image_size();
        map.set_i64("NAXIS", 2)
            .set_i64("NAXIS1", xnpix as i64)
            .set_i64("NAXIS2", ynpix as i64);

        let (prefix1, prefix2) = ctype_prefixes(self.system());
        // A plate solution with curvature terms must re-read as TPV so
        // the emitted PV cards stay live; a purely linear plate is TAN.
        let code = match self.distortion() {
            Distortion::Plate(plate) if plate_has_curvature(plate) => "TPV",
            _ => self.projection().code(),
        };
        map.set_str("CTYPE1", format!("{prefix1}{code}"));
        map.set_str("CTYPE2", format!("{prefix2}{code}"));

        let rp = self.reference_pixel();
        let rs = self.reference_sky();
        map.set_f64("CRPIX1", rp.x)
            .set_f64("CRPIX2", rp.y)
            .set_f64("CRVAL1", rs.lon)
            .set_f64("CRVAL2", rs.lat);

        if let Distortion::Plate(plate) = self.distortion() {
            emit_plate(&mut map, plate);
        } else {
            let cd = self.cd_matrix();
            map.set_f64("CD1_1", cd[(0, 0)])
                .set_f64("CD1_2", cd[(0, 1)])
                .set_f64("CD2_1", cd[(1, 0)])
                .set_f64("CD2_2", cd[(1, 1)]);
        }

        map.set_str("RADESYS", self.system().tag());
        map.set_f64("EQUINOX", self.equinox());
        if let Some(epoch) = self.epoch() {
            map.set_f64("EPOCH", epoch);
        }

        match self.distortion() {
            Distortion::Sip(sip) => emit_sip(&mut map, sip),
            Distortion::Pv(pv) => emit_pv(&mut map, pv.pv1(), pv.pv2()),
            _ => {}
        }
        if let ProjectionType::Zpn { coeffs } = self.projection() {
            for (i, c) in coeffs.iter().enumerate() {
                if *c != 0.0 {
                    map.set_f64(&format!("PV2_{i}"), *c);
                }
            }
        }

        map
    }
}

/// The linear-matrix fallback chain.
fn resolve_matrix(header: &impl HeaderProvider) -> Result<Matrix2<f64>, SkypixError> {
    if let Some(cd11) = header.get_f64("CD1_1")? {
        let cd22 = header.require_f64("CD2_2")?;
        return Ok(Matrix2::new(
            cd11,
            header.get_f64("CD1_2")?.unwrap_or(0.0),
            header.get_f64("CD2_1")?.unwrap_or(0.0),
            cd22,
        ));
    }

    let cdelt = match (header.get_f64("CDELT1")?, header.get_f64("CDELT2")?) {
        (Some(c1), Some(c2)) => Some((c1, c2)),
        _ => None,
    };

    if let Some((mut c1, c2)) = cdelt {
        if compat::needs_dss_sign_patch(header, c1) {
            c1 = -c1;
        }
        let crota = match header.get_f64("CROTA2")? {
            Some(r) => Some(r),
            None => header.get_f64("CROTA1")?,
        };
        if let Some(rota) = crota {
            let (sin_r, cos_r) = rota.to_radians().sin_cos();
            return Ok(Matrix2::new(
                c1 * cos_r,
                -c2 * sin_r,
                c1 * sin_r,
                c2 * cos_r,
            ));
        }
        if let Some(pc) = resolve_pc(header)? {
            return Ok(Matrix2::new(
                c1 * pc[(0, 0)],
                c1 * pc[(0, 1)],
                c2 * pc[(1, 0)],
                c2 * pc[(1, 1)],
            ));
        }
        return Ok(Matrix2::new(c1, 0.0, 0.0, c2));
    }

    if let Some(pc) = resolve_pc(header)? {
        return Ok(pc);
    }

    // Axis-aligned homothety with unity steps.
    Ok(Matrix2::new(1.0, 0.0, 0.0, 1.0))
}

/// PC matrix under both historical spellings.
fn resolve_pc(header: &impl HeaderProvider) -> Result<Option<Matrix2<f64>>, SkypixError> {
    for (k11, k12, k21, k22) in [
        ("PC1_1", "PC1_2", "PC2_1", "PC2_2"),
        ("PC001001", "PC001002", "PC002001", "PC002002"),
    ] {
        if let Some(pc11) = header.get_f64(k11)? {
            return Ok(Some(Matrix2::new(
                pc11,
                header.get_f64(k12)?.unwrap_or(0.0),
                header.get_f64(k21)?.unwrap_or(0.0),
                header.get_f64(k22)?.unwrap_or(1.0),
            )));
        }
    }
    Ok(None)
}

/// Read the distortion coefficient set the projection calls for.
fn resolve_distortion(
    header: &impl HeaderProvider,
    proj: &ProjectionType,
) -> Result<Distortion, SkypixError> {
    if proj.has_sip_base() {
        return Ok(read_sip(header)?.map_or(Distortion::None, Distortion::Sip));
    }
    if matches!(proj, ProjectionType::Tpv) {
        // The linear terms default to the identity when their cards are
        // absent, per the TPV convention.
        let mut pv1 = [0.0; 12];
        let mut pv2 = [0.0; 12];
        pv1[1] = 1.0;
        pv2[1] = 1.0;
        for i in 0..12 {
            if let Some(v) = header.get_f64(&format!("PV1_{i}"))? {
                pv1[i] = v;
            }
            if let Some(v) = header.get_f64(&format!("PV2_{i}"))? {
                pv2[i] = v;
            }
        }
        return Ok(Distortion::Pv(PvPoly::new(&pv1, &pv2)));
    }
    Ok(Distortion::None)
}

fn read_sip(header: &impl HeaderProvider) -> Result<Option<SipPoly>, SkypixError> {
    let a_order = header.get_i64("A_ORDER")?;
    let b_order = header.get_i64("B_ORDER")?;
    let (Some(a_order), Some(b_order)) = (a_order, b_order) else {
        return Ok(None);
    };

    let mut sip = SipPoly::new(a_order.max(0) as usize, b_order.max(0) as usize);
    for (p, q) in (0..10usize).cartesian_product(0..10usize) {
        if let Some(v) = header.get_f64(&format!("A_{p}_{q}"))? {
            sip.set_a(p, q, v);
        }
        if let Some(v) = header.get_f64(&format!("B_{p}_{q}"))? {
            sip.set_b(p, q, v);
        }
    }

    if let (Some(ap), Some(bp)) = (header.get_i64("AP_ORDER")?, header.get_i64("BP_ORDER")?) {
        sip.set_inverse_orders(ap.max(0) as usize, bp.max(0) as usize);
        for (p, q) in (0..10usize).cartesian_product(0..10usize) {
            if let Some(v) = header.get_f64(&format!("AP_{p}_{q}"))? {
                sip.set_ap(p, q, v);
            }
            if let Some(v) = header.get_f64(&format!("BP_{p}_{q}"))? {
                sip.set_bp(p, q, v);
            }
        }
    }
    Ok(Some(sip))
}

fn emit_sip(map: &mut HeaderMap, sip: &SipPoly) {
    map.set_i64("A_ORDER", sip.a_order() as i64);
    map.set_i64("B_ORDER", sip.b_order() as i64);
    for (p, q, a, b) in sip.forward_terms() {
        if a != 0.0 {
            map.set_f64(&format!("A_{p}_{q}"), a);
        }
        if b != 0.0 {
            map.set_f64(&format!("B_{p}_{q}"), b);
        }
    }
    if let Some((ap_order, bp_order)) = sip.inverse_orders() {
        map.set_i64("AP_ORDER", ap_order as i64);
        map.set_i64("BP_ORDER", bp_order as i64);
        for (p, q, ap, bp) in sip.inverse_terms() {
            if ap != 0.0 {
                map.set_f64(&format!("AP_{p}_{q}"), ap);
            }
            if bp != 0.0 {
                map.set_f64(&format!("BP_{p}_{q}"), bp);
            }
        }
    }
}

fn emit_pv(map: &mut HeaderMap, pv1: &[f64], pv2: &[f64]) {
    for (i, c) in pv1.iter().enumerate() {
        if *c != 0.0 {
            map.set_f64(&format!("PV1_{i}"), *c);
        }
    }
    for (i, c) in pv2.iter().enumerate() {
        if *c != 0.0 {
            map.set_f64(&format!("PV2_{i}"), *c);
        }
    }
}

/// Polynomial degree of each term of the shared 12-term basis.
const TERM_DEGREE: [i32; 12] = [0, 1, 1, 1, 2, 2, 2, 3, 3, 3, 3, 3];

/// True when the plate→sky solution carries any non-linear term.
fn plate_has_curvature(plate: &PlatePoly) -> bool {
    let nonlinear =
        |c: &[f64]| c.iter().enumerate().any(|(i, &v)| v != 0.0 && TERM_DEGREE[i] != 1);
    let (qx, qy) = plate.plate_to_sky();
    nonlinear(qx) || nonlinear(qy)
}

/// Basis index of each term with its two arguments swapped (x ↔ y).
const TERM_SWAP: [usize; 12] = [0, 2, 1, 3, 6, 5, 4, 10, 9, 8, 7, 11];

/// Synthesize the CD matrix and PV terms of a plate-origin model.
///
/// The CD matrix is the exact linearization of the plate→sky solution
/// (linear polynomial terms scaled by pixel pitch over focal length); the
/// full solution is emitted as PV terms with power-of-scale normalization
/// `(F·π/180)^(degree−1)`, which re-expresses millimetre-space
/// coefficients in standard-plane degrees.
fn emit_plate(map: &mut HeaderMap, plate: &PlatePoly) {
    let (qx, qy) = plate.plate_to_sky();
    let f = plate.focal_mm;
    let pitch_mm = (plate.pitch_um.0 / 1000.0, plate.pitch_um.1 / 1000.0);

    let lin = |coeffs: &[f64], i: usize| coeffs.get(i).copied().unwrap_or(0.0);
    let to_deg = |v: f64| v / f * crate::constants::DEGRAD;
    map.set_f64("CD1_1", to_deg(lin(qx, 1) * pitch_mm.0));
    map.set_f64("CD1_2", to_deg(lin(qx, 2) * pitch_mm.1));
    map.set_f64("CD2_1", to_deg(lin(qy, 1) * pitch_mm.0));
    map.set_f64("CD2_2", to_deg(lin(qy, 2) * pitch_mm.1));

    let scale = f * RADEG;
    for (i, &c) in qx.iter().enumerate() {
        if c != 0.0 && TERM_DEGREE[i] != 1 {
            map.set_f64(
                &format!("PV1_{i}"),
                c * scale.powi(TERM_DEGREE[i] - 1),
            );
        }
    }
    // The latitude polynomial is emitted in the swapped-argument
    // convention of PV.
    for (i, &c) in qy.iter().enumerate() {
        let j = TERM_SWAP[i];
        if c != 0.0 && TERM_DEGREE[i] != 1 {
            map.set_f64(
                &format!("PV2_{j}"),
                c * scale.powi(TERM_DEGREE[i] - 1),
            );
        }
    }
}

fn ctype_prefixes(system: SkySystem) -> (&'static str, &'static str) {
    match system {
        SkySystem::Galactic => ("GLON-", "GLAT-"),
        SkySystem::Ecliptic => ("ELON-", "ELAT-"),
        SkySystem::Supergalactic => ("SLON-", "SLAT-"),
        SkySystem::Xy => ("X----", "Y----"),
        _ => ("RA---", "DEC--"),
    }
}
