//! # Legacy header heuristics
//!
//! The compatibility rules gathered here are historical: their trigger
//! conditions come from surveys and software that predate the modern
//! keyword conventions, and cannot be re-derived from the projection math.
//! They are kept in one module, each with its provenance, instead of
//! being scattered through the reader.
//!
//! 1. **Projection matching** ([`projection_from_ctype`]): exact tail
//!    code first, then a substring scan for any known code (old writers
//!    padded or misplaced the dashes), then the named fallbacks below.
//! 2. **IRAF `TNX` fallback**: the IRAF tangent-plane-plus-corrections
//!    convention is recognized but its correction surface is not
//!    supported; such headers read as plain TAN, which is how every
//!    display-oriented reader has historically treated them.
//! 3. **Digitized Sky Survey sign patch** ([`needs_dss_sign_patch`]):
//!    DSS plate headers carry positive CDELT values with no CD/PC/CROTA
//!    sign information, yet their x axis runs east-left like every plate;
//!    when the plate markers are present the longitude step is forced
//!    negative.

use crate::frames::SkySystem;
use crate::projection::ProjectionType;
use crate::skypix_errors::SkypixError;

use super::header::HeaderProvider;

/// Known projection codes, longest first so the substring scan cannot
/// shadow a compound code with its base.
const KNOWN_CODES: [&str; 17] = [
    "SIN-SIP", "TAN-SIP", "SIN", "TAN", "ARC", "AIT", "ZEA", "STG", "CAR", "NCP", "ZPN", "SOL",
    "MOL", "SIP", "FIE", "TPV", "GLS",
];

/// Resolve an axis-type string into a projection.
///
/// Exact match on the dash-separated tail first, then fuzzy substring
/// match, then the TNX fallback; anything else is
/// [`SkypixError::UnsupportedProjection`] naming the offending string.
pub(crate) fn projection_from_ctype(ctype: &str) -> Result<ProjectionType, SkypixError> {
    let upper = ctype.trim().to_ascii_uppercase();

    // Exact: the code is everything after the coordinate prefix.
    let segments: Vec<&str> = upper.split('-').filter(|s| !s.is_empty()).collect();
    if segments.len() >= 2 {
        let tail = segments[1..].join("-");
        if let Some(proj) = ProjectionType::from_code(&tail) {
            return Ok(proj);
        }
    }

    // Fuzzy: any known code appearing anywhere in the string.
    for code in KNOWN_CODES {
        if upper.contains(code) {
            // A known code is always resolvable.
            return Ok(ProjectionType::from_code(code).unwrap());
        }
    }

    if upper.contains("TNX") {
        return Ok(ProjectionType::Tan);
    }

    Err(SkypixError::UnsupportedProjection(ctype.to_string()))
}

/// Resolve the reference system from RADESYS, the axis-type prefix, and
/// the equinox rule (1950 forces FK4 for equatorial systems).
pub(crate) fn system_from_header(
    ctype1: Option<&str>,
    radesys: Option<&str>,
    equinox: Option<f64>,
) -> Result<SkySystem, SkypixError> {
    if let Some(tag) = radesys {
        return SkySystem::from_tag(tag);
    }

    let Some(ctype) = ctype1 else {
        return Ok(SkySystem::Xy);
    };
    let upper = ctype.trim().to_ascii_uppercase();

    if upper.starts_with("GLON") || upper.starts_with("GLAT") {
        return Ok(SkySystem::Galactic);
    }
    if upper.starts_with("ELON") || upper.starts_with("ELAT") {
        return Ok(SkySystem::Ecliptic);
    }
    if upper.starts_with("SLON") || upper.starts_with("SLAT") {
        return Ok(SkySystem::Supergalactic);
    }
    if upper.starts_with("RA") || upper.starts_with("DEC") {
        return Ok(match equinox {
            Some(e) if (e - 1950.0).abs() < f64::EPSILON => SkySystem::Fk4,
            Some(_) => SkySystem::Fk5,
            None => SkySystem::Icrs,
        });
    }
    Ok(SkySystem::Xy)
}

/// True when the DSS plate sign patch must force a negative longitude
/// step: the header carries the plate markers and only unsigned scale
/// information.
pub(crate) fn needs_dss_sign_patch(header: &impl HeaderProvider, cdelt1: f64) -> bool {
    if cdelt1 <= 0.0 {
        return false;
    }
    let has_marker = header.get_str("PLTLABEL").is_some()
        || header.get_str("PLATEID").is_some()
        || header
            .get_str("ORIGIN")
            .is_some_and(|o| o.to_ascii_uppercase().contains("STSCI"));
    // Explicit rotation or matrix keys carry their own sign.
    let has_sign_info = matches!(header.get_f64("CROTA2"), Ok(Some(_)))
        || matches!(header.get_f64("CROTA1"), Ok(Some(_)))
        || matches!(header.get_f64("PC1_1"), Ok(Some(_)))
        || matches!(header.get_f64("PC001001"), Ok(Some(_)));
    has_marker && !has_sign_info
}

#[cfg(test)]
mod compat_test {
    use super::*;
    use crate::ingest::header::HeaderMap;

    #[test]
    fn test_exact_tail_match() {
        assert_eq!(
            projection_from_ctype("RA---TAN").unwrap(),
            ProjectionType::Tan
        );
        assert_eq!(
            projection_from_ctype("DEC--ZEA").unwrap(),
            ProjectionType::Zea
        );
        assert_eq!(
            projection_from_ctype("RA---TAN-SIP").unwrap(),
            ProjectionType::Sip
        );
    }

    #[test]
    fn test_fuzzy_substring_match() {
        // Mispadded historical spellings still resolve.
        assert_eq!(
            projection_from_ctype("RA--STG ").unwrap(),
            ProjectionType::Stg
        );
        assert_eq!(
            projection_from_ctype("RA_TAN").unwrap(),
            ProjectionType::Tan
        );
    }

    #[test]
    fn test_compound_code_not_shadowed() {
        // The SIN-SIP code must not resolve as plain SIN.
        assert_eq!(
            projection_from_ctype("RA---SIN-SIP").unwrap(),
            ProjectionType::SinSip
        );
    }

    #[test]
    fn test_tnx_falls_back_to_tan() {
        assert_eq!(
            projection_from_ctype("RA---TNX").unwrap(),
            ProjectionType::Tan
        );
    }

    #[test]
    fn test_unknown_projection_rejected() {
        let err = projection_from_ctype("RA---BON").unwrap_err();
        assert!(matches!(err, SkypixError::UnsupportedProjection(s) if s.contains("BON")));
    }

    #[test]
    fn test_system_resolution() {
        assert_eq!(
            system_from_header(Some("RA---TAN"), None, None).unwrap(),
            SkySystem::Icrs
        );
        assert_eq!(
            system_from_header(Some("RA---TAN"), None, Some(1950.0)).unwrap(),
            SkySystem::Fk4
        );
        assert_eq!(
            system_from_header(Some("RA---TAN"), None, Some(2000.0)).unwrap(),
            SkySystem::Fk5
        );
        assert_eq!(
            system_from_header(Some("GLON-CAR"), None, Some(1950.0)).unwrap(),
            SkySystem::Galactic
        );
        assert_eq!(
            system_from_header(Some("RA---TAN"), Some("ICRS"), Some(1950.0)).unwrap(),
            SkySystem::Icrs
        );
        assert_eq!(system_from_header(None, None, None).unwrap(), SkySystem::Xy);
    }

    #[test]
    fn test_dss_sign_patch_trigger() {
        let mut map = HeaderMap::new();
        map.set_str("PLTLABEL", "E1234");
        assert!(needs_dss_sign_patch(&map, 1.7e-2));
        // Negative steps never need the patch.
        assert!(!needs_dss_sign_patch(&map, -1.7e-2));

        // Explicit rotation keys disable it.
        map.set_f64("CROTA2", 0.3);
        assert!(!needs_dss_sign_patch(&map, 1.7e-2));

        // No plate markers, no patch.
        let plain = HeaderMap::new();
        assert!(!needs_dss_sign_patch(&plain, 1.7e-2));
    }
}
