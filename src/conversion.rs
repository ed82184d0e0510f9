use crate::constants::Degree;
use crate::skypix_errors::SkypixError;

/// Parse a right ascension given as three sexagesimal fields `HH MM SS.SS`
/// into degrees.
///
/// Arguments
/// ---------
/// * `h`, `m`, `s`: the hour, minute and second tokens, already split.
///
/// Return
/// ----------
/// * The right ascension in degrees, or [`SkypixError::InvalidSexagesimal`]
///   carrying the offending tokens.
pub(crate) fn parse_ra_fields(h: &str, m: &str, s: &str) -> Result<Degree, SkypixError> {
    let bad = || SkypixError::InvalidSexagesimal(format!("{h} {m} {s}"));
    let h: f64 = h.trim().parse().map_err(|_| bad())?;
    let m: f64 = m.trim().parse().map_err(|_| bad())?;
    let s: f64 = s.trim().parse().map_err(|_| bad())?;
    Ok((h + m / 60.0 + s / 3600.0) * 15.0)
}

/// Parse a declination given as a separate sign token and three sexagesimal
/// fields `DD MM SS.S` into degrees.
///
/// The sign travels in its own field in plate records ("+"/"-", possibly
/// glued to the degree token); an empty or "+" sign token means north.
///
/// Arguments
/// ---------
/// * `sign`: the sign token.
/// * `d`, `m`, `s`: the degree, arcminute and arcsecond tokens.
///
/// Return
/// ----------
/// * The declination in degrees, or [`SkypixError::InvalidSexagesimal`].
pub(crate) fn parse_dec_fields(
    sign: &str,
    d: &str,
    m: &str,
    s: &str,
) -> Result<Degree, SkypixError> {
    let bad = || SkypixError::InvalidSexagesimal(format!("{sign} {d} {m} {s}"));
    let negative = match sign.trim() {
        "" | "+" => false,
        "-" => true,
        other => other.starts_with('-'),
    };
    let d: f64 = d
        .trim()
        .trim_start_matches(['-', '+'])
        .parse()
        .map_err(|_| bad())?;
    let m: f64 = m.trim().parse().map_err(|_| bad())?;
    let s: f64 = s.trim().parse().map_err(|_| bad())?;
    let value = d + m / 60.0 + s / 3600.0;
    Ok(if negative { -value } else { value })
}

/// Parse a right ascension string in the format `HH MM SS.SS` to degrees.
pub fn parse_ra_to_deg(ra: &str) -> Result<Degree, SkypixError> {
    let parts: Vec<&str> = ra.split_whitespace().collect();
    if parts.len() != 3 {
        return Err(SkypixError::InvalidSexagesimal(ra.to_string()));
    }
    parse_ra_fields(parts[0], parts[1], parts[2])
}

/// Parse a declination string in the format `±DD MM SS.S` to degrees.
pub fn parse_dec_to_deg(dec: &str) -> Result<Degree, SkypixError> {
    let parts: Vec<&str> = dec.split_whitespace().collect();
    if parts.len() != 3 {
        return Err(SkypixError::InvalidSexagesimal(dec.to_string()));
    }
    let sign = if parts[0].starts_with('-') { "-" } else { "+" };
    parse_dec_fields(sign, parts[0], parts[1], parts[2])
}
