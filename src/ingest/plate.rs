//! # Plate-measurement stream reader
//!
//! Builds a calibration from a positional plate-measurement record: the
//! fields carry no key names, only their position identifies them. The
//! stream is tokenized on whitespace, or through the CSV reader when the
//! record is comma-separated, and consumed strictly in order:
//!
//! | position | content |
//! |---|---|
//! | 0 | epoch of the plate (Julian year) |
//! | 1 | focal length (mm; values under 100 are metres) |
//! | 2–4 | plate-center right ascension, sexagesimal `H M S` |
//! | 5–8 | plate-center declination: sign field, then `D M S` |
//! | 9–10 | plate-center offset, microns |
//! | 11–16 | six unused fields |
//! | 17–36 | 10 coefficient pairs, sky→plate solution |
//! | 37–60 | 12 coefficient pairs, plate→sky solution |
//! | 61–62 | pixel pitch pair, microns |
//! | 63–64 | corner offset pair, microns |
//! | 65–68 | image center and field size (informational) |
//! | 69–70 | pixel dimensions |
//!
//! ## Units & sign conventions
//!
//! All conversions happen once, here: focal lengths are normalized to
//! millimetres, offsets stay in microns, and the longitude-axis negation
//! (plate x runs east-left) is folded into the x-row polynomial
//! coefficients. The transform core never sees raw record units.

use std::io::{BufReader, Read};

use camino::Utf8Path;
use itertools::Itertools;

use crate::calibration::{CalOrigin, CalParts, Calibration};
use crate::constants::DEGRAD;
use crate::conversion::{parse_dec_fields, parse_ra_fields};
use crate::coord::SkyPos;
use crate::distortion::{Distortion, PlatePoly};
use crate::frames::SkySystem;
use crate::projection::ProjectionType;
use crate::skypix_errors::SkypixError;

use nalgebra::Matrix2;

/// Total number of positional fields in a plate record.
const RECORD_LEN: usize = 71;

impl Calibration {
    /// Build a calibration from a positional plate-measurement stream.
    pub fn from_plate_stream<R: Read>(stream: R) -> Result<Calibration, SkypixError> {
        let tokens = tokenize(stream)?;
        if tokens.len() < RECORD_LEN {
            return Err(SkypixError::TruncatedPlateRecord {
                expected: RECORD_LEN,
                got: tokens.len(),
            });
        }

        let num = |i: usize| -> Result<f64, SkypixError> {
            tokens[i]
                .parse::<f64>()
                .map_err(|_| SkypixError::InvalidPlateField {
                    index: i,
                    token: tokens[i].clone(),
                })
        };

        let epoch = num(0)?;
        // Focal-length normalization: archival records mix metres and
        // millimetres.
        let focal_raw = num(1)?;
        let focal_mm = if focal_raw < 100.0 {
            focal_raw * 1000.0
        } else {
            focal_raw
        };

        let ra = parse_ra_fields(&tokens[2], &tokens[3], &tokens[4])?;
        let dec = parse_dec_fields(&tokens[5], &tokens[6], &tokens[7], &tokens[8])?;

        let center_um = (num(9)?, num(10)?);
        // Fields 11–16 are unused carriers from the original record
        // layout; they still must tokenize.
        for i in 11..17 {
            num(i)?;
        }

        let (mut fwd_x, fwd_y) = read_pairs(&tokens, 17, 10, &num)?;
        let (mut inv_x, inv_y) = read_pairs(&tokens, 37, 12, &num)?;

        let pitch_um = (num(61)?, num(62)?);
        let corner_um = (num(63)?, num(64)?);
        // Fields 65–68 (image center and field size) are informational:
        // the pixel geometry below already determines both.
        for i in 65..69 {
            num(i)?;
        }
        let xnpix = num(69)? as i64;
        let ynpix = num(70)? as i64;
        if xnpix <= 0 || ynpix <= 0 {
            return Err(SkypixError::InvalidImageSize(xnpix, ynpix));
        }

        // Longitude-axis negation, applied once: plate x increases
        // east-left.
        for c in fwd_x.iter_mut() {
            *c = -*c;
        }
        for c in inv_x.iter_mut() {
            *c = -*c;
        }

        let plate = PlatePoly::new(
            focal_mm,
            pitch_um,
            corner_um,
            center_um,
            &fwd_x,
            &fwd_y,
            &inv_x,
            &inv_y,
        );

        // Reference pixel: the plate center expressed in pixels.
        let xcen = (center_um.0 - corner_um.0) / pitch_um.0 + 1.0;
        let ycen = (center_um.1 - corner_um.1) / pitch_um.1 + 1.0;

        // Linearized matrix, so scale/rotation queries work without
        // routing through the polynomial pair.
        let lin = |c: &[f64], i: usize| c.get(i).copied().unwrap_or(0.0);
        let pitch_mm = (pitch_um.0 / 1000.0, pitch_um.1 / 1000.0);
        let to_deg = |v: f64| v / focal_mm * DEGRAD;
        let cd = Matrix2::new(
            to_deg(lin(&inv_x, 1) * pitch_mm.0),
            to_deg(lin(&inv_x, 2) * pitch_mm.1),
            to_deg(lin(&inv_y, 1) * pitch_mm.0),
            to_deg(lin(&inv_y, 2) * pitch_mm.1),
        );

        Calibration::assemble(CalParts {
            cd,
            xcen,
            ycen,
            crval: SkyPos::new(ra, dec),
            xnpix: xnpix as u32,
            ynpix: ynpix as u32,
            proj: ProjectionType::Tan,
            system: SkySystem::Fk5,
            equinox: 2000.0,
            epoch: Some(epoch),
            distortion: Distortion::Plate(plate),
            origin: CalOrigin::PlateStream,
        })
    }

    /// Open a plate-measurement file and read it as a stream.
    pub fn from_plate_file(path: &Utf8Path) -> Result<Calibration, SkypixError> {
        let file = std::fs::File::open(path)?;
        Calibration::from_plate_stream(BufReader::new(file))
    }
}

/// Split the record into raw tokens; comma-separated records go through
/// the CSV reader, anything else splits on whitespace.
fn tokenize<R: Read>(stream: R) -> Result<Vec<String>, SkypixError> {
    let mut text = String::new();
    BufReader::new(stream).read_to_string(&mut text)?;

    if text.contains(',') {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());
        let mut tokens = Vec::new();
        for record in reader.records() {
            let record = record?;
            tokens.extend(
                record
                    .iter()
                    .filter(|f| !f.is_empty())
                    .map(|f| f.to_string()),
            );
        }
        Ok(tokens)
    } else {
        Ok(text.split_whitespace().map(|t| t.to_string()).collect())
    }
}

/// Read `count` interleaved coefficient pairs starting at `start`.
fn read_pairs(
    tokens: &[String],
    start: usize,
    count: usize,
    num: &impl Fn(usize) -> Result<f64, SkypixError>,
) -> Result<(Vec<f64>, Vec<f64>), SkypixError> {
    let values: Vec<f64> = (start..start + 2 * count)
        .map(num)
        .collect::<Result<_, _>>()?;
    Ok(values.into_iter().tuples::<(_, _)>().unzip())
}
