use thiserror::Error;

/// Fatal failures raised while building a [`Calibration`](crate::calibration::Calibration)
/// or emitting/ingesting one of its legacy representations.
///
/// Construction never returns a partial model: any of these aborts the
/// factory that raised it.
#[derive(Error, Debug)]
pub enum SkypixError {
    #[error("Missing mandatory header keyword: {0}")]
    MissingCard(String),

    #[error("Header keyword '{key}' is not of the expected type {expected}")]
    WrongCardType { key: String, expected: &'static str },

    #[error("Unsupported projection type: {0}")]
    UnsupportedProjection(String),

    #[error("Unknown reference system: {0}")]
    UnknownSystem(String),

    #[error("Calibration matrix is singular (determinant = {0})")]
    SingularMatrix(f64),

    #[error("Image size must be positive, got {0}x{1}")]
    InvalidImageSize(i64, i64),

    #[error("Plate record truncated: expected {expected} fields, got {got}")]
    TruncatedPlateRecord { expected: usize, got: usize },

    #[error("Plate record field {index} is not a number: '{token}'")]
    InvalidPlateField { index: usize, token: String },

    #[error("Invalid sexagesimal angle: '{0}'")]
    InvalidSexagesimal(String),

    #[error("Invalid resize factor: {0}")]
    InvalidResizeFactor(f64),

    #[error("Crop window {0}x{1} lies outside the image")]
    InvalidCropWindow(i64, i64),

    #[error("Recalibration needs at least 2 usable points, got {0}")]
    NotEnoughPoints(usize),

    #[error("Spherical cell order {order} has no cell index {index}")]
    InvalidCellIndex { order: u32, index: u64 },

    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Error while reading a CSV plate record: {0}")]
    CsvError(#[from] csv::Error),
}

/// Per-point transform failures.
///
/// These occur at high frequency on rasterization paths (every pixel of an
/// all-sky image outside the projection boundary raises one), so the type is
/// a bare `Copy` enum: no payload, no allocation.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformError {
    /// The sky position falls outside the projection's valid domain
    /// (beyond the tangent-plane horizon, at the anti-pole, ...).
    #[error("sky position outside the projection domain")]
    OutOfProjection,

    /// The pixel does not correspond to any sky position (radial argument
    /// of the inverse formula out of range).
    #[error("pixel has no celestial counterpart")]
    NoCoordinate,

    /// A distortion inversion hit a singular Jacobian; there is no iterate
    /// to fall back to.
    #[error("distortion inversion has no solution")]
    NoSolution,
}
