//! Error definitions shared across library modules.
//! Each type models a specific failure scenario (reference resolution, value
//! conversion, content-model walk, bit-level access).
use alloc::string::String;
use thiserror_no_std::Error;

//==================================================================================SCHEMA_ERROR
#[derive(Error, Debug, Clone, PartialEq)]
/// Failures while looking items up in the schema model.
pub enum SchemaError {
    /// A path reference does not name any item of the expected kind.
    #[error("Unresolved reference '{reference}' in {context}")]
    UnresolvedReference { reference: String, context: String },
    /// An array type whose element type cannot be found.
    #[error("Array {array} references unknown element type '{element}'")]
    MissingArrayElementType { array: String, element: String },
    /// An array entry points at an item whose type is not an array.
    #[error("Item {item} does not have an array type")]
    NotAnArray { item: String },
    /// A `.member` suffix was used on an item that is not an aggregate.
    #[error("Item {item} has no aggregate member '{member}'")]
    UnknownMember { item: String, member: String },
}

//==================================================================================VALUE_ERROR
#[derive(Error, Debug, Clone, PartialEq)]
/// Failures inside a calibration law.
pub enum CalibrationError {
    /// Calibrator kind that the engine does not evaluate.
    #[error("Unsupported calibrator: {kind}")]
    Unsupported { kind: &'static str },
    /// The law has no inverse for the requested calibrated value.
    #[error("Calibrated value {value} cannot be inverted")]
    NotInvertible { value: f64 },
    /// A spline was declared without any point.
    #[error("Spline calibrator has no points")]
    EmptySpline,
    /// Input outside the spline points while extrapolation is off.
    #[error("Value {value} is outside the spline range")]
    OutsideSpline { value: f64 },
}

#[derive(Error, Debug, Clone, PartialEq)]
/// Failures converting between raw bits, uncalibrated and calibrated values.
pub enum ValueError {
    /// Aggregates and arrays carry no scalar value of their own.
    #[error("Item {item} is not a scalar")]
    NotScalar { item: String },
    /// The type has no data encoding, so it has no raw form.
    #[error("Item {item} has no data encoding")]
    MissingEncoding { item: String },
    /// The raw size is not known (dynamic and still unresolved).
    #[error("Item {item} has an unresolved dynamic size")]
    DynamicSize { item: String },
    /// Text cannot be interpreted for the item's type.
    #[error("Value '{text}' is not valid for {item}")]
    InvalidText { item: String, text: String },
    /// Value does not fit in the encoded size.
    #[error("Value '{value}' does not fit in {bits} bits for {item}")]
    OutOfRange {
        item: String,
        value: String,
        bits: usize,
    },
    /// Encoding/size combination the converter cannot handle.
    #[error("Unsupported encoding for {item}: {detail}")]
    UnsupportedEncoding { item: String, detail: &'static str },
    /// Error bubbled up from a calibration law.
    #[error("Calibration failed for {item}: {source}")]
    Calibration {
        item: String,
        source: CalibrationError,
    },
}

//==================================================================================CONTENT_MODEL_ERROR
#[derive(Error, Debug, Clone, PartialEq)]
/// Hard errors raised while walking a container or command.
pub enum ContentModelError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Value(#[from] ValueError),

    /// A container or command is reached again while it is still being walked.
    #[error("Cyclic reference through {path}")]
    CyclicReference { path: String },

    /// Inheritance/inclusion chain exceeds the configured depth.
    #[error("Nesting deeper than {depth} levels at {path}")]
    NestingTooDeep { path: String, depth: usize },

    /// A restriction names a parameter that no ancestor placed.
    #[error("Restriction in {container} targets {parameter}, which no base container places")]
    RestrictionTargetNotFound { parameter: String, container: String },

    /// An argument assignment names an argument that no base command placed.
    #[error("Argument assignment in {command} targets {argument}, which no base command places")]
    AssignmentTargetNotFound { argument: String, command: String },

    /// A numeric field holds text that is not an integer.
    #[error("Malformed number '{text}' in {item}")]
    MalformedNumber { item: String, text: String },

    /// Failed while writing bits into the output buffer.
    #[error("BitWrite error: {err}")]
    BitWriteError { err: BitWriterError },
}

//==================================================================================BITREADER_ERRORS
#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// Errors raised during bitwise buffer reads.
pub enum BitReaderError {
    /// Attempted to read past the end of the buffer.
    #[error("Attempted to read out of bounds -> start: {start}, asked: {asked}, available: {available}")]
    OutOfBounds {
        start: usize,
        asked: usize,
        available: usize,
    },
}
//==================================================================================BITWRITER_ERRORS
#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// Errors raised during bitwise writes into a buffer.
pub enum BitWriterError {
    /// Attempted to write beyond the provided capacity.
    #[error("Attempted to write out of bounds -> start: {start}, asked: {asked}, available: {available}")]
    OutOfBounds {
        start: usize,
        asked: usize,
        available: usize,
    },
}
