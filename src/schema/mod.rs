//! Read-only, pre-parsed schema model consumed by the content-model engine.
//!
//! The structures mirror the XTCE object tree once XML parsing and validation
//! are done: space systems own types, parameters, sequence containers and
//! meta-commands; references between them are still textual paths, resolved
//! on demand through [`Schema`]. All of them deserialize with `serde`, so a
//! model can be written by hand or loaded from any serde format.
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use serde::Deserialize;

mod resolver;

pub use resolver::{Located, Schema, TypeSet, TypedObject};

fn default_true() -> bool {
    true
}

fn default_one() -> f64 {
    1.0
}

fn default_spline_order() -> u32 {
    1
}

fn default_one_string() -> String {
    String::from("True")
}

fn default_zero_string() -> String {
    String::from("False")
}

//==================================================================================SPACE_SYSTEM
#[derive(Debug, Clone, Default, Deserialize)]
/// Namespace node of the schema tree.
pub struct SpaceSystem {
    pub name: String,
    #[serde(default)]
    pub parameter_types: Vec<DataType>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub argument_types: Vec<DataType>,
    #[serde(default)]
    pub containers: Vec<SequenceContainer>,
    #[serde(default)]
    pub meta_commands: Vec<MetaCommand>,
    #[serde(default)]
    pub space_systems: Vec<SpaceSystem>,
}

//==================================================================================TYPES
#[derive(Debug, Clone, Deserialize)]
/// Parameter or argument type: engineering view plus raw encoding.
pub struct DataType {
    pub name: String,
    pub engineering: EngineeringType,
    /// Absent for aggregates and arrays, whose size comes from their parts.
    #[serde(default)]
    pub encoding: Option<DataEncoding>,
    #[serde(default)]
    pub initial_value: Option<String>,
    #[serde(default)]
    pub units: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
/// Engineering (calibrated) category of a type.
pub enum EngineeringType {
    Integer {
        #[serde(default = "default_true")]
        signed: bool,
    },
    Float,
    Enumerated {
        #[serde(default)]
        enumerations: Vec<ValueEnumeration>,
    },
    Boolean {
        #[serde(default = "default_one_string")]
        one_string_value: String,
        #[serde(default = "default_zero_string")]
        zero_string_value: String,
    },
    String,
    Binary,
    AbsoluteTime {
        #[serde(default = "default_one")]
        scale: f64,
        #[serde(default)]
        offset: f64,
    },
    RelativeTime {
        #[serde(default = "default_one")]
        scale: f64,
        #[serde(default)]
        offset: f64,
    },
    Aggregate {
        members: Vec<Member>,
    },
    Array {
        array_type_ref: String,
        #[serde(default)]
        dimensions: Vec<Dimension>,
    },
}

impl EngineeringType {
    /// Short tag naming the engineering category.
    pub fn tag(&self) -> &'static str {
        match self {
            EngineeringType::Integer { signed: true } => "SIGNED",
            EngineeringType::Integer { signed: false } => "UNSIGNED",
            EngineeringType::Float => "FLOAT",
            EngineeringType::Enumerated { .. } => "ENUMERATED",
            EngineeringType::Boolean { .. } => "BOOLEAN",
            EngineeringType::String => "STRING",
            EngineeringType::Binary => "BINARY",
            EngineeringType::AbsoluteTime { .. } => "TIME",
            EngineeringType::RelativeTime { .. } => "DURATION",
            EngineeringType::Aggregate { .. } => "STRUCTURE",
            EngineeringType::Array { .. } => "ARRAY",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
/// Label of an enumerated type. `max_value` turns the label into a range.
pub struct ValueEnumeration {
    pub value: i64,
    #[serde(default)]
    pub max_value: Option<i64>,
    pub label: String,
}

#[derive(Debug, Clone, Deserialize)]
/// Named member of an aggregate type.
pub struct Member {
    pub name: String,
    pub type_ref: String,
    #[serde(default)]
    pub initial_value: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
/// Inclusive index range of one array dimension.
pub struct Dimension {
    pub starting_index: IntegerValue,
    pub ending_index: IntegerValue,
}

//==================================================================================ENCODING
#[derive(Debug, Clone, Deserialize)]
/// Raw representation of a scalar type.
pub struct DataEncoding {
    pub kind: EncodingKind,
    pub size_in_bits: SizeInBits,
    #[serde(default)]
    pub default_calibrator: Option<Calibrator>,
    #[serde(default)]
    pub context_calibrators: Vec<ContextCalibrator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Bit-level interpretation of the raw field.
pub enum EncodingKind {
    Unsigned,
    TwosComplement,
    SignMagnitude,
    OnesComplement,
    Bcd,
    Ieee754,
    Utf8,
    Binary,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Raw size, either literal or taken from another item at walk time.
pub enum SizeInBits {
    Fixed(u64),
    Dynamic(DynamicValue),
}

//==================================================================================CALIBRATION
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
/// Law turning an uncalibrated number into an engineering one.
pub enum Calibrator {
    Polynomial {
        terms: Vec<PolynomialTerm>,
    },
    Spline {
        #[serde(default = "default_spline_order")]
        order: u32,
        #[serde(default)]
        extrapolate: bool,
        points: Vec<SplinePoint>,
    },
    MathOperation {
        expression: String,
    },
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PolynomialTerm {
    pub coefficient: f64,
    pub exponent: u32,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SplinePoint {
    pub raw: f64,
    pub calibrated: f64,
}

#[derive(Debug, Clone, Deserialize)]
/// Calibrator used only while its context criteria hold.
pub struct ContextCalibrator {
    pub context: MatchCriteria,
    pub calibrator: Calibrator,
}

//==================================================================================MATCH_CRITERIA
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
/// Comparison operator of a match criterion.
pub enum ComparisonOperator {
    #[default]
    #[serde(rename = "==")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
    #[serde(rename = "<")]
    Less,
    #[serde(rename = "<=")]
    LessOrEqual,
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = ">=")]
    GreaterOrEqual,
}

impl ComparisonOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            ComparisonOperator::Equal => "==",
            ComparisonOperator::NotEqual => "!=",
            ComparisonOperator::Less => "<",
            ComparisonOperator::LessOrEqual => "<=",
            ComparisonOperator::Greater => ">",
            ComparisonOperator::GreaterOrEqual => ">=",
        }
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Deserialize)]
/// Single `item <op> value` test.
pub struct Comparison {
    pub parameter_ref: String,
    #[serde(default)]
    pub operator: ComparisonOperator,
    pub value: String,
    #[serde(default = "default_true")]
    pub use_calibrated_value: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Restriction, include condition or calibrator context.
pub enum MatchCriteria {
    Comparison(Comparison),
    ComparisonList(Vec<Comparison>),
    /// Not evaluated by the engine.
    BooleanExpression(String),
    /// Not evaluated by the engine.
    CustomAlgorithm(String),
}

impl MatchCriteria {
    /// The comparisons of a criteria made only of comparisons.
    pub fn comparisons(&self) -> Option<&[Comparison]> {
        match self {
            MatchCriteria::Comparison(comparison) => Some(core::slice::from_ref(comparison)),
            MatchCriteria::ComparisonList(list) => Some(list),
            MatchCriteria::BooleanExpression(_) | MatchCriteria::CustomAlgorithm(_) => None,
        }
    }

    pub fn element_name(&self) -> &'static str {
        match self {
            MatchCriteria::Comparison(_) => "Comparison",
            MatchCriteria::ComparisonList(_) => "ComparisonList",
            MatchCriteria::BooleanExpression(_) => "BooleanExpression",
            MatchCriteria::CustomAlgorithm(_) => "CustomAlgorithm",
        }
    }
}

//==================================================================================INTEGER_VALUE
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Integer that is literal or derived from another item's value.
pub enum IntegerValue {
    Fixed(i64),
    Dynamic(DynamicValue),
    DiscreteLookup(Vec<DiscreteLookup>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct DynamicValue {
    pub parameter_ref: String,
    #[serde(default = "default_true")]
    pub use_calibrated_value: bool,
    #[serde(default)]
    pub linear_adjustment: Option<LinearAdjustment>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LinearAdjustment {
    #[serde(default = "default_one")]
    pub slope: f64,
    #[serde(default)]
    pub intercept: f64,
}

#[derive(Debug, Clone, Deserialize)]
/// Value chosen when its criteria hold.
pub struct DiscreteLookup {
    pub value: i64,
    pub criteria: MatchCriteria,
}

//==================================================================================ITEMS
#[derive(Debug, Clone, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub type_ref: String,
    #[serde(default)]
    pub initial_value: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Argument {
    pub name: String,
    pub type_ref: String,
    #[serde(default)]
    pub initial_value: Option<String>,
}

//==================================================================================CONTAINERS
#[derive(Debug, Clone, Deserialize)]
/// Telemetry sequence container.
pub struct SequenceContainer {
    pub name: String,
    #[serde(default)]
    pub is_abstract: bool,
    #[serde(default)]
    pub base_container: Option<BaseContainer>,
    #[serde(default)]
    pub entries: Vec<SequenceEntry>,
}

#[derive(Debug, Clone, Deserialize)]
/// Inheritance link plus the restriction the derived container asserts.
pub struct BaseContainer {
    pub container_ref: String,
    #[serde(default)]
    pub restriction: Option<MatchCriteria>,
}

#[derive(Debug, Clone, Deserialize)]
/// One entry of a container's entry list.
pub struct SequenceEntry {
    pub item: SequenceItem,
    #[serde(default)]
    pub location: Option<LocationInContainer>,
    #[serde(default)]
    pub repeat: Option<RepeatEntry>,
    #[serde(default)]
    pub include_condition: Option<MatchCriteria>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
/// What a sequence entry points at.
pub enum SequenceItem {
    ParameterRef {
        parameter_ref: String,
    },
    ArrayParameterRef {
        parameter_ref: String,
        #[serde(default)]
        dimensions: Vec<Dimension>,
    },
    ContainerRef {
        container_ref: String,
    },
    ArgumentRef {
        argument_ref: String,
    },
    FixedValue {
        #[serde(default)]
        name: Option<String>,
        size_in_bits: u64,
        binary_value: String,
    },
    ParameterSegmentRef {
        parameter_ref: String,
    },
    ContainerSegmentRef {
        container_ref: String,
    },
    StreamSegment {
        stream_ref: String,
    },
    IndirectParameterRef {
        alias_name_space: String,
    },
}

impl SequenceItem {
    /// Schema element name, used in warnings about unsupported entries.
    pub fn element_name(&self) -> &'static str {
        match self {
            SequenceItem::ParameterRef { .. } => "ParameterRefEntry",
            SequenceItem::ArrayParameterRef { .. } => "ArrayParameterRefEntry",
            SequenceItem::ContainerRef { .. } => "ContainerRefEntry",
            SequenceItem::ArgumentRef { .. } => "ArgumentRefEntry",
            SequenceItem::FixedValue { .. } => "FixedValueEntry",
            SequenceItem::ParameterSegmentRef { .. } => "ParameterSegmentRefEntry",
            SequenceItem::ContainerSegmentRef { .. } => "ContainerSegmentRefEntry",
            SequenceItem::StreamSegment { .. } => "StreamSegmentEntry",
            SequenceItem::IndirectParameterRef { .. } => "IndirectParameterRefEntry",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Origin a location offset is measured from.
pub enum ReferenceLocation {
    #[default]
    PreviousEntry,
    ContainerStart,
    ContainerEnd,
    NextEntry,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocationInContainer {
    #[serde(default)]
    pub reference_location: ReferenceLocation,
    pub location: IntegerValue,
}

#[derive(Debug, Clone, Deserialize)]
/// Repetition of an entry; `offset` is the gap in bits between occurrences.
pub struct RepeatEntry {
    pub count: IntegerValue,
    #[serde(default)]
    pub offset: Option<IntegerValue>,
}

//==================================================================================COMMANDS
#[derive(Debug, Clone, Deserialize)]
pub struct MetaCommand {
    pub name: String,
    #[serde(default)]
    pub is_abstract: bool,
    #[serde(default)]
    pub base_meta_command: Option<BaseMetaCommand>,
    #[serde(default)]
    pub arguments: Vec<Argument>,
    #[serde(default)]
    pub command_container: Option<CommandContainer>,
}

#[derive(Debug, Clone, Deserialize)]
/// Command inheritance link plus the argument values it fixes.
pub struct BaseMetaCommand {
    pub command_ref: String,
    #[serde(default)]
    pub argument_assignments: Vec<ArgumentAssignment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArgumentAssignment {
    pub argument_name: String,
    pub argument_value: String,
}

#[derive(Debug, Clone, Deserialize)]
/// Binary layout of a meta-command.
pub struct CommandContainer {
    pub name: String,
    #[serde(default)]
    pub base_container: Option<BaseContainer>,
    #[serde(default)]
    pub entries: Vec<SequenceEntry>,
}

//==================================================================================TESTS
#[cfg(test)]
#[path = "tests.rs"]
mod tests;
