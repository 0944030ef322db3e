//! One row of a resolved layout.
use alloc::borrow::ToOwned;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use super::value::EntryValue;
use crate::core::{RawBits, RawSize};
use crate::schema::TypedObject;

/// What an entry stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EntryKind {
    Parameter,
    Argument,
    /// Sub-container inclusion or base-container level.
    Container,
    /// Base meta-command level.
    CommandContainer,
    FixedValue,
}

/// Start bit of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StartBit {
    /// Excluded, unsupported location, or not placed yet.
    Unresolved,
    Resolved(u64),
    /// Deferred until the end of the enclosing container is known; holds the
    /// distance from that end.
    ContainerEnd(i64),
}

impl StartBit {
    pub fn bit(&self) -> Option<u64> {
        match self {
            StartBit::Resolved(bit) => Some(*bit),
            _ => None,
        }
    }
}

impl fmt::Display for StartBit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartBit::Unresolved => Ok(()),
            StartBit::Resolved(bit) => write!(f, "{bit}"),
            StartBit::ContainerEnd(offset) => write!(f, "E{offset}"),
        }
    }
}

//==================================================================================CONTENT_ENTRY
#[derive(Debug, Clone)]
pub struct ContentEntry<'s> {
    pub(crate) kind: EntryKind,
    pub(crate) name: String,
    pub(crate) holding: String,
    pub(crate) typed: Option<TypedObject<'s>>,
    pub(crate) start_bit: StartBit,
    pub(crate) raw_size: RawSize,
    pub(crate) value: Option<EntryValue>,
    pub(crate) default_value: Option<EntryValue>,
    pub(crate) expected: Option<RawBits>,
    pub(crate) conditions: Vec<EntryValue>,
    pub(crate) in_use: bool,
    pub(crate) repeat_info: Option<String>,
}

impl<'s> ContentEntry<'s> {
    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    /// Full path of the item, container or fixed value.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of the container or command that placed the entry.
    pub fn holding(&self) -> &str {
        &self.holding
    }

    pub fn typed(&self) -> Option<&TypedObject<'s>> {
        self.typed.as_ref()
    }

    pub fn start_bit(&self) -> StartBit {
        self.start_bit
    }

    pub fn raw_size(&self) -> RawSize {
        self.raw_size
    }

    /// First bit past the entry, when both start and size are known.
    pub fn end_bit(&self) -> Option<u64> {
        Some(self.start_bit.bit()? + self.raw_size.bits()?)
    }

    pub fn value(&self) -> Option<&EntryValue> {
        self.value.as_ref()
    }

    /// Value taken from the initial value, used by encode when no other
    /// value was assigned.
    pub fn default_value(&self) -> Option<&EntryValue> {
        self.default_value.as_ref()
    }

    /// Literal bits a restriction, assignment or fixed value expects here.
    pub fn expected(&self) -> Option<&RawBits> {
        self.expected.as_ref()
    }

    pub fn conditions(&self) -> &[EntryValue] {
        &self.conditions
    }

    /// Conditions joined with `&&`, empty when unconditional.
    pub fn conditions_text(&self) -> String {
        let mut out = String::new();
        for (idx, condition) in self.conditions.iter().enumerate() {
            if idx > 0 {
                out.push_str(" && ");
            }
            let _ = fmt::Write::write_fmt(&mut out, format_args!("{condition}"));
        }
        out
    }

    pub fn in_use(&self) -> bool {
        self.in_use
    }

    pub fn repeat_info(&self) -> Option<&str> {
        self.repeat_info.as_deref()
    }

    /// Whether the entry occupies bits that decode/encode/overlap act on.
    pub(crate) fn occupies_bits(&self) -> bool {
        self.in_use
            && self.start_bit.bit().is_some()
            && self.raw_size.bits().is_some_and(|bits| bits > 0)
    }
}

//==================================================================================TEMPLATE
/// Descriptor every occurrence of an entry is built from. Repeat iterations
/// and array elements are fresh instances of a template, never copies of an
/// already placed entry.
#[derive(Debug, Clone)]
pub(crate) struct EntryTemplate<'s> {
    pub kind: EntryKind,
    pub name: String,
    pub holding: String,
    pub typed: Option<TypedObject<'s>>,
    pub conditions: Vec<EntryValue>,
    pub repeat_info: Option<String>,
    pub excluded: bool,
}

impl<'s> EntryTemplate<'s> {
    pub fn typed(kind: EntryKind, typed: TypedObject<'s>, holding: &str) -> Self {
        Self {
            kind,
            name: typed.path().to_owned(),
            holding: holding.to_owned(),
            typed: Some(typed),
            conditions: Vec::new(),
            repeat_info: None,
            excluded: false,
        }
    }

    pub fn structural(kind: EntryKind, name: &str, holding: &str) -> Self {
        Self {
            kind,
            name: name.to_owned(),
            holding: holding.to_owned(),
            typed: None,
            conditions: Vec::new(),
            repeat_info: None,
            excluded: false,
        }
    }

    /// Same template for a child item (member or element) that inherits the
    /// conditions and repeat annotation verbatim.
    pub fn child(&self, typed: TypedObject<'s>) -> Self {
        Self {
            kind: self.kind,
            name: typed.path().to_owned(),
            holding: self.holding.clone(),
            typed: Some(typed),
            conditions: self.conditions.clone(),
            repeat_info: self.repeat_info.clone(),
            excluded: self.excluded,
        }
    }

    /// Same template annotated as one iteration of a repeat or array.
    pub fn with_iteration(&self, own: String) -> Self {
        let repeat_info = match &self.repeat_info {
            Some(inherited) => {
                let mut info = inherited.clone();
                info.push_str(", ");
                info.push_str(&own);
                info
            }
            None => own,
        };
        Self {
            repeat_info: Some(repeat_info),
            ..self.clone()
        }
    }

    /// Build one occurrence: no start bit, no value.
    pub fn instantiate(&self) -> ContentEntry<'s> {
        let raw_size = self
            .typed
            .as_ref()
            .map_or(RawSize::Empty, TypedObject::raw_size);
        ContentEntry {
            kind: self.kind,
            name: self.name.clone(),
            holding: self.holding.clone(),
            typed: self.typed.clone(),
            start_bit: StartBit::Unresolved,
            raw_size,
            value: None,
            default_value: None,
            expected: None,
            conditions: self.conditions.clone(),
            in_use: !self.excluded,
            repeat_info: self.repeat_info.clone(),
        }
    }
}
