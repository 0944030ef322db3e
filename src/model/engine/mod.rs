//! Content-model engine shared by telemetry containers and telecommands.
//!
//! The engine owns the ordered entry list and everything that works on it:
//! condition evaluation against already placed values, start-bit placement,
//! repeat/array sizing, aggregate expansion, extraction from the input buffer,
//! restrictions, the container-end pass, final ordering, overlap detection and
//! encoding. The container and telecommand models only walk their schema
//! objects and call in here.
use alloc::borrow::ToOwned;
use alloc::format;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::ops::Range;

use super::entry::{ContentEntry, EntryKind, EntryTemplate, StartBit};
use super::value::{EntryValue, ItemValue, ValueSource};
use crate::conf::ModelOptions;
use crate::core::{RawBits, RawSize};
use crate::error::{BitWriterError, ContentModelError};
use crate::infra::codec::bits::{BitReader, BitWriter};
use crate::infra::codec::engine::round_to_i64;
use crate::schema::{
    Calibrator, Comparison, ComparisonOperator, Dimension, DynamicValue, EngineeringType,
    IntegerValue, LocationInContainer, MatchCriteria, ReferenceLocation, Schema, SequenceEntry,
    SizeInBits, TypeSet, TypedObject,
};

//==================================================================================WALK_CONTEXT
/// How a level of the walk was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Level {
    /// The container or command the model was built for.
    Root,
    /// Target of a container reference entry.
    Included,
    /// Ancestor reached through a base reference.
    Base,
}

/// What an inclusion passes down to every entry it contains.
#[derive(Debug, Clone, Default)]
pub(crate) struct Inclusion {
    pub conditions: Vec<EntryValue>,
    pub repeat_info: Option<String>,
    pub excluded: bool,
}

impl Inclusion {
    /// Template carrying the inherited state plus the entry's own conditions.
    pub fn template<'s>(
        &self,
        mut template: EntryTemplate<'s>,
        own_conditions: Vec<EntryValue>,
    ) -> EntryTemplate<'s> {
        template.conditions = self.conditions.clone();
        template.conditions.extend(own_conditions);
        template.repeat_info = self.repeat_info.clone();
        template.excluded = self.excluded;
        template
    }
}

//==================================================================================ENGINE
pub struct ContentModelEngine<'s> {
    schema: &'s Schema,
    options: ModelOptions,
    entries: Vec<ContentEntry<'s>>,
    warnings: Vec<String>,
    valid: bool,
    total_size: u64,
    input: Option<RawBits>,
    user_values: Vec<ItemValue>,
    /// Bare argument name → full path, for command models.
    arguments: Vec<(String, String)>,
    /// Set by the first read past the end of the input.
    exhausted: bool,
    /// Containers and commands currently being walked.
    active: Vec<(EntryKind, String)>,
    /// Aggregate and array types currently being expanded.
    active_types: Vec<String>,
}

impl<'s> ContentModelEngine<'s> {
    pub(crate) fn new(
        schema: &'s Schema,
        user_values: Vec<ItemValue>,
        input: Option<RawBits>,
        options: ModelOptions,
    ) -> Self {
        Self {
            schema,
            options,
            entries: Vec::new(),
            warnings: Vec::new(),
            valid: true,
            total_size: 0,
            input,
            user_values,
            arguments: Vec::new(),
            exhausted: false,
            active: Vec::new(),
            active_types: Vec::new(),
        }
    }

    //==============================================================================PUBLIC_VIEW
    /// Resolved entries ordered by start bit.
    pub fn entries(&self) -> &[ContentEntry<'s>] {
        &self.entries
    }

    /// First entry named `path`.
    pub fn entry(&self, path: &str) -> Option<&ContentEntry<'s>> {
        self.entries.iter().find(|e| e.name == path)
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// False once any value conflict was recorded.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn options(&self) -> &ModelOptions {
        &self.options
    }

    /// Rebuild a buffer of `total_size` bits from the entry values, falling
    /// back to initial values. Bits nobody writes stay zero.
    pub fn encode(&self) -> Result<RawBits, BitWriterError> {
        let mut out = RawBits::zeroed(self.total_size as usize);
        let mut writer = BitWriter::new(&mut out);
        for entry in self.entries.iter().filter(|e| e.occupies_bits()) {
            let raw = entry
                .value
                .as_ref()
                .and_then(EntryValue::raw)
                .or_else(|| entry.default_value.as_ref().and_then(EntryValue::raw));
            if let (Some(start), Some(raw)) = (entry.start_bit.bit(), raw) {
                writer.write_bits_at(start as usize, raw)?;
            }
        }
        Ok(out)
    }

    /// Whether `bits` satisfies every literal expectation of the layout
    /// (restrictions, argument assignments, fixed values).
    pub fn is_compatible(&self, bits: &RawBits) -> bool {
        let reader = BitReader::new(bits);
        self.entries
            .iter()
            .filter(|e| e.in_use)
            .all(|e| match (e.start_bit.bit(), &e.expected) {
                (Some(start), Some(expected)) => reader.matches_at(start as usize, expected),
                _ => true,
            })
    }

    //==============================================================================BOOKKEEPING
    pub(crate) fn schema(&self) -> &'s Schema {
        self.schema
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn show_all_conditions(&self) -> bool {
        self.options.show_all_conditions
    }

    pub(crate) fn warn(&mut self, message: String) {
        #[cfg(feature = "defmt")]
        defmt::warn!("{=str}", message.as_str());
        self.warnings.push(message);
    }

    pub(crate) fn push(&mut self, entry: ContentEntry<'s>) {
        #[cfg(feature = "defmt")]
        defmt::trace!("entry {=str} in use: {=bool}", entry.name.as_str(), entry.in_use);
        self.entries.push(entry);
    }

    pub(crate) fn register_argument(&mut self, name: &str, path: String) {
        if !self.arguments.iter().any(|(n, _)| n == name) {
            self.arguments.push((name.to_owned(), path));
        }
    }

    /// Guard against cycles and runaway nesting before walking `path`.
    pub(crate) fn enter(&mut self, kind: EntryKind, path: &str) -> Result<(), ContentModelError> {
        if self.active.iter().any(|(k, p)| *k == kind && p == path) {
            return Err(ContentModelError::CyclicReference {
                path: path.to_owned(),
            });
        }
        if self.active.len() >= self.options.max_nesting_depth {
            return Err(ContentModelError::NestingTooDeep {
                path: path.to_owned(),
                depth: self.options.max_nesting_depth,
            });
        }
        #[cfg(feature = "defmt")]
        defmt::debug!("entering {=str}", path);
        self.active.push((kind, path.to_owned()));
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        self.active.pop();
    }

    //==============================================================================VALUES_AND_CONDITIONS
    /// Full path of an item referenced from `context`. Bare argument names of
    /// the command being walked take precedence over parameters.
    pub(crate) fn resolve_item_path(
        &self,
        reference: &str,
        context: &str,
    ) -> Result<String, ContentModelError> {
        if let Some((_, path)) = self.arguments.iter().find(|(name, _)| name == reference) {
            return Ok(path.clone());
        }
        Ok(self
            .schema
            .resolve_parameter(reference, context)?
            .path()
            .to_owned())
    }

    /// Most recent value placed for `path` (backward scan).
    pub(crate) fn latest_value(&self, path: &str) -> Option<&EntryValue> {
        self.entries
            .iter()
            .rev()
            .filter(|e| e.in_use && e.name == path)
            .find_map(|e| e.value.as_ref())
    }

    pub(crate) fn conditions_hold(&self, conditions: &[EntryValue]) -> bool {
        conditions.iter().all(|condition| {
            self.latest_value(condition.item_path())
                .is_some_and(|actual| condition.satisfied_by(actual))
        })
    }

    /// Comparison list of a criteria; unsupported forms warn and yield none.
    pub(crate) fn conditions_from(
        &mut self,
        criteria: &MatchCriteria,
        context: &str,
        element: &str,
    ) -> Result<Vec<EntryValue>, ContentModelError> {
        let Some(comparisons) = criteria.comparisons() else {
            self.warn(format!(
                "{} criteria in {element} are not supported, ignored",
                criteria.element_name()
            ));
            return Ok(Vec::new());
        };
        comparisons
            .iter()
            .map(|comparison| {
                let path = self.resolve_item_path(&comparison.parameter_ref, context)?;
                Ok(EntryValue::comparison(path, comparison))
            })
            .collect()
    }

    fn comparison_holds(&self, comparison: &Comparison, context: &str) -> bool {
        let Ok(path) = self.resolve_item_path(&comparison.parameter_ref, context) else {
            return false;
        };
        self.latest_value(&path).is_some_and(|actual| {
            EntryValue::comparison(path.as_str(), comparison).satisfied_by(actual)
        })
    }

    /// Calibrator for a value of `typed`: the first context calibrator whose
    /// comparisons all hold, else the default one. Arguments always use the
    /// default calibrator.
    pub(crate) fn select_calibrator(&self, typed: &TypedObject<'s>) -> Option<&'s Calibrator> {
        let default = typed.default_calibrator();
        if typed.type_set() == TypeSet::Argument
            || typed.context_calibrators().is_empty()
            || !self.entries.iter().any(|e| e.value.is_some())
        {
            return default;
        }
        typed
            .context_calibrators()
            .iter()
            .find(|context| {
                context.context.comparisons().is_some_and(|comparisons| {
                    !comparisons.is_empty()
                        && comparisons
                            .iter()
                            .all(|c| self.comparison_holds(c, typed.type_space_system()))
                })
            })
            .map(|context| &context.calibrator)
            .or(default)
    }

    /// Store `value` on `entry`. A second, incompatible value is a conflict:
    /// it is reported, clears `valid`, and the first value stays.
    pub(crate) fn set_value(&mut self, entry: &mut ContentEntry<'s>, value: EntryValue) {
        if let Some(conflict) = merge_value(entry, value) {
            self.valid = false;
            self.warn(conflict);
        }
    }

    //==============================================================================INTEGER_VALUES
    fn dynamic_value(
        &self,
        dynamic: &DynamicValue,
        context: &str,
    ) -> Result<Option<i64>, ContentModelError> {
        let path = self.resolve_item_path(&dynamic.parameter_ref, context)?;
        let Some(value) = self.latest_value(&path) else {
            return Ok(None);
        };
        if value.operator() != ComparisonOperator::Equal {
            return Ok(None);
        }
        let Some(x) = value.as_f64(dynamic.use_calibrated_value) else {
            return Ok(None);
        };
        let x = match dynamic.linear_adjustment {
            Some(adjustment) => adjustment.slope * x + adjustment.intercept,
            None => x,
        };
        Ok(Some(round_to_i64(x)))
    }

    /// Evaluate a literal, dynamic or discrete-lookup integer. `Ok(None)`
    /// means no usable value is available yet.
    pub(crate) fn integer_value(
        &mut self,
        value: &IntegerValue,
        context: &str,
    ) -> Result<Option<i64>, ContentModelError> {
        match value {
            IntegerValue::Fixed(v) => Ok(Some(*v)),
            IntegerValue::Dynamic(dynamic) => self.dynamic_value(dynamic, context),
            IntegerValue::DiscreteLookup(lookups) => {
                for lookup in lookups {
                    let conditions =
                        self.conditions_from(&lookup.criteria, context, "DiscreteLookup")?;
                    if !conditions.is_empty() && self.conditions_hold(&conditions) {
                        return Ok(Some(lookup.value));
                    }
                }
                Ok(None)
            }
        }
    }

    /// Repeat count of `item`; unresolvable counts fall back to 1.
    pub(crate) fn count(&mut self, value: &IntegerValue, context: &str, item: &str) -> u64 {
        let count = match self.integer_value(value, context) {
            Ok(Some(count)) => count,
            Ok(None) => {
                self.warn(format!(
                    "Unable to resolve the count of {item} from {}, assume 1",
                    describe(value)
                ));
                1
            }
            Err(err) => {
                self.warn(format!("Unable to resolve the count of {item}: {err}, assume 1"));
                1
            }
        };
        self.clamp_count(count, item)
    }

    fn clamp_count(&mut self, count: i64, item: &str) -> u64 {
        if count < 0 {
            self.warn(format!("Negative count {count} for {item}, assume 0"));
            return 0;
        }
        let max = self.options.max_repeat_count;
        if count as u64 > max {
            self.warn(format!("Count {count} for {item} exceeds {max}, clamped"));
            return max;
        }
        count as u64
    }

    /// Literal offset of a location; other forms warn and give 0.
    pub(crate) fn fixed_offset(&mut self, value: &IntegerValue, item: &str) -> i64 {
        match value {
            IntegerValue::Fixed(offset) => *offset,
            other => {
                self.warn(format!(
                    "{} location offset of {item} is not supported, assume 0",
                    describe(other)
                ));
                0
            }
        }
    }

    fn resolve_size(&mut self, typed: &TypedObject<'s>) -> RawSize {
        let Some(SizeInBits::Dynamic(dynamic)) = typed.encoding().map(|e| &e.size_in_bits) else {
            return typed.raw_size();
        };
        match self.dynamic_value(dynamic, typed.type_space_system()) {
            Ok(Some(bits)) if bits >= 0 => RawSize::Fixed(bits as u64),
            Ok(_) => {
                self.warn(format!(
                    "Unable to resolve the size of {} from {}",
                    typed.path(),
                    dynamic.parameter_ref
                ));
                RawSize::Dynamic
            }
            Err(err) => {
                self.warn(format!("Unable to resolve the size of {}: {err}", typed.path()));
                RawSize::Dynamic
            }
        }
    }

    //==============================================================================PLACEMENT
    /// Give `entry` its start bit under `location` and move the cursor.
    pub(crate) fn place(
        &mut self,
        entry: &mut ContentEntry<'s>,
        location: Option<&LocationInContainer>,
        cursor: &mut u64,
        container_start: u64,
    ) {
        let size = entry.raw_size.bits().unwrap_or(0);
        let (policy, offset) = match location {
            Some(location) => (
                location.reference_location,
                self.fixed_offset(&location.location, &entry.name),
            ),
            None => (ReferenceLocation::PreviousEntry, 0),
        };
        let origin = match policy {
            ReferenceLocation::PreviousEntry => *cursor,
            ReferenceLocation::ContainerStart => container_start,
            ReferenceLocation::ContainerEnd => {
                entry.start_bit = StartBit::ContainerEnd(offset);
                return;
            }
            ReferenceLocation::NextEntry => {
                self.warn(format!(
                    "nextEntry reference location of {} is not supported",
                    entry.name
                ));
                return;
            }
        };
        let start = origin as i64 + offset;
        if start < 0 {
            self.warn(format!("Negative start bit {start} for {}", entry.name));
            return;
        }
        entry.start_bit = StartBit::Resolved(start as u64);
        *cursor = start as u64 + size;
    }

    //==============================================================================EMISSION
    /// Emit a parameter or argument sequence entry: condition check, repeat
    /// loop, then one occurrence per iteration.
    pub(crate) fn emit_sequence_entry(
        &mut self,
        template: EntryTemplate<'s>,
        entry: &'s SequenceEntry,
        dimensions: Option<&'s [Dimension]>,
        context: &str,
        cursor: &mut u64,
        container_start: u64,
    ) -> Result<(), ContentModelError> {
        let in_use = !template.excluded && self.conditions_hold(&template.conditions);
        if !in_use {
            let mut template = template;
            template.excluded = true;
            return self.emit_item(&template, None, dimensions, context, cursor, container_start);
        }

        let Some(repeat) = &entry.repeat else {
            return self.emit_item(
                &template,
                entry.location.as_ref(),
                dimensions,
                context,
                cursor,
                container_start,
            );
        };
        let count = self.count(&repeat.count, context, &template.name);
        let gap = match &repeat.offset {
            Some(offset) => self.fixed_offset(offset, &template.name).max(0) as u64,
            None => 0,
        };
        for iteration in 0..count {
            let occurrence = template.with_iteration(format!("Repeat {}/{count}", iteration + 1));
            let location = if iteration == 0 {
                entry.location.as_ref()
            } else {
                *cursor += gap;
                None
            };
            self.emit_item(
                &occurrence,
                location,
                dimensions,
                context,
                cursor,
                container_start,
            )?;
        }
        Ok(())
    }

    /// Emit one occurrence of a typed item, expanding aggregates and arrays.
    pub(crate) fn emit_item(
        &mut self,
        template: &EntryTemplate<'s>,
        location: Option<&LocationInContainer>,
        dimensions: Option<&'s [Dimension]>,
        context: &str,
        cursor: &mut u64,
        container_start: u64,
    ) -> Result<(), ContentModelError> {
        let Some(typed) = template.typed.clone() else {
            return Ok(());
        };
        if typed.is_array() || typed.is_aggregate() {
            let key = format!("{}/{}", typed.type_space_system(), typed.data_type().name);
            if self.active_types.contains(&key) {
                self.warn(format!("Recursive type {key} in {}, item skipped", typed.path()));
                return Ok(());
            }
            if self.active_types.len() >= self.options.max_nesting_depth {
                self.warn(format!(
                    "Type nesting deeper than {} levels at {}, item skipped",
                    self.options.max_nesting_depth,
                    typed.path()
                ));
                return Ok(());
            }
            self.active_types.push(key);
            let emitted = self.emit_composite(
                template,
                &typed,
                location,
                dimensions,
                context,
                cursor,
                container_start,
            );
            self.active_types.pop();
            return emitted;
        }

        let mut entry = template.instantiate();
        if !template.excluded {
            entry.raw_size = self.resolve_size(&typed);
            self.place(&mut entry, location, cursor, container_start);
            self.fill_value(&mut entry);
        }
        self.push(entry);
        Ok(())
    }

    /// Aggregate or array parent entry followed by its members or elements.
    #[allow(clippy::too_many_arguments)]
    fn emit_composite(
        &mut self,
        template: &EntryTemplate<'s>,
        typed: &TypedObject<'s>,
        location: Option<&LocationInContainer>,
        dimensions: Option<&'s [Dimension]>,
        context: &str,
        cursor: &mut u64,
        container_start: u64,
    ) -> Result<(), ContentModelError> {
        let in_use = !template.excluded;
        let descend = in_use || self.options.show_all_conditions;

        if typed.is_array() {
            let element = match self.schema.array_element(typed) {
                Ok(element) => element,
                Err(err) => {
                    self.warn(format!("{err}, array {} skipped", typed.path()));
                    return Ok(());
                }
            };
            let mut parent = template.instantiate();
            if in_use {
                self.place_composite(&mut parent, location, cursor, container_start);
            }
            self.push(parent);
            if descend {
                let (dimensions, dimensions_context) = match (dimensions, typed.engineering_type())
                {
                    (Some(dimensions), _) if !dimensions.is_empty() => (dimensions, context),
                    (_, EngineeringType::Array { dimensions, .. }) => {
                        (dimensions.as_slice(), typed.type_space_system())
                    }
                    _ => (&[][..], context),
                };
                self.emit_elements(template, &element, dimensions, dimensions_context, cursor)?;
            }
        } else {
            let mut parent = template.instantiate();
            if in_use {
                self.place_composite(&mut parent, location, cursor, container_start);
            }
            self.push(parent);
            if descend {
                self.emit_members(template, typed, context, cursor)?;
            }
        }
        Ok(())
    }

    /// Aggregates and arrays hold no bits; their children follow them, so a
    /// deferred container-end position cannot apply.
    fn place_composite(
        &mut self,
        entry: &mut ContentEntry<'s>,
        location: Option<&LocationInContainer>,
        cursor: &mut u64,
        container_start: u64,
    ) {
        if location.is_some_and(|l| l.reference_location == ReferenceLocation::ContainerEnd) {
            self.warn(format!(
                "containerEnd reference location of aggregate/array {} is not supported",
                entry.name
            ));
            self.place(entry, None, cursor, container_start);
            return;
        }
        self.place(entry, location, cursor, container_start);
    }

    /// One entry per member, each right after the previous one.
    fn emit_members(
        &mut self,
        template: &EntryTemplate<'s>,
        parent: &TypedObject<'s>,
        context: &str,
        cursor: &mut u64,
    ) -> Result<(), ContentModelError> {
        let EngineeringType::Aggregate { members } = parent.engineering_type() else {
            return Ok(());
        };
        for member in members {
            let typed = match self.schema.member_object(parent, member) {
                Ok(typed) => typed,
                Err(err) => {
                    self.warn(format!("{err}, member skipped"));
                    continue;
                }
            };
            self.emit_item(&template.child(typed), None, None, context, cursor, 0)?;
        }
        Ok(())
    }

    /// One entry per array element, last dimension varying fastest.
    fn emit_elements(
        &mut self,
        template: &EntryTemplate<'s>,
        element: &TypedObject<'s>,
        dimensions: &'s [Dimension],
        context: &str,
        cursor: &mut u64,
    ) -> Result<(), ContentModelError> {
        let in_use = !template.excluded;
        let mut bounds: Vec<(i64, u64)> = Vec::with_capacity(dimensions.len());
        for dimension in dimensions {
            bounds.push(if in_use {
                self.dimension_bounds(dimension, context, &template.name)
            } else {
                let start = match dimension.starting_index {
                    IntegerValue::Fixed(start) => start,
                    _ => 0,
                };
                (start, 1)
            });
        }
        if bounds.is_empty() {
            return Ok(());
        }
        let total = bounds
            .iter()
            .fold(1u64, |acc, (_, count)| acc.saturating_mul(*count));
        let total = self.clamp_count(total.min(i64::MAX as u64) as i64, &template.name);

        let mut index = vec![0u64; bounds.len()];
        for _ in 0..total {
            let mut suffix = String::new();
            for ((start, _), i) in bounds.iter().zip(&index) {
                suffix.push_str(&format!("[{}]", start + *i as i64));
            }
            let name = format!("{}{suffix}", template.name);
            let child = template
                .child(element.renamed(name))
                .with_iteration(format!("Element {suffix} of {}", template.name));
            self.emit_item(&child, None, None, context, cursor, 0)?;

            for (slot, (_, count)) in index.iter_mut().zip(&bounds).rev() {
                *slot += 1;
                if *slot < *count {
                    break;
                }
                *slot = 0;
            }
        }
        Ok(())
    }

    fn dimension_bounds(&mut self, dimension: &Dimension, context: &str, item: &str) -> (i64, u64) {
        let start = match self.integer_value(&dimension.starting_index, context) {
            Ok(Some(start)) => start,
            _ => {
                self.warn(format!("Unable to resolve the starting index of {item}, assume 0"));
                0
            }
        };
        let count = match self.integer_value(&dimension.ending_index, context) {
            Ok(Some(end)) => end - start + 1,
            Ok(None) => {
                self.warn(format!(
                    "Unable to resolve the ending index of {item} from {}, assume 1",
                    describe(&dimension.ending_index)
                ));
                1
            }
            Err(err) => {
                self.warn(format!(
                    "Unable to resolve the ending index of {item}: {err}, assume 1"
                ));
                1
            }
        };
        (start, self.clamp_count(count, item))
    }

    //==============================================================================VALUES
    /// Decode, then apply the caller's value and the initial value. Entries
    /// waiting for the container end get their decoded and caller values in
    /// [`Self::resolve_container_end`], in the same order.
    fn fill_value(&mut self, entry: &mut ContentEntry<'s>) {
        let Some(typed) = entry.typed.clone() else {
            return;
        };
        let calibrator = self.select_calibrator(&typed);
        if !matches!(entry.start_bit, StartBit::ContainerEnd(_)) {
            self.decode_and_apply_user(entry, &typed, calibrator);
        }

        if let Some(initial) = typed.initial_value() {
            let size = entry.raw_size.bits();
            match EntryValue::from_text(&typed, initial, true, calibrator, size, ValueSource::Initial)
            {
                Ok(value) => entry.default_value = Some(value),
                Err(err) => self.warn(format!("Invalid initial value for {}: {err}", entry.name)),
            }
        }
    }

    fn decode_and_apply_user(
        &mut self,
        entry: &mut ContentEntry<'s>,
        typed: &TypedObject<'s>,
        calibrator: Option<&'s Calibrator>,
    ) {
        self.decode_entry(entry, calibrator);
        let Some(user) = self.user_values.iter().find(|v| v.matches(&entry.name)).cloned() else {
            return;
        };
        let size = entry.raw_size.bits();
        match EntryValue::from_text(
            typed,
            &user.value,
            user.use_calibrated,
            calibrator,
            size,
            ValueSource::User,
        ) {
            Ok(value) => self.set_value(entry, value),
            Err(err) => self.warn(format!("Invalid value for {}: {err}", entry.name)),
        }
    }

    /// Check a fixed value against the input, then give it its literal.
    /// A literal the input contradicts is a conflict.
    pub(crate) fn decode_fixed(&mut self, entry: &mut ContentEntry<'s>) {
        let Some(literal) = entry.expected.clone() else {
            return;
        };
        if let (Some(start), Some(size)) = (entry.start_bit.bit(), entry.raw_size.bits()) {
            if size > 0 {
                if let Some(read) = self.extract(start, size, &entry.name) {
                    let decoded = EntryValue::literal(entry.name.as_str(), read)
                        .with_source(ValueSource::Decoded);
                    self.set_value(entry, decoded);
                }
            }
        }
        let value = EntryValue::literal(entry.name.as_str(), literal);
        self.set_value(entry, value);
    }

    /// Read and decode the entry's bits when it has a resolved position.
    pub(crate) fn decode_entry(
        &mut self,
        entry: &mut ContentEntry<'s>,
        calibrator: Option<&'s Calibrator>,
    ) {
        if !entry.occupies_bits() {
            return;
        }
        let (Some(start), Some(size), Some(typed)) = (
            entry.start_bit.bit(),
            entry.raw_size.bits(),
            entry.typed.clone(),
        ) else {
            return;
        };
        let Some(raw) = self.extract(start, size, &entry.name) else {
            return;
        };
        match EntryValue::from_raw(&typed, raw, calibrator) {
            Ok(value) => self.set_value(entry, value),
            Err(err) => self.warn(format!("Unable to decode {}: {err}", entry.name)),
        }
    }

    /// Copy `size` bits at `start` from the input. The first shortfall warns
    /// and yields nothing; following ones silently yield zeros until a read
    /// succeeds again. Fields larger than the whole input never get zeros.
    pub(crate) fn extract(&mut self, start: u64, size: u64, name: &str) -> Option<RawBits> {
        let input = self.input.as_ref()?;
        let available = input.len() as u64;
        let read = BitReader::new(input).read_bits_at(start as usize, size as usize);
        match read {
            Ok(bits) => {
                self.exhausted = false;
                Some(bits)
            }
            Err(_) if self.exhausted && size <= available => Some(RawBits::zeroed(size as usize)),
            Err(_) if self.exhausted => None,
            Err(err) => {
                self.exhausted = true;
                self.warn(format!("Binary data too small for {name}: {err}"));
                None
            }
        }
    }

    //==============================================================================RESTRICTIONS
    /// Apply a derived level's restriction to the entries its ancestors placed
    /// in `range`. `==` comparisons assign a value; the other operators check
    /// the value already there.
    pub(crate) fn apply_restriction(
        &mut self,
        criteria: &MatchCriteria,
        context: &str,
        container: &str,
        range: Range<usize>,
    ) -> Result<(), ContentModelError> {
        let Some(comparisons) = criteria.comparisons() else {
            self.warn(format!(
                "{} restriction criteria in {container} are not supported, ignored",
                criteria.element_name()
            ));
            return Ok(());
        };
        for comparison in comparisons {
            let path = self.resolve_item_path(&comparison.parameter_ref, context)?;
            let index = self
                .find_in(range.clone(), &path, EntryKind::Parameter)
                .ok_or_else(|| ContentModelError::RestrictionTargetNotFound {
                    parameter: path.clone(),
                    container: container.to_owned(),
                })?;

            if comparison.operator != ComparisonOperator::Equal {
                let check = EntryValue::comparison(path.as_str(), comparison);
                let violated = self.entries[index]
                    .value
                    .as_ref()
                    .filter(|actual| !check.satisfied_by(actual))
                    .map(|actual| format!("Value {actual} violates restriction {check} of {container}"));
                if let Some(message) = violated {
                    self.valid = false;
                    self.warn(message);
                }
                continue;
            }
            self.assign_text(
                index,
                &comparison.value,
                comparison.use_calibrated_value,
                ValueSource::Restriction,
            );
        }
        Ok(())
    }

    /// Last entry of `kind` named `path` within `range`.
    pub(crate) fn find_in(&self, range: Range<usize>, path: &str, kind: EntryKind) -> Option<usize> {
        let start = range.start;
        self.entries
            .get(range)?
            .iter()
            .rposition(|e| e.kind == kind && e.name == path && e.typed.is_some())
            .map(|idx| idx + start)
    }

    /// Assign a text value to the already placed entry at `index`.
    pub(crate) fn assign_text(
        &mut self,
        index: usize,
        text: &str,
        use_calibrated: bool,
        source: ValueSource,
    ) {
        let Some(typed) = self.entries[index].typed.clone() else {
            return;
        };
        let calibrator = self.select_calibrator(&typed);
        let size = self.entries[index].raw_size.bits();
        match EntryValue::from_text(&typed, text, use_calibrated, calibrator, size, source) {
            Ok(value) => {
                if let Some(conflict) = merge_value(&mut self.entries[index], value) {
                    self.valid = false;
                    self.warn(conflict);
                }
            }
            Err(err) => self.warn(format!("Invalid value for {}: {err}", typed.path())),
        }
    }

    //==============================================================================FINALIZATION
    /// Resolve `containerEnd` entries placed since `start_index`: the end is
    /// the furthest resolved bit of the level, deferred entries move to the
    /// back of the list in start order and are decoded there.
    pub(crate) fn resolve_container_end(
        &mut self,
        start_index: usize,
        container_start: u64,
        cursor: &mut u64,
    ) {
        let deferred_here = self.entries[start_index..]
            .iter()
            .any(|e| matches!(e.start_bit, StartBit::ContainerEnd(_)));
        if !deferred_here {
            return;
        }
        let end = self.entries[start_index..]
            .iter()
            .filter(|e| e.in_use)
            .filter_map(ContentEntry::end_bit)
            .fold(container_start, u64::max);

        let tail = self.entries.split_off(start_index);
        let (mut deferred, kept): (Vec<_>, Vec<_>) = tail
            .into_iter()
            .partition(|e| matches!(e.start_bit, StartBit::ContainerEnd(_)));
        self.entries.extend(kept);

        for entry in deferred.iter_mut() {
            let StartBit::ContainerEnd(offset) = entry.start_bit else {
                continue;
            };
            let start = end as i64 - offset;
            if start < 0 {
                self.warn(format!("Negative start bit {start} for {}", entry.name));
                entry.start_bit = StartBit::Unresolved;
            } else {
                entry.start_bit = StartBit::Resolved(start as u64);
            }
        }
        deferred.sort_by_key(|e| e.start_bit.bit().unwrap_or(u64::MAX));

        for mut entry in deferred {
            if let Some(typed) = entry.typed.clone() {
                let calibrator = self.select_calibrator(&typed);
                self.decode_and_apply_user(&mut entry, &typed, calibrator);
            } else if entry.kind == EntryKind::FixedValue {
                self.decode_fixed(&mut entry);
            }
            if let Some(entry_end) = entry.end_bit() {
                *cursor = (*cursor).max(entry_end);
            }
            self.push(entry);
        }
    }

    /// Compute the total size, order entries by start bit and report overlaps.
    pub(crate) fn finalize(&mut self, cursor: u64) {
        let furthest = self
            .entries
            .iter()
            .filter(|e| e.in_use)
            .filter_map(ContentEntry::end_bit)
            .max()
            .unwrap_or(0);
        self.total_size = cursor.max(furthest);

        // Unplaced entries keep the key of the entry before them.
        let mut key = 0u64;
        let mut keyed: Vec<(u64, ContentEntry<'s>)> = self
            .entries
            .drain(..)
            .map(|entry| {
                if let Some(bit) = entry.start_bit.bit() {
                    key = bit;
                }
                (key, entry)
            })
            .collect();
        keyed.sort_by_key(|(key, _)| *key);
        self.entries = keyed.into_iter().map(|(_, entry)| entry).collect();

        self.check_overlaps();
    }

    /// Report every bit claimed by more than one entry. Ownership is kept as
    /// disjoint ranges, so the cost follows the number of entries and
    /// overlapping bits, not the field sizes. Bits past the total size, or
    /// past the input when decoding, are not checked.
    fn check_overlaps(&mut self) {
        let limit = match &self.input {
            Some(input) => self.total_size.min(input.len() as u64),
            None => self.total_size,
        };
        // (start, end, owner), sorted by start and disjoint.
        let mut owned: Vec<(u64, u64, usize)> = Vec::new();
        let mut overlaps = Vec::new();
        for (idx, entry) in self.entries.iter().enumerate() {
            if !entry.occupies_bits() {
                continue;
            }
            let (Some(start), Some(end)) = (entry.start_bit.bit(), entry.end_bit()) else {
                continue;
            };
            let end = end.min(limit);
            if start >= end {
                continue;
            }

            let mut free = Vec::new();
            let mut next = start;
            for &(owner_start, owner_end, owner) in &owned {
                if owner_end <= next || owner_start >= end {
                    continue;
                }
                if owner_start > next {
                    free.push((next, owner_start));
                }
                let shared_end = owner_end.min(end);
                for bit in next.max(owner_start)..shared_end {
                    overlaps.push(format!(
                        "Bit {bit} of {} overlaps {}",
                        entry.name, self.entries[owner].name
                    ));
                }
                next = shared_end;
            }
            if next < end {
                free.push((next, end));
            }
            owned.extend(free.into_iter().map(|(s, e)| (s, e, idx)));
            owned.sort_by_key(|(s, _, _)| *s);
        }
        for overlap in overlaps {
            self.warn(overlap);
        }
    }
}

//==================================================================================HELPERS
/// Store `value` unless the entry already holds an incompatible one; returns
/// the conflict message in that case.
fn merge_value(entry: &mut ContentEntry<'_>, value: EntryValue) -> Option<String> {
    if value.is_expectation() && entry.expected.is_none() {
        entry.expected = value.raw().cloned();
    }
    match &entry.value {
        None => {
            entry.value = Some(value);
            None
        }
        Some(existing) if existing.is_compatible(&value) => None,
        Some(existing) => Some(format!(
            "Conflicting values for {}: {existing} and {value}, keeping the first",
            entry.name
        )),
    }
}

fn describe(value: &IntegerValue) -> String {
    match value {
        IntegerValue::Fixed(v) => format!("{v}"),
        IntegerValue::Dynamic(dynamic) => dynamic.parameter_ref.clone(),
        IntegerValue::DiscreteLookup(_) => String::from("DiscreteLookup"),
    }
}
