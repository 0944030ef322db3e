//! Telemetry side: resolve a sequence container into its content model.
use alloc::format;
use alloc::vec::Vec;

use super::engine::{ContentModelEngine, Inclusion, Level};
use super::entry::{EntryKind, EntryTemplate, StartBit};
use super::value::ItemValue;
use crate::conf::ModelOptions;
use crate::core::RawBits;
use crate::error::{ContentModelError, SchemaError};
use crate::infra::codec::traits::ContentModel;
use crate::schema::{
    Dimension, Located, ReferenceLocation, Schema, SequenceContainer, SequenceEntry, SequenceItem,
};

//==================================================================================CONTAINER_MODEL
/// Resolved layout of a sequence container, optionally decoded from a buffer.
///
/// ```rust, ignore
/// let model = ContainerContentModel::new(&schema, "/SC/Housekeeping", Vec::new(), Some(&bits), ModelOptions::default())?;
/// for entry in model.entries() {
///     // start bit, size and decoded value of each field
/// }
/// ```
pub struct ContainerContentModel<'s> {
    engine: ContentModelEngine<'s>,
    container: Located<'s, SequenceContainer>,
}

impl<'s> ContainerContentModel<'s> {
    /// Walk `container_ref` (an absolute path) through its inheritance chain.
    ///
    /// * `user_values` - values to place on matching entries
    /// * `binary` - buffer decoded during the walk
    pub fn new(
        schema: &'s Schema,
        container_ref: &str,
        user_values: Vec<ItemValue>,
        binary: Option<&RawBits>,
        options: ModelOptions,
    ) -> Result<Self, ContentModelError> {
        let container = schema.resolve_container(container_ref, "/")?;
        let mut engine = ContentModelEngine::new(schema, user_values, binary.cloned(), options);
        let mut cursor = 0;
        apply_container(
            &mut engine,
            &container,
            &mut cursor,
            &Inclusion::default(),
            Level::Root,
            &container.path,
        )?;
        engine.finalize(cursor);
        Ok(Self { engine, container })
    }

    pub fn container(&self) -> &'s SequenceContainer {
        self.container.item
    }

    /// Full path of the root container.
    pub fn path(&self) -> &str {
        &self.container.path
    }
}

impl<'s> ContentModel<'s> for ContainerContentModel<'s> {
    fn engine(&self) -> &ContentModelEngine<'s> {
        &self.engine
    }
}

//==================================================================================WALK
/// Walk one container level: its bases first, then its own entries, then its
/// restriction on what the bases placed.
pub(crate) fn apply_container<'s>(
    engine: &mut ContentModelEngine<'s>,
    container: &Located<'s, SequenceContainer>,
    cursor: &mut u64,
    inclusion: &Inclusion,
    level: Level,
    holder: &str,
) -> Result<(), ContentModelError> {
    engine.enter(EntryKind::Container, &container.path)?;
    let walked = walk_container(engine, container, cursor, inclusion, level, holder);
    engine.leave();
    walked
}

fn walk_container<'s>(
    engine: &mut ContentModelEngine<'s>,
    container: &Located<'s, SequenceContainer>,
    cursor: &mut u64,
    inclusion: &Inclusion,
    level: Level,
    holder: &str,
) -> Result<(), ContentModelError> {
    let start_index = engine.len();
    let container_start = *cursor;
    let item: &'s SequenceContainer = container.item;

    if let Some(base) = &item.base_container {
        let base_container = engine
            .schema()
            .resolve_container(&base.container_ref, &container.space_system)?;
        apply_container(
            engine,
            &base_container,
            cursor,
            inclusion,
            Level::Base,
            &container.path,
        )?;
    }
    let base_end = engine.len();

    if level == Level::Base {
        let template = inclusion.template(
            EntryTemplate::structural(EntryKind::Container, &container.path, holder),
            Vec::new(),
        );
        let mut marker = template.instantiate();
        if !inclusion.excluded {
            marker.start_bit = StartBit::Resolved(*cursor);
        }
        engine.push(marker);
    }

    for entry in &item.entries {
        let applied = apply_entry(
            engine,
            entry,
            &container.path,
            &container.space_system,
            cursor,
            container_start,
            inclusion,
        );
        if let Err(err) = applied {
            engine.warn(format!(
                "{err}, {} of {} skipped",
                entry.item.element_name(),
                container.path
            ));
        }
    }

    if let Some(restriction) = item.base_container.as_ref().and_then(|b| b.restriction.as_ref()) {
        if !inclusion.excluded {
            engine.apply_restriction(
                restriction,
                &container.space_system,
                &container.path,
                start_index..base_end,
            )?;
        }
    }

    if level != Level::Base {
        engine.resolve_container_end(start_index, container_start, cursor);
    }
    Ok(())
}

fn apply_entry<'s>(
    engine: &mut ContentModelEngine<'s>,
    entry: &'s SequenceEntry,
    holder: &str,
    space_system: &str,
    cursor: &mut u64,
    container_start: u64,
    inclusion: &Inclusion,
) -> Result<(), ContentModelError> {
    match &entry.item {
        SequenceItem::ParameterRef { parameter_ref } => emit_parameter(
            engine,
            entry,
            parameter_ref,
            None,
            holder,
            space_system,
            cursor,
            container_start,
            inclusion,
        ),
        SequenceItem::ArrayParameterRef {
            parameter_ref,
            dimensions,
        } => emit_parameter(
            engine,
            entry,
            parameter_ref,
            Some(dimensions.as_slice()),
            holder,
            space_system,
            cursor,
            container_start,
            inclusion,
        ),
        SequenceItem::ContainerRef { container_ref } => include_container(
            engine,
            entry,
            container_ref,
            holder,
            space_system,
            cursor,
            container_start,
            inclusion,
        ),
        other => {
            engine.warn(format!(
                "{} is not supported in {holder}, entry ignored",
                other.element_name()
            ));
            Ok(())
        }
    }
}

//==================================================================================PARAMETERS
/// Emit a parameter (or array parameter, when `dimensions` is given) entry.
#[allow(clippy::too_many_arguments)]
pub(crate) fn emit_parameter<'s>(
    engine: &mut ContentModelEngine<'s>,
    entry: &'s SequenceEntry,
    parameter_ref: &str,
    dimensions: Option<&'s [Dimension]>,
    holder: &str,
    space_system: &str,
    cursor: &mut u64,
    container_start: u64,
    inclusion: &Inclusion,
) -> Result<(), ContentModelError> {
    let typed = engine.schema().resolve_parameter(parameter_ref, space_system)?;
    if dimensions.is_some() && !typed.is_array() {
        return Err(SchemaError::NotAnArray {
            item: typed.path().into(),
        }
        .into());
    }
    let own = match &entry.include_condition {
        Some(criteria) => engine.conditions_from(criteria, space_system, holder)?,
        None => Vec::new(),
    };
    let template = inclusion.template(
        EntryTemplate::typed(EntryKind::Parameter, typed, holder),
        own,
    );
    engine.emit_sequence_entry(
        template,
        entry,
        dimensions,
        space_system,
        cursor,
        container_start,
    )
}

//==================================================================================INCLUSIONS
/// Emit a container-reference entry: a marker followed by the target's
/// entries, once per repeat. Excluded inclusions are only walked with
/// `show_all_conditions`, on a scratch cursor.
#[allow(clippy::too_many_arguments)]
pub(crate) fn include_container<'s>(
    engine: &mut ContentModelEngine<'s>,
    entry: &'s SequenceEntry,
    container_ref: &str,
    holder: &str,
    space_system: &str,
    cursor: &mut u64,
    container_start: u64,
    inclusion: &Inclusion,
) -> Result<(), ContentModelError> {
    let target = engine.schema().resolve_container(container_ref, space_system)?;
    let own = match &entry.include_condition {
        Some(criteria) => engine.conditions_from(criteria, space_system, holder)?,
        None => Vec::new(),
    };
    let template = inclusion.template(
        EntryTemplate::structural(EntryKind::Container, &target.path, holder),
        own,
    );
    let in_use = !template.excluded && engine.conditions_hold(&template.conditions);

    let (count, gap) = match (&entry.repeat, in_use) {
        (Some(repeat), true) => {
            let count = engine.count(&repeat.count, space_system, &target.path);
            let gap = match &repeat.offset {
                Some(offset) => engine.fixed_offset(offset, &target.path).max(0) as u64,
                None => 0,
            };
            (count, gap)
        }
        _ => (1, 0),
    };

    let location = match &entry.location {
        Some(location) if !is_sequential(location.reference_location) => {
            if in_use {
                engine.warn(format!(
                    "{:?} reference location of container {} is not supported, assume previousEntry",
                    location.reference_location, target.path
                ));
            }
            None
        }
        location => location.as_ref(),
    };

    for iteration in 0..count {
        let mut occurrence = if in_use && entry.repeat.is_some() {
            template.with_iteration(format!("Repeat {}/{count}", iteration + 1))
        } else {
            template.clone()
        };
        occurrence.excluded = !in_use;

        let mut marker = occurrence.instantiate();
        if in_use {
            if iteration > 0 {
                *cursor += gap;
            }
            let location = if iteration == 0 { location } else { None };
            engine.place(&mut marker, location, cursor, container_start);
        }
        engine.push(marker);

        if !in_use && !engine.show_all_conditions() {
            continue;
        }
        let child = Inclusion {
            conditions: occurrence.conditions.clone(),
            repeat_info: occurrence.repeat_info.clone(),
            excluded: !in_use,
        };
        if in_use {
            apply_container(engine, &target, cursor, &child, Level::Included, holder)?;
        } else {
            let mut scratch = *cursor;
            apply_container(engine, &target, &mut scratch, &child, Level::Included, holder)?;
        }
    }
    Ok(())
}

/// Inclusions can only move the cursor forward from the previous entry or
/// jump to the container start.
fn is_sequential(reference: ReferenceLocation) -> bool {
    matches!(
        reference,
        ReferenceLocation::PreviousEntry | ReferenceLocation::ContainerStart
    )
}
