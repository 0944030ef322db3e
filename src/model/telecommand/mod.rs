//! Command side: resolve a meta-command into its content model.
//!
//! Commands inherit along `base_meta_command`. Each level may carry a command
//! container whose own base container is walked as a telemetry container, and
//! each derived level fixes some of its ancestors' arguments through argument
//! assignments.
use alloc::borrow::ToOwned;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use super::container::{apply_container, emit_parameter, include_container};
use super::engine::{ContentModelEngine, Inclusion, Level};
use super::entry::{EntryKind, EntryTemplate, StartBit};
use super::value::{ItemValue, ValueSource};
use crate::conf::ModelOptions;
use crate::core::{RawBits, RawSize};
use crate::error::{ContentModelError, SchemaError};
use crate::infra::codec::traits::ContentModel;
use crate::schema::{Argument, Located, MetaCommand, Schema, SequenceEntry, SequenceItem};

//==================================================================================TELECOMMAND_MODEL
/// Resolved layout of a meta-command.
pub struct TelecommandContentModel<'s> {
    engine: ContentModelEngine<'s>,
    command: Located<'s, MetaCommand>,
}

impl<'s> TelecommandContentModel<'s> {
    /// Walk `command_ref` (an absolute path) through its base commands.
    ///
    /// Argument values usually come from `user_values`; `binary` is decoded
    /// when given, e.g. to inspect a recorded command.
    pub fn new(
        schema: &'s Schema,
        command_ref: &str,
        user_values: Vec<ItemValue>,
        binary: Option<&RawBits>,
        options: ModelOptions,
    ) -> Result<Self, ContentModelError> {
        let command = schema.resolve_meta_command(command_ref, "/")?;
        let mut engine = ContentModelEngine::new(schema, user_values, binary.cloned(), options);
        register_arguments(&mut engine, &command);

        let mut cursor = 0;
        apply_command(&mut engine, &command, &mut cursor, Level::Root, &command.path)?;
        engine.finalize(cursor);
        Ok(Self { engine, command })
    }

    pub fn command(&self) -> &'s MetaCommand {
        self.command.item
    }

    /// Full path of the root command.
    pub fn path(&self) -> &str {
        &self.command.path
    }
}

impl<'s> ContentModel<'s> for TelecommandContentModel<'s> {
    fn engine(&self) -> &ContentModelEngine<'s> {
        &self.engine
    }
}

/// Make bare argument names of the whole chain resolvable in conditions and
/// dynamic sizes. Derived commands shadow their bases.
fn register_arguments<'s>(engine: &mut ContentModelEngine<'s>, command: &Located<'s, MetaCommand>) {
    let mut current = command.clone();
    for _ in 0..engine.options().max_nesting_depth {
        let item: &'s MetaCommand = current.item;
        for argument in &item.arguments {
            engine.register_argument(&argument.name, argument_path(&current, argument));
        }
        let Some(base) = &item.base_meta_command else {
            return;
        };
        // An unresolvable base is reported by the walk itself.
        match engine
            .schema()
            .resolve_meta_command(&base.command_ref, &current.space_system)
        {
            Ok(next) => current = next,
            Err(_) => return,
        }
    }
}

fn argument_path(command: &Located<'_, MetaCommand>, argument: &Argument) -> String {
    format!("{}/{}", command.path, argument.name)
}

/// Find the declaration of argument `name` in `command` or its bases.
fn find_argument<'s>(
    engine: &ContentModelEngine<'s>,
    command: &Located<'s, MetaCommand>,
    name: &str,
) -> Result<(&'s Argument, Located<'s, MetaCommand>), ContentModelError> {
    let mut current = command.clone();
    for _ in 0..engine.options().max_nesting_depth {
        let item: &'s MetaCommand = current.item;
        if let Some(argument) = item.arguments.iter().find(|a| a.name == name) {
            return Ok((argument, current));
        }
        let Some(base) = &item.base_meta_command else {
            break;
        };
        current = engine
            .schema()
            .resolve_meta_command(&base.command_ref, &current.space_system)?;
    }
    Err(SchemaError::UnresolvedReference {
        reference: name.to_owned(),
        context: command.path.clone(),
    }
    .into())
}

//==================================================================================WALK
fn apply_command<'s>(
    engine: &mut ContentModelEngine<'s>,
    command: &Located<'s, MetaCommand>,
    cursor: &mut u64,
    level: Level,
    holder: &str,
) -> Result<(), ContentModelError> {
    engine.enter(EntryKind::CommandContainer, &command.path)?;
    let walked = walk_command(engine, command, cursor, level, holder);
    engine.leave();
    walked
}

fn walk_command<'s>(
    engine: &mut ContentModelEngine<'s>,
    command: &Located<'s, MetaCommand>,
    cursor: &mut u64,
    level: Level,
    holder: &str,
) -> Result<(), ContentModelError> {
    let start_index = engine.len();
    let container_start = *cursor;
    let item: &'s MetaCommand = command.item;

    let mut base_command = None;
    if let Some(base) = &item.base_meta_command {
        let located = engine
            .schema()
            .resolve_meta_command(&base.command_ref, &command.space_system)?;
        apply_command(engine, &located, cursor, Level::Base, &command.path)?;
        base_command = Some((located, base));
    }
    let base_end = engine.len();

    if level == Level::Base {
        let mut marker =
            EntryTemplate::structural(EntryKind::CommandContainer, &command.path, holder)
                .instantiate();
        marker.start_bit = StartBit::Resolved(*cursor);
        engine.push(marker);
    }

    if let Some(command_container) = &item.command_container {
        let mut restriction = None;
        if let Some(base) = &command_container.base_container {
            let container = engine
                .schema()
                .resolve_container(&base.container_ref, &command.space_system)?;
            let before = engine.len();
            apply_container(
                engine,
                &container,
                cursor,
                &Inclusion::default(),
                Level::Base,
                &command.path,
            )?;
            restriction = base.restriction.as_ref().map(|r| (r, before..engine.len()));
        }

        for (index, entry) in command_container.entries.iter().enumerate() {
            let applied = apply_entry(engine, command, entry, index, cursor, container_start);
            if let Err(err) = applied {
                engine.warn(format!(
                    "{err}, {} of {} skipped",
                    entry.item.element_name(),
                    command.path
                ));
            }
        }

        if let Some((criteria, range)) = restriction {
            engine.apply_restriction(criteria, &command.space_system, &command.path, range)?;
        }
    }

    if let Some((base_located, base)) = &base_command {
        for assignment in &base.argument_assignments {
            let (argument, owner) = find_argument(engine, base_located, &assignment.argument_name)?;
            let path = argument_path(&owner, argument);
            let index = engine
                .find_in(start_index..base_end, &path, EntryKind::Argument)
                .ok_or_else(|| ContentModelError::AssignmentTargetNotFound {
                    argument: path.clone(),
                    command: command.path.clone(),
                })?;
            engine.assign_text(
                index,
                &assignment.argument_value,
                true,
                ValueSource::Assignment,
            );
        }
    }

    if level != Level::Base {
        engine.resolve_container_end(start_index, container_start, cursor);
    }
    Ok(())
}

fn apply_entry<'s>(
    engine: &mut ContentModelEngine<'s>,
    command: &Located<'s, MetaCommand>,
    entry: &'s SequenceEntry,
    index: usize,
    cursor: &mut u64,
    container_start: u64,
) -> Result<(), ContentModelError> {
    let inclusion = Inclusion::default();
    let holder = command.path.as_str();
    let space_system = command.space_system.as_str();
    match &entry.item {
        SequenceItem::ArgumentRef { argument_ref } => {
            let (argument, owner) = find_argument(engine, command, argument_ref)?;
            let typed = engine.schema().argument_object(argument, &owner)?;
            let own = match &entry.include_condition {
                Some(criteria) => engine.conditions_from(criteria, space_system, holder)?,
                None => Vec::new(),
            };
            let template =
                inclusion.template(EntryTemplate::typed(EntryKind::Argument, typed, holder), own);
            engine.emit_sequence_entry(
                template,
                entry,
                None,
                space_system,
                cursor,
                container_start,
            )
        }
        SequenceItem::ParameterRef { parameter_ref } => emit_parameter(
            engine,
            entry,
            parameter_ref,
            None,
            holder,
            space_system,
            cursor,
            container_start,
            &inclusion,
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
            &inclusion,
        ),
        SequenceItem::ContainerRef { container_ref } => include_container(
            engine,
            entry,
            container_ref,
            holder,
            space_system,
            cursor,
            container_start,
            &inclusion,
        ),
        SequenceItem::FixedValue {
            name,
            size_in_bits,
            binary_value,
        } => {
            let name = match name {
                Some(name) => format!("{holder}/{name}"),
                None => format!("{holder}/FixedValue[{index}]"),
            };
            emit_fixed_value(
                engine,
                entry,
                name,
                *size_in_bits,
                binary_value,
                command,
                cursor,
                container_start,
            )
        }
        other => {
            engine.warn(format!(
                "{} is not supported in {holder}, entry ignored",
                other.element_name()
            ));
            Ok(())
        }
    }
}

//==================================================================================FIXED_VALUES
/// Literal bits of a command. Decoding them from a buffer that holds
/// something else is a value conflict.
#[allow(clippy::too_many_arguments)]
fn emit_fixed_value<'s>(
    engine: &mut ContentModelEngine<'s>,
    entry: &'s SequenceEntry,
    name: String,
    size_in_bits: u64,
    binary_value: &str,
    command: &Located<'s, MetaCommand>,
    cursor: &mut u64,
    container_start: u64,
) -> Result<(), ContentModelError> {
    let literal = RawBits::from_hex(binary_value)
        .ok_or_else(|| ContentModelError::MalformedNumber {
            item: name.clone(),
            text: binary_value.to_owned(),
        })?
        .fitted(size_in_bits as usize);
    if entry.repeat.is_some() {
        engine.warn(format!("Repeat of fixed value {name} is not supported, assume 1"));
    }
    let mut template = EntryTemplate::structural(EntryKind::FixedValue, &name, &command.path);
    if let Some(criteria) = &entry.include_condition {
        template.conditions =
            engine.conditions_from(criteria, &command.space_system, &command.path)?;
    }
    template.excluded = !engine.conditions_hold(&template.conditions);

    let mut fixed = template.instantiate();
    fixed.raw_size = RawSize::Fixed(size_in_bits);
    if fixed.in_use {
        engine.place(&mut fixed, entry.location.as_ref(), cursor, container_start);
        fixed.expected = Some(literal);
        // Container-end literals are checked once their start is known.
        if !matches!(fixed.start_bit, StartBit::ContainerEnd(_)) {
            engine.decode_fixed(&mut fixed);
        }
    }
    engine.push(fixed);
    Ok(())
}
