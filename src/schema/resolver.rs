//! Path resolution over the space-system tree and the typed-object view the
//! engine queries for sizes, calibrators and initial values.
use alloc::borrow::ToOwned;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use super::{
    Argument, Calibrator, ContextCalibrator, DataEncoding, DataType, EngineeringType, Member,
    MetaCommand, Parameter, SequenceContainer, SizeInBits, SpaceSystem,
};
use crate::core::RawSize;
use crate::error::SchemaError;

//==================================================================================LOCATED
/// Schema item together with its full path and the path of the space system
/// that owns it (the scope for references the item makes).
#[derive(Debug)]
pub struct Located<'s, T> {
    pub item: &'s T,
    pub path: String,
    pub space_system: String,
}

impl<T> Clone for Located<'_, T> {
    fn clone(&self) -> Self {
        Self {
            item: self.item,
            path: self.path.clone(),
            space_system: self.space_system.clone(),
        }
    }
}

/// Which type set of a space system a type reference is looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeSet {
    Parameter,
    Argument,
}

//==================================================================================TYPED_OBJECT
/// Parameter, argument, member or array element bound to its resolved type.
#[derive(Debug, Clone)]
pub struct TypedObject<'s> {
    path: String,
    data_type: &'s DataType,
    type_space_system: String,
    type_set: TypeSet,
    initial_value: Option<&'s str>,
}

impl<'s> TypedObject<'s> {
    pub(crate) fn new(
        path: String,
        data_type: Located<'s, DataType>,
        type_set: TypeSet,
        initial_value: Option<&'s str>,
    ) -> Self {
        Self {
            path,
            data_type: data_type.item,
            type_space_system: data_type.space_system,
            type_set,
            initial_value,
        }
    }

    /// Full path of the item (`/SS/Param`, `/SS/Param.member`, `/SS/Param[2]`).
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Last path segment.
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    pub fn data_type(&self) -> &'s DataType {
        self.data_type
    }

    /// Path of the space system declaring the type; member and dynamic
    /// references of the type resolve from there.
    pub fn type_space_system(&self) -> &str {
        &self.type_space_system
    }

    pub fn type_set(&self) -> TypeSet {
        self.type_set
    }

    pub fn engineering_type(&self) -> &'s EngineeringType {
        &self.data_type.engineering
    }

    pub fn encoding(&self) -> Option<&'s DataEncoding> {
        self.data_type.encoding.as_ref()
    }

    /// Raw size: `Empty` for aggregates, arrays and types without encoding.
    pub fn raw_size(&self) -> RawSize {
        if self.is_aggregate() || self.is_array() {
            return RawSize::Empty;
        }
        match self.encoding().map(|e| &e.size_in_bits) {
            Some(SizeInBits::Fixed(bits)) => RawSize::Fixed(*bits),
            Some(SizeInBits::Dynamic(_)) => RawSize::Dynamic,
            None => RawSize::Empty,
        }
    }

    /// Item-level initial value, falling back to the type's.
    pub fn initial_value(&self) -> Option<&'s str> {
        self.initial_value
            .or(self.data_type.initial_value.as_deref())
            .filter(|v| !v.is_empty())
    }

    pub fn default_calibrator(&self) -> Option<&'s Calibrator> {
        self.encoding().and_then(|e| e.default_calibrator.as_ref())
    }

    pub fn context_calibrators(&self) -> &'s [ContextCalibrator] {
        self.encoding()
            .map(|e| e.context_calibrators.as_slice())
            .unwrap_or(&[])
    }

    pub fn units(&self) -> Option<&'s str> {
        self.data_type.units.as_deref()
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self.data_type.engineering, EngineeringType::Aggregate { .. })
    }

    pub fn is_array(&self) -> bool {
        matches!(self.data_type.engineering, EngineeringType::Array { .. })
    }

    /// Same type under another path (array elements, repeated members).
    pub(crate) fn renamed(&self, path: String) -> Self {
        Self {
            path,
            data_type: self.data_type,
            type_space_system: self.type_space_system.clone(),
            type_set: self.type_set,
            initial_value: None,
        }
    }
}

//==================================================================================SCHEMA
/// Immutable schema model: the full set of root space systems.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    space_systems: Vec<SpaceSystem>,
}

impl From<Vec<SpaceSystem>> for Schema {
    fn from(space_systems: Vec<SpaceSystem>) -> Self {
        Self::new(space_systems)
    }
}

impl Schema {
    pub fn new(space_systems: Vec<SpaceSystem>) -> Self {
        Self { space_systems }
    }

    pub fn space_systems(&self) -> &[SpaceSystem] {
        &self.space_systems
    }

    /// Resolve a sequence container reference from the scope `context`.
    pub fn resolve_container(
        &self,
        reference: &str,
        context: &str,
    ) -> Result<Located<'_, SequenceContainer>, SchemaError> {
        self.lookup(reference, context, |ss, name| {
            ss.containers.iter().find(|c| c.name == name)
        })
    }

    /// Resolve a meta-command reference from the scope `context`.
    pub fn resolve_meta_command(
        &self,
        reference: &str,
        context: &str,
    ) -> Result<Located<'_, MetaCommand>, SchemaError> {
        self.lookup(reference, context, |ss, name| {
            ss.meta_commands.iter().find(|c| c.name == name)
        })
    }

    /// Resolve a parameter type or argument type reference.
    pub fn resolve_type(
        &self,
        reference: &str,
        context: &str,
        type_set: TypeSet,
    ) -> Result<Located<'_, DataType>, SchemaError> {
        self.lookup(reference, context, |ss, name| {
            let types = match type_set {
                TypeSet::Parameter => &ss.parameter_types,
                TypeSet::Argument => &ss.argument_types,
            };
            types.iter().find(|t| t.name == name)
        })
    }

    /// Resolve a parameter reference to its typed view. A `.member` suffix
    /// (repeatable) descends into aggregate members.
    pub fn resolve_parameter(
        &self,
        reference: &str,
        context: &str,
    ) -> Result<TypedObject<'_>, SchemaError> {
        let found = self.lookup(reference, context, |ss, name| {
            ss.parameters.iter().find(|p| p.name == name)
        });
        match found {
            Ok(parameter) => self.parameter_object(&parameter),
            Err(err) => {
                let Some((head, members)) = split_member_suffix(reference) else {
                    return Err(err);
                };
                let parameter = self.lookup(head, context, |ss, name| {
                    ss.parameters.iter().find(|p| p.name == name)
                })?;
                let mut typed = self.parameter_object(&parameter)?;
                for member_name in members.split('.') {
                    typed = self.member_by_name(&typed, member_name)?;
                }
                Ok(typed)
            }
        }
    }

    /// Typed view of a located parameter.
    pub fn parameter_object<'s>(
        &'s self,
        parameter: &Located<'s, Parameter>,
    ) -> Result<TypedObject<'s>, SchemaError> {
        let data_type = self
            .resolve_type(
                &parameter.item.type_ref,
                &parameter.space_system,
                TypeSet::Parameter,
            )
            .map_err(|_| SchemaError::UnresolvedReference {
                reference: parameter.item.type_ref.clone(),
                context: parameter.path.clone(),
            })?;
        Ok(TypedObject::new(
            parameter.path.clone(),
            data_type,
            TypeSet::Parameter,
            parameter.item.initial_value.as_deref(),
        ))
    }

    /// Typed view of an argument declared by `command`.
    pub fn argument_object<'s>(
        &'s self,
        argument: &'s Argument,
        command: &Located<'s, MetaCommand>,
    ) -> Result<TypedObject<'s>, SchemaError> {
        let path = format!("{}/{}", command.path, argument.name);
        let data_type = self
            .resolve_type(&argument.type_ref, &command.space_system, TypeSet::Argument)
            .map_err(|_| SchemaError::UnresolvedReference {
                reference: argument.type_ref.clone(),
                context: path.clone(),
            })?;
        Ok(TypedObject::new(
            path,
            data_type,
            TypeSet::Argument,
            argument.initial_value.as_deref(),
        ))
    }

    /// Typed view of one member of an aggregate.
    pub fn member_object<'s>(
        &'s self,
        parent: &TypedObject<'s>,
        member: &'s Member,
    ) -> Result<TypedObject<'s>, SchemaError> {
        let path = format!("{}.{}", parent.path(), member.name);
        let data_type = self
            .resolve_type(&member.type_ref, parent.type_space_system(), parent.type_set())
            .map_err(|_| SchemaError::UnresolvedReference {
                reference: member.type_ref.clone(),
                context: path.clone(),
            })?;
        Ok(TypedObject::new(
            path,
            data_type,
            parent.type_set(),
            member.initial_value.as_deref(),
        ))
    }

    /// Follow the array type → element type indirection. The returned view
    /// keeps the array's path; callers rename it per element.
    pub fn array_element<'s>(
        &'s self,
        array: &TypedObject<'s>,
    ) -> Result<TypedObject<'s>, SchemaError> {
        let EngineeringType::Array { array_type_ref, .. } = array.engineering_type() else {
            return Err(SchemaError::NotAnArray {
                item: array.path().to_owned(),
            });
        };
        let element = self
            .resolve_type(array_type_ref, array.type_space_system(), array.type_set())
            .map_err(|_| SchemaError::MissingArrayElementType {
                array: array.path().to_owned(),
                element: array_type_ref.clone(),
            })?;
        Ok(TypedObject::new(
            array.path().to_owned(),
            element,
            array.type_set(),
            None,
        ))
    }

    fn member_by_name<'s>(
        &'s self,
        parent: &TypedObject<'s>,
        member_name: &str,
    ) -> Result<TypedObject<'s>, SchemaError> {
        let unknown = || SchemaError::UnknownMember {
            item: parent.path().to_owned(),
            member: member_name.to_owned(),
        };
        let EngineeringType::Aggregate { members } = parent.engineering_type() else {
            return Err(unknown());
        };
        let member = members
            .iter()
            .find(|m| m.name == member_name)
            .ok_or_else(unknown)?;
        self.member_object(parent, member)
    }

    /// Generic lookup: normalize `reference` against `context`, then let
    /// `pick` find the item by name in the owning space system. Unqualified
    /// names not found in `context` are searched in its ancestors.
    fn lookup<'s, T>(
        &'s self,
        reference: &str,
        context: &str,
        pick: impl Fn(&'s SpaceSystem, &str) -> Option<&'s T>,
    ) -> Result<Located<'s, T>, SchemaError> {
        let unresolved = || SchemaError::UnresolvedReference {
            reference: reference.to_owned(),
            context: context.to_owned(),
        };

        let mut scope: Vec<&str> = segments(context).collect();
        loop {
            let base: &[&str] = if reference.starts_with('/') { &[] } else { &scope };
            if let Some(found) = normalize(base, reference)
                .and_then(|full| self.pick_in(&full, &pick))
            {
                return Ok(found);
            }
            // Only bare names climb the tree.
            if reference.contains('/') || scope.pop().is_none() {
                return Err(unresolved());
            }
        }
    }

    fn pick_in<'s, T>(
        &'s self,
        full: &[String],
        pick: &impl Fn(&'s SpaceSystem, &str) -> Option<&'s T>,
    ) -> Option<Located<'s, T>> {
        let (name, ss_path) = full.split_last()?;
        let space_system = self.find_space_system(ss_path)?;
        let item = pick(space_system, name)?;
        Some(Located {
            item,
            path: join_path(full),
            space_system: join_path(ss_path),
        })
    }

    fn find_space_system(&self, path: &[String]) -> Option<&SpaceSystem> {
        let (first, rest) = path.split_first()?;
        let mut current = self.space_systems.iter().find(|ss| &ss.name == first)?;
        for name in rest {
            current = current.space_systems.iter().find(|ss| &ss.name == name)?;
        }
        Some(current)
    }
}

//==================================================================================PATH_HELPERS
fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Apply `reference` on top of `base`, folding `.` and `..` segments.
fn normalize(base: &[&str], reference: &str) -> Option<Vec<String>> {
    let mut full: Vec<String> = base.iter().map(|s| (*s).to_owned()).collect();
    for part in segments(reference) {
        match part {
            "." => {}
            ".." => {
                full.pop()?;
            }
            name => full.push(name.to_owned()),
        }
    }
    if full.is_empty() {
        None
    } else {
        Some(full)
    }
}

fn join_path(parts: &[String]) -> String {
    let mut out = String::new();
    for part in parts {
        out.push('/');
        out.push_str(part);
    }
    out
}

/// `"a/b/Param.x.y"` → `("a/b/Param", "x.y")`, looking only at the last segment.
fn split_member_suffix(reference: &str) -> Option<(&str, &str)> {
    let last_start = reference.rfind('/').map(|i| i + 1).unwrap_or(0);
    let dot = reference[last_start..].find('.')? + last_start;
    let (head, tail) = (&reference[..dot], &reference[dot + 1..]);
    if head.ends_with('/') || head.is_empty() || tail.is_empty() {
        return None;
    }
    Some((head, tail))
}
