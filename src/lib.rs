//! `xtce-content-model` library: resolves XTCE sequence containers and
//! meta-commands into ordered, bit-exact layouts in a `no_std` environment,
//! and decodes or encodes binary packets with them. The crate exposes the
//! schema model, the bit codec, and the content-model engine.
#![no_std]
extern crate alloc;
//==================================================================================
/// Raw bit strings and sizes shared by the codec and the models.
pub mod core;
/// Model options and numeric limits.
pub mod conf;
/// Schema, value, walk and bit-level errors.
pub mod error;
/// Bit reader/writer, calibrators, scalar encodings and the model trait.
pub mod infra;
/// Content-model engine, entries, values and the container/command walks.
pub mod model;
/// Pre-parsed schema model and reference resolution.
pub mod schema;

#[cfg(test)]
mod test_support;
//==================================================================================
pub use crate::conf::ModelOptions;
pub use crate::core::{RawBits, RawSize};
pub use crate::error::{ContentModelError, SchemaError, ValueError};
pub use crate::infra::codec::traits::ContentModel;
pub use crate::model::{
    ContainerContentModel, ContentEntry, EntryKind, EntryValue, ItemValue, StartBit,
    TelecommandContentModel, ValueSource,
};
pub use crate::schema::Schema;
