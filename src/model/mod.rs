//! Content models: the shared engine plus the telemetry and telecommand walks
//! built on top of it.
pub mod container;
pub mod engine;
pub mod entry;
pub mod telecommand;
pub mod value;

pub use container::ContainerContentModel;
pub use engine::ContentModelEngine;
pub use entry::{ContentEntry, EntryKind, StartBit};
pub use telecommand::TelecommandContentModel;
pub use value::{EntryValue, ItemValue, ValueSource};
