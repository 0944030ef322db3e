//! Public trait exposed by the content models. It gives telemetry containers
//! and telecommands one uniform read/encode API over the shared engine.
use crate::core::RawBits;
use crate::error::BitWriterError;
use crate::model::engine::ContentModelEngine;
use crate::model::entry::ContentEntry;

//==================================================================================CONTENT_MODEL
/// Implemented by every resolved content model.
///
/// Only [`ContentModel::engine`] is required; everything else reads the
/// engine's result.
///
/// ```rust, ignore
/// let model = ContainerContentModel::new(&schema, "/SC/Packet", Vec::new(), Some(&bits), ModelOptions::default())?;
/// if model.is_valid() && model.warnings().is_empty() {
///     let rebuilt = model.encode()?;
///     assert!(model.is_compatible(&rebuilt));
/// }
/// ```
pub trait ContentModel<'s> {
    /// Engine holding the resolved layout.
    fn engine(&self) -> &ContentModelEngine<'s>;

    /// Entries ordered by start bit. Unplaced entries keep their walk position.
    fn entries<'a>(&'a self) -> &'a [ContentEntry<'s>]
    where
        's: 'a,
    {
        self.engine().entries()
    }

    /// First entry with item path `path`.
    ///
    /// * `path` - full path, e.g. `"/SC/Header/APID"`; array elements carry
    ///   their indices (`"/SC/Table[2]"`) and members their dotted suffix.
    fn entry<'a>(&'a self, path: &str) -> Option<&'a ContentEntry<'s>>
    where
        's: 'a,
    {
        self.engine().entry(path)
    }

    /// Warnings in the order they were raised.
    fn warnings<'a>(&'a self) -> &'a [alloc::string::String]
    where
        's: 'a,
    {
        self.engine().warnings()
    }

    /// False once any value conflict was found.
    fn is_valid(&self) -> bool {
        self.engine().is_valid()
    }

    /// Size of the layout in bits.
    fn total_size(&self) -> u64 {
        self.engine().total_size()
    }

    /// Rebuild the binary form from entry values, falling back to initial
    /// values.
    fn encode(&self) -> Result<RawBits, BitWriterError> {
        self.engine().encode()
    }

    /// Whether `bits` carries every literal the layout expects
    /// (restrictions, argument assignments, fixed values).
    fn is_compatible(&self, bits: &RawBits) -> bool {
        self.engine().is_compatible(bits)
    }
}
