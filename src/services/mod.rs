pub mod conversion;
pub mod converter;
pub mod reaper;
pub mod scratch;

pub use conversion::{ConversionService, ConvertedDocument};
pub use converter::{CommandConverter, ConversionError, DocumentConverter};
pub use scratch::{ArtifactGuard, ScratchDir};
