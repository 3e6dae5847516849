// Metadata module
// Tag reading for local audio files

pub mod extractor;
pub mod parser;

pub use extractor::MetadataExtractor;
