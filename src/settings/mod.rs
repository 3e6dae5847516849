// Settings module
// Application configuration stored as JSON in the data directory

pub mod settings;

pub use settings::{AppSettings, CatalogSettings, LibrarySettings, QueueSettings};
