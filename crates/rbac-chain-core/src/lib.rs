pub mod analyzer;
pub mod baseline;
pub mod config;
pub mod error;
pub mod graph;
pub mod manifest;
pub mod relationships;

pub use analyzer::report::{AnalysisReport, Finding, FindingCategory, Severity};
pub use baseline::Baseline;
pub use config::ScanConfig;
pub use error::ScanError;
pub use manifest::loader::ManifestLoader;
pub use manifest::ManifestSet;
pub use relationships::{BindingScope, Relationships, SaGrant};
