//! Scene-graph importer for posable figure documents.
//!
//! Reads a parsed interchange document ([`source::SourceScene`]) and writes
//! figures, bones, meshes, materials, skin bindings, morphs and animation
//! into any [`target::TargetDocument`].

pub mod convert;
pub mod error;
pub mod host;
pub mod logging;
pub mod settings;
pub mod source;
pub mod target;
pub mod texture;

pub use convert::{
    AcceptDefaults, ImportReport, OptionsPrompt, OptionsRequest, PromptOutcome, Severity,
    ValidationIssue, import_scene,
};
pub use error::ImportError;
pub use logging::{LogLevel, ResultExt, init_logging};
pub use settings::{ImportSettings, SelectionSetMode};
