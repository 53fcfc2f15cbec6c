use std::path::PathBuf;

use thiserror::Error;

use crate::layout::Edge;

/// Problems found while normalizing a process profile or memory request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing required field `{field}` in {context}")]
    MissingField {
        field: &'static str,
        context: String,
    },

    #[error("invalid value for `{field}` in {context}: {reason}")]
    InvalidValue {
        field: &'static str,
        context: String,
        reason: String,
    },

    #[error("memory `{name}`: bank count {banks} is not supported (must be 1 or even)")]
    UnsupportedBankCount { name: String, banks: usize },

    #[error("memory `{name}`: unrecognized banking technique `{technique}`")]
    UnknownBankingTechnique { name: String, technique: String },

    #[error("memory `{name}`: unrecognized port configuration `{ports}`")]
    UnknownPortConfig { name: String, ports: String },

    #[error("memory `{name}`: unrecognized write mode `{mode}`")]
    UnknownWriteMode { name: String, mode: String },
}

#[derive(Debug, Error)]
pub enum CharacterizationError {
    #[error("characterization engine not found at {0:?} (set CACTI_BUILD_DIR or pass --cacti-dir)")]
    EngineNotFound(PathBuf),

    #[error("failed to launch characterization engine: {0}")]
    Launch(#[source] std::io::Error),

    #[error("engine rejected `{name}` at every width from {original} to {last} bits")]
    Exhausted {
        name: String,
        original: usize,
        last: usize,
    },

    #[error("malformed engine output in {path:?}: {reason}")]
    MalformedOutput { path: PathBuf, reason: String },

    #[error("incomplete engine input: {0}")]
    IncompleteInput(#[from] crate::characterize::EngineInputBuilderError),

    #[error("error rendering engine input: {0}")]
    Template(#[from] tera::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error(
        "not enough tracks on the {edge} edge: {pins} pins need placement but only {available} tracks are available"
    )]
    Infeasible {
        edge: Edge,
        pins: usize,
        available: usize,
    },
}
