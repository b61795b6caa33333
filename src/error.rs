//! Error types shared by the catalog, compiler and writers.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    /// `generate` was asked for an identifier the catalog does not know.
    #[error("unknown type `{0}`")]
    UnknownType(String),

    /// A type spec declares something the compiler cannot interpret.
    #[error("malformed spec for `{definition}`: {detail}")]
    MalformedSpec { definition: String, detail: String },

    /// An internal `$ref` points at a definition that was never expanded.
    #[error("definition `{definition}` references `{target}`, which is not defined in the document")]
    DanglingReference { definition: String, target: String },

    /// Writing to disk was requested without an output directory.
    #[error("writing was requested without an output directory")]
    MissingOutputRoot,

    #[error("failed to load catalog `{source_name}`: {detail}")]
    Catalog { source_name: String, detail: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl SchemaError {
    pub(crate) fn malformed(definition: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::MalformedSpec { definition: definition.into(), detail: detail.into() }
    }
}

pub type Result<T, E = SchemaError> = std::result::Result<T, E>;
