//! Compile a catalog of ZType specs into self-contained JSON-Schema documents.
//!
//! Pipeline per `generate` call: catalog lookup → reference normalization →
//! worklist expansion (materializing generic specializations on demand) →
//! document assembly and closure check → rendering.
pub mod catalog;
pub mod cli;
pub mod document;
pub mod error;
pub mod expand;
pub mod ir;
pub mod normalize;
pub mod output;
pub mod path_de;
pub mod pointer;
pub mod specialize;

pub use catalog::{Catalog, RawSpec};
pub use document::{SchemaCompiler, SchemaDocument};
pub use error::SchemaError;
pub use output::{Format, Target};
