//! Rendering finished documents and handing them to stdout or disk.
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::document::{SchemaCompiler, SchemaDocument};
use crate::error::{Result, SchemaError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Format {
    #[default]
    Yaml,
    Json,
}

/// Where an emitted document goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Stdout,
    /// `<dir>/<typeId>.<ext>`
    Directory(PathBuf),
}

impl Format {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Yaml => "yaml",
            Self::Json => "json",
        }
    }
}

impl Target {
    /// A dry run always prints; otherwise an output directory is required.
    pub fn from_options(output_root: Option<PathBuf>, dry_run: bool) -> Result<Self> {
        match (output_root, dry_run) {
            (_, true) => Ok(Self::Stdout),
            (Some(dir), false) => Ok(Self::Directory(dir)),
            (None, false) => Err(SchemaError::MissingOutputRoot),
        }
    }
}

/// YAML output starts with the type's catalog comment, when it has one.
pub fn render(doc: &SchemaDocument, format: Format) -> Result<String> {
    match format {
        Format::Yaml => {
            let mut out = String::new();
            if let Some(comment) = &doc.comment {
                out.push_str(&format!("# {comment}\n"));
            }
            out.push_str(&serde_yaml::to_string(doc)?);
            Ok(out)
        }
        Format::Json => {
            let mut out = serde_json::to_string_pretty(doc)?;
            out.push('\n');
            Ok(out)
        }
    }
}

pub fn output_path(dir: &Path, type_id: &str, format: Format) -> PathBuf {
    dir.join(format!("{type_id}.{}", format.extension()))
}

/// Returns the written path, or `None` when printed.
pub fn emit(doc: &SchemaDocument, target: &Target, format: Format) -> Result<Option<PathBuf>> {
    let contents = render(doc, format)?;
    match target {
        Target::Stdout => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(contents.as_bytes())?;
            stdout.flush()?;
            Ok(None)
        }
        Target::Directory(dir) => {
            std::fs::create_dir_all(dir)?;
            let path = output_path(dir, &doc.type_id, format);
            std::fs::write(&path, contents)?;
            tracing::info!(path = %path.display(), "wrote schema");
            Ok(Some(path))
        }
    }
}

impl SchemaCompiler {
    /// Generate `type_id` and emit it. The document is complete and checked
    /// before anything is written.
    pub fn generate_to(
        &self,
        type_id: &str,
        tag: Option<&str>,
        target: &Target,
        format: Format,
    ) -> Result<Option<PathBuf>> {
        let doc = self.generate(type_id, tag)?;
        emit(&doc, target, format)
    }

    /// Generate every catalog type into `target`. Nothing is emitted if any
    /// type fails.
    pub fn generate_all_to(&self, tag: Option<&str>, target: &Target, format: Format) -> Result<Vec<PathBuf>> {
        let docs = self.generate_all(tag)?;
        let mut written = Vec::with_capacity(docs.len());
        for doc in &docs {
            written.extend(emit(doc, target, format)?);
        }
        Ok(written)
    }
}
