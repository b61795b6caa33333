//! Minimal CLI: list | generate | all
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;

use crate::catalog::Catalog;
use crate::document::SchemaCompiler;
use crate::output::{Format, Target};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// compile ZType catalog entries into self-contained JSON-Schema documents
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,

    #[command(flatten)]
    catalog_settings: CatalogSettings,

    /// debug logging (overridden by ZTYPE_SCHEMA_LOG)
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    /// errors only (overridden by ZTYPE_SCHEMA_LOG)
    #[arg(short, long, global = true, default_value_t = false, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// print every type identifier in the catalog
    List,
    /// generate the schema document for one type
    Generate(GenerateOut),
    /// generate schema documents for every catalog type
    All(AllOut),
}

#[derive(Args, Debug, Clone)]
struct CatalogSettings {
    /// Catalog files (YAML, or JSON by extension) replacing the built-in catalog.
    /// May be literal paths or quoted glob patterns; later files override earlier ones.
    #[arg(long, global = true, num_args = 1..)]
    catalog: Vec<String>,
}

#[derive(Args, Debug, Clone)]
struct OutputSettings {
    /// document tag; ids and external references become `<tag>_<typeId>`
    #[arg(long)]
    tag: Option<String>,

    /// output format
    #[arg(long, value_enum, default_value_t = Format::Yaml)]
    format: Format,
}

#[derive(clap::Parser, Debug)]
struct GenerateOut {
    /// type identifier, e.g. Z4
    type_id: String,

    #[command(flatten)]
    output_settings: OutputSettings,

    /// output directory for --write; the document goes to <out>/<TYPE>.<ext>
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// write to --out instead of printing
    #[arg(long, requires = "out")]
    write: bool,
}

#[derive(clap::Parser, Debug)]
struct AllOut {
    #[command(flatten)]
    output_settings: OutputSettings,

    /// output directory
    #[arg(short, long)]
    out: PathBuf,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl CatalogSettings {
    fn load(&self) -> anyhow::Result<Catalog> {
        if self.catalog.is_empty() {
            return Catalog::builtin().context("built-in catalog is invalid");
        }
        let paths = resolve_file_path_patterns(&self.catalog)
            .map_err(|error| anyhow::anyhow!("failed to resolve catalog paths: {error}"))?;
        Ok(Catalog::load_all(&paths)?)
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> anyhow::Result<()> {
        init_tracing(self.quiet, self.verbose)?;
        let compiler = SchemaCompiler::new(self.catalog_settings.load()?);
        match &self.cmd {
            Command::List => {
                for (id, spec) in compiler.catalog().iter() {
                    match &spec.comment {
                        Some(comment) => println!("{}\t{}", id.bold(), comment.dimmed()),
                        None => println!("{}", id.bold()),
                    }
                }
            }
            Command::Generate(target) => {
                let sink = Target::from_options(target.out.clone(), !target.write)?;
                let settings = &target.output_settings;
                let written = compiler
                    .generate_to(&target.type_id, settings.tag.as_deref(), &sink, settings.format)
                    .with_context(|| format!("failed to generate `{}`", target.type_id))?;
                if let Some(path) = written {
                    eprintln!("{} {}", "wrote".green(), path.display());
                }
            }
            Command::All(target) => {
                let settings = &target.output_settings;
                let sink = Target::Directory(target.out.clone());
                let written = compiler
                    .generate_all_to(settings.tag.as_deref(), &sink, settings.format)
                    .context("failed to generate catalog")?;
                eprintln!(
                    "{} {} schemas to {}",
                    "wrote".green(),
                    written.len(),
                    target.out.display(),
                );
            }
        }
        Ok(())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn init_tracing(quiet: bool, verbose: bool) -> anyhow::Result<()> {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env("ZTYPE_SCHEMA_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{' ))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched = glob::glob(pattern)?.collect::<Result<Vec<_>, _>>()?;
            if matched.is_empty() {
                return Err(format!("glob pattern matched no files: {pattern}").into());
            }
            // later catalogs override earlier ones, so the order must be stable
            matched.sort();
            out.extend(matched);
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}
