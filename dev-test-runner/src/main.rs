//! Sweep the built-in catalog: every type must generate, twice identically,
//! with every `$ref` either resolving locally or naming a catalog document.
use std::process::ExitCode;

use colored::Colorize;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use ztype_schema::{Catalog, Format, SchemaCompiler, SchemaDocument};

static EXTERNAL_REF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(?P<tag>[A-Za-z0-9]+)_)?(?P<doc>Z[1-9]\d*)#/definitions/objects/(?P<key>\w+)$").unwrap()
});

const TAGS: [Option<&str>; 2] = [None, Some("wf")];

fn main() -> ExitCode {
    let catalog = match Catalog::builtin() {
        Ok(catalog) => catalog,
        Err(error) => {
            eprintln!("❌ built-in catalog: {error}");
            return ExitCode::FAILURE;
        }
    };
    let compiler = SchemaCompiler::new(catalog);
    let mut failures = 0usize;
    for tag in TAGS {
        for type_id in compiler.list() {
            match check_type(&compiler, type_id, tag) {
                Ok(count) => eprintln!("✅ {:<4} {type_id:<4} {count} definitions", tag.unwrap_or("-")),
                Err(problem) => {
                    failures += 1;
                    eprintln!("❌ {:<4} {type_id:<4} {}", tag.unwrap_or("-"), problem.red());
                }
            }
        }
    }
    if failures == 0 {
        eprintln!("{}", "all catalog types passed".green());
        ExitCode::SUCCESS
    } else {
        eprintln!("{}", format!("{failures} failure(s)").red());
        ExitCode::FAILURE
    }
}

fn check_type(compiler: &SchemaCompiler, type_id: &str, tag: Option<&str>) -> Result<usize, String> {
    let first = compiler.generate(type_id, tag).map_err(|e| e.to_string())?;
    let second = compiler.generate(type_id, tag).map_err(|e| e.to_string())?;
    let render = |doc: &SchemaDocument| ztype_schema::output::render(doc, Format::Yaml).map_err(|e| e.to_string());
    if render(&first)? != render(&second)? {
        return Err("output differs between runs".into());
    }
    let value = first.to_value().map_err(|e| e.to_string())?;
    let mut refs = Vec::new();
    collect_refs(&value, &mut refs);
    for pointer in refs {
        if pointer.starts_with('#') {
            continue;
        }
        let Some(caps) = EXTERNAL_REF.captures(&pointer) else {
            return Err(format!("malformed external reference {pointer}"));
        };
        if caps.name("tag").map(|m| m.as_str()) != tag {
            return Err(format!("external reference {pointer} has the wrong tag"));
        }
        if compiler.catalog().get(&caps["doc"]).is_none() {
            return Err(format!("external reference {pointer} names an unknown document"));
        }
    }
    Ok(first.objects().len())
}

fn collect_refs(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(pointer)) = map.get("$ref") {
                out.push(pointer.clone());
            }
            map.values().for_each(|v| collect_refs(v, out));
        }
        Value::Array(xs) => xs.iter().for_each(|v| collect_refs(v, out)),
        _ => {}
    }
}
