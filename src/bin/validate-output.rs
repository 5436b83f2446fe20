use anyhow::{bail, Context, Result};
use clap::Parser;
use compat_ingest::constants::schema_file_name;
use jsonschema::JSONSchema;
use serde_json::Value;
use std::{fs, path::Path, path::PathBuf};

/// Validate a canonical output document against its JSON Schema.
#[derive(Parser, Debug)]
#[command(name = "validate-output", version, about = "Validate an ingest output file against its schema")]
struct Cli {
    /// Path to the document to validate
    path: PathBuf,

    /// Schema file to use instead of the one picked from `schemaVersion`
    #[arg(long)]
    schema: Option<PathBuf>,

    /// Directory holding the bundled schemas
    #[arg(long, default_value = "schemas")]
    schema_dir: PathBuf,
}

fn load_json(path: &Path) -> Result<Value> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let json: Value = serde_json::from_str(data.trim_start_matches('\u{feff}'))
        .with_context(|| format!("Failed to parse JSON in {}", path.display()))?;
    Ok(json)
}

/// Schema file for a document, keyed by `schemaVersion` (or `version` for merged output).
fn schema_file_for(instance: &Value) -> Result<&'static str> {
    let version = instance
        .get("schemaVersion")
        .or_else(|| instance.get("version"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    match schema_file_name(version) {
        Some(file) => Ok(file),
        None => bail!("unrecognized document version {:?}", version),
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();
    let instance = load_json(&args.path)?;
    let schema_path = match args.schema {
        Some(path) => path,
        None => args.schema_dir.join(schema_file_for(&instance)?),
    };
    let schema_json = load_json(&schema_path)?;

    // jsonschema 0.17 expects a schema with 'static lifetime; leak the parsed schema for CLI lifetime
    let schema_static: &'static Value = Box::leak(Box::new(schema_json));

    let compiled = JSONSchema::options()
        .compile(schema_static)
        .context("Failed to compile JSON Schema")?;

    let result = compiled.validate(&instance);
    match result {
        Ok(_) => {
            println!("valid ({})", schema_path.display());
            Ok(())
        }
        Err(errors) => {
            eprintln!("invalid:");
            for error in errors {
                eprintln!("- {} at {}", error, error.instance_path);
            }
            std::process::exit(1)
        }
    }
}
