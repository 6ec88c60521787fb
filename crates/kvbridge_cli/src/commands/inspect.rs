//! Inspect and property commands.

use super::{open_existing, CliError, Format};
use kvbridge_core::property;
use serde::Serialize;
use std::path::Path;

/// Database inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Database path.
    pub path: String,
    /// Number of live keys.
    pub entries: u64,
    /// Engine file size in bytes.
    pub size_bytes: u64,
    /// Open options as `name: value` pairs.
    pub options: Vec<(String, String)>,
}

fn read_property(db: &kvbridge_core::Database, name: &str) -> String {
    db.get_property(name)
        .map(|v| String::from_utf8_lossy(&v).into_owned())
        .unwrap_or_default()
}

/// Runs the inspect command.
pub fn run(path: &Path, format: Format) -> Result<(), CliError> {
    let db = open_existing(path)?;
    let result = InspectResult {
        path: path.display().to_string(),
        entries: read_property(&db, property::NUM_ENTRIES).parse().unwrap_or(0),
        size_bytes: read_property(&db, property::APPROXIMATE_SIZE)
            .parse()
            .unwrap_or(0),
        options: read_property(&db, property::OPTIONS)
            .lines()
            .filter_map(|line| line.split_once(": "))
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect(),
    };
    db.close();

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        Format::Text => print_text_output(&result),
    }
    Ok(())
}

fn print_text_output(result: &InspectResult) {
    println!("Database: {}", result.path);
    println!("Entries:  {}", result.entries);
    println!("Size:     {} bytes", result.size_bytes);
    println!("Options:");
    for (name, value) in &result.options {
        println!("  {name:<18} {value}");
    }
}

/// Prints one property, or the list of known names if it is unknown.
pub fn property(path: &Path, name: &str) -> Result<(), CliError> {
    let db = open_existing(path)?;
    match db.get_property(name) {
        Some(value) => print!("{}", String::from_utf8_lossy(&value)),
        None => {
            eprintln!("unknown property {name}; known: {}", property::ALL.join(", "));
        }
    }
    db.close();
    Ok(())
}
