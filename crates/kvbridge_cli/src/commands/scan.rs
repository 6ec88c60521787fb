//! Scan command implementation.

use super::{open_existing, CliError, Codec, Format};
use kvbridge_core::{DbIterator, ReadOptions};
use serde::Serialize;
use std::path::Path;

/// What to scan.
#[derive(Debug, Default)]
pub struct ScanOptions {
    /// First key (forward) or last key (reverse) to include.
    pub start: Option<Vec<u8>>,
    /// Maximum number of entries.
    pub limit: Option<usize>,
    /// Walk from the end.
    pub reverse: bool,
}

/// A scanned entry, rendered for output.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ScanEntry {
    /// Key.
    pub key: String,
    /// Value.
    pub value: String,
}

/// Collects raw entries according to `options`.
pub fn collect(iter: &mut DbIterator, options: &ScanOptions) -> Result<Vec<(Vec<u8>, Vec<u8>)>, CliError> {
    match (&options.start, options.reverse) {
        (Some(start), false) => iter.seek(start)?,
        (None, false) => iter.seek_to_first()?,
        (Some(start), true) => {
            iter.seek(start)?;
            if !iter.valid() {
                iter.seek_to_last()?;
            } else if iter.key() != Some(start.as_slice()) {
                iter.prev()?;
            }
        }
        (None, true) => iter.seek_to_last()?,
    }

    let limit = options.limit.unwrap_or(usize::MAX);
    let mut entries = Vec::new();
    while entries.len() < limit {
        let (Some(key), Some(value)) = (iter.key(), iter.value()) else {
            break;
        };
        entries.push((key.to_vec(), value.to_vec()));
        if options.reverse {
            iter.prev()?;
        } else {
            iter.next()?;
        }
    }
    iter.status()?;
    Ok(entries)
}

/// Runs the scan command.
pub fn run(path: &Path, codec: &Codec, options: &ScanOptions, format: Format) -> Result<(), CliError> {
    let db = open_existing(path)?;
    let mut iter = db.new_iterator(ReadOptions::default().fill_cache(false))?;
    let entries = collect(&mut iter, options)?;
    drop(iter);
    db.close();

    let rendered: Vec<ScanEntry> = entries
        .iter()
        .map(|(key, value)| ScanEntry {
            key: codec.render(key),
            value: codec.render(value),
        })
        .collect();

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&rendered)?),
        Format::Text => {
            for entry in &rendered {
                println!("{} => {}", entry.key, entry.value);
            }
            println!("({} entries)", rendered.len());
        }
    }
    Ok(())
}
