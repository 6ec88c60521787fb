//! Single-key commands.

use super::{open_existing, CliError, Codec};
use kvbridge_core::{Database, Options, ReadOptions, WriteOptions};
use std::path::Path;

/// Prints the value stored under `key`, or reports it absent.
pub fn get(path: &Path, codec: &Codec, key: &str) -> Result<(), CliError> {
    let db = open_existing(path)?;
    let key = codec.decode(key)?;
    match db.get(ReadOptions::default(), &key)? {
        Some(value) => println!("{}", codec.render(&value)),
        None => eprintln!("(absent)"),
    }
    db.close();
    Ok(())
}

/// Stores `value` under `key`, creating the database if needed.
pub fn put(path: &Path, codec: &Codec, key: &str, value: &str, sync: bool) -> Result<(), CliError> {
    let db = Database::open(path, Options::default())?;
    db.put(WriteOptions { sync }, &codec.decode(key)?, &codec.decode(value)?)?;
    db.close();
    Ok(())
}

/// Deletes `key`.
pub fn delete(path: &Path, codec: &Codec, key: &str, sync: bool) -> Result<(), CliError> {
    let db = open_existing(path)?;
    db.delete(WriteOptions { sync }, &codec.decode(key)?)?;
    db.close();
    Ok(())
}
