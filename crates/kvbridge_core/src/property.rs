//! Diagnostic properties.
//!
//! | Name | Value |
//! |---|---|
//! | `kvbridge.num-entries` | decimal count of live keys |
//! | `kvbridge.approximate-size` | engine file size in bytes |
//! | `kvbridge.options` | one `name: value` line per open option |
//! | `kvbridge.stats` | multi-line session summary |

use crate::database::SessionInner;
use crate::error::Result;
use std::fmt::Write as _;
use std::sync::atomic::Ordering;

/// Live key count.
pub const NUM_ENTRIES: &str = "kvbridge.num-entries";
/// Engine file size.
pub const APPROXIMATE_SIZE: &str = "kvbridge.approximate-size";
/// Open options.
pub const OPTIONS: &str = "kvbridge.options";
/// Session summary.
pub const STATS: &str = "kvbridge.stats";

/// Every supported property name.
pub const ALL: [&str; 4] = [NUM_ENTRIES, APPROXIMATE_SIZE, OPTIONS, STATS];

/// Computes a property. Unknown names are `Ok(None)`.
pub(crate) fn render(session: &SessionInner, name: &[u8]) -> Result<Option<String>> {
    let Ok(name) = std::str::from_utf8(name) else {
        return Ok(None);
    };
    let value = match name {
        NUM_ENTRIES => session.engine().read_view()?.count()?.to_string(),
        APPROXIMATE_SIZE => session.engine().approximate_size()?.to_string(),
        OPTIONS => session.options().describe(),
        STATS => stats(session)?,
        _ => return Ok(None),
    };
    Ok(Some(value))
}

fn stats(session: &SessionInner) -> Result<String> {
    let engine = session.engine();
    let path = engine
        .path()
        .map_or_else(|| "(memory)".to_owned(), |p| p.display().to_string());

    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = writeln!(out, "path: {path}");
    let _ = writeln!(out, "entries: {}", engine.read_view()?.count()?);
    let _ = writeln!(out, "size: {}", engine.approximate_size()?);
    let _ = writeln!(
        out,
        "snapshots: {}",
        session.live_snapshots.load(Ordering::Relaxed)
    );
    let _ = writeln!(
        out,
        "iterators: {}",
        session.live_iterators.load(Ordering::Relaxed)
    );
    Ok(out)
}
