//! Parser for the external tool's line-oriented report.
//!
//! The report format is an unversioned external interface: one candidate
//! finding per line, fields separated by `&` (file paths and symbol names
//! may contain commas and tabs, so neither works as a delimiter). Field
//! counts and kinds are validated defensively on every line.

use std::path::Path;
use tracing::debug;

use scythe_foundation::{DeadCodeKind, DeadCodeOccurrence};

const FIELD_DELIMITER: char = '&';

/// Parse the raw report into ordered findings.
///
/// `repo_root` is the canonical path of the checked-out repository; it is
/// stripped from each file field so stored paths are repository-relative.
/// Order is preserved and no deduplication is applied.
pub fn parse_report(raw: &str, repo_root: &Path) -> Vec<DeadCodeOccurrence> {
    let root_prefix = format!("{}/", repo_root.display());
    raw.lines()
        .filter_map(|line| parse_line(line, &root_prefix))
        .collect()
}

fn parse_line(line: &str, root_prefix: &str) -> Option<DeadCodeOccurrence> {
    if line.trim().is_empty() {
        return None;
    }
    let fields: Vec<&str> = line.split(FIELD_DELIMITER).collect();
    if fields.len() < 4 {
        debug!(line, "Dropping malformed report line");
        return None;
    }

    let kind: DeadCodeKind = fields[0].parse().ok()?;

    // The tool misattributes lambda bodies as unused and reports a
    // synthetic valueOf accessor for enums; both are false positives.
    let name = fields[1];
    if name.contains("lambda") || name.contains(".valueOf.s") {
        return None;
    }

    let line_number: u32 = match fields[3].trim().parse() {
        Ok(number) => number,
        Err(_) => {
            debug!(line, "Dropping report line with non-numeric line number");
            return None;
        }
    };
    let column = fields
        .get(4)
        .and_then(|field| field.trim().parse().ok())
        .unwrap_or(0);

    let file = fields[2]
        .strip_prefix(root_prefix)
        .unwrap_or(fields[2])
        .to_string();

    Some(DeadCodeOccurrence {
        kind,
        name: name.to_string(),
        file,
        line: line_number,
        column,
    })
}
