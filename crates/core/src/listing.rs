//! Parser for machine-readable remote directory listings.
//!
//! `cls -1 -B -F -s --block-size=1` prints one entry per line: the size in
//! bytes, then the basename, with a trailing `/` on directories and `@` on
//! symbolic links.

use serde::{Deserialize, Serialize};

/// Kind of a remote entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    File,
    Directory,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::File => "file",
            EntryKind::Directory => "directory",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "file" => Some(EntryKind::File),
            "directory" => Some(EntryKind::Directory),
            _ => None,
        }
    }
}

/// One entry of a remote directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    pub name: String,
    pub kind: EntryKind,
    pub size_bytes: u64,
}

/// Parses listing output. Lines that are not `<size> <name>` are skipped.
pub fn parse_listing(output: &str) -> Vec<RemoteEntry> {
    output.lines().filter_map(parse_line).collect()
}

fn parse_line(line: &str) -> Option<RemoteEntry> {
    let (size, name) = line.trim_start().split_once(char::is_whitespace)?;
    let size_bytes = size.parse().ok()?;
    let name = name.trim_start().trim_end_matches(['\r', '\n']);

    let (name, kind) = if let Some(dir) = name.strip_suffix('/') {
        (dir, EntryKind::Directory)
    } else if let Some(link) = name.strip_suffix('@') {
        (link, EntryKind::File)
    } else {
        (name, EntryKind::File)
    };

    if name.is_empty() || name == "." || name == ".." {
        return None;
    }

    Some(RemoteEntry {
        name: name.to_string(),
        kind,
        size_bytes,
    })
}
