use std::collections::HashSet;

use crate::ansi;

/// Per-tool shape of the line that opens each file's section in a
/// whole-tree diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// `diff --git a/<old> b/<new>`
    Git,
    /// `diff -r <rev> [-r <rev>] <path>`
    Hg,
}

impl Dialect {
    /// The file path named by a delimiter line, or `None` if `line` is not one.
    pub fn delimiter_path(self, line: &str) -> Option<String> {
        let clean = ansi::strip(line);
        match self {
            Dialect::Git => {
                let rest = clean.strip_prefix("diff --git ")?.trim_end();
                if let Some(path) = unchanged_git_path(rest) {
                    return Some(path.to_string());
                }
                match rest.rsplit_once(" b/") {
                    Some((_, path)) => Some(path.to_string()),
                    None => rest.split_whitespace().last().map(str::to_string),
                }
            }
            Dialect::Hg => {
                if !clean.starts_with("diff -r ") {
                    return None;
                }
                let parts: Vec<&str> = clean.split_whitespace().collect();
                // "diff -r <rev> <path>" has at least three fields
                if parts.len() >= 3 {
                    parts.last().map(|p| p.to_string())
                } else {
                    None
                }
            }
        }
    }
}

/// The path of an `a/<path> b/<path>` header whose halves agree. Splitting
/// at the midpoint keeps paths containing " b/" intact.
fn unchanged_git_path(rest: &str) -> Option<&str> {
    if rest.len() % 2 == 0 {
        return None;
    }
    let mid = rest.len() / 2;
    if !rest.is_char_boundary(mid) {
        return None;
    }
    let (old, new) = rest.split_at(mid);
    let old = old.strip_prefix("a/")?;
    let new = new.strip_prefix(" b/")?;
    (old == new).then_some(new)
}

/// Distinct file paths in a multi-file diff, in order of first appearance.
pub fn parse_files_from_diff(blob: &str, dialect: Dialect) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut files = Vec::new();

    for line in blob.split('\n') {
        if let Some(path) = dialect.delimiter_path(line)
            && seen.insert(path.clone())
        {
            files.push(path);
        }
    }

    files
}

/// The part of `blob` that belongs to `target`, delimiter lines included.
///
/// Every delimiter line re-evaluates whether the following lines are kept,
/// so if `target` appears in several non-adjacent sections they are all
/// concatenated. Returns an empty string when `target` never appears.
pub fn extract_file_diff(blob: &str, dialect: Dialect, target: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut in_target = false;

    for line in blob.split('\n') {
        if let Some(path) = dialect.delimiter_path(line) {
            in_target = path == target;
        }
        if in_target {
            out.push(line);
        }
    }

    out.join("\n")
}
