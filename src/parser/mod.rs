use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{FileStat, ansi};

/// Matches a unified diff hunk header anywhere after an optional prefix:
/// `@@ -old[,count] +new[,count] @@`.
static HUNK_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.*?@@ -(\d+(?:,\d+)?) \+(\d+(?:,\d+)?) @@").expect("valid hunk header regex")
});

/// Prefixes of per-file metadata lines emitted by git and hg before the hunks.
const FILE_META_PREFIXES: &[&str] = &[
    "diff ",
    "index ",
    "--- ",
    "+++ ",
    "new file mode",
    "deleted file mode",
    "old mode",
    "new mode",
    "similarity index",
    "dissimilarity index",
    "rename from",
    "rename to",
    "copy from",
    "copy to",
    "Binary files",
];

/// Classification of one rendered diff line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    HunkHeader,
    Context,
    Addition,
    Deletion,
    FileMeta,
    Other,
}

/// One visual line of diff text. `raw` keeps any colour escapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    pub raw: String,
    pub kind: LineKind,
}

impl DiffLine {
    pub fn new(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            kind: classify(raw),
        }
    }

    /// The line without escape sequences; `raw` is left as is.
    pub fn clean(&self) -> std::borrow::Cow<'_, str> {
        ansi::strip(&self.raw)
    }
}

/// Parsed `@@ -a,b +c,d @@` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HunkHeader {
    pub old_start: usize,
    pub old_count: usize,
    pub new_start: usize,
    pub new_count: usize,
}

/// Parse a hunk header, tolerating colour escapes around it.
pub fn parse_hunk_header(line: &str) -> Option<HunkHeader> {
    let clean = ansi::strip(line);
    let caps = HUNK_HEADER.captures(&clean)?;
    let (old_start, old_count) = parse_range(&caps[1]);
    let (new_start, new_count) = parse_range(&caps[2]);
    Some(HunkHeader {
        old_start,
        old_count,
        new_start,
        new_count,
    })
}

/// The `+N` anchor of a hunk header line, or `None` for any other line.
pub fn hunk_anchor(line: &str) -> Option<usize> {
    parse_hunk_header(line).map(|h| h.new_start)
}

/// Parse a range like "start,count" or "start" (count defaults to 1).
fn parse_range(s: &str) -> (usize, usize) {
    match s.split_once(',') {
        Some((start, count)) => (start.parse().unwrap_or(0), count.parse().unwrap_or(0)),
        None => (s.parse().unwrap_or(0), 1),
    }
}

/// Classify a single (possibly colourised) diff line seen out of context.
pub fn classify(line: &str) -> LineKind {
    classify_with(line, false)
}

/// Inside a hunk, `--- x` is a deleted line rather than a file header.
fn classify_with(line: &str, in_hunk: bool) -> LineKind {
    if hunk_anchor(line).is_some() {
        return LineKind::HunkHeader;
    }
    let clean = ansi::strip(line);
    let first = clean.chars().next();
    let hunk_content = in_hunk && matches!(first, Some('+' | '-' | ' '));
    if !hunk_content && FILE_META_PREFIXES.iter().any(|p| clean.starts_with(p)) {
        return LineKind::FileMeta;
    }
    match first {
        Some('+') => LineKind::Addition,
        Some('-') => LineKind::Deletion,
        Some(' ') => LineKind::Context,
        _ => LineKind::Other,
    }
}

/// Split diff text into classified visual lines.
///
/// Splits on `\n` and keeps a trailing empty segment, so indices line up
/// with [`calculate_file_line`].
pub fn parse_lines(text: &str) -> Vec<DiffLine> {
    let mut in_hunk = false;
    text.split('\n')
        .map(|raw| {
            let kind = classify_with(raw, in_hunk);
            match kind {
                LineKind::HunkHeader => in_hunk = true,
                LineKind::FileMeta => in_hunk = false,
                _ => {}
            }
            DiffLine {
                raw: raw.to_string(),
                kind,
            }
        })
        .collect()
}

/// Map a zero-based visual line index to the 1-based line number in the new
/// version of the file.
///
/// Returns 0 when `visual_index` is past the last line and 1 when no hunk
/// header precedes it. A cursor on a hunk header yields that header's
/// anchor; on a context or added line, the number of that line.
pub fn calculate_file_line(diff: &str, visual_index: usize) -> usize {
    let lines: Vec<&str> = diff.split('\n').collect();
    if visual_index >= lines.len() {
        return 0;
    }

    let mut current = 0usize;
    let mut last_was_hunk = false;

    for line in &lines[..=visual_index] {
        if let Some(anchor) = hunk_anchor(line) {
            current = anchor;
            last_was_hunk = true;
            continue;
        }

        last_was_hunk = false;
        let clean = ansi::strip(line);
        if clean.starts_with(' ') || clean.starts_with('+') {
            current = current.saturating_add(1);
        }
    }

    if current == 0 {
        return 1;
    }
    // The counter has already moved past a counted line; a header is exact.
    if last_was_hunk { current } else { current - 1 }
}

/// Count added and deleted lines in the diff of a single file.
pub fn count_changes(diff: &str) -> FileStat {
    let mut stat = FileStat::default();
    for line in parse_lines(diff) {
        match line.kind {
            LineKind::Addition => stat.added += 1,
            LineKind::Deletion => stat.deleted += 1,
            _ => {}
        }
    }
    stat
}

/// How the diff gutter labels each line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineNumberMode {
    Hidden,
    Relative,
    Absolute,
    #[default]
    Hybrid,
}

impl FromStr for LineNumberMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hidden" => Ok(Self::Hidden),
            "relative" => Ok(Self::Relative),
            "absolute" => Ok(Self::Absolute),
            "hybrid" => Ok(Self::Hybrid),
            other => Err(format!("unknown line number mode: {other}")),
        }
    }
}

impl fmt::Display for LineNumberMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Hidden => "hidden",
            Self::Relative => "relative",
            Self::Absolute => "absolute",
            Self::Hybrid => "hybrid",
        };
        f.write_str(s)
    }
}

/// Gutter label for line `index` with the cursor on line `cursor`.
///
/// `None` in hidden mode. Hybrid shows the real file line on the cursor row
/// and relative distances everywhere else.
pub fn line_label(diff: &str, mode: LineNumberMode, index: usize, cursor: usize) -> Option<String> {
    match mode {
        LineNumberMode::Hidden => None,
        LineNumberMode::Absolute => Some((index + 1).to_string()),
        LineNumberMode::Hybrid if index == cursor => {
            Some(calculate_file_line(diff, cursor).to_string())
        }
        LineNumberMode::Relative | LineNumberMode::Hybrid => {
            Some(index.abs_diff(cursor).to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SINGLE_HUNK: &str = "@@ -10,7 +10,8 @@\n context\n-old\n+new\n+added";

    const HG_DIFF: &str = r#"diff -r 123456 file.go
--- a/file.go	Tue Jan 01 00:00:00 2024 +0000
+++ b/file.go	Tue Jan 01 00:00:01 2024 +0000
@@ -10,7 +10,8 @@
 func main() {
-	fmt.Println("old")
+	fmt.Println("new")
+	fmt.Println("added")
 }
 "#;

    #[test]
    fn single_hunk_line_mapping() {
        assert_eq!(calculate_file_line(SINGLE_HUNK, 0), 10);
        assert_eq!(calculate_file_line(SINGLE_HUNK, 1), 10);
        assert_eq!(calculate_file_line(SINGLE_HUNK, 2), 10);
        assert_eq!(calculate_file_line(SINGLE_HUNK, 3), 11);
        assert_eq!(calculate_file_line(SINGLE_HUNK, 4), 12);
    }

    #[test]
    fn out_of_range_index_returns_zero() {
        assert_eq!(calculate_file_line(SINGLE_HUNK, 5), 0);
        assert_eq!(calculate_file_line(SINGLE_HUNK, 100), 0);
        assert_eq!(calculate_file_line("single line", 10), 0);
    }

    #[test]
    fn empty_diff_falls_back_to_first_line() {
        assert_eq!(calculate_file_line("", 0), 1);
    }

    #[test]
    fn lines_before_first_hunk_fall_back_to_first_line() {
        assert_eq!(calculate_file_line(HG_DIFF, 0), 1);
    }

    #[test]
    fn full_file_diff_mapping() {
        assert_eq!(calculate_file_line(HG_DIFF, 3), 10);
        assert_eq!(calculate_file_line(HG_DIFF, 4), 10);
        assert_eq!(calculate_file_line(HG_DIFF, 5), 10);
        assert_eq!(calculate_file_line(HG_DIFF, 6), 11);
        assert_eq!(calculate_file_line(HG_DIFF, 7), 12);
        assert_eq!(calculate_file_line(HG_DIFF, 8), 13);
    }

    #[test]
    fn second_hunk_resyncs_counter() {
        let diff = "@@ -1,2 +1,2 @@\n a\n+b\n@@ -40,3 +41,3 @@\n x\n-y\n+z";
        assert_eq!(calculate_file_line(diff, 2), 2);
        assert_eq!(calculate_file_line(diff, 3), 41);
        assert_eq!(calculate_file_line(diff, 4), 41);
        assert_eq!(calculate_file_line(diff, 6), 42);
    }

    #[test]
    fn coloured_lines_map_like_plain_ones() {
        let diff = "\x1b[36m@@ -10,7 +10,8 @@\x1b[m\n context\n\x1b[31m-old\x1b[m\n\x1b[32m+new\x1b[m\n\x1b[32m+added\x1b[m";
        for i in 0..5 {
            assert_eq!(
                calculate_file_line(diff, i),
                calculate_file_line(SINGLE_HUNK, i),
                "index {i}"
            );
        }
    }

    #[test]
    fn hunk_header_with_section_heading() {
        let line = "@@ -3,4 +5,6 @@ fn main() {";
        assert_eq!(hunk_anchor(line), Some(5));
        assert_eq!(classify(line), LineKind::HunkHeader);
    }

    #[test]
    fn hunk_header_omitted_counts() {
        let header = parse_hunk_header("@@ -5 +7 @@").unwrap();
        assert_eq!(
            header,
            HunkHeader {
                old_start: 5,
                old_count: 1,
                new_start: 7,
                new_count: 1,
            }
        );
        let header = parse_hunk_header("@@ -0,0 +1,2 @@").unwrap();
        assert_eq!((header.old_count, header.new_start, header.new_count), (0, 1, 2));
    }

    #[test]
    fn malformed_headers_are_not_anchors() {
        assert_eq!(hunk_anchor("@@ garbage @@"), None);
        assert_eq!(hunk_anchor("@@ -1,2 +x @@"), None);
        assert_eq!(hunk_anchor(""), None);
    }

    #[test]
    fn classify_line_kinds() {
        assert_eq!(classify(" ctx"), LineKind::Context);
        assert_eq!(classify("+add"), LineKind::Addition);
        assert_eq!(classify("-del"), LineKind::Deletion);
        assert_eq!(classify("+++ b/file.rs"), LineKind::FileMeta);
        assert_eq!(classify("--- a/file.rs"), LineKind::FileMeta);
        assert_eq!(classify("diff --git a/x b/x"), LineKind::FileMeta);
        assert_eq!(classify("diff -r abc123 x"), LineKind::FileMeta);
        assert_eq!(classify("index 123..456 100644"), LineKind::FileMeta);
        assert_eq!(classify("\\ No newline at end of file"), LineKind::Other);
        assert_eq!(classify(""), LineKind::Other);
        assert_eq!(classify("\x1b[32m+add\x1b[m"), LineKind::Addition);
    }

    #[test]
    fn dashes_inside_a_hunk_are_content() {
        let lines = parse_lines("--- a/q.sql\n+++ b/q.sql\n@@ -1,2 +1,1 @@\n--- old comment\n ctx");
        assert_eq!(lines[0].kind, LineKind::FileMeta);
        assert_eq!(lines[1].kind, LineKind::FileMeta);
        assert_eq!(lines[3].kind, LineKind::Deletion);
        assert_eq!(lines[4].kind, LineKind::Context);
    }

    #[test]
    fn diff_line_keeps_raw_text() {
        let line = DiffLine::new("\x1b[31m-gone\x1b[m");
        assert_eq!(line.kind, LineKind::Deletion);
        assert_eq!(line.clean(), "-gone");
        assert_eq!(line.raw, "\x1b[31m-gone\x1b[m");
    }

    #[test]
    fn parse_lines_keeps_trailing_segment() {
        let lines = parse_lines("@@ -1 +1 @@\n+x\n");
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].kind, LineKind::HunkHeader);
        assert_eq!(lines[1].kind, LineKind::Addition);
        assert_eq!(lines[2].kind, LineKind::Other);
    }

    #[test]
    fn count_changes_ignores_file_headers() {
        let stat = count_changes(HG_DIFF);
        assert_eq!(stat, FileStat::new(2, 1));
        assert_eq!(count_changes(""), FileStat::default());
    }

    #[test]
    fn labels_per_mode() {
        let diff = SINGLE_HUNK;
        assert_eq!(line_label(diff, LineNumberMode::Hidden, 2, 3), None);

        assert_eq!(line_label(diff, LineNumberMode::Relative, 3, 3).as_deref(), Some("0"));
        assert_eq!(line_label(diff, LineNumberMode::Relative, 0, 3).as_deref(), Some("3"));
        assert_eq!(line_label(diff, LineNumberMode::Relative, 4, 3).as_deref(), Some("1"));

        assert_eq!(line_label(diff, LineNumberMode::Absolute, 0, 3).as_deref(), Some("1"));
        assert_eq!(line_label(diff, LineNumberMode::Absolute, 3, 3).as_deref(), Some("4"));

        assert_eq!(line_label(diff, LineNumberMode::Hybrid, 3, 3).as_deref(), Some("11"));
        assert_eq!(line_label(diff, LineNumberMode::Hybrid, 1, 3).as_deref(), Some("2"));
    }

    #[test]
    fn maximal_anchor_saturates_instead_of_overflowing() {
        let diff = format!("@@ -1 +{} @@\n+x", usize::MAX);
        assert_eq!(calculate_file_line(&diff, 0), usize::MAX);
        assert_eq!(calculate_file_line(&diff, 1), usize::MAX - 1);
    }

    #[test]
    fn line_number_mode_from_str() {
        assert_eq!("hybrid".parse::<LineNumberMode>(), Ok(LineNumberMode::Hybrid));
        assert_eq!("Relative".parse::<LineNumberMode>(), Ok(LineNumberMode::Relative));
        assert!("sideways".parse::<LineNumberMode>().is_err());
        assert_eq!(LineNumberMode::Absolute.to_string(), "absolute");
    }
}
