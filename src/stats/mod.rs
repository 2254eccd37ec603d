use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::FileStat;

static INSERTIONS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+) insertions?\(\+\)").expect("valid insertions regex"));
static DELETIONS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+) deletions?\(-\)").expect("valid deletions regex"));

const RENAME_ARROW: &str = " => ";

/// Per-file stats keyed by repository-relative path.
pub type StatsByFile = BTreeMap<String, FileStat>;

/// Which "files changed" summary a backend prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsFormat {
    /// `git diff --numstat`: `<added>\t<deleted>\t<path>` per line.
    Numstat,
    /// `hg diff --stat`: `<path> | <N> ++--` per line plus a summary line.
    Histogram,
}

impl StatsFormat {
    /// Total added and deleted lines across all files.
    pub fn totals(self, text: &str) -> FileStat {
        match self {
            StatsFormat::Numstat => parse_numstat(text).into_values().fold(
                FileStat::default(),
                |mut acc, stat| {
                    acc += stat;
                    acc
                },
            ),
            StatsFormat::Histogram => parse_histogram_summary(text),
        }
    }

    /// Added and deleted lines for each file.
    pub fn by_file(self, text: &str) -> StatsByFile {
        match self {
            StatsFormat::Numstat => parse_numstat(text),
            StatsFormat::Histogram => parse_histogram(text),
        }
    }
}

/// Parse `--numstat` output. A `-` count marks a binary file and counts as 0.
pub fn parse_numstat(text: &str) -> StatsByFile {
    let mut result = StatsByFile::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let mut fields = line.splitn(3, '\t');
        let (Some(added), Some(deleted), Some(path)) = (fields.next(), fields.next(), fields.next())
        else {
            continue;
        };

        let path = resolve_rename(path.trim());
        if path.is_empty() {
            continue;
        }
        let stat = FileStat::new(parse_count(added), parse_count(deleted));
        *result.entry(path).or_default() += stat;
    }

    result
}

fn parse_count(field: &str) -> usize {
    match field.trim() {
        "-" => 0,
        n => n.parse().unwrap_or(0),
    }
}

/// Keep only the destination of a rename.
///
/// Handles both `old => new` and the compact `dir/{old => new}/file` form.
fn resolve_rename(path: &str) -> String {
    if !path.contains(RENAME_ARROW) {
        return path.to_string();
    }

    if let (Some(open), Some(close)) = (path.find('{'), path.rfind('}'))
        && open < close
    {
        let inner = &path[open + 1..close];
        let new = inner.rsplit(RENAME_ARROW).next().unwrap_or(inner).trim();
        let joined = format!("{}{}{}", &path[..open], new, &path[close + 1..]);
        return joined.replace("//", "/");
    }

    path.rsplit(RENAME_ARROW)
        .next()
        .unwrap_or(path)
        .trim()
        .to_string()
}

/// A `--stat` summary line such as `3 files changed, 10 insertions(+), 5 deletions(-)`.
fn is_summary_line(line: &str) -> bool {
    line.contains("changed") && (line.contains("insertion") || line.contains("deletion"))
}

/// Totals from the summary line of `--stat` output.
pub fn parse_histogram_summary(text: &str) -> FileStat {
    let Some(summary) = text.lines().find(|line| is_summary_line(line)) else {
        return FileStat::default();
    };

    let capture = |re: &Regex| -> usize {
        re.captures(summary)
            .and_then(|caps| caps[1].parse().ok())
            .unwrap_or(0)
    };

    FileStat::new(capture(&INSERTIONS), capture(&DELETIONS))
}

/// Per-file counts from `--stat` output.
///
/// The number before the bar is only a display scale; the counts are the
/// `+` and `-` characters in the bar itself.
pub fn parse_histogram(text: &str) -> StatsByFile {
    let mut result = StatsByFile::new();

    for line in text.lines() {
        if is_summary_line(line) {
            continue;
        }
        let Some((path, changes)) = line.rsplit_once('|') else {
            continue;
        };
        let path = path.trim();
        if path.is_empty() {
            continue;
        }

        let stat = changes.chars().fold(FileStat::default(), |mut acc, ch| {
            match ch {
                '+' => acc.added += 1,
                '-' => acc.deleted += 1,
                _ => {}
            }
            acc
        });
        result.insert(path.to_string(), stat);
    }

    result
}

/// Sum the stats of every file below directory `dir`.
///
/// The directory must be followed by a separator, so `src/foo` does not
/// cover `src/foobar/b.go`.
pub fn aggregate_under(by_file: &StatsByFile, dir: &str) -> FileStat {
    let prefix = format!("{}/", dir.trim_end_matches('/'));
    by_file
        .iter()
        .filter(|(path, _)| path.starts_with(&prefix))
        .fold(FileStat::default(), |mut acc, (_, stat)| {
            acc += *stat;
            acc
        })
}
