use std::env;
use std::fmt;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::str::FromStr;

use thiserror::Error;
use tracing::{debug, warn};

use crate::splitter::{self, Dialect};
use crate::stats::{StatsByFile, StatsFormat};
use crate::{ChangedFile, FileStat, git, hg, parser};

/// Environment variable telling the editor which revision is being reviewed.
pub const TARGET_ENV: &str = "DIFI_TARGET";

#[derive(Debug, Error)]
pub enum VcsError {
    #[error("{0} failed: {1}")]
    CommandFailed(String, String),
    #[error("invalid revision: {0}")]
    InvalidRef(String),
    #[error("unknown VCS backend: {0} (expected git or hg)")]
    UnknownBackend(String),
    #[error("utf-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, VcsError>;

/// The supported version-control tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VcsKind {
    Git,
    Hg,
}

impl VcsKind {
    /// Directory whose presence marks a repository root.
    pub fn marker(self) -> &'static str {
        match self {
            VcsKind::Git => ".git",
            VcsKind::Hg => ".hg",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            VcsKind::Git => "git",
            VcsKind::Hg => "hg",
        }
    }

    pub fn backend(self) -> Box<dyn Vcs> {
        match self {
            VcsKind::Git => Box::new(git::GitVcs),
            VcsKind::Hg => Box::new(hg::HgVcs),
        }
    }
}

impl FromStr for VcsKind {
    type Err = VcsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "git" => Ok(VcsKind::Git),
            "hg" | "mercurial" => Ok(VcsKind::Hg),
            _ => Err(VcsError::UnknownBackend(s.to_string())),
        }
    }
}

impl fmt::Display for VcsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Pick a backend for the current working directory.
pub fn detect() -> VcsKind {
    match env::current_dir() {
        Ok(dir) => detect_from(&dir),
        Err(e) => {
            warn!("cannot read current directory, defaulting to git: {e}");
            VcsKind::Git
        }
    }
}

/// Pick a backend by walking up from `start`.
///
/// The whole ancestor chain is searched for `.git` before any level is
/// checked for `.hg`, so a Git repository further up wins over a closer
/// Mercurial one. With neither marker anywhere, Git is the default.
pub fn detect_from(start: &Path) -> VcsKind {
    for kind in [VcsKind::Git, VcsKind::Hg] {
        if let Some(root) = start
            .ancestors()
            .find(|dir| dir.join(kind.marker()).exists())
        {
            debug!("detected {kind} repository at {}", root.display());
            return kind;
        }
    }
    debug!("no repository marker above {}, defaulting to git", start.display());
    VcsKind::Git
}

/// Capabilities the reviewer needs from a version-control tool.
pub trait Vcs {
    fn kind(&self) -> VcsKind;

    /// Revision compared against when none is given on the command line.
    fn default_target(&self) -> &'static str;

    fn current_branch(&self) -> String;

    fn repo_name(&self) -> String;

    fn list_changed_files(&self, target: &str) -> Result<Vec<ChangedFile>>;

    /// Colourised diff of one file against `target`.
    fn diff(&self, target: &str, path: &str) -> Result<String>;

    /// Raw "files changed" summary in this tool's [`StatsFormat`].
    fn stats_output(&self, target: &str) -> Result<String>;

    fn stats_format(&self) -> StatsFormat;

    /// Delimiter dialect of this tool's whole-tree diff.
    fn dialect(&self) -> Dialect;

    /// Directory the editor is started in, if it must differ from the cwd.
    fn editor_dir(&self) -> Option<PathBuf> {
        None
    }

    /// Like [`Vcs::diff`], but a failure becomes the diff text itself so the
    /// diff pane stays usable.
    fn diff_text(&self, target: &str, path: &str) -> String {
        match self.diff(target, path) {
            Ok(content) => content,
            Err(e) => {
                warn!("diff of {path} against {target} failed: {e}");
                format!("Error fetching diff: {e}")
            }
        }
    }

    fn diff_stats(&self, target: &str) -> Result<FileStat> {
        Ok(self.stats_format().totals(&self.stats_output(target)?))
    }

    fn diff_stats_by_file(&self, target: &str) -> Result<StatsByFile> {
        Ok(self.stats_format().by_file(&self.stats_output(target)?))
    }

    fn calculate_file_line(&self, diff: &str, visual_index: usize) -> usize {
        parser::calculate_file_line(diff, visual_index)
    }

    fn parse_files_from_diff(&self, blob: &str) -> Vec<String> {
        splitter::parse_files_from_diff(blob, self.dialect())
    }

    fn extract_file_diff(&self, blob: &str, target_path: &str) -> String {
        splitter::extract_file_diff(blob, self.dialect(), target_path)
    }

    /// Open `path` in the user's editor, positioned at `line` when non-zero.
    /// Blocks until the editor exits.
    fn open_editor(&self, path: &str, line: usize, target: &str) -> Result<()> {
        let mut cmd = editor_command(&resolve_editor(), path, line, target);
        if let Some(dir) = self.editor_dir() {
            cmd.current_dir(dir);
        }
        // stdin was consumed by a piped diff; give the editor the terminal.
        #[cfg(unix)]
        if !io::stdin().is_terminal()
            && let Ok(tty) = std::fs::File::open("/dev/tty")
        {
            cmd.stdin(tty);
        }
        debug!("opening editor: {cmd:?}");

        let status = cmd.status()?;
        if !status.success() {
            return Err(VcsError::CommandFailed(
                "editor".to_string(),
                format!("exited with {status}"),
            ));
        }
        Ok(())
    }
}

/// Changed paths and their stats for one review session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    /// Paths in the order the tool (or the piped diff) reported them.
    pub files: Vec<String>,
    pub stats: StatsByFile,
}

impl ChangeSet {
    pub fn totals(&self) -> FileStat {
        self.stats.values().fold(FileStat::default(), |mut acc, stat| {
            acc += *stat;
            acc
        })
    }
}

/// Collect the changed files. A piped diff is split locally; otherwise the
/// tool is asked for the file list and per-file stats.
pub fn collect_changes(vcs: &dyn Vcs, target: &str, piped: Option<&str>) -> Result<ChangeSet> {
    if let Some(blob) = piped {
        let files = vcs.parse_files_from_diff(blob);
        let stats = files
            .iter()
            .map(|path| {
                let section = vcs.extract_file_diff(blob, path);
                (path.clone(), parser::count_changes(&section))
            })
            .collect();
        return Ok(ChangeSet { files, stats });
    }

    let files = vcs
        .list_changed_files(target)?
        .into_iter()
        .map(|file| file.path)
        .collect();
    let stats = vcs.diff_stats_by_file(target)?;
    Ok(ChangeSet { files, stats })
}

/// `$EDITOR`, else `nvim` when installed, else `vim`.
pub fn resolve_editor() -> String {
    match env::var("EDITOR") {
        Ok(editor) if !editor.trim().is_empty() => editor,
        _ if which::which("nvim").is_ok() => "nvim".to_string(),
        _ => "vim".to_string(),
    }
}

/// Editor arguments that open `path` at `line`; 0 means no particular line.
pub fn editor_args(path: &str, line: usize) -> Vec<String> {
    let mut args = Vec::with_capacity(2);
    if line > 0 {
        args.push(format!("+{line}"));
    }
    args.push(path.to_string());
    args
}

/// Build the editor invocation. `editor` may carry its own flags
/// (e.g. `code -w`).
pub fn editor_command(editor: &str, path: &str, line: usize, target: &str) -> Command {
    let mut parts = editor.split_whitespace();
    let program = parts.next().unwrap_or("vim");
    let mut cmd = Command::new(program);
    cmd.args(parts)
        .args(editor_args(path, line))
        .env(TARGET_ENV, target);
    cmd
}

/// Run a tool to completion and return its stdout.
///
/// A non-zero exit becomes [`VcsError::CommandFailed`] carrying stderr.
pub fn run(program: &str, args: &[&str], dir: Option<&Path>, envs: &[(&str, &str)]) -> Result<String> {
    let mut cmd = Command::new(program);
    cmd.args(args);
    if let Some(dir) = dir {
        cmd.current_dir(dir);
    }
    for (key, value) in envs {
        cmd.env(key, value);
    }
    debug!("running {program} {}", args.join(" "));

    let output = cmd.output()?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(VcsError::CommandFailed(
            format!("{program} {}", args.first().copied().unwrap_or_default()),
            stderr.trim().to_string(),
        ));
    }

    String::from_utf8(output.stdout).map_err(VcsError::from)
}

/// Reject revisions containing anything other than the characters a
/// branch, tag, hash or revset shorthand uses.
pub fn validate_ref(target: &str) -> Result<()> {
    if target.is_empty() {
        return Err(VcsError::InvalidRef("empty revision".to_string()));
    }
    if target.starts_with('-') {
        return Err(VcsError::InvalidRef(format!("'{target}' looks like an option")));
    }

    for ch in target.chars() {
        if !ch.is_alphanumeric()
            && !matches!(
                ch,
                '-' | '_' | '/' | '.' | '~' | '^' | '@' | ':' | '{' | '}'
            )
        {
            return Err(VcsError::InvalidRef(format!(
                "invalid character in revision: '{ch}'"
            )));
        }
    }

    Ok(())
}

/// Split tool output into one changed file per non-empty line.
pub(crate) fn changed_files_from_lines(stdout: &str) -> Vec<ChangedFile> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ChangedFile::new)
        .collect()
}

/// Last component of a repository root path, or `Repo` when unknown.
pub(crate) fn repo_name_from_root(root: &str) -> String {
    Path::new(root.trim())
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| "Repo".to_string())
}
