use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing::{debug, warn};

use crate::ChangedFile;
use crate::splitter::Dialect;
use crate::stats::StatsFormat;
use crate::vcs::{self, Result, Vcs, VcsKind, validate_ref};

const HG: &str = "hg";

#[cfg(windows)]
const NULL_DEVICE: &str = "NUL";
#[cfg(not(windows))]
const NULL_DEVICE: &str = "/dev/null";

/// Repository root, resolved once per process. `None` when `hg root` failed,
/// in which case commands run in the current directory.
static REPO_ROOT: OnceLock<Option<PathBuf>> = OnceLock::new();

/// Backend driving the `hg` command line.
///
/// Every invocation ignores user hgrc files (aliases, pagers, extensions
/// could otherwise change the output) and runs from the repository root so
/// reported paths stay root-relative.
#[derive(Debug, Clone, Copy, Default)]
pub struct HgVcs;

fn repo_root() -> Option<&'static Path> {
    REPO_ROOT
        .get_or_init(|| match vcs::run(HG, &["root"], None, &hgrc_env()) {
            Ok(out) => Some(PathBuf::from(out.trim())),
            Err(e) => {
                warn!("hg root failed, running from current directory: {e}");
                None
            }
        })
        .as_deref()
}

fn hgrc_env() -> [(&'static str, &'static str); 1] {
    [("HGRCPATH", NULL_DEVICE)]
}

fn hg(args: &[&str]) -> Result<String> {
    vcs::run(HG, args, repo_root(), &hgrc_env())
}

/// `tip`, `.` and an empty target all mean "compare with the working copy",
/// which hg expresses by omitting `--rev`.
pub fn is_working_copy(target: &str) -> bool {
    matches!(target, "" | "." | "tip")
}

/// `--rev <target>` unless the target is the working copy.
fn rev_args(target: &str) -> Result<Vec<&str>> {
    if is_working_copy(target) {
        return Ok(Vec::new());
    }
    validate_ref(target)?;
    Ok(vec!["--rev", target])
}

fn status_args(target: &str) -> Result<Vec<&str>> {
    let mut args = vec!["status", "--no-status"];
    args.extend(rev_args(target)?);
    Ok(args)
}

fn diff_args<'a>(target: &'a str, path: &'a str) -> Result<Vec<&'a str>> {
    let mut args = vec!["diff", "--color=always"];
    args.extend(rev_args(target)?);
    args.push("--");
    args.push(path);
    Ok(args)
}

fn stat_args(target: &str) -> Result<Vec<&str>> {
    let mut args = vec!["diff"];
    args.extend(rev_args(target)?);
    args.push("--stat");
    Ok(args)
}

impl Vcs for HgVcs {
    fn kind(&self) -> VcsKind {
        VcsKind::Hg
    }

    fn default_target(&self) -> &'static str {
        "."
    }

    fn current_branch(&self) -> String {
        match hg(&["branch"]) {
            Ok(out) if !out.trim().is_empty() => out.trim().to_string(),
            Ok(_) => "default".to_string(),
            Err(e) => {
                debug!("cannot read current branch: {e}");
                "default".to_string()
            }
        }
    }

    fn repo_name(&self) -> String {
        repo_root()
            .map(|root| vcs::repo_name_from_root(&root.to_string_lossy()))
            .unwrap_or_else(|| "Repo".to_string())
    }

    fn list_changed_files(&self, target: &str) -> Result<Vec<ChangedFile>> {
        let out = hg(&status_args(target)?)?;
        Ok(vcs::changed_files_from_lines(&out))
    }

    fn diff(&self, target: &str, path: &str) -> Result<String> {
        hg(&diff_args(target, path)?)
    }

    fn stats_output(&self, target: &str) -> Result<String> {
        hg(&stat_args(target)?)
    }

    fn stats_format(&self) -> StatsFormat {
        StatsFormat::Histogram
    }

    fn dialect(&self) -> Dialect {
        Dialect::Hg
    }

    fn editor_dir(&self) -> Option<PathBuf> {
        repo_root().map(Path::to_path_buf)
    }
}
