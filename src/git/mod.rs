use std::path::PathBuf;

use tracing::debug;

use crate::ChangedFile;
use crate::splitter::Dialect;
use crate::stats::StatsFormat;
use crate::vcs::{self, Result, Vcs, VcsKind, validate_ref};

const GIT: &str = "git";

/// Backend driving the `git` command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitVcs;

/// Find the root of the git repository.
pub fn find_repo_root() -> Result<PathBuf> {
    let root = vcs::run(GIT, &["rev-parse", "--show-toplevel"], None, &[])?;
    Ok(PathBuf::from(root.trim()))
}

fn name_only_args(target: &str) -> Vec<&str> {
    vec!["diff", "--name-only", target]
}

// `:(top)` anchors the pathspec at the repository root, matching the
// root-relative paths `--name-only` reports even when run from a subdirectory.
// `literal` keeps glob characters in file names from matching other files.
fn diff_args(target: &str, pathspec: &str) -> Vec<String> {
    vec![
        "diff".to_string(),
        "--color=always".to_string(),
        target.to_string(),
        "--".to_string(),
        format!(":(top,literal){pathspec}"),
    ]
}

fn numstat_args(target: &str) -> Vec<&str> {
    vec!["diff", "--numstat", target]
}

impl Vcs for GitVcs {
    fn kind(&self) -> VcsKind {
        VcsKind::Git
    }

    fn default_target(&self) -> &'static str {
        "HEAD"
    }

    fn current_branch(&self) -> String {
        match vcs::run(GIT, &["rev-parse", "--abbrev-ref", "HEAD"], None, &[]) {
            Ok(out) if !out.trim().is_empty() => out.trim().to_string(),
            Ok(_) => "HEAD".to_string(),
            Err(e) => {
                debug!("cannot read current branch: {e}");
                "HEAD".to_string()
            }
        }
    }

    fn repo_name(&self) -> String {
        match find_repo_root() {
            Ok(root) => vcs::repo_name_from_root(&root.to_string_lossy()),
            Err(e) => {
                debug!("cannot find repository root: {e}");
                "Repo".to_string()
            }
        }
    }

    fn list_changed_files(&self, target: &str) -> Result<Vec<ChangedFile>> {
        validate_ref(target)?;
        let out = vcs::run(GIT, &name_only_args(target), None, &[])?;
        Ok(vcs::changed_files_from_lines(&out))
    }

    fn diff(&self, target: &str, path: &str) -> Result<String> {
        validate_ref(target)?;
        let args = diff_args(target, path);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        vcs::run(GIT, &args, None, &[])
    }

    fn stats_output(&self, target: &str) -> Result<String> {
        validate_ref(target)?;
        vcs::run(GIT, &numstat_args(target), None, &[])
    }

    fn stats_format(&self) -> StatsFormat {
        StatsFormat::Numstat
    }

    fn dialect(&self) -> Dialect {
        Dialect::Git
    }

    fn editor_dir(&self) -> Option<PathBuf> {
        find_repo_root().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vcs::VcsError;

    #[test]
    fn test_default_target_is_head() {
        assert_eq!(GitVcs.default_target(), "HEAD");
        assert_eq!(GitVcs.kind(), VcsKind::Git);
    }

    #[test]
    fn test_diff_args_anchor_path_at_root() {
        assert_eq!(
            diff_args("main", "src/lib.rs"),
            vec!["diff", "--color=always", "main", "--", ":(top,literal)src/lib.rs"]
        );
    }

    #[test]
    fn test_diff_args_match_glob_characters_literally() {
        let args = diff_args("HEAD", "src/a*.rs");
        assert_eq!(args.last().map(String::as_str), Some(":(top,literal)src/a*.rs"));
    }

    #[test]
    fn test_listing_args() {
        assert_eq!(name_only_args("HEAD~1"), vec!["diff", "--name-only", "HEAD~1"]);
        assert_eq!(numstat_args("HEAD"), vec!["diff", "--numstat", "HEAD"]);
    }

    #[test]
    fn test_invalid_target_is_rejected_before_running_git() {
        let err = GitVcs.list_changed_files("$(rm -rf /)").unwrap_err();
        assert!(matches!(err, VcsError::InvalidRef(_)));
        assert!(matches!(GitVcs.diff("", "a.rs"), Err(VcsError::InvalidRef(_))));
        assert!(matches!(GitVcs.diff_stats("a b"), Err(VcsError::InvalidRef(_))));
    }

    #[test]
    fn test_diff_text_reports_failure_inline() {
        let text = GitVcs.diff_text(";bad", "a.rs");
        assert!(text.starts_with("Error fetching diff: "));
    }

    #[test]
    fn test_blob_helpers_use_git_dialect() {
        let blob = "diff --git a/x.rs b/x.rs\n@@ -1 +1 @@\n-a\n+b\ndiff --git a/y.rs b/y.rs\n+c";
        assert_eq!(GitVcs.parse_files_from_diff(blob), vec!["x.rs", "y.rs"]);
        assert_eq!(GitVcs.extract_file_diff(blob, "y.rs"), "diff --git a/y.rs b/y.rs\n+c");
    }
}
