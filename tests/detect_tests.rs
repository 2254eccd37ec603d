use difi::vcs::{VcsKind, detect_from};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Helper to create `root/a/b/c` with optional markers at chosen levels.
fn setup_tree(git_at: Option<&str>, hg_at: Option<&str>) -> TempDir {
    let temp = tempfile::tempdir().unwrap();
    fs::create_dir_all(temp.path().join("a/b/c")).unwrap();
    if let Some(level) = git_at {
        fs::create_dir_all(temp.path().join(level).join(".git")).unwrap();
    }
    if let Some(level) = hg_at {
        fs::create_dir_all(temp.path().join(level).join(".hg")).unwrap();
    }
    temp
}

fn leaf(temp: &TempDir) -> std::path::PathBuf {
    temp.path().join("a/b/c")
}

#[test]
fn git_marker_in_start_directory() {
    let temp = setup_tree(Some("a/b/c"), None);
    assert_eq!(detect_from(&leaf(&temp)), VcsKind::Git);
}

#[test]
fn hg_marker_found_in_ancestor() {
    let temp = setup_tree(None, Some("a"));
    assert_eq!(detect_from(&leaf(&temp)), VcsKind::Hg);
}

#[test]
fn git_in_grandparent_beats_hg_in_parent() {
    let temp = setup_tree(Some("a"), Some("a/b"));
    assert_eq!(detect_from(&leaf(&temp)), VcsKind::Git);
}

#[test]
fn both_markers_at_same_level_pick_git() {
    let temp = setup_tree(Some("a/b"), Some("a/b"));
    assert_eq!(detect_from(&leaf(&temp)), VcsKind::Git);
}

#[test]
fn hg_repo_detected_from_its_root() {
    let temp = setup_tree(None, Some("a/b/c"));
    assert_eq!(detect_from(&leaf(&temp)), VcsKind::Hg);
}

#[test]
fn git_file_marker_counts() {
    // worktrees and submodules use a `.git` file rather than a directory
    let temp = setup_tree(None, Some("a"));
    fs::write(temp.path().join("a/b/.git"), "gitdir: /elsewhere\n").unwrap();
    assert_eq!(detect_from(&leaf(&temp)), VcsKind::Git);
}

#[test]
fn no_marker_defaults_to_git() {
    let temp = setup_tree(None, None);
    assert_eq!(detect_from(&leaf(&temp)), VcsKind::Git);
}

#[test]
fn missing_start_directory_does_not_panic() {
    let kind = detect_from(Path::new("/definitely/not/a/real/difi/path"));
    assert!(matches!(kind, VcsKind::Git | VcsKind::Hg));
}
