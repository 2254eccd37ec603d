use assert_cmd::Command;
use predicates::prelude::*;

const GIT_BLOB: &str = "diff --git a/src/lib.rs b/src/lib.rs
index 1234567..abcdefg 100644
--- a/src/lib.rs
+++ b/src/lib.rs
@@ -1,3 +1,4 @@
 pub mod a;
-pub mod b;
+pub mod c;
+pub mod d;
diff --git a/README.md b/README.md
--- a/README.md
+++ b/README.md
@@ -1 +1 @@
-old
+new
";

const HG_BLOB: &str = "diff -r 123456 file1.go
--- a/file1.go	Tue Jan 01 00:00:00 2024 +0000
+++ b/file1.go	Tue Jan 01 00:00:01 2024 +0000
@@ -1,3 +1,3 @@
 package main
-import \"fmt\"
+import \"log\"
 func main() {}
";

fn difi() -> Command {
    let mut cmd = Command::cargo_bin("difi").unwrap();
    cmd.env_remove("DIFI_LOG");
    cmd
}

#[test]
fn version_flag_prints_version() {
    difi()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn plain_summary_from_piped_git_diff() {
    let dir = tempfile::tempdir().unwrap();
    difi()
        .current_dir(dir.path())
        .args(["--plain", "--vcs", "git"])
        .write_stdin(GIT_BLOB)
        .assert()
        .success()
        .stdout(predicate::str::contains("src/lib.rs  +2 -1"))
        .stdout(predicate::str::contains("README.md  +1 -1"))
        .stdout(predicate::str::contains("2 files changed, +3 -2"));
}

#[test]
fn plain_summary_from_piped_hg_diff() {
    let dir = tempfile::tempdir().unwrap();
    difi()
        .current_dir(dir.path())
        .args(["--plain", "--vcs", "hg"])
        .write_stdin(HG_BLOB)
        .assert()
        .success()
        .stdout(predicate::str::contains("file1.go  +1 -1"))
        .stdout(predicate::str::contains("1 files changed, +1 -1"));
}

#[test]
fn piped_diff_in_other_dialect_has_no_files() {
    let dir = tempfile::tempdir().unwrap();
    difi()
        .current_dir(dir.path())
        .args(["--plain", "--vcs", "git"])
        .write_stdin(HG_BLOB)
        .assert()
        .success()
        .stdout(predicate::str::contains("No changes"));
}

#[test]
fn unknown_backend_is_rejected() {
    difi()
        .args(["--vcs", "svn", "--plain"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown VCS backend: svn"));
}

#[test]
fn hostile_target_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    difi()
        .current_dir(dir.path())
        .args(["--plain", "--vcs", "git", "HEAD;rm"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid revision"));
}
