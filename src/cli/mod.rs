use clap::Parser;

use crate::vcs::VcsKind;

#[derive(Parser, Debug)]
#[command(
    name = "difi",
    version,
    about = "Review git and Mercurial diffs in the terminal"
)]
pub struct Cli {
    /// Revision to compare against (e.g. "main", "HEAD~3", "tip").
    /// Defaults to "HEAD" for git and the working copy parent for hg.
    pub target: Option<String>,

    /// Use this backend (git or hg) instead of detecting one.
    #[arg(long, value_name = "VCS")]
    pub vcs: Option<VcsKind>,

    /// Print a per-file summary instead of launching the TUI.
    #[arg(long)]
    pub plain: bool,
}

/// Parse CLI arguments.
pub fn parse_args() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_and_flags() {
        let cli = Cli::try_parse_from(["difi", "main", "--vcs", "hg", "--plain"]).unwrap();
        assert_eq!(cli.target.as_deref(), Some("main"));
        assert_eq!(cli.vcs, Some(VcsKind::Hg));
        assert!(cli.plain);
    }

    #[test]
    fn defaults_are_empty() {
        let cli = Cli::try_parse_from(["difi"]).unwrap();
        assert!(cli.target.is_none());
        assert!(cli.vcs.is_none());
        assert!(!cli.plain);
    }

    #[test]
    fn unknown_backend_is_rejected() {
        assert!(Cli::try_parse_from(["difi", "--vcs", "svn"]).is_err());
    }
}
