use anyhow::{Context, Result};
use std::io::{self, IsTerminal, Read, Write};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use difi::cli;
use difi::config::Config;
use difi::tui::{App, run_tui};
use difi::vcs::{self, Vcs};

/// Environment variable holding the log filter, e.g. `DIFI_LOG=debug`.
const LOG_ENV: &str = "DIFI_LOG";

fn main() -> Result<()> {
    let args = cli::parse_args();
    init_logging(args.plain);

    let kind = args.vcs.unwrap_or_else(vcs::detect);
    let backend = kind.backend();
    let target = args
        .target
        .unwrap_or_else(|| backend.default_target().to_string());
    debug!("using {kind} backend against {target:?}");

    let piped = read_piped_diff()?;

    if args.plain {
        return print_summary(backend.as_ref(), &target, piped.as_deref());
    }

    let app = App::new(backend, Config::load(), target, piped);
    run_tui(app)
}

/// Plain mode logs warnings by default; the TUI logs nothing unless asked,
/// so output never lands on the alternate screen.
fn init_logging(plain: bool) {
    let filter = match std::env::var(LOG_ENV) {
        Ok(directives) => EnvFilter::new(directives),
        Err(_) if plain => EnvFilter::new("warn"),
        Err(_) => return,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// The whole of stdin when it is a pipe or file, `None` for a terminal or
/// an empty input.
fn read_piped_diff() -> Result<Option<String>> {
    let mut stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut blob = String::new();
    stdin
        .read_to_string(&mut blob)
        .context("Failed to read diff from stdin")?;
    if blob.trim().is_empty() {
        return Ok(None);
    }
    debug!("read {} bytes of diff from stdin", blob.len());
    Ok(Some(blob))
}

/// Print one line per changed file and a totals line.
fn print_summary(backend: &dyn Vcs, target: &str, piped: Option<&str>) -> Result<()> {
    let changes = vcs::collect_changes(backend, target, piped)
        .with_context(|| format!("Failed to list changes against {target}"))?;

    let mut out = io::stdout().lock();
    if changes.files.is_empty() {
        writeln!(out, "No changes against {target}")?;
        return Ok(());
    }

    let totals = match piped {
        Some(_) => changes.totals(),
        None => backend
            .diff_stats(target)
            .with_context(|| format!("Failed to read diff stats against {target}"))?,
    };

    for path in &changes.files {
        let stat = changes.stats.get(path).copied().unwrap_or_default();
        writeln!(out, "{path}  +{} -{}", stat.added, stat.deleted)?;
    }
    writeln!(
        out,
        "{} files changed, +{} -{}",
        changes.files.len(),
        totals.added,
        totals.deleted
    )?;

    Ok(())
}
