//! pargrep: a parallel recursive regular-expression line searcher.
//!
//! Usage:
//!   pargrep [OPTIONS] PATTERN [FILE...]
//!   pargrep [OPTIONS] -e PATTERN [FILE...]
//!   pargrep [OPTIONS] -f PATTERN_FILE [FILE...]

use std::io::{IsTerminal, Write};

use clap::Parser;
use pargrep::cli::Cli;
use pargrep::driver;
use pargrep::exclude::Excluder;
use pargrep::matcher::CompiledMatcher;
use tracing_subscriber::EnvFilter;

fn main() {
    // Log to stderr only; stdout is reserved for matched lines.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("pargrep=warn".parse().unwrap()))
        .with_writer(std::io::stderr)
        .try_init();

    let args = expand_grep_options(std::env::args());
    let cli = Cli::parse_from(Cli::preprocess_args(args));

    let (mut config, patterns, files) = match cli.into_parts() {
        Ok(parts) => parts,
        Err(err) => {
            eprintln!("pargrep: {err}");
            std::process::exit(2);
        }
    };

    // `--color=auto` is resolved once here, where the real stdout is
    // available to check; everything downstream only ever sees `Always`
    // or `Never` (spec.md §6's `--color`).
    if config.color == pargrep::config::ColorWhen::Auto {
        config.color = if std::io::stdout().is_terminal() {
            pargrep::config::ColorWhen::Always
        } else {
            pargrep::config::ColorWhen::Never
        };
    }

    let matcher = match CompiledMatcher::compile(&patterns, &config) {
        Ok(m) => m,
        Err(err) => {
            if !config.no_messages {
                eprintln!("pargrep: {err}");
            }
            std::process::exit(2);
        }
    };

    let excluder = match Excluder::build(&config) {
        Ok(e) => e,
        Err(err) => {
            eprintln!("pargrep: {err}");
            std::process::exit(2);
        }
    };

    let stdout = std::io::stdout();
    let mut out = std::io::BufWriter::new(stdout.lock());
    let outcome = match driver::run(&files, &config, &matcher, &excluder, &mut out) {
        Ok(outcome) => outcome,
        Err(err) => {
            eprintln!("pargrep: {err}");
            std::process::exit(2);
        }
    };
    let _ = out.flush();

    std::process::exit(outcome.exit_code());
}

/// `GREP_OPTIONS` is deprecated upstream: if set, its (shell-word-split)
/// contents are prepended to argv with a one-time warning, matching GNU
/// grep's own deprecation handling (spec.md §6's Environment variables).
fn expand_grep_options(args: std::env::Args) -> Vec<String> {
    let mut out: Vec<String> = args.collect();
    if let Ok(raw) = std::env::var("GREP_OPTIONS") {
        if !raw.trim().is_empty() {
            eprintln!("pargrep: warning: GREP_OPTIONS is deprecated; please use an alias or script");
            let extra: Vec<String> = raw.split_whitespace().map(str::to_string).collect();
            let program = out.first().cloned().unwrap_or_else(|| "pargrep".to_string());
            let rest = out.split_off(1);
            out = std::iter::once(program).chain(extra).chain(rest).collect();
        }
    }
    out
}
