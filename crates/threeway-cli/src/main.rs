use anyhow::{bail, Context};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use threeway_core::config::Settings;
use threeway_core::logging::init_logging;
use threeway_core::options::Options;
use threeway_core::session::Merger;
use threeway_core::EngineError;

/// Three-way line- and character-level diff/merge engine.
///
/// Two files (`A B`) produce a two-way diff/merge; three files (`A B C`)
/// produce a three-way merge with `A` as the common base. `--base` supplies
/// the base explicitly, in which case `files` holds only `B` (and
/// optionally `C`).
#[derive(Parser, Debug)]
#[command(name = "threeway", about = "Three-way line- and character-level diff/merge engine")]
struct Cli {
    #[arg(required = true, num_args = 1..=3)]
    files: Vec<PathBuf>,

    /// Explicit base (A). When given, `files` holds only B (and optionally C).
    #[arg(long)]
    base: Option<PathBuf>,

    /// Enables merge mode and writes the merged result to PATH.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Require every conflict to be auto-solvable before saving; implies --output.
    #[arg(long, requires = "output")]
    auto: bool,

    /// Never auto-solve: every delta becomes an unresolved conflict.
    #[arg(long)]
    qall: bool,

    /// Display alias for A (default "A").
    #[arg(long = "L1")]
    l1: Option<String>,
    /// Display alias for B (default "B").
    #[arg(long = "L2")]
    l2: Option<String>,
    /// Display alias for C (default "C").
    #[arg(long = "L3")]
    l3: Option<String>,

    /// Skip over whitespace differences when comparing lines.
    #[arg(long)]
    ignore_whitespace: bool,

    /// Don't let very common lines anchor a match (§4.2).
    #[arg(long)]
    ignore_trivial_matches: bool,

    /// Tab width used when computing displayed line width.
    #[arg(long)]
    tab_size: Option<u32>,

    /// Raise the tracing filter to `debug` when RUST_LOG is unset.
    #[arg(short, long)]
    verbose: bool,

    /// Directory holding the persisted settings.json and log file (§4.12).
    #[arg(long, default_value = ".threeway")]
    config_dir: PathBuf,

    /// Rename an existing --output destination to `<path>.orig` before writing.
    #[arg(long)]
    backup: bool,
}

fn settings_path(cli: &Cli) -> PathBuf {
    cli.config_dir.join("settings.json")
}

fn resolve_inputs(cli: &Cli) -> anyhow::Result<(PathBuf, PathBuf, Option<PathBuf>)> {
    match &cli.base {
        Some(base) => match cli.files.as_slice() {
            [b] => Ok((base.clone(), b.clone(), None)),
            [b, c] => Ok((base.clone(), b.clone(), Some(c.clone()))),
            _ => bail!("with --base, pass one or two files (B [C])"),
        },
        None => match cli.files.as_slice() {
            [a, b] => Ok((a.clone(), b.clone(), None)),
            [a, b, c] => Ok((a.clone(), b.clone(), Some(c.clone()))),
            _ => bail!("pass two or three files (A B [C]), or use --base"),
        },
    }
}

fn build_options(cli: &Cli, settings: Settings) -> Options {
    let mut options: Options = settings.into();
    if cli.ignore_whitespace {
        options.ignore_white_space = true;
    }
    if cli.ignore_trivial_matches {
        options.ignore_trivial_matches = true;
    }
    if let Some(tab_size) = cli.tab_size {
        options.tab_size = tab_size;
    }
    if cli.qall {
        options.auto_solve = false;
    }
    if cli.backup {
        options.write_backup = true;
    }
    options
}

/// A "binary" input is any input containing a NUL byte (§6). The engine
/// still compares it; merging is not meaningful, so the CLI only warns.
fn warn_if_binary(label: &str, bytes: &[u8]) {
    if bytes.contains(&0) {
        tracing::warn!(input = label, "input looks binary; merge semantics are equality-only");
    }
}

fn read_input(path: &PathBuf) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("reading {}", path.display()))
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    if cli.verbose && std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", "debug");
    }
    let _guard = init_logging(&cli.config_dir.join("logs"))?;

    let settings_file = settings_path(&cli);
    let settings = if settings_file.exists() {
        Settings::load(&settings_file).map_err(EngineError::Settings)?
    } else {
        Settings::default()
    };
    let options = build_options(&cli, settings);

    let (base_path, b_path, c_path) = resolve_inputs(&cli)?;
    let labels = [
        cli.l1.as_deref().unwrap_or("A"),
        cli.l2.as_deref().unwrap_or("B"),
        cli.l3.as_deref().unwrap_or("C"),
    ];

    let a_bytes = read_input(&base_path)?;
    let b_bytes = read_input(&b_path)?;
    let c_bytes = c_path.as_ref().map(read_input).transpose()?;

    warn_if_binary(labels[0], &a_bytes);
    warn_if_binary(labels[1], &b_bytes);
    if let Some(c) = &c_bytes {
        warn_if_binary(labels[2], c);
    }

    let merger = tracing::info_span!("diff3", base = %base_path.display())
        .in_scope(|| Merger::new(a_bytes, b_bytes, c_bytes, options))
        .context("comparing inputs")?;

    match &cli.output {
        None => {
            print!("{}", merger.report(labels));
            Ok(0)
        }
        Some(out_path) => {
            // --auto carries no behavior beyond the `requires = "output"`
            // constraint above: a merge-mode save already refuses to write
            // unless every conflict auto-resolved (see the match below).
            tracing::debug!(auto = cli.auto, "merge mode");
            let result = tracing::info_span!("save", path = %out_path.display())
                .in_scope(|| merger.save(out_path));
            match result {
                Ok(()) => Ok(0),
                Err(EngineError::UnresolvedConflicts(n)) => {
                    tracing::error!(unresolved = n, "save refused: unresolved conflicts remain");
                    eprint!("{}", merger.report(labels));
                    eprintln!("refusing to save: {n} unresolved conflict(s) remain");
                    Ok(1)
                }
                Err(e) => {
                    tracing::error!(error = %e, "save failed");
                    Err(e.into())
                }
            }
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => ExitCode::from(code as u8),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut full = vec!["threeway"];
        full.extend_from_slice(args);
        Cli::parse_from(full)
    }

    #[test]
    fn resolves_two_way_positional_inputs() {
        let cli = parse(&["a.txt", "b.txt"]);
        let (a, b, c) = resolve_inputs(&cli).unwrap();
        assert_eq!(a, PathBuf::from("a.txt"));
        assert_eq!(b, PathBuf::from("b.txt"));
        assert!(c.is_none());
    }

    #[test]
    fn resolves_three_way_with_explicit_base() {
        let cli = parse(&["--base", "base.txt", "mine.txt", "theirs.txt"]);
        let (a, b, c) = resolve_inputs(&cli).unwrap();
        assert_eq!(a, PathBuf::from("base.txt"));
        assert_eq!(b, PathBuf::from("mine.txt"));
        assert_eq!(c, Some(PathBuf::from("theirs.txt")));
    }

    #[test]
    fn auto_requires_output() {
        let result = Cli::try_parse_from(["threeway", "--auto", "a.txt", "b.txt"]);
        assert!(result.is_err());
    }

    #[test]
    fn end_to_end_merge_writes_output_and_exits_zero() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        let out = dir.path().join("out.txt");
        std::fs::write(&a, "a\nb\nc\n").unwrap();
        std::fs::write(&b, "a\nX\nb\nc\n").unwrap();

        let cli = parse(&[
            a.to_str().unwrap(),
            b.to_str().unwrap(),
            "--output",
            out.to_str().unwrap(),
            "--config-dir",
            dir.path().join(".threeway").to_str().unwrap(),
        ]);
        let code = run(cli).unwrap();
        assert_eq!(code, 0);
        assert_eq!(std::fs::read(&out).unwrap(), b"a\nX\nb\nc\n");
    }

    #[test]
    fn end_to_end_unresolved_conflict_exits_one() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        let out = dir.path().join("out.txt");
        std::fs::write(&a, "a\nb\nc\n").unwrap();
        std::fs::write(&b, "a\nc\n").unwrap();

        let cli = parse(&[
            a.to_str().unwrap(),
            b.to_str().unwrap(),
            "--output",
            out.to_str().unwrap(),
            "--config-dir",
            dir.path().join(".threeway").to_str().unwrap(),
        ]);
        let code = run(cli).unwrap();
        assert_eq!(code, 1);
        assert!(!out.exists());
    }
}
