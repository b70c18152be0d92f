use anyhow::{anyhow, Context, Result};
use respdiff::{Diff, DiffOptions, FormatKind, FormatRegistry};
use std::{path::PathBuf, process::ExitCode};

const USAGE: &str = "\
Usage: respdiff [OPTIONS] <LEFT> <RIGHT>

Compare two recorded responses (or any two text files, `-` for stdin).

Options:
  -c, --context <N>        Unchanged lines shown around each change [default: 3]
      --full               Show every line instead of context windows
  -l, --lines              Show line numbers
      --color              Shorthand for --format color
      --format <NAME>      Output format (ascii, color)
      --left-label <NAME>  Header name of the left side [default: LEFT path]
      --right-label <NAME> Header name of the right side [default: RIGHT path]
      --crlf               Join output lines with \\r\\n
      --brief              Only print the number of diffs
      --verbose            Print the number of diffs after the report
  -h, --help               Print this help

Exit status is 0 when both sides match, 1 when diffs were found and 2 on errors.";

#[derive(Clone, Copy, PartialEq, Eq)]
enum Report {
    Full,
    Brief,
    Verbose,
}

struct Args {
    left: PathBuf,
    right: PathBuf,
    options: DiffOptions,
    report: Report,
}

fn parse_args(registry: &FormatRegistry) -> Result<Option<Args>> {
    use lexopt::prelude::*;

    let mut options = DiffOptions::default();
    let mut report = Report::Full;
    let mut left = None;
    let mut right = None;
    let mut left_label = None;
    let mut right_label = None;

    let mut parser = lexopt::Parser::from_env();
    while let Some(arg) = parser.next()? {
        match arg {
            Short('c') | Long("context") => {
                options.context = Some(parser.value()?.parse()?);
            }
            Long("full") => options.context = None,
            Short('l') | Long("lines") => options.show_line_numbers = true,
            Long("color") => options.format = FormatKind::Color,
            Long("format") => {
                let name = parser.value()?.string()?;
                options.format = registry.resolve(&name).with_context(|| {
                    format!("Available formats: {}", registry.names().join(", "))
                })?;
            }
            Long("left-label") => left_label = Some(parser.value()?.string()?),
            Long("right-label") => right_label = Some(parser.value()?.string()?),
            Long("crlf") => options.join_char = "\r\n".to_string(),
            Long("brief") => report = Report::Brief,
            Long("verbose") => report = Report::Verbose,
            Short('h') | Long("help") => {
                println!("{USAGE}");
                return Ok(None);
            }
            Value(path) if left.is_none() => left = Some(PathBuf::from(path)),
            Value(path) if right.is_none() => right = Some(PathBuf::from(path)),
            _ => return Err(arg.unexpected().into()),
        }
    }

    let left = left.ok_or_else(|| anyhow!("Path for left side not provided\n\n{USAGE}"))?;
    let right = right.ok_or_else(|| anyhow!("Path for right side not provided\n\n{USAGE}"))?;

    options.labels = [
        left_label.unwrap_or_else(|| left.display().to_string()),
        right_label.unwrap_or_else(|| right.display().to_string()),
    ];

    Ok(Some(Args {
        left,
        right,
        options,
        report,
    }))
}

/// Returns whether both sides matched
fn run() -> Result<bool> {
    let registry = FormatRegistry::default();
    let Some(args) = parse_args(&registry)? else {
        return Ok(true);
    };

    let left = respdiff::load_text(&args.left).context("Failed to load left side")?;
    let right = respdiff::load_text(&args.right).context("Failed to load right side")?;

    let diff = Diff::new(&left, &right, args.options);
    let count = diff.count();
    log::info!(
        "Compared {} -> {}: {} diff(s)",
        args.left.display(),
        args.right.display(),
        count
    );

    if args.report != Report::Brief {
        println!("{}", diff.formatted());
    }

    if args.report != Report::Full {
        println!("Found {count} diff(s).");
    }

    Ok(diff.is_empty())
}

fn main() -> ExitCode {
    env_logger::init();

    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {e:?}");
            ExitCode::from(2)
        }
    }
}
