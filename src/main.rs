use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use sqlembed::mode::{CommaPosition, KeywordCase, Mode, MultiStatement};
use sqlembed::report::{FileStatus, Report};
use sqlembed::Language;

/// sqlembed - Formats SQL embedded in Python and JavaScript string literals.
/// Ordinary strings are left alone.
#[derive(Parser, Debug)]
#[command(name = "sqlembed", version, about)]
struct Cli {
    /// Files, directories or glob patterns to format. Use "-" to read from stdin.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Check formatting without writing changes.
    #[arg(long)]
    check: bool,

    /// Show formatting diff.
    #[arg(long)]
    diff: bool,

    /// Maximum line length.
    #[arg(short = 'l', long)]
    line_length: Option<usize>,

    /// SQL dialect: ansi, postgres, mysql, sqlite.
    #[arg(short = 'd', long)]
    dialect: Option<String>,

    /// Keyword casing.
    #[arg(long, value_enum)]
    keyword_case: Option<KeywordCase>,

    /// Comma placement in split lists.
    #[arg(long, value_enum)]
    comma_position: Option<CommaPosition>,

    /// Keep GROUP BY lists on one line.
    #[arg(long)]
    group_by_single_line: bool,

    /// Line up AS aliases in split SELECT lists.
    #[arg(long)]
    align_aliases: bool,

    /// Literals holding several statements: format all or only the first.
    #[arg(long, value_enum)]
    multi_statement: Option<MultiStatement>,

    /// Split SELECT lists with more items than this.
    #[arg(long)]
    max_inline_columns: Option<usize>,

    /// Split WHERE/HAVING chains wider than this.
    #[arg(long)]
    condition_width: Option<usize>,

    /// Spaces per indentation level.
    #[arg(long)]
    indent_width: Option<usize>,

    /// Glob patterns to exclude.
    #[arg(long)]
    exclude: Vec<String>,

    /// Host language for stdin input: python or javascript.
    #[arg(long, default_value = "python")]
    language: String,

    /// Verbose output.
    #[arg(short, long)]
    verbose: bool,

    /// Quiet output (errors only).
    #[arg(short, long)]
    quiet: bool,

    /// Disable progress bar.
    #[arg(long)]
    no_progressbar: bool,

    /// Force color output.
    #[arg(long)]
    force_color: bool,

    /// Disable color output.
    #[arg(long)]
    no_color: bool,

    /// Number of threads for parallel processing (0 = all cores).
    #[arg(short = 't', long, default_value_t = 0)]
    threads: usize,

    /// Disable multi-threaded processing.
    #[arg(long)]
    single_process: bool,

    /// Path to config file (sqlembed.toml or pyproject.toml).
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Cli {
    /// Command-line flags win over the loaded config.
    fn apply(self, mut mode: Mode) -> Mode {
        if let Some(v) = self.line_length {
            mode.line_length = v;
        }
        if let Some(v) = self.dialect {
            mode.dialect_name = v;
        }
        if let Some(v) = self.keyword_case {
            mode.keyword_case = v;
        }
        if let Some(v) = self.comma_position {
            mode.comma_position = v;
        }
        if let Some(v) = self.multi_statement {
            mode.multi_statement = v;
        }
        if let Some(v) = self.max_inline_columns {
            mode.max_inline_columns = v;
        }
        if let Some(v) = self.condition_width {
            mode.condition_width = v;
        }
        if let Some(v) = self.indent_width {
            mode.indent_width = v;
        }
        if !self.exclude.is_empty() {
            mode.exclude = self.exclude;
        }
        mode.group_by_single_line |= self.group_by_single_line;
        mode.align_aliases |= self.align_aliases;
        mode.check = self.check;
        mode.diff = self.diff;
        mode.verbose = self.verbose;
        mode.quiet = self.quiet;
        mode.no_progressbar = self.no_progressbar;
        mode.no_color = self.no_color;
        mode.force_color = self.force_color;
        mode.threads = self.threads;
        mode.single_process = self.single_process;
        mode
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match try_main(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(2);
        }
    }
}

fn init_tracing(verbose: bool, quiet: bool) {
    let default = if quiet {
        "error"
    } else if verbose {
        "info"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn try_main(cli: Cli) -> anyhow::Result<i32> {
    let is_stdin = cli.files.len() == 1 && cli.files[0].to_string_lossy() == "-";
    let language = cli.language.clone();

    let base_mode =
        sqlembed::load_config(&cli.files, cli.config.as_deref()).context("Configuration error")?;
    let files = cli.files.clone();
    let mode = cli.apply(base_mode);

    if is_stdin {
        let language = Language::from_name(&language)?;
        return format_stdin(language, &mode);
    }

    let report = sqlembed::run(&files, &mode)?;

    if !mode.quiet {
        print_verbose_results(&report, &mode);
        eprintln!("{}", report.summary());
    }
    report.print_errors();

    Ok(report.exit_code(mode.check))
}

fn format_stdin(language: Language, mode: &Mode) -> anyhow::Result<i32> {
    let mut source = String::new();
    io::stdin()
        .read_to_string(&mut source)
        .context("Error reading stdin")?;

    let outcome = sqlembed::format_source(&source, language, mode)?;
    print!("{}", outcome.formatted);

    for failure in &outcome.failures {
        eprintln!("error: <stdin>: {}", failure);
    }
    let code = if !outcome.failures.is_empty() {
        2
    } else if mode.check && outcome.formatted != source {
        1
    } else {
        0
    };
    Ok(code)
}

fn print_verbose_results(report: &Report, mode: &Mode) {
    if !mode.verbose {
        return;
    }
    for result in &report.results {
        if result.status == FileStatus::Changed {
            eprintln!("reformatted {}", result.path.display());
        }
    }
}
