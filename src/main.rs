// LogFold - main.rs
//
// Command-line host. Handles:
// 1. CLI argument parsing
// 2. Config loading and logging initialisation (debug mode support)
// 3. Pattern profile loading (built-in + user-defined) and selection
// 4. Printing events with folds, validating profiles, exporting fields

use clap::Parser;
use logfold::app::fold::FoldCalculator;
use logfold::app::profile_mgr;
use logfold::app::session::DocumentSession;
use logfold::core::document::{Document, TextDocument};
use logfold::core::export::{self, ExportFormat};
use logfold::core::model::{ParsedEvent, PatternProfile, VisibilityResult};
use logfold::core::profile::{self, ProfileCache};
use logfold::platform::{self, config::PlatformPaths};
use logfold::util::constants;
use logfold::util::error::{self, LogFoldError};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

/// LogFold - segment log files into events, extract their fields, and fold
/// away lines containing chosen substrings.
#[derive(Parser, Debug)]
#[command(name = "logfold", version, about)]
struct Cli {
    /// Log file to read.
    path: Option<PathBuf>,

    /// Profile id to use (auto-detected if omitted).
    #[arg(short = 'p', long = "profile")]
    profile: Option<String>,

    /// Directory containing user-defined pattern profiles.
    #[arg(long = "profile-dir")]
    profile_dir: Option<PathBuf>,

    /// Config file (defaults to the platform config directory).
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Hide lines containing this substring. Repeatable.
    #[arg(short = 'x', long = "hide")]
    hide: Vec<String>,

    /// Print one row of extracted fields per event instead of the text.
    #[arg(short = 'f', long = "fields")]
    fields: bool,

    /// Validate the selected profile and exit.
    #[arg(long = "validate")]
    validate: bool,

    /// List available profiles and exit.
    #[arg(long = "list-profiles")]
    list_profiles: bool,

    /// Export events and fields as csv or json (config default if omitted).
    #[arg(short = 'e', long = "export", value_name = "FORMAT", num_args = 0..=1)]
    export: Option<Option<ExportFormat>>,

    /// Export destination (stdout if omitted).
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug")]
    debug: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let platform_paths = PlatformPaths::resolve();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| platform_paths.config_file());
    let (config, config_warnings) = platform::config::load_config(&config_path);

    logfold::util::logging::init(
        cli.debug,
        config.log_level.as_deref(),
        config.log_file.as_deref(),
    );

    tracing::info!(
        version = constants::APP_VERSION,
        debug = cli.debug,
        "LogFold starting"
    );
    for w in &config_warnings {
        tracing::warn!(warning = %w, "Config warning");
    }

    match run(&cli, &config, &platform_paths) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "LogFold failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(
    cli: &Cli,
    config: &platform::config::AppConfig,
    paths: &PlatformPaths,
) -> error::Result<ExitCode> {
    // Profile directory: CLI override > config > platform default
    let user_profile_dir = cli
        .profile_dir
        .as_deref()
        .or(config.user_profile_dir.as_deref())
        .unwrap_or(&paths.user_profiles_dir);

    let (profiles, profile_errors) = profile_mgr::load_all_profiles(Some(user_profile_dir));
    for err in &profile_errors {
        tracing::warn!(error = %err, "Profile loading warning");
    }

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    if cli.list_profiles {
        list_profiles(&profiles, &mut out).map_err(stdout_err)?;
        out.flush().map_err(stdout_err)?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(path) = cli.path.as_deref() else {
        eprintln!("Error: no log file given (see --help)");
        return Ok(ExitCode::from(2));
    };

    let read_err = |e: io::Error| LogFoldError::Io {
        path: path.to_path_buf(),
        operation: "read log file",
        source: e,
    };

    let sample = platform::fs::read_first_lines(path, constants::DEFAULT_DETECTION_SAMPLE_LINES)
        .map_err(read_err)?;
    let requested = cli.profile.as_deref().or(config.default_profile.as_deref());
    let Some(selected) = profile_mgr::resolve_profile(&profiles, requested, &sample) else {
        eprintln!("Error: no usable profile found");
        return Ok(ExitCode::FAILURE);
    };
    if let Some(id) = requested {
        if id != selected.id {
            eprintln!("Warning: profile '{id}' not found, using '{}'", selected.id);
        }
    }

    if cli.validate {
        let ok = validate_profile(selected, &mut out).map_err(stdout_err)?;
        out.flush().map_err(stdout_err)?;
        if !ok {
            return Ok(ExitCode::FAILURE);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let text = platform::fs::read_file_lossy(path).map_err(read_err)?;
    let document = TextDocument::from_text(&text);
    drop(text);

    let mut cache = ProfileCache::new();
    let compiled = cache.get_or_compile(selected);
    for diag in compiled.diagnostics() {
        eprintln!("Warning: {diag}");
    }

    let calculator = FoldCalculator::with_parallel_threshold(config.parallel_threshold_lines);
    let mut session = DocumentSession::with_calculator(document, compiled, calculator);
    for substring in &cli.hide {
        if !session.add_hidden_substring(substring) {
            tracing::debug!(substring = %substring, "Ignoring empty or duplicate substring");
        }
    }
    let timeout = Duration::from_millis(constants::VISIBILITY_WAIT_TIMEOUT_MS);
    if !session.hidden_substrings().is_empty() && !session.wait_for_visibility(timeout) {
        eprintln!("Warning: visibility did not finish, showing all lines");
    }
    let visibility = session
        .visibility()
        .cloned()
        .unwrap_or_else(|| {
            let doc = session.document();
            VisibilityResult::all_visible(0, doc.version(), doc.line_count())
        });

    if let Some(format) = cli.export {
        let format = format.unwrap_or(config.export_format);
        let events = visible_events(session.parsed_events(), &visibility);
        export_to(&events, format, cli.output.as_deref())?;
        return Ok(ExitCode::SUCCESS);
    }

    if cli.fields {
        print_fields(&session, &visibility, &mut out).map_err(stdout_err)?;
    } else {
        print_folded(session.document(), &visibility, &mut out).map_err(stdout_err)?;
    }
    out.flush().map_err(stdout_err)?;

    Ok(ExitCode::SUCCESS)
}

fn stdout_err(e: io::Error) -> LogFoldError {
    LogFoldError::Io {
        path: PathBuf::from("<stdout>"),
        operation: "write output",
        source: e,
    }
}

fn list_profiles<W: Write>(profiles: &[PatternProfile], out: &mut W) -> io::Result<()> {
    for p in profiles {
        let issues = profile::validate(p).len();
        let status = if issues == 0 {
            String::new()
        } else {
            format!("  [{issues} issue(s)]")
        };
        writeln!(out, "{:<20} {}{status}", p.id, p.name)?;
        if !p.description.is_empty() {
            writeln!(out, "{:<20} {}", "", p.description)?;
        }
    }
    Ok(())
}

/// Print every validation issue of `p`. Returns true when there are none.
fn validate_profile<W: Write>(p: &PatternProfile, out: &mut W) -> io::Result<bool> {
    let issues = profile::validate(p);
    if issues.is_empty() {
        writeln!(out, "{}: OK", p.id)?;
        return Ok(true);
    }
    for issue in &issues {
        writeln!(out, "{}: {}: {}", p.id, issue.field, issue.message)?;
    }
    Ok(false)
}

/// Drop events whose every line is hidden.
fn visible_events(events: Vec<ParsedEvent>, visibility: &VisibilityResult) -> Vec<ParsedEvent> {
    events
        .into_iter()
        .filter(|e| e.event.line_range().any(|line| !visibility.is_hidden(line)))
        .collect()
}

fn export_to(
    events: &[ParsedEvent],
    format: ExportFormat,
    output: Option<&Path>,
) -> error::Result<()> {
    match output {
        Some(path) => {
            let file = std::fs::File::create(path).map_err(|e| LogFoldError::Io {
                path: path.to_path_buf(),
                operation: "create export file",
                source: e,
            })?;
            export::export_events(events, format, BufWriter::new(file), path)?;
        }
        None => {
            let stdout = io::stdout();
            export::export_events(events, format, stdout.lock(), Path::new("<stdout>"))?;
        }
    }
    Ok(())
}

/// Print the text with each run of hidden lines collapsed to one marker.
fn print_folded<W: Write>(
    document: &TextDocument,
    visibility: &VisibilityResult,
    out: &mut W,
) -> io::Result<()> {
    let mut folds = visibility.hidden_ranges().into_iter().peekable();
    let mut line = 0;
    while line < document.line_count() {
        if let Some(range) = folds.next_if(|r| r.start == line) {
            let n = range.len();
            let plural = if n == 1 { "" } else { "s" };
            writeln!(out, "  ... {n} hidden line{plural}")?;
            line = range.end;
            continue;
        }
        if let Some(text) = document.line(line) {
            writeln!(out, "{text}")?;
        }
        line += 1;
    }
    Ok(())
}

/// One row per event: line, time, level, category, first message line.
fn print_fields<W: Write>(
    session: &DocumentSession,
    visibility: &VisibilityResult,
    out: &mut W,
) -> io::Result<()> {
    for event in session.events() {
        if event.line_range().all(|l| visibility.is_hidden(l)) {
            continue;
        }
        let fields = session.fields_for_event(&event);
        let time = fields.time.map(|t| t.to_string()).unwrap_or_default();
        let message = fields.message.lines().next().unwrap_or("");
        writeln!(
            out,
            "{:>6}  {:<26} {:<4} {:<20} {}",
            event.start + 1,
            time,
            fields.level().short_label(),
            fields.category.as_deref().unwrap_or("-"),
            message
        )?;
    }
    Ok(())
}
