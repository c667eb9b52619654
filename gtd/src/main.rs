use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Args, Parser, Subcommand, ValueEnum};
use gtd::config::{Config, DIRECTORY_ENV, EDITOR_ENV};
use gtd::editor::{self, EditorOutcome, MISSING_EDITOR_NOTICE};
use gtd::summary::DEFAULT_SUMMARY_DAYS;
use gtd::{Diagnostics, FileLocator, RolloverEngine, RolloverOutcome, Schema, SummaryAggregator};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "gtd",
    about = "Daily logbook: carry open work forward and summarize what got done",
    version
)]
struct Cli {
    /// Enable verbose logging for debugging.
    #[arg(long, global = true)]
    verbose: bool,
    /// Directory holding the day files. Defaults to ~/.gtd/backlog.
    #[arg(short = 'd', long, global = true, env = DIRECTORY_ENV)]
    directory: Option<PathBuf>,
    /// Program used to open files.
    #[arg(short = 'e', long, global = true, env = EDITOR_ENV)]
    editor: Option<String>,
    /// Block labels used by the day files.
    #[arg(long, global = true, value_enum, default_value_t = SchemaArg::Gtd)]
    schema: SchemaArg,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create today's file from the latest one (if needed) and open it. The default.
    Today,

    /// Summarize what was accomplished over the last days and open the summary.
    Summary(SummaryArgs),

    /// List day files, oldest first.
    List(ListArgs),
}

#[derive(Debug, Args)]
struct SummaryArgs {
    /// Number of day files to include.
    #[arg(short = 'n', long, default_value_t = DEFAULT_SUMMARY_DAYS, allow_negative_numbers = true)]
    days: i64,
}

#[derive(Debug, Args)]
struct ListArgs {
    /// Emit JSON instead of one path per line.
    #[arg(long)]
    json: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum SchemaArg {
    /// In progress / Accomplished / Backlog
    Gtd,
    /// TODO / Accomplished / Backlog
    Logbook,
}

impl From<SchemaArg> for Schema {
    fn from(arg: SchemaArg) -> Self {
        match arg {
            SchemaArg::Gtd => Schema::Gtd,
            SchemaArg::Logbook => Schema::Logbook,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::new(cli.directory, cli.editor, cli.schema.into());
    let diagnostics = Diagnostics::tracing();
    match cli.command.unwrap_or(Commands::Today) {
        Commands::Today => handle_today(&config, &diagnostics),
        Commands::Summary(args) => handle_summary(args, &config, &diagnostics),
        Commands::List(args) => handle_list(args, &config, &diagnostics),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .try_init();
}

fn handle_today(config: &Config, diagnostics: &Diagnostics) -> Result<()> {
    let engine = RolloverEngine::new(&config.directory, config.schema, diagnostics.clone());
    let today = Local::now().date_naive();
    let outcome = engine
        .roll_over(today)
        .with_context(|| format!("preparing today's file in {:?}", config.directory))?;
    if let RolloverOutcome::Created(path) = &outcome {
        tracing::info!("created {:?}", path);
    }
    open_in_editor(config, outcome.path(), diagnostics)
}

fn handle_summary(args: SummaryArgs, config: &Config, diagnostics: &Diagnostics) -> Result<()> {
    let path = write_summary(args.days, config, diagnostics)?;
    open_in_editor(config, &path, diagnostics)
}

fn write_summary(days: i64, config: &Config, diagnostics: &Diagnostics) -> Result<PathBuf> {
    let aggregator =
        SummaryAggregator::new(&config.directory, config.schema, diagnostics.clone());
    let path = aggregator
        .summarize(days)
        .with_context(|| format!("summarizing {:?}", config.directory))?;
    Ok(path)
}

fn handle_list(args: ListArgs, config: &Config, diagnostics: &Diagnostics) -> Result<()> {
    let locator = FileLocator::new(&config.directory, diagnostics.clone());
    let files = locator
        .day_files()
        .with_context(|| format!("listing {:?}", config.directory))?;

    if files.is_empty() {
        eprintln!("No day files found in {:?}.", config.directory);
        return Ok(());
    }

    if args.json {
        #[derive(serde::Serialize)]
        struct JsonOutput {
            date: Option<String>,
            path: String,
        }

        let payload: Vec<JsonOutput> = files
            .iter()
            .map(|path| JsonOutput {
                date: gtd::date_of(path).map(gtd::dates::format_date),
                path: path.display().to_string(),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        for path in files {
            println!("{}", path.display());
        }
    }
    Ok(())
}

fn open_in_editor(config: &Config, path: &Path, diagnostics: &Diagnostics) -> Result<()> {
    match editor::open(config.editor.as_deref(), path, diagnostics)
        .with_context(|| format!("opening {:?}", path))?
    {
        EditorOutcome::Opened => {}
        EditorOutcome::NotConfigured => println!("{MISSING_EDITOR_NOTICE}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use gtd::Error;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_subcommand_means_today() {
        let cli = Cli::try_parse_from(["gtd"]).expect("parse");
        assert!(cli.command.is_none());
        assert_eq!(cli.schema, SchemaArg::Gtd);
    }

    #[test]
    fn summary_accepts_negative_days_for_validation() {
        let cli = Cli::try_parse_from(["gtd", "summary", "--days", "-3"]).expect("parse");
        match cli.command {
            Some(Commands::Summary(args)) => assert_eq!(args.days, -3),
            other => panic!("expected summary, got {other:?}"),
        }

        let cli = Cli::try_parse_from(["gtd", "summary"]).expect("parse");
        match cli.command {
            Some(Commands::Summary(args)) => assert_eq!(args.days, DEFAULT_SUMMARY_DAYS),
            other => panic!("expected summary, got {other:?}"),
        }
    }

    #[test]
    fn global_flags_work_after_the_subcommand() {
        let cli = Cli::try_parse_from([
            "gtd", "list", "-d", "/tmp/logs", "-e", "vi", "--schema", "logbook",
        ])
        .expect("parse");
        assert_eq!(cli.directory, Some(PathBuf::from("/tmp/logs")));
        assert_eq!(cli.editor.as_deref(), Some("vi"));
        assert_eq!(Schema::from(cli.schema), Schema::Logbook);
    }

    #[test]
    fn invalid_day_count_fails_without_writing() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let config = Config::new(Some(tmp.path().join("logs")), None, Schema::Gtd);

        let err = write_summary(0, &config, &Diagnostics::noop()).expect_err("invalid count");
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::InvalidCount(0))
        ));
        assert!(!config.directory.exists());
    }

    #[test]
    fn today_without_editor_still_creates_the_file() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let config = Config::new(Some(tmp.path().to_path_buf()), None, Schema::Gtd);

        handle_today(&config, &Diagnostics::noop()).expect("today");
        let files = FileLocator::new(tmp.path(), Diagnostics::noop())
            .day_files()
            .expect("list");
        assert_eq!(files.len(), 1);
        assert_eq!(
            gtd::date_of(&files[0]),
            Some(Local::now().date_naive())
        );
    }
}
