//! tabular-diff CLI
//!
//! Compare two tabular files, and view or edit the stored default mapping.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tabular_diff::diff::UnmappedFieldPolicy;
use tabular_diff::index::DuplicateKeyPolicy;
use tabular_diff::ingestion::{CsvOptions, InputFormat, LoadOptions};
use tabular_diff::mapping::{DirectoryMappingStore, FieldMapping, MappingStore};
use tabular_diff::observability::{
    ComparisonObserver, ComparisonSeverity, CompositeObserver, FileObserver, TracingObserver,
};
use tabular_diff::report::{JsonRenderer, Renderer, StatusRenderer, TableRenderer};
use tabular_diff::{compare_paths, CompareError, CompareOptions, CompareResult, ComparisonRequest};

/// Key-based comparison of two tabular files.
#[derive(Parser)]
#[command(name = "tabular-diff")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Also append comparison events to this file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct MappingLocation {
    /// Directory holding stored mappings (`<name>.csv`).
    #[arg(long, default_value = ".")]
    mapping_dir: PathBuf,

    /// Name of the stored mapping.
    #[arg(long, default_value = "mapping")]
    mapping_name: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare SOURCE against TARGET.
    Compare {
        source: PathBuf,
        target: PathBuf,

        /// Field mapping entry `source_field=target_field` (repeatable). Replaces the stored
        /// mapping entirely when given.
        #[arg(short, long = "map", value_parser = parse_pair)]
        map: Vec<(String, String)>,

        /// Key field, source-side name (repeatable, in order).
        #[arg(short, long = "key")]
        key: Vec<String>,

        #[command(flatten)]
        location: MappingLocation,

        /// Ignore the stored mapping.
        #[arg(long)]
        no_stored_mapping: bool,

        /// What to do with rows sharing a key.
        #[arg(long, value_enum, default_value_t = Duplicates::KeepLast)]
        duplicates: Duplicates,

        /// Fail when a mapped column does not exist instead of skipping it.
        #[arg(long)]
        strict: bool,

        /// Input format for both files (inferred from the extension by default).
        #[arg(long, value_enum)]
        input_format: Option<Input>,

        /// Field delimiter for CSV input.
        #[arg(long)]
        delimiter: Option<char>,

        /// Worksheet to read from Excel input.
        #[arg(long)]
        sheet: Option<String>,

        /// Report format.
        #[arg(short, long, value_enum, default_value_t = Output::Json)]
        format: Output,

        /// Output file (directory for `csv`). JSON and status go to stdout when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output.
        #[arg(long)]
        pretty: bool,

        /// Exit with status 1 when records are missing or differ.
        #[arg(long)]
        fail_on_diff: bool,
    },

    /// Inspect or edit the stored default mapping.
    Mapping {
        #[command(subcommand)]
        command: MappingCommands,
    },
}

#[derive(Subcommand)]
enum MappingCommands {
    /// Print the stored mapping as JSON.
    Show {
        #[command(flatten)]
        location: MappingLocation,
    },
    /// Merge entries into the stored mapping (descriptions are kept).
    Update {
        #[command(flatten)]
        location: MappingLocation,

        /// Entry `source_field=target_field` (repeatable).
        #[arg(short, long = "map", value_parser = parse_pair)]
        map: Vec<(String, String)>,

        /// Key fields; every other row is marked as not a key.
        #[arg(short, long = "key")]
        key: Vec<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Duplicates {
    Error,
    KeepFirst,
    KeepLast,
}

impl From<Duplicates> for DuplicateKeyPolicy {
    fn from(d: Duplicates) -> Self {
        match d {
            Duplicates::Error => DuplicateKeyPolicy::Error,
            Duplicates::KeepFirst => DuplicateKeyPolicy::KeepFirst,
            Duplicates::KeepLast => DuplicateKeyPolicy::KeepLast,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Input {
    Csv,
    Tsv,
    Json,
    Excel,
}

impl From<Input> for InputFormat {
    fn from(i: Input) -> Self {
        match i {
            Input::Csv => InputFormat::Csv,
            Input::Tsv => InputFormat::Tsv,
            Input::Json => InputFormat::Json,
            Input::Excel => InputFormat::Excel,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Output {
    Json,
    Status,
    Csv,
    Xlsx,
}

fn parse_pair(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((src, tgt)) if !src.is_empty() && !tgt.is_empty() => Ok((src.to_string(), tgt.to_string())),
        _ => Err(format!("expected source_field=target_field, got '{s}'")),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "tabular-diff failed");
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> CompareResult<ExitCode> {
    match cli.command {
        Commands::Compare {
            source,
            target,
            map,
            key,
            location,
            no_stored_mapping,
            duplicates,
            strict,
            input_format,
            delimiter,
            sheet,
            format,
            output,
            pretty,
            fail_on_diff,
        } => {
            let defaults = if no_stored_mapping {
                None
            } else {
                DirectoryMappingStore::new(&location.mapping_dir).load(&location.mapping_name)?
            };

            let mut observers: Vec<Arc<dyn ComparisonObserver>> = vec![Arc::new(TracingObserver)];
            if let Some(path) = cli.log_file.as_ref() {
                observers.push(Arc::new(FileObserver::new(path)));
            }

            let request = ComparisonRequest {
                field_mapping: map.into_iter().collect(),
                key_fields: key,
                defaults,
                options: CompareOptions {
                    duplicates: duplicates.into(),
                    unmapped_fields: if strict {
                        UnmappedFieldPolicy::Error
                    } else {
                        UnmappedFieldPolicy::Skip
                    },
                    observer: Some(Arc::new(CompositeObserver::new(observers))),
                    alert_at_or_above: ComparisonSeverity::Critical,
                },
            };

            let load = load_options(input_format, delimiter, sheet)?;
            let result = compare_paths(&source, &target, &load, &request)?;

            match format {
                Output::Json => {
                    let json = JsonRenderer { pretty }.render(&result)?;
                    emit(output.as_deref(), &json)?;
                }
                Output::Status => {
                    let payload = StatusRenderer.render(&result)?;
                    let json = if pretty {
                        serde_json::to_string_pretty(&payload)?
                    } else {
                        serde_json::to_string(&payload)?
                    };
                    emit(output.as_deref(), &json)?;
                }
                Output::Csv => {
                    let dir = output.unwrap_or_else(|| PathBuf::from("report"));
                    TableRenderer.render(&result)?.write_csv_dir(&dir)?;
                    info!(dir = %dir.display(), "wrote report tables");
                }
                Output::Xlsx => write_xlsx(&result, output.as_deref())?,
            }

            if fail_on_diff && !result.is_clean() {
                return Ok(ExitCode::from(1));
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::Mapping { command } => match command {
            MappingCommands::Show { location } => {
                let store = DirectoryMappingStore::new(&location.mapping_dir);
                let config = store.load(&location.mapping_name)?.unwrap_or_default();
                emit(None, &serde_json::to_string_pretty(&config.view())?)?;
                Ok(ExitCode::SUCCESS)
            }
            MappingCommands::Update { location, map, key } => {
                let store = DirectoryMappingStore::new(&location.mapping_dir);
                let edit: FieldMapping = map.into_iter().collect();
                let config = store.update(&location.mapping_name, &edit, &key)?;
                info!(
                    path = %store.path_for(&location.mapping_name)?.display(),
                    rows = config.rows().len(),
                    "mapping updated"
                );
                emit(None, &serde_json::to_string_pretty(&config.view())?)?;
                Ok(ExitCode::SUCCESS)
            }
        },
    }
}

fn load_options(
    input_format: Option<Input>,
    delimiter: Option<char>,
    sheet: Option<String>,
) -> CompareResult<LoadOptions> {
    let mut csv = CsvOptions::default();
    if let Some(d) = delimiter {
        csv.delimiter = u8::try_from(d)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| CompareError::Config {
                message: format!("delimiter must be a single ASCII character, got '{d}'"),
            })?;
    }
    Ok(LoadOptions {
        format: input_format.map(Into::into),
        csv,
        excel_sheet: sheet,
    })
}

fn emit(output: Option<&Path>, text: &str) -> CompareResult<()> {
    match output {
        Some(path) => fs::write(path, text)?,
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{text}")?;
        }
    }
    Ok(())
}

#[cfg(feature = "xlsx")]
fn write_xlsx(result: &tabular_diff::report::DiffResult, output: Option<&Path>) -> CompareResult<()> {
    let path = output.unwrap_or_else(|| Path::new("report.xlsx"));
    tabular_diff::report::XlsxRenderer.write_to_path(result, path)?;
    info!(path = %path.display(), "wrote xlsx report");
    Ok(())
}

#[cfg(not(feature = "xlsx"))]
fn write_xlsx(_result: &tabular_diff::report::DiffResult, _output: Option<&Path>) -> CompareResult<()> {
    Err(CompareError::Config {
        message: "xlsx output not enabled (enable cargo feature 'xlsx')".to_string(),
    })
}
