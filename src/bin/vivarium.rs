//! Vivarium CLI - Command-line interface for Vivarium Flux
//!
//! Commands:
//! - transform: Run the cohort pipeline over a data directory
//! - series: Transform a single table into one view
//! - validate: Validate a table file against its own subject set
//! - doctor: Diagnose a data directory and configuration
//! - schema: Describe input and output formats

use clap::{Args, Parser, Subcommand, ValueEnum};
use log::{info, warn};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use vivarium_flux::encoder::ReportEncoder;
use vivarium_flux::extraction::{extract_subjects, TableAdapter, TableFormat};
use vivarium_flux::loader::{load_cohort, DatasetSource, DirectorySource};
use vivarium_flux::pipeline::{SeriesTransformer, View};
use vivarium_flux::types::Dataset;
use vivarium_flux::{
    ComputeError, RecordingLayout, TransformConfig, UndefinedPolicy, FLUX_VERSION, PRODUCER_NAME,
};

/// Vivarium - Transformation pipeline for rodent activity and temperature recordings
#[derive(Parser)]
#[command(name = "vivarium")]
#[command(version = FLUX_VERSION)]
#[command(about = "Turn per-animal minute readings into plot-ready series", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every view over the four datasets of a recording
    Transform {
        /// Directory holding Female_Act, Male_Act, Female_Temp and Male_Temp (.json or .ndjson)
        #[arg(short, long)]
        data_dir: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Output format
        #[arg(long, default_value = "json")]
        output_format: OutputFormat,

        #[command(flatten)]
        transform: TransformArgs,
    },

    /// Transform a single table into one view
    Series {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// View to compute
        #[arg(long, value_enum)]
        view: ViewArg,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Output format
        #[arg(long, default_value = "json")]
        output_format: OutputFormat,

        #[command(flatten)]
        transform: TransformArgs,
    },

    /// Validate a table file
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// Recording days expected in the table
        #[arg(long, default_value = "14")]
        days: usize,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose a data directory and configuration
    Doctor {
        /// Data directory to check
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Configuration file to check
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print schema information
    Schema {
        /// Schema to print (input or output)
        #[arg(value_enum)]
        schema_type: SchemaType,
    },
}

/// Options shared by every command that runs the pipeline
#[derive(Args)]
struct TransformArgs {
    /// JSON configuration file; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Trailing moving-average window
    #[arg(long)]
    window: Option<usize>,

    /// Recording days
    #[arg(long)]
    days: Option<usize>,

    /// Minutes per recording day
    #[arg(long)]
    minutes_per_day: Option<usize>,

    /// Fail instead of emitting undefined (null) values
    #[arg(long)]
    strict: bool,
}

impl TransformArgs {
    fn resolve(&self) -> Result<TransformConfig, CliFailure> {
        let mut config = match &self.config {
            Some(path) => TransformConfig::from_json(&fs::read_to_string(path)?)?,
            None => TransformConfig::default(),
        };

        if let Some(window) = self.window {
            config.window = window;
        }
        let layout = RecordingLayout {
            days: self.days.unwrap_or(config.layout.days),
            minutes_per_day: self.minutes_per_day.unwrap_or(config.layout.minutes_per_day),
        };
        config = config.with_layout(layout);
        if self.strict {
            config = config.with_undefined_policy(UndefinedPolicy::Reject);
        }

        config.validate()?;
        Ok(config)
    }
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// JSON array of row objects
    Json,
    /// Newline-delimited JSON (one row object per line)
    Ndjson,
}

impl From<&InputFormat> for TableFormat {
    fn from(format: &InputFormat) -> Self {
        match format {
            InputFormat::Json => TableFormat::Json,
            InputFormat::Ndjson => TableFormat::Ndjson,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, Copy, ValueEnum)]
enum ViewArg {
    SmoothedActivity,
    Activity,
    Temperature,
    Hourly,
    Daily,
}

impl From<ViewArg> for View {
    fn from(view: ViewArg) -> Self {
        match view {
            ViewArg::SmoothedActivity => View::SmoothedActivity,
            ViewArg::Activity => View::Activity,
            ViewArg::Temperature => View::Temperature,
            ViewArg::Hourly => View::Hourly,
            ViewArg::Daily => View::Daily,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Input table format
    Input,
    /// Output payload format
    Output,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliFailure> {
    match cli.command {
        Commands::Transform {
            data_dir,
            output,
            output_format,
            transform,
        } => cmd_transform(&data_dir, &output, &output_format, &transform),

        Commands::Series {
            input,
            input_format,
            view,
            output,
            output_format,
            transform,
        } => cmd_series(
            &input,
            &input_format,
            view.into(),
            &output,
            &output_format,
            &transform,
        ),

        Commands::Validate {
            input,
            input_format,
            days,
            json,
        } => cmd_validate(&input, &input_format, days, json),

        Commands::Doctor {
            data_dir,
            config,
            json,
        } => cmd_doctor(data_dir.as_deref(), config.as_deref(), json),

        Commands::Schema { schema_type } => cmd_schema(schema_type),
    }
}

fn cmd_transform(
    data_dir: &Path,
    output: &Path,
    output_format: &OutputFormat,
    args: &TransformArgs,
) -> Result<(), CliFailure> {
    let config = args.resolve()?;
    let transformer = SeriesTransformer::new(config)?;

    let tables = load_cohort(&DirectorySource::new(data_dir))?;
    let report = transformer.process_cohort(&tables)?;

    let payload = ReportEncoder::new().encode_report(report, transformer.config());
    let output_data = format_output(&payload, output_format)?;
    write_output(output, &output_data)?;

    info!("wrote cohort report to {}", output.display());
    Ok(())
}

fn cmd_series(
    input: &Path,
    input_format: &InputFormat,
    view: View,
    output: &Path,
    output_format: &OutputFormat,
    args: &TransformArgs,
) -> Result<(), CliFailure> {
    let config = args.resolve()?;
    let transformer = SeriesTransformer::new(config)?;

    let table = TableAdapter::parse_table(&read_input(input)?, input_format.into())?;
    if table.subjects().is_empty() {
        return Err(CliFailure::NoSubjects);
    }

    let series = transformer.transform(&table, view)?;
    let payload = ReportEncoder::new().encode_series(series, view);
    write_output(output, &format_output(&payload, output_format)?)?;
    Ok(())
}

fn cmd_validate(
    input: &Path,
    input_format: &InputFormat,
    days: usize,
    json: bool,
) -> Result<(), CliFailure> {
    let records = TableAdapter::parse(&read_input(input)?, input_format.into())?;
    let subjects = extract_subjects(&records);
    let issues = TableAdapter::validate_records(&records);

    let layout = RecordingLayout {
        days,
        ..Default::default()
    };
    layout.validate()?;

    let report = ValidationReport {
        subjects: subjects.iter().map(|s| s.to_string()).collect(),
        rows: records.len(),
        expected_rows: layout.total_minutes(),
        invalid_readings: issues.len(),
        errors: issues
            .iter()
            .map(|issue| ValidationErrorDetail {
                index: issue.index,
                subject: issue.subject.to_string(),
                error: issue.error.to_string(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Subjects:      {}", report.subjects.join(", "));
        println!("Rows:          {}", report.rows);
        println!("Expected rows: {}", report.expected_rows);
        println!("Invalid readings: {}", report.invalid_readings);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!("  - Row {} ({}): {}", err.index, err.subject, err.error);
            }
        }
    }

    if report.subjects.is_empty() {
        Err(CliFailure::NoSubjects)
    } else if report.invalid_readings > 0 {
        Err(CliFailure::ValidationFailed(report.invalid_readings))
    } else {
        if report.rows < report.expected_rows {
            warn!(
                "{} rows is short of a {}-day recording; periodic views will be partial",
                report.rows, days
            );
        }
        Ok(())
    }
}

fn cmd_doctor(
    data_dir: Option<&Path>,
    config: Option<&Path>,
    json: bool,
) -> Result<(), CliFailure> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck::ok(
        "flux_version",
        format!("Flux version {}", FLUX_VERSION),
    ));

    let mut layout = RecordingLayout::default();

    if let Some(config_path) = config {
        match fs::read_to_string(config_path)
            .map_err(ComputeError::from)
            .and_then(|content| TransformConfig::from_json(&content))
        {
            Ok(parsed) => {
                layout = parsed.layout;
                checks.push(DoctorCheck::ok(
                    "config",
                    format!(
                        "Config valid (window {}, {} days x {} minutes)",
                        parsed.window, parsed.layout.days, parsed.layout.minutes_per_day
                    ),
                ));
            }
            Err(e) => checks.push(DoctorCheck::error("config", format!("Invalid config: {}", e))),
        }
    }

    if let Some(dir) = data_dir {
        let source = DirectorySource::new(dir);
        for dataset in Dataset::ALL {
            checks.push(check_dataset(&source, dataset, &layout));
        }
    }

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck::ok("stdin", "stdin is a TTY (interactive mode)".to_string())
    } else {
        DoctorCheck::ok("stdin", "stdin is a pipe (input via '-' ready)".to_string())
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: FLUX_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Vivarium Doctor Report");
        println!("======================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(CliFailure::DoctorFailed)
    } else {
        Ok(())
    }
}

fn check_dataset(source: &DirectorySource, dataset: Dataset, layout: &RecordingLayout) -> DoctorCheck {
    let name = dataset.as_str();
    if source.path_for(dataset).is_none() {
        return DoctorCheck::error(
            name,
            format!("{} not found in {}", dataset.file_stem(), source.dir().display()),
        );
    }

    match source.load(dataset) {
        Ok(table) if table.subjects().is_empty() => {
            DoctorCheck::error(name, "no numeric subject columns".to_string())
        }
        Ok(table) if table.len() < layout.total_minutes() => DoctorCheck::warning(
            name,
            format!(
                "{} subjects, {} rows (short of {} for {} days)",
                table.subjects().len(),
                table.len(),
                layout.total_minutes(),
                layout.days
            ),
        ),
        Ok(table) => DoctorCheck::ok(
            name,
            format!("{} subjects, {} rows", table.subjects().len(), table.len()),
        ),
        Err(e) => DoctorCheck::error(name, e.to_string()),
    }
}

fn cmd_schema(schema_type: SchemaType) -> Result<(), CliFailure> {
    match schema_type {
        SchemaType::Input => {
            println!("Input: one table per dataset");
            println!();
            println!("Files (in the data directory, .json or .ndjson):");
            for dataset in Dataset::ALL {
                println!("  - {} ({})", dataset.file_stem(), dataset.as_str());
            }
            println!();
            println!("Each table is a sequence of row objects, one per minute of recording.");
            println!("Numeric fields of the first row name the subjects (one per animal);");
            println!("every later row must carry the same subjects. null marks a missing reading.");
            println!();
            println!("  json:   [{{\"F1\": 12, \"F2\": 0}}, {{\"F1\": 3, \"F2\": 7}}]");
            println!("  ndjson: {{\"F1\": 12, \"F2\": 0}}");
        }
        SchemaType::Output => {
            println!("Output: report payload");
            println!();
            println!("- format_version, producer {{ name, version, instance_id }}, computed_at_utc");
            println!("- config: {{ window, layout {{ days, minutes_per_day }}, undefined_policy }}");
            println!("- report:");
            println!("  - activity:        {{ female, male }} normalized, smoothed, per minute");
            println!("  - hourly_activity: {{ female, male }} 24 points, hour of day");
            println!("  - daily_activity:  {{ female, male }} one point per day (1-based)");
            println!("  - temperature:     {{ female, male }} mean per minute");
            println!("  - subject_totals:  [{{ subject, sex, total }}]");
            println!("  - activity_temperature: [{{ activity, temperature }}]");
            println!("  - estrus_minutes:  minute offsets");
            println!();
            println!("Series are {{ axis, points: [{{ index, value }}] }}; undefined values are null.");
        }
    }

    Ok(())
}

// Helper functions

fn read_input(input: &Path) -> Result<String, CliFailure> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn write_output(output: &Path, data: &str) -> Result<(), CliFailure> {
    if output.to_string_lossy() == "-" {
        println!("{}", data);
    } else {
        fs::write(output, data)?;
    }
    Ok(())
}

fn format_output<T: serde::Serialize>(
    payload: &T,
    format: &OutputFormat,
) -> Result<String, CliFailure> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(payload)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(payload)?),
    }
}

// Error types

#[derive(Debug)]
enum CliFailure {
    Io(io::Error),
    Compute(ComputeError),
    Json(serde_json::Error),
    NoSubjects,
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for CliFailure {
    fn from(e: io::Error) -> Self {
        CliFailure::Io(e)
    }
}

impl From<ComputeError> for CliFailure {
    fn from(e: ComputeError) -> Self {
        CliFailure::Compute(e)
    }
}

impl From<serde_json::Error> for CliFailure {
    fn from(e: serde_json::Error) -> Self {
        CliFailure::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<CliFailure> for CliError {
    fn from(e: CliFailure) -> Self {
        match e {
            CliFailure::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            CliFailure::Compute(ComputeError::DatasetLoad { dataset, message }) => CliError {
                code: "LOAD_ERROR".to_string(),
                message: format!("{}: {}", dataset, message),
                hint: Some("Run 'vivarium doctor --data-dir <dir>' for details".to_string()),
            },
            CliFailure::Compute(ComputeError::UndefinedValue { view, index }) => CliError {
                code: "UNDEFINED_VALUE".to_string(),
                message: format!("{} series is undefined at index {}", view, index),
                hint: Some("Drop --strict to emit null values instead".to_string()),
            },
            CliFailure::Compute(ComputeError::InvalidConfig(msg)) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: msg,
                hint: Some("Check --window, --days and --minutes-per-day".to_string()),
            },
            CliFailure::Compute(e) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'vivarium validate' on the input table".to_string()),
            },
            CliFailure::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            CliFailure::NoSubjects => CliError {
                code: "NO_SUBJECTS".to_string(),
                message: "No numeric subject columns found in input".to_string(),
                hint: Some("Ensure the first row holds one numeric field per animal".to_string()),
            },
            CliFailure::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} readings failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            CliFailure::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    subjects: Vec<String>,
    rows: usize,
    expected_rows: usize,
    invalid_readings: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    subject: String,
    error: String,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

impl DoctorCheck {
    fn ok(name: &str, message: String) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message,
        }
    }

    fn warning(name: &str, message: String) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message,
        }
    }

    fn error(name: &str, message: String) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message,
        }
    }
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
