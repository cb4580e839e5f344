use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgGroup, Parser};
use indicatif::{ProgressBar, ProgressStyle};

use sample_qc_rs::assemble::assemble;
use sample_qc_rs::config::QcConfig;
use sample_qc_rs::error::Result;
use sample_qc_rs::evaluate_sample;
use sample_qc_rs::sink::{submit_assembled, write_qc_results, LocalSink, OutputMode};
use sample_qc_rs::source::{JsonRecordSource, RecordSource, ReportRecordSource};
use sample_qc_rs::types::Server;

/// Quality check a sample's classification results against a set of
/// pre-defined criteria. Results are written as JSON.
#[derive(Parser, Debug)]
#[command(name = "sample-qc-rs", version, about)]
#[command(group(ArgGroup::new("source").required(true).args(["records", "report"])))]
#[command(group(ArgGroup::new("mode").args(["no_upload", "store", "test", "prod"])))]
struct Cli {
    /// Sample ID
    #[arg(short, long)]
    input: String,

    /// Path to file with QC criteria; the bundled defaults are used if omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Folder to save QC results to
    #[arg(short, long)]
    output: PathBuf,

    /// Server the sample lives on
    #[arg(short, long, value_enum)]
    server: Server,

    /// Directory of JSON sample records
    #[arg(long)]
    records: Option<PathBuf>,

    /// Kraken-style report to read classifier calls from
    #[arg(long)]
    report: Option<PathBuf>,

    /// Only write QC results to file (the default)
    #[arg(long)]
    no_upload: bool,

    /// Store results as an analysis record for later upload
    #[arg(long)]
    store: bool,

    /// Validate the analysis record without submitting it
    #[arg(long)]
    test: bool,

    /// Submit the analysis record
    #[arg(long)]
    prod: bool,
}

impl Cli {
    fn output_mode(&self) -> Option<OutputMode> {
        if self.store {
            Some(OutputMode::Store)
        } else if self.test {
            Some(OutputMode::Test)
        } else if self.prod {
            Some(OutputMode::Commit)
        } else {
            None
        }
    }

    fn record_source(&self) -> Box<dyn RecordSource> {
        match (&self.records, &self.report) {
            (_, Some(report)) => Box::new(ReportRecordSource::new(report)),
            (Some(dir), None) => Box::new(JsonRecordSource::new(dir)),
            // clap's `source` group guarantees one of the two
            (None, None) => Box::new(JsonRecordSource::new(".")),
        }
    }
}

fn spinner(color: &str, message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
        .template(&format!("{{spinner:.{color}}} {{msg}}"))
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner.set_message(message.to_string());
    spinner
}

fn run(cli: &Cli) -> Result<()> {
    // 1. Thresholds
    let config = match &cli.config {
        Some(path) => {
            log::info!("Reading QC parameters from file provided: {}", path.display());
            QcConfig::from_path(path)?
        }
        None => {
            log::info!("No config file specified, using bundled default parameters");
            QcConfig::bundled()?
        }
    };

    // 2. Fetch and evaluate
    let spinner_eval = spinner("green", &format!("Evaluating sample {}...", cli.input));
    let sample = cli.record_source().fetch(&cli.input, cli.server)?;
    let results = evaluate_sample(&sample, &config)?;
    spinner_eval.finish_with_message(results.get_summary_line());

    // 3. Local results always get written
    let results_file = write_qc_results(&results.verdicts, &cli.input, &cli.output)?;

    let Some(mode) = cli.output_mode() else {
        return Ok(());
    };

    // 4. Analysis record
    let (record, complete) = assemble(
        &cli.input,
        &config.thresholds,
        &results.verdicts,
        results.headline,
        cli.server,
        &results_file,
    );
    if !complete {
        log::error!(
            "Analysis record for {} is incomplete; QC results kept at {}",
            cli.input,
            results_file.display()
        );
    }

    // 5. Submit; an incomplete record is still stored, then reported
    let spinner_submit = spinner("yellow", "Submitting analysis record...");
    let sink = LocalSink::new(&cli.output);
    match submit_assembled(&sink, &record, complete, mode) {
        Ok(Some(id)) => {
            spinner_submit.finish_with_message(format!("Analysis record submitted as {id}"))
        }
        Ok(None) => spinner_submit.finish_with_message("Analysis record handled."),
        Err(err) => {
            spinner_submit.abandon_with_message("Analysis record not submitted.");
            return Err(err.into());
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let class = if err.is_external() { "backend" } else { "sample" };
            log::error!("{} failed ({class} error): {err}", cli.input);
            ExitCode::FAILURE
        }
    }
}
