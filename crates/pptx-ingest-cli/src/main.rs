mod logging;
#[cfg(feature = "server")]
mod metrics;
#[cfg(feature = "server")]
mod server;
mod uploader;

use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pptx_ingest::config::{ImageOptions, ProcessOptions};
use pptx_ingest::ingest::Ingestor;
use pptx_ingest::ir::{ProcessingResult, Transition};
use pptx_ingest::media::MediaServices;
use rayon::prelude::*;

use uploader::DirUploader;

#[derive(Parser)]
#[command(
    name = "pptx-ingest",
    version,
    about = "Validate PPTX presentations and turn them into slide timelines"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check that each file is an acceptable upload
    Validate {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Ingest each file and print its result as JSON
    Process(ProcessArgs),
    /// Serve the HTTP API
    #[cfg(feature = "server")]
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
}

#[derive(clap::Args)]
struct ProcessArgs {
    /// Input .pptx files
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Project the ingested assets belong to
    #[arg(long, default_value = "local")]
    project_id: String,

    /// Duration of every slide, in seconds
    #[arg(long)]
    duration: Option<f64>,

    /// Transition for every slide, as TYPE[:SECONDS] (e.g. "push:0.8")
    #[arg(long, value_parser = Transition::parse)]
    transition: Option<Transition>,

    /// Generate image thumbnails
    #[arg(long)]
    thumbnails: bool,

    /// Store images (and thumbnails) under this directory
    #[arg(long)]
    upload_dir: Option<PathBuf>,

    /// Fail the whole file on the first slide that cannot be read
    #[arg(long)]
    strict: bool,

    /// Give up on a file after this many seconds
    #[arg(long)]
    timeout: Option<f64>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

impl ProcessArgs {
    fn options(&self) -> Result<ProcessOptions> {
        let deadline = self
            .timeout
            .map(Duration::try_from_secs_f64)
            .transpose()
            .map_err(|e| anyhow::anyhow!("invalid --timeout value: {e}"))?;

        Ok(ProcessOptions {
            default_duration: self.duration,
            transition: self.transition.clone(),
            images: ImageOptions {
                upload_enabled: self.upload_dir.is_some(),
                generate_thumbnails: self.thumbnails,
            },
            strict_slides: self.strict,
            deadline,
            cancel: None,
        })
    }

    fn ingestor(&self) -> Ingestor {
        let media = match &self.upload_dir {
            Some(dir) => MediaServices::default().with_uploader(DirUploader::new(dir)),
            None => MediaServices::default(),
        };
        Ingestor::with_media(media)
    }
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err:#}");
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(logging::level_for(cli.verbose, cli.quiet))?;

    match cli.command {
        Command::Validate { files } => validate_files(&files),
        Command::Process(args) => process_files(&args),
        #[cfg(feature = "server")]
        Command::Serve { host, port } => {
            server::start_server(&host, port, server::ServerState::new(Ingestor::new()))
        }
    }
}

fn validate_files(files: &[PathBuf]) -> Result<()> {
    let mut failed = 0;
    for path in files {
        match pptx_ingest::validate_path(path) {
            Ok(_) => println!("{}: ok", path.display()),
            Err(e) => {
                failed += 1;
                println!("{}: {e}", path.display());
            }
        }
    }
    if failed > 0 {
        anyhow::bail!("{failed} of {} file(s) failed validation", files.len());
    }
    Ok(())
}

fn process_files(args: &ProcessArgs) -> Result<()> {
    let options = args.options()?;
    let ingestor = args.ingestor();

    let results: Vec<ProcessingResult> = args
        .files
        .par_iter()
        .map(|path| process_one(&ingestor, path, &args.project_id, &options))
        .collect();

    let mut failed = 0;
    for (path, result) in args.files.iter().zip(&results) {
        for warning in &result.warnings {
            tracing::warn!(file = %path.display(), "{warning}");
        }
        if !result.success {
            failed += 1;
        }
        let json = result
            .to_json(args.pretty)
            .with_context(|| format!("serializing result for {:?}", path))?;
        println!("{json}");
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} file(s) failed", results.len());
    }
    Ok(())
}

fn process_one(
    ingestor: &Ingestor,
    path: &Path,
    project_id: &str,
    options: &ProcessOptions,
) -> ProcessingResult {
    match pptx_ingest::validate_path(path) {
        Ok(data) => ingestor.process(&data, project_id, options),
        Err(e) => ProcessingResult::failure(&e.into()),
    }
}
