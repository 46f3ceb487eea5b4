//! Batch submission and status commands.

use crate::{CliResult, OutputArgs, OutputFormat, emit_output};
use clap::{ArgGroup, Args, Subcommand};
use codelens_core::{
    ApiClient, BatchAnalysisResponse, FileStatus, HttpTransport, TokioSleeper, UploadFile,
    format_file_size, poll_batch, render_batch_markdown, render_json, similarity_label,
    validate::validate_archive,
};
use std::fmt::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Batch subcommands.
#[derive(Subcommand, Clone)]
pub(crate) enum BatchCommand {
    /// Submit an archive or Google Drive link for batch analysis.
    Submit(SubmitArgs),
    /// Show the current status of a batch.
    Status {
        /// Batch identifier returned on submission.
        batch_id: String,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Fetch the per-file results of a batch.
    Results {
        /// Batch identifier returned on submission.
        batch_id: String,
        #[command(flatten)]
        output: OutputArgs,
    },
}

/// Arguments for `batch submit`.
#[derive(Args, Clone)]
#[command(group(
    ArgGroup::new("source")
        .required(true)
        .args(&["archive", "drive_url"])
))]
pub(crate) struct SubmitArgs {
    /// ZIP or RAR archive of source files (50MB max).
    #[arg(long)]
    pub(crate) archive: Option<PathBuf>,
    /// Shared Google Drive folder or file link.
    #[arg(long = "drive-url")]
    pub(crate) drive_url: Option<String>,
    /// Poll until the batch finishes.
    #[arg(long)]
    pub(crate) wait: bool,
    /// Seconds between status polls.
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u64).range(1..))]
    pub(crate) interval: u64,
    #[command(flatten)]
    pub(crate) output: OutputArgs,
}

/// Dispatch a batch subcommand.
pub(crate) async fn run_batch<T: HttpTransport>(
    client: &ApiClient<T>,
    command: BatchCommand,
) -> CliResult<()> {
    match command {
        BatchCommand::Submit(args) => run_submit(client, args).await,
        BatchCommand::Status { batch_id, output } => {
            let batch = client.batch_status(batch_id.trim()).await?;
            emit_batch(&batch, &output).await
        }
        BatchCommand::Results { batch_id, output } => {
            let batch = client.batch_results(batch_id.trim()).await?;
            emit_batch(&batch, &output).await
        }
    }
}

async fn run_submit<T: HttpTransport>(client: &ApiClient<T>, args: SubmitArgs) -> CliResult<()> {
    let submitted = match (&args.archive, &args.drive_url) {
        (Some(path), _) => {
            let archive = load_archive(path).await?;
            client.upload_batch_archive(archive).await?
        }
        (None, Some(url)) => client.analyze_batch_google_drive(url).await?,
        (None, None) => return Err("either --archive or --drive-url is required".into()),
    };
    log::info!(
        "submitted batch {} with {} files",
        submitted.batch_id,
        submitted.total_files
    );

    let batch = if args.wait && !submitted.status.is_terminal() {
        poll_batch(
            client,
            &submitted.batch_id,
            &TokioSleeper,
            Duration::from_secs(args.interval),
            |batch| {
                eprintln!(
                    "Batch {}: {} ({}/{} files)",
                    batch.batch_id,
                    batch.status.as_str(),
                    batch.processed_files,
                    batch.total_files
                );
            },
        )
        .await?
    } else {
        submitted
    };
    emit_batch(&batch, &args.output).await
}

/// Read an archive after checking its name and size on disk.
async fn load_archive(path: &Path) -> CliResult<UploadFile> {
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| format!("invalid archive path: {}", path.display()))?
        .to_string();
    let size = tokio::fs::metadata(path).await?.len();
    validate_archive(&filename, size)?;
    let bytes = tokio::fs::read(path).await?;
    Ok(UploadFile { filename, bytes })
}

async fn emit_batch(batch: &BatchAnalysisResponse, output: &OutputArgs) -> CliResult<()> {
    let contents = match output.format {
        OutputFormat::Text => render_batch_text(batch),
        OutputFormat::Markdown => render_batch_markdown(batch),
        OutputFormat::Json => render_json(batch)?,
    };
    emit_output(output, contents).await
}

fn render_batch_text(batch: &BatchAnalysisResponse) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "Batch: {}", batch.batch_id);
    let _ = writeln!(output, "Status: {}", batch.status.as_str());
    let _ = writeln!(
        output,
        "Processed: {}/{} files",
        batch.processed_files, batch.total_files
    );
    if let Some(message) = &batch.message {
        let _ = writeln!(output, "Message: {message}");
    }
    if batch.results.is_empty() {
        return output;
    }
    let succeeded = batch.successful_results().count();
    let _ = writeln!(
        output,
        "Results: {succeeded} succeeded, {} failed",
        batch.results.len() - succeeded
    );
    for file in &batch.results {
        match file.status {
            FileStatus::Success => {
                let _ = writeln!(
                    output,
                    "  - {}: {} (AI {:.1}%, human {:.1}%, {} lines, {})",
                    file.filepath,
                    similarity_label(file.ai_similarity, file.human_similarity).as_str(),
                    file.ai_similarity,
                    file.human_similarity,
                    file.loc,
                    format_file_size(file.file_size)
                );
            }
            FileStatus::Error => {
                let _ = writeln!(
                    output,
                    "  - {}: error ({})",
                    file.filepath,
                    file.error.as_deref().unwrap_or("unknown error")
                );
            }
        }
    }
    output
}
