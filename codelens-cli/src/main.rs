#![deny(missing_docs)]
//! CodeLens command-line interface.
//!
//! Submits source code to the analysis backend and renders the results.

mod batch;

use batch::BatchCommand;
use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use codelens_core::{
    AnalysisMethodsResponse, AnalysisMode, AnalysisResult, ApiClient, Clock, CodeAnalysisRequest,
    ConfidenceLevel, HealthStatus, HttpTransport, KeyValueStore, ResultCache, UploadFile,
    cache_key, detect_language, format_file_size, format_percent, render_analysis_markdown,
    render_json, validate::validate_code, write_export,
};
use std::fmt::Write;
use std::path::{Path, PathBuf};

pub(crate) type CliResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Parser)]
#[command(name = "codelens", version, about = "CodeLens AI code detection CLI")]
struct Cli {
    /// Backend base URL (defaults to CODELENS_API_URL or NEXT_PUBLIC_API_URL).
    #[arg(long = "api-url", global = true)]
    api_url: Option<String>,
    /// Directory holding cached analysis results.
    #[arg(long = "cache-dir", global = true)]
    cache_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct OutputArgs {
    /// Output format for report data.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    /// Write the report to a file instead of stdout.
    #[arg(long = "report-output")]
    report_output: Option<PathBuf>,
}

#[derive(ValueEnum, Copy, Clone, Debug, Eq, PartialEq)]
enum OutputFormat {
    Text,
    Json,
    Markdown,
}

#[derive(ValueEnum, Copy, Clone, Debug, Eq, PartialEq)]
enum ModeArg {
    Combined,
    Ast,
    HumanStyle,
    Advanced,
    Ai,
}

impl From<ModeArg> for AnalysisMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Combined => AnalysisMode::Combined,
            ModeArg::Ast => AnalysisMode::Ast,
            ModeArg::HumanStyle => AnalysisMode::HumanStyle,
            ModeArg::Advanced => AnalysisMode::Advanced,
            ModeArg::Ai => AnalysisMode::Ai,
        }
    }
}

#[derive(Args, Clone)]
#[command(group(
    ArgGroup::new("input")
        .required(true)
        .args(&["file", "code"])
))]
struct AnalyzeArgs {
    /// Source file to analyze.
    #[arg(short, long)]
    file: Option<PathBuf>,
    /// Inline source code to analyze.
    #[arg(long)]
    code: Option<String>,
    /// Programming language; inferred from the file extension or the code when omitted.
    #[arg(short, long)]
    language: Option<String>,
    /// Analysis mode.
    #[arg(short, long, value_enum, default_value_t = ModeArg::Combined)]
    mode: ModeArg,
    /// Filename reported to the backend.
    #[arg(long)]
    filename: Option<String>,
    /// Send the file as a multipart upload instead of JSON.
    #[arg(long, requires = "file", conflicts_with = "code")]
    upload: bool,
    /// Skip the result cache.
    #[arg(long = "no-cache")]
    no_cache: bool,
    /// Also write an exported JSON report into this directory.
    #[arg(long)]
    export: Option<PathBuf>,
    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args, Clone)]
struct ExportArgs {
    /// Cache key printed by `analyze`.
    #[arg(long)]
    key: String,
    /// Directory to write the report into.
    #[arg(long, default_value = ".")]
    dir: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Check backend health and module availability.
    Health {
        #[command(flatten)]
        output: OutputArgs,
    },
    /// List analysis modes and submission limits.
    Methods {
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Analyze a source file or inline code.
    Analyze(AnalyzeArgs),
    /// Submit and track multi-file batch analyses.
    Batch {
        #[command(subcommand)]
        command: BatchCommand,
    },
    /// Export a cached analysis as a JSON report.
    Export(ExportArgs),
}

#[cfg(not(test))]
#[tokio::main]
async fn main() -> std::process::ExitCode {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", codelens_core::error_message(err.as_ref()));
            std::process::ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
fn main() {}

#[cfg(not(test))]
async fn run(cli: Cli) -> CliResult<()> {
    use codelens_core::{ClientConfig, DirStore, ReqwestTransport, SystemClock, cache_dir};

    let config = ClientConfig::from_env().with_api_url(cli.api_url);
    log::debug!("using backend {}", config.api_url);
    let client = ApiClient::new(&config.api_url, ReqwestTransport::new()?);
    let open_cache = |dir: Option<PathBuf>| -> CliResult<ResultCache<DirStore, SystemClock>> {
        Ok(ResultCache::new(DirStore::new(cache_dir(dir)?), SystemClock))
    };

    match cli.command {
        Commands::Health { output } => run_health(&client, &output).await?,
        Commands::Methods { output } => run_methods(&client, &output).await?,
        Commands::Analyze(args) => {
            let cache = open_cache(cli.cache_dir)?;
            run_analyze(&client, &cache, args).await?
        }
        Commands::Batch { command } => batch::run_batch(&client, command).await?,
        Commands::Export(args) => {
            let cache = open_cache(cli.cache_dir)?;
            let path = run_export(&cache, &args)?;
            println!("Exported report to {}", path.display());
        }
    }

    Ok(())
}

async fn run_health<T: HttpTransport>(client: &ApiClient<T>, output: &OutputArgs) -> CliResult<()> {
    let health = client.health_check().await?;
    let contents = match output.format {
        OutputFormat::Json => render_json(&health)?,
        OutputFormat::Text | OutputFormat::Markdown => render_health_text(&health),
    };
    emit_output(output, contents).await
}

async fn run_methods<T: HttpTransport>(
    client: &ApiClient<T>,
    output: &OutputArgs,
) -> CliResult<()> {
    let methods = client.analysis_methods().await?;
    let contents = match output.format {
        OutputFormat::Json => render_json(&methods)?,
        OutputFormat::Text | OutputFormat::Markdown => render_methods_text(&methods),
    };
    emit_output(output, contents).await
}

async fn run_analyze<T, S, C>(
    client: &ApiClient<T>,
    cache: &ResultCache<S, C>,
    args: AnalyzeArgs,
) -> CliResult<()>
where
    T: HttpTransport,
    S: KeyValueStore,
    C: Clock,
{
    if args.upload && args.file.is_none() {
        return Err("--upload needs --file".into());
    }
    let (code, file_name) = load_source(&args).await?;
    validate_code(&code)?;
    let language = args
        .language
        .clone()
        .unwrap_or_else(|| infer_language(file_name.as_deref(), &code).to_string());
    let mode = AnalysisMode::from(args.mode);
    let key = cache_key(client.base_url(), mode, &language, &code);

    let cached = if args.no_cache {
        None
    } else {
        cache.get_cached::<AnalysisResult>(&key)
    };
    let result = match cached {
        Some(result) => {
            log::info!("using cached {} analysis {}", mode.as_str(), result.analysis_id());
            result
        }
        None => {
            let filename = args.filename.clone().or(file_name);
            let result = submit(client, code, &language, mode, filename, args.upload).await?;
            if !args.no_cache {
                cache.cache(&key, &result);
            }
            result
        }
    };

    if let Some(dir) = &args.export {
        let path = write_export(dir, &result, chrono::Utc::now())?;
        eprintln!("Exported report to {}", path.display());
    }
    emit_analysis(&result, &args.output, (!args.no_cache).then_some(key.as_str())).await
}

async fn submit<T: HttpTransport>(
    client: &ApiClient<T>,
    code: String,
    language: &str,
    mode: AnalysisMode,
    filename: Option<String>,
    upload: bool,
) -> CliResult<AnalysisResult> {
    if upload {
        let filename = filename.ok_or("--upload needs a filename")?;
        let file = UploadFile {
            filename,
            bytes: code.into_bytes(),
        };
        return Ok(client.analyze_file(file, mode, language).await?);
    }
    let mut request = CodeAnalysisRequest::new(code, language);
    if let Some(filename) = filename {
        request = request.with_filename(filename);
    }
    Ok(client.analyze(&request, mode).await?)
}

async fn load_source(args: &AnalyzeArgs) -> CliResult<(String, Option<String>)> {
    match (&args.file, &args.code) {
        (Some(path), _) => {
            let code = tokio::fs::read_to_string(path).await?;
            Ok((code, file_name(path)))
        }
        (None, Some(code)) => Ok((code.clone(), None)),
        (None, None) => Err("either --file or --code is required".into()),
    }
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
}

/// Language for a C or C++ file extension, otherwise detected from the code.
fn infer_language(file_name: Option<&str>, code: &str) -> &'static str {
    let extension = file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("cpp" | "cc" | "cxx" | "hpp") => "cpp",
        Some("c" | "h") => "c",
        _ => detect_language(code),
    }
}

fn run_export<S: KeyValueStore, C: Clock>(
    cache: &ResultCache<S, C>,
    args: &ExportArgs,
) -> CliResult<PathBuf> {
    let key = args.key.trim();
    let result = cache
        .get_cached::<AnalysisResult>(key)
        .ok_or_else(|| format!("no cached analysis for key {key}"))?;
    Ok(write_export(&args.dir, &result, chrono::Utc::now())?)
}

async fn emit_analysis(
    result: &AnalysisResult,
    output: &OutputArgs,
    key: Option<&str>,
) -> CliResult<()> {
    let contents = match output.format {
        OutputFormat::Text => render_analysis_text(result, key),
        OutputFormat::Markdown => render_analysis_markdown(result),
        OutputFormat::Json => render_json(result)?,
    };
    emit_output(output, contents).await
}

async fn emit_output(output: &OutputArgs, contents: String) -> CliResult<()> {
    if let Some(path) = &output.report_output {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, contents).await?;
    } else {
        print!("{contents}");
    }
    Ok(())
}

fn render_analysis_text(result: &AnalysisResult, key: Option<&str>) -> String {
    let mut output = String::new();
    let _ = writeln!(
        output,
        "Analysis: {} ({})",
        result.analysis_id(),
        result.kind().as_str()
    );
    match result {
        AnalysisResult::Combined(response) => {
            let info = &response.code_info;
            let _ = writeln!(
                output,
                "File: {} ({}, {} lines, {})",
                info.filename,
                info.language,
                info.loc,
                format_file_size(info.file_size)
            );
            let assessment = &response.assessment;
            let _ = writeln!(
                output,
                "AI likelihood: {} (confidence {})",
                format_percent(assessment.overall_score),
                format_percent(assessment.confidence)
            );
            let level = ConfidenceLevel::from_score(assessment.overall_score);
            let _ = writeln!(output, "Level: {} ({})", level.as_str(), level.description());
            let _ = writeln!(output, "Summary: {}", assessment.summary);
            if !assessment.key_indicators.is_empty() {
                let _ = writeln!(
                    output,
                    "Key indicators: {}",
                    assessment.key_indicators.join(", ")
                );
            }
            for (_, group) in response.feature_groups.iter() {
                let _ = writeln!(
                    output,
                    "{} (score {:.2})",
                    group.group_name, group.group_score
                );
                for feature in &group.features {
                    let verdict = feature
                        .baseline_comparison
                        .as_ref()
                        .map(|cmp| format!(" [{}]", cmp.verdict.as_str()))
                        .unwrap_or_default();
                    let _ = writeln!(
                        output,
                        "  - {}: {:.3}{verdict}",
                        feature.name, feature.value
                    );
                }
            }
        }
        AnalysisResult::Individual(response) => {
            let _ = writeln!(
                output,
                "File: {} ({})",
                response.code_info.filename, response.code_info.language
            );
            let _ = writeln!(output, "Summary: {}", response.summary);
            let _ = writeln!(output, "Features:");
            for (name, value) in &response.features {
                let _ = writeln!(output, "  - {name}: {value:.3}");
            }
        }
        AnalysisResult::AiMdx(response) => {
            let _ = writeln!(output);
            let _ = writeln!(output, "{}", response.mdx_content.trim_end());
        }
    }
    if let Some(key) = key {
        let _ = writeln!(output, "Cache key: {key}");
    }
    output
}

fn render_health_text(health: &HealthStatus) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "Status: {}", health.status);
    let _ = writeln!(output, "Timestamp: {}", health.timestamp);
    if !health.modules.is_empty() {
        let _ = writeln!(output, "Modules:");
        for (module, available) in &health.modules {
            let state = if *available { "available" } else { "unavailable" };
            let _ = writeln!(output, "  - {module}: {state}");
        }
    }
    output
}

fn render_methods_text(methods: &AnalysisMethodsResponse) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "Methods:");
    for method in &methods.methods {
        let _ = writeln!(
            output,
            "  - {} ({}): {} [{}]",
            method.id, method.name, method.description, method.estimated_time
        );
    }
    let _ = writeln!(
        output,
        "Languages: {}",
        methods.supported_languages.join(", ")
    );
    let _ = writeln!(
        output,
        "Extensions: {}",
        methods.supported_extensions.join(", ")
    );
    let _ = writeln!(
        output,
        "Limits: {} per file, {} characters",
        methods.max_file_size, methods.max_code_length
    );
    output
}
