//! templc CLI - Bridge interface for build tooling
//!
//! Commands: generate, direction
//! Outputs JSON to stdout, logs to stderr
//! Returns 2 on pipeline failure, 1 on bad input

use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use templc_core::{
    plan_outputs, resolve, write_outputs, BackendOptions, CodegenPipeline, MessageBundle,
    TemplateFile, ENGINE_VERSION,
};

#[derive(Parser)]
#[command(name = "templc")]
#[command(about = "templc - Template Compiler, PHP source backend")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a JSON options file
    #[arg(short, long, global = true)]
    options: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate PHP source from parsed template files (JSON)
    Generate {
        /// JSON message bundle
        #[arg(short, long)]
        bundle: Option<PathBuf>,

        /// Directory to write `<stem>.php` files into
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Template files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print the direction generated code will assume
    Direction {
        /// Bundle locale, e.g. "ar" or "en-US"
        #[arg(short, long)]
        locale: Option<String>,
    },
}

fn main() -> ExitCode {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();

    let cli = Cli::parse();

    let options = match &cli.options {
        Some(path) => match BackendOptions::load(path) {
            Ok(o) => o,
            Err(e) => return input_error(format!("Failed to load options: {}", e)),
        },
        None => BackendOptions::new(),
    };

    match cli.command {
        Commands::Direction { locale } => {
            let direction = resolve(&options, locale.as_deref());
            let output = serde_json::json!({
                "direction": direction,
                "staticValue": direction.static_value(),
            });
            println!("{}", serde_json::to_string_pretty(&output).unwrap());
            ExitCode::SUCCESS
        }

        Commands::Generate { bundle, out_dir, files } => {
            let bundle = match bundle.as_deref().map(MessageBundle::load).transpose() {
                Ok(b) => b,
                Err(e) => return input_error(e.to_string()),
            };

            let plan = match plan_outputs(&files, out_dir.as_deref()) {
                Ok(p) => p,
                Err(e) => return input_error(e.to_string()),
            };

            let mut trees = Vec::with_capacity(files.len());
            for path in &files {
                match read_tree(path) {
                    Ok(tree) => trees.push(tree),
                    Err(e) => return input_error(e),
                }
            }

            let direction = resolve(&options, bundle.as_ref().map(MessageBundle::locale));
            let pipeline = CodegenPipeline::php();
            let sources = match pipeline.generate(trees, &options, bundle.as_ref()) {
                Ok(s) => s,
                Err(e) => {
                    tracing::error!(error = %e, "generation failed");
                    let output = serde_json::json!({
                        "success": false,
                        "error": e.to_string(),
                    });
                    println!("{}", serde_json::to_string(&output).unwrap());
                    return ExitCode::from(2);
                }
            };

            let entries = match write_outputs(&plan, &sources) {
                Ok(e) => e,
                Err(e) => return input_error(e.to_string()),
            };

            let output = serde_json::json!({
                "success": true,
                "engineVersion": ENGINE_VERSION,
                "direction": direction,
                "files": entries,
            });
            println!("{}", serde_json::to_string_pretty(&output).unwrap());
            ExitCode::SUCCESS
        }
    }
}

fn read_tree(path: &Path) -> Result<TemplateFile, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    serde_json::from_str(&content).map_err(|e| format!("Invalid template file {}: {}", path.display(), e))
}

fn input_error(message: String) -> ExitCode {
    let output = serde_json::json!({ "success": false, "error": message });
    println!("{}", serde_json::to_string(&output).unwrap());
    ExitCode::FAILURE
}
