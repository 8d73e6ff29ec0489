//! rtbkit-pipeline CLI - resolve and inspect the bidder pipeline configuration
//!
//! Usage:
//!   rtbkit-pipeline resolve cdk.json --stage dev
//!   rtbkit-pipeline get cdk.json ROOT_STACK_NAME
//!   rtbkit-pipeline plan cdk.json --format json
//!   rtbkit-pipeline check cdk.json cdk.context.json

use clap::{Parser, Subcommand};
use colored::Colorize;
use rtbkit_pipeline_core::settings::{resolve_setting, DEFAULT_STAGE};
use rtbkit_pipeline_core::{
    BuildStackPlan, ConfigResolver, Context, EnvOverrides, Error, FileSpec, OverrideSource,
    PipelineSettings, ResolvedValue, ScopeTier, Setting,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// rtbkit-pipeline - Configuration for the real-time bidder build pipeline
#[derive(Parser)]
#[command(name = "rtbkit-pipeline")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log resolution details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve every pipeline setting for a stage
    Resolve {
        /// Context file(s), merged in order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Deployment stage whose scope supplies stage settings
        #[arg(short, long, env = "RTBKIT_STAGE", default_value = DEFAULT_STAGE)]
        stage: String,

        /// Output format: text, json, yaml
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Resolve a single key through the override, scope and default tiers
    Get {
        /// Context file(s), merged in order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Configuration key (e.g., ROOT_STACK_NAME)
        key: String,

        /// Deployment stage whose scope supplies stage settings
        #[arg(short, long, env = "RTBKIT_STAGE", default_value = DEFAULT_STAGE)]
        stage: String,

        /// Scope tier to read: shared, stage (recognized keys know their own)
        #[arg(long)]
        scope: Option<String>,

        /// Default value if no tier has the key
        #[arg(short, long)]
        default: Option<String>,
    },

    /// Print the build stack plan
    Plan {
        /// Context file(s), merged in order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Deployment stage whose scope supplies stage settings
        #[arg(short, long, env = "RTBKIT_STAGE", default_value = DEFAULT_STAGE)]
        stage: String,

        /// Output format: yaml, json
        #[arg(short, long, default_value = "yaml")]
        format: String,

        /// Write to file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Load context files and list their scopes
    Check {
        /// Context file(s) to check
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

/// Run the CLI with the process arguments
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let overrides = EnvOverrides;

    match cli.command {
        Commands::Resolve {
            files,
            stage,
            format,
        } => cmd_resolve(&overrides, &files, &stage, &format),

        Commands::Get {
            files,
            key,
            stage,
            scope,
            default,
        } => cmd_get(&overrides, &files, &key, &stage, scope.as_deref(), default),

        Commands::Plan {
            files,
            stage,
            format,
            output,
        } => cmd_plan(&overrides, &files, &stage, &format, output),

        Commands::Check { files } => cmd_check(files),
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    // Installing the subscriber also routes `log` records from the core crate
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn load_context(files: &[PathBuf]) -> Result<Context, String> {
    if files.is_empty() {
        return Err("No context files specified".to_string());
    }

    let specs: Vec<FileSpec> = files.iter().map(FileSpec::required).collect();
    let context = Context::load_merged(&specs).map_err(|e| {
        let names: Vec<_> = files.iter().map(|f| f.display().to_string()).collect();
        format!("Failed to load {}: {}", names.join(", "), e)
    })?;

    tracing::debug!(
        files = files.len(),
        scopes = context.scope_names().count(),
        "loaded context"
    );

    Ok(context)
}

fn report_error(e: &Error) -> ExitCode {
    eprintln!("{} {}", "✗".red(), e);
    if e.is_missing_required() {
        ExitCode::from(1)
    } else {
        ExitCode::from(2)
    }
}

fn write_output(content: &str, output: Option<PathBuf>) -> ExitCode {
    if let Some(output_path) = output {
        if let Err(e) = std::fs::write(&output_path, content) {
            eprintln!("{}: {}", "Error writing file".red(), e);
            return ExitCode::from(2);
        }
        eprintln!("{} Wrote to {}", "✓".green(), output_path.display());
    } else {
        print!("{}", content);
    }
    ExitCode::SUCCESS
}

/// Plain-text table of resolved settings
pub fn format_settings_text(settings: &PipelineSettings) -> String {
    let width = Setting::ALL
        .iter()
        .map(|s| s.key().len())
        .max()
        .unwrap_or_default();

    let mut out = format!("stage: {}\n", settings.stage);
    for (setting, resolved) in settings.entries() {
        out.push_str(&format!(
            "{:<width$}  {}  ({})\n",
            setting.key(),
            resolved.value,
            resolved.tier,
            width = width
        ));
    }
    if let Some(account) = &settings.account {
        out.push_str(&format!("{:<width$}  {}\n", "account", account, width = width));
    }
    if let Some(region) = &settings.region {
        out.push_str(&format!("{:<width$}  {}\n", "region", region, width = width));
    }
    out
}

fn cmd_resolve(
    overrides: &dyn OverrideSource,
    files: &[PathBuf],
    stage: &str,
    format: &str,
) -> ExitCode {
    let context = match load_context(files) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e.red());
            return ExitCode::from(2);
        }
    };

    let settings = match PipelineSettings::resolve(overrides, &context, stage) {
        Ok(s) => s,
        Err(e) => return report_error(&e),
    };

    let rendered = match format {
        "json" => serde_json::to_string_pretty(&settings)
            .map(|s| s + "\n")
            .map_err(|e| e.to_string()),
        "yaml" | "yml" => serde_yaml::to_string(&settings).map_err(|e| e.to_string()),
        "text" => Ok(format_settings_text(&settings)),
        other => Err(format!(
            "Unsupported format: {}. Use text, json, or yaml.",
            other
        )),
    };

    match rendered {
        Ok(content) => write_output(&content, None),
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            ExitCode::from(2)
        }
    }
}

/// Resolve one key the way the pipeline stack would
///
/// Recognized settings bring their own scope tier, default and
/// normalization; `scope` and `default` override the first two.
pub fn resolve_key(
    overrides: &dyn OverrideSource,
    context: &Context,
    key: &str,
    stage: &str,
    scope: Option<ScopeTier>,
    default: Option<&str>,
) -> Result<Option<ResolvedValue>, Error> {
    let resolver = ConfigResolver::new(overrides);
    let setting = Setting::from_key(key);

    let tier = scope
        .or_else(|| setting.map(Setting::scope_tier))
        .unwrap_or(ScopeTier::Shared);
    let scope = match tier {
        ScopeTier::Shared => context.shared(),
        ScopeTier::Stage => context.scope(stage),
    };

    match (setting, default) {
        (Some(setting), None) => resolve_setting(&resolver, setting, scope).map(Some),
        (Some(setting), Some(default)) => {
            let resolved = resolver.resolve(key, scope, Some(default));
            Ok(resolved.map(|r| if setting.is_identifier() { r.normalized() } else { r }))
        }
        (None, default) => Ok(resolver.resolve(key, scope, default)),
    }
}

fn cmd_get(
    overrides: &dyn OverrideSource,
    files: &[PathBuf],
    key: &str,
    stage: &str,
    scope: Option<&str>,
    default: Option<String>,
) -> ExitCode {
    let scope = match scope.map(str::parse::<ScopeTier>).transpose() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            return ExitCode::from(2);
        }
    };

    let context = match load_context(files) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e.red());
            return ExitCode::from(2);
        }
    };

    match resolve_key(overrides, &context, key, stage, scope, default.as_deref()) {
        Ok(Some(resolved)) => {
            println!("{}", resolved.value);
            ExitCode::SUCCESS
        }
        Ok(None) => {
            eprintln!(
                "{}: Key '{}' is not set in the environment or the context",
                "Error".red(),
                key
            );
            ExitCode::from(1)
        }
        Err(e) => report_error(&e),
    }
}

fn cmd_plan(
    overrides: &dyn OverrideSource,
    files: &[PathBuf],
    stage: &str,
    format: &str,
    output: Option<PathBuf>,
) -> ExitCode {
    let context = match load_context(files) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e.red());
            return ExitCode::from(2);
        }
    };

    let settings = match PipelineSettings::resolve(overrides, &context, stage) {
        Ok(s) => s,
        Err(e) => return report_error(&e),
    };

    let plan = BuildStackPlan::from_settings(&settings);

    let rendered = match format {
        "json" => plan.to_json().map(|s| s + "\n"),
        "yaml" | "yml" => plan.to_yaml(),
        other => {
            eprintln!("Unsupported format: {}. Use yaml or json.", other);
            return ExitCode::from(2);
        }
    };

    match rendered {
        Ok(content) => write_output(&content, output),
        Err(e) => report_error(&e),
    }
}

fn cmd_check(files: Vec<PathBuf>) -> ExitCode {
    let mut all_valid = true;

    for file in files {
        match Context::load(&file) {
            Ok(context) => {
                let names: Vec<_> = context.scope_names().collect();
                let scopes = if names.is_empty() {
                    "no scopes".to_string()
                } else {
                    format!("scopes {}", names.join(", "))
                };
                println!("{} {}: {}", "✓".green(), file.display(), scopes);
            }
            Err(e) => {
                eprintln!("{} {}: {}", "✗".red(), file.display(), e);
                all_valid = false;
            }
        }
    }

    if all_valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}
