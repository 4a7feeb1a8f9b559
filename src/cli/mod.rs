//! CLI subcommands: init, validate, list, synth, diff, schema, completions.

use crate::core::construct::{App, Construct};
use crate::core::{parser, planner, resolver, synth, types};
use crate::error::{Error, Result};
use crate::stacks;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG: &str = "tablestack.yaml";
pub const DEFAULT_OUTDIR: &str = "cdk.out";

#[derive(Parser, Debug)]
#[command(
    name = "tablestack",
    version,
    about = "Declarative DynamoDB table stacks synthesized to CloudFormation"
)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Template output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Json,
    Yaml,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new tablestack project
    Init {
        /// Directory to initialize (default: current)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Validate the config and the declared stacks
    Validate {
        /// Path to tablestack.yaml
        #[arg(short, long, env = "TABLESTACK_CONFIG", default_value = DEFAULT_CONFIG)]
        file: PathBuf,
    },

    /// List declared stacks and their tables
    List {
        /// Path to tablestack.yaml
        #[arg(short, long, env = "TABLESTACK_CONFIG", default_value = DEFAULT_CONFIG)]
        file: PathBuf,
    },

    /// Synthesize CloudFormation templates into the output directory
    Synth {
        /// Path to tablestack.yaml
        #[arg(short, long, env = "TABLESTACK_CONFIG", default_value = DEFAULT_CONFIG)]
        file: PathBuf,

        /// Cloud assembly output directory
        #[arg(short, long, env = "TABLESTACK_OUTDIR", default_value = DEFAULT_OUTDIR)]
        output: PathBuf,

        /// Print this stack's template (default: the only stack)
        #[arg(short, long)]
        stack: Option<String>,

        /// Format of the printed template
        #[arg(long, value_enum, default_value_t = Format::Yaml)]
        format: Format,

        /// Write the assembly without printing a template
        #[arg(short, long)]
        quiet: bool,
    },

    /// Show what would change relative to the previous synthesis
    Diff {
        /// Path to tablestack.yaml
        #[arg(short, long, env = "TABLESTACK_CONFIG", default_value = DEFAULT_CONFIG)]
        file: PathBuf,

        /// Cloud assembly directory holding the previous synthesis
        #[arg(short, long, env = "TABLESTACK_OUTDIR", default_value = DEFAULT_OUTDIR)]
        output: PathBuf,

        /// Exit non-zero when there are changes (for CI)
        #[arg(long)]
        fail: bool,
    },

    /// Print the JSON schema of tablestack.yaml
    Schema,

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Init { path } => cmd_init(&path),
        Commands::Validate { file } => cmd_validate(&file),
        Commands::List { file } => cmd_list(&file),
        Commands::Synth {
            file,
            output,
            stack,
            format,
            quiet,
        } => cmd_synth(&file, &output, stack.as_deref(), format, quiet),
        Commands::Diff { file, output, fail } => cmd_diff(&file, &output, fail),
        Commands::Schema => cmd_schema(),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "tablestack", &mut std::io::stdout());
            Ok(())
        }
    }
}

const INIT_TEMPLATE: &str = r#"version: "1.0"
name: users-db
description: "Managed by tablestack"

params: {}

stacks:
  Dev:
    env:
      account: "{{env.CDK_DEFAULT_ACCOUNT}}"
      region: "{{env.CDK_DEFAULT_REGION}}"
"#;

fn cmd_init(path: &Path) -> Result<()> {
    let config_path = path.join(DEFAULT_CONFIG);
    if config_path.exists() {
        return Err(Error::AlreadyExists(config_path));
    }

    std::fs::create_dir_all(path).map_err(|source| Error::Write {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(&config_path, INIT_TEMPLATE).map_err(|source| Error::Write {
        path: config_path.clone(),
        source,
    })?;

    println!("Initialized tablestack project at {}", path.display());
    println!("  Created: {}", config_path.display());
    Ok(())
}

/// Parse, validate and build the app, reporting every validation error.
fn load_app(file: &Path) -> Result<(types::AppConfig, App)> {
    let config = parser::parse_config_file(file)?;
    let errors = parser::validate_config(&config);
    if !errors.is_empty() {
        return Err(report(errors));
    }

    let app = stacks::build_app(&config, &resolver::ProcessEnv)?;
    let errors = synth::validate_app(&app);
    if !errors.is_empty() {
        return Err(report(errors));
    }
    Ok((config, app))
}

fn report(errors: Vec<crate::error::ValidationError>) -> Error {
    for e in &errors {
        eprintln!("  ERROR: {}", e);
    }
    Error::Validation(errors)
}

fn cmd_validate(file: &Path) -> Result<()> {
    let (config, app) = load_app(file)?;
    println!("OK: {} ({} stacks)", config.name, app.stacks().len());
    Ok(())
}

fn cmd_list(file: &Path) -> Result<()> {
    let (_, app) = load_app(file)?;
    for stack in app.stacks() {
        println!("{} ({})", stack.node().id(), stack.env());
        println!("  stack name: {}", stack.stack_name());
        for (logical_id, resource) in stack.resources() {
            let name = resource
                .properties
                .get("TableName")
                .and_then(|v| v.as_str())
                .unwrap_or("<generated>");
            println!("  {} [{}] {}", logical_id, resource.resource_type, name);
        }
    }
    Ok(())
}

fn cmd_synth(
    file: &Path,
    output: &Path,
    stack_filter: Option<&str>,
    format: Format,
    quiet: bool,
) -> Result<()> {
    let (_, app) = load_app(file)?;
    let assembly = synth::synthesize(&app)?;
    synth::write_assembly(output, &assembly)?;

    if quiet {
        println!(
            "Synthesized {} stack(s) to {}",
            assembly.templates.len(),
            output.display()
        );
        return Ok(());
    }

    let artifact_id = match stack_filter {
        Some(id) => app
            .stack(id)
            .map(|s| s.artifact_id())
            .ok_or_else(|| Error::UnknownStack(id.to_string()))?,
        None if assembly.templates.len() == 1 => assembly
            .templates
            .keys()
            .next()
            .cloned()
            .unwrap_or_default(),
        None => {
            println!(
                "Synthesized {} stacks to {}; pass --stack to print one:",
                assembly.templates.len(),
                output.display()
            );
            for id in assembly.templates.keys() {
                println!("  {}", id);
            }
            return Ok(());
        }
    };

    let template = assembly
        .template(&artifact_id)
        .ok_or_else(|| Error::UnknownStack(artifact_id.clone()))?;
    let rendered = match format {
        Format::Json => synth::to_json(template)?,
        Format::Yaml => synth::to_yaml(template)?,
    };
    println!("{}", rendered.trim_end());
    Ok(())
}

fn cmd_diff(file: &Path, output: &Path, fail_on_changes: bool) -> Result<()> {
    let (config, app) = load_app(file)?;
    let assembly = synth::synthesize(&app)?;
    let previous = synth::load_previous(output)?;
    let diff = planner::plan(&assembly, previous.as_ref())?;

    print_plan(&config.name, &diff);

    if fail_on_changes && diff.has_changes() {
        return Err(Error::PendingChanges(
            diff.to_create + diff.to_update + diff.to_replace + diff.to_destroy,
        ));
    }
    Ok(())
}

/// Display a plan to stdout.
fn print_plan(name: &str, plan: &types::DiffPlan) {
    println!("Diff: {} ({} resources)", name, plan.changes.len());
    println!();

    let mut current: Option<(&str, &str)> = None;
    for change in &plan.changes {
        let key = (change.environment.as_str(), change.stack.as_str());
        if current != Some(key) {
            current = Some(key);
            println!("{} ({}):", change.stack, change.environment);
        }
        let symbol = match change.action {
            types::PlanAction::Create => "+",
            types::PlanAction::Update => "~",
            types::PlanAction::Replace => "!",
            types::PlanAction::Destroy => "-",
            types::PlanAction::NoOp => " ",
        };
        println!("  {} {}", symbol, change.description);
    }

    println!();
    println!(
        "Plan: {} to add, {} to change, {} to replace, {} to destroy, {} unchanged.",
        plan.to_create, plan.to_update, plan.to_replace, plan.to_destroy, plan.unchanged
    );
}

fn cmd_schema() -> Result<()> {
    let schema = schemars::schema_for!(types::AppConfig);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}
