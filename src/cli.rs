//! Command-line definitions and dispatch.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::Value;

use hookline_plugin::PluginManager;

/// Fire plugin hooks from the command line
#[derive(Debug, Parser)]
#[command(name = "hookline", version, about, long_about = None)]
pub struct Cli {
    /// Configuration directory
    #[arg(short, long, default_value = "config")]
    pub config_dir: String,

    /// Configuration environment overlay
    #[arg(short, long, env = "HOOKLINE_ENV", default_value = "development")]
    pub env: String,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Fire a hook and print its result
    Fire(FireArgs),
    /// List imported plugins and known hooks
    List,
}

/// How subscribers of a fired hook run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DispatchMode {
    /// One after another; a halt stops the chain
    Series,
    /// All at once; results in priority order
    Parallel,
    /// Each subscriber gets the previous result first
    Waterfall,
}

#[derive(Debug, clap::Args)]
pub struct FireArgs {
    /// Hook name
    pub hook: String,

    /// Dispatch mode
    #[arg(short, long, value_enum, default_value = "parallel")]
    pub mode: DispatchMode,

    /// Hook argument as JSON; plain text is passed as a string
    #[arg(short, long = "arg")]
    pub args: Vec<String>,
}

#[derive(Debug, Serialize)]
struct PluginRow {
    name: String,
    priority: i32,
    active: bool,
    hooks: Vec<String>,
}

impl Commands {
    /// Execute the command against an initialized manager.
    pub async fn execute(&self, manager: &PluginManager) -> anyhow::Result<()> {
        match self {
            Commands::Fire(args) => fire(args, manager).await,
            Commands::List => list(manager),
        }
    }
}

async fn fire(args: &FireArgs, manager: &PluginManager) -> anyhow::Result<()> {
    let values: Vec<Value> = args.args.iter().map(String::as_str).map(parse_arg).collect();
    let hook = &args.hook;

    let result = match args.mode {
        DispatchMode::Series => manager.series(hook, values)?.await?.map(Value::Bool),
        DispatchMode::Parallel => manager.hook(hook, values)?.await?.map(Value::Array),
        DispatchMode::Waterfall => manager.waterfall(hook, values)?.await?,
    };

    match result {
        Some(value) => print_json(&value)?,
        None => println!("No subscribers for hook '{}'", hook),
    }
    Ok(())
}

fn list(manager: &PluginManager) -> anyhow::Result<()> {
    let rows: Vec<PluginRow> = manager
        .all_plugins()
        .iter()
        .map(|p| PluginRow {
            name: p.name().to_string(),
            priority: p.priority(),
            active: p.is_active(),
            hooks: p.record().hook_names().into_iter().map(str::to_string).collect(),
        })
        .collect();

    if rows.is_empty() {
        println!("No plugins imported.");
    } else {
        print_json(&rows)?;
    }
    Ok(())
}

fn parse_arg(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to render output")?;
    println!("{}", json);
    Ok(())
}
