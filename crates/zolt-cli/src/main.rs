//! zolt CLI
//!
//! Runs the analysis pipeline over a JSON AST and prints diagnostics, attached
//! boilerplate directives, indicators or per-target statement plans.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{json, Value};
use std::{fs, path::PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use zolt_compiler::{
    diagnostics, plan_block, Compiler, CompilerConfig, DecoratedTree, PlannedStatement, Target,
};

#[derive(Parser)]
#[command(name = "zolt")]
#[command(about = "Semantic analysis for contracts with secret state", long_about = None)]
struct Cli {
    /// Path to a compiler config JSON file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check an AST and report errors and warnings
    Check {
        /// Path to the AST JSON file
        ast: PathBuf,

        /// Original source text, used to show the offending lines
        #[arg(short, long)]
        source: Option<PathBuf>,
    },

    /// Print the boilerplate directives attached to every scope
    Analyze {
        ast: PathBuf,

        #[arg(short, long)]
        pretty: bool,
    },

    /// Print the indicators of every scope
    Indicators {
        ast: PathBuf,

        #[arg(short, long)]
        pretty: bool,
    },

    /// Print the statement plan of one function for an emission target
    Plan {
        ast: PathBuf,

        /// Unique function name (`constructor`, `f`, `f_1`, ...)
        #[arg(short, long)]
        function: String,

        #[arg(short, long, value_enum, default_value = "orchestration")]
        target: TargetArg,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TargetArg {
    Contract,
    Circuit,
    Orchestration,
}

impl From<TargetArg> for Target {
    fn from(arg: TargetArg) -> Self {
        match arg {
            TargetArg::Contract => Target::Contract,
            TargetArg::Circuit => Target::Circuit,
            TargetArg::Orchestration => Target::Orchestration,
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<CompilerConfig> {
    match path {
        Some(path) => CompilerConfig::from_file(path)
            .with_context(|| format!("Failed to load config file: {:?}", path)),
        None => Ok(CompilerConfig::default()),
    }
}

fn init_logging(config: &CompilerConfig, verbose: bool) {
    let level = if verbose { "debug" } else { config.log_level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

fn read_ast(path: &PathBuf) -> Result<String> {
    fs::read_to_string(path).context(format!("Failed to read AST file: {:?}", path))
}

fn compile(compiler: &Compiler, path: &PathBuf) -> Result<DecoratedTree> {
    let input = read_ast(path)?;
    compiler.compile_str(&input).map_err(|e| anyhow::anyhow!(diagnostics::render(None, &e)))
}

fn print_json(value: &Value, pretty: bool) -> Result<()> {
    let text = if pretty { serde_json::to_string_pretty(value)? } else { serde_json::to_string(value)? };
    println!("{}", text);
    Ok(())
}

fn check(compiler: &Compiler, ast: &PathBuf, source: Option<&PathBuf>) -> Result<()> {
    let input = read_ast(ast)?;
    let source = source
        .map(|path| fs::read_to_string(path).context(format!("Failed to read source file: {:?}", path)))
        .transpose()?;

    match compiler.compile_str(&input) {
        Ok(tree) => {
            for warning in &tree.warnings {
                eprintln!("{}", diagnostics::render_warning(source.as_deref(), warning));
            }
            println!("✅ {:?}: no errors, {} warning(s)", ast, tree.warnings.len());
            Ok(())
        }
        Err(error) => {
            eprintln!("{}", diagnostics::render(source.as_deref(), &error));
            anyhow::bail!("Check failed for {:?}", ast)
        }
    }
}

fn plan_json(tree: &DecoratedTree, function: &str, target: Target) -> Result<Value> {
    let scope = tree
        .function_scope(function)
        .with_context(|| format!("Unknown function: {}", function))?;
    let plan = plan_block(tree, scope, target)?;
    let statements: Vec<Value> = plan
        .statements
        .iter()
        .map(|statement| match statement {
            PlannedStatement::Boilerplate(directive) => directive.to_json(),
            PlannedStatement::Original(id) => json!({ "original": id }),
            PlannedStatement::NoOp(id) => json!({ "noOp": id }),
        })
        .collect();
    Ok(json!({ "function": plan.function, "target": plan.target, "statements": statements }))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;
    init_logging(&config, cli.verbose);
    debug!(?config, "loaded configuration");

    let compiler = Compiler::new(config);
    match cli.command {
        Commands::Check { ast, source } => check(&compiler, &ast, source.as_ref())?,
        Commands::Analyze { ast, pretty } => {
            let tree = compile(&compiler, &ast)?;
            print_json(&tree.directives_json(), pretty)?;
        }
        Commands::Indicators { ast, pretty } => {
            let tree = compile(&compiler, &ast)?;
            print_json(&tree.indicators_json(), pretty)?;
        }
        Commands::Plan { ast, function, target } => {
            let tree = compile(&compiler, &ast)?;
            print_json(&plan_json(&tree, &function, target.into())?, true)?;
        }
    }
    info!("done");
    Ok(())
}
