use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use bolts_core::{ParameterSet, Value};
use bolts_repo::{Class, LoadOptions, Repository, STANDARD_BODIES, Status};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_yaml::Value as Yaml;
use tracing::{debug, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliOutputFormat {
    Json,
    Yaml,
}

#[derive(Debug, Parser)]
#[command(name = "blt")]
#[command(about = "Check and query part-library repositories")]
struct Cli {
    /// Log debug output (RUST_LOG takes precedence).
    #[arg(short, long, global = true)]
    verbose: bool,
    /// YAML file with repository load options.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load a repository and report what it contains.
    Check(RepoArgs),
    /// List the classes of a repository.
    Classes(RepoArgs),
    /// Resolve the parameters of one part.
    Params(ParamsArgs),
    /// Print the common parameter combinations of a class.
    Common(ClassArgs),
}

#[derive(Debug, Args)]
struct RepoArgs {
    /// Repository root directory.
    repo: PathBuf,
}

#[derive(Debug, Args)]
struct ClassArgs {
    /// Repository root directory.
    repo: PathBuf,
    /// Class name, e.g. a standard designation.
    class: String,
}

#[derive(Debug, Args)]
struct ParamsArgs {
    /// Repository root directory.
    repo: PathBuf,
    /// Class name, e.g. a standard designation.
    class: String,
    /// Free parameter value as name=value (repeatable).
    #[arg(long = "set", value_name = "NAME=VALUE")]
    set: Vec<String>,
    /// Output format.
    #[arg(long, default_value = "json")]
    format: CliOutputFormat,
    /// Ignore the parameters of the OpenSCAD base.
    #[arg(long)]
    no_base: bool,
}

#[derive(Debug, Serialize)]
struct PartOutput<'a> {
    class: &'a str,
    name: String,
    values: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    incantation: Option<String>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = cli.config.as_deref();
    let result = match cli.command {
        Command::Check(args) => run_check(args, config),
        Command::Classes(args) => run_classes(args, config),
        Command::Params(args) => run_params(args, config),
        Command::Common(args) => run_common(args, config),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

fn load_repository(path: &Path, config: Option<&Path>) -> Result<Repository, String> {
    let options = match config {
        Some(config) => LoadOptions::load(config)
            .map_err(|err| format!("Failed to read config '{}': {err}", config.display()))?,
        None => LoadOptions::default(),
    };
    debug!(?options, "load options");
    Repository::load(path, &options).map_err(|err| err.to_string())
}

fn find_class<'a>(repo: &'a Repository, name: &str) -> Result<&'a Class, String> {
    repo.class_by_name(name)
        .ok_or_else(|| format!("Unknown class '{name}'"))
}

fn run_check(args: RepoArgs, config: Option<&Path>) -> Result<(), String> {
    let repo = load_repository(&args.repo, config)?;

    let mut problems = 0usize;
    for class in repo.classes() {
        let params = match repo.full_parameters(class) {
            Ok(params) => params,
            Err(err) => {
                eprintln!("{}: {err}", class.name);
                problems += 1;
                continue;
            }
        };
        for substitute in &class.naming.substitute {
            if !params.parameters().contains(substitute) {
                warn!(
                    class = %class.name,
                    parameter = %substitute,
                    "naming substitutes unknown parameter"
                );
            }
        }
    }

    println!(
        "Loaded {} collection(s) with {} class(es).",
        repo.collections().len(),
        repo.classes().count()
    );
    for body in STANDARD_BODIES {
        let count = repo.standardized(body).len();
        if count > 0 {
            println!("  {body}: {count}");
        }
    }
    if let Some(bases) = repo.openscad() {
        println!("  OpenSCAD bases: {}", bases.bases().len());
    }

    if problems > 0 {
        return Err(format!("{problems} class(es) failed to combine with their base"));
    }
    Ok(())
}

fn run_classes(args: RepoArgs, config: Option<&Path>) -> Result<(), String> {
    let repo = load_repository(&args.repo, config)?;

    for coll in repo.collections() {
        for class in &coll.classes {
            let mut line = format!("{}\t{}\t{}", class.name, class.id, coll.id);
            if class.status == Status::Withdrawn {
                line.push_str("\twithdrawn");
            }
            if let Some(successor) = &class.replaced_by {
                line.push_str(&format!("\treplaced by {successor}"));
            }
            println!("{line}");
        }
    }
    Ok(())
}

fn run_params(args: ParamsArgs, config: Option<&Path>) -> Result<(), String> {
    let repo = load_repository(&args.repo, config)?;
    let class = find_class(&repo, &args.class)?;

    let params = if args.no_base {
        class.parameters.clone()
    } else {
        repo.full_parameters(class).map_err(|err| err.to_string())?
    };

    let mut free = params.defaults().clone();
    for assignment in &args.set {
        let (name, value) = parse_assignment(&params, assignment)?;
        free.insert(name, value);
    }

    let values = params
        .collect(&free)
        .map_err(|err| format!("{}: {err}", class.name))?;
    let name = class
        .naming
        .get_name(&values)
        .map_err(|err| format!("{}: {err}", class.name))?;
    let incantation = match repo.base_for(class) {
        Some(base) if !args.no_base => {
            Some(base.incantation(&values).map_err(|err| err.to_string())?)
        }
        _ => None,
    };

    let output = PartOutput {
        class: &class.name,
        name,
        values,
        incantation,
    };
    let raw = match args.format {
        CliOutputFormat::Json => serde_json::to_string_pretty(&output)
            .map_err(|err| format!("Failed to serialize output: {err}"))?,
        CliOutputFormat::Yaml => serde_yaml::to_string(&output)
            .map_err(|err| format!("Failed to serialize output: {err}"))?,
    };
    println!("{}", raw.trim_end());
    Ok(())
}

/// Parses `name=value`, typing the value by the parameter's declared type.
fn parse_assignment(params: &ParameterSet, assignment: &str) -> Result<(String, Value), String> {
    let (name, raw) = assignment
        .split_once('=')
        .ok_or_else(|| format!("Expected NAME=VALUE, got '{assignment}'"))?;
    if !params.free().iter().any(|free| free == name) {
        return Err(format!("'{name}' is not a free parameter"));
    }
    let ty = params.type_of(name).unwrap_or_default();
    let value = ty
        .normalize(name, &Yaml::String(raw.to_string()))
        .map_err(|err| err.to_string())?;
    Ok((name.to_string(), value))
}

fn run_common(args: ClassArgs, config: Option<&Path>) -> Result<(), String> {
    let repo = load_repository(&args.repo, config)?;
    let class = find_class(&repo, &args.class)?;

    let combinations = class
        .parameters
        .common()
        .ok_or_else(|| format!("Class '{}' has no enumerable common parameters", class.name))?;

    for combination in combinations {
        let line: Vec<String> = combination.iter().map(Value::to_string).collect();
        println!("{}", line.join(", "));
    }
    Ok(())
}
