/// CLI: compiles a JSON Schema and checks one instance against it.
///
/// Usage:
///   jsonschema-compiler schema.json instance.json
///   jsonschema-compiler schema.json < instance.json
///   jsonschema-compiler --absent schema.json
///   jsonschema-compiler --print-type schema.json
///
/// Exit codes: 0 valid, 1 violations (printed as JSON on stdout),
/// 2 unreadable input or an uncompilable schema.
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use jsonschema_compiler::{CompileError, CompileOptions, Compiler, OneOfPolicy, Schema};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "jsonschema-compiler", version, about, long_about = None)]
struct Cli {
    /// JSON Schema file.
    schema: PathBuf,

    /// Instance file. Read from stdin when omitted.
    instance: Option<PathBuf>,

    /// Print the type described by the schema and exit.
    #[arg(long, conflicts_with_all = ["instance", "absent"])]
    print_type: bool,

    /// Check an absent value instead of reading an instance, so only a
    /// schema-level `default` can satisfy it.
    #[arg(long, conflicts_with = "instance")]
    absent: bool,

    /// Reject values matched by more than one `oneOf` member.
    #[arg(long)]
    exclusive_one_of: bool,

    /// Log verbosity on stderr (-v, -vv, -vvv). `RUST_LOG` takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
    #[error("invalid schema: {0}")]
    Compile(#[from] CompileError),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode, CliError> {
    let schema_json = read_json(&cli.schema)?;
    let schema = Schema::from_value(&schema_json);

    let options = CompileOptions {
        one_of: if cli.exclusive_one_of {
            OneOfPolicy::Exclusive
        } else {
            OneOfPolicy::FirstMatch
        },
    };
    let compiler = Compiler::new(options);
    let validator = compiler.compile(&schema)?;
    tracing::info!(
        schema = %cli.schema.display(),
        one_of = ?compiler.options().one_of,
        "compiled schema"
    );

    if cli.print_type {
        println!("{validator}");
        return Ok(ExitCode::SUCCESS);
    }

    let instance = if cli.absent {
        None
    } else {
        Some(match &cli.instance {
            Some(path) => read_json(path)?,
            None => read_stdin_json()?,
        })
    };

    match validator.check_optional(instance.as_ref()) {
        Ok(parsed) => {
            println!("{}", pretty(&parsed));
            Ok(ExitCode::SUCCESS)
        }
        Err(violations) => {
            tracing::info!(count = violations.len(), "instance rejected");
            for v in &violations {
                tracing::debug!("{v}");
            }
            let report = serde_json::to_value(&violations).unwrap_or(Value::Null);
            println!("{}", pretty(&report));
            Ok(ExitCode::from(1))
        }
    }
}

fn read_json(path: &Path) -> Result<Value, CliError> {
    let text = std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CliError::Json {
        path: path.display().to_string(),
        source,
    })
}

fn read_stdin_json() -> Result<Value, CliError> {
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .map_err(|source| CliError::Read {
            path: "stdin".into(),
            source,
        })?;
    serde_json::from_str(&buf).map_err(|source| CliError::Json {
        path: "stdin".into(),
        source,
    })
}

fn pretty(v: &Value) -> String {
    serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string())
}
