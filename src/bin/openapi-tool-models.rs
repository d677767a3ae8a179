//! OpenAPI Tool Models CLI
//!
//! Command-line interface for inspecting the operations, tools and models of an
//! OpenAPI document and validating payloads against them.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use openapi_tool_models::{
    load_document, load_document_auto, validate_operation, ExtractOptions, Leg,
    OperationRegistry, ValidateError, DEFAULT_TAG,
};

#[derive(Parser)]
#[command(name = "openapi-tool-models")]
#[command(about = "Resolve OpenAPI operations into agent tools with validating models")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SourceArgs {
    /// OpenAPI document: file path or URL (http:// or https://)
    #[arg(long, env = "OPENAPI_JSON_URL")]
    spec: String,

    /// Capability tag selecting the exposed operations
    #[arg(long, env = "OPENAPI_TOOL_TAG", default_value = DEFAULT_TAG)]
    tag: String,
}

#[derive(Args)]
struct OutputArgs {
    /// Output file (stdout if not specified)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List the tagged operations with their request/response models
    Operations {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        out: OutputArgs,
    },

    /// Emit tool definitions (name, description, input/output JSON Schema)
    Tools {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        out: OutputArgs,
    },

    /// Print the JSON Schema of one operation's request or response model
    Model {
        #[command(flatten)]
        source: SourceArgs,

        /// Operation id
        #[arg(long, short)]
        op: String,

        /// Use the request model
        #[arg(
            long,
            conflicts_with = "response",
            required_unless_present = "response"
        )]
        request: bool,

        /// Use the response model
        #[arg(long, conflicts_with = "request", required_unless_present = "request")]
        response: bool,

        /// Print the synthesized shape instead of its JSON Schema
        #[arg(long)]
        shape: bool,

        #[command(flatten)]
        out: OutputArgs,
    },

    /// Validate a payload against an operation's model
    Validate {
        /// Payload file to validate
        payload: PathBuf,

        #[command(flatten)]
        source: SourceArgs,

        /// Operation id
        #[arg(long, short)]
        op: String,

        /// Validate as request body
        #[arg(
            long,
            conflicts_with = "response",
            required_unless_present = "response"
        )]
        request: bool,

        /// Validate as response body
        #[arg(long, conflicts_with = "request", required_unless_present = "request")]
        response: bool,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Operations { source, out } => run_operations(&source, &out),
        Commands::Tools { source, out } => run_tools(&source, &out),
        Commands::Model {
            source,
            op,
            request,
            response: _,
            shape,
            out,
        } => run_model(&source, &op, Leg::from_request_flag(request), shape, &out),
        Commands::Validate {
            payload,
            source,
            op,
            request,
            response: _,
            json,
        } => run_validate(&payload, &source, &op, Leg::from_request_flag(request), json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn load_registry(source: &SourceArgs) -> Result<OperationRegistry, u8> {
    let document = load_document_auto(&source.spec).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;
    Ok(OperationRegistry::from_document(
        &document,
        &ExtractOptions::new(source.tag.as_str()),
    ))
}

fn run_operations(source: &SourceArgs, out: &OutputArgs) -> Result<(), u8> {
    let registry = load_registry(source)?;
    let operations: Vec<_> = registry.iter().collect();
    write_output(&operations, out)
}

fn run_tools(source: &SourceArgs, out: &OutputArgs) -> Result<(), u8> {
    let registry = load_registry(source)?;
    write_output(&registry.tools(), out)
}

fn run_model(
    source: &SourceArgs,
    op: &str,
    leg: Leg,
    shape_only: bool,
    out: &OutputArgs,
) -> Result<(), u8> {
    let registry = load_registry(source)?;
    let Some(operation) = registry.get(op) else {
        eprintln!("Error: unknown operation '{}'", op);
        return Err(2);
    };

    let body = match leg {
        Leg::Request => &operation.request_body,
        Leg::Response => &operation.response_body,
    };
    let Some(shape) = body.shape() else {
        eprintln!(
            "Error: operation '{}' has no {} model ({})",
            op,
            leg.as_str(),
            serde_json::to_string(body).unwrap_or_default()
        );
        return Err(2);
    };

    if shape_only {
        write_output(&shape.document(), out)
    } else {
        write_output(&shape.to_json_schema(), out)
    }
}

fn run_validate(
    payload_path: &Path,
    source: &SourceArgs,
    op: &str,
    leg: Leg,
    json_output: bool,
) -> Result<(), u8> {
    let payload = load_document(payload_path).map_err(|e| {
        report_error(json_output, &format!("loading payload: {}", e));
        e.exit_code() as u8
    })?;
    let registry = load_registry(source)?;

    match validate_operation(&registry, op, leg, &payload) {
        Ok(filled) => {
            if json_output {
                let output = serde_json::json!({ "valid": true, "payload": filled });
                println!("{}", output);
            } else {
                println!("Valid");
            }
            Ok(())
        }
        Err(ValidateError::Invalid { errors }) => {
            if json_output {
                let output = serde_json::json!({
                    "valid": false,
                    "errors": errors
                });
                println!("{}", output);
            } else {
                eprintln!("Validation failed:");
                for error in errors {
                    eprintln!("  {}", error);
                }
            }
            Err(1)
        }
        Err(e) => {
            report_error(json_output, &e.to_string());
            Err(e.exit_code() as u8)
        }
    }
}

/// Output an error message in plain text or JSON format.
fn report_error(json_output: bool, msg: &str) {
    if json_output {
        println!("{}", serde_json::json!({ "valid": false, "error": msg }));
    } else {
        eprintln!("Error: {}", msg);
    }
}

fn write_output<T: Serialize + ?Sized>(value: &T, out: &OutputArgs) -> Result<(), u8> {
    let json_output = if out.pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    match &out.output {
        Some(path) => {
            std::fs::write(path, &json_output).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", json_output);
        }
    }

    Ok(())
}
