//! JSON:API Transformer CLI
//!
//! Command-line interface for compiling JSON models into JSON:API documents
//! and checking descriptor registries.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use jsonapi_transformer::{
    check, load_json_auto, load_registry, Compiler, Data, Document, FileStatus, JsonModel,
    JsonStore, PageRequest, QueryParams, Severity,
};
use serde_json::Value;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "jsonapi-transformer")]
#[command(about = "Compile JSON models into JSON:API documents")]
#[command(version)]
struct Cli {
    /// Log debug output to stderr (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a model (or array of models) into a JSON:API document
    Compile {
        /// Model source: file path or URL (http:// or https://)
        input: String,

        /// Registry source: file path or URL
        #[arg(long, short)]
        registry: String,

        /// Registered descriptor to compile with
        #[arg(long = "type", short = 't')]
        resource_type: String,

        /// Request query string (e.g. "includes=author&filter[articles]=title")
        #[arg(long, short, default_value = "")]
        query: String,

        /// Treat the input as a full result set and emit one page of it
        #[arg(long)]
        paginate: bool,

        /// Base URL for pagination links
        #[arg(long, default_value = "")]
        base_url: String,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,

        /// Camelize snake_case attribute keys
        #[arg(long)]
        camelize: bool,

        /// Attach a debug block with compile timings
        #[arg(long)]
        debug_timings: bool,
    },

    /// Check registry files for errors (schema, unknown descriptors and routes)
    Check {
        /// Registry file or directory to check
        path: PathBuf,

        /// Output format: text (default) or json
        #[arg(long, default_value = "text")]
        format: String,

        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,

        /// Suppress progress output, only show errors
        #[arg(long, short)]
        quiet: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Compile {
            input,
            registry,
            resource_type,
            query,
            paginate,
            base_url,
            output,
            pretty,
            camelize,
            debug_timings,
        } => run_compile(CompileArgs {
            input,
            registry,
            resource_type,
            query,
            paginate,
            base_url,
            output,
            pretty,
            camelize,
            debug_timings,
        }),

        Commands::Check {
            path,
            format,
            strict,
            quiet,
        } => run_check(&path, &format, strict, quiet),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

/// Logs go to stderr so stdout stays pure JSON.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

struct CompileArgs {
    input: String,
    registry: String,
    resource_type: String,
    query: String,
    paginate: bool,
    base_url: String,
    output: Option<PathBuf>,
    pretty: bool,
    camelize: bool,
    debug_timings: bool,
}

fn run_compile(args: CompileArgs) -> Result<(), u8> {
    let loaded = load_registry(&args.registry).map_err(|e| {
        eprintln!("Error loading registry: {}", e);
        e.exit_code() as u8
    })?;

    let Some(descriptor) = loaded.registry.get(&args.resource_type) else {
        eprintln!(
            "Error: unknown resource type '{}' (registered: {})",
            args.resource_type,
            loaded.registry.names().join(", ")
        );
        return Err(2);
    };

    let input = load_json_auto(&args.input).map_err(|e| {
        eprintln!("Error loading input: {}", e);
        e.exit_code() as u8
    })?;
    let single = !input.is_array();
    let mut models = JsonModel::many_from_value(input).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let mut options = loaded.options.clone();
    if args.camelize {
        options = options.camelize_attributes(true);
    }
    if args.debug_timings {
        options = options.debug_timings(true);
    }

    let ctx = QueryParams::parse(&args.query);
    let compiler = Compiler::new(&loaded.registry, &loaded.routes).with_options(options);
    debug!(
        resource = %args.resource_type,
        models = models.len(),
        paginate = args.paginate,
        "compiling"
    );

    let compiled = if args.paginate {
        let request = PageRequest::from_context(&ctx, compiler.options().default_page_size);
        let mut page = JsonStore.paginate(models, &request, args.base_url.as_str());
        compiler
            .eager_load(&JsonStore, descriptor, page.items_mut(), &ctx)
            .and_then(|()| compiler.compile_page(descriptor, &page, &ctx))
    } else {
        compiler
            .eager_load(&JsonStore, descriptor, &mut models, &ctx)
            .and_then(|()| {
                let data = match models.first() {
                    Some(model) if single => Data::One(model),
                    _ => Data::many(&models),
                };
                compiler.compile(descriptor, data, &ctx)
            })
    };
    let document = compiled.map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    write_document(&document, args.output.as_deref(), args.pretty)
}

fn write_document(document: &Document, output: Option<&Path>, pretty: bool) -> Result<(), u8> {
    let json_output = if pretty {
        serde_json::to_string_pretty(document)
    } else {
        serde_json::to_string(document)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    match output {
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

fn run_check(path: &Path, format: &str, strict: bool, quiet: bool) -> Result<(), u8> {
    if !path.exists() {
        eprintln!("Error: path not found: {}", path.display());
        return Err(2);
    }

    let result = check(path, strict);

    if format == "json" {
        let report = serde_json::to_value(&result).unwrap_or(Value::Null);
        println!("{:#}", report);
    } else {
        // Text output
        if !quiet {
            println!("Checking {} ...\n", path.display());
        }

        for file_result in &result.results {
            let status_icon = match file_result.status {
                FileStatus::Ok => "\x1b[32m✓\x1b[0m",
                FileStatus::Warning => "\x1b[33m⚠\x1b[0m",
                FileStatus::Error => "\x1b[31m✗\x1b[0m",
            };

            if !quiet || file_result.status != FileStatus::Ok {
                println!("  {} {}", status_icon, file_result.file.display());
            }

            for diag in &file_result.diagnostics {
                let (color, label) = match diag.severity {
                    Severity::Error => ("\x1b[31m", "error"),
                    Severity::Warning => ("\x1b[33m", "warning"),
                };
                if !quiet || diag.severity == Severity::Error {
                    println!(
                        "    {}{}[{}]\x1b[0m: {} - {}",
                        color, label, diag.code, diag.path, diag.message
                    );
                }
            }
        }

        println!();
        if result.is_ok() && (!strict || result.warnings == 0) {
            println!(
                "\x1b[32m✓ {} files checked, all passed\x1b[0m",
                result.files_checked
            );
        } else {
            println!(
                "\x1b[31m✗ {} files checked: {} passed, {} failed ({} errors, {} warnings)\x1b[0m",
                result.files_checked, result.passed, result.failed, result.errors, result.warnings
            );
        }
    }

    if result.is_ok() && (!strict || result.warnings == 0) {
        Ok(())
    } else {
        Err(1)
    }
}
