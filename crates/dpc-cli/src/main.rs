mod commands;
mod reader;

use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "dpc",
    version,
    about = "Data product composer: suggest derivable entities and resolve what they need"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). DPC_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Suggest CTE/VIEW entities buildable from the canvas
    Suggest {
        /// Catalog file or directory
        catalog: PathBuf,

        /// Entity keys on the canvas, comma separated
        #[arg(long, value_delimiter = ',')]
        canvas: Vec<String>,

        /// Output format: human (default) or json
        #[arg(long, default_value = "human")]
        format: String,
    },

    /// List entities an entity needs that are not on the canvas
    Requires {
        /// Catalog file or directory
        catalog: PathBuf,

        /// Selected entity key
        entity: String,

        /// Entity keys on the canvas, comma separated
        #[arg(long, value_delimiter = ',')]
        canvas: Vec<String>,

        /// Output format: human (default) or json
        #[arg(long, default_value = "human")]
        format: String,
    },

    /// Load a persisted data product and show the rebuilt canvas
    Load {
        /// Product JSON file
        product: PathBuf,

        /// Catalog file or directory, to suggest against the loaded canvas
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Write the product back in the current format (with stable node ids)
        #[arg(long)]
        upgrade: Option<PathBuf>,

        /// Output format: human (default) or json
        #[arg(long, default_value = "human")]
        format: String,
    },

    /// Lint catalogs for references the engine would skip
    Lint {
        /// Catalog file or directory (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output format: human (default), json or sarif
        #[arg(long, default_value = "human")]
        format: String,
    },

    /// Output the entity dependency graph
    Analyze {
        /// Catalog file or directory
        #[arg(default_value = ".")]
        catalog: PathBuf,

        /// Output format: mermaid (default) or dot
        #[arg(long, default_value = "mermaid")]
        format: String,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Suggest {
            catalog,
            canvas,
            format,
        } => commands::suggest::run_suggest(&catalog, &canvas, &format),
        Commands::Requires {
            catalog,
            entity,
            canvas,
            format,
        } => commands::requires::run_requires(&catalog, &entity, &canvas, &format),
        Commands::Load {
            product,
            catalog,
            upgrade,
            format,
        } => commands::load::run_load(&product, catalog.as_deref(), upgrade.as_deref(), &format),
        Commands::Lint { path, format } => match commands::lint::run_lint(&path, &format) {
            Ok((output, error_count)) => {
                println!("{output}");
                if error_count > 0 {
                    process::exit(1);
                }
                return;
            }
            Err(e) => Err(e),
        },
        Commands::Analyze { catalog, format } => commands::analyze::run_analyze(&catalog, &format),
    };

    match result {
        Ok(output) => println!("{output}"),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

/// Log to stderr so stdout stays machine-readable.
fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("DPC_LOG").unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
