//! Command-line interface implementation for kiln.
//! Provides argument parsing and help text formatting using clap.

use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

use crate::context::ContextValue;
use crate::writer::OverwritePolicy;

/// Command-line arguments structure for kiln.
#[derive(Parser, Debug)]
#[command(author, version, about = "kiln: template-driven source tree scaffolding", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a source tree from a template directory
    New {
        /// Path to the template directory
        #[arg(value_name = "TEMPLATE")]
        template: PathBuf,

        /// Directory where the source tree will be generated
        #[arg(value_name = "OUTPUT_DIR")]
        output_dir: PathBuf,

        /// Set a template variable, overriding the manifest default.
        /// `true` and `false` are bound as booleans.
        #[arg(short = 'D', long = "var", value_name = "NAME=VALUE", value_parser = parse_var)]
        vars: Vec<(String, ContextValue)>,

        #[command(flatten)]
        generation: GenerationArgs,
    },

    /// Scaffold a new blockchain application from the built-in template
    App {
        /// Go module path of the application, e.g. github.com/alice/mars
        #[arg(value_name = "MODULE_PATH")]
        module_path: String,

        /// Output directory (defaults to the application name)
        #[arg(value_name = "OUTPUT_DIR")]
        output_dir: Option<PathBuf>,

        /// Account address prefix
        #[arg(long)]
        address_prefix: Option<String>,

        #[command(flatten)]
        generation: GenerationArgs,
    },
}

/// Options shared by every generating command.
#[derive(clap::Args, Debug, Clone)]
pub struct GenerationArgs {
    /// What to do with files that already exist in the output directory
    #[arg(long, value_enum, default_value_t = OverwritePolicy::Fail)]
    pub policy: OverwritePolicy,

    /// Number of worker threads used to render templates
    #[arg(short, long, default_value_t = 1)]
    pub jobs: usize,

    /// Report what would be generated without writing anything
    #[arg(long)]
    pub dry_run: bool,
}

/// Parses a `NAME=VALUE` variable binding.
pub fn parse_var(s: &str) -> Result<(String, ContextValue), String> {
    let (name, value) =
        s.split_once('=').ok_or_else(|| format!("invalid variable '{s}': expected NAME=VALUE"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("invalid variable '{s}': empty name"));
    }
    let value = match value {
        "true" => ContextValue::Bool(true),
        "false" => ContextValue::Bool(false),
        other => ContextValue::String(other.to_string()),
    };
    Ok((name.to_string(), value))
}

/// Parses command line arguments and returns the Args structure.
///
/// # Exits
/// * With status code 1 if required arguments are missing
/// * With clap's default error handling for other argument errors
pub fn get_args() -> Args {
    match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            if e.kind() == ErrorKind::MissingRequiredArgument
                || e.kind() == ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
            {
                let _ = Args::command()
                    .help_template(
                        r#"{about-section}
{usage-heading} {usage}

{all-args}
{after-help}
"#,
                    )
                    .print_help();
                std::process::exit(1);
            } else {
                e.exit();
            }
        }
    }
}
