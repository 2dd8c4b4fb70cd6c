//! Command-line interface definitions for cataloguer.
//!
//! Global options (verbosity, colour, configuration overrides) apply to every
//! subcommand. A `SRC` or `DST` argument names a stored catalogue, a
//! directory or a single file, tried in that order.
//!
//! # Example
//!
//! ```bash
//! # Summarize a directory and list its duplicates
//! cataloguer inspect ~/Pictures/phone
//!
//! # Create a catalogue organized by capture date
//! cataloguer --format-pattern "%Y/%m/{file}" create-catalogue photos ~/Archive
//!
//! # Import new pictures, skipping anything already archived
//! cataloguer copy ~/Pictures/phone photos --dry-run
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::ConfigOverrides;
use crate::naming::Template;

/// Organize photos and videos into deduplicated, date-structured catalogues.
#[derive(Debug, Parser)]
#[command(name = "cataloguer")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Print errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Configuration file (default: platform config directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Destination template for files with a capture date
    ///
    /// Variables: {file}, {file_name}, {file_extension}, {media_type},
    /// {media_format}, {relative_path}. Date directives follow strftime:
    /// %Y, %m, %d, ...
    #[arg(long, global = true, value_name = "TEMPLATE", value_parser = parse_template)]
    pub format_pattern: Option<Template>,

    /// Destination template for files without a capture date
    ///
    /// Date directives render the time the command started.
    #[arg(long, global = true, value_name = "TEMPLATE", value_parser = parse_template)]
    pub unknown_format_pattern: Option<Template>,

    /// Directory where catalogues are stored
    #[arg(long, global = true, value_name = "PATH")]
    pub storage_location: Option<PathBuf>,

    /// Skip confirmation prompts
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,

    /// Rescan catalogues instead of trusting their stored inventory
    #[arg(long, global = true)]
    pub rescan: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Configuration values given on the command line.
    #[must_use]
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            format_pattern: self.format_pattern.clone(),
            unknown_format_pattern: self.unknown_format_pattern.clone(),
            storage_location: self.storage_location.clone(),
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Summarize a catalogue or directory and list its duplicates
    Inspect(InspectArgs),
    /// Scan a directory and store it as a new catalogue
    CreateCatalogue(CreateArgs),
    /// Forget a stored catalogue (its files are left alone)
    DeleteCatalogue(DeleteCatalogueArgs),
    /// Copy media files into a catalogue or directory
    Copy(TransferArgs),
    /// Move media files into a catalogue or directory
    Move(TransferArgs),
    /// Delete duplicated media files
    DeleteDuplicates(DeleteDuplicatesArgs),
}

#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Catalogue name, directory or file
    #[arg(value_name = "SRC")]
    pub src: String,

    /// Include files that are neither images nor videos
    #[arg(long)]
    pub all: bool,

    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

#[derive(Debug, Args)]
pub struct CreateArgs {
    /// Name of the new catalogue
    #[arg(value_name = "NAME")]
    pub name: String,

    /// Root directory (default: current directory)
    #[arg(value_name = "SRC")]
    pub src: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct DeleteCatalogueArgs {
    #[arg(value_name = "NAME")]
    pub name: String,
}

#[derive(Debug, Args)]
pub struct TransferArgs {
    /// Catalogue name, directory or file to take files from
    #[arg(value_name = "SRC")]
    pub src: String,

    /// Catalogue name or directory to put files into
    #[arg(value_name = "DST")]
    pub dst: String,

    /// Show what would happen without touching any file
    #[arg(long)]
    pub dry_run: bool,

    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

#[derive(Debug, Args)]
pub struct DeleteDuplicatesArgs {
    /// Catalogue name or directory to deduplicate
    #[arg(value_name = "SRC")]
    pub src: String,

    /// Delete files here whose content also exists in SRC
    #[arg(value_name = "DST")]
    pub dst: Option<String>,

    /// Show what would happen without touching any file
    #[arg(long)]
    pub dry_run: bool,

    /// Move files to the system trash instead of removing them
    #[arg(long)]
    pub trash: bool,

    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Output format for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary
    #[default]
    Text,
    /// JSON for scripting
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Parse and validate a naming template.
///
/// # Examples
///
/// ```
/// use cataloguer::cli::parse_template;
///
/// assert!(parse_template("%Y/%m/{file}").is_ok());
/// assert!(parse_template("{flie}").is_err());
/// ```
///
/// # Errors
///
/// Returns the template error as a message when the template is invalid.
pub fn parse_template(s: &str) -> Result<Template, String> {
    Template::parse(s).map_err(|e| e.to_string())
}
