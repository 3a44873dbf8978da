//! CLI argument definitions using clap

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser, Subcommand, ValueHint};

use crate::application::{ApplicationResult, Edit};
use crate::config::OutputFormat;

/// Sub-form composition engine: check and edit listing documents through a synchronized form tree
#[derive(Parser, Debug)]
#[command(name = "subform")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug level: -d info, -dd debug, -ddd trace
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub debug: u8,

    /// Additional config file (overrides the global one)
    #[arg(long, global = true, env = "SUBFORM_CONFIG", value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Report format (overrides config)
    #[arg(long, global = true, value_parser = parse_format)]
    pub format: Option<OutputFormat>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

fn parse_format(s: &str) -> Result<OutputFormat, String> {
    s.parse().map_err(|e: crate::application::ApplicationError| e.to_string())
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate a listing document and print its errors
    Check {
        /// Listing JSON file
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },

    /// Apply edits to a listing document
    Edit {
        /// Listing JSON file
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,

        /// Set a field: PATH=JSON (leaves are user edits, subtrees are writes)
        #[arg(long = "set", value_name = "PATH=JSON")]
        set: Vec<String>,

        /// Append a collection element: PATH=JSON
        #[arg(long = "append", value_name = "PATH=JSON")]
        append: Vec<String>,

        /// Remove a collection element: PATH:INDEX
        #[arg(long = "remove", value_name = "PATH:INDEX")]
        remove: Vec<String>,

        /// Write the resulting value back to the file
        #[arg(short = 'w', long)]
        write: bool,
    },

    /// Print the node tree of a blank listing
    Schema {
        /// Materialize a listing type first (Vehicle, Droid)
        #[arg(long)]
        listing_type: Option<String>,

        /// Then a product type (Spaceship, Speeder, Protocol, ...)
        #[arg(long)]
        product_type: Option<String>,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Print a commented config template
    Template,

    /// Show config paths
    Path,
}

/// Parsed arguments together with the raw matches.
///
/// `edit` takes `--set`, `--append` and `--remove` interleaved; their
/// relative order only survives in the matches.
#[derive(Debug)]
pub struct Invocation {
    pub cli: Cli,
    matches: ArgMatches,
}

type EditParser = fn(&str) -> ApplicationResult<Edit>;

impl Invocation {
    /// Parse `std::env::args`, exiting with clap's usage message on error.
    pub fn parse() -> Self {
        let matches = Cli::command().get_matches();
        Self::from_matches(matches).unwrap_or_else(|e| e.exit())
    }

    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = Cli::command().try_get_matches_from(args)?;
        Self::from_matches(matches)
    }

    fn from_matches(matches: ArgMatches) -> Result<Self, clap::Error> {
        let cli = Cli::from_arg_matches(&matches)?;
        Ok(Self { cli, matches })
    }

    /// Edits of the `edit` subcommand, in command-line order.
    pub fn edits(&self) -> ApplicationResult<Vec<Edit>> {
        let Some(sub) = self.matches.subcommand_matches("edit") else {
            return Ok(Vec::new());
        };
        let parsers: [(&str, EditParser); 3] = [
            ("set", Edit::parse_set),
            ("append", Edit::parse_append),
            ("remove", Edit::parse_remove),
        ];
        let mut indexed = Vec::new();
        for (id, parse) in parsers {
            if let (Some(values), Some(indices)) =
                (sub.get_many::<String>(id), sub.indices_of(id))
            {
                for (raw, position) in values.zip(indices) {
                    indexed.push((position, parse(raw)?));
                }
            }
        }
        indexed.sort_by_key(|(position, _)| *position);
        Ok(indexed.into_iter().map(|(_, edit)| edit).collect())
    }
}
