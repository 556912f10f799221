//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

/// Build hierarchical trees from flat parent/child-linked records
#[derive(Parser, Debug)]
#[command(name = "restree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub debug: u8,

    /// Field holding a record's id
    #[arg(long, global = true)]
    pub id_field: Option<String>,

    /// Field holding a record's parent id
    #[arg(long, global = true)]
    pub parent_field: Option<String>,

    /// Reject missing or duplicate ids and cyclic parent chains
    #[arg(long, global = true)]
    pub strict: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show records as a tree
    Tree {
        /// Record file (.json or .toml)
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Only show the subtree below this parent id
        #[arg(short, long)]
        filter: Option<String>,
        /// Field used as node label
        #[arg(short, long)]
        label: Option<String>,
    },

    /// List records in tree order
    Flat {
        /// Record file (.json or .toml)
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Only list the subtree below this parent id
        #[arg(short, long)]
        filter: Option<String>,
        /// Field printed per record
        #[arg(short, long)]
        label: Option<String>,
        /// Indent records by depth
        #[arg(short, long)]
        indent: bool,
    },

    /// Print the id -> children mapping as JSON
    Relations {
        /// Record file (.json or .toml)
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Only map the subtree below this parent id
        #[arg(short, long)]
        filter: Option<String>,
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
    /// Show effective settings
    Show {
        /// Directory searched for a local .restree.toml
        #[arg(value_hint = ValueHint::DirPath)]
        dir: Option<PathBuf>,
    },
    /// Show global config file location
    Path,
    /// Print a commented config template
    Template,
}
