//! Command-line interface.

use std::path::PathBuf;

use clap::Parser;

/// Default number of levels shown below each root.
pub const DEFAULT_DEPTH: usize = 2;

/// Launch a program under a debug adapter, stop on entry and print the
/// variables of the top stack frame.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "vartree", version)]
pub struct CliArgs {
    /// Global configuration directory
    #[arg(long = "config", value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// Debug adapter executable (overrides adapter.command)
    #[arg(long, value_name = "CMD")]
    pub adapter: Option<String>,

    /// Levels to show below each root
    #[arg(long, default_value_t = DEFAULT_DEPTH)]
    pub depth: usize,

    /// Evaluate EXPR as a watch expression (repeatable)
    #[arg(long = "watch", value_name = "EXPR")]
    pub watches: Vec<String>,

    /// Evaluate EXPR as a hover expression
    #[arg(long, value_name = "EXPR")]
    pub hover: Option<String>,

    /// Program to debug
    pub program: String,

    /// Arguments passed to the program
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub program_args: Vec<String>,
}
