use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(version, about, args_conflicts_with_subcommands = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// File to open when no subcommand is given.
    pub file: Option<PathBuf>,

    /// Config file to load instead of ./config.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct EditArgs {
    /// File to open; the editor starts untitled when omitted.
    pub file: Option<PathBuf>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RunArgs {
    /// Script to execute.
    pub file: PathBuf,

    /// Interpreter to use instead of `run.interpreter`.
    #[arg(long)]
    pub interpreter: Option<String>,

    /// Only treat lines that start with the marker as prompts.
    #[arg(long, default_value_t = false)]
    pub strict_prompts: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Open the terminal editor.
    Edit(EditArgs),
    /// Run a script without the editor, answering prompts on this terminal.
    Run(RunArgs),
}
