mod cmd_annotate;
mod cmd_config;
mod cmd_init;
mod cmd_render;
mod cmd_run;
mod logging;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "buildnote",
    version,
    about = "Record build console output with signed overlay notes"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Initialize a new .buildnote/ workspace
    Init,
    /// Run a command and record its annotated console output
    Run {
        /// Record the output without injecting notes
        #[arg(long)]
        no_annotate: bool,
        /// Charset of the tool's output (utf-8, iso-8859-1)
        #[arg(long)]
        charset: Option<String>,
        /// Command and arguments (after --)
        #[arg(last = true)]
        argv: Vec<String>,
    },
    /// Annotate a console stream (stdin to stdout by default)
    Annotate {
        /// Read from this file instead of stdin
        #[arg(long)]
        input: Option<PathBuf>,
        /// Write to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Render a decorated log
    Render {
        /// Run id or path to a decorated log file
        target: String,
        /// Output format: html, ansi, plain
        #[arg(long, default_value = "html")]
        format: String,
        /// Include the section outline (before the body in html, after it otherwise)
        #[arg(long)]
        outline: bool,
        /// Strip section-header notes without bolding the names or listing them
        #[arg(long)]
        no_section_markup: bool,
    },
    /// List recorded runs
    Runs {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage workspace configuration
    Config {
        #[command(subcommand)]
        cmd: cmd_config::ConfigCmd,
    },
}

fn main() -> anyhow::Result<()> {
    logging::init();
    let cli = Cli::parse();
    let repo_root = std::env::current_dir()?;

    match cli.cmd {
        Command::Init => cmd_init::execute(&repo_root),
        Command::Run {
            no_annotate,
            charset,
            argv,
        } => {
            let code = cmd_run::execute(&repo_root, &argv, no_annotate, charset.as_deref())?;
            if code != 0 {
                std::process::exit(code);
            }
            Ok(())
        }
        Command::Annotate { input, output } => {
            cmd_annotate::execute(&repo_root, input.as_deref(), output.as_deref())
        }
        Command::Render {
            target,
            format,
            outline,
            no_section_markup,
        } => cmd_render::execute(&repo_root, &target, &format, outline, !no_section_markup),
        Command::Runs { json } => cmd_run::list(&repo_root, json),
        Command::Config { cmd } => cmd_config::run(cmd, &repo_root),
    }
}
