use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::warn;

use fcit_shell::config::Config;
use fcit_shell::shell::{EditorSource, LineSource, ReaderSource};
use fcit_shell::{logging, system, Shell};

/// An interactive shell with pipes, redirection and background jobs.
#[derive(Parser, Debug)]
#[command(name = "fcit-shell", version)]
struct Args {
    /// Configuration file (defaults to ~/.config/fcit-shell/config.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run a single command line and exit with its status.
    #[arg(short = 'c', value_name = "COMMAND")]
    command: Option<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(status) => ExitCode::from(u8::try_from(status).unwrap_or(1)),
        Err(e) => {
            eprintln!("fcit: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Runs the shell and returns the status of its last command.
fn run(args: Args) -> anyhow::Result<i32> {
    let config = Config::load(args.config.as_deref())?;
    logging::init(&config.log_level);

    let mut shell = Shell::new(config);
    if let Some(command) = args.command {
        shell.execute_line(&command);
        return Ok(shell.last_status());
    }

    let mut source: Box<dyn LineSource> = if io::stdin().is_terminal() {
        if let Err(e) = system::install_interrupt_handler() {
            warn!("cannot install interrupt handler: {e}");
        }
        Box::new(EditorSource::new()?)
    } else {
        Box::new(ReaderSource::new(io::stdin().lock()))
    };
    shell.run(source.as_mut())?;
    Ok(shell.last_status())
}
