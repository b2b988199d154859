use crate::{config, problem, report, verifier};
use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::Colorize;
use log::LevelFilter;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct CLIArgs {
    /// Path to the problem directory
    pub problemdir: PathBuf,

    /// Read a saved log instead of running verifyproblem
    #[clap(short = 'f', long = "file")]
    pub logfile: Option<PathBuf>,

    /// Only show errors, not warnings
    #[clap(short = 'n', long = "no-warnings")]
    pub no_warnings: bool,
}

pub fn main() -> Result<()> {
    let cli_args = CLIArgs::parse();

    setup_logging(if cli_args.no_warnings {
        LevelFilter::Error
    } else {
        LevelFilter::Info
    })?;

    let problempath = cli_args.problemdir.canonicalize().with_context(|| {
        format!(
            "Problem directory {} does not exist",
            cli_args.problemdir.display()
        )
    })?;
    let problemname = problempath
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let problem_config = config::load(&problempath)?;
    if !problem_config.is_scoring() {
        bail!("{problemname} is not a scoring problem. Aborting");
    }

    let mut input = match &cli_args.logfile {
        Some(path) => verifier::LogInput::from_file(path)?,
        None => {
            report::status(&format!(
                "Running verifyproblem {} -l info ...",
                problempath.display()
            ));
            verifier::LogInput::from_verifier(&problempath)?
        }
    };

    let mut problem = problem::interpret(&problempath, input.reader())?;
    input.finish()?;

    report::sort_for_display(&mut problem);
    let marks = report::compare_expectations(&problem);
    report::print_report(&problem, &marks);
    report::check_distinguished(&problem);

    Ok(())
}

fn setup_logging(level: LevelFilter) -> Result<()> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            let level = match record.level() {
                log::Level::Error => "ERROR:".bright_red(),
                log::Level::Warn => "WARNING:".yellow(),
                log::Level::Info => "INFO:".green(),
                log::Level::Debug => "DEBUG:".cyan(),
                log::Level::Trace => "TRACE:".normal(),
            };
            out.finish(format_args!("{level} {message}"))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()
        .context("Failed to initialize logging")
}
