use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Child, Command, Stdio};

/// A stream of verifyproblem output, either replayed from a saved log file or
/// read live from a `verifyproblem <problemdir> -l info` child process.
pub struct LogInput {
    reader: Box<dyn BufRead>,
    child: Option<Child>,
}

impl LogInput {
    pub fn from_file(path: &Path) -> Result<LogInput> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        Ok(LogInput {
            reader: Box::new(BufReader::new(file)),
            child: None,
        })
    }

    pub fn from_verifier(problemdir: &Path) -> Result<LogInput> {
        let mut child = Command::new("verifyproblem")
            .arg(problemdir)
            .args(["-l", "info"])
            .stdout(Stdio::piped())
            .spawn()
            .context("Failed to run verifyproblem, is problemtools installed?")?;
        let stdout = child
            .stdout
            .take()
            .context("Failed to capture verifyproblem output")?;
        Ok(LogInput {
            reader: Box::new(BufReader::new(stdout)),
            child: Some(child),
        })
    }

    pub fn reader(&mut self) -> &mut dyn BufRead {
        &mut self.reader
    }

    // The exit status carries nothing the log has not already said.
    pub fn finish(self) -> Result<()> {
        if let Some(mut child) = self.child {
            child
                .wait()
                .context("Failed to wait for verifyproblem to exit")?;
        }
        Ok(())
    }
}
