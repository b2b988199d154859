use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

// The slice of problem.yaml this tool cares about. Unknown keys are the
// problem author's business.
#[derive(Debug, Deserialize)]
pub struct ProblemConfig {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl ProblemConfig {
    pub fn is_scoring(&self) -> bool {
        self.kind.as_deref() == Some("scoring")
    }
}

pub fn load(problempath: &Path) -> Result<ProblemConfig> {
    let path = problempath.join("problem.yaml");
    let file = std::fs::File::open(&path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    serde_yaml::from_reader(file)
        .with_context(|| format!("Failed to parse {}", path.display()))
}
