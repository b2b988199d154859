use anyhow::{bail, Context, Result};
use clap::Parser;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

#[derive(Parser, Debug)]
#[clap(
    author,
    version,
    about = "Package secret test data into a CMS-importable cms.zip according to the cases/groups partition",
    long_about = None
)]
struct CLIArgs {
    /// Data directory holding the cases and groups files and the secret tests
    #[clap(short, long, default_value = ".")]
    data: PathBuf,
}

fn main() -> Result<()> {
    let cli_args = CLIArgs::parse();
    let descriptor = generate(&cli_args.data)?;
    println!("{descriptor}");
    Ok(())
}

fn generate(data: &Path) -> Result<String> {
    let scores = read_groups(&data.join("groups"))?;
    let group_cases = read_cases(&data.join("cases"), scores.len())?;
    for group in 0..scores.len() {
        if !group_cases.contains_key(&group) {
            bail!("Group {group} has no test cases");
        }
    }
    write_archive(data, &group_cases)?;
    Ok(score_descriptor(&scores, &group_cases))
}

// groups: one `name score` pair per line, in group order.
fn read_groups(path: &Path) -> Result<Vec<u32>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let mut scores = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let mut tokens = line.split_whitespace();
        let (Some(_name), Some(score), None) = (tokens.next(), tokens.next(), tokens.next())
        else {
            bail!("Line {} of {}: expected 'name score'", lineno + 1, path.display());
        };
        let score = score.parse().with_context(|| {
            format!("Line {} of {}: bad score {score}", lineno + 1, path.display())
        })?;
        scores.push(score);
    }
    Ok(scores)
}

// cases: one `case group` pair per line, where group indexes into the groups
// file. Case order within a group follows the file.
fn read_cases(path: &Path, group_count: usize) -> Result<BTreeMap<usize, Vec<String>>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let mut group_cases: BTreeMap<usize, Vec<String>> = BTreeMap::new();
    for (lineno, line) in text.lines().enumerate() {
        let mut tokens = line.split_whitespace();
        let (Some(case), Some(group), None) = (tokens.next(), tokens.next(), tokens.next())
        else {
            bail!("Line {} of {}: expected 'case group'", lineno + 1, path.display());
        };
        let group: usize = group.parse().with_context(|| {
            format!("Line {} of {}: bad group {group}", lineno + 1, path.display())
        })?;
        if group >= group_count {
            bail!(
                "Line {} of {}: case {case} references group {group}, but only {group_count} groups are declared",
                lineno + 1,
                path.display()
            );
        }
        group_cases.entry(group).or_default().push(case.to_string());
    }
    Ok(group_cases)
}

// Lays the cases out as g000/<case>.in and g000/<case>.ans, the layout the
// CMS import script expects.
fn write_archive(data: &Path, group_cases: &BTreeMap<usize, Vec<String>>) -> Result<()> {
    let path = data.join("cms.zip");
    let file =
        File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut zip = ZipWriter::new(file);
    let options: FileOptions<'_, ()> =
        FileOptions::default().compression_method(CompressionMethod::Deflated);

    for (&group, cases) in group_cases {
        zip.add_directory(format!("g{group:03}"), options.clone())
            .context("Failed to write to cms.zip")?;
        for case in cases {
            for extension in ["in", "ans"] {
                let source = data.join("secret").join(format!("{case}.{extension}"));
                let contents = std::fs::read(&source)
                    .with_context(|| format!("Failed to read {}", source.display()))?;
                zip.start_file(format!("g{group:03}/{case}.{extension}"), options.clone())
                    .context("Failed to write to cms.zip")?;
                zip.write_all(&contents)
                    .context("Failed to write to cms.zip")?;
            }
        }
    }

    zip.finish().context("Failed to finalize cms.zip")?;
    Ok(())
}

// The score descriptor CMS wants: [[score, case count], ...] in group order.
fn score_descriptor(scores: &[u32], group_cases: &BTreeMap<usize, Vec<String>>) -> String {
    let entries: Vec<String> = scores
        .iter()
        .enumerate()
        .map(|(group, score)| {
            format!(
                "[{score}, {}]",
                group_cases.get(&group).map_or(0, Vec::len)
            )
        })
        .collect();
    format!("[{}]", entries.join(", "))
}
