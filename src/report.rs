use crate::problem::Problem;
use crate::submission::Submission;
use crate::verdict::{Grade, Group, Verdict};
use colored::Colorize;
use std::collections::BTreeMap;
use std::io::Write;

// What the table's expectation column says about one secret group.
#[derive(Debug, PartialEq, Eq)]
pub enum GroupMark {
    Match,
    Mismatch {
        group: u32,
        expected: Option<Grade>,
        actual: Option<Grade>,
    },
}

#[derive(Debug, PartialEq, Eq)]
pub enum RowMarks {
    Compared(Vec<GroupMark>),
    // No effective expectations; carries the annotation worth suggesting.
    NoHint { suggestion: String },
}

pub struct SubmissionMarks<'a> {
    pub submission: &'a Submission,
    pub row: RowMarks,
}

/// Best first: descending points, ascending running time.
pub fn sort_for_display(problem: &mut Problem) {
    problem
        .submissions
        .sort_by(|a, b| b.points.cmp(&a.points).then(a.maxtime.total_cmp(&b.maxtime)));
}

pub fn compare_expectations(problem: &Problem) -> Vec<SubmissionMarks<'_>> {
    problem
        .submissions
        .iter()
        .map(|submission| {
            let row = match submission.effective_expectations(&problem.groups) {
                Some(expected) => RowMarks::Compared(
                    problem
                        .groups
                        .iter()
                        .map(|&number| {
                            let expected = expected.get(&number);
                            let actual = submission
                                .verdict_for(Group::Secret(number))
                                .map(|verdict| &verdict.grade);
                            match (expected, actual) {
                                (Some(expected), Some(actual)) if expected == actual => {
                                    GroupMark::Match
                                }
                                _ => GroupMark::Mismatch {
                                    group: number,
                                    expected: expected.cloned(),
                                    actual: actual.cloned(),
                                },
                            }
                        })
                        .collect(),
                ),
                None => RowMarks::NoHint {
                    suggestion: submission
                        .verdicts
                        .iter()
                        .filter(|(group, _)| *group != Group::Sample)
                        .map(|(_, verdict)| verdict.grade.to_string())
                        .collect::<Vec<_>>()
                        .join(" "),
                },
            };
            SubmissionMarks { submission, row }
        })
        .collect()
}

/// Secret group pairs no submission tells apart, in other words pairs whose
/// sets of AC submissions coincide.
pub fn undistinguished_pairs(problem: &Problem) -> Vec<(u32, u32)> {
    let mut accepting: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
    for (index, submission) in problem.submissions.iter().enumerate() {
        for (group, verdict) in &submission.verdicts {
            if let Group::Secret(number) = group {
                if verdict.grade == Grade::AC {
                    accepting.entry(*number).or_default().push(index);
                }
            }
        }
    }

    let mut pairs = Vec::new();
    for (position, &left) in problem.groups.iter().enumerate() {
        for &right in &problem.groups[position + 1..] {
            if accepting.get(&left) == accepting.get(&right) {
                pairs.push((left, right));
            }
        }
    }
    pairs
}

pub fn print_report(problem: &Problem, marks: &[SubmissionMarks]) {
    clear_status();

    let alignto = problem
        .submissions
        .iter()
        .map(|submission| submission.name.len())
        .max()
        .unwrap_or(0)
        .max("Submission".len());

    let mut header = format!("{:alignto$} Sample   ", "Submission");
    for number in &problem.groups {
        header.push_str(&format!("Group {number}  "));
    }
    header.push_str("Pts Time  Expected");
    println!("{}", header.bold());

    for entry in marks {
        let submission = entry.submission;
        let mut row = format!("{:alignto$} ", submission.name);
        for (_, verdict) in &submission.verdicts {
            row.push_str(&format!("{} ", verdict_cell(verdict)));
        }
        row.push_str(&format!(
            "{:3} {:4.2}s {}",
            submission.points,
            submission.maxtime,
            glyphs(&entry.row, problem.groups.len())
        ));
        println!("{row}");
    }

    for entry in marks {
        match &entry.row {
            RowMarks::Compared(groups) => {
                for mark in groups {
                    if let GroupMark::Mismatch {
                        group,
                        expected,
                        actual,
                    } = mark
                    {
                        warn_mismatch(&entry.submission.name, *group, expected, actual);
                    }
                }
            }
            RowMarks::NoHint { suggestion } => log::info!(
                "{}: No hint found. Consider adding '@EXPECTED_GRADES@ {suggestion}'.",
                entry.submission.name
            ),
        }
    }

    if let Some((limit, safety)) = problem.timelimits {
        println!("Time limit: {limit}s, safe: {safety}s");
    }
}

fn warn_mismatch(name: &str, group: u32, expected: &Option<Grade>, actual: &Option<Grade>) {
    match (expected, actual) {
        (Some(expected), Some(actual)) => log::warn!(
            "{name}: Unexpected grade {actual} on test group {group}. (Expected {expected})."
        ),
        (Some(expected), None) => log::warn!(
            "{name}: No grade recorded for test group {group}. (Expected {expected})."
        ),
        (None, Some(actual)) => log::warn!(
            "{name}: Annotation does not cover test group {group}. (Got {actual})."
        ),
        (None, None) => {
            log::warn!("{name}: Annotation does not cover test group {group}.")
        }
    }
}

// Cells are padded to their visible width before coloring, so the escape
// codes do not throw off the column alignment.
fn verdict_cell(verdict: &Verdict) -> String {
    let padded = format!("{:<8}", verdict.to_string());
    if verdict.grade == Grade::AC {
        padded.green().to_string()
    } else {
        padded.bright_red().to_string()
    }
}

fn glyphs(row: &RowMarks, group_count: usize) -> String {
    match row {
        RowMarks::Compared(groups) => groups
            .iter()
            .map(|mark| match mark {
                GroupMark::Match => "y".green().to_string(),
                GroupMark::Mismatch { .. } => "n".bright_red().to_string(),
            })
            .collect(),
        RowMarks::NoHint { .. } => ".".repeat(group_count),
    }
}

pub fn check_distinguished(problem: &Problem) {
    let pairs = undistinguished_pairs(problem);
    if pairs.is_empty() {
        println!(
            "{}All secret test groups distinguished by some submission",
            "OK: ".green()
        );
        return;
    }
    for (left, right) in pairs {
        log::warn!(
            "No submission distinguishes test groups {left} and {right}. Consider adding one, or merging groups."
        );
    }
}

// A transient one-line progress indicator, overwritten in place.
pub fn status(text: &str) {
    let text: String = text.chars().take(80).collect();
    print!("{text:<80}\r");
    let _ = std::io::stdout().flush();
}

pub fn clear_status() {
    print!("{:<80}\r", "");
    let _ = std::io::stdout().flush();
}
