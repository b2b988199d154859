use crate::verdict::{Grade, Group, Verdict};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use walkdir::WalkDir;

#[derive(Debug)]
pub struct Submission {
    pub name: String,
    pub category: Grade,
    // Group verdicts in the order the log reported them.
    pub verdicts: Vec<(Group, Verdict)>,
    pub points: u64,
    pub maxtime: f64,
    pub expected_grades: Option<BTreeMap<u32, Grade>>,
}

impl Submission {
    pub fn new(problempath: &Path, category: Grade, name: String) -> Submission {
        let expected_grades = category_dir(&category).and_then(|dir| {
            find_expected_grades(
                &problempath
                    .join("submissions")
                    .join(dir)
                    .join(&name),
            )
        });
        Submission {
            name,
            category,
            verdicts: Vec::new(),
            points: 0,
            maxtime: 0.0,
            expected_grades,
        }
    }

    pub fn verdict_for(&self, group: Group) -> Option<&Verdict> {
        self.verdicts
            .iter()
            .find(|(key, _)| *key == group)
            .map(|(_, verdict)| verdict)
    }

    /// The grades this submission is expected to get on the secret groups.
    /// Accepted submissions must be AC everywhere, so their annotation (if
    /// any) is ignored; other submissions need an explicit annotation.
    pub fn effective_expectations(&self, groups: &[u32]) -> Option<BTreeMap<u32, Grade>> {
        if self.category == Grade::AC {
            Some(groups.iter().map(|&number| (number, Grade::AC)).collect())
        } else {
            self.expected_grades.clone()
        }
    }
}

impl fmt::Display for Submission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

// Maps the category token from the log to the submissions/ subdirectory
// verifyproblem took the submission from.
pub fn category_dir(category: &Grade) -> Option<&'static str> {
    match category {
        Grade::AC => Some("accepted"),
        Grade::PAC => Some("partially_accepted"),
        Grade::WA => Some("wrong_answer"),
        Grade::TLE => Some("time_limit_exceeded"),
        Grade::RTE => Some("run_time_error"),
        _ => None,
    }
}

static EXPECTED_GRADES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@EXPECTED_GRADES@(?P<grades>.*)").unwrap());

/// Scans a submission source (a file, or every file of a directory submission
/// in file name order) for an `@EXPECTED_GRADES@` annotation and returns the
/// declared grades keyed by secret group number, first hit wins.
pub fn find_expected_grades(path: &Path) -> Option<BTreeMap<u32, Grade>> {
    for entry in WalkDir::new(path)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        // Submissions are text; anything unreadable cannot carry an annotation.
        let Ok(source) = std::fs::read_to_string(entry.path()) else {
            continue;
        };
        for line in source.lines() {
            let Some(caps) = EXPECTED_GRADES.captures(line) else {
                continue;
            };
            let grades = parse_annotation(&caps["grades"], entry.path());
            if !grades.is_empty() {
                return Some(
                    grades
                        .into_iter()
                        .enumerate()
                        .map(|(index, grade)| (index as u32 + 1, grade))
                        .collect(),
                );
            }
        }
    }
    None
}

// Grades follow the marker as whitespace-separated tokens, one per secret
// group. The list ends at the first token that is not a grade, so trailing
// prose after the annotation stays out of it.
fn parse_annotation(rest: &str, path: &Path) -> Vec<Grade> {
    let mut grades = Vec::new();
    for token in rest.split_whitespace() {
        match Grade::parse_known(token) {
            Some(grade @ (Grade::PAC | Grade::JE)) => {
                log::warn!(
                    "{}: annotation grade {grade} is not in the usual AC/WA/TLE/RTE/MLE set",
                    path.display()
                );
                grades.push(grade);
            }
            Some(grade) => grades.push(grade),
            None => {
                if looks_like_grade(token) {
                    log::warn!(
                        "{}: unknown grade '{token}' in @EXPECTED_GRADES@, ignoring it and the rest of the list",
                        path.display()
                    );
                }
                break;
            }
        }
    }
    grades
}

fn looks_like_grade(token: &str) -> bool {
    (2..=4).contains(&token.len()) && token.bytes().all(|byte| byte.is_ascii_uppercase())
}
