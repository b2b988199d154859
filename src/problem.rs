use crate::patterns::{self, LogLine};
use crate::report;
use crate::submission::{self, Submission};
use crate::verdict::{Grade, Group, Verdict};
use anyhow::{bail, Context, Result};
use colored::Colorize;
use std::fmt;
use std::io::BufRead;
use std::path::Path;

pub struct Problem {
    pub submissions: Vec<Submission>,
    // Secret group numbers 1..=N, derived from the highest group seen.
    pub groups: Vec<u32>,
    pub timelimits: Option<(u64, u64)>,
    pub anomalies: Vec<Anomaly>,
}

// Everything suspicious the log interpretation runs into. An anomaly is
// reported and remembered but never stops the run; only a wrong problem
// directory or a non-scoring problem does.
#[derive(Debug, PartialEq, Eq)]
pub enum Anomaly {
    AcWithoutCases { lineno: usize, group: u32 },
    GroupSequence { submission: String },
    RedundantAnnotation { submission: String },
    UnknownCategory { submission: String, category: String },
    OrphanGroupGrade { lineno: usize },
    OrphanSubmissionEnd { lineno: usize },
    RestartedSubmission { submission: String },
    TruncatedSubmission { submission: String },
}

impl Anomaly {
    pub fn level(&self) -> log::Level {
        match self {
            Anomaly::AcWithoutCases { .. }
            | Anomaly::GroupSequence { .. }
            | Anomaly::OrphanGroupGrade { .. }
            | Anomaly::OrphanSubmissionEnd { .. }
            | Anomaly::RestartedSubmission { .. }
            | Anomaly::TruncatedSubmission { .. } => log::Level::Error,
            Anomaly::RedundantAnnotation { .. } | Anomaly::UnknownCategory { .. } => {
                log::Level::Warn
            }
        }
    }
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anomaly::AcWithoutCases { lineno, group } => write!(
                f,
                "Line {lineno} of verifyproblem: AC grade for secret group {group} requires at least one test case"
            ),
            Anomaly::GroupSequence { submission } => {
                write!(f, "Unexpected test group sequence for submission {submission}.")
            }
            Anomaly::RedundantAnnotation { submission } => write!(
                f,
                "AC submission {submission} contains EXPECTED_GRADES. (Ignored, consider removing it.)"
            ),
            Anomaly::UnknownCategory { submission, category } => write!(
                f,
                "Unknown category {category} of submission {submission}, cannot look up expected grades"
            ),
            Anomaly::OrphanGroupGrade { lineno } => write!(
                f,
                "Line {lineno} of verifyproblem: test group grade outside of any submission"
            ),
            Anomaly::OrphanSubmissionEnd { lineno } => write!(
                f,
                "Line {lineno} of verifyproblem: submission result outside of any submission"
            ),
            Anomaly::RestartedSubmission { submission } => write!(
                f,
                "Submission {submission} never finished before the next one started, discarding it"
            ),
            Anomaly::TruncatedSubmission { submission } => {
                write!(f, "Log ended before submission {submission} finished, discarding it")
            }
        }
    }
}

pub struct Interpreter<'a> {
    problempath: &'a Path,
    problem: Problem,
    current: Option<Submission>,
    case_times: Vec<f64>,
    current_case: Option<String>,
    max_group: u32,
    lineno: usize,
}

impl<'a> Interpreter<'a> {
    pub fn new(problempath: &'a Path) -> Interpreter<'a> {
        Interpreter {
            problempath,
            problem: Problem {
                submissions: Vec::new(),
                groups: Vec::new(),
                timelimits: None,
                anomalies: Vec::new(),
            },
            current: None,
            case_times: Vec::new(),
            current_case: None,
            max_group: 0,
            lineno: 0,
        }
    }

    pub fn consume(&mut self, line: &str) -> Result<()> {
        self.lineno += 1;
        let Some(parsed) = patterns::match_line(line) else {
            return Ok(());
        };
        match parsed {
            LogLine::ProblemLoaded { name } => self.on_problem_loaded(&name)?,
            LogLine::SubmissionStarted { category, name } => {
                self.on_submission_started(category, name)
            }
            LogLine::TestGroupStarted { .. } => {
                self.case_times.clear();
            }
            LogLine::AcceptedCase { time, case } => {
                self.case_times.push(time);
                self.current_case = Some(case);
            }
            LogLine::GroupGraded { group, grade } => self.on_group_graded(group, grade),
            LogLine::SubmissionEnded {
                points, maxtime, ..
            } => self.on_submission_ended(points, maxtime),
            LogLine::TimeLimits { limit, safety } => {
                self.problem.timelimits = Some((limit, safety));
            }
        }
        self.print_status();
        Ok(())
    }

    /// Flushes the unfinished submission (if any), derives the secret group
    /// list and runs the per-submission group sequence check.
    pub fn finish(mut self) -> Problem {
        if let Some(unfinished) = self.current.take() {
            self.record(Anomaly::TruncatedSubmission {
                submission: unfinished.name,
            });
        }
        self.problem.groups = (1..=self.max_group).collect();

        let expected: Vec<Group> = std::iter::once(Group::Sample)
            .chain(self.problem.groups.iter().map(|&number| Group::Secret(number)))
            .collect();
        let offenders: Vec<String> = self
            .problem
            .submissions
            .iter()
            .filter(|submission| {
                submission
                    .verdicts
                    .iter()
                    .map(|(group, _)| *group)
                    .ne(expected.iter().copied())
            })
            .map(|submission| submission.name.clone())
            .collect();
        for submission in offenders {
            self.record(Anomaly::GroupSequence { submission });
        }

        self.problem
    }

    fn record(&mut self, anomaly: Anomaly) {
        report::clear_status();
        log::log!(anomaly.level(), "{anomaly}");
        self.problem.anomalies.push(anomaly);
    }

    fn on_problem_loaded(&mut self, name: &str) -> Result<()> {
        let dirname = self
            .problempath
            .file_name()
            .map(|dirname| dirname.to_string_lossy().into_owned())
            .unwrap_or_default();
        if name != dirname {
            bail!("Problem directory {dirname} does not match the log ({name}). Aborting");
        }
        report::clear_status();
        println!("{}", format!("Scoring problem: {name}").bold());
        Ok(())
    }

    fn on_submission_started(&mut self, category: Grade, name: String) {
        if let Some(unfinished) = self.current.take() {
            self.record(Anomaly::RestartedSubmission {
                submission: unfinished.name,
            });
        }
        if submission::category_dir(&category).is_none() {
            self.record(Anomaly::UnknownCategory {
                submission: name.clone(),
                category: category.to_string(),
            });
        }
        let submission = Submission::new(self.problempath, category, name);
        if submission.category == Grade::AC && submission.expected_grades.is_some() {
            self.record(Anomaly::RedundantAnnotation {
                submission: submission.name.clone(),
            });
        }
        self.case_times.clear();
        self.current_case = None;
        self.current = Some(submission);
    }

    fn on_group_graded(&mut self, group: Group, grade: Grade) {
        if let Group::Secret(number) = group {
            self.max_group = self.max_group.max(number);
        }
        if self.current.is_none() {
            self.record(Anomaly::OrphanGroupGrade { lineno: self.lineno });
            self.case_times.clear();
            return;
        }
        if let Group::Secret(number) = group {
            if grade == Grade::AC && self.case_times.is_empty() {
                self.record(Anomaly::AcWithoutCases {
                    lineno: self.lineno,
                    group: number,
                });
            }
        }
        let time = self.case_times.iter().copied().reduce(f64::max);
        self.case_times.clear();
        if let Some(submission) = self.current.as_mut() {
            submission.verdicts.push((group, Verdict::new(grade, time)));
        }
    }

    fn on_submission_ended(&mut self, points: Option<u64>, maxtime: f64) {
        match self.current.take() {
            Some(mut submission) => {
                submission.points = points.unwrap_or(0);
                submission.maxtime = maxtime;
                self.problem.submissions.push(submission);
            }
            None => self.record(Anomaly::OrphanSubmissionEnd { lineno: self.lineno }),
        }
    }

    fn print_status(&self) {
        if let Some(submission) = &self.current {
            let case = self.current_case.as_deref().unwrap_or("-");
            report::status(&format!("Submission {submission}, test case {case}"));
        }
    }
}

pub fn interpret(problempath: &Path, reader: impl BufRead) -> Result<Problem> {
    let mut interpreter = Interpreter::new(problempath);
    for line in reader.lines() {
        let line = line.context("Failed to read the verifier log")?;
        interpreter.consume(&line)?;
    }
    Ok(interpreter.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn problem_dir(root: &Path) -> PathBuf {
        let dir = root.join("mult");
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_full_log_interpretation() {
        let root = tempfile::tempdir().unwrap();
        let dir = problem_dir(root.path());
        let log = "\
Loading problem mult
INFO : setting timelim to 2 secs, safety margin to 4 secs
INFO : Check AC submission fast.cpp
INFO : Running on test case group data/sample
INFO : Test file result: AC [CPU: 0.01s @ test case sample/1]
INFO : Grade on test case group data/sample is AC
INFO : Running on test case group data/secret/group1
INFO : Test file result: AC [CPU: 0.03s @ test case secret/group1/001]
INFO : Test file result: AC [CPU: 0.07s @ test case secret/group1/002]
INFO : Grade on test case group data/secret/group1 is AC
INFO : Running on test case group data/secret/group2
INFO : Test file result: AC [CPU: 0.30s @ test case secret/group2/010]
INFO : Grade on test case group data/secret/group2 is AC
AC submission fast.cpp (C++) OK AC (100) [CPU: 0.30s @ test case secret/group2/010]
INFO : Check WA submission slow.py
INFO : Running on test case group data/sample
INFO : Test file result: AC [CPU: 0.02s @ test case sample/1]
INFO : Grade on test case group data/sample is AC
INFO : Running on test case group data/secret/group1
INFO : Test file result: AC [CPU: 0.09s @ test case secret/group1/001]
INFO : Test file result: AC [CPU: 0.08s @ test case secret/group1/002]
INFO : Grade on test case group data/secret/group1 is AC
INFO : Running on test case group data/secret/group2
INFO : Grade on test case group data/secret/group2 is WA
WA submission slow.py (Python 3) OK WA (40) [CPU: 0.09s @ test case secret/group1/001]
";
        let problem = interpret(&dir, log.as_bytes()).unwrap();

        assert_eq!(problem.groups, vec![1, 2]);
        assert_eq!(problem.timelimits, Some((2, 4)));
        assert!(problem.anomalies.is_empty());
        assert_eq!(problem.submissions.len(), 2);

        let fast = &problem.submissions[0];
        assert_eq!(fast.name, "fast.cpp");
        assert_eq!(fast.category, Grade::AC);
        assert_eq!(fast.points, 100);
        assert_eq!(fast.maxtime, 0.30);
        assert_eq!(fast.verdict_for(Group::Secret(1)).unwrap().time(), Some(0.07));
        assert_eq!(fast.verdict_for(Group::Secret(2)).unwrap().time(), Some(0.30));

        let slow = &problem.submissions[1];
        assert_eq!(slow.points, 40);
        assert_eq!(slow.verdict_for(Group::Secret(2)).unwrap().grade, Grade::WA);
        assert_eq!(slow.verdict_for(Group::Secret(2)).unwrap().time(), None);
    }

    #[test]
    fn test_redundant_annotation_on_accepted_submission() {
        let root = tempfile::tempdir().unwrap();
        let dir = problem_dir(root.path());
        let subdir = dir.join("submissions").join("accepted");
        fs::create_dir_all(&subdir).unwrap();
        fs::write(subdir.join("fast.cpp"), "// @EXPECTED_GRADES@ AC AC\n").unwrap();

        let log = "\
Loading problem mult
INFO : Check AC submission fast.cpp
INFO : Running on test case group data/sample
INFO : Test file result: AC [CPU: 0.01s @ test case sample/1]
INFO : Grade on test case group data/sample is AC
INFO : Running on test case group data/secret/group1
INFO : Test file result: AC [CPU: 0.03s @ test case secret/group1/001]
INFO : Grade on test case group data/secret/group1 is AC
AC submission fast.cpp (C++) OK AC (100) [CPU: 0.03s @ test case secret/group1/001]
";
        let problem = interpret(&dir, log.as_bytes()).unwrap();
        assert_eq!(
            problem.anomalies,
            vec![Anomaly::RedundantAnnotation {
                submission: "fast.cpp".to_string()
            }]
        );
    }

    #[test]
    fn test_ac_group_without_cases_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        let dir = problem_dir(root.path());
        let log = "\
Loading problem mult
INFO : Check AC submission fast.cpp
INFO : Running on test case group data/sample
INFO : Test file result: AC [CPU: 0.01s @ test case sample/1]
INFO : Grade on test case group data/sample is AC
INFO : Running on test case group data/secret/group1
INFO : Grade on test case group data/secret/group1 is AC
AC submission fast.cpp (C++) OK AC (100) [CPU: 0.01s @ test case sample/1]
";
        let problem = interpret(&dir, log.as_bytes()).unwrap();
        assert_eq!(
            problem.anomalies,
            vec![Anomaly::AcWithoutCases { lineno: 7, group: 1 }]
        );
        let verdict = problem.submissions[0].verdict_for(Group::Secret(1)).unwrap();
        assert_eq!(verdict.grade, Grade::AC);
        assert_eq!(verdict.time(), None);
    }

    #[test]
    fn test_group_count_covers_all_submissions() {
        let root = tempfile::tempdir().unwrap();
        let dir = problem_dir(root.path());
        // The first submission stops after group 1, the second reaches group 3.
        let log = "\
Loading problem mult
INFO : Check WA submission short.py
INFO : Running on test case group data/sample
INFO : Test file result: AC [CPU: 0.01s @ test case sample/1]
INFO : Grade on test case group data/sample is AC
INFO : Running on test case group data/secret/group1
INFO : Grade on test case group data/secret/group1 is WA
WA submission short.py (Python 3) OK WA [CPU: 0.01s @ test case sample/1]
INFO : Check AC submission full.cpp
INFO : Running on test case group data/sample
INFO : Test file result: AC [CPU: 0.01s @ test case sample/1]
INFO : Grade on test case group data/sample is AC
INFO : Running on test case group data/secret/group1
INFO : Test file result: AC [CPU: 0.02s @ test case secret/group1/001]
INFO : Grade on test case group data/secret/group1 is AC
INFO : Running on test case group data/secret/group2
INFO : Test file result: AC [CPU: 0.02s @ test case secret/group2/001]
INFO : Grade on test case group data/secret/group2 is AC
INFO : Running on test case group data/secret/group3
INFO : Test file result: AC [CPU: 0.02s @ test case secret/group3/001]
INFO : Grade on test case group data/secret/group3 is AC
AC submission full.cpp (C++) OK AC (100) [CPU: 0.02s @ test case secret/group3/001]
";
        let problem = interpret(&dir, log.as_bytes()).unwrap();
        assert_eq!(problem.groups, vec![1, 2, 3]);
        assert_eq!(
            problem.anomalies,
            vec![Anomaly::GroupSequence {
                submission: "short.py".to_string()
            }]
        );
    }

    #[test]
    fn test_repeated_group_grade_keeps_both_verdicts() {
        let root = tempfile::tempdir().unwrap();
        let dir = problem_dir(root.path());
        // Group 1 is graded twice within one submission. Both verdicts stay in
        // log order and the sequence check complains once.
        let log = "\
Loading problem mult
INFO : Check WA submission dup.py
INFO : Running on test case group data/sample
INFO : Test file result: AC [CPU: 0.01s @ test case sample/1]
INFO : Grade on test case group data/sample is AC
INFO : Running on test case group data/secret/group1
INFO : Test file result: AC [CPU: 0.02s @ test case secret/group1/001]
INFO : Grade on test case group data/secret/group1 is AC
INFO : Running on test case group data/secret/group1
INFO : Grade on test case group data/secret/group1 is WA
WA submission dup.py (Python 3) OK WA [CPU: 0.02s @ test case secret/group1/001]
";
        let problem = interpret(&dir, log.as_bytes()).unwrap();
        let graded: Vec<(Group, Grade)> = problem.submissions[0]
            .verdicts
            .iter()
            .map(|(group, verdict)| (*group, verdict.grade.clone()))
            .collect();
        assert_eq!(
            graded,
            vec![
                (Group::Sample, Grade::AC),
                (Group::Secret(1), Grade::AC),
                (Group::Secret(1), Grade::WA),
            ]
        );
        assert_eq!(
            problem.anomalies,
            vec![Anomaly::GroupSequence {
                submission: "dup.py".to_string()
            }]
        );
    }

    #[test]
    fn test_orphan_lines_are_recorded() {
        let root = tempfile::tempdir().unwrap();
        let dir = problem_dir(root.path());
        let log = "\
Loading problem mult
INFO : Grade on test case group data/secret/group1 is AC
WA submission stray.py (Python 3) OK WA [CPU: 0.01s @ test case sample/1]
";
        let problem = interpret(&dir, log.as_bytes()).unwrap();
        assert_eq!(
            problem.anomalies,
            vec![
                Anomaly::OrphanGroupGrade { lineno: 2 },
                Anomaly::OrphanSubmissionEnd { lineno: 3 },
            ]
        );
        assert!(problem.submissions.is_empty());
        // The orphan grade still counts towards the group list.
        assert_eq!(problem.groups, vec![1]);
    }

    #[test]
    fn test_truncated_log_discards_unfinished_submission() {
        let root = tempfile::tempdir().unwrap();
        let dir = problem_dir(root.path());
        let log = "\
Loading problem mult
INFO : Check AC submission fast.cpp
INFO : Running on test case group data/sample
INFO : Test file result: AC [CPU: 0.01s @ test case sample/1]
INFO : Grade on test case group data/sample is AC
";
        let problem = interpret(&dir, log.as_bytes()).unwrap();
        assert!(problem.submissions.is_empty());
        assert_eq!(
            problem.anomalies,
            vec![Anomaly::TruncatedSubmission {
                submission: "fast.cpp".to_string()
            }]
        );
    }

    #[test]
    fn test_out_of_range_points_discard_the_submission() {
        let root = tempfile::tempdir().unwrap();
        let dir = problem_dir(root.path());
        // A points value no u64 can hold makes the result line chatter, so the
        // submission never commits.
        let log = "\
Loading problem mult
INFO : Check AC submission big.cpp
INFO : Running on test case group data/sample
INFO : Test file result: AC [CPU: 0.01s @ test case sample/1]
INFO : Grade on test case group data/sample is AC
AC submission big.cpp (C++) OK AC (123456789012345678901234567890123456789) [CPU: 0.01s @ test case sample/1]
";
        let problem = interpret(&dir, log.as_bytes()).unwrap();
        assert!(problem.submissions.is_empty());
        assert_eq!(
            problem.anomalies,
            vec![Anomaly::TruncatedSubmission {
                submission: "big.cpp".to_string()
            }]
        );
    }

    #[test]
    fn test_restarted_submission_discards_the_first() {
        let root = tempfile::tempdir().unwrap();
        let dir = problem_dir(root.path());
        let log = "\
Loading problem mult
INFO : Check AC submission first.cpp
INFO : Running on test case group data/sample
INFO : Test file result: AC [CPU: 0.01s @ test case sample/1]
INFO : Grade on test case group data/sample is AC
INFO : Check AC submission second.cpp
INFO : Running on test case group data/sample
INFO : Test file result: AC [CPU: 0.01s @ test case sample/1]
INFO : Grade on test case group data/sample is AC
AC submission second.cpp (C++) OK AC (100) [CPU: 0.01s @ test case sample/1]
";
        let problem = interpret(&dir, log.as_bytes()).unwrap();
        assert_eq!(problem.submissions.len(), 1);
        assert_eq!(problem.submissions[0].name, "second.cpp");
        assert_eq!(
            problem.anomalies,
            vec![Anomaly::RestartedSubmission {
                submission: "first.cpp".to_string()
            }]
        );
    }

    #[test]
    fn test_unknown_category_is_flagged() {
        let root = tempfile::tempdir().unwrap();
        let dir = problem_dir(root.path());
        let log = "\
Loading problem mult
INFO : Check CE submission odd.cpp
INFO : Running on test case group data/sample
INFO : Test file result: AC [CPU: 0.01s @ test case sample/1]
INFO : Grade on test case group data/sample is AC
CE submission odd.cpp (C++) OK AC [CPU: 0.01s @ test case sample/1]
";
        let problem = interpret(&dir, log.as_bytes()).unwrap();
        assert_eq!(
            problem.anomalies,
            vec![Anomaly::UnknownCategory {
                submission: "odd.cpp".to_string(),
                category: "CE".to_string()
            }]
        );
        assert_eq!(problem.submissions[0].expected_grades, None);
    }

    #[test]
    fn test_annotated_accepted_submission_end_to_end() {
        let root = tempfile::tempdir().unwrap();
        let dir = problem_dir(root.path());
        let subdir = dir.join("submissions").join("accepted");
        fs::create_dir_all(&subdir).unwrap();
        fs::write(subdir.join("x.cpp"), "// @EXPECTED_GRADES@ AC AC AC AC\n").unwrap();

        let mut log = String::from(
            "Loading problem mult
INFO : Check AC submission x.cpp
INFO : Running on test case group data/sample
INFO : Test file result: AC [CPU: 0.01s @ test case sample/1]
INFO : Grade on test case group data/sample is AC
",
        );
        for group in 1..=4 {
            log.push_str(&format!(
                "INFO : Running on test case group data/secret/group{group}
INFO : Test file result: AC [CPU: 0.0{group}s @ test case secret/group{group}/001]
INFO : Grade on test case group data/secret/group{group} is AC
"
            ));
        }
        log.push_str(
            "AC submission x.cpp (C++) OK AC (100) [CPU: 0.04s @ test case secret/group4/001]\n",
        );

        let problem = interpret(&dir, log.as_bytes()).unwrap();
        assert_eq!(problem.groups, vec![1, 2, 3, 4]);
        // The annotation is redundant for an accepted submission, and that is
        // the only complaint.
        assert_eq!(
            problem.anomalies,
            vec![Anomaly::RedundantAnnotation {
                submission: "x.cpp".to_string()
            }]
        );

        let marks = report::compare_expectations(&problem);
        assert_eq!(
            marks[0].row,
            report::RowMarks::Compared(vec![
                report::GroupMark::Match,
                report::GroupMark::Match,
                report::GroupMark::Match,
                report::GroupMark::Match,
            ])
        );
    }

    #[test]
    fn test_problem_name_mismatch_is_fatal() {
        let root = tempfile::tempdir().unwrap();
        let dir = problem_dir(root.path());
        let result = interpret(&dir, "Loading problem other\n".as_bytes());
        assert!(result.is_err());
    }

    #[test]
    fn test_last_timelimit_wins() {
        let root = tempfile::tempdir().unwrap();
        let dir = problem_dir(root.path());
        let log = "\
Loading problem mult
INFO : setting timelim to 2 secs, safety margin to 4 secs
INFO : setting timelim to 3 secs, safety margin to 6 secs
";
        let problem = interpret(&dir, log.as_bytes()).unwrap();
        assert_eq!(problem.timelimits, Some((3, 6)));
    }

    #[test]
    fn test_missing_timelimit_stays_unset() {
        let root = tempfile::tempdir().unwrap();
        let dir = problem_dir(root.path());
        let problem = interpret(&dir, "Loading problem mult\n".as_bytes()).unwrap();
        assert_eq!(problem.timelimits, None);
    }
}
