use crate::verdict::{Grade, Group};
use once_cell::sync::Lazy;
use regex::Regex;

// One recognized line of verifyproblem output. Everything else is chatter.
#[derive(Clone, Debug, PartialEq)]
pub enum LogLine {
    ProblemLoaded {
        name: String,
    },
    SubmissionStarted {
        category: Grade,
        name: String,
    },
    TestGroupStarted {
        group: Group,
    },
    AcceptedCase {
        time: f64,
        case: String,
    },
    GroupGraded {
        group: Group,
        grade: Grade,
    },
    SubmissionEnded {
        grade: Grade,
        points: Option<u64>,
        maxtime: f64,
    },
    TimeLimits {
        limit: u64,
        safety: u64,
    },
}

static END_SUBMISSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        (?P<category>\S+)
        \s+ submission \s+
        (?P<name>\S+)
        \s+ \( (?P<language>[^)]+) \)
        \s+ (?P<status>\S+)
        \s+ (?P<grade>\S+)
        \s+ (?: \( (?P<points>\d+) \) \s+ )?
        \[ .* CPU:\s (?P<maxtime>\d+\.\d+) s .* \]
        ",
    )
    .unwrap()
});

static FIRST_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Loading problem (?P<problemname>\S+)").unwrap());

static TESTGROUP_GRADE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"INFO : Grade on test case group data/(?P<kind>sample|secret/group)(?P<number>\d+)?\s+is\s+(?P<grade>\S+)",
    )
    .unwrap()
});

static START_SUBMISSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"INFO : Check (?P<category>\S+) submission (?P<name>\S+)").unwrap());

static START_TESTGROUP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"INFO : Running on test case group data/(?:sample|secret/group(?P<number>\d+))")
        .unwrap()
});

static AC_TC_RESULT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        [Tt]est\ file\ result
        .* AC .*
        CPU:\s (?P<time>\d+\.\d+)
        .*
        test\ case\ (?: sample | secret/group\d+ ) /
        (?P<case>[^\]]+)
        ",
    )
    .unwrap()
});

static TIMELIMIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"setting timelim to (?P<limit>\d+) secs, safety margin to (?P<safety>\d+) secs")
        .unwrap()
});

/// Tries each pattern in a fixed order and returns the first match, or `None`
/// for chatter. A numeric capture that does not fit its type makes the whole
/// line chatter.
pub fn match_line(line: &str) -> Option<LogLine> {
    if let Some(caps) = END_SUBMISSION.captures(line) {
        let points = match caps.name("points") {
            Some(points) => Some(points.as_str().parse().ok()?),
            None => None,
        };
        return Some(LogLine::SubmissionEnded {
            grade: Grade::from_verifier(&caps["grade"]),
            points,
            maxtime: caps["maxtime"].parse().ok()?,
        });
    }

    if let Some(caps) = FIRST_LINE.captures(line) {
        return Some(LogLine::ProblemLoaded {
            name: caps["problemname"].to_string(),
        });
    }

    if let Some(caps) = TESTGROUP_GRADE.captures(line) {
        let group = if &caps["kind"] == "sample" {
            Group::Sample
        } else {
            Group::Secret(caps.name("number")?.as_str().parse().ok()?)
        };
        return Some(LogLine::GroupGraded {
            group,
            grade: Grade::from_verifier(&caps["grade"]),
        });
    }

    if let Some(caps) = START_SUBMISSION.captures(line) {
        return Some(LogLine::SubmissionStarted {
            category: Grade::from_verifier(&caps["category"]),
            name: caps["name"].to_string(),
        });
    }

    if let Some(caps) = START_TESTGROUP.captures(line) {
        let group = match caps.name("number") {
            Some(number) => Group::Secret(number.as_str().parse().ok()?),
            None => Group::Sample,
        };
        return Some(LogLine::TestGroupStarted { group });
    }

    if let Some(caps) = AC_TC_RESULT.captures(line) {
        return Some(LogLine::AcceptedCase {
            time: caps["time"].parse().ok()?,
            case: caps["case"].to_string(),
        });
    }

    if let Some(caps) = TIMELIMIT.captures(line) {
        return Some(LogLine::TimeLimits {
            limit: caps["limit"].parse().ok()?,
            safety: caps["safety"].parse().ok()?,
        });
    }

    None
}
