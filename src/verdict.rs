use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Grade {
    AC,
    PAC,
    WA,
    TLE,
    RTE,
    MLE,
    JE,
    Other(String),
}

impl Grade {
    pub fn parse_known(token: &str) -> Option<Grade> {
        match token {
            "AC" => Some(Grade::AC),
            "PAC" => Some(Grade::PAC),
            "WA" => Some(Grade::WA),
            "TLE" => Some(Grade::TLE),
            "RTE" => Some(Grade::RTE),
            "MLE" => Some(Grade::MLE),
            "JE" => Some(Grade::JE),
            _ => None,
        }
    }

    // The log is free text, so an unrecognized label stays printable instead of
    // failing the whole line.
    pub fn from_verifier(token: &str) -> Grade {
        Grade::parse_known(token).unwrap_or_else(|| Grade::Other(token.to_string()))
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Grade::AC => write!(f, "AC"),
            Grade::PAC => write!(f, "PAC"),
            Grade::WA => write!(f, "WA"),
            Grade::TLE => write!(f, "TLE"),
            Grade::RTE => write!(f, "RTE"),
            Grade::MLE => write!(f, "MLE"),
            Grade::JE => write!(f, "JE"),
            Grade::Other(label) => write!(f, "{label}"),
        }
    }
}

// Test group key: the public sample group, then secret groups 1..N. The derived
// order is the order verifyproblem grades groups in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Group {
    Sample,
    Secret(u32),
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Group::Sample => write!(f, "sample"),
            Group::Secret(number) => write!(f, "{number}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Verdict {
    pub grade: Grade,
    time: Option<f64>,
}

impl Verdict {
    // A time only makes sense for an accepted run, and can still be absent for
    // AC when no case result was seen for the group.
    pub fn new(grade: Grade, time: Option<f64>) -> Verdict {
        let time = if grade == Grade::AC { time } else { None };
        Verdict { grade, time }
    }

    pub fn time(&self) -> Option<f64> {
        self.time
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.grade)?;
        if let Some(time) = self.time() {
            write!(f, ":{time}s")?;
        }
        Ok(())
    }
}
