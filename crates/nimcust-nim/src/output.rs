//! Classification of `nim -o cust` output
//!
//! The nim command has no structured result beyond its exit status, so the
//! success oracle is a handful of text matches. They all live here.

use std::sync::LazyLock;

use nimcust_exec::CommandResult;
use regex::Regex;

use crate::types::CustClassification;

/// Phrase nim prints when the installed software already matches the media
pub const BENIGN_NOOP_PHRASE: &str =
    "Either the software is already at the same level as on the media, or";

static FILESETS_PROCESSED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Filesets processed:.*?([0-9]+) of ([0-9]+)")
        .expect("fileset progress regex should be valid")
});

static FILESETS_FINISHED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Finished processing all filesets.")
        .expect("fileset completion regex should be valid")
});

/// Meaning of one stdout line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StdoutLine<'a> {
    /// `Filesets processed: <n> of <m>`
    Progress {
        line: &'a str,
        processed: u64,
        total: u64,
    },
    /// `Finished processing all filesets.`
    Finished(&'a str),
    Other,
}

impl StdoutLine<'_> {
    /// Text to show as the transient progress indicator, if any
    #[must_use]
    pub fn progress_text(&self) -> Option<&str> {
        match self {
            StdoutLine::Progress { line, .. } | StdoutLine::Finished(line) => Some(*line),
            StdoutLine::Other => None,
        }
    }
}

#[must_use]
pub fn classify_stdout_line(line: &str) -> StdoutLine<'_> {
    if let Some(caps) = FILESETS_PROCESSED.captures(line) {
        let processed = caps[1].parse().unwrap_or(0);
        let total = caps[2].parse().unwrap_or(0);
        return StdoutLine::Progress {
            line,
            processed,
            total,
        };
    }
    if FILESETS_FINISHED.is_match(line) {
        return StdoutLine::Finished(line);
    }
    StdoutLine::Other
}

/// Whether a line carries the "already at media level" phrase
#[must_use]
pub fn is_benign_noop(line: &str) -> bool {
    line.contains(BENIGN_NOOP_PHRASE)
}

/// Final verdict for a streamed invocation
///
/// The benign phrase wins over the exit status in both directions.
#[must_use]
pub fn classify_outcome(exit_success: bool, benign_seen: bool) -> CustClassification {
    if benign_seen {
        CustClassification::BenignNoop
    } else if exit_success {
        CustClassification::Success
    } else {
        CustClassification::Failure
    }
}

/// Final verdict for a captured invocation, searching all of its output
#[must_use]
pub fn classify_captured(result: &CommandResult) -> CustClassification {
    classify_outcome(result.success(), is_benign_noop(&result.combined_output()))
}
