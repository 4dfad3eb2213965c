//! Terminal rendering of run events and reports

use std::fmt::Write as _;
use std::sync::Mutex;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use nimcust_api::{DiagnosticSink, RunEvent, RunReport, TracingSink};

const SPINNER_TEMPLATE: &str = "{spinner:.green} {prefix:.bold} {wide_msg}";

/// Sink for interactive runs
///
/// Shows one spinner per nim invocation, fed by its progress lines. Every
/// other event is logged through `TracingSink` above the spinner.
pub struct ConsoleSink {
    bar: Mutex<Option<ProgressBar>>,
    interactive: bool,
}

impl ConsoleSink {
    pub fn new(interactive: bool) -> Self {
        Self {
            bar: Mutex::new(None),
            interactive,
        }
    }

    fn start_bar(&self, target: &str) -> ProgressBar {
        let bar = ProgressBar::new_spinner();
        if !self.interactive {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }
        bar.set_style(
            ProgressStyle::with_template(SPINNER_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_prefix(target.to_string());
        bar.set_message("starting nim cust");
        bar.enable_steady_tick(Duration::from_millis(120));
        bar
    }
}

impl DiagnosticSink for ConsoleSink {
    fn emit(&self, event: RunEvent) {
        let Ok(mut current) = self.bar.lock() else {
            TracingSink.emit(event);
            return;
        };

        match &event {
            RunEvent::UpdateStarted { target, .. } => {
                if let Some(old) = current.replace(self.start_bar(target)) {
                    old.finish_and_clear();
                }
            }
            RunEvent::Progress { line, .. } if self.interactive => {
                if let Some(bar) = current.as_ref() {
                    bar.set_message(line.clone());
                    return;
                }
            }
            RunEvent::UpdateFinished { .. } => {
                if let Some(bar) = current.take() {
                    bar.finish_and_clear();
                }
            }
            _ => {}
        }

        match current.as_ref() {
            Some(bar) => bar.suspend(|| TracingSink.emit(event)),
            None => TracingSink.emit(event),
        }
    }
}

/// Human-readable summary of a finished run
pub fn render_report(report: &RunReport) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "lpp_source {} (level {}), {} mode{}",
        report.lpp_source,
        report.os_level,
        report.mode,
        if report.dry_run { ", dry run" } else { "" }
    );
    if !report.desc.is_empty() {
        let _ = writeln!(out, "desc: {}", report.desc);
    }

    for outcome in &report.outcomes {
        let status = match (outcome.success, outcome.skipped) {
            (true, false) => "updated",
            (true, true) => "skipped",
            (false, _) => "failed",
        };
        let _ = writeln!(out, "  {:<8} {}: {}", status, outcome.target, outcome.diagnostic);
    }

    let elapsed = report.finished_at - report.started_at;
    let _ = write!(
        out,
        "{} updated, {} skipped in {}s",
        report.updated_count(),
        report.skipped_count(),
        elapsed.num_seconds()
    );
    out
}

/// One line per resolved machine, name then current level
pub fn render_targets(targets: &[(String, String)]) -> String {
    let width = targets.iter().map(|(m, _)| m.len()).max().unwrap_or(0);
    targets
        .iter()
        .map(|(machine, level)| {
            let level = if level.is_empty() { "-" } else { level.as_str() };
            format!("{machine:<width$}  {level}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}
