//! `Orchestrator`: one customization run
//!
//! Sequences inventory validation, bundle parsing, target resolution and
//! dispatch. Machines are processed one at a time in sorted order and the
//! first failure ends the run.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::Utc;
use nimcust_api::{CustMode, CustRequest, DiagnosticSink, MachineOutcome, RunEvent, RunReport};
use nimcust_inventory::{InventorySnapshot, InventorySource};
use nimcust_nim::{CustClassification, Customizer};
use tracing::{error, info, instrument};

use crate::error::CoreError;
use crate::level::{OsLevel, compare, parse_bundle_level, parse_client_level};
use crate::state::RunState;
use crate::targets::resolve;

/// Current step of a run, with validated transitions
struct RunProgress<'a> {
    state: RunState,
    sink: &'a dyn DiagnosticSink,
}

impl<'a> RunProgress<'a> {
    fn new(sink: &'a dyn DiagnosticSink) -> Self {
        Self {
            state: RunState::Validating,
            sink,
        }
    }

    fn transition_to(&mut self, next: RunState) -> Result<(), CoreError> {
        if !self.state.can_transition_to(next) {
            return Err(CoreError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }

        let from = self.state;
        self.state = next;
        self.sink.emit(RunEvent::StateChanged {
            from: from.to_string(),
            to: next.to_string(),
        });

        Ok(())
    }
}

/// Customization orchestrator
pub struct Orchestrator {
    /// Where the NIM inventory snapshot comes from
    inventory: Arc<dyn InventorySource>,
    /// Applies lpp_sources to machines
    customizer: Arc<dyn Customizer>,
    /// Operator-facing diagnostics
    sink: Arc<dyn DiagnosticSink>,
}

impl Orchestrator {
    pub fn new(
        inventory: Arc<dyn InventorySource>,
        customizer: Arc<dyn Customizer>,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            inventory,
            customizer,
            sink,
        }
    }

    /// Run the `update` action
    ///
    /// # Errors
    /// Returns the first `CoreError` encountered; no later machine is attempted.
    #[instrument(skip(self, request), fields(lpp_source = %request.lpp_source, mode = %request.mode))]
    pub async fn run(&self, request: &CustRequest) -> Result<RunReport, CoreError> {
        let mut progress = RunProgress::new(self.sink.as_ref());

        match self.execute(request, &mut progress).await {
            Ok(report) => {
                progress.transition_to(RunState::Completed)?;
                info!(
                    updated = report.updated_count(),
                    skipped = report.skipped_count(),
                    "customization completed"
                );
                Ok(report)
            }
            Err(e) => {
                progress.transition_to(RunState::Failed)?;
                error!(step = e.step(), error = %e, "customization failed");
                self.sink.error(&format!("{} failed: {e}", e.step()));
                Err(e)
            }
        }
    }

    /// Run the `check` action
    ///
    /// Reports nothing and changes nothing.
    ///
    /// # Errors
    /// Never fails today.
    pub async fn check(&self, request: &CustRequest) -> Result<(), CoreError> {
        self.sink
            .debug(&format!("check requested for lpp_source={}", request.lpp_source));
        Ok(())
    }

    /// Resolve a target spec and pair each machine with its current oslevel
    ///
    /// # Errors
    /// Returns `InventoryUnavailable`, `NoTargetsResolved` or
    /// `InvalidTargetPattern`.
    pub async fn preview_targets(
        &self,
        spec: Option<&str>,
    ) -> Result<Vec<(String, String)>, CoreError> {
        let inventory = self.load_inventory().await?;
        let targets = resolve(spec, &inventory, self.sink.as_ref())?;

        Ok(targets
            .into_iter()
            .map(|m| {
                let level = inventory.oslevel(&m).unwrap_or_default().to_string();
                (m, level)
            })
            .collect())
    }

    async fn load_inventory(&self) -> Result<InventorySnapshot, CoreError> {
        let snapshot = self.inventory.load().await.map_err(|e| {
            CoreError::InventoryUnavailable(format!("{}: {e}", self.inventory.describe()))
        })?;
        self.sink.debug(&format!(
            "Inventory client machine's list is {:?}",
            snapshot.machine_names().collect::<Vec<_>>()
        ));
        Ok(snapshot)
    }

    async fn execute(
        &self,
        request: &CustRequest,
        progress: &mut RunProgress<'_>,
    ) -> Result<RunReport, CoreError> {
        let started_at = Utc::now();

        self.sink.debug(&format!("desc=\"{}\"", request.desc));
        self.sink
            .debug(&format!("lpp_source={}", request.lpp_source));
        self.sink.debug(&format!(
            "targets={}",
            request.targets.as_deref().unwrap_or_default()
        ));

        let inventory = self.load_inventory().await?;

        progress.transition_to(RunState::ParsingBundle)?;
        let os_level = parse_bundle_level(&request.lpp_source, &inventory)?;
        self.sink.debug(&format!("os_level: {os_level}"));

        progress.transition_to(RunState::ResolvingTargets)?;
        let targets = resolve(request.targets.as_deref(), &inventory, self.sink.as_ref())?;

        progress.transition_to(RunState::Dispatching)?;
        let outcomes = match request.mode {
            CustMode::Async => vec![self.dispatch_batch(request, &targets).await?],
            CustMode::Sync => {
                self.dispatch_each(request, &inventory, &os_level, &targets)
                    .await?
            }
        };

        Ok(RunReport {
            desc: request.desc.clone(),
            lpp_source: request.lpp_source.clone(),
            os_level: os_level.to_string(),
            mode: request.mode,
            dry_run: request.dry_run,
            targets,
            outcomes,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// One asynchronous nim call for every target, no level gating
    async fn dispatch_batch(
        &self,
        request: &CustRequest,
        targets: &[String],
    ) -> Result<MachineOutcome, CoreError> {
        let joined = targets.join(" ");
        let command = self.customizer.describe(&request.lpp_source, targets, true);

        if request.dry_run {
            self.sink
                .info(&format!("Would update machines '{joined}' to {}", request.lpp_source));
            return Ok(MachineOutcome::skipped(joined, format!("dry run: {command}")));
        }

        self.sink.info(&format!(
            "Start updating machines '{joined}' to {}.",
            request.lpp_source
        ));
        self.sink.emit(RunEvent::UpdateStarted {
            target: joined.clone(),
            command,
        });

        let result = self
            .customizer
            .cust_batch(&request.lpp_source, targets, self.sink.as_ref())
            .await;
        self.sink.emit(RunEvent::UpdateFinished {
            target: joined.clone(),
            success: result.is_ok(),
        });

        Ok(match result? {
            CustClassification::BenignNoop => MachineOutcome::skipped(
                joined,
                "software already at the same level as on the media",
            ),
            _ => MachineOutcome::updated(joined, "asynchronous update submitted"),
        })
    }

    /// Per-machine loop in sorted order; the first failure aborts the rest
    async fn dispatch_each(
        &self,
        request: &CustRequest,
        inventory: &InventorySnapshot,
        os_level: &OsLevel,
        targets: &[String],
    ) -> Result<Vec<MachineOutcome>, CoreError> {
        let mut outcomes = Vec::with_capacity(targets.len());

        for machine in targets {
            let current_raw = inventory.oslevel(machine).unwrap_or_default();
            let current = parse_client_level(current_raw);

            if current.digit_count() != os_level.digit_count() {
                self.sink.warn(&format!(
                    "Machine {machine} level '{current}' and {os_level} differ in digit count, comparing numerically"
                ));
            }

            if compare(&current, os_level) != Ordering::Less {
                self.sink.info(&format!(
                    "Machine {machine} is already at same or higher level than {os_level}"
                ));
                outcomes.push(MachineOutcome::skipped(
                    machine,
                    format!("already at {current_raw}"),
                ));
                continue;
            }

            let command = self.customizer.describe(
                &request.lpp_source,
                std::slice::from_ref(machine),
                false,
            );

            if request.dry_run {
                self.sink.info(&format!(
                    "Would update machine {machine} from {current_raw} to {}",
                    request.lpp_source
                ));
                outcomes.push(MachineOutcome::skipped(machine, format!("dry run: {command}")));
                continue;
            }

            self.sink.info(&format!(
                "Start updating machine {machine} from {current_raw} to {}.",
                request.lpp_source
            ));
            self.sink.emit(RunEvent::UpdateStarted {
                target: machine.clone(),
                command,
            });

            let result = self
                .customizer
                .cust_machine(&request.lpp_source, machine, self.sink.as_ref())
                .await;
            self.sink.emit(RunEvent::UpdateFinished {
                target: machine.clone(),
                success: result.is_ok(),
            });
            self.sink.info(&format!("Finish updating {machine}."));

            outcomes.push(match result? {
                CustClassification::BenignNoop => MachineOutcome::skipped(
                    machine,
                    "software already at the same level as on the media",
                ),
                _ => MachineOutcome::updated(
                    machine,
                    format!("updated from {current_raw} to {}", request.lpp_source),
                ),
            });
        }

        Ok(outcomes)
    }
}
