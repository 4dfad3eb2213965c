use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use nimcust_api::{
    CustMode, CustRequest, DiagnosticSink, EventLevel, MemorySink, RunEvent,
};
use nimcust_core::*;
use nimcust_exec::{CommandExecutor, CommandResult, CommandSpec, ExecError, OutputLine};
use nimcust_inventory::{InventoryError, InventorySnapshot, InventorySource, StaticInventory};
use nimcust_nim::{CustClassification, Customizer, NimCustomizer, NimError};

const LPP: &str = "2023-04-01-1234-lpp_source";

// Mock implementations
#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Machine(String),
    Batch(Vec<String>),
}

#[derive(Default)]
struct MockCustomizer {
    calls: Mutex<Vec<Call>>,
    outcomes: HashMap<String, Result<CustClassification, NimError>>,
}

impl MockCustomizer {
    fn with_outcome(
        mut self,
        machine: &str,
        outcome: Result<CustClassification, NimError>,
    ) -> Self {
        self.outcomes.insert(machine.to_string(), outcome);
        self
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Customizer for MockCustomizer {
    async fn cust_machine(
        &self,
        _lpp_source: &str,
        machine: &str,
        _sink: &dyn DiagnosticSink,
    ) -> Result<CustClassification, NimError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Machine(machine.to_string()));
        self.outcomes
            .get(machine)
            .cloned()
            .unwrap_or(Ok(CustClassification::Success))
    }

    async fn cust_batch(
        &self,
        _lpp_source: &str,
        machines: &[String],
        _sink: &dyn DiagnosticSink,
    ) -> Result<CustClassification, NimError> {
        self.calls.lock().unwrap().push(Call::Batch(machines.to_vec()));
        self.outcomes
            .get("*batch*")
            .cloned()
            .unwrap_or(Ok(CustClassification::Success))
    }

    fn describe(&self, lpp_source: &str, machines: &[String], is_async: bool) -> String {
        format!("mock {lpp_source} {} async={is_async}", machines.join(" "))
    }
}

struct BrokenInventory;

#[async_trait]
impl InventorySource for BrokenInventory {
    async fn load(&self) -> Result<InventorySnapshot, InventoryError> {
        Err(InventoryError::MissingClients)
    }

    fn describe(&self) -> String {
        "broken".to_string()
    }
}

/// nim stand-in replaying the same output for every machine
struct ReplayingExecutor {
    lines: Vec<OutputLine>,
    status: i32,
    commands: Mutex<Vec<CommandSpec>>,
}

#[async_trait]
impl CommandExecutor for ReplayingExecutor {
    async fn run(&self, cmd: &CommandSpec) -> Result<CommandResult, ExecError> {
        self.commands.lock().unwrap().push(cmd.clone());
        Ok(CommandResult {
            status: self.status,
            stdout: String::new(),
            stderr: String::new(),
            duration: Duration::from_millis(1),
        })
    }

    async fn run_streaming(
        &self,
        cmd: &CommandSpec,
        on_line: &mut (dyn FnMut(OutputLine) + Send),
    ) -> Result<CommandResult, ExecError> {
        self.commands.lock().unwrap().push(cmd.clone());
        let mut stderr = String::new();
        for line in &self.lines {
            if line.stream == nimcust_exec::StreamKind::Stderr {
                stderr.push_str(&line.line);
                stderr.push('\n');
            }
            on_line(line.clone());
        }
        Ok(CommandResult {
            status: self.status,
            stdout: String::new(),
            stderr,
            duration: Duration::from_millis(1),
        })
    }

    fn executor_type(&self) -> &'static str {
        "replay"
    }
}

fn fleet() -> InventorySnapshot {
    InventorySnapshot::new()
        .with_client("host1", "2022-10-01-0001")
        .with_client("host2", "2023-04-01-1234")
        .with_client("host3", "2022-01-01-0001")
        .with_client("host4", "2024-01-01-0001")
        .with_lpp_source(LPP)
        .with_lpp_source("garbage")
}

fn orchestrator(
    customizer: Arc<dyn Customizer>,
    sink: Arc<MemorySink>,
) -> Orchestrator {
    Orchestrator::new(Arc::new(StaticInventory::new(fleet())), customizer, sink)
}

fn cust_failure(machine: &str) -> NimError {
    NimError::CustFailed {
        target: machine.to_string(),
        status: 1,
        diagnostic: "0042-001 nim: processing error encountered".to_string(),
    }
}

#[tokio::test]
async fn test_sync_updates_only_machines_below_level() {
    let customizer = Arc::new(MockCustomizer::default());
    let sink = Arc::new(MemorySink::new());
    let orchestrator = orchestrator(customizer.clone(), sink.clone());

    let report = orchestrator.run(&CustRequest::new(LPP)).await.unwrap();

    assert_eq!(report.targets, vec!["host1", "host2", "host3", "host4"]);
    assert_eq!(report.os_level, "2023-04-01-1234");
    assert_eq!(
        customizer.calls(),
        vec![
            Call::Machine("host1".to_string()),
            Call::Machine("host3".to_string())
        ]
    );
    assert_eq!(report.updated_count(), 2);
    assert_eq!(report.skipped_count(), 2);

    let skipped: Vec<_> = report
        .outcomes
        .iter()
        .filter(|o| o.skipped)
        .map(|o| o.target.as_str())
        .collect();
    assert_eq!(skipped, vec!["host2", "host4"]);
}

#[tokio::test]
async fn test_sync_current_machine_performs_no_invocation() {
    let customizer = Arc::new(MockCustomizer::default());
    let sink = Arc::new(MemorySink::new());
    let orchestrator = orchestrator(customizer.clone(), sink.clone());

    let report = orchestrator
        .run(&CustRequest::new(LPP).with_targets("host2,host4"))
        .await
        .unwrap();

    assert!(customizer.calls().is_empty());
    assert!(report.outcomes.iter().all(|o| o.success && o.skipped));
    assert!(
        sink.messages(EventLevel::Info)
            .iter()
            .any(|m| m.contains("host2 is already at same or higher level"))
    );
}

#[tokio::test]
async fn test_sync_digit_count_mismatch_warns_and_still_updates() {
    let customizer = Arc::new(MockCustomizer::default());
    let sink = Arc::new(MemorySink::new());
    let inventory = fleet().with_client("legacy", "7100-04");
    let orchestrator =
        Orchestrator::new(Arc::new(StaticInventory::new(inventory)), customizer.clone(), sink.clone());

    let report = orchestrator
        .run(&CustRequest::new(LPP).with_targets("legacy"))
        .await
        .unwrap();

    let warnings = sink.messages(EventLevel::Warn);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("legacy"));
    assert!(warnings[0].contains("differ in digit count"));
    assert_eq!(customizer.calls(), vec![Call::Machine("legacy".to_string())]);
    assert_eq!(report.updated_count(), 1);
}

#[tokio::test]
async fn test_sync_matching_digit_counts_do_not_warn() {
    let sink = Arc::new(MemorySink::new());
    let orchestrator = orchestrator(Arc::new(MockCustomizer::default()), sink.clone());

    orchestrator
        .run(&CustRequest::new(LPP).with_targets("host1,host2"))
        .await
        .unwrap();

    assert!(sink.messages(EventLevel::Warn).is_empty());
}

#[tokio::test]
async fn test_sync_failure_halts_remaining_machines() {
    let customizer =
        Arc::new(MockCustomizer::default().with_outcome("host1", Err(cust_failure("host1"))));
    let sink = Arc::new(MemorySink::new());
    let orchestrator = orchestrator(customizer.clone(), sink.clone());

    let err = orchestrator.run(&CustRequest::new(LPP)).await.unwrap_err();

    match err {
        CoreError::UpdateCommandFailed {
            ref target,
            status,
            ref diagnostic,
        } => {
            assert_eq!(target, "host1");
            assert_eq!(status, 1);
            assert!(diagnostic.contains("0042-001"));
        }
        ref other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.step(), "nim custom operation");
    assert_eq!(customizer.calls(), vec![Call::Machine("host1".to_string())]);

    let last_state = sink.events().into_iter().rev().find_map(|e| match e {
        RunEvent::StateChanged { to, .. } => Some(to),
        _ => None,
    });
    assert_eq!(last_state.as_deref(), Some("failed"));
}

#[tokio::test]
async fn test_sync_benign_noop_is_success() {
    let customizer = Arc::new(
        MockCustomizer::default().with_outcome("host1", Ok(CustClassification::BenignNoop)),
    );
    let sink = Arc::new(MemorySink::new());
    let orchestrator = orchestrator(customizer.clone(), sink);

    let report = orchestrator
        .run(&CustRequest::new(LPP).with_targets("host1,host3"))
        .await
        .unwrap();

    assert_eq!(report.outcomes.len(), 2);
    assert!(report.outcomes[0].success);
    assert!(report.outcomes[0].skipped);
    assert!(!report.outcomes[1].skipped);
    assert_eq!(customizer.calls().len(), 2);
}

#[tokio::test]
async fn test_async_single_invocation_without_level_gating() {
    let customizer = Arc::new(MockCustomizer::default());
    let sink = Arc::new(MemorySink::new());
    let orchestrator = orchestrator(customizer.clone(), sink);

    let report = orchestrator
        .run(&CustRequest::new(LPP).with_mode(CustMode::Async))
        .await
        .unwrap();

    // host2 and host4 are already current but are still part of the batch
    assert_eq!(
        customizer.calls(),
        vec![Call::Batch(vec![
            "host1".to_string(),
            "host2".to_string(),
            "host3".to_string(),
            "host4".to_string(),
        ])]
    );
    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(report.outcomes[0].target, "host1 host2 host3 host4");
}

#[tokio::test]
async fn test_async_failure_is_fatal() {
    let customizer = Arc::new(
        MockCustomizer::default().with_outcome("*batch*", Err(cust_failure("host1 host3"))),
    );
    let orchestrator = orchestrator(customizer, Arc::new(MemorySink::new()));

    let err = orchestrator
        .run(
            &CustRequest::new(LPP)
                .with_targets("host1,host3")
                .with_mode(CustMode::Async),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::UpdateCommandFailed { ref target, .. } if target == "host1 host3"));
}

#[tokio::test]
async fn test_unknown_and_malformed_bundles() {
    let customizer = Arc::new(MockCustomizer::default());
    let orchestrator = orchestrator(customizer.clone(), Arc::new(MemorySink::new()));

    for lpp_source in ["2099-01-01-0001-lpp_source", "garbage", ""] {
        let err = orchestrator
            .run(&CustRequest::new(lpp_source))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidBundle { .. }), "{lpp_source}");
    }
    assert!(customizer.calls().is_empty());
}

#[tokio::test]
async fn test_no_targets_resolved() {
    let customizer = Arc::new(MockCustomizer::default());
    let orchestrator = orchestrator(customizer.clone(), Arc::new(MemorySink::new()));

    let err = orchestrator
        .run(&CustRequest::new(LPP).with_targets("nomatch*"))
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::NoTargetsResolved { .. }));
    assert!(customizer.calls().is_empty());
}

#[tokio::test]
async fn test_inventory_unavailable() {
    let customizer = Arc::new(MockCustomizer::default());
    let orchestrator = Orchestrator::new(
        Arc::new(BrokenInventory),
        customizer.clone(),
        Arc::new(MemorySink::new()),
    );

    let err = orchestrator.run(&CustRequest::new(LPP)).await.unwrap_err();

    assert!(matches!(err, CoreError::InventoryUnavailable(_)));
    assert_eq!(err.step(), "inventory");
}

#[tokio::test]
async fn test_empty_inventory_is_not_unavailable() {
    let orchestrator = Orchestrator::new(
        Arc::new(StaticInventory::new(InventorySnapshot::new().with_lpp_source(LPP))),
        Arc::new(MockCustomizer::default()),
        Arc::new(MemorySink::new()),
    );

    let err = orchestrator.run(&CustRequest::new(LPP)).await.unwrap_err();
    assert!(matches!(err, CoreError::NoTargetsResolved { .. }));
}

#[tokio::test]
async fn test_dry_run_performs_no_invocation() {
    let customizer = Arc::new(MockCustomizer::default());
    let orchestrator = orchestrator(customizer.clone(), Arc::new(MemorySink::new()));

    let report = orchestrator
        .run(&CustRequest::new(LPP).with_dry_run(true))
        .await
        .unwrap();
    assert!(customizer.calls().is_empty());
    assert!(report.outcomes.iter().all(|o| o.skipped));
    assert!(report.outcomes[0].diagnostic.starts_with("dry run: mock"));

    let report = orchestrator
        .run(&CustRequest::new(LPP).with_mode(CustMode::Async).with_dry_run(true))
        .await
        .unwrap();
    assert!(customizer.calls().is_empty());
    assert_eq!(report.outcomes.len(), 1);
}

#[tokio::test]
async fn test_check_is_a_no_op() {
    let customizer = Arc::new(MockCustomizer::default());
    let orchestrator = orchestrator(customizer.clone(), Arc::new(MemorySink::new()));

    orchestrator.check(&CustRequest::new(LPP)).await.unwrap();
    assert!(customizer.calls().is_empty());
}

#[tokio::test]
async fn test_preview_targets_pairs_levels() {
    let orchestrator = orchestrator(
        Arc::new(MockCustomizer::default()),
        Arc::new(MemorySink::new()),
    );

    let preview = orchestrator.preview_targets(Some("host1,host4")).await.unwrap();
    assert_eq!(
        preview,
        vec![
            ("host1".to_string(), "2022-10-01-0001".to_string()),
            ("host4".to_string(), "2024-01-01-0001".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_nim_benign_stderr_with_failure_status_converges() {
    let executor = Arc::new(ReplayingExecutor {
        lines: vec![
            OutputLine::stdout("Filesets processed:  1 of 1"),
            OutputLine::stderr(
                "installp:  Either the software is already at the same level as on the media, or",
            ),
        ],
        status: 1,
        commands: Mutex::new(Vec::new()),
    });
    let customizer = Arc::new(NimCustomizer::new(executor.clone()));
    let sink = Arc::new(MemorySink::new());
    let orchestrator = orchestrator(customizer, sink.clone());

    let report = orchestrator
        .run(&CustRequest::new(LPP).with_targets("host1,host3"))
        .await
        .unwrap();

    assert_eq!(executor.commands.lock().unwrap().len(), 2);
    assert!(report.outcomes.iter().all(|o| o.success));
    assert!(
        sink.events()
            .iter()
            .any(|e| matches!(e, RunEvent::Progress { target, .. } if target == "host1"))
    );
}

#[tokio::test]
async fn test_nim_genuine_failure_stops_after_first_machine() {
    let executor = Arc::new(ReplayingExecutor {
        lines: vec![OutputLine::stderr("0042-006 nim: rcmd connection refused")],
        status: 1,
        commands: Mutex::new(Vec::new()),
    });
    let customizer = Arc::new(NimCustomizer::new(executor.clone()));
    let orchestrator = orchestrator(customizer, Arc::new(MemorySink::new()));

    let err = orchestrator.run(&CustRequest::new(LPP)).await.unwrap_err();

    let commands = executor.commands.lock().unwrap();
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].args.last().map(String::as_str), Some("host1"));
    assert!(matches!(
        err,
        CoreError::UpdateCommandFailed { ref diagnostic, .. } if diagnostic == "0042-006 nim: rcmd connection refused"
    ));
}
