//! Bounded, best-effort bulk installation.
//!
//! Rules go out in two phases. Pipeline entries (ingress classifiers and
//! ARP punts) are submitted first and all of them finish before any
//! forwarding rule is sent, so no forwarding entry is live on a device
//! whose classifier is still missing.

use fabric_compiler::FlowRule;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{InstallError, InstallResult};
use crate::programmer::RuleProgrammer;

/// Default number of requests in flight.
pub const DEFAULT_CONCURRENCY: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    PipelineEntry,
    Forwarding,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::PipelineEntry => write!(f, "pipeline-entry"),
            Phase::Forwarding => write!(f, "forwarding"),
        }
    }
}

/// Result of submitting one rule.
#[derive(Debug)]
pub struct RuleOutcome {
    pub rule: FlowRule,
    pub result: InstallResult<()>,
}

impl RuleOutcome {
    pub fn is_accepted(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-rule outcomes, in the order the rules were given.
#[derive(Debug, Default)]
pub struct InstallReport {
    pub outcomes: Vec<RuleOutcome>,
}

impl InstallReport {
    pub fn accepted(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_accepted()).count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &RuleOutcome> {
        self.outcomes.iter().filter(|o| !o.is_accepted())
    }

    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(RuleOutcome::is_accepted)
    }
}

pub struct Installer {
    programmer: Arc<dyn RuleProgrammer>,
    concurrency: usize,
    request_timeout: Duration,
}

impl Installer {
    pub fn new(programmer: Arc<dyn RuleProgrammer>) -> Self {
        Self {
            programmer,
            concurrency: DEFAULT_CONCURRENCY,
            request_timeout: Duration::from_secs(5),
        }
    }

    /// Sets the in-flight request limit (at least one).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Submits every rule. A failed rule is logged and reported; it does
    /// not stop the others.
    #[instrument(skip_all, fields(rules = rules.len(), concurrency = self.concurrency))]
    pub async fn install(&self, rules: &[FlowRule]) -> InstallReport {
        let (entries, forwarding): (Vec<usize>, Vec<usize>) =
            (0..rules.len()).partition(|&i| rules[i].is_pipeline_entry());

        let mut results: Vec<Option<InstallResult<()>>> =
            std::iter::repeat_with(|| None).take(rules.len()).collect();

        self.run_phase(Phase::PipelineEntry, rules, &entries, &mut results)
            .await;
        self.run_phase(Phase::Forwarding, rules, &forwarding, &mut results)
            .await;

        let outcomes: Vec<RuleOutcome> = rules
            .iter()
            .zip(results)
            .map(|(rule, result)| RuleOutcome {
                rule: rule.clone(),
                result: result.unwrap_or_else(|| {
                    Err(InstallError::Aborted("no result recorded".to_string()))
                }),
            })
            .collect();
        let report = InstallReport { outcomes };

        info!(
            accepted = report.accepted(),
            failed = report.outcomes.len() - report.accepted(),
            "Installation finished"
        );
        report
    }

    async fn run_phase(
        &self,
        phase: Phase,
        rules: &[FlowRule],
        indices: &[usize],
        results: &mut [Option<InstallResult<()>>],
    ) {
        debug!(%phase, rules = indices.len(), "Starting phase");

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for &index in indices {
            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                error!(%phase, "Submission limiter closed");
                break;
            };
            let programmer = Arc::clone(&self.programmer);
            let rule = rules[index].clone();
            let timeout = self.request_timeout;

            tasks.spawn(async move {
                let _permit = permit;
                let result = match tokio::time::timeout(timeout, programmer.program(&rule)).await
                {
                    Ok(result) => result,
                    Err(_) => Err(InstallError::Timeout(timeout)),
                };
                (index, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => {
                    let rule = &rules[index];
                    match &result {
                        Ok(()) => debug!(
                            device = %rule.device_id,
                            table = rule.table,
                            priority = rule.priority,
                            "Rule installed"
                        ),
                        Err(e) => warn!(
                            device = %rule.device_id,
                            table = rule.table,
                            rule = %rule.match_summary(),
                            "Rule not installed: {}",
                            e
                        ),
                    }
                    results[index] = Some(result);
                }
                Err(e) => error!(%phase, "Submission task failed: {}", e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::programmer::MockProgrammer;
    use fabric_compiler::{Criterion, DeviceId, Instruction, OutputPort};
    use fabric_types::{EtherType, MacAddress, PortNumber, VlanId};
    use pretty_assertions::assert_eq;

    fn port(n: u32) -> PortNumber {
        PortNumber::new(n).unwrap()
    }

    fn classifier(device: &str, p: u32) -> FlowRule {
        FlowRule::new(DeviceId::new(device), 0)
            .with_priority(40100)
            .with_criterion(Criterion::InPort(port(p)))
            .with_instruction(Instruction::VlanPush)
            .with_instruction(Instruction::SetVlan(VlanId::new(10).unwrap()))
            .with_instruction(Instruction::GotoTable(1))
    }

    fn punt(device: &str) -> FlowRule {
        FlowRule::new(DeviceId::new(device), 0)
            .with_priority(42000)
            .with_criterion(Criterion::EthType(EtherType::ARP))
            .with_instruction(Instruction::Output(OutputPort::Controller))
    }

    fn forward(device: &str, last_octet: u8, out: u32) -> FlowRule {
        FlowRule::new(DeviceId::new(device), 0)
            .with_priority(40000)
            .with_criterion(Criterion::EthDst(MacAddress::new([0, 0, 0, 0, 1, last_octet])))
            .with_instruction(Instruction::Output(OutputPort::Port(port(out))))
    }

    fn mixed_rules() -> Vec<FlowRule> {
        vec![
            forward("of:0000000000000001", 1, 2),
            classifier("of:0000000000000003", 2),
            forward("of:0000000000000001", 2, 3),
            punt("of:0000000000000001"),
            forward("of:0000000000000004", 2, 2),
            classifier("of:0000000000000004", 2),
        ]
    }

    #[tokio::test]
    async fn test_all_rules_accepted() {
        let mock = Arc::new(MockProgrammer::new());
        let installer = Installer::new(mock.clone());
        let rules = mixed_rules();

        let report = installer.install(&rules).await;

        assert!(report.is_success());
        assert_eq!(report.accepted(), 6);
        let reported: Vec<FlowRule> = report.outcomes.iter().map(|o| o.rule.clone()).collect();
        assert_eq!(reported, rules);
        assert_eq!(mock.programmed().await.len(), 6);
    }

    #[tokio::test]
    async fn test_pipeline_entries_complete_first() {
        let mock = Arc::new(MockProgrammer::new().with_delay(Duration::from_millis(5)));
        let installer = Installer::new(mock.clone()).with_concurrency(4);

        installer.install(&mixed_rules()).await;

        let order: Vec<bool> = mock
            .programmed()
            .await
            .iter()
            .map(FlowRule::is_pipeline_entry)
            .collect();
        assert_eq!(order, vec![true, true, true, false, false, false]);
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_others() {
        let mock = Arc::new(
            MockProgrammer::new().with_rejected_device(DeviceId::new("of:0000000000000004")),
        );
        let installer = Installer::new(mock.clone());

        let report = installer.install(&mixed_rules()).await;

        assert!(!report.is_success());
        assert_eq!(report.accepted(), 4);
        let failed: Vec<&str> = report
            .failed()
            .map(|o| o.rule.device_id.as_str())
            .collect();
        assert_eq!(failed, vec!["of:0000000000000004", "of:0000000000000004"]);
        assert!(matches!(
            report.failed().next().unwrap().result,
            Err(InstallError::Rejected { status: 400, .. })
        ));
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let mock = Arc::new(MockProgrammer::new().with_delay(Duration::from_millis(10)));
        let installer = Installer::new(mock.clone()).with_concurrency(2);
        let rules: Vec<FlowRule> = (1..=8)
            .map(|i| forward("of:0000000000000001", i, 2))
            .collect();

        let report = installer.install(&rules).await;

        assert!(report.is_success());
        assert!(mock.peak_in_flight() <= 2);
    }

    #[tokio::test]
    async fn test_timeout_fails_only_that_rule() {
        let mock = Arc::new(MockProgrammer::new().with_delay(Duration::from_millis(200)));
        let installer = Installer::new(mock)
            .with_request_timeout(Duration::from_millis(10));

        let report = installer.install(&[punt("of:0000000000000001")]).await;

        assert_eq!(report.accepted(), 0);
        assert!(matches!(
            report.outcomes[0].result,
            Err(InstallError::Timeout(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_rule_set() {
        let installer = Installer::new(Arc::new(MockProgrammer::new()));
        let report = installer.install(&[]).await;
        assert!(report.is_success());
        assert_eq!(report.accepted(), 0);
    }
}
