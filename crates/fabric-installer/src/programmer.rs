//! Rule programming seam.

use async_trait::async_trait;
use fabric_compiler::{DeviceId, FlowRule};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

use crate::error::{InstallError, InstallResult};

/// Something that accepts one rule at a time for a device.
#[async_trait]
pub trait RuleProgrammer: Send + Sync {
    /// Submits a rule. `Ok` means the controller accepted it.
    async fn program(&self, rule: &FlowRule) -> InstallResult<()>;
}

/// In-memory programmer that records what it was given.
///
/// Devices can be marked as rejecting, and every call can be delayed to
/// exercise timeouts and concurrency limits.
#[derive(Debug, Default)]
pub struct MockProgrammer {
    programmed: Mutex<Vec<FlowRule>>,
    rejected_devices: HashSet<DeviceId>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MockProgrammer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects every rule for `device` with HTTP 400.
    pub fn with_rejected_device(mut self, device: DeviceId) -> Self {
        self.rejected_devices.insert(device);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Accepted rules in completion order.
    pub async fn programmed(&self) -> Vec<FlowRule> {
        self.programmed.lock().await.clone()
    }

    /// Highest number of concurrent `program` calls seen.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RuleProgrammer for MockProgrammer {
    async fn program(&self, rule: &FlowRule) -> InstallResult<()> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let result = if self.rejected_devices.contains(&rule.device_id) {
            Err(InstallError::rejected(400, "device rejected flow"))
        } else {
            self.programmed.lock().await.push(rule.clone());
            Ok(())
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
