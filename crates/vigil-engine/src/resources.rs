//! Best-effort resource readings for the current process.
//!
//! Readings come from `sysinfo`. When the platform or process cannot be
//! inspected the values degrade to `None`.

use sysinfo::{Pid, System, get_current_pid};
use tracing::debug;

/// Memory and CPU usage sampled once.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResourceUsage {
    /// Resident memory in bytes.
    pub memory_bytes: Option<u64>,
    /// CPU usage in percent since the previous refresh.
    pub cpu_percent: Option<f32>,
}

/// Samples resource usage of the running process.
pub struct ResourceSampler {
    system: System,
    pid: Option<Pid>,
}

impl ResourceSampler {
    /// Creates a sampler for the current process.
    pub fn new() -> Self {
        let pid = match get_current_pid() {
            Ok(pid) => Some(pid),
            Err(reason) => {
                debug!(reason, "Current process cannot be inspected");
                None
            }
        };
        Self {
            system: System::new(),
            pid,
        }
    }

    /// Takes one reading.
    pub fn sample(&mut self) -> ResourceUsage {
        let Some(pid) = self.pid else {
            return ResourceUsage::default();
        };
        if !self.system.refresh_process(pid) {
            return ResourceUsage::default();
        }
        self.system
            .process(pid)
            .map_or_else(ResourceUsage::default, |process| ResourceUsage {
                memory_bytes: Some(process.memory()),
                cpu_percent: Some(process.cpu_usage()),
            })
    }
}

impl Default for ResourceSampler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_is_best_effort() {
        let usage = ResourceSampler::new().sample();
        if let Some(memory) = usage.memory_bytes {
            assert!(memory > 0);
        }
        if let Some(cpu) = usage.cpu_percent {
            assert!(cpu >= 0.0);
        }
    }
}
