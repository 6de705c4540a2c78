//! Job-wide resource-limit aggregation
//!
//! The target scheduler allocates resources at job granularity, so one
//! pod gets one CPU/memory ceiling sized to its most demanding container.
//! Containers that declare no limit fall back to a default floor, and the
//! aggregate remembers whether either ceiling came from that fallback so
//! the warning can surface downstream.
//!
//! The aggregator is pure data in, pure data out: it records default-usage
//! events instead of logging them, leaving the decision to warn to the
//! orchestrator.

use crate::models::{ContainerSpec, ResourceLimits};

/// CPU floor applied when no container declares a limit
pub const DEFAULT_CPU_CORES: i64 = 1;

/// Memory floor applied when no container declares a limit (1 MiB)
pub const DEFAULT_MEMORY_BYTES: i64 = 1024 * 1024;

/// Which resource a default floor was applied to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    Cpu,
    Memory,
}

impl std::fmt::Display for LimitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LimitKind::Cpu => f.write_str("cpu"),
            LimitKind::Memory => f.write_str("memory"),
        }
    }
}

/// One default-floor application, naming the container that triggered it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultApplied {
    pub container: String,
    pub resource: LimitKind,
}

/// Reduces per-container limits into one job-wide ceiling.
///
/// Containers must be observed in pod order (init containers first); the
/// final ceilings are invariant under reordering, but the recorded
/// default-usage events are not.
#[derive(Debug, Default)]
pub struct LimitAggregator {
    cpu: i64,
    memory: i64,
    cpu_declared: bool,
    memory_declared: bool,
    cpu_defaulted: bool,
    memory_defaulted: bool,
    events: Vec<DefaultApplied>,
}

impl LimitAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one container's declared limits into the running ceiling.
    ///
    /// A limit of exactly zero means "undeclared". Fractional CPU limits
    /// round up to whole cores. A declared value that merely equals the
    /// established default floor does not clear the default flag; only a
    /// value strictly above the running ceiling does.
    pub fn observe(&mut self, container: &ContainerSpec) {
        let cpu = container.resources.limits.cpu.ceil() as i64;
        if cpu == 0 && !self.cpu_declared {
            self.cpu = self.cpu.max(DEFAULT_CPU_CORES);
            self.cpu_defaulted = true;
            self.events.push(DefaultApplied {
                container: container.name.clone(),
                resource: LimitKind::Cpu,
            });
        } else if cpu > self.cpu {
            self.cpu = cpu;
            self.cpu_declared = true;
            self.cpu_defaulted = false;
        }

        let memory = container.resources.limits.memory;
        if memory == 0 && !self.memory_declared {
            self.memory = self.memory.max(DEFAULT_MEMORY_BYTES);
            self.memory_defaulted = true;
            self.events.push(DefaultApplied {
                container: container.name.clone(),
                resource: LimitKind::Memory,
            });
        } else if memory > self.memory {
            self.memory = memory;
            self.memory_declared = true;
            self.memory_defaulted = false;
        }
    }

    /// Final ceiling plus the ordered default-usage events
    pub fn finish(self) -> (ResourceLimits, Vec<DefaultApplied>) {
        (
            ResourceLimits {
                cpu: self.cpu,
                memory_bytes: self.memory,
                cpu_defaulted: self.cpu_defaulted,
                memory_defaulted: self.memory_defaulted,
            },
            self.events,
        )
    }
}
