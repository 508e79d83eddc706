//! Hybrid scheduler configuration
//!
//! Startup constants only: the coordinator copies the configuration at
//! construction and never re-reads it.

use alloc::format;
use alloc::string::String;

use crate::scheduler::core::{CpuMask, HybridError, SchedResult};
use crate::time::Duration;

/// CPUs reserved for the fast class (CPU 0 and 1)
pub const DEFAULT_FAST_CPUS: CpuMask = CpuMask::from_bits(0x3);

/// Largest accepted journal capacity
pub const MAX_JOURNAL_CAPACITY: usize = 65_536;

/// Largest accepted fast runqueue pre-allocation
pub const MAX_QUEUE_CAPACITY: usize = 4_096;

/// Largest accepted fair-pick skip bound
pub const MAX_FAIR_SKIP_LIMIT: usize = 4_096;

/// Fast-class budget before automatic demotion
pub const DEFAULT_TIMEOUT: Duration = Duration::from_mins(15);

/// Transition journal capacity
pub const DEFAULT_JOURNAL_CAPACITY: usize = 128;

/// Fast tasks the coordinator skips per fair-class pick before giving up
pub const DEFAULT_FAIR_SKIP_LIMIT: usize = 32;

/// Fast runqueue pre-allocation
pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

/// Command line key prefix
const CMDLINE_PREFIX: &str = "hybrid.";

/// Hybrid scheduler configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HybridConfig {
    /// CPUs fast-class tasks are restricted to
    pub fast_cpus: CpuMask,

    /// CPUs a fair task may use by default ("all CPUs")
    pub online_cpus: CpuMask,

    /// Time a task may stay in the fast class
    pub timeout: Duration,

    /// Transition journal capacity (oldest entries dropped first)
    pub journal_capacity: usize,

    /// Bound on fast tasks skipped in one fair-class pick
    pub fair_skip_limit: usize,

    /// Fast runqueue pre-allocation
    pub queue_capacity: usize,
}

impl HybridConfig {
    /// Create default configuration
    pub const fn new() -> Self {
        Self {
            fast_cpus: DEFAULT_FAST_CPUS,
            online_cpus: CpuMask::all(),
            timeout: DEFAULT_TIMEOUT,
            journal_capacity: DEFAULT_JOURNAL_CAPACITY,
            fair_skip_limit: DEFAULT_FAIR_SKIP_LIMIT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    pub const fn with_fast_cpus(mut self, cpus: CpuMask) -> Self {
        self.fast_cpus = cpus;
        self
    }

    pub const fn with_online_cpus(mut self, cpus: CpuMask) -> Self {
        self.online_cpus = cpus;
        self
    }

    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub const fn with_journal_capacity(mut self, capacity: usize) -> Self {
        self.journal_capacity = capacity;
        self
    }

    /// Validate parameters
    pub fn validate(&self) -> SchedResult<()> {
        let invalid = |reason| Err(HybridError::InvalidConfig { reason });
        if self.fast_cpus.is_empty() {
            return invalid("fast CPU set is empty");
        }
        if !self.fast_cpus.is_subset_of(&self.online_cpus) {
            return invalid("fast CPU set must be a subset of the online CPUs");
        }
        if self.timeout.is_zero() {
            return invalid("fast-class timeout must be non-zero");
        }
        if self.journal_capacity == 0 {
            return invalid("journal capacity must be non-zero");
        }
        if self.journal_capacity > MAX_JOURNAL_CAPACITY {
            return invalid("journal capacity above MAX_JOURNAL_CAPACITY");
        }
        if self.fair_skip_limit == 0 {
            return invalid("fair skip limit must be non-zero");
        }
        if self.fair_skip_limit > MAX_FAIR_SKIP_LIMIT {
            return invalid("fair skip limit above MAX_FAIR_SKIP_LIMIT");
        }
        if self.queue_capacity > MAX_QUEUE_CAPACITY {
            return invalid("runqueue capacity above MAX_QUEUE_CAPACITY");
        }
        Ok(())
    }

    /// Load configuration from kernel parameters
    ///
    /// Example: `hybrid.fast_cpus=0-1 hybrid.timeout_s=900 hybrid.journal=256`.
    /// Tokens without the `hybrid.` prefix are ignored, unknown `hybrid.`
    /// keys are logged and ignored, malformed values are rejected. The
    /// result is validated before it is returned.
    pub fn load_from_cmdline(mut self, cmdline: &str) -> SchedResult<Self> {
        log::debug!("[HYBRID] Loading config from command line");
        for token in cmdline.split_whitespace() {
            let Some(param) = token.strip_prefix(CMDLINE_PREFIX) else {
                continue;
            };
            let Some((key, value)) = param.split_once('=') else {
                log::warn!("[HYBRID] Ignoring parameter without value: {}", token);
                continue;
            };
            match key {
                "fast_cpus" => self.fast_cpus = parse_mask(value)?,
                "online_cpus" => self.online_cpus = parse_mask(value)?,
                "timeout_s" => self.timeout = Duration::from_secs(parse_num(value)?),
                "timeout_min" => self.timeout = Duration::from_mins(parse_num(value)?),
                "journal" => self.journal_capacity = parse_count(value)?,
                "fair_skip_limit" => self.fair_skip_limit = parse_count(value)?,
                "queue_capacity" => self.queue_capacity = parse_count(value)?,
                _ => log::warn!("[HYBRID] Unknown parameter: {}", token),
            }
        }
        self.validate()?;
        Ok(self)
    }

    /// Export configuration as string
    pub fn export_config(&self) -> String {
        format!(
            "fast_cpus={}, online_cpus={}, timeout={}, journal={}, fair_skip_limit={}, queue_capacity={}",
            self.fast_cpus,
            self.online_cpus,
            self.timeout,
            self.journal_capacity,
            self.fair_skip_limit,
            self.queue_capacity
        )
    }
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_mask(value: &str) -> SchedResult<CpuMask> {
    CpuMask::parse_list(value).map_err(|reason| HybridError::InvalidConfig { reason })
}

fn parse_num(value: &str) -> SchedResult<u64> {
    value.parse().map_err(|_| HybridError::InvalidConfig {
        reason: "numeric parameter expected",
    })
}

fn parse_count(value: &str) -> SchedResult<usize> {
    usize::try_from(parse_num(value)?).map_err(|_| HybridError::InvalidConfig {
        reason: "count does not fit the address width",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = HybridConfig::default();
        assert_eq!(cfg.fast_cpus, CpuMask::from_cpus(&[0, 1]));
        assert_eq!(cfg.timeout, Duration::from_mins(15));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_cmdline_overrides() {
        let cfg = HybridConfig::new()
            .load_from_cmdline("root=/dev/vda hybrid.fast_cpus=2-3 hybrid.timeout_min=5 hybrid.journal=8 quiet")
            .unwrap();
        assert_eq!(cfg.fast_cpus, CpuMask::from_cpus(&[2, 3]));
        assert_eq!(cfg.timeout, Duration::from_secs(300));
        assert_eq!(cfg.journal_capacity, 8);
    }

    #[test]
    fn test_cmdline_rejects_bad_values() {
        assert!(matches!(
            HybridConfig::new().load_from_cmdline("hybrid.timeout_s=soon"),
            Err(HybridError::InvalidConfig { .. })
        ));
        assert!(HybridConfig::new().load_from_cmdline("hybrid.timeout_s=0").is_err());
        assert!(HybridConfig::new()
            .load_from_cmdline("hybrid.online_cpus=0-3 hybrid.fast_cpus=4")
            .is_err());
    }

    #[test]
    fn test_cmdline_rejects_oversized_counts() {
        for param in [
            "hybrid.queue_capacity=18446744073709551615",
            "hybrid.journal=18446744073709551615",
            "hybrid.fair_skip_limit=1000000",
            "hybrid.queue_capacity=4097",
        ] {
            assert!(
                matches!(
                    HybridConfig::new().load_from_cmdline(param),
                    Err(HybridError::InvalidConfig { .. })
                ),
                "{} accepted",
                param
            );
        }
        let cfg = HybridConfig::new()
            .load_from_cmdline("hybrid.queue_capacity=4096 hybrid.journal=65536")
            .unwrap();
        assert_eq!(cfg.queue_capacity, MAX_QUEUE_CAPACITY);
        assert_eq!(cfg.journal_capacity, MAX_JOURNAL_CAPACITY);
    }

    #[test]
    fn test_export_config() {
        let cfg = HybridConfig::new().with_online_cpus(CpuMask::first_n(4));
        assert_eq!(
            cfg.export_config(),
            "fast_cpus=0-1, online_cpus=0-3, timeout=15min, journal=128, fair_skip_limit=32, queue_capacity=16"
        );
    }
}
