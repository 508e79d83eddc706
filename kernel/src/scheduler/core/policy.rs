//! Scheduling classes
//!
//! - Fair: the host's proportional-share class (default for every task)
//! - Fast: simplified round-robin class restricted to the fast CPU set

use core::fmt;

/// Scheduling class of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum SchedClass {
    /// Fair-share class, owned by the host scheduler
    #[default]
    Fair = 0,
    /// Round-robin fast class
    Fast = 1,
}

impl SchedClass {
    /// Create from raw value
    pub fn from_raw(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Fair),
            1 => Some(Self::Fast),
            _ => None,
        }
    }

    pub fn is_fast(&self) -> bool {
        matches!(self, Self::Fast)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Fair => "fair",
            Self::Fast => "fast",
        }
    }
}

impl fmt::Display for SchedClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
