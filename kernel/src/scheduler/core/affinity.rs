//! Affinity - CPU affinity masks
//!
//! Controls which CPUs a task can run on

use core::fmt;

/// CPU identifier
pub type CpuId = usize;

/// Highest CPU index a mask can hold
pub const MAX_CPUS: usize = 64;

/// CPU affinity mask (64 CPUs max)
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CpuMask(u64);

impl CpuMask {
    /// Create empty mask
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Create mask allowing all CPUs
    pub const fn all() -> Self {
        Self(u64::MAX)
    }

    /// Create mask for single CPU; out-of-range CPUs give an empty mask
    pub const fn single(cpu: CpuId) -> Self {
        if cpu < MAX_CPUS {
            Self(1 << cpu)
        } else {
            Self(0)
        }
    }

    /// Mask of the first `n` CPUs
    pub const fn first_n(n: usize) -> Self {
        if n >= MAX_CPUS {
            Self::all()
        } else {
            Self((1u64 << n) - 1)
        }
    }

    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub const fn bits(&self) -> u64 {
        self.0
    }

    /// Build a mask from a CPU list
    pub fn from_cpus(cpus: &[CpuId]) -> Self {
        let mut mask = Self::empty();
        for &cpu in cpus {
            mask.set(cpu);
        }
        mask
    }

    /// Set CPU bit. CPUs beyond the mask width are ignored.
    pub fn set(&mut self, cpu: CpuId) {
        self.0 |= Self::single(cpu).0;
    }

    /// Clear CPU bit
    pub fn clear(&mut self, cpu: CpuId) {
        self.0 &= !Self::single(cpu).0;
    }

    /// Check if CPU is set. CPUs beyond the mask width are never set.
    pub fn is_set(&self, cpu: CpuId) -> bool {
        cpu < MAX_CPUS && (self.0 & (1 << cpu)) != 0
    }

    /// Count set CPUs
    pub fn count(&self) -> u32 {
        self.0.count_ones()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Get first set CPU
    pub fn first(&self) -> Option<CpuId> {
        if self.0 == 0 {
            None
        } else {
            Some(self.0.trailing_zeros() as CpuId)
        }
    }

    /// Intersect with another mask
    pub fn intersect(&self, other: &Self) -> Self {
        Self(self.0 & other.0)
    }

    /// Union with another mask
    pub fn union(&self, other: &Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Every CPU of `self` is also in `other`
    pub fn is_subset_of(&self, other: &Self) -> bool {
        self.0 & !other.0 == 0
    }

    /// Iterate set CPUs in ascending order
    pub fn iter(&self) -> impl Iterator<Item = CpuId> {
        let mut bits = self.0;
        core::iter::from_fn(move || {
            if bits == 0 {
                return None;
            }
            let cpu = bits.trailing_zeros() as CpuId;
            bits &= bits - 1;
            Some(cpu)
        })
    }

    /// Parse a CPU list such as `"0-1,4"`
    pub fn parse_list(list: &str) -> Result<Self, &'static str> {
        let mut mask = Self::empty();
        for part in list.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (lo, hi) = match part.split_once('-') {
                Some((lo, hi)) => (parse_cpu(lo)?, parse_cpu(hi)?),
                None => {
                    let cpu = parse_cpu(part)?;
                    (cpu, cpu)
                }
            };
            if lo > hi {
                return Err("CPU range is reversed");
            }
            for cpu in lo..=hi {
                mask.set(cpu);
            }
        }
        if mask.is_empty() {
            return Err("CPU list is empty");
        }
        Ok(mask)
    }
}

fn parse_cpu(s: &str) -> Result<CpuId, &'static str> {
    let cpu: CpuId = s.trim().parse().map_err(|_| "CPU index is not a number")?;
    if cpu >= MAX_CPUS {
        return Err("CPU index out of range");
    }
    Ok(cpu)
}

/// Formats as a CPU list (`0-1,4`), like `/sys/devices/system/cpu/online`
impl fmt::Display for CpuMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        let mut cpus = self.iter().peekable();
        while let Some(start) = cpus.next() {
            let mut end = start;
            while cpus.peek() == Some(&(end + 1)) {
                end += 1;
                cpus.next();
            }
            if !first {
                f.write_str(",")?;
            }
            first = false;
            if start == end {
                write!(f, "{}", start)?;
            } else {
                write!(f, "{}-{}", start, end)?;
            }
        }
        if first {
            f.write_str("none")?;
        }
        Ok(())
    }
}

impl fmt::Debug for CpuMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CpuMask({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subset_and_intersect() {
        let fast = CpuMask::from_cpus(&[0, 1]);
        assert!(fast.is_subset_of(&CpuMask::all()));
        assert!(!CpuMask::all().is_subset_of(&fast));
        assert!(CpuMask::empty().is_subset_of(&fast));
        assert_eq!(fast.intersect(&CpuMask::single(1)), CpuMask::single(1));
        assert_eq!(fast.count(), 2);
        assert!(!fast.is_set(2));
        assert!(!CpuMask::all().is_set(64));
    }

    #[test]
    fn test_out_of_range_cpus_are_ignored() {
        assert_eq!(CpuMask::single(64), CpuMask::empty());
        assert_eq!(CpuMask::from_cpus(&[64, 200]), CpuMask::empty());
        assert_eq!(CpuMask::from_cpus(&[0, 64]), CpuMask::single(0));

        let mut mask = CpuMask::single(63);
        mask.clear(127);
        assert!(mask.is_set(63));
        assert!(!mask.is_set(0));
    }

    #[test]
    fn test_parse_and_display_list() {
        let mask = CpuMask::parse_list("0-1, 4,6-7").unwrap();
        assert_eq!(mask.iter().collect::<std::vec::Vec<_>>(), [0, 1, 4, 6, 7]);
        assert_eq!(mask.to_string(), "0-1,4,6-7");
        assert_eq!(CpuMask::empty().to_string(), "none");
        assert_eq!(CpuMask::first_n(4).to_string(), "0-3");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(CpuMask::parse_list("").is_err());
        assert!(CpuMask::parse_list("3-1").is_err());
        assert!(CpuMask::parse_list("64").is_err());
        assert!(CpuMask::parse_list("a").is_err());
    }
}
