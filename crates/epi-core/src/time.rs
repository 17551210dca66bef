//! Simulation time.
//!
//! Time is a monotonically increasing integer `Tick`.  One tick is one day in
//! the bundled demo, but nothing in the toolkit assumes a particular
//! resolution; schedule arithmetic stays exact because it is integral.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An absolute simulation tick counter.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default, Serialize, Deserialize)]
pub struct Tick(pub u64);

/// Days per simulated year when one tick is one day.
pub const DAYS_PER_YEAR: u64 = 365;

impl Tick {
    pub const ZERO: Tick = Tick(0);

    /// First tick of simulated year `year` at day resolution.
    #[inline]
    pub fn from_years(year: u64) -> Tick {
        Tick(year * DAYS_PER_YEAR)
    }

    /// Whole simulated years elapsed at day resolution.
    #[inline]
    pub fn whole_years(self) -> u64 {
        self.0 / DAYS_PER_YEAR
    }

    /// Return the tick `n` steps after `self`.
    #[inline]
    pub fn offset(self, n: u64) -> Tick {
        Tick(self.0 + n)
    }

    /// Ticks elapsed from `earlier` to `self`.
    ///
    /// # Panics
    /// Panics in debug mode if `earlier > self`.
    #[inline]
    pub fn since(self, earlier: Tick) -> u64 {
        self.0 - earlier.0
    }
}

impl std::ops::Add<u64> for Tick {
    type Output = Tick;
    #[inline]
    fn add(self, rhs: u64) -> Tick {
        Tick(self.0 + rhs)
    }
}

impl std::ops::Sub for Tick {
    type Output = u64;
    #[inline]
    fn sub(self, rhs: Tick) -> u64 {
        self.0 - rhs.0
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}
