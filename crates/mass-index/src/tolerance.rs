// Standard Library Imports
use std::{
    fmt::{self, Display, Formatter},
    ops::RangeInclusive,
};

// External Crate Imports
use mzdata::mzpeaks::Tolerance;

// Local Crate Imports
use crate::{MassIndexError, MzTolerance, Result};

// Public API ==========================================================================================================

impl MzTolerance {
    #[must_use]
    pub const fn new(mz: f64, ppm: f64) -> Self {
        Self { mz, ppm }
    }

    pub fn try_new(mz: f64, ppm: f64) -> Result<Self> {
        let valid = |x: f64| x.is_finite() && x >= 0.0;
        if valid(mz) && valid(ppm) {
            Ok(Self::new(mz, ppm))
        } else {
            Err(MassIndexError::InvalidTolerance { mz, ppm })
        }
    }

    #[must_use]
    pub const fn absolute(mz: f64) -> Self {
        Self::new(mz, 0.0)
    }

    #[must_use]
    pub const fn ppm(ppm: f64) -> Self {
        Self::new(0.0, ppm)
    }

    #[must_use]
    pub const fn mz_component(&self) -> f64 {
        self.mz
    }

    #[must_use]
    pub const fn ppm_component(&self) -> f64 {
        self.ppm
    }

    /// Whichever of the absolute and relative tolerances gives the wider window at `mz`
    #[must_use]
    pub fn tolerance_at(&self, mz: f64) -> Tolerance {
        let width = |tolerance: &Tolerance| {
            let (min_mz, max_mz) = tolerance.bounds(mz);
            max_mz - min_mz
        };
        let absolute = Tolerance::Da(self.mz);
        let relative = Tolerance::PPM(self.ppm);
        if width(&relative) > width(&absolute) {
            relative
        } else {
            absolute
        }
    }

    /// The half-width of the window centred on `mz`
    #[must_use]
    pub fn half_width(&self, mz: f64) -> f64 {
        let (min_mz, max_mz) = self.bounds(mz);
        (max_mz - min_mz) / 2.0
    }

    #[must_use]
    pub fn bounds(&self, mz: f64) -> (f64, f64) {
        self.tolerance_at(mz).bounds(mz)
    }

    #[must_use]
    pub fn range(&self, mz: f64) -> RangeInclusive<f64> {
        let (min_mz, max_mz) = self.bounds(mz);
        min_mz..=max_mz
    }

    /// Is `observed` within the window centred on `reference`?
    #[must_use]
    pub fn matches(&self, reference: f64, observed: f64) -> bool {
        self.range(reference).contains(&observed)
    }
}

impl Display for MzTolerance {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} m/z or {} ppm", self.mz, self.ppm)
    }
}

impl Default for MzTolerance {
    fn default() -> Self {
        Self::new(0.005, 10.0)
    }
}

// Module Tests ========================================================================================================
