// Local Crate Imports
use crate::{MassIndexError, Result, Scan, SpectralIndex};

// Public API ==========================================================================================================

impl Scan {
    pub fn new(
        scan_number: usize,
        precursor_mz: f64,
        mass_list: Option<SpectralIndex>,
    ) -> Self {
        Self {
            scan_number,
            precursor_mz,
            mass_list,
        }
    }

    #[must_use]
    pub const fn scan_number(&self) -> usize {
        self.scan_number
    }

    #[must_use]
    pub const fn precursor_mz(&self) -> f64 {
        self.precursor_mz
    }

    #[must_use]
    pub const fn has_mass_list(&self) -> bool {
        self.mass_list.is_some()
    }

    pub fn mass_list(&self) -> Result<&SpectralIndex> {
        self.mass_list
            .as_ref()
            .ok_or(MassIndexError::MissingMassList {
                scan_number: self.scan_number,
            })
    }

    /// The summed intensity of the scan, or zero if it was never mass-detected
    #[must_use]
    pub fn total_intensity(&self) -> f64 {
        self.mass_list
            .as_ref()
            .map_or(0.0, SpectralIndex::total_intensity)
    }
}

// Module Tests ========================================================================================================
