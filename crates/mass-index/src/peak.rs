// External Crate Imports
use mzdata::mzpeaks::CentroidPeak;

// Local Crate Imports
use crate::Peak;

// Public API ==========================================================================================================

impl Peak {
    #[must_use]
    pub fn is_above(&self, min_height: f64) -> bool {
        self.intensity >= min_height
    }
}

impl From<&CentroidPeak> for Peak {
    fn from(peak: &CentroidPeak) -> Self {
        Self::new(peak.mz, f64::from(peak.intensity))
    }
}

impl From<Peak> for CentroidPeak {
    #[expect(clippy::cast_possible_truncation)]
    fn from(Peak { mz, intensity }: Peak) -> Self {
        // NOTE: The index is reassigned once the peak is sorted into a peak set
        Self::new(mz, intensity as f32, 0)
    }
}

// Module Tests ========================================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peak_is_above() {
        let peak = Peak::new(377.2, 1_000.0);
        assert!(peak.is_above(999.9));
        assert!(peak.is_above(1_000.0));
        assert!(!peak.is_above(1_000.1));
    }

    #[test]
    fn peak_from_pair() {
        let peak: Peak = (755.4, 12.0).into();
        assert_eq!(peak, Peak::new(755.4, 12.0));
    }

    #[test]
    fn centroid_round_trip_keeps_mz() {
        let centroid = CentroidPeak::from(Peak::new(755.4, 12.0));
        assert_eq!(centroid.mz, 755.4);
        assert_eq!(Peak::from(&centroid), Peak::new(755.4, 12.0));
    }
}
