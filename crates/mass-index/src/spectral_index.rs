// Standard Library Imports
use std::fmt::{self, Debug, Formatter};

// External Crate Imports
use mzdata::mzpeaks::{CentroidPeak, MZPeakSetType, PeakCollection};

// Local Crate Imports
use crate::{MzTolerance, Peak, SpectralIndex};

// Public API ==========================================================================================================

impl SpectralIndex {
    pub fn new(peaks: impl IntoIterator<Item = impl Into<Peak>>) -> Self {
        let peaks = peaks
            .into_iter()
            .map(|peak| {
                let peak: Peak = peak.into();
                CentroidPeak::from(peak)
            })
            .collect();
        Self(MZPeakSetType::new(peaks))
    }

    #[must_use]
    pub const fn peaks(&self) -> &MZPeakSetType<CentroidPeak> {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &CentroidPeak> {
        self.0.iter()
    }

    /// Every peak of the scan that is at least `min_height` tall, in m/z order
    pub fn peaks_above(&self, min_height: f64) -> impl Iterator<Item = &CentroidPeak> {
        self.iter().filter(move |&peak| is_above(peak, min_height))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    /// The index of the first peak whose m/z is not less than `mz`
    #[must_use]
    pub fn insertion_point(&self, mz: f64) -> usize {
        self.as_slice().partition_point(|peak| peak.mz < mz)
    }

    /// Every peak (regardless of intensity) within `tolerance` of `mz`
    #[must_use]
    pub fn window(&self, mz: f64, tolerance: MzTolerance) -> &[CentroidPeak] {
        // NOTE: The peak set's binary search can't order a `NaN` query
        if !mz.is_finite() || self.is_empty() {
            return &[];
        }

        let (min_mz, max_mz) = tolerance.bounds(mz);
        let candidates = self.0.all_peaks_for(mz, tolerance.tolerance_at(mz));
        // NOTE: `all_peaks_for()` can pad its result with a neighbouring peak at either edge
        let start = candidates.partition_point(|peak| peak.mz < min_mz);
        let end = candidates.partition_point(|peak| peak.mz <= max_mz);
        if start < end { &candidates[start..end] } else { &[] }
    }

    pub fn find_peaks(
        &self,
        mz: f64,
        tolerance: MzTolerance,
        min_height: f64,
    ) -> impl Iterator<Item = &CentroidPeak> {
        self.window(mz, tolerance)
            .iter()
            .filter(move |&peak| is_above(peak, min_height))
    }

    /// The closest peak to `mz` that is within `tolerance` and at least `min_height` tall. Equidistant peaks resolve
    /// to the one with the lower m/z.
    #[must_use]
    pub fn nearest(&self, mz: f64, tolerance: MzTolerance, min_height: f64) -> Option<&CentroidPeak> {
        self.find_peaks(mz, tolerance, min_height)
            .min_by(|a, b| (a.mz - mz).abs().total_cmp(&(b.mz - mz).abs()))
    }

    /// The most intense peak of the scan
    #[must_use]
    pub fn base_peak(&self) -> Option<Peak> {
        self.iter()
            .max_by(|a, b| a.intensity.total_cmp(&b.intensity))
            .map(Peak::from)
    }

    #[must_use]
    pub fn total_intensity(&self) -> f64 {
        self.iter().map(|peak| f64::from(peak.intensity)).sum()
    }
}

impl Default for SpectralIndex {
    fn default() -> Self {
        Self(MZPeakSetType::new(Vec::new()))
    }
}

impl PartialEq for SpectralIndex {
    fn eq(&self, other: &Self) -> bool {
        self.iter().map(Peak::from).eq(other.iter().map(Peak::from))
    }
}

impl Debug for SpectralIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter().map(Peak::from)).finish()
    }
}

impl<P: Into<Peak>> FromIterator<P> for SpectralIndex {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        Self::new(iter)
    }
}

// Private Methods =====================================================================================================

impl SpectralIndex {
    fn as_slice(&self) -> &[CentroidPeak] {
        self.0.get_slice(0..self.0.len())
    }
}

fn is_above(peak: &CentroidPeak, min_height: f64) -> bool {
    f64::from(peak.intensity) >= min_height
}

// Module Tests ========================================================================================================

#[cfg(test)]
mod tests {
    use assert_float_eq::assert_float_absolute_eq;

    use super::*;

    fn index() -> SpectralIndex {
        [
            (377.700_4, 80.0),
            (120.081, 5_000.0),
            (377.697, 900.0),
            (755.4, 2_000.0),
            (359.687, 40.0),
        ]
        .into_iter()
        .collect()
    }

    fn mzs<'p>(peaks: impl IntoIterator<Item = &'p CentroidPeak>) -> Vec<f64> {
        peaks.into_iter().map(|peak| peak.mz).collect()
    }

    #[test]
    fn new_sorts_by_mz() {
        let index = index();
        assert_eq!(index.len(), 5);
        assert_eq!(mzs(index.iter()), vec![120.081, 359.687, 377.697, 377.700_4, 755.4]);
        assert!(SpectralIndex::default().is_empty());
    }

    #[test]
    fn insertion_point() {
        let index = index();
        assert_eq!(index.insertion_point(0.0), 0);
        assert_eq!(index.insertion_point(120.081), 0);
        assert_eq!(index.insertion_point(377.698), 3);
        assert_eq!(index.insertion_point(1_000.0), 5);
    }

    #[test]
    fn window() {
        let index = index();
        let window = |mz, tolerance| mzs(index.window(mz, tolerance));
        assert_eq!(window(377.7, MzTolerance::absolute(0.0)), Vec::<f64>::new());
        assert_eq!(window(377.7, MzTolerance::absolute(0.001)), vec![377.700_4]);
        assert_eq!(
            window(377.7, MzTolerance::new(0.005, 10.0)),
            vec![377.697, 377.700_4]
        );
        assert_eq!(window(355.0, MzTolerance::absolute(1.0)), Vec::<f64>::new());
        assert_eq!(window(100.0, MzTolerance::absolute(1.0)), Vec::<f64>::new());
        assert_eq!(window(900.0, MzTolerance::absolute(1.0)), Vec::<f64>::new());
        assert_eq!(window(f64::NAN, MzTolerance::default()), Vec::<f64>::new());
        assert_eq!(
            mzs(SpectralIndex::default().window(377.7, MzTolerance::default())),
            Vec::<f64>::new()
        );
    }

    #[test]
    fn window_scales_with_ppm() {
        let index = index();
        // 10 ppm of 755.4 is ~0.0076, which beats the absolute 0.005
        assert_eq!(mzs(index.window(755.407, MzTolerance::new(0.005, 10.0))), vec![755.4]);
        assert_eq!(mzs(index.window(755.407, MzTolerance::absolute(0.005))), Vec::<f64>::new());
    }

    #[test]
    fn find_peaks_respects_min_height() {
        let index = index();
        let tolerance = MzTolerance::new(0.005, 10.0);
        assert_eq!(mzs(index.find_peaks(377.7, tolerance, 100.0)), vec![377.697]);
        assert_eq!(index.find_peaks(377.7, tolerance, 1e4).count(), 0);
        assert_eq!(mzs(index.peaks_above(1_000.0)), vec![120.081, 755.4]);
    }

    #[test]
    fn nearest() {
        let index = index();
        let tolerance = MzTolerance::new(0.005, 10.0);
        // The closest peak wins when both are tall enough...
        let peak = index.nearest(377.7, tolerance, 0.0).unwrap();
        assert_float_absolute_eq!(peak.mz, 377.700_4);
        // ...but the intensity filter is applied before distances are compared
        let peak = index.nearest(377.7, tolerance, 100.0).unwrap();
        assert_float_absolute_eq!(peak.mz, 377.697);
        // Nothing in range
        assert_eq!(index.nearest(500.0, tolerance, 0.0), None);
        assert_eq!(SpectralIndex::default().nearest(500.0, tolerance, 0.0), None);
    }

    #[test]
    fn nearest_at_the_edges() {
        let index = index();
        let tolerance = MzTolerance::absolute(0.01);
        assert_float_absolute_eq!(index.nearest(120.075, tolerance, 0.0).unwrap().mz, 120.081);
        assert_float_absolute_eq!(index.nearest(755.405, tolerance, 0.0).unwrap().mz, 755.4);
    }

    #[test]
    fn nearest_ties_go_to_the_lower_mz() {
        let index = SpectralIndex::new([(100.5, 1.0), (100.0, 1.0)]);
        let peak = index.nearest(100.25, MzTolerance::absolute(0.5), 0.0).unwrap();
        assert_float_absolute_eq!(peak.mz, 100.0);
    }

    #[test]
    fn base_peak_and_total_intensity() {
        let index = index();
        assert_eq!(index.base_peak(), Some(Peak::new(120.081, 5_000.0)));
        assert_float_absolute_eq!(index.total_intensity(), 8_020.0);
        assert_eq!(SpectralIndex::default().base_peak(), None);
    }

    #[test]
    fn equality_ignores_input_order() {
        let forward = SpectralIndex::new([(100.0, 1.0), (200.0, 2.0)]);
        let backward = SpectralIndex::new([(200.0, 2.0), (100.0, 1.0)]);
        assert_eq!(forward, backward);
        assert_ne!(forward, SpectralIndex::new([(100.0, 1.0)]));
    }
}
