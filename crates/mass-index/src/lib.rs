//! Sorted mass lists and m/z tolerance searches for fragment scans

mod errors;
mod peak;
mod scan;
mod spectral_index;
mod tolerance;

// External Crate Imports
use derive_more::{Constructor, From};
use mzdata::mzpeaks::{CentroidPeak, MZPeakSetType};

// Public API ==========================================================================================================

pub use errors::{MassIndexError, Result};

/// An absolute m/z window combined with a relative (ppm) one, where the wider of the two wins at any given m/z
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct MzTolerance {
    mz: f64,
    ppm: f64,
}

/// A single centroided signal, copied out of a mass list so it can be kept as evidence
#[derive(Copy, Clone, PartialEq, Debug, Constructor, From)]
pub struct Peak {
    pub mz: f64,
    pub intensity: f64,
}

/// A scan's centroided peaks, sorted ascending by m/z
#[derive(Clone)]
pub struct SpectralIndex(MZPeakSetType<CentroidPeak>);

/// A fragment (MS/MS) scan recorded for some precursor ion
#[derive(Clone, PartialEq, Debug)]
pub struct Scan {
    scan_number: usize,
    precursor_mz: f64,
    mass_list: Option<SpectralIndex>,
}
