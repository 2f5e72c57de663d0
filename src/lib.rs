//! Groups the feature-list rows of a mass spectrometry experiment into ion identity networks: rows that are different
//! ions (adducts, in-source fragments, and multimers) of the same analyte.
//!
//! The work is split across three crates, all re-exported here:
//!
//! - [`mass_index`] searches centroided fragment spectra within m/z tolerances,
//! - [`ionchem`] describes ion modifications and enumerates the ion types they form,
//! - [`ion_networks`] matches, assembles, verifies, and refines the networks themselves.

pub use ion_networks::*;
