//! Ion modifications, the ion types built from them, and ordered libraries of ion-type hypotheses

pub mod errors;
pub mod ion_library;
pub mod ion_type;
pub mod library_config;
pub mod modification;
pub mod modification_database;
pub mod modifications;
#[cfg(test)]
mod testing_tools;

// Standard Library Imports
use std::num::NonZeroU32;

// External Crate Imports
use ahash::HashMap;

// Public API ==========================================================================================================

pub use errors::{IonChemError, Result};
pub use library_config::{ConfigError, ConfigErrorKind, IonLibraryKdl};

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum ModificationKind {
    Adduct,
    NeutralLoss,
    Cluster,
    Isotope,
}

/// A single named change to an ion: a charge-carrying adduct, an in-source loss, a solvent cluster, or an isotope
#[derive(Clone, PartialEq, Debug)]
pub struct IonModification {
    key: String,
    name: String,
    formula: Option<String>,
    kind: ModificationKind,
    mass: f64,
    charge: i32,
}

/// A multiset of modifications, kept sorted by key so that equal combinations compare equal
#[derive(Clone, PartialEq, Debug, Default)]
pub struct Modifications(Vec<IonModification>);

/// `M` copies of an analyte, ionised by an adduct combination and optionally modified (e.g. `[2M-H2O+Na]+`)
#[derive(Clone, PartialEq, Debug)]
pub struct IonType {
    molecules: NonZeroU32,
    adduct: Modifications,
    modification: Modifications,
}

/// Every ion-type hypothesis to test, in a fixed iteration order
#[derive(Clone, PartialEq, Debug)]
pub struct IonLibrary {
    max_molecules: NonZeroU32,
    adducts: Vec<Modifications>,
    modifications: Vec<Modifications>,
    ion_types: Vec<IonType>,
}

#[derive(Clone, PartialEq, Debug)]
pub struct ModificationDatabase {
    modifications: HashMap<String, IonModification>,
}
