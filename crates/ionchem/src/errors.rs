use miette::Diagnostic;
use thiserror::Error;

pub type Result<T, E = IonChemError> = std::result::Result<T, E>;

#[derive(Clone, Eq, PartialEq, Debug, Diagnostic, Error)]
pub enum IonChemError {
    #[diagnostic(help("add at least one adduct (e.g. \"H\" or \"Na\") to the library"))]
    #[error("an ion library must contain at least one adduct")]
    EmptyLibrary,

    #[diagnostic(help("use 1 to consider single molecules only, or a larger number to also consider multimers"))]
    #[error("the maximum number of molecules per ion must be at least 1, but {max_molecules} was given")]
    InvalidMaxMolecules { max_molecules: i64 },

    #[diagnostic(help(
        "ion types are matched by m/z, so every adduct and modification combination must be charged"
    ))]
    #[error("the ion type {ion_type} carries no net charge")]
    UnchargedIonType { ion_type: String },

    #[error("the modification {key:?} could not be found in the supplied modification database")]
    ModificationLookup { key: String },
}

impl IonChemError {
    pub(crate) fn modification_lookup(key: &str) -> Self {
        let key = key.to_owned();

        Self::ModificationLookup { key }
    }
}
