use miette::Diagnostic;
use thiserror::Error;

pub type Result<T, E = MassIndexError> = std::result::Result<T, E>;

#[derive(Copy, Clone, PartialEq, Debug, Diagnostic, Error)]
pub enum MassIndexError {
    #[diagnostic(help(
        "run mass detection on the fragment scans before checking them for MS/MS evidence"
    ))]
    #[error("scan #{scan_number} has no mass list")]
    MissingMassList { scan_number: usize },

    #[diagnostic(help(
        "both the absolute and relative parts of a tolerance must be finite and non-negative"
    ))]
    #[error("the m/z tolerance \"{mz} m/z or {ppm} ppm\" is invalid")]
    InvalidTolerance { mz: f64, ppm: f64 },
}
