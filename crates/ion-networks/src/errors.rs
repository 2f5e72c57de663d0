use mass_index::MassIndexError;
use miette::Diagnostic;
use thiserror::Error;

use crate::{GroupId, RowId};

pub type Result<T, E = IonNetworkError> = std::result::Result<T, E>;

#[derive(Clone, PartialEq, Debug, Diagnostic, Error)]
pub enum IonNetworkError {
    #[error("the {which} is invalid")]
    Tolerance {
        which: &'static str,
        #[source]
        #[diagnostic_source]
        source: MassIndexError,
    },

    #[diagnostic(help("heights are intensities, so they must be finite and non-negative"))]
    #[error("the {which} must not be negative, but {height} was given")]
    InvalidHeight { which: &'static str, height: f64 },

    #[diagnostic(help("mobility differences are absolute, so the tolerance must be finite and non-negative"))]
    #[error("the mobility tolerance must not be negative, but {tolerance} was given")]
    InvalidMobilityTolerance { tolerance: f64 },

    #[diagnostic(help("use 1 to keep every network, or 2 to drop networks left with a single row"))]
    #[error("the minimum network size must be at least 1, but {size} was given")]
    InvalidNetworkSize { size: usize },

    #[diagnostic(help("correlation groups must partition the feature list, so each row may only belong to one"))]
    #[error("row {row} belongs to both group {first_group} and group {second_group}")]
    OverlappingGroups {
        row: RowId,
        first_group: GroupId,
        second_group: GroupId,
    },

    #[diagnostic(help("every row of a feature list needs its own id, so merge or renumber the repeated rows"))]
    #[error("row {row} appears more than once in the feature list")]
    DuplicateRow { row: RowId },

    #[diagnostic(help("double-check that the correlation groups were built from this feature list"))]
    #[error("group {group} refers to row {row}, which isn't in the feature list")]
    UnknownRow { row: RowId, group: GroupId },

    #[error("failed to build ion networks for group {group}")]
    Group {
        group: GroupId,
        #[source]
        source: Box<IonNetworkError>,
    },
}

impl IonNetworkError {
    /// Configuration problems are caught before any group is processed
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Tolerance { .. }
                | Self::InvalidHeight { .. }
                | Self::InvalidMobilityTolerance { .. }
                | Self::InvalidNetworkSize { .. }
        )
    }

    pub(crate) fn in_group(self, group: GroupId) -> Self {
        Self::Group {
            group,
            source: Box::new(self),
        }
    }
}
