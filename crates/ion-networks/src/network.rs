// Standard Library Imports
use std::collections::BTreeSet;

// External Crate Imports
use ionchem::IonType;

// Local Crate Imports
use crate::{FeatureList, GroupId, IdentityState, IonIdentity, IonNetwork, NetworkId, NetworkSummary, RowId};

// Public API ==========================================================================================================

impl IonNetwork {
    #[must_use]
    pub const fn new(id: NetworkId, group: GroupId, identities: Vec<IonIdentity>) -> Self {
        Self {
            id,
            group,
            identities,
        }
    }

    #[must_use]
    pub const fn id(&self) -> NetworkId {
        self.id
    }

    #[must_use]
    pub const fn group(&self) -> GroupId {
        self.group
    }

    #[must_use]
    pub fn identities(&self) -> &[IonIdentity] {
        &self.identities
    }

    /// Every row holding at least one identity in this network, rejected or not
    #[must_use]
    pub fn rows(&self) -> BTreeSet<RowId> {
        self.identities.iter().map(IonIdentity::row).collect()
    }

    /// Rows that still hold an identity that hasn't been rejected
    #[must_use]
    pub fn members(&self) -> BTreeSet<RowId> {
        self.identities
            .iter()
            .filter(|identity| !identity.is_rejected())
            .map(IonIdentity::row)
            .collect()
    }

    pub fn identities_of(&self, row: RowId) -> impl Iterator<Item = &IonIdentity> {
        self.identities.iter().filter(move |identity| identity.row() == row)
    }

    /// The mean neutral mass implied by the identities that survived refinement (or by all of them, if none did)
    #[must_use]
    pub fn neutral_mass(&self) -> f64 {
        let surviving: Vec<_> = self
            .identities
            .iter()
            .filter(|identity| !identity.is_rejected())
            .map(IonIdentity::neutral_mass)
            .collect();
        let masses = if surviving.is_empty() {
            self.identities.iter().map(IonIdentity::neutral_mass).collect()
        } else {
            surviving
        };

        #[expect(clippy::cast_precision_loss)]
        let count = masses.len() as f64;
        masses.iter().sum::<f64>() / count
    }

    /// Rows are looked up in `feature_list` for their retention times; the network elutes with its earliest row
    #[must_use]
    pub fn summary(&self, feature_list: &FeatureList) -> NetworkSummary {
        let retention_time = self
            .rows()
            .into_iter()
            .filter_map(|row| feature_list.row(row))
            .map(|row| row.retention_time())
            .reduce(f64::min)
            .unwrap_or(f64::NAN);

        let in_state = |state: IdentityState| -> Vec<(RowId, IonType)> {
            self.identities
                .iter()
                .filter(|identity| identity.state() == state)
                .map(|identity| (identity.row(), identity.ion_type().clone()))
                .collect()
        };

        NetworkSummary {
            id: self.id,
            group: self.group,
            members: self.members().len(),
            neutral_mass: self.neutral_mass(),
            retention_time,
            accepted: in_state(IdentityState::Accepted),
            rejected: in_state(IdentityState::Rejected),
        }
    }

    pub(crate) fn identities_mut(&mut self) -> &mut [IonIdentity] {
        &mut self.identities
    }

    pub(crate) fn into_identities(self) -> Vec<IonIdentity> {
        self.identities
    }
}
