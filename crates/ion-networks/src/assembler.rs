// Standard Library Imports
use std::collections::BTreeMap;

// External Crate Imports
use ionchem::IonType;
use log::debug;

// Local Crate Imports
use crate::{
    CorrelationGroup, FeatureList, FeatureRow, IonIdentity, IonNetwork, IonNetworkError, NetworkId,
    NetworkingParameters, Result, RowId, find_matches,
};

// Public API ==========================================================================================================

/// Disjoint sets of rows, where each set is represented by its smallest row
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct UnionFind {
    parents: BTreeMap<RowId, RowId>,
}

impl UnionFind {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Finds the root of the set containing `row`, starting a new set if `row` hasn't been seen before
    pub fn find(&mut self, row: RowId) -> RowId {
        let mut root = *self.parents.entry(row).or_insert(row);
        while self.parents[&root] != root {
            root = self.parents[&root];
        }

        let mut current = row;
        while current != root {
            let parent = self.parents[&current];
            self.parents.insert(current, root);
            current = parent;
        }

        root
    }

    /// Merges the sets containing `a` and `b`, returning the root of the merged set
    pub fn union(&mut self, a: RowId, b: RowId) -> RowId {
        let (root_a, root_b) = (self.find(a), self.find(b));
        let (root, child) = if root_a <= root_b { (root_a, root_b) } else { (root_b, root_a) };
        self.parents.insert(child, root);
        root
    }

    pub fn connected(&mut self, a: RowId, b: RowId) -> bool {
        self.find(a) == self.find(b)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.parents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }
}

/// Matches every pair of rows in `group` and joins matched rows into networks, ordered by network id. Rows keep every
/// identity they were matched under; competing hypotheses are only resolved during refinement.
pub fn assemble_group(
    group: &CorrelationGroup,
    feature_list: &FeatureList,
    parameters: &NetworkingParameters,
) -> Result<Vec<IonNetwork>> {
    let rows: Vec<&FeatureRow> = group
        .rows()
        .iter()
        .map(|&row| {
            feature_list.row(row).ok_or(IonNetworkError::UnknownRow {
                row,
                group: group.id(),
            })
        })
        .collect::<Result<_>>()?;

    let mut identities = Identities::default();
    let mut components = UnionFind::new();
    for (i, row_a) in rows.iter().enumerate() {
        for row_b in &rows[i + 1..] {
            let matches = find_matches(
                row_a,
                row_b,
                &parameters.library,
                parameters.tolerance,
                parameters.check_mode,
                parameters.min_height,
            );

            for (type_a, type_b) in matches {
                identities.get_or_insert(row_a, &type_a).add_partner(row_b.id(), &type_b);
                identities.get_or_insert(row_b, &type_b).add_partner(row_a.id(), &type_a);
                components.union(row_a.id(), row_b.id());
            }
        }
    }

    let mut networks: BTreeMap<NetworkId, Vec<IonIdentity>> = BTreeMap::new();
    for mut identity in identities.0 {
        let id = NetworkId(components.find(identity.row()));
        identity.set_network(id);
        networks.entry(id).or_default().push(identity);
    }

    debug!(
        "group {} with {} rows formed {} networks",
        group.id(),
        rows.len(),
        networks.len()
    );

    Ok(networks
        .into_iter()
        .map(|(id, identities)| IonNetwork::new(id, group.id(), identities))
        .collect())
}

// Private Types =======================================================================================================

/// Identities in the order they were first proposed
#[derive(Default)]
struct Identities(Vec<IonIdentity>);

// Private Methods =====================================================================================================

impl Identities {
    fn get_or_insert(&mut self, row: &FeatureRow, ion_type: &IonType) -> &mut IonIdentity {
        let index = if let Some(index) = self
            .0
            .iter()
            .position(|identity| identity.row() == row.id() && identity.ion_type() == ion_type)
        {
            index
        } else {
            let neutral_mass = ion_type.neutral_mass(measured_mz(row));
            self.0.push(IonIdentity::new(row.id(), ion_type.clone(), neutral_mass));
            self.0.len() - 1
        };

        &mut self.0[index]
    }
}

/// Falls back to the mean of the per-file features when a row has no usable average
fn measured_mz(row: &FeatureRow) -> f64 {
    if row.average_mz().is_finite() {
        return row.average_mz();
    }

    let mzs: Vec<_> = row.features().values().map(|feature| feature.mz).collect();
    #[expect(clippy::cast_precision_loss)]
    let count = mzs.len() as f64;
    mzs.iter().sum::<f64>() / count
}

// Module Tests ========================================================================================================
