// Standard Library Imports
use std::collections::{BTreeMap, btree_map::Entry};

// External Crate Imports
use ahash::HashMapExt;
use mass_index::Scan;

// Local Crate Imports
use crate::{
    AppliedMethod, CorrelationGroup, Feature, FeatureList, FeatureRow, GroupId, IdentityState, IonIdentity,
    IonNetworkError, NetworkSummary, Result, RowId,
};

// Public API ==========================================================================================================

impl FeatureRow {
    pub fn new(id: RowId, average_mz: f64, retention_time: f64) -> Self {
        Self {
            id,
            average_mz,
            retention_time,
            mobility: None,
            features: BTreeMap::new(),
            fragment_scans: Vec::new(),
            ion_identities: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_mobility(mut self, mobility: f64) -> Self {
        self.mobility = Some(mobility);
        self
    }

    #[must_use]
    pub fn with_feature(mut self, raw_file: impl Into<String>, mz: f64, height: f64) -> Self {
        self.features.insert(raw_file.into(), Feature { mz, height });
        self
    }

    #[must_use]
    pub fn with_fragment_scan(mut self, scan: Scan) -> Self {
        self.fragment_scans.push(scan);
        self
    }

    #[must_use]
    pub const fn id(&self) -> RowId {
        self.id
    }

    #[must_use]
    pub const fn average_mz(&self) -> f64 {
        self.average_mz
    }

    #[must_use]
    pub const fn retention_time(&self) -> f64 {
        self.retention_time
    }

    #[must_use]
    pub const fn mobility(&self) -> Option<f64> {
        self.mobility
    }

    #[must_use]
    pub const fn features(&self) -> &BTreeMap<String, Feature> {
        &self.features
    }

    #[must_use]
    pub fn feature(&self, raw_file: &str) -> Option<&Feature> {
        self.features.get(raw_file)
    }

    #[must_use]
    pub fn fragment_scans(&self) -> &[Scan] {
        &self.fragment_scans
    }

    /// The fragment scan with the greatest total intensity; the earliest recorded scan wins a tie
    #[must_use]
    pub fn most_intense_scan(&self) -> Option<&Scan> {
        self.fragment_scans.iter().reduce(|best, scan| {
            if scan.total_intensity() > best.total_intensity() {
                scan
            } else {
                best
            }
        })
    }

    /// The precursor m/z of the most intense fragment scan, or the row's average m/z if it was never fragmented
    #[must_use]
    pub fn precursor_mz(&self) -> f64 {
        self.most_intense_scan()
            .map_or(self.average_mz, Scan::precursor_mz)
    }

    #[must_use]
    pub fn ion_identities(&self) -> &[IonIdentity] {
        &self.ion_identities
    }

    #[must_use]
    pub fn best_ion_identity(&self) -> Option<&IonIdentity> {
        self.ion_identities
            .iter()
            .find(|identity| identity.state() == IdentityState::Accepted)
    }

    pub(crate) fn set_ion_identities(&mut self, ion_identities: Vec<IonIdentity>) {
        self.ion_identities = ion_identities;
    }
}

// ---------------------------------------------------------------------------------------------------------------------

impl CorrelationGroup {
    /// Row ids are sorted and deduplicated, so a group's iteration order never depends on how it was built
    pub fn new(id: GroupId, rows: impl IntoIterator<Item = RowId>) -> Self {
        let mut rows: Vec<RowId> = rows.into_iter().collect();
        rows.sort_unstable();
        rows.dedup();
        Self { id, rows }
    }

    #[must_use]
    pub const fn id(&self) -> GroupId {
        self.id
    }

    #[must_use]
    pub fn rows(&self) -> &[RowId] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn contains(&self, row: RowId) -> bool {
        self.rows.binary_search(&row).is_ok()
    }
}

// ---------------------------------------------------------------------------------------------------------------------

impl FeatureList {
    /// When several rows share an id, the first one is the one that can be looked up
    pub fn new(rows: Vec<FeatureRow>, groups: Vec<CorrelationGroup>) -> Self {
        let mut row_index = ahash::HashMap::with_capacity(rows.len());
        for (index, row) in rows.iter().enumerate() {
            row_index.entry(row.id()).or_insert(index);
        }

        Self {
            rows,
            row_index,
            groups,
            networks: Vec::new(),
            applied_methods: Vec::new(),
        }
    }

    #[must_use]
    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    #[must_use]
    pub fn row(&self, id: RowId) -> Option<&FeatureRow> {
        self.row_index.get(&id).map(|&index| &self.rows[index])
    }

    #[must_use]
    pub fn groups(&self) -> &[CorrelationGroup] {
        &self.groups
    }

    /// Networks from the last run, ordered by retention time (then id)
    #[must_use]
    pub fn networks(&self) -> &[NetworkSummary] {
        &self.networks
    }

    #[must_use]
    pub fn applied_methods(&self) -> &[AppliedMethod] {
        &self.applied_methods
    }

    pub fn add_applied_method(&mut self, method: AppliedMethod) {
        self.applied_methods.push(method);
    }

    /// Checks that row ids are unique, that every group only names rows in this list, and that no row is claimed by
    /// two groups
    pub fn validate_groups(&self) -> Result<()> {
        for (index, row) in self.rows.iter().enumerate() {
            if self.row_index.get(&row.id()) != Some(&index) {
                return Err(IonNetworkError::DuplicateRow { row: row.id() });
            }
        }

        let mut owners: BTreeMap<RowId, GroupId> = BTreeMap::new();

        for group in &self.groups {
            for &row in group.rows() {
                if self.row(row).is_none() {
                    return Err(IonNetworkError::UnknownRow {
                        row,
                        group: group.id(),
                    });
                }

                match owners.entry(row) {
                    Entry::Occupied(e) => {
                        return Err(IonNetworkError::OverlappingGroups {
                            row,
                            first_group: *e.get(),
                            second_group: group.id(),
                        });
                    }
                    Entry::Vacant(e) => {
                        e.insert(group.id());
                    }
                }
            }
        }

        Ok(())
    }

    pub(crate) fn row_mut(&mut self, id: RowId) -> Option<&mut FeatureRow> {
        self.row_index.get(&id).map(|&index| &mut self.rows[index])
    }

    pub(crate) fn set_networks(&mut self, mut networks: Vec<NetworkSummary>) {
        networks.sort_by(|a, b| {
            a.retention_time
                .total_cmp(&b.retention_time)
                .then(a.id.cmp(&b.id))
        });
        self.networks = networks;
    }
}

// Module Tests ========================================================================================================

#[cfg(test)]
mod tests {
    use assert_float_eq::assert_float_absolute_eq;
    use insta::assert_snapshot;
    use mass_index::SpectralIndex;

    use super::*;

    fn scan(scan_number: usize, precursor_mz: f64, intensities: &[f64]) -> Scan {
        let peaks = intensities
            .iter()
            .enumerate()
            .map(|(i, &intensity)| (100.0 + i as f64, intensity));
        Scan::new(scan_number, precursor_mz, Some(SpectralIndex::new(peaks)))
    }

    fn group(id: usize, rows: &[usize]) -> CorrelationGroup {
        CorrelationGroup::new(GroupId(id), rows.iter().copied().map(RowId))
    }

    #[test]
    fn row_builder() {
        let row = FeatureRow::new(RowId(7), 377.2, 5.3)
            .with_mobility(1.21)
            .with_feature("a.mzML", 377.199, 1e5)
            .with_feature("b.mzML", 377.201, 2e5);
        assert_eq!(row.id(), RowId(7));
        assert_eq!(row.mobility(), Some(1.21));
        assert_eq!(row.features().len(), 2);
        assert_float_absolute_eq!(row.feature("b.mzML").unwrap().height, 2e5);
        assert_eq!(row.feature("c.mzML"), None);
        assert!(row.ion_identities().is_empty());
        assert!(row.best_ion_identity().is_none());
    }

    #[test]
    fn most_intense_scan() {
        let row = FeatureRow::new(RowId(1), 377.2, 5.3);
        assert!(row.most_intense_scan().is_none());
        assert_float_absolute_eq!(row.precursor_mz(), 377.2);

        let row = row
            .with_fragment_scan(scan(1, 377.19, &[10.0, 20.0]))
            .with_fragment_scan(scan(2, 377.21, &[50.0]))
            .with_fragment_scan(scan(3, 377.22, &[25.0, 25.0]));
        assert_eq!(row.most_intense_scan().unwrap().scan_number(), 2);
        assert_float_absolute_eq!(row.precursor_mz(), 377.21);
    }

    #[test]
    fn scans_without_mass_lists_are_never_most_intense() {
        let row = FeatureRow::new(RowId(1), 377.2, 5.3)
            .with_fragment_scan(Scan::new(1, 377.2, None))
            .with_fragment_scan(scan(2, 377.2, &[1.0]));
        assert_eq!(row.most_intense_scan().unwrap().scan_number(), 2);

        let row = FeatureRow::new(RowId(1), 377.2, 5.3).with_fragment_scan(Scan::new(1, 377.2, None));
        assert_eq!(row.most_intense_scan().unwrap().scan_number(), 1);
    }

    #[test]
    fn groups_are_sorted() {
        let group = group(0, &[5, 1, 3, 1]);
        assert_eq!(group.rows(), [RowId(1), RowId(3), RowId(5)]);
        assert!(group.contains(RowId(3)));
        assert!(!group.contains(RowId(2)));
        assert_eq!(group.len(), 3);
    }

    #[test]
    fn validate_groups() {
        let rows = || (0..4).map(|id| FeatureRow::new(RowId(id), 100.0, 1.0)).collect();

        let list = FeatureList::new(
            rows(),
            vec![group(0, &[0, 1]), group(1, &[2, 3])],
        );
        assert_eq!(list.validate_groups(), Ok(()));

        let list = FeatureList::new(
            rows(),
            vec![group(0, &[0, 1]), group(1, &[1, 2])],
        );
        assert_eq!(
            list.validate_groups(),
            Err(IonNetworkError::OverlappingGroups {
                row: RowId(1),
                first_group: GroupId(0),
                second_group: GroupId(1)
            })
        );

        let list = FeatureList::new(rows(), vec![group(4, &[3, 9])]);
        assert_eq!(
            list.validate_groups(),
            Err(IonNetworkError::UnknownRow {
                row: RowId(9),
                group: GroupId(4)
            })
        );

        let mut duplicated: Vec<_> = rows();
        duplicated.push(FeatureRow::new(RowId(2), 300.0, 1.0));
        let list = FeatureList::new(duplicated, vec![group(0, &[0, 1])]);
        let error = list.validate_groups().unwrap_err();
        assert_eq!(error, IonNetworkError::DuplicateRow { row: RowId(2) });
        assert_snapshot!(error, @"row 2 appears more than once in the feature list");
    }

    #[test]
    fn row_lookup() {
        let list = FeatureList::new(
            vec![
                FeatureRow::new(RowId(4), 100.0, 1.0),
                FeatureRow::new(RowId(2), 200.0, 1.0),
                FeatureRow::new(RowId(4), 300.0, 1.0),
            ],
            Vec::new(),
        );
        assert_float_absolute_eq!(list.row(RowId(2)).unwrap().average_mz(), 200.0);
        assert_float_absolute_eq!(list.row(RowId(4)).unwrap().average_mz(), 100.0);
        assert!(list.row(RowId(3)).is_none());
    }
}
