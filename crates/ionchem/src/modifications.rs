// Standard Library Imports
use std::{
    fmt::{self, Display, Formatter},
    slice,
};

// External Crate Imports
use itertools::Itertools;

// Local Crate Imports
use crate::{IonModification, Modifications};

// Public API ==========================================================================================================

impl Modifications {
    pub fn new(modifications: impl IntoIterator<Item = IonModification>) -> Self {
        let mut modifications: Vec<_> = modifications.into_iter().collect();
        modifications.sort_by(|a, b| a.key().cmp(b.key()));
        Self(modifications)
    }

    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    pub fn iter(&self) -> slice::Iter<'_, IonModification> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn mass(&self) -> f64 {
        self.0.iter().map(IonModification::mass).sum()
    }

    #[must_use]
    pub fn charge(&self) -> i32 {
        self.0.iter().map(IonModification::charge).sum()
    }

    /// Multiset inclusion: every modification of `self` appears in `other` at least as many times
    #[must_use]
    pub fn is_subset_of(&self, other: &Self) -> bool {
        let other_counts = other.0.iter().counts_by(IonModification::key);
        self.0
            .iter()
            .counts_by(IonModification::key)
            .into_iter()
            .all(|(key, count)| other_counts.get(key).is_some_and(|&other| other >= count))
    }

    #[must_use]
    pub fn opposite(&self) -> Self {
        self.0.iter().map(IonModification::opposite).collect()
    }

    #[must_use]
    pub fn combine(&self, other: &Self) -> Self {
        self.0.iter().chain(&other.0).cloned().collect()
    }
}

impl FromIterator<IonModification> for Modifications {
    fn from_iter<I: IntoIterator<Item = IonModification>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl<'m> IntoIterator for &'m Modifications {
    type Item = &'m IonModification;
    type IntoIter = slice::Iter<'m, IonModification>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Display for Modifications {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (count, modification) in self.0.iter().dedup_by_with_count(|a, b| a.key() == b.key()) {
            let sign = modification.sign();
            let name = modification.name();
            if count > 1 {
                write!(f, "{sign}{count}{name}")?;
            } else {
                write!(f, "{sign}{name}")?;
            }
        }
        Ok(())
    }
}

// Module Tests ========================================================================================================

#[cfg(test)]
mod tests {
    use std::sync::LazyLock;

    use assert_float_eq::assert_float_absolute_eq;
    use insta::assert_snapshot;

    use super::*;
    use crate::ModificationDatabase;

    static DB: LazyLock<ModificationDatabase> = LazyLock::new(ModificationDatabase::default);

    fn mods(keys: &[&str]) -> Modifications {
        DB.combine(keys.iter().copied()).unwrap()
    }

    #[test]
    fn combined_mass_and_charge() {
        let sodiated = mods(&["H", "Na"]);
        assert_float_absolute_eq!(sodiated.mass(), 23.996_494);
        assert_eq!(sodiated.charge(), 2);
        assert_eq!(sodiated.len(), 2);

        assert_float_absolute_eq!(Modifications::none().mass(), 0.0);
        assert_eq!(Modifications::none().charge(), 0);
    }

    #[test]
    fn equality_ignores_construction_order() {
        assert_eq!(mods(&["Na", "H"]), mods(&["H", "Na"]));
        assert_ne!(mods(&["H", "H"]), mods(&["H"]));
    }

    #[test]
    fn display() {
        assert_snapshot!(mods(&["Na", "H"]), @"+H+Na");
        assert_snapshot!(mods(&["H2O"]), @"-H2O");
        assert_snapshot!(mods(&["H2O", "H2O"]), @"-2H2O");
        assert_snapshot!(mods(&["H-"]), @"-H");
        assert_snapshot!(mods(&["H2O", "H2O"]).opposite(), @"+2H2O");
        assert_snapshot!(Modifications::none(), @"");
    }

    #[test]
    fn multiset_inclusion() {
        let h = mods(&["H"]);
        let na = mods(&["Na"]);
        let h_na = mods(&["H", "Na"]);
        let h_h = mods(&["H", "H"]);

        assert!(h.is_subset_of(&h));
        assert!(h.is_subset_of(&h_na));
        assert!(na.is_subset_of(&h_na));
        assert!(h.is_subset_of(&h_h));
        assert!(Modifications::none().is_subset_of(&h));

        assert!(!h_na.is_subset_of(&h));
        assert!(!h_h.is_subset_of(&h_na));
        assert!(!h.is_subset_of(&Modifications::none()));
    }

    #[test]
    fn combine() {
        let combined = mods(&["H2O"]).combine(&mods(&["NH3", "H2O"]));
        assert_snapshot!(combined, @"-2H2O-NH3");
        assert_float_absolute_eq!(combined.mass(), -53.047_679);
    }
}
