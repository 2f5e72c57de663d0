// Standard Library Imports
use std::{iter, num::NonZeroU32, slice};

// External Crate Imports
use itertools::iproduct;

// Local Crate Imports
use crate::{IonChemError, IonLibrary, IonType, ModificationDatabase, Modifications, Result};

// Public API ==========================================================================================================

/// Expands adducts and modifications into ion types, in a deterministic order: adducts in the order given, then each
/// modification (starting with no modification at all), then every number of molecules up to `max_molecules`
pub fn enumerate(
    adducts: &[Modifications],
    modifications: &[Modifications],
    max_molecules: NonZeroU32,
) -> Vec<IonType> {
    let modification_options: Vec<_> = iter::once(Modifications::none())
        .chain(modifications.iter().cloned())
        .collect();

    iproduct!(adducts, &modification_options, 1..=max_molecules.get())
        .filter_map(|(adduct, modification, molecules)| {
            let molecules = NonZeroU32::new(molecules)?;
            Some(IonType::new(molecules, adduct.clone(), modification.clone()))
        })
        .collect()
}

impl IonLibrary {
    pub fn new(
        max_molecules: i64,
        adducts: Vec<Modifications>,
        modifications: Vec<Modifications>,
    ) -> Result<Self> {
        let max_molecules = u32::try_from(max_molecules)
            .ok()
            .and_then(NonZeroU32::new)
            .ok_or(IonChemError::InvalidMaxMolecules { max_molecules })?;

        if adducts.is_empty() {
            return Err(IonChemError::EmptyLibrary);
        }

        let ion_types = enumerate(&adducts, &modifications, max_molecules);
        if let Some(uncharged) = ion_types.iter().find(|ion_type| ion_type.charge() == 0) {
            return Err(IonChemError::UnchargedIonType {
                ion_type: uncharged.to_string(),
            });
        }

        Ok(Self {
            max_molecules,
            adducts,
            modifications,
            ion_types,
        })
    }

    /// Builds a library from modification keys, so `&[&["H"], &["H", "Na"]]` gives the adducts `+H` and `+H+Na`
    pub fn from_keys(
        db: &ModificationDatabase,
        max_molecules: i64,
        adducts: &[&[&str]],
        modifications: &[&[&str]],
    ) -> Result<Self> {
        let combine_all = |entries: &[&[&str]]| -> Result<Vec<_>> {
            entries
                .iter()
                .map(|keys| db.combine(keys.iter().copied()))
                .collect()
        };
        Self::new(max_molecules, combine_all(adducts)?, combine_all(modifications)?)
    }

    #[must_use]
    pub const fn max_molecules(&self) -> u32 {
        self.max_molecules.get()
    }

    #[must_use]
    pub fn adducts(&self) -> &[Modifications] {
        &self.adducts
    }

    #[must_use]
    pub fn modifications(&self) -> &[Modifications] {
        &self.modifications
    }

    #[must_use]
    pub fn ion_types(&self) -> &[IonType] {
        &self.ion_types
    }

    /// Where `ion_type` falls in the library's iteration order, if it's in the library at all
    #[must_use]
    pub fn position(&self, ion_type: &IonType) -> Option<usize> {
        self.ion_types.iter().position(|t| t == ion_type)
    }

    pub fn iter(&self) -> slice::Iter<'_, IonType> {
        self.ion_types.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ion_types.len()
    }

    // NOTE: Always `false` for a validated library, but provided to pair with `.len()`
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ion_types.is_empty()
    }
}

impl Default for IonLibrary {
    fn default() -> Self {
        let db = ModificationDatabase::default();
        // SAFETY: Every key here is part of the default catalogue and all of the adducts are charged
        Self::from_keys(&db, 2, &[&["H"], &["Na"], &["NH4"], &["K"]], &[&["H2O"]]).unwrap()
    }
}

impl<'l> IntoIterator for &'l IonLibrary {
    type Item = &'l IonType;
    type IntoIter = slice::Iter<'l, IonType>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// Module Tests ========================================================================================================
