// Standard Library Imports
use std::collections::hash_map::Entry;

// External Crate Imports
use ahash::{HashMap, HashMapExt};
use knuffel::{Decode, span::Span};
use miette::Result;

// Local Crate Imports
use crate::{
    IonChemError, IonModification, ModificationDatabase, ModificationKind, Modifications,
    library_config::{ConfigErrorKind, ConfigResult, ValidateInto},
};

// Public API ==========================================================================================================

pub const DEFAULT_KDL: &str = include_str!("../data/modifications.kdl");

impl ModificationDatabase {
    pub fn new(file_name: impl AsRef<str>, kdl_text: impl AsRef<str>) -> Result<Self> {
        let parsed_db: ModificationDatabaseKdl = knuffel::parse(file_name.as_ref(), kdl_text.as_ref())?;
        parsed_db
            .validate(())
            .map_err(|e| e.finalize(file_name, kdl_text).into())
    }

    pub fn get(&self, key: &str) -> crate::Result<&IonModification> {
        self.modifications
            .get(key)
            .ok_or_else(|| IonChemError::modification_lookup(key))
    }

    /// Looks up every key and combines the results, so `["H", "Na"]` yields `+H+Na`
    pub fn combine<'k>(&self, keys: impl IntoIterator<Item = &'k str>) -> crate::Result<Modifications> {
        keys.into_iter().map(|key| self.get(key).cloned()).collect()
    }

    /// Every modification of a given kind, sorted by key
    #[must_use]
    pub fn of_kind(&self, kind: ModificationKind) -> Vec<&IonModification> {
        let mut modifications: Vec<_> = self
            .modifications
            .values()
            .filter(|modification| modification.kind() == kind)
            .collect();
        modifications.sort_by(|a, b| a.key().cmp(b.key()));
        modifications
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.modifications.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modifications.is_empty()
    }
}

impl Default for ModificationDatabase {
    fn default() -> Self {
        // SAFETY: The embedded catalogue is parsed by this module's tests, so the `.unwrap()` can't fail at runtime
        Self::new("modifications.kdl", DEFAULT_KDL).unwrap()
    }
}

// KDL File Schema =====================================================================================================

#[derive(Debug, Decode)]
#[knuffel(span_type=Span)]
struct ModificationDatabaseKdl {
    #[knuffel(children)]
    modifications: Vec<ModificationKdl>,
}

#[derive(Debug, Decode)]
#[knuffel(span_type=Span)]
struct ModificationKdl {
    #[knuffel(span)]
    span: Span,
    #[knuffel(node_name)]
    kind: String,
    #[knuffel(argument)]
    key: String,
    #[knuffel(property(name = "name"))]
    name: Option<String>,
    #[knuffel(property(name = "formula"))]
    formula: Option<String>,
    #[knuffel(property(name = "mass"))]
    mass: f64,
    #[knuffel(property(name = "charge"))]
    charge: Option<i32>,
}

// Modification Database Validation ====================================================================================

impl ValidateInto<'_, ModificationDatabase> for ModificationDatabaseKdl {
    type Context = ();

    fn validate(self, _ctx: Self::Context) -> ConfigResult<ModificationDatabase> {
        let mut seen_modifications = HashMap::with_capacity(self.modifications.len());

        for modification_kdl in self.modifications {
            let span = modification_kdl.span;
            let modification = modification_kdl.validate(())?;

            match seen_modifications.entry(modification.key().to_owned()) {
                Entry::Occupied(e) => {
                    let (key, (first_defined_at, _)) = e.remove_entry();
                    return Err(ConfigErrorKind::DuplicateModification(first_defined_at, span, key));
                }
                Entry::Vacant(e) => e.insert((span, modification)),
            };
        }

        let modifications = seen_modifications
            .into_iter()
            .map(|(k, (_, v))| (k, v))
            .collect();
        Ok(ModificationDatabase { modifications })
    }
}

impl ValidateInto<'_, IonModification> for ModificationKdl {
    type Context = ();

    fn validate(self, _ctx: Self::Context) -> ConfigResult<IonModification> {
        let kind = self
            .kind
            .parse()
            .map_err(|kind| ConfigErrorKind::UnknownKind(self.span, kind))?;

        Ok(IonModification::new(
            self.key,
            self.name,
            self.formula,
            kind,
            self.mass,
            self.charge.unwrap_or_default(),
        ))
    }
}

// Module Tests ========================================================================================================
