// Standard Library Imports
use std::iter::zip;

// External Crate Imports
use knuffel::{
    Decode,
    span::{Span, Spanned},
};
use miette::{Diagnostic, LabeledSpan, NamedSource};
use thiserror::Error;

// Local Crate Imports
use crate::{IonChemError, IonLibrary, ModificationDatabase, Modifications};

// Public API ==========================================================================================================

pub const DEFAULT_MAX_MOLECULES: i64 = 2;

impl IonLibrary {
    /// Builds a library from an `ion-library` node, resolving modification names against `db`
    pub fn from_kdl(
        db: &ModificationDatabase,
        file_name: impl AsRef<str>,
        kdl_text: impl AsRef<str>,
    ) -> miette::Result<Self> {
        let parsed: IonLibraryFileKdl = knuffel::parse(file_name.as_ref(), kdl_text.as_ref())?;
        parsed
            .ion_library
            .validate(db)
            .map_err(|e| e.finalize(file_name, kdl_text).into())
    }
}

/// The `ion-library` configuration node, exposed so that it can be nested in larger configuration files
#[derive(Debug, Decode)]
#[knuffel(span_type=Span)]
pub struct IonLibraryKdl {
    #[knuffel(span)]
    span: Span,
    #[knuffel(child, unwrap(argument))]
    max_molecules: Option<Spanned<i64, Span>>,
    #[knuffel(children(name = "adduct"))]
    adducts: Vec<EntryKdl>,
    #[knuffel(children(name = "modification"))]
    modifications: Vec<EntryKdl>,
}

impl IonLibraryKdl {
    pub fn into_library(self, db: &ModificationDatabase) -> Result<IonLibrary, ConfigErrorKind> {
        self.validate(db)
    }
}

// KDL File Schema =====================================================================================================

#[derive(Debug, Decode)]
#[knuffel(span_type=Span)]
struct IonLibraryFileKdl {
    #[knuffel(child)]
    ion_library: IonLibraryKdl,
}

#[derive(Debug, Decode)]
#[knuffel(span_type=Span)]
struct EntryKdl {
    #[knuffel(span)]
    span: Span,
    #[knuffel(arguments)]
    keys: Vec<Spanned<String, Span>>,
}

// Contextual Validation Trait =========================================================================================

pub(crate) type ConfigResult<T> = Result<T, ConfigErrorKind>;

pub(crate) trait ValidateInto<'c, T> {
    type Context: 'c;

    fn validate(self, ctx: Self::Context) -> ConfigResult<T>;
}

// Ion Library Validation ==============================================================================================

impl<'d> ValidateInto<'d, IonLibrary> for IonLibraryKdl {
    type Context = &'d ModificationDatabase;

    fn validate(self, ctx: Self::Context) -> ConfigResult<IonLibrary> {
        let max_molecules = match self.max_molecules {
            Some(max) if *max < 1 => {
                return Err(ConfigErrorKind::InvalidMaxMolecules(*max.span(), *max));
            }
            Some(max) => *max,
            None => DEFAULT_MAX_MOLECULES,
        };
        let adducts = self.adducts.validate(ctx)?;
        let modifications = self.modifications.validate(ctx)?;

        IonLibrary::new(max_molecules, adducts, modifications)
            .map_err(|e| ConfigErrorKind::Library(self.span, e))
    }
}

// ---------------------------------------------------------------------------------------------------------------------

impl<'d> ValidateInto<'d, Vec<Modifications>> for Vec<EntryKdl> {
    type Context = &'d ModificationDatabase;

    fn validate(self, ctx: Self::Context) -> ConfigResult<Vec<Modifications>> {
        let mut seen_entries: Vec<(Modifications, Span)> = Vec::with_capacity(self.len());

        for entry in self {
            let span = entry.span;
            let modifications = entry.validate(ctx)?;

            if let Some((_, first_defined_at)) = seen_entries.iter().find(|(m, _)| m == &modifications) {
                return Err(ConfigErrorKind::DuplicateEntry(
                    *first_defined_at,
                    span,
                    modifications.to_string(),
                ));
            }
            seen_entries.push((modifications, span));
        }

        Ok(seen_entries.into_iter().map(|(m, _)| m).collect())
    }
}

impl<'d> ValidateInto<'d, Modifications> for EntryKdl {
    type Context = &'d ModificationDatabase;

    fn validate(self, ctx: Self::Context) -> ConfigResult<Modifications> {
        if self.keys.is_empty() {
            return Err(ConfigErrorKind::EmptyEntry(self.span));
        }

        self.keys
            .into_iter()
            .map(|key| {
                ctx.get(&key)
                    .cloned()
                    .map_err(|_| ConfigErrorKind::UnknownModification(*key.span(), (*key).clone()))
            })
            .collect()
    }
}

// Validation Error Types and Trait Implementations ====================================================================

#[derive(Debug, Error)]
#[error("failed to validate ion chemistry configuration")]
pub struct ConfigError {
    kdl: NamedSource<String>,
    #[source]
    kind: ConfigErrorKind,
}

impl ConfigError {
    #[must_use]
    pub const fn kind(&self) -> &ConfigErrorKind {
        &self.kind
    }
}

// NOTE: This is manually implemented because the list of labels is dynamic and needs to be extracted from `self.kind`
impl Diagnostic for ConfigError {
    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&self.kdl)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        Some(Box::new(self.kind.labels().into_iter().map(|(s, l)| {
            LabeledSpan::new_with_span(Some(l.to_owned()), *s)
        })))
    }

    fn diagnostic_source(&self) -> Option<&dyn Diagnostic> {
        Some(&self.kind)
    }
}

#[derive(Clone, Debug, Diagnostic, Error)]
pub enum ConfigErrorKind {
    #[error("{1:?} is not a kind of ion modification")]
    #[diagnostic(help("modifications must be one of: adduct, neutral-loss, cluster, or isotope"))]
    UnknownKind(Span, String),

    #[error("the modification {2:?} has already been defined")]
    #[diagnostic(help("consider removing the duplicate, or picking a new key for one of them"))]
    DuplicateModification(Span, Span, String),

    #[error("the modification {1:?} could not be found in the modification database")]
    #[diagnostic(help("double-check for typos, or add {1:?} to the modification database"))]
    UnknownModification(Span, String),

    #[error("library entries must name at least one modification")]
    #[diagnostic(help("list modification keys after the node name, e.g. `adduct \"H\" \"Na\"`"))]
    EmptyEntry(Span),

    #[error("the library entry {2:?} has already been listed")]
    #[diagnostic(help("listing an entry twice would test every ion type it produces twice, so remove one"))]
    DuplicateEntry(Span, Span, String),

    #[error("the maximum number of molecules per ion must be at least 1, but {1} was given")]
    #[diagnostic(help("use 1 to consider single molecules only, or a larger number to also consider multimers"))]
    InvalidMaxMolecules(Span, i64),

    #[error("the ion library is invalid")]
    Library(
        Span,
        #[source]
        #[diagnostic_source]
        IonChemError,
    ),
}

impl ConfigErrorKind {
    #[must_use]
    pub fn labels(&self) -> Vec<(&Span, &'static str)> {
        match self {
            Self::DuplicateModification(s1, s2, _) | Self::DuplicateEntry(s1, s2, _) => {
                zip([s1, s2], ["first defined here", "then again here"]).collect()
            }
            Self::UnknownKind(s, _) => vec![(s, "unknown kind")],
            Self::UnknownModification(s, _) => vec![(s, "unknown modification")],
            Self::EmptyEntry(s) => vec![(s, "empty entry")],
            Self::InvalidMaxMolecules(s, _) => vec![(s, "must be at least 1")],
            Self::Library(s, _) => vec![(s, "invalid library")],
        }
    }

    pub fn finalize(self, file_name: impl AsRef<str>, kdl: impl AsRef<str>) -> ConfigError {
        let kdl = NamedSource::new(file_name, kdl.as_ref().to_owned());
        ConfigError { kdl, kind: self }
    }
}

// Module Tests ========================================================================================================
