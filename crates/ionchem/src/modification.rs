// Standard Library Imports
use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

// Local Crate Imports
use crate::{IonModification, ModificationKind};

// Public API ==========================================================================================================

impl IonModification {
    pub fn new(
        key: impl Into<String>,
        name: Option<String>,
        formula: Option<String>,
        kind: ModificationKind,
        mass: f64,
        charge: i32,
    ) -> Self {
        let key = key.into();
        let name = name.unwrap_or_else(|| key.clone());
        Self {
            key,
            name,
            formula,
            kind,
            mass,
            charge,
        }
    }

    /// The unique key this modification is stored under in a `ModificationDatabase`
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The name used when writing out ion notation, which several keys can share (e.g. `H` and `H-`)
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn formula(&self) -> Option<&str> {
        self.formula.as_deref()
    }

    #[must_use]
    pub const fn kind(&self) -> ModificationKind {
        self.kind
    }

    #[must_use]
    pub const fn mass(&self) -> f64 {
        self.mass
    }

    #[must_use]
    pub const fn charge(&self) -> i32 {
        self.charge
    }

    /// The same modification with its mass delta reversed, turning a loss into a gain and vice versa
    #[must_use]
    pub fn opposite(&self) -> Self {
        Self {
            mass: -self.mass,
            ..self.clone()
        }
    }

    pub(crate) fn sign(&self) -> char {
        if self.mass < 0.0 { '-' } else { '+' }
    }
}

impl Display for IonModification {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.sign(), self.name)
    }
}

// ---------------------------------------------------------------------------------------------------------------------

impl ModificationKind {
    pub const ALL: [Self; 4] = [Self::Adduct, Self::NeutralLoss, Self::Cluster, Self::Isotope];

    #[must_use]
    pub const fn kdl_name(&self) -> &'static str {
        match self {
            Self::Adduct => "adduct",
            Self::NeutralLoss => "neutral-loss",
            Self::Cluster => "cluster",
            Self::Isotope => "isotope",
        }
    }
}

impl Display for ModificationKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kdl_name())
    }
}

impl FromStr for ModificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.kdl_name() == s)
            .ok_or_else(|| s.to_owned())
    }
}

// Module Tests ========================================================================================================
