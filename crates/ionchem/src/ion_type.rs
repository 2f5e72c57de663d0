// Standard Library Imports
use std::{
    fmt::{self, Display, Formatter},
    num::NonZeroU32,
};

// Local Crate Imports
use crate::{IonType, Modifications};

// Public API ==========================================================================================================

impl IonType {
    #[must_use]
    pub const fn new(molecules: NonZeroU32, adduct: Modifications, modification: Modifications) -> Self {
        Self {
            molecules,
            adduct,
            modification,
        }
    }

    /// A single, unmodified molecule ionised by `adduct`
    #[must_use]
    pub const fn simple(adduct: Modifications) -> Self {
        Self::new(NonZeroU32::MIN, adduct, Modifications(Vec::new()))
    }

    #[must_use]
    pub const fn molecules(&self) -> u32 {
        self.molecules.get()
    }

    #[must_use]
    pub const fn adduct(&self) -> &Modifications {
        &self.adduct
    }

    #[must_use]
    pub const fn modification(&self) -> &Modifications {
        &self.modification
    }

    #[must_use]
    pub fn charge(&self) -> i32 {
        self.adduct.charge() + self.modification.charge()
    }

    #[must_use]
    pub fn mass_delta(&self) -> f64 {
        self.adduct.mass() + self.modification.mass()
    }

    /// The neutral mass of one analyte molecule that would be observed at `mz` as this ion type
    #[must_use]
    pub fn neutral_mass(&self, mz: f64) -> f64 {
        (mz * self.abs_charge() - self.mass_delta()) / f64::from(self.molecules.get())
    }

    /// The inverse of [`IonType::neutral_mass()`]
    #[must_use]
    pub fn mz(&self, neutral_mass: f64) -> f64 {
        (neutral_mass * f64::from(self.molecules.get()) + self.mass_delta()) / self.abs_charge()
    }

    /// The m/z shift caused by this type's modifications, which is what a neutral loss looks like in a spectrum
    #[must_use]
    pub fn modification_mz(&self) -> f64 {
        self.modification.mass().abs() / self.abs_charge()
    }

    #[must_use]
    pub fn with_molecules(&self, molecules: NonZeroU32) -> Self {
        Self {
            molecules,
            ..self.clone()
        }
    }

    /// This ion type at every order from a single molecule up to (and including) its own
    pub fn ladder(&self) -> impl Iterator<Item = Self> + '_ {
        (1..=self.molecules.get())
            .filter_map(NonZeroU32::new)
            .map(|molecules| self.with_molecules(molecules))
    }

    /// Do both types share adducts and modifications, differing only in their number of molecules?
    #[must_use]
    pub fn is_ladder_related(&self, other: &Self) -> bool {
        self.molecules != other.molecules
            && self.adduct == other.adduct
            && self.modification == other.modification
    }

    #[must_use]
    pub const fn is_multimer(&self) -> bool {
        self.molecules.get() > 1
    }

    #[must_use]
    pub fn modification_count(&self) -> usize {
        self.modification.len()
    }

    #[must_use]
    pub fn is_modified(&self) -> bool {
        !self.modification.is_empty()
    }
}

impl Display for IonType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        if self.is_multimer() {
            write!(f, "{}", self.molecules)?;
        }
        write!(f, "M{}{}]", self.modification, self.adduct)?;

        let charge = self.charge();
        let sign = if charge < 0 { '-' } else { '+' };
        match charge.unsigned_abs() {
            0 => Ok(()),
            1 => write!(f, "{sign}"),
            z => write!(f, "{z}{sign}"),
        }
    }
}

// Private Methods =====================================================================================================

impl IonType {
    // NOTE: Uncharged types can't be built by an `IonLibrary`, but treating them as singly charged keeps the mass
    // conversions total instead of dividing by zero
    fn abs_charge(&self) -> f64 {
        f64::from(self.charge().unsigned_abs().max(1))
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

    fn ion(molecules: u32, adduct: &[&str], modification: &[&str]) -> IonType {
        IonType::new(
            NonZeroU32::new(molecules).unwrap(),
            DB.combine(adduct.iter().copied()).unwrap(),
            DB.combine(modification.iter().copied()).unwrap(),
        )
    }

    #[test]
    fn display() {
        assert_snapshot!(ion(1, &["H"], &[]), @"[M+H]+");
        assert_snapshot!(ion(2, &["Na"], &[]), @"[2M+Na]+");
        assert_snapshot!(ion(1, &["H"], &["H2O"]), @"[M-H2O+H]+");
        assert_snapshot!(ion(1, &["H", "H"], &[]), @"[M+2H]2+");
        assert_snapshot!(ion(1, &["H-"], &[]), @"[M-H]-");
        assert_snapshot!(ion(3, &["Cl"], &["H2O", "H2O"]), @"[3M-2H2O+Cl]-");
        assert_snapshot!(ion(1, &["Fe"], &[]), @"[M+Fe]2+");
        assert_snapshot!(ion(1, &["e"], &[]), @"[M-e]+");
    }

    #[test]
    fn neutral_masses_of_co_eluting_adducts_agree() {
        let protonated = ion(1, &["H"], &[]);
        let sodiated = ion(1, &["Na"], &[]);
        let from_h = protonated.neutral_mass(377.2);
        let from_na = sodiated.neutral_mass(399.18);
        assert_float_absolute_eq!(from_h, 376.192_724);
        assert_float_absolute_eq!(from_na, 376.190_782);
        assert_float_absolute_eq!(from_h, from_na, 0.005);
    }

    #[test]
    fn mz_inverts_neutral_mass() {
        for ion_type in [
            ion(1, &["H"], &[]),
            ion(2, &["H"], &[]),
            ion(1, &["H", "H"], &["H2O"]),
            ion(3, &["Cl"], &["NH3"]),
        ] {
            let neutral_mass = ion_type.neutral_mass(755.4);
            assert_float_absolute_eq!(ion_type.mz(neutral_mass), 755.4, 1e-9);
        }
    }

    #[test]
    fn multimer_math() {
        let dimer = ion(2, &["H"], &[]);
        let neutral_mass = dimer.neutral_mass(755.4);
        assert_float_absolute_eq!(neutral_mass, 377.196_362);
        let monomer = dimer.with_molecules(NonZeroU32::MIN);
        assert_float_absolute_eq!(monomer.mz(neutral_mass), 378.203_638);
        assert_float_absolute_eq!(ion(2, &["H", "H"], &[]).mz(neutral_mass), 378.203_638);
    }

    #[test]
    fn modification_mz() {
        assert_float_absolute_eq!(ion(1, &["H"], &["H2O"]).modification_mz(), 18.010_565);
        assert_float_absolute_eq!(ion(1, &["H", "H"], &["H2O"]).modification_mz(), 9.005_283, 1e-6);
        assert_float_absolute_eq!(ion(1, &["H"], &[]).modification_mz(), 0.0);
    }

    #[test]
    fn ladders() {
        let trimer = ion(3, &["Na"], &["H2O"]);
        let ladder: Vec<_> = trimer.ladder().map(|t| t.to_string()).collect();
        assert_eq!(ladder, ["[M-H2O+Na]+", "[2M-H2O+Na]+", "[3M-H2O+Na]+"]);

        assert!(trimer.is_ladder_related(&ion(1, &["Na"], &["H2O"])));
        assert!(!trimer.is_ladder_related(&trimer));
        assert!(!trimer.is_ladder_related(&ion(1, &["Na"], &[])));
        assert!(!trimer.is_ladder_related(&ion(1, &["H"], &["H2O"])));
    }

    #[test]
    fn predicates() {
        let plain = ion(1, &["H"], &[]);
        assert!(!plain.is_multimer());
        assert!(!plain.is_modified());
        assert_eq!(plain.modification_count(), 0);
        assert_eq!(plain, IonType::simple(DB.combine(["H"]).unwrap()));

        let fancy = ion(2, &["H"], &["H2O", "NH3"]);
        assert!(fancy.is_multimer());
        assert!(fancy.is_modified());
        assert_eq!(fancy.modification_count(), 2);
        assert_eq!(fancy.charge(), 1);
    }
}
