// External Crate Imports
use ionchem::{IonLibrary, IonType};
use itertools::iproduct;
use log::trace;
use mass_index::MzTolerance;

// Local Crate Imports
use crate::{CheckMode, FeatureRow};

// Public API ==========================================================================================================

/// Every pair of ion types under which the two rows imply the same neutral mass, in library order. Rows that don't
/// carry the measurements a mode needs simply have no matches.
#[must_use]
pub fn find_matches(
    row_a: &FeatureRow,
    row_b: &FeatureRow,
    library: &IonLibrary,
    tolerance: MzTolerance,
    mode: CheckMode,
    min_height: f64,
) -> Vec<(IonType, IonType)> {
    let measurements = mode.measurements(row_a, row_b, min_height);
    if measurements.is_empty() {
        return Vec::new();
    }

    let agrees = mode.agreement();
    let matches: Vec<_> = iproduct!(library, library)
        .filter(|(type_a, type_b)| is_admissible(type_a, type_b))
        .filter(|(type_a, type_b)| agrees(&measurements, type_a, type_b, tolerance))
        .map(|(type_a, type_b)| (type_a.clone(), type_b.clone()))
        .collect();

    for (type_a, type_b) in &matches {
        trace!("row {} as {type_a} matches row {} as {type_b}", row_a.id(), row_b.id());
    }
    matches
}

// Private Types =======================================================================================================

/// Pairs of m/z values (row A, row B) that must be explained by the same neutral mass
type Measurements = Vec<(f64, f64)>;

type Agreement = fn(&[(f64, f64)], &IonType, &IonType, MzTolerance) -> bool;

// Private Methods =====================================================================================================

impl CheckMode {
    fn measurements(self, row_a: &FeatureRow, row_b: &FeatureRow, min_height: f64) -> Measurements {
        match self {
            Self::Average => average_measurements(row_a, row_b),
            Self::SingleFeature | Self::AllFeatures => feature_measurements(row_a, row_b, min_height),
        }
    }

    fn agreement(self) -> Agreement {
        match self {
            Self::Average | Self::SingleFeature => any_agree,
            Self::AllFeatures => all_agree,
        }
    }
}

fn average_measurements(row_a: &FeatureRow, row_b: &FeatureRow) -> Measurements {
    let (mz_a, mz_b) = (row_a.average_mz(), row_b.average_mz());
    if mz_a.is_finite() && mz_b.is_finite() {
        vec![(mz_a, mz_b)]
    } else {
        Vec::new()
    }
}

/// Raw files where both rows have a feature at least `min_height` tall
fn feature_measurements(row_a: &FeatureRow, row_b: &FeatureRow, min_height: f64) -> Measurements {
    row_a
        .features()
        .iter()
        .filter_map(|(raw_file, feature_a)| {
            let feature_b = row_b.feature(raw_file)?;
            (feature_a.height >= min_height && feature_b.height >= min_height)
                .then_some((feature_a.mz, feature_b.mz))
        })
        .collect()
}

fn any_agree(measurements: &[(f64, f64)], type_a: &IonType, type_b: &IonType, tolerance: MzTolerance) -> bool {
    measurements
        .iter()
        .any(|&(mz_a, mz_b)| masses_agree(type_a, mz_a, type_b, mz_b, tolerance))
}

fn all_agree(measurements: &[(f64, f64)], type_a: &IonType, type_b: &IonType, tolerance: MzTolerance) -> bool {
    measurements
        .iter()
        .all(|&(mz_a, mz_b)| masses_agree(type_a, mz_a, type_b, mz_b, tolerance))
}

fn masses_agree(type_a: &IonType, mz_a: f64, type_b: &IonType, mz_b: f64, tolerance: MzTolerance) -> bool {
    tolerance.matches(type_a.neutral_mass(mz_a), type_b.neutral_mass(mz_b))
}

// NOTE: The two sides of an edge must differ, and can't both carry a modification or both be multimers. So
// `[M-H2O+H]+` may pair with `[2M+Na]+`, but `[2M-H2O+H]+` never pairs with `[M-H2O+Na]+` or `[2M+Na]+`
fn is_admissible(type_a: &IonType, type_b: &IonType) -> bool {
    type_a != type_b
        && !(type_a.is_modified() && type_b.is_modified())
        && !(type_a.is_multimer() && type_b.is_multimer())
}

// Module Tests ========================================================================================================

#[cfg(test)]
mod tests {
    use std::sync::LazyLock;

    use insta::assert_snapshot;
    use ionchem::ModificationDatabase;

    use super::*;
    use crate::RowId;

    static DB: LazyLock<ModificationDatabase> = LazyLock::new(ModificationDatabase::default);
    static LIBRARY: LazyLock<IonLibrary> = LazyLock::new(IonLibrary::default);
    const TOLERANCE: MzTolerance = MzTolerance::new(0.005, 10.0);

    fn names(matches: &[(IonType, IonType)]) -> String {
        matches
            .iter()
            .map(|(a, b)| format!("{a} ~ {b}"))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn sodiated() -> FeatureRow {
        FeatureRow::new(RowId(1), 399.18, 5.0)
            .with_feature("a.mzML", 399.18, 1e5)
            .with_feature("b.mzML", 399.181, 2e5)
    }

    fn protonated() -> FeatureRow {
        FeatureRow::new(RowId(2), 377.2, 5.0)
            .with_feature("a.mzML", 377.2, 3e5)
            .with_feature("b.mzML", 377.19, 1e3)
    }

    #[test]
    fn sodium_and_proton_adducts_match() {
        let matches = find_matches(
            &sodiated(),
            &protonated(),
            &LIBRARY,
            TOLERANCE,
            CheckMode::Average,
            0.0,
        );
        assert_snapshot!(names(&matches), @"[M+Na]+ ~ [M+H]+");

        let reversed = find_matches(
            &protonated(),
            &sodiated(),
            &LIBRARY,
            TOLERANCE,
            CheckMode::Average,
            0.0,
        );
        assert_snapshot!(names(&reversed), @"[M+H]+ ~ [M+Na]+");
    }

    #[test]
    fn exact_masses_always_match() {
        let protonated_type = IonType::simple(DB.combine(["H"]).unwrap());
        let ammoniated_type = IonType::simple(DB.combine(["NH4"]).unwrap());
        let neutral_mass = 250.0;

        let row_a = FeatureRow::new(RowId(1), protonated_type.mz(neutral_mass), 1.0);
        let row_b = FeatureRow::new(RowId(2), ammoniated_type.mz(neutral_mass), 1.0);
        let matches = find_matches(&row_a, &row_b, &LIBRARY, TOLERANCE, CheckMode::Average, 0.0);
        assert!(matches.contains(&(protonated_type.clone(), ammoniated_type.clone())));

        let row_b = FeatureRow::new(RowId(2), ammoniated_type.mz(neutral_mass) + 0.01, 1.0);
        let matches = find_matches(&row_a, &row_b, &LIBRARY, TOLERANCE, CheckMode::Average, 0.0);
        assert!(!matches.contains(&(protonated_type, ammoniated_type)));
    }

    #[test]
    fn identical_rows_never_pair_as_identical_types() {
        let row_a = FeatureRow::new(RowId(1), 377.2, 5.0);
        let row_b = FeatureRow::new(RowId(2), 377.2, 5.0);
        let matches = find_matches(&row_a, &row_b, &LIBRARY, TOLERANCE, CheckMode::Average, 0.0);
        assert!(matches.iter().all(|(a, b)| a != b));
    }

    #[test]
    fn single_feature_needs_one_agreeing_file() {
        // File `b` disagrees (377.19 is 0.01 away), but file `a` agrees
        let matches = find_matches(
            &sodiated(),
            &protonated(),
            &LIBRARY,
            TOLERANCE,
            CheckMode::SingleFeature,
            0.0,
        );
        assert_snapshot!(names(&matches), @"[M+Na]+ ~ [M+H]+");
    }

    #[test]
    fn all_features_rejects_any_disagreeing_file() {
        let matches = find_matches(
            &sodiated(),
            &protonated(),
            &LIBRARY,
            TOLERANCE,
            CheckMode::AllFeatures,
            0.0,
        );
        assert!(matches.is_empty());

        // Raising the minimum height excludes the disagreeing (1e3 tall) feature from file `b`
        let matches = find_matches(
            &sodiated(),
            &protonated(),
            &LIBRARY,
            TOLERANCE,
            CheckMode::AllFeatures,
            1e4,
        );
        assert_snapshot!(names(&matches), @"[M+Na]+ ~ [M+H]+");
    }

    #[test]
    fn missing_features_mean_no_matches() {
        let bare_a = FeatureRow::new(RowId(1), 399.18, 5.0);
        let bare_b = FeatureRow::new(RowId(2), 377.2, 5.0).with_feature("c.mzML", 377.2, 1e5);
        for mode in [CheckMode::SingleFeature, CheckMode::AllFeatures] {
            assert!(find_matches(&bare_a, &bare_b, &LIBRARY, TOLERANCE, mode, 0.0).is_empty());
            assert!(find_matches(&sodiated(), &bare_b, &LIBRARY, TOLERANCE, mode, 0.0).is_empty());
            // Everything is below the minimum height
            assert!(find_matches(&sodiated(), &protonated(), &LIBRARY, TOLERANCE, mode, 1e9).is_empty());
        }

        let unknown_mz = FeatureRow::new(RowId(3), f64::NAN, 5.0);
        assert!(find_matches(&unknown_mz, &bare_b, &LIBRARY, TOLERANCE, CheckMode::Average, 0.0).is_empty());
    }

    #[test]
    fn admissibility() {
        let h = IonType::simple(DB.combine(["H"]).unwrap());
        let na = IonType::simple(DB.combine(["Na"]).unwrap());
        let dimer = |t: &IonType| t.with_molecules(std::num::NonZeroU32::new(2).unwrap());
        let water_loss = |t: &IonType| {
            IonType::new(std::num::NonZeroU32::MIN, t.adduct().clone(), DB.combine(["H2O"]).unwrap())
        };

        assert!(is_admissible(&h, &na));
        assert!(is_admissible(&dimer(&h), &na));
        assert!(is_admissible(&water_loss(&h), &na));
        assert!(is_admissible(&water_loss(&h), &dimer(&na)));
        assert!(!is_admissible(&h, &h));
        assert!(!is_admissible(&dimer(&h), &dimer(&na)));
        assert!(!is_admissible(&water_loss(&h), &water_loss(&na)));
        // A modified multimer can only pair with a plain single molecule
        assert!(is_admissible(&dimer(&water_loss(&h)), &na));
        assert!(!is_admissible(&dimer(&water_loss(&h)), &dimer(&na)));
        assert!(!is_admissible(&dimer(&water_loss(&h)), &water_loss(&na)));
    }
}
