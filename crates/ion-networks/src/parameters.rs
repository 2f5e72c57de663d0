// Standard Library Imports
use std::{
    fmt::{self, Display, Formatter},
    ops::Deref,
    str::FromStr,
};

// External Crate Imports
use ionchem::{ConfigErrorKind, IonLibrary, IonLibraryKdl, ModificationDatabase};
use knuffel::{
    Decode, DecodeScalar,
    ast::{self, Integer, Literal, Radix, TypeName},
    decode::{Context, Kind},
    errors::{DecodeError, ExpectedType},
    span::{Span, Spanned},
    traits::ErrorSpan,
};
use mass_index::{MassIndexError, MzTolerance};
use miette::{Diagnostic, LabeledSpan, NamedSource};
use thiserror::Error;

// Local Crate Imports
use crate::{
    CheckMode, IonNetworkError, MsMsParameters, NetworkingParameters, NeutralLossCheck, RefinementParameters,
    Result,
};

// Public API ==========================================================================================================

impl NetworkingParameters {
    /// Reads parameters from KDL, filling anything left unspecified with its default value
    pub fn from_kdl(
        db: &ModificationDatabase,
        file_name: impl AsRef<str>,
        kdl_text: impl AsRef<str>,
    ) -> miette::Result<Self> {
        let parsed: NetworkingParametersKdl = knuffel::parse(file_name.as_ref(), kdl_text.as_ref())?;
        parsed
            .validate(db)
            .map_err(|e| e.finalize(file_name, kdl_text).into())
    }

    /// Checks everything that can't be enforced by construction; ion libraries are validated when they're built
    pub fn validate(&self) -> Result<()> {
        validate_tolerance("m/z tolerance", self.tolerance)?;
        validate_height("minimum feature height", self.min_height)?;
        validate_height("minimum MS/MS signal height", self.msms.min_height)?;
        if let Some(tolerance) = self.msms.tolerance {
            validate_tolerance("MS/MS m/z tolerance", tolerance)?;
        }

        if let Some(tolerance) = self.refinement.mobility_tolerance {
            if !(tolerance.is_finite() && tolerance >= 0.0) {
                return Err(IonNetworkError::InvalidMobilityTolerance { tolerance });
            }
        }
        if self.refinement.min_network_size < 1 {
            return Err(IonNetworkError::InvalidNetworkSize {
                size: self.refinement.min_network_size,
            });
        }

        Ok(())
    }

    /// The tolerance used when searching fragment spectra
    #[must_use]
    pub fn msms_tolerance(&self) -> MzTolerance {
        self.msms.tolerance.unwrap_or(self.tolerance)
    }
}

impl Default for NetworkingParameters {
    fn default() -> Self {
        Self {
            tolerance: MzTolerance::default(),
            min_height: 0.0,
            check_mode: CheckMode::default(),
            library: IonLibrary::default(),
            msms: MsMsParameters::default(),
            refinement: RefinementParameters::default(),
        }
    }
}

impl Default for MsMsParameters {
    fn default() -> Self {
        Self {
            check_multimers: true,
            neutral_losses: NeutralLossCheck::default(),
            min_height: 0.0,
            tolerance: None,
        }
    }
}

impl Default for RefinementParameters {
    fn default() -> Self {
        Self {
            mobility_tolerance: None,
            min_network_size: 2,
        }
    }
}

impl Display for NetworkingParameters {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let ion_types = self.library.iter().map(ToString::to_string).collect::<Vec<_>>();
        writeln!(f, "m/z tolerance: {}", self.tolerance)?;
        writeln!(f, "minimum height: {}", self.min_height)?;
        writeln!(f, "check mode: {}", self.check_mode)?;
        writeln!(f, "ion types: {}", ion_types.join(", "))?;
        writeln!(f, "check multimers: {}", self.msms.check_multimers)?;
        writeln!(f, "check neutral losses: {}", self.msms.neutral_losses)?;
        writeln!(f, "minimum MS/MS height: {}", self.msms.min_height)?;
        writeln!(f, "MS/MS m/z tolerance: {}", self.msms_tolerance())?;
        match self.refinement.mobility_tolerance {
            Some(tolerance) => writeln!(f, "mobility tolerance: {tolerance}")?,
            None => writeln!(f, "mobility tolerance: off")?,
        }
        write!(f, "minimum network size: {}", self.refinement.min_network_size)
    }
}

// ---------------------------------------------------------------------------------------------------------------------

impl CheckMode {
    pub const ALL: [Self; 3] = [Self::Average, Self::SingleFeature, Self::AllFeatures];

    #[must_use]
    pub const fn kdl_name(&self) -> &'static str {
        match self {
            Self::Average => "average",
            Self::SingleFeature => "single-feature",
            Self::AllFeatures => "all-features",
        }
    }
}

impl NeutralLossCheck {
    pub const ALL: [Self; 3] = [Self::Off, Self::Precursor, Self::AnySignal];

    #[must_use]
    pub const fn kdl_name(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Precursor => "precursor",
            Self::AnySignal => "any-signal",
        }
    }
}

macro_rules! kdl_name_impls {
    ($($mode:ty),+ $(,)?) => {
        $(
            impl Display for $mode {
                fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.kdl_name())
                }
            }

            impl FromStr for $mode {
                type Err = String;

                fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                    Self::ALL
                        .into_iter()
                        .find(|mode| mode.kdl_name() == s)
                        .ok_or_else(|| s.to_owned())
                }
            }
        )+
    };
}

kdl_name_impls!(CheckMode, NeutralLossCheck);

// Private Methods =====================================================================================================

fn validate_tolerance(which: &'static str, tolerance: MzTolerance) -> Result<()> {
    MzTolerance::try_new(tolerance.mz_component(), tolerance.ppm_component())
        .map(drop)
        .map_err(|source| IonNetworkError::Tolerance { which, source })
}

fn validate_height(which: &'static str, height: f64) -> Result<()> {
    if height.is_finite() && height >= 0.0 {
        Ok(())
    } else {
        Err(IonNetworkError::InvalidHeight { which, height })
    }
}

// KDL File Schema =====================================================================================================

#[derive(Debug, Decode)]
#[knuffel(span_type=Span)]
struct NetworkingParametersKdl {
    #[knuffel(child)]
    mz_tolerance: Option<ToleranceKdl>,
    #[knuffel(child, unwrap(argument))]
    min_height: Option<Spanned<NumberKdl, Span>>,
    #[knuffel(child, unwrap(argument))]
    check_mode: Option<Spanned<String, Span>>,
    #[knuffel(child)]
    ion_library: Option<IonLibraryKdl>,
    #[knuffel(child)]
    msms: Option<MsMsKdl>,
    #[knuffel(child)]
    refinement: Option<RefinementKdl>,
}

#[derive(Debug, Decode)]
#[knuffel(span_type=Span)]
struct ToleranceKdl {
    #[knuffel(span)]
    span: Span,
    #[knuffel(argument)]
    mz: NumberKdl,
    #[knuffel(property(name = "ppm"))]
    ppm: Option<NumberKdl>,
}

#[derive(Debug, Decode)]
#[knuffel(span_type=Span)]
struct MsMsKdl {
    #[knuffel(child, unwrap(argument))]
    check_multimers: Option<bool>,
    #[knuffel(child, unwrap(argument))]
    neutral_losses: Option<Spanned<String, Span>>,
    #[knuffel(child, unwrap(argument))]
    min_height: Option<Spanned<NumberKdl, Span>>,
    #[knuffel(child)]
    tolerance: Option<ToleranceKdl>,
}

#[derive(Debug, Decode)]
#[knuffel(span_type=Span)]
struct RefinementKdl {
    #[knuffel(child, unwrap(argument))]
    mobility_tolerance: Option<Spanned<NumberKdl, Span>>,
    #[knuffel(child, unwrap(argument))]
    min_network_size: Option<Spanned<i64, Span>>,
}

// Lenient Parsing of KDL Numbers to f64 ==============================================================================

// NOTE: `knuffel` only decodes KDL decimals into floats, so this also accepts plain integers like `min-height 1000`
#[derive(Copy, Clone, Debug, Default)]
struct NumberKdl(f64);

impl Deref for NumberKdl {
    type Target = f64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S: ErrorSpan> DecodeScalar<S> for NumberKdl {
    fn type_check(type_name: &Option<Spanned<TypeName, S>>, ctx: &mut Context<S>) {
        if let Some(t) = type_name {
            ctx.emit_error(DecodeError::TypeName {
                span: t.span().clone(),
                found: Some(t.deref().clone()),
                expected: ExpectedType::no_type(),
                rust_type: "f64",
            });
        }
    }

    fn raw_decode(value: &Spanned<Literal, S>, ctx: &mut Context<S>) -> Result<Self, DecodeError<S>> {
        match &**value {
            Literal::Decimal(ast::Decimal(s)) | Literal::Int(Integer(Radix::Dec, s)) => {
                match s.replace('_', "").parse() {
                    Ok(number) => Ok(Self(number)),
                    Err(e) => {
                        ctx.emit_error(DecodeError::conversion(value, Box::new(e)));
                        Ok(Self::default())
                    }
                }
            }
            unsupported => {
                ctx.emit_error(DecodeError::unsupported(
                    value,
                    format!("expected a number, found {}", Kind::from(unsupported)),
                ));
                Ok(Self::default())
            }
        }
    }
}

// Contextual Validation ===============================================================================================

type ParametersResult<T> = std::result::Result<T, ParametersErrorKind>;

impl NetworkingParametersKdl {
    fn validate(self, db: &ModificationDatabase) -> ParametersResult<NetworkingParameters> {
        let defaults = NetworkingParameters::default();

        let tolerance = self
            .mz_tolerance
            .map_or(Ok(defaults.tolerance), ToleranceKdl::validate)?;
        let min_height = self.min_height.map_or(Ok(defaults.min_height), validate_kdl_height)?;
        let check_mode = self
            .check_mode
            .map_or(Ok(defaults.check_mode), |mode| {
                mode.parse()
                    .map_err(|name| ParametersErrorKind::UnknownCheckMode(*mode.span(), name))
            })?;
        let library = match self.ion_library {
            Some(library) => library.into_library(db).map_err(ParametersErrorKind::Library)?,
            None => defaults.library,
        };
        let msms = self
            .msms
            .map_or(Ok(defaults.msms), MsMsKdl::validate)?;
        let refinement = self
            .refinement
            .map_or(Ok(defaults.refinement), RefinementKdl::validate)?;

        Ok(NetworkingParameters {
            tolerance,
            min_height,
            check_mode,
            library,
            msms,
            refinement,
        })
    }
}

impl ToleranceKdl {
    fn validate(self) -> ParametersResult<MzTolerance> {
        MzTolerance::try_new(*self.mz, self.ppm.map_or(0.0, |ppm| *ppm))
            .map_err(|e| ParametersErrorKind::InvalidTolerance(self.span, e))
    }
}

impl MsMsKdl {
    fn validate(self) -> ParametersResult<MsMsParameters> {
        let defaults = MsMsParameters::default();

        let neutral_losses = self
            .neutral_losses
            .map_or(Ok(defaults.neutral_losses), |check| {
                check.parse().map_err(|name| {
                    ParametersErrorKind::UnknownNeutralLossCheck(*check.span(), name)
                })
            })?;

        Ok(MsMsParameters {
            check_multimers: self.check_multimers.unwrap_or(defaults.check_multimers),
            neutral_losses,
            min_height: self.min_height.map_or(Ok(defaults.min_height), validate_kdl_height)?,
            tolerance: self.tolerance.map(ToleranceKdl::validate).transpose()?,
        })
    }
}

impl RefinementKdl {
    fn validate(self) -> ParametersResult<RefinementParameters> {
        let defaults = RefinementParameters::default();

        let mobility_tolerance = match self.mobility_tolerance {
            Some(tolerance) if !(tolerance.is_finite() && **tolerance >= 0.0) => {
                return Err(ParametersErrorKind::InvalidMobilityTolerance(*tolerance.span(), **tolerance));
            }
            Some(tolerance) => Some(**tolerance),
            None => defaults.mobility_tolerance,
        };
        let min_network_size = match self.min_network_size {
            Some(size) => usize::try_from(*size)
                .ok()
                .filter(|&size| size >= 1)
                .ok_or(ParametersErrorKind::InvalidNetworkSize(*size.span(), *size))?,
            None => defaults.min_network_size,
        };

        Ok(RefinementParameters {
            mobility_tolerance,
            min_network_size,
        })
    }
}

fn validate_kdl_height(height: Spanned<NumberKdl, Span>) -> ParametersResult<f64> {
    let value = **height;
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ParametersErrorKind::InvalidHeight(*height.span(), value))
    }
}

// Validation Error Types and Trait Implementations ====================================================================

#[derive(Debug, Error)]
#[error("failed to validate ion networking parameters")]
pub struct ParametersError {
    kdl: NamedSource<String>,
    #[source]
    kind: ParametersErrorKind,
}

impl ParametersError {
    #[must_use]
    pub const fn kind(&self) -> &ParametersErrorKind {
        &self.kind
    }
}

// NOTE: This is manually implemented because the list of labels is dynamic and needs to be extracted from `self.kind`
impl Diagnostic for ParametersError {
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
pub enum ParametersErrorKind {
    #[error("{1:?} is not a check mode")]
    #[diagnostic(help("the check mode must be one of: average, single-feature, or all-features"))]
    UnknownCheckMode(Span, String),

    #[error("{1:?} is not a neutral loss check")]
    #[diagnostic(help("neutral losses can be checked against: off, precursor, or any-signal"))]
    UnknownNeutralLossCheck(Span, String),

    #[error("the m/z tolerance is invalid")]
    InvalidTolerance(
        Span,
        #[source]
        #[diagnostic_source]
        MassIndexError,
    ),

    #[error("minimum heights must not be negative, but {1} was given")]
    #[diagnostic(help("heights are intensities, so they must be finite and non-negative"))]
    InvalidHeight(Span, f64),

    #[error("the mobility tolerance must not be negative, but {1} was given")]
    #[diagnostic(help("remove the mobility tolerance to turn the multimer-fragment rule off"))]
    InvalidMobilityTolerance(Span, f64),

    #[error("the minimum network size must be at least 1, but {1} was given")]
    #[diagnostic(help("use 1 to keep every network, or 2 to drop networks left with a single row"))]
    InvalidNetworkSize(Span, i64),

    #[error("the ion library is invalid")]
    Library(
        #[source]
        #[diagnostic_source]
        ConfigErrorKind,
    ),
}

impl ParametersErrorKind {
    fn labels(&self) -> Vec<(&Span, &'static str)> {
        match self {
            Self::UnknownCheckMode(s, _) => vec![(s, "unknown check mode")],
            Self::UnknownNeutralLossCheck(s, _) => vec![(s, "unknown neutral loss check")],
            Self::InvalidTolerance(s, _) => vec![(s, "invalid tolerance")],
            Self::InvalidHeight(s, _) => vec![(s, "negative height")],
            Self::InvalidMobilityTolerance(s, _) => vec![(s, "negative tolerance")],
            Self::InvalidNetworkSize(s, _) => vec![(s, "must be at least 1")],
            Self::Library(kind) => kind.labels(),
        }
    }

    fn finalize(self, file_name: impl AsRef<str>, kdl: impl AsRef<str>) -> ParametersError {
        let kdl = NamedSource::new(file_name, kdl.as_ref().to_owned());
        ParametersError { kdl, kind: self }
    }
}

// Module Tests ========================================================================================================

#[cfg(test)]
mod tests {
    use std::sync::LazyLock;

    use assert_float_eq::assert_float_absolute_eq;
    use indoc::indoc;
    use insta::assert_snapshot;

    use super::*;

    static DB: LazyLock<ModificationDatabase> = LazyLock::new(ModificationDatabase::default);

    fn parse_parameters(kdl: &str) -> std::result::Result<NetworkingParameters, ParametersError> {
        let parameters: NetworkingParametersKdl = knuffel::parse("test", kdl).unwrap();
        parameters.validate(&DB).map_err(|e| e.finalize("test", kdl))
    }

    fn labels(error: &ParametersError) -> Vec<String> {
        error
            .labels()
            .into_iter()
            .flatten()
            .filter_map(|span| span.label().map(ToOwned::to_owned))
            .collect()
    }

    #[test]
    fn defaults() {
        let parameters = NetworkingParameters::default();
        assert_eq!(parameters.tolerance, MzTolerance::new(0.005, 10.0));
        assert_eq!(parameters.check_mode, CheckMode::SingleFeature);
        assert_eq!(parameters.library.max_molecules(), 2);
        assert_eq!(parameters.refinement.min_network_size, 2);
        assert_eq!(parameters.msms_tolerance(), parameters.tolerance);
        assert_eq!(parameters.validate(), Ok(()));
    }

    #[test]
    fn empty_kdl_gives_defaults() {
        assert_eq!(parse_parameters("").unwrap(), NetworkingParameters::default());
    }

    #[test]
    fn parse_full_parameters() {
        let kdl = indoc! {r#"
            mz-tolerance 0.002 ppm=5.0
            min-height 1000.0
            check-mode "all-features"
            ion-library {
                max-molecules 3
                adduct "H"
                adduct "Na"
                modification "H2O"
            }
            msms {
                check-multimers false
                neutral-losses "any-signal"
                min-height 50.0
                tolerance 0.01 ppm=20.0
            }
            refinement {
                mobility-tolerance 0.02
                min-network-size 3
            }
        "#};
        let parameters = parse_parameters(kdl).unwrap();
        assert_eq!(parameters.tolerance, MzTolerance::new(0.002, 5.0));
        assert_float_absolute_eq!(parameters.min_height, 1000.0);
        assert_eq!(parameters.check_mode, CheckMode::AllFeatures);
        assert_eq!(parameters.library.len(), 12);
        assert!(!parameters.msms.check_multimers);
        assert_eq!(parameters.msms.neutral_losses, NeutralLossCheck::AnySignal);
        assert_float_absolute_eq!(parameters.msms.min_height, 50.0);
        assert_eq!(parameters.msms_tolerance(), MzTolerance::new(0.01, 20.0));
        assert_eq!(parameters.refinement.mobility_tolerance, Some(0.02));
        assert_eq!(parameters.refinement.min_network_size, 3);
    }

    #[test]
    fn parse_absolute_tolerance() {
        let parameters = parse_parameters("mz-tolerance 0.01").unwrap();
        assert_eq!(parameters.tolerance, MzTolerance::absolute(0.01));
    }

    #[test]
    fn parse_integer_numbers() {
        let kdl = indoc! {r#"
            mz-tolerance 0 ppm=10
            min-height 1_000
            msms {
                min-height 50
            }
            refinement {
                mobility-tolerance 1
            }
        "#};
        let parameters = parse_parameters(kdl).unwrap();
        assert_eq!(parameters.tolerance, MzTolerance::ppm(10.0));
        assert_float_absolute_eq!(parameters.min_height, 1000.0);
        assert_float_absolute_eq!(parameters.msms.min_height, 50.0);
        assert_eq!(parameters.refinement.mobility_tolerance, Some(1.0));

        assert!(NetworkingParameters::from_kdl(&DB, "parameters.kdl", "min-height 0x10").is_err());
    }

    #[test]
    fn parse_unknown_check_mode() {
        let error = parse_parameters(r#"check-mode "most-features""#).unwrap_err();
        assert_snapshot!(error.kind(), @r#""most-features" is not a check mode"#);
        assert_eq!(labels(&error), ["unknown check mode"]);
    }

    #[test]
    fn parse_unknown_neutral_loss_check() {
        let kdl = indoc! {r#"
            msms {
                neutral-losses "everything"
            }
        "#};
        let error = parse_parameters(kdl).unwrap_err();
        assert_snapshot!(error.kind(), @r#""everything" is not a neutral loss check"#);
        assert_eq!(labels(&error), ["unknown neutral loss check"]);
    }

    #[test]
    fn parse_invalid_numbers() {
        let error = parse_parameters("mz-tolerance -0.1 ppm=10.0").unwrap_err();
        assert!(matches!(error.kind(), ParametersErrorKind::InvalidTolerance(..)));
        assert_eq!(labels(&error), ["invalid tolerance"]);

        let error = parse_parameters("min-height -5.0").unwrap_err();
        assert_snapshot!(error.kind(), @"minimum heights must not be negative, but -5 was given");

        let kdl = indoc! {r#"
            refinement {
                min-network-size 0
            }
        "#};
        let error = parse_parameters(kdl).unwrap_err();
        assert!(matches!(error.kind(), ParametersErrorKind::InvalidNetworkSize(_, 0)));

        let kdl = indoc! {r#"
            refinement {
                mobility-tolerance -1.0
            }
        "#};
        let error = parse_parameters(kdl).unwrap_err();
        assert_eq!(labels(&error), ["negative tolerance"]);
    }

    #[test]
    fn parse_invalid_library() {
        let kdl = indoc! {r#"
            ion-library {
                adduct "H"
                adduct "Xe"
            }
        "#};
        let error = parse_parameters(kdl).unwrap_err();
        assert!(matches!(
            error.kind(),
            ParametersErrorKind::Library(ConfigErrorKind::UnknownModification(_, key)) if key == "Xe"
        ));
        assert_eq!(labels(&error), ["unknown modification"]);
    }

    #[test]
    fn from_kdl() {
        let parameters = NetworkingParameters::from_kdl(&DB, "parameters.kdl", "check-mode \"average\"");
        assert_eq!(parameters.unwrap().check_mode, CheckMode::Average);
        assert!(NetworkingParameters::from_kdl(&DB, "parameters.kdl", "min-height \"tall\"").is_err());
    }

    #[test]
    fn validate() {
        let mut parameters = NetworkingParameters::default();
        parameters.min_height = -1.0;
        assert_eq!(
            parameters.validate(),
            Err(IonNetworkError::InvalidHeight {
                which: "minimum feature height",
                height: -1.0
            })
        );

        let mut parameters = NetworkingParameters::default();
        parameters.msms.tolerance = Some(MzTolerance::new(f64::NAN, 10.0));
        let error = parameters.validate().unwrap_err();
        assert!(error.is_configuration());
        assert_snapshot!(error, @"the MS/MS m/z tolerance is invalid");

        let mut parameters = NetworkingParameters::default();
        parameters.refinement.min_network_size = 0;
        assert_eq!(
            parameters.validate(),
            Err(IonNetworkError::InvalidNetworkSize { size: 0 })
        );

        let mut parameters = NetworkingParameters::default();
        parameters.refinement.mobility_tolerance = Some(-0.5);
        assert!(parameters.validate().is_err());
    }

    #[test]
    fn display_modes() {
        assert_snapshot!(CheckMode::AllFeatures, @"all-features");
        assert_snapshot!(NeutralLossCheck::AnySignal, @"any-signal");
        assert_eq!("precursor".parse(), Ok(NeutralLossCheck::Precursor));
        assert_eq!("average".parse(), Ok(CheckMode::Average));
    }
}
