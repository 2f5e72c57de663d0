//! Proposes, assembles, verifies, and refines ion identity networks over correlated feature-list rows

mod assembler;
mod errors;
mod features;
mod identity;
mod matcher;
mod network;
mod parameters;
mod pipeline;
mod refiner;
mod verifier;

// Standard Library Imports
use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicBool, AtomicUsize},
};

// External Crate Imports
use ahash::HashMap;
use derive_more::{Display, From};
use ionchem::{IonLibrary, IonType};
use mass_index::{MzTolerance, Peak, Scan};

// Public API ==========================================================================================================

pub use assembler::{UnionFind, assemble_group};
pub use errors::{IonNetworkError, Result};
pub use matcher::find_matches;
pub use parameters::{ParametersError, ParametersErrorKind};
pub use pipeline::run;
pub use refiner::refine_group;
pub use verifier::{check_multimer_ladder, check_neutral_loss, verify_row};

// Re-exported so that callers can build inputs without depending on the lower-level crates themselves
pub use ionchem;
pub use mass_index;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, From)]
pub struct RowId(pub usize);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, From)]
pub struct GroupId(pub usize);

/// Networks are named after the smallest row id among their members
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, From)]
#[display("#{_0}")]
pub struct NetworkId(pub RowId);

// ---------------------------------------------------------------------------------------------------------------------

/// One raw file's measurement of a feature
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Feature {
    pub mz: f64,
    pub height: f64,
}

#[derive(Clone, PartialEq, Debug)]
pub struct FeatureRow {
    id: RowId,
    average_mz: f64,
    retention_time: f64,
    mobility: Option<f64>,
    features: BTreeMap<String, Feature>,
    fragment_scans: Vec<Scan>,
    ion_identities: Vec<IonIdentity>,
}

/// A set of rows believed to co-elute from the same analyte, supplied by an upstream correlation step
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct CorrelationGroup {
    id: GroupId,
    rows: Vec<RowId>,
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct AppliedMethod {
    pub description: String,
    pub parameters: String,
}

#[derive(Clone, PartialEq, Debug, Default)]
pub struct FeatureList {
    rows: Vec<FeatureRow>,
    row_index: HashMap<RowId, usize>,
    groups: Vec<CorrelationGroup>,
    networks: Vec<NetworkSummary>,
    applied_methods: Vec<AppliedMethod>,
}

// ---------------------------------------------------------------------------------------------------------------------

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display)]
pub enum IdentityState {
    Proposed,
    Evidenced,
    Accepted,
    Rejected,
}

/// The hypothesis that a row was observed as a particular ion type
#[derive(Clone, PartialEq, Debug)]
pub struct IonIdentity {
    row: RowId,
    ion_type: IonType,
    neutral_mass: f64,
    network: Option<NetworkId>,
    partners: BTreeMap<RowId, IonType>,
    evidence: Vec<MsMsEvidence>,
    state: IdentityState,
}

#[derive(Clone, PartialEq, Debug)]
pub enum MsMsEvidence {
    MultimerLadder(MultimerLadder),
    NeutralLoss(NeutralLossMatch),
}

/// Fragment-spectrum support for a multimer: the orders observed and the links between them
#[derive(Clone, PartialEq, Debug)]
pub struct MultimerLadder {
    scan_number: usize,
    tolerance: MzTolerance,
    rungs: Vec<LadderRung>,
    links: Vec<LadderLink>,
}

/// One order of a multimer ladder, backed either by an observed peak or (for the precursor's own order) by the
/// precursor itself
#[derive(Clone, PartialEq, Debug)]
pub struct LadderRung {
    pub ion_type: IonType,
    pub mz: f64,
    pub peak: Option<Peak>,
}

/// Connects two rungs (by index) of the same ladder; links read the same in either direction
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct LadderLink {
    pub lower: usize,
    pub higher: usize,
}

/// A pair of signals in a partner row's fragment spectrum that are separated by an identity's modification
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct NeutralLossMatch {
    pub partner: RowId,
    pub scan_number: usize,
    pub tolerance: MzTolerance,
    pub loss_mz: f64,
    /// The signal that lost the modification, or `None` if it was the partner's precursor
    pub parent: Option<Peak>,
    pub fragment: Peak,
}

// ---------------------------------------------------------------------------------------------------------------------

/// A connected set of identities within one correlation group
#[derive(Clone, PartialEq, Debug)]
pub struct IonNetwork {
    id: NetworkId,
    group: GroupId,
    identities: Vec<IonIdentity>,
}

#[derive(Clone, PartialEq, Debug)]
pub struct NetworkSummary {
    pub id: NetworkId,
    pub group: GroupId,
    pub members: usize,
    pub neutral_mass: f64,
    pub retention_time: f64,
    pub accepted: Vec<(RowId, IonType)>,
    pub rejected: Vec<(RowId, IonType)>,
}

// ---------------------------------------------------------------------------------------------------------------------

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum CheckMode {
    Average,
    #[default]
    SingleFeature,
    AllFeatures,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum NeutralLossCheck {
    Off,
    #[default]
    Precursor,
    AnySignal,
}

#[derive(Clone, PartialEq, Debug)]
pub struct NetworkingParameters {
    pub tolerance: MzTolerance,
    pub min_height: f64,
    pub check_mode: CheckMode,
    pub library: IonLibrary,
    pub msms: MsMsParameters,
    pub refinement: RefinementParameters,
}

#[derive(Copy, Clone, PartialEq, Debug)]
pub struct MsMsParameters {
    pub check_multimers: bool,
    pub neutral_losses: NeutralLossCheck,
    pub min_height: f64,
    /// Falls back to the MS1 tolerance when `None`
    pub tolerance: Option<MzTolerance>,
}

#[derive(Copy, Clone, PartialEq, Debug)]
pub struct RefinementParameters {
    /// Enables the multimer-fragment rule when set
    pub mobility_tolerance: Option<f64>,
    pub min_network_size: usize,
}

// ---------------------------------------------------------------------------------------------------------------------

/// Shared between a running pipeline and whoever is watching it
#[derive(Debug, Default)]
pub struct TaskControl {
    canceled: AtomicBool,
    processed_rows: AtomicUsize,
    total_rows: AtomicUsize,
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub enum TaskStatus {
    Finished,
    Canceled { completed_rows: usize },
    Error(String),
}
