// Standard Library Imports
use std::{
    collections::BTreeMap,
    fmt::{self, Display, Formatter},
};

// External Crate Imports
use ionchem::IonType;
use mass_index::MzTolerance;

// Local Crate Imports
use crate::{IdentityState, IonIdentity, LadderLink, LadderRung, MsMsEvidence, MultimerLadder, NetworkId, RowId};

// Public API ==========================================================================================================

impl IonIdentity {
    #[must_use]
    pub const fn new(row: RowId, ion_type: IonType, neutral_mass: f64) -> Self {
        Self {
            row,
            ion_type,
            neutral_mass,
            network: None,
            partners: BTreeMap::new(),
            evidence: Vec::new(),
            state: IdentityState::Proposed,
        }
    }

    #[must_use]
    pub const fn row(&self) -> RowId {
        self.row
    }

    #[must_use]
    pub const fn ion_type(&self) -> &IonType {
        &self.ion_type
    }

    /// The neutral mass of one analyte molecule implied by this identity
    #[must_use]
    pub const fn neutral_mass(&self) -> f64 {
        self.neutral_mass
    }

    #[must_use]
    pub const fn network(&self) -> Option<NetworkId> {
        self.network
    }

    /// Partner rows, and the ion type each partner was matched as
    #[must_use]
    pub const fn partners(&self) -> &BTreeMap<RowId, IonType> {
        &self.partners
    }

    #[must_use]
    pub fn evidence(&self) -> &[MsMsEvidence] {
        &self.evidence
    }

    #[must_use]
    pub const fn state(&self) -> IdentityState {
        self.state
    }

    #[must_use]
    pub fn is_rejected(&self) -> bool {
        self.state == IdentityState::Rejected
    }

    /// Ladders count once per link; every neutral loss counts once
    #[must_use]
    pub fn evidence_count(&self) -> usize {
        self.evidence.iter().map(MsMsEvidence::links).sum()
    }

    // NOTE: The first ion type recorded for a partner is kept, so partner maps never depend on anything but the order
    // in which matches were found
    pub(crate) fn add_partner(&mut self, partner: RowId, ion_type: &IonType) {
        self.partners.entry(partner).or_insert_with(|| ion_type.clone());
    }

    pub(crate) const fn set_network(&mut self, network: NetworkId) {
        self.network = Some(network);
    }

    pub(crate) fn add_evidence(&mut self, evidence: MsMsEvidence) {
        self.evidence.push(evidence);
        if self.state == IdentityState::Proposed {
            self.state = IdentityState::Evidenced;
        }
    }

    pub(crate) fn accept(&mut self) {
        if !self.is_rejected() {
            self.state = IdentityState::Accepted;
        }
    }

    pub(crate) const fn reject(&mut self) {
        self.state = IdentityState::Rejected;
    }
}

impl Display for IonIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} of row {}", self.ion_type, self.row)?;
        if let Some(network) = self.network {
            write!(f, " in network {network}")?;
        }
        write!(f, " ({}, {} evidence)", self.state, self.evidence_count())
    }
}

// ---------------------------------------------------------------------------------------------------------------------

impl MsMsEvidence {
    #[must_use]
    pub fn links(&self) -> usize {
        match self {
            Self::MultimerLadder(ladder) => ladder.links().len(),
            Self::NeutralLoss(_) => 1,
        }
    }

    #[must_use]
    pub const fn tolerance(&self) -> MzTolerance {
        match self {
            Self::MultimerLadder(ladder) => ladder.tolerance,
            Self::NeutralLoss(neutral_loss) => neutral_loss.tolerance,
        }
    }

    #[must_use]
    pub const fn scan_number(&self) -> usize {
        match self {
            Self::MultimerLadder(ladder) => ladder.scan_number,
            Self::NeutralLoss(neutral_loss) => neutral_loss.scan_number,
        }
    }
}

// ---------------------------------------------------------------------------------------------------------------------

impl MultimerLadder {
    #[must_use]
    pub const fn new(scan_number: usize, tolerance: MzTolerance) -> Self {
        Self {
            scan_number,
            tolerance,
            rungs: Vec::new(),
            links: Vec::new(),
        }
    }

    #[must_use]
    pub const fn scan_number(&self) -> usize {
        self.scan_number
    }

    #[must_use]
    pub const fn tolerance(&self) -> MzTolerance {
        self.tolerance
    }

    #[must_use]
    pub fn rungs(&self) -> &[LadderRung] {
        &self.rungs
    }

    #[must_use]
    pub fn links(&self) -> &[LadderLink] {
        &self.links
    }

    /// A ladder without links carries no evidence, even if it has rungs
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// The indices of every rung linked to `rung`, looking both up and down the ladder
    pub fn linked(&self, rung: usize) -> impl Iterator<Item = usize> + '_ {
        self.links.iter().filter_map(move |link| {
            if link.lower == rung {
                Some(link.higher)
            } else if link.higher == rung {
                Some(link.lower)
            } else {
                None
            }
        })
    }

    pub(crate) fn add_rung(&mut self, rung: LadderRung) -> usize {
        self.rungs.push(rung);
        self.rungs.len() - 1
    }

    pub(crate) fn add_link(&mut self, lower: usize, higher: usize) {
        self.links.push(LadderLink { lower, higher });
    }
}

// Module Tests ========================================================================================================
