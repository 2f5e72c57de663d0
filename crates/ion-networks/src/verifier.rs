// External Crate Imports
use ionchem::IonType;
use log::{trace, warn};
use mass_index::{MassIndexError, MzTolerance, Peak, SpectralIndex};
use rayon::prelude::*;

// Local Crate Imports
use crate::{
    FeatureList, FeatureRow, IonIdentity, IonNetwork, LadderRung, MsMsEvidence, MultimerLadder, NetworkingParameters,
    NeutralLossCheck, NeutralLossMatch, RowId, TaskControl,
};

// Public API ==========================================================================================================

/// Looks for the lower orders of a multimer in its fragment spectrum. The precursor stands in for the multimer's own
/// order, while every other order needs a peak; each pair of orders that are both present is linked.
///
/// Single-molecule ion types have no ladder to climb, so they always produce an empty ladder.
#[must_use]
pub fn check_multimer_ladder(
    spectrum: &SpectralIndex,
    scan_number: usize,
    precursor_mz: f64,
    ion_type: &IonType,
    tolerance: MzTolerance,
    min_height: f64,
) -> MultimerLadder {
    let mut ladder = MultimerLadder::new(scan_number, tolerance);
    if !ion_type.is_multimer() {
        return ladder;
    }

    let neutral_mass = ion_type.neutral_mass(precursor_mz);
    let mut present = Vec::new();
    for order in ion_type.ladder() {
        let mz = order.mz(neutral_mass);
        let peak = spectrum.nearest(mz, tolerance, min_height).map(Peak::from);
        // NOTE: The last order of the ladder is the precursor's own
        if peak.is_some() || order.molecules() == ion_type.molecules() {
            let rung = ladder.add_rung(LadderRung {
                ion_type: order,
                mz,
                peak,
            });
            present.push(rung);
        }
    }

    for (i, &lower) in present.iter().enumerate() {
        for &higher in &present[i + 1..] {
            ladder.add_link(lower, higher);
        }
    }

    ladder
}

/// Searches the most intense fragment spectrum of `partner` for signals separated by `loss_mz`. The partner's
/// precursor is always tried as the signal that lost the modification, and is paired with its nearest fragment;
/// [`NeutralLossCheck::AnySignal`] also tries every peak in the spectrum, pairing it with every fragment in range.
///
/// Partners without fragment spectra have nothing to offer, but a spectrum without a mass list is an error.
pub fn check_neutral_loss(
    partner: &FeatureRow,
    loss_mz: f64,
    tolerance: MzTolerance,
    min_height: f64,
    mode: NeutralLossCheck,
) -> Result<Vec<NeutralLossMatch>, MassIndexError> {
    let Some(scan) = partner.most_intense_scan() else {
        return Ok(Vec::new());
    };
    if mode == NeutralLossCheck::Off {
        return Ok(Vec::new());
    }
    let spectrum = scan.mass_list()?;

    let found = |parent, fragment| NeutralLossMatch {
        partner: partner.id(),
        scan_number: scan.scan_number(),
        tolerance,
        loss_mz,
        parent,
        fragment,
    };

    let mut matches: Vec<_> = spectrum
        .nearest(scan.precursor_mz() - loss_mz, tolerance, min_height)
        .map(|fragment| found(None, fragment.into()))
        .into_iter()
        .collect();

    if mode == NeutralLossCheck::AnySignal {
        for parent in spectrum.peaks_above(min_height) {
            let fragments = spectrum
                .find_peaks(parent.mz - loss_mz, tolerance, min_height)
                .filter(|&fragment| !std::ptr::eq(fragment, parent));
            matches.extend(fragments.map(|fragment| found(Some(parent.into()), fragment.into())));
        }
    }

    Ok(matches)
}

/// Gathers fragment evidence for the identities `row` holds in `network`, paired with each identity's index in
/// [`IonNetwork::identities()`]. Nothing is written, so rows can be verified in parallel.
///
/// Of all the multimer ladders found on the row's precursor, only the one with the most links is kept, and ties go to
/// the ion type that comes first in the library. Rows (or partners) whose spectra lack mass lists are skipped.
pub fn verify_row(
    row: RowId,
    network: &IonNetwork,
    feature_list: &FeatureList,
    parameters: &NetworkingParameters,
) -> Vec<(usize, MsMsEvidence)> {
    let Some(feature_row) = feature_list.row(row) else {
        return Vec::new();
    };
    let identities: Vec<_> = network
        .identities()
        .iter()
        .enumerate()
        .filter(|(_, identity)| identity.row() == row)
        .collect();

    let mut evidence = Vec::new();
    if parameters.msms.check_multimers {
        evidence.extend(best_ladder(feature_row, &identities, parameters));
    }
    if parameters.msms.neutral_losses != NeutralLossCheck::Off {
        for &(index, identity) in identities.iter().filter(|(_, identity)| identity.ion_type().is_modified()) {
            evidence.extend(
                neutral_losses(identity, network, feature_list, parameters)
                    .into_iter()
                    .map(|neutral_loss| (index, MsMsEvidence::NeutralLoss(neutral_loss))),
            );
        }
    }

    evidence
}

// Private Methods =====================================================================================================

/// Returns `false`, leaving `network` untouched, if `control` was canceled before every row had been verified
pub(crate) fn verify_network(
    network: &mut IonNetwork,
    feature_list: &FeatureList,
    parameters: &NetworkingParameters,
    control: &TaskControl,
) -> bool {
    let rows: Vec<_> = network.rows().into_iter().collect();
    let shared: &IonNetwork = network;
    let evidence: Option<Vec<_>> = rows
        .par_iter()
        .map(|&row| (!control.is_canceled()).then(|| verify_row(row, shared, feature_list, parameters)))
        .collect();
    let Some(evidence) = evidence else {
        return false;
    };

    let identities = network.identities_mut();
    for (index, evidence) in evidence.into_iter().flatten() {
        identities[index].add_evidence(evidence);
    }
    true
}

fn best_ladder(
    row: &FeatureRow,
    identities: &[(usize, &IonIdentity)],
    parameters: &NetworkingParameters,
) -> Option<(usize, MsMsEvidence)> {
    let mut multimers: Vec<_> = identities
        .iter()
        .filter(|(_, identity)| identity.ion_type().is_multimer())
        .collect();
    if multimers.is_empty() {
        return None;
    }
    multimers.sort_by_key(|(_, identity)| parameters.library.position(identity.ion_type()).unwrap_or(usize::MAX));

    let scan = row.most_intense_scan()?;
    let spectrum = match scan.mass_list() {
        Ok(spectrum) => spectrum,
        Err(error) => {
            warn!("skipping the multimer check of row {}: {error}", row.id());
            return None;
        }
    };

    let mut best: Option<(usize, MultimerLadder)> = None;
    for &&(index, identity) in &multimers {
        let ladder = check_multimer_ladder(
            spectrum,
            scan.scan_number(),
            scan.precursor_mz(),
            identity.ion_type(),
            parameters.msms_tolerance(),
            parameters.msms.min_height,
        );
        let links = ladder.links().len();
        trace!("row {} as {} has a ladder with {links} links", row.id(), identity.ion_type());

        if best.as_ref().is_none_or(|(_, best)| links > best.links().len()) {
            best = Some((index, ladder));
        }
    }

    best.filter(|(_, ladder)| !ladder.is_empty())
        .map(|(index, ladder)| (index, MsMsEvidence::MultimerLadder(ladder)))
}

/// Partners are the other rows of the identity's network, or its direct partners when it isn't part of one
fn neutral_losses(
    identity: &IonIdentity,
    network: &IonNetwork,
    feature_list: &FeatureList,
    parameters: &NetworkingParameters,
) -> Vec<NeutralLossMatch> {
    let partners: Vec<RowId> = if identity.network().is_some() {
        network.rows().into_iter().filter(|&row| row != identity.row()).collect()
    } else {
        identity.partners().keys().copied().collect()
    };
    let loss_mz = identity.ion_type().modification_mz();

    let mut matches = Vec::new();
    for partner in partners.into_iter().filter_map(|row| feature_list.row(row)) {
        match check_neutral_loss(
            partner,
            loss_mz,
            parameters.msms_tolerance(),
            parameters.msms.min_height,
            parameters.msms.neutral_losses,
        ) {
            Ok(found) => matches.extend(found),
            Err(error) => warn!("skipping the neutral-loss check of row {}: {error}", partner.id()),
        }
    }

    matches
}

// Module Tests ========================================================================================================
