// External Crate Imports
use log::{debug, trace};

// Local Crate Imports
use crate::{FeatureList, IonIdentity, IonNetwork, NetworkingParameters, RefinementParameters};

// Public API ==========================================================================================================

/// Resolves competing identities once all evidence is in. Identities are never removed, only marked rejected or
/// accepted, and the same input always refines the same way.
///
/// Each network is refined in three steps: identities that look like in-source fragments of a multimer in the same
/// network are rejected (only when a mobility tolerance is set), networks left with too few rows are rejected
/// outright, then every row accepts its identity with the most evidence (the first one, on ties).
pub fn refine_group(networks: &mut [IonNetwork], feature_list: &FeatureList, parameters: &NetworkingParameters) {
    let RefinementParameters {
        mobility_tolerance,
        min_network_size,
    } = parameters.refinement;

    for network in networks {
        if let Some(mobility_tolerance) = mobility_tolerance {
            reject_multimer_fragments(network, feature_list, mobility_tolerance);
        }

        let members = network.members().len();
        if members < min_network_size {
            debug!(
                "rejecting network {} with {members} rows (fewer than {min_network_size})",
                network.id()
            );
            network.identities_mut().iter_mut().for_each(IonIdentity::reject);
        }

        accept_best_identities(network);
    }
}

// Private Methods =====================================================================================================

fn reject_multimer_fragments(network: &mut IonNetwork, feature_list: &FeatureList, mobility_tolerance: f64) {
    let mobility = |identity: &IonIdentity| feature_list.row(identity.row()).and_then(|row| row.mobility());

    let identities = network.identities();
    let fragments: Vec<_> = identities
        .iter()
        .enumerate()
        .filter(|&(_, candidate)| {
            identities.iter().any(|sibling| {
                is_multimer_fragment(candidate, sibling, mobility(candidate), mobility(sibling), mobility_tolerance)
            })
        })
        .map(|(index, _)| index)
        .collect();

    let identities = network.identities_mut();
    for index in fragments {
        trace!("rejecting {} as an in-source multimer fragment", identities[index]);
        identities[index].reject();
    }
}

/// A candidate looks like a fragment of its sibling if it has fewer molecules, carries a subset of the sibling's
/// adducts, and drifts with it (within `mobility_tolerance`) despite belonging to a different row
fn is_multimer_fragment(
    candidate: &IonIdentity,
    sibling: &IonIdentity,
    candidate_mobility: Option<f64>,
    sibling_mobility: Option<f64>,
    mobility_tolerance: f64,
) -> bool {
    let (Some(candidate_mobility), Some(sibling_mobility)) = (candidate_mobility, sibling_mobility) else {
        return false;
    };

    candidate.row() != sibling.row()
        && !sibling.is_rejected()
        && candidate.ion_type().molecules() < sibling.ion_type().molecules()
        && (candidate_mobility - sibling_mobility).abs() < mobility_tolerance
        && candidate
            .ion_type()
            .adduct()
            .is_subset_of(sibling.ion_type().adduct())
}

fn accept_best_identities(network: &mut IonNetwork) {
    let identities = network.identities();
    let mut best = Vec::new();
    for row in network.members() {
        let mut row_best: Option<usize> = None;
        for (index, identity) in identities.iter().enumerate() {
            if identity.row() != row || identity.is_rejected() {
                continue;
            }
            if row_best.is_none_or(|current| identity.evidence_count() > identities[current].evidence_count()) {
                row_best = Some(index);
            }
        }
        best.extend(row_best);
    }

    let identities = network.identities_mut();
    for index in best {
        identities[index].accept();
    }
}

// Module Tests ========================================================================================================
