// Standard Library Imports
use std::{error::Error, sync::atomic::Ordering};

// External Crate Imports
use log::{error, info};
use rayon::prelude::*;

// Local Crate Imports
use crate::{
    AppliedMethod, CorrelationGroup, FeatureList, GroupId, IonIdentity, IonNetwork, IonNetworkError,
    NetworkingParameters, Result, RowId, TaskControl, TaskStatus, assemble_group, refine_group,
    verifier::verify_network,
};

const DESCRIPTION: &str = "Ion identity networking";

// Public API ==========================================================================================================

impl TaskControl {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks a running pipeline to stop; groups that are already finished will still be committed
    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn processed_rows(&self) -> usize {
        self.processed_rows.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn total_rows(&self) -> usize {
        self.total_rows.load(Ordering::Relaxed)
    }

    /// The fraction of rows processed so far, which only ever grows over the course of a run
    #[must_use]
    pub fn progress(&self) -> f64 {
        let total_rows = self.total_rows();
        if total_rows == 0 {
            return 0.0;
        }

        #[expect(clippy::cast_precision_loss)]
        let fraction = self.processed_rows() as f64 / total_rows as f64;
        fraction.min(1.0)
    }

    fn start(&self, total_rows: usize) {
        self.processed_rows.store(0, Ordering::Relaxed);
        self.total_rows.store(total_rows, Ordering::Relaxed);
    }

    fn advance(&self, rows: usize) {
        self.processed_rows.fetch_add(rows, Ordering::Relaxed);
    }
}

/// Builds ion identity networks for every correlation group of `feature_list`, then writes each row's identities
/// (and a summary of every network) back onto it.
///
/// Groups are processed in parallel, but results are only written once every group has finished. Groups are
/// committed whole, so a canceled run keeps the groups that finished before it stopped, and a failed run keeps the
/// groups that come before the one that failed. Invalid parameters or groups fail the run before anything is written.
pub fn run(feature_list: &mut FeatureList, parameters: &NetworkingParameters, control: &TaskControl) -> TaskStatus {
    if let Err(error) = parameters.validate().and_then(|()| feature_list.validate_groups()) {
        error!("refusing to build ion identity networks: {error}");
        return TaskStatus::Error(error_message(&error));
    }

    let total_rows = feature_list.groups().iter().map(CorrelationGroup::len).sum();
    control.start(total_rows);
    info!(
        "building ion identity networks for {total_rows} rows in {} correlation groups",
        feature_list.groups().len()
    );

    let shared: &FeatureList = feature_list;
    let outcomes: Vec<_> = shared
        .groups()
        .par_iter()
        .map(|group| process_group(group, shared, parameters, control))
        .collect();

    let mut committed = Vec::new();
    let mut status = TaskStatus::Finished;
    for outcome in outcomes {
        match outcome {
            Some(Ok(outcome)) => committed.push(outcome),
            Some(Err(error)) => {
                error!("stopped building ion identity networks: {error}");
                status = TaskStatus::Error(error_message(&error));
                break;
            }
            None => {
                status = TaskStatus::Canceled { completed_rows: 0 };
            }
        }
    }

    let completed_rows = commit(feature_list, committed);
    feature_list.add_applied_method(AppliedMethod {
        description: DESCRIPTION.to_owned(),
        parameters: parameters.to_string(),
    });

    if let TaskStatus::Canceled { .. } = status {
        info!("canceled after building ion identity networks for {completed_rows} of {total_rows} rows");
        return TaskStatus::Canceled { completed_rows };
    }
    if status == TaskStatus::Finished {
        info!(
            "found {} ion identity networks across {completed_rows} rows",
            feature_list.networks().len()
        );
    }
    status
}

// Private Types =======================================================================================================

struct GroupOutcome {
    group: GroupId,
    rows: Vec<RowId>,
    networks: Vec<IonNetwork>,
}

// Private Methods =====================================================================================================

/// `None` means that the group was abandoned after `control` was canceled
fn process_group(
    group: &CorrelationGroup,
    feature_list: &FeatureList,
    parameters: &NetworkingParameters,
    control: &TaskControl,
) -> Option<Result<GroupOutcome>> {
    if control.is_canceled() {
        return None;
    }

    let mut networks = match assemble_group(group, feature_list, parameters) {
        Ok(networks) => networks,
        Err(error) => return Some(Err(error.in_group(group.id()))),
    };
    for network in &mut networks {
        if !verify_network(network, feature_list, parameters, control) {
            return None;
        }
    }
    refine_group(&mut networks, feature_list, parameters);

    control.advance(group.len());
    Some(Ok(GroupOutcome {
        group: group.id(),
        rows: group.rows().to_vec(),
        networks,
    }))
}

/// Writes finished groups back onto the feature list in a single pass, returning the number of rows committed
fn commit(feature_list: &mut FeatureList, outcomes: Vec<GroupOutcome>) -> usize {
    let summaries: Vec<_> = outcomes
        .iter()
        .flat_map(|outcome| &outcome.networks)
        .map(|network| network.summary(feature_list))
        .filter(|summary| summary.members > 0)
        .collect();

    let mut completed_rows = 0;
    for GroupOutcome {
        group,
        rows,
        networks,
    } in outcomes
    {
        let mut identities: Vec<IonIdentity> = networks.into_iter().flat_map(IonNetwork::into_identities).collect();
        for row in rows {
            let (kept, rest): (Vec<_>, Vec<_>) = identities.into_iter().partition(|identity| identity.row() == row);
            identities = rest;

            // SAFETY: Groups were validated against the feature list before any of them were processed
            let feature_row = feature_list.row_mut(row).expect("row missing from a validated group");
            feature_row.set_ion_identities(kept);
            completed_rows += 1;
        }
        debug_assert!(identities.is_empty(), "group {group} produced identities for rows outside of it");
    }

    feature_list.set_networks(summaries);
    completed_rows
}

/// Includes every underlying cause, since the status message is all that reaches the caller
fn error_message(error: &IonNetworkError) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

// Module Tests ========================================================================================================
