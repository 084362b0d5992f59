//! Read-triggered reconciliation.
//!
//! Contracts surfaced by a read are brought up to their time-derived status
//! before the caller sees them, and the change is written back on the way
//! out. A failed write never fails the read: it is logged and the in-memory
//! status is returned anyway. A write is dropped when the stored status moved
//! after the read, so a reconciliation never overwrites a concurrent
//! lifecycle change.
use super::contract::{Contract, ContractStatus, TimeStamp};
use super::error::StoreError;
use super::lifecycle;
use super::store::ContractStore;
use chrono::Utc;
use std::collections::HashMap;
use tracing::{debug, warn};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Ids whose reconciled status was written back.
    pub persisted: Vec<String>,
    /// Ids whose write failed, with the store's error message.
    pub failed: Vec<(String, String)>,
    /// Ids left alone because their stored status changed since the read.
    pub skipped: Vec<String>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Contracts re-evaluated in memory, with the status each had in the store.
#[derive(Debug)]
pub struct Staged {
    contracts: Vec<Contract>,
    stored: HashMap<String, ContractStatus>,
}

impl Staged {
    pub fn contracts(&self) -> &[Contract] {
        &self.contracts
    }
}

pub struct Reconciler<'a, S: ContractStore + ?Sized> {
    store: &'a S,
    now: TimeStamp<Utc>,
}

impl<'a, S: ContractStore + ?Sized> Reconciler<'a, S> {
    pub fn new(store: &'a S, now: TimeStamp<Utc>) -> Self {
        Self { store, now }
    }

    /// Applies the automatic transition to every contract without touching
    /// the store.
    pub fn stage(&self, contracts: Vec<Contract>) -> Staged {
        let mut stored = HashMap::with_capacity(contracts.len());
        let contracts = contracts
            .into_iter()
            .map(|mut contract| {
                stored.insert(contract.id.clone(), contract.status());
                contract.apply(&lifecycle::reconcile_automatic(&contract, &self.now));
                contract
            })
            .collect();

        Staged { contracts, stored }
    }

    /// Narrows the staged contracts with `select` (a filter or a page), then
    /// persists the ones whose status moved. Only selected contracts are
    /// written.
    pub fn commit<F>(&self, staged: Staged, select: F) -> (Vec<Contract>, ReconcileReport)
    where
        F: FnOnce(Vec<Contract>) -> Vec<Contract>,
    {
        let Staged { contracts, stored } = staged;
        let selected = select(contracts);
        let mut report = ReconcileReport::default();

        for contract in &selected {
            match stored.get(&contract.id) {
                Some(&before) if before != contract.status() => {
                    self.persist(before, contract, &mut report)
                }
                _ => {}
            }
        }

        (selected, report)
    }

    fn persist(&self, before: ContractStatus, contract: &Contract, report: &mut ReconcileReport) {
        match self.store.update_if_status(&contract.id, before, contract) {
            Ok(()) => {
                debug!(
                    contract_id = %contract.id,
                    status = %contract.status(),
                    "persisted reconciled status"
                );
                report.persisted.push(contract.id.clone());
            }
            Err(StoreError::StatusChanged { found, .. }) => {
                debug!(
                    contract_id = %contract.id,
                    status = %contract.status(),
                    %found,
                    "stored status changed since the read, not persisting"
                );
                report.skipped.push(contract.id.clone());
            }
            Err(err) => {
                warn!(
                    contract_id = %contract.id,
                    status = %contract.status(),
                    error = %err,
                    "failed to persist reconciled status, returning in-memory state"
                );
                report.failed.push((contract.id.clone(), err.to_string()));
            }
        }
    }

    pub fn reconcile(&self, mut contract: Contract) -> (Contract, ReconcileReport) {
        let mut report = ReconcileReport::default();
        let before = contract.status();
        if contract.apply(&lifecycle::reconcile_automatic(&contract, &self.now)) {
            self.persist(before, &contract, &mut report);
        }
        (contract, report)
    }

    pub fn reconcile_all(&self, contracts: Vec<Contract>) -> (Vec<Contract>, ReconcileReport) {
        self.commit(self.stage(contracts), |all| all)
    }
}
