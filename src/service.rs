//! Service layer API for contract operations
use super::clock::{Clock, SystemClock};
use super::config::Config;
use super::contract::{Contract, ContractDetails, ContractStatus};
use super::error::{ServiceError, StoreError, ValidationError};
use super::lifecycle::{self, Action, Reason, Transition};
use super::query::{ContractFilter, Criteria, CriteriaFilter};
use super::reconcile::Reconciler;
use super::store::{ContractStore, SledStore};
use super::utils;
use tracing::{debug, error, info};

/// Attempts at a guarded write before a concurrent status change is reported
/// as a failure. A status can move at most this many times.
const WRITE_ATTEMPTS: usize = ContractStatus::ALL.len();

/// Result of an explicit lifecycle request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleOutcome {
    Applied(Contract),
    /// Legally rejected; the contract is returned unchanged.
    NotApplicable {
        contract: Contract,
        reason: Reason,
    },
    NotFound,
}

impl LifecycleOutcome {
    pub fn contract(&self) -> Option<&Contract> {
        match self {
            LifecycleOutcome::Applied(contract)
            | LifecycleOutcome::NotApplicable { contract, .. } => Some(contract),
            LifecycleOutcome::NotFound => None,
        }
    }
}

pub struct ContractService<S: ContractStore> {
    store: S,
    filter: Box<dyn ContractFilter>,
    clock: Box<dyn Clock>,
    id_prefix: String,
}

impl ContractService<SledStore> {
    pub fn from_config(config: &Config) -> Result<Self, ServiceError> {
        Ok(Self::new(config.open_store()?).with_id_prefix(&config.id_prefix))
    }
}

impl<S: ContractStore> ContractService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            filter: Box::new(CriteriaFilter),
            clock: Box::new(SystemClock),
            id_prefix: Config::default().id_prefix,
        }
    }

    pub fn with_clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_filter<F: ContractFilter + 'static>(mut self, filter: F) -> Self {
        self.filter = Box::new(filter);
        self
    }

    pub fn with_id_prefix(mut self, prefix: &str) -> Self {
        self.id_prefix = prefix.to_string();
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// All contracts matching `criteria`, reconciled against the clock.
    pub fn list(&self, criteria: &Criteria) -> Result<Vec<Contract>, ServiceError> {
        info!("listing contracts");

        let contracts = logged("list", None, self.store.get_all().map_err(Into::into))?;
        Ok(self.reconcile_page(contracts, criteria))
    }

    pub fn search(&self, term: &str, criteria: &Criteria) -> Result<Vec<Contract>, ServiceError> {
        info!(term, "searching contracts");

        let contracts = logged("search", None, self.store.search(term).map_err(Into::into))?;
        Ok(self.reconcile_page(contracts, criteria))
    }

    /// `Ok(None)` when no contract has this id. Nothing is written in that case.
    pub fn get(&self, id: &str) -> Result<Option<Contract>, ServiceError> {
        info!(contract_id = id, "fetching contract");

        let found = self.store.get_by_id(id).map_err(ServiceError::from);
        let Some(contract) = logged("get", Some(id), found)? else {
            info!(contract_id = id, "contract not found");
            return Ok(None);
        };

        let (contract, _) = Reconciler::new(&self.store, self.clock.now()).reconcile(contract);
        info!(contract_id = id, status = %contract.status(), "retrieved contract");
        Ok(Some(contract))
    }

    /// Creates a `Pending` contract under a freshly generated id.
    pub fn create(&self, details: ContractDetails) -> Result<Contract, ServiceError> {
        let id = utils::new_uuid_to_bech32(&self.id_prefix).map_err(ServiceError::from);
        let id = logged("create", None, id)?;
        self.insert(id, details)
    }

    /// Creates a `Pending` contract under a caller-supplied id.
    pub fn create_with_id(
        &self,
        id: &str,
        details: ContractDetails,
    ) -> Result<Contract, ServiceError> {
        let id = id.trim();
        if id.is_empty() {
            return logged("create", None, Err(ValidationError::EmptyId.into()));
        }
        self.insert(id.to_string(), details)
    }

    fn insert(&self, id: String, details: ContractDetails) -> Result<Contract, ServiceError> {
        let result = details
            .validate()
            .map_err(ServiceError::from)
            .and_then(|()| {
                let contract = Contract::pending(id.clone(), details, self.clock.now());
                Ok(self.store.create(contract)?)
            });

        let contract = logged("create", Some(&id), result)?;
        info!(contract_id = %contract.id, "created contract");
        Ok(contract)
    }

    /// Replaces the descriptive fields of a contract. Id, status and creation
    /// time are kept; status only ever moves through the lifecycle calls.
    pub fn update(
        &self,
        id: &str,
        details: ContractDetails,
    ) -> Result<Option<Contract>, ServiceError> {
        info!(contract_id = id, "updating contract");

        let result = details
            .validate()
            .map_err(ServiceError::from)
            .and_then(|()| self.replace_details(id, details));

        let updated = logged("update", Some(id), result)?;
        match &updated {
            Some(_) => info!(contract_id = id, "updated contract"),
            None => info!(contract_id = id, "contract not found"),
        }
        Ok(updated)
    }

    /// Removes a contract regardless of its status.
    pub fn delete(&self, id: &str) -> Result<Option<Contract>, ServiceError> {
        info!(contract_id = id, "deleting contract");

        let removed = logged("delete", Some(id), self.store.delete(id).map_err(Into::into))?;
        match &removed {
            Some(_) => info!(contract_id = id, "deleted contract"),
            None => info!(contract_id = id, "contract not found"),
        }
        Ok(removed)
    }

    pub fn activate(&self, id: &str) -> Result<LifecycleOutcome, ServiceError> {
        self.transition(id, Action::Activate)
    }

    pub fn complete(&self, id: &str) -> Result<LifecycleOutcome, ServiceError> {
        self.transition(id, Action::Complete)
    }

    pub fn cancel(&self, id: &str) -> Result<LifecycleOutcome, ServiceError> {
        self.transition(id, Action::Cancel)
    }

    fn replace_details(
        &self,
        id: &str,
        details: ContractDetails,
    ) -> Result<Option<Contract>, ServiceError> {
        let mut attempts = WRITE_ATTEMPTS;
        loop {
            let Some(mut contract) = self.store.get_by_id(id)? else {
                return Ok(None);
            };
            let expected = contract.status();
            contract.details = details.clone();

            match self.store.update_if_status(id, expected, &contract) {
                Ok(()) => return Ok(Some(contract)),
                Err(StoreError::Missing(_)) => return Ok(None),
                Err(err @ StoreError::StatusChanged { .. }) if attempts > 1 => {
                    debug!(contract_id = id, error = %err, "retrying update");
                    attempts -= 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn transition(&self, id: &str, action: Action) -> Result<LifecycleOutcome, ServiceError> {
        info!(contract_id = id, %action, "lifecycle request");

        let result = self.apply_action(id, action);

        let outcome = logged(action.as_str(), Some(id), result)?;
        match &outcome {
            LifecycleOutcome::Applied(contract) => info!(
                contract_id = id,
                %action,
                status = %contract.status(),
                "transition applied"
            ),
            LifecycleOutcome::NotApplicable { contract, reason } => info!(
                contract_id = id,
                %action,
                status = %contract.status(),
                ?reason,
                "transition not applicable"
            ),
            LifecycleOutcome::NotFound => info!(contract_id = id, "contract not found"),
        }
        Ok(outcome)
    }

    /// Reconciles the stored contract like a read would, then applies
    /// `action` to the reconciled status. The write only lands if the stored
    /// status is still the one this call started from.
    fn apply_action(&self, id: &str, action: Action) -> Result<LifecycleOutcome, ServiceError> {
        let mut attempts = WRITE_ATTEMPTS;
        loop {
            let Some(found) = self.store.get_by_id(id)? else {
                return Ok(LifecycleOutcome::NotFound);
            };
            let stored = found.status();
            let (mut contract, report) =
                Reconciler::new(&self.store, self.clock.now()).reconcile(found);
            let expected = if report.persisted.is_empty() {
                stored
            } else {
                contract.status()
            };

            let applied = match lifecycle::request(contract.status(), action) {
                applied @ Transition::Applied { .. } => applied,
                Transition::NotApplicable { reason, .. } => {
                    return Ok(LifecycleOutcome::NotApplicable { contract, reason });
                }
            };
            contract.apply(&applied);

            match self.store.update_if_status(id, expected, &contract) {
                Ok(()) => return Ok(LifecycleOutcome::Applied(contract)),
                Err(StoreError::Missing(_)) => return Ok(LifecycleOutcome::NotFound),
                Err(err @ StoreError::StatusChanged { .. }) if attempts > 1 => {
                    debug!(contract_id = id, %action, error = %err, "retrying lifecycle request");
                    attempts -= 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn reconcile_page(&self, contracts: Vec<Contract>, criteria: &Criteria) -> Vec<Contract> {
        let reconciler = Reconciler::new(&self.store, self.clock.now());
        let staged = reconciler.stage(contracts);
        let (page, report) = reconciler.commit(staged, |all| self.filter.apply(criteria, all));

        info!(
            count = page.len(),
            persisted = report.persisted.len(),
            failed = report.failed.len(),
            "retrieved contracts"
        );
        page
    }
}

fn logged<T>(
    operation: &'static str,
    contract_id: Option<&str>,
    result: Result<T, ServiceError>,
) -> Result<T, ServiceError> {
    if let Err(err) = &result {
        error!(
            operation,
            contract_id = contract_id.unwrap_or("-"),
            kind = ?err.kind(),
            error = %err,
            "contract operation failed"
        );
    }
    result
}
