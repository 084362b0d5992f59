//! Contract persistence.
//!
//! [`ContractStore`] is the boundary the rest of the crate talks to. Two
//! implementations live here: [`SledStore`] for on-disk storage and
//! [`MemoryStore`] for embedding and tests. Writes are last-write-wins per
//! id, except that an update only lands while the stored status is still the
//! one the writer read.
use super::contract::{Contract, ContractStatus};
use super::error::StoreError;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

pub trait ContractStore {
    fn get_by_id(&self, id: &str) -> Result<Option<Contract>, StoreError>;
    fn get_all(&self) -> Result<Vec<Contract>, StoreError>;
    fn search(&self, term: &str) -> Result<Vec<Contract>, StoreError>;
    /// Fails with [`StoreError::Conflict`] if the id is taken.
    fn create(&self, contract: Contract) -> Result<Contract, StoreError>;
    /// Replaces an existing record whose stored status is still `expected`.
    /// Fails with [`StoreError::Missing`] rather than inserting, and with
    /// [`StoreError::StatusChanged`] when another writer moved the status.
    fn update_if_status(
        &self,
        id: &str,
        expected: ContractStatus,
        contract: &Contract,
    ) -> Result<(), StoreError>;
    /// Returns the removed record, `None` if there was nothing to remove.
    fn delete(&self, id: &str) -> Result<Option<Contract>, StoreError>;
}

impl<T: ContractStore + ?Sized> ContractStore for &T {
    fn get_by_id(&self, id: &str) -> Result<Option<Contract>, StoreError> {
        (**self).get_by_id(id)
    }
    fn get_all(&self) -> Result<Vec<Contract>, StoreError> {
        (**self).get_all()
    }
    fn search(&self, term: &str) -> Result<Vec<Contract>, StoreError> {
        (**self).search(term)
    }
    fn create(&self, contract: Contract) -> Result<Contract, StoreError> {
        (**self).create(contract)
    }
    fn update_if_status(
        &self,
        id: &str,
        expected: ContractStatus,
        contract: &Contract,
    ) -> Result<(), StoreError> {
        (**self).update_if_status(id, expected, contract)
    }
    fn delete(&self, id: &str) -> Result<Option<Contract>, StoreError> {
        (**self).delete(id)
    }
}

impl<T: ContractStore + ?Sized> ContractStore for Arc<T> {
    fn get_by_id(&self, id: &str) -> Result<Option<Contract>, StoreError> {
        (**self).get_by_id(id)
    }
    fn get_all(&self) -> Result<Vec<Contract>, StoreError> {
        (**self).get_all()
    }
    fn search(&self, term: &str) -> Result<Vec<Contract>, StoreError> {
        (**self).search(term)
    }
    fn create(&self, contract: Contract) -> Result<Contract, StoreError> {
        (**self).create(contract)
    }
    fn update_if_status(
        &self,
        id: &str,
        expected: ContractStatus,
        contract: &Contract,
    ) -> Result<(), StoreError> {
        (**self).update_if_status(id, expected, contract)
    }
    fn delete(&self, id: &str) -> Result<Option<Contract>, StoreError> {
        (**self).delete(id)
    }
}

fn encode(contract: &Contract) -> Result<Vec<u8>, StoreError> {
    minicbor::to_vec(contract).map_err(|e| StoreError::Encode(e.to_string()))
}

fn decode(bytes: &[u8]) -> Result<Contract, StoreError> {
    Ok(minicbor::decode(bytes)?)
}

/// Contracts keyed by id, values are CBOR-encoded [`Contract`]s.
pub struct SledStore {
    tree: sled::Tree,
}

impl SledStore {
    pub const TREE: &'static str = "contracts";

    pub fn new(instance: Arc<sled::Db>) -> Result<Self, StoreError> {
        let tree = instance.open_tree(Self::TREE)?;
        Ok(Self { tree })
    }

    pub fn open<P: AsRef<std::path::Path>>(path: P) -> Result<Self, StoreError> {
        Self::new(Arc::new(sled::open(path)?))
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        self.tree.flush()?;
        Ok(())
    }
}

impl ContractStore for SledStore {
    fn get_by_id(&self, id: &str) -> Result<Option<Contract>, StoreError> {
        self.tree
            .get(id.as_bytes())?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    fn get_all(&self) -> Result<Vec<Contract>, StoreError> {
        self.tree
            .iter()
            .values()
            .map(|bytes| decode(&bytes?))
            .collect()
    }

    fn search(&self, term: &str) -> Result<Vec<Contract>, StoreError> {
        let mut found = self.get_all()?;
        found.retain(|contract| contract.matches(term));
        Ok(found)
    }

    fn create(&self, contract: Contract) -> Result<Contract, StoreError> {
        let bytes = encode(&contract)?;

        // only succeeds against an absent key
        self.tree
            .compare_and_swap(contract.id.as_bytes(), None::<&[u8]>, Some(bytes))?
            .map_err(|_| StoreError::Conflict(contract.id.clone()))?;

        Ok(contract)
    }

    fn update_if_status(
        &self,
        id: &str,
        expected: ContractStatus,
        contract: &Contract,
    ) -> Result<(), StoreError> {
        let bytes = encode(contract)?;

        loop {
            let Some(current) = self.tree.get(id.as_bytes())? else {
                return Err(StoreError::Missing(id.to_string()));
            };
            let found = decode(&current)?.status();
            if found != expected {
                return Err(StoreError::StatusChanged {
                    id: id.to_string(),
                    expected,
                    found,
                });
            }

            // swap against the exact bytes the status was checked on
            let swapped = self.tree.compare_and_swap(
                id.as_bytes(),
                Some(&current),
                Some(bytes.as_slice()),
            )?;
            if swapped.is_ok() {
                return Ok(());
            }
        }
    }

    fn delete(&self, id: &str) -> Result<Option<Contract>, StoreError> {
        self.tree
            .remove(id.as_bytes())?
            .map(|bytes| decode(&bytes))
            .transpose()
    }
}

#[derive(Default)]
pub struct MemoryStore {
    contracts: Mutex<BTreeMap<String, Contract>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, Contract>>, StoreError> {
        self.contracts
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }
}

impl ContractStore for MemoryStore {
    fn get_by_id(&self, id: &str) -> Result<Option<Contract>, StoreError> {
        Ok(self.lock()?.get(id).cloned())
    }

    fn get_all(&self) -> Result<Vec<Contract>, StoreError> {
        Ok(self.lock()?.values().cloned().collect())
    }

    fn search(&self, term: &str) -> Result<Vec<Contract>, StoreError> {
        Ok(self
            .lock()?
            .values()
            .filter(|contract| contract.matches(term))
            .cloned()
            .collect())
    }

    fn create(&self, contract: Contract) -> Result<Contract, StoreError> {
        let mut contracts = self.lock()?;
        if contracts.contains_key(&contract.id) {
            return Err(StoreError::Conflict(contract.id));
        }
        contracts.insert(contract.id.clone(), contract.clone());
        Ok(contract)
    }

    fn update_if_status(
        &self,
        id: &str,
        expected: ContractStatus,
        contract: &Contract,
    ) -> Result<(), StoreError> {
        let mut contracts = self.lock()?;
        let Some(stored) = contracts.get_mut(id) else {
            return Err(StoreError::Missing(id.to_string()));
        };
        if stored.status() != expected {
            return Err(StoreError::StatusChanged {
                id: id.to_string(),
                expected,
                found: stored.status(),
            });
        }
        *stored = contract.clone();
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<Option<Contract>, StoreError> {
        Ok(self.lock()?.remove(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{ContractDetails, TimeStamp};
    use tempfile::tempdir;

    fn contract(id: &str, renter: &str) -> Contract {
        let details = ContractDetails::new()
            .set_renter(renter)
            .set_game("hades")
            .set_start_date(TimeStamp::new_with(2024, 6, 1, 0, 0, 0).unwrap())
            .set_due_date(TimeStamp::new_with(2024, 6, 8, 0, 0, 0).unwrap());
        Contract::pending(id.into(), details, TimeStamp::now())
    }

    fn exercise(store: &dyn ContractStore) {
        store.create(contract("contract_a", "Lan")).unwrap();
        store.create(contract("contract_b", "Tuan")).unwrap();

        assert!(matches!(
            store.create(contract("contract_a", "Other")),
            Err(StoreError::Conflict(id)) if id == "contract_a"
        ));
        assert_eq!(store.get_all().unwrap().len(), 2);
        assert_eq!(store.search("tuan").unwrap()[0].id, "contract_b");

        let mut changed = contract("contract_a", "Lan Pham");
        changed.details = changed.details.set_rental_price(30_000);
        store
            .update_if_status("contract_a", ContractStatus::Pending, &changed)
            .unwrap();
        assert_eq!(store.get_by_id("contract_a").unwrap(), Some(changed.clone()));

        // a writer that read an older status loses
        let mut stale = changed.clone();
        stale.details = stale.details.set_rental_price(1);
        assert!(matches!(
            store.update_if_status("contract_a", ContractStatus::Active, &stale),
            Err(StoreError::StatusChanged {
                expected: ContractStatus::Active,
                found: ContractStatus::Pending,
                ..
            })
        ));
        assert_eq!(store.get_by_id("contract_a").unwrap(), Some(changed));

        assert!(matches!(
            store.update_if_status(
                "contract_missing",
                ContractStatus::Pending,
                &contract("contract_missing", "x")
            ),
            Err(StoreError::Missing(_))
        ));
        assert!(store.get_by_id("contract_missing").unwrap().is_none());

        assert!(store.delete("contract_b").unwrap().is_some());
        assert!(store.delete("contract_b").unwrap().is_none());
        assert_eq!(store.get_all().unwrap().len(), 1);
    }

    #[test]
    fn memory_store_semantics() {
        exercise(&MemoryStore::new());
    }

    #[test]
    fn sled_store_semantics() {
        let temp_dir = tempdir().unwrap();
        let store = SledStore::open(temp_dir.path().join("store_semantics.db")).unwrap();

        exercise(&store);
    }
}
