//! Shared fixtures for the integration suites.
#![allow(dead_code)]

use game_rental::{
    contract::{Contract, ContractDetails, ContractStatus, TimeStamp},
    error::StoreError,
    store::{ContractStore, MemoryStore},
};
use std::collections::HashSet;
use std::sync::Mutex;

pub fn at(year: i32, month: u32, day: u32) -> TimeStamp<chrono::Utc> {
    TimeStamp::new_with(year, month, day, 0, 0, 0).unwrap()
}

/// A week-long rental starting on the given June 2024 day.
pub fn rental(renter: &str, game: &str, start_day: u32) -> ContractDetails {
    ContractDetails::new()
        .set_renter(renter)
        .set_game(game)
        .set_rental_price(50_000)
        .set_start_date(at(2024, 6, start_day))
        .set_due_date(at(2024, 6, start_day + 7))
}

/// Memory store that records every write and can be told to reject
/// updates for particular ids.
#[derive(Default)]
pub struct RecordingStore {
    pub inner: MemoryStore,
    failing: Mutex<HashSet<String>>,
    updates: Mutex<Vec<String>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_updates_for(&self, id: &str) {
        self.failing.lock().unwrap().insert(id.to_string());
    }

    pub fn updates(&self) -> Vec<String> {
        self.updates.lock().unwrap().clone()
    }
}

impl ContractStore for RecordingStore {
    fn get_by_id(&self, id: &str) -> Result<Option<Contract>, StoreError> {
        self.inner.get_by_id(id)
    }
    fn get_all(&self) -> Result<Vec<Contract>, StoreError> {
        self.inner.get_all()
    }
    fn search(&self, term: &str) -> Result<Vec<Contract>, StoreError> {
        self.inner.search(term)
    }
    fn create(&self, contract: Contract) -> Result<Contract, StoreError> {
        self.inner.create(contract)
    }
    fn update_if_status(
        &self,
        id: &str,
        expected: ContractStatus,
        contract: &Contract,
    ) -> Result<(), StoreError> {
        self.updates.lock().unwrap().push(id.to_string());
        if self.failing.lock().unwrap().contains(id) {
            return Err(StoreError::Unavailable(format!("write to {id} rejected")));
        }
        self.inner.update_if_status(id, expected, contract)
    }
    fn delete(&self, id: &str) -> Result<Option<Contract>, StoreError> {
        self.inner.delete(id)
    }
}
