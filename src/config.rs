use super::error::StoreError;
use super::store::SledStore;
use std::path::PathBuf;

pub const DB_PATH_VAR: &str = "GAME_RENTAL_DB_PATH";
pub const ID_PREFIX_VAR: &str = "GAME_RENTAL_ID_PREFIX";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db_path: PathBuf,
    /// bech32 human-readable part for generated contract ids
    pub id_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("game_rental.db"),
            id_prefix: "contract_".to_string(),
        }
    }
}

impl Config {
    /// Defaults, overridden by `GAME_RENTAL_DB_PATH` and
    /// `GAME_RENTAL_ID_PREFIX` when they are set and non-empty.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|value: &String| !value.trim().is_empty());

        Self {
            db_path: var(DB_PATH_VAR).map(PathBuf::from).unwrap_or(defaults.db_path),
            id_prefix: var(ID_PREFIX_VAR).unwrap_or(defaults.id_prefix),
        }
    }

    pub fn set_db_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.db_path = path.into();
        self
    }

    pub fn set_id_prefix(mut self, prefix: &str) -> Self {
        self.id_prefix = prefix.to_string();
        self
    }

    pub fn open_store(&self) -> Result<SledStore, StoreError> {
        SledStore::open(&self.db_path)
    }
}
