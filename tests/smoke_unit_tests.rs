//! Smoke Screen Unit tests for rental contract components
//!
//! These span the codebase and test behaviour in isolation from the
//! scenario suites. They mostly cover the happy path.

use chrono::{Datelike, Timelike, Utc};
use game_rental::{
    contract::{ContractDetails, ContractStatus, TimeStamp},
    error::{ErrorKind, ServiceError, StoreError, ValidationError},
    query::{Criteria, Field},
    service::ContractService,
    store::{ContractStore, MemoryStore},
    utils::new_uuid_to_bech32,
};

// UTILS MODULE TESTS
#[cfg(test)]
mod utils_tests {
    use super::*;

    /// Generated ids are bech32 with the requested human-readable prefix
    #[test]
    fn generates_valid_bech32_with_hrp() {
        let encoded = new_uuid_to_bech32("contract_").unwrap();

        assert!(encoded.starts_with("contract_1"));
        assert!(encoded.len() > 10);
    }

    #[test]
    fn handles_empty_hrp() {
        assert!(new_uuid_to_bech32("").is_err());
    }

    #[test]
    fn generates_unique_ids() {
        let id1 = new_uuid_to_bech32("contract_").unwrap();
        let id2 = new_uuid_to_bech32("contract_").unwrap();

        assert_ne!(id1, id2);
    }
}

// CONTRACT MODULE TESTS
#[cfg(test)]
mod contract_tests {
    use super::*;

    fn valid() -> ContractDetails {
        ContractDetails::new()
            .set_renter("Quach O")
            .set_game("gta-v")
            .set_rental_price(60_000)
            .set_start_date(TimeStamp::new_with(2024, 6, 1, 10, 30, 0).unwrap())
            .set_due_date(TimeStamp::new_with(2024, 6, 8, 10, 30, 0).unwrap())
    }

    #[test]
    fn timestamp_now_is_current_time() {
        let ts = TimeStamp::now();
        let diff = (Utc::now() - ts.to_datetime_utc()).num_seconds().abs();

        assert!(diff < 1);
    }

    #[test]
    fn timestamp_new_with_creates_specific_time() {
        let dt = TimeStamp::new_with(2024, 6, 15, 10, 30, 0)
            .unwrap()
            .to_datetime_utc();

        assert_eq!(dt.year(), 2024);
        assert_eq!(dt.month(), 6);
        assert_eq!(dt.day(), 15);
        assert_eq!(dt.hour(), 10);
        assert_eq!(dt.minute(), 30);
    }

    #[test]
    fn details_builder_sets_fields() {
        let details = valid().set_renter_contact(" 0912 000 111 ");

        assert!(details.validate().is_ok());
        assert_eq!(details.renter(), "Quach O");
        assert_eq!(details.renter_contact(), Some("0912 000 111"));
        assert_eq!(details.game_id(), "gta-v");
        assert_eq!(details.rental_price(), 60_000);
    }

    #[test]
    fn same_day_rental_is_valid() {
        let day = TimeStamp::new_with(2024, 6, 1, 0, 0, 0).unwrap();
        let details = valid().set_start_date(day.clone()).set_due_date(day);

        assert!(details.validate_dates());
    }

    #[test]
    fn validate_reports_the_first_missing_field() {
        assert_eq!(
            valid().set_renter("  ").validate(),
            Err(ValidationError::MissingRenter)
        );
        assert_eq!(valid().set_game("").validate(), Err(ValidationError::MissingGame));

        let undated = ContractDetails::new().set_renter("R").set_game("g");
        assert_eq!(
            undated.validate(),
            Err(ValidationError::MissingDate("Start Date"))
        );
    }

    #[test]
    fn terminal_statuses() {
        let terminal: Vec<_> = ContractStatus::ALL
            .into_iter()
            .filter(|s| s.is_terminal())
            .collect();

        assert_eq!(terminal, vec![ContractStatus::Completed, ContractStatus::Canceled]);
    }
}

// QUERY MODULE TESTS
#[cfg(test)]
mod query_tests {
    use super::*;

    #[test]
    fn parses_filters_and_sorts() {
        let criteria = Criteria::parse("Status==Active, Renter@=*minh", "-DueDate,Price").unwrap();

        assert_eq!(criteria.filters.len(), 2);
        assert_eq!(criteria.sorts.len(), 2);
        assert_eq!(criteria.sorts[0].field, Field::DueDate);
        assert!(criteria.sorts[0].descending);
        assert!(!criteria.sorts[1].descending);
    }

    #[test]
    fn blank_criteria_parse_to_nothing() {
        assert_eq!(Criteria::parse(" , ", "").unwrap(), Criteria::new());
    }

    #[test]
    fn unknown_sort_field_is_rejected() {
        assert!(Criteria::parse("", "-Colour").is_err());
    }
}

// SERVICE ERROR TESTS
#[cfg(test)]
mod service_error_tests {
    use super::*;

    #[test]
    fn invalid_details_are_rejected_before_any_write() {
        let service = ContractService::new(MemoryStore::new());

        let err = service
            .create(ContractDetails::new().set_renter("No Game"))
            .unwrap_err();

        assert!(matches!(err, ServiceError::Validation(ValidationError::MissingGame)));
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn duplicate_ids_are_invalid_input() {
        let service = ContractService::new(MemoryStore::new());
        let details = ContractDetails::new()
            .set_renter("Dup")
            .set_game("pong")
            .set_start_date(TimeStamp::new_with(2024, 6, 1, 0, 0, 0).unwrap())
            .set_due_date(TimeStamp::new_with(2024, 6, 2, 0, 0, 0).unwrap());

        service.create_with_id("contract_x", details.clone()).unwrap();
        let err = service.create_with_id("contract_x", details).unwrap_err();

        assert!(matches!(err, ServiceError::Store(StoreError::Conflict(_))));
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn dates_beyond_the_storable_range_are_invalid_input() {
        let service = ContractService::new(MemoryStore::new());
        let details = ContractDetails::new()
            .set_renter("Far Future")
            .set_game("pong")
            .set_start_date(TimeStamp::new_with(2024, 6, 1, 0, 0, 0).unwrap())
            .set_due_date(TimeStamp::new_with(2300, 1, 1, 0, 0, 0).unwrap());

        let err = service.create(details).unwrap_err();

        assert!(matches!(
            err,
            ServiceError::Validation(ValidationError::UnrepresentableDate("Due Date"))
        ));
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(service.store().get_all().unwrap().is_empty());
    }

    #[test]
    fn blank_ids_are_rejected() {
        let service = ContractService::new(MemoryStore::new());

        let err = service
            .create_with_id("   ", ContractDetails::new())
            .unwrap_err();

        assert!(matches!(err, ServiceError::Validation(ValidationError::EmptyId)));
    }

    #[test]
    fn store_failures_are_classified() {
        let err = ServiceError::from(StoreError::Unavailable("down".into()));
        assert_eq!(err.kind(), ErrorKind::StoreFailure);

        let err = ServiceError::from(StoreError::StatusChanged {
            id: "contract_x".into(),
            expected: ContractStatus::Active,
            found: ContractStatus::Completed,
        });
        assert_eq!(err.kind(), ErrorKind::StoreFailure);

        let err = ServiceError::from(anyhow::anyhow!("boom"));
        assert_eq!(err.kind(), ErrorKind::Unexpected);
    }
}
