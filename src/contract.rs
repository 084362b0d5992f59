//! Rental contract record, its status and the timestamps it carries
use super::error::ValidationError;
use super::lifecycle::{self, Transition};
use chrono::{DateTime, TimeZone, Utc};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

#[derive(
    minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
pub enum ContractStatus {
    #[n(0)]
    Pending,
    #[n(1)]
    Active,
    #[n(2)]
    Overdue,
    #[n(3)]
    Completed,
    #[n(4)]
    Canceled,
}

impl ContractStatus {
    pub const ALL: [ContractStatus; 5] = [
        ContractStatus::Pending,
        ContractStatus::Active,
        ContractStatus::Overdue,
        ContractStatus::Completed,
        ContractStatus::Canceled,
    ];

    /// No transition ever leaves a terminal status.
    pub fn is_terminal(self) -> bool {
        matches!(self, ContractStatus::Completed | ContractStatus::Canceled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ContractStatus::Pending => "Pending",
            ContractStatus::Active => "Active",
            ContractStatus::Overdue => "Overdue",
            ContractStatus::Completed => "Completed",
            ContractStatus::Canceled => "Canceled",
        }
    }
}

impl fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("unknown contract status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for ContractStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContractStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct TimeStamp<T: TimeZone>(DateTime<T>);

// `Utc` itself is not ordered, so the derive would not apply here.
impl Ord for TimeStamp<Utc> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl PartialOrd for TimeStamp<Utc> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl TimeStamp<Utc> {
    pub fn now() -> Self {
        Self(Utc::now())
    }
    /// Returns `None` when the components do not name a single UTC instant.
    pub fn new_with(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        min: u32,
        sec: u32,
    ) -> Option<Self> {
        Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
            .single()
            .map(TimeStamp)
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
    /// Whether the nanosecond encoding can hold this instant (roughly
    /// years 1677 to 2262).
    pub fn is_storable(&self) -> bool {
        self.0.timestamp_nanos_opt().is_some()
    }
}

impl<T: TimeZone> From<DateTime<T>> for TimeStamp<T> {
    fn from(value: DateTime<T>) -> Self {
        TimeStamp(value)
    }
}

impl<C> minicbor::Encode<C> for TimeStamp<Utc> {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp<Utc> {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}

// Caller-editable part of a contract. Also used for constructing drafts.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Default, Clone, PartialEq, Eq)]
pub struct ContractDetails {
    #[n(0)]
    renter: String,
    #[n(1)]
    renter_contact: Option<String>, // phone or email
    #[n(2)]
    game_id: String, // catalog reference, opaque here
    #[n(3)]
    rental_price: u64, // integer minor units
    #[n(4)]
    start_date: Option<TimeStamp<Utc>>,
    #[n(5)]
    due_date: Option<TimeStamp<Utc>>,
}

impl ContractDetails {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn set_renter(mut self, renter: &str) -> Self {
        self.renter = renter.trim().to_string();
        self
    }
    pub fn set_renter_contact(mut self, contact: &str) -> Self {
        self.renter_contact = Some(contact.trim().to_string());
        self
    }
    pub fn set_game(mut self, game_id: &str) -> Self {
        self.game_id = game_id.trim().to_string();
        self
    }
    pub fn set_rental_price(mut self, price: u64) -> Self {
        self.rental_price = price;
        self
    }
    pub fn set_start_date(mut self, date: TimeStamp<Utc>) -> Self {
        self.start_date = Some(date);
        self
    }
    pub fn set_due_date(mut self, date: TimeStamp<Utc>) -> Self {
        self.due_date = Some(date);
        self
    }

    pub fn renter(&self) -> &str {
        &self.renter
    }
    pub fn renter_contact(&self) -> Option<&str> {
        self.renter_contact.as_deref()
    }
    pub fn game_id(&self) -> &str {
        &self.game_id
    }
    pub fn rental_price(&self) -> u64 {
        self.rental_price
    }
    pub fn start_date(&self) -> Option<&TimeStamp<Utc>> {
        self.start_date.as_ref()
    }
    pub fn due_date(&self) -> Option<&TimeStamp<Utc>> {
        self.due_date.as_ref()
    }

    /// Checks the predicate `start <= due`. Missing dates fail.
    pub fn validate_dates(&self) -> bool {
        match (&self.start_date, &self.due_date) {
            (Some(start), Some(due)) => start <= due,
            _ => false,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.renter.is_empty() {
            return Err(ValidationError::MissingRenter);
        }
        if self.game_id.is_empty() {
            return Err(ValidationError::MissingGame);
        }
        for (name, date) in [("Start Date", &self.start_date), ("Due Date", &self.due_date)] {
            match date {
                None => return Err(ValidationError::MissingDate(name)),
                Some(date) if !date.is_storable() => {
                    return Err(ValidationError::UnrepresentableDate(name));
                }
                Some(_) => {}
            }
        }
        if !self.validate_dates() {
            return Err(ValidationError::InvalidDates);
        }

        Ok(())
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct Contract {
    #[n(0)]
    pub id: String,
    #[n(1)]
    status: ContractStatus,
    #[n(2)]
    pub details: ContractDetails,
    #[n(3)]
    pub created_at: TimeStamp<Utc>,
}

impl Contract {
    /// Every contract starts out `Pending`.
    pub fn pending(id: String, details: ContractDetails, created_at: TimeStamp<Utc>) -> Self {
        Self {
            id,
            status: ContractStatus::Pending,
            details,
            created_at,
        }
    }

    pub fn status(&self) -> ContractStatus {
        self.status
    }

    pub fn due_date(&self) -> Option<&TimeStamp<Utc>> {
        self.details.due_date()
    }

    /// Moves the contract to the target of an applied transition. Returns
    /// whether the status changed. Transitions that start elsewhere or are
    /// not an edge of the lifecycle are ignored.
    pub fn apply(&mut self, transition: &Transition) -> bool {
        match *transition {
            Transition::Applied { from, to }
                if from == self.status && lifecycle::is_edge(from, to) =>
            {
                self.status = to;
                true
            }
            _ => false,
        }
    }

    /// Case-insensitive free-text match. A blank term matches everything.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return true;
        }

        let contains = |field: &str| field.to_lowercase().contains(&term);

        contains(&self.id)
            || contains(&self.details.renter)
            || self.details.renter_contact.as_deref().is_some_and(contains)
            || contains(&self.details.game_id)
            || contains(self.status.as_str())
    }
}
