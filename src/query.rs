//! Filtering, sorting and paging over fetched contracts.
//!
//! Criteria use the compact `Field op value` syntax the catalog front end
//! already speaks, e.g. `Status==Overdue,Renter@=*minh` with sorts like
//! `-DueDate,Renter`.
use super::contract::{Contract, ContractStatus, TimeStamp};
use super::error::QueryError;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::str::FromStr;

pub trait ContractFilter: Send + Sync {
    fn apply(&self, criteria: &Criteria, contracts: Vec<Contract>) -> Vec<Contract>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Id,
    Status,
    Renter,
    Game,
    Price,
    StartDate,
    DueDate,
    CreatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    NotEq,
    Gt,
    Lt,
    Ge,
    Le,
    Contains,
    StartsWith,
    EqIgnoreCase,
    ContainsIgnoreCase,
    StartsWithIgnoreCase,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Value {
    Text(String),
    Status(ContractStatus),
    Price(u64),
    Date(TimeStamp<Utc>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    field: Field,
    op: Operator,
    value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub field: Field,
    pub descending: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Criteria {
    pub filters: Vec<Filter>,
    pub sorts: Vec<Sort>,
    /// 1-based.
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

impl Field {
    fn name(self) -> &'static str {
        match self {
            Field::Id => "Id",
            Field::Status => "Status",
            Field::Renter => "Renter",
            Field::Game => "Game",
            Field::Price => "Price",
            Field::StartDate => "StartDate",
            Field::DueDate => "DueDate",
            Field::CreatedAt => "CreatedAt",
        }
    }

    fn is_text(self) -> bool {
        matches!(self, Field::Id | Field::Renter | Field::Game)
    }

    fn value_of(self, contract: &Contract) -> Option<Value> {
        let details = &contract.details;
        match self {
            Field::Id => Some(Value::Text(contract.id.clone())),
            Field::Status => Some(Value::Status(contract.status())),
            Field::Renter => Some(Value::Text(details.renter().to_string())),
            Field::Game => Some(Value::Text(details.game_id().to_string())),
            Field::Price => Some(Value::Price(details.rental_price())),
            Field::StartDate => details.start_date().cloned().map(Value::Date),
            Field::DueDate => details.due_date().cloned().map(Value::Date),
            Field::CreatedAt => Some(Value::Date(contract.created_at.clone())),
        }
    }

    fn parse_value(self, raw: &str) -> Result<Value, QueryError> {
        let invalid = || QueryError::InvalidValue {
            field: self.name(),
            value: raw.to_string(),
        };
        match self {
            Field::Id | Field::Renter | Field::Game => Ok(Value::Text(raw.to_string())),
            Field::Status => raw.parse().map(Value::Status).map_err(|_| invalid()),
            Field::Price => raw.parse().map(Value::Price).map_err(|_| invalid()),
            Field::StartDate | Field::DueDate | Field::CreatedAt => {
                DateTime::parse_from_rfc3339(raw)
                    .map(|date| Value::Date(date.with_timezone(&Utc).into()))
                    .map_err(|_| invalid())
            }
        }
    }
}

impl FromStr for Field {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let field = match s.trim().to_ascii_lowercase().as_str() {
            "id" => Field::Id,
            "status" => Field::Status,
            "renter" => Field::Renter,
            "game" | "gameid" => Field::Game,
            "price" | "rentalprice" => Field::Price,
            "startdate" => Field::StartDate,
            "duedate" => Field::DueDate,
            "createdat" => Field::CreatedAt,
            _ => return Err(QueryError::UnknownField(s.trim().to_string())),
        };
        Ok(field)
    }
}

impl Operator {
    const TOKENS: [(&'static str, Operator); 11] = [
        ("==*", Operator::EqIgnoreCase),
        ("@=*", Operator::ContainsIgnoreCase),
        ("_=*", Operator::StartsWithIgnoreCase),
        ("==", Operator::Eq),
        ("!=", Operator::NotEq),
        (">=", Operator::Ge),
        ("<=", Operator::Le),
        ("@=", Operator::Contains),
        ("_=", Operator::StartsWith),
        (">", Operator::Gt),
        ("<", Operator::Lt),
    ];

    fn is_text_only(self) -> bool {
        !matches!(
            self,
            Operator::Eq
                | Operator::NotEq
                | Operator::Gt
                | Operator::Lt
                | Operator::Ge
                | Operator::Le
        )
    }

    fn token(self) -> &'static str {
        Self::TOKENS
            .iter()
            .find(|(_, op)| *op == self)
            .map(|(token, _)| *token)
            .unwrap_or("?")
    }
}

impl FromStr for Filter {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || QueryError::MalformedFilter(s.to_string());

        // the earliest operator in the term wins, longest token on ties
        let (at, token, op) = Operator::TOKENS
            .iter()
            .filter_map(|(token, op)| s.find(token).map(|at| (at, *token, *op)))
            .min_by_key(|(at, token, _)| (*at, std::cmp::Reverse(token.len())))
            .ok_or_else(malformed)?;

        let field: Field = s[..at].parse()?;
        let raw = s[at + token.len()..].trim();
        if raw.is_empty() {
            return Err(malformed());
        }

        Filter::new(field, op, raw)
    }
}

impl FromStr for Sort {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.strip_prefix('-') {
            Some(name) => Ok(Sort {
                field: name.parse()?,
                descending: true,
            }),
            None => Ok(Sort {
                field: s.parse()?,
                descending: false,
            }),
        }
    }
}

impl Filter {
    pub fn new(field: Field, op: Operator, raw: &str) -> Result<Self, QueryError> {
        if op.is_text_only() && !field.is_text() {
            return Err(QueryError::UnsupportedOperator {
                field: field.name(),
                op: op.token().to_string(),
            });
        }
        Ok(Filter {
            field,
            op,
            value: field.parse_value(raw)?,
        })
    }

    pub fn status(status: ContractStatus) -> Self {
        Filter {
            field: Field::Status,
            op: Operator::Eq,
            value: Value::Status(status),
        }
    }

    pub fn accepts(&self, contract: &Contract) -> bool {
        let Some(actual) = self.field.value_of(contract) else {
            return false;
        };

        match (&actual, &self.value) {
            (Value::Text(actual), Value::Text(wanted)) => text_matches(self.op, actual, wanted),
            _ => match compare(&actual, &self.value) {
                Some(ordering) => ordering_matches(self.op, ordering),
                None => false,
            },
        }
    }
}

fn text_matches(op: Operator, actual: &str, wanted: &str) -> bool {
    match op {
        Operator::Contains => actual.contains(wanted),
        Operator::StartsWith => actual.starts_with(wanted),
        Operator::EqIgnoreCase => actual.eq_ignore_ascii_case(wanted),
        Operator::ContainsIgnoreCase => actual.to_lowercase().contains(&wanted.to_lowercase()),
        Operator::StartsWithIgnoreCase => {
            actual.to_lowercase().starts_with(&wanted.to_lowercase())
        }
        _ => ordering_matches(op, actual.cmp(wanted)),
    }
}

fn ordering_matches(op: Operator, ordering: Ordering) -> bool {
    match op {
        Operator::Eq => ordering == Ordering::Equal,
        Operator::NotEq => ordering != Ordering::Equal,
        Operator::Gt => ordering == Ordering::Greater,
        Operator::Lt => ordering == Ordering::Less,
        Operator::Ge => ordering != Ordering::Less,
        Operator::Le => ordering != Ordering::Greater,
        _ => false,
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
        (Value::Status(a), Value::Status(b)) => Some(a.cmp(b)),
        (Value::Price(a), Value::Price(b)) => Some(a.cmp(b)),
        (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn split_terms(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|term| !term.is_empty())
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses comma separated filter and sort terms.
    pub fn parse(filters: &str, sorts: &str) -> Result<Self, QueryError> {
        Ok(Criteria {
            filters: split_terms(filters)
                .map(str::parse::<Filter>)
                .collect::<Result<_, _>>()?,
            sorts: split_terms(sorts).map(str::parse::<Sort>).collect::<Result<_, _>>()?,
            page: None,
            page_size: None,
        })
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_sort(mut self, field: Field, descending: bool) -> Self {
        self.sorts.push(Sort { field, descending });
        self
    }

    pub fn with_page(mut self, page: usize, page_size: usize) -> Self {
        self.page = Some(page);
        self.page_size = Some(page_size);
        self
    }
}

/// Filter, then stable sort, then page.
#[derive(Debug, Default, Clone, Copy)]
pub struct CriteriaFilter;

impl ContractFilter for CriteriaFilter {
    fn apply(&self, criteria: &Criteria, mut contracts: Vec<Contract>) -> Vec<Contract> {
        contracts.retain(|contract| criteria.filters.iter().all(|f| f.accepts(contract)));

        if !criteria.sorts.is_empty() {
            contracts.sort_by(|a, b| {
                criteria
                    .sorts
                    .iter()
                    .map(|sort| {
                        let ordering = match (sort.field.value_of(a), sort.field.value_of(b)) {
                            (Some(x), Some(y)) => compare(&x, &y).unwrap_or(Ordering::Equal),
                            (Some(_), None) => Ordering::Less,
                            (None, Some(_)) => Ordering::Greater,
                            (None, None) => Ordering::Equal,
                        };
                        if sort.descending {
                            ordering.reverse()
                        } else {
                            ordering
                        }
                    })
                    .find(|ordering| *ordering != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
        }

        match criteria.page_size {
            Some(size) if size > 0 => {
                let page = criteria.page.unwrap_or(1).max(1);
                contracts
                    .into_iter()
                    .skip((page - 1).saturating_mul(size))
                    .take(size)
                    .collect()
            }
            _ => contracts,
        }
    }
}
