//! Contract status transitions.
//!
//! Every operation here is a pure function of the current status (and, for
//! the automatic overdue check, the due date and the current time). A
//! rejected request is reported as [`Transition::NotApplicable`], which is a
//! non-event for the caller rather than a failure.
use super::contract::{Contract, ContractStatus, TimeStamp};
use chrono::Utc;
use std::fmt;

/// Transitions a caller may explicitly request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Activate,
    Complete,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reason {
    /// The status is terminal; nothing ever applies to it.
    Terminal,
    /// The requested transition has no edge out of the current status.
    WrongState,
    /// Active, but the due date has not passed yet.
    NotDue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied {
        from: ContractStatus,
        to: ContractStatus,
    },
    NotApplicable {
        status: ContractStatus,
        reason: Reason,
    },
}

impl Transition {
    pub fn is_applied(&self) -> bool {
        matches!(self, Transition::Applied { .. })
    }

    /// Status after the transition has been applied (or not).
    pub fn resulting_status(&self) -> ContractStatus {
        match *self {
            Transition::Applied { to, .. } => to,
            Transition::NotApplicable { status, .. } => status,
        }
    }

    fn skip(status: ContractStatus) -> Self {
        let reason = if status.is_terminal() {
            Reason::Terminal
        } else {
            Reason::WrongState
        };
        Transition::NotApplicable { status, reason }
    }
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Activate => "activate",
            Action::Complete => "complete",
            Action::Cancel => "cancel",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether `from -> to` is one of the lifecycle's edges.
pub fn is_edge(from: ContractStatus, to: ContractStatus) -> bool {
    use ContractStatus::*;
    matches!(
        (from, to),
        (Pending, Active)
            | (Active, Overdue)
            | (Active | Overdue, Completed)
            | (Pending | Active | Overdue, Canceled)
    )
}

pub fn activate(status: ContractStatus) -> Transition {
    match status {
        ContractStatus::Pending => Transition::Applied {
            from: status,
            to: ContractStatus::Active,
        },
        _ => Transition::skip(status),
    }
}

pub fn complete(status: ContractStatus) -> Transition {
    match status {
        ContractStatus::Active | ContractStatus::Overdue => Transition::Applied {
            from: status,
            to: ContractStatus::Completed,
        },
        _ => Transition::skip(status),
    }
}

pub fn cancel(status: ContractStatus) -> Transition {
    match status {
        ContractStatus::Pending | ContractStatus::Active | ContractStatus::Overdue => {
            Transition::Applied {
                from: status,
                to: ContractStatus::Canceled,
            }
        }
        _ => Transition::skip(status),
    }
}

pub fn request(status: ContractStatus, action: Action) -> Transition {
    match action {
        Action::Activate => activate(status),
        Action::Complete => complete(status),
        Action::Cancel => cancel(status),
    }
}

/// The only transition no caller asks for: an `Active` contract whose due
/// date is strictly before `now` becomes `Overdue`.
pub fn reconcile_automatic(contract: &Contract, now: &TimeStamp<Utc>) -> Transition {
    let status = contract.status();
    match (status, contract.due_date()) {
        (ContractStatus::Active, Some(due)) if now > due => Transition::Applied {
            from: status,
            to: ContractStatus::Overdue,
        },
        (ContractStatus::Active, _) => Transition::NotApplicable {
            status,
            reason: Reason::NotDue,
        },
        _ => Transition::skip(status),
    }
}
