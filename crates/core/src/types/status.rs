//! Closed status and role enums.
//!
//! Unknown strings are rejected when parsing or deserializing, so a status that
//! is not listed here can never reach storage.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Error returned when a string does not name a known variant.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value}")]
pub struct UnknownVariant {
    /// What was being parsed (`role`, `ride status`, ...).
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

macro_rules! string_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// Wire representation.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(UnknownVariant {
                        kind: $kind,
                        value: s.to_owned(),
                    }),
                }
            }
        }
    };
}

/// Account role, fixed at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Publishes routes and carries passengers.
    Driver,
    /// Searches routes and requests rides.
    Passenger,
}

string_enum!(Role, "role", {
    Driver => "driver",
    Passenger => "passenger",
});

/// Status of a published route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RouteStatus {
    /// Open for ride requests.
    #[default]
    Active,
    /// Every seat is reserved by an accepted ride.
    Full,
}

string_enum!(RouteStatus, "route status", {
    Active => "active",
    Full => "full",
});

/// Status of a ride through its lifecycle.
///
/// ```text
/// pending ──► accepted ──► seated ──► completed
///    │  │         │           │
///    │  └► rejected           │
///    └─────────┴──────────────┴──► cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RideStatus {
    /// Requested by a passenger, awaiting the driver.
    #[default]
    Pending,
    /// Driver accepted; seats are reserved on the route.
    Accepted,
    /// Driver rejected the request.
    Rejected,
    /// Passenger is in the car.
    Seated,
    /// Trip finished and the driver was credited.
    Completed,
    /// Called off by the driver or the passenger.
    Cancelled,
}

string_enum!(RideStatus, "ride status", {
    Pending => "pending",
    Accepted => "accepted",
    Rejected => "rejected",
    Seated => "seated",
    Completed => "completed",
    Cancelled => "cancelled",
});

impl RideStatus {
    /// `true` for states that admit no further transition.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Rejected | Self::Cancelled)
    }

    /// `true` while the ride still involves its passenger (pending, accepted or seated).
    #[must_use]
    pub const fn is_open(self) -> bool {
        !self.is_terminal()
    }

    /// `true` if seats on the route are held for this ride.
    #[must_use]
    pub const fn holds_seats(self) -> bool {
        matches!(self, Self::Accepted | Self::Seated)
    }

    /// Whether the lifecycle allows moving from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Accepted | Self::Rejected | Self::Cancelled)
                | (Self::Accepted, Self::Seated | Self::Cancelled)
                | (Self::Seated, Self::Completed | Self::Cancelled)
        )
    }
}

/// Kind of a wallet ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Money earned, e.g. a driver's fare.
    Incoming,
    /// Money leaving the wallet: ride payments and withdrawals.
    Outgoing,
    /// Top-up by the wallet owner.
    Add,
}

string_enum!(TransactionKind, "transaction type", {
    Incoming => "incoming",
    Outgoing => "outgoing",
    Add => "add",
});
