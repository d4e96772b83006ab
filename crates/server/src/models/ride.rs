//! Rides and ratings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use carpool_core::{Money, RatingId, RideId, RideStatus, RouteId, UserId};

/// One passenger's request against a route, tracked through its lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ride {
    /// Unique ride ID.
    pub id: RideId,
    /// Route the ride was requested on.
    pub route_id: RouteId,
    /// Driver who owns the route.
    pub driver_id: UserId,
    /// Requesting passenger.
    pub passenger_id: UserId,
    /// Passenger's display name, used by the driver's feed.
    pub passenger_name: String,
    /// Pickup point.
    pub origin: String,
    /// Drop-off point.
    pub destination: String,
    /// Seats requested.
    pub seats: u32,
    /// Driver's share: price per seat times seats.
    pub fare: Money,
    /// Platform fee charged on top of the fare.
    pub service_fee: Money,
    /// What the passenger pays: fare plus service fee.
    pub total_amount: Money,
    /// Lifecycle state.
    pub status: RideStatus,
    /// When the passenger asked.
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Reported trip distance in km. Informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    /// Reported trip duration in minutes. Informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// Set once the passenger's wallet was debited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
    /// Passenger's 1-5 rating of the driver.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

impl Ride {
    /// Move to `next` and stamp the matching timestamp.
    ///
    /// Returns `false` (and changes nothing) if the lifecycle forbids the move.
    pub fn advance(&mut self, next: RideStatus, at: DateTime<Utc>) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        self.status = next;
        let stamp = match next {
            RideStatus::Accepted => &mut self.accepted_at,
            RideStatus::Rejected => &mut self.rejected_at,
            RideStatus::Seated => &mut self.seated_at,
            RideStatus::Completed => &mut self.completed_at,
            RideStatus::Cancelled => &mut self.cancelled_at,
            RideStatus::Pending => return true,
        };
        *stamp = Some(at);
        true
    }

    /// `true` if `user` is this ride's driver or passenger.
    #[must_use]
    pub fn involves(&self, user: UserId) -> bool {
        self.driver_id == user || self.passenger_id == user
    }
}

/// A passenger's rating of a completed ride.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub id: RatingId,
    pub ride_id: RideId,
    pub driver_id: UserId,
    pub passenger_id: UserId,
    /// 1 to 5 stars.
    pub rating: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    pub created_at: DateTime<Utc>,
}
