//! Driver-published routes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use carpool_core::{Money, RouteId, RouteStatus, UserId};

/// A scheduled origin to destination offering with seats for sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    /// Unique route ID.
    pub id: RouteId,
    /// Publishing driver.
    pub driver_id: UserId,
    /// Driver's display name at publish time.
    pub driver_name: String,
    /// Pickup area.
    pub origin: String,
    /// Drop-off area.
    pub destination: String,
    /// Intermediate stops, in order.
    #[serde(default)]
    pub waypoints: Vec<String>,
    /// Departure time as entered by the driver (ISO 8601 sorts chronologically).
    pub departure_time: String,
    /// Seats offered.
    pub seats: u32,
    /// Seats not yet reserved by an accepted ride.
    pub seats_left: u32,
    /// Price of one seat.
    pub price_per_seat: Money,
    /// `active` while seats remain.
    #[serde(default)]
    pub status: RouteStatus,
    /// When the route was published.
    pub created_at: DateTime<Utc>,
}

impl Route {
    /// `true` if `seats` more passengers fit and the route is open.
    #[must_use]
    pub fn can_seat(&self, seats: u32) -> bool {
        self.status == RouteStatus::Active && self.seats_left >= seats
    }

    /// Reserve seats for an accepted ride. Returns `false` (unchanged) if they do not fit.
    pub fn reserve_seats(&mut self, seats: u32) -> bool {
        if !self.can_seat(seats) {
            return false;
        }
        self.seats_left -= seats;
        if self.seats_left == 0 {
            self.status = RouteStatus::Full;
        }
        true
    }

    /// Give seats back after a cancellation.
    pub fn release_seats(&mut self, seats: u32) {
        self.seats_left = self.seats_left.saturating_add(seats).min(self.seats);
        if self.seats_left > 0 {
            self.status = RouteStatus::Active;
        }
    }
}
