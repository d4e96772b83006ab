//! Read-side projections for the driver and passenger home screens.
//!
//! Nothing here writes. The projections are plain functions over a ride list
//! and a clock so they can be tested without a store.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use carpool_core::{Money, RideId, RideStatus, UserId};

use crate::models::{Ride, Route};
use crate::services::catalog::{CatalogError, CatalogService};
use crate::store::{Collection, DocumentStore, RepositoryError};

/// Entries shown on the driver dashboard.
const DASHBOARD_NOTIFICATIONS: usize = 5;

/// Routes suggested on the passenger dashboard.
const NEARBY_ROUTES: usize = 5;

/// Errors from dashboard queries.
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// A pending ride request as shown in the driver's feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub message: String,
    pub relative_time: String,
    pub ride_id: RideId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverStats {
    /// Rides completed since midnight UTC.
    pub today_rides: usize,
    pub today_income: Money,
    /// Accepted or seated rides.
    pub active_rides: usize,
    pub total_income: Money,
}

#[derive(Debug, Clone, Serialize)]
pub struct DriverDashboard {
    pub stats: DriverStats,
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassengerStats {
    /// Completed rides.
    pub total_rides: usize,
    /// Sum of paid ride totals.
    pub total_spent: Money,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassengerDashboard {
    pub stats: PassengerStats,
    pub nearby_routes: Vec<Route>,
}

/// Render the age of `then` as seen at `now`.
#[must_use]
pub fn relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(then);
    let minutes = elapsed.num_minutes();
    if minutes < 1 {
        "just now".to_owned()
    } else if minutes < 60 {
        format!("{minutes} min ago")
    } else if elapsed.num_hours() < 24 {
        format!("{} h ago", elapsed.num_hours())
    } else {
        format!("{} d ago", elapsed.num_days())
    }
}

/// Pending requests on `driver_id`'s routes, newest first.
#[must_use]
pub fn feed(rides: &[Ride], driver_id: UserId, now: DateTime<Utc>) -> Vec<Notification> {
    let mut pending: Vec<&Ride> = rides
        .iter()
        .filter(|r| r.driver_id == driver_id && r.status == RideStatus::Pending)
        .collect();
    pending.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    pending
        .into_iter()
        .map(|ride| {
            let name = ride.passenger_name.trim();
            let name = if name.is_empty() { "A passenger" } else { name };
            Notification {
                message: format!("{name} requested a ride on your route"),
                relative_time: relative_time(ride.created_at, now),
                ride_id: ride.id,
            }
        })
        .collect()
}

#[must_use]
pub fn driver_stats(rides: &[Ride], driver_id: UserId, now: DateTime<Utc>) -> DriverStats {
    let today = now.date_naive();
    let mine = || rides.iter().filter(move |r| r.driver_id == driver_id);
    let completed = || mine().filter(|r| r.status == RideStatus::Completed);
    let completed_today = || {
        completed().filter(move |r| r.completed_at.is_some_and(|at| at.date_naive() == today))
    };

    DriverStats {
        today_rides: completed_today().count(),
        today_income: completed_today().map(|r| r.fare).sum(),
        active_rides: mine()
            .filter(|r| matches!(r.status, RideStatus::Accepted | RideStatus::Seated))
            .count(),
        total_income: completed().map(|r| r.fare).sum(),
    }
}

#[must_use]
pub fn passenger_stats(rides: &[Ride], passenger_id: UserId) -> PassengerStats {
    let mine = || rides.iter().filter(move |r| r.passenger_id == passenger_id);
    PassengerStats {
        total_rides: mine().filter(|r| r.status == RideStatus::Completed).count(),
        total_spent: mine()
            .filter(|r| r.paid_at.is_some())
            .map(|r| r.total_amount)
            .sum(),
    }
}

/// Loads rides and routes for the dashboard projections.
#[derive(Debug, Clone)]
pub struct DashboardService {
    rides: Collection<Ride>,
    catalog: CatalogService,
}

impl DashboardService {
    #[must_use]
    pub fn new(store: &Arc<dyn DocumentStore>) -> Self {
        Self {
            rides: Collection::new(Arc::clone(store), "rides"),
            catalog: CatalogService::new(store),
        }
    }

    /// The driver's full notification feed.
    ///
    /// # Errors
    ///
    /// Returns `DashboardError::Repository` if the store fails.
    pub async fn notifications(&self, driver_id: UserId) -> Result<Vec<Notification>, DashboardError> {
        let rides = self.rides.all().await?;
        Ok(feed(&rides, driver_id, Utc::now()))
    }

    /// # Errors
    ///
    /// Returns `DashboardError::Repository` if the store fails.
    pub async fn driver(&self, driver_id: UserId) -> Result<DriverDashboard, DashboardError> {
        let rides = self.rides.all().await?;
        let now = Utc::now();
        let mut notifications = feed(&rides, driver_id, now);
        notifications.truncate(DASHBOARD_NOTIFICATIONS);

        Ok(DriverDashboard {
            stats: driver_stats(&rides, driver_id, now),
            notifications,
        })
    }

    /// # Errors
    ///
    /// Returns `DashboardError` if the store fails.
    pub async fn passenger(&self, passenger_id: UserId) -> Result<PassengerDashboard, DashboardError> {
        let rides = self.rides.all().await?;
        Ok(PassengerDashboard {
            stats: passenger_stats(&rides, passenger_id),
            nearby_routes: self.catalog.upcoming(NEARBY_ROUTES).await?,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeDelta, TimeZone};

    use carpool_core::RouteId;

    use super::*;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, hour, minute, 0).unwrap()
    }

    fn ride(driver: UserId, passenger: UserId, status: RideStatus, created_at: DateTime<Utc>) -> Ride {
        Ride {
            id: RideId::generate(),
            route_id: RouteId::generate(),
            driver_id: driver,
            passenger_id: passenger,
            passenger_name: "Болд".to_owned(),
            origin: "Баянзүрх".to_owned(),
            destination: "Сүхбаатар талбай".to_owned(),
            seats: 1,
            fare: Money::from_major(5000),
            service_fee: Money::from_major(500),
            total_amount: Money::from_major(5500),
            status,
            created_at,
            accepted_at: None,
            rejected_at: None,
            seated_at: None,
            completed_at: (status == RideStatus::Completed).then_some(created_at),
            cancelled_at: None,
            distance: None,
            duration: None,
            paid_at: None,
            rating: None,
            feedback: None,
        }
    }

    #[test]
    fn test_relative_time_buckets() {
        let now = at(12, 0);
        assert_eq!(relative_time(now, now), "just now");
        assert_eq!(relative_time(now - TimeDelta::seconds(59), now), "just now");
        assert_eq!(relative_time(now - TimeDelta::minutes(5), now), "5 min ago");
        assert_eq!(relative_time(now - TimeDelta::minutes(59), now), "59 min ago");
        assert_eq!(relative_time(now - TimeDelta::hours(3), now), "3 h ago");
        assert_eq!(relative_time(now - TimeDelta::days(2), now), "2 d ago");
        assert_eq!(relative_time(now + TimeDelta::minutes(5), now), "just now");
    }

    #[test]
    fn test_feed_lists_only_own_pending_rides_newest_first() {
        let driver = UserId::generate();
        let passenger = UserId::generate();
        let older = ride(driver, passenger, RideStatus::Pending, at(9, 0));
        let mut newer = ride(driver, passenger, RideStatus::Pending, at(11, 30));
        newer.passenger_name = "  ".to_owned();
        let rides = vec![
            older.clone(),
            newer.clone(),
            ride(driver, passenger, RideStatus::Accepted, at(11, 0)),
            ride(UserId::generate(), passenger, RideStatus::Pending, at(11, 0)),
        ];

        let items = feed(&rides, driver, at(12, 0));
        assert_eq!(
            items,
            vec![
                Notification {
                    message: "A passenger requested a ride on your route".to_owned(),
                    relative_time: "30 min ago".to_owned(),
                    ride_id: newer.id,
                },
                Notification {
                    message: "Болд requested a ride on your route".to_owned(),
                    relative_time: "3 h ago".to_owned(),
                    ride_id: older.id,
                },
            ]
        );
    }

    #[test]
    fn test_driver_stats() {
        let driver = UserId::generate();
        let passenger = UserId::generate();
        let yesterday = at(10, 0) - TimeDelta::days(1);
        let rides = vec![
            ride(driver, passenger, RideStatus::Completed, at(8, 0)),
            ride(driver, passenger, RideStatus::Completed, yesterday),
            ride(driver, passenger, RideStatus::Accepted, at(9, 0)),
            ride(driver, passenger, RideStatus::Seated, at(9, 0)),
            ride(driver, passenger, RideStatus::Cancelled, at(9, 0)),
            ride(UserId::generate(), passenger, RideStatus::Completed, at(8, 0)),
        ];

        let stats = driver_stats(&rides, driver, at(12, 0));
        assert_eq!(
            stats,
            DriverStats {
                today_rides: 1,
                today_income: Money::from_major(5000),
                active_rides: 2,
                total_income: Money::from_major(10000),
            }
        );
    }

    #[test]
    fn test_passenger_stats_count_only_paid_totals() {
        let driver = UserId::generate();
        let passenger = UserId::generate();
        let mut paid = ride(driver, passenger, RideStatus::Completed, at(8, 0));
        paid.paid_at = Some(at(8, 30));
        let rides = vec![
            paid,
            ride(driver, passenger, RideStatus::Completed, at(9, 0)),
            ride(driver, passenger, RideStatus::Pending, at(10, 0)),
        ];

        let stats = passenger_stats(&rides, passenger);
        assert_eq!(stats.total_rides, 2);
        assert_eq!(stats.total_spent, Money::from_major(5500));
        assert_eq!(passenger_stats(&rides, driver).total_spent, Money::ZERO);
    }

    #[tokio::test]
    async fn test_empty_store_gives_empty_dashboards() {
        let store: Arc<dyn DocumentStore> = Arc::new(crate::store::MemoryStore::new());
        let service = DashboardService::new(&store);
        let user = UserId::generate();

        let driver = service.driver(user).await.unwrap();
        assert_eq!(driver.stats.total_income, Money::ZERO);
        assert!(driver.notifications.is_empty());

        let passenger = service.passenger(user).await.unwrap();
        assert_eq!(passenger.stats.total_rides, 0);
        assert!(passenger.nearby_routes.is_empty());
    }
}
