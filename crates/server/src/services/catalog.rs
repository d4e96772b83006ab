//! Route catalog: publish, look up and search driver routes.
//!
//! Search keeps the historical OR contract: a route matches when its origin
//! contains the pickup text or its destination contains the destination text.
//! Matching is case-insensitive over Unicode, so Cyrillic place names work.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::instrument;

use carpool_core::{Money, Role, RouteId, RouteStatus, UserId};

use crate::models::{CurrentUser, Route};
use crate::store::{Collection, DocumentStore, RepositoryError};

/// Errors from catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Rejected input.
    #[error("{0}")]
    Validation(String),

    /// Only drivers publish routes.
    #[error("only drivers can publish routes")]
    NotDriver,

    /// Unknown route ID.
    #[error("route not found")]
    RouteNotFound,

    /// The route is full, inactive, or has fewer seats left than requested.
    #[error("not enough seats left on this route")]
    SeatsUnavailable,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Fields a driver supplies when publishing.
#[derive(Debug, Clone)]
pub struct NewRoute {
    pub origin: String,
    pub destination: String,
    pub waypoints: Vec<String>,
    pub departure_time: String,
    pub seats: u32,
    pub price_per_seat: Money,
}

/// Route catalog service.
#[derive(Debug, Clone)]
pub struct CatalogService {
    routes: Collection<Route>,
}

impl CatalogService {
    /// Create a catalog service over `store`.
    #[must_use]
    pub fn new(store: &Arc<dyn DocumentStore>) -> Self {
        Self {
            routes: Collection::new(Arc::clone(store), "routes"),
        }
    }

    /// Publish a route for `driver`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotDriver` for passengers and
    /// `CatalogError::Validation` for blank places, zero seats or a
    /// non-positive price.
    #[instrument(skip_all, fields(driver_id = %driver.id))]
    pub async fn publish(&self, driver: &CurrentUser, new: NewRoute) -> Result<Route, CatalogError> {
        if driver.role != Role::Driver {
            return Err(CatalogError::NotDriver);
        }

        let origin = required(new.origin, "origin")?;
        let destination = required(new.destination, "destination")?;
        let departure_time = required(new.departure_time, "departureTime")?;
        if new.seats == 0 {
            return Err(CatalogError::Validation("seats must be at least 1".to_owned()));
        }
        if !new.price_per_seat.is_positive() || !new.price_per_seat.has_valid_scale() {
            return Err(CatalogError::Validation(
                "pricePerSeat must be positive with at most two decimal places".to_owned(),
            ));
        }

        let route = Route {
            id: RouteId::generate(),
            driver_id: driver.id,
            driver_name: driver.name.clone(),
            origin,
            destination,
            waypoints: new
                .waypoints
                .into_iter()
                .map(|w| w.trim().to_owned())
                .filter(|w| !w.is_empty())
                .collect(),
            departure_time,
            seats: new.seats,
            seats_left: new.seats,
            price_per_seat: new.price_per_seat,
            status: RouteStatus::Active,
            created_at: Utc::now(),
        };
        self.routes.insert(route.id, &route).await?;

        tracing::info!(route_id = %route.id, "route published");
        Ok(route)
    }

    /// Look up one route.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::RouteNotFound` if it does not exist.
    pub async fn get(&self, route_id: RouteId) -> Result<Route, CatalogError> {
        self.routes
            .get(route_id)
            .await?
            .ok_or(CatalogError::RouteNotFound)
    }

    /// Active routes matching the pickup or destination text.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn search(&self, pickup: &str, destination: &str) -> Result<Vec<Route>, CatalogError> {
        let query = SearchQuery::new(pickup, destination);
        Ok(self
            .routes
            .all()
            .await?
            .into_iter()
            .filter(|route| query.matches(route))
            .collect())
    }

    /// Every route published by `driver_id`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn list_for_driver(&self, driver_id: UserId) -> Result<Vec<Route>, CatalogError> {
        let mut routes: Vec<Route> = self
            .routes
            .all()
            .await?
            .into_iter()
            .filter(|r| r.driver_id == driver_id)
            .collect();
        routes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(routes)
    }

    /// Active routes with seats left, soonest departure first.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn upcoming(&self, limit: usize) -> Result<Vec<Route>, CatalogError> {
        let mut routes: Vec<Route> = self
            .routes
            .all()
            .await?
            .into_iter()
            .filter(|r| r.can_seat(1))
            .collect();
        routes.sort_by(|a, b| a.departure_time.cmp(&b.departure_time));
        routes.truncate(limit);
        Ok(routes)
    }

    /// Atomically take `seats` from a route.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::SeatsUnavailable` if they do not fit.
    pub async fn reserve_seats(&self, route_id: RouteId, seats: u32) -> Result<Route, CatalogError> {
        let route = self
            .routes
            .modify(route_id, |current: Option<Route>| -> Result<Route, CatalogError> {
                let mut route = current.ok_or(CatalogError::RouteNotFound)?;
                if !route.reserve_seats(seats) {
                    return Err(CatalogError::SeatsUnavailable);
                }
                Ok(route)
            })
            .await?;

        tracing::debug!(route_id = %route_id, seats_left = route.seats_left, "seats reserved");
        Ok(route)
    }

    /// Atomically give `seats` back to a route.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::RouteNotFound` if the route vanished.
    pub async fn release_seats(&self, route_id: RouteId, seats: u32) -> Result<Route, CatalogError> {
        let route = self
            .routes
            .modify(route_id, |current: Option<Route>| -> Result<Route, CatalogError> {
                let mut route = current.ok_or(CatalogError::RouteNotFound)?;
                route.release_seats(seats);
                Ok(route)
            })
            .await?;

        tracing::debug!(route_id = %route_id, seats_left = route.seats_left, "seats released");
        Ok(route)
    }
}

fn required(value: String, field: &str) -> Result<String, CatalogError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CatalogError::Validation(format!("{field} is required")));
    }
    Ok(trimmed.to_owned())
}

/// Lower-cased search terms. A blank term matches nothing on its own; two
/// blank terms match every active route.
struct SearchQuery {
    pickup: Option<String>,
    destination: Option<String>,
}

impl SearchQuery {
    fn new(pickup: &str, destination: &str) -> Self {
        let term = |s: &str| {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_lowercase())
        };
        Self {
            pickup: term(pickup),
            destination: term(destination),
        }
    }

    fn matches(&self, route: &Route) -> bool {
        if route.status != RouteStatus::Active {
            return false;
        }
        match (&self.pickup, &self.destination) {
            (None, None) => true,
            (pickup, destination) => {
                pickup
                    .as_ref()
                    .is_some_and(|p| route.origin.to_lowercase().contains(p.as_str()))
                    || destination
                        .as_ref()
                        .is_some_and(|d| route.destination.to_lowercase().contains(d.as_str()))
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use carpool_core::Email;

    use super::*;
    use crate::store::MemoryStore;

    fn catalog() -> CatalogService {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        CatalogService::new(&store)
    }

    fn user(role: Role) -> CurrentUser {
        CurrentUser {
            id: UserId::generate(),
            email: Email::parse("d@example.mn").unwrap(),
            name: "Дорж".to_owned(),
            role,
        }
    }

    fn new_route(origin: &str, destination: &str) -> NewRoute {
        NewRoute {
            origin: origin.to_owned(),
            destination: destination.to_owned(),
            waypoints: vec!["Зайсан".to_owned(), "  ".to_owned()],
            departure_time: "2026-03-01T08:00".to_owned(),
            seats: 4,
            price_per_seat: Money::from_major(5000),
        }
    }

    #[tokio::test]
    async fn test_search_matches_cyrillic_pickup_case_insensitively() {
        let catalog = catalog();
        let driver = user(Role::Driver);
        let route = catalog
            .publish(&driver, new_route("Баянзүрх дүүрэг, 3-р хороо", "Сүхбаатар талбай"))
            .await
            .unwrap();
        catalog
            .publish(&driver, new_route("Хан-Уул", "Зайсан"))
            .await
            .unwrap();

        let found = catalog.search("баянзүрх", "").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found.first().unwrap().id, route.id);

        assert!(catalog.search("", "Налайх").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_is_or_over_pickup_and_destination() {
        let catalog = catalog();
        let driver = user(Role::Driver);
        catalog.publish(&driver, new_route("Баянзүрх", "Сүхбаатар")).await.unwrap();
        catalog.publish(&driver, new_route("Хан-Уул", "Зайсан")).await.unwrap();

        let found = catalog.search("Баянзүрх", "Зайсан").await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(catalog.search("", "").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_full_routes_drop_out_of_search() {
        let catalog = catalog();
        let driver = user(Role::Driver);
        let mut new = new_route("Баянзүрх", "Сүхбаатар");
        new.seats = 1;
        let route = catalog.publish(&driver, new).await.unwrap();

        catalog.reserve_seats(route.id, 1).await.unwrap();
        assert!(catalog.search("Баянзүрх", "").await.unwrap().is_empty());
        assert!(matches!(
            catalog.reserve_seats(route.id, 1).await,
            Err(CatalogError::SeatsUnavailable)
        ));

        catalog.release_seats(route.id, 1).await.unwrap();
        assert_eq!(catalog.search("Баянзүрх", "").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_publish_validates_input_and_role() {
        let catalog = catalog();
        let driver = user(Role::Driver);

        let mut no_seats = new_route("A", "B");
        no_seats.seats = 0;
        assert!(matches!(
            catalog.publish(&driver, no_seats).await,
            Err(CatalogError::Validation(_))
        ));

        let mut free = new_route("A", "B");
        free.price_per_seat = Money::ZERO;
        assert!(matches!(
            catalog.publish(&driver, free).await,
            Err(CatalogError::Validation(_))
        ));

        assert!(matches!(
            catalog.publish(&driver, new_route("  ", "B")).await,
            Err(CatalogError::Validation(msg)) if msg == "origin is required"
        ));

        assert!(matches!(
            catalog.publish(&user(Role::Passenger), new_route("A", "B")).await,
            Err(CatalogError::NotDriver)
        ));
    }

    #[tokio::test]
    async fn test_publish_trims_and_drops_blank_waypoints() {
        let catalog = catalog();
        let route = catalog
            .publish(&user(Role::Driver), new_route(" A ", "B"))
            .await
            .unwrap();
        assert_eq!(route.origin, "A");
        assert_eq!(route.waypoints, vec!["Зайсан".to_owned()]);
        assert_eq!(route.seats_left, 4);
    }

    #[tokio::test]
    async fn test_upcoming_orders_by_departure_and_limits() {
        let catalog = catalog();
        let driver = user(Role::Driver);
        for hour in ["10", "08", "09"] {
            let mut new = new_route("A", "B");
            new.departure_time = format!("2026-03-01T{hour}:00");
            catalog.publish(&driver, new).await.unwrap();
        }
        let upcoming = catalog.upcoming(2).await.unwrap();
        let times: Vec<_> = upcoming.iter().map(|r| r.departure_time.as_str()).collect();
        assert_eq!(times, vec!["2026-03-01T08:00", "2026-03-01T09:00"]);
    }
}
