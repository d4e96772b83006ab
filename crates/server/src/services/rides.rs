//! Ride lifecycle, payment and rating.
//!
//! Every status change is a compare-and-set on `rides:{id}` validated against
//! [`RideStatus::can_transition_to`]; terminal rides never move again. Seats
//! are reserved on the route when a ride is accepted and released when a
//! seat-holding ride is cancelled.
//!
//! Multi-document steps are ordered so a failure leaves a consistent or
//! logged state:
//!
//! - request: write the ride, then claim `ride_requests:{route}:{passenger}`;
//!   the ride is removed again if the passenger already holds an open claim.
//! - accept: reserve seats, then transition; the seats are released if the
//!   transition loses. Until then they count as taken, so on a nearly full
//!   route an accept of another ride can see a transient `SeatsUnavailable`
//!   that succeeds on retry. Seats are never handed out twice.
//! - complete: transition, then credit the driver. A failed credit is logged
//!   and leaves the ride completed without the ledger entry.
//! - pay: claim `paidAt` on the ride, then debit; the claim is reverted if
//!   the debit fails. Only completed rides take payment, so a paid ride is
//!   terminal and its debit can never be stranded by a reject or cancel.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::instrument;

use carpool_core::{Money, RatingId, RideId, RideStatus, Role, RouteId, UserId};

use crate::models::{CurrentUser, Rating, Ride};
use crate::services::catalog::{CatalogError, CatalogService};
use crate::services::wallet::{RIDE_INCOME, RIDE_PAYMENT, WalletError, WalletService};
use crate::store::{Collection, DocumentStore, RepositoryError};

/// Errors from ride operations.
#[derive(Debug, Error)]
pub enum RideError {
    /// Rejected input.
    #[error("{0}")]
    Validation(String),

    /// Unknown ride ID.
    #[error("ride not found")]
    RideNotFound,

    /// Drivers cannot request rides.
    #[error("only passengers can request rides")]
    NotPassenger,

    /// Caller is not this ride's driver.
    #[error("only the ride's driver can do this")]
    NotRideDriver,

    /// Caller is not this ride's passenger.
    #[error("only the ride's passenger can do this")]
    NotRidePassenger,

    /// Caller is neither driver nor passenger of this ride.
    #[error("you are not part of this ride")]
    NotParticipant,

    /// The lifecycle forbids this move.
    #[error("cannot move ride from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: RideStatus,
        /// Requested status.
        to: RideStatus,
    },

    /// Passenger already has a pending, accepted or seated ride on this route.
    #[error("you already have an open request on this route")]
    DuplicateRequest,

    /// The ride has been paid for.
    #[error("ride is already paid")]
    AlreadyPaid,

    /// Only completed rides can be paid.
    #[error("a {status} ride cannot be paid")]
    NotPayable {
        /// Current status.
        status: RideStatus,
    },

    /// Client-sent amount differs from the ride total.
    #[error("payment amount must equal the ride total of {expected}")]
    AmountMismatch {
        /// The ride's `totalAmount`.
        expected: Money,
    },

    /// Only completed rides can be rated.
    #[error("only completed rides can be rated")]
    NotRateable,

    /// The ride already carries a rating.
    #[error("ride is already rated")]
    AlreadyRated,

    /// Seat bookkeeping or route lookup failed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Payment failed.
    #[error(transparent)]
    Wallet(#[from] WalletError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// A passenger's request for seats on a route.
#[derive(Debug, Clone)]
pub struct RideRequest {
    pub route_id: RouteId,
    /// Defaults to one seat.
    pub seats: Option<u32>,
    /// Defaults to the route's origin.
    pub origin: Option<String>,
    /// Defaults to the route's destination.
    pub destination: Option<String>,
}

/// Trip metrics reported on completion. Stored for display only.
#[derive(Debug, Clone, Copy, Default)]
pub struct TripMetrics {
    /// Kilometres.
    pub distance: Option<f64>,
    /// Minutes.
    pub duration: Option<f64>,
}

impl TripMetrics {
    fn validate(self) -> Result<Self, RideError> {
        for (name, value) in [("distance", self.distance), ("duration", self.duration)] {
            if value.is_some_and(|v| !v.is_finite() || v < 0.0) {
                return Err(RideError::Validation(format!(
                    "{name} must be a non-negative number"
                )));
            }
        }
        Ok(self)
    }
}

/// Who may perform an operation on a ride.
#[derive(Debug, Clone, Copy)]
enum Actor {
    Driver,
    Passenger,
    Either,
}

fn authorize(ride: &Ride, user: UserId, actor: Actor) -> Result<(), RideError> {
    match actor {
        Actor::Driver if ride.driver_id != user => Err(RideError::NotRideDriver),
        Actor::Passenger if ride.passenger_id != user => Err(RideError::NotRidePassenger),
        Actor::Either if !ride.involves(user) => Err(RideError::NotParticipant),
        _ => Ok(()),
    }
}

/// Ride lifecycle service.
#[derive(Debug, Clone)]
pub struct RideService {
    rides: Collection<Ride>,
    requests: Collection<RideId>,
    ratings: Collection<Rating>,
    catalog: CatalogService,
    wallet: WalletService,
    service_fee: Money,
}

impl RideService {
    /// Create a ride service. `service_fee` is added to every fare.
    #[must_use]
    pub fn new(store: &Arc<dyn DocumentStore>, service_fee: Money) -> Self {
        Self {
            rides: Collection::new(Arc::clone(store), "rides"),
            requests: Collection::new(Arc::clone(store), "ride_requests"),
            ratings: Collection::new(Arc::clone(store), "ratings"),
            catalog: CatalogService::new(store),
            wallet: WalletService::new(store),
            service_fee,
        }
    }

    /// Create a pending ride on a route.
    ///
    /// The fare is computed here from the route price; nothing monetary is
    /// taken from the client.
    ///
    /// # Errors
    ///
    /// - `RideError::NotPassenger` if a driver calls this
    /// - `CatalogError::RouteNotFound` / `SeatsUnavailable` (wrapped)
    /// - `RideError::DuplicateRequest` if an open request already exists
    #[instrument(skip_all, fields(passenger_id = %passenger.id, route_id = %request.route_id))]
    pub async fn request(
        &self,
        passenger: &CurrentUser,
        request: RideRequest,
    ) -> Result<Ride, RideError> {
        if passenger.role != Role::Passenger {
            return Err(RideError::NotPassenger);
        }
        let seats = request.seats.unwrap_or(1);
        if seats == 0 {
            return Err(RideError::Validation("seats must be at least 1".to_owned()));
        }

        let route = self.catalog.get(request.route_id).await?;
        if !route.can_seat(seats) {
            return Err(CatalogError::SeatsUnavailable.into());
        }

        let fare = route
            .price_per_seat
            .checked_mul(seats)
            .ok_or_else(|| RideError::Validation("fare is too large".to_owned()))?;
        let total_amount = fare
            .checked_add(self.service_fee)
            .ok_or_else(|| RideError::Validation("fare is too large".to_owned()))?;

        let non_blank = |s: Option<String>| {
            s.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty())
        };
        let ride = Ride {
            id: RideId::generate(),
            route_id: route.id,
            driver_id: route.driver_id,
            passenger_id: passenger.id,
            passenger_name: passenger.name.clone(),
            origin: non_blank(request.origin).unwrap_or_else(|| route.origin.clone()),
            destination: non_blank(request.destination).unwrap_or(route.destination),
            seats,
            fare,
            service_fee: self.service_fee,
            total_amount,
            status: RideStatus::Pending,
            created_at: Utc::now(),
            accepted_at: None,
            rejected_at: None,
            seated_at: None,
            completed_at: None,
            cancelled_at: None,
            distance: None,
            duration: None,
            paid_at: None,
            rating: None,
            feedback: None,
        };
        self.rides.insert(ride.id, &ride).await?;
        if let Err(e) = self.claim_request(&ride).await {
            if let Err(cleanup) = self.rides.remove(ride.id).await {
                tracing::error!(ride_id = %ride.id, error = %cleanup, "failed to remove unclaimed ride request");
            }
            return Err(e);
        }

        tracing::info!(ride_id = %ride.id, fare = %ride.fare, "ride requested");
        Ok(ride)
    }

    /// Look up one ride.
    ///
    /// # Errors
    ///
    /// Returns `RideError::RideNotFound` if it does not exist.
    pub async fn get(&self, ride_id: RideId) -> Result<Ride, RideError> {
        self.rides.get(ride_id).await?.ok_or(RideError::RideNotFound)
    }

    /// Pending requests on `driver_id`'s routes, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RideError::Repository` if the store fails.
    pub async fn pending_for_driver(&self, driver_id: UserId) -> Result<Vec<Ride>, RideError> {
        let mut rides: Vec<Ride> = self
            .rides
            .all()
            .await?
            .into_iter()
            .filter(|r| r.driver_id == driver_id && r.status == RideStatus::Pending)
            .collect();
        rides.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(rides)
    }

    /// Driver accepts a pending request, reserving its seats on the route.
    ///
    /// # Errors
    ///
    /// Returns `RideError::NotRideDriver`, `RideError::InvalidTransition`, or
    /// `CatalogError::SeatsUnavailable` (wrapped) if the route filled up.
    #[instrument(skip_all, fields(ride_id = %ride_id))]
    pub async fn accept(&self, driver: &CurrentUser, ride_id: RideId) -> Result<Ride, RideError> {
        let ride = self.get(ride_id).await?;
        authorize(&ride, driver.id, Actor::Driver)?;
        if !ride.status.can_transition_to(RideStatus::Accepted) {
            return Err(RideError::InvalidTransition {
                from: ride.status,
                to: RideStatus::Accepted,
            });
        }

        self.catalog.reserve_seats(ride.route_id, ride.seats).await?;

        match self
            .transition(driver.id, ride_id, Actor::Driver, RideStatus::Accepted, |_| {})
            .await
        {
            Ok((accepted, _)) => Ok(accepted),
            Err(e) => {
                self.release_seats(ride.route_id, ride.seats).await;
                Err(e)
            }
        }
    }

    /// Driver turns down a pending request.
    ///
    /// # Errors
    ///
    /// Returns `RideError::NotRideDriver` or `RideError::InvalidTransition`.
    pub async fn reject(&self, driver: &CurrentUser, ride_id: RideId) -> Result<Ride, RideError> {
        self.transition(driver.id, ride_id, Actor::Driver, RideStatus::Rejected, |_| {})
            .await
            .map(|(ride, _)| ride)
    }

    /// Driver confirms the passenger is in the car.
    ///
    /// # Errors
    ///
    /// Returns `RideError::NotRideDriver` or `RideError::InvalidTransition`.
    pub async fn mark_seated(&self, driver: &CurrentUser, ride_id: RideId) -> Result<Ride, RideError> {
        self.transition(driver.id, ride_id, Actor::Driver, RideStatus::Seated, |_| {})
            .await
            .map(|(ride, _)| ride)
    }

    /// Driver finishes the trip; the driver's wallet is credited `ride.fare`.
    ///
    /// # Errors
    ///
    /// Returns `RideError::Validation` for negative or non-finite metrics,
    /// `RideError::NotRideDriver` or `RideError::InvalidTransition`.
    #[instrument(skip_all, fields(ride_id = %ride_id))]
    pub async fn complete(
        &self,
        driver: &CurrentUser,
        ride_id: RideId,
        metrics: TripMetrics,
    ) -> Result<Ride, RideError> {
        let metrics = metrics.validate()?;
        let (ride, _) = self
            .transition(driver.id, ride_id, Actor::Driver, RideStatus::Completed, |ride| {
                ride.distance = metrics.distance;
                ride.duration = metrics.duration;
            })
            .await?;

        if let Err(e) = self
            .wallet
            .credit(ride.driver_id, ride.fare, RIDE_INCOME, Some(ride.id))
            .await
        {
            tracing::error!(
                ride_id = %ride.id,
                driver_id = %ride.driver_id,
                fare = %ride.fare,
                error = %e,
                "ride completed but driver credit failed"
            );
        }

        Ok(ride)
    }

    /// Driver or passenger calls the ride off. Held seats go back to the route.
    ///
    /// # Errors
    ///
    /// Returns `RideError::NotParticipant` or `RideError::InvalidTransition`.
    pub async fn cancel(&self, user: &CurrentUser, ride_id: RideId) -> Result<Ride, RideError> {
        let (ride, previous) = self
            .transition(user.id, ride_id, Actor::Either, RideStatus::Cancelled, |_| {})
            .await?;
        if previous.holds_seats() {
            self.release_seats(ride.route_id, ride.seats).await;
        }
        Ok(ride)
    }

    /// Passenger pays `totalAmount` from their wallet. Returns the ride and
    /// the remaining balance.
    ///
    /// # Errors
    ///
    /// - `RideError::AmountMismatch` if `amount` is given and differs from the total
    /// - `RideError::NotPayable` unless the ride is completed
    /// - `RideError::AlreadyPaid` on a second payment
    /// - `WalletError::InsufficientBalance` (wrapped), balance unchanged
    #[instrument(skip_all, fields(ride_id = %ride_id))]
    pub async fn pay(
        &self,
        passenger: &CurrentUser,
        ride_id: RideId,
        amount: Option<Money>,
    ) -> Result<(Ride, Money), RideError> {
        let now = Utc::now();
        let ride = self
            .rides
            .modify(ride_id, |current: Option<Ride>| -> Result<Ride, RideError> {
                let mut ride = current.ok_or(RideError::RideNotFound)?;
                authorize(&ride, passenger.id, Actor::Passenger)?;
                if ride.status != RideStatus::Completed {
                    return Err(RideError::NotPayable {
                        status: ride.status,
                    });
                }
                if ride.paid_at.is_some() {
                    return Err(RideError::AlreadyPaid);
                }
                if let Some(amount) = amount
                    && amount != ride.total_amount
                {
                    return Err(RideError::AmountMismatch {
                        expected: ride.total_amount,
                    });
                }
                ride.paid_at = Some(now);
                Ok(ride)
            })
            .await?;

        match self
            .wallet
            .debit(passenger.id, ride.total_amount, RIDE_PAYMENT, Some(ride.id))
            .await
        {
            Ok(balance) => {
                tracing::info!(amount = %ride.total_amount, "ride paid");
                Ok((ride, balance))
            }
            Err(e) => {
                let revert = self
                    .rides
                    .modify(ride_id, |current: Option<Ride>| -> Result<Ride, RideError> {
                        let mut ride = current.ok_or(RideError::RideNotFound)?;
                        ride.paid_at = None;
                        Ok(ride)
                    })
                    .await;
                if let Err(revert_err) = revert {
                    tracing::error!(error = %revert_err, "failed to clear payment claim after failed debit");
                }
                Err(e.into())
            }
        }
    }

    /// Passenger rates a completed ride once.
    ///
    /// # Errors
    ///
    /// Returns `RideError::Validation` for ratings outside 1-5,
    /// `RideError::NotRateable` before completion and `RideError::AlreadyRated`
    /// on a second attempt.
    pub async fn rate(
        &self,
        passenger: &CurrentUser,
        ride_id: RideId,
        rating: u8,
        feedback: Option<String>,
    ) -> Result<Rating, RideError> {
        if !(1..=5).contains(&rating) {
            return Err(RideError::Validation(
                "rating must be between 1 and 5".to_owned(),
            ));
        }
        let feedback = feedback
            .map(|f| f.trim().to_owned())
            .filter(|f| !f.is_empty());

        let ride = self
            .rides
            .modify(ride_id, |current: Option<Ride>| -> Result<Ride, RideError> {
                let mut ride = current.ok_or(RideError::RideNotFound)?;
                authorize(&ride, passenger.id, Actor::Passenger)?;
                if ride.status != RideStatus::Completed {
                    return Err(RideError::NotRateable);
                }
                if ride.rating.is_some() {
                    return Err(RideError::AlreadyRated);
                }
                ride.rating = Some(rating);
                ride.feedback.clone_from(&feedback);
                Ok(ride)
            })
            .await?;

        let record = Rating {
            id: RatingId::generate(),
            ride_id: ride.id,
            driver_id: ride.driver_id,
            passenger_id: ride.passenger_id,
            rating,
            feedback,
            created_at: Utc::now(),
        };
        self.ratings.insert(record.id, &record).await?;

        tracing::info!(ride_id = %ride.id, rating, "ride rated");
        Ok(record)
    }

    /// Compare-and-set status change. Returns the updated ride and the status
    /// it had before.
    async fn transition<F>(
        &self,
        user: UserId,
        ride_id: RideId,
        actor: Actor,
        next: RideStatus,
        mut update: F,
    ) -> Result<(Ride, RideStatus), RideError>
    where
        F: FnMut(&mut Ride) + Send,
    {
        let now = Utc::now();
        let mut previous = RideStatus::Pending;
        let ride = self
            .rides
            .modify(ride_id, |current: Option<Ride>| -> Result<Ride, RideError> {
                let mut ride = current.ok_or(RideError::RideNotFound)?;
                authorize(&ride, user, actor)?;
                previous = ride.status;
                if !ride.advance(next, now) {
                    return Err(RideError::InvalidTransition {
                        from: ride.status,
                        to: next,
                    });
                }
                update(&mut ride);
                Ok(ride)
            })
            .await?;

        tracing::info!(ride_id = %ride_id, from = %previous, to = %next, "ride status changed");
        Ok((ride, previous))
    }

    /// Point `ride_requests:{route}:{passenger}` at `ride`.
    ///
    /// The key is only taken over from a ride that is no longer open. The
    /// ride document is written before the claim, so a claim never names a
    /// ride that is still on its way into the store.
    async fn claim_request(&self, ride: &Ride) -> Result<(), RideError> {
        let key = format!("{}:{}", ride.route_id, ride.passenger_id);
        let held = self.requests.get(&key).await?;
        if let Some(held) = held
            && self.rides.get(held).await?.is_some_and(|r| r.status.is_open())
        {
            return Err(RideError::DuplicateRequest);
        }

        self.requests
            .modify(&key, |current: Option<RideId>| -> Result<RideId, RideError> {
                if current == held {
                    Ok(ride.id)
                } else {
                    Err(RideError::DuplicateRequest)
                }
            })
            .await?;
        Ok(())
    }

    async fn release_seats(&self, route_id: RouteId, seats: u32) {
        if let Err(e) = self.catalog.release_seats(route_id, seats).await {
            tracing::error!(route_id = %route_id, seats, error = %e, "failed to release seats");
        }
    }
}
