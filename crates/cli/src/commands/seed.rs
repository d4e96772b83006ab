//! Seed the database with demo accounts and routes.
//!
//! Creates one driver, one passenger and three routes across Ulaanbaatar
//! departing tomorrow. Running it twice is harmless: if the demo driver
//! already exists the command logs and stops.

use std::sync::Arc;

use chrono::{Duration, NaiveTime, Utc};
use tracing::info;

use carpool_core::{Money, Role};
use carpool_server::models::{CurrentUser, User};
use carpool_server::services::{
    AuthError, AuthService, CatalogError, CatalogService, NewRoute, Registration,
};
use carpool_server::store::DocumentStore;

use super::{CommandError, database_config};

/// Password used for both demo accounts unless overridden.
pub const DEFAULT_PASSWORD: &str = "carpool-demo";

const DRIVER_EMAIL: &str = "driver@carpool.mn";
const PASSENGER_EMAIL: &str = "passenger@carpool.mn";

/// `(origin, destination, waypoints, departure hour, seats, price per seat)`
const DEMO_ROUTES: [(&str, &str, &[&str], u32, u32, i64); 3] = [
    ("Баянзүрх", "Сүхбаатар талбай", &["Улаанбаатар төмөр зам"], 8, 3, 5000),
    ("Хан-Уул", "Их дэлгүүр", &["Зайсан", "Нисэх"], 9, 4, 4000),
    ("Чингэлтэй", "Сансар", &[], 18, 2, 6000),
];

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Create the demo data.
///
/// # Errors
///
/// Returns `SeedError` if the database is unreachable, the password is too
/// short, or a write fails.
pub async fn run(password: &str) -> Result<(), SeedError> {
    let (config, _) = database_config()?;
    let store = carpool_server::open_store(&config).await?;

    let auth = AuthService::new(&store, config.session_ttl);
    let driver = match auth.register(driver_registration(password)).await {
        Ok(user) => user,
        Err(AuthError::UserAlreadyExists) => {
            info!(email = DRIVER_EMAIL, "Demo data already present, nothing to do");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    info!(user_id = %driver.id, email = DRIVER_EMAIL, "Created demo driver");

    let passenger = auth.register(passenger_registration(password)).await?;
    info!(user_id = %passenger.id, email = PASSENGER_EMAIL, "Created demo passenger");

    seed_routes(&store, &driver).await?;

    info!("Seed complete! Both demo accounts share the password given to --password");
    Ok(())
}

async fn seed_routes(
    store: &Arc<dyn DocumentStore>,
    driver: &User,
) -> Result<(), SeedError> {
    let catalog = CatalogService::new(store);
    let current = CurrentUser {
        id: driver.id,
        email: driver.email.clone(),
        name: driver.name.clone(),
        role: driver.role,
    };
    let tomorrow = Utc::now().date_naive() + Duration::days(1);

    for (origin, destination, waypoints, hour, seats, price) in DEMO_ROUTES {
        let departure = tomorrow.and_time(NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or_default());
        let route = catalog
            .publish(
                &current,
                NewRoute {
                    origin: origin.to_owned(),
                    destination: destination.to_owned(),
                    waypoints: waypoints.iter().map(|w| (*w).to_owned()).collect(),
                    departure_time: departure.format("%Y-%m-%dT%H:%M").to_string(),
                    seats,
                    price_per_seat: Money::from_major(price),
                },
            )
            .await?;
        info!(route_id = %route.id, "{origin} -> {destination}");
    }

    Ok(())
}

fn driver_registration(password: &str) -> Registration {
    Registration {
        name: "Бат-Эрдэнэ".to_owned(),
        email: DRIVER_EMAIL.to_owned(),
        phone: "99112233".to_owned(),
        password: password.to_owned(),
        role: Role::Driver,
        vehicle_model: Some("Toyota Prius 30".to_owned()),
        vehicle_plate: Some("1234 УБА".to_owned()),
        license_number: Some("DL-0042".to_owned()),
    }
}

fn passenger_registration(password: &str) -> Registration {
    Registration {
        name: "Сарнай".to_owned(),
        email: PASSENGER_EMAIL.to_owned(),
        phone: "88114455".to_owned(),
        password: password.to_owned(),
        role: Role::Passenger,
        vehicle_model: None,
        vehicle_plate: None,
        license_number: None,
    }
}
