//! Ride lifecycle over HTTP: request, accept, seat, complete, pay, rate.

use reqwest::StatusCode;
use serde_json::json;

use carpool_core::Decimal;
use carpool_integration_tests::{TestContext, TestUser, money};

struct Trip {
    ctx: TestContext,
    driver: TestUser,
    passenger: TestUser,
    route_id: String,
}

impl Trip {
    async fn new(seats: u32) -> Self {
        let ctx = TestContext::new().await;
        let driver = ctx.signup("driver", "driver@example.mn").await;
        let passenger = ctx.signup("passenger", "passenger@example.mn").await;
        let route = ctx
            .publish_route(&driver, "Баянзүрх", "Сүхбаатар талбай", seats, 5000)
            .await;
        let route_id = route["id"].as_str().unwrap_or_default().to_owned();
        Self {
            ctx,
            driver,
            passenger,
            route_id,
        }
    }

    async fn request(&self, seats: u32) -> String {
        let resp = self
            .ctx
            .post(
                "/rides/request",
                Some(&self.passenger.token),
                json!({ "routeId": self.route_id, "seats": seats }),
            )
            .await;
        assert_eq!(resp.status, StatusCode::CREATED, "{}", resp.body);
        resp.body["ride"]["id"].as_str().unwrap_or_default().to_owned()
    }

    async fn driver_action(&self, ride_id: &str, action: &str) -> (StatusCode, serde_json::Value) {
        let resp = self
            .ctx
            .put(&format!("/rides/{ride_id}/{action}"), &self.driver.token, None)
            .await;
        (resp.status, resp.body)
    }

    async fn drive_to_completion(&self, ride_id: &str) {
        for action in ["accept", "seated", "complete"] {
            let (status, body) = self.driver_action(ride_id, action).await;
            assert_eq!(status, StatusCode::OK, "{action}: {body}");
        }
    }

    async fn pay(&self, ride_id: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let resp = self
            .ctx
            .post(&format!("/rides/{ride_id}/pay"), Some(&self.passenger.token), body)
            .await;
        (resp.status, resp.body)
    }

    async fn seats_left(&self) -> u64 {
        let resp = self.ctx.get(&format!("/routes/{}", self.route_id), None).await;
        resp.body["route"]["seatsLeft"].as_u64().unwrap_or_default()
    }
}

#[tokio::test]
async fn test_full_ride_lifecycle() {
    let trip = Trip::new(3).await;
    let ctx = &trip.ctx;

    let ride_id = trip.request(1).await;
    let ride = ctx.get(&format!("/rides/{ride_id}"), None).await.body["ride"].clone();
    assert_eq!(ride["status"], "pending");
    assert_eq!(money(&ride["fare"]), Decimal::from(5000));
    assert_eq!(money(&ride["serviceFee"]), Decimal::from(500));
    assert_eq!(money(&ride["totalAmount"]), Decimal::from(5500));

    // The driver sees the request
    let pending = ctx
        .get(&format!("/rides/requests?driverId={}", trip.driver.id), None)
        .await;
    assert_eq!(pending.status, StatusCode::OK);
    assert_eq!(pending.body["requests"][0]["id"], ride_id.as_str());

    let (status, body) = trip.driver_action(&ride_id, "accept").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ride"]["status"], "accepted");
    assert_eq!(trip.seats_left().await, 2);

    let (status, body) = trip.driver_action(&ride_id, "seated").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ride"]["status"], "seated");

    let resp = ctx
        .put(
            &format!("/rides/{ride_id}/complete"),
            &trip.driver.token,
            Some(json!({ "distance": 7.4, "duration": 22 })),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["ride"]["status"], "completed");
    assert_eq!(resp.body["ride"]["distance"], 7.4);

    // Driver is credited the fare, not the fee
    let wallet = ctx.get("/wallet", Some(&trip.driver.token)).await;
    assert_eq!(money(&wallet.body["balance"]), Decimal::from(5000));
    let tx = &wallet.body["transactions"][0];
    assert_eq!(tx["type"], "incoming");
    assert_eq!(money(&tx["amount"]), Decimal::from(5000));
    assert_eq!(tx["rideId"], ride_id.as_str());

    // Passenger tops up and pays the total
    ctx.top_up(&trip.passenger, 6000).await;
    let paid = ctx
        .post(
            &format!("/rides/{ride_id}/pay"),
            Some(&trip.passenger.token),
            json!({}),
        )
        .await;
    assert_eq!(paid.status, StatusCode::OK, "{}", paid.body);
    assert_eq!(paid.body["success"], true);
    assert_eq!(money(&paid.body["balance"]), Decimal::from(500));

    let again = ctx
        .post(
            &format!("/rides/{ride_id}/pay"),
            Some(&trip.passenger.token),
            json!({}),
        )
        .await;
    assert_eq!(again.status, StatusCode::CONFLICT);

    let rated = ctx
        .post(
            &format!("/rides/{ride_id}/rate"),
            Some(&trip.passenger.token),
            json!({ "rating": 5, "feedback": "Сайн жолооч" }),
        )
        .await;
    assert_eq!(rated.status, StatusCode::OK, "{}", rated.body);
    assert_eq!(rated.body["rating"]["rating"], 5);

    let twice = ctx
        .post(
            &format!("/rides/{ride_id}/rate"),
            Some(&trip.passenger.token),
            json!({ "rating": 1 }),
        )
        .await;
    assert_eq!(twice.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_terminal_rides_cannot_move() {
    let trip = Trip::new(2).await;
    let ride_id = trip.request(1).await;

    let (status, _) = trip.driver_action(&ride_id, "reject").await;
    assert_eq!(status, StatusCode::OK);

    for action in ["accept", "seated", "complete", "reject"] {
        let (status, body) = trip.driver_action(&ride_id, action).await;
        assert_eq!(status, StatusCode::CONFLICT, "{action}: {body}");
    }
    assert_eq!(trip.seats_left().await, 2);
}

#[tokio::test]
async fn test_cancel_returns_seats() {
    let trip = Trip::new(2).await;
    let ride_id = trip.request(2).await;

    let (status, _) = trip.driver_action(&ride_id, "accept").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(trip.seats_left().await, 0);

    let cancelled = trip
        .ctx
        .put(&format!("/rides/{ride_id}/cancel"), &trip.passenger.token, None)
        .await;
    assert_eq!(cancelled.status, StatusCode::OK);
    assert_eq!(cancelled.body["ride"]["status"], "cancelled");
    assert_eq!(trip.seats_left().await, 2);

    let pay = trip
        .ctx
        .post(
            &format!("/rides/{ride_id}/pay"),
            Some(&trip.passenger.token),
            json!({}),
        )
        .await;
    assert_eq!(pay.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_accept_fails_when_route_is_full() {
    let trip = Trip::new(1).await;
    let first = trip.request(1).await;

    let other = trip.ctx.signup("passenger", "other@example.mn").await;
    let resp = trip
        .ctx
        .post(
            "/rides/request",
            Some(&other.token),
            json!({ "routeId": trip.route_id }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CREATED);
    let second = resp.body["ride"]["id"].as_str().unwrap_or_default().to_owned();

    assert_eq!(trip.driver_action(&first, "accept").await.0, StatusCode::OK);
    let (status, body) = trip.driver_action(&second, "accept").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "not enough seats left on this route");

    let ride = trip.ctx.get(&format!("/rides/{second}"), None).await;
    assert_eq!(ride.body["ride"]["status"], "pending");
}

#[tokio::test]
async fn test_role_and_ownership_checks() {
    let trip = Trip::new(3).await;
    let ctx = &trip.ctx;

    // Drivers cannot request rides
    let resp = ctx
        .post(
            "/rides/request",
            Some(&trip.driver.token),
            json!({ "routeId": trip.route_id }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    let ride_id = trip.request(1).await;

    // A second open request on the same route is refused
    let dup = ctx
        .post(
            "/rides/request",
            Some(&trip.passenger.token),
            json!({ "routeId": trip.route_id }),
        )
        .await;
    assert_eq!(dup.status, StatusCode::CONFLICT);

    // Passengers cannot accept, other drivers cannot either
    let resp = ctx
        .put(&format!("/rides/{ride_id}/accept"), &trip.passenger.token, None)
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    let stranger = ctx.signup("driver", "stranger@example.mn").await;
    let resp = ctx
        .put(&format!("/rides/{ride_id}/accept"), &stranger.token, None)
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    let resp = ctx
        .put(&format!("/rides/{ride_id}/cancel"), &stranger.token, None)
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_request_validation() {
    let trip = Trip::new(2).await;
    let ctx = &trip.ctx;

    let missing = ctx
        .post("/rides/request", Some(&trip.passenger.token), json!({}))
        .await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);

    let too_many = ctx
        .post(
            "/rides/request",
            Some(&trip.passenger.token),
            json!({ "routeId": trip.route_id, "seats": 3 }),
        )
        .await;
    assert_eq!(too_many.status, StatusCode::CONFLICT);

    assert_eq!(
        ctx.get("/rides/not-a-ride", None).await.status,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_pay_checks_amount_and_balance() {
    let trip = Trip::new(2).await;
    let ctx = &trip.ctx;
    let ride_id = trip.request(1).await;
    trip.drive_to_completion(&ride_id).await;

    let wrong = ctx
        .post(
            &format!("/rides/{ride_id}/pay"),
            Some(&trip.passenger.token),
            json!({ "amount": 5000 }),
        )
        .await;
    assert_eq!(wrong.status, StatusCode::BAD_REQUEST);

    let broke = ctx
        .post(
            &format!("/rides/{ride_id}/pay"),
            Some(&trip.passenger.token),
            json!({ "amount": 5500 }),
        )
        .await;
    assert_eq!(broke.status, StatusCode::BAD_REQUEST);
    assert_eq!(broke.body["error"], "insufficient balance");

    // The failed attempt leaves the ride payable
    ctx.top_up(&trip.passenger, 5500).await;
    let ok = ctx
        .post(
            &format!("/rides/{ride_id}/pay"),
            Some(&trip.passenger.token),
            json!({ "amount": 5500 }),
        )
        .await;
    assert_eq!(ok.status, StatusCode::OK, "{}", ok.body);
    assert_eq!(money(&ok.body["balance"]), Decimal::ZERO);
}

#[tokio::test]
async fn test_payment_waits_for_the_trip_to_finish() {
    let trip = Trip::new(2).await;
    trip.ctx.top_up(&trip.passenger, 5500).await;
    let ride_id = trip.request(1).await;

    let (status, body) = trip.pay(&ride_id, json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");
    assert_eq!(body["error"], "a pending ride cannot be paid");

    let (status, _) = trip.driver_action(&ride_id, "reject").await;
    assert_eq!(status, StatusCode::OK);

    let wallet = trip.ctx.get("/wallet", Some(&trip.passenger.token)).await;
    assert_eq!(money(&wallet.body["balance"]), Decimal::from(5500));
    let ride = trip.ctx.get(&format!("/rides/{ride_id}"), None).await;
    assert_eq!(ride.body["ride"]["status"], "rejected");
    assert_eq!(ride.body["ride"]["paidAt"], serde_json::Value::Null);
}

#[tokio::test]
async fn test_rating_requires_completed_ride() {
    let trip = Trip::new(2).await;
    let ride_id = trip.request(1).await;

    let resp = trip
        .ctx
        .post(
            &format!("/rides/{ride_id}/rate"),
            Some(&trip.passenger.token),
            json!({ "rating": 4 }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CONFLICT);

    for action in ["accept", "seated", "complete"] {
        assert_eq!(trip.driver_action(&ride_id, action).await.0, StatusCode::OK);
    }

    let out_of_range = trip
        .ctx
        .post(
            &format!("/rides/{ride_id}/rate"),
            Some(&trip.passenger.token),
            json!({ "rating": 6 }),
        )
        .await;
    assert_eq!(out_of_range.status, StatusCode::BAD_REQUEST);
}
