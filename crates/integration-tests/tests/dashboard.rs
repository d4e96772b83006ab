//! Driver and passenger dashboards.

use reqwest::StatusCode;
use serde_json::json;

use carpool_core::Decimal;
use carpool_integration_tests::{TestContext, money};

#[tokio::test]
async fn test_dashboards_require_user_id() {
    let ctx = TestContext::new().await;

    for path in ["/driver/dashboard", "/driver/notifications", "/passenger/dashboard"] {
        let resp = ctx.get(path, None).await;
        assert_eq!(resp.status, StatusCode::BAD_REQUEST, "{path}");
        assert_eq!(resp.body["error"], "userId is required");
    }
}

#[tokio::test]
async fn test_driver_dashboard_tracks_requests_and_income() {
    let ctx = TestContext::new().await;
    let driver = ctx.signup("driver", "d@example.mn").await;
    let passenger = ctx.signup("passenger", "p@example.mn").await;
    let route = ctx
        .publish_route(&driver, "Баянзүрх", "Их дэлгүүр", 3, 5000)
        .await;

    let resp = ctx
        .post(
            "/rides/request",
            Some(&passenger.token),
            json!({ "routeId": route["id"] }),
        )
        .await;
    let ride_id = resp.body["ride"]["id"].as_str().unwrap_or_default().to_owned();

    let feed = ctx
        .get(&format!("/driver/notifications?userId={}", driver.id), None)
        .await;
    assert_eq!(feed.status, StatusCode::OK);
    let first = &feed.body["notifications"][0];
    assert_eq!(first["message"], "Test passenger requested a ride on your route");
    assert_eq!(first["relativeTime"], "just now");
    assert_eq!(first["rideId"], ride_id.as_str());

    for action in ["accept", "seated", "complete"] {
        let resp = ctx
            .put(&format!("/rides/{ride_id}/{action}"), &driver.token, None)
            .await;
        assert_eq!(resp.status, StatusCode::OK, "{action}: {}", resp.body);
    }

    let dashboard = ctx
        .get(&format!("/driver/dashboard?userId={}", driver.id), None)
        .await;
    assert_eq!(dashboard.status, StatusCode::OK);
    let stats = &dashboard.body["stats"];
    assert_eq!(stats["todayRides"], 1);
    assert_eq!(money(&stats["todayIncome"]), Decimal::from(5000));
    assert_eq!(stats["activeRides"], 0);
    assert_eq!(money(&stats["totalIncome"]), Decimal::from(5000));
    assert_eq!(dashboard.body["notifications"], json!([]));
}

#[tokio::test]
async fn test_passenger_dashboard() {
    let ctx = TestContext::new().await;
    let driver = ctx.signup("driver", "d@example.mn").await;
    let passenger = ctx.signup("passenger", "p@example.mn").await;
    ctx.publish_route(&driver, "Хан-Уул", "Зайсан", 2, 4000).await;

    let resp = ctx
        .get(&format!("/passenger/dashboard?userId={}", passenger.id), None)
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["stats"]["totalRides"], 0);
    assert_eq!(money(&resp.body["stats"]["totalSpent"]), Decimal::ZERO);
    assert_eq!(resp.body["nearbyRoutes"][0]["origin"], "Хан-Уул");
}

#[tokio::test]
async fn test_malformed_user_id_is_rejected() {
    let ctx = TestContext::new().await;

    let resp = ctx.get("/driver/dashboard?userId=nope", None).await;
    assert!(resp.status.is_client_error(), "{}", resp.status);
}
