//! HTTP tests for the plate catalog, price and availability endpoints.

use axum::http::StatusCode;
use serde_json::json;

use plateshop_integration_tests::{MemoryStorage, TestClient, cart, operator_client, test_app};

#[tokio::test]
async fn test_health_probes() {
    let store = MemoryStorage::new();
    let mut client = TestClient::new(test_app(store.clone()));

    let (status, body) = client.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");

    let (status, _) = client.get("/health/ready").await;
    assert_eq!(status, StatusCode::OK);

    store.set_unavailable(true);
    let (status, _) = client.get("/health/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_price_quotes() {
    let store = MemoryStorage::new();
    let mut client = TestClient::new(test_app(store));

    for (code, amount) in [("special", 20_000), ("standard_custom", 40_000), ("prestige", 80_000)] {
        let (status, body) = client.get(&format!("/api/plates/price/{code}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["price"], amount);
        assert_eq!(body["fallback"], false);
    }

    let (status, body) = client.get("/api/plates/price/diamond").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tier"], "special");
    assert_eq!(body["price"], 20_000);
    assert_eq!(body["fallback"], true);
}

#[tokio::test]
async fn test_check_availability_normalizes_text() {
    let store = MemoryStorage::new();
    let mut client = TestClient::new(test_app(store));

    let (status, body) = client.get("/api/plates/check-availability/kdg007").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text"], "KDG007");
    assert_eq!(body["isAvailable"], true);
    assert_eq!(body["message"], "Plate text KDG007 is available");

    let (status, _) = client.post("/api/orders", cart("KDG007", "prestige")).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = client.get("/api/plates/check-availability/kdg007").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isAvailable"], false);
    assert_eq!(body["message"], "Plate text KDG007 is already taken");

    let (status, body) = client.get("/api/plates/check-availability/TOOLONG12").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation_error");
}

#[tokio::test]
async fn test_operator_manages_catalog() {
    let store = MemoryStorage::new();
    let app = test_app(store.clone());
    let mut ops = operator_client(app.clone(), &store).await;
    let mut visitor = TestClient::new(app);

    let (status, body) = ops
        .post(
            "/api/plates",
            json!({ "text": "kaa00", "tier": "special", "description": "  Classic  " }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["text"], "KAA00");
    assert_eq!(body["price"], 20_000);
    assert_eq!(body["description"], "Classic");
    assert_eq!(body["isAvailable"], true);
    let special_id = body["id"].as_i64().unwrap();

    let (status, _) = ops
        .post(
            "/api/plates",
            json!({ "text": "BOSS1", "tier": "prestige", "price": 95_000 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = ops
        .post("/api/plates", json!({ "text": "KAA00", "tier": "special" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "conflict");

    let (status, body) = visitor.get("/api/plates").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, body) = visitor.get("/api/plates?type=prestige").await;
    assert_eq!(status, StatusCode::OK);
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["price"], 95_000);

    let (status, body) = visitor.get("/api/plates?type=gold").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation_error");

    let (status, body) = visitor.get(&format!("/api/plates/{special_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tier"], "special");

    let (status, _) = ops.delete(&format!("/api/plates/{special_id}")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = visitor.get(&format!("/api/plates/{special_id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");
}

#[tokio::test]
async fn test_catalog_text_must_match_tier() {
    let store = MemoryStorage::new();
    let app = test_app(store.clone());
    let mut ops = operator_client(app, &store).await;

    let (status, body) = ops
        .post("/api/plates", json!({ "text": "NOZERO", "tier": "special" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation_error");

    let (status, body) = ops
        .post("/api/plates", json!({ "text": "I❤KE", "tier": "prestige" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation_error");
}

#[tokio::test]
async fn test_catalog_writes_need_operator() {
    let store = MemoryStorage::new();
    let mut client = TestClient::new(test_app(store));

    let (status, body) = client
        .post("/api/plates", json!({ "text": "KAA00", "tier": "special" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["kind"], "unauthorized");

    client.register("Njeri", "njeri@example.com", "ID-5").await;
    let (status, body) = client.delete("/api/plates/1").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "forbidden");
}

#[tokio::test]
async fn test_ordered_plate_cannot_be_deleted() {
    let store = MemoryStorage::new();
    let app = test_app(store.clone());
    let mut ops = operator_client(app.clone(), &store).await;
    let mut guest = TestClient::new(app);

    let (_, body) = ops
        .post("/api/plates", json!({ "text": "HELD01", "tier": "prestige" }))
        .await;
    let id = body["id"].as_i64().unwrap();

    let (status, _) = guest.post("/api/orders", cart("HELD01", "prestige")).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = guest.get(&format!("/api/plates/{id}")).await;
    assert_eq!(body["isAvailable"], false);

    let (status, body) = ops.delete(&format!("/api/plates/{id}")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "conflict");
}
