//! HTTP tests for registration, login, profile and operator user listing.

use axum::http::StatusCode;
use serde_json::json;

use plateshop_integration_tests::{MemoryStorage, TestClient, operator_client, test_app};

#[tokio::test]
async fn test_register_starts_session() {
    let store = MemoryStorage::new();
    let mut client = TestClient::new(test_app(store));

    let body = client.register("Wairimu", " Wairimu@Example.com ", "ID-10").await;
    assert_eq!(body["email"], "wairimu@example.com");
    assert_eq!(body["role"], "customer");
    assert!(body.get("password").is_none());

    let (status, profile) = client.get("/api/users/profile").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["id"], body["id"]);
    assert_eq!(profile["idNumber"], "ID-10");
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let store = MemoryStorage::new();
    let app = test_app(store);
    let mut first = TestClient::new(app.clone());
    first.register("Baraka", "baraka@example.com", "ID-20").await;

    let mut second = TestClient::new(app);
    let (status, body) = second
        .post(
            "/api/users",
            json!({
                "name": "Baraka Two",
                "email": "BARAKA@example.com",
                "phone": "0700000000",
                "idNumber": "ID-21",
                "password": "another-pass",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "conflict");

    let (status, body) = second
        .post(
            "/api/users",
            json!({
                "name": "Someone",
                "email": "someone@example.com",
                "phone": "0700000000",
                "idNumber": "ID-20",
                "password": "another-pass",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["message"].as_str().unwrap().contains("ID number"));
}

#[tokio::test]
async fn test_registration_validation() {
    let store = MemoryStorage::new();
    let mut client = TestClient::new(test_app(store));

    let base = json!({
        "name": "Halima",
        "email": "halima@example.com",
        "phone": "0711111111",
        "idNumber": "ID-30",
        "password": "long-enough",
    });

    let mut short = base.clone();
    short["password"] = json!("short");
    let (status, body) = client.post("/api/users", short).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation_error");

    let mut bad_email = base.clone();
    bad_email["email"] = json!("halima-at-example");
    let (status, body) = client.post("/api/users", bad_email).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid email address");

    let mut blank_name = base;
    blank_name["name"] = json!("   ");
    let (status, _) = client.post("/api/users", blank_name).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_and_logout() {
    let store = MemoryStorage::new();
    let app = test_app(store);
    TestClient::new(app.clone())
        .register("Mutua", "mutua@example.com", "ID-40")
        .await;

    let mut client = TestClient::new(app);
    let (status, body) = client
        .post(
            "/api/users/login",
            json!({ "email": "mutua@example.com", "password": "wrong-password" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid credentials");

    let (status, body) = client
        .post(
            "/api/users/login",
            json!({ "email": "nobody@example.com", "password": "s3cret-pass" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid credentials");

    let (status, body) = client.login("MUTUA@example.com").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Mutua");

    let (status, _) = client.get("/api/users/profile").await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = client.post("/api/users/logout", json!({})).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = client.get("/api/users/profile").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["kind"], "unauthorized");
}

#[tokio::test]
async fn test_update_profile() {
    let store = MemoryStorage::new();
    let mut client = TestClient::new(test_app(store));
    client.register("Chebet", "chebet@example.com", "ID-50").await;

    let (status, body) = client
        .put(
            "/api/users/profile",
            json!({ "city": " Eldoret ", "address": "12 Uganda Rd" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["city"], "Eldoret");
    assert_eq!(body["address"], "12 Uganda Rd");
    assert_eq!(body["name"], "Chebet");

    let (status, body) = client.put("/api/users/profile", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["city"], "Eldoret");

    let (status, body) = client.put("/api/users/profile", json!({ "name": "" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation_error");
}

#[tokio::test]
async fn test_user_listing_is_operator_only() {
    let store = MemoryStorage::new();
    let app = test_app(store.clone());

    let mut customer = TestClient::new(app.clone());
    customer.register("Kiprop", "kiprop@example.com", "ID-60").await;
    let (status, _) = customer.get("/api/users").await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let mut ops = operator_client(app, &store).await;
    let (status, body) = ops.get("/api/users").await;
    assert_eq!(status, StatusCode::OK);
    let users = body.as_array().unwrap();
    assert_eq!(users.len(), 2);
    assert!(users.iter().any(|u| u["role"] == "operator"));
}
