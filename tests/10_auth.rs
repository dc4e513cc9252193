mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::TestServer;

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let server = TestServer::start().await?;

    let res = server.client.get(server.url("/health")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = res.json().await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn root_describes_service() -> Result<()> {
    let server = TestServer::start().await?;

    let body: Value = server.client.get(server.url("/")).send().await?.json().await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["name"], "Kanban API");
    Ok(())
}

#[tokio::test]
async fn sign_up_sign_in_and_whoami() -> Result<()> {
    let server = TestServer::start().await?;
    let (_, user_id) = server.sign_up("alice").await?;

    let res = server
        .client
        .post(server.url("/auth/sign-in"))
        .json(&json!({ "username": "alice", "password": "password123" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    let token = body["data"]["token"].as_str().unwrap().to_string();
    assert!(body["data"]["user"].get("passwordHash").is_none());

    let res = server.get("/users/me", &token).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let me: Value = res.json().await?;
    assert_eq!(me["data"]["id"], user_id);
    assert_eq!(me["data"]["username"], "alice");
    Ok(())
}

#[tokio::test]
async fn duplicate_username_is_conflict() -> Result<()> {
    let server = TestServer::start().await?;
    server.sign_up("alice").await?;

    let res = server
        .client
        .post(server.url("/auth/sign-up"))
        .json(&json!({ "username": "alice", "password": "different123" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let body: Value = res.json().await?;
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "CONFLICT");
    Ok(())
}

#[tokio::test]
async fn invalid_sign_up_is_bad_request() -> Result<()> {
    let server = TestServer::start().await?;

    for body in [
        json!({ "username": "al", "password": "password123" }),
        json!({ "username": "alice", "password": "short" }),
        json!({ "username": "alice" }),
    ] {
        let res = server.client.post(server.url("/auth/sign-up")).json(&body).send().await?;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "body {}", body);
    }
    Ok(())
}

#[tokio::test]
async fn wrong_password_is_unauthorized() -> Result<()> {
    let server = TestServer::start().await?;
    server.sign_up("alice").await?;

    let res = server
        .client
        .post(server.url("/auth/sign-in"))
        .json(&json!({ "username": "alice", "password": "not-the-password" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn protected_routes_require_bearer_token() -> Result<()> {
    let server = TestServer::start().await?;

    let res = server.client.get(server.url("/dashboard")).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await?;
    assert_eq!(body["code"], "UNAUTHORIZED");

    let res = server.get("/users/me", "garbage").send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}
