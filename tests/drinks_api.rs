mod common;

use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::*;

fn latte() -> serde_json::Value {
    json!({
        "title": "Latte",
        "recipe": [
            { "name": "espresso", "color": "brown", "parts": 1 },
            { "name": "milk", "color": "white", "parts": 3 }
        ]
    })
}

#[tokio::test]
async fn health_is_public() {
    let server = jwks_server().await;
    let app = app(&format!("{}{JWKS_PATH}", server.uri()));

    let response = app.oneshot(request("GET", "/health", None, None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "status": "ok" }));
}

#[tokio::test]
async fn public_list_is_404_when_empty_and_short_once_populated() {
    let server = jwks_server().await;
    let app = app(&format!("{}{JWKS_PATH}", server.uri()));

    let response = app
        .clone()
        .oneshot(request("GET", "/drinks", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(response).await,
        json!({ "success": false, "error": 404, "message": "resource not found" })
    );

    let token = token(&["post:drinks"]);
    let response = app
        .clone()
        .oneshot(request("POST", "/drinks", Some(&token), Some(latte())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(request("GET", "/drinks", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(
        body["drinks"][0]["recipe"],
        json!([
            { "color": "brown", "parts": 1 },
            { "color": "white", "parts": 3 }
        ])
    );
}

#[tokio::test]
async fn gated_route_without_header_is_401_before_any_key_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(jwks_body()))
        .expect(0)
        .mount(&server)
        .await;
    let app = app(&format!("{}{JWKS_PATH}", server.uri()));

    let response = app
        .oneshot(request("GET", "/drinks-detail", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(response).await,
        json!({
            "success": false,
            "error": 401,
            "message": "authorization header is expected"
        })
    );
}

#[tokio::test]
async fn token_without_required_permission_is_403() {
    let server = jwks_server().await;
    let app = app(&format!("{}{JWKS_PATH}", server.uri()));
    let token = token(&["get:drinks-detail"]);

    let response = app
        .oneshot(request("POST", "/drinks", Some(&token), Some(latte())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], 403);
}

#[tokio::test]
async fn full_drink_lifecycle_with_permissions() {
    let server = jwks_server().await;
    let app = app(&format!("{}{JWKS_PATH}", server.uri()));
    let token = token(&ALL_PERMISSIONS);

    // create
    let response = app
        .clone()
        .oneshot(request("POST", "/drinks", Some(&token), Some(latte())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["drinks"][0]["title"], "Latte");
    assert_eq!(body["drinks"][0]["recipe"][1]["name"], "milk");
    let id = body["drinks"][0]["id"].as_i64().unwrap();

    // detail
    let response = app
        .clone()
        .oneshot(request("GET", "/drinks-detail", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["drinks"][0]["recipe"][0]["name"], "espresso");

    // update title only
    let response = app
        .clone()
        .oneshot(request(
            "PATCH",
            &format!("/drinks/{id}"),
            Some(&token),
            Some(json!({ "title": "Flat White" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["drinks"][0]["title"], "Flat White");
    assert_eq!(body["drinks"][0]["recipe"][1]["parts"], 3);

    // delete
    let response = app
        .clone()
        .oneshot(request("DELETE", &format!("/drinks/{id}"), Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({ "success": true, "delete": id })
    );

    // gone
    let response = app
        .oneshot(request("DELETE", &format!("/drinks/{id}"), Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn keys_are_fetched_once_across_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(jwks_body()))
        .expect(1)
        .mount(&server)
        .await;
    let app = app(&format!("{}{JWKS_PATH}", server.uri()));
    let token = token(&["post:drinks"]);

    for title in ["Mocha", "Cortado", "Macchiato"] {
        let mut drink = latte();
        drink["title"] = json!(title);
        let response = app
            .clone()
            .oneshot(request("POST", "/drinks", Some(&token), Some(drink)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn unknown_kid_is_401() {
    let server = jwks_server().await;
    let app = app(&format!("{}{JWKS_PATH}", server.uri()));
    let token = sign_with(PRIMARY_PEM, "rotated-away", &claims(&["post:drinks"]));

    let response = app
        .oneshot(request("POST", "/drinks", Some(&token), Some(latte())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(response).await["message"],
        "unable to find the appropriate key"
    );
}

#[tokio::test]
async fn token_signed_by_another_key_is_401() {
    let server = jwks_server().await;
    let app = app(&format!("{}{JWKS_PATH}", server.uri()));
    let token = sign_with(ROGUE_PEM, KID, &claims(&["post:drinks"]));

    let response = app
        .oneshot(request("POST", "/drinks", Some(&token), Some(latte())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["message"], "token signature is invalid");
}

#[tokio::test]
async fn expired_token_is_401() {
    let server = jwks_server().await;
    let app = app(&format!("{}{JWKS_PATH}", server.uri()));
    let mut expired = claims(&["post:drinks"]);
    expired["exp"] = json!(chrono::Utc::now().timestamp() - 60);
    let token = sign_with(PRIMARY_PEM, KID, &expired);

    let response = app
        .oneshot(request("POST", "/drinks", Some(&token), Some(latte())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["message"], "token expired");
}

#[tokio::test]
async fn unreachable_key_set_is_500() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let app = app(&format!("{}{JWKS_PATH}", server.uri()));
    let token = token(&["post:drinks"]);

    let response = app
        .oneshot(request("POST", "/drinks", Some(&token), Some(latte())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["error"], 500);
    assert_eq!(body["message"], "authorization service unavailable");
}

#[tokio::test]
async fn invalid_bodies_and_duplicate_titles_are_422() {
    let server = jwks_server().await;
    let app = app(&format!("{}{JWKS_PATH}", server.uri()));
    let token = token(&["post:drinks"]);

    let bad_bodies = [
        json!({ "recipe": latte()["recipe"] }),
        json!({ "title": "No Recipe" }),
        json!({ "title": "Bad", "recipe": "espresso" }),
    ];
    for body in bad_bodies {
        let response = app
            .clone()
            .oneshot(request("POST", "/drinks", Some(&token), Some(body.clone())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY, "{body}");
        assert_eq!(body_json(response).await["error"], 422);
    }

    let response = app
        .clone()
        .oneshot(request("POST", "/drinks", Some(&token), Some(latte())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(request("POST", "/drinks", Some(&token), Some(latte())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn unknown_or_non_numeric_drink_id_is_404() {
    let server = jwks_server().await;
    let app = app(&format!("{}{JWKS_PATH}", server.uri()));
    let token = token(&["patch:drinks"]);

    for uri in ["/drinks/999", "/drinks/latte"] {
        let response = app
            .clone()
            .oneshot(request(
                "PATCH",
                uri,
                Some(&token),
                Some(json!({ "title": "Renamed" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
    }
}

#[tokio::test]
async fn patch_of_unknown_id_with_taken_title_is_404() {
    let server = jwks_server().await;
    let app = app(&format!("{}{JWKS_PATH}", server.uri()));
    let token = token(&["post:drinks", "patch:drinks"]);

    let response = app
        .clone()
        .oneshot(request("POST", "/drinks", Some(&token), Some(latte())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(request(
            "PATCH",
            "/drinks/999",
            Some(&token),
            Some(json!({ "title": "Latte" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unmatched_route_is_json_404() {
    let server = jwks_server().await;
    let app = app(&format!("{}{JWKS_PATH}", server.uri()));

    let response = app
        .oneshot(request("GET", "/coffee", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["success"], false);
}
