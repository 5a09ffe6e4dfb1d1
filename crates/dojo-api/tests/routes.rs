use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use dojo_api::users::MAX_PICTURE_SIZE;
use dojo_api::{AppState, AppStateInner, router};
use dojo_db::Database;
use dojo_types::models::DEFAULT_PICTURE;

struct TestApp {
    state: AppState,
    app: Router,
}

impl TestApp {
    fn new() -> Self {
        let media = std::env::temp_dir().join(format!("dojo-test-{}", uuid::Uuid::new_v4()));
        let state = AppStateInner::new(Database::open_in_memory().unwrap(), "test-secret", media);
        let app = router(state.clone());
        Self { state, app }
    }

    async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self.app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    /// PUT raw bytes as the caller's picture; returns (status, content type, body).
    async fn upload(&self, token: &str, content_type: &str, bytes: Vec<u8>) -> (StatusCode, String, Value) {
        let request = Request::builder()
            .method(Method::PUT)
            .uri("/users/me/picture")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(bytes))
            .unwrap();
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, content_type, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    /// Register a user and return (user id, token).
    async fn register(&self, username: &str) -> (String, String) {
        let (status, body) = self
            .send(
                Method::POST,
                "/auth/register",
                None,
                Some(json!({
                    "username": username,
                    "password": "correct horse",
                    "password_confirm": "correct horse",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        (
            body["user_id"].as_str().unwrap().to_string(),
            body["token"].as_str().unwrap().to_string(),
        )
    }
}

fn today() -> String {
    chrono::Local::now().date_naive().format("%Y-%m-%d").to_string()
}

/// Same calendar quarter, one year back.
fn a_year_ago() -> String {
    chrono::Local::now()
        .date_naive()
        .checked_sub_months(chrono::Months::new(12))
        .unwrap()
        .format("%Y-%m-%d")
        .to_string()
}

#[tokio::test]
async fn register_and_login() {
    let app = TestApp::new();
    let (user_id, _) = app.register("kenji").await;

    let (status, body) = app
        .send(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "username": "kenji", "password": "another pass", "password_confirm": "another pass" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");

    let (status, _) = app
        .send(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "username": "miko", "password": "12345678", "password_confirm": "87654321" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .send(Method::POST, "/auth/login", None, Some(json!({ "username": "kenji", "password": "wrong one" })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid username or password");

    let (status, body) = app
        .send(Method::POST, "/auth/login", None, Some(json!({ "username": "kenji", "password": "correct horse" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], user_id.as_str());

    let (status, body) = app.send(Method::GET, &format!("/users/{user_id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["profile"]["name"], "kenji");
    assert_eq!(body["profile"]["picture"], DEFAULT_PICTURE);
}

#[tokio::test]
async fn writes_require_a_valid_token() {
    let app = TestApp::new();
    let room = json!({ "topic": "Kata", "name": "Forms" });

    let (status, _) = app.send(Method::POST, "/rooms", None, Some(room.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.send(Method::POST, "/rooms", Some("not-a-jwt"), Some(room)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // reads stay public
    let (status, body) = app.send(Method::GET, "/rooms", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["room_count_all"], 0);
}

#[tokio::test]
async fn room_ownership_is_enforced() {
    let app = TestApp::new();
    let (_, host) = app.register("host").await;
    let (guest_id, guest) = app.register("guest").await;

    let (status, room) = app
        .send(
            Method::POST,
            "/rooms",
            Some(&host),
            Some(json!({ "topic": "Kata", "name": "Heian forms", "description": "Weekly practice" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(room["topic"]["name"], "Kata");
    assert_eq!(room["host"]["username"], "host");
    let room_id = room["id"].as_str().unwrap().to_string();

    let edit = json!({ "topic": "Kata", "name": "Hijacked" });
    let (status, body) = app
        .send(Method::PUT, &format!("/rooms/{room_id}"), Some(&guest), Some(edit))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Users can only edit rooms they have created.");

    let edit = json!({ "topic": "Forms", "name": "Heian forms", "description": "" });
    let (status, body) = app
        .send(Method::PUT, &format!("/rooms/{room_id}"), Some(&host), Some(edit))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["topic"]["name"], "Forms");
    assert_eq!(body["description"], Value::Null);

    let (status, message) = app
        .send(
            Method::POST,
            &format!("/rooms/{room_id}/messages"),
            Some(&guest),
            Some(json!({ "body": "Can I join on Thursday?" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let message_id = message["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .send(Method::POST, &format!("/rooms/{room_id}/messages"), Some(&guest), Some(json!({ "body": "  " })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, page) = app.send(Method::GET, &format!("/rooms/{room_id}"), None, None).await;
    assert_eq!(page["participants"][0]["id"], guest_id.as_str());
    assert_eq!(page["room_messages"].as_array().unwrap().len(), 1);

    let (status, _) = app
        .send(Method::DELETE, &format!("/messages/{message_id}"), Some(&host), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app
        .send(Method::DELETE, &format!("/messages/{message_id}"), Some(&guest), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = app.send(Method::DELETE, &format!("/rooms/{room_id}"), Some(&guest), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Users can only delete rooms they have created.");
    let (status, _) = app.send(Method::DELETE, &format!("/rooms/{room_id}"), Some(&host), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.send(Method::GET, &format!("/rooms/{room_id}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn room_listing_and_topics() {
    let app = TestApp::new();
    let (_, host) = app.register("sensei").await;

    for (topic, name) in [("Kata", "Forms"), ("Kata", "Bunkai"), ("Sparring", "Open mat")] {
        let (status, _) = app
            .send(Method::POST, "/rooms", Some(&host), Some(json!({ "topic": topic, "name": name })))
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, page) = app.send(Method::GET, "/rooms?q=kata", None, None).await;
    assert_eq!(page["room_count"], 2);
    assert_eq!(page["room_count_all"], 3);
    assert_eq!(page["topics"].as_array().unwrap().len(), 2);

    let (_, page) = app.send(Method::GET, "/rooms?q=sensei", None, None).await;
    assert_eq!(page["room_count"], 3);

    let (_, page) = app.send(Method::GET, "/topics?q=spar", None, None).await;
    assert_eq!(page["topics"][0]["name"], "Sparring");
    assert_eq!(page["topics"][0]["room_count"], 1);

    let (status, activity) = app.send(Method::GET, "/activity", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(activity.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn progress_records_and_stats() {
    let app = TestApp::new();
    let (student_id, student) = app.register("student").await;
    let (_, stranger) = app.register("stranger").await;
    let (_, sensei) = app.register("sensei").await;
    assert!(app.state.db.set_staff("sensei", true).unwrap());

    let attendances = format!("/users/{student_id}/records/attendances");

    let (status, record) = app.send(Method::POST, &attendances, Some(&student), Some(json!({}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(record["date"], today());
    assert_eq!(record["kind"], "attendance");

    let (status, body) = app.send(Method::POST, &attendances, Some(&stranger), Some(json!({}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{body}");

    let (status, _) = app.send(Method::POST, &attendances, Some(&sensei), Some(json!({}))).await;
    assert_eq!(status, StatusCode::CREATED);

    let hours = format!("/users/{student_id}/records/leadership-hours");
    let (status, _) = app
        .send(Method::POST, &hours, Some(&sensei), Some(json!({ "label": "Kids class", "amount": 3 })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = app
        .send(Method::POST, &hours, Some(&sensei), Some(json!({ "amount": -2 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let tournaments = format!("/users/{student_id}/records/tournaments");
    let (status, body) = app.send(Method::POST, &tournaments, Some(&student), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "tournament records require a tournament name");

    let scores = format!("/users/{student_id}/records/practical-scores");
    let (_, score) = app
        .send(Method::POST, &scores, Some(&student), Some(json!({ "amount": 82 })))
        .await;
    let score_id = score["id"].as_str().unwrap().to_string();

    let (status, updated) = app
        .send(Method::PUT, &format!("/records/{score_id}"), Some(&student), Some(json!({ "amount": 90 })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["amount"], 90);
    assert_eq!(updated["date"], today());

    let (status, _) = app
        .send(Method::DELETE, &format!("/records/{score_id}"), Some(&stranger), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, extra) = app.send(Method::POST, &scores, Some(&student), Some(json!({ "amount": 40 }))).await;
    let extra_id = extra["id"].as_str().unwrap().to_string();
    let (status, _) = app
        .send(Method::DELETE, &format!("/records/{extra_id}"), Some(&sensei), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, page) = app.send(Method::GET, &attendances, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["records"].as_array().unwrap().len(), 2);

    let (_, stats) = app.send(Method::GET, &format!("/users/{student_id}/stats"), None, None).await;
    assert_eq!(stats["stats"]["attendances"], 2);
    assert_eq!(stats["stats"]["leadership_hours"], 3);
    assert_eq!(stats["stats"]["practical_score"], 90);

    let (_, home) = app.send(Method::GET, "/profiles?q=stud", None, None).await;
    let entries = home.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["stats"]["attendances"], 2);

    let (status, _) = app
        .send(Method::GET, &format!("/users/{student_id}/records/belts"), None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn profile_updates() {
    let app = TestApp::new();
    let (user_id, token) = app.register("kenji").await;
    app.register("taken").await;

    let (status, body) = app
        .send(
            Method::PUT,
            "/users/me",
            Some(&token),
            Some(json!({ "username": "kenji", "last_promoted": "2999-01-01" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Promotion date cannot be in the future");

    let (status, _) = app
        .send(Method::PUT, "/users/me", Some(&token), Some(json!({ "username": "taken" })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, profile) = app
        .send(
            Method::PUT,
            "/users/me",
            Some(&token),
            Some(json!({
                "username": "kenji_s",
                "email": "kenji@example.com",
                "name": "Kenji Sato",
                "rank": "black_1",
                "last_promoted": "2024-03-09",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["username"], "kenji_s");
    assert_eq!(profile["rank"], "black_1");

    let (_, page) = app.send(Method::GET, &format!("/users/{user_id}"), None, None).await;
    assert_eq!(page["user"]["email"], "kenji@example.com");
    assert_eq!(page["profile"]["last_promoted"], "2024-03-09");
    assert_eq!(page["rank_name"], "1st Dan Black Belt");

    let (_, home) = app.send(Method::GET, "/profiles?q=kenji", None, None).await;
    assert_eq!(home[0]["rank_name"], "1st Dan Black Belt");
}

#[tokio::test]
async fn picture_upload() {
    let app = TestApp::new();
    let (user_id, token) = app.register("kenji").await;

    let (status, _, body) = app.upload(&token, "image/png", vec![0x89, b'P', b'N', b'G', 1, 2, 3]).await;
    assert_eq!(status, StatusCode::OK);
    let picture = body["picture"].as_str().unwrap().to_string();
    assert!(picture.starts_with("profile_pictures/") && picture.ends_with(".png"));
    assert!(app.state.media_dir.join(&picture).exists());

    let (_, page) = app.send(Method::GET, &format!("/users/{user_id}"), None, None).await;
    assert_eq!(page["profile"]["picture"], picture.as_str());

    let (status, _, _) = app.upload(&token, "application/pdf", b"%PDF".to_vec()).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let (status, _, body) = app.upload(&token, "image/png", Vec::new()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Picture is empty");

    let _ = std::fs::remove_dir_all(&app.state.media_dir);
}

#[tokio::test]
async fn oversized_picture_gets_a_json_error() {
    let app = TestApp::new();
    let (user_id, token) = app.register("kenji").await;

    let (status, content_type, body) = app.upload(&token, "image/png", vec![0; MAX_PICTURE_SIZE + 1]).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(content_type.starts_with("application/json"), "{content_type}");
    assert_eq!(body["error"], format!("Pictures are limited to {MAX_PICTURE_SIZE} bytes"));

    let (_, page) = app.send(Method::GET, &format!("/users/{user_id}"), None, None).await;
    assert_eq!(page["profile"]["picture"], DEFAULT_PICTURE);

    let (status, _, _) = app.upload(&token, "image/png", vec![0; MAX_PICTURE_SIZE]).await;
    assert_eq!(status, StatusCode::OK);

    let _ = std::fs::remove_dir_all(&app.state.media_dir);
}

#[tokio::test]
async fn orphaned_rooms_are_locked() {
    let app = TestApp::new();
    let (host_id, host) = app.register("host").await;
    let (_, guest) = app.register("guest").await;

    let (_, room) = app
        .send(Method::POST, "/rooms", Some(&host), Some(json!({ "topic": "Kata", "name": "Forms" })))
        .await;
    let room_id = room["id"].as_str().unwrap().to_string();

    app.state
        .db
        .with_conn(|conn| Ok(conn.execute("DELETE FROM users WHERE id = ?1", [&host_id])?))
        .unwrap();

    let (status, page) = app.send(Method::GET, &format!("/rooms/{room_id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["room"]["host"], Value::Null);

    let edit = json!({ "topic": "Kata", "name": "Mine now" });
    let (status, body) = app
        .send(Method::PUT, &format!("/rooms/{room_id}"), Some(&guest), Some(edit))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Users can only edit rooms they have created.");

    let (status, _) = app.send(Method::DELETE, &format!("/rooms/{room_id}"), Some(&guest), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // the old host's token no longer resolves to an account
    let (status, body) = app.send(Method::DELETE, &format!("/rooms/{room_id}"), Some(&host), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Account no longer exists");
}

#[tokio::test]
async fn stats_ignore_last_years_quarter() {
    let app = TestApp::new();
    let (student_id, student) = app.register("student").await;

    let attendances = format!("/users/{student_id}/records/attendances");
    let hours = format!("/users/{student_id}/records/teaching-hours");
    for date in [today(), a_year_ago()] {
        let (status, _) = app.send(Method::POST, &attendances, Some(&student), Some(json!({ "date": date }))).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, _) = app
            .send(Method::POST, &hours, Some(&student), Some(json!({ "date": date, "amount": 4 })))
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, page) = app.send(Method::GET, &attendances, None, None).await;
    assert_eq!(page["records"].as_array().unwrap().len(), 2);

    let (_, stats) = app.send(Method::GET, &format!("/users/{student_id}/stats"), None, None).await;
    assert_eq!(stats["stats"]["attendances"], 1);
    assert_eq!(stats["stats"]["teaching_hours"], 4);
    assert_eq!(stats["stats"]["total_hours"], 4);

    let (_, home) = app.send(Method::GET, "/profiles?q=student", None, None).await;
    assert_eq!(home[0]["stats"]["attendances"], 1);
    assert_eq!(home[0]["stats"]["teaching_hours"], 4);

    let (_, page) = app.send(Method::GET, &format!("/users/{student_id}"), None, None).await;
    assert_eq!(page["stats"]["attendances"], 1);
    assert_eq!(page["records"]["attendance"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn huge_hours_are_rejected() {
    let app = TestApp::new();
    let (student_id, student) = app.register("student").await;
    let hours = format!("/users/{student_id}/records/leadership-hours");

    let (status, body) = app
        .send(Method::POST, &hours, Some(&student), Some(json!({ "amount": i64::MAX })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], format!("hours must be at most {}", i32::MAX));

    for _ in 0..2 {
        let (status, _) = app
            .send(Method::POST, &hours, Some(&student), Some(json!({ "amount": i32::MAX })))
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, stats) = app.send(Method::GET, &format!("/users/{student_id}/stats"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["stats"]["leadership_hours"], 2 * i32::MAX as i64);

    let (status, _) = app.send(Method::GET, "/profiles", None, None).await;
    assert_eq!(status, StatusCode::OK);
}
