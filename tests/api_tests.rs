use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};

use movie_recs::api::{create_router, AppState, USER_ID_HEADER};

fn create_test_server() -> TestServer {
    let state = AppState::in_memory();
    let app = create_router(state);
    TestServer::new(app).unwrap()
}

fn user_header(user_id: i64) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static(USER_ID_HEADER),
        HeaderValue::from_str(&user_id.to_string()).unwrap(),
    )
}

async fn register(server: &TestServer, name: &str) -> i64 {
    let response = server
        .post("/users/register")
        .json(&json!({
            "username": name,
            "email": format!("{}@example.com", name),
            "password": "secret",
            "password_confirm": "secret"
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let user: Value = response.json();
    user["id"].as_i64().unwrap()
}

async fn create_movie(server: &TestServer, title: &str) -> i64 {
    let response = server
        .post("/movies")
        .json(&json!({ "title": title, "genre": "Drama" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let movie: Value = response.json();
    movie["id"].as_i64().unwrap()
}

async fn rate(server: &TestServer, user_id: i64, movie_id: i64, score: i64) {
    let (name, value) = user_header(user_id);
    server
        .post(&format!("/movies/{}/rating", movie_id))
        .add_header(name, value)
        .json(&json!({ "score": score }))
        .await
        .assert_status_ok();
}

fn titles(movies: &Value) -> Vec<String> {
    movies
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["title"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server();
    let response = server.get("/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_response_carries_request_id() {
    let server = create_test_server();
    let response = server.get("/health").await;
    let request_id = response.header("x-request-id");
    assert!(uuid::Uuid::parse_str(request_id.to_str().unwrap()).is_ok());
}

#[tokio::test]
async fn test_register_and_login() {
    let server = create_test_server();
    let user_id = register(&server, "ada").await;

    let response = server
        .post("/users/login")
        .json(&json!({ "email": "ada@example.com", "password": "secret" }))
        .await;
    response.assert_status_ok();
    let user: Value = response.json();
    assert_eq!(user["id"].as_i64(), Some(user_id));
    assert!(user.get("password_hash").is_none());

    let response = server
        .post("/users/login")
        .json(&json!({ "email": "ada@example.com", "password": "wrong" }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_rejects_duplicates_and_mismatches() {
    let server = create_test_server();
    register(&server, "ada").await;

    let response = server
        .post("/users/register")
        .json(&json!({
            "username": "ada2",
            "email": "ada@example.com",
            "password": "secret",
            "password_confirm": "secret"
        }))
        .await;
    response.assert_status(StatusCode::CONFLICT);

    let response = server
        .post("/users/register")
        .json(&json!({
            "username": "bob",
            "email": "bob@example.com",
            "password": "secret",
            "password_confirm": "other"
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "Passwords do not match.");

    let response = server
        .post("/users/register")
        .json(&json!({
            "username": "eve",
            "email": "a\"b@example.com",
            "password": "secret",
            "password_confirm": "secret"
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "Enter a valid email address.");
}

#[tokio::test]
async fn test_movie_list_is_sorted_by_title() {
    let server = create_test_server();
    create_movie(&server, "Zodiac").await;
    create_movie(&server, "Alien").await;
    create_movie(&server, "Heat").await;

    let response = server.get("/movies").await;
    response.assert_status_ok();
    let movies: Value = response.json();
    assert_eq!(titles(&movies), vec!["Alien", "Heat", "Zodiac"]);
}

#[tokio::test]
async fn test_movie_detail_shows_current_rating() {
    let server = create_test_server();
    let user_id = register(&server, "ada").await;
    let movie_id = create_movie(&server, "Heat").await;

    let response = server.get(&format!("/movies/{}", movie_id)).await;
    response.assert_status_ok();
    let detail: Value = response.json();
    assert_eq!(detail["title"], "Heat");
    assert!(detail["current_rating"].is_null());

    rate(&server, user_id, movie_id, 2).await;
    rate(&server, user_id, movie_id, 4).await;

    let (name, value) = user_header(user_id);
    let response = server
        .get(&format!("/movies/{}", movie_id))
        .add_header(name, value)
        .await;
    let detail: Value = response.json();
    assert_eq!(detail["current_rating"], 4);

    server.get("/movies/999").await.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rating_validation() {
    let server = create_test_server();
    let user_id = register(&server, "ada").await;
    let movie_id = create_movie(&server, "Heat").await;

    for score in [0, 6] {
        let (name, value) = user_header(user_id);
        server
            .post(&format!("/movies/{}/rating", movie_id))
            .add_header(name, value)
            .json(&json!({ "score": score }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    let (name, value) = user_header(user_id);
    server
        .post("/movies/999/rating")
        .add_header(name, value)
        .json(&json!({ "score": 3 }))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    server
        .post(&format!("/movies/{}/rating", movie_id))
        .json(&json!({ "score": 3 }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    let (name, value) = user_header(12345);
    server
        .post(&format!("/movies/{}/rating", movie_id))
        .add_header(name, value)
        .json(&json!({ "score": 3 }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_recommendations_flow() {
    let server = create_test_server();
    let a = register(&server, "alice").await;
    let b = register(&server, "bob").await;
    let c = register(&server, "carol").await;
    let d = register(&server, "dave").await;
    let x = create_movie(&server, "X").await;
    let y = create_movie(&server, "Y").await;

    rate(&server, a, x, 5).await;
    rate(&server, a, y, 1).await;
    rate(&server, b, x, 5).await;
    rate(&server, b, y, 1).await;
    rate(&server, c, x, 1).await;
    rate(&server, c, y, 5).await;

    // Dave has no ratings: no recommendations, latest movies offered instead.
    let (name, value) = user_header(d);
    let response = server.get("/recommendations").add_header(name, value).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert!(body["recommendations"].as_array().unwrap().is_empty());
    assert_eq!(titles(&body["fallback"]), vec!["Y", "X"]);
    assert!(body["message"].is_string());

    // Bob rates two more movies; Alice, his closest match, is offered both.
    let m = create_movie(&server, "Memento").await;
    let h = create_movie(&server, "Heat").await;
    rate(&server, b, m, 4).await;
    rate(&server, b, h, 5).await;

    let (name, value) = user_header(a);
    let response = server.get("/recommendations").add_header(name, value).await;
    let body: Value = response.json();
    assert_eq!(titles(&body["recommendations"]), vec!["Heat", "Memento"]);
    assert!(body["fallback"].as_array().unwrap().is_empty());

    let (name, value) = user_header(a);
    let response = server
        .get("/recommendations?count=1")
        .add_header(name, value)
        .await;
    let body: Value = response.json();
    assert_eq!(body["recommendations"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_recommendations_require_user() {
    let server = create_test_server();
    server
        .get("/recommendations")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_similar_movies() {
    let server = create_test_server();
    let a = register(&server, "alice").await;
    let b = register(&server, "bob").await;
    let x = create_movie(&server, "X").await;
    let y = create_movie(&server, "Y").await;
    rate(&server, a, x, 5).await;
    rate(&server, a, y, 1).await;
    rate(&server, b, x, 5).await;

    let response = server.get(&format!("/similar-movies/{}", x)).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["movie"]["title"], "X");
    assert_eq!(titles(&body["similar_movies"]), vec!["Y"]);

    server
        .get("/similar-movies/999")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_deleting_movie_removes_its_ratings() {
    let server = create_test_server();
    let user_id = register(&server, "ada").await;
    let heat = create_movie(&server, "Heat").await;
    let alien = create_movie(&server, "Alien").await;
    rate(&server, user_id, heat, 4).await;
    rate(&server, user_id, alien, 3).await;

    server
        .delete(&format!("/movies/{}", heat))
        .await
        .assert_status(StatusCode::NO_CONTENT);
    server
        .delete(&format!("/movies/{}", heat))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let (name, value) = user_header(user_id);
    let response = server.get("/users/me").add_header(name, value).await;
    response.assert_status_ok();
    let profile: Value = response.json();
    assert_eq!(profile["user"]["username"], "ada");
    let ratings = profile["ratings"].as_array().unwrap();
    assert_eq!(ratings.len(), 1);
    assert_eq!(ratings[0]["movie_id"].as_i64(), Some(alien));
}

#[tokio::test]
async fn test_deleting_user() {
    let server = create_test_server();
    let user_id = register(&server, "ada").await;

    server
        .delete(&format!("/users/{}", user_id))
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let (name, value) = user_header(user_id);
    server
        .get("/users/me")
        .add_header(name, value)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}
