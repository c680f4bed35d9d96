use std::collections::HashMap;
use std::time::Duration;

use axum::extract::Query;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

use lecture_tracker::client::{HttpTrackerApi, ListQuery, TrackerApi};
use lecture_tracker::config::TrackerConfig;
use lecture_tracker::error::AppError;
use lecture_tracker::models::{
    ApiResponse, Course, CourseDuration, CourseStatus, LoginRequest, Pagination, UserRef,
};

const TOKEN_COOKIE: &str = "token=abc123";

async fn stub_login(Json(body): Json<Value>) -> impl IntoResponse {
    if body["password"] != "pw" {
        return (
            StatusCode::UNAUTHORIZED,
            [(header::SET_COOKIE, "ignored=1".to_string())],
            Json(json!({ "success": false, "message": "Invalid credentials" })),
        );
    }
    (
        StatusCode::OK,
        [(header::SET_COOKIE, format!("{}; Path=/; HttpOnly", TOKEN_COOKIE))],
        Json(json!({ "success": true, "message": "Logged in", "statusCode": 200 })),
    )
}

async fn stub_me(headers: HeaderMap) -> impl IntoResponse {
    let has_token = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains(TOKEN_COOKIE));
    if !has_token {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "message": "no token" })));
    }
    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "message": "ok",
            "data": {
                "_id": "u1",
                "firstName": "Olive",
                "lastName": "Owner",
                "email": "owner@example.com",
                "role": "business"
            }
        })),
    )
}

async fn stub_courses(
    Query(params): Query<HashMap<String, String>>,
) -> Json<ApiResponse<Vec<Course>>> {
    let page = params.get("page").and_then(|p| p.parse::<u32>().ok()).unwrap_or(1);
    let course = Course {
        id: "c1".into(),
        title: params.get("search").cloned().unwrap_or_default(),
        description: String::new(),
        code: "DS101".into(),
        duration: CourseDuration { value: 3, unit: "months".into() },
        status: CourseStatus::Active,
        created_by: Some(UserRef::Summary {
            id: "u1".into(),
            first_name: "Olive".into(),
            last_name: "Owner".into(),
            email: "owner@example.com".into(),
        }),
        subjects: Vec::new(),
        created_at: None,
        updated_at: None,
    };
    Json(ApiResponse::ok(vec![course]).with_pagination(Pagination::new(page, 10, 21)))
}

async fn stub_batches() -> Json<Value> {
    Json(json!({ "success": false, "message": "Database unavailable", "data": [] }))
}

async fn stub_users() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn spawn_backend() -> String {
    let app = Router::new()
        .route("/user/login", post(stub_login))
        .route("/user", get(stub_me))
        .route("/user/list", get(stub_users))
        .route("/course/list", get(stub_courses))
        .route("/batch/list", get(stub_batches));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn client(backend_url: String) -> HttpTrackerApi {
    let config = TrackerConfig {
        backend_url,
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        request_timeout: Duration::from_secs(5),
    };
    HttpTrackerApi::new(&config).unwrap()
}

#[tokio::test]
async fn login_cookie_is_sent_on_later_calls() {
    let api = client(spawn_backend().await);

    let err = api.current_user().await.unwrap_err();
    assert!(matches!(err, AppError::Status(401)));

    let err = api
        .login(&LoginRequest { email: "owner@example.com".into(), password: "bad".into() })
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "HTTP error! status: 401");

    api.login(&LoginRequest { email: "owner@example.com".into(), password: "pw".into() })
        .await
        .unwrap();
    let me = api.current_user().await.unwrap();
    assert_eq!(me.id, "u1");
    assert_eq!(me.display_name(), "Olive Owner");
}

#[tokio::test]
async fn list_query_and_pagination_round_the_wire() {
    let api = client(spawn_backend().await);
    let query = ListQuery {
        page: 2,
        search: Some("Graphs".into()),
        ..ListQuery::default()
    };
    let page = api.list_courses(&query).await.unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].title, "Graphs");
    assert_eq!(page.items[0].created_by.as_ref().unwrap().id(), "u1");

    let pagination = page.pagination.unwrap();
    assert_eq!(pagination.current_page, 2);
    assert_eq!(pagination.total_pages, 3);
}

#[tokio::test]
async fn backend_failures_map_to_errors() {
    let api = client(spawn_backend().await);

    match api.list_batches(&ListQuery::default()).await {
        Err(AppError::Api(message)) => assert_eq!(message, "Database unavailable"),
        other => panic!("unexpected: {other:?}"),
    }

    let err = api.list_users().await.unwrap_err();
    assert!(matches!(err, AppError::Status(500)));
    assert_eq!(err.to_string(), "HTTP error! status: 500");
}
