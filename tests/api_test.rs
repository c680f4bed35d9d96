use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use lecture_tracker::api::{REQUEST_ID_HEADER, router};
use lecture_tracker::client::MemoryTrackerApi;
use lecture_tracker::models::{CompleteLectureRequest, FacultyLecture, Role, User};
use lecture_tracker::state::AppState;

fn user(id: &str, first: &str, role: Role) -> User {
    User {
        id: id.to_string(),
        first_name: first.to_string(),
        last_name: "Tester".to_string(),
        name: None,
        email: format!("{}@example.com", id),
        phone_number: None,
        role,
        faculty_profile: None,
    }
}

fn app() -> Router {
    let api = MemoryTrackerApi::new()
        .with_user(user("owner", "Olive", Role::Business), "owner-pw")
        .with_user(user("prof", "Priya", Role::Faculty), "prof-pw")
        .with_user(user("lect", "Lars", Role::Faculty), "lect-pw");
    router(AppState::new(Arc::new(api)))
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn login(app: &Router, email: &str, password: &str) {
    let (status, body) = call(
        app,
        "POST",
        "/session/login",
        Some(json!({ "email": email, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
}

#[tokio::test]
async fn health_echoes_request_id() {
    let app = app();
    let request = Request::builder()
        .uri("/health")
        .header(REQUEST_ID_HEADER, "req-123")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[REQUEST_ID_HEADER], "req-123");

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert!(response.headers().contains_key(REQUEST_ID_HEADER));
}

#[tokio::test]
async fn routes_are_gated_by_session_role() {
    let app = app();

    let (status, body) = call(&app, "GET", "/business/overview", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Not logged in");

    let (status, body) = call(
        &app,
        "POST",
        "/session/login",
        Some(json!({ "email": "owner@example.com", "password": "nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Failed to log in");

    login(&app, "prof@example.com", "prof-pw").await;
    let (status, body) = call(&app, "GET", "/session", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "faculty");

    let (status, _) = call(&app, "GET", "/business/courses", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(&app, "POST", "/session/logout", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&app, "GET", "/session", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn later_login_replaces_the_shared_identity() {
    let app = app();
    login(&app, "owner@example.com", "owner-pw").await;
    let (status, _) = call(&app, "GET", "/business/overview", None).await;
    assert_eq!(status, StatusCode::OK);

    login(&app, "prof@example.com", "prof-pw").await;
    let (_, body) = call(&app, "GET", "/session", None).await;
    assert_eq!(body["email"], "prof@example.com");
    let (status, _) = call(&app, "GET", "/business/overview", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn business_and_faculty_flow() {
    let app = app();
    login(&app, "owner@example.com", "owner-pw").await;

    let (status, body) = call(&app, "GET", "/business/faculty?search=priya", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = call(
        &app,
        "POST",
        "/business/courses",
        Some(json!({
            "title": "Data Structures",
            "description": "Core course",
            "courseCode": "DS101",
            "duration": { "value": 3, "unit": "months" },
            "status": "active"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["showing"], json!([1, 1]));
    let course_id = body["items"][0]["id"].as_str().unwrap().to_string();

    let subjects_uri = format!("/business/courses/{}/subjects", course_id);
    let (status, _) = call(&app, "POST", &subjects_uri, Some(json!({ "title": "Trees" }))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, detail) =
        call(&app, "POST", &subjects_uri, Some(json!({ "title": "Graphs" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["nextSubjectOrder"], 3);
    assert_eq!(detail["course"]["subjects"][1]["order"], 2);

    let trees = detail["course"]["subjects"][0]["_id"].as_str().unwrap().to_string();
    let graphs = detail["course"]["subjects"][1]["_id"].as_str().unwrap().to_string();

    let topic_uri = format!("{}/{}/topics", subjects_uri, trees);
    let (status, detail) = call(
        &app,
        "POST",
        &topic_uri,
        Some(json!({ "title": "BST", "estimatedHours": 4.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let topic = detail["course"]["subjects"][0]["topics"][0]["_id"]
        .as_str()
        .unwrap()
        .to_string();

    let lecture_uri = format!("{}/{}/lectures", topic_uri, topic);
    for title in ["Insert", "Delete"] {
        let (status, _) = call(&app, "POST", &lecture_uri, Some(json!({ "title": title }))).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (_, detail) = call(&app, "GET", &format!("/business/courses/{}", course_id), None).await;
    assert_eq!(detail["counts"]["topics"], 1);
    assert_eq!(detail["counts"]["lectures"], 2);

    let mut form = json!({
        "name": "Spring Cohort",
        "courseTemplateId": course_id,
        "startDate": "2026-01-05",
        "facultyAssignments": {}
    });
    form["facultyAssignments"][trees.as_str()] = json!("prof");
    let (status, body) = call(&app, "POST", "/business/batches", Some(form.clone())).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["message"].as_str().unwrap().contains(&graphs));

    form["facultyAssignments"][graphs.as_str()] = json!("lect");
    let (status, body) = call(&app, "POST", "/business/batches", Some(form)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let card = &body["items"][0];
    assert_eq!(card["name"], "Spring Cohort");
    assert_eq!(card["endDate"], "2026-04-05T00:00:00+00:00");
    assert_eq!(card["progress"]["totalLectures"], 2);
    assert_eq!(card["progress"]["percent"], 0);

    let (status, rows) = call(&app, "GET", "/business/lectures", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rows.as_array().unwrap().len(), 2);

    call(&app, "POST", "/session/logout", None).await;
    login(&app, "prof@example.com", "prof-pw").await;

    let (status, view) = call(&app, "GET", "/faculty/lectures", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["pending"], 2);
    let pending: FacultyLecture =
        serde_json::from_value(view["byBatch"]["Spring Cohort"][0].clone()).unwrap();
    let complete = CompleteLectureRequest::from(&pending);

    let (status, view) = call(
        &app,
        "POST",
        "/faculty/lectures/complete",
        Some(serde_json::to_value(&complete).unwrap()),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{view}");
    assert_eq!(view["pending"], 1);

    let (status, body) = call(
        &app,
        "POST",
        "/faculty/lectures/complete",
        Some(serde_json::to_value(&complete).unwrap()),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY, "{body}");
    assert_eq!(body["message"], "Failed to mark lecture as completed");

    let (status, summary) = call(&app, "GET", "/faculty/progress", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["batches"], 1);
    assert_eq!(summary["lecturesGiven"], 1);
    assert_eq!(summary["lecturesAssigned"], 2);
    assert_eq!(summary["averageCompletion"], 50);
}
