mod request_id;

use axum::Json;
use axum::extract::{Path, Query};
use axum::middleware;
use axum::routing::{post, put};
use axum::{Router, extract::State, http::StatusCode, routing::get};
use chrono::Utc;
use serde::Deserialize;

use crate::client::ListQuery;
use crate::error::AppError;
use crate::models::*;
use crate::services::dashboard::{
    FacultyLectureView, NewBatch, NewLecture, NewSubject, NewTopic,
};
use crate::services::progress::AssignmentRow;
use crate::services::{
    BatchCard, BusinessOverview, CourseCard, CourseDetail, FacultySummary, ListView,
};
use crate::state::AppState;

pub use request_id::REQUEST_ID_HEADER;

#[derive(Deserialize)]
struct SearchParams {
    #[serde(default)]
    search: String,
}

pub fn router(state: AppState) -> Router {
    let business = Router::new()
        .route("/overview", get(business_overview))
        .route("/faculty", get(list_faculty).post(register_faculty))
        .route("/courses", get(list_courses).post(create_course))
        .route("/courses/{id}", get(course_detail).put(update_course))
        .route("/courses/{id}/subjects", post(add_subject))
        .route("/courses/{id}/subjects/{subject_id}", put(update_subject))
        .route("/courses/{id}/subjects/{subject_id}/topics", post(add_topic))
        .route(
            "/courses/{id}/subjects/{subject_id}/topics/{topic_id}",
            put(update_topic),
        )
        .route(
            "/courses/{id}/subjects/{subject_id}/topics/{topic_id}/lectures",
            post(add_lecture),
        )
        .route(
            "/courses/{id}/subjects/{subject_id}/topics/{topic_id}/lectures/{lecture_id}",
            put(update_lecture),
        )
        .route("/batches", get(list_batches).post(create_batch))
        .route("/lectures", get(lecture_assignments));

    let faculty = Router::new()
        .route("/lectures", get(faculty_lectures))
        .route("/lectures/complete", post(complete_lecture))
        .route("/progress", get(faculty_progress));

    Router::new()
        .route("/health", get(health))
        .route("/session", get(current_session))
        .route("/session/login", post(login))
        .route("/session/logout", post(logout))
        .nest("/business", business)
        .nest("/faculty", faculty)
        .layer(middleware::from_fn(request_id::trace_requests))
        .with_state(state)
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<User>, AppError> {
    let user = state.session.login(&req.email, &req.password).await?;
    Ok(Json(user))
}

async fn logout(State(state): State<AppState>) -> StatusCode {
    state.session.logout().await;
    StatusCode::NO_CONTENT
}

async fn current_session(State(state): State<AppState>) -> Result<Json<User>, AppError> {
    let user = state.session.current().await.ok_or(AppError::Unauthorized)?;
    Ok(Json(user))
}

async fn business_overview(
    State(state): State<AppState>,
) -> Result<Json<BusinessOverview>, AppError> {
    state.session.require(Role::Business).await?;
    let overview = state.dashboard.business_overview(Utc::now()).await?;
    Ok(Json(overview))
}

async fn list_faculty(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<User>>, AppError> {
    state.session.require(Role::Business).await?;
    let faculty = state.dashboard.faculty_directory(&params.search).await?;
    Ok(Json(faculty))
}

async fn register_faculty(
    State(state): State<AppState>,
    Json(req): Json<RegisterUserRequest>,
) -> Result<Json<Vec<User>>, AppError> {
    state.session.require(Role::Business).await?;
    let faculty = state.dashboard.register_faculty(req).await?;
    Ok(Json(faculty))
}

async fn list_courses(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListView<CourseCard>>, AppError> {
    state.session.require(Role::Business).await?;
    let courses = state.dashboard.course_list(&query).await?;
    Ok(Json(courses))
}

async fn create_course(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    Json(req): Json<NewCourseRequest>,
) -> Result<Json<ListView<CourseCard>>, AppError> {
    state.session.require(Role::Business).await?;
    let courses = state.dashboard.create_course(req, &query).await?;
    Ok(Json(courses))
}

async fn course_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CourseDetail>, AppError> {
    state.session.require(Role::Business).await?;
    let detail = state.dashboard.course_detail(&id).await?;
    Ok(Json(detail))
}

async fn update_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ListQuery>,
    Json(form): Json<NewCourseRequest>,
) -> Result<Json<ListView<CourseCard>>, AppError> {
    state.session.require(Role::Business).await?;
    let req = UpdateCourseRequest {
        course_id: id,
        title: form.title,
        description: form.description,
        course_code: form.course_code,
        duration: form.duration,
        status: form.status,
    };
    let courses = state.dashboard.update_course(req, &query).await?;
    Ok(Json(courses))
}

fn required_order(order: Option<u32>) -> Result<u32, AppError> {
    order.ok_or_else(|| AppError::BadRequest("order is required".to_string()))
}

async fn add_subject(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(subject): Json<NewSubject>,
) -> Result<Json<CourseDetail>, AppError> {
    state.session.require(Role::Business).await?;
    let detail = state.dashboard.add_subject(&id, subject).await?;
    Ok(Json(detail))
}

async fn update_subject(
    State(state): State<AppState>,
    Path((id, subject_id)): Path<(String, String)>,
    Json(form): Json<NewSubject>,
) -> Result<Json<CourseDetail>, AppError> {
    state.session.require(Role::Business).await?;
    let req = UpdateSubjectRequest {
        course_id: id,
        subject_id,
        title: form.title,
        description: form.description,
        order: required_order(form.order)?,
    };
    let detail = state.dashboard.update_subject(req).await?;
    Ok(Json(detail))
}

async fn add_topic(
    State(state): State<AppState>,
    Path((id, subject_id)): Path<(String, String)>,
    Json(topic): Json<NewTopic>,
) -> Result<Json<CourseDetail>, AppError> {
    state.session.require(Role::Business).await?;
    let detail = state.dashboard.add_topic(&id, &subject_id, topic).await?;
    Ok(Json(detail))
}

async fn update_topic(
    State(state): State<AppState>,
    Path((id, subject_id, topic_id)): Path<(String, String, String)>,
    Json(form): Json<NewTopic>,
) -> Result<Json<CourseDetail>, AppError> {
    state.session.require(Role::Business).await?;
    let req = UpdateTopicRequest {
        course_id: id,
        subject_id,
        topic_id,
        title: form.title,
        description: form.description,
        order: required_order(form.order)?,
        estimated_hours: form.estimated_hours,
    };
    let detail = state.dashboard.update_topic(req).await?;
    Ok(Json(detail))
}

async fn add_lecture(
    State(state): State<AppState>,
    Path((id, subject_id, topic_id)): Path<(String, String, String)>,
    Json(lecture): Json<NewLecture>,
) -> Result<Json<CourseDetail>, AppError> {
    state.session.require(Role::Business).await?;
    let detail = state
        .dashboard
        .add_lecture(&id, &subject_id, &topic_id, lecture)
        .await?;
    Ok(Json(detail))
}

async fn update_lecture(
    State(state): State<AppState>,
    Path((id, subject_id, topic_id, lecture_id)): Path<(String, String, String, String)>,
    Json(form): Json<NewLecture>,
) -> Result<Json<CourseDetail>, AppError> {
    state.session.require(Role::Business).await?;
    let req = UpdateLectureRequest {
        course_id: id,
        subject_id,
        topic_id,
        lecture_id,
        title: form.title,
        description: form.description,
        order: required_order(form.order)?,
        duration_minutes: form.duration_minutes,
    };
    let detail = state.dashboard.update_lecture(req).await?;
    Ok(Json(detail))
}

async fn list_batches(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListView<BatchCard>>, AppError> {
    state.session.require(Role::Business).await?;
    let batches = state.dashboard.batch_list(&query, Utc::now()).await?;
    Ok(Json(batches))
}

async fn create_batch(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    Json(form): Json<NewBatch>,
) -> Result<Json<ListView<BatchCard>>, AppError> {
    state.session.require(Role::Business).await?;
    let batches = state.dashboard.create_batch(form, &query, Utc::now()).await?;
    Ok(Json(batches))
}

async fn lecture_assignments(
    State(state): State<AppState>,
) -> Result<Json<Vec<AssignmentRow>>, AppError> {
    state.session.require(Role::Business).await?;
    let rows = state.dashboard.lecture_assignments().await?;
    Ok(Json(rows))
}

async fn faculty_lectures(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<FacultyLectureView>, AppError> {
    state.session.require(Role::Faculty).await?;
    let view = state.dashboard.faculty_lectures(&params.search).await?;
    Ok(Json(view))
}

async fn complete_lecture(
    State(state): State<AppState>,
    Json(req): Json<CompleteLectureRequest>,
) -> Result<Json<FacultyLectureView>, AppError> {
    state.session.require(Role::Faculty).await?;
    let view = state.dashboard.complete_lecture(req).await?;
    Ok(Json(view))
}

async fn faculty_progress(
    State(state): State<AppState>,
) -> Result<Json<FacultySummary>, AppError> {
    let me = state.session.require(Role::Faculty).await?;
    let summary = state.dashboard.faculty_progress(&me).await?;
    Ok(Json(summary))
}
