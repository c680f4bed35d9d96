use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::client::{ListQuery, Page, TrackerApi};
use crate::error::AppError;
use crate::models::{
    AddLectureRequest, AddSubjectRequest, AddTopicRequest, Batch, CompleteLectureRequest,
    Course, CourseDuration, CourseStatus, FacultyLecture, Pagination, RegisterUserRequest, Role,
    UpdateCourseRequest, UpdateLectureRequest, UpdateSubjectRequest, UpdateTopicRequest, User,
};
use crate::services::assignment::FacultyAssignments;
use crate::services::listing::{
    filter_batches, filter_faculty, filter_faculty_lectures, group_by_batch, page_window,
    showing_range,
};
use crate::services::progress::{
    AssignmentRow, BatchProgress, CourseCounts, FacultySummary, assignment_rows, batch_progress,
    course_counts, faculty_summary, overall_percentage,
};
use crate::services::status::{
    BatchStatus, days_remaining_at, is_expiring_soon, parse_timestamp, status_at, validity_label,
};

const FETCH_ALL_PAGE_SIZE: u32 = 100;

/// A page of rows plus what a list screen needs to render its footer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListView<T> {
    pub items: Vec<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    pub showing: Option<(u64, u64)>,
    pub pages: Vec<u32>,
}

impl<T> ListView<T> {
    fn new(items: Vec<T>, pagination: Option<Pagination>, query: &ListQuery) -> Self {
        let (showing, pages) = match &pagination {
            Some(p) => (
                showing_range(p.current_page, p.items_per_page, p.total_items),
                page_window(p.current_page, p.total_pages),
            ),
            None => (
                showing_range(query.page, query.limit, items.len() as u64),
                vec![query.page.max(1)],
            ),
        };
        Self {
            items,
            pagination,
            showing,
            pages,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub upcoming: usize,
    pub active: usize,
    pub expiring: usize,
    pub completed: usize,
}

impl StatusCounts {
    fn record(&mut self, status: BatchStatus) {
        match status {
            BatchStatus::Upcoming => self.upcoming += 1,
            BatchStatus::Active => self.active += 1,
            BatchStatus::Expiring => self.expiring += 1,
            BatchStatus::Completed => self.completed += 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessOverview {
    pub faculty_count: usize,
    pub active_courses: usize,
    pub total_courses: usize,
    pub batches: StatusCounts,
    pub expiring_soon: usize,
    pub invalid_batches: usize,
    pub completion_rate: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseCard {
    pub id: String,
    pub title: String,
    pub code: String,
    pub status: CourseStatus,
    pub duration: CourseDuration,
    pub subject_titles: Vec<String>,
    pub counts: CourseCounts,
}

impl From<&Course> for CourseCard {
    fn from(course: &Course) -> Self {
        Self {
            id: course.id.clone(),
            title: course.title.clone(),
            code: course.code.clone(),
            status: course.status,
            duration: course.duration.clone(),
            subject_titles: course.subjects.iter().map(|s| s.title.clone()).collect(),
            counts: course_counts(course),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseDetail {
    pub course: Course,
    pub counts: CourseCounts,
    pub next_subject_order: u32,
}

impl From<Course> for CourseDetail {
    fn from(course: Course) -> Self {
        Self {
            counts: course_counts(&course),
            next_subject_order: course.next_subject_order(),
            course,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSchedule {
    pub status: BatchStatus,
    pub days_remaining: i64,
    pub expiring_soon: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCard {
    pub id: String,
    pub name: String,
    pub course_template_id: String,
    pub start_date: String,
    pub end_date: String,
    /// Absent when the batch dates could not be parsed.
    pub schedule: Option<BatchSchedule>,
    pub validity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_error: Option<String>,
    pub progress: BatchProgress,
}

fn batch_schedule(batch: &Batch, now: DateTime<Utc>) -> Result<BatchSchedule, AppError> {
    let start = parse_timestamp(&batch.start_date)?;
    let end = parse_timestamp(&batch.end_date)?;
    let days = days_remaining_at(end, now);
    Ok(BatchSchedule {
        status: status_at(start, end, now),
        days_remaining: days,
        expiring_soon: is_expiring_soon(days),
    })
}

impl BatchCard {
    pub fn build(batch: &Batch, now: DateTime<Utc>) -> Self {
        let (schedule, validity, date_error) = match batch_schedule(batch, now) {
            Ok(schedule) => (Some(schedule), validity_label(schedule.days_remaining), None),
            Err(e) => {
                warn!("batch {} has unusable dates: {}", batch.id, e);
                (None, "Unknown".to_string(), Some(e.to_string()))
            }
        };
        Self {
            id: batch.id.clone(),
            name: batch.name.clone(),
            course_template_id: batch.course_template_id.clone(),
            start_date: batch.start_date.clone(),
            end_date: batch.end_date.clone(),
            schedule,
            validity,
            date_error,
            progress: batch_progress(batch),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBatch {
    pub name: String,
    pub course_template_id: String,
    pub start_date: String,
    #[serde(default)]
    pub faculty_assignments: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSubject {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub order: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTopic {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub order: Option<u32>,
    pub estimated_hours: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLecture {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub order: Option<u32>,
    pub duration_minutes: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacultyLectureView {
    pub pending: usize,
    pub batches: usize,
    pub subjects: usize,
    pub by_batch: BTreeMap<String, Vec<FacultyLecture>>,
}

impl FacultyLectureView {
    fn build(lectures: &[FacultyLecture], term: &str) -> Self {
        let subjects: std::collections::BTreeSet<&str> =
            lectures.iter().map(|l| l.subject_name.as_str()).collect();
        let by_batch = group_by_batch(filter_faculty_lectures(lectures, term));
        Self {
            pending: lectures.len(),
            batches: by_batch.len(),
            subjects: subjects.len(),
            by_batch,
        }
    }
}

/// Walks a paginated list from page 1 until the backend reports the last
/// page. Stops at `totalPages` even if the backend keeps claiming more.
async fn fetch_all<T, F, Fut>(mut fetch: F) -> Result<Vec<T>, AppError>
where
    F: FnMut(ListQuery) -> Fut,
    Fut: Future<Output = Result<Page<T>, AppError>>,
{
    let mut query = ListQuery {
        limit: FETCH_ALL_PAGE_SIZE,
        ..ListQuery::default()
    };
    let mut all = Vec::new();
    loop {
        let Page { items, pagination } = fetch(query.clone()).await?;
        let done = items.is_empty()
            || !pagination.is_some_and(|p| p.has_next_page && query.page < p.total_pages);
        all.extend(items);
        if done {
            return Ok(all);
        }
        query.page += 1;
    }
}

/// Read models for both dashboards. Every mutation is followed by a
/// fresh fetch; nothing derived is patched in place.
pub struct DashboardService {
    api: Arc<dyn TrackerApi>,
}

impl DashboardService {
    pub fn new(api: Arc<dyn TrackerApi>) -> Self {
        Self { api }
    }

    async fn all_batches(&self) -> Result<Vec<Batch>, AppError> {
        fetch_all(|query| async move { self.api.list_batches(&query).await }).await
    }

    async fn all_courses(&self) -> Result<Vec<Course>, AppError> {
        fetch_all(|query| async move { self.api.list_courses(&query).await }).await
    }

    async fn faculty_users(&self) -> Result<Vec<User>, AppError> {
        let users = self.api.list_users().await?;
        Ok(users.into_iter().filter(User::is_faculty).collect())
    }

    pub async fn business_overview(&self, now: DateTime<Utc>) -> Result<BusinessOverview, AppError> {
        let faculty = self
            .faculty_users()
            .await
            .map_err(|e| AppError::upstream("fetch teachers", e))?;
        let courses = self
            .all_courses()
            .await
            .map_err(|e| AppError::upstream("fetch courses", e))?;
        let batches = self
            .all_batches()
            .await
            .map_err(|e| AppError::upstream("fetch batches", e))?;

        let mut counts = StatusCounts::default();
        let mut expiring_soon = 0;
        let mut invalid = 0;
        for batch in &batches {
            match batch_schedule(batch, now) {
                Ok(schedule) => {
                    counts.record(schedule.status);
                    if schedule.expiring_soon {
                        expiring_soon += 1;
                    }
                }
                Err(e) => {
                    warn!("skipping batch {} in overview: {}", batch.id, e);
                    invalid += 1;
                }
            }
        }

        Ok(BusinessOverview {
            faculty_count: faculty.len(),
            active_courses: courses
                .iter()
                .filter(|c| c.status == CourseStatus::Active)
                .count(),
            total_courses: courses.len(),
            batches: counts,
            expiring_soon,
            invalid_batches: invalid,
            completion_rate: overall_percentage(&batches),
        })
    }

    pub async fn faculty_directory(&self, term: &str) -> Result<Vec<User>, AppError> {
        let users = self
            .api
            .list_users()
            .await
            .map_err(|e| AppError::upstream("fetch teachers", e))?;
        Ok(filter_faculty(&users, term).into_iter().cloned().collect())
    }

    pub async fn register_faculty(
        &self,
        mut req: RegisterUserRequest,
    ) -> Result<Vec<User>, AppError> {
        if req.email.trim().is_empty() || req.password.is_empty() {
            return Err(AppError::BadRequest("Email and password are required".to_string()));
        }
        req.role = Role::Faculty;
        let user = self
            .api
            .register_user(&req)
            .await
            .map_err(|e| AppError::upstream("register teacher", e))?;
        info!("registered faculty {}", user.email);
        self.faculty_directory("").await
    }

    pub async fn course_list(&self, query: &ListQuery) -> Result<ListView<CourseCard>, AppError> {
        let page = self
            .api
            .list_courses(query)
            .await
            .map_err(|e| AppError::upstream("fetch courses", e))?;
        let cards = page.items.iter().map(CourseCard::from).collect();
        Ok(ListView::new(cards, page.pagination, query))
    }

    pub async fn course_detail(&self, course_id: &str) -> Result<CourseDetail, AppError> {
        let course = self
            .api
            .get_course(course_id)
            .await
            .map_err(|e| AppError::upstream("fetch course details", e))?;
        Ok(CourseDetail::from(course))
    }

    pub async fn create_course(
        &self,
        req: crate::models::NewCourseRequest,
        query: &ListQuery,
    ) -> Result<ListView<CourseCard>, AppError> {
        if req.title.trim().is_empty() || req.course_code.trim().is_empty() {
            return Err(AppError::BadRequest("Title and course code are required".to_string()));
        }
        let course = self
            .api
            .create_course(&req)
            .await
            .map_err(|e| AppError::upstream("create course", e))?;
        info!("created course {} ({})", course.title, course.id);
        self.course_list(query).await
    }

    pub async fn update_course(
        &self,
        req: UpdateCourseRequest,
        query: &ListQuery,
    ) -> Result<ListView<CourseCard>, AppError> {
        self.api
            .update_course(&req)
            .await
            .map_err(|e| AppError::upstream("update course", e))?;
        self.course_list(query).await
    }

    pub async fn add_subject(
        &self,
        course_id: &str,
        subject: NewSubject,
    ) -> Result<CourseDetail, AppError> {
        let order = match subject.order {
            Some(order) => order,
            None => self.course_detail(course_id).await?.next_subject_order,
        };
        let req = AddSubjectRequest {
            course_id: course_id.to_string(),
            title: subject.title,
            description: subject.description,
            order,
        };
        self.api
            .add_subject(&req)
            .await
            .map_err(|e| AppError::upstream("add subject", e))?;
        self.course_detail(course_id).await
    }

    pub async fn update_subject(&self, req: UpdateSubjectRequest) -> Result<CourseDetail, AppError> {
        self.api
            .update_subject(&req)
            .await
            .map_err(|e| AppError::upstream("update subject", e))?;
        self.course_detail(&req.course_id).await
    }

    pub async fn add_topic(
        &self,
        course_id: &str,
        subject_id: &str,
        topic: NewTopic,
    ) -> Result<CourseDetail, AppError> {
        let order = match topic.order {
            Some(order) => order,
            None => {
                let detail = self.course_detail(course_id).await?;
                detail
                    .course
                    .subject(subject_id)
                    .ok_or(AppError::NotFound)?
                    .next_topic_order()
            }
        };
        let req = AddTopicRequest {
            course_id: course_id.to_string(),
            subject_id: subject_id.to_string(),
            title: topic.title,
            description: topic.description,
            order,
            estimated_hours: topic.estimated_hours,
        };
        self.api
            .add_topic(&req)
            .await
            .map_err(|e| AppError::upstream("add topic", e))?;
        self.course_detail(course_id).await
    }

    pub async fn update_topic(&self, req: UpdateTopicRequest) -> Result<CourseDetail, AppError> {
        self.api
            .update_topic(&req)
            .await
            .map_err(|e| AppError::upstream("update topic", e))?;
        self.course_detail(&req.course_id).await
    }

    pub async fn add_lecture(
        &self,
        course_id: &str,
        subject_id: &str,
        topic_id: &str,
        lecture: NewLecture,
    ) -> Result<CourseDetail, AppError> {
        let order = match lecture.order {
            Some(order) => order,
            None => {
                let detail = self.course_detail(course_id).await?;
                detail
                    .course
                    .subject(subject_id)
                    .and_then(|s| s.topic(topic_id))
                    .ok_or(AppError::NotFound)?
                    .next_lecture_order()
            }
        };
        let req = AddLectureRequest {
            course_id: course_id.to_string(),
            subject_id: subject_id.to_string(),
            topic_id: topic_id.to_string(),
            title: lecture.title,
            description: lecture.description,
            order,
            duration_minutes: lecture.duration_minutes,
        };
        self.api
            .add_lecture(&req)
            .await
            .map_err(|e| AppError::upstream("add lecture", e))?;
        self.course_detail(course_id).await
    }

    pub async fn update_lecture(&self, req: UpdateLectureRequest) -> Result<CourseDetail, AppError> {
        self.api
            .update_lecture(&req)
            .await
            .map_err(|e| AppError::upstream("update lecture", e))?;
        self.course_detail(&req.course_id).await
    }

    pub async fn batch_list(
        &self,
        query: &ListQuery,
        now: DateTime<Utc>,
    ) -> Result<ListView<BatchCard>, AppError> {
        if let Some(status) = query.status_filter() {
            if BatchStatus::from_filter(status).is_none() {
                return Err(AppError::BadRequest(format!("Unknown batch status: {}", status)));
            }
        }
        let page = self
            .api
            .list_batches(query)
            .await
            .map_err(|e| AppError::upstream("fetch batches", e))?;
        let term = query.search_term().unwrap_or_default();
        let cards = filter_batches(&page.items, term)
            .into_iter()
            .map(|b| BatchCard::build(b, now))
            .collect();
        Ok(ListView::new(cards, page.pagination, query))
    }

    /// Validates the faculty assignments against the course template
    /// before anything is sent.
    pub async fn create_batch(
        &self,
        form: NewBatch,
        query: &ListQuery,
        now: DateTime<Utc>,
    ) -> Result<ListView<BatchCard>, AppError> {
        let course = self
            .api
            .get_course(&form.course_template_id)
            .await
            .map_err(|e| AppError::upstream("fetch course details", e))?;

        let mut assignments = FacultyAssignments::for_course(&course);
        for (subject_id, faculty_id) in &form.faculty_assignments {
            assignments.assign(subject_id, faculty_id)?;
        }
        let start = parse_timestamp(&form.start_date)?;
        let req = assignments.into_request(&form.name, start)?;

        let batch = self
            .api
            .create_batch(&req)
            .await
            .map_err(|e| AppError::upstream("create batch", e))?;
        info!("created batch {} from course {}", batch.name, course.title);
        self.batch_list(query, now).await
    }

    pub async fn lecture_assignments(&self) -> Result<Vec<AssignmentRow>, AppError> {
        let batches = self
            .all_batches()
            .await
            .map_err(|e| AppError::upstream("fetch batches", e))?;
        let users = self
            .api
            .list_users()
            .await
            .map_err(|e| AppError::upstream("fetch teachers", e))?;
        Ok(assignment_rows(&batches, &users))
    }

    pub async fn faculty_lectures(&self, term: &str) -> Result<FacultyLectureView, AppError> {
        let lectures = self
            .api
            .faculty_lectures()
            .await
            .map_err(|e| AppError::upstream("fetch your lectures", e))?;
        Ok(FacultyLectureView::build(&lectures, term))
    }

    pub async fn complete_lecture(
        &self,
        req: CompleteLectureRequest,
    ) -> Result<FacultyLectureView, AppError> {
        self.api
            .complete_lecture(&req)
            .await
            .map_err(|e| AppError::upstream("mark lecture as completed", e))?;
        info!("lecture {} completed in batch {}", req.lecture_id, req.batch_id);
        self.faculty_lectures("").await
    }

    pub async fn faculty_progress(&self, faculty: &User) -> Result<FacultySummary, AppError> {
        let batches = self
            .all_batches()
            .await
            .map_err(|e| AppError::upstream("fetch batches", e))?;
        Ok(faculty_summary(&faculty.id, &batches))
    }
}
