use async_trait::async_trait;
use chrono::{DateTime, Months, TimeDelta, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::client::{ListQuery, Page, SortOrder, TrackerApi};
use crate::error::AppError;
use crate::models::{
    AddLectureRequest, AddSubjectRequest, AddTopicRequest, Batch, BatchLecture, BatchSubject,
    BatchTopic, CompleteLectureRequest, Course, CourseDuration, CreateBatchRequest,
    FacultyLecture, Lecture, LoginRequest, NewCourseRequest, Pagination, RegisterUserRequest,
    Subject, Topic, UpdateCourseRequest, UpdateLectureRequest, UpdateSubjectRequest,
    UpdateTopicRequest, User, UserRef,
};
use crate::services::status::{classify_batch, parse_timestamp};

#[derive(Default)]
struct MemoryStore {
    users: Vec<(User, String)>,
    courses: Vec<Course>,
    batches: Vec<Batch>,
    signed_in: Option<String>,
}

impl MemoryStore {
    fn session_user(&self) -> Result<&User, AppError> {
        let id = self.signed_in.as_deref().ok_or(AppError::Status(401))?;
        self.users
            .iter()
            .map(|(u, _)| u)
            .find(|u| u.id == id)
            .ok_or(AppError::Status(401))
    }

    fn course_mut(&mut self, course_id: &str) -> Result<&mut Course, AppError> {
        self.courses
            .iter_mut()
            .find(|c| c.id == course_id)
            .ok_or(AppError::Status(404))
    }

    fn subject_mut(&mut self, course_id: &str, subject_id: &str) -> Result<&mut Subject, AppError> {
        self.course_mut(course_id)?
            .subjects
            .iter_mut()
            .find(|s| s.id == subject_id)
            .ok_or(AppError::Status(404))
    }

    fn topic_mut(
        &mut self,
        course_id: &str,
        subject_id: &str,
        topic_id: &str,
    ) -> Result<&mut Topic, AppError> {
        self.subject_mut(course_id, subject_id)?
            .topics
            .iter_mut()
            .find(|t| t.id == topic_id)
            .ok_or(AppError::Status(404))
    }
}

/// In-process stand-in for the tracker backend, following the same
/// rules the real one enforces (session required, 404 on unknown ids).
#[derive(Default)]
pub struct MemoryTrackerApi {
    store: RwLock<MemoryStore>,
}

impl MemoryTrackerApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user: User, password: &str) -> Self {
        self.store.get_mut().users.push((user, password.to_string()));
        self
    }

    pub fn with_course(mut self, course: Course) -> Self {
        self.store.get_mut().courses.push(course);
        self
    }

    pub fn with_batch(mut self, batch: Batch) -> Self {
        self.store.get_mut().batches.push(batch);
        self
    }
}

fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn paginate<T: Clone>(items: Vec<T>, query: &ListQuery) -> Page<T> {
    let limit = query.limit.max(1);
    let page = query.page.max(1);
    let pagination = Pagination::new(page, limit, items.len() as u64);
    let start = (page - 1).saturating_mul(limit) as usize;
    let items = items.into_iter().skip(start).take(limit as usize).collect();
    Page {
        items,
        pagination: Some(pagination),
    }
}

fn sort_by_key<T>(items: &mut [T], order: SortOrder, key: impl Fn(&T) -> String) {
    items.sort_by(|a, b| {
        let ord = key(a).to_lowercase().cmp(&key(b).to_lowercase());
        match order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    });
}

/// End of a batch that starts at `start` and runs for `duration`.
fn batch_end(start: DateTime<Utc>, duration: &CourseDuration) -> Result<DateTime<Utc>, AppError> {
    let unit = duration.unit.trim().to_lowercase();
    let value = duration.value;
    let end = match unit.trim_end_matches('s') {
        "day" => TimeDelta::try_days(i64::from(value)).and_then(|d| start.checked_add_signed(d)),
        "week" => TimeDelta::try_weeks(i64::from(value)).and_then(|d| start.checked_add_signed(d)),
        "month" => start.checked_add_months(Months::new(value)),
        "year" => start.checked_add_months(Months::new(value.saturating_mul(12))),
        _ => return Err(AppError::Api(format!("Unknown duration unit: {}", duration.unit))),
    };
    end.ok_or_else(|| AppError::Api("Batch end date out of range".to_string()))
}

#[async_trait]
impl TrackerApi for MemoryTrackerApi {
    async fn login(&self, req: &LoginRequest) -> Result<(), AppError> {
        let mut store = self.store.write().await;
        let id = store
            .users
            .iter()
            .find(|(u, pw)| u.email.eq_ignore_ascii_case(&req.email) && *pw == req.password)
            .map(|(u, _)| u.id.clone())
            .ok_or(AppError::Status(401))?;
        debug!("memory backend signed in {}", id);
        store.signed_in = Some(id);
        Ok(())
    }

    async fn current_user(&self) -> Result<User, AppError> {
        let store = self.store.read().await;
        store.session_user().cloned()
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let store = self.store.read().await;
        store.session_user()?;
        Ok(store.users.iter().map(|(u, _)| u.clone()).collect())
    }

    async fn register_user(&self, req: &RegisterUserRequest) -> Result<User, AppError> {
        let mut store = self.store.write().await;
        store.session_user()?;
        if store.users.iter().any(|(u, _)| u.email.eq_ignore_ascii_case(&req.email)) {
            return Err(AppError::Api("User already exists".to_string()));
        }
        let user = User {
            id: new_id(),
            first_name: req.first_name.clone(),
            last_name: req.last_name.clone(),
            name: None,
            email: req.email.clone(),
            phone_number: req.phone_number.clone(),
            role: req.role,
            faculty_profile: req.faculty_profile.clone(),
        };
        store.users.push((user.clone(), req.password.clone()));
        Ok(user)
    }

    async fn create_course(&self, req: &NewCourseRequest) -> Result<Course, AppError> {
        let mut store = self.store.write().await;
        let author = store.session_user()?.id.clone();
        if store.courses.iter().any(|c| c.code.eq_ignore_ascii_case(&req.course_code)) {
            return Err(AppError::Api("Course code already exists".to_string()));
        }
        let now = Utc::now().to_rfc3339();
        let course = Course {
            id: new_id(),
            title: req.title.clone(),
            description: req.description.clone(),
            code: req.course_code.clone(),
            duration: req.duration.clone(),
            status: req.status,
            created_by: Some(UserRef::Id(author)),
            subjects: Vec::new(),
            created_at: Some(now.clone()),
            updated_at: Some(now),
        };
        store.courses.push(course.clone());
        Ok(course)
    }

    async fn list_courses(&self, query: &ListQuery) -> Result<Page<Course>, AppError> {
        let store = self.store.read().await;
        store.session_user()?;
        let mut courses: Vec<Course> = store
            .courses
            .iter()
            .filter(|c| query.status_filter().is_none_or(|s| c.status.as_str() == s))
            .filter(|c| {
                query
                    .search_term()
                    .is_none_or(|term| contains_ci(&c.title, term) || contains_ci(&c.code, term))
            })
            .cloned()
            .collect();
        match query.sort_by.as_str() {
            "title" => sort_by_key(&mut courses, query.sort_order, |c| c.title.clone()),
            "courseCode" => sort_by_key(&mut courses, query.sort_order, |c| c.code.clone()),
            _ => {
                if query.sort_order == SortOrder::Desc {
                    courses.reverse();
                }
            }
        }
        Ok(paginate(courses, query))
    }

    async fn get_course(&self, course_id: &str) -> Result<Course, AppError> {
        let store = self.store.read().await;
        store.session_user()?;
        store
            .courses
            .iter()
            .find(|c| c.id == course_id)
            .cloned()
            .ok_or(AppError::Status(404))
    }

    async fn update_course(&self, req: &UpdateCourseRequest) -> Result<Course, AppError> {
        let mut store = self.store.write().await;
        store.session_user()?;
        let course = store.course_mut(&req.course_id)?;
        course.title = req.title.clone();
        course.description = req.description.clone();
        course.code = req.course_code.clone();
        course.duration = req.duration.clone();
        course.status = req.status;
        course.updated_at = Some(Utc::now().to_rfc3339());
        Ok(course.clone())
    }

    async fn add_subject(&self, req: &AddSubjectRequest) -> Result<Subject, AppError> {
        let mut store = self.store.write().await;
        store.session_user()?;
        let subject = Subject {
            id: new_id(),
            title: req.title.clone(),
            description: req.description.clone(),
            order: req.order,
            topics: Vec::new(),
        };
        store.course_mut(&req.course_id)?.subjects.push(subject.clone());
        Ok(subject)
    }

    async fn update_subject(&self, req: &UpdateSubjectRequest) -> Result<Subject, AppError> {
        let mut store = self.store.write().await;
        store.session_user()?;
        let subject = store.subject_mut(&req.course_id, &req.subject_id)?;
        subject.title = req.title.clone();
        subject.description = req.description.clone();
        subject.order = req.order;
        Ok(subject.clone())
    }

    async fn add_topic(&self, req: &AddTopicRequest) -> Result<Topic, AppError> {
        let mut store = self.store.write().await;
        store.session_user()?;
        let topic = Topic {
            id: new_id(),
            title: req.title.clone(),
            description: req.description.clone(),
            order: req.order,
            estimated_hours: req.estimated_hours.unwrap_or_default(),
            lectures: Vec::new(),
        };
        store
            .subject_mut(&req.course_id, &req.subject_id)?
            .topics
            .push(topic.clone());
        Ok(topic)
    }

    async fn update_topic(&self, req: &UpdateTopicRequest) -> Result<Topic, AppError> {
        let mut store = self.store.write().await;
        store.session_user()?;
        let topic = store.topic_mut(&req.course_id, &req.subject_id, &req.topic_id)?;
        topic.title = req.title.clone();
        topic.description = req.description.clone();
        topic.order = req.order;
        if let Some(hours) = req.estimated_hours {
            topic.estimated_hours = hours;
        }
        Ok(topic.clone())
    }

    async fn add_lecture(&self, req: &AddLectureRequest) -> Result<Lecture, AppError> {
        let mut store = self.store.write().await;
        store.session_user()?;
        let lecture = Lecture {
            id: new_id(),
            title: req.title.clone(),
            description: req.description.clone(),
            order: req.order,
            duration_minutes: req.duration_minutes.unwrap_or(60),
        };
        store
            .topic_mut(&req.course_id, &req.subject_id, &req.topic_id)?
            .lectures
            .push(lecture.clone());
        Ok(lecture)
    }

    async fn update_lecture(&self, req: &UpdateLectureRequest) -> Result<Lecture, AppError> {
        let mut store = self.store.write().await;
        store.session_user()?;
        let lecture = store
            .topic_mut(&req.course_id, &req.subject_id, &req.topic_id)?
            .lectures
            .iter_mut()
            .find(|l| l.id == req.lecture_id)
            .ok_or(AppError::Status(404))?;
        lecture.title = req.title.clone();
        lecture.description = req.description.clone();
        lecture.order = req.order;
        if let Some(minutes) = req.duration_minutes {
            lecture.duration_minutes = minutes;
        }
        Ok(lecture.clone())
    }

    async fn create_batch(&self, req: &CreateBatchRequest) -> Result<Batch, AppError> {
        let mut store = self.store.write().await;
        store.session_user()?;
        let course = store
            .courses
            .iter()
            .find(|c| c.id == req.course_template_id)
            .ok_or(AppError::Status(404))?;

        let mut subjects = Vec::with_capacity(course.subjects.len());
        for subject in &course.subjects {
            let faculty_id = req
                .faculty_assignments
                .get(&subject.id)
                .filter(|f| !f.is_empty())
                .ok_or_else(|| {
                    AppError::Api(format!("No faculty assigned to subject {}", subject.title))
                })?;
            subjects.push(BatchSubject {
                id: subject.id.clone(),
                title: subject.title.clone(),
                faculty_id: faculty_id.clone(),
                total_lectures: subject.topics.iter().map(|t| t.lectures.len() as u32).sum(),
                topics: Vec::new(),
            });
        }

        let start = parse_timestamp(&req.start_date)?;
        let end = batch_end(start, &course.duration)?;
        let batch = Batch {
            id: new_id(),
            name: req.name.clone(),
            course_template_id: course.id.clone(),
            start_date: start.to_rfc3339(),
            end_date: end.to_rfc3339(),
            status: None,
            subjects,
        };
        store.batches.push(batch.clone());
        Ok(batch)
    }

    async fn list_batches(&self, query: &ListQuery) -> Result<Page<Batch>, AppError> {
        let store = self.store.read().await;
        store.session_user()?;
        let now = Utc::now();
        let mut batches = Vec::new();
        for batch in &store.batches {
            if let Some(wanted) = query.status_filter() {
                let status = classify_batch(&batch.start_date, &batch.end_date, now)?;
                if status.as_str() != wanted {
                    continue;
                }
            }
            if let Some(term) = query.search_term() {
                if !contains_ci(&batch.name, term) {
                    continue;
                }
            }
            batches.push(batch.clone());
        }
        match query.sort_by.as_str() {
            "name" => sort_by_key(&mut batches, query.sort_order, |b| b.name.clone()),
            "startDate" => sort_by_key(&mut batches, query.sort_order, |b| b.start_date.clone()),
            "endDate" => sort_by_key(&mut batches, query.sort_order, |b| b.end_date.clone()),
            _ => {
                if query.sort_order == SortOrder::Desc {
                    batches.reverse();
                }
            }
        }
        Ok(paginate(batches, query))
    }

    async fn faculty_lectures(&self) -> Result<Vec<FacultyLecture>, AppError> {
        let store = self.store.read().await;
        let me = store.session_user()?;
        if !me.is_faculty() {
            return Err(AppError::Status(403));
        }

        let mut pending = Vec::new();
        for batch in &store.batches {
            let Some(course) = store.courses.iter().find(|c| c.id == batch.course_template_id)
            else {
                continue;
            };
            for batch_subject in batch.subjects.iter().filter(|s| s.faculty_id == me.id) {
                let Some(subject) = course.subject(&batch_subject.id) else {
                    continue;
                };
                for topic in &subject.topics {
                    let done: Vec<&str> = batch_subject
                        .topics
                        .iter()
                        .filter(|t| t.id == topic.id)
                        .flat_map(|t| t.lectures.iter().map(|l| l.id.as_str()))
                        .collect();
                    for lecture in topic.lectures.iter().filter(|l| !done.contains(&l.id.as_str())) {
                        pending.push(FacultyLecture {
                            batch_id: batch.id.clone(),
                            batch_name: batch.name.clone(),
                            subject_id: subject.id.clone(),
                            subject_name: subject.title.clone(),
                            topic_id: topic.id.clone(),
                            topic_name: topic.title.clone(),
                            lecture_id: lecture.id.clone(),
                            lecture_title: lecture.title.clone(),
                            lecture_description: Some(lecture.description.clone())
                                .filter(|d| !d.is_empty()),
                            duration_minutes: Some(lecture.duration_minutes),
                        });
                    }
                }
            }
        }
        Ok(pending)
    }

    async fn complete_lecture(&self, req: &CompleteLectureRequest) -> Result<(), AppError> {
        let mut store = self.store.write().await;
        let me = store.session_user()?.id.clone();
        let lecture_title = store
            .batches
            .iter()
            .find(|b| b.id == req.batch_id)
            .and_then(|b| store.courses.iter().find(|c| c.id == b.course_template_id))
            .and_then(|c| c.subject(&req.subject_id))
            .and_then(|s| s.topic(&req.topic_id))
            .and_then(|t| t.lectures.iter().find(|l| l.id == req.lecture_id))
            .map(|l| l.title.clone())
            .ok_or(AppError::Status(404))?;

        let batch = store
            .batches
            .iter_mut()
            .find(|b| b.id == req.batch_id)
            .ok_or(AppError::Status(404))?;
        let subject = batch
            .subjects
            .iter_mut()
            .find(|s| s.id == req.subject_id)
            .ok_or(AppError::Status(404))?;
        if subject.faculty_id != me {
            return Err(AppError::Status(403));
        }

        let position = subject.topics.iter().position(|t| t.id == req.topic_id);
        let topic = match position {
            Some(index) => &mut subject.topics[index],
            None => {
                subject.topics.push(BatchTopic {
                    id: req.topic_id.clone(),
                    title: String::new(),
                    lectures: Vec::new(),
                });
                let last = subject.topics.len() - 1;
                &mut subject.topics[last]
            }
        };
        if topic.lectures.iter().any(|l| l.id == req.lecture_id) {
            return Err(AppError::Api("Lecture already completed".to_string()));
        }
        topic.lectures.push(BatchLecture {
            id: req.lecture_id.clone(),
            title: lecture_title,
            completed_at: Some(Utc::now().to_rfc3339()),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CourseStatus;

    #[test]
    fn batch_end_follows_duration_unit() {
        let start = parse_timestamp("2026-01-31").unwrap();
        let months = CourseDuration { value: 1, unit: "months".into() };
        assert_eq!(batch_end(start, &months).unwrap().to_rfc3339(), "2026-02-28T00:00:00+00:00");

        let weeks = CourseDuration { value: 2, unit: "Weeks".into() };
        assert_eq!(batch_end(start, &weeks).unwrap().to_rfc3339(), "2026-02-14T00:00:00+00:00");

        let bad = CourseDuration { value: 2, unit: "fortnights".into() };
        assert!(batch_end(start, &bad).is_err());

        for unit in ["days", "weeks", "years"] {
            let huge = CourseDuration { value: u32::MAX, unit: unit.into() };
            match batch_end(start, &huge) {
                Err(AppError::Api(message)) => assert_eq!(message, "Batch end date out of range"),
                other => panic!("{unit}: unexpected {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn list_courses_requires_session_and_paginates() {
        let owner = User {
            id: "u1".into(),
            first_name: "Owner".into(),
            last_name: String::new(),
            name: None,
            email: "owner@example.com".into(),
            phone_number: None,
            role: crate::models::Role::Business,
            faculty_profile: None,
        };
        let api = MemoryTrackerApi::new().with_user(owner, "pw");

        let err = api.list_courses(&ListQuery::default()).await.unwrap_err();
        assert!(matches!(err, AppError::Status(401)));

        api.login(&LoginRequest { email: "owner@example.com".into(), password: "pw".into() })
            .await
            .unwrap();
        for i in 0..12 {
            api.create_course(&NewCourseRequest {
                title: format!("Course {:02}", i),
                description: String::new(),
                course_code: format!("C{:02}", i),
                duration: CourseDuration { value: 3, unit: "months".into() },
                status: CourseStatus::Active,
            })
            .await
            .unwrap();
        }

        let first = api.list_courses(&ListQuery::default()).await.unwrap();
        assert_eq!(first.items.len(), 10);
        assert_eq!(first.items[0].title, "Course 11");
        let pagination = first.pagination.unwrap();
        assert_eq!(pagination.total_pages, 2);
        assert!(pagination.has_next_page);

        let second = api
            .list_courses(&ListQuery { page: 2, ..ListQuery::default() })
            .await
            .unwrap();
        assert_eq!(second.items.len(), 2);

        let searched = api
            .list_courses(&ListQuery { search: Some("c03".into()), ..ListQuery::default() })
            .await
            .unwrap();
        assert_eq!(searched.items.len(), 1);
    }
}
