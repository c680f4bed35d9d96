pub mod dto;
pub mod memory;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::TrackerConfig;
use crate::error::AppError;
use crate::models::{
    AddLectureRequest, AddSubjectRequest, AddTopicRequest, ApiResponse, Batch,
    CompleteLectureRequest, Course, CreateBatchRequest, FacultyLecture, Lecture, LoginRequest,
    NewCourseRequest, RegisterUserRequest, Subject, Topic, UpdateCourseRequest,
    UpdateLectureRequest, UpdateSubjectRequest, UpdateTopicRequest, User,
};

pub use dto::{ListQuery, Page, SortOrder};
pub use memory::MemoryTrackerApi;

/// Everything the dashboards need from the tracker backend.
#[async_trait]
pub trait TrackerApi: Send + Sync {
    async fn login(&self, req: &LoginRequest) -> Result<(), AppError>;
    async fn current_user(&self) -> Result<User, AppError>;
    async fn list_users(&self) -> Result<Vec<User>, AppError>;
    async fn register_user(&self, req: &RegisterUserRequest) -> Result<User, AppError>;

    async fn create_course(&self, req: &NewCourseRequest) -> Result<Course, AppError>;
    async fn list_courses(&self, query: &ListQuery) -> Result<Page<Course>, AppError>;
    async fn get_course(&self, course_id: &str) -> Result<Course, AppError>;
    async fn update_course(&self, req: &UpdateCourseRequest) -> Result<Course, AppError>;
    async fn add_subject(&self, req: &AddSubjectRequest) -> Result<Subject, AppError>;
    async fn update_subject(&self, req: &UpdateSubjectRequest) -> Result<Subject, AppError>;
    async fn add_topic(&self, req: &AddTopicRequest) -> Result<Topic, AppError>;
    async fn update_topic(&self, req: &UpdateTopicRequest) -> Result<Topic, AppError>;
    async fn add_lecture(&self, req: &AddLectureRequest) -> Result<Lecture, AppError>;
    async fn update_lecture(&self, req: &UpdateLectureRequest) -> Result<Lecture, AppError>;

    async fn create_batch(&self, req: &CreateBatchRequest) -> Result<Batch, AppError>;
    async fn list_batches(&self, query: &ListQuery) -> Result<Page<Batch>, AppError>;
    async fn faculty_lectures(&self) -> Result<Vec<FacultyLecture>, AppError>;
    async fn complete_lecture(&self, req: &CompleteLectureRequest) -> Result<(), AppError>;
}

/// reqwest-backed client. The auth token only lives in the cookie jar,
/// where the backend's `Set-Cookie` on login puts it.
pub struct HttpTrackerApi {
    client: Client,
    base_url: String,
}

impl HttpTrackerApi {
    pub fn new(config: &TrackerConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build http client: {}", e)))?;
        Ok(Self {
            client,
            base_url: config.backend_url.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Sends the request and decodes the body. Non-2xx keeps only the status.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, AppError> {
        let response = request.send().await?;
        let status = response.status();
        debug!("backend responded {} for {}", status, response.url().path());

        if !status.is_success() {
            warn!("backend request to {} failed with {}", response.url().path(), status);
            return Err(AppError::Status(status.as_u16()));
        }

        let body_text = response.text().await?;
        serde_json::from_str::<T>(&body_text).map_err(|e| {
            tracing::error!("Failed to parse backend response: {}", e);
            AppError::Decode(e)
        })
    }

    async fn data<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, AppError> {
        self.envelope(request).await.map(|env| env.data)
    }

    async fn envelope<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<ApiResponse<T>, AppError> {
        let envelope: ApiResponse<T> = self.send(request).await?;
        if !envelope.success {
            return Err(AppError::Api(envelope.message));
        }
        Ok(envelope)
    }

    async fn ack(&self, request: RequestBuilder) -> Result<(), AppError> {
        let ack: dto::Ack = self.send(request).await?;
        if !ack.success {
            return Err(AppError::Api(ack.message));
        }
        Ok(())
    }

    async fn page<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &ListQuery,
    ) -> Result<Page<T>, AppError> {
        let envelope: ApiResponse<Vec<T>> =
            self.envelope(self.client.get(self.url(path)).query(query)).await?;
        Ok(Page {
            items: envelope.data,
            pagination: envelope.pagination,
        })
    }
}

#[async_trait]
impl TrackerApi for HttpTrackerApi {
    async fn login(&self, req: &LoginRequest) -> Result<(), AppError> {
        self.ack(self.client.post(self.url("/user/login")).json(req)).await
    }

    async fn current_user(&self) -> Result<User, AppError> {
        self.data(self.client.get(self.url("/user"))).await
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        self.data(self.client.get(self.url("/user/list"))).await
    }

    async fn register_user(&self, req: &RegisterUserRequest) -> Result<User, AppError> {
        self.data(self.client.post(self.url("/user/register")).json(req)).await
    }

    async fn create_course(&self, req: &NewCourseRequest) -> Result<Course, AppError> {
        self.data(self.client.post(self.url("/course/create")).json(req)).await
    }

    async fn list_courses(&self, query: &ListQuery) -> Result<Page<Course>, AppError> {
        self.page("/course/list", query).await
    }

    async fn get_course(&self, course_id: &str) -> Result<Course, AppError> {
        self.data(self.client.get(self.url(&format!("/course/{}", course_id)))).await
    }

    async fn update_course(&self, req: &UpdateCourseRequest) -> Result<Course, AppError> {
        self.data(self.client.put(self.url("/course/update")).json(req)).await
    }

    async fn add_subject(&self, req: &AddSubjectRequest) -> Result<Subject, AppError> {
        self.data(self.client.post(self.url("/course/add-subject")).json(req)).await
    }

    async fn update_subject(&self, req: &UpdateSubjectRequest) -> Result<Subject, AppError> {
        self.data(self.client.put(self.url("/course/update/subject")).json(req)).await
    }

    async fn add_topic(&self, req: &AddTopicRequest) -> Result<Topic, AppError> {
        self.data(self.client.post(self.url("/course/add-topic")).json(req)).await
    }

    async fn update_topic(&self, req: &UpdateTopicRequest) -> Result<Topic, AppError> {
        self.data(self.client.put(self.url("/course/update/topic")).json(req)).await
    }

    async fn add_lecture(&self, req: &AddLectureRequest) -> Result<Lecture, AppError> {
        self.data(self.client.post(self.url("/course/add-lecture")).json(req)).await
    }

    async fn update_lecture(&self, req: &UpdateLectureRequest) -> Result<Lecture, AppError> {
        self.data(self.client.put(self.url("/course/update/lecture")).json(req)).await
    }

    async fn create_batch(&self, req: &CreateBatchRequest) -> Result<Batch, AppError> {
        self.data(self.client.post(self.url("/batch/create")).json(req)).await
    }

    async fn list_batches(&self, query: &ListQuery) -> Result<Page<Batch>, AppError> {
        self.page("/batch/list", query).await
    }

    async fn faculty_lectures(&self) -> Result<Vec<FacultyLecture>, AppError> {
        self.data(self.client.get(self.url("/batch/faculty/lectures"))).await
    }

    async fn complete_lecture(&self, req: &CompleteLectureRequest) -> Result<(), AppError> {
        self.ack(self.client.post(self.url("/batch/lecture/complete")).json(req)).await
    }
}
