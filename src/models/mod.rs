pub mod batch;
pub mod course;
pub mod envelope;
pub mod lecture;
pub mod user;

pub use batch::{Batch, BatchLecture, BatchSubject, BatchTopic, CreateBatchRequest};
pub use course::{
    AddLectureRequest, AddSubjectRequest, AddTopicRequest, Course, CourseDuration, CourseStatus,
    Lecture, NewCourseRequest, Subject, Topic, UpdateCourseRequest, UpdateLectureRequest,
    UpdateSubjectRequest, UpdateTopicRequest, UserRef,
};
pub use envelope::{ApiResponse, Pagination};
pub use lecture::{CompleteLectureRequest, FacultyLecture};
pub use user::{FacultyProfile, LoginRequest, RegisterUserRequest, Role, User};
