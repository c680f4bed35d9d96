use serde::{Deserialize, Serialize};

/// A lecture the logged-in faculty member still has to deliver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacultyLecture {
    pub batch_id: String,
    pub batch_name: String,
    pub subject_id: String,
    pub subject_name: String,
    pub topic_id: String,
    pub topic_name: String,
    pub lecture_id: String,
    pub lecture_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lecture_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteLectureRequest {
    pub batch_id: String,
    pub subject_id: String,
    pub topic_id: String,
    pub lecture_id: String,
}

impl From<&FacultyLecture> for CompleteLectureRequest {
    fn from(lecture: &FacultyLecture) -> Self {
        Self {
            batch_id: lecture.batch_id.clone(),
            subject_id: lecture.subject_id.clone(),
            topic_id: lecture.topic_id.clone(),
            lecture_id: lecture.lecture_id.clone(),
        }
    }
}
