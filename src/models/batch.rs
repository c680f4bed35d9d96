use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A cohort running a course template. Lectures nested under
/// `subjects[].topics[].lectures` are the ones already delivered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub course_template_id: String,
    pub start_date: String,
    pub end_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub subjects: Vec<BatchSubject>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSubject {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub faculty_id: String,
    #[serde(default)]
    pub total_lectures: u32,
    #[serde(default)]
    pub topics: Vec<BatchTopic>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchTopic {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub lectures: Vec<BatchLecture>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchLecture {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBatchRequest {
    pub name: String,
    pub course_template_id: String,
    pub start_date: String,
    /// subject id -> faculty id
    pub faculty_assignments: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn batch_decodes_with_nested_completed_lectures() {
        let raw = json!({
            "_id": "b1",
            "name": "Morning Cohort",
            "courseTemplateId": "c1",
            "startDate": "2026-01-05T00:00:00.000Z",
            "endDate": "2026-06-30T00:00:00.000Z",
            "subjects": [{
                "_id": "s1",
                "title": "Trees",
                "facultyId": "f1",
                "totalLectures": 10,
                "topics": [{ "_id": "t1", "title": "BST", "lectures": [{ "_id": "l1" }, { "_id": "l2" }] }]
            }]
        });

        let batch: Batch = serde_json::from_value(raw).unwrap();
        assert_eq!(batch.course_template_id, "c1");
        assert_eq!(batch.subjects[0].total_lectures, 10);
        assert_eq!(batch.subjects[0].topics[0].lectures.len(), 2);
        assert!(batch.status.is_none());
    }
}
