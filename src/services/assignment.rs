use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::error::AppError;
use crate::models::{Course, CreateBatchRequest};

/// Subject-to-faculty choices for a batch about to be created from a
/// course template. A new course means a new builder.
#[derive(Debug, Clone)]
pub struct FacultyAssignments {
    course_id: String,
    subject_ids: Vec<String>,
    assignments: BTreeMap<String, String>,
}

impl FacultyAssignments {
    pub fn for_course(course: &Course) -> Self {
        Self {
            course_id: course.id.clone(),
            subject_ids: course.subjects.iter().map(|s| s.id.clone()).collect(),
            assignments: BTreeMap::new(),
        }
    }

    /// An empty faculty id clears the subject's assignment.
    pub fn assign(&mut self, subject_id: &str, faculty_id: &str) -> Result<(), AppError> {
        if !self.subject_ids.iter().any(|s| s == subject_id) {
            return Err(AppError::BadRequest(format!(
                "Subject {} is not part of course {}",
                subject_id, self.course_id
            )));
        }
        let faculty_id = faculty_id.trim();
        if faculty_id.is_empty() {
            self.assignments.remove(subject_id);
        } else {
            self.assignments
                .insert(subject_id.to_string(), faculty_id.to_string());
        }
        Ok(())
    }

    pub fn faculty_for(&self, subject_id: &str) -> Option<&str> {
        self.assignments.get(subject_id).map(String::as_str)
    }

    pub fn unassigned(&self) -> Vec<String> {
        self.subject_ids
            .iter()
            .filter(|id| !self.assignments.contains_key(id.as_str()))
            .cloned()
            .collect()
    }

    /// Submission is allowed only once every subject has a faculty member.
    pub fn is_complete(&self) -> bool {
        self.assignments.len() == self.subject_ids.len() && self.unassigned().is_empty()
    }

    pub fn into_request(
        self,
        name: &str,
        start_date: DateTime<Utc>,
    ) -> Result<CreateBatchRequest, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::BadRequest("Batch name is required".to_string()));
        }
        let missing = self.unassigned();
        if !missing.is_empty() {
            return Err(AppError::IncompleteAssignment { missing });
        }
        Ok(CreateBatchRequest {
            name: name.to_string(),
            course_template_id: self.course_id,
            start_date: start_date.to_rfc3339(),
            faculty_assignments: self.assignments,
        })
    }
}
