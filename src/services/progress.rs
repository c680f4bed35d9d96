use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::models::{Batch, BatchSubject, Course, User};

/// Integer percentage of `completed` over `total`, half rounding up.
/// Always within 0..=100; zero when there is nothing to complete.
pub fn percentage(completed: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let completed = u64::from(completed.min(total));
    let total = u64::from(total);
    ((200 * completed + total) / (2 * total)) as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressBand {
    High,
    Medium,
    Low,
}

impl ProgressBand {
    pub fn for_percentage(percent: u32) -> Self {
        if percent >= 80 {
            ProgressBand::High
        } else if percent >= 60 {
            ProgressBand::Medium
        } else {
            ProgressBand::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseCounts {
    pub subjects: usize,
    pub topics: usize,
    pub lectures: usize,
    pub estimated_hours: f64,
}

pub fn course_topic_count(course: &Course) -> usize {
    course.subjects.iter().map(|s| s.topics.len()).sum()
}

pub fn course_lecture_count(course: &Course) -> usize {
    course
        .subjects
        .iter()
        .flat_map(|s| s.topics.iter())
        .map(|t| t.lectures.len())
        .sum()
}

pub fn course_counts(course: &Course) -> CourseCounts {
    CourseCounts {
        subjects: course.subjects.len(),
        topics: course_topic_count(course),
        lectures: course_lecture_count(course),
        estimated_hours: course
            .subjects
            .iter()
            .flat_map(|s| s.topics.iter())
            .map(|t| t.estimated_hours)
            .sum(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectProgress {
    pub subject_id: String,
    pub title: String,
    pub faculty_id: String,
    pub total_lectures: u32,
    pub completed_lectures: u32,
    pub remaining_lectures: u32,
    pub percent: u32,
}

/// Completed lectures are the entries nested under the subject in the
/// batch; the total comes from the template's `totalLectures`.
pub fn completed_lectures(subject: &BatchSubject) -> u32 {
    subject.topics.iter().map(|t| t.lectures.len() as u32).sum()
}

pub fn subject_progress(subject: &BatchSubject) -> SubjectProgress {
    let total = subject.total_lectures;
    let completed = completed_lectures(subject);
    SubjectProgress {
        subject_id: subject.id.clone(),
        title: subject.title.clone(),
        faculty_id: subject.faculty_id.clone(),
        total_lectures: total,
        completed_lectures: completed,
        remaining_lectures: total - completed.min(total),
        percent: percentage(completed, total),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchProgress {
    pub total_lectures: u32,
    pub completed_lectures: u32,
    pub percent: u32,
    pub subjects: Vec<SubjectProgress>,
}

pub fn batch_progress(batch: &Batch) -> BatchProgress {
    let subjects: Vec<SubjectProgress> = batch.subjects.iter().map(subject_progress).collect();
    let total = subjects.iter().map(|s| s.total_lectures).sum();
    let completed = subjects
        .iter()
        .map(|s| s.completed_lectures.min(s.total_lectures))
        .sum();
    BatchProgress {
        total_lectures: total,
        completed_lectures: completed,
        percent: percentage(completed, total),
        subjects,
    }
}

/// Completion across every subject of every batch.
pub fn overall_percentage(batches: &[Batch]) -> u32 {
    let (completed, total) = batches
        .iter()
        .flat_map(|b| b.subjects.iter())
        .fold((0u32, 0u32), |(done, all), s| {
            (
                done + completed_lectures(s).min(s.total_lectures),
                all + s.total_lectures,
            )
        });
    percentage(completed, total)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacultySummary {
    pub batches: usize,
    pub subjects: usize,
    pub lectures_given: u32,
    pub lectures_assigned: u32,
    pub average_completion: u32,
}

/// Teaching summary for one faculty member over the given batches.
pub fn faculty_summary(faculty_id: &str, batches: &[Batch]) -> FacultySummary {
    let mut batch_ids = BTreeSet::new();
    let mut percents = Vec::new();
    let mut given = 0;
    let mut assigned = 0;

    for batch in batches {
        for subject in batch.subjects.iter().filter(|s| s.faculty_id == faculty_id) {
            let progress = subject_progress(subject);
            batch_ids.insert(batch.id.as_str());
            given += progress.completed_lectures.min(progress.total_lectures);
            assigned += progress.total_lectures;
            percents.push(progress.percent);
        }
    }

    let average_completion = if percents.is_empty() {
        0
    } else {
        let sum: u32 = percents.iter().sum();
        let n = percents.len() as u32;
        (2 * sum + n) / (2 * n)
    };

    FacultySummary {
        batches: batch_ids.len(),
        subjects: percents.len(),
        lectures_given: given,
        lectures_assigned: assigned,
        average_completion,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentRow {
    pub batch_id: String,
    pub batch_name: String,
    pub subject_id: String,
    pub subject: String,
    pub faculty_id: String,
    pub faculty_name: String,
    pub total_lectures: u32,
    pub completed_lectures: u32,
    pub remaining_lectures: u32,
    pub percent: u32,
    pub band: ProgressBand,
}

/// One row per batch subject, faculty resolved to a display name when known.
pub fn assignment_rows(batches: &[Batch], users: &[User]) -> Vec<AssignmentRow> {
    let names: HashMap<&str, String> = users
        .iter()
        .map(|u| (u.id.as_str(), u.display_name()))
        .collect();

    batches
        .iter()
        .flat_map(|batch| {
            let names = &names;
            batch.subjects.iter().map(move |subject| {
                let progress = subject_progress(subject);
                AssignmentRow {
                    batch_id: batch.id.clone(),
                    batch_name: batch.name.clone(),
                    subject_id: subject.id.clone(),
                    subject: subject.title.clone(),
                    faculty_id: subject.faculty_id.clone(),
                    faculty_name: names
                        .get(subject.faculty_id.as_str())
                        .cloned()
                        .unwrap_or_else(|| subject.faculty_id.clone()),
                    total_lectures: progress.total_lectures,
                    completed_lectures: progress.completed_lectures,
                    remaining_lectures: progress.remaining_lectures,
                    percent: progress.percent,
                    band: ProgressBand::for_percentage(progress.percent),
                }
            })
        })
        .collect()
}
