use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::client::{ListQuery, SortOrder};
use crate::models::{Batch, FacultyLecture, User};

/// Quiet period after a search/filter edit before the list is re-queried.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

const PAGE_WINDOW: u32 = 5;

/// State behind one paginated list screen.
#[derive(Debug, Clone, Default)]
pub struct ListState {
    query: ListQuery,
    pending_since: Option<Instant>,
}

impl ListState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(&self) -> &ListQuery {
        &self.query
    }

    pub fn set_search(&mut self, term: &str, now: Instant) {
        self.query.search = Some(term.to_string()).filter(|t| !t.trim().is_empty());
        self.pending_since = Some(now);
    }

    pub fn set_status(&mut self, status: &str, now: Instant) {
        self.query.status = Some(status.to_string()).filter(|s| !s.trim().is_empty());
        self.pending_since = Some(now);
    }

    pub fn set_page(&mut self, page: u32) {
        self.query.page = page.max(1);
    }

    /// Same field flips the order, a new field starts descending.
    pub fn toggle_sort(&mut self, field: &str) {
        if self.query.sort_by == field {
            self.query.sort_order = self.query.sort_order.flipped();
        } else {
            self.query.sort_by = field.to_string();
            self.query.sort_order = SortOrder::Desc;
        }
    }

    pub fn is_settled(&self) -> bool {
        self.pending_since.is_none()
    }

    /// Returns the query to run once the debounce window has passed since
    /// the last edit. Every edit restarts the window and the page goes back
    /// to 1 when it fires.
    pub fn poll(&mut self, now: Instant) -> Option<ListQuery> {
        let since = self.pending_since?;
        if now.saturating_duration_since(since) < SEARCH_DEBOUNCE {
            return None;
        }
        self.pending_since = None;
        self.query.page = 1;
        Some(self.query.clone())
    }
}

/// Up to five page numbers centred on `current` where possible.
pub fn page_window(current: u32, total_pages: u32) -> Vec<u32> {
    if total_pages <= PAGE_WINDOW {
        return (1..=total_pages).collect();
    }
    let first = if current <= 3 {
        1
    } else if current >= total_pages - 2 {
        total_pages - PAGE_WINDOW + 1
    } else {
        current - 2
    };
    (first..first + PAGE_WINDOW).collect()
}

/// 1-based "showing X to Y of Z" bounds, `None` for an empty list.
pub fn showing_range(page: u32, limit: u32, total_items: u64) -> Option<(u64, u64)> {
    if total_items == 0 {
        return None;
    }
    let page = u64::from(page.max(1));
    let limit = u64::from(limit.max(1));
    let from = ((page - 1) * limit + 1).min(total_items);
    let to = (page * limit).min(total_items);
    Some((from, to))
}

fn contains_term(field: &str, needle: &str) -> bool {
    field.to_lowercase().contains(needle)
}

pub fn filter_batches<'a>(batches: &'a [Batch], term: &str) -> Vec<&'a Batch> {
    let needle = term.trim().to_lowercase();
    batches
        .iter()
        .filter(|b| {
            needle.is_empty()
                || contains_term(&b.name, &needle)
                || b.subjects.iter().any(|s| contains_term(&s.title, &needle))
        })
        .collect()
}

pub fn filter_faculty<'a>(users: &'a [User], term: &str) -> Vec<&'a User> {
    let needle = term.trim().to_lowercase();
    users
        .iter()
        .filter(|u| u.is_faculty())
        .filter(|u| {
            needle.is_empty() || contains_term(&u.display_name(), &needle) || contains_term(&u.email, &needle)
        })
        .collect()
}

pub fn filter_faculty_lectures<'a>(
    lectures: &'a [FacultyLecture],
    term: &str,
) -> Vec<&'a FacultyLecture> {
    let needle = term.trim().to_lowercase();
    lectures
        .iter()
        .filter(|l| {
            needle.is_empty()
                || contains_term(&l.lecture_title, &needle)
                || contains_term(&l.subject_name, &needle)
                || contains_term(&l.batch_name, &needle)
                || contains_term(&l.topic_name, &needle)
        })
        .collect()
}

pub fn group_by_batch<'a, I>(lectures: I) -> BTreeMap<String, Vec<FacultyLecture>>
where
    I: IntoIterator<Item = &'a FacultyLecture>,
{
    let mut groups: BTreeMap<String, Vec<FacultyLecture>> = BTreeMap::new();
    for lecture in lectures {
        groups
            .entry(lecture.batch_name.clone())
            .or_default()
            .push(lecture.clone());
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BatchSubject, Role};

    #[test]
    fn debounce_waits_for_quiet_period_and_resets_page() {
        let t0 = Instant::now();
        let mut state = ListState::new();
        state.set_page(4);

        state.set_search("alg", t0);
        assert!(state.poll(t0 + Duration::from_millis(100)).is_none());

        state.set_search("algebra", t0 + Duration::from_millis(200));
        assert!(state.poll(t0 + Duration::from_millis(400)).is_none());
        assert_eq!(state.query().page, 4);

        let query = state.poll(t0 + Duration::from_millis(500)).unwrap();
        assert_eq!(query.page, 1);
        assert_eq!(query.search.as_deref(), Some("algebra"));
        assert!(state.is_settled());
        assert!(state.poll(t0 + Duration::from_secs(5)).is_none());
    }

    #[test]
    fn status_filter_also_debounces() {
        let t0 = Instant::now();
        let mut state = ListState::new();
        state.set_status("expiring", t0);
        assert!(!state.is_settled());
        let query = state.poll(t0 + SEARCH_DEBOUNCE).unwrap();
        assert_eq!(query.status.as_deref(), Some("expiring"));

        state.set_status("", t0);
        assert_eq!(state.query().status, None);
    }

    #[test]
    fn sort_toggle() {
        let mut state = ListState::new();
        assert_eq!(state.query().sort_by, "createdAt");
        assert_eq!(state.query().sort_order, SortOrder::Desc);

        state.toggle_sort("createdAt");
        assert_eq!(state.query().sort_order, SortOrder::Asc);

        state.toggle_sort("name");
        assert_eq!(state.query().sort_by, "name");
        assert_eq!(state.query().sort_order, SortOrder::Desc);
    }

    #[test]
    fn page_window_positions() {
        assert_eq!(page_window(1, 3), vec![1, 2, 3]);
        assert_eq!(page_window(2, 10), vec![1, 2, 3, 4, 5]);
        assert_eq!(page_window(6, 10), vec![4, 5, 6, 7, 8]);
        assert_eq!(page_window(9, 10), vec![6, 7, 8, 9, 10]);
        assert!(page_window(1, 0).is_empty());
    }

    #[test]
    fn showing_range_clamps() {
        assert_eq!(showing_range(1, 10, 0), None);
        assert_eq!(showing_range(1, 10, 25), Some((1, 10)));
        assert_eq!(showing_range(3, 10, 25), Some((21, 25)));
        assert_eq!(showing_range(9, 10, 25), Some((25, 25)));
    }

    #[test]
    fn batch_filter_matches_name_or_subject() {
        let batch = |name: &str, subject: &str| Batch {
            id: name.to_string(),
            name: name.to_string(),
            course_template_id: "c1".into(),
            start_date: "2026-01-01".into(),
            end_date: "2026-02-01".into(),
            status: None,
            subjects: vec![BatchSubject {
                id: "s".into(),
                title: subject.to_string(),
                faculty_id: "f".into(),
                total_lectures: 1,
                topics: Vec::new(),
            }],
        };
        let batches = vec![batch("Morning", "Algebra"), batch("Evening", "Physics")];
        assert_eq!(filter_batches(&batches, "ALG").len(), 1);
        assert_eq!(filter_batches(&batches, "even")[0].name, "Evening");
        assert_eq!(filter_batches(&batches, "").len(), 2);
    }

    #[test]
    fn faculty_filter_skips_business_users() {
        let user = |id: &str, role| User {
            id: id.to_string(),
            first_name: "Sam".into(),
            last_name: id.to_string(),
            name: None,
            email: format!("{id}@example.com"),
            phone_number: None,
            role,
            faculty_profile: None,
        };
        let users = vec![user("owner", Role::Business), user("lee", Role::Faculty)];
        assert_eq!(filter_faculty(&users, "sam").len(), 1);
        assert_eq!(filter_faculty(&users, "lee@").len(), 1);
        assert!(filter_faculty(&users, "owner").is_empty());
    }

    #[test]
    fn lectures_filter_and_group() {
        let lecture = |batch: &str, title: &str| FacultyLecture {
            batch_id: batch.to_lowercase(),
            batch_name: batch.to_string(),
            subject_id: "s".into(),
            subject_name: "Graphs".into(),
            topic_id: "t".into(),
            topic_name: "Traversal".into(),
            lecture_id: title.to_lowercase(),
            lecture_title: title.to_string(),
            lecture_description: None,
            duration_minutes: None,
        };
        let lectures = vec![
            lecture("B", "DFS"),
            lecture("A", "BFS"),
            lecture("B", "Dijkstra"),
        ];
        assert_eq!(filter_faculty_lectures(&lectures, "traversal").len(), 3);
        assert_eq!(filter_faculty_lectures(&lectures, "dfs").len(), 1);

        let groups = group_by_batch(filter_faculty_lectures(&lectures, ""));
        assert_eq!(groups.keys().collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(groups["B"].len(), 2);
    }
}
