pub mod assignment;
pub mod dashboard;
pub mod listing;
pub mod progress;
pub mod status;

pub use assignment::FacultyAssignments;
pub use dashboard::{BatchCard, BusinessOverview, CourseCard, CourseDetail, DashboardService, ListView};
pub use listing::{ListState, SEARCH_DEBOUNCE};
pub use progress::{BatchProgress, FacultySummary, ProgressBand, percentage};
pub use status::{BatchStatus, classify_batch, days_remaining};
