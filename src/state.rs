use std::sync::Arc;

use crate::client::TrackerApi;
use crate::services::DashboardService;
use crate::session::Session;

/// State for a single-user local dashboard. There is one `Session` and one
/// backend cookie jar per process, so a later login replaces the identity
/// for every caller.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<Session>,
    pub dashboard: Arc<DashboardService>,
}

impl AppState {
    /// Session and dashboard share one client so the backend cookie set at
    /// login is sent with every later call.
    pub fn new(api: Arc<dyn TrackerApi>) -> Self {
        Self {
            session: Arc::new(Session::new(api.clone())),
            dashboard: Arc::new(DashboardService::new(api)),
        }
    }
}
