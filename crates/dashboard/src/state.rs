//! Shared state for the dashboard router: the log ring, optional Basic
//! auth credentials, and the patrol engine hooks wired in by the
//! supervisor — never package-level globals.

use std::sync::Arc;

use futures::future::BoxFuture;
use hostwatch_logring::LogRing;

pub type Hook = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

#[derive(Clone)]
pub struct AppState {
    pub ring: Arc<LogRing>,
    pub basic_auth: Option<(String, String)>,
    pub on_patrol: Hook,
    pub on_status_report: Hook,
}
