use std::{fmt, sync::Mutex};

use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// The signed-in user's own profile page.
    OwnProfile,
    Dashboard,
}

impl Route {
    pub fn path(self) -> &'static str {
        match self {
            Self::OwnProfile => "/profile",
            Self::Dashboard => "/dashboard",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

pub trait Navigator: Send + Sync {
    fn push(&self, route: Route);
}

/// Navigator that only remembers where it was sent.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    pushed: Mutex<Vec<Route>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn routes(&self) -> Vec<Route> {
        self.pushed
            .lock()
            .map(|routes| routes.clone())
            .unwrap_or_default()
    }

    pub fn last(&self) -> Option<Route> {
        self.routes().last().copied()
    }
}

impl Navigator for RecordingNavigator {
    fn push(&self, route: Route) {
        info!(route = %route, "navigating");
        if let Ok(mut routes) = self.pushed.lock() {
            routes.push(route);
        }
    }
}
