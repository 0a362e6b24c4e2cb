//! Fire-and-forget navigation out of the matching view.

use std::sync::Mutex;

use tracing::{info, warn};

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Route {
    /// Direct conversation with the requester.
    DirectChat { user_id: String },
    /// Default landing view, used when the volunteer prefers to publish an
    /// offer instead.
    Home,
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::DirectChat { user_id } => {
                format!("/direct-chat/{}", urlencoding::encode(user_id))
            }
            Route::Home => "/home".to_string(),
        }
    }
}

pub trait Navigator {
    fn navigate(&self, route: &Route);
}

/// Opens routes in the system browser when a frontend base URL is known;
/// otherwise only reports them.
#[derive(Debug, Clone, Default)]
pub struct BrowserNavigator {
    frontend_url: Option<String>,
}

impl BrowserNavigator {
    pub fn new(frontend_url: Option<String>) -> Self {
        Self {
            frontend_url: frontend_url
                .map(|url| url.trim().trim_end_matches('/').to_string())
                .filter(|url| !url.is_empty()),
        }
    }

    pub fn url_for(&self, route: &Route) -> Option<String> {
        self.frontend_url
            .as_ref()
            .map(|base| format!("{base}{}", route.path()))
    }
}

impl Navigator for BrowserNavigator {
    fn navigate(&self, route: &Route) {
        let Some(url) = self.url_for(route) else {
            info!(route = %route.path(), "navigation requested without frontend url");
            println!("→ {}", route.path());
            return;
        };

        info!(url = %url, "opening route in browser");
        if let Err(err) = open::that(&url) {
            warn!(url = %url, error = %err, "failed to open browser");
            println!("→ {url}");
        }
    }
}

/// Keeps every requested route; useful when embedding the engine.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    routes: Mutex<Vec<Route>>,
}

impl RecordingNavigator {
    pub fn routes(&self) -> Vec<Route> {
        match self.routes.lock() {
            Ok(routes) => routes.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: &Route) {
        match self.routes.lock() {
            Ok(mut routes) => routes.push(route.clone()),
            Err(poisoned) => poisoned.into_inner().push(route.clone()),
        }
    }
}
