/// External link dispatch.
///
/// Web links go to a fresh browsing context with no opener. Any other scheme
/// (typically a custom protocol handing off to another installed application)
/// navigates the current page instead, since a new window would be left blank.
/// That navigation runs inside an expected unload so the unsaved-work prompt
/// stays quiet.
use crate::config::ExternalConfig;
use crate::host::{LifecycleService, PageWindow};
use crate::opener::{matches_scheme, ExternalOpener, OpenerService};
use async_trait::async_trait;
use std::sync::Arc;

/// How an external open request was carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Opened in a new browsing context without an opener reference.
    NewContext,
    /// Current page navigated under an expected unload.
    InPlace,
}

pub struct ExternalLinkDispatcher {
    lifecycle: Arc<dyn LifecycleService>,
    page: Arc<dyn PageWindow>,
    new_context_schemes: Vec<String>,
}

impl ExternalLinkDispatcher {
    /// Build the dispatcher and install it as the opener service's only
    /// external opener, displacing whatever was registered before.
    pub fn register(
        opener: &OpenerService,
        lifecycle: Arc<dyn LifecycleService>,
        page: Arc<dyn PageWindow>,
        config: &ExternalConfig,
    ) -> Arc<Self> {
        let dispatcher = Arc::new(Self {
            lifecycle,
            page,
            new_context_schemes: config.new_context_schemes.clone(),
        });
        if opener.set_external_opener(dispatcher.clone()).is_some() {
            tracing::debug!("external link dispatcher displaced an earlier opener");
        }
        dispatcher
    }

    /// Pick the route for `href` from its scheme alone.
    pub fn route_for(&self, href: &str) -> Route {
        if self
            .new_context_schemes
            .iter()
            .any(|scheme| matches_scheme(href, scheme))
        {
            Route::NewContext
        } else {
            Route::InPlace
        }
    }

    /// Carry out `href` and report the route taken.
    pub fn dispatch(&self, href: &str) -> Route {
        let route = self.route_for(href);
        match route {
            Route::NewContext => {
                tracing::info!(href, "opening external link in new context");
                self.page.open_no_opener(href);
            }
            Route::InPlace => {
                tracing::info!(href, "navigating to external link under expected unload");
                self.lifecycle
                    .with_expected_unload(&mut || self.page.set_location(href));
            }
        }
        route
    }
}

#[async_trait]
impl ExternalOpener for ExternalLinkDispatcher {
    async fn open_external(&self, href: &str) -> bool {
        self.dispatch(href);
        true
    }
}
