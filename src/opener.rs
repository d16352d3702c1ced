/// Opener service: the front door for "open this external resource" requests.
///
/// Holds a single external-opener slot. Whoever registers last owns every
/// external open; there is no chaining to a previous opener.
use async_trait::async_trait;
use std::sync::{Arc, PoisonError, RwLock};

/// Handler for external open requests.
#[async_trait]
pub trait ExternalOpener: Send + Sync {
    /// Accept a request to open `href`. The result means "request accepted",
    /// not "resource opened".
    async fn open_external(&self, href: &str) -> bool;
}

/// Case-insensitive check that `href` starts with `{scheme}:`.
pub fn matches_scheme(href: &str, scheme: &str) -> bool {
    let href = href.as_bytes();
    let scheme = scheme.as_bytes();
    href.len() > scheme.len()
        && href[scheme.len()] == b':'
        && href[..scheme.len()].eq_ignore_ascii_case(scheme)
}

#[derive(Default)]
pub struct OpenerService {
    external: RwLock<Option<Arc<dyn ExternalOpener>>>,
}

impl OpenerService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `opener` as the sole external opener.
    ///
    /// Any previous opener is displaced and returned so a composition root can
    /// assert it was the only owner. Replacement is otherwise silent.
    pub fn set_external_opener(
        &self,
        opener: Arc<dyn ExternalOpener>,
    ) -> Option<Arc<dyn ExternalOpener>> {
        let mut slot = self
            .external
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let previous = slot.replace(opener);
        if previous.is_some() {
            tracing::debug!("external opener replaced");
        }
        previous
    }

    #[cfg(test)]
    pub fn has_external_opener(&self) -> bool {
        self.external
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Route `href` to the registered external opener.
    ///
    /// Returns `false` only when nothing is registered.
    pub async fn open_external(&self, href: &str) -> bool {
        let opener = self
            .external
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match opener {
            Some(opener) => opener.open_external(href).await,
            None => {
                tracing::warn!(href, "no external opener registered, dropping request");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ExternalOpener for Recorder {
        async fn open_external(&self, href: &str) -> bool {
            self.seen.lock().unwrap().push(href.to_string());
            true
        }
    }

    #[test]
    fn test_matches_scheme_case_insensitive() {
        assert!(matches_scheme("https://example.com", "https"));
        assert!(matches_scheme("HTTPS://example.com", "https"));
        assert!(matches_scheme("Http:whatever", "http"));
    }

    #[test]
    fn test_matches_scheme_requires_colon_after_scheme() {
        assert!(!matches_scheme("https://example.com", "http"));
        assert!(!matches_scheme("httpx://example.com", "http"));
        assert!(!matches_scheme("http", "http"));
        assert!(!matches_scheme("", "http"));
    }

    #[test]
    fn test_matches_scheme_non_ascii_input() {
        assert!(!matches_scheme("héllo://x", "http"));
        assert!(!matches_scheme("ü", "http"));
    }

    #[tokio::test]
    async fn test_open_without_opener_returns_false() {
        let service = OpenerService::new();
        assert!(!service.has_external_opener());
        assert!(!service.open_external("https://example.com").await);
    }

    #[tokio::test]
    async fn test_second_registration_replaces_first() {
        let service = OpenerService::new();
        let first = Arc::new(Recorder::default());
        let second = Arc::new(Recorder::default());

        assert!(service.set_external_opener(first.clone()).is_none());
        assert!(service.open_external("https://one.example").await);

        let displaced = service.set_external_opener(second.clone());
        assert!(displaced.is_some());
        assert!(service.open_external("https://two.example").await);

        assert_eq!(*first.seen.lock().unwrap(), vec!["https://one.example"]);
        assert_eq!(*second.seen.lock().unwrap(), vec!["https://two.example"]);
    }
}
