//! Auth-refresh coordination.
//!
//! The executor asks the caller for a new credential through [`AuthRefresher`]
//! and resumes with it. [`RefreshCoordinator`] caps successful refreshes per
//! logical call so a credential that is still rejected after a refresh ends
//! the call instead of looping.

use async_trait::async_trait;

use crate::classify::ClassifiedError;

/// Caller's answer to an auth failure.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthRefresh {
    pub retry: bool,
    pub new_token: Option<String>,
}

impl AuthRefresh {
    /// Retry with a freshly issued credential.
    pub fn retry_with(token: impl Into<String>) -> Self {
        Self {
            retry: true,
            new_token: Some(token.into()),
        }
    }

    /// Retry with the current credential (e.g. refreshed out of band).
    pub fn retry_same() -> Self {
        Self {
            retry: true,
            new_token: None,
        }
    }

    pub fn decline() -> Self {
        Self::default()
    }
}

/// Caller-supplied credential refresh hook.
#[async_trait]
pub trait AuthRefresher: Send + Sync {
    async fn refresh(&self, error: &ClassifiedError) -> AuthRefresh;
}

/// What the executor should do with an auth error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Retry { new_token: Option<String> },
    Surface,
}

/// Per-call refresh bookkeeping.
#[derive(Debug)]
pub struct RefreshCoordinator {
    max_refreshes: u32,
    refreshes: u32,
}

impl RefreshCoordinator {
    pub fn new(max_refreshes: u32) -> Self {
        Self {
            max_refreshes,
            refreshes: 0,
        }
    }

    /// Successful refreshes so far in this call.
    pub fn refreshes(&self) -> u32 {
        self.refreshes
    }

    /// Ask `refresher` for a new credential unless the cap is reached.
    ///
    /// The hook is not invoked at all once the cap is hit.
    pub async fn resolve(
        &mut self,
        refresher: Option<&dyn AuthRefresher>,
        error: &ClassifiedError,
    ) -> RefreshOutcome {
        let Some(refresher) = refresher else {
            return RefreshOutcome::Surface;
        };
        if self.refreshes >= self.max_refreshes {
            return RefreshOutcome::Surface;
        }
        let answer = refresher.refresh(error).await;
        if !answer.retry {
            return RefreshOutcome::Surface;
        }
        self.refreshes += 1;
        RefreshOutcome::Retry {
            new_token: answer.new_token,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_code::ErrorCategory;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Always(AtomicU32);

    #[async_trait]
    impl AuthRefresher for Always {
        async fn refresh(&self, _error: &ClassifiedError) -> AuthRefresh {
            let n = self.0.fetch_add(1, Ordering::SeqCst);
            AuthRefresh::retry_with(format!("token-{}", n))
        }
    }

    struct Never;

    #[async_trait]
    impl AuthRefresher for Never {
        async fn refresh(&self, _error: &ClassifiedError) -> AuthRefresh {
            AuthRefresh::decline()
        }
    }

    fn auth_err() -> ClassifiedError {
        ClassifiedError::new("meta", "expired", ErrorCategory::Authentication)
    }

    #[tokio::test]
    async fn second_refresh_is_refused() {
        let hook = Always(AtomicU32::new(0));
        let mut c = RefreshCoordinator::new(1);
        assert_eq!(
            c.resolve(Some(&hook), &auth_err()).await,
            RefreshOutcome::Retry {
                new_token: Some("token-0".into())
            }
        );
        assert_eq!(c.resolve(Some(&hook), &auth_err()).await, RefreshOutcome::Surface);
        assert_eq!(hook.0.load(Ordering::SeqCst), 1);
        assert_eq!(c.refreshes(), 1);
    }

    #[tokio::test]
    async fn missing_or_declining_hook_surfaces() {
        let mut c = RefreshCoordinator::new(1);
        assert_eq!(c.resolve(None, &auth_err()).await, RefreshOutcome::Surface);
        assert_eq!(c.resolve(Some(&Never), &auth_err()).await, RefreshOutcome::Surface);
        assert_eq!(c.refreshes(), 0);
    }

    #[tokio::test]
    async fn zero_cap_disables_refresh() {
        let hook = Always(AtomicU32::new(0));
        let mut c = RefreshCoordinator::new(0);
        assert_eq!(c.resolve(Some(&hook), &auth_err()).await, RefreshOutcome::Surface);
        assert_eq!(hook.0.load(Ordering::SeqCst), 0);
    }
}
