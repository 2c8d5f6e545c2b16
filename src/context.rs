//! Per-request context
//!
//! Carries the caller's identity, the languages to localize into and the
//! cancellation signal. Every upstream call made for a request goes through
//! [`RequestContext::guard`], so cancelling the token abandons all in-flight
//! branches and the request fails with [`DeliveryError::Cancelled`].

use std::future::Future;
use tokio_util::sync::CancellationToken;

use crate::types::{DeliveryError, Result};

/// Owner and project a request is served for
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scope {
    pub owner_id: String,
    pub project_id: String,
}

impl Scope {
    pub fn new(owner_id: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            project_id: project_id.into(),
        }
    }
}

/// Request-scoped state shared by every level of a materialization
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub scope: Scope,
    /// Language codes that always receive a localized document
    pub languages: Vec<String>,
    cancel: CancellationToken,
}

impl RequestContext {
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            languages: Vec::new(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.languages = languages.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Run an upstream call unless the request is cancelled first
    pub async fn guard<F, T>(&self, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if self.cancel.is_cancelled() {
            return Err(DeliveryError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(DeliveryError::Cancelled),
            result = call => result,
        }
    }
}
