//! Hierarchical cancellation scopes.
//!
//! A `Scope` binds a cancellation signal (and optional session configuration)
//! to one or more operations. Scopes form a tree: canceling a scope cancels
//! every descendant, while canceling a child never affects its parent or
//! siblings. The signal itself is a `tokio_util` `CancellationToken`, so any
//! future parked under the scope observes cancellation at its next
//! suspension point rather than being forcibly terminated.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

/// Configuration carried by a root scope and inherited by its descendants.
#[derive(Debug, Clone, Default)]
pub struct ScopeConfig {
    /// Directory for buffering uploads, handed through to the client.
    pub temp_directory: Option<PathBuf>,
}

/// A node in the cancellation hierarchy.
///
/// Cloning a `Scope` clones the reference, not the node: clones share the
/// same cancellation signal. Creating a scope cannot fail and canceling is
/// idempotent.
#[derive(Clone)]
pub struct Scope {
    token: CancellationToken,
    config: Arc<ScopeConfig>,
}

impl Scope {
    /// Create a root scope. One exists per opened session.
    pub fn root(config: ScopeConfig) -> Self {
        tracing::trace!(?config, "new root scope");
        Self {
            token: CancellationToken::new(),
            config: Arc::new(config),
        }
    }

    /// Derive a child scope.
    ///
    /// Canceling `self` also cancels the child; canceling the child has no
    /// effect upward.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            config: Arc::clone(&self.config),
        }
    }

    /// Signal cancellation to this scope and all of its descendants.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_canceled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes when the scope is canceled; immediately if it already was.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn config(&self) -> &ScopeConfig {
        &self.config
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("canceled", &self.is_canceled())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_propagates_to_children() {
        let root = Scope::root(ScopeConfig::default());
        let child = root.child();
        let grandchild = child.child();

        assert!(!child.is_canceled());
        root.cancel();
        assert!(root.is_canceled());
        assert!(child.is_canceled());
        assert!(grandchild.is_canceled());
    }

    #[test]
    fn cancel_does_not_propagate_upward_or_sideways() {
        let root = Scope::root(ScopeConfig::default());
        let child = root.child();
        let sibling = root.child();

        child.cancel();
        assert!(child.is_canceled());
        assert!(!root.is_canceled());
        assert!(!sibling.is_canceled());
    }

    #[test]
    fn config_is_inherited() {
        let root = Scope::root(ScopeConfig {
            temp_directory: Some(PathBuf::from("/tmp/depot")),
        });
        let child = root.child().child();
        assert_eq!(
            child.config().temp_directory.as_deref(),
            Some(std::path::Path::new("/tmp/depot"))
        );
    }

    #[tokio::test]
    async fn cancelled_wakes_waiters() {
        let root = Scope::root(ScopeConfig::default());
        let child = root.child();

        let waiter = tokio::spawn(async move {
            child.cancelled().await;
            true
        });
        tokio::task::yield_now().await;
        root.cancel();

        let woken = tokio::time::timeout(std::time::Duration::from_secs(5), waiter)
            .await
            .expect("waiter should wake after cancel")
            .unwrap();
        assert!(woken);
    }
}
