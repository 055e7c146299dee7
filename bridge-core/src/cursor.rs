//! Lazy cursor state machine behind every listing iterator.
//!
//! The foreign iterator protocol is three calls: `next` advances, `item`
//! reads the current element, `err` reports why iteration stopped. A cursor
//! is always handed out, even when its construction arguments were invalid:
//! the failed cursor simply never yields and reports the construction error,
//! which removes the "null iterator" special case from every call site.

use client_traits::{ClientError, ListStream};
use futures_util::StreamExt;

use crate::error::BridgeError;
use crate::runtime::BlockingRuntime;
use crate::scope::{Scope, ScopeConfig};

pub struct LazyCursor<T> {
    scope: Scope,
    stream: Option<ListStream<T>>,
    current: Option<T>,
    error: Option<BridgeError>,
    exhausted: bool,
}

impl<T> LazyCursor<T> {
    /// Wrap a listing stream. `scope` must be the iterator's own child scope;
    /// freeing the iterator cancels it, aborting any in-flight page fetch.
    pub fn new(scope: Scope, stream: ListStream<T>) -> Self {
        Self {
            scope,
            stream: Some(stream),
            current: None,
            error: None,
            exhausted: false,
        }
    }

    /// A cursor that never yields and reports `error` as its terminal state.
    pub fn failed(error: BridgeError) -> Self {
        Self {
            scope: Scope::root(ScopeConfig::default()),
            stream: None,
            current: None,
            error: Some(error),
            exhausted: false,
        }
    }

    /// Advance to the next element. Returns true iff an item is available.
    ///
    /// Never blocks past scope cancellation: a cancel during the page fetch
    /// turns into a terminal `Canceled` error.
    pub fn advance(&mut self, runtime: &BlockingRuntime) -> bool {
        self.current = None;
        if self.error.is_some() || self.exhausted {
            return false;
        }
        let Some(stream) = self.stream.as_mut() else {
            self.exhausted = true;
            return false;
        };
        match runtime.run_until_cancelled(&self.scope, stream.next()) {
            None => {
                self.error = Some(BridgeError::Client(ClientError::Canceled));
                false
            }
            Some(None) => {
                self.exhausted = true;
                false
            }
            Some(Some(Ok(item))) => {
                self.current = Some(item);
                true
            }
            Some(Some(Err(err))) => {
                self.error = Some(err.into());
                false
            }
        }
    }

    /// The current element; `None` unless the last `advance` returned true.
    pub fn item(&self) -> Option<&T> {
        self.current.as_ref()
    }

    /// Terminal error, if iteration stopped abnormally. Natural exhaustion
    /// leaves this `None`.
    pub fn error(&self) -> Option<&BridgeError> {
        self.error.as_ref()
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn runtime() -> BlockingRuntime {
        BlockingRuntime::new().unwrap()
    }

    #[test]
    fn yields_every_item_then_stops_cleanly() {
        let runtime = runtime();
        let scope = Scope::root(ScopeConfig::default());
        let items: Vec<client_traits::Result<u32>> = vec![Ok(1), Ok(2), Ok(3)];
        let mut cursor = LazyCursor::new(scope, stream::iter(items).boxed());

        let mut seen = Vec::new();
        while cursor.advance(&runtime) {
            seen.push(*cursor.item().unwrap());
        }
        assert_eq!(seen, vec![1, 2, 3]);
        assert!(cursor.error().is_none());

        // Advancing past the end stays false without error.
        assert!(!cursor.advance(&runtime));
        assert!(cursor.item().is_none());
        assert!(cursor.error().is_none());
    }

    #[test]
    fn stream_error_is_terminal() {
        let runtime = runtime();
        let scope = Scope::root(ScopeConfig::default());
        let items: Vec<client_traits::Result<u32>> = vec![
            Ok(1),
            Err(ClientError::BucketNotFound("missing".to_string())),
            Ok(2),
        ];
        let mut cursor = LazyCursor::new(scope, stream::iter(items).boxed());

        assert!(cursor.advance(&runtime));
        assert!(!cursor.advance(&runtime));
        assert!(matches!(
            cursor.error(),
            Some(BridgeError::Client(ClientError::BucketNotFound(_)))
        ));
        // The error sticks; the rest of the stream is never pulled.
        assert!(!cursor.advance(&runtime));
    }

    #[test]
    fn failed_cursor_reports_construction_error() {
        let runtime = runtime();
        let mut cursor: LazyCursor<u32> =
            LazyCursor::failed(BridgeError::NullArgument("bucket_name"));

        assert!(!cursor.advance(&runtime));
        assert!(cursor.item().is_none());
        assert!(matches!(
            cursor.error(),
            Some(BridgeError::NullArgument("bucket_name"))
        ));
    }

    #[test]
    fn cancellation_during_fetch_surfaces_as_canceled() {
        let runtime = runtime();
        let scope = Scope::root(ScopeConfig::default());
        let mut cursor: LazyCursor<u32> =
            LazyCursor::new(scope.clone(), stream::pending().boxed());

        scope.cancel();
        assert!(!cursor.advance(&runtime));
        assert!(matches!(
            cursor.error(),
            Some(BridgeError::Client(ClientError::Canceled))
        ));
    }
}
