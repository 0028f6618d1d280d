//! Callback and cancellation adapters over the async `FileClient` operations.
//!
//! The `*_with_completion` methods spawn the operation onto the current tokio
//! runtime and hand its result to a `FnOnce` callback, so each callback runs
//! exactly once unless the returned `JoinHandle` is aborted first. They must
//! be called from within a tokio runtime.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{ClientError, FetchResult, FileClient};

impl FileClient {
    /// Log in on a background task and report the outcome to `completion`.
    pub fn login_with_completion<F>(
        &self,
        username: impl Into<String>,
        password: impl Into<String>,
        completion: F,
    ) -> JoinHandle<()>
    where
        F: FnOnce(Result<(), ClientError>) + Send + 'static,
    {
        let client = self.clone();
        let username = username.into();
        let password = password.into();
        tokio::spawn(async move {
            let result = client.login(&username, &password).await;
            completion(result);
        })
    }

    /// Fetch `path` on a background task and report the outcome to `completion`.
    pub fn fetch_with_completion<F>(&self, path: impl Into<String>, completion: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<FetchResult, ClientError>) + Send + 'static,
    {
        let client = self.clone();
        let path = path.into();
        tokio::spawn(async move {
            let result = client.fetch(&path).await;
            completion(result);
        })
    }

    /// Like [`FileClient::login`], but gives up with `ClientError::Cancelled`
    /// as soon as `token` is cancelled. A cancelled login never installs a session.
    pub async fn login_cancellable(
        &self,
        username: &str,
        password: &str,
        token: &CancellationToken,
    ) -> Result<(), ClientError> {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!("Login cancelled");
                Err(ClientError::Cancelled)
            }
            result = self.login(username, password) => result,
        }
    }

    /// Like [`FileClient::fetch`], but gives up with `ClientError::Cancelled`
    /// as soon as `token` is cancelled.
    pub async fn fetch_cancellable(
        &self,
        path: &str,
        token: &CancellationToken,
    ) -> Result<FetchResult, ClientError> {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!(path, "Fetch cancelled");
                Err(ClientError::Cancelled)
            }
            result = self.fetch(path) => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::oneshot;

    use super::*;
    use crate::api::client::tests::{client, login_ok, response, ScriptedTransport};
    use crate::api::{ErrorKind, HttpRequest, HttpResponse, HttpTransport, TransportError};

    #[tokio::test]
    async fn test_login_completion_fires_once_with_success() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.push(Ok(login_ok()));
        let c = client(&transport);

        let calls = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = oneshot::channel();
        let counter = calls.clone();
        c.login_with_completion("alice", "hunter2", move |result| {
            counter.fetch_add(1, Ordering::SeqCst);
            let _ = tx.send(result);
        })
        .await
        .unwrap();

        assert!(rx.await.unwrap().is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(c.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_login_completion_fires_once_with_rejection() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.push(Ok(response(
            401,
            br#"{"success": false, "message": "Invalid username or password"}"#,
            &[],
        )));
        let c = client(&transport);

        let calls = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = oneshot::channel();
        let counter = calls.clone();
        c.login_with_completion("alice", "wrong", move |result| {
            counter.fetch_add(1, Ordering::SeqCst);
            let _ = tx.send(result);
        })
        .await
        .unwrap();

        match rx.await.unwrap() {
            Err(ClientError::Unauthorized(message)) => {
                assert_eq!(message, "Invalid username or password")
            }
            other => panic!("Expected Unauthorized, got {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!c.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_login_completion_with_huge_max_age() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.push(Ok(response(
            200,
            br#"{"success": true, "username": "alice"}"#,
            &[("set-cookie", "sessionId=abc; Max-Age=9223372036854775807; Path=/")],
        )));
        let c = client(&transport);

        let (tx, rx) = oneshot::channel();
        c.login_with_completion("alice", "hunter2", move |result| {
            let _ = tx.send(result);
        })
        .await
        .unwrap();

        assert!(rx.await.unwrap().is_ok());
        assert_eq!(c.session().await.unwrap().token, "abc");
    }

    #[tokio::test]
    async fn test_fetch_completion_reports_not_found() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.push(Ok(login_ok()));
        transport.push(Ok(response(404, br#"{"error": "Not found"}"#, &[])));
        let c = client(&transport);
        c.login("alice", "hunter2").await.unwrap();

        let (tx, rx) = oneshot::channel();
        c.fetch_with_completion("/missing.txt", move |result| {
            let _ = tx.send(result);
        })
        .await
        .unwrap();

        let err = rx.await.unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_fetch_completion_without_login() {
        let transport = Arc::new(ScriptedTransport::default());
        let c = client(&transport);

        let (tx, rx) = oneshot::channel();
        c.fetch_with_completion("/a.txt", move |result| {
            let _ = tx.send(result);
        })
        .await
        .unwrap();

        assert!(matches!(
            rx.await.unwrap(),
            Err(ClientError::NotAuthenticated)
        ));
    }

    /// Transport that never answers
    struct HangingTransport;

    #[async_trait]
    impl HttpTransport for HangingTransport {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
            futures::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_cancelled_login_installs_no_session() {
        let c = FileClient::with_transport("http://files.test", Arc::new(HangingTransport)).unwrap();
        let token = CancellationToken::new();

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let result = c.login_cancellable("alice", "hunter2", &token).await;
        assert!(matches!(result, Err(ClientError::Cancelled)));
        assert!(!c.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_fetch_already_cancelled() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.push(Ok(login_ok()));
        let c = client(&transport);
        c.login("alice", "hunter2").await.unwrap();

        let token = CancellationToken::new();
        token.cancel();
        let result = c.fetch_cancellable("/a.txt", &token).await;
        assert!(matches!(result, Err(ClientError::Cancelled)));
        // Only the login went out
        assert_eq!(transport.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_not_cancelled_completes() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.push(Ok(login_ok()));
        transport.push(Ok(response(200, b"data", &[])));
        let c = client(&transport);
        c.login("alice", "hunter2").await.unwrap();

        let token = CancellationToken::new();
        let result = c.fetch_cancellable("/a.txt", &token).await.unwrap();
        assert_eq!(result.data, b"data");
    }
}
