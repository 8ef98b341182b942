use crate::core::DnsqError;
use pin_project_lite::pin_project;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

/// `Timeout` bounds any future that resolves to a `Result<_, DnsqError>` by a
/// deadline, turning an expired deadline into an `ErrorKind::Timeout` error.
pub trait Timeout: Sized {
    fn timeout<S>(self, t: Duration, operation: S) -> Timed<Self>
    where
        S: Into<String>;
}

impl<F, V> Timeout for F
where
    F: Future<Output = Result<V, DnsqError>>,
{
    fn timeout<S>(self, t: Duration, operation: S) -> Timed<F>
    where
        S: Into<String>,
    {
        Timed {
            operation: operation.into(),
            time: t,
            inner: tokio::time::timeout(t, self),
        }
    }
}

pin_project! {
    #[derive(Debug)]
    #[must_use = "futures do nothing unless you `.await` or poll them"]
    pub struct Timed<T> {
        operation: String,
        time: Duration,
        #[pin]
        inner: tokio::time::Timeout<T>,
    }
}

impl<F, V> Future for Timed<F>
where
    F: Future<Output = Result<V, DnsqError>>,
{
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        // Flatten the extra layer of Result that tokio adds, an elapsed deadline
        // becomes a DnsqError like everything else.
        this.inner.poll(cx).map(|res| match res {
            Ok(Ok(v)) => Ok(v),
            Ok(Err(e)) => Err(e),
            Err(_e) => Err(DnsqError::timeout(*this.time, this.operation)),
        })
    }
}
