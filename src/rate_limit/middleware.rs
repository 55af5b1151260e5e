use crate::rate_limit::key::client_key;
use crate::rate_limit::{Decision, KeyedLimiter};
use http::header::{HeaderValue, CONTENT_TYPE, RETRY_AFTER};
use http::{Request, Response, StatusCode};
use pin_project::pin_project;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tower_layer::Layer;
use tower_service::Service;

/// Body of the rejection response.
pub const TOO_MANY_REQUESTS_BODY: &str = "Too Many Requests";

/// A layer that rejects over-budget clients with `429 Too Many Requests`.
#[derive(Debug)]
pub struct RateLimitLayer<L> {
    limiter: Arc<L>,
}

impl<L> RateLimitLayer<L> {
    /// Create a new rate limit layer.
    pub fn new(limiter: L) -> Self {
        Self { limiter: Arc::new(limiter) }
    }

    /// Share a limiter that is also used elsewhere (e.g. by several routers).
    pub fn from_shared(limiter: Arc<L>) -> Self {
        Self { limiter }
    }
}

impl<L> Clone for RateLimitLayer<L> {
    fn clone(&self) -> Self {
        Self { limiter: self.limiter.clone() }
    }
}

impl<S, L> Layer<S> for RateLimitLayer<L>
where
    L: KeyedLimiter,
{
    type Service = RateLimitService<S, L>;

    fn layer(&self, service: S) -> Self::Service {
        RateLimitService { inner: service, limiter: self.limiter.clone() }
    }
}

/// Middleware service that enforces per-client rate limits.
#[derive(Debug)]
pub struct RateLimitService<S, L> {
    inner: S,
    limiter: Arc<L>,
}

impl<S: Clone, L> Clone for RateLimitService<S, L> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone(), limiter: self.limiter.clone() }
    }
}

impl<S, L, ReqBody, ResBody> Service<Request<ReqBody>> for RateLimitService<S, L>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    L: KeyedLimiter,
    ResBody: From<&'static str>,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = ResponseFuture<S::Future, ResBody>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let key = client_key(req.headers());
        match self.limiter.admit(&key) {
            Decision::Allowed { .. } => ResponseFuture::forward(self.inner.call(req)),
            Decision::Denied { retry_after } => {
                ResponseFuture::rejected(too_many_requests(retry_after))
            }
        }
    }
}

/// Build the `429` rejection. `Retry-After` is rounded up to whole seconds.
pub fn too_many_requests<B: From<&'static str>>(retry_after: Duration) -> Response<B> {
    let mut response = Response::new(B::from(TOO_MANY_REQUESTS_BODY));
    *response.status_mut() = StatusCode::TOO_MANY_REQUESTS;
    let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    headers.insert(RETRY_AFTER, HeaderValue::from(secs.max(1)));
    response
}

/// Response future for [`RateLimitService`].
#[pin_project]
pub struct ResponseFuture<F, B> {
    #[pin]
    kind: Kind<F, B>,
}

#[pin_project(project = KindProj)]
enum Kind<F, B> {
    Forward {
        #[pin]
        future: F,
    },
    Rejected {
        response: Option<Response<B>>,
    },
}

impl<F, B> ResponseFuture<F, B> {
    fn forward(future: F) -> Self {
        Self { kind: Kind::Forward { future } }
    }

    fn rejected(response: Response<B>) -> Self {
        Self { kind: Kind::Rejected { response: Some(response) } }
    }
}

impl<F, B, E> Future for ResponseFuture<F, B>
where
    F: Future<Output = Result<Response<B>, E>>,
{
    type Output = Result<Response<B>, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.project().kind.project() {
            KindProj::Forward { future } => future.poll(cx),
            KindProj::Rejected { response } => {
                Poll::Ready(Ok(response.take().expect("ResponseFuture polled after completion")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_has_plain_text_and_rounded_retry_after() {
        let res: Response<String> = too_many_requests(Duration::from_millis(1_200));
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(res.body(), TOO_MANY_REQUESTS_BODY);
        assert_eq!(res.headers()[RETRY_AFTER], "2");
        assert_eq!(res.headers()[CONTENT_TYPE], "text/plain; charset=utf-8");
    }

    #[test]
    fn retry_after_is_at_least_one_second() {
        let res: Response<String> = too_many_requests(Duration::from_millis(1));
        assert_eq!(res.headers()[RETRY_AFTER], "1");
        let res: Response<String> = too_many_requests(Duration::from_secs(10));
        assert_eq!(res.headers()[RETRY_AFTER], "10");
    }
}
