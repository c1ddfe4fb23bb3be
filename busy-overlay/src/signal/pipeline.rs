//! Framework-level HTTP pipeline and its overlay adapter.
//!
//! The pipeline is an interceptor stack. On the way out, each interceptor's
//! [`request`](HttpInterceptor::request) hook sees the request config in
//! registration order. On the way back, [`response`](HttpInterceptor::response)
//! or [`response_error`](HttpInterceptor::response_error) run in reverse
//! order. An error hook may recover by returning `Ok`.
//!
//! ```text
//! dispatch ──► request(A) ──► request(B) ──► transport
//!                                               │
//! outcome  ◄── response(A) ◄── response(B) ◄────┘
//! ```
//!
//! The transport itself is supplied by the caller; this crate never performs
//! network I/O.

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;

use super::{report_end, report_start, RequestConfig, RequestObserver, SignalSource};

/// A completed response. The body is carried through untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    /// Config of the request that produced this response.
    pub config: Option<RequestConfig>,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            config: None,
            body: body.into(),
        }
    }

    pub fn ok() -> Self {
        Self::new(200, Bytes::new())
    }
}

/// Why a request failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectionReason {
    #[error("HTTP status {0}")]
    Status(u16),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    #[error("request aborted")]
    Aborted,
}

/// A failed request travelling back through the pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("request rejected: {reason}")]
pub struct Rejection {
    /// Config of the request that failed.
    pub config: Option<RequestConfig>,
    pub reason: RejectionReason,
}

impl Rejection {
    pub fn new(reason: RejectionReason) -> Self {
        Self {
            config: None,
            reason,
        }
    }

    pub fn with_config(mut self, config: RequestConfig) -> Self {
        self.config = Some(config);
        self
    }
}

/// A hook into the pipeline. Every method defaults to pass-through.
pub trait HttpInterceptor: Send + Sync {
    /// Inspect or replace the outgoing request config.
    fn request(&self, config: RequestConfig) -> RequestConfig {
        config
    }

    /// Inspect or replace a successful response.
    fn response(&self, response: Response) -> Response {
        response
    }

    /// Inspect a failure. Return `Err` to keep it failing, `Ok` to recover.
    fn response_error(&self, rejection: Rejection) -> Result<Response, Rejection> {
        Err(rejection)
    }
}

/// Ordered interceptor stack.
#[derive(Clone, Default)]
pub struct InterceptorChain {
    interceptors: Vec<Arc<dyn HttpInterceptor>>,
}

impl std::fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptorChain")
            .field("interceptors", &self.interceptors.len())
            .finish()
    }
}

impl InterceptorChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an interceptor. Later interceptors sit closer to the transport.
    pub fn push(&mut self, interceptor: Arc<dyn HttpInterceptor>) {
        self.interceptors.push(interceptor);
    }

    pub fn with(mut self, interceptor: Arc<dyn HttpInterceptor>) -> Self {
        self.push(interceptor);
        self
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// Run one request through the stack.
    ///
    /// `transport` receives the final config and resolves to the raw outcome.
    /// If the transport leaves the outcome's `config` empty it is filled in,
    /// so response hooks always see the originating request.
    pub async fn dispatch<T, Fut>(
        &self,
        config: RequestConfig,
        transport: T,
    ) -> Result<Response, Rejection>
    where
        T: FnOnce(RequestConfig) -> Fut,
        Fut: Future<Output = Result<Response, Rejection>>,
    {
        let config = self
            .interceptors
            .iter()
            .fold(config, |config, interceptor| interceptor.request(config));

        let mut outcome = match transport(config.clone()).await {
            Ok(mut response) => {
                response.config.get_or_insert_with(|| config.clone());
                Ok(response)
            }
            Err(mut rejection) => {
                rejection.config.get_or_insert_with(|| config.clone());
                Err(rejection)
            }
        };

        for interceptor in self.interceptors.iter().rev() {
            outcome = match outcome {
                Ok(response) => Ok(interceptor.response(response)),
                Err(rejection) => interceptor.response_error(rejection),
            };
        }

        outcome
    }
}

/// Reports pipeline traffic to a [`RequestObserver`].
///
/// Never alters requests or responses and never recovers a failure.
#[derive(Clone)]
pub struct PipelineAdapter {
    observer: Arc<dyn RequestObserver>,
}

impl std::fmt::Debug for PipelineAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineAdapter").finish_non_exhaustive()
    }
}

impl PipelineAdapter {
    pub fn new(observer: Arc<dyn RequestObserver>) -> Self {
        Self { observer }
    }
}

impl HttpInterceptor for PipelineAdapter {
    fn request(&self, config: RequestConfig) -> RequestConfig {
        report_start(self.observer.as_ref(), SignalSource::Pipeline, Some(&config));
        config
    }

    fn response(&self, response: Response) -> Response {
        report_end(
            self.observer.as_ref(),
            SignalSource::Pipeline,
            response.config.as_ref(),
        );
        response
    }

    fn response_error(&self, rejection: Rejection) -> Result<Response, Rejection> {
        report_end(
            self.observer.as_ref(),
            SignalSource::Pipeline,
            rejection.config.as_ref(),
        );
        Err(rejection)
    }
}
