//! Server-wide gRPC request interceptor.
//!
//! The interceptor sees the metadata of every incoming call before it is
//! routed. Returning an error status rejects the call.

use std::fmt;
use std::sync::Arc;

use tonic::service::Interceptor;
use tonic::{Request, Status};

type InterceptFn = dyn Fn(Request<()>) -> Result<Request<()>, Status> + Send + Sync;

/// Cloneable interceptor applied to every route of a [`super::GrpcServer`].
#[derive(Clone)]
pub struct SharedInterceptor(Arc<InterceptFn>);

impl SharedInterceptor {
    pub fn new<F>(intercept: F) -> Self
    where
        F: Fn(Request<()>) -> Result<Request<()>, Status> + Send + Sync + 'static,
    {
        Self(Arc::new(intercept))
    }

    /// Lets every call through untouched.
    pub fn pass_through() -> Self {
        Self::new(|request| Ok(request))
    }
}

impl Default for SharedInterceptor {
    fn default() -> Self {
        Self::pass_through()
    }
}

impl fmt::Debug for SharedInterceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedInterceptor").finish_non_exhaustive()
    }
}

impl Interceptor for SharedInterceptor {
    fn call(&mut self, request: Request<()>) -> Result<Request<()>, Status> {
        (self.0)(request)
    }
}
