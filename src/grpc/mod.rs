//! gRPC listener subsystem.
//!
//! Services are registered on a `tonic::service::RoutesBuilder` owned by the
//! foundation; the server itself only handles bind-to-drain timing and the
//! optional server-wide interceptor.

pub mod interceptor;
pub mod server;

pub use interceptor::SharedInterceptor;
pub use server::GrpcServer;
