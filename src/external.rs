pub mod route_backend;

pub use route_backend::RouteBackend;
