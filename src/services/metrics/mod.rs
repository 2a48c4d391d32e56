pub mod registry;
pub mod middleware;

pub use registry::MetricsRegistry;
pub use middleware::metrics_middleware;
