pub mod logging;

pub use logging::{TracingError, init_tracing};
