pub mod metrics;
pub mod providers;

pub use metrics::{get_metrics, init_metrics, record_inference};
pub use providers::{ChatModel, GgufChatModel, MockChatModel, ProviderError};
