pub mod retry;

pub use retry::{retry_with_config, RetryConfig, Retryable};
