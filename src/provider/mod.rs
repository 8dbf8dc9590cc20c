mod groq;
mod types;

pub use groq::GroqProvider;
pub use types::{Message, ProviderError, Role};

use std::future::Future;
use std::pin::Pin;

/// Object-safe seam between the HTTP handlers and the concrete model
/// client. Boxed future so `Arc<dyn ChatModel>` works in shared state.
pub trait ChatModel: Send + Sync {
    fn name(&self) -> &str;

    fn chat<'a>(
        &'a self,
        messages: &'a [Message],
    ) -> Pin<Box<dyn Future<Output = Result<String, ProviderError>> + Send + 'a>>;
}
