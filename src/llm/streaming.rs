//! Streaming response handling

use std::pin::Pin;

use futures::Stream;
use futures::StreamExt;

use crate::errors::Result;

pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Streaming completion from the LLM, one text delta per item
///
/// The stream yields at most one `Err`, after which it ends.
pub struct StreamingResponse {
    stream: TokenStream,
}

impl StreamingResponse {
    pub fn new(stream: TokenStream) -> Self {
        Self { stream }
    }

    /// Collect all deltas into a single string, failing on the first error
    pub async fn collect_all(mut self) -> Result<String> {
        let mut result = String::new();
        while let Some(chunk) = self.stream.next().await {
            result.push_str(&chunk?);
        }
        Ok(result)
    }

    /// Get the underlying stream
    pub fn into_stream(self) -> TokenStream {
        self.stream
    }
}

impl std::fmt::Debug for StreamingResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingResponse").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RagChatError;

    #[tokio::test]
    async fn test_collect_all_concatenates() {
        let items: Vec<Result<String>> = vec![Ok("Hel".into()), Ok("lo".into())];
        let response = StreamingResponse::new(Box::pin(futures::stream::iter(items)));
        assert_eq!(response.collect_all().await.unwrap(), "Hello");
    }

    #[tokio::test]
    async fn test_collect_all_stops_on_error() {
        let items: Vec<Result<String>> = vec![
            Ok("partial".into()),
            Err(RagChatError::LlmError("rate limited".into())),
        ];
        let response = StreamingResponse::new(Box::pin(futures::stream::iter(items)));
        let err = response.collect_all().await.unwrap_err();
        assert!(matches!(err, RagChatError::LlmError(_)));
    }
}
