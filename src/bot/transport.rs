//! Outbound actions the dispatch engine asks the chat platform to perform.

use async_trait::async_trait;

use crate::bot::catalog::ResponseAsset;
use crate::bot::state::ConversationId;

/// Rows of reply-keyboard button labels.
pub type KeyboardRows = Vec<Vec<String>>;

/// Fire-and-forget delivery. Errors are plain messages; callers log them and
/// move on, nothing is retried.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_text(&self, chat: ConversationId, text: &str) -> Result<(), String>;

    /// Upload a voice clip. Reading the file is part of the call, so a
    /// vanished asset surfaces here as an error.
    async fn send_audio(&self, chat: ConversationId, asset: &ResponseAsset) -> Result<(), String>;

    async fn send_text_with_keyboard(
        &self,
        chat: ConversationId,
        text: &str,
        keyboard: &KeyboardRows,
    ) -> Result<(), String>;

    /// Telegram can only drop a reply keyboard alongside a message.
    async fn remove_keyboard(&self, chat: ConversationId, text: &str) -> Result<(), String>;
}
