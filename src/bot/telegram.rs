//! Telegram transport using teloxide.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{InputFile, KeyboardButton, KeyboardMarkup, KeyboardRemove};
use tracing::debug;

use crate::bot::catalog::ResponseAsset;
use crate::bot::state::ConversationId;
use crate::bot::transport::{KeyboardRows, Transport};

/// Telegram API client.
pub struct TelegramClient {
    bot: Bot,
}

impl TelegramClient {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn keyboard_markup(rows: &KeyboardRows) -> KeyboardMarkup {
    let buttons: Vec<Vec<KeyboardButton>> = rows
        .iter()
        .map(|row| row.iter().map(|label| KeyboardButton::new(label.clone())).collect())
        .collect();
    KeyboardMarkup::new(buttons).resize_keyboard()
}

#[async_trait]
impl Transport for TelegramClient {
    async fn send_text(&self, chat: ConversationId, text: &str) -> Result<(), String> {
        self.bot
            .send_message(ChatId(chat.0), text)
            .await
            .map(|_| ())
            .map_err(|e| format!("Failed to send: {e}"))
    }

    async fn send_audio(&self, chat: ConversationId, asset: &ResponseAsset) -> Result<(), String> {
        let path = asset.path();
        let voice_data = tokio::fs::read(path)
            .await
            .map_err(|e| format!("Failed to read voice file '{}': {e}", path.display()))?;

        debug!("Sending voice to chat {} ({} bytes)", chat, voice_data.len());
        let input_file = InputFile::memory(voice_data).file_name(asset.file_name());

        self.bot
            .send_voice(ChatId(chat.0), input_file)
            .await
            .map(|_| ())
            .map_err(|e| format!("Failed to send voice: {e}"))
    }

    async fn send_text_with_keyboard(
        &self,
        chat: ConversationId,
        text: &str,
        keyboard: &KeyboardRows,
    ) -> Result<(), String> {
        self.bot
            .send_message(ChatId(chat.0), text)
            .reply_markup(keyboard_markup(keyboard))
            .await
            .map(|_| ())
            .map_err(|e| format!("Failed to send keyboard: {e}"))
    }

    async fn remove_keyboard(&self, chat: ConversationId, text: &str) -> Result<(), String> {
        self.bot
            .send_message(ChatId(chat.0), text)
            .reply_markup(KeyboardRemove::new())
            .await
            .map(|_| ())
            .map_err(|e| format!("Failed to remove keyboard: {e}"))
    }
}
