//! Dispatch engine - turns one inbound message into at most one outbound action.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::bot::catalog::Catalog;
use crate::bot::presenter::Presenter;
use crate::bot::state::{ConversationId, ConversationStore};
use crate::bot::throttle::{Decision, ThrottlePolicy};
use crate::bot::transport::Transport;

/// What the engine decided for a message.
///
/// Reported even when delivery failed: the decision and the state change
/// stand regardless of the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// No text, or text that matches no trigger.
    Ignored,
    /// Voice clip sent; `repeat_count` includes this request.
    Audio { repeat_count: u32 },
    /// Streak exceeded the limit; refusal text sent instead.
    Refused { repeat_count: u32 },
    /// Referral button pressed.
    Referral,
}

pub struct DispatchEngine {
    catalog: Arc<Catalog>,
    store: ConversationStore,
    policy: ThrottlePolicy,
    presenter: Arc<Presenter>,
    transport: Arc<dyn Transport>,
    refusal_text: String,
}

impl DispatchEngine {
    pub fn new(
        catalog: Arc<Catalog>,
        store: ConversationStore,
        policy: ThrottlePolicy,
        presenter: Arc<Presenter>,
        transport: Arc<dyn Transport>,
        refusal_text: String,
    ) -> Self {
        Self {
            catalog,
            store,
            policy,
            presenter,
            transport,
            refusal_text,
        }
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub fn presenter(&self) -> &Presenter {
        &self.presenter
    }

    /// Handle one inbound message.
    pub async fn handle_message(&self, chat: ConversationId, text: Option<&str>) -> Outcome {
        let Some(text) = text else {
            return Outcome::Ignored;
        };

        if let Some(referral) = self.presenter.referral()
            && referral.label == text
        {
            info!("🔗 Referral link requested in chat {}", chat);
            let message = referral.message(chat);
            if let Err(e) = self.transport.send_text(chat, &message).await {
                warn!("Failed to send referral link to {}: {}", chat, e);
            }
            return Outcome::Referral;
        }

        let Some(entry) = self.catalog.lookup(text) else {
            debug!("No trigger for message in chat {}", chat);
            return Outcome::Ignored;
        };

        let state = self.store.update(chat, &entry.trigger).await;
        let repeat_count = state.repeat_count;

        match self.policy.evaluate(&state) {
            Decision::Allow => {
                info!(
                    "🔊 Chat {}: {:?} (x{}) → {}",
                    chat,
                    entry.trigger.as_str(),
                    repeat_count,
                    entry.asset.path().display()
                );
                if let Err(e) = self.transport.send_audio(chat, &entry.asset).await {
                    warn!("Failed to send voice to {}: {}", chat, e);
                }
                Outcome::Audio { repeat_count }
            }
            Decision::Refuse => {
                info!(
                    "🚫 Chat {}: {:?} refused (x{} > {})",
                    chat,
                    entry.trigger.as_str(),
                    repeat_count,
                    self.policy.limit()
                );
                if let Err(e) = self.transport.send_text(chat, &self.refusal_text).await {
                    warn!("Failed to send refusal to {}: {}", chat, e);
                }
                Outcome::Refused { repeat_count }
            }
        }
    }

    /// Greet the user and show the trigger keyboard.
    pub async fn start_session(&self, chat: ConversationId) {
        info!("👋 Session start in chat {}", chat);
        if let Err(e) = self
            .transport
            .send_text_with_keyboard(chat, self.presenter.greeting(), self.presenter.keyboard())
            .await
        {
            warn!("Failed to send greeting to {}: {}", chat, e);
        }
    }

    /// Hide the keyboard. Conversation state is left alone.
    pub async fn clear_menu(&self, chat: ConversationId) {
        info!("Clearing menu in chat {}", chat);
        if let Err(e) = self
            .transport
            .remove_keyboard(chat, self.presenter.menu_cleared_text())
            .await
        {
            warn!("Failed to remove keyboard in {}: {}", chat, e);
        }
    }
}
