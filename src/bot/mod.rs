//! Voice reply bot - trigger catalog, repeat throttling and dispatch.

pub mod catalog;
pub mod engine;
pub mod presenter;
pub mod state;
pub mod telegram;
pub mod throttle;
pub mod transport;


pub use catalog::{Catalog, ResponseAsset, Trigger};
pub use engine::{DispatchEngine, Outcome};
pub use presenter::{Presenter, Referral};
pub use state::{ConversationId, ConversationState, ConversationStore};
pub use telegram::TelegramClient;
pub use throttle::{Decision, ThrottlePolicy};
pub use transport::{KeyboardRows, Transport};
