//! Greeting, reply keyboard and referral link shown to users.

use std::fmt;

use crate::bot::catalog::{Catalog, Trigger};
use crate::bot::state::ConversationId;
use crate::bot::transport::KeyboardRows;

/// Buttons per row when the keyboard is derived from the catalog.
const BUTTONS_PER_ROW: usize = 2;

/// A keyboard button that answers with a per-chat referral link.
#[derive(Debug, Clone)]
pub struct Referral {
    pub label: String,
    pub base_url: String,
    pub text: String,
}

impl Referral {
    pub fn link(&self, chat: ConversationId) -> String {
        let sep = if self.base_url.contains('?') { '&' } else { '?' };
        format!("{}{}user_id={}", self.base_url, sep, chat.0)
    }

    /// Lead-in text followed by the link, or just the link when there is no text.
    pub fn message(&self, chat: ConversationId) -> String {
        let text = self.text.trim_end();
        if text.is_empty() {
            self.link(chat)
        } else {
            format!("{} {}", text, self.link(chat))
        }
    }
}

#[derive(Debug)]
pub enum PresenterError {
    EmptyKeyboard,
    EmptyRow { index: usize },
    UnknownButton(String),
    ReferralIsTrigger(String),
    EmptyReferral,
}

impl fmt::Display for PresenterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyKeyboard => write!(f, "keyboard has no buttons"),
            Self::EmptyRow { index } => write!(f, "keyboard row #{} is empty", index),
            Self::UnknownButton(label) => {
                write!(f, "keyboard button {:?} is neither a trigger nor the referral button", label)
            }
            Self::ReferralIsTrigger(label) => {
                write!(f, "referral label {:?} collides with a trigger", label)
            }
            Self::EmptyReferral => write!(f, "referral needs a label and a base_url"),
        }
    }
}

impl std::error::Error for PresenterError {}

/// Read-only rendering of the catalog for session start and menu clearing.
#[derive(Debug)]
pub struct Presenter {
    greeting: String,
    menu_cleared_text: String,
    keyboard: KeyboardRows,
    referral: Option<Referral>,
}

impl Presenter {
    /// Validate the keyboard against `catalog`, or derive one when `keyboard` is `None`.
    pub fn new(
        catalog: &Catalog,
        greeting: String,
        menu_cleared_text: String,
        keyboard: Option<KeyboardRows>,
        referral: Option<Referral>,
    ) -> Result<Self, PresenterError> {
        if let Some(ref r) = referral {
            if r.label.is_empty() || r.base_url.is_empty() {
                return Err(PresenterError::EmptyReferral);
            }
            if catalog.contains(&r.label) {
                return Err(PresenterError::ReferralIsTrigger(r.label.clone()));
            }
        }

        let keyboard = match keyboard {
            Some(rows) => rows,
            None => derive_keyboard(catalog, referral.as_ref()),
        };

        if keyboard.is_empty() {
            return Err(PresenterError::EmptyKeyboard);
        }
        let referral_label = referral.as_ref().map(|r| r.label.as_str());
        for (index, row) in keyboard.iter().enumerate() {
            if row.is_empty() {
                return Err(PresenterError::EmptyRow { index });
            }
            for label in row {
                if !catalog.contains(label) && Some(label.as_str()) != referral_label {
                    return Err(PresenterError::UnknownButton(label.clone()));
                }
            }
        }

        Ok(Self {
            greeting,
            menu_cleared_text,
            keyboard,
            referral,
        })
    }

    pub fn greeting(&self) -> &str {
        &self.greeting
    }

    pub fn menu_cleared_text(&self) -> &str {
        &self.menu_cleared_text
    }

    pub fn keyboard(&self) -> &KeyboardRows {
        &self.keyboard
    }

    pub fn referral(&self) -> Option<&Referral> {
        self.referral.as_ref()
    }

    /// Triggers that can only be reached by typing them.
    pub fn unlisted_triggers<'a>(&self, catalog: &'a Catalog) -> Vec<&'a Trigger> {
        catalog
            .triggers()
            .filter(|t| !self.keyboard.iter().flatten().any(|label| label == t.as_str()))
            .collect()
    }
}

/// Two triggers per row, referral button alone at the bottom.
fn derive_keyboard(catalog: &Catalog, referral: Option<&Referral>) -> KeyboardRows {
    let labels: Vec<String> = catalog.triggers().map(|t| t.as_str().to_string()).collect();
    let mut rows: KeyboardRows = labels.chunks(BUTTONS_PER_ROW).map(<[String]>::to_vec).collect();
    if let Some(r) = referral {
        rows.push(vec![r.label.clone()]);
    }
    rows
}
