//! Yes/no prompts answered through message buttons.
//!
//! A handler opens a [`Confirmation`], sends its buttons in a follow-up and
//! waits. The component interaction for a button click lands in
//! [`ConfirmRegistry::answer`], which wakes the waiting handler.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use serde_json::json;
use tokio::sync::oneshot;
use twilight_model::id::{marker::UserMarker, Id};

const PREFIX: &str = "confirm";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmResponse {
    Confirmed,
    Denied,
    Timeout,
}

#[derive(Debug, PartialEq, Eq)]
pub enum AnswerOutcome {
    Answered(ConfirmResponse),
    /// Someone other than the prompt's author clicked
    NotAuthor,
    /// Unknown nonce, or the prompt already timed out
    Expired,
}

struct Pending {
    author: Id<UserMarker>,
    reply: oneshot::Sender<bool>,
}

pub struct Confirmation {
    nonce: String,
    receiver: oneshot::Receiver<bool>,
}

impl Confirmation {
    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    /// Action row with Confirm / Cancel buttons
    pub fn components(&self) -> Vec<serde_json::Value> {
        vec![json!({
            "type": 1,
            "components": [
                { "type": 2, "style": 3, "label": "Confirm", "custom_id": format!("{PREFIX}:{}:yes", self.nonce) },
                { "type": 2, "style": 4, "label": "Cancel", "custom_id": format!("{PREFIX}:{}:no", self.nonce) },
            ]
        })]
    }
}

#[derive(Default)]
pub struct ConfirmRegistry {
    pending: Mutex<HashMap<String, Pending>>,
}

impl ConfirmRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_confirm_id(custom_id: &str) -> bool {
        custom_id.starts_with(PREFIX) && custom_id[PREFIX.len()..].starts_with(':')
    }

    /// Open a prompt only `author` may answer
    pub fn open(&self, author: Id<UserMarker>) -> Confirmation {
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        let (reply, receiver) = oneshot::channel();
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(nonce.clone(), Pending { author, reply });
        Confirmation { nonce, receiver }
    }

    pub fn answer(&self, custom_id: &str, user: Id<UserMarker>) -> AnswerOutcome {
        let mut parts = custom_id.splitn(3, ':');
        let (Some(PREFIX), Some(nonce), Some(choice)) = (parts.next(), parts.next(), parts.next())
        else {
            return AnswerOutcome::Expired;
        };

        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        match pending.get(nonce) {
            None => return AnswerOutcome::Expired,
            Some(entry) if entry.author != user => return AnswerOutcome::NotAuthor,
            Some(_) => {}
        }

        let Some(entry) = pending.remove(nonce) else {
            return AnswerOutcome::Expired;
        };
        let confirmed = choice == "yes";
        // The waiter may have given up between the timeout and this click
        if entry.reply.send(confirmed).is_err() {
            return AnswerOutcome::Expired;
        }

        AnswerOutcome::Answered(if confirmed {
            ConfirmResponse::Confirmed
        } else {
            ConfirmResponse::Denied
        })
    }

    /// Wait for the author's answer, giving up after `timeout`
    pub async fn wait(&self, confirmation: Confirmation, timeout: Duration) -> ConfirmResponse {
        let Confirmation { nonce, receiver } = confirmation;
        let response = match tokio::time::timeout(timeout, receiver).await {
            Ok(Ok(true)) => ConfirmResponse::Confirmed,
            Ok(Ok(false)) => ConfirmResponse::Denied,
            Ok(Err(_)) | Err(_) => ConfirmResponse::Timeout,
        };
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&nonce);
        response
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
