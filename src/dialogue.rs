//! Per-conversation state machine.
//!
//! Each conversation id gets its own state entry, created on its first
//! event and evicted once the conversation ends. Commands (start, cancel)
//! are parsed at the transport boundary and arrive here as explicit events.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::info;

use crate::completion::TextCompleter;
use crate::emotions::EmotionCatalog;
use crate::verses::VerseSelector;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    AwaitingEmotion,
    OpenConversation,
}

struct Conversation {
    stage: Stage,
    /// Set after the first unrecognized message; a second one in a row
    /// ends the conversation.
    reprompted: bool,
}

/// Inbound event delivered by the transport.
pub enum Event {
    Start,
    Cancel,
    Text(String),
}

/// One outbound burst. Every message is sent, in order, before the next
/// inbound event for this conversation is processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub messages: Vec<String>,
    /// Quick-reply suggestions for transports that render keyboards.
    pub reply_options: Option<Vec<String>>,
}

impl Reply {
    fn text(message: String) -> Self {
        Self {
            messages: vec![message],
            reply_options: None,
        }
    }

    fn with_options(message: String, options: Vec<&'static str>) -> Self {
        Self {
            messages: vec![message],
            reply_options: Some(options.into_iter().map(str::to_string).collect()),
        }
    }
}

#[derive(Debug, Error)]
pub enum BotError {
    #[error("completion backend failed: {0}")]
    Completion(String),
}

pub struct DialogueEngine {
    catalog: EmotionCatalog,
    selector: VerseSelector,
    completer: Option<Arc<dyn TextCompleter>>,
    offer_follow_up: bool,
    conversations: Mutex<HashMap<String, Conversation>>,
}

impl DialogueEngine {
    pub fn new(catalog: EmotionCatalog, selector: VerseSelector) -> Self {
        Self {
            catalog,
            selector,
            completer: None,
            offer_follow_up: false,
            conversations: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_completer(mut self, completer: Arc<dyn TextCompleter>) -> Self {
        self.completer = Some(completer);
        self
    }

    /// When set, a delivered verse opens a free-form follow-up loop instead
    /// of ending the conversation.
    pub fn with_follow_up(mut self, offer: bool) -> Self {
        self.offer_follow_up = offer;
        self
    }

    pub fn stage(&self, chat_id: &str) -> Option<Stage> {
        let conversations = self.conversations.lock().unwrap();
        conversations.get(chat_id).map(|c| c.stage)
    }

    pub async fn handle(&self, chat_id: &str, event: Event) -> Result<Reply, BotError> {
        match event {
            Event::Start => Ok(self.start(chat_id)),
            Event::Cancel => Ok(self.cancel(chat_id)),
            Event::Text(text) => self.on_text(chat_id, &text).await,
        }
    }

    fn start(&self, chat_id: &str) -> Reply {
        let mut conversations = self.conversations.lock().unwrap();
        conversations.insert(
            chat_id.to_string(),
            Conversation {
                stage: Stage::AwaitingEmotion,
                reprompted: false,
            },
        );
        info!("conversation {} started", chat_id);

        Reply::with_options(
            format!(
                "Hello! I'm Solace, here to help you feel better. You can talk to me \
                 about anything.\nIf you're feeling down, anxious, lonely, or just need \
                 someone to listen, I'm here for you.\n\nHow are you feeling today? \
                 (You can say {})",
                self.catalog.keyword_line()
            ),
            self.catalog.keywords(),
        )
    }

    fn cancel(&self, chat_id: &str) -> Reply {
        let mut conversations = self.conversations.lock().unwrap();
        conversations.remove(chat_id);
        info!("conversation {} cancelled", chat_id);

        Reply::text("Okay, take care! Type /start anytime you want to talk.".to_string())
    }

    async fn on_text(&self, chat_id: &str, text: &str) -> Result<Reply, BotError> {
        let state = {
            let conversations = self.conversations.lock().unwrap();
            conversations
                .get(chat_id)
                .map(|c| (c.stage, c.reprompted))
        };

        match state {
            None => Ok(Reply::text(
                "Type /start when you want to talk.".to_string(),
            )),
            Some((Stage::AwaitingEmotion, reprompted)) => {
                self.awaiting_emotion(chat_id, text, reprompted).await
            }
            Some((Stage::OpenConversation, _)) => self.open_conversation(chat_id, text).await,
        }
    }

    async fn awaiting_emotion(
        &self,
        chat_id: &str,
        text: &str,
        reprompted: bool,
    ) -> Result<Reply, BotError> {
        if let Some(entry) = self.catalog.lookup(text) {
            let mut messages = vec![self.verse_message(entry.keyword, entry).await];

            if self.offer_follow_up {
                messages.push(
                    "Would you like to talk a bit more? You can tell me what's on \
                     your mind, or say 'no' to finish."
                        .to_string(),
                );
                self.set_stage(chat_id, Stage::OpenConversation);
            } else {
                self.evict(chat_id);
            }

            return Ok(Reply {
                messages,
                reply_options: None,
            });
        }

        if reprompted {
            self.evict(chat_id);
            return Ok(Reply::text(
                "I didn't understand that. Please type /start to begin again.".to_string(),
            ));
        }

        self.mark_reprompted(chat_id);
        Ok(Reply::with_options(
            format!(
                "I'm here to listen. Sometimes, just talking about how you feel can \
                 help. Would you like to share more?\n\nYou can say {}, or type /start \
                 to begin again.",
                self.catalog.keyword_line()
            ),
            self.catalog.keywords(),
        ))
    }

    async fn open_conversation(&self, chat_id: &str, text: &str) -> Result<Reply, BotError> {
        if is_decline(text) {
            self.evict(chat_id);
            return Ok(Reply::text(
                "Okay, take care! Type /start anytime you want to talk.".to_string(),
            ));
        }

        if let Some(entry) = self.catalog.lookup(text) {
            let messages = vec![
                self.verse_message(entry.keyword, entry).await,
                "I'm still here if you'd like to keep talking, or say 'no' to finish."
                    .to_string(),
            ];
            return Ok(Reply {
                messages,
                reply_options: None,
            });
        }

        match &self.completer {
            Some(completer) => {
                // relayed verbatim; failures surface as a turn error so the
                // user can resend
                let response = completer
                    .complete(text)
                    .await
                    .map_err(|e| BotError::Completion(e.to_string()))?;
                Ok(Reply::text(response))
            }
            None => Ok(Reply::text(
                "I'm here to listen. Tell me more about what's on your mind.".to_string(),
            )),
        }
    }

    async fn verse_message(&self, keyword: &str, entry: &crate::emotions::EmotionEntry) -> String {
        let verse = self
            .selector
            .select(entry, self.catalog.explanation_for(keyword))
            .await;

        format!(
            "I'm sorry you're feeling {}. Remember, it's okay to feel this way. \
             Here's a Bible verse to encourage you:\n\n{} - {}\n\nWhat this means:\n{}\n\n\
             For more encouragement, you can use a Bible app like YouVersion or \
             Bible Gateway to explore more verses and devotionals.",
            keyword, verse.reference, verse.text, verse.explanation
        )
    }

    fn set_stage(&self, chat_id: &str, stage: Stage) {
        let mut conversations = self.conversations.lock().unwrap();
        if let Some(conversation) = conversations.get_mut(chat_id) {
            conversation.stage = stage;
            conversation.reprompted = false;
        }
    }

    fn mark_reprompted(&self, chat_id: &str) {
        let mut conversations = self.conversations.lock().unwrap();
        if let Some(conversation) = conversations.get_mut(chat_id) {
            conversation.reprompted = true;
        }
    }

    fn evict(&self, chat_id: &str) {
        let mut conversations = self.conversations.lock().unwrap();
        conversations.remove(chat_id);
        info!("conversation {} ended", chat_id);
    }
}

fn is_decline(text: &str) -> bool {
    matches!(
        text.trim().to_lowercase().as_str(),
        "no" | "nope" | "no thanks" | "no thank you"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decline_detection() {
        assert!(is_decline("no"));
        assert!(is_decline("  No  "));
        assert!(is_decline("no thanks"));
        assert!(!is_decline("i know"));
        assert!(!is_decline("not really sure"));
    }
}
