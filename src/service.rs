use crate::dialogue::{DialogueEngine, Event, Reply};
use tracing::error;

/// Turn boundary around the engine: whatever goes wrong while producing a
/// response is logged and turned into an apology, and the conversation
/// state is left as it was so the user can simply resend.
pub struct BotService {
    engine: DialogueEngine,
}

impl BotService {
    pub fn new(engine: DialogueEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &DialogueEngine {
        &self.engine
    }

    pub async fn respond(&self, chat_id: &str, event: Event) -> Reply {
        match self.engine.handle(chat_id, event).await {
            Ok(reply) => reply,
            Err(err) => {
                error!("turn failed for conversation {}: {}", chat_id, err);
                Reply {
                    messages: vec![
                        "Sorry, something went wrong on my end. Please try again.".to_string(),
                    ],
                    reply_options: None,
                }
            }
        }
    }
}
