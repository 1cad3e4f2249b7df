use async_trait::async_trait;
use chatbridge_types::{Message, ModelRef, ProviderCatalog, Session};

use crate::error::ClientError;

/// Operations the bridge needs from the agent server.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn create_session(&self, title: &str) -> Result<Session, ClientError>;

    /// Submits one user turn. The server answers with the assistant message it
    /// started, which may still contain running tools.
    async fn send_prompt(
        &self,
        session_id: &str,
        content: &str,
        model: &ModelRef,
    ) -> Result<Message, ClientError>;

    async fn get_message(&self, session_id: &str, message_id: &str)
        -> Result<Message, ClientError>;

    /// All messages in the session, oldest first.
    async fn get_messages(&self, session_id: &str) -> Result<Vec<Message>, ClientError>;

    async fn list_providers(&self) -> Result<ProviderCatalog, ClientError>;
}
