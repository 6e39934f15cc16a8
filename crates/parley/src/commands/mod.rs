use async_trait::async_trait;
use eyre::Result;

pub mod auth;
pub mod chat;
pub mod chats;
pub mod models;
pub mod preferences;
pub mod resume;

#[async_trait]
pub trait Command {
    async fn execute(&self) -> Result<()>;
}
