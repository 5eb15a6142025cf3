//! One chat turn: explore the warehouse, build the prompt, stream the answer.

use crate::agent_prompts::system_prompt;
use crate::config::AppConfig;
use crate::db::MssqlDataStore;
use crate::error::{AgentError, Result};
use crate::explorer::Explorer;
use crate::llm::{ChatMessage, ModelClient};
use crate::tools::DataTools;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

pub struct ChatService {
    explorer: Explorer,
    model: ModelClient,
}

impl ChatService {
    pub fn new(tools: DataTools, model: ModelClient) -> Self {
        Self {
            explorer: Explorer::new(tools),
            model,
        }
    }

    /// Wire the SQL Server store and the Ollama client from configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let store = MssqlDataStore::from_config(&config.database)?;
        let tools = DataTools::new(Arc::new(store));
        Ok(Self::new(tools, ModelClient::new(config.model.clone())))
    }

    pub fn explorer(&self) -> &Explorer {
        &self.explorer
    }

    /// Run the pipeline for the conversation and start the model stream.
    pub async fn respond(&self, messages: &[ChatMessage]) -> Result<mpsc::Receiver<Result<String>>> {
        if messages.is_empty() {
            return Err(AgentError::InvalidRequest("messages must not be empty".to_string()));
        }

        let span = info_span!("chat_turn", turn_id = %Uuid::new_v4());
        async {
            let transcript = self.explorer.explore_conversation(messages).await;
            info!(
                "Evidence transcript: {} bytes, model: {}",
                transcript.len(),
                self.model.model()
            );
            let prompt = system_prompt(&transcript);
            self.model.stream_chat(&prompt, messages).await
        }
        .instrument(span)
        .await
    }
}
