use std::sync::Arc;

use dashmap::DashMap;
use murmur_common::{ChatMessage, ChatRole, Error, Result, ToolCall, ToolDefinition};
use murmur_providers::ChatProvider;
use murmur_store::ThreadStore;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::knowledge::Knowledge;
use crate::tools::{Tool, ToolContext, ToolOutput};

/// Outcome of one model invocation: either the final answer or a batch of
/// tool invocations to execute before asking the model again.
enum TurnOutcome {
    Answer(String),
    ToolRequests(Vec<ToolCall>),
}

impl TurnOutcome {
    fn classify(reply: &ChatMessage) -> Self {
        if reply.tool_calls.is_empty() {
            TurnOutcome::Answer(reply.content.clone())
        } else {
            TurnOutcome::ToolRequests(reply.tool_calls.clone())
        }
    }
}

/// Drives the conversation loop: load history, inject knowledge, call the
/// chat model, execute requested tools, persist the round, return the answer.
pub struct AgentRuntime {
    provider: Arc<dyn ChatProvider>,
    tools: Vec<Box<dyn Tool>>,
    store: Arc<Mutex<ThreadStore>>,
    knowledge: Knowledge,
    max_tool_rounds: usize,
    /// Per-thread locks serializing concurrent requests on one thread id.
    thread_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl AgentRuntime {
    pub fn new(
        provider: Arc<dyn ChatProvider>,
        tools: Vec<Box<dyn Tool>>,
        store: Arc<Mutex<ThreadStore>>,
        knowledge: Knowledge,
        max_tool_rounds: usize,
    ) -> Self {
        for tool in &tools {
            info!("registered tool: {}", tool.name());
        }
        Self {
            provider,
            tools,
            store,
            knowledge,
            max_tool_rounds,
            thread_locks: DashMap::new(),
        }
    }

    fn thread_lock(&self, thread_id: &str) -> Arc<Mutex<()>> {
        self.thread_locks
            .entry(thread_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone()
    }

    fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description().to_string(),
                input_schema: t.input_schema(),
            })
            .collect()
    }

    fn find_tool(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    /// Run one conversational round for `thread_id` and return the final
    /// answer. The whole round's new messages are persisted as a single unit
    /// once the model produces a plain answer; a failed round persists
    /// nothing.
    #[instrument(skip(self, user_text))]
    pub async fn process_message(&self, thread_id: &str, user_text: &str) -> Result<String> {
        let lock = self.thread_lock(thread_id);
        let _guard = lock.lock().await;

        let stored = self.store.lock().await.load_history(thread_id)?;

        let mut messages: Vec<ChatMessage> = Vec::with_capacity(stored.len() + 2);
        let mut new_messages: Vec<ChatMessage> = Vec::new();

        // Every thread starts with the knowledge instruction. A fresh thread
        // persists it as its first record; a stored history that somehow
        // lacks one gets it prepended for this call only.
        if stored.first().map(|m| m.role) != Some(ChatRole::System) {
            let system = ChatMessage::system(self.knowledge.system_message());
            if stored.is_empty() {
                new_messages.push(system.clone());
            }
            messages.push(system);
        }
        messages.extend(stored);

        let user_message = ChatMessage::user(user_text);
        messages.push(user_message.clone());
        new_messages.push(user_message);

        let tool_defs = self.tool_definitions();

        for _round in 0..self.max_tool_rounds {
            let reply = self.provider.complete(&messages, &tool_defs).await?;

            match TurnOutcome::classify(&reply) {
                TurnOutcome::Answer(text) => {
                    new_messages.push(reply);
                    self.store
                        .lock()
                        .await
                        .append_turn(thread_id, &new_messages)?;
                    return Ok(text);
                }
                TurnOutcome::ToolRequests(calls) => {
                    messages.push(reply.clone());
                    new_messages.push(reply);

                    // Each call executes in the order listed; every result
                    // lands as its own message tagged with the call id.
                    for call in calls {
                        let output = self.run_tool(thread_id, &call).await;
                        let result = ChatMessage::tool_result(call.id.as_str(), output.content);
                        messages.push(result.clone());
                        new_messages.push(result);
                    }
                }
            }
        }

        Err(Error::LoopExceeded(self.max_tool_rounds))
    }

    async fn run_tool(&self, thread_id: &str, call: &ToolCall) -> ToolOutput {
        let context = ToolContext {
            thread_id: thread_id.to_string(),
        };

        match self.find_tool(&call.name) {
            Some(tool) => tool
                .execute(&context, call.arguments.clone())
                .await
                .unwrap_or_else(|e| ToolOutput::error(e.to_string())),
            None => {
                warn!("model requested unknown tool: {}", call.name);
                ToolOutput::error(format!("unknown tool: {}", call.name))
            }
        }
    }

    /// Delete all persisted state for a thread id. Idempotent.
    pub async fn reset(&self, thread_id: &str) -> Result<()> {
        let lock = self.thread_lock(thread_id);
        let _guard = lock.lock().await;

        let deleted = self.store.lock().await.clear_thread(thread_id)?;
        info!("reset thread {thread_id} ({deleted} messages cleared)");
        Ok(())
    }
}
