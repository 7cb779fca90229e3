use std::path::Path;

use murmur_common::{ChatMessage, ChatRole, Error, Result, ToolCall};
use rusqlite::{Connection, params};
use tracing::info;

/// Durable, append-only log of per-thread message history.
///
/// Threads are implicit: the first append for a thread id creates it, a
/// clear deletes every row for the id, and nothing else removes records.
pub struct ThreadStore {
    conn: Connection,
}

impl ThreadStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        info!("opening thread store at {}", db_path.display());
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path)
            .map_err(|e| Error::Database(format!("failed to open database: {e}")))?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .map_err(|e| Error::Database(format!("failed to set pragmas: {e}")))?;

        let store = Self { conn };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::Database(format!("failed to open in-memory database: {e}")))?;

        let store = Self { conn };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS messages (
                    id TEXT PRIMARY KEY,
                    thread_id TEXT NOT NULL,
                    role TEXT NOT NULL,
                    content TEXT NOT NULL,
                    tool_calls TEXT NOT NULL DEFAULT '[]',
                    tool_call_id TEXT,
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                );

                CREATE INDEX IF NOT EXISTS idx_messages_thread
                    ON messages(thread_id, rowid);",
            )
            .map_err(|e| Error::Database(format!("migration failed: {e}")))?;
        Ok(())
    }

    /// Append one round's messages as a single transaction, so a crash cannot
    /// persist half a round.
    pub fn append_turn(&mut self, thread_id: &str, messages: &[ChatMessage]) -> Result<()> {
        let tx = self
            .conn
            .transaction()
            .map_err(|e| Error::Database(format!("failed to start transaction: {e}")))?;

        for message in messages {
            let tool_calls = serde_json::to_string(&message.tool_calls)?;
            tx.execute(
                "INSERT INTO messages (id, thread_id, role, content, tool_calls, tool_call_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    uuid::Uuid::new_v4().to_string(),
                    thread_id,
                    role_name(message.role),
                    message.content,
                    tool_calls,
                    message.tool_call_id,
                ],
            )
            .map_err(|e| Error::Database(format!("failed to append message: {e}")))?;
        }

        tx.commit()
            .map_err(|e| Error::Database(format!("failed to commit turn: {e}")))?;
        Ok(())
    }

    /// Load a thread's full history in insertion order.
    pub fn load_history(&self, thread_id: &str) -> Result<Vec<ChatMessage>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT role, content, tool_calls, tool_call_id
                 FROM messages
                 WHERE thread_id = ?1
                 ORDER BY rowid ASC",
            )
            .map_err(|e| Error::Database(format!("failed to prepare history query: {e}")))?;

        let rows = stmt
            .query_map(params![thread_id], |row| {
                let role: String = row.get(0)?;
                let content: String = row.get(1)?;
                let tool_calls_raw: String = row.get(2)?;
                let tool_call_id: Option<String> = row.get(3)?;
                Ok((role, content, tool_calls_raw, tool_call_id))
            })
            .map_err(|e| Error::Database(format!("failed to load history: {e}")))?;

        let mut messages = Vec::new();
        for row in rows {
            let (role, content, tool_calls_raw, tool_call_id) =
                row.map_err(|e| Error::Database(format!("failed to read message row: {e}")))?;
            let tool_calls: Vec<ToolCall> =
                serde_json::from_str(&tool_calls_raw).unwrap_or_default();
            messages.push(ChatMessage {
                role: parse_role(&role)?,
                content,
                tool_calls,
                tool_call_id,
            });
        }
        Ok(messages)
    }

    /// Delete all persisted messages for a thread id. Idempotent: clearing an
    /// empty or unknown thread succeeds silently. Returns the number of
    /// deleted rows.
    pub fn clear_thread(&self, thread_id: &str) -> Result<usize> {
        let deleted = self
            .conn
            .execute(
                "DELETE FROM messages WHERE thread_id = ?1",
                params![thread_id],
            )
            .map_err(|e| Error::Database(format!("failed to clear thread: {e}")))?;
        Ok(deleted)
    }

    pub fn count_messages(&self, thread_id: &str) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM messages WHERE thread_id = ?1",
                params![thread_id],
                |row| row.get(0),
            )
            .map_err(|e| Error::Database(format!("failed to count messages: {e}")))?;
        Ok(count as usize)
    }
}

fn role_name(role: ChatRole) -> &'static str {
    match role {
        ChatRole::System => "system",
        ChatRole::User => "user",
        ChatRole::Assistant => "assistant",
        ChatRole::Tool => "tool",
    }
}

fn parse_role(raw: &str) -> Result<ChatRole> {
    match raw {
        "system" => Ok(ChatRole::System),
        "user" => Ok(ChatRole::User),
        "assistant" => Ok(ChatRole::Assistant),
        "tool" => Ok(ChatRole::Tool),
        other => Err(Error::Database(format!("unknown message role: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use murmur_common::ToolCall;

    #[test]
    fn test_append_and_load_preserves_order() {
        let mut store = ThreadStore::in_memory().unwrap();
        store
            .append_turn(
                "t1",
                &[
                    ChatMessage::system("identity"),
                    ChatMessage::user("hello"),
                    ChatMessage::assistant("hi there"),
                ],
            )
            .unwrap();

        let history = store.load_history("t1").unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].role, ChatRole::System);
        assert_eq!(history[1].content, "hello");
        assert_eq!(history[2].content, "hi there");
    }

    #[test]
    fn test_tool_calls_roundtrip() {
        let mut store = ThreadStore::in_memory().unwrap();
        let request = ChatMessage::tool_request(
            "",
            vec![ToolCall {
                id: "call_1".to_string(),
                name: "generate_image".to_string(),
                arguments: serde_json::json!({"prompt": "a fox"}),
            }],
        );
        store
            .append_turn(
                "t1",
                &[request, ChatMessage::tool_result("call_1", "![Generated Image](/x.jpg)")],
            )
            .unwrap();

        let history = store.load_history("t1").unwrap();
        assert_eq!(history[0].tool_calls.len(), 1);
        assert_eq!(history[0].tool_calls[0].arguments["prompt"], "a fox");
        assert_eq!(history[1].role, ChatRole::Tool);
        assert_eq!(history[1].tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn test_threads_are_isolated() {
        let mut store = ThreadStore::in_memory().unwrap();
        store.append_turn("t1", &[ChatMessage::user("one")]).unwrap();
        store.append_turn("t2", &[ChatMessage::user("two")]).unwrap();

        assert_eq!(store.count_messages("t1").unwrap(), 1);
        assert_eq!(store.load_history("t2").unwrap()[0].content, "two");
    }

    #[test]
    fn test_clear_thread_is_idempotent() {
        let mut store = ThreadStore::in_memory().unwrap();
        store
            .append_turn("t1", &[ChatMessage::user("a"), ChatMessage::assistant("b")])
            .unwrap();

        assert_eq!(store.clear_thread("t1").unwrap(), 2);
        assert_eq!(store.count_messages("t1").unwrap(), 0);
        // Clearing an already-empty thread succeeds silently.
        assert_eq!(store.clear_thread("t1").unwrap(), 0);
        assert_eq!(store.clear_thread("never-seen").unwrap(), 0);
    }
}
