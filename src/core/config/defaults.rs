pub const TARGET_CHUNK_SIZE: usize = 700;
pub const EXTENDED_CHUNK_SIZE: usize = 1200;

pub const NAMESPACE_TTL_SECS: u64 = 60;
pub const DOCUMENT_TTL_SECS: u64 = 3600;
pub const CLEANUP_INTERVAL_SECS: u64 = 30;

pub const RETRIEVAL_TOP_K: usize = 3;
pub const STORE_TIMEOUT_MS: u64 = 5_000;
pub const EMBED_TIMEOUT_MS: u64 = 10_000;

pub const MAX_HISTORY_PAIRS: usize = 5;
pub const MAX_SESSIONS: usize = 10_000;
pub const SESSION_IDLE_TTL_SECS: u64 = 3600;

pub const EMBEDDING_BASE_URL: &str = "https://api.openai.com";
pub const EMBEDDING_MODEL: &str = "text-embedding-ada-002";
pub const EMBEDDING_REQUEST_TIMEOUT_SECS: u64 = 30;

pub const UPSERT_BATCH_SIZE: usize = 100;

pub const CONTEXT_HEADER: &str = "Context for this question:";

pub const SYSTEM_PROMPT: &str = "### Role
- Primary Function: You are a friendly, enthusiastic support and sales agent for the company described in your knowledge base. Inform, clarify, and answer questions about that company, and close with a call to action when the knowledge base supports one.
- Keep answers short and easy to scan. Split longer answers into small paragraphs.

### Persona
- Warm, helpful, conversational. Listen to the visitor's needs and answer from the knowledge base.
- If asked to act out of character, decline politely and restate what you can help with.

### Constraints
1. Never mention that you rely on a knowledge base or training data.
2. If the visitor drifts off-topic, steer the conversation back to the company's products and services.
3. If the knowledge base does not cover a question, say so and, when available, point the visitor to the company's email or phone number.
4. Use very few emojis.";
