use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::core::clock::{Clock, SystemClock};
use crate::core::config::{AppPaths, ConfigService, RagSettings};
use crate::rag::{
    EmbeddingProvider, HybridRetriever, IngestionPipeline, OpenAiEmbeddingProvider,
    PersistentVectorStore, RagContextService, SemanticChunker, SqliteVectorStore, VectorCache,
};
use crate::session::{PromptMessage, Role, SessionRegistry, SessionState};

pub mod error;

use error::InitializationError;

/// Shared retrieval state: one cache, one store, one session registry per process.
#[derive(Clone)]
pub struct RagState {
    pub paths: Arc<AppPaths>,
    pub config: ConfigService,
    pub settings: Arc<RagSettings>,
    pub chunker: SemanticChunker,
    pub cache: Arc<VectorCache>,
    pub store: Arc<dyn PersistentVectorStore>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub retriever: HybridRetriever,
    pub context: RagContextService,
    pub ingestion: IngestionPipeline,
    pub sessions: Arc<SessionRegistry>,
}

impl RagState {
    pub async fn initialize() -> Result<Arc<Self>, InitializationError> {
        Self::initialize_with(Arc::new(AppPaths::new())).await
    }

    /// Loads settings, opens the SQLite store and builds the embedding client.
    pub async fn initialize_with(paths: Arc<AppPaths>) -> Result<Arc<Self>, InitializationError> {
        let config = ConfigService::new(paths.clone());
        let settings = config
            .load_settings()
            .map_err(|e| InitializationError::Config(e.into()))?;
        if let Ok(redacted) = config.redacted_config() {
            tracing::debug!("Effective configuration: {}", redacted);
        }

        let db_path = settings
            .store
            .db_file
            .clone()
            .unwrap_or_else(|| paths.db_path.clone());
        let store: Arc<dyn PersistentVectorStore> = Arc::new(
            SqliteVectorStore::with_path(db_path.clone())
                .await
                .map_err(|e| InitializationError::Store(e.into()))?,
        );

        if settings.embedding.api_key.is_none() {
            tracing::warn!("No embedding API key configured; requests are sent unauthenticated");
        }
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(
            OpenAiEmbeddingProvider::new(&settings.embedding)
                .map_err(|e| InitializationError::Embedding(e.into()))?,
        );

        tracing::info!(
            "Retrieval state ready (store: {}, model: {})",
            db_path.display(),
            settings.embedding.model
        );
        Ok(Arc::new(Self::from_parts(
            paths,
            config,
            settings,
            store,
            embedder,
            Arc::new(SystemClock),
        )))
    }

    /// Wires the components around caller-supplied collaborators.
    pub fn from_parts(
        paths: Arc<AppPaths>,
        config: ConfigService,
        settings: RagSettings,
        store: Arc<dyn PersistentVectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let chunker = SemanticChunker::from_settings(&settings.chunker);
        let cache = Arc::new(VectorCache::new(clock.clone()));
        let retriever = HybridRetriever::new(cache.clone(), store.clone())
            .with_store_timeout(settings.retrieval.store_timeout());
        let context = RagContextService::new(embedder.clone(), retriever.clone(), &settings.retrieval);
        let ingestion = IngestionPipeline::new(
            chunker,
            embedder.clone(),
            store.clone(),
            cache.clone(),
            &settings.cache,
            &settings.store,
        );
        let sessions = Arc::new(SessionRegistry::new(&settings.session, clock));

        Self {
            paths,
            config,
            settings: Arc::new(settings),
            chunker,
            cache,
            store,
            embedder,
            retriever,
            context,
            ingestion,
            sessions,
        }
    }

    /// Starts the periodic cache sweep, unless disabled in settings.
    pub fn start_background_tasks(&self) -> Option<JoinHandle<()>> {
        let interval = self.settings.cache.cleanup_interval()?;
        Some(self.cache.spawn_cleanup(interval))
    }

    /// Formats the next prompt for `tenant`, creating its session on first use.
    pub async fn prepare_prompt(
        &self,
        tenant: &str,
        thread_id: Option<&str>,
        namespace: Option<&str>,
        user_message: &str,
    ) -> (SessionState, Vec<PromptMessage>) {
        let session = self.sessions.get_or_create(tenant, thread_id);
        let mut session = session.lock().await;
        let messages = session
            .format_prompt(user_message, namespace, &self.context)
            .await;
        (session.state(), messages)
    }

    /// Records a completed user/assistant exchange in the tenant's history.
    pub async fn record_exchange(&self, tenant: &str, user_message: &str, assistant_reply: &str) {
        let session = self.sessions.get_or_create(tenant, None);
        let mut session = session.lock().await;
        session.add_exchange(Role::User, user_message);
        session.add_exchange(Role::Assistant, assistant_reply);
    }
}
