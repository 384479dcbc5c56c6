use std::sync::Arc;

use stockroom_auth::{SessionError, SessionSigner};
use stockroom_infra::store::{DocumentStore, Documents, InMemoryDocumentStore, PostgresDocumentStore, StoreError};
use stockroom_infra::{AppConfig, CommandDispatcher, StockLedger};
use thiserror::Error;

/// Everything a handler needs, shared behind an `Arc`.
#[derive(Debug, Clone)]
pub struct AppServices {
    pub dispatcher: CommandDispatcher,
    pub ledger: StockLedger,
    pub signer: SessionSigner,
    pub trust_cookie: bool,
}

#[derive(Debug, Error)]
pub enum ServicesError {
    #[error("store setup failed: {0}")]
    Store(#[from] StoreError),

    #[error("session signer setup failed: {0}")]
    Session(#[from] SessionError),

    #[error("DATABASE_URL must be set when USE_PERSISTENT_STORES=true")]
    MissingDatabaseUrl,
}

impl AppServices {
    /// Wire the services over an already constructed store.
    pub fn over(store: Arc<dyn DocumentStore>, config: &AppConfig) -> Result<Self, ServicesError> {
        let docs = Documents::new(store);
        Ok(Self {
            dispatcher: CommandDispatcher::new(docs.clone()),
            ledger: StockLedger::new(docs),
            signer: SessionSigner::new(&config.cookie_secret)?,
            trust_cookie: config.trust_cookie,
        })
    }

    pub fn docs(&self) -> &Documents {
        self.dispatcher.documents()
    }
}

pub async fn build_services(config: &AppConfig) -> Result<AppServices, ServicesError> {
    if config.use_persistent_stores {
        let url = config
            .database_url
            .as_deref()
            .ok_or(ServicesError::MissingDatabaseUrl)?;
        let store = PostgresDocumentStore::connect(url).await?;
        tracing::info!("using postgres document store");
        return AppServices::over(Arc::new(store), config);
    }

    tracing::info!("using in-memory document store");
    AppServices::over(Arc::new(InMemoryDocumentStore::new()), config)
}
