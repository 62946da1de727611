use anyhow::{Context, Result};
use mongodb::options::ClientOptions;
use mongodb::{
    Client, Collection, Database as MongoDatabase,
    bson::{doc, oid::ObjectId},
};
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::mpsc;

use crate::data_models::{SearchEvent, SearchHistoryDoc};

/// Collection names as constants for consistency
pub mod collections {
    pub const SEARCH_HISTORY: &str = "search_history";
}

/// Database wrapper providing connection management and collection access
#[derive(Debug, Clone)]
pub struct Database {
    client: Client,
    db: MongoDatabase,
}

impl Database {
    /// Connect and ping. Fails if the server is unreachable.
    pub async fn new(uri: &str, db_name: &str) -> Result<Self> {
        let database = Self::connect_lazy(uri, db_name).await?;

        database
            .client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .context("Failed to connect to MongoDB")?;

        log::info!("Connected to MongoDB database: {}", db_name);

        Ok(database)
    }

    /// Build the client without talking to the server; the driver connects
    /// on first use.
    pub async fn connect_lazy(uri: &str, db_name: &str) -> Result<Self> {
        let client_options = ClientOptions::parse(uri)
            .await
            .context("Failed to parse MongoDB connection string")?;

        let client =
            Client::with_options(client_options).context("Failed to create MongoDB client")?;
        let db = client.database(db_name);

        Ok(Self { client, db })
    }

    /// Connect when a URI is configured; any failure downgrades to memory-only mode.
    pub async fn connect_optional(uri: Option<&str>, db_name: &str) -> Option<Self> {
        let Some(uri) = uri else {
            log::warn!("MONGODB_URI not set, running with in-memory history only");
            return None;
        };
        match Self::new(uri, db_name).await {
            Ok(db) => Some(db),
            Err(e) => {
                log::error!("MongoDB unavailable, continuing in demo mode: {:#}", e);
                None
            }
        }
    }

    pub fn collection<T>(&self, name: &str) -> Collection<T>
    where
        T: Send + Sync,
    {
        self.db.collection(name)
    }

    pub fn search_history(&self) -> Collection<SearchHistoryDoc> {
        self.collection(collections::SEARCH_HISTORY)
    }
}

pub struct Repository<T>
where
    T: Send + Sync,
{
    collection: Collection<T>,
}

impl<T> Repository<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    pub fn new(collection: Collection<T>) -> Self {
        Self { collection }
    }

    pub async fn insert(&self, doc: &T) -> Result<ObjectId> {
        let result = self
            .collection
            .insert_one(doc)
            .await
            .context("Failed to insert document")?;

        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| anyhow::anyhow!("Failed to get inserted ObjectId"))
    }
}

/// Durable copy of the in-memory search history. Writes are best effort.
///
/// Events are queued on a channel and drained by a single inserter task, so
/// recording a search never waits on MongoDB.
pub struct SearchHistoryRepo {
    tx: mpsc::UnboundedSender<SearchEvent>,
}

impl SearchHistoryRepo {
    /// Starts the inserter task; must be called inside a tokio runtime.
    pub fn spawn(db: &Database) -> Self {
        let repo = Repository::new(db.search_history());
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(Self::run_inserter(repo, rx));
        Self { tx }
    }

    async fn run_inserter(
        repo: Repository<SearchHistoryDoc>,
        mut rx: mpsc::UnboundedReceiver<SearchEvent>,
    ) {
        while let Some(event) = rx.recv().await {
            match repo.insert(&SearchHistoryDoc::from(&event)).await {
                Ok(id) => log::debug!("mirrored search event to mongo: {:?}", id),
                Err(e) => log::error!("error mirroring search event, error: {:#}", e),
            }
        }
        log::info!("search history mirror stopped");
    }

    /// Queues the event for insertion; failures are only logged.
    pub fn mirror(&self, event: SearchEvent) {
        if let Err(e) = self.tx.send(event) {
            log::error!("search history mirror closed, dropping event {}", e.0.id);
        }
    }
}
