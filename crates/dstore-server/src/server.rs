use std::collections::HashMap;
use std::sync::Arc;

use dstore_db::{Database, RemoteTable};
use dstore_protocol::ServerEnd;
use dstore_store::InMemoryStore;
use dstore_sync::{SyncStore, TableSyncHandler};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::service::{decode_request, DataStoreService};

/// Authoritative side: owns the database and every configured store table.
pub struct DataStoreServer {
    config: ServerConfig,
    db: Database,
    service: Arc<DataStoreService>,
}

impl DataStoreServer {
    /// Validate `config`, open the database and bind every table.
    /// Tables are not created; call [`create_tables`](Self::create_tables).
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        config.validate()?;
        let db = config.database.open()?;
        let mut tables: HashMap<String, Arc<dyn RemoteTable>> = HashMap::new();
        for store in &config.stores {
            tables.insert(store.name.clone(), store.table.open(db.clone())?);
        }
        let service = Arc::new(DataStoreService::new(tables, config.prefix_identities));
        Ok(Self {
            config,
            db,
            service,
        })
    }

    /// [`new`](Self::new) followed by [`create_tables`](Self::create_tables).
    pub async fn start(config: ServerConfig) -> ServerResult<Self> {
        let server = Self::new(config)?;
        server.create_tables().await?;
        info!(
            database = server.db.location(),
            stores = server.config.stores.len(),
            "data store server ready"
        );
        Ok(server)
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn service(&self) -> &Arc<DataStoreService> {
        &self.service
    }

    /// Create every configured table that does not exist yet.
    pub async fn create_tables(&self) -> ServerResult<()> {
        for store in &self.config.stores {
            self.service.table(&store.name)?.create().await?;
        }
        Ok(())
    }

    /// Serve one client connection until the client hangs up.
    ///
    /// Each request runs in its own task, so a slow request never holds up
    /// the ones behind it. Undecodable requests carry no usable callback id
    /// and are dropped with a warning.
    pub fn serve_connection(&self, end: ServerEnd) -> JoinHandle<()> {
        let service = self.service.clone();
        let ServerEnd {
            peer,
            sender,
            mut receiver,
        } = end;
        tokio::spawn(async move {
            debug!(%peer, "connection opened");
            while let Some(event) = receiver.recv().await {
                let (id, request) = match decode_request(&event) {
                    Ok(decoded) => decoded,
                    Err(e) => {
                        warn!(%peer, event = %event.name, error = %e, "dropping request");
                        continue;
                    }
                };
                let (service, sender, peer) = (service.clone(), sender.clone(), peer.clone());
                tokio::spawn(async move {
                    let reply = service.dispatch(&peer, id, request).await;
                    if let Err(e) = reply.and_then(|event| sender.emit(event)) {
                        warn!(%peer, %id, error = %e, "response not delivered");
                    }
                });
            }
            debug!(%peer, "connection closed");
        })
    }

    /// A synchronized store over the server's own (global) partition of
    /// `name`'s table, cached in memory. The store still needs `init()`.
    pub fn local_store(&self, name: &str, prefixed: bool) -> ServerResult<SyncStore> {
        let table = self.service.table(name)?.clone();
        Ok(SyncStore::new(
            name,
            Arc::new(InMemoryStore::new()),
            Arc::new(TableSyncHandler::server_local(table, prefixed)),
        ))
    }
}

impl std::fmt::Debug for DataStoreServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataStoreServer")
            .field("database", &self.db)
            .field("stores", &self.service.store_names())
            .finish()
    }
}
