//! Builder for [`DmeManager`].
//!
//! ## Example
//! ```ignore
//! let config = DmeConfig::new()?.validate()?;
//! let manager = DmeManagerBuilder::new(config)
//!     .schema(my_schema) // Optional override of `store.schema_path`
//!     .handler(Arc::new(MyHandler))
//!     .build()?;
//! ```
//!
//! `build()` spawns the event dispatcher, so it must run inside a tokio
//! runtime.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::info;

use super::DmeManager;
use crate::dispatch::DispatchStats;
use crate::dispatch::EventDispatcher;
use crate::dispatch::EventQueue;
use crate::store::StoreCore;
use crate::DmeConfig;
use crate::DmeHandler;
use crate::Result;
use crate::Schema;

pub struct DmeManagerBuilder {
    config: DmeConfig,
    schema: Option<Schema>,
    handler: Option<Arc<dyn DmeHandler>>,
}

impl DmeManagerBuilder {
    pub fn new(config: DmeConfig) -> Self {
        Self {
            config,
            schema: None,
            handler: None,
        }
    }

    /// Use `schema` instead of loading `store.schema_path`
    pub fn schema(
        mut self,
        schema: Schema,
    ) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Default handler for [`DmeManager::watch`]
    pub fn handler(
        mut self,
        handler: Arc<dyn DmeHandler>,
    ) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn build(self) -> Result<DmeManager> {
        let config = self.config;

        let schema = match self.schema {
            Some(schema) => schema,
            None => match &config.store.schema_path {
                Some(path) => Schema::load(path)?,
                None => Schema::default(),
            },
        };
        let strict = schema.is_strict() || config.store.strict_schema;
        let schema = schema.strict(strict);

        let (queue, receiver) = EventQueue::channel(config.dispatcher.queue_warn_threshold);
        let core = Arc::new(StoreCore::new(schema, config.store.clone(), queue));
        if let Some(handler) = self.handler {
            core.set_handler(handler);
        }

        let stats = Arc::new(DispatchStats::default());
        let (shutdown_tx, shutdown_rx) = watch::channel(());
        let dispatcher = EventDispatcher::new(
            Arc::downgrade(&core),
            receiver,
            config.dispatcher.handler_timeout(),
            stats.clone(),
            shutdown_rx,
        );
        let handle = tokio::spawn(dispatcher.run());

        info!(
            schema_classes = core.schema.len(),
            strict,
            handler_timeout_ms = config.dispatcher.handler_timeout_ms,
            "DME manager started"
        );

        Ok(DmeManager {
            core,
            config: Arc::new(config),
            stats,
            shutdown_tx,
            dispatcher: Mutex::new(Some(handle)),
        })
    }
}
