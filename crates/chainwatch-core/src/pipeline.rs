//! Pipeline supervisor: runs the listener and the processor as two tasks with
//! a joint, fail-fast lifecycle.

use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::chain::{BlockFetcher, HeaderSource, SenderRecovery};
use crate::config::WatcherConfig;
use crate::error::WatchError;
use crate::height::ChainHeight;
use crate::listener::BlockListener;
use crate::processor::BlockProcessor;
use crate::queue::hash_queue;
use crate::service::WatchService;
use crate::stats::PipelineStats;
use crate::store::{SubscriberRegistry, TransactionStore};

/// Owns the listener / processor pair and the state they share.
pub struct Pipeline {
    config: WatcherConfig,
    listener: BlockListener,
    processor: BlockProcessor,
    service: WatchService,
}

impl Pipeline {
    pub fn new(
        config: WatcherConfig,
        source: Arc<dyn HeaderSource>,
        fetcher: Arc<dyn BlockFetcher>,
        recovery: Arc<dyn SenderRecovery>,
        registry: Arc<dyn SubscriberRegistry>,
        store: Arc<dyn TransactionStore>,
    ) -> Self {
        let height = Arc::new(ChainHeight::new());
        let stats = Arc::new(PipelineStats::new());

        let listener = BlockListener::new(
            source,
            Arc::clone(&height),
            Arc::clone(&stats),
            config.resubscribe_delay(),
        );
        let processor = BlockProcessor::new(
            fetcher,
            recovery,
            Arc::clone(&registry),
            Arc::clone(&store),
            Arc::clone(&stats),
        );
        let service = WatchService::new(height, stats, registry, store);

        Self {
            config,
            listener,
            processor,
            service,
        }
    }

    /// A query facade sharing this pipeline's height, counters and stores.
    pub fn service(&self) -> WatchService {
        self.service.clone()
    }

    /// Run until `cancel` fires (`Ok(())`) or either task fails.
    ///
    /// The first non-cancellation error, or a task panic, cancels the other
    /// task and is returned once both have stopped.
    pub async fn run(self, cancel: CancellationToken) -> Result<(), WatchError> {
        let Self {
            config,
            listener,
            processor,
            ..
        } = self;

        let (sender, receiver) = hash_queue(config.queue_capacity);
        let tasks_cancel = cancel.child_token();

        info!(
            queue_capacity = config.queue_capacity,
            resubscribe_delay_ms = config.resubscribe_delay_ms,
            "pipeline starting"
        );

        let mut tasks = JoinSet::new();
        {
            let cancel = tasks_cancel.clone();
            tasks.spawn(async move { ("listener", listener.run(sender, cancel).await) });
        }
        {
            let cancel = tasks_cancel.clone();
            tasks.spawn(async move { ("processor", processor.run(receiver, cancel).await) });
        }

        let mut outcome = Ok(());
        while let Some(joined) = tasks.join_next().await {
            let failure = match joined {
                Ok((_, Ok(()))) => None,
                Ok((_, Err(e))) if e.is_cancelled() => None,
                Ok((task, Err(e))) => {
                    error!(task, error = %e, "pipeline task failed");
                    Some(e)
                }
                Err(join_err) => {
                    error!(error = %join_err, "pipeline task panicked");
                    Some(WatchError::Other(format!("pipeline task panicked: {join_err}")))
                }
            };
            if let Some(e) = failure {
                if outcome.is_ok() {
                    outcome = Err(e);
                }
            }
            // Either task stopping stops the other.
            tasks_cancel.cancel();
        }

        info!(ok = outcome.is_ok(), "pipeline stopped");
        outcome
    }
}
