use std::sync::{Arc, Mutex, MutexGuard};

use tokio::{sync::mpsc, time};
use uuid::Uuid;

use crate::util::AbortOnDropHandle;

use super::{
    config::StreamSupervisorConfig,
    error::{Result, StreamError},
    process::{StreamNotice, StreamProcess},
    transport::StreamConnector,
};

struct StreamHandle {
    session_id: Uuid,
    shutdown_tx: mpsc::Sender<()>,
    task: AbortOnDropHandle<()>,
}

/// Owns the lifecycle of at most one signal stream.
///
/// Dropping the supervisor aborts the stream task, which drops the underlying connection.
pub(crate) struct StreamSupervisor {
    config: StreamSupervisorConfig,
    connector: Arc<dyn StreamConnector>,
    handle: Mutex<Option<StreamHandle>>,
}

impl StreamSupervisor {
    pub fn new(config: StreamSupervisorConfig, connector: Arc<dyn StreamConnector>) -> Self {
        Self {
            config,
            connector,
            handle: Mutex::new(None),
        }
    }

    fn get_handle(&self) -> MutexGuard<'_, Option<StreamHandle>> {
        self.handle
            .lock()
            .expect("`StreamSupervisor` mutex can't be poisoned")
    }

    /// Opens the stream for `session_id`.
    ///
    /// The target is validated synchronously; an invalid target is returned as an error before
    /// any task is spawned. Returns [`StreamError::AlreadyOpen`] if a stream task is still
    /// running.
    pub fn open(
        &self,
        session_id: Uuid,
        notice_tx: mpsc::UnboundedSender<StreamNotice>,
    ) -> Result<()> {
        let mut handle_guard = self.get_handle();

        if let Some(handle) = handle_guard.as_ref() {
            if !handle.task.is_finished() {
                return Err(StreamError::AlreadyOpen);
            }
        }

        self.connector.validate()?;

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let task = StreamProcess::spawn(
            self.config.clone(),
            self.connector.clone(),
            session_id,
            notice_tx,
            shutdown_rx,
        );

        tracing::debug!(%session_id, "signal stream task spawned");

        *handle_guard = Some(StreamHandle {
            session_id,
            shutdown_tx,
            task,
        });

        Ok(())
    }

    /// Returns `true` while a stream task is running.
    pub fn is_open(&self) -> bool {
        self.get_handle()
            .as_ref()
            .is_some_and(|handle| !handle.task.is_finished())
    }

    /// Closes the stream, if any.
    ///
    /// The stream task is asked to close the connection with the normal closure code. If it has
    /// not stopped within the configured close timeout it is aborted. Calling `close` without an
    /// open stream is a no-op.
    pub async fn close(&self) -> Result<()> {
        let handle = self.get_handle().take();
        let Some(handle) = handle else {
            return Ok(());
        };

        let StreamHandle {
            session_id,
            shutdown_tx,
            mut task,
        } = handle;

        if task.is_finished() {
            return Ok(());
        }

        // A full channel means a shutdown signal is already pending
        let _ = shutdown_tx.try_send(());

        let close_timeout = self.config.close_timeout();

        tokio::select! {
            join_res = &mut task => {
                join_res.map_err(StreamError::TaskJoin)?;
                tracing::debug!(%session_id, "signal stream closed");
                Ok(())
            }
            _ = time::sleep(close_timeout) => {
                task.abort();
                Err(StreamError::CloseTimeout(close_timeout))
            }
        }
    }
}
