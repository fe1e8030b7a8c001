use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use auth_session::{EventKind, SessionEvent, SessionHandle};
use tokio::{sync::Notify, task::JoinHandle};

#[derive(Default)]
struct Log {
    events: Mutex<Vec<SessionEvent>>,
    changed: Notify,
}

impl Log {
    fn lock(&self) -> MutexGuard<'_, Vec<SessionEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Records every event applied by a store, in bus order.
///
/// Recording starts at [`EventRecorder::start`]; events applied earlier are
/// not captured.
pub struct EventRecorder {
    log: Arc<Log>,
    task: JoinHandle<()>,
}

impl EventRecorder {
    /// Subscribe to `handle` and start recording.
    pub fn start(handle: &SessionHandle) -> Self {
        let mut events = handle.subscribe();
        let log = Arc::new(Log::default());
        let writer = Arc::clone(&log);
        let task = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                writer.lock().push(event);
                writer.changed.notify_waiters();
            }
        });
        Self { log, task }
    }

    /// Everything recorded so far.
    pub fn events(&self) -> Vec<SessionEvent> {
        self.log.lock().clone()
    }

    /// Kinds of everything recorded so far.
    pub fn kinds(&self) -> Vec<EventKind> {
        self.log.lock().iter().map(SessionEvent::kind).collect()
    }

    /// Kinds of the recorded rate-limit feedback and auth change events.
    pub fn lifecycle(&self) -> Vec<EventKind> {
        self.log
            .lock()
            .iter()
            .filter(|event| event.is_lifecycle())
            .map(SessionEvent::kind)
            .collect()
    }

    /// How many events of `kind` were recorded.
    pub fn count(&self, kind: EventKind) -> usize {
        self.log.lock().iter().filter(|e| e.kind() == kind).count()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.log.lock().clear();
    }

    /// Wait until at least `n` events of `kind` were recorded.
    ///
    /// Returns `false` if `timeout` elapses first.
    pub async fn wait_for_count(&self, kind: EventKind, n: usize, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, async {
            loop {
                let changed = self.log.changed.notified();
                if self.count(kind) >= n {
                    return;
                }
                changed.await;
            }
        })
        .await
        .is_ok()
    }

    /// Wait `period` and return whatever was recorded meanwhile.
    pub async fn quiet_for(&self, period: Duration) -> Vec<SessionEvent> {
        let before = self.log.lock().len();
        tokio::time::sleep(period).await;
        self.log
            .lock()
            .get(before..)
            .map(<[SessionEvent]>::to_vec)
            .unwrap_or_default()
    }
}

impl Drop for EventRecorder {
    fn drop(&mut self) {
        self.task.abort();
    }
}
