//! Reusable supervision patterns for per-event workers.
//!
//! Both combinators consume one [`EventKind`] from a lossless [`EventFeed`](crate::bus::EventFeed)
//! of the bus and spawn a tokio task per matching event. They differ in what happens to a
//! worker that is still running when the next event arrives.

use std::future::Future;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    bus::EventBus,
    event::{EventKind, SessionEvent},
    session_log,
};

/// Spawn an independent worker for every `kind` event.
///
/// Workers run concurrently, are not supervised relative to each other and
/// are never cancelled; stopping the returned supervisor task only stops
/// spawning new ones.
pub fn run_every<W, Fut>(bus: &EventBus, kind: EventKind, mut worker: W) -> JoinHandle<()>
where
    W: FnMut(SessionEvent) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let events = bus.feed(kind);
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            session_log!(debug, "run_every: spawning worker for {}", kind);
            tokio::spawn(worker(event));
        }
    })
}

/// Spawn a worker for every `kind` event, cancelling the previous one first.
///
/// At most one worker is live at a time. Cancellation is cooperative: each
/// worker receives a [`CancellationToken`] and must stop at its suspension
/// points once it fires, discarding pending results and emitting nothing
/// more. Stopping (or aborting) the supervisor cancels its last worker.
pub fn run_latest<W, Fut>(
    bus: &EventBus,
    kind: EventKind,
    mut worker: W,
) -> JoinHandle<()>
where
    W: FnMut(SessionEvent, CancellationToken) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let events = bus.feed(kind);
    tokio::spawn(async move {
        let root = CancellationToken::new();
        // Cancels every outstanding worker when the supervisor goes away.
        let _guard = root.clone().drop_guard();
        let mut latest: Option<(CancellationToken, JoinHandle<()>)> = None;

        while let Some(event) = events.recv().await {
            if let Some((token, handle)) = latest.take() {
                if !handle.is_finished() {
                    session_log!(debug, "run_latest: superseding running {} worker", kind);
                    token.cancel();
                }
            }
            let token = root.child_token();
            let handle = tokio::spawn(worker(event, token.clone()));
            latest = Some((token, handle));
        }
    })
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use tokio::sync::Mutex;

    use super::*;
    use crate::bus::Envelope;

    fn spawn_echo(bus: EventBus, mut rx: tokio::sync::mpsc::UnboundedReceiver<Envelope>) {
        tokio::spawn(async move {
            while let Some(Envelope { event, applied }) = rx.recv().await {
                bus.publish(event);
                if let Some(applied) = applied {
                    let _ = applied.send(());
                }
            }
        });
    }

    #[tokio::test(start_paused = true)]
    async fn run_every_runs_workers_concurrently() {
        let (bus, rx) = EventBus::new(16);
        spawn_echo(bus.clone(), rx);

        let finished = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&finished);
        let supervisor = run_every(&bus, EventKind::SignInRequested, move |event| {
            let sink = Arc::clone(&sink);
            async move {
                tokio::time::sleep(Duration::from_secs(1)).await;
                let email = event.credentials().map(|c| c.email.clone());
                sink.lock().await.push(email);
            }
        });

        let started = tokio::time::Instant::now();
        for i in 0..3 {
            bus.dispatch(SessionEvent::sign_in(format!("user{i}@example.com"), "pw"))
                .unwrap();
        }
        bus.dispatch(SessionEvent::SignUpStarted).unwrap();

        while finished.lock().await.len() < 3 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(
            started.elapsed() < Duration::from_secs(2),
            "workers ran in parallel, not one after another"
        );
        assert_eq!(finished.lock().await.len(), 3);
        supervisor.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn run_latest_cancels_superseded_worker() {
        let (bus, rx) = EventBus::new(16);
        spawn_echo(bus.clone(), rx);

        let outcomes = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&outcomes);
        let supervisor = run_latest(&bus, EventKind::SignInRequested, move |event, cancel| {
            let sink = Arc::clone(&sink);
            async move {
                let email = event.credentials().map(|c| c.email.clone()).unwrap_or_default();
                tokio::select! {
                    () = cancel.cancelled() => sink.lock().await.push(format!("cancelled {email}")),
                    () = tokio::time::sleep(Duration::from_secs(1)) => {
                        sink.lock().await.push(format!("done {email}"));
                    }
                }
            }
        });

        bus.dispatch(SessionEvent::sign_in("first@example.com", "pw"))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        bus.dispatch(SessionEvent::sign_in("second@example.com", "pw"))
            .unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(
            *outcomes.lock().await,
            vec![
                "cancelled first@example.com".to_string(),
                "done second@example.com".to_string()
            ]
        );
        supervisor.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn aborting_run_latest_cancels_last_worker() {
        let (bus, rx) = EventBus::new(16);
        spawn_echo(bus.clone(), rx);

        let (tx, cancelled) = tokio::sync::oneshot::channel();
        let mut tx = Some(tx);
        let supervisor = run_latest(&bus, EventKind::SignInRequested, move |_, cancel| {
            let tx = tx.take();
            async move {
                cancel.cancelled().await;
                if let Some(tx) = tx {
                    let _ = tx.send(());
                }
            }
        });

        bus.dispatch(SessionEvent::sign_in("a@example.com", "pw")).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        supervisor.abort();

        tokio::time::timeout(Duration::from_secs(1), cancelled)
            .await
            .expect("worker observed cancellation")
            .unwrap();
    }
}
