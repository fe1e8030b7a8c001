use std::time::Duration;

use auth_session_testnet::auth_session::{AuthError, EventKind, SessionEvent, UserIdentity};

use super::utils::default_testnet;

const WAIT: Duration = Duration::from_secs(30);

#[tokio::test(start_paused = true)]
async fn sign_in_sets_the_user() {
    let testnet = default_testnet().await;
    let recorder = testnet.recorder();
    let handle = testnet.handle();

    handle.sign_in("hank@example.com", "pw").unwrap();
    assert!(recorder.wait_for_count(EventKind::SignedIn, 1, WAIT).await);

    assert_eq!(
        recorder.kinds(),
        vec![
            EventKind::SignInRequested,
            EventKind::SignInStarted,
            EventKind::SignedIn
        ]
    );
    assert_eq!(
        handle.current_user(),
        Some(UserIdentity::new("uid-hank@example.com", "hank@example.com"))
    );
    assert!(!handle.is_loading());
}

#[tokio::test(start_paused = true)]
async fn failed_sign_in_surfaces_the_error() {
    let testnet = default_testnet().await;
    testnet
        .provider()
        .script_sign_in([Err(AuthError::InvalidCredentials("wrong password".into()))]);
    let recorder = testnet.recorder();
    let handle = testnet.handle();

    handle.sign_in("ivy@example.com", "oops").unwrap();
    assert!(recorder.wait_for_count(EventKind::SignInFailed, 1, WAIT).await);

    let state = handle.state();
    assert_eq!(state.user, None);
    assert!(!state.loading);
    assert_eq!(state.last_error(), Some("wrong password"));
}

#[tokio::test(start_paused = true)]
async fn newer_sign_in_supersedes_the_pending_one() {
    let testnet = default_testnet().await;
    testnet.provider().set_sign_in_latency(Duration::from_secs(5));
    let recorder = testnet.recorder();
    let handle = testnet.handle();

    handle.sign_in("stale@example.com", "pw").unwrap();
    assert!(recorder.wait_for_count(EventKind::SignInStarted, 1, WAIT).await);
    handle.sign_in("fresh@example.com", "pw").unwrap();

    assert!(recorder.wait_for_count(EventKind::SignedIn, 1, WAIT).await);
    recorder.quiet_for(Duration::from_secs(10)).await;

    assert_eq!(recorder.count(EventKind::SignedIn), 1);
    assert_eq!(
        recorder
            .events()
            .into_iter()
            .find(|e| e.kind() == EventKind::SignedIn),
        Some(SessionEvent::SignedIn {
            user: UserIdentity::new("uid-fresh@example.com", "fresh@example.com")
        })
    );
    assert_eq!(
        testnet.provider().sign_in_emails(),
        vec!["stale@example.com", "fresh@example.com"]
    );
}

#[tokio::test(start_paused = true)]
async fn sign_in_ignores_the_sign_up_limit() {
    let testnet = default_testnet().await;
    let recorder = testnet.recorder();
    let handle = testnet.handle();
    testnet
        .provider()
        .fail_sign_ups(5, AuthError::Network("offline".into()));

    for _ in 0..5 {
        handle.sign_up("jo@example.com", "pw").unwrap();
    }
    assert!(recorder.wait_for_count(EventKind::SignUpLimitError, 1, WAIT).await);

    handle.sign_in("jo@example.com", "pw").unwrap();
    assert!(recorder.wait_for_count(EventKind::SignedIn, 1, WAIT).await);
    assert!(handle.current_user().is_some());
}
