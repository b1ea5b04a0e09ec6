//! End-to-end challenge flow against the in-memory platform API.

#[path = "../mocks/mock_ctf_api.rs"]
mod mock_ctf_api;

use ctf_console::api_client::{
    ApiClient, ApiClientBuilder, AuthApi, ChallengeApi, EndReason,
};
use ctf_console::challenge::{ChallengeController, SubmitOutcome, ViewState};
use ctf_console::session::SessionStore;
use mock_ctf_api::MockPlatform;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

fn temp_token_path() -> PathBuf {
    std::env::temp_dir().join(format!("ctf-console-test-{}", Uuid::new_v4()))
}

fn client_for(platform: &MockPlatform) -> Arc<ApiClient> {
    Arc::new(
        ApiClientBuilder::new()
            .base_url(platform.base_url())
            .build()
            .expect("client"),
    )
}

/// Register a fresh user on its own client and leave it authenticated.
async fn registered_client(platform: &MockPlatform, username: &str) -> Arc<ApiClient> {
    let client = client_for(platform);
    let auth = client.register(username, "hunter2").await.expect("register");
    client.set_token(auth.token).await;
    client
}

#[tokio::test]
async fn register_login_and_restore_session() {
    let platform = MockPlatform::spawn().await;
    let token_path = temp_token_path();

    let store = SessionStore::new(client_for(&platform), token_path.clone());
    let session = store.register("alice", "hunter2").await.expect("register");
    assert_eq!(session.username, "alice");
    assert!(store.current().await.is_some());

    // A second process picks the session up from the token file.
    let restored_store = SessionStore::new(client_for(&platform), token_path.clone());
    let restored = restored_store.restore().await.expect("restore");
    assert_eq!(restored.expect("session").username, "alice");

    // Logging out tears down both the server token and the file.
    restored_store.logout().await;
    assert!(restored_store.current().await.is_none());
    let third_store = SessionStore::new(client_for(&platform), token_path);
    assert!(third_store.restore().await.expect("restore").is_none());
}

#[tokio::test]
async fn stale_token_file_restores_to_logged_out() {
    let platform = MockPlatform::spawn().await;
    let token_path = temp_token_path();
    std::fs::write(&token_path, "tok-bogus\n").expect("write token");

    let store = SessionStore::new(client_for(&platform), token_path.clone());
    assert!(store.restore().await.expect("restore").is_none());
    // The dead token file is cleaned up.
    assert!(!token_path.exists());
}

#[tokio::test]
async fn full_run_from_start_to_completion() {
    let platform = MockPlatform::spawn().await;
    let api = registered_client(&platform, "bob").await;
    let (mut controller, _events) = ChallengeController::new(api);

    assert_eq!(controller.load().await.expect("load"), ViewState::NotStarted);

    assert_eq!(controller.start().await.expect("start"), ViewState::Active);
    assert!(controller.current().is_some());
    assert_eq!(controller.seconds_remaining(), 600);

    let outcome = controller.submit_flag("flag{wrong}").await.expect("submit");
    assert_eq!(
        outcome,
        SubmitOutcome::Incorrect {
            total_attempts: Some(1)
        }
    );
    assert_eq!(controller.state(), ViewState::Active);

    let outcome = controller.submit_flag("flag{one}").await.expect("submit");
    assert_eq!(outcome, SubmitOutcome::Advanced { next_level: 2 });

    let outcome = controller.submit_flag("flag{two}").await.expect("submit");
    assert_eq!(outcome, SubmitOutcome::Advanced { next_level: 3 });

    let outcome = controller.submit_flag("flag{three}").await.expect("submit");
    assert_eq!(outcome, SubmitOutcome::Completed);
    assert_eq!(controller.state(), ViewState::EndedCompleted);

    // The frozen view rejects further submissions locally.
    let err = controller.submit_flag("flag{extra}").await.unwrap_err();
    assert_eq!(err.ended_reason(), Some(EndReason::Completed));
}

#[tokio::test]
async fn starting_twice_resumes_the_same_run() {
    let platform = MockPlatform::spawn().await;
    let api = registered_client(&platform, "carol").await;

    let (mut controller, _events) = ChallengeController::new(api.clone());
    controller.start().await.expect("start");
    controller.submit_flag("flag{one}").await.expect("submit");

    // A second controller (view remount) starts again and lands on level 2.
    let (mut remounted, _events) = ChallengeController::new(api);
    assert_eq!(remounted.start().await.expect("start"), ViewState::Active);
    assert_eq!(remounted.status().expect("status").current_level, 2);
}

#[tokio::test]
async fn server_expiry_beats_the_local_timer() {
    let platform = MockPlatform::spawn().await;
    let api = registered_client(&platform, "dave").await;
    let (mut controller, _events) = ChallengeController::new(api.clone());
    controller.start().await.expect("start");

    platform.expire_run("dave");
    let outcome = controller.submit_flag("flag{one}").await.expect("submit");
    assert_eq!(outcome, SubmitOutcome::Expired);
    assert_eq!(controller.state(), ViewState::EndedExpired);

    // A fresh load classifies the same run as expired.
    let (mut reloaded, _events) = ChallengeController::new(api);
    assert_eq!(
        reloaded.load().await.expect("load"),
        ViewState::EndedExpired
    );
}

#[tokio::test]
async fn revoked_token_destroys_the_session() {
    let platform = MockPlatform::spawn().await;
    let token_path = temp_token_path();
    let store = SessionStore::new(client_for(&platform), token_path.clone());
    store.register("erin", "hunter2").await.expect("register");

    platform.revoke_all_tokens();
    let err = store.client().status().await.unwrap_err();
    assert!(err.is_unauthorized());

    store.observe_error(err).await;
    assert!(store.current().await.is_none());
    assert!(store.client().token().await.is_none());
    assert!(!token_path.exists());
}
