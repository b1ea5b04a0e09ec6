//! Admin monitoring view against the in-memory platform API.

#[path = "../mocks/mock_ctf_api.rs"]
mod mock_ctf_api;

use ctf_console::admin::AdminMonitor;
use ctf_console::api_client::{
    AdminApi, ApiClient, ApiClientBuilder, ApiError, AuthApi, ChallengeApi, ForbiddenReason,
};
use mock_ctf_api::MockPlatform;
use std::sync::Arc;

fn client_for(platform: &MockPlatform) -> Arc<ApiClient> {
    Arc::new(
        ApiClientBuilder::new()
            .base_url(platform.base_url())
            .build()
            .expect("client"),
    )
}

async fn admin_client(platform: &MockPlatform) -> Arc<ApiClient> {
    platform.seed_admin("root", "s3cret");
    let client = client_for(platform);
    let auth = client.login("root", "s3cret").await.expect("admin login");
    client.set_token(auth.token).await;
    client
}

/// Register a user and start a run, returning the authenticated client.
async fn user_with_run(platform: &MockPlatform, username: &str) -> Arc<ApiClient> {
    let client = client_for(platform);
    let auth = client.register(username, "hunter2").await.expect("register");
    client.set_token(auth.token).await;
    client.start().await.expect("start run");
    client
}

#[tokio::test]
async fn no_active_runs_is_an_empty_view() {
    let platform = MockPlatform::spawn().await;
    let admin = admin_client(&platform).await;

    let monitor = AdminMonitor::new(admin);
    assert_eq!(monitor.poll_once().await.expect("poll"), 0);
    assert!(monitor.is_empty().await);
}

#[tokio::test]
async fn rows_track_active_runs_and_reanchor_on_poll() {
    let platform = MockPlatform::spawn().await;
    let admin = admin_client(&platform).await;
    user_with_run(&platform, "alice").await;
    user_with_run(&platform, "bob").await;

    let monitor = AdminMonitor::new(admin);
    assert_eq!(monitor.poll_once().await.expect("poll"), 2);
    let rows = monitor.snapshot().await;
    assert_eq!(rows[0].username, "alice");
    assert_eq!(rows[1].username, "bob");
    assert_eq!(rows[0].seconds_remaining, 600);
    assert_eq!(rows[0].clock, "10:00");

    // The server is ground truth: the next poll re-anchors alice's clock.
    platform.set_remaining("alice", 30);
    monitor.poll_once().await.expect("poll");
    let rows = monitor.snapshot().await;
    assert_eq!(rows[0].seconds_remaining, 30);
    assert_eq!(rows[0].clock, "00:30");
}

#[tokio::test]
async fn expired_runs_drop_out_of_the_view() {
    let platform = MockPlatform::spawn().await;
    let admin = admin_client(&platform).await;
    user_with_run(&platform, "alice").await;
    user_with_run(&platform, "bob").await;

    let monitor = AdminMonitor::new(admin);
    monitor.poll_once().await.expect("poll");

    platform.expire_run("bob");
    assert_eq!(monitor.poll_once().await.expect("poll"), 1);
    let rows = monitor.snapshot().await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].username, "alice");
}

#[tokio::test]
async fn recent_submissions_appear_in_rows() {
    let platform = MockPlatform::spawn().await;
    let admin = admin_client(&platform).await;
    let alice = user_with_run(&platform, "alice").await;
    alice.submit("flag{wrong}").await.expect("submit");
    alice.submit("flag{one}").await.expect("submit");

    let monitor = AdminMonitor::new(admin);
    monitor.poll_once().await.expect("poll");
    let rows = monitor.snapshot().await;
    assert_eq!(rows[0].current_level, 2);
    assert_eq!(rows[0].last_submissions.len(), 2);
    // Newest first.
    assert!(rows[0].last_submissions[0].correct);
    assert!(!rows[0].last_submissions[1].correct);
}

#[tokio::test]
async fn approve_action_repolls_immediately() {
    let platform = MockPlatform::spawn().await;
    let admin = admin_client(&platform).await;
    user_with_run(&platform, "alice").await;
    let alice_id = platform.user_id("alice").expect("alice exists");

    let monitor = AdminMonitor::new(admin);
    // The action itself triggers the poll; no explicit poll_once needed.
    let active = monitor.approve(alice_id).await.expect("approve");
    assert_eq!(active, 1);
    assert_eq!(monitor.snapshot().await[0].username, "alice");
}

#[tokio::test]
async fn monitoring_requires_the_admin_role() {
    let platform = MockPlatform::spawn().await;
    let user = user_with_run(&platform, "mallory").await;

    let err = user.monitoring().await.unwrap_err();
    assert!(matches!(
        err,
        ApiError::Forbidden(ForbiddenReason::AdminAccessRequired)
    ));
}
