//! E2E federation scenarios: post lifecycle fan-out and signed delivery

mod common;

use std::time::Duration;

use blogfed::data::Post;
use blogfed::federation::verify_signature;
use chrono::Utc;
use common::{BLOG_IRI, MockRemote, TestServer};

fn published_post() -> Post {
    Post {
        path: "/posts/42".to_string(),
        blog: "main".to_string(),
        section: "posts".to_string(),
        title: Some("Hello".to_string()),
        content: "<p>Hello from the blog</p>".to_string(),
        published: Some(Utc::now()),
        updated: None,
        in_reply_to: None,
    }
}

async fn add_followers(server: &TestServer, remote: &MockRemote, names: &[&str]) {
    for name in names {
        server
            .state
            .db
            .upsert_follower("main", &remote.actor(name), &remote.inbox(name))
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_unpublished_post_never_triggers_delivery() {
    let server = TestServer::new().await;
    let remote = MockRemote::start().await;
    add_followers(&server, &remote, &["alice"]).await;

    let mut draft = published_post();
    draft.published = None;

    assert_eq!(server.state.publisher.post_created(&draft).await.unwrap(), 0);
    assert_eq!(server.state.publisher.post_updated(&draft).await.unwrap(), 0);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(remote.received().is_empty());
}

#[tokio::test]
async fn test_failing_inbox_does_not_affect_other_followers() {
    let server = TestServer::new().await;
    let remote = MockRemote::start().await;
    add_followers(&server, &remote, &["alice", "broken", "carol"]).await;

    let dispatched = server
        .state
        .publisher
        .post_created(&published_post())
        .await
        .unwrap();
    assert_eq!(dispatched, 3);

    let received = remote.wait_for(3).await;
    assert_eq!(received.len(), 3);
    assert_eq!(remote.received_at("alice").len(), 1);
    assert_eq!(remote.received_at("carol").len(), 1);
    assert_eq!(remote.received_at("broken").len(), 1);

    for request in received {
        let activity = request.json();
        assert_eq!(activity["type"], "Create");
        assert_eq!(activity["id"], "https://test.example.com/posts/42");
    }
}

#[tokio::test]
async fn test_delivered_activity_round_trips_and_verifies() {
    let server = TestServer::new().await;
    let remote = MockRemote::start().await;
    add_followers(&server, &remote, &["alice"]).await;

    server
        .state
        .publisher
        .post_updated(&published_post())
        .await
        .unwrap();

    let received = remote.wait_for(1).await;
    assert_eq!(received.len(), 1);
    let request = &received[0];

    let activity = request.json();
    assert_eq!(activity["type"], "Update");
    assert_eq!(activity["id"], "https://test.example.com/posts/42");
    assert_eq!(activity["actor"], BLOG_IRI);
    assert_eq!(activity["object"]["id"], "https://test.example.com/posts/42");
    assert_eq!(activity["object"]["type"], "Note");

    assert_eq!(
        request.headers.get("content-type").unwrap(),
        "application/activity+json; charset=utf-8"
    );
    assert_eq!(request.headers.get("user-agent").unwrap(), "blogfed");

    let public_key_pem = server
        .state
        .signer
        .as_ref()
        .expect("federation enabled")
        .public_key_pem()
        .unwrap();
    let result = verify_signature(
        "POST",
        &request.path,
        &request.headers,
        Some(&request.body[..]),
        &public_key_pem,
    );
    assert!(result.is_ok(), "delivery signature should verify: {result:?}");
}

#[tokio::test]
async fn test_delete_reaches_followers_with_tombstone() {
    let server = TestServer::new().await;
    let remote = MockRemote::start().await;
    add_followers(&server, &remote, &["alice"]).await;

    let dispatched = server
        .state
        .publisher
        .post_deleted(&published_post())
        .await
        .unwrap();
    assert_eq!(dispatched, 1);

    let received = remote.wait_for(1).await;
    let activity = received[0].json();
    assert_eq!(activity["type"], "Delete");
    assert_eq!(activity["id"], "https://test.example.com/posts/42#delete");
    assert_eq!(activity["object"]["type"], "Tombstone");
}

#[tokio::test]
async fn test_follow_then_publish_reaches_new_follower() {
    let server = TestServer::new().await;
    let remote = MockRemote::start().await;

    server
        .post_activity(
            "main",
            &serde_json::json!({
                "type": "Follow",
                "actor": remote.actor("dave"),
                "object": BLOG_IRI
            }),
        )
        .await;
    // The Accept
    assert_eq!(remote.received_at("dave").len(), 1);

    server
        .state
        .publisher
        .post_created(&published_post())
        .await
        .unwrap();

    let received = remote.wait_for(2).await;
    assert_eq!(received.len(), 2);
    assert_eq!(received[1].json()["type"], "Create");
}
