mod common;

use std::sync::atomic::Ordering;

use altbot_core::Localizer;
use altbot_engine::processor::SEGMENT_SEPARATOR;
use altbot_social::{Attachment, Event, MediaKind, StatusId, Visibility};
use common::*;

fn response(h: &Harness, key: &str) -> String {
    h.catalog.get("en", key, "response")
}

fn segment_count(text: &str) -> usize {
    text.matches(SEGMENT_SEPARATOR).count() + 1
}

#[tokio::test]
async fn author_mention_gets_described_reply() {
    let mut server = mockito::Server::new_async().await;
    let url = serve_png(&mut server, "cat.png").await;

    let ana = account("1", "ana");
    let client = MockClient::new();
    client.add(post("p", &ana, vec![image(&url, "")], None));
    let mention = post("m", &ana, vec![], Some("p"));
    client.add(mention.clone());

    let h = harness(client, MockBackend::new("A green rectangle."), settings());
    h.engine
        .dispatcher
        .handle(Event::Mention {
            account: ana.clone(),
            status: mention,
        })
        .await;

    let replies = h.client.replies();
    assert_eq!(replies.len(), 1);
    let reply = &replies[0];
    assert_eq!(reply.in_reply_to, StatusId::from("m"));
    assert!(reply.text.starts_with("@ana A green rectangle."));
    assert!(reply.text.contains("Gemini"));
    assert!(reply.text.contains("@altbot"));
    assert_eq!(reply.visibility, Visibility::Unlisted);

    let record = h.engine.tracker.get(&StatusId::from("p")).unwrap();
    assert_eq!(record.reply_id, StatusId::from("reply-0"));
}

#[tokio::test]
async fn consent_requested_then_granted() {
    let mut server = mockito::Server::new_async().await;
    let url = serve_png(&mut server, "dog.png").await;

    let ana = account("1", "ana");
    let bo = account("2", "bo");
    let client = MockClient::new();
    client.add(post(
        "p",
        &ana,
        vec![image(&url, "my dog"), image(&url, "")],
        None,
    ));
    let ask = post("m1", &bo, vec![], Some("p"));
    client.add(ask.clone());
    let ask_again = post("m2", &bo, vec![], Some("p"));
    client.add(ask_again.clone());

    let h = harness(client, MockBackend::new("A dog on grass."), settings());

    // Non-author asks: only a consent request goes out.
    h.engine
        .dispatcher
        .handle(Event::Mention {
            account: bo.clone(),
            status: ask,
        })
        .await;
    let replies = h.client.replies();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].in_reply_to, StatusId::from("p"));
    assert!(replies[0].text.starts_with("@ana @bo"));
    assert_eq!(replies[0].visibility, Visibility::Public);
    assert!(h.engine.consent.pending(&StatusId::from("p")).is_some());
    assert_eq!(h.backend.calls.load(Ordering::SeqCst), 0);

    // Asking again while pending changes nothing.
    h.engine
        .dispatcher
        .handle(Event::Mention {
            account: bo.clone(),
            status: ask_again,
        })
        .await;
    assert_eq!(h.client.replies().len(), 1);
    assert_eq!(h.engine.consent.len(), 1);

    // The author answers the request (reply-0).
    let mut answer = post("y", &ana, vec![], Some("reply-0"));
    answer.content = "@altbot yes".into();
    h.client.add(answer.clone());
    h.engine
        .dispatcher
        .handle(Event::Mention {
            account: ana.clone(),
            status: answer,
        })
        .await;

    let replies = h.client.replies();
    assert_eq!(replies.len(), 2);
    let reply = &replies[1];
    assert_eq!(reply.in_reply_to, StatusId::from("y"));
    assert!(reply.text.contains(&response(&h, "imageAlreadyHasAltText")));
    assert!(reply.text.contains("A dog on grass."));
    assert_eq!(segment_count(&reply.text), 2);
    assert!(h.engine.consent.is_empty());
    assert_eq!(h.backend.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn consent_declined_or_answered_by_stranger() {
    let ana = account("1", "ana");
    let bo = account("2", "bo");
    let client = MockClient::new();
    client.add(post(
        "p",
        &ana,
        vec![image("https://cdn.invalid/a.png", "")],
        None,
    ));
    let ask = post("m1", &bo, vec![], Some("p"));
    client.add(ask.clone());

    let h = harness(client, MockBackend::new("unused"), settings());
    h.engine
        .dispatcher
        .handle(Event::Mention {
            account: bo.clone(),
            status: ask,
        })
        .await;
    assert_eq!(h.engine.consent.len(), 1);

    // Someone other than the author says yes: ignored, still pending.
    let mut stranger = post("s", &bo, vec![], Some("reply-0"));
    stranger.content = "@altbot yes".into();
    h.engine
        .dispatcher
        .handle(Event::Mention {
            account: bo.clone(),
            status: stranger,
        })
        .await;
    assert_eq!(h.engine.consent.len(), 1);
    assert_eq!(h.client.replies().len(), 1);

    // The author declines: entry removed, nothing generated.
    let mut answer = post("n", &ana, vec![], Some("reply-0"));
    answer.content = "@altbot no thanks".into();
    h.engine
        .dispatcher
        .handle(Event::Mention {
            account: ana.clone(),
            status: answer,
        })
        .await;
    assert!(h.engine.consent.is_empty());
    assert_eq!(h.client.replies().len(), 1);
    assert_eq!(h.backend.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn oversized_attachment_still_gets_one_reply() {
    let mut server = mockito::Server::new_async().await;
    let small = serve_png(&mut server, "ok.png").await;
    server
        .mock("GET", "/huge.png")
        .with_status(200)
        .with_body(vec![0u8; 4096])
        .create_async()
        .await;
    let huge = format!("{}/huge.png", server.url());

    let ana = account("1", "ana");
    let client = MockClient::new();
    client.add(post(
        "p",
        &ana,
        vec![image(&small, "already"), image(&small, ""), image(&huge, "")],
        None,
    ));
    let mention = post("m", &ana, vec![], Some("p"));
    client.add(mention.clone());

    let mut s = settings();
    s.max_size_bytes = 1024;
    let h = harness(client, MockBackend::new("A small square."), s);
    h.engine
        .dispatcher
        .handle(Event::Mention {
            account: ana.clone(),
            status: mention,
        })
        .await;

    let replies = h.client.replies();
    assert_eq!(replies.len(), 1);
    let body = replies[0].text.strip_prefix("@ana ").unwrap();
    let segments: Vec<&str> = body
        .split("\n\n")
        .next()
        .unwrap()
        .split(SEGMENT_SEPARATOR)
        .collect();
    // Attachment order is preserved.
    assert_eq!(
        segments,
        vec![
            response(&h, "imageAlreadyHasAltText").as_str(),
            "A small square.",
            response(&h, "fileTooLarge").as_str(),
        ]
    );
}

#[tokio::test]
async fn every_undescribed_attachment_gets_a_segment() {
    let mut server = mockito::Server::new_async().await;
    let url = serve_png(&mut server, "x.png").await;

    let ana = account("1", "ana");
    let client = MockClient::new();
    client.add(post(
        "p",
        &ana,
        vec![
            image(&url, ""),
            image(&url, ""),
            image(&url, "one"),
            image(&url, "two"),
        ],
        None,
    ));
    let mention = post("m", &ana, vec![], Some("p"));
    client.add(mention.clone());

    let h = harness(client, MockBackend::new("Green."), settings());
    h.engine
        .dispatcher
        .handle(Event::Mention {
            account: ana.clone(),
            status: mention,
        })
        .await;

    // Two descriptions plus a single "already described" notice.
    let replies = h.client.replies();
    assert_eq!(replies.len(), 1);
    assert_eq!(segment_count(&replies[0].text), 3);
    assert_eq!(replies[0].text.matches("Green.").count(), 2);
}

#[tokio::test]
async fn rate_limit_applies_per_attachment() {
    let mut server = mockito::Server::new_async().await;
    let url = serve_png(&mut server, "r.png").await;

    let ana = account("1", "ana");
    let client = MockClient::new();
    client.add(post("p", &ana, vec![image(&url, ""), image(&url, "")], None));
    let mention = post("m", &ana, vec![], Some("p"));
    client.add(mention.clone());

    let mut s = settings();
    s.max_requests_per_minute = 1;
    let h = harness(client, MockBackend::new("Described."), s);
    h.engine
        .dispatcher
        .handle(Event::Mention {
            account: ana.clone(),
            status: mention,
        })
        .await;

    let text = &h.client.replies()[0].text;
    assert!(text.contains("Described."));
    assert!(text.contains(&response(&h, "rateLimitExceeded")));
    assert_eq!(segment_count(text), 2);
    assert_eq!(h.engine.limiter.count("1"), 1);

    h.engine.limiter.reset_all();
    assert_eq!(h.engine.limiter.count("1"), 0);
}

#[tokio::test]
async fn delete_cascades_even_when_upstream_fails() {
    let mut server = mockito::Server::new_async().await;
    let url = serve_png(&mut server, "d.png").await;

    let ana = account("1", "ana");
    let client = MockClient {
        fail_delete: true,
        ..Default::default()
    };
    client.add(post("p", &ana, vec![image(&url, "")], None));
    let mention = post("m", &ana, vec![], Some("p"));
    client.add(mention.clone());

    let h = harness(client, MockBackend::new("Thing."), settings());
    h.engine
        .dispatcher
        .handle(Event::Mention {
            account: ana.clone(),
            status: mention,
        })
        .await;
    assert_eq!(h.engine.tracker.len(), 1);

    h.engine
        .dispatcher
        .handle(Event::Delete(StatusId::from("p")))
        .await;
    assert_eq!(h.client.deleted(), vec![StatusId::from("reply-0")]);
    assert!(h.engine.tracker.is_empty());

    // Unknown posts are a no-op.
    h.engine
        .dispatcher
        .handle(Event::Delete(StatusId::from("nope")))
        .await;
    assert_eq!(h.client.deleted().len(), 1);
}

#[tokio::test]
async fn failed_publish_is_not_tracked() {
    let mut server = mockito::Server::new_async().await;
    let url = serve_png(&mut server, "f.png").await;

    let ana = account("1", "ana");
    let client = MockClient {
        fail_publish: true,
        ..Default::default()
    };
    client.add(post("p", &ana, vec![image(&url, "")], None));
    let mention = post("m", &ana, vec![], Some("p"));
    client.add(mention.clone());

    let h = harness(client, MockBackend::new("Thing."), settings());
    h.engine
        .dispatcher
        .handle(Event::Mention {
            account: ana.clone(),
            status: mention,
        })
        .await;
    assert!(h.engine.tracker.is_empty());
}

#[tokio::test]
async fn ignored_mentions() {
    let ana = account("1", "ana");
    let mut robot = account("3", "robot");
    robot.bot = true;

    let client = MockClient::new();
    client.add(post("bare", &ana, vec![], None));

    let mut s = settings();
    s.dni.ignore_bots = true;
    let h = harness(client, MockBackend::new("unused"), s);

    // Not a reply.
    h.engine
        .dispatcher
        .handle(Event::Mention {
            account: ana.clone(),
            status: post("m1", &ana, vec![], None),
        })
        .await;
    // Parent without media.
    h.engine
        .dispatcher
        .handle(Event::Mention {
            account: ana.clone(),
            status: post("m2", &ana, vec![], Some("bare")),
        })
        .await;
    // Parent that cannot be fetched.
    h.engine
        .dispatcher
        .handle(Event::Mention {
            account: ana.clone(),
            status: post("m3", &ana, vec![], Some("missing")),
        })
        .await;
    // Bot account.
    h.engine
        .dispatcher
        .handle(Event::Mention {
            account: robot.clone(),
            status: post("m4", &robot, vec![], Some("bare")),
        })
        .await;

    assert!(h.client.replies().is_empty());
    assert!(h.engine.consent.is_empty());
}

#[tokio::test]
async fn timeline_post_replies_to_itself() {
    let mut server = mockito::Server::new_async().await;
    let url = serve_png(&mut server, "u.png").await;

    let bo = account("2", "bo");
    let client = MockClient::new();
    let mut update = post("u", &bo, vec![image(&url, "")], None);
    update.spoiler_text = "lunch".into();
    update.visibility = Visibility::Private;
    client.add(update.clone());

    let h = harness(client, MockBackend::new("A sandwich."), settings());
    h.engine.dispatcher.handle(Event::Update(update)).await;

    let replies = h.client.replies();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].in_reply_to, StatusId::from("u"));
    assert_eq!(replies[0].spoiler_text, "re: lunch");
    assert_eq!(replies[0].visibility, Visibility::Private);
    assert!(replies[0].text.starts_with("@bo A sandwich."));
}

#[tokio::test]
async fn timeline_post_with_alt_text_is_left_alone() {
    let bo = account("2", "bo");
    let altbot = account("0", "altbot");
    let h = harness(MockClient::new(), MockBackend::new("unused"), settings());

    h.engine
        .dispatcher
        .handle(Event::Update(post(
            "u",
            &bo,
            vec![image("https://cdn.invalid/a.png", "written by bo")],
            None,
        )))
        .await;
    h.engine
        .dispatcher
        .handle(Event::Update(post(
            "own",
            &altbot,
            vec![image("https://cdn.invalid/b.png", "")],
            None,
        )))
        .await;
    assert!(h.client.replies().is_empty());
}

#[tokio::test]
async fn time_based_media_depends_on_backend_capability() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/clip.mp4")
        .with_status(200)
        .with_body(b"fake mp4")
        .create_async()
        .await;
    let clip = Attachment {
        kind: MediaKind::Video,
        url: format!("{}/clip.mp4", server.url()),
        description: String::new(),
    };
    let odd = Attachment {
        kind: MediaKind::Unknown,
        url: format!("{}/model.glb", server.url()),
        description: String::new(),
    };

    for media_files in [true, false] {
        let ana = account("1", "ana");
        let client = MockClient::new();
        client.add(post("p", &ana, vec![clip.clone(), odd.clone()], None));
        let mention = post("m", &ana, vec![], Some("p"));
        client.add(mention.clone());

        let mut backend = MockBackend::new("A short clip.");
        backend.media_files = media_files;
        let h = harness(client, backend, settings());
        h.engine
            .dispatcher
            .handle(Event::Mention {
                account: ana.clone(),
                status: mention,
            })
            .await;

        let text = &h.client.replies()[0].text;
        if media_files {
            assert!(text.contains("A short clip."));
            assert!(text.contains(&response(&h, "unsupportedFile")));
        } else {
            assert_eq!(text.matches(&response(&h, "altTextError")).count(), 2);
            assert_eq!(h.backend.calls.load(Ordering::SeqCst), 0);
        }
    }
}

#[tokio::test]
async fn follow_back_when_enabled() {
    let bo = account("2", "bo");

    let mut s = settings();
    s.follow_back = true;
    let h = harness(MockClient::new(), MockBackend::new("unused"), s);
    h.engine
        .dispatcher
        .handle(Event::Follow {
            account: bo.clone(),
        })
        .await;
    assert_eq!(h.client.followed.lock().unwrap().len(), 1);

    let h = harness(MockClient::new(), MockBackend::new("unused"), settings());
    h.engine
        .dispatcher
        .handle(Event::Follow { account: bo })
        .await;
    assert!(h.client.followed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn failed_consent_request_is_not_left_pending() {
    let ana = account("1", "ana");
    let bo = account("2", "bo");
    let client = MockClient {
        fail_publish: true,
        ..Default::default()
    };
    client.add(post("p", &ana, vec![image("https://media.example/x.png", "")], None));
    let ask = post("m1", &bo, vec![], Some("p"));
    client.add(ask.clone());

    let h = harness(client, MockBackend::new("unused"), settings());
    for _ in 0..2 {
        h.engine
            .dispatcher
            .handle(Event::Mention {
                account: bo.clone(),
                status: ask.clone(),
            })
            .await;
        assert!(h.engine.consent.pending(&StatusId::from("p")).is_none());
        assert!(h.engine.consent.is_empty());
    }
    assert!(h.client.replies().is_empty());
    assert_eq!(h.backend.calls.load(Ordering::SeqCst), 0);
}
