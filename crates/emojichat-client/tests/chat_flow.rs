//! End-to-end flows between controllers sharing one store.

use emojichat_client::commands::{dispatch, Command, Reply};
use emojichat_client::controller::{ControllerError, RoomUpdate};
use emojichat_client::{ClientConfig, RoomController, RoomMode, SessionContext, SessionState};
use emojichat_shared::protocol::{MessageRecord, PresenceRecord, UserProfile};
use emojichat_shared::{Codec, PresenceStatus, RoomToken, UserId};
use emojichat_store::{CollectionPath, Database, DocumentId, LocalStore, RealtimeStore};

fn client(store: &LocalStore) -> RoomController<LocalStore> {
    RoomController::new(
        SessionContext::new(UserId::anonymous(), store.clone()),
        RoomMode::Multi,
    )
}

fn room1() -> RoomToken {
    RoomToken::parse("ROOM1").unwrap()
}

#[tokio::test]
async fn message_reaches_other_subscriber() {
    let store = LocalStore::in_memory();

    let mut b = client(&store);
    b.save_nickname("bob").await.unwrap();
    b.join("ROOM1").await.unwrap();
    b.sync();
    assert!(b.timeline().is_empty());

    let mut a = client(&store);
    a.save_nickname("alice").await.unwrap();
    a.join("ROOM1").await.unwrap();
    a.send("💰💎").await.unwrap();

    // Raw store view: one record, body encoded with the room key.
    let mut sub = store
        .subscribe(&CollectionPath::room_messages(&room1()))
        .unwrap();
    let snapshot = sub.recv().await.unwrap();
    assert_eq!(snapshot.len(), 1);
    let record: MessageRecord = snapshot.documents[0].parse().unwrap();
    let token = record.body().unwrap();
    assert_ne!(token, "💰💎");
    assert_eq!(Codec::for_room(&room1()).decode(token), "💰💎");
    assert_eq!(record.user_nickname, "alice");
    assert!(record.timestamp.is_some());

    b.sync();
    let entries = b.timeline().entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].content, "💰💎");
    assert_eq!(entries[0].nickname, "alice");
    assert_eq!(&entries[0].user_id, a.user_id());
}

#[tokio::test]
async fn snapshots_arrive_through_next_update() {
    let store = LocalStore::in_memory();
    let mut b = client(&store);
    b.save_nickname("bob").await.unwrap();
    b.join("ROOM1").await.unwrap();
    b.sync();

    let mut a = client(&store);
    a.save_nickname("alice").await.unwrap();
    a.join("ROOM1").await.unwrap();
    a.send("🚀").await.unwrap();

    loop {
        match b.next_update().await {
            RoomUpdate::Messages(snapshot) => {
                b.apply(RoomUpdate::Messages(snapshot));
                break;
            }
            other => {
                b.apply(other);
            }
        }
    }
    assert_eq!(b.timeline().entries()[0].content, "🚀");
}

#[tokio::test]
async fn nickname_validation_and_trimming() {
    let store = LocalStore::in_memory();
    let mut c = client(&store);

    let err = c.save_nickname("x").await.unwrap_err();
    assert!(matches!(err, ControllerError::Validation(_)));
    assert_eq!(err.to_string(), "Nickname must be 2+ characters!");
    assert_eq!(c.state(), SessionState::Unidentified);

    c.save_nickname(" ab ").await.unwrap();
    assert_eq!(c.nickname().unwrap().as_str(), "ab");

    let doc = store
        .get(&CollectionPath::users(), &DocumentId(c.user_id().0.clone()))
        .await
        .unwrap()
        .unwrap();
    let profile: UserProfile = doc.parse().unwrap();
    assert_eq!(profile.nickname, "ab");
    assert!(profile.last_update.is_some());
}

#[tokio::test]
async fn away_status_merges_into_one_record() {
    let store = LocalStore::in_memory();
    let mut c = client(&store);
    c.save_nickname("whale").await.unwrap();
    c.join("ROOM1").await.unwrap();

    c.set_status(PresenceStatus::Away).await.unwrap();

    let mut sub = store
        .subscribe(&CollectionPath::room_presence(&room1()))
        .unwrap();
    let snapshot = sub.recv().await.unwrap();
    let mine: Vec<_> = snapshot
        .documents
        .iter()
        .filter(|doc| doc.id.as_str() == c.user_id().as_str())
        .collect();
    assert_eq!(mine.len(), 1);

    let record: PresenceRecord = mine[0].parse().unwrap();
    assert_eq!(record.status, PresenceStatus::Away);
    assert_eq!(record.nickname, "whale");
    assert!(record.last_seen.is_some());

    c.sync();
    let entry = c.roster().get(c.user_id()).unwrap();
    assert_eq!(entry.status, PresenceStatus::Away);
}

#[tokio::test]
async fn failed_write_keeps_draft() {
    let store = LocalStore::in_memory();
    let mut c = client(&store);
    c.save_nickname("whale").await.unwrap();
    c.join("ROOM1").await.unwrap();
    c.sync();

    c.set_draft("🔥🔥");
    store.set_offline(true);
    let err = c.send_draft().await.unwrap_err();
    assert!(matches!(err, ControllerError::Store(_)));
    assert!(!err.is_validation());
    assert_eq!(c.draft(), "🔥🔥");
    assert!(c.timeline().is_empty());

    store.set_offline(false);
    c.send_draft().await.unwrap();
    assert_eq!(c.draft(), "");
}

#[tokio::test]
async fn typed_line_after_failed_send_is_sent_alone() {
    let store = LocalStore::in_memory();
    let config = ClientConfig::default();
    let mut c = client(&store);
    c.save_nickname("whale").await.unwrap();
    c.join("ROOM1").await.unwrap();
    c.sync();

    store.set_offline(true);
    let reply = dispatch(&mut c, Command::Say("🔥🔥".into()), &config).await;
    assert!(matches!(reply, Reply::Notice(ref n) if n.is_error()));
    assert_eq!(c.draft(), "🔥🔥");
    store.set_offline(false);

    // A rejected line leaves the kept draft alone.
    let reply = dispatch(&mut c, Command::Say("hello".into()), &config).await;
    assert!(matches!(reply, Reply::Notice(ref n) if n.is_error()));
    assert_eq!(c.draft(), "🔥🔥");

    let reply = dispatch(&mut c, Command::Say("🚀".into()), &config).await;
    assert_eq!(reply, Reply::Nothing);
    c.sync();
    let contents: Vec<_> = c.timeline().entries().iter().map(|e| e.content.as_str()).collect();
    assert_eq!(contents, ["🚀"]);
    assert_eq!(c.draft(), "🔥🔥");

    let reply = dispatch(&mut c, Command::Send, &config).await;
    assert_eq!(reply, Reply::Nothing);
    c.sync();
    let contents: Vec<_> = c.timeline().entries().iter().map(|e| e.content.as_str()).collect();
    assert_eq!(contents, ["🚀", "🔥🔥"]);
    assert_eq!(c.draft(), "");
}

#[tokio::test]
async fn failed_join_keeps_current_room() {
    let store = LocalStore::in_memory();
    let mut c = client(&store);
    c.save_nickname("whale").await.unwrap();
    c.join("ROOM1").await.unwrap();
    c.send("🚀").await.unwrap();
    c.sync();
    assert_eq!(c.timeline().len(), 1);

    store.set_offline(true);
    let err = c.join("ROOM2").await.unwrap_err();
    assert!(matches!(err, ControllerError::Store(_)));
    assert_eq!(c.room(), Some(&room1()));
    assert_eq!(c.state(), SessionState::InRoom);
    assert_eq!(c.timeline().len(), 1);
    assert_eq!(store.listener_count(), 2);

    store.set_offline(false);
    c.send("🔥").await.unwrap();
    c.sync();
    assert_eq!(c.timeline().len(), 2);
}

#[tokio::test]
async fn leave_cancels_both_subscriptions() {
    let store = LocalStore::in_memory();
    let mut c = client(&store);
    c.save_nickname("whale").await.unwrap();
    c.join("ROOM1").await.unwrap();
    assert_eq!(store.listener_count(), 2);

    c.leave().await.unwrap();
    assert_eq!(store.listener_count(), 0);
    assert!(c.timeline().is_empty());
    assert!(c.roster().is_empty());

    let doc = store
        .get(
            &CollectionPath::room_presence(&room1()),
            &DocumentId(c.user_id().0.clone()),
        )
        .await
        .unwrap()
        .unwrap();
    let record: PresenceRecord = doc.parse().unwrap();
    assert_eq!(record.status, PresenceStatus::Offline);
}

#[tokio::test]
async fn dropping_controller_cancels_subscriptions() {
    let store = LocalStore::in_memory();
    let mut c = client(&store);
    c.save_nickname("whale").await.unwrap();
    c.join("ROOM1").await.unwrap();
    assert_eq!(store.listener_count(), 2);

    drop(c);
    assert_eq!(store.listener_count(), 0);
}

#[tokio::test]
async fn two_processes_chat_over_one_database() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("chat.db");
    let store_a = LocalStore::with_database(Database::open_at(&file).unwrap()).unwrap();
    let store_b = LocalStore::with_database(Database::open_at(&file).unwrap()).unwrap();

    let mut b = client(&store_b);
    b.save_nickname("bob").await.unwrap();
    b.join("ROOM1").await.unwrap();
    b.sync();

    let mut a = client(&store_a);
    a.save_nickname("alice").await.unwrap();
    a.join("ROOM1").await.unwrap();
    a.send("🐳").await.unwrap();

    assert!(store_b.poll_external_changes().unwrap());
    b.sync();
    assert_eq!(b.timeline().len(), 1);
    assert_eq!(b.timeline().entries()[0].content, "🐳");
    assert_eq!(b.roster().len(), 2);
}
