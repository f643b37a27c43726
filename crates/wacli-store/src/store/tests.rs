use crate::types::{GroupParticipant, MessageUpsert, SearchMessagesParams};
use crate::Store;
use wacli_core::entities::{ChatKind, GroupRole};

async fn open_store() -> (Store, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(dir.path()).await.unwrap();
    (store, dir)
}

#[tokio::test]
async fn chat_upsert_widens_name_and_advances_last_ts() {
    let (store, _dir) = open_store().await;

    store.upsert_chat("a@s", ChatKind::Dm, "", 10).await.unwrap();
    store.upsert_chat("a@s", ChatKind::Dm, "Alice", 5).await.unwrap();

    let chat = store.get_chat("a@s").await.unwrap();
    assert_eq!(chat.name, "Alice");
    assert_eq!(chat.last_message_ts, 10, "last_ts must never regress");

    store.upsert_chat("a@s", ChatKind::Dm, "", 20).await.unwrap();
    let chat = store.get_chat("a@s").await.unwrap();
    assert_eq!(chat.name, "Alice", "empty name must not overwrite existing");
    assert_eq!(chat.last_message_ts, 20);
}

#[tokio::test]
async fn contact_upsert_is_idempotent_and_order_independent() {
    let (store, _dir) = open_store().await;

    store
        .upsert_contact("b@s", "123", "Bee", "", "", "", 1)
        .await
        .unwrap();
    store
        .upsert_contact("b@s", "", "", "Beatrice Full", "", "", 2)
        .await
        .unwrap();
    store
        .upsert_contact("b@s", "123", "Bee", "", "", "", 1)
        .await
        .unwrap();

    let contact = store.get_contact("b@s").await.unwrap();
    assert_eq!(contact.phone, "123");
    assert_eq!(contact.push_name, "Bee");
    assert_eq!(contact.full_name, "Beatrice Full");
    assert_eq!(contact.display_name(), "Beatrice Full");
    assert_eq!(contact.updated_at, 2);
}

#[tokio::test]
async fn group_participant_replacement_is_atomic() {
    let (store, _dir) = open_store().await;

    store
        .upsert_group("g@g.us", "Crew", "owner@s", 1, 1)
        .await
        .unwrap();

    let initial = vec![GroupParticipant {
        group_jid: "g@g.us".into(),
        user_jid: "alice@s".into(),
        role: GroupRole::Member,
        updated_at: 1,
    }];
    store
        .replace_group_participants("g@g.us", &initial)
        .await
        .unwrap();

    let replacement = vec![
        GroupParticipant {
            group_jid: "g@g.us".into(),
            user_jid: "bob@s".into(),
            role: GroupRole::Admin,
            updated_at: 2,
        },
        GroupParticipant {
            group_jid: "g@g.us".into(),
            user_jid: "carol@s".into(),
            role: GroupRole::Member,
            updated_at: 2,
        },
    ];
    store
        .replace_group_participants("g@g.us", &replacement)
        .await
        .unwrap();

    let participants = store.get_group_participants("g@g.us").await.unwrap();
    assert_eq!(participants.len(), 2);
    assert!(participants.iter().all(|p| p.user_jid != "alice@s"));
}

#[tokio::test]
async fn fts_stays_in_sync_with_messages_when_available() {
    let (store, _dir) = open_store().await;
    if !store.has_fts() {
        // sqlite build lacks FTS5; the LIKE fallback path is covered
        // separately and the sync invariant is vacuous here.
        return;
    }

    store.upsert_chat("c@s", ChatKind::Dm, "Carl", 1).await.unwrap();

    let msg = MessageUpsert {
        chat_jid: "c@s".into(),
        msg_id: "m1".into(),
        timestamp: Some(1),
        text: Some("hello world".into()),
        ..Default::default()
    };
    store.upsert_message(&msg).await.unwrap();

    let results = store
        .search_messages(&SearchMessagesParams {
            query: "hello".into(),
            limit: 10,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].msg_id, "m1");

    sqlx::query("DELETE FROM messages WHERE chat_jid = 'c@s' AND msg_id = 'm1'")
        .execute(store.pool())
        .await
        .unwrap();

    let results = store
        .search_messages(&SearchMessagesParams {
            query: "hello".into(),
            limit: 10,
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(results.is_empty(), "fts index must drop deleted rows");
}

#[tokio::test]
async fn empty_search_query_is_invalid_argument() {
    let (store, _dir) = open_store().await;

    let err = store
        .search_messages(&SearchMessagesParams {
            query: "".into(),
            limit: 10,
            ..Default::default()
        })
        .await
        .unwrap_err();

    assert!(matches!(err, wacli_core::error::WacliError::InvalidArgument(_)));

    let err = store.search_contacts("", 10).await.unwrap_err();
    assert!(matches!(err, wacli_core::error::WacliError::InvalidArgument(_)));
}

#[tokio::test]
async fn get_chat_and_get_group_not_found() {
    let (store, _dir) = open_store().await;

    assert!(matches!(
        store.get_chat("missing@s").await.unwrap_err(),
        wacli_core::error::WacliError::NotFound(_)
    ));
    assert!(matches!(
        store.get_group("missing@g.us").await.unwrap_err(),
        wacli_core::error::WacliError::NotFound(_)
    ));
}
