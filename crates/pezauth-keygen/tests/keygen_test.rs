//! Integration tests for reservation keys, against a scripted executor
//! and against the in-memory store.

use std::sync::Mutex;
use std::time::Duration;

use bytes::Bytes;

use pezauth_keygen::{
    Command, CommandExecutor, Guid, GuidMaker, KeyGen, KeyGenError, MemoryStore, Reply,
    UuidGuidMaker,
};

#[derive(Debug, PartialEq, thiserror::Error)]
#[error("Failure calling doer")]
struct DoerFailure;

/// Answers KEYS with the user's single key and HMGET with
/// `[guid, details]`, or fails, or returns nil.
#[derive(Default)]
struct MockDoer {
    fail: bool,
    nil_response: bool,
    guid: String,
    details: String,
    commands: Mutex<Vec<&'static str>>,
}

impl MockDoer {
    fn new(guid: &str) -> Self {
        Self {
            guid: guid.into(),
            details: r#""active":  true,"details": "put somethings here""#.into(),
            ..Default::default()
        }
    }

    fn commands(&self) -> Vec<&'static str> {
        self.commands.lock().unwrap().clone()
    }
}

impl CommandExecutor for MockDoer {
    type Error = DoerFailure;

    async fn execute(&self, command: Command) -> Result<Reply, DoerFailure> {
        self.commands.lock().unwrap().push(command.name());

        if self.fail {
            return Err(DoerFailure);
        }
        if self.nil_response {
            return Ok(Reply::Nil);
        }
        match command {
            Command::Keys { pattern } => {
                let prefix = pattern.trim_end_matches('*');
                Ok(Reply::Array(vec![Reply::bulk(format!("{prefix}{}", self.guid))]))
            }
            Command::HmGet { .. } => Ok(Reply::Array(vec![
                Reply::bulk(self.guid.clone()),
                Reply::bulk(self.details.clone()),
            ])),
            _ => Ok(Reply::Status("OK".into())),
        }
    }
}

struct MockGuidMaker {
    guid: Guid,
}

impl GuidMaker for MockGuidMaker {
    fn create(&self) -> Guid {
        self.guid.clone()
    }
}

fn keygen(doer: MockDoer) -> KeyGen<MockDoer, MockGuidMaker> {
    KeyGen::new(
        doer,
        MockGuidMaker {
            guid: Guid::new("session", "abc-123"),
        },
    )
}

// -----------------------------------------------------------------------
// Scripted executor
// -----------------------------------------------------------------------

#[tokio::test]
async fn create_returns_guid_without_prefix() {
    let keys = keygen(MockDoer::new("abc-123"));

    let guid = keys.create("alice@pivotal.io", "allocating").await.unwrap();

    assert_eq!(guid, "abc-123");
    assert_eq!(keys.executor().commands(), vec!["HMSET"]);
}

#[tokio::test]
async fn create_with_ttl_sets_expiry() {
    let keys = keygen(MockDoer::new("abc-123")).with_ttl(Duration::from_secs(600));

    keys.create("alice@pivotal.io", "allocating").await.unwrap();

    assert_eq!(keys.executor().commands(), vec!["HMSET", "EXPIRE"]);
}

#[tokio::test]
async fn create_propagates_executor_failure() {
    let keys = keygen(MockDoer {
        fail: true,
        ..MockDoer::new("abc-123")
    });

    let err = keys.create("alice@pivotal.io", "").await.unwrap_err();

    assert_eq!(err.executor_error::<DoerFailure>(), Some(&DoerFailure));
}

#[tokio::test]
async fn nil_reply_is_not_found_without_error() {
    let keys = keygen(MockDoer {
        nil_response: true,
        ..MockDoer::new("abc-123")
    });

    assert_eq!(keys.get("alice@pivotal.io").await.unwrap(), None);
    assert!(!keys.exists("alice@pivotal.io").await.unwrap());
}

#[tokio::test]
async fn reply_details_expose_active_flag() {
    let keys = keygen(MockDoer::new("abc-123"));

    let reservation = keys.get("alice@pivotal.io").await.unwrap().unwrap();

    assert_eq!(reservation.guid, "abc-123");
    assert!(reservation.active);
    assert_eq!(reservation.details, "put somethings here");
    assert_eq!(keys.executor().commands(), vec!["KEYS", "HMGET"]);
}

#[tokio::test]
async fn inactive_details_do_not_count_as_existing() {
    let keys = keygen(MockDoer {
        details: r#"{"active": false, "details": "released"}"#.into(),
        ..MockDoer::new("abc-123")
    });

    assert!(!keys.exists("alice@pivotal.io").await.unwrap());
}

#[tokio::test]
async fn lookup_propagates_executor_failure() {
    let keys = keygen(MockDoer {
        fail: true,
        ..MockDoer::new("abc-123")
    });

    let err = keys.get("alice@pivotal.io").await.unwrap_err();

    assert!(matches!(err, KeyGenError::Executor(_)));
    assert_eq!(err.to_string(), "Failure calling doer");
}

// -----------------------------------------------------------------------
// In-memory store
// -----------------------------------------------------------------------

fn memory_keygen() -> KeyGen<MemoryStore, UuidGuidMaker> {
    KeyGen::new(MemoryStore::new(), UuidGuidMaker::default())
}

#[tokio::test]
async fn created_reservation_reads_back() {
    let keys = memory_keygen();

    let guid = keys.create("alice@pivotal.io", "org allocation").await.unwrap();
    let reservation = keys.get("alice@pivotal.io").await.unwrap().unwrap();

    assert_eq!(reservation.guid, guid);
    assert_eq!(reservation.key, format!("alice@pivotal.io:{guid}"));
    assert!(reservation.active);
    assert_eq!(reservation.details, "org allocation");
    assert!(keys.exists("alice@pivotal.io").await.unwrap());
}

#[tokio::test]
async fn reservations_are_scoped_per_user() {
    let keys = memory_keygen();

    keys.create("alice@pivotal.io.evil", "").await.unwrap();

    assert_eq!(keys.get("alice@pivotal.io").await.unwrap(), None);
    assert!(keys.exists("alice@pivotal.io.evil").await.unwrap());
}

#[tokio::test]
async fn delete_removes_all_user_reservations() {
    let keys = memory_keygen();
    keys.create("alice@pivotal.io", "first").await.unwrap();
    keys.create("alice@pivotal.io", "second").await.unwrap();
    keys.create("bob@pivotal.io", "other").await.unwrap();

    assert_eq!(keys.delete("alice@pivotal.io").await.unwrap(), 2);
    assert_eq!(keys.delete("alice@pivotal.io").await.unwrap(), 0);

    assert_eq!(keys.get("alice@pivotal.io").await.unwrap(), None);
    assert!(keys.exists("bob@pivotal.io").await.unwrap());
}

#[tokio::test]
async fn reservation_expires_after_ttl() {
    let keys = memory_keygen().with_ttl(Duration::from_millis(20));

    keys.create("alice@pivotal.io", "").await.unwrap();
    assert!(keys.exists("alice@pivotal.io").await.unwrap());

    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(!keys.exists("alice@pivotal.io").await.unwrap());
    assert!(keys.executor().is_empty().await);
}

#[tokio::test]
async fn release_removes_only_the_named_reservation() {
    let keys = memory_keygen();
    let peer = keys.create("alice@pivotal.io", "peer").await.unwrap();
    let mine = keys.create("alice@pivotal.io", "mine").await.unwrap();

    assert!(keys.release("alice@pivotal.io", &mine).await.unwrap());
    assert!(!keys.release("alice@pivotal.io", &mine).await.unwrap());

    let left = keys.get("alice@pivotal.io").await.unwrap().unwrap();
    assert_eq!(left.guid, peer);
    assert_eq!(left.details, "peer");
}

#[tokio::test]
async fn lookup_prefers_an_active_reservation() {
    let keys = memory_keygen();
    // Lowest key in sort order holds an inactive state.
    keys.executor()
        .execute(Command::HmSet {
            key: "alice@pivotal.io:0000".into(),
            fields: vec![
                ("guid".into(), Bytes::from_static(b"0000")),
                (
                    "state".into(),
                    Bytes::from_static(br#"{"active": false, "details": "done"}"#),
                ),
            ],
        })
        .await
        .unwrap();
    let active = keys.create("alice@pivotal.io", "in flight").await.unwrap();

    let reservation = keys.get("alice@pivotal.io").await.unwrap().unwrap();

    assert_eq!(reservation.guid, active);
    assert!(keys.exists("alice@pivotal.io").await.unwrap());
}

#[tokio::test]
async fn lookup_falls_back_to_an_inactive_reservation() {
    let keys = memory_keygen();
    keys.executor()
        .execute(Command::HmSet {
            key: "alice@pivotal.io:0000".into(),
            fields: vec![
                ("guid".into(), Bytes::from_static(b"0000")),
                ("state".into(), Bytes::from_static(br#"{"active": false}"#)),
            ],
        })
        .await
        .unwrap();

    let reservation = keys.get("alice@pivotal.io").await.unwrap().unwrap();

    assert_eq!(reservation.guid, "0000");
    assert!(!reservation.active);
    assert!(!keys.exists("alice@pivotal.io").await.unwrap());
}

#[tokio::test]
async fn usernames_sharing_a_prefix_do_not_collide() {
    let keys = memory_keygen();
    keys.create("a", "short").await.unwrap();
    let other = keys.create("a:b", "long").await.unwrap();

    assert_eq!(keys.delete("a").await.unwrap(), 1);

    assert_eq!(keys.get("a").await.unwrap(), None);
    assert_eq!(keys.get("a:b").await.unwrap().unwrap().guid, other);
}
