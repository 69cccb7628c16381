//! End-to-end tests for the role administration commands.
//!
//! Every test drives a [`CommandRouter`] built from [`Settings`] over an
//! in-memory store and notifier, the way a bot would at startup.
//!
//! Scenario (root = U1):
//! 1. U1 grants admin to U2
//! 2. U2 grants admin to U3
//! 3. U2 revokes admin from U4, who never had it
//! 4. U5 asks who has admin and is denied; U1, U2 and U3 are alerted

use async_trait::async_trait;
use std::sync::Arc;
use warden_commands::{
    CommandRouter, ConfigError, Dispatched, GuardOutcome, Message, RouterError, Settings,
    DENIAL_REPLY, ROOT_ENV,
};
use warden_notify::{MemoryNotifier, DENIAL_TITLE};
use warden_rbac::{Principal, RbacError};
use warden_store::{CasOutcome, Entry, KeyValueStore, MemoryStore, StoreError, StoreResult, StoreStats};

/// Test fixture wiring a router to inspectable backends.
struct TestFixture {
    /// Shared role storage.
    backend: MemoryStore,
    /// Direct message transport.
    notifier: MemoryNotifier,
    /// Router under test.
    router: CommandRouter,
}

impl TestFixture {
    /// Create a fixture with `root` as the root principal.
    async fn new(root: &str) -> Self {
        let settings = Settings::from_lookup(|key| (key == ROOT_ENV).then(|| root.to_string()))
            .expect("root is configured");
        let backend = MemoryStore::new();
        let notifier = MemoryNotifier::new();
        let router = CommandRouter::from_settings(
            &settings,
            Arc::new(backend.clone()),
            Arc::new(notifier.clone()),
        )
        .await
        .expect("router builds");

        Self {
            backend,
            notifier,
            router,
        }
    }

    /// Send `text` as `sender` and return the dispatch result.
    async fn say(&self, sender: &str, text: &str) -> Dispatched {
        let message = Message::new(principal(sender), text);
        self.router
            .dispatch(&message)
            .await
            .expect("dispatch succeeds")
            .expect("a command matches")
    }
}

fn principal(id: &str) -> Principal {
    Principal::new(id).expect("valid principal")
}

#[tokio::test]
async fn test_admin_delegation_scenario() {
    let fixture = TestFixture::new("U1").await;

    let step = fixture.say("U1", "grant role admin to <@U2>").await;
    assert!(step.outcome.is_allowed());
    assert_eq!(step.outcome.reply().text, "Role `admin` has been granted to <@U2>");

    let step = fixture.say("U2", "grant role admin to <@U3>").await;
    assert_eq!(step.outcome.reply().text, "Role `admin` has been granted to <@U3>");

    let step = fixture.say("U2", "revoke role admin from <@U4>").await;
    assert_eq!(step.outcome.reply().text, "User <@U4> does not have role `admin`");

    let stored = fixture.backend.get("rbac:role:admin").await.unwrap().unwrap();
    let members: Vec<String> = serde_json::from_slice(&stored.value).unwrap();
    assert_eq!(members, vec!["U2", "U3"]);

    let step = fixture.say("U5", "who has role admin").await;
    assert_eq!(step.command, "who_has_role");
    match step.outcome {
        GuardOutcome::Denied { reply, alerts } => {
            assert_eq!(reply.text, DENIAL_REPLY);
            assert!(reply.is_ephemeral());
            let report = alerts.report().await;
            assert_eq!(report.delivered, vec![principal("U1"), principal("U2"), principal("U3")]);
            assert!(report.failed.is_empty());
        }
        other => panic!("expected denial, got {:?}", other),
    }

    for admin in ["U1", "U2", "U3"] {
        let alerts = fixture.notifier.sent_to(&principal(admin)).await;
        assert_eq!(alerts.len(), 1, "one alert for {}", admin);
        assert_eq!(alerts[0].title, DENIAL_TITLE);
        assert_eq!(alerts[0].color, "#ff0000");
        assert_eq!(
            alerts[0].body,
            "User <@U5> tried to execute the following command:```who has role admin``` \
             but lacks _one_ of these roles: `root`, `admin`"
        );
    }
    assert!(fixture.notifier.sent_to(&principal("U5")).await.is_empty());
}

#[tokio::test]
async fn test_revoked_admin_loses_access() {
    let fixture = TestFixture::new("U1").await;
    fixture.say("U1", "grant role admin to <@U2>").await;

    let step = fixture.say("U1", "revoke role admin from <@U2>").await;
    assert_eq!(step.outcome.reply().text, "Role `admin` has been revoked from <@U2>");

    let step = fixture.say("U2", "grant role admin to <@U9>").await;
    assert!(!step.outcome.is_allowed());

    let who = fixture.say("U1", "who has role admin").await;
    assert_eq!(who.outcome.reply().text, "No one has been assigned role `admin`");
}

#[tokio::test]
async fn test_root_cannot_be_changed_at_runtime() {
    let fixture = TestFixture::new("U1").await;

    let step = fixture.say("U1", "grant role root to <@U2>").await;
    assert_eq!(
        step.outcome.reply().text,
        "Sorry, role `root` can only be granted via static configuration"
    );

    let step = fixture.say("U1", "revoke role root from <@U1>").await;
    assert_eq!(
        step.outcome.reply().text,
        "Sorry, role `root` can only be revoked via static configuration"
    );

    let who = fixture.say("U1", "who has role root").await;
    assert_eq!(who.outcome.reply().text, "Role `root` has been granted to <@U1>");
    assert!(fixture.backend.is_empty().await);
}

#[tokio::test]
async fn test_admin_can_manage_other_roles() {
    let fixture = TestFixture::new("U1").await;
    fixture.say("U1", "grant role admin to <@U2>").await;

    fixture.say("U2", "grant role deployer to <@U6>").await;
    let again = fixture.say("U2", "grant role deployer to <@U6>").await;
    assert_eq!(again.outcome.reply().text, "Role `deployer` has been granted to <@U6>");

    let who = fixture.say("U2", "who has role deployer").await;
    assert_eq!(who.outcome.reply().text, "Role `deployer` has been granted to <@U6>");
}

#[tokio::test]
async fn test_denied_mutation_leaves_storage_untouched() {
    let fixture = TestFixture::new("U1").await;

    let step = fixture.say("U5", "grant role admin to <@U5>").await;
    assert!(!step.outcome.is_allowed());
    assert_eq!(fixture.backend.stats().await.writes, 0);
    if let GuardOutcome::Denied { alerts, .. } = step.outcome {
        alerts.report().await;
    }

    let alerts = fixture.notifier.sent_to(&principal("U1")).await;
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].body.contains("```grant role admin to <@U5>```"));
}

#[tokio::test]
async fn test_failed_alert_does_not_change_denial() {
    let fixture = TestFixture::new("U1").await;
    fixture.say("U1", "grant role admin to <@U2>").await;
    fixture.notifier.fail_for(principal("U1")).await;

    let step = fixture.say("U5", "who has role admin").await;
    match step.outcome {
        GuardOutcome::Denied { reply, alerts } => {
            assert_eq!(reply.text, DENIAL_REPLY);
            let report = alerts.report().await;
            assert_eq!(report.delivered, vec![principal("U2")]);
            assert_eq!(report.failed.len(), 1);
            assert_eq!(report.failed[0].principal, principal("U1"));
        }
        other => panic!("expected denial, got {:?}", other),
    }
}

#[tokio::test]
async fn test_concurrent_grants_all_land() {
    let fixture = TestFixture::new("U1").await;
    let router = Arc::new(fixture.router.clone());

    let mut tasks = Vec::new();
    for i in 0..4 {
        let router = router.clone();
        tasks.push(tokio::spawn(async move {
            let message = Message::new(principal("U1"), format!("grant role ops to <@W{}>", i));
            router.dispatch(&message).await
        }));
    }
    for task in tasks {
        let dispatched = task.await.unwrap().unwrap().unwrap();
        assert!(dispatched.outcome.is_allowed());
    }

    let who = fixture.say("U1", "who has role ops").await;
    assert_eq!(
        who.outcome.reply().text,
        "Role `ops` has been granted to <@W0>, <@W1>, <@W2>, <@W3>"
    );
}

#[tokio::test]
async fn test_missing_root_configuration() {
    let err = Settings::from_lookup(|_| None).unwrap_err();
    assert!(matches!(err, ConfigError::MissingConfiguration(ref key) if key == ROOT_ENV));
}

/// Backend whose every call fails.
struct UnavailableStore;

#[async_trait]
impl KeyValueStore for UnavailableStore {
    async fn get(&self, _key: &str) -> StoreResult<Option<Entry>> {
        Err(StoreError::Connection("connection refused".to_string()))
    }

    async fn set(&self, _key: &str, _value: Vec<u8>) -> StoreResult<u64> {
        Err(StoreError::Connection("connection refused".to_string()))
    }

    async fn compare_and_set(
        &self,
        _key: &str,
        _expected: Option<u64>,
        _value: Vec<u8>,
    ) -> StoreResult<CasOutcome> {
        Err(StoreError::Connection("connection refused".to_string()))
    }

    async fn stats(&self) -> StoreStats {
        StoreStats::default()
    }
}

#[tokio::test]
async fn test_storage_failure_aborts_dispatch() {
    let notifier = MemoryNotifier::new();
    let router = CommandRouter::from_settings(
        &Settings::new(principal("U1")),
        Arc::new(UnavailableStore),
        Arc::new(notifier.clone()),
    )
    .await
    .unwrap();

    let err = router
        .dispatch(&Message::new(principal("U5"), "who has role admin"))
        .await
        .unwrap_err();
    assert!(matches!(err, RouterError::Rbac(RbacError::Storage(_))));
    assert!(notifier.sent().await.is_empty());

    // root is decided without storage, the handler then fails on the read
    let err = router
        .dispatch(&Message::new(principal("U1"), "who has role admin"))
        .await
        .unwrap_err();
    assert!(matches!(err, RouterError::Rbac(_)));
}
