//! Authorization guard around command handlers.

use warden_notify::{AdminNotifier, DenialContext, PendingAlerts};
use warden_rbac::{AuthorizationEngine, Decision};

use crate::handler::{CommandArgs, CommandHandler, CommandResult};
use crate::message::{Message, Reply};

/// Reply shown to a sender who lacks the required roles.
pub const DENIAL_REPLY: &str = "I'm sorry, but you don't have access to that command";

/// Result of a guarded invocation.
#[derive(Debug)]
pub enum GuardOutcome {
    /// Policy satisfied, handler ran
    Allowed(Reply),
    /// Policy not satisfied, handler skipped and admins being alerted
    Denied {
        /// Ephemeral reply for the sender
        reply: Reply,
        /// Alert fan-out, still running in the background
        alerts: PendingAlerts,
    },
}

impl GuardOutcome {
    /// Reply to send back, whichever way the decision went.
    pub fn reply(&self) -> &Reply {
        match self {
            Self::Allowed(reply) => reply,
            Self::Denied { reply, .. } => reply,
        }
    }

    /// Check if the handler ran.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed(_))
    }
}

/// Checks a handler's policy before running it.
#[derive(Clone)]
pub struct AuthorizationGuard {
    engine: AuthorizationEngine,
    notifier: AdminNotifier,
}

impl AuthorizationGuard {
    /// Create a guard.
    pub fn new(engine: AuthorizationEngine, notifier: AdminNotifier) -> Self {
        Self { engine, notifier }
    }

    /// Run `handler` if the sender satisfies its policy.
    ///
    /// On denial the reply is returned right away and admin alerts are sent
    /// in the background. A storage failure while deciding fails the
    /// invocation; the handler is not run and nobody is alerted.
    pub async fn run(
        &self,
        message: &Message,
        handler: &dyn CommandHandler,
        args: &CommandArgs,
    ) -> CommandResult<GuardOutcome> {
        let definition = handler.definition();

        match self.engine.authorize(&message.sender, &definition.policy).await? {
            Decision::Allowed => {
                let reply = handler.execute(message, args).await?;
                Ok(GuardOutcome::Allowed(reply))
            }
            Decision::Denied { missing } => {
                tracing::warn!(
                    command = %definition.name,
                    principal = %message.sender,
                    policy = %definition.policy,
                    missing = missing.len(),
                    correlation_id = %message.correlation_id,
                    "Command denied"
                );

                let reply = Reply::ephemeral(DENIAL_REPLY);
                let context = DenialContext::new(
                    message.sender.clone(),
                    message.text.clone(),
                    definition.policy,
                )
                .with_missing(missing);
                let alerts = self.notifier.spawn_denied(context);

                Ok(GuardOutcome::Denied { reply, alerts })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use warden_notify::{Alert, MemoryNotifier, Notifier, NotifyResult};
    use warden_rbac::{Policy, Principal, RoleName, RoleStore};
    use warden_store::MemoryStore;

    use crate::handler::CommandDefinition;

    struct Counting {
        policy: Policy,
        calls: AtomicUsize,
    }

    impl Counting {
        fn new(policy: Policy) -> Self {
            Self {
                policy,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CommandHandler for Counting {
        fn definition(&self) -> CommandDefinition {
            CommandDefinition::new("deploy", r"^deploy$", self.policy.clone())
        }

        async fn execute(&self, _message: &Message, _args: &CommandArgs) -> CommandResult<Reply> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Reply::say("deployed"))
        }
    }

    fn principal(id: &str) -> Principal {
        Principal::new(id).unwrap()
    }

    fn role(name: &str) -> RoleName {
        RoleName::new(name).unwrap()
    }

    fn guard() -> (AuthorizationGuard, RoleStore, MemoryNotifier) {
        let store = RoleStore::new(Arc::new(MemoryStore::new()), principal("U1"));
        let notifier = MemoryNotifier::new();
        let guard = AuthorizationGuard::new(
            AuthorizationEngine::new(store.clone()),
            AdminNotifier::new(store.clone(), Arc::new(notifier.clone())),
        );
        (guard, store, notifier)
    }

    #[tokio::test]
    async fn test_allowed_runs_handler() {
        let (guard, _store, notifier) = guard();
        let handler = Counting::new(Policy::root_or_admin());

        let outcome = guard
            .run(&Message::new(principal("U1"), "deploy"), &handler, &CommandArgs::default())
            .await
            .unwrap();

        assert!(matches!(outcome, GuardOutcome::Allowed(ref reply) if *reply == Reply::say("deployed")));
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
        assert!(notifier.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_denied_skips_handler_and_alerts() {
        let (guard, store, notifier) = guard();
        store.grant(&RoleName::admin(), &principal("U2")).await.unwrap();
        let handler = Counting::new(Policy::root_or_admin());

        let outcome = guard
            .run(&Message::new(principal("U5"), "deploy"), &handler, &CommandArgs::default())
            .await
            .unwrap();

        assert!(!outcome.is_allowed());
        assert_eq!(outcome.reply().text, DENIAL_REPLY);
        assert!(outcome.reply().is_ephemeral());
        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);

        match outcome {
            GuardOutcome::Denied { alerts, .. } => {
                assert_eq!(alerts.report().await.delivered.len(), 2)
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        let sent = notifier.sent().await;
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|d| d.alert.body.contains("```deploy```")));
    }

    #[tokio::test]
    async fn test_all_policy_denial_text() {
        let (guard, store, notifier) = guard();
        store.grant(&role("ops"), &principal("U7")).await.unwrap();
        let handler = Counting::new(Policy::all([role("ops"), role("audit")]));

        let outcome = guard
            .run(&Message::new(principal("U7"), "deploy"), &handler, &CommandArgs::default())
            .await
            .unwrap();
        match outcome {
            GuardOutcome::Denied { alerts, .. } => {
                alerts.report().await;
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        // U7 holds ops, so only audit is reported missing
        let sent = notifier.sent_to(&principal("U1")).await;
        assert_eq!(sent.len(), 1);
        assert!(sent[0].body.ends_with("lacks _all_ of these roles: `audit`"));
    }

    #[tokio::test]
    async fn test_delivery_failure_keeps_denial() {
        let (guard, _store, notifier) = guard();
        notifier.fail_for(principal("U1")).await;
        let handler = Counting::new(Policy::root_or_admin());

        let outcome = guard
            .run(&Message::new(principal("U5"), "deploy"), &handler, &CommandArgs::default())
            .await
            .unwrap();

        match outcome {
            GuardOutcome::Denied { reply, alerts } => {
                assert_eq!(reply.text, DENIAL_REPLY);
                let report = alerts.report().await;
                assert_eq!(report.failed.len(), 1);
                assert!(report.delivered.is_empty());
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    /// Transport that never answers.
    struct Hanging;

    #[async_trait]
    impl Notifier for Hanging {
        async fn send_direct(&self, _principal: &Principal, _alert: &Alert) -> NotifyResult<()> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_denial_does_not_wait_for_delivery() {
        let store = RoleStore::new(Arc::new(MemoryStore::new()), principal("U1"));
        for id in ["U2", "U3", "U4"] {
            store.grant(&RoleName::admin(), &principal(id)).await.unwrap();
        }
        let timeout = Duration::from_millis(200);
        let guard = AuthorizationGuard::new(
            AuthorizationEngine::new(store.clone()),
            AdminNotifier::new(store, Arc::new(Hanging)).with_send_timeout(timeout),
        );
        let handler = Counting::new(Policy::root_or_admin());

        let start = tokio::time::Instant::now();
        let outcome = guard
            .run(&Message::new(principal("U5"), "deploy"), &handler, &CommandArgs::default())
            .await
            .unwrap();
        assert!(start.elapsed() < timeout);
        assert_eq!(outcome.reply().text, DENIAL_REPLY);

        match outcome {
            GuardOutcome::Denied { alerts, .. } => {
                let report = alerts.report().await;
                assert_eq!(report.failed.len(), 4);
                // one timeout for all four targets, not one each
                assert!(start.elapsed() < timeout * 2);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}
