//! Admin notification on denied commands
//!
//! Resolves the current `root ∪ admin` principals and sends each of them one
//! alert describing the denied attempt. Deliveries run concurrently, each
//! with its own time budget.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinHandle, JoinSet};
use uuid::Uuid;
use warden_rbac::{Policy, PolicyMode, Principal, RbacResult, RoleName, RoleStore};

use crate::notifier::{Alert, Notifier, NotifyError};

/// Title of every denial alert.
pub const DENIAL_TITLE: &str = "Attempt to execute unauthorized command";

/// What was denied, to whom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DenialContext {
    /// Principal that was denied
    pub principal: Principal,
    /// Command text exactly as received
    pub attempted_text: String,
    /// Policy the principal failed
    pub policy: Policy,
    /// Policy roles the principal does not hold
    pub missing: Vec<RoleName>,
}

impl DenialContext {
    /// Create a denial context where every policy role is missing.
    pub fn new(principal: Principal, attempted_text: impl Into<String>, policy: Policy) -> Self {
        let missing = policy.roles().to_vec();
        Self {
            principal,
            attempted_text: attempted_text.into(),
            policy,
            missing,
        }
    }

    /// Narrow the missing roles to those the decision reported.
    pub fn with_missing(mut self, missing: impl IntoIterator<Item = RoleName>) -> Self {
        self.missing = missing.into_iter().collect();
        self
    }

    /// The policy mode that was failed.
    pub fn mode(&self) -> PolicyMode {
        self.policy.mode()
    }

    /// Alert body.
    ///
    /// The attempted text is embedded verbatim inside a code block, followed
    /// by the roles the principal lacks.
    ///
    /// # Example
    ///
    /// ```
    /// use warden_notify::DenialContext;
    /// use warden_rbac::{Policy, Principal};
    ///
    /// let context = DenialContext::new(
    ///     Principal::new("U5").unwrap(),
    ///     "who has role admin",
    ///     Policy::root_or_admin(),
    /// );
    /// assert_eq!(
    ///     context.body(),
    ///     "User <@U5> tried to execute the following command:```who has role admin``` \
    ///      but lacks _one_ of these roles: `root`, `admin`"
    /// );
    /// ```
    pub fn body(&self) -> String {
        let roles: Vec<String> = self
            .missing
            .iter()
            .map(|role| format!("`{}`", role))
            .collect();

        format!(
            "User {} tried to execute the following command:```{}``` but lacks _{}_ of these roles: {}",
            self.principal.mention(),
            self.attempted_text,
            self.mode().quantifier(),
            roles.join(", ")
        )
    }

    /// Build the alert for this denial.
    pub fn to_alert(&self) -> Alert {
        Alert::new(DENIAL_TITLE, self.body())
    }
}

/// A delivery that did not go through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedDelivery {
    /// Intended recipient
    pub principal: Principal,
    /// Failure message
    pub error: String,
}

/// Outcome of one denial fan-out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationReport {
    /// Id of the alert sent, `None` if no alert was built
    pub alert_id: Option<Uuid>,
    /// Recipients that received the alert, sorted
    pub delivered: Vec<Principal>,
    /// Recipients whose delivery failed, sorted by recipient
    pub failed: Vec<FailedDelivery>,
}

impl NotificationReport {
    /// Number of recipients attempted.
    pub fn attempted(&self) -> usize {
        self.delivered.len() + self.failed.len()
    }
}

/// A denial fan-out running in the background.
///
/// Dropping it leaves the deliveries running.
#[derive(Debug)]
pub struct PendingAlerts {
    handle: JoinHandle<NotificationReport>,
}

impl PendingAlerts {
    /// Wait until every delivery has finished or timed out.
    pub async fn report(self) -> NotificationReport {
        match self.handle.await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(error = %e, "Denial alert task failed");
                NotificationReport::default()
            }
        }
    }
}

/// Sends denial alerts to every root and admin.
#[derive(Clone)]
pub struct AdminNotifier {
    store: RoleStore,
    notifier: Arc<dyn Notifier>,
    send_timeout: Duration,
}

impl std::fmt::Debug for AdminNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminNotifier")
            .field("send_timeout", &self.send_timeout)
            .finish_non_exhaustive()
    }
}

impl AdminNotifier {
    /// Default time budget per delivery.
    pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(5);

    /// Create an admin notifier.
    pub fn new(store: RoleStore, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            notifier,
            send_timeout: Self::DEFAULT_SEND_TIMEOUT,
        }
    }

    /// Override the time budget per delivery.
    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// Current `root ∪ admin` principals, sorted.
    pub async fn targets(&self) -> RbacResult<BTreeSet<Principal>> {
        let mut targets = self.store.members(&RoleName::root()).await?;
        targets.extend(self.store.members(&RoleName::admin()).await?);
        Ok(targets)
    }

    /// Start alerting every root and admin without waiting for delivery.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn_denied(&self, context: DenialContext) -> PendingAlerts {
        let admins = self.clone();
        let handle = tokio::spawn(async move { admins.notify_denied(&context).await });
        PendingAlerts { handle }
    }

    /// Alert every root and admin about a denied attempt.
    ///
    /// All deliveries run at once, so this takes at most one send timeout
    /// after the targets are resolved. Never fails: resolution and delivery
    /// errors are logged and reflected in the report.
    pub async fn notify_denied(&self, context: &DenialContext) -> NotificationReport {
        let targets = match self.targets().await {
            Ok(targets) => targets,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    principal = %context.principal,
                    "Could not resolve admins for denial alert"
                );
                return NotificationReport::default();
            }
        };

        let alert = context.to_alert();
        let mut report = NotificationReport {
            alert_id: Some(alert.id),
            ..NotificationReport::default()
        };

        let mut sends = JoinSet::new();
        for target in targets {
            let notifier = self.notifier.clone();
            let alert = alert.clone();
            let timeout = self.send_timeout;
            sends.spawn(async move {
                let result = send(notifier.as_ref(), &target, &alert, timeout).await;
                (target, result)
            });
        }

        while let Some(joined) = sends.join_next().await {
            match joined {
                Ok((target, Ok(()))) => report.delivered.push(target),
                Ok((target, Err(e))) => {
                    tracing::warn!(
                        error = %e,
                        recipient = %target,
                        alert_id = %alert.id,
                        "Denial alert not delivered"
                    );
                    report.failed.push(FailedDelivery {
                        principal: target,
                        error: e.to_string(),
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, alert_id = %alert.id, "Denial alert delivery task failed");
                }
            }
        }

        report.delivered.sort();
        report.failed.sort_by(|a, b| a.principal.cmp(&b.principal));

        tracing::info!(
            principal = %context.principal,
            alert_id = %alert.id,
            delivered = report.delivered.len(),
            failed = report.failed.len(),
            "Denial alert sent"
        );

        report
    }
}

async fn send(
    notifier: &dyn Notifier,
    target: &Principal,
    alert: &Alert,
    timeout: Duration,
) -> Result<(), NotifyError> {
    tokio::time::timeout(timeout, notifier.send_direct(target, alert))
        .await
        .map_err(|_| NotifyError::Timeout(timeout))?
}
