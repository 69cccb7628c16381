//! Command router
//!
//! Matches inbound message text against the registered command patterns and
//! runs the first match through the [`AuthorizationGuard`].

use regex::Regex;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use warden_notify::{AdminNotifier, Notifier};
use warden_rbac::{AuthorizationEngine, RbacError, RoleStore};
use warden_store::KeyValueStore;

use crate::config::Settings;
use crate::guard::{AuthorizationGuard, GuardOutcome};
use crate::handler::{CommandArgs, CommandDefinition, CommandError, CommandHandler};
use crate::handlers::rbac_commands;
use crate::message::Message;

/// Router error types.
#[derive(Debug, Error)]
pub enum RouterError {
    /// Command pattern is not a valid regex
    #[error("Invalid pattern for command {name}: {message}")]
    InvalidPattern {
        /// Command name
        name: String,
        /// Regex error
        message: String,
    },

    /// A command with this name is already registered
    #[error("Command already registered: {0}")]
    DuplicateCommand(String),

    /// Matched text did not yield the arguments the command needs
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Authorization or role store failure
    #[error(transparent)]
    Rbac(#[from] RbacError),
}

/// Result type for router operations.
pub type RouterResult<T> = Result<T, RouterError>;

impl RouterError {
    /// Check if this error is an infrastructure failure rather than a bad
    /// command.
    pub fn is_server_error(&self) -> bool {
        match self {
            Self::Rbac(e) => e.is_server_error(),
            Self::InvalidArguments(_) => false,
            Self::InvalidPattern { .. } | Self::DuplicateCommand(_) => true,
        }
    }
}

impl From<CommandError> for RouterError {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::MissingArgument(name) => Self::InvalidArguments(name),
            CommandError::Rbac(e) => Self::Rbac(e),
        }
    }
}

/// A dispatched command and how it went.
#[derive(Debug)]
pub struct Dispatched {
    /// Name of the command that matched
    pub command: String,
    /// Guard outcome
    pub outcome: GuardOutcome,
}

struct Route {
    regex: Regex,
    handler: Arc<dyn CommandHandler>,
}

/// Routes messages to guarded command handlers.
#[derive(Clone)]
pub struct CommandRouter {
    guard: AuthorizationGuard,
    routes: Arc<RwLock<Vec<Route>>>,
}

impl CommandRouter {
    /// Create a router with no commands.
    pub fn new(guard: AuthorizationGuard) -> Self {
        Self {
            guard,
            routes: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Build a router serving the role administration commands.
    pub async fn from_settings(
        settings: &Settings,
        backend: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn Notifier>,
    ) -> RouterResult<Self> {
        let store = RoleStore::with_config(
            backend,
            settings.root_principal.clone(),
            settings.role_store_config(),
        );
        let admins = AdminNotifier::new(store.clone(), notifier)
            .with_send_timeout(settings.notify_timeout());
        let guard = AuthorizationGuard::new(AuthorizationEngine::new(store.clone()), admins);

        tracing::info!(
            root = %settings.root_principal,
            key_prefix = %settings.key_prefix,
            "Command router configured"
        );

        Self::new(guard).with_rbac_commands(&store).await
    }

    /// Register the grant, revoke and list commands over `store`.
    pub async fn with_rbac_commands(self, store: &RoleStore) -> RouterResult<Self> {
        self.register_handlers(rbac_commands(store)).await?;
        Ok(self)
    }

    /// Register a command. Patterns are tried in registration order.
    pub async fn register_handler(&self, handler: Arc<dyn CommandHandler>) -> RouterResult<()> {
        let definition = handler.definition();
        let regex = Regex::new(&definition.pattern).map_err(|e| RouterError::InvalidPattern {
            name: definition.name.clone(),
            message: e.to_string(),
        })?;

        let mut routes = self.routes.write().await;
        if routes
            .iter()
            .any(|route| route.handler.definition().name == definition.name)
        {
            return Err(RouterError::DuplicateCommand(definition.name));
        }

        tracing::debug!(command = %definition.name, pattern = %definition.pattern, "Registered command");
        routes.push(Route { regex, handler });
        Ok(())
    }

    /// Register multiple commands.
    pub async fn register_handlers(&self, handlers: Vec<Arc<dyn CommandHandler>>) -> RouterResult<()> {
        for handler in handlers {
            self.register_handler(handler).await?;
        }
        Ok(())
    }

    /// Get all command definitions in registration order.
    pub async fn list_commands(&self) -> Vec<CommandDefinition> {
        let routes = self.routes.read().await;
        routes.iter().map(|route| route.handler.definition()).collect()
    }

    /// Dispatch a message.
    ///
    /// Surrounding whitespace is ignored when matching. Returns `None` when
    /// no command matches. A storage failure aborts this dispatch only.
    pub async fn dispatch(&self, message: &Message) -> RouterResult<Option<Dispatched>> {
        let text = message.text.trim();

        let matched = {
            let routes = self.routes.read().await;
            routes.iter().find_map(|route| {
                route.regex.captures(text).map(|captures| {
                    (
                        route.handler.clone(),
                        CommandArgs::from_captures(&route.regex, &captures),
                    )
                })
            })
        };

        let Some((handler, args)) = matched else {
            tracing::debug!(correlation_id = %message.correlation_id, "No command matched");
            return Ok(None);
        };

        let command = handler.definition().name;
        tracing::debug!(
            command = %command,
            principal = %message.sender,
            correlation_id = %message.correlation_id,
            "Dispatching command"
        );

        match self.guard.run(message, handler.as_ref(), &args).await {
            Ok(outcome) => Ok(Some(Dispatched { command, outcome })),
            Err(e) => {
                let err = RouterError::from(e);
                if err.is_server_error() {
                    tracing::error!(
                        command = %command,
                        principal = %message.sender,
                        correlation_id = %message.correlation_id,
                        error = %err,
                        "Command failed"
                    );
                } else {
                    tracing::warn!(
                        command = %command,
                        principal = %message.sender,
                        correlation_id = %message.correlation_id,
                        error = %err,
                        "Command rejected"
                    );
                }
                Err(err)
            }
        }
    }
}
