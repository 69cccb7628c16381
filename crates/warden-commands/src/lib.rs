//! # Warden Commands
//!
//! Role administration commands for a chat bot, each guarded by a role
//! policy.
//!
//! ## Overview
//!
//! The warden-commands crate provides:
//! - **Settings**: Environment-driven configuration with a mandatory root
//! - **Command Handlers**: Pattern, policy and behavior of each command
//! - **Authorization Guard**: Policy check and admin alert on denial
//! - **Command Router**: First-match dispatch of message text
//!
//! ## Commands
//!
//! | Command | Policy |
//! |---------|--------|
//! | `grant role <role> to <@user>` | one of `root`, `admin` |
//! | `revoke role <role> from <@user>` | one of `root`, `admin` |
//! | `who has role <role>` | one of `root`, `admin` |
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use warden_commands::{CommandRouter, Message, Settings};
//! use warden_notify::MemoryNotifier;
//! use warden_rbac::Principal;
//! use warden_store::MemoryStore;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::from_env()?;
//!     let router = CommandRouter::from_settings(
//!         &settings,
//!         Arc::new(MemoryStore::new()),
//!         Arc::new(MemoryNotifier::new()),
//!     )
//!     .await?;
//!
//!     let message = Message::new(Principal::new("U1")?, "grant role admin to <@U2>");
//!     if let Some(dispatched) = router.dispatch(&message).await? {
//!         println!("{}", dispatched.outcome.reply().text);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod guard;
pub mod handler;
pub mod handlers;
pub mod message;
pub mod router;

pub use config::{ConfigError, Settings, ROOT_ENV};
pub use guard::{AuthorizationGuard, GuardOutcome, DENIAL_REPLY};
pub use handler::{CommandArgs, CommandDefinition, CommandError, CommandHandler, CommandResult};
pub use handlers::{rbac_commands, GrantRole, RevokeRole, WhoHasRole};
pub use message::{Message, Reply, Visibility};
pub use router::{CommandRouter, Dispatched, RouterError, RouterResult};
