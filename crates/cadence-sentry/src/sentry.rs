//! The strategy registry.
//!
//! Holds up to [`MAX_SENTRY_STRATEGIES`] strategies in registration order
//! and an optional sanctions list. Each successful mutation returns a
//! [`SentryEvent`] for the caller to publish.

use std::fmt;
use std::sync::Arc;

use cadence_types::events::{Event, EventType};
use cadence_types::{Address, MAX_SENTRY_STRATEGIES};

use crate::roles::AdminRole;
use crate::strategy::{SanctionsList, SentryStrategy};
use crate::{Result, SentryError};

/// Notification produced by a successful sentry mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentryEvent {
    AddSentryStrategy { strategy: Address },
    RemoveSentryStrategy { strategy: Address },
    UpdateSanctionsList { sanctions_list: Option<Address> },
    RoleGranted { account: Address, caller: Address },
    RoleRevoked { account: Address, caller: Address },
}

impl SentryEvent {
    /// Render as a notification event.
    pub fn to_event(&self, now: u64) -> Event {
        let (event_type, payload) = match self {
            SentryEvent::AddSentryStrategy { strategy } => (
                EventType::AddSentryStrategy,
                serde_json::json!({ "strategy": strategy }),
            ),
            SentryEvent::RemoveSentryStrategy { strategy } => (
                EventType::RemoveSentryStrategy,
                serde_json::json!({ "strategy": strategy }),
            ),
            SentryEvent::UpdateSanctionsList { sanctions_list } => (
                EventType::UpdateSanctionsList,
                serde_json::json!({ "sanctions_list": sanctions_list }),
            ),
            SentryEvent::RoleGranted { account, caller } => (
                EventType::RoleGranted,
                serde_json::json!({ "account": account, "caller": caller }),
            ),
            SentryEvent::RoleRevoked { account, caller } => (
                EventType::RoleRevoked,
                serde_json::json!({ "account": account, "caller": caller }),
            ),
        };
        Event::new(event_type, now, payload)
    }
}

/// Allow-list gate with admin-restricted maintenance.
pub struct Sentry {
    admins: AdminRole,
    strategies: Vec<Arc<dyn SentryStrategy>>,
    sanctions: Option<Arc<dyn SanctionsList>>,
}

impl Sentry {
    /// Create an empty sentry administered by `admin`.
    pub fn new(admin: Address) -> Self {
        Self {
            admins: AdminRole::new(admin),
            strategies: Vec::new(),
            sanctions: None,
        }
    }

    /// Whether `account` may act: not sanctioned, and allowed by every
    /// registered strategy. With no strategies and no sanctions list
    /// everyone is allowed.
    pub fn is_allowed(&self, account: &Address) -> bool {
        if let Some(sanctions) = &self.sanctions {
            if sanctions.is_sanctioned(account) {
                tracing::debug!(%account, "sentry: sanctioned");
                return false;
            }
        }
        self.strategies.iter().all(|s| s.is_allowed(account))
    }

    /// Register a strategy.
    ///
    /// # Errors
    ///
    /// - [`SentryError::Unauthorized`] if `caller` is not an admin
    /// - [`SentryError::CapacityReached`] if [`MAX_SENTRY_STRATEGIES`] are
    ///   already registered
    /// - [`SentryError::DuplicateStrategy`] if a strategy with the same
    ///   address is registered
    pub fn add_strategy(
        &mut self,
        caller: &Address,
        strategy: Arc<dyn SentryStrategy>,
    ) -> Result<SentryEvent> {
        self.admins.authorize(caller)?;

        let address = strategy.address();
        if self.position(&address).is_some() {
            return Err(SentryError::DuplicateStrategy(address));
        }
        if self.strategies.len() >= MAX_SENTRY_STRATEGIES {
            return Err(SentryError::CapacityReached {
                max: MAX_SENTRY_STRATEGIES,
            });
        }

        self.strategies.push(strategy);
        tracing::info!(strategy = %address, count = self.strategies.len(), "sentry strategy added");
        Ok(SentryEvent::AddSentryStrategy { strategy: address })
    }

    /// Unregister a strategy, keeping the order of the rest.
    ///
    /// # Errors
    ///
    /// - [`SentryError::Unauthorized`] if `caller` is not an admin
    /// - [`SentryError::StrategyNotFound`] if no such strategy is registered
    pub fn remove_strategy(&mut self, caller: &Address, strategy: &Address) -> Result<SentryEvent> {
        self.admins.authorize(caller)?;

        let index = self
            .position(strategy)
            .ok_or(SentryError::StrategyNotFound(*strategy))?;
        self.strategies.remove(index);

        tracing::info!(%strategy, count = self.strategies.len(), "sentry strategy removed");
        Ok(SentryEvent::RemoveSentryStrategy {
            strategy: *strategy,
        })
    }

    /// Replace the sanctions list; `None` disables sanctions screening.
    ///
    /// # Errors
    ///
    /// - [`SentryError::Unauthorized`] if `caller` is not an admin
    pub fn update_sanctions_list(
        &mut self,
        caller: &Address,
        sanctions: Option<Arc<dyn SanctionsList>>,
    ) -> Result<SentryEvent> {
        self.admins.authorize(caller)?;

        let sanctions_list = sanctions.as_ref().map(|s| s.address());
        self.sanctions = sanctions;

        tracing::info!(?sanctions_list, "sanctions list updated");
        Ok(SentryEvent::UpdateSanctionsList { sanctions_list })
    }

    /// Grant the admin role.
    ///
    /// # Errors
    ///
    /// See [`AdminRole::grant`].
    pub fn grant_admin(&mut self, caller: &Address, account: Address) -> Result<SentryEvent> {
        self.admins.grant(caller, account)?;
        Ok(SentryEvent::RoleGranted {
            account,
            caller: *caller,
        })
    }

    /// Revoke the admin role.
    ///
    /// # Errors
    ///
    /// See [`AdminRole::revoke`].
    pub fn revoke_admin(&mut self, caller: &Address, account: &Address) -> Result<SentryEvent> {
        self.admins.revoke(caller, account)?;
        Ok(SentryEvent::RoleRevoked {
            account: *account,
            caller: *caller,
        })
    }

    pub fn is_admin(&self, account: &Address) -> bool {
        self.admins.contains(account)
    }

    /// Registered strategy addresses, in registration order.
    pub fn strategies(&self) -> Vec<Address> {
        self.strategies.iter().map(|s| s.address()).collect()
    }

    pub fn sanctions_list(&self) -> Option<Address> {
        self.sanctions.as_ref().map(|s| s.address())
    }

    fn position(&self, strategy: &Address) -> Option<usize> {
        self.strategies.iter().position(|s| s.address() == *strategy)
    }
}

impl fmt::Debug for Sentry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sentry")
            .field("admins", &self.admins)
            .field("strategies", &self.strategies())
            .field("sanctions", &self.sanctions_list())
            .finish()
    }
}
