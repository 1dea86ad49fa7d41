//! Sentry command handlers.
//!
//! Mutating commands name their `caller`; the sentry checks the admin role
//! before anything else. Successful mutations are published on the event bus.

use std::sync::Arc;

use cadence_sentry::strategy::{AllowListStrategy, SanctionsList, SanctionsRegistry};
use cadence_sentry::SentryEvent;
use serde_json::Value;

use super::{address_list_param, address_param};
use crate::rpc::RpcError;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

fn publish(state: &DaemonState, event: &SentryEvent) {
    state.event_bus.emit(event.to_event(state.now()));
}

/// Whether an account passes the sentry.
pub async fn is_allowed(state: &Arc<DaemonState>, params: &Value) -> Result {
    let account = address_param(params, "account")?;
    let allowed = state.sentry.read().await.is_allowed(&account);
    Ok(serde_json::json!({ "account": account, "allowed": allowed }))
}

/// Registered strategies in order, plus the sanctions list if any.
pub async fn get_sentry_strategies(state: &Arc<DaemonState>) -> Result {
    let sentry = state.sentry.read().await;
    Ok(serde_json::json!({
        "strategies": sentry.strategies(),
        "sanctions_list": sentry.sanctions_list(),
    }))
}

/// Register a new allow-list strategy seeded with `members`.
pub async fn add_allow_list_strategy(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = address_param(params, "caller")?;
    let address = address_param(params, "strategy")?;
    let members = address_list_param(params, "members")?;
    let count = members.len();

    let strategy = Arc::new(AllowListStrategy::with_members(address, members));
    let event = state.sentry.write().await.add_strategy(&caller, strategy)?;
    publish(state, &event);

    Ok(serde_json::json!({ "strategy": address, "members": count }))
}

pub async fn remove_sentry_strategy(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = address_param(params, "caller")?;
    let strategy = address_param(params, "strategy")?;

    let event = state
        .sentry
        .write()
        .await
        .remove_strategy(&caller, &strategy)?;
    publish(state, &event);

    Ok(serde_json::json!({ "strategy": strategy, "removed": true }))
}

/// Replace the sanctions list. A missing or null `sanctions_list` clears it.
pub async fn update_sanctions_list(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = address_param(params, "caller")?;
    let list = match params.get("sanctions_list") {
        None | Some(Value::Null) => None,
        Some(_) => {
            let address = address_param(params, "sanctions_list")?;
            let entries = address_list_param(params, "entries")?;
            let registry: Arc<dyn SanctionsList> =
                Arc::new(SanctionsRegistry::new(address, entries));
            Some(registry)
        }
    };

    let event = state
        .sentry
        .write()
        .await
        .update_sanctions_list(&caller, list)?;
    publish(state, &event);

    let sanctions_list = state.sentry.read().await.sanctions_list();
    Ok(serde_json::json!({ "sanctions_list": sanctions_list }))
}

pub async fn grant_admin(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = address_param(params, "caller")?;
    let account = address_param(params, "account")?;

    let event = state.sentry.write().await.grant_admin(&caller, account)?;
    publish(state, &event);

    Ok(serde_json::json!({ "account": account, "admin": true }))
}

pub async fn revoke_admin(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = address_param(params, "caller")?;
    let account = address_param(params, "account")?;

    let event = state
        .sentry
        .write()
        .await
        .revoke_admin(&caller, &account)?;
    publish(state, &event);

    Ok(serde_json::json!({ "account": account, "admin": false }))
}
