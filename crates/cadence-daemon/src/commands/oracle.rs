//! Oracle & venue command handlers.

use std::sync::Arc;

use cadence_oracle::source::CumulativePriceSource;
use cadence_oracle::twap::UpdateOutcome;
use cadence_sentry::SentryError;
use serde_json::Value;

use super::{address_param, amount_param, u128_param};
use crate::keeper;
use crate::rpc::RpcError;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

/// Get the oracle's stored observation, epoch state and the venue reserves.
pub async fn get_oracle_state(state: &Arc<DaemonState>) -> Result {
    let oracle = state.oracle.read().await;
    let (asset0, asset1) = oracle.assets();
    let observation = oracle.observation();
    let (reserve0, reserve1) = state.pair.reserves()?;

    Ok(serde_json::json!({
        "asset0": asset0,
        "asset1": asset1,
        "period": oracle.period(),
        "epoch": oracle.epoch(),
        "epoch_start": oracle.epoch_start(),
        "next_epoch_at": oracle.next_epoch_at(),
        "can_update": oracle.can_update(),
        "timestamp": observation.snapshot.timestamp,
        "price0_cumulative": observation.snapshot.price0_cumulative.to_string(),
        "price1_cumulative": observation.snapshot.price1_cumulative.to_string(),
        "price0_average": observation.price0_average.to_string(),
        "price1_average": observation.price1_average.to_string(),
        "reserve0": reserve0.to_string(),
        "reserve1": reserve1.to_string(),
    }))
}

/// Value an amount at the stored average.
pub async fn consult(state: &Arc<DaemonState>, params: &Value) -> Result {
    let asset = address_param(params, "asset")?;
    let amount_in = amount_param(params, "amount_in")?;

    let amount_out = state.oracle.read().await.consult(&asset, amount_in)?;
    Ok(serde_json::json!({ "amount_out": amount_out.to_string() }))
}

/// Value an amount at a live average.
pub async fn twap(state: &Arc<DaemonState>, params: &Value) -> Result {
    let asset = address_param(params, "asset")?;
    let amount_in = amount_param(params, "amount_in")?;

    let amount_out = state.oracle.read().await.twap(&asset, amount_in)?;
    Ok(serde_json::json!({ "amount_out": amount_out.to_string() }))
}

/// Run a gated update now instead of waiting for the keeper.
pub async fn update(state: &Arc<DaemonState>) -> Result {
    let outcome = state.oracle.write().await.update()?;
    keeper::publish_outcome(state, &outcome);

    Ok(match outcome {
        UpdateOutcome::Updated(updated) => serde_json::json!({
            "status": "updated",
            "epoch": updated.epoch,
            "time_elapsed": updated.time_elapsed,
        }),
        UpdateOutcome::Unchanged { epoch } => serde_json::json!({
            "status": "unchanged",
            "epoch": epoch,
        }),
    })
}

/// Force venue reserves. Admin only.
pub async fn sync_reserves(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = address_param(params, "caller")?;
    let reserve0 = u128_param(params, "reserve0")?;
    let reserve1 = u128_param(params, "reserve1")?;

    if !state.sentry.read().await.is_admin(&caller) {
        return Err(SentryError::Unauthorized(caller).into());
    }
    state.pair.sync(reserve0, reserve1)?;

    Ok(serde_json::json!({
        "reserve0": reserve0.to_string(),
        "reserve1": reserve1.to_string(),
    }))
}

/// Swap on the venue. The caller must pass the sentry.
pub async fn swap(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = address_param(params, "caller")?;
    let asset_in = address_param(params, "asset_in")?;
    let amount_in = u128_param(params, "amount_in")?;

    if !state.sentry.read().await.is_allowed(&caller) {
        return Err(RpcError::sentry_rejected(&caller.to_string()));
    }
    let amount_out = state.pair.swap_exact_in(&asset_in, amount_in)?;

    Ok(serde_json::json!({ "amount_out": amount_out.to_string() }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::state_at;
    use cadence_types::events::EventType;
    use cadence_types::Address;

    const START: u64 = 1_700_000_000;

    #[tokio::test]
    async fn test_state_before_update() {
        let (state, _clock) = state_at(START);
        let value = get_oracle_state(&state).await.expect("state");
        assert_eq!(value["epoch"], 0);
        assert_eq!(value["can_update"], false);
        assert_eq!(value["price0_average"], "0");
        assert_eq!(value["reserve0"], "1000000000000");
    }

    #[tokio::test]
    async fn test_consult_zero_then_priced() {
        let (state, clock) = state_at(START);
        let token0 = state.config.pair.token0;
        let params = serde_json::json!({"asset": token0.to_string(), "amount_in": "1000000"});

        let before = consult(&state, &params).await.expect("consult");
        assert_eq!(before["amount_out"], "0");

        let err = twap(&state, &params).await.unwrap_err();
        assert_eq!(err.code, -32071);

        let mut rx = state.event_bus.subscribe();
        clock.advance(state.config.oracle.period_secs);
        let result = update(&state).await.expect("update");
        assert_eq!(result["status"], "updated");
        assert_eq!(rx.try_recv().expect("event").event_type, EventType::Updated);

        // Default reserves price one token0 at one token1: 10^18 in 18 decimals.
        let after = consult(&state, &params).await.expect("consult");
        assert_eq!(after["amount_out"], "1000000000000000000");
    }

    #[tokio::test]
    async fn test_consult_unknown_asset() {
        let (state, _clock) = state_at(START);
        let params = serde_json::json!({"asset": Address::repeat(0x77).to_string(), "amount_in": 1});
        let err = consult(&state, &params).await.unwrap_err();
        assert_eq!(err.code, -32072);
    }

    #[tokio::test]
    async fn test_swap_respects_sentry() {
        let (state, _clock) = state_at(START);
        let token0 = state.config.pair.token0;
        let blocked = Address::repeat(0xbb);
        let admin = state.config.sentry.admin;

        {
            let mut sentry = state.sentry.write().await;
            let strategy = Arc::new(cadence_sentry::strategy::AllowListStrategy::with_members(
                Address::repeat(0x10),
                [admin],
            ));
            sentry.add_strategy(&admin, strategy).expect("add");
        }

        let params = serde_json::json!({
            "caller": blocked.to_string(),
            "asset_in": token0.to_string(),
            "amount_in": "1000000",
        });
        let err = swap(&state, &params).await.unwrap_err();
        assert_eq!(err.code, -32074);

        let params = serde_json::json!({
            "caller": admin.to_string(),
            "asset_in": token0.to_string(),
            "amount_in": "1000000",
        });
        let out = swap(&state, &params).await.expect("swap");
        assert_ne!(out["amount_out"], "0");
    }

    #[tokio::test]
    async fn test_sync_reserves_admin_only() {
        let (state, _clock) = state_at(START);
        let params = serde_json::json!({
            "caller": Address::repeat(0x01).to_string(),
            "reserve0": "5",
            "reserve1": "10",
        });
        let err = sync_reserves(&state, &params).await.unwrap_err();
        assert_eq!(err.code, -32073);

        let params = serde_json::json!({
            "caller": state.config.sentry.admin.to_string(),
            "reserve0": "5",
            "reserve1": "10",
        });
        sync_reserves(&state, &params).await.expect("sync");
        assert_eq!(state.pair.reserves().expect("reserves"), (5, 10));
    }
}
