//! IPC command handlers.
//!
//! Each submodule implements the commands for one IPC category. Amounts
//! travel as decimal strings; plain JSON integers are accepted too.

pub mod oracle;
pub mod sentry;

use cadence_types::Address;
use ethnum::U256;
use serde_json::Value;

use crate::rpc::RpcError;

/// Read a required address parameter.
pub(crate) fn address_param(params: &Value, key: &str) -> Result<Address, RpcError> {
    let raw = params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params(&format!("{key} required")))?;
    Address::parse(raw).map_err(|e| RpcError::invalid_params(&format!("{key}: {e}")))
}

/// Read an optional list of addresses.
pub(crate) fn address_list_param(params: &Value, key: &str) -> Result<Vec<Address>, RpcError> {
    let Some(items) = params.get(key) else {
        return Ok(Vec::new());
    };
    let items = items
        .as_array()
        .ok_or_else(|| RpcError::invalid_params(&format!("{key} must be an array")))?;
    items
        .iter()
        .map(|item| {
            item.as_str()
                .and_then(|s| Address::parse(s).ok())
                .ok_or_else(|| RpcError::invalid_params(&format!("{key}: invalid address {item}")))
        })
        .collect()
}

/// Read a required unsigned 256-bit amount.
pub(crate) fn amount_param(params: &Value, key: &str) -> Result<U256, RpcError> {
    match params.get(key) {
        Some(Value::String(s)) => U256::from_str_radix(s, 10)
            .map_err(|e| RpcError::invalid_params(&format!("{key}: {e}"))),
        Some(Value::Number(n)) => n
            .as_u64()
            .map(|v| U256::new(u128::from(v)))
            .ok_or_else(|| RpcError::invalid_params(&format!("{key} must be unsigned"))),
        _ => Err(RpcError::invalid_params(&format!("{key} required"))),
    }
}

/// Read a required amount that must fit 128 bits.
pub(crate) fn u128_param(params: &Value, key: &str) -> Result<u128, RpcError> {
    let amount = amount_param(params, key)?;
    if amount > U256::new(u128::MAX) {
        return Err(RpcError::invalid_params(&format!("{key} too large")));
    }
    Ok(amount.as_u128())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_param_accepts_strings_and_numbers() {
        let params = serde_json::json!({"a": "340282366920938463463374607431768211456", "b": 7});
        assert_eq!(
            amount_param(&params, "a").expect("a"),
            U256::new(u128::MAX) + U256::ONE
        );
        assert_eq!(amount_param(&params, "b").expect("b"), U256::new(7));
        assert!(amount_param(&params, "c").is_err());
        assert!(amount_param(&serde_json::json!({"a": "-1"}), "a").is_err());
    }

    #[test]
    fn test_u128_param_bounds() {
        let params = serde_json::json!({"a": "340282366920938463463374607431768211456"});
        assert!(u128_param(&params, "a").is_err());
    }

    #[test]
    fn test_address_params() {
        let addr = Address::repeat(0x42);
        let params = serde_json::json!({
            "who": addr.to_string(),
            "list": [addr.to_string()],
            "bad": ["0x12"],
        });
        assert_eq!(address_param(&params, "who").expect("who"), addr);
        assert_eq!(address_list_param(&params, "list").expect("list"), vec![addr]);
        assert!(address_list_param(&params, "missing").expect("missing").is_empty());
        assert!(address_list_param(&params, "bad").is_err());
        assert!(address_param(&params, "missing").is_err());
    }
}
