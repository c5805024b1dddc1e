//! Device availability probe against the eWeLink cloud API.
//!
//! One bounded outbound call per cycle. Every failure mode (transport error,
//! timeout, non-2xx status, payload without the nested online flag) collapses
//! into the probe error category so the runner can treat the whole cycle as
//! "no signal". Retry cadence belongs to the external scheduler, not here.

use std::time::Duration;

use chrono::Utc;
use serde_json::{Value, json};

use crate::core::config::ProbeConfig;
use crate::core::errors::{PsnError, Result};
use crate::engine::Observation;

/// Source of availability observations.
pub trait Probe {
    /// Take one reading, or fail without side effects.
    fn observe(&self) -> Result<Observation>;
}

/// HTTP probe for a single eWeLink device.
pub struct EwelinkProbe {
    client: reqwest::blocking::Client,
    api_url: String,
    device_id: String,
    access_token: String,
}

impl EwelinkProbe {
    /// Build the probe with the configured endpoint, device, and timeout.
    pub fn from_config(config: &ProbeConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PsnError::Runtime {
                details: format!("http client construction failed: {e}"),
            })?;
        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            device_id: config.device_id.clone(),
            access_token: config.access_token.clone(),
        })
    }
}

impl Probe for EwelinkProbe {
    fn observe(&self) -> Result<Observation> {
        let body = json!({
            "thingList": [{
                "itemType": 1,
                "id": self.device_id,
            }]
        });
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .map_err(|e| PsnError::probe(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PsnError::probe(format!("unexpected status {status}")));
        }

        let payload: Value = response
            .json()
            .map_err(|e| PsnError::probe(format!("unparseable response body: {e}")))?;
        let (online, raw) = parse_device_payload(&payload)?;
        Ok(Observation {
            online,
            observed_at: Utc::now().timestamp(),
            raw,
        })
    }
}

/// Extract the availability flag and the opaque device object from a
/// device-status response.
pub fn parse_device_payload(payload: &Value) -> Result<(bool, Value)> {
    let device = payload
        .get("data")
        .and_then(|data| data.get("thingList"))
        .and_then(|list| list.get(0))
        .ok_or_else(|| PsnError::probe("response carries no thingList entry"))?;
    let online = device
        .get("itemData")
        .and_then(|item| item.get("online"))
        .and_then(Value::as_bool)
        .ok_or_else(|| PsnError::probe("response carries no online flag"))?;
    Ok((online, device.clone()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::parse_device_payload;

    #[test]
    fn online_flag_and_raw_payload_extracted() {
        let payload = json!({
            "error": 0,
            "data": {
                "thingList": [{
                    "itemType": 1,
                    "itemData": {"online": true, "name": "Garage"},
                }]
            }
        });
        let (online, raw) = parse_device_payload(&payload).expect("payload should parse");
        assert!(online);
        assert_eq!(raw["itemData"]["name"], json!("Garage"));
    }

    #[test]
    fn offline_flag_extracted() {
        let payload = json!({
            "data": {"thingList": [{"itemData": {"online": false}}]}
        });
        let (online, _) = parse_device_payload(&payload).expect("payload should parse");
        assert!(!online);
    }

    #[test]
    fn empty_thing_list_is_a_probe_failure() {
        let payload = json!({"data": {"thingList": []}});
        let error = parse_device_payload(&payload).expect_err("must fail");
        assert_eq!(error.code(), "PSN-2001");
    }

    #[test]
    fn non_boolean_online_flag_is_a_probe_failure() {
        let payload = json!({
            "data": {"thingList": [{"itemData": {"online": "yes"}}]}
        });
        assert!(parse_device_payload(&payload).is_err());
    }

    #[test]
    fn missing_data_section_is_a_probe_failure() {
        let payload = json!({"error": 401, "msg": "token expired"});
        assert!(parse_device_payload(&payload).is_err());
    }
}
