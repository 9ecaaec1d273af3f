use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ErrorCode;

/// Identifiers accepted in the `action` field of a POST request.
pub mod actions {
    pub const GET_CITIZEN: &str = "get_citizen";
    pub const GET_CHARGES: &str = "get_charges";
    pub const ADD_VERDICT: &str = "add_verdict";
    pub const GET_VERDICT_DETAILS: &str = "get_verdict_details";
    pub const DELETE_VERDICT: &str = "delete_verdict";
    pub const ADD_WANTED_CHARGES: &str = "add_wanted_charges";
    pub const GET_ACTIVE_WARRANTS: &str = "get_active_warrants";
    pub const DELETE_WANTED: &str = "delete_wanted";
    pub const ADD_NOTE: &str = "add_note";
    pub const DELETE_NOTE: &str = "delete_note";

    pub const CATALOG: [&str; 10] = [
        GET_CITIZEN,
        GET_CHARGES,
        ADD_VERDICT,
        GET_VERDICT_DETAILS,
        DELETE_VERDICT,
        ADD_WANTED_CHARGES,
        GET_ACTIVE_WARRANTS,
        DELETE_WANTED,
        ADD_NOTE,
        DELETE_NOTE,
    ];
}

pub const ACTION_FIELD: &str = "action";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
}

/// Form fields as submitted, in order. Keys may repeat (`charge_ids[]`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters(Vec<(String, String)>);

impl Parameters {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self(pairs)
    }

    /// First value submitted under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// One inbound unit of work for the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequest {
    method: Method,
    action: Option<String>,
    parameters: Parameters,
}

impl ActionRequest {
    /// The `action` pair is read but left in `parameters`.
    pub fn new(method: Method, parameters: Parameters) -> Self {
        let action = parameters.get(ACTION_FIELD).map(str::to_string);
        Self {
            method,
            action,
            parameters,
        }
    }

    pub fn get(parameters: Parameters) -> Self {
        Self::new(Method::Get, parameters)
    }

    pub fn post(parameters: Parameters) -> Self {
        Self::new(Method::Post, parameters)
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }
}

/// Envelope returned for every routed action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl HandlerResult {
    pub fn ok(payload: Value) -> Self {
        Self {
            success: true,
            code: None,
            message: None,
            payload: Some(payload),
        }
    }

    pub fn ok_with_message(message: impl Into<String>, payload: Value) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::ok(payload)
        }
    }

    pub fn failure(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            success: false,
            code: Some(code),
            message: Some(message.into()),
            payload: None,
        }
    }

    pub fn unknown_action(action: &str) -> Self {
        Self::failure(ErrorCode::UnknownAction, format!("Nieznana akcja: {action}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn action_is_read_from_parameters_and_kept_there() {
        let params: Parameters = [("action", "get_citizen"), ("citizen_id", "7")]
            .into_iter()
            .collect();
        let request = ActionRequest::post(params.clone());
        assert_eq!(request.action(), Some("get_citizen"));
        assert_eq!(request.parameters(), &params);
    }

    #[test]
    fn repeated_keys_are_preserved_in_order() {
        let params: Parameters = [("charge_ids[]", "3"), ("x", "y"), ("charge_ids[]", "1")]
            .into_iter()
            .collect();
        assert_eq!(params.get("charge_ids[]"), Some("3"));
        assert_eq!(params.get_all("charge_ids[]").collect::<Vec<_>>(), ["3", "1"]);
    }

    #[test]
    fn unknown_action_envelope_names_the_action() {
        let value = serde_json::to_value(HandlerResult::unknown_action("frobnicate")).expect("json");
        assert_eq!(
            value,
            json!({
                "success": false,
                "code": "unknown_action",
                "message": "Nieznana akcja: frobnicate"
            })
        );
    }

    #[test]
    fn success_envelope_omits_empty_fields() {
        let value = serde_json::to_value(HandlerResult::ok(json!({ "id": 1 }))).expect("json");
        assert_eq!(value, json!({ "success": true, "payload": { "id": 1 } }));
    }
}
