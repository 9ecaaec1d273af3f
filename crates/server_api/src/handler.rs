use async_trait::async_trait;
use shared::{
    domain::{ChargeId, Identity},
    error::HandlerError,
    protocol::{HandlerResult, Parameters},
};
use storage::StoreHandle;

/// A single server-side operation reachable through the action registry.
///
/// Handlers only return data; the dispatcher is the one that writes the
/// response.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn execute(
        &self,
        store: &mut StoreHandle,
        params: &Parameters,
        caller: &Identity,
    ) -> Result<HandlerResult, HandlerError>;
}

pub(crate) fn internal(err: anyhow::Error) -> HandlerError {
    HandlerError::Store(format!("{err:#}"))
}

/// Parses a positive integer id from `name`.
pub(crate) fn required_id(params: &Parameters, name: &str) -> Result<i64, HandlerError> {
    let raw = params
        .get(name)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| HandlerError::MissingParameter(name.to_string()))?;
    parse_id(name, raw)
}

/// Like [`required_id`], but also accepts the generic `id` field.
pub(crate) fn primary_id(params: &Parameters, name: &str) -> Result<i64, HandlerError> {
    match params.get(name).map(str::trim).filter(|v| !v.is_empty()) {
        Some(raw) => parse_id(name, raw),
        None if params.get("id").is_some() => required_id(params, "id"),
        None => Err(HandlerError::MissingParameter(name.to_string())),
    }
}

pub(crate) fn optional_text(params: &Parameters, name: &str) -> Option<String> {
    params
        .get(name)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Collects `charge_ids[]` / `charge_ids` values, each possibly a
/// comma-separated list. Order is kept, duplicates dropped.
pub(crate) fn charge_ids(params: &Parameters) -> Result<Vec<ChargeId>, HandlerError> {
    let mut ids = Vec::new();
    for raw in params
        .get_all("charge_ids[]")
        .chain(params.get_all("charge_ids"))
    {
        for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let id = ChargeId(parse_id("charge_ids", part)?);
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }

    if ids.is_empty() {
        return Err(HandlerError::MissingParameter("charge_ids".to_string()));
    }
    Ok(ids)
}

fn parse_id(name: &str, raw: &str) -> Result<i64, HandlerError> {
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| HandlerError::invalid(name, raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Parameters {
        pairs.iter().copied().collect()
    }

    #[test]
    fn required_id_rejects_missing_and_malformed_values() {
        assert!(matches!(
            required_id(&params(&[]), "citizen_id"),
            Err(HandlerError::MissingParameter(_))
        ));
        assert!(matches!(
            required_id(&params(&[("citizen_id", "  ")]), "citizen_id"),
            Err(HandlerError::MissingParameter(_))
        ));
        assert!(matches!(
            required_id(&params(&[("citizen_id", "-3")]), "citizen_id"),
            Err(HandlerError::InvalidParameter { .. })
        ));
        assert_eq!(
            required_id(&params(&[("citizen_id", " 12 ")]), "citizen_id").expect("id"),
            12
        );
    }

    #[test]
    fn primary_id_falls_back_to_generic_id() {
        assert_eq!(primary_id(&params(&[("id", "9")]), "note_id").expect("id"), 9);
        assert_eq!(
            primary_id(&params(&[("note_id", "3"), ("id", "9")]), "note_id").expect("id"),
            3
        );
    }

    #[test]
    fn charge_ids_accepts_arrays_and_comma_lists() {
        let ids = charge_ids(&params(&[
            ("charge_ids[]", "4"),
            ("charge_ids[]", "2"),
            ("charge_ids", "2, 7"),
        ]))
        .expect("ids");
        assert_eq!(ids, [ChargeId(4), ChargeId(2), ChargeId(7)]);

        assert!(matches!(
            charge_ids(&params(&[("charge_ids", "")])),
            Err(HandlerError::MissingParameter(_))
        ));
        assert!(matches!(
            charge_ids(&params(&[("charge_ids[]", "x")])),
            Err(HandlerError::InvalidParameter { .. })
        ));
    }
}
