use async_trait::async_trait;
use serde_json::json;
use shared::{
    domain::{CitizenId, Identity},
    error::HandlerError,
    protocol::{HandlerResult, Parameters},
};
use storage::StoreHandle;

use crate::handler::{internal, primary_id, ActionHandler};

/// Citizen record together with verdicts, wanted entries and notes.
pub struct GetCitizen;

#[async_trait]
impl ActionHandler for GetCitizen {
    async fn execute(
        &self,
        store: &mut StoreHandle,
        params: &Parameters,
        _caller: &Identity,
    ) -> Result<HandlerResult, HandlerError> {
        let citizen_id = CitizenId(primary_id(params, "citizen_id")?);
        let citizen = store
            .get_citizen(citizen_id)
            .await
            .map_err(internal)?
            .ok_or_else(|| HandlerError::NotFound("Nie znaleziono obywatela".to_string()))?;

        let verdicts = store
            .verdicts_for_citizen(citizen_id)
            .await
            .map_err(internal)?;
        let wanted = store
            .wanted_for_citizen(citizen_id)
            .await
            .map_err(internal)?;
        let notes = store
            .notes_for_citizen(citizen_id)
            .await
            .map_err(internal)?;

        Ok(HandlerResult::ok(json!({
            "citizen": citizen,
            "verdicts": verdicts,
            "wanted": wanted,
            "notes": notes,
        })))
    }
}
