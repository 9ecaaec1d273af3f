use async_trait::async_trait;
use serde_json::json;
use shared::{
    domain::{CitizenId, Identity, VerdictId},
    error::HandlerError,
    protocol::{HandlerResult, Parameters},
};
use storage::StoreHandle;
use tracing::info;

use super::{ensure_citizen, requested_charges};
use crate::handler::{charge_ids, internal, optional_text, primary_id, required_id, ActionHandler};

pub struct AddVerdict;

#[async_trait]
impl ActionHandler for AddVerdict {
    async fn execute(
        &self,
        store: &mut StoreHandle,
        params: &Parameters,
        caller: &Identity,
    ) -> Result<HandlerResult, HandlerError> {
        let citizen_id = CitizenId(required_id(params, "citizen_id")?);
        let charge_ids = charge_ids(params)?;
        let description = optional_text(params, "description");

        ensure_citizen(store, citizen_id).await?;
        requested_charges(store, &charge_ids).await?;

        let stored = store
            .insert_verdict(citizen_id, caller.user_id, &charge_ids, description.as_deref())
            .await
            .map_err(internal)?;
        info!(
            citizen_id = citizen_id.0,
            verdict_id = stored.verdict_id.0,
            officer_id = caller.user_id.0,
            "verdict recorded"
        );

        Ok(HandlerResult::ok_with_message(
            "Wyrok został dodany",
            json!({
                "verdict_id": stored.verdict_id,
                "total_fine": stored.total_fine,
                "total_jail_months": stored.total_jail_months,
            }),
        ))
    }
}

pub struct GetVerdictDetails;

#[async_trait]
impl ActionHandler for GetVerdictDetails {
    async fn execute(
        &self,
        store: &mut StoreHandle,
        params: &Parameters,
        _caller: &Identity,
    ) -> Result<HandlerResult, HandlerError> {
        let verdict_id = VerdictId(primary_id(params, "verdict_id")?);
        let details = store
            .verdict_details(verdict_id)
            .await
            .map_err(internal)?
            .ok_or_else(|| HandlerError::NotFound("Nie znaleziono wyroku".to_string()))?;
        Ok(HandlerResult::ok(json!({
            "verdict": details.verdict,
            "charges": details.charges,
        })))
    }
}

/// Admin only.
pub struct DeleteVerdict;

#[async_trait]
impl ActionHandler for DeleteVerdict {
    async fn execute(
        &self,
        store: &mut StoreHandle,
        params: &Parameters,
        caller: &Identity,
    ) -> Result<HandlerResult, HandlerError> {
        if !caller.is_admin {
            return Err(HandlerError::Forbidden);
        }
        let verdict_id = VerdictId(primary_id(params, "verdict_id")?);
        if !store.delete_verdict(verdict_id).await.map_err(internal)? {
            return Err(HandlerError::NotFound("Nie znaleziono wyroku".to_string()));
        }
        info!(verdict_id = verdict_id.0, officer_id = caller.user_id.0, "verdict deleted");
        Ok(HandlerResult::ok_with_message(
            "Wyrok został usunięty",
            json!({ "verdict_id": verdict_id }),
        ))
    }
}
