use async_trait::async_trait;
use serde_json::json;
use shared::{
    domain::{CitizenId, Identity, WantedId},
    error::HandlerError,
    protocol::{HandlerResult, Parameters},
};
use storage::StoreHandle;
use tracing::info;

use super::{ensure_citizen, requested_charges};
use crate::handler::{charge_ids, internal, optional_text, primary_id, required_id, ActionHandler};

pub struct AddWantedCharges;

#[async_trait]
impl ActionHandler for AddWantedCharges {
    async fn execute(
        &self,
        store: &mut StoreHandle,
        params: &Parameters,
        caller: &Identity,
    ) -> Result<HandlerResult, HandlerError> {
        let citizen_id = CitizenId(required_id(params, "citizen_id")?);
        let charge_ids = charge_ids(params)?;
        let reason = optional_text(params, "reason");

        ensure_citizen(store, citizen_id).await?;
        requested_charges(store, &charge_ids).await?;

        let wanted_id = store
            .insert_wanted(citizen_id, caller.user_id, &charge_ids, reason.as_deref())
            .await
            .map_err(internal)?;
        info!(
            citizen_id = citizen_id.0,
            wanted_id = wanted_id.0,
            officer_id = caller.user_id.0,
            "wanted entry added"
        );

        Ok(HandlerResult::ok_with_message(
            "Dodano list gończy",
            json!({ "wanted_id": wanted_id }),
        ))
    }
}

pub struct GetActiveWarrants;

#[async_trait]
impl ActionHandler for GetActiveWarrants {
    async fn execute(
        &self,
        store: &mut StoreHandle,
        _params: &Parameters,
        _caller: &Identity,
    ) -> Result<HandlerResult, HandlerError> {
        let warrants = store.active_warrants().await.map_err(internal)?;
        Ok(HandlerResult::ok(json!({ "warrants": warrants })))
    }
}

/// Admin only. The entry is deactivated, not erased.
pub struct DeleteWanted;

#[async_trait]
impl ActionHandler for DeleteWanted {
    async fn execute(
        &self,
        store: &mut StoreHandle,
        params: &Parameters,
        caller: &Identity,
    ) -> Result<HandlerResult, HandlerError> {
        if !caller.is_admin {
            return Err(HandlerError::Forbidden);
        }
        let wanted_id = WantedId(primary_id(params, "wanted_id")?);
        if !store.delete_wanted(wanted_id).await.map_err(internal)? {
            return Err(HandlerError::NotFound(
                "Nie znaleziono aktywnego listu gończego".to_string(),
            ));
        }
        info!(wanted_id = wanted_id.0, officer_id = caller.user_id.0, "wanted entry cleared");
        Ok(HandlerResult::ok_with_message(
            "List gończy został usunięty",
            json!({ "wanted_id": wanted_id }),
        ))
    }
}
