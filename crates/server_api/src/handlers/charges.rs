use async_trait::async_trait;
use serde_json::json;
use shared::{
    domain::Identity,
    error::HandlerError,
    protocol::{HandlerResult, Parameters},
};
use storage::StoreHandle;

use crate::handler::{internal, ActionHandler};

pub struct GetCharges;

#[async_trait]
impl ActionHandler for GetCharges {
    async fn execute(
        &self,
        store: &mut StoreHandle,
        _params: &Parameters,
        _caller: &Identity,
    ) -> Result<HandlerResult, HandlerError> {
        let charges = store.list_charges().await.map_err(internal)?;
        Ok(HandlerResult::ok(json!({ "charges": charges })))
    }
}
