//! Built-in actions of the records tablet.

mod charges;
mod citizens;
mod notes;
mod verdicts;
mod wanted;

pub use charges::GetCharges;
pub use citizens::GetCitizen;
pub use notes::{AddNote, DeleteNote};
pub use verdicts::{AddVerdict, DeleteVerdict, GetVerdictDetails};
pub use wanted::{AddWantedCharges, DeleteWanted, GetActiveWarrants};

use shared::{
    domain::{Charge, ChargeId, CitizenId},
    error::HandlerError,
    protocol::actions,
};
use storage::StoreHandle;

use crate::{
    handler::internal,
    registry::{ActionRegistry, RegistryBuilder, RegistryError},
};

/// The fixed action catalog served by the tablet.
pub fn standard_registry() -> Result<ActionRegistry, RegistryError> {
    let mut builder = RegistryBuilder::new();
    builder
        .register(actions::GET_CITIZEN, GetCitizen)?
        .register(actions::GET_CHARGES, GetCharges)?
        .register(actions::ADD_VERDICT, AddVerdict)?
        .register(actions::GET_VERDICT_DETAILS, GetVerdictDetails)?
        .register(actions::DELETE_VERDICT, DeleteVerdict)?
        .register(actions::ADD_WANTED_CHARGES, AddWantedCharges)?
        .register(actions::GET_ACTIVE_WARRANTS, GetActiveWarrants)?
        .register(actions::DELETE_WANTED, DeleteWanted)?
        .register(actions::ADD_NOTE, AddNote)?
        .register(actions::DELETE_NOTE, DeleteNote)?;
    Ok(builder.build())
}

async fn ensure_citizen(store: &mut StoreHandle, citizen_id: CitizenId) -> Result<(), HandlerError> {
    store
        .get_citizen(citizen_id)
        .await
        .map_err(internal)?
        .map(|_| ())
        .ok_or_else(|| HandlerError::NotFound("Nie znaleziono obywatela".to_string()))
}

/// Every requested charge must exist in the catalog.
async fn requested_charges(
    store: &mut StoreHandle,
    charge_ids: &[ChargeId],
) -> Result<Vec<Charge>, HandlerError> {
    let charges = store.charges_by_ids(charge_ids).await.map_err(internal)?;
    if let Some(unknown) = charge_ids
        .iter()
        .find(|id| !charges.iter().any(|c| c.charge_id == **id))
    {
        return Err(HandlerError::invalid("charge_ids", unknown.0.to_string()));
    }
    Ok(charges)
}

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;
