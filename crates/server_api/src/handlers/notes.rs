use async_trait::async_trait;
use serde_json::json;
use shared::{
    domain::{CitizenId, Identity, NoteId},
    error::HandlerError,
    protocol::{HandlerResult, Parameters},
};
use storage::StoreHandle;
use tracing::info;

use super::ensure_citizen;
use crate::handler::{internal, optional_text, primary_id, required_id, ActionHandler};

const MAX_NOTE_CHARS: usize = 2000;

pub struct AddNote;

#[async_trait]
impl ActionHandler for AddNote {
    async fn execute(
        &self,
        store: &mut StoreHandle,
        params: &Parameters,
        caller: &Identity,
    ) -> Result<HandlerResult, HandlerError> {
        let citizen_id = CitizenId(required_id(params, "citizen_id")?);
        let content = optional_text(params, "content")
            .ok_or_else(|| HandlerError::MissingParameter("content".to_string()))?;
        if content.chars().count() > MAX_NOTE_CHARS {
            return Err(HandlerError::invalid(
                "content",
                format!("{} characters", content.chars().count()),
            ));
        }

        ensure_citizen(store, citizen_id).await?;
        let note_id = store
            .insert_note(citizen_id, caller.user_id, &content)
            .await
            .map_err(internal)?;
        info!(citizen_id = citizen_id.0, note_id = note_id.0, officer_id = caller.user_id.0, "note added");

        Ok(HandlerResult::ok_with_message(
            "Notatka została dodana",
            json!({ "note_id": note_id }),
        ))
    }
}

/// Allowed for the note's author and for admins.
pub struct DeleteNote;

#[async_trait]
impl ActionHandler for DeleteNote {
    async fn execute(
        &self,
        store: &mut StoreHandle,
        params: &Parameters,
        caller: &Identity,
    ) -> Result<HandlerResult, HandlerError> {
        let note_id = NoteId(primary_id(params, "note_id")?);
        let author = store
            .note_author(note_id)
            .await
            .map_err(internal)?
            .ok_or_else(|| HandlerError::NotFound("Nie znaleziono notatki".to_string()))?;
        if author != caller.user_id && !caller.is_admin {
            return Err(HandlerError::Forbidden);
        }

        if !store.delete_note(note_id).await.map_err(internal)? {
            return Err(HandlerError::NotFound("Nie znaleziono notatki".to_string()));
        }
        info!(note_id = note_id.0, officer_id = caller.user_id.0, "note deleted");
        Ok(HandlerResult::ok_with_message(
            "Notatka została usunięta",
            json!({ "note_id": note_id }),
        ))
    }
}
