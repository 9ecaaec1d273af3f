use server_api::Dispatcher;
use storage::Storage;

use crate::session::SessionKeys;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) storage: Storage,
    pub(crate) dispatcher: Dispatcher,
    pub(crate) sessions: SessionKeys,
    pub(crate) login_path: String,
    pub(crate) legacy_mount_path: Option<String>,
}
