use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);
    };
}

id_newtype!(UserId);
id_newtype!(CitizenId);
id_newtype!(ChargeId);
id_newtype!(VerdictId);
id_newtype!(WantedId);
id_newtype!(NoteId);

/// The authenticated caller, as resolved by the identity gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub username: String,
    pub is_admin: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citizen {
    pub citizen_id: CitizenId,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Option<String>,
    pub pesel: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Citizen {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewCitizen {
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Option<String>,
    pub pesel: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// An entry of the penal code catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Charge {
    pub charge_id: ChargeId,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub fine: i64,
    pub jail_months: i64,
}

#[derive(Debug, Clone, Default)]
pub struct NewCharge {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub fine: i64,
    pub jail_months: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerdictSummary {
    pub verdict_id: VerdictId,
    pub citizen_id: CitizenId,
    pub officer_id: UserId,
    pub officer_name: Option<String>,
    pub description: Option<String>,
    pub total_fine: i64,
    pub total_jail_months: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerdictDetails {
    pub verdict: VerdictSummary,
    pub charges: Vec<Charge>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WantedEntry {
    pub wanted_id: WantedId,
    pub citizen_id: CitizenId,
    pub citizen_name: String,
    pub officer_id: UserId,
    pub officer_name: Option<String>,
    pub reason: Option<String>,
    pub active: bool,
    pub charges: Vec<Charge>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub note_id: NoteId,
    pub citizen_id: CitizenId,
    pub officer_id: UserId,
    pub officer_name: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
