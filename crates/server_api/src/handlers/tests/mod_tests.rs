use super::*;
use serde_json::Value;
use shared::{
    domain::{Identity, NewCharge, NewCitizen, UserId},
    protocol::Parameters,
};
use storage::{StoreAccessor, Storage};

use crate::handler::ActionHandler;

struct Fixture {
    _storage: Storage,
    store: StoreHandle,
    officer: Identity,
    admin: Identity,
    citizen: CitizenId,
    theft: ChargeId,
    assault: ChargeId,
}

async fn setup() -> Fixture {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let mut store = storage.acquire().await.expect("handle");
    let officer_id = store
        .create_officer("nowak", "hash", false)
        .await
        .expect("officer");
    let admin_id = store
        .create_officer("komendant", "hash", true)
        .await
        .expect("admin");
    let citizen = store
        .create_citizen(&NewCitizen {
            first_name: "Jan".into(),
            last_name: "Kowalski".into(),
            pesel: Some("90010112345".into()),
            ..NewCitizen::default()
        })
        .await
        .expect("citizen");
    let theft = store
        .create_charge(&NewCharge {
            code: "KK-278".into(),
            name: "Kradzież".into(),
            description: None,
            fine: 1000,
            jail_months: 3,
        })
        .await
        .expect("charge");
    let assault = store
        .create_charge(&NewCharge {
            code: "KK-157".into(),
            name: "Pobicie".into(),
            description: None,
            fine: 2500,
            jail_months: 12,
        })
        .await
        .expect("charge");

    Fixture {
        _storage: storage,
        store,
        officer: identity(officer_id, "nowak", false),
        admin: identity(admin_id, "komendant", true),
        citizen,
        theft,
        assault,
    }
}

fn identity(user_id: UserId, username: &str, is_admin: bool) -> Identity {
    Identity {
        user_id,
        username: username.to_string(),
        is_admin,
    }
}

fn params(pairs: &[(&str, &str)]) -> Parameters {
    pairs.iter().copied().collect()
}

fn payload(result: &shared::protocol::HandlerResult) -> &Value {
    result.payload.as_ref().expect("payload")
}

#[test]
fn standard_registry_serves_the_exact_catalog() {
    let registry = standard_registry().expect("registry");
    let mut expected = actions::CATALOG.to_vec();
    expected.sort_unstable();
    assert_eq!(registry.action_ids(), expected);
    assert!(actions::CATALOG
        .iter()
        .all(|action| registry.resolve(action).is_some()));
}

#[tokio::test]
async fn get_citizen_returns_record_with_history() {
    let mut fx = setup().await;
    fx.store
        .insert_note(fx.citizen, fx.officer.user_id, "widziany w porcie")
        .await
        .expect("note");

    let id = fx.citizen.0.to_string();
    let result = GetCitizen
        .execute(&mut fx.store, &params(&[("id", id.as_str())]), &fx.officer)
        .await
        .expect("citizen");
    assert!(result.success);
    let payload = payload(&result);
    assert_eq!(payload["citizen"]["last_name"], "Kowalski");
    assert_eq!(payload["notes"].as_array().expect("notes").len(), 1);
    assert!(payload["verdicts"].as_array().expect("verdicts").is_empty());
}

#[tokio::test]
async fn get_citizen_reports_missing_citizen() {
    let mut fx = setup().await;
    let err = GetCitizen
        .execute(&mut fx.store, &params(&[("citizen_id", "999")]), &fx.officer)
        .await
        .expect_err("should fail");
    assert!(matches!(err, HandlerError::NotFound(_)));
}

#[tokio::test]
async fn get_charges_lists_catalog_by_code() {
    let mut fx = setup().await;
    let result = GetCharges
        .execute(&mut fx.store, &params(&[]), &fx.officer)
        .await
        .expect("charges");
    let charges = payload(&result)["charges"].as_array().expect("charges").clone();
    let codes: Vec<_> = charges.iter().map(|c| c["code"].clone()).collect();
    assert_eq!(codes, ["KK-157", "KK-278"]);
}

#[tokio::test]
async fn add_verdict_sums_charges_and_can_be_read_back() {
    let mut fx = setup().await;
    let citizen = fx.citizen.0.to_string();
    let theft = fx.theft.0.to_string();
    let assault = fx.assault.0.to_string();

    let result = AddVerdict
        .execute(
            &mut fx.store,
            &params(&[
                ("citizen_id", citizen.as_str()),
                ("charge_ids[]", theft.as_str()),
                ("charge_ids[]", assault.as_str()),
                ("description", "napad na sklep"),
            ]),
            &fx.officer,
        )
        .await
        .expect("verdict");
    assert!(result.success);
    assert_eq!(payload(&result)["total_fine"], 3500);
    assert_eq!(payload(&result)["total_jail_months"], 15);

    let verdict_id = payload(&result)["verdict_id"].as_i64().expect("id").to_string();
    let details = GetVerdictDetails
        .execute(&mut fx.store, &params(&[("verdict_id", verdict_id.as_str())]), &fx.officer)
        .await
        .expect("details");
    assert_eq!(payload(&details)["charges"].as_array().expect("charges").len(), 2);
    assert_eq!(payload(&details)["verdict"]["officer_name"], "nowak");
}

#[tokio::test]
async fn add_verdict_rejects_unknown_charge() {
    let mut fx = setup().await;
    let citizen = fx.citizen.0.to_string();
    let err = AddVerdict
        .execute(
            &mut fx.store,
            &params(&[("citizen_id", citizen.as_str()), ("charge_ids", "4242")]),
            &fx.officer,
        )
        .await
        .expect_err("should fail");
    assert!(matches!(err, HandlerError::InvalidParameter { .. }));
    assert!(fx
        .store
        .verdicts_for_citizen(fx.citizen)
        .await
        .expect("list")
        .is_empty());
}

#[tokio::test]
async fn delete_verdict_requires_admin() {
    let mut fx = setup().await;
    let stored = fx
        .store
        .insert_verdict(fx.citizen, fx.officer.user_id, &[fx.theft], None)
        .await
        .expect("verdict");
    let id = stored.verdict_id.0.to_string();

    let err = DeleteVerdict
        .execute(&mut fx.store, &params(&[("verdict_id", id.as_str())]), &fx.officer)
        .await
        .expect_err("officer cannot delete");
    assert!(matches!(err, HandlerError::Forbidden));

    let result = DeleteVerdict
        .execute(&mut fx.store, &params(&[("verdict_id", id.as_str())]), &fx.admin)
        .await
        .expect("admin deletes");
    assert!(result.success);

    let err = DeleteVerdict
        .execute(&mut fx.store, &params(&[("verdict_id", id.as_str())]), &fx.admin)
        .await
        .expect_err("already gone");
    assert!(matches!(err, HandlerError::NotFound(_)));
}

#[tokio::test]
async fn wanted_lifecycle() {
    let mut fx = setup().await;
    let citizen = fx.citizen.0.to_string();
    let assault = fx.assault.0.to_string();

    let added = AddWantedCharges
        .execute(
            &mut fx.store,
            &params(&[
                ("citizen_id", citizen.as_str()),
                ("charge_ids[]", assault.as_str()),
                ("reason", "uciekł z miejsca zdarzenia"),
            ]),
            &fx.officer,
        )
        .await
        .expect("wanted");
    let wanted_id = payload(&added)["wanted_id"].as_i64().expect("id").to_string();

    let active = GetActiveWarrants
        .execute(&mut fx.store, &params(&[]), &fx.officer)
        .await
        .expect("warrants");
    let warrants = payload(&active)["warrants"].as_array().expect("warrants").clone();
    assert_eq!(warrants.len(), 1);
    assert_eq!(warrants[0]["citizen_name"], "Jan Kowalski");

    let err = DeleteWanted
        .execute(&mut fx.store, &params(&[("wanted_id", wanted_id.as_str())]), &fx.officer)
        .await
        .expect_err("officer cannot clear");
    assert!(matches!(err, HandlerError::Forbidden));

    DeleteWanted
        .execute(&mut fx.store, &params(&[("wanted_id", wanted_id.as_str())]), &fx.admin)
        .await
        .expect("admin clears");
    let active = GetActiveWarrants
        .execute(&mut fx.store, &params(&[]), &fx.officer)
        .await
        .expect("warrants");
    assert!(payload(&active)["warrants"].as_array().expect("warrants").is_empty());
}

#[tokio::test]
async fn add_note_validates_content() {
    let mut fx = setup().await;
    let citizen = fx.citizen.0.to_string();

    let err = AddNote
        .execute(
            &mut fx.store,
            &params(&[("citizen_id", citizen.as_str()), ("content", "   ")]),
            &fx.officer,
        )
        .await
        .expect_err("blank note");
    assert!(matches!(err, HandlerError::MissingParameter(_)));

    let long = "x".repeat(2001);
    let err = AddNote
        .execute(
            &mut fx.store,
            &params(&[("citizen_id", citizen.as_str()), ("content", long.as_str())]),
            &fx.officer,
        )
        .await
        .expect_err("too long");
    assert!(matches!(err, HandlerError::InvalidParameter { .. }));
}

#[tokio::test]
async fn delete_note_allows_author_and_admin_only() {
    let mut fx = setup().await;
    let other = identity(
        fx.store
            .create_officer("zielinska", "hash", false)
            .await
            .expect("officer"),
        "zielinska",
        false,
    );
    let citizen = fx.citizen.0.to_string();

    let added = AddNote
        .execute(
            &mut fx.store,
            &params(&[("citizen_id", citizen.as_str()), ("content", "zgłoszenie sąsiada")]),
            &fx.officer,
        )
        .await
        .expect("note");
    let note_id = payload(&added)["note_id"].as_i64().expect("id").to_string();

    let err = DeleteNote
        .execute(&mut fx.store, &params(&[("note_id", note_id.as_str())]), &other)
        .await
        .expect_err("not the author");
    assert!(matches!(err, HandlerError::Forbidden));

    let result = DeleteNote
        .execute(&mut fx.store, &params(&[("note_id", note_id.as_str())]), &fx.officer)
        .await
        .expect("author deletes");
    assert!(result.success);
}

#[tokio::test]
async fn delete_note_reports_not_found_when_nothing_was_removed() {
    let suffix = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let root = std::env::temp_dir().join(format!("police_tablet_notes_test_{suffix}"));
    let url = format!("sqlite://{}", root.join("tablet.db").display());

    let storage = Storage::new(&url).await.expect("db");
    let mut store = storage.acquire().await.expect("handle");
    let officer_id = store
        .create_officer("nowak", "hash", false)
        .await
        .expect("officer");
    let citizen = store
        .create_citizen(&NewCitizen {
            first_name: "Jan".into(),
            last_name: "Kowalski".into(),
            ..NewCitizen::default()
        })
        .await
        .expect("citizen");
    let note_id = store
        .insert_note(citizen, officer_id, "obserwacja")
        .await
        .expect("note");

    // A second connection swallows every delete on `notes`, so the row is
    // still there for the author lookup but the delete touches nothing.
    let raw = sqlx::SqlitePool::connect(&url).await.expect("raw pool");
    sqlx::query("CREATE TRIGGER keep_notes BEFORE DELETE ON notes BEGIN SELECT RAISE(IGNORE); END")
        .execute(&raw)
        .await
        .expect("trigger");
    raw.close().await;

    let err = DeleteNote
        .execute(
            &mut store,
            &params(&[("note_id", note_id.0.to_string().as_str())]),
            &identity(officer_id, "nowak", false),
        )
        .await
        .expect_err("nothing deleted");
    assert!(matches!(err, HandlerError::NotFound(_)));

    drop(store);
    storage.close().await;
    std::fs::remove_dir_all(root).expect("cleanup");
}
