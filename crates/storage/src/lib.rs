use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    pool::PoolConnection,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Connection, Pool, QueryBuilder, Row, Sqlite, SqliteConnection,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use shared::domain::{
    Charge, ChargeId, Citizen, CitizenId, Identity, NewCharge, NewCitizen, Note, NoteId, UserId,
    VerdictDetails, VerdictId, VerdictSummary, WantedEntry, WantedId,
};

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

/// A pooled connection scoped to a single request. Dropping it returns the
/// connection to the pool.
pub struct StoreHandle {
    conn: PoolConnection<Sqlite>,
}

/// Produces a [`StoreHandle`] for the current request.
#[async_trait]
pub trait StoreAccessor: Send + Sync {
    async fn acquire(&self) -> Result<StoreHandle>;
}

#[derive(Debug, Clone)]
pub struct OfficerCredentials {
    pub identity: Identity,
    pub password_hash: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoredVerdict {
    pub verdict_id: VerdictId,
    pub total_fine: i64,
    pub total_jail_months: i64,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    /// Closes the pool; later `acquire` calls fail.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl StoreAccessor for Storage {
    async fn acquire(&self) -> Result<StoreHandle> {
        let conn = self
            .pool
            .acquire()
            .await
            .context("failed to acquire a database connection")?;
        Ok(StoreHandle { conn })
    }
}

impl StoreHandle {
    pub async fn create_officer(
        &mut self,
        username: &str,
        password_hash: &str,
        is_admin: bool,
    ) -> Result<UserId> {
        let rec = sqlx::query(
            "INSERT INTO officers (username, password_hash, is_admin) VALUES (?, ?, ?)
             ON CONFLICT(username) DO UPDATE SET password_hash=excluded.password_hash, is_admin=excluded.is_admin
             RETURNING id",
        )
        .bind(username)
        .bind(password_hash)
        .bind(is_admin)
        .fetch_one(&mut *self.conn)
        .await?;
        Ok(UserId(rec.get::<i64, _>(0)))
    }

    pub async fn officer_credentials(&mut self, username: &str) -> Result<Option<OfficerCredentials>> {
        let row = sqlx::query(
            "SELECT id, username, is_admin, password_hash FROM officers WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&mut *self.conn)
        .await?;
        Ok(row.map(|r| OfficerCredentials {
            identity: Identity {
                user_id: UserId(r.get::<i64, _>(0)),
                username: r.get::<String, _>(1),
                is_admin: r.get::<bool, _>(2),
            },
            password_hash: r.get::<String, _>(3),
        }))
    }

    pub async fn create_citizen(&mut self, citizen: &NewCitizen) -> Result<CitizenId> {
        let rec = sqlx::query(
            "INSERT INTO citizens (first_name, last_name, birth_date, pesel, phone, address)
             VALUES (?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(&citizen.first_name)
        .bind(&citizen.last_name)
        .bind(citizen.birth_date.as_deref())
        .bind(citizen.pesel.as_deref())
        .bind(citizen.phone.as_deref())
        .bind(citizen.address.as_deref())
        .fetch_one(&mut *self.conn)
        .await?;
        Ok(CitizenId(rec.get::<i64, _>(0)))
    }

    pub async fn get_citizen(&mut self, citizen_id: CitizenId) -> Result<Option<Citizen>> {
        let row = sqlx::query(
            "SELECT id, first_name, last_name, birth_date, pesel, phone, address, created_at
             FROM citizens WHERE id = ?",
        )
        .bind(citizen_id.0)
        .fetch_optional(&mut *self.conn)
        .await?;
        Ok(row.as_ref().map(citizen_from_row))
    }

    pub async fn list_citizens(&mut self) -> Result<Vec<Citizen>> {
        let rows = sqlx::query(
            "SELECT id, first_name, last_name, birth_date, pesel, phone, address, created_at
             FROM citizens
             ORDER BY lower(last_name) ASC, lower(first_name) ASC, id ASC",
        )
        .fetch_all(&mut *self.conn)
        .await?;
        Ok(rows.iter().map(citizen_from_row).collect())
    }

    pub async fn create_charge(&mut self, charge: &NewCharge) -> Result<ChargeId> {
        let rec = sqlx::query(
            "INSERT INTO charges (code, name, description, fine, jail_months) VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(code) DO UPDATE SET name=excluded.name, description=excluded.description,
                 fine=excluded.fine, jail_months=excluded.jail_months
             RETURNING id",
        )
        .bind(&charge.code)
        .bind(&charge.name)
        .bind(charge.description.as_deref())
        .bind(charge.fine)
        .bind(charge.jail_months)
        .fetch_one(&mut *self.conn)
        .await?;
        Ok(ChargeId(rec.get::<i64, _>(0)))
    }

    pub async fn list_charges(&mut self) -> Result<Vec<Charge>> {
        let rows = sqlx::query(
            "SELECT id, code, name, description, fine, jail_months FROM charges ORDER BY code ASC",
        )
        .fetch_all(&mut *self.conn)
        .await?;
        Ok(rows.iter().map(charge_from_row).collect())
    }

    /// Loads the given charges; ids that do not exist are skipped.
    pub async fn charges_by_ids(&mut self, charge_ids: &[ChargeId]) -> Result<Vec<Charge>> {
        load_charges(&mut self.conn, charge_ids).await
    }

    /// Records a verdict with totals summed from the charge catalog.
    pub async fn insert_verdict(
        &mut self,
        citizen_id: CitizenId,
        officer_id: UserId,
        charge_ids: &[ChargeId],
        description: Option<&str>,
    ) -> Result<StoredVerdict> {
        let mut tx = self.conn.begin().await?;
        let charges = load_charges(&mut tx, charge_ids).await?;
        let total_fine = charges.iter().map(|c| c.fine).sum::<i64>();
        let total_jail_months = charges.iter().map(|c| c.jail_months).sum::<i64>();

        let rec = sqlx::query(
            "INSERT INTO verdicts (citizen_id, officer_id, description, total_fine, total_jail_months)
             VALUES (?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(citizen_id.0)
        .bind(officer_id.0)
        .bind(description)
        .bind(total_fine)
        .bind(total_jail_months)
        .fetch_one(&mut *tx)
        .await?;
        let verdict_id = VerdictId(rec.get::<i64, _>(0));

        for charge in &charges {
            sqlx::query("INSERT INTO verdict_charges (verdict_id, charge_id) VALUES (?, ?)")
                .bind(verdict_id.0)
                .bind(charge.charge_id.0)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(StoredVerdict {
            verdict_id,
            total_fine,
            total_jail_months,
        })
    }

    pub async fn verdicts_for_citizen(&mut self, citizen_id: CitizenId) -> Result<Vec<VerdictSummary>> {
        let rows = sqlx::query(
            "SELECT v.id, v.citizen_id, v.officer_id, o.username, v.description,
                    v.total_fine, v.total_jail_months, v.created_at
             FROM verdicts v
             LEFT JOIN officers o ON o.id = v.officer_id
             WHERE v.citizen_id = ?
             ORDER BY v.id DESC",
        )
        .bind(citizen_id.0)
        .fetch_all(&mut *self.conn)
        .await?;
        Ok(rows.iter().map(verdict_from_row).collect())
    }

    pub async fn verdict_details(&mut self, verdict_id: VerdictId) -> Result<Option<VerdictDetails>> {
        let row = sqlx::query(
            "SELECT v.id, v.citizen_id, v.officer_id, o.username, v.description,
                    v.total_fine, v.total_jail_months, v.created_at
             FROM verdicts v
             LEFT JOIN officers o ON o.id = v.officer_id
             WHERE v.id = ?",
        )
        .bind(verdict_id.0)
        .fetch_optional(&mut *self.conn)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };

        let charges = sqlx::query(
            "SELECT c.id, c.code, c.name, c.description, c.fine, c.jail_months
             FROM verdict_charges vc
             INNER JOIN charges c ON c.id = vc.charge_id
             WHERE vc.verdict_id = ?
             ORDER BY c.code ASC",
        )
        .bind(verdict_id.0)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(Some(VerdictDetails {
            verdict: verdict_from_row(&row),
            charges: charges.iter().map(charge_from_row).collect(),
        }))
    }

    /// Returns `false` when no such verdict existed.
    pub async fn delete_verdict(&mut self, verdict_id: VerdictId) -> Result<bool> {
        let mut tx = self.conn.begin().await?;
        sqlx::query("DELETE FROM verdict_charges WHERE verdict_id = ?")
            .bind(verdict_id.0)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM verdicts WHERE id = ?")
            .bind(verdict_id.0)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;
        Ok(deleted > 0)
    }

    pub async fn insert_wanted(
        &mut self,
        citizen_id: CitizenId,
        officer_id: UserId,
        charge_ids: &[ChargeId],
        reason: Option<&str>,
    ) -> Result<WantedId> {
        let mut tx = self.conn.begin().await?;
        let charges = load_charges(&mut tx, charge_ids).await?;

        let rec = sqlx::query(
            "INSERT INTO wanted (citizen_id, officer_id, reason) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(citizen_id.0)
        .bind(officer_id.0)
        .bind(reason)
        .fetch_one(&mut *tx)
        .await?;
        let wanted_id = WantedId(rec.get::<i64, _>(0));

        for charge in &charges {
            sqlx::query("INSERT INTO wanted_charges (wanted_id, charge_id) VALUES (?, ?)")
                .bind(wanted_id.0)
                .bind(charge.charge_id.0)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(wanted_id)
    }

    pub async fn active_warrants(&mut self) -> Result<Vec<WantedEntry>> {
        let rows = sqlx::query(
            "SELECT w.id, w.citizen_id, c.first_name || ' ' || c.last_name, w.officer_id, o.username,
                    w.reason, w.active, w.created_at
             FROM wanted w
             INNER JOIN citizens c ON c.id = w.citizen_id
             LEFT JOIN officers o ON o.id = w.officer_id
             WHERE w.active = 1
             ORDER BY w.id DESC",
        )
        .fetch_all(&mut *self.conn)
        .await?;
        self.wanted_with_charges(rows).await
    }

    pub async fn wanted_for_citizen(&mut self, citizen_id: CitizenId) -> Result<Vec<WantedEntry>> {
        let rows = sqlx::query(
            "SELECT w.id, w.citizen_id, c.first_name || ' ' || c.last_name, w.officer_id, o.username,
                    w.reason, w.active, w.created_at
             FROM wanted w
             INNER JOIN citizens c ON c.id = w.citizen_id
             LEFT JOIN officers o ON o.id = w.officer_id
             WHERE w.citizen_id = ?
             ORDER BY w.active DESC, w.id DESC",
        )
        .bind(citizen_id.0)
        .fetch_all(&mut *self.conn)
        .await?;
        self.wanted_with_charges(rows).await
    }

    /// Deactivates an active entry. Returns `false` when there was none.
    pub async fn delete_wanted(&mut self, wanted_id: WantedId) -> Result<bool> {
        let updated = sqlx::query(
            "UPDATE wanted SET active = 0, cleared_at = CURRENT_TIMESTAMP WHERE id = ? AND active = 1",
        )
        .bind(wanted_id.0)
        .execute(&mut *self.conn)
        .await?
        .rows_affected();
        Ok(updated > 0)
    }

    pub async fn insert_note(
        &mut self,
        citizen_id: CitizenId,
        officer_id: UserId,
        content: &str,
    ) -> Result<NoteId> {
        let rec = sqlx::query(
            "INSERT INTO notes (citizen_id, officer_id, content) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(citizen_id.0)
        .bind(officer_id.0)
        .bind(content)
        .fetch_one(&mut *self.conn)
        .await?;
        Ok(NoteId(rec.get::<i64, _>(0)))
    }

    pub async fn notes_for_citizen(&mut self, citizen_id: CitizenId) -> Result<Vec<Note>> {
        let rows = sqlx::query(
            "SELECT n.id, n.citizen_id, n.officer_id, o.username, n.content, n.created_at
             FROM notes n
             LEFT JOIN officers o ON o.id = n.officer_id
             WHERE n.citizen_id = ?
             ORDER BY n.id DESC",
        )
        .bind(citizen_id.0)
        .fetch_all(&mut *self.conn)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| Note {
                note_id: NoteId(r.get::<i64, _>(0)),
                citizen_id: CitizenId(r.get::<i64, _>(1)),
                officer_id: UserId(r.get::<i64, _>(2)),
                officer_name: r.get::<Option<String>, _>(3),
                content: r.get::<String, _>(4),
                created_at: r.get::<DateTime<Utc>, _>(5),
            })
            .collect())
    }

    pub async fn note_author(&mut self, note_id: NoteId) -> Result<Option<UserId>> {
        let row = sqlx::query("SELECT officer_id FROM notes WHERE id = ?")
            .bind(note_id.0)
            .fetch_optional(&mut *self.conn)
            .await?;
        Ok(row.map(|r| UserId(r.get::<i64, _>(0))))
    }

    pub async fn delete_note(&mut self, note_id: NoteId) -> Result<bool> {
        let deleted = sqlx::query("DELETE FROM notes WHERE id = ?")
            .bind(note_id.0)
            .execute(&mut *self.conn)
            .await?
            .rows_affected();
        Ok(deleted > 0)
    }

    async fn wanted_with_charges(&mut self, rows: Vec<SqliteRow>) -> Result<Vec<WantedEntry>> {
        let mut entries = Vec::with_capacity(rows.len());
        for r in rows {
            let wanted_id = WantedId(r.get::<i64, _>(0));
            let charges = sqlx::query(
                "SELECT c.id, c.code, c.name, c.description, c.fine, c.jail_months
                 FROM wanted_charges wc
                 INNER JOIN charges c ON c.id = wc.charge_id
                 WHERE wc.wanted_id = ?
                 ORDER BY c.code ASC",
            )
            .bind(wanted_id.0)
            .fetch_all(&mut *self.conn)
            .await?;

            entries.push(WantedEntry {
                wanted_id,
                citizen_id: CitizenId(r.get::<i64, _>(1)),
                citizen_name: r.get::<String, _>(2),
                officer_id: UserId(r.get::<i64, _>(3)),
                officer_name: r.get::<Option<String>, _>(4),
                reason: r.get::<Option<String>, _>(5),
                active: r.get::<bool, _>(6),
                charges: charges.iter().map(charge_from_row).collect(),
                created_at: r.get::<DateTime<Utc>, _>(7),
            });
        }
        Ok(entries)
    }
}

async fn load_charges(conn: &mut SqliteConnection, charge_ids: &[ChargeId]) -> Result<Vec<Charge>> {
    if charge_ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut query = QueryBuilder::<Sqlite>::new(
        "SELECT id, code, name, description, fine, jail_months FROM charges WHERE id IN (",
    );
    let mut ids = query.separated(", ");
    for charge_id in charge_ids {
        ids.push_bind(charge_id.0);
    }
    ids.push_unseparated(") ORDER BY code ASC");

    let rows = query.build().fetch_all(&mut *conn).await?;
    Ok(rows.iter().map(charge_from_row).collect())
}

fn citizen_from_row(r: &SqliteRow) -> Citizen {
    Citizen {
        citizen_id: CitizenId(r.get::<i64, _>(0)),
        first_name: r.get::<String, _>(1),
        last_name: r.get::<String, _>(2),
        birth_date: r.get::<Option<String>, _>(3),
        pesel: r.get::<Option<String>, _>(4),
        phone: r.get::<Option<String>, _>(5),
        address: r.get::<Option<String>, _>(6),
        created_at: r.get::<DateTime<Utc>, _>(7),
    }
}

fn charge_from_row(r: &SqliteRow) -> Charge {
    Charge {
        charge_id: ChargeId(r.get::<i64, _>(0)),
        code: r.get::<String, _>(1),
        name: r.get::<String, _>(2),
        description: r.get::<Option<String>, _>(3),
        fine: r.get::<i64, _>(4),
        jail_months: r.get::<i64, _>(5),
    }
}

fn verdict_from_row(r: &SqliteRow) -> VerdictSummary {
    VerdictSummary {
        verdict_id: VerdictId(r.get::<i64, _>(0)),
        citizen_id: CitizenId(r.get::<i64, _>(1)),
        officer_id: UserId(r.get::<i64, _>(2)),
        officer_name: r.get::<Option<String>, _>(3),
        description: r.get::<Option<String>, _>(4),
        total_fine: r.get::<i64, _>(5),
        total_jail_months: r.get::<i64, _>(6),
        created_at: r.get::<DateTime<Utc>, _>(7),
    }
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
