//! Database operations for flashcard trainer.

use chrono::{DateTime, NaiveDate, Utc};
use flashcard_core::models::{day_key, parse_day_key};
use flashcard_core::{
    CardId, CardStatus, CardStore, DailyActivity, Flashcard, FlashcardSet, KeyValueStore,
    NewFlashcard, SetId, StoreError, StoreResult,
};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Result as SqlResult};
use std::collections::BTreeMap;
use std::path::Path;
use std::rc::Rc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Not found: {0}")]
    NotFound(String),
}

pub type DbResult<T> = Result<T, DbError>;

impl From<DbError> for StoreError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound(what) => StoreError::NotFound(what),
            other => StoreError::Backend(other.to_string()),
        }
    }
}

/// SQLite storage. Clones share one connection.
#[derive(Clone)]
pub struct Database {
    conn: Rc<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> DbResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let db = Self { conn: Rc::new(conn) };
        db.init()?;
        Ok(db)
    }

    pub fn in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn: Rc::new(conn) };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> DbResult<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS sets (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS cards (
                id TEXT PRIMARY KEY,
                set_id TEXT NOT NULL REFERENCES sets(id),
                front TEXT NOT NULL,
                back TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'new',
                created_at TEXT NOT NULL,
                last_reviewed TEXT
            );

            CREATE TABLE IF NOT EXISTS daily_activity (
                date TEXT NOT NULL,
                card_id TEXT NOT NULL,
                PRIMARY KEY (date, card_id)
            );

            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_cards_set ON cards(set_id);
            "#,
        )?;
        Ok(())
    }

    // Set operations

    pub fn insert_set(&self, set: &FlashcardSet) -> DbResult<()> {
        self.conn.execute(
            "INSERT INTO sets (id, name, created_at) VALUES (?1, ?2, ?3)",
            params![set.id.to_string(), set.name, set.created_at.to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn list_sets(&self) -> DbResult<Vec<FlashcardSet>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, created_at FROM sets ORDER BY created_at")?;
        let sets = stmt
            .query_map([], parse_set_row)?
            .collect::<SqlResult<Vec<_>>>()?;
        Ok(sets)
    }

    /// Delete a set with its cards and their activity rows.
    pub fn delete_set(&self, id: SetId) -> DbResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM daily_activity WHERE card_id IN (SELECT id FROM cards WHERE set_id = ?1)",
            params![id.to_string()],
        )?;
        tx.execute("DELETE FROM cards WHERE set_id = ?1", params![id.to_string()])?;
        let removed = tx.execute("DELETE FROM sets WHERE id = ?1", params![id.to_string()])?;
        tx.commit()?;

        if removed == 0 {
            return Err(DbError::NotFound(format!("set {}", id)));
        }
        Ok(())
    }

    /// Number of cards per set.
    pub fn card_counts(&self) -> DbResult<BTreeMap<SetId, usize>> {
        let mut stmt = self
            .conn
            .prepare("SELECT set_id, COUNT(*) FROM cards GROUP BY set_id")?;
        let counts = stmt
            .query_map([], |row| {
                let id = uuid_column(row, 0)?;
                let count: i64 = row.get(1)?;
                Ok((id, usize::try_from(count).unwrap_or(0)))
            })?
            .collect::<SqlResult<BTreeMap<_, _>>>()?;
        Ok(counts)
    }

    // Card operations

    pub fn insert_card(&self, input: NewFlashcard) -> DbResult<Flashcard> {
        let card = input.into_card();
        self.write_card(&self.conn, &card)?;
        Ok(card)
    }

    /// Insert several cards in one transaction.
    pub fn insert_cards(&self, inputs: Vec<NewFlashcard>) -> DbResult<Vec<Flashcard>> {
        let tx = self.conn.unchecked_transaction()?;
        let mut cards = Vec::with_capacity(inputs.len());
        for input in inputs {
            let card = input.into_card();
            self.write_card(&tx, &card)?;
            cards.push(card);
        }
        tx.commit()?;
        Ok(cards)
    }

    fn write_card(&self, conn: &Connection, card: &Flashcard) -> DbResult<()> {
        conn.execute(
            "INSERT INTO cards (id, set_id, front, back, status, created_at, last_reviewed)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                card.id.to_string(),
                card.set_id.to_string(),
                card.front,
                card.back,
                card.status.as_str(),
                card.created_at.to_rfc3339(),
                card.last_reviewed.map(|t| t.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    pub fn delete_card(&self, id: CardId) -> DbResult<()> {
        self.conn
            .execute("DELETE FROM daily_activity WHERE card_id = ?1", params![id.to_string()])?;
        self.conn
            .execute("DELETE FROM cards WHERE id = ?1", params![id.to_string()])?;
        Ok(())
    }

    pub fn find_card(&self, id: CardId) -> DbResult<Option<Flashcard>> {
        let mut stmt = self.conn.prepare("SELECT * FROM cards WHERE id = ?1")?;
        let card = stmt.query_row(params![id.to_string()], parse_card_row);

        match card {
            Ok(c) => Ok(Some(c)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn cards_in_set(&self, set_id: SetId) -> DbResult<Vec<Flashcard>> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM cards WHERE set_id = ?1 ORDER BY created_at")?;
        let cards = stmt
            .query_map(params![set_id.to_string()], parse_card_row)?
            .collect::<SqlResult<Vec<_>>>()?;
        Ok(cards)
    }

    pub fn all_cards(&self) -> DbResult<Vec<Flashcard>> {
        let mut stmt = self.conn.prepare("SELECT * FROM cards ORDER BY created_at")?;
        let cards = stmt
            .query_map([], parse_card_row)?
            .collect::<SqlResult<Vec<_>>>()?;
        Ok(cards)
    }

    pub fn set_status(&self, id: CardId, status: CardStatus, reviewed_at: DateTime<Utc>) -> DbResult<()> {
        let updated = self.conn.execute(
            "UPDATE cards SET status = ?2, last_reviewed = ?3 WHERE id = ?1",
            params![id.to_string(), status.as_str(), reviewed_at.to_rfc3339()],
        )?;
        if updated == 0 {
            return Err(DbError::NotFound(format!("card {}", id)));
        }
        Ok(())
    }

    // Activity

    pub fn record_activity(&self, date: NaiveDate, card_id: CardId) -> DbResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO daily_activity (date, card_id) VALUES (?1, ?2)",
            params![day_key(date), card_id.to_string()],
        )?;
        Ok(())
    }

    pub fn activity_log(&self) -> DbResult<Vec<DailyActivity>> {
        let mut stmt = self
            .conn
            .prepare("SELECT date, card_id FROM daily_activity ORDER BY date")?;
        let rows = stmt
            .query_map([], |row| {
                let date: String = row.get(0)?;
                Ok((date, uuid_column(row, 1)?))
            })?
            .collect::<SqlResult<Vec<_>>>()?;

        let mut days: BTreeMap<NaiveDate, DailyActivity> = BTreeMap::new();
        for (date, card_id) in rows {
            let Some(date) = parse_day_key(&date) else {
                tracing::warn!(date = %date, "skipping activity row with a bad date");
                continue;
            };
            days.entry(date)
                .or_insert_with(|| DailyActivity::new(date))
                .record(card_id);
        }
        Ok(days.into_values().collect())
    }

    // Key-value

    pub fn get_value(&self, key: &str) -> DbResult<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| row.get(0));

        match value {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn set_value(&self, key: &str, value: &str) -> DbResult<()> {
        self.conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }
}

impl CardStore for Database {
    fn get_card(&self, id: CardId) -> StoreResult<Option<Flashcard>> {
        Ok(self.find_card(id)?)
    }

    fn list_cards_by_set(&self, set_id: SetId) -> StoreResult<Vec<Flashcard>> {
        Ok(self.cards_in_set(set_id)?)
    }

    fn update_card_status(
        &mut self,
        id: CardId,
        status: CardStatus,
        reviewed_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        Ok(self.set_status(id, status, reviewed_at)?)
    }

    fn append_or_update_daily_activity(&mut self, date: NaiveDate, card_id: CardId) -> StoreResult<()> {
        Ok(self.record_activity(date, card_id)?)
    }

    fn daily_activity(&self) -> StoreResult<Vec<DailyActivity>> {
        Ok(self.activity_log()?)
    }
}

impl KeyValueStore for Database {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.get_value(key)?)
    }

    fn set(&mut self, key: &str, value: &str) -> StoreResult<()> {
        Ok(self.set_value(key, value)?)
    }
}

fn uuid_column(row: &rusqlite::Row, idx: usize) -> SqlResult<Uuid> {
    let text: String = row.get(idx)?;
    Uuid::parse_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn time_column(row: &rusqlite::Row, name: &str) -> SqlResult<Option<DateTime<Utc>>> {
    let text: Option<String> = row.get(name)?;
    Ok(text.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    }))
}

fn parse_set_row(row: &rusqlite::Row) -> SqlResult<FlashcardSet> {
    Ok(FlashcardSet {
        id: uuid_column(row, 0)?,
        name: row.get(1)?,
        created_at: time_column(row, "created_at")?.unwrap_or_else(Utc::now),
    })
}

fn parse_card_row(row: &rusqlite::Row) -> SqlResult<Flashcard> {
    let status: String = row.get("status")?;

    Ok(Flashcard {
        id: uuid_column(row, 0)?,
        set_id: uuid_column(row, 1)?,
        front: row.get("front")?,
        back: row.get("back")?,
        status: CardStatus::from_key(&status),
        created_at: time_column(row, "created_at")?.unwrap_or_else(Utc::now),
        last_reviewed: time_column(row, "last_reviewed")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use flashcard_core::PROGRESS_KEY;

    fn new_card(set_id: SetId, front: &str) -> NewFlashcard {
        NewFlashcard {
            front: front.to_string(),
            back: format!("{} back", front),
            set_id,
        }
    }

    #[test]
    fn test_set_crud() {
        let db = Database::in_memory().unwrap();
        let set = FlashcardSet::new("Spanish");
        db.insert_set(&set).unwrap();

        let sets = db.list_sets().unwrap();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].name, "Spanish");
        assert_eq!(sets[0].id, set.id);
    }

    #[test]
    fn test_cards_start_new_and_keep_order() {
        let db = Database::in_memory().unwrap();
        let set = FlashcardSet::new("Spanish");
        db.insert_set(&set).unwrap();

        let cards = db
            .insert_cards(vec![new_card(set.id, "uno"), new_card(set.id, "dos")])
            .unwrap();
        assert_eq!(cards.len(), 2);

        let loaded = db.list_cards_by_set(set.id).unwrap();
        assert_eq!(loaded.len(), 2);
        assert!(loaded.iter().all(|c| c.status == CardStatus::New));
        assert_eq!(db.card_counts().unwrap().get(&set.id), Some(&2));
    }

    #[test]
    fn test_status_update() {
        let mut db = Database::in_memory().unwrap();
        let set = FlashcardSet::new("Math");
        db.insert_set(&set).unwrap();
        let card = db.insert_card(new_card(set.id, "2+2")).unwrap();

        let now = Utc::now();
        db.update_card_status(card.id, CardStatus::Unknown, now).unwrap();
        let loaded = db.get_card(card.id).unwrap().unwrap();
        assert_eq!(loaded.status, CardStatus::Unknown);
        assert!(loaded.last_reviewed.is_some());

        let missing = db.update_card_status(Uuid::new_v4(), CardStatus::Known, now);
        assert!(matches!(missing, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_activity_counts_card_once_per_day() {
        let mut db = Database::in_memory().unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 8, 1).unwrap();
        let next = NaiveDate::from_ymd_opt(2024, 8, 2).unwrap();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        db.append_or_update_daily_activity(day, a).unwrap();
        db.append_or_update_daily_activity(day, a).unwrap();
        db.append_or_update_daily_activity(day, b).unwrap();
        db.append_or_update_daily_activity(next, a).unwrap();

        let log = db.daily_activity().unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].date, day);
        assert_eq!(log[0].cards_reviewed, 2);
        assert_eq!(log[1].cards_reviewed, 1);
    }

    #[test]
    fn test_delete_set_cascades() {
        let mut db = Database::in_memory().unwrap();
        let keep = FlashcardSet::new("Keep");
        let gone = FlashcardSet::new("Gone");
        db.insert_set(&keep).unwrap();
        db.insert_set(&gone).unwrap();
        let kept = db.insert_card(new_card(keep.id, "k")).unwrap();
        let doomed = db.insert_card(new_card(gone.id, "d")).unwrap();

        let day = NaiveDate::from_ymd_opt(2024, 8, 1).unwrap();
        db.append_or_update_daily_activity(day, kept.id).unwrap();
        db.append_or_update_daily_activity(day, doomed.id).unwrap();

        db.delete_set(gone.id).unwrap();
        assert_eq!(db.list_sets().unwrap().len(), 1);
        assert_eq!(db.all_cards().unwrap().len(), 1);
        assert_eq!(db.daily_activity().unwrap()[0].cards_reviewed, 1);
        assert!(matches!(db.delete_set(gone.id), Err(DbError::NotFound(_))));
    }

    #[test]
    fn test_key_value_and_shared_connection() {
        let db = Database::in_memory().unwrap();
        let mut handle = db.clone();
        handle.set(PROGRESS_KEY, "{}").unwrap();
        handle.set(PROGRESS_KEY, "{\"level\":1}").unwrap();
        assert_eq!(db.get(PROGRESS_KEY).unwrap().as_deref(), Some("{\"level\":1}"));
        assert_eq!(db.get("missing").unwrap(), None);
    }
}
