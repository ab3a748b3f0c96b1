use crate::storage::Store;
use chrono::Utc;
use rusqlite::params;

/// Cached oracle verdicts, keyed by a digest of the scoring request.
/// Re-scoring the same answer with the same provider settings is a
/// cache hit, not a second oracle call.
#[derive(Clone)]
pub struct ScorerCache {
    store: Store,
}

impl ScorerCache {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn get(&self, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
        let conn = self.store.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT payload_json FROM scorer_cache WHERE key=?1")?;
        let mut rows = stmt.query(params![key])?;
        if let Some(row) = rows.next()? {
            let s: String = row.get(0)?;
            let val: serde_json::Value = serde_json::from_str(&s)?;
            Ok(Some(val))
        } else {
            Ok(None)
        }
    }

    pub fn put(
        &self,
        key: &str,
        provider: &str,
        model: &str,
        payload: &serde_json::Value,
    ) -> anyhow::Result<()> {
        let conn = self.store.conn.lock().unwrap();
        let payload_json = serde_json::to_string(payload)?;
        conn.execute(
            "INSERT INTO scorer_cache(key, provider, model, created_at, payload_json)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(key) DO UPDATE SET
                payload_json=excluded.payload_json,
                created_at=excluded.created_at",
            params![key, provider, model, Utc::now().to_rfc3339(), payload_json],
        )?;
        Ok(())
    }
}
