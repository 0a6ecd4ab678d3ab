//! SQLite-backed sink: a KV table for the overwrite keys, a trimmed history
//! table, and an in-process broadcast channel standing in for pub/sub.

use super::{SinkError, TrafficSink};
use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;
use tokio::sync::broadcast;

const BROADCAST_DEPTH: usize = 64;

pub struct SqliteSink {
    conn: Mutex<Connection>,
    updates: broadcast::Sender<String>,
}

impl SqliteSink {
    /// Open or create the sink store at `path`.
    pub fn open(path: &Path) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                k TEXT PRIMARY KEY,
                v TEXT NOT NULL,
                updated_ts INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                k TEXT NOT NULL,
                v TEXT NOT NULL,
                ts INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_history_k ON history(k, id);
            "#,
        )?;
        let (updates, _) = broadcast::channel(BROADCAST_DEPTH);
        Ok(Self {
            conn: Mutex::new(conn),
            updates,
        })
    }

    /// Subscribe to the notification channel; each published snapshot's
    /// payload is delivered at most once to each live subscriber.
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.updates.subscribe()
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, SinkError> {
        let conn = self.conn.lock().expect("lock");
        let mut stmt = conn.prepare("SELECT v FROM kv WHERE k = ?1")?;
        let mut rows = stmt.query(params![key])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    /// History entries for a key, most recent first.
    pub fn history(&self, key: &str, limit: usize) -> Result<Vec<String>, SinkError> {
        let conn = self.conn.lock().expect("lock");
        let mut stmt =
            conn.prepare("SELECT v FROM history WHERE k = ?1 ORDER BY id DESC LIMIT ?2")?;
        let rows = stmt.query_map(params![key, limit as i64], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

impl TrafficSink for SqliteSink {
    fn set(&self, key: &str, value: &str) -> Result<(), SinkError> {
        self.conn.lock().expect("lock").execute(
            "INSERT OR REPLACE INTO kv (k, v, updated_ts) VALUES (?1, ?2, ?3)",
            params![key, value, Utc::now().timestamp_millis()],
        )?;
        Ok(())
    }

    fn push_history(&self, key: &str, value: &str, limit: usize) -> Result<(), SinkError> {
        let conn = self.conn.lock().expect("lock");
        conn.execute(
            "INSERT INTO history (k, v, ts) VALUES (?1, ?2, ?3)",
            params![key, value, Utc::now().timestamp_millis()],
        )?;
        conn.execute(
            "DELETE FROM history WHERE k = ?1 AND id NOT IN \
             (SELECT id FROM history WHERE k = ?1 ORDER BY id DESC LIMIT ?2)",
            params![key, limit as i64],
        )?;
        Ok(())
    }

    fn broadcast(&self, value: &str) {
        // Best-effort: a send with no live subscribers is dropped silently.
        let _ = self.updates.send(value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_temp() -> (tempfile::TempDir, SqliteSink) {
        let dir = tempfile::tempdir().unwrap();
        let sink = SqliteSink::open(&dir.path().join("sink.db")).unwrap();
        (dir, sink)
    }

    #[test]
    fn set_is_last_write_wins() {
        let (_dir, sink) = open_temp();
        sink.set("live_traffic", "one").unwrap();
        sink.set("live_traffic", "two").unwrap();
        assert_eq!(sink.get("live_traffic").unwrap().as_deref(), Some("two"));
        assert_eq!(sink.get("missing").unwrap(), None);
    }

    #[test]
    fn history_is_trimmed_newest_first() {
        let (_dir, sink) = open_temp();
        for i in 0..7 {
            sink.push_history("traffic_history", &format!("snap-{i}"), 5)
                .unwrap();
        }
        let entries = sink.history("traffic_history", 10).unwrap();
        assert_eq!(entries.len(), 5);
        assert_eq!(entries.first().unwrap(), "snap-6");
        assert_eq!(entries.last().unwrap(), "snap-2");
    }

    #[test]
    fn broadcast_reaches_subscriber() {
        let (_dir, sink) = open_temp();
        let mut rx = sink.subscribe();
        sink.broadcast("payload");
        assert_eq!(rx.try_recv().unwrap(), "payload");
    }

    #[test]
    fn broadcast_without_subscribers_is_silent() {
        let (_dir, sink) = open_temp();
        sink.broadcast("nobody-home");
    }
}
