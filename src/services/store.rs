use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::debug;

use crate::error::{Error, Result};
use crate::services::ai::{AiContent, AiKind};

pub type NoteId = i64;

/// Identifies a document across sessions by file name, size and mtime
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentFingerprint {
    pub name: String,
    pub size: u64,
    pub modified: u64,
}

impl DocumentFingerprint {
    pub fn new(name: impl Into<String>, size: u64, modified: u64) -> Self {
        Self {
            name: name.into(),
            size,
            modified,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let metadata = std::fs::metadata(path)?;
        let modified = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self::new(name, metadata.len(), modified))
    }

    pub fn key(&self) -> String {
        format!("{}:{}:{}", self.name, self.size, self.modified)
    }
}

/// A user note attached to a quoted passage
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Note {
    pub id: NoteId,
    pub fingerprint: String,
    pub page_index: usize,
    pub quote: String,
    pub note: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Local persistence of AI results and notes
#[derive(Debug)]
pub struct Store {
    conn: Connection,
}

/// AI results not tied to a single page use this page value
const WHOLE_DOCUMENT: i64 = -1;

fn now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

impl Store {
    /// Returns the path to the store database
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|p| p.join("glint").join("glint.db"))
    }

    pub fn open_default() -> Result<Self> {
        let path = Self::default_path()
            .ok_or_else(|| Error::Config("Could not determine data directory".to_string()))?;
        Self::open(&path)
    }

    /// Open the database at `path`, creating it if necessary
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS ai_results (
                fingerprint TEXT NOT NULL,
                kind TEXT NOT NULL,
                page INTEGER NOT NULL,
                payload TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                PRIMARY KEY (fingerprint, kind, page)
            );
            CREATE TABLE IF NOT EXISTS notes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                fingerprint TEXT NOT NULL,
                page INTEGER NOT NULL,
                quote TEXT NOT NULL,
                note TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_notes_fingerprint ON notes(fingerprint);",
        )?;

        Ok(Self { conn })
    }

    /// Cache an AI result; error content is never stored
    pub fn save_result(
        &self,
        doc: &DocumentFingerprint,
        page_index: Option<usize>,
        content: &AiContent,
    ) -> Result<()> {
        if content.is_error {
            debug!(kind = content.kind.as_str(), "not caching error content");
            return Ok(());
        }

        let payload = serde_json::to_string(content)?;
        self.conn.execute(
            "INSERT INTO ai_results (fingerprint, kind, page, payload, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(fingerprint, kind, page)
             DO UPDATE SET payload = excluded.payload, created_at = excluded.created_at",
            params![
                doc.key(),
                content.kind.as_str(),
                page_key(page_index),
                payload,
                now()
            ],
        )?;
        Ok(())
    }

    pub fn load_result(
        &self,
        doc: &DocumentFingerprint,
        kind: AiKind,
        page_index: Option<usize>,
    ) -> Result<Option<AiContent>> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT payload FROM ai_results WHERE fingerprint = ?1 AND kind = ?2 AND page = ?3",
                params![doc.key(), kind.as_str(), page_key(page_index)],
                |row| row.get(0),
            )
            .optional()?;

        payload
            .map(|p| serde_json::from_str(&p).map_err(Error::from))
            .transpose()
    }

    /// Save a new note, returning its id
    pub fn save_note(
        &self,
        doc: &DocumentFingerprint,
        page_index: usize,
        quote: &str,
        note: &str,
    ) -> Result<NoteId> {
        let now = now();
        self.conn.execute(
            "INSERT INTO notes (fingerprint, page, quote, note, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![doc.key(), page_index as i64, quote, note, now, now],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn update_note(&self, id: NoteId, note: &str) -> Result<()> {
        let rows_affected = self.conn.execute(
            "UPDATE notes SET note = ?1, updated_at = ?2 WHERE id = ?3",
            params![note, now(), id],
        )?;
        if rows_affected == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    pub fn delete_note(&self, id: NoteId) -> Result<()> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM notes WHERE id = ?1", params![id])?;
        if rows_affected == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    /// All notes for a document, ordered by page
    pub fn notes_for_document(&self, doc: &DocumentFingerprint) -> Result<Vec<Note>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, fingerprint, page, quote, note, created_at, updated_at
             FROM notes WHERE fingerprint = ?1 ORDER BY page, id",
        )?;

        let notes = stmt
            .query_map(params![doc.key()], |row| {
                Ok(Note {
                    id: row.get(0)?,
                    fingerprint: row.get(1)?,
                    page_index: row.get::<_, i64>(2)? as usize,
                    quote: row.get(3)?,
                    note: row.get(4)?,
                    created_at: row.get(5)?,
                    updated_at: row.get(6)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(notes)
    }

    /// Export a document's notes as markdown
    pub fn export_notes_markdown(&self, doc: &DocumentFingerprint) -> Result<String> {
        let notes = self.notes_for_document(doc)?;

        let mut output = format!("# Notes for {}\n\n", doc.name);
        if notes.is_empty() {
            output.push_str("No notes found.\n");
            return Ok(output);
        }

        for note in notes {
            // Page number is 1-indexed for display
            output.push_str(&format!(
                "> **\"{}\"** (Page {})\n\n",
                note.quote,
                note.page_index + 1
            ));
            if !note.note.is_empty() {
                output.push_str(&note.note);
                output.push_str("\n\n");
            }
            output.push_str("---\n\n");
        }

        Ok(output)
    }

    /// Remove everything stored for a document
    pub fn clear_document(&self, doc: &DocumentFingerprint) -> Result<()> {
        let key = doc.key();
        self.conn
            .execute("DELETE FROM ai_results WHERE fingerprint = ?1", params![key])?;
        self.conn
            .execute("DELETE FROM notes WHERE fingerprint = ?1", params![key])?;
        Ok(())
    }
}

fn page_key(page_index: Option<usize>) -> i64 {
    page_index.map(|p| p as i64).unwrap_or(WHOLE_DOCUMENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paper() -> DocumentFingerprint {
        DocumentFingerprint::new("attention.pdf", 2_215_244, 1_700_000_000)
    }

    #[test]
    fn test_fingerprint_key() {
        assert_eq!(paper().key(), "attention.pdf:2215244:1700000000");
    }

    #[test]
    fn test_fingerprint_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("paper.pdf");
        std::fs::write(&path, b"%PDF-1.7 fake").unwrap();

        let fp = DocumentFingerprint::from_path(&path).unwrap();
        assert_eq!(fp.name, "paper.pdf");
        assert_eq!(fp.size, 13);
        assert!(fp.modified > 0);
    }

    #[test]
    fn test_result_round_trip_per_page() {
        let store = Store::open_in_memory().unwrap();
        let doc = paper();

        store
            .save_result(&doc, Some(2), &AiContent::new(AiKind::Translation, "[]"))
            .unwrap();
        store
            .save_result(&doc, None, &AiContent::new(AiKind::Summary, "A paper."))
            .unwrap();

        let page = store.load_result(&doc, AiKind::Translation, Some(2)).unwrap();
        assert_eq!(page.map(|c| c.text), Some("[]".to_string()));
        assert!(store.load_result(&doc, AiKind::Translation, Some(3)).unwrap().is_none());
        let summary = store.load_result(&doc, AiKind::Summary, None).unwrap();
        assert_eq!(summary.map(|c| c.text), Some("A paper.".to_string()));
    }

    #[test]
    fn test_save_result_overwrites() {
        let store = Store::open_in_memory().unwrap();
        let doc = paper();
        store
            .save_result(&doc, None, &AiContent::new(AiKind::Summary, "old"))
            .unwrap();
        store
            .save_result(&doc, None, &AiContent::new(AiKind::Summary, "new"))
            .unwrap();
        let summary = store.load_result(&doc, AiKind::Summary, None).unwrap();
        assert_eq!(summary.map(|c| c.text), Some("new".to_string()));
    }

    #[test]
    fn test_error_content_not_cached() {
        let store = Store::open_in_memory().unwrap();
        let doc = paper();
        store
            .save_result(&doc, None, &AiContent::error(AiKind::Summary, "timeout"))
            .unwrap();
        assert!(store.load_result(&doc, AiKind::Summary, None).unwrap().is_none());
    }

    #[test]
    fn test_notes_crud() {
        let store = Store::open_in_memory().unwrap();
        let doc = paper();

        let second = store.save_note(&doc, 4, "scaled dot-product", "why sqrt(d)?").unwrap();
        let first = store.save_note(&doc, 1, "multi-head", "").unwrap();

        let notes = store.notes_for_document(&doc).unwrap();
        assert_eq!(notes.iter().map(|n| n.id).collect::<Vec<_>>(), vec![first, second]);

        store.update_note(first, "heads attend to subspaces").unwrap();
        let notes = store.notes_for_document(&doc).unwrap();
        assert_eq!(notes[0].note, "heads attend to subspaces");

        store.delete_note(second).unwrap();
        assert_eq!(store.notes_for_document(&doc).unwrap().len(), 1);
        assert!(matches!(store.delete_note(second), Err(Error::NotFound)));
        assert!(matches!(store.update_note(999, "x"), Err(Error::NotFound)));
    }

    #[test]
    fn test_export_markdown() {
        let store = Store::open_in_memory().unwrap();
        let doc = paper();
        assert!(store.export_notes_markdown(&doc).unwrap().contains("No notes found."));

        store.save_note(&doc, 0, "Attention", "core idea").unwrap();
        let md = store.export_notes_markdown(&doc).unwrap();
        assert!(md.starts_with("# Notes for attention.pdf"));
        assert!(md.contains("> **\"Attention\"** (Page 1)"));
        assert!(md.contains("core idea"));
    }

    #[test]
    fn test_clear_document_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("glint.db");
        let doc = paper();
        {
            let store = Store::open(&path).unwrap();
            store.save_note(&doc, 0, "q", "n").unwrap();
            store
                .save_result(&doc, None, &AiContent::new(AiKind::Summary, "s"))
                .unwrap();
        }

        let store = Store::open(&path).unwrap();
        assert_eq!(store.notes_for_document(&doc).unwrap().len(), 1);
        store.clear_document(&doc).unwrap();
        assert!(store.notes_for_document(&doc).unwrap().is_empty());
        assert!(store.load_result(&doc, AiKind::Summary, None).unwrap().is_none());
    }
}
