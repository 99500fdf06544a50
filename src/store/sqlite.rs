use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::Store;
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::types::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

const PHOTO_COLUMNS: &str = "id, source_id, remote_id, filename, local_path, width, height, \
                             taken_at, created_at, metadata, synced_at";

fn photo_from_row(row: &Row<'_>) -> rusqlite::Result<Photo> {
    Ok(Photo {
        id: row.get(0)?,
        source_id: row.get(1)?,
        remote_id: row.get(2)?,
        filename: row.get(3)?,
        local_path: row.get(4)?,
        width: row.get(5)?,
        height: row.get(6)?,
        taken_at: row.get::<_, Option<String>>(7)?.map(|s| parse_datetime(&s)),
        created_at: parse_datetime(&row.get::<_, String>(8)?),
        metadata: row.get(9)?,
        synced_at: row
            .get::<_, Option<String>>(10)?
            .map(|s| parse_datetime(&s)),
    })
}

fn source_from_row(row: &Row<'_>) -> rusqlite::Result<PhotoSource> {
    Ok(PhotoSource {
        id: row.get(0)?,
        kind: SourceKind::parse(&row.get::<_, String>(1)?),
        name: row.get(2)?,
        config: row.get(3)?,
        enabled: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
        last_sync: row.get::<_, Option<String>>(6)?.map(|s| parse_datetime(&s)),
    })
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        let conn = self.conn();
        conn.execute_batch(SCHEMA)?;

        // Built-in sources always exist after initialization
        conn.execute(
            "INSERT OR IGNORE INTO photo_sources (id, type, name, enabled)
             VALUES ('imported', 'imported', 'Imported Photos', 1)",
            [],
        )?;
        conn.execute(
            "INSERT OR IGNORE INTO photo_sources (id, type, name, enabled)
             VALUES ('local', 'local', 'Local Folder', 1)",
            [],
        )?;

        Ok(())
    }

    // Photo operations

    fn insert_photo(&self, photo: &Photo) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO photos (id, source_id, remote_id, filename, local_path, width, height, taken_at, created_at, metadata, synced_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                photo.id,
                photo.source_id,
                photo.remote_id,
                photo.filename,
                photo.local_path,
                photo.width,
                photo.height,
                photo.taken_at.as_ref().map(format_datetime),
                format_datetime(&photo.created_at),
                photo.metadata,
                photo.synced_at.as_ref().map(format_datetime),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => Err(Error::Conflict),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_photo(&self, id: &str) -> Result<Option<Photo>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {PHOTO_COLUMNS} FROM photos WHERE id = ?1"),
            params![id],
            photo_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_photos(
        &self,
        source_id: Option<&str>,
        limit: i64,
        offset: i64,
        order: PhotoOrder,
    ) -> Result<Vec<Photo>> {
        // taken_at DESC puts NULL capture times last; created_at breaks ties
        let order_clause = match order {
            PhotoOrder::Newest => "ORDER BY taken_at DESC, created_at DESC",
            PhotoOrder::Random => "ORDER BY RANDOM()",
        };

        let conn = self.conn();
        let rows = match source_id {
            Some(sid) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {PHOTO_COLUMNS} FROM photos WHERE source_id = ?1 \
                     {order_clause} LIMIT ?2 OFFSET ?3"
                ))?;
                let rows = stmt.query_map(params![sid, limit, offset], photo_from_row)?;
                rows.collect::<std::result::Result<Vec<_>, _>>()
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {PHOTO_COLUMNS} FROM photos {order_clause} LIMIT ?1 OFFSET ?2"
                ))?;
                let rows = stmt.query_map(params![limit, offset], photo_from_row)?;
                rows.collect::<std::result::Result<Vec<_>, _>>()
            }
        };

        rows.map_err(Error::from)
    }

    fn count_photos(&self, source_id: Option<&str>) -> Result<i64> {
        let conn = self.conn();
        let count: i64 = match source_id {
            Some(sid) => conn.query_row(
                "SELECT COUNT(*) FROM photos WHERE source_id = ?1",
                params![sid],
                |row| row.get(0),
            )?,
            None => conn.query_row("SELECT COUNT(*) FROM photos", [], |row| row.get(0))?,
        };
        Ok(count)
    }

    fn delete_photo(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM photos WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn find_photo_by_filename(&self, source_id: &str, filename: &str) -> Result<Option<Photo>> {
        let conn = self.conn();
        conn.query_row(
            &format!(
                "SELECT {PHOTO_COLUMNS} FROM photos WHERE source_id = ?1 AND filename = ?2"
            ),
            params![source_id, filename],
            photo_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    // Source operations

    fn create_source(&self, source: &PhotoSource) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO photo_sources (id, type, name, config, enabled, created_at, last_sync)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                source.id,
                source.kind.as_str(),
                source.name,
                source.config,
                source.enabled,
                format_datetime(&source.created_at),
                source.last_sync.as_ref().map(format_datetime),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => Err(Error::Conflict),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_source(&self, id: &str) -> Result<Option<PhotoSource>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, type, name, config, enabled, created_at, last_sync
             FROM photo_sources WHERE id = ?1",
            params![id],
            source_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_sources(&self) -> Result<Vec<SourceWithCount>> {
        // Counts are aggregated live; a cached counter would drift
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT ps.id, ps.type, ps.name, ps.config, ps.enabled, ps.created_at, ps.last_sync,
                    COUNT(p.id) as photo_count
             FROM photo_sources ps
             LEFT JOIN photos p ON p.source_id = ps.id
             GROUP BY ps.id
             ORDER BY ps.name",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(SourceWithCount {
                source: source_from_row(row)?,
                photo_count: row.get(7)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_source_sync(&self, id: &str, at: DateTime<Utc>) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE photo_sources SET last_sync = ?1 WHERE id = ?2",
            params![format_datetime(&at), id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_source(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM photo_sources WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Album operations

    fn insert_album(&self, album: &Album) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO albums (id, source_id, remote_id, name, photo_count, enabled, last_sync)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                album.id,
                album.source_id,
                album.remote_id,
                album.name,
                album.photo_count,
                album.enabled,
                album.last_sync.as_ref().map(format_datetime),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => Err(Error::Conflict),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn list_albums(&self, source_id: &str) -> Result<Vec<Album>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, source_id, remote_id, name, photo_count, enabled, last_sync
             FROM albums WHERE source_id = ?1 ORDER BY name",
        )?;

        let rows = stmt.query_map(params![source_id], |row| {
            Ok(Album {
                id: row.get(0)?,
                source_id: row.get(1)?,
                remote_id: row.get(2)?,
                name: row.get(3)?,
                photo_count: row.get(4)?,
                enabled: row.get(5)?,
                last_sync: row.get::<_, Option<String>>(6)?.map(|s| parse_datetime(&s)),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn count_albums(&self, source_id: &str) -> Result<i64> {
        let conn = self.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM albums WHERE source_id = ?1",
            params![source_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (TempDir, SqliteStore) {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().unwrap();
        (temp, store)
    }

    fn test_photo(id: &str, source_id: &str) -> Photo {
        Photo {
            id: id.to_string(),
            source_id: source_id.to_string(),
            remote_id: None,
            filename: format!("{id}.jpg"),
            local_path: Some(format!("{source_id}/{id}.jpg")),
            width: Some(640),
            height: Some(480),
            taken_at: None,
            created_at: Utc::now(),
            metadata: None,
            synced_at: Some(Utc::now()),
        }
    }

    #[test]
    fn test_initialize_is_idempotent_and_seeds_builtins() {
        let (_temp, store) = test_store();
        store.initialize().unwrap();

        let sources = store.list_sources().unwrap();
        let ids: Vec<&str> = sources.iter().map(|s| s.source.id.as_str()).collect();
        assert!(ids.contains(&"imported"));
        assert!(ids.contains(&"local"));
        assert_eq!(sources.len(), 2);

        let imported = store.get_source("imported").unwrap().unwrap();
        assert_eq!(imported.kind, SourceKind::Imported);
        assert!(imported.enabled);
    }

    #[test]
    fn test_photo_crud() {
        let (_temp, store) = test_store();

        let photo = test_photo("p1", "imported");
        store.insert_photo(&photo).unwrap();

        let fetched = store.get_photo("p1").unwrap().unwrap();
        assert_eq!(fetched.filename, "p1.jpg");
        assert_eq!(fetched.width, Some(640));
        assert_eq!(fetched.local_path.as_deref(), Some("imported/p1.jpg"));

        assert!(store.delete_photo("p1").unwrap());
        assert!(store.get_photo("p1").unwrap().is_none());
        assert!(!store.delete_photo("p1").unwrap());
    }

    #[test]
    fn test_insert_duplicate_id_is_conflict() {
        let (_temp, store) = test_store();

        store.insert_photo(&test_photo("p1", "imported")).unwrap();
        let result = store.insert_photo(&test_photo("p1", "imported"));
        assert!(matches!(result, Err(Error::Conflict)));
    }

    #[test]
    fn test_insert_unknown_source_rejected() {
        let (_temp, store) = test_store();

        let result = store.insert_photo(&test_photo("p1", "no-such-source"));
        assert!(matches!(result, Err(Error::Conflict)));
    }

    #[test]
    fn test_list_newest_orders_missing_capture_time_last() {
        let (_temp, store) = test_store();

        let mut older = test_photo("older", "imported");
        older.taken_at = Some("2020-05-01T10:00:00Z".parse().unwrap());
        let mut newer = test_photo("newer", "imported");
        newer.taken_at = Some("2023-08-15T10:00:00Z".parse().unwrap());
        let untimed = test_photo("untimed", "imported");

        store.insert_photo(&untimed).unwrap();
        store.insert_photo(&older).unwrap();
        store.insert_photo(&newer).unwrap();

        let photos = store
            .list_photos(None, 10, 0, PhotoOrder::Newest)
            .unwrap();
        let ids: Vec<&str> = photos.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["newer", "older", "untimed"]);
    }

    #[test]
    fn test_pagination_covers_all_rows_exactly_once() {
        let (_temp, store) = test_store();

        for i in 0..7 {
            let mut photo = test_photo(&format!("p{i}"), "imported");
            photo.taken_at = Some(
                format!("2024-01-0{}T00:00:00Z", i + 1)
                    .parse()
                    .unwrap(),
            );
            store.insert_photo(&photo).unwrap();
        }

        let mut seen = Vec::new();
        let mut offset = 0;
        loop {
            let page = store
                .list_photos(None, 3, offset, PhotoOrder::Newest)
                .unwrap();
            if page.is_empty() {
                break;
            }
            assert!(page.len() <= 3);
            seen.extend(page.into_iter().map(|p| p.id));
            offset += 3;
        }

        assert_eq!(seen.len(), 7);
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 7);

        // Offset past the end is empty, not an error
        let past = store
            .list_photos(None, 3, 100, PhotoOrder::Newest)
            .unwrap();
        assert!(past.is_empty());
    }

    #[test]
    fn test_random_order_returns_full_filtered_set() {
        let (_temp, store) = test_store();

        for i in 0..5 {
            store
                .insert_photo(&test_photo(&format!("p{i}"), "imported"))
                .unwrap();
        }
        store.insert_photo(&test_photo("lp", "local")).unwrap();

        let photos = store
            .list_photos(Some("imported"), 100, 0, PhotoOrder::Random)
            .unwrap();
        assert_eq!(photos.len(), 5);
        assert!(photos.iter().all(|p| p.source_id == "imported"));
    }

    #[test]
    fn test_count_and_filter_by_source() {
        let (_temp, store) = test_store();

        store.insert_photo(&test_photo("a", "imported")).unwrap();
        store.insert_photo(&test_photo("b", "imported")).unwrap();
        store.insert_photo(&test_photo("c", "local")).unwrap();

        assert_eq!(store.count_photos(None).unwrap(), 3);
        assert_eq!(store.count_photos(Some("imported")).unwrap(), 2);
        assert_eq!(store.count_photos(Some("local")).unwrap(), 1);
        assert_eq!(store.count_photos(Some("missing")).unwrap(), 0);
    }

    #[test]
    fn test_find_photo_by_filename() {
        let (_temp, store) = test_store();

        let mut photo = test_photo("p1", "local");
        photo.filename = "sunset.jpg".to_string();
        store.insert_photo(&photo).unwrap();

        let found = store
            .find_photo_by_filename("local", "sunset.jpg")
            .unwrap();
        assert!(found.is_some());

        assert!(store
            .find_photo_by_filename("imported", "sunset.jpg")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_source_counts_are_live() {
        let (_temp, store) = test_store();

        store.insert_photo(&test_photo("a", "imported")).unwrap();
        store.insert_photo(&test_photo("b", "imported")).unwrap();

        let count_of = |store: &SqliteStore, id: &str| {
            store
                .list_sources()
                .unwrap()
                .into_iter()
                .find(|s| s.source.id == id)
                .unwrap()
                .photo_count
        };

        assert_eq!(count_of(&store, "imported"), 2);

        store.delete_photo("a").unwrap();
        assert_eq!(count_of(&store, "imported"), 1);
        assert_eq!(
            count_of(&store, "imported"),
            store.count_photos(Some("imported")).unwrap()
        );
    }

    #[test]
    fn test_delete_source_cascades() {
        let (_temp, store) = test_store();

        let source = PhotoSource {
            id: "gallery".to_string(),
            kind: SourceKind::Remote,
            name: "Remote Gallery".to_string(),
            config: Some(r#"{"base_url":"https://example.net"}"#.to_string()),
            enabled: true,
            created_at: Utc::now(),
            last_sync: None,
        };
        store.create_source(&source).unwrap();
        store.insert_photo(&test_photo("g1", "gallery")).unwrap();
        store
            .insert_album(&Album {
                id: "alb1".to_string(),
                source_id: "gallery".to_string(),
                remote_id: Some("r-9".to_string()),
                name: "Holidays".to_string(),
                photo_count: 0,
                enabled: true,
                last_sync: None,
            })
            .unwrap();

        assert!(store.delete_source("gallery").unwrap());
        assert!(store.get_photo("g1").unwrap().is_none());
        assert_eq!(store.count_albums("gallery").unwrap(), 0);
    }

    #[test]
    fn test_album_create_list_count() {
        let (_temp, store) = test_store();

        for name in ["Beach", "Alps"] {
            store
                .insert_album(&Album {
                    id: format!("alb-{name}"),
                    source_id: "imported".to_string(),
                    remote_id: None,
                    name: name.to_string(),
                    photo_count: 0,
                    enabled: true,
                    last_sync: None,
                })
                .unwrap();
        }

        let albums = store.list_albums("imported").unwrap();
        assert_eq!(albums.len(), 2);
        assert_eq!(albums[0].name, "Alps");
        assert_eq!(store.count_albums("imported").unwrap(), 2);
        assert_eq!(store.count_albums("local").unwrap(), 0);
    }

    #[test]
    fn test_update_source_sync() {
        let (_temp, store) = test_store();

        let at = Utc::now();
        store.update_source_sync("local", at).unwrap();
        let source = store.get_source("local").unwrap().unwrap();
        assert!(source.last_sync.is_some());

        let result = store.update_source_sync("missing", at);
        assert!(matches!(result, Err(Error::NotFound)));
    }
}
