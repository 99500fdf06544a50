pub const SCHEMA: &str = r#"
-- Logical origins of photos; 'imported' and 'local' are seeded at init
CREATE TABLE IF NOT EXISTS photo_sources (
    id TEXT PRIMARY KEY,
    type TEXT NOT NULL,
    name TEXT NOT NULL,
    config TEXT,                  -- origin-specific, opaque to the catalog
    enabled INTEGER NOT NULL DEFAULT 1,
    created_at TEXT DEFAULT (datetime('now')),
    last_sync TEXT
);

-- One row per stored image
CREATE TABLE IF NOT EXISTS photos (
    id TEXT PRIMARY KEY,
    source_id TEXT NOT NULL REFERENCES photo_sources(id) ON DELETE CASCADE,
    remote_id TEXT,
    filename TEXT NOT NULL,
    local_path TEXT,              -- relative to the originals root
    width INTEGER,
    height INTEGER,
    taken_at TEXT,                -- EXIF capture time, NULL when absent
    created_at TEXT DEFAULT (datetime('now')),
    metadata TEXT,                -- opaque JSON blob
    synced_at TEXT
);

-- Named groupings within a source (remote-gallery sync)
CREATE TABLE IF NOT EXISTS albums (
    id TEXT PRIMARY KEY,
    source_id TEXT NOT NULL REFERENCES photo_sources(id) ON DELETE CASCADE,
    remote_id TEXT,
    name TEXT NOT NULL,
    photo_count INTEGER NOT NULL DEFAULT 0,
    enabled INTEGER NOT NULL DEFAULT 1,
    last_sync TEXT
);

-- Create indexes
CREATE INDEX IF NOT EXISTS idx_photos_source ON photos(source_id);
CREATE INDEX IF NOT EXISTS idx_photos_taken ON photos(taken_at);
CREATE INDEX IF NOT EXISTS idx_albums_source ON albums(source_id);
"#;
