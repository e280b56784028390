pub const MIGRATIONS: &[&str] = &[V1];

// language=sql
const V1: &str = r#"
    CREATE TABLE IF NOT EXISTS devices (
        id TEXT NOT NULL PRIMARY KEY,
        name TEXT NOT NULL,
        enabled INTEGER NOT NULL
    );

    -- Station-level text fields, such as the station type and model.
    CREATE TABLE IF NOT EXISTS device_attributes (
        device_fk TEXT NOT NULL REFERENCES devices ON UPDATE CASCADE ON DELETE CASCADE,
        name TEXT NOT NULL,
        value TEXT NOT NULL,
        PRIMARY KEY (device_fk, name)
    );

    CREATE TABLE IF NOT EXISTS entities (
        pk INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
        device_fk TEXT NOT NULL REFERENCES devices ON UPDATE CASCADE ON DELETE CASCADE,
        name TEXT NOT NULL,
        device_type TEXT NOT NULL,
        kind TEXT NOT NULL,
        value REAL DEFAULT NULL,
        annotation TEXT DEFAULT NULL,
        unit TEXT DEFAULT NULL,
        timestamp INTEGER DEFAULT NULL -- last value write, unix time, milliseconds
    );

    CREATE INDEX IF NOT EXISTS entities_device_fk ON entities (device_fk);

    CREATE TABLE IF NOT EXISTS entity_metadata (
        entity_fk INTEGER NOT NULL REFERENCES entities ON UPDATE CASCADE ON DELETE CASCADE,
        `key` TEXT NOT NULL,
        value TEXT NOT NULL,
        PRIMARY KEY (entity_fk, `key`)
    );

    PRAGMA user_version = 1;
"#;
