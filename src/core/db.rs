//! Database interface.

use crate::core::db::migrations::MIGRATIONS;
use crate::core::store::SOURCE_FIELD_KEY;
use crate::prelude::*;
use rusqlite::{params, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{MutexGuard, PoisonError};

pub mod migrations;

/// Wraps `rusqlite::Connection` and implements the device store on top of it.
#[derive(Clone)]
pub struct Connection {
    connection: Arc<Mutex<rusqlite::Connection>>,
}

impl Connection {
    pub fn open_and_initialize<P: AsRef<Path>>(path: P) -> Result<Self> {
        let connection = Self {
            connection: Arc::new(Mutex::new(rusqlite::Connection::open(path)?)),
        };
        connection.connection().execute_batch("PRAGMA foreign_keys = ON")?;
        connection.migrate()?;
        Ok(connection)
    }

    fn migrate(&self) -> Result {
        let user_version = self.get_user_version()?;
        let mut connection = self.connection();
        for (i, migration) in MIGRATIONS.iter().enumerate() {
            if user_version < i + 1 {
                info!("Applying migration #{}…", i + 1);
                let tx = connection.transaction()?;
                tx.execute_batch(migration)?;
                tx.commit()?;
            }
        }
        Ok(())
    }

    /// Acquires lock and returns the underlying `rusqlite::Connection`.
    fn connection(&self) -> MutexGuard<'_, rusqlite::Connection> {
        self.connection.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get_user_version(&self) -> Result<usize> {
        let version: i64 = self
            .connection()
            .pragma_query_value(None, "user_version", |row| row.get(0))?;
        Ok(version as usize)
    }

    /// Registers the device or refreshes its name and state.
    pub fn upsert_device(&self, device: &ParentDevice) -> Result {
        self.connection()
            // language=sql
            .prepare_cached(
                r#"
                -- noinspection SqlResolve @ any/"excluded"
                INSERT INTO devices (id, name, enabled)
                VALUES (?1, ?2, ?3)
                ON CONFLICT (id) DO UPDATE SET name = excluded.name, enabled = excluded.enabled
                "#,
            )?
            .execute(params![device.id, device.name, device.enabled])?;
        Ok(())
    }

    /// Deletes the device together with its entities.
    pub fn delete_device(&self, device_id: &str) -> Result {
        self.connection()
            // language=sql
            .prepare_cached("DELETE FROM devices WHERE id = ?1")?
            .execute(params![device_id])?;
        Ok(())
    }

    pub fn select_device_attribute(&self, device_id: &str, name: &str) -> Result<Option<String>> {
        Ok(self
            .connection()
            // language=sql
            .prepare_cached("SELECT value FROM device_attributes WHERE device_fk = ?1 AND name = ?2")?
            .query_row(params![device_id, name], |row| row.get(0))
            .optional()?)
    }

    /// Selects all entities of the device in their creation order.
    pub fn select_entities(&self, device_id: &str) -> Result<Vec<SensorEntity>> {
        self.connection()
            // language=sql
            .prepare_cached(
                r#"
                SELECT entities.*, entity_metadata.value AS source_field
                FROM entities
                LEFT JOIN entity_metadata
                    ON entity_metadata.entity_fk = entities.pk AND entity_metadata.`key` = ?2
                WHERE entities.device_fk = ?1
                ORDER BY entities.pk
                "#,
            )?
            .query_map(params![device_id, SOURCE_FIELD_KEY], get_entity)?
            .map(|r| r.map_err(Into::into))
            .collect()
    }

    pub fn select_entity_count(&self) -> Result<usize> {
        let count: i64 = self
            .connection()
            // language=sql
            .prepare_cached("SELECT COUNT(*) FROM entities")?
            .query_row(params![], |row| row.get(0))?;
        Ok(count as usize)
    }
}

impl DeviceStore for Connection {
    fn get_parent(&self, parent_id: &str) -> Result<ParentDevice> {
        self.connection()
            // language=sql
            .prepare_cached("SELECT id, name, enabled FROM devices WHERE id = ?1")?
            .query_row(params![parent_id], |row| {
                Ok(ParentDevice {
                    id: row.get("id")?,
                    name: row.get("name")?,
                    enabled: row.get("enabled")?,
                })
            })
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("device `{}`", parent_id)))
    }

    fn list_children(&self, parent_id: &str) -> Result<Vec<Child>> {
        let connection = self.connection();
        let ids = connection
            // language=sql
            .prepare_cached("SELECT pk FROM entities WHERE device_fk = ?1 ORDER BY pk")?
            .query_map(params![parent_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;

        let mut statement = connection
            // language=sql
            .prepare_cached("SELECT `key`, value FROM entity_metadata WHERE entity_fk = ?1")?;
        let mut children = Vec::with_capacity(ids.len());
        for id in ids {
            let metadata = statement
                .query_map(params![id], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<rusqlite::Result<HashMap<String, String>>>()?;
            children.push(Child { id, metadata });
        }
        Ok(children)
    }

    fn create_child(&self, parent_id: &str, template: &ChildTemplate) -> Result<i64> {
        let connection = self.connection();
        connection
            // language=sql
            .prepare_cached("INSERT INTO entities (device_fk, name, device_type, kind) VALUES (?1, ?2, ?3, ?4)")?
            .execute(params![
                parent_id,
                template.name,
                template.device_type,
                template.kind.as_str(),
            ])?;
        Ok(connection.last_insert_rowid())
    }

    fn set_metadata(&self, entity_id: i64, key: &str, value: &str) -> Result {
        self.connection()
            // language=sql
            .prepare_cached(
                r#"
                -- noinspection SqlResolve @ any/"excluded"
                INSERT INTO entity_metadata (entity_fk, `key`, value)
                VALUES (?1, ?2, ?3)
                ON CONFLICT (entity_fk, `key`) DO UPDATE SET value = excluded.value
                "#,
            )?
            .execute(params![entity_id, key, value])?;
        Ok(())
    }

    fn get_metadata(&self, entity_id: i64, key: &str) -> Result<Option<String>> {
        Ok(self
            .connection()
            // language=sql
            .prepare_cached("SELECT value FROM entity_metadata WHERE entity_fk = ?1 AND `key` = ?2")?
            .query_row(params![entity_id, key], |row| row.get(0))
            .optional()?)
    }

    fn write_attribute(&self, entity_id: i64, attribute: &Attribute) -> Result {
        let connection = self.connection();
        let updated = match attribute {
            Attribute::Value(value) => connection
                // language=sql
                .prepare_cached("UPDATE entities SET value = ?2, timestamp = ?3 WHERE pk = ?1")?
                .execute(params![entity_id, value, Local::now().timestamp_millis()])?,
            Attribute::Annotation(annotation) => connection
                // language=sql
                .prepare_cached("UPDATE entities SET annotation = ?2 WHERE pk = ?1")?
                .execute(params![entity_id, annotation])?,
            Attribute::Unit(unit) => connection
                // language=sql
                .prepare_cached("UPDATE entities SET unit = ?2 WHERE pk = ?1")?
                .execute(params![entity_id, unit])?,
        };
        if updated == 0 {
            return Err(Error::NotFound(format!("entity #{}", entity_id)));
        }
        Ok(())
    }

    fn write_device_attribute(&self, parent_id: &str, name: &str, value: &str) -> Result {
        self.connection()
            // language=sql
            .prepare_cached(
                r#"
                -- noinspection SqlResolve @ any/"excluded"
                INSERT INTO device_attributes (device_fk, name, value)
                VALUES (?1, ?2, ?3)
                ON CONFLICT (device_fk, name) DO UPDATE SET value = excluded.value
                "#,
            )?
            .execute(params![parent_id, name, value])?;
        Ok(())
    }
}

/// Builds a `SensorEntity` instance based on the database row.
fn get_entity(row: &Row) -> rusqlite::Result<SensorEntity> {
    Ok(SensorEntity {
        id: row.get("pk")?,
        parent_id: row.get("device_fk")?,
        name: row.get("name")?,
        device_type: row.get("device_type")?,
        source_field: row.get("source_field")?,
        value: row.get("value")?,
        annotation: row.get("annotation")?,
        unit: row.get("unit")?,
        updated_at: row
            .get::<_, Option<i64>>("timestamp")?
            .and_then(|millis| Local.timestamp_millis_opt(millis).single()),
    })
}
