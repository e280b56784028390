//! Device-management interface.
//!
//! The bootstrapper and the handler only talk to the persisted devices and entities through
//! [`DeviceStore`]. The store owns the entities; the core only keeps their IDs.

use crate::core::catalog::Kind;
use crate::core::error::Result;
use chrono::{DateTime, Local};
use std::collections::HashMap;

/// Metadata key that binds an entity to its payload field.
pub const SOURCE_FIELD_KEY: &str = "source_field";

/// Metadata key with the display unit of an entity.
pub const UNIT_KEY: &str = "unit";

/// Parent device, one per station.
#[derive(Clone, PartialEq, Debug)]
pub struct ParentDevice {
    pub id: String,
    pub name: String,

    /// Disabled device ignores all pushes.
    pub enabled: bool,
}

/// Child entity as listed by the store.
#[derive(Clone, PartialEq, Debug)]
pub struct Child {
    pub id: i64,
    pub metadata: HashMap<String, String>,
}

/// What a new child entity is created from.
#[derive(Clone, Copy, Debug)]
pub struct ChildTemplate<'a> {
    pub name: &'a str,
    pub device_type: &'a str,
    pub kind: Kind,
}

/// Writable entity attribute.
#[derive(Clone, PartialEq, Debug)]
pub enum Attribute {
    Value(f64),

    /// Human-readable note shown next to the value.
    Annotation(String),

    Unit(String),
}

/// Persisted sensor entity, as seen by the user interfaces.
#[derive(Clone, PartialEq, Debug)]
pub struct SensorEntity {
    pub id: i64,

    /// Parent device ID, a plain foreign key.
    pub parent_id: String,

    pub name: String,
    pub device_type: String,

    /// `None` when the entity has lost its metadata.
    pub source_field: Option<String>,

    pub value: Option<f64>,
    pub annotation: Option<String>,
    pub unit: Option<String>,

    /// Moment of the last value write.
    pub updated_at: Option<DateTime<Local>>,
}

pub trait DeviceStore {
    /// Fails with `NotFound` when the device does not exist.
    fn get_parent(&self, parent_id: &str) -> Result<ParentDevice>;

    fn list_children(&self, parent_id: &str) -> Result<Vec<Child>>;

    /// Creates a child entity without a value and returns its ID.
    fn create_child(&self, parent_id: &str, template: &ChildTemplate) -> Result<i64>;

    fn set_metadata(&self, entity_id: i64, key: &str, value: &str) -> Result;

    fn get_metadata(&self, entity_id: i64, key: &str) -> Result<Option<String>>;

    /// Fails with `NotFound` when the entity does not exist.
    fn write_attribute(&self, entity_id: i64, attribute: &Attribute) -> Result;

    /// Writes a station-level text attribute.
    fn write_device_attribute(&self, parent_id: &str, name: &str, value: &str) -> Result;
}
