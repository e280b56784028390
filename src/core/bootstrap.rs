//! Reconciles the sensor catalog with the entities persisted under a station device.
//!
//! The existing entities are reattached by their `source_field` metadata, so that no duplicates
//! ever appear. Catalog sensors without an entity get created, which covers the very first start.

use crate::core::catalog::{Rule, SensorDefinition, CATALOG};
use crate::core::store::{SOURCE_FIELD_KEY, UNIT_KEY};
use crate::prelude::*;

/// In-memory handle bound to a persisted sensor entity.
#[derive(Clone, PartialEq, Debug)]
pub struct SensorHandle {
    pub entity_id: i64,
    pub parent_id: String,
    pub source_field: String,
    pub rule: Rule,
}

impl SensorHandle {
    fn new<P: Into<String>, F: Into<String>>(entity_id: i64, parent_id: P, source_field: F) -> Self {
        let source_field = source_field.into();
        Self {
            entity_id,
            parent_id: parent_id.into(),
            rule: Rule::of(&source_field),
            source_field,
        }
    }
}

/// Ensures the catalog exists under the device and returns the handles of its sensors.
pub fn reconcile<S: DeviceStore>(store: &S, parent_id: &str) -> Result<Vec<SensorHandle>> {
    let parent = store.get_parent(parent_id)?;
    if !parent.enabled {
        return Err(Error::Disabled(parent.id));
    }

    let mut handles: Vec<SensorHandle> = store
        .list_children(parent_id)?
        .into_iter()
        .filter_map(|child| rehydrate(parent_id, child))
        .collect();
    if !handles.is_empty() {
        info!("[{}] Reattached {} existing sensors.", parent_id, handles.len());
    }

    let missing: Vec<&SensorDefinition> = CATALOG
        .iter()
        .filter(|definition| !handles.iter().any(|handle| handle.source_field == definition.source_field))
        .collect();
    if !missing.is_empty() {
        info!("[{}] Creating {} sensors…", parent_id, missing.len());
        for definition in missing {
            handles.push(create(store, parent_id, definition)?);
        }
    }
    Ok(handles)
}

fn create<S: DeviceStore>(store: &S, parent_id: &str, definition: &SensorDefinition) -> Result<SensorHandle> {
    let entity_id = store.create_child(
        parent_id,
        &ChildTemplate {
            name: definition.name,
            device_type: definition.device_type,
            kind: definition.kind,
        },
    )?;
    store.set_metadata(entity_id, SOURCE_FIELD_KEY, definition.source_field)?;
    if let Some(unit) = definition.unit {
        store.set_metadata(entity_id, UNIT_KEY, unit)?;
        store.write_attribute(entity_id, &Attribute::Unit(unit.into()))?;
    }
    debug!("[{}] Created #{}: {}", parent_id, entity_id, definition.source_field);
    Ok(SensorHandle::new(entity_id, parent_id, definition.source_field))
}

fn rehydrate(parent_id: &str, mut child: Child) -> Option<SensorHandle> {
    match child.metadata.remove(SOURCE_FIELD_KEY) {
        Some(source_field) => {
            debug!("[{}] Reattached #{}: {}", parent_id, child.id, source_field);
            Some(SensorHandle::new(child.id, parent_id, source_field))
        }
        None => {
            warn!("[{}] Entity #{} has no `{}`, skipping.", parent_id, child.id, SOURCE_FIELD_KEY);
            None
        }
    }
}
