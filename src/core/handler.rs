//! Ingestion handler: processes one station push at a time.

use crate::core::bootstrap::{reconcile, SensorHandle};
use crate::core::normalizer;
use crate::core::update::Update;
use crate::logging::Log;
use crate::prelude::*;
use std::sync::PoisonError;

/// Station-level fields copied verbatim: payload field and device attribute.
const STATION_FIELDS: &[(&str, &str)] = &[("stationtype", "station_type"), ("model", "model")];

/// Payload field with the UTC timestamp of the measurement.
const DATE_FIELD: &str = "dateutc";

/// Outcome of a single ingestion cycle.
#[derive(Clone, Copy, Default, PartialEq, Debug)]
pub struct Cycle {
    /// Sensors written.
    pub updated: usize,

    /// Sensors whose field is absent from the payload.
    pub skipped: usize,

    /// Sensors that failed to convert or to write.
    pub failed: usize,
}

/// Handles the pushes of a single station device.
pub struct Handler<S> {
    store: S,
    parent_id: String,

    /// Sensor handles, `None` until the catalog gets reconciled.
    /// The lock also serializes the cycles, so that an entity never has concurrent writers.
    sensors: Mutex<Option<Vec<SensorHandle>>>,
}

impl<S: DeviceStore> Handler<S> {
    pub fn new<P: Into<String>>(store: S, parent_id: P) -> Self {
        Self {
            store,
            parent_id: parent_id.into(),
            sensors: Mutex::new(None),
        }
    }

    /// Runs an ingestion cycle.
    ///
    /// Fails only on the parent level: the device is missing, disabled, or the catalog
    /// could not be reconciled. Sensor failures are logged and counted in the returned `Cycle`.
    pub fn handle(&self, payload: &WeatherPayload) -> Result<Cycle> {
        let mut sensors = self.sensors.lock().unwrap_or_else(PoisonError::into_inner);

        let parent = self.store.get_parent(&self.parent_id)?;
        if !parent.enabled {
            return Err(Error::Disabled(parent.id));
        }
        if sensors.is_none() {
            *sensors = Some(reconcile(&self.store, &self.parent_id)?);
        }

        self.update_station(payload);

        let mut cycle = Cycle::default();
        let mut is_stale = false;
        for sensor in sensors.iter().flatten() {
            if !payload.contains(&sensor.source_field) {
                debug!("[{}] `{}` is absent, skipping.", self.parent_id, sensor.source_field);
                cycle.skipped += 1;
                continue;
            }
            match self.update_sensor(sensor, payload) {
                Ok(_) => cycle.updated += 1,
                Err(error) => {
                    warn!("[{}] Sensor #{} is not updated: {}", self.parent_id, sensor.entity_id, error);
                    is_stale |= matches!(error, Error::NotFound(_));
                    cycle.failed += 1;
                }
            }
        }
        if is_stale {
            // Entities are gone from the store, the next cycle reconciles them again.
            warn!("[{}] Sensor handles are stale, dropping them.", self.parent_id);
            *sensors = None;
        }
        Ok(cycle)
    }

    fn update_sensor(&self, sensor: &SensorHandle, payload: &WeatherPayload) -> Result {
        let normalized = normalizer::apply(sensor.rule, &sensor.source_field, payload)?;
        debug!(
            "[{}] {} = {:?} ({:?})",
            self.parent_id, sensor.source_field, normalized.value, normalized.annotation
        );
        Update::from((sensor.entity_id, normalized)).write_to(&self.store)
    }

    /// Copies the station-level display fields and stamps the last update.
    fn update_station(&self, payload: &WeatherPayload) {
        for (field, attribute) in STATION_FIELDS.iter() {
            if let Some(value) = payload.get(field) {
                self.write_station_attribute(attribute, value);
            }
        }
        if let Some(date) = payload.get(DATE_FIELD) {
            self.write_station_attribute("date", &format!("{} UTC", date));
        }
        self.write_station_attribute("last_update", &Local::now().format("%F %T").to_string());
    }

    fn write_station_attribute(&self, name: &str, value: &str) {
        let _ = self
            .store
            .write_device_attribute(&self.parent_id, name, value)
            .log(|| format!("[{}] failed to write `{}`", self.parent_id, name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::CATALOG;
    use crate::core::db::Connection;
    use std::thread;

    const PUSH: &str = "PASSKEY=ABCDEF&stationtype=EasyWeatherV1.5.4&dateutc=2020-11-01+12:00:00\
        &tempinf=72.9&humidityin=40&baromabsin=30.337&tempf=55.9&humidity=66&windspeedmph=0.0\
        &windgustmph=0.0&maxdailygust=8.1&dailyrainin=0.000&monthlyrainin=0.020\
        &solarradiation=0.00&uv=0&model=HP2551";

    fn open_with_device(enabled: bool) -> Result<Connection> {
        let db = Connection::open_and_initialize(":memory:")?;
        db.upsert_device(&ParentDevice {
            id: "ecowitt".into(),
            name: "Weather Station".into(),
            enabled,
        })?;
        Ok(db)
    }

    fn entity(db: &Connection, source_field: &str) -> Result<SensorEntity> {
        Ok(db
            .select_entities("ecowitt")?
            .into_iter()
            .find(|entity| entity.source_field.as_deref() == Some(source_field))
            .expect("the entity is missing"))
    }

    fn values(db: &Connection) -> Result<Vec<(Option<f64>, Option<String>)>> {
        Ok(db
            .select_entities("ecowitt")?
            .into_iter()
            .map(|entity| (entity.value, entity.annotation))
            .collect())
    }

    #[test]
    fn end_to_end_ok() -> Result {
        let db = open_with_device(true)?;
        let handler = Handler::new(db.clone(), "ecowitt");

        let cycle = handler.handle(&WeatherPayload::from_form(PUSH))?;
        assert_eq!(
            cycle,
            Cycle {
                updated: 10,
                skipped: 0,
                failed: 0
            }
        );

        assert_eq!(entity(&db, "tempinf")?.value, Some(22.72));
        assert_eq!(entity(&db, "tempf")?.value, Some(13.28));
        assert_eq!(entity(&db, "humidity")?.value, Some(66.0));

        let uv = entity(&db, "uv")?;
        assert_eq!(uv.value, Some(0.0));
        assert_eq!(uv.annotation.as_deref(), Some("None"));

        assert_eq!(entity(&db, "baromabsin")?.value, Some(1027.32));

        let gust = entity(&db, "windgustmph")?;
        assert_eq!(gust.value, Some(0.0));
        assert_eq!(gust.annotation.as_deref(), Some("Max: 13.04 km/u"));

        let rain = entity(&db, "dailyrainin")?;
        assert_eq!(rain.value, Some(0.0));
        assert_eq!(rain.annotation.as_deref(), Some("Month: 0.5 mm"));
        assert_eq!(rain.unit.as_deref(), Some("mm"));
        Ok(())
    }

    #[test]
    fn station_attributes_ok() -> Result {
        let db = open_with_device(true)?;
        let handler = Handler::new(db.clone(), "ecowitt");
        handler.handle(&WeatherPayload::from_form(PUSH))?;

        assert_eq!(
            db.select_device_attribute("ecowitt", "station_type")?.as_deref(),
            Some("EasyWeatherV1.5.4")
        );
        assert_eq!(db.select_device_attribute("ecowitt", "model")?.as_deref(), Some("HP2551"));
        assert_eq!(
            db.select_device_attribute("ecowitt", "date")?.as_deref(),
            Some("2020-11-01 12:00:00 UTC")
        );
        assert!(db.select_device_attribute("ecowitt", "last_update")?.is_some());
        Ok(())
    }

    #[test]
    fn missing_station_fields_keep_previous_values() -> Result {
        let db = open_with_device(true)?;
        let handler = Handler::new(db.clone(), "ecowitt");
        handler.handle(&WeatherPayload::from_form(PUSH))?;
        handler.handle(&WeatherPayload::from_form("tempinf=70.0"))?;
        assert_eq!(db.select_device_attribute("ecowitt", "model")?.as_deref(), Some("HP2551"));
        Ok(())
    }

    #[test]
    fn handle_is_idempotent() -> Result {
        let db = open_with_device(true)?;
        let handler = Handler::new(db.clone(), "ecowitt");
        let payload = WeatherPayload::from_form(PUSH);

        let first_cycle = handler.handle(&payload)?;
        let first = values(&db)?;
        let second_cycle = handler.handle(&payload)?;
        assert_eq!(values(&db)?, first);
        assert_eq!(second_cycle, first_cycle);
        assert_eq!(db.select_entity_count()?, CATALOG.len());
        Ok(())
    }

    #[test]
    fn restarted_handler_reattaches() -> Result {
        let db = open_with_device(true)?;
        Handler::new(db.clone(), "ecowitt").handle(&WeatherPayload::from_form(PUSH))?;
        let cycle = Handler::new(db.clone(), "ecowitt").handle(&WeatherPayload::from_form("tempinf=50.0"))?;
        assert_eq!(cycle.updated, 1);
        assert_eq!(db.select_entity_count()?, CATALOG.len());
        assert_eq!(entity(&db, "tempinf")?.value, Some(10.0));
        Ok(())
    }

    #[test]
    fn missing_daily_max_gust_keeps_gust_value() -> Result {
        let db = open_with_device(true)?;
        let handler = Handler::new(db.clone(), "ecowitt");
        let cycle = handler.handle(&WeatherPayload::from_form("windgustmph=5.8"))?;
        assert_eq!(cycle.failed, 0);
        assert_eq!(cycle.updated, 1);

        let gust = entity(&db, "windgustmph")?;
        assert_eq!(gust.value, Some(9.33));
        assert_eq!(gust.annotation, None);
        Ok(())
    }

    #[test]
    fn absent_fields_retain_previous_values() -> Result {
        let db = open_with_device(true)?;
        let handler = Handler::new(db.clone(), "ecowitt");
        handler.handle(&WeatherPayload::from_form(PUSH))?;

        let cycle = handler.handle(&WeatherPayload::from_form("tempf=32.0"))?;
        assert_eq!(cycle.updated, 1);
        assert_eq!(cycle.skipped, CATALOG.len() - 1);
        assert_eq!(entity(&db, "tempf")?.value, Some(0.0));
        assert_eq!(entity(&db, "tempinf")?.value, Some(22.72));
        Ok(())
    }

    #[test]
    fn bad_field_does_not_block_others() -> Result {
        let db = open_with_device(true)?;
        let handler = Handler::new(db.clone(), "ecowitt");
        let cycle = handler.handle(&WeatherPayload::from_form("tempf=--.-&tempinf=72.9&uv=7"))?;
        assert_eq!(cycle.failed, 1);
        assert_eq!(cycle.updated, 2);
        assert_eq!(entity(&db, "tempf")?.value, None);
        assert_eq!(entity(&db, "tempinf")?.value, Some(22.72));
        assert_eq!(entity(&db, "uv")?.annotation.as_deref(), Some("High"));
        Ok(())
    }

    #[test]
    fn disabled_device_skips_cycle() -> Result {
        let db = open_with_device(false)?;
        let handler = Handler::new(db.clone(), "ecowitt");
        assert!(matches!(
            handler.handle(&WeatherPayload::from_form(PUSH)),
            Err(Error::Disabled(_))
        ));
        assert_eq!(db.select_entity_count()?, 0);
        assert_eq!(db.select_device_attribute("ecowitt", "model")?, None);
        Ok(())
    }

    #[test]
    fn deleted_device_skips_cycle() -> Result {
        let db = open_with_device(true)?;
        let handler = Handler::new(db.clone(), "ecowitt");
        handler.handle(&WeatherPayload::from_form(PUSH))?;
        db.delete_device("ecowitt")?;
        assert!(matches!(
            handler.handle(&WeatherPayload::from_form(PUSH)),
            Err(Error::NotFound(_))
        ));
        Ok(())
    }

    #[test]
    fn re_registered_device_gets_bootstrapped_again() -> Result {
        let db = open_with_device(true)?;
        let handler = Handler::new(db.clone(), "ecowitt");
        handler.handle(&WeatherPayload::from_form("tempf=50.0"))?;

        db.delete_device("ecowitt")?;
        set_enabled(&db, true)?;
        assert_eq!(db.select_entity_count()?, 0);

        let cycle = handler.handle(&WeatherPayload::from_form("tempf=50.0&uv=3"))?;
        assert_eq!(cycle.updated, 0);
        assert_eq!(cycle.failed, 2);

        let cycle = handler.handle(&WeatherPayload::from_form("tempf=50.0&uv=3"))?;
        assert_eq!(cycle.updated, 2);
        assert_eq!(cycle.failed, 0);
        assert_eq!(db.select_entity_count()?, CATALOG.len());
        assert_eq!(entity(&db, "tempf")?.value, Some(10.0));
        Ok(())
    }

    #[test]
    fn concurrent_pushes_are_serialized() -> Result {
        let db = open_with_device(true)?;
        let handler = Arc::new(Handler::new(db.clone(), "ecowitt"));

        let threads: Vec<_> = (0..8)
            .map(|_| {
                let handler = handler.clone();
                thread::spawn(move || handler.handle(&WeatherPayload::from_form("tempf=50.0")))
            })
            .collect();
        for thread in threads {
            let cycle = thread.join().expect("the thread has panicked")?;
            assert_eq!(cycle.updated, 1);
            assert_eq!(cycle.skipped, CATALOG.len() - 1);
        }

        assert_eq!(db.select_entity_count()?, CATALOG.len());
        assert_eq!(entity(&db, "tempf")?.value, Some(10.0));
        Ok(())
    }

    #[test]
    fn re_enabled_device_gets_bootstrapped() -> Result {
        let db = open_with_device(false)?;
        let handler = Handler::new(db.clone(), "ecowitt");
        assert!(handler.handle(&WeatherPayload::from_form(PUSH)).is_err());

        set_enabled(&db, true)?;
        let cycle = handler.handle(&WeatherPayload::from_form(PUSH))?;
        assert_eq!(cycle.updated, CATALOG.len());
        Ok(())
    }

    fn set_enabled(db: &Connection, enabled: bool) -> Result {
        db.upsert_device(&ParentDevice {
            id: "ecowitt".into(),
            name: "Weather Station".into(),
            enabled,
        })
    }
}
