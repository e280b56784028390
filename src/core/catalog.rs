//! The sensor catalog: the fixed list of measurements tracked for each station.
//!
//! Entities created from the catalog remember their `source_field`, and the conversion
//! [`Rule`] is looked up by that field at runtime.

/// Companion field with the daily maximum wind gust, miles per hour.
pub const MAX_DAILY_GUST: &str = "maxdailygust";

/// Companion field with the monthly rainfall, inches.
pub const MONTHLY_RAIN: &str = "monthlyrainin";

/// Entity template kind.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Kind {
    Sensor,
}

impl Kind {
    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Sensor => "sensor",
        }
    }
}

/// Conversion rule bound to a source field.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Rule {
    /// Fahrenheit to Celsius.
    Temperature,

    /// [UV index](https://en.wikipedia.org/wiki/Ultraviolet_index) with a tier label.
    UvIndex,

    /// Absolute pressure, inches of mercury to hectopascals.
    Pressure,

    /// Miles per hour to kilometres per hour.
    WindSpeed,

    /// Same as `WindSpeed`, annotated with the daily maximum taken from the companion field.
    WindGust { daily_max: &'static str },

    /// Inches to millimetres, annotated with the monthly total taken from the companion field.
    Rainfall { monthly: &'static str },

    /// Plain number.
    Passthrough,
}

impl Rule {
    /// Resolves the rule for the source field. Fields outside of the catalog are passed through.
    pub fn of(source_field: &str) -> Self {
        find(source_field).map_or(Rule::Passthrough, |definition| definition.rule)
    }
}

#[derive(PartialEq, Debug)]
pub struct SensorDefinition {
    /// Display name of the created entity.
    pub name: &'static str,

    pub kind: Kind,

    /// Payload key the sensor is bound to.
    pub source_field: &'static str,

    /// Device type tag, used by the user interfaces to pick a widget.
    pub device_type: &'static str,

    /// Display unit of the converted value.
    pub unit: Option<&'static str>,

    pub rule: Rule,
}

/// Sensors in their creation order.
pub static CATALOG: &[SensorDefinition] = &[
    SensorDefinition {
        name: "Indoor Temperature",
        kind: Kind::Sensor,
        source_field: "tempinf",
        device_type: "Temperature",
        unit: Some("°C"),
        rule: Rule::Temperature,
    },
    SensorDefinition {
        name: "Outdoor Temperature",
        kind: Kind::Sensor,
        source_field: "tempf",
        device_type: "Temperature",
        unit: Some("°C"),
        rule: Rule::Temperature,
    },
    SensorDefinition {
        name: "Indoor Humidity",
        kind: Kind::Sensor,
        source_field: "humidityin",
        device_type: "Humidity",
        unit: Some("%"),
        rule: Rule::Passthrough,
    },
    SensorDefinition {
        name: "Outdoor Humidity",
        kind: Kind::Sensor,
        source_field: "humidity",
        device_type: "Humidity",
        unit: Some("%"),
        rule: Rule::Passthrough,
    },
    SensorDefinition {
        name: "Barometer",
        kind: Kind::Sensor,
        source_field: "baromabsin",
        device_type: "Barometer",
        unit: Some("hPa"),
        rule: Rule::Pressure,
    },
    SensorDefinition {
        name: "Wind Speed",
        kind: Kind::Sensor,
        source_field: "windspeedmph",
        device_type: "Wind",
        unit: Some("km/h"),
        rule: Rule::WindSpeed,
    },
    SensorDefinition {
        name: "Wind Gust",
        kind: Kind::Sensor,
        source_field: "windgustmph",
        device_type: "Wind",
        unit: Some("km/h"),
        rule: Rule::WindGust {
            daily_max: MAX_DAILY_GUST,
        },
    },
    SensorDefinition {
        name: "Rain",
        kind: Kind::Sensor,
        source_field: "dailyrainin",
        device_type: "Rain",
        unit: Some("mm"),
        rule: Rule::Rainfall { monthly: MONTHLY_RAIN },
    },
    SensorDefinition {
        name: "Solar Radiation",
        kind: Kind::Sensor,
        source_field: "solarradiation",
        device_type: "Solar Radiation",
        unit: Some("W/m²"),
        rule: Rule::Passthrough,
    },
    SensorDefinition {
        name: "UV Index",
        kind: Kind::Sensor,
        source_field: "uv",
        device_type: "UV",
        unit: None,
        rule: Rule::UvIndex,
    },
];

/// Finds the definition bound to the source field.
pub fn find(source_field: &str) -> Option<&'static SensorDefinition> {
    CATALOG
        .iter()
        .find(|definition| definition.source_field == source_field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn catalog_has_ten_sensors() {
        assert_eq!(CATALOG.len(), 10);
    }

    #[test]
    fn source_fields_are_unique() {
        let fields: HashSet<_> = CATALOG.iter().map(|definition| definition.source_field).collect();
        assert_eq!(fields.len(), CATALOG.len());
    }

    #[test]
    fn rule_of_known_field() {
        assert_eq!(Rule::of("tempinf"), Rule::Temperature);
        assert_eq!(
            Rule::of("windgustmph"),
            Rule::WindGust {
                daily_max: "maxdailygust"
            }
        );
        assert_eq!(Rule::of("dailyrainin"), Rule::Rainfall { monthly: "monthlyrainin" });
    }

    #[test]
    fn unknown_field_is_passed_through() {
        assert_eq!(Rule::of("wh65batt"), Rule::Passthrough);
        assert_eq!(find("wh65batt"), None);
    }
}
