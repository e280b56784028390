//! Inbound station push.

use crate::core::error::{Error, Result};
use std::collections::HashMap;
use std::iter::FromIterator;
use url::form_urlencoded;

/// Flat mapping of the station field names onto their raw values.
///
/// For example: `tempinf=72.9&humidityin=40&baromabsin=30.337`.
#[derive(Clone, Default, PartialEq, Debug)]
pub struct WeatherPayload {
    fields: HashMap<String, String>,
}

impl WeatherPayload {
    /// Parses an `application/x-www-form-urlencoded` body.
    pub fn from_form(body: &str) -> Self {
        form_urlencoded::parse(body.trim().as_bytes()).into_owned().collect()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Parses the field as a finite number.
    pub fn parse(&self, field: &str) -> Result<f64> {
        let raw = self
            .get(field)
            .ok_or_else(|| Error::conversion(field, "field is missing"))?;
        match raw.trim().parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(value),
            _ => Err(Error::conversion(field, format!("`{}` is not a number", raw))),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for WeatherPayload {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(key, value)| (key.into(), value.into())).collect(),
        }
    }
}
