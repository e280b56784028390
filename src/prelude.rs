pub use crate::core::error::{Error, Result};
pub use crate::core::payload::WeatherPayload;
pub use crate::core::store::{Attribute, Child, ChildTemplate, DeviceStore, ParentDevice, SensorEntity};
pub use chrono::prelude::*;
pub use log::{debug, error, info, warn};
pub use std::sync::{Arc, Mutex};
