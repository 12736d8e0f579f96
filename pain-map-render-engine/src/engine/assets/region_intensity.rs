use crate::engine::assets::region::RegionKey;
use crate::error::IntensityError;
use bevy::prelude::*;
use constants::region::{MAX_INTENSITY, REGIONS};
use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Pain rating per region and side, 0 to 100.
///
/// Every recognised key is always present. Inserting the resource is what
/// moves the viewer out of its empty state.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct RegionIntensity {
    values: BTreeMap<RegionKey, u8>,
}

impl Default for RegionIntensity {
    fn default() -> Self {
        Self {
            values: RegionKey::all().map(|key| (key, 0)).collect(),
        }
    }
}

/// Outcome of a strict update: how many ratings landed and which keys were skipped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppliedRatings {
    pub applied: usize,
    pub ignored: Vec<String>,
}

/// `40` and `40.0` are both accepted; `40.5` is not.
fn whole_number(value: &serde_json::Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|v| v.is_finite() && v.fract() == 0.0)
            .map(|v| v as i64)
    })
}

/// One line of the ratings overview: both sides of a region next to each other.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverviewRow {
    pub label: &'static str,
    pub region: &'static str,
    pub left: u8,
    pub right: u8,
}

impl RegionIntensity {
    pub fn get(&self, key: RegionKey) -> u8 {
        self.values.get(&key).copied().unwrap_or(0)
    }

    pub fn set(&mut self, key: RegionKey, value: u8) -> Result<(), IntensityError> {
        if value > MAX_INTENSITY {
            return Err(IntensityError::OutOfRange {
                key: key.to_string(),
                value: value.into(),
            });
        }
        self.values.insert(key, value);
        Ok(())
    }

    /// Blend weight of a region in the overlay shader.
    pub fn opacity(&self, key: RegionKey) -> f32 {
        f32::from(self.get(key)) / f32::from(MAX_INTENSITY)
    }

    pub fn iter(&self) -> impl Iterator<Item = (RegionKey, u8)> + '_ {
        self.values.iter().map(|(key, value)| (*key, *value))
    }

    /// Build from the flat key/value map produced by the rating flow.
    ///
    /// Unknown keys are skipped. Values outside 0..=100 are clamped and
    /// non-numeric values are skipped, both with a warning.
    pub fn from_entries<'a>(
        entries: impl IntoIterator<Item = (&'a str, &'a serde_json::Value)>,
    ) -> Self {
        let mut intensity = Self::default();
        for (raw_key, raw_value) in entries {
            let Some(key) = RegionKey::parse(raw_key) else {
                debug!("Ignoring unknown region key '{}'", raw_key);
                continue;
            };
            let Some(value) = raw_value
                .as_i64()
                .or_else(|| raw_value.as_f64().map(|v| v.round() as i64))
            else {
                warn!("Ignoring non-numeric intensity for '{}': {}", raw_key, raw_value);
                continue;
            };
            let clamped = value.clamp(0, i64::from(MAX_INTENSITY));
            if clamped != value {
                warn!(
                    "Intensity {} for '{}' clamped to {}",
                    value, raw_key, clamped
                );
            }
            intensity.values.insert(key, clamped as u8);
        }
        intensity
    }

    /// Strict variant used by the RPC bridge. Unknown keys are skipped; every
    /// recognised key must carry a whole number in 0..=100 or nothing applies.
    pub fn apply_strict<'a>(
        &mut self,
        entries: impl IntoIterator<Item = (&'a str, &'a serde_json::Value)>,
    ) -> Result<AppliedRatings, IntensityError> {
        let mut staged = self.values.clone();
        let mut report = AppliedRatings::default();
        for (raw_key, raw_value) in entries {
            let Some(key) = RegionKey::parse(raw_key) else {
                warn!("Ignoring unknown region key '{}'", raw_key);
                report.ignored.push(raw_key.to_string());
                continue;
            };
            let value = whole_number(raw_value).ok_or_else(|| IntensityError::NotAnInteger {
                key: raw_key.to_string(),
                value: raw_value.to_string(),
            })?;
            if !(0..=i64::from(MAX_INTENSITY)).contains(&value) {
                return Err(IntensityError::OutOfRange {
                    key: raw_key.to_string(),
                    value,
                });
            }
            staged.insert(key, value as u8);
            report.applied += 1;
        }
        self.values = staged;
        Ok(report)
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn overview(&self) -> Vec<OverviewRow> {
        RegionKey::all()
            .take(REGIONS.len())
            .map(|right| OverviewRow {
                label: right.label(),
                region: right.region(),
                left: self.get(right.mirrored()),
                right: self.get(right),
            })
            .collect()
    }
}

impl Serialize for RegionIntensity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (key, value) in &self.values {
            map.serialize_entry(&key.to_string(), value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RegionIntensity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Map::<String, serde_json::Value>::deserialize(deserializer)?;
        Ok(Self::from_entries(
            raw.iter().map(|(key, value)| (key.as_str(), value)),
        ))
    }
}
