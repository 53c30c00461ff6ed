use crate::error::{ExportError, ExportResult};

/// Series identifier (`<Parameter>.<Label>`) → canonical field name.
pub static SERIES_FIELDS: &[(&str, &str)] = &[
    ("Water Temp.Water Temperature (C) HOBO", "WaterTemp_C"),
    ("Precip Total.Precipitation (cm)", "PRCP_CM"),
    ("Snow Depth.Snow Depth (cm)", "SNWD"),
    ("Air Temp.Average Daily Temperature (C)", "TAVG_C"),
    ("Air Temp.Maximum Daily Temperature (C)", "TMAX_C"),
    ("Air Temp.Minimum Daily Temperature (C)", "TMIN_C"),
    ("DepthToWaterFromGround.DTW_g_Adjusted", "DTW_g_Adjusted"),
    ("Absolute Pressure.Pressure_Baromerged", "Pressure_Baromerged"),
    ("Absolute Pressure.Pressure_Raw", "Pressure_Raw"),
    ("Absolute Pressure.Pressure_Baro", "Pressure_Baro"),
    (
        "Groundwater Temp at Depth.Groundwater Temp at Depth 0-200 cm",
        "Temperature_Raw",
    ),
];

/// A validated series to export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesSpec {
    pub identifier: String,
    pub field: &'static str,
}

impl SeriesSpec {
    /// Store identifier of this series at `site`, e.g.
    /// `Water Temp.Water Temperature (C) HOBO@ROMO_001`.
    pub fn qualified_name(&self, site: &str) -> String {
        format!("{}@{}", self.identifier, site)
    }
}

/// The `<Parameter>` part of a `<Parameter>.<Label>` identifier, used to
/// narrow store lookups. An identifier without a label is all parameter.
pub fn parameter_name(identifier: &str) -> &str {
    identifier
        .split_once('.')
        .map_or(identifier, |(param, _)| param)
}

pub fn field_name(identifier: &str) -> Option<&'static str> {
    SERIES_FIELDS
        .iter()
        .find(|(id, _)| *id == identifier.trim())
        .map(|(_, field)| *field)
}

/// Validates every requested identifier against the catalog.
///
/// # Errors
///
/// [`ExportError::UnknownSeries`] naming the first identifier with no entry.
pub fn resolve_series(identifiers: &[String]) -> ExportResult<Vec<SeriesSpec>> {
    identifiers
        .iter()
        .map(|id| {
            let field =
                field_name(id).ok_or_else(|| ExportError::UnknownSeries(id.to_string()))?;
            Ok(SeriesSpec {
                identifier: id.trim().to_string(),
                field,
            })
        })
        .collect()
}
