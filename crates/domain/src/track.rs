use std::fmt;

use crate::Geolocation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultType {
    Cz,
    Geo,
    Miss,
    StaticRoute,
    DsMiss,
    Error,
}

impl fmt::Display for ResultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResultType::Cz => "CZ",
            ResultType::Geo => "GEO",
            ResultType::Miss => "MISS",
            ResultType::StaticRoute => "STATIC_ROUTE",
            ResultType::DsMiss => "DS_MISS",
            ResultType::Error => "ERROR",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultDetails {
    NoDetails,
    DsNotFound,
    DsNotAvailable,
    DsCzOnly,
    DsClientGeoUnsupported,
    GeoNoCacheFound,
}

impl fmt::Display for ResultDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResultDetails::NoDetails => "NO_DETAILS",
            ResultDetails::DsNotFound => "DS_NOT_FOUND",
            ResultDetails::DsNotAvailable => "DS_NOT_AVAILABLE",
            ResultDetails::DsCzOnly => "DS_CZ_ONLY",
            ResultDetails::DsClientGeoUnsupported => "DS_CLIENT_GEO_UNSUPPORTED",
            ResultDetails::GeoNoCacheFound => "GEO_NO_CACHE_FOUND",
        })
    }
}

/// How a single request was routed.
#[derive(Debug, Clone)]
pub struct Track {
    pub result: ResultType,
    pub details: ResultDetails,
    pub result_location: Option<Geolocation>,
    pub delivery_service_id: Option<String>,
    pub from_backup_cz_group: bool,
    /// Cleared when a coverage-zone hit forbids falling through to geo.
    pub continue_geo: bool,
}

impl Default for Track {
    fn default() -> Self {
        Self {
            result: ResultType::Error,
            details: ResultDetails::NoDetails,
            result_location: None,
            delivery_service_id: None,
            from_backup_cz_group: false,
            continue_geo: true,
        }
    }
}

impl Track {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_result(&mut self, result: ResultType) {
        self.result = result;
    }

    pub fn set_details(&mut self, details: ResultDetails) {
        self.details = details;
    }

    /// `None` when nothing beyond the result type is worth logging.
    pub fn logged_details(&self) -> Option<ResultDetails> {
        (self.details != ResultDetails::NoDetails).then_some(self.details)
    }
}
