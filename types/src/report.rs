//! Road-condition reports and their lifecycle status.

use crate::{PrincipalId, Timestamp, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unique identifier of a report.
///
/// Either generated at submission time or supplied by the caller, in which
/// case it doubles as an idempotency key for retried submissions.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReportId(String);

impl ReportId {
    pub const MAX_LEN: usize = 96;

    /// Create a report id. Allowed characters: ASCII alphanumerics, `_`, `-`, `.`.
    pub fn new(raw: impl Into<String>) -> Result<Self, ValidationError> {
        let s = raw.into();
        if s.is_empty() {
            return Err(ValidationError::EmptyReportId);
        }
        if let Some(bad) = s
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')))
        {
            return Err(ValidationError::InvalidReportId(bad));
        }
        if s.len() > Self::MAX_LEN {
            return Err(ValidationError::ReportIdTooLong {
                len: s.len(),
                max: Self::MAX_LEN,
            });
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for ReportId {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ReportId> for String {
    fn from(id: ReportId) -> Self {
        id.0
    }
}

/// Kind of road condition observed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Congestion,
    Construction,
    Accident,
    Normal,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Congestion,
        Category::Construction,
        Category::Accident,
        Category::Normal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Congestion => "congestion",
            Category::Construction => "construction",
            Category::Accident => "accident",
            Category::Normal => "normal",
        }
    }
}

impl FromStr for Category {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::UnknownCategory(s.to_string()))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status. `Verified` and `Rejected` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Pending,
    Verified,
    Rejected,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Verified => "verified",
            ReportStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReportStatus::Pending)
    }
}

impl FromStr for ReportStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(ReportStatus::Pending),
            "verified" => Ok(ReportStatus::Verified),
            "rejected" => Ok(ReportStatus::Rejected),
            _ => Err(ValidationError::UnknownStatus(s.to_string())),
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A (longitude, latitude) pair in decimal degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinates")]
pub struct Coordinates {
    longitude: f64,
    latitude: f64,
}

#[derive(Deserialize)]
struct RawCoordinates {
    longitude: f64,
    latitude: f64,
}

impl TryFrom<RawCoordinates> for Coordinates {
    type Error = ValidationError;

    fn try_from(raw: RawCoordinates) -> Result<Self, Self::Error> {
        Coordinates::new(raw.longitude, raw.latitude)
    }
}

impl Coordinates {
    pub fn new(longitude: f64, latitude: f64) -> Result<Self, ValidationError> {
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(ValidationError::LongitudeOutOfRange(longitude));
        }
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(ValidationError::LatitudeOutOfRange(latitude));
        }
        Ok(Self {
            longitude,
            latitude,
        })
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }
}

/// Where the observation was made.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Short place name, e.g. a street or intersection.
    #[serde(default)]
    pub name: String,
    /// Postal address, if known.
    #[serde(default)]
    pub address: String,
    pub coordinates: Coordinates,
}

/// Opaque reference to an externally stored image. Never interpreted here.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaHandle(String);

impl MediaHandle {
    pub fn new(raw: impl Into<String>) -> Result<Self, ValidationError> {
        let s = raw.into();
        if s.trim().is_empty() {
            return Err(ValidationError::EmptyMediaHandle);
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a report left the pending state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resolution {
    /// Enough distinct corroborators confirmed it.
    Quorum,
    /// An administrator confirmed it directly.
    AdminOverride { admin: PrincipalId },
    /// A single negative vote pulled it from consideration.
    NegativeVote { voter: PrincipalId },
    /// An administrator rejected it directly.
    AdminRejection { admin: PrincipalId },
}

/// A crowd-sourced road-condition report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: ReportId,
    pub submitter: PrincipalId,
    pub category: Category,
    pub description: String,
    pub location: Location,
    #[serde(default)]
    pub media_handle: Option<MediaHandle>,
    pub status: ReportStatus,
    /// Principals who confirmed the report, in vote order. Each appears once.
    #[serde(default)]
    pub corroborators: Vec<PrincipalId>,
    /// Always equal to `corroborators.len()`.
    #[serde(default)]
    pub corroboration_count: u32,
    pub created_at: Timestamp,
    #[serde(default)]
    pub verified_at: Option<Timestamp>,
    #[serde(default)]
    pub resolved_at: Option<Timestamp>,
    #[serde(default)]
    pub resolution: Option<Resolution>,
}

impl Report {
    /// A freshly submitted report: pending, no corroborators.
    pub fn new_pending(
        id: ReportId,
        submitter: PrincipalId,
        category: Category,
        description: String,
        location: Location,
        media_handle: Option<MediaHandle>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            submitter,
            category,
            description,
            location,
            media_handle,
            status: ReportStatus::Pending,
            corroborators: Vec::new(),
            corroboration_count: 0,
            created_at,
            verified_at: None,
            resolved_at: None,
            resolution: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == ReportStatus::Pending
    }

    pub fn has_corroborated(&self, principal: &PrincipalId) -> bool {
        self.corroborators.contains(principal)
    }

    /// Whether an administrator forced the report to `verified`.
    pub fn admin_overridden(&self) -> bool {
        matches!(self.resolution, Some(Resolution::AdminOverride { .. }))
    }
}
