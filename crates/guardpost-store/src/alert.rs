//! Alert model and query types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

use guardpost_core::{DeviceReport, LabelScore};

/// A persisted policy violation with full context.
///
/// Immutable once written; removed only by an explicit delete.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Alert {
    /// Store-generated monotonic identifier
    pub id: i64,

    /// The page under inspection
    pub url: String,

    /// Flagged text, capped at [`MAX_TEXT_CHARS`] characters
    pub detected_text: String,

    /// Denormalized device fields for filtering and display
    pub ip_address: String,
    pub browser_info: String,
    pub platform: String,
    pub screen_resolution: String,
    pub timezone: String,
    pub language: String,

    /// Detection time (client-supplied when parseable, else receipt time)
    pub detected_at: DateTime<Utc>,

    /// Full device report as received
    pub device_info: Json<DeviceReport>,

    /// Classifier output, verbatim and non-empty
    pub scores: Json<Vec<LabelScore>>,

    /// Store-assigned write time
    pub created_at: DateTime<Utc>,
}

/// Data for one alert to be written
#[derive(Debug, Clone)]
pub struct NewAlert {
    pub url: String,
    pub detected_text: String,
    pub device: DeviceReport,
    pub scores: Vec<LabelScore>,
    pub detected_at: DateTime<Utc>,
}

/// Optional restriction on a listing
#[derive(Debug, Clone)]
pub enum AlertFilter {
    /// Exact match on the stored public IP
    IpEquals(String),

    /// Alerts detected on the given calendar day (UTC)
    OnDate(NaiveDate),

    /// Substring match on the URL
    UrlContains(String),
}

/// Paginated listing request
#[derive(Debug, Clone)]
pub struct ListQuery {
    pub limit: i64,
    pub offset: i64,
    pub filter: Option<AlertFilter>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
            filter: None,
        }
    }
}

impl ListQuery {
    /// Listing with no filter
    pub fn page(limit: i64, offset: i64) -> Self {
        Self {
            limit,
            offset,
            filter: None,
        }
    }

    /// Restrict the listing
    pub fn with_filter(mut self, filter: AlertFilter) -> Self {
        self.filter = Some(filter);
        self
    }
}

/// One page of alerts plus the total count matching the filter
#[derive(Debug, Clone, Serialize)]
pub struct AlertPage {
    pub items: Vec<Alert>,
    pub total: i64,
}

/// One group in an aggregate ranking
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct GroupCount {
    pub key: String,
    pub count: i64,
}

/// Alert count for one calendar day
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DayCount {
    pub day: String,
    pub count: i64,
}

/// Aggregate view over all alerts
#[derive(Debug, Clone, Serialize)]
pub struct AlertStats {
    pub total: i64,
    pub top_ips: Vec<GroupCount>,
    pub top_urls: Vec<GroupCount>,
    pub by_platform: Vec<GroupCount>,
    pub last_seven_days: Vec<DayCount>,
}
