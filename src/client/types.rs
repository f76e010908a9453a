//! Data types returned by the users, meetings and reports endpoints.
//!
//! Only the fields the harness reads are modelled; unknown fields are ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    /// 1 basic, 2 licensed, 4 unassigned without meetings basic, 99 none.
    #[serde(rename = "type", default)]
    pub user_type: i32,
    pub account_id: Option<String>,
    pub role_name: Option<String>,
    pub status: Option<String>,
    pub timezone: Option<String>,
}

impl User {
    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        let name = name.trim();
        if name.is_empty() {
            self.email.clone()
        } else {
            name.to_string()
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PermissionsResponse {
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserStatus {
    Active,
    Inactive,
    Pending,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Pending => "pending",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meeting {
    pub id: u64,
    pub uuid: Option<String>,
    #[serde(default)]
    pub topic: String,
    /// 1 instant, 2 scheduled, 3 recurring without fixed time, 8 recurring with fixed time.
    #[serde(rename = "type", default)]
    pub meeting_type: i32,
    pub start_time: Option<DateTime<Utc>>,
    pub duration: Option<i64>,
    pub timezone: Option<String>,
    pub join_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeetingListType {
    Scheduled,
    Live,
    Upcoming,
    PreviousMeetings,
}

impl MeetingListType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Live => "live",
            Self::Upcoming => "upcoming",
            Self::PreviousMeetings => "previous_meetings",
        }
    }
}

/// A past meeting as listed by the usage reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMeeting {
    pub uuid: String,
    pub id: u64,
    #[serde(default)]
    pub topic: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration: Option<i64>,
    pub participants_count: Option<i64>,
    pub total_minutes: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    pub user_email: Option<String>,
    pub join_time: Option<DateTime<Utc>>,
    pub leave_time: Option<DateTime<Utc>>,
    pub duration: Option<i64>,
}
