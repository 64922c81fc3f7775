use crate::errors::Toast;
use crate::reminder::Notification;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const DEFAULT_GOAL: u32 = 2000;

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(u32),
    Text(String),
}

fn deserialize_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    match RawId::deserialize(deserializer)? {
        RawId::Number(id) => Ok(id),
        RawId::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid id {text:?}"))),
    }
}

macro_rules! id_type {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                deserialize_id(deserializer).map($name)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(ProfileId);
id_type!(ReminderId);

/// Smallest positive id not already taken.
pub fn smallest_available_id(taken: impl IntoIterator<Item = u32>) -> u32 {
    let mut taken: Vec<u32> = taken.into_iter().collect();
    taken.sort_unstable();
    taken.dedup();
    let mut candidate = 1;
    for id in taken {
        if id == candidate {
            candidate += 1;
        } else if id > candidate {
            break;
        }
    }
    candidate
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileIcon {
    #[serde(alias = "😮")]
    Sip,
    #[serde(alias = "🥛")]
    Glass,
    #[serde(alias = "☕️", alias = "☕")]
    Cup,
    #[serde(alias = "🧴")]
    Bottle,
    #[serde(alias = "🍺")]
    Pint,
    #[default]
    #[serde(other)]
    Generic,
}

impl ProfileIcon {
    pub const ALL: [ProfileIcon; 6] = [
        ProfileIcon::Sip,
        ProfileIcon::Glass,
        ProfileIcon::Cup,
        ProfileIcon::Bottle,
        ProfileIcon::Pint,
        ProfileIcon::Generic,
    ];

    pub fn emoji(self) -> &'static str {
        match self {
            ProfileIcon::Sip => "😮",
            ProfileIcon::Glass => "🥛",
            ProfileIcon::Cup => "☕️",
            ProfileIcon::Bottle => "🧴",
            ProfileIcon::Pint => "🍺",
            ProfileIcon::Generic => "💧",
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            ProfileIcon::Sip => "sip",
            ProfileIcon::Glass => "glass",
            ProfileIcon::Cup => "cup",
            ProfileIcon::Bottle => "bottle",
            ProfileIcon::Pint => "pint",
            ProfileIcon::Generic => "generic",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: ProfileId,
    #[serde(default, alias = "skin")]
    pub icon: ProfileIcon,
    pub label: String,
    #[serde(alias = "value")]
    pub amount: u32,
    #[serde(default)]
    pub use_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderRule {
    pub id: ReminderId,
    #[serde(alias = "qty")]
    pub threshold_amount: u32,
    #[serde(alias = "before")]
    pub deadline_minutes_since_midnight: u16,
}

fn default_goal() -> u32 {
    DEFAULT_GOAL
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameters {
    #[serde(default = "default_goal")]
    pub goal: u32,
    #[serde(default)]
    pub profiles: Vec<Profile>,
    #[serde(default, alias = "recall")]
    pub reminders: Vec<ReminderRule>,
}

impl Default for Parameters {
    fn default() -> Self {
        let profile = |id, icon, label: &str, amount| Profile {
            id: ProfileId(id),
            icon,
            label: label.to_string(),
            amount,
            use_count: 0,
        };
        let rule = |id, threshold_amount, deadline_minutes_since_midnight| ReminderRule {
            id: ReminderId(id),
            threshold_amount,
            deadline_minutes_since_midnight,
        };

        Self {
            goal: DEFAULT_GOAL,
            profiles: vec![
                profile(1, ProfileIcon::Sip, "Sip", 100),
                profile(2, ProfileIcon::Glass, "Glass", 250),
                profile(3, ProfileIcon::Cup, "Cup", 300),
                profile(4, ProfileIcon::Bottle, "Bottle", 800),
                profile(5, ProfileIcon::Pint, "Pint", 1500),
            ],
            reminders: vec![
                rule(1, 500, 570),
                rule(2, 1000, 720),
                rule(3, 1500, 930),
                rule(4, 2000, 1080),
            ],
        }
    }
}

impl Parameters {
    pub fn profile(&self, id: ProfileId) -> Option<&Profile> {
        self.profiles.iter().find(|profile| profile.id == id)
    }

    /// Goal used for level and debt math; a zero goal from a hand-edited
    /// blob is treated as the default.
    pub fn effective_goal(&self) -> u32 {
        if self.goal == 0 {
            DEFAULT_GOAL
        } else {
            self.goal
        }
    }

    pub fn sort_reminders(&mut self) {
        self.reminders
            .sort_by_key(|rule| rule.deadline_minutes_since_midnight);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeEvent {
    #[serde(default, alias = "id")]
    pub profile_id: Option<ProfileId>,
    #[serde(alias = "val")]
    pub amount: u32,
    #[serde(alias = "time", with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

/// Today's running total and its event log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ledger {
    pub day: NaiveDate,
    pub cumulative_intake: u32,
    pub history: Vec<IntakeEvent>,
}

impl Ledger {
    pub fn empty(day: NaiveDate) -> Self {
        Self {
            day,
            cumulative_intake: 0,
            history: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    #[serde(default)]
    pub total_consumed: u64,
    #[serde(default)]
    pub accumulated_debt: u64,
    pub install_date: NaiveDate,
    pub last_processed_day: NaiveDate,
    #[serde(default)]
    pub current_streak: u32,
    #[serde(default)]
    pub best_streak: u32,
    /// Consumption of each fully elapsed day, keyed `YYYY-MM-DD`.
    #[serde(default)]
    pub daily: BTreeMap<String, u32>,
}

impl Statistics {
    pub fn fresh(today: NaiveDate) -> Self {
        Self {
            total_consumed: 0,
            accumulated_debt: 0,
            install_date: today,
            last_processed_day: today,
            current_streak: 0,
            best_streak: 0,
            daily: BTreeMap::new(),
        }
    }
}

/// A form field that may arrive as a JSON number or as raw input text.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(i64),
    Text(String),
}

impl FieldValue {
    pub fn to_text(&self) -> String {
        match self {
            FieldValue::Number(value) => value.to_string(),
            FieldValue::Text(text) => text.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct IntakeRequest {
    #[serde(alias = "profileId")]
    pub profile_id: Option<ProfileId>,
    pub amount: Option<FieldValue>,
}

#[derive(Debug, Deserialize)]
pub struct GoalRequest {
    pub goal: Option<FieldValue>,
}

#[derive(Debug, Deserialize)]
pub struct NewProfileRequest {
    pub label: Option<String>,
    pub icon: Option<ProfileIcon>,
    pub amount: Option<FieldValue>,
}

#[derive(Debug, Deserialize)]
pub struct NewReminderRequest {
    pub amount: Option<FieldValue>,
    pub time: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GesturePhase {
    Start,
    Move,
    End,
}

#[derive(Debug, Deserialize)]
pub struct GestureRequest {
    pub phase: GesturePhase,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

#[derive(Debug, Deserialize)]
pub struct ViewportRequest {
    pub width: f64,
    pub height: f64,
    #[serde(default = "default_dpr")]
    pub dpr: f64,
}

fn default_dpr() -> f64 {
    1.0
}

/// One display refresh on the page, with the time since the previous one.
#[derive(Debug, Default, Deserialize)]
pub struct FrameRequest {
    #[serde(default, alias = "deltaMs")]
    pub delta_ms: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub icon: String,
    pub label: String,
    pub amount: u32,
    pub time: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TodayResponse {
    pub date: String,
    pub cumulative_intake: u32,
    pub goal: u32,
    pub percent: u32,
    pub history: Vec<HistoryEntry>,
}

#[derive(Debug, Serialize)]
pub struct WaveResponse {
    pub amplitude: f64,
    pub speed: f64,
}

/// Reply to settings edits: the toast to show and the parameters as stored.
#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    pub toast: Toast,
    pub parameters: Parameters,
}

#[derive(Debug, Serialize)]
pub struct NotificationView {
    pub id: u64,
    #[serde(flatten)]
    pub notification: Notification,
}

#[derive(Debug, Serialize)]
pub struct ReminderCheckResponse {
    pub notification: Option<NotificationView>,
    /// Notifications the page should close.
    pub closed: Vec<u64>,
}

#[derive(Debug, Serialize)]
pub struct DailyPoint {
    pub date: String,
    pub consumed: u32,
    pub goal_met: bool,
}

#[derive(Debug, Serialize)]
pub struct WeeklyPoint {
    pub week: String,
    pub start_date: String,
    pub end_date: String,
    pub consumed: u64,
}

#[derive(Debug, Serialize)]
pub struct WeeklyAveragePoint {
    pub week: String,
    pub days_counted: u8,
    pub avg_consumed: f64,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_consumed: u64,
    pub accumulated_debt: u64,
    pub install_date: String,
    pub days_since_install: i64,
    pub current_streak: u32,
    pub best_streak: u32,
    pub last_7_days: Vec<DailyPoint>,
    pub weekly_totals: Vec<WeeklyPoint>,
    pub weekly_averages: Vec<WeeklyAveragePoint>,
}
