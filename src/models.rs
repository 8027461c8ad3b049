use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{AppError, Result};

pub const DEFAULT_CYCLE_LENGTH: i32 = 28;
pub const DEFAULT_AGE: i32 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowIntensity {
    Light,
    Normal,
    Heavy,
    None,
}

impl FlowIntensity {
    /// Tally order; earlier entries win ties when picking the typical flow.
    pub const TALLIED: [FlowIntensity; 3] =
        [FlowIntensity::Light, FlowIntensity::Normal, FlowIntensity::Heavy];

    pub fn as_str(&self) -> &'static str {
        match self {
            FlowIntensity::Light => "Light",
            FlowIntensity::Normal => "Normal",
            FlowIntensity::Heavy => "Heavy",
            FlowIntensity::None => "None",
        }
    }
}

impl fmt::Display for FlowIntensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlowIntensity {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Light" => Ok(FlowIntensity::Light),
            "Normal" => Ok(FlowIntensity::Normal),
            "Heavy" => Ok(FlowIntensity::Heavy),
            "None" => Ok(FlowIntensity::None),
            other => Err(AppError::Validation(format!("Unknown flow intensity: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PainLevel {
    Low,
    Medium,
    High,
    None,
}

impl PainLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PainLevel::Low => "Low",
            PainLevel::Medium => "Medium",
            PainLevel::High => "High",
            PainLevel::None => "None",
        }
    }
}

impl fmt::Display for PainLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PainLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Low" => Ok(PainLevel::Low),
            "Medium" => Ok(PainLevel::Medium),
            "High" => Ok(PainLevel::High),
            "None" => Ok(PainLevel::None),
            other => Err(AppError::Validation(format!("Unknown pain level: {other}"))),
        }
    }
}

/// One logged cycle, or a missed/pregnant marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub duration: i32,
    pub cycle_length: i32,
    pub flow_intensity: FlowIntensity,
    pub pain_level: PainLevel,
    pub symptoms: Vec<String>,
    pub is_missed: bool,
    pub is_pregnant: bool,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

/// A validated record that has not been persisted yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCycleRecord {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub duration: i32,
    pub cycle_length: i32,
    pub flow_intensity: FlowIntensity,
    pub pain_level: PainLevel,
    pub symptoms: Vec<String>,
    pub is_missed: bool,
    pub is_pregnant: bool,
    pub notes: String,
}

impl NewCycleRecord {
    pub fn into_record(self, id: Uuid, user_id: Uuid, created_at: DateTime<Utc>) -> CycleRecord {
        CycleRecord {
            id,
            user_id,
            start_date: self.start_date,
            end_date: self.end_date,
            duration: self.duration,
            cycle_length: self.cycle_length,
            flow_intensity: self.flow_intensity,
            pain_level: self.pain_level,
            symptoms: self.symptoms,
            is_missed: self.is_missed,
            is_pregnant: self.is_pregnant,
            notes: self.notes,
            created_at,
        }
    }
}

/// Log entry as submitted by the client form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCycleLog {
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub flow_intensity: Option<FlowIntensity>,
    pub pain_level: Option<PainLevel>,
    #[serde(default)]
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub is_missed: bool,
    #[serde(default)]
    pub is_pregnant: bool,
    #[serde(default)]
    pub notes: String,
}

impl NewCycleLog {
    /// Validate the submission against `today` and fill in the derived fields.
    ///
    /// `previous_start` is the start of the closest earlier record, if any;
    /// without one the cycle length falls back to `default_cycle_length`.
    pub fn normalize(
        self,
        today: NaiveDate,
        previous_start: Option<NaiveDate>,
        default_cycle_length: i32,
    ) -> Result<NewCycleRecord> {
        let is_missed = self.is_missed || self.is_pregnant;
        let end_date = if is_missed {
            self.start_date
        } else {
            self.end_date.unwrap_or(self.start_date)
        };

        if self.start_date > today || end_date > today {
            return Err(AppError::Validation(
                "You cannot log a period for a future date".into(),
            ));
        }
        if end_date < self.start_date {
            return Err(AppError::Validation(
                "End date must not be before start date".into(),
            ));
        }

        let (duration, flow_intensity, pain_level) = if is_missed {
            (0, FlowIntensity::None, PainLevel::None)
        } else {
            let flow = self.flow_intensity.unwrap_or(FlowIntensity::Normal);
            let pain = self.pain_level.unwrap_or(PainLevel::Low);
            if flow == FlowIntensity::None || pain == PainLevel::None {
                return Err(AppError::Validation(
                    "Flow intensity and pain level are required for a logged period".into(),
                ));
            }
            let days = (end_date - self.start_date).num_days() + 1;
            (days as i32, flow, pain)
        };

        let cycle_length = previous_start
            .map(|prev| (self.start_date - prev).num_days() as i32)
            .unwrap_or(default_cycle_length);

        Ok(NewCycleRecord {
            start_date: self.start_date,
            end_date,
            duration,
            cycle_length,
            flow_intensity,
            pain_level,
            symptoms: normalize_symptoms(self.symptoms),
            is_missed,
            is_pregnant: self.is_pregnant,
            notes: self.notes.trim().to_string(),
        })
    }
}

/// Symptoms are a set: trimmed, de-duplicated and kept in sorted order.
pub fn normalize_symptoms(symptoms: Vec<String>) -> Vec<String> {
    symptoms
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Latest start date strictly before `start` among `records`.
pub fn previous_start(records: &[CycleRecord], start: NaiveDate) -> Option<NaiveDate> {
    records
        .iter()
        .map(|r| r.start_date)
        .filter(|d| *d < start)
        .max()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub age: i32,
    pub average_cycle_length: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            age: DEFAULT_AGE,
            average_cycle_length: DEFAULT_CYCLE_LENGTH,
            location: None,
        }
    }
}

/// Fields a user may edit on their own profile.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub age: Option<i32>,
    pub location: Option<String>,
}

impl ProfileUpdate {
    pub fn apply(self, profile: &mut UserProfile) -> Result<()> {
        if let Some(age) = self.age {
            if age <= 0 {
                return Err(AppError::Validation("Age must be a positive number".into()));
            }
            profile.age = age;
        }
        if let Some(location) = self.location {
            let location = location.trim();
            profile.location = (!location.is_empty()).then(|| location.to_string());
        }
        Ok(())
    }
}

/// Public view of an account.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
}
