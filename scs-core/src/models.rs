//! Data model for incidents, guidance assignments and incident media.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new<S: Into<String>>(id: S) -> Self {
                Self(id.into())
            }

            /// Generate a new random id.
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Ids compare in normalized form: trimmed, lower-case.
            pub fn matches(&self, other: &str) -> bool {
                normalize_id(&self.0) == normalize_id(other)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

record_id!(
    /// Id of an [`Incident`].
    IncidentId
);
record_id!(
    /// Id of an [`IncidentGuidance`]; the API calls this the mission id.
    GuidanceId
);
record_id!(
    /// Id of an [`IncidentGuidanceStep`].
    StepId
);
record_id!(UserId);
record_id!(TemplateId);
record_id!(AlarmId);
record_id!(MediaId);

/// Canonical textual form used when comparing ids from different sources.
pub fn normalize_id(id: &str) -> String {
    id.trim().to_ascii_lowercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    New,
    InProgress,
    Resolved,
}

impl IncidentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentStatus::New => "new",
            IncidentStatus::InProgress => "in_progress",
            IncidentStatus::Resolved => "resolved",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "new" => Some(IncidentStatus::New),
            "in_progress" => Some(IncidentStatus::InProgress),
            "resolved" => Some(IncidentStatus::Resolved),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "low" => Some(Severity::Low),
            "medium" => Some(Severity::Medium),
            "high" => Some(Severity::High),
            _ => None,
        }
    }
}

/// A security event under response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub id: IncidentId,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alarm_id: Option<AlarmId>,
    pub status: IncidentStatus,
    pub severity: Severity,
    pub location: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Incident {
    pub fn new(id: impl Into<IncidentId>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            alarm_id: None,
            status: IncidentStatus::New,
            severity: Severity::Medium,
            location: String::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// One step of an incident guidance checklist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentGuidanceStep {
    pub id: StepId,
    pub incident_guidance_id: GuidanceId,
    pub step_number: i64,
    pub title: String,
    pub description: String,
    pub is_completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IncidentGuidanceStep {
    pub fn new(
        id: impl Into<StepId>,
        guidance: impl Into<GuidanceId>,
        step_number: i64,
        title: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            incident_guidance_id: guidance.into(),
            step_number,
            title: title.into(),
            description: String::new(),
            is_completed: false,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Assignment of a guidance template to an incident, owning its steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentGuidance {
    pub id: GuidanceId,
    pub incident_id: IncidentId,
    pub guidance_template_id: TemplateId,
    pub assigner_id: Option<UserId>,
    pub assignee_id: Option<UserId>,
    pub incident_guidance_steps: Vec<IncidentGuidanceStep>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IncidentGuidance {
    pub fn new(
        id: impl Into<GuidanceId>,
        incident: impl Into<IncidentId>,
        template: impl Into<TemplateId>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            incident_id: incident.into(),
            guidance_template_id: template.into(),
            assigner_id: None,
            assignee_id: None,
            incident_guidance_steps: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn assigned(mut self, assigner: impl Into<UserId>, assignee: impl Into<UserId>) -> Self {
        self.assigner_id = Some(assigner.into());
        self.assignee_id = Some(assignee.into());
        self
    }

    /// Append a step owned by this guidance.
    pub fn with_step(mut self, id: impl Into<StepId>, step_number: i64, title: &str) -> Self {
        let step = IncidentGuidanceStep::new(id, self.id.clone(), step_number, title);
        self.incident_guidance_steps.push(step);
        self
    }

    pub fn is_fully_completed(&self) -> bool {
        !self.incident_guidance_steps.is_empty()
            && self.incident_guidance_steps.iter().all(|s| s.is_completed)
    }
}

/// Coarse media taxonomy stored with each attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Other,
}

impl MediaKind {
    /// Only `image/jpeg`, `image/png` and `video/mp4` get a named kind.
    pub fn classify(mime_type: &str) -> Self {
        match mime_type {
            "image/jpeg" | "image/png" => MediaKind::Image,
            "video/mp4" => MediaKind::Video,
            _ => MediaKind::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Other => "other",
        }
    }
}

/// A photo or video attached to an incident.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentMedia {
    pub id: MediaId,
    pub incident_id: IncidentId,
    pub media_type: MediaKind,
    pub file_url: String,
    pub file_size: i64,
    pub file_type: String,
    pub file_name: String,
    pub created_at: DateTime<Utc>,
}

/// A user record; roles and permissions are owned elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: String,
}

/// A file received from the transport, not yet validated.
#[derive(Debug, Clone)]
pub struct CandidateFile {
    pub name: String,
    pub declared_size: u64,
    pub content: Bytes,
}

impl CandidateFile {
    pub fn new(name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        let content = content.into();
        Self {
            name: name.into(),
            declared_size: content.len() as u64,
            content,
        }
    }

    pub fn with_declared_size(mut self, size: u64) -> Self {
        self.declared_size = size;
        self
    }
}

/// A file that passed media validation. `content` is fully buffered, so it
/// can be read again from the start by the upload path.
#[derive(Debug, Clone)]
pub struct ValidatedFile {
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    pub content: Bytes,
}
