use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use std::{fmt, str::FromStr};
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Roles & Identity ---

/// Role
///
/// The three entitlement levels known to the portal. Any other value found in a session
/// store or a profile row is rejected through `FromStr`, which is how unknown roles fail closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    Admin,
    Instructor,
    Student,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Instructor, Role::Student];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Instructor => "instructor",
            Role::Student => "student",
        }
    }

    /// landing_path
    ///
    /// The dashboard a role lands on after login, and where the route guard sends it
    /// when it asks for a screen it is not entitled to.
    pub fn landing_path(&self) -> &'static str {
        match self {
            Role::Admin => "/admin",
            Role::Instructor => "/instructor",
            Role::Student => "/student",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a role string is not one of the three known values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized role `{0}`")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    // Exact match only: "Admin" or " admin" are not admins.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "instructor" => Ok(Role::Instructor),
            "student" => Ok(Role::Student),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Identity
///
/// The authenticated user as held for the lifetime of a session. The `id` is opaque to
/// the navigation core; it is only used to scope owner-filtered screens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Identity {
    pub id: String,
    pub role: Role,
    pub display_name: String,
}

/// IdentityDraft
///
/// Loose input to `SessionContext::set_identity`. Every field is optional so the write
/// path itself can reject an incomplete identity instead of trusting its callers.
#[derive(Debug, Clone, Default)]
pub struct IdentityDraft {
    pub id: Option<String>,
    pub role: Option<String>,
    pub display_name: Option<String>,
    /// Latest instant the session may live to, e.g. the login token's own expiry.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Profile
///
/// A row of the `profiles` collection as read at login time. The role stays a raw
/// string here; it is only trusted after it parses into a `Role`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default, ToSchema)]
pub struct Profile {
    pub id: Uuid,
    pub display_name: String,
    pub role: String,
}

// --- Request Payloads ---

/// LoginRequest
///
/// Body of `POST /login`. The token is issued by the external auth provider.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    #[serde(default)]
    pub token: Option<String>,
}

// --- Navigation & Shell Schemas (Output) ---

/// Icon
///
/// Symbolic icon reference; the frontend maps each name onto its icon set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "kebab-case")]
#[ts(export)]
pub enum Icon {
    Home,
    Users,
    Book,
    Layers,
    School,
    GraduationCap,
    ClipboardCheck,
    Award,
    Calendar,
    Map,
    Mail,
    Megaphone,
    PenSquare,
    Inbox,
    FileText,
}

/// NavigationItem
///
/// Serializable form of a catalog entry, as sent to the side panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct NavigationItem {
    pub label: String,
    pub icon: Icon,
    pub path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum NoticeLevel {
    Info,
    Warning,
}

/// Notice
///
/// A short, non-blocking message shown by the shell (a toast in the frontend).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn access_denied(path: &str) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: format!("You do not have access to {path}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ShellHeader {
    pub brand: String,
    pub display_name: String,
    pub role: Role,
    pub home: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SidePanel {
    pub collapsed: bool,
    /// Empty means "no navigation" for this role, never an error.
    pub entries: Vec<NavigationItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ShellFooter {
    pub text: String,
}

/// ScreenView
///
/// The content a screen produced, before the shell wraps it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ScreenView {
    pub path: String,
    pub title: String,
    #[schema(value_type = Object)]
    pub data: Value,
}

/// ShellView
///
/// Every guarded screen answers with this envelope: persistent chrome around the screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ShellView {
    pub header: ShellHeader,
    pub side_panel: SidePanel,
    pub footer: ShellFooter,
    pub notices: Vec<Notice>,
    pub screen: ScreenView,
}

/// SessionResponse
///
/// Output of a successful login.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub identity: Identity,
    pub landing_path: String,
    pub navigation: Vec<NavigationItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ShellToggleResponse {
    pub collapsed: bool,
}

/// ReportLink
///
/// One printable report offered on the reports screen.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ReportLink {
    pub title: String,
    pub collection: String,
    pub print_path: String,
}
