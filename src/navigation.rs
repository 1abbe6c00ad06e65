use crate::models::{Icon, NavigationItem, Role};

/// NavigationEntry
///
/// A single navigable destination. The catalog is the one source of truth for both the
/// side panel (what is shown) and the route guard (what is enforced).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationEntry {
    pub label: &'static str,
    pub icon: Icon,
    pub path: &'static str,
    pub allowed_roles: &'static [Role],
}

impl NavigationEntry {
    pub fn allows(&self, role: Role) -> bool {
        self.allowed_roles.contains(&role)
    }

    /// matches
    ///
    /// Exact or segment-prefix match against an already normalized path:
    /// `/users` matches `/users` and `/users/42`, never `/usersettings`.
    pub fn matches(&self, path: &str) -> bool {
        match path.strip_prefix(self.path) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    pub fn to_item(&self) -> NavigationItem {
        NavigationItem {
            label: self.label.to_string(),
            icon: self.icon,
            path: self.path.to_string(),
        }
    }
}

const ALL: &[Role] = &[Role::Admin, Role::Instructor, Role::Student];
const ADMIN: &[Role] = &[Role::Admin];
const STAFF: &[Role] = &[Role::Admin, Role::Instructor];

const fn entry(
    label: &'static str,
    icon: Icon,
    path: &'static str,
    allowed_roles: &'static [Role],
) -> NavigationEntry {
    NavigationEntry { label, icon, path, allowed_roles }
}

/// The release catalog, in side-panel order.
#[rustfmt::skip]
pub static STANDARD_CATALOG: &[NavigationEntry] = &[
    entry("Dashboard",     Icon::Home,           "/admin",         ADMIN),
    entry("Dashboard",     Icon::Home,           "/instructor",    &[Role::Instructor]),
    entry("Dashboard",     Icon::Home,           "/student",       &[Role::Student]),
    entry("Users",         Icon::Users,          "/users",         ADMIN),
    entry("Courses",       Icon::Book,           "/courses",       ADMIN),
    entry("Disciplines",   Icon::Layers,         "/disciplines",   ADMIN),
    entry("Classes",       Icon::School,         "/classes",       STAFF),
    entry("Students",      Icon::GraduationCap,  "/students",      STAFF),
    entry("Assessments",   Icon::ClipboardCheck, "/assessments",   STAFF),
    entry("My Grades",     Icon::Award,          "/grades",        &[Role::Student]),
    entry("Calendar",      Icon::Calendar,       "/calendar",      ALL),
    entry("Curriculum",    Icon::Map,            "/curriculum",    ALL),
    entry("Messages",      Icon::Mail,           "/messages",      ALL),
    entry("Announcements", Icon::Megaphone,      "/announcements", STAFF),
    entry("Site Content",  Icon::PenSquare,      "/cms",           ADMIN),
    entry("Contacts",      Icon::Inbox,          "/contacts",      ADMIN),
    entry("Reports",       Icon::FileText,       "/reports",       ADMIN),
];

/// Paths any authenticated role may open. Matched exactly, never as a prefix.
pub static ROLE_AGNOSTIC_PATHS: &[&str] = &["/", "/profile", "/navigation", "/shell/toggle"];

/// CatalogError
///
/// Static catalog invariants, checked once when the application state is assembled.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("navigation entry `{0}` has no allowed roles")]
    NoAllowedRoles(&'static str),
    #[error("path `{path}` appears twice in the {role} navigation")]
    DuplicatePath { path: &'static str, role: Role },
}

/// Catalog
///
/// The total, ordered set of navigation entries plus the role-agnostic paths.
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Vec<NavigationEntry>,
    role_agnostic: Vec<&'static str>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            entries: STANDARD_CATALOG.to_vec(),
            role_agnostic: ROLE_AGNOSTIC_PATHS.to_vec(),
        }
    }
}

impl Catalog {
    /// new
    ///
    /// Builds a catalog and validates its invariants: every entry allows at least one
    /// role, and no path shows up twice in any role's filtered list.
    pub fn new(
        entries: Vec<NavigationEntry>,
        role_agnostic: Vec<&'static str>,
    ) -> Result<Self, CatalogError> {
        for entry in &entries {
            if entry.allowed_roles.is_empty() {
                return Err(CatalogError::NoAllowedRoles(entry.path));
            }
        }
        for role in Role::ALL {
            let mut seen: Vec<&str> = Vec::new();
            for entry in entries.iter().filter(|e| e.allows(role)) {
                if seen.contains(&entry.path) {
                    return Err(CatalogError::DuplicatePath { path: entry.path, role });
                }
                seen.push(entry.path);
            }
        }
        Ok(Self { entries, role_agnostic })
    }

    pub fn entries(&self) -> &[NavigationEntry] {
        &self.entries
    }

    /// entries_for
    ///
    /// The navigation model for a known role: a stable filter over catalog order.
    pub fn entries_for(&self, role: Role) -> Vec<&NavigationEntry> {
        self.entries.iter().filter(|entry| entry.allows(role)).collect()
    }

    /// navigation_model
    ///
    /// Same as `entries_for`, taking the role as it arrives from the outside world.
    /// An unrecognized role yields an empty list.
    pub fn navigation_model(&self, role: &str) -> Vec<&NavigationEntry> {
        match role.parse::<Role>() {
            Ok(role) => self.entries_for(role),
            Err(e) => {
                tracing::warn!("navigation requested for {e}; returning no entries");
                Vec::new()
            }
        }
    }

    pub fn items_for(&self, role: Role) -> Vec<NavigationItem> {
        self.entries_for(role).into_iter().map(NavigationEntry::to_item).collect()
    }

    pub fn is_role_agnostic(&self, path: &str) -> bool {
        self.role_agnostic.iter().any(|p| *p == path)
    }

    /// First entry in catalog order that both matches the path and allows the role.
    pub fn entry_for(&self, role: Role, path: &str) -> Option<&NavigationEntry> {
        self.entries
            .iter()
            .find(|entry| entry.allows(role) && entry.matches(path))
    }
}

/// normalize_path
///
/// Reduces a requested location to the form the catalog is matched against: query and
/// fragment dropped, trailing slashes removed, leading slash enforced. Paths containing
/// `.` or `..` segments return `None` and are never authorized.
pub fn normalize_path(raw: &str) -> Option<String> {
    let path = raw.split(['?', '#']).next().unwrap_or_default();
    let mut segments = Vec::new();
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        if segment == "." || segment == ".." {
            return None;
        }
        segments.push(segment);
    }
    Some(format!("/{}", segments.join("/")))
}
