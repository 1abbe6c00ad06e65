use crate::{
    models::Role,
    navigation::Catalog,
    repository::{Collection, FieldFilter},
};

/// Screen
///
/// One row of the route table: the CRUD screen mounted at `path`. Whether a role may
/// open it is decided by the navigation catalog; the table only says what the screen
/// reads and who may write through it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    pub path: &'static str,
    pub collection: Collection,
    /// Non-admins only see records whose `owner_field` equals their identity id.
    pub owner_field: Option<&'static str>,
    /// Stamped with the creator's identity id on create.
    pub author_field: Option<&'static str>,
    /// Roles allowed to create, update and delete. Empty means read-only.
    pub editors: &'static [Role],
}

const ALL: &[Role] = &[Role::Admin, Role::Instructor, Role::Student];
const ADMIN: &[Role] = &[Role::Admin];
const STAFF: &[Role] = &[Role::Admin, Role::Instructor];

const fn screen(
    path: &'static str,
    collection: Collection,
    owner_field: Option<&'static str>,
    author_field: Option<&'static str>,
    editors: &'static [Role],
) -> Screen {
    Screen { path, collection, owner_field, author_field, editors }
}

// path, collection, owner scope, author stamp, editors
#[rustfmt::skip]
pub static SCREENS: &[Screen] = &[
    screen("/users",         Collection::Profiles,      None,                 None,              ADMIN),
    screen("/courses",       Collection::Courses,       None,                 None,              ADMIN),
    screen("/disciplines",   Collection::Disciplines,   None,                 None,              ADMIN),
    screen("/classes",       Collection::Classes,       None,                 None,              STAFF),
    screen("/students",      Collection::Students,      None,                 None,              STAFF),
    screen("/assessments",   Collection::Assessments,   None,                 None,              STAFF),
    screen("/grades",        Collection::Assessments,   Some("student_id"),   None,              &[]),
    screen("/calendar",      Collection::Events,        None,                 None,              STAFF),
    screen("/curriculum",    Collection::Curricula,     None,                 None,              ADMIN),
    screen("/messages",      Collection::Messages,      Some("recipient_id"), Some("sender_id"), ALL),
    screen("/announcements", Collection::Announcements, None,                 Some("author_id"), STAFF),
    screen("/cms",           Collection::CmsContent,    None,                 None,              ADMIN),
    screen("/contacts",      Collection::Contacts,      None,                 None,              ADMIN),
];

impl Screen {
    pub fn can_edit(&self, role: Role) -> bool {
        self.editors.contains(&role)
    }

    /// The filter a role's reads go through on this screen, if any.
    pub fn scope_for(&self, role: Role, identity_id: &str) -> Option<FieldFilter> {
        match (self.owner_field, role) {
            (Some(_), Role::Admin) | (None, _) => None,
            (Some(field), _) => Some(FieldFilter {
                field,
                value: identity_id.to_string(),
            }),
        }
    }

    /// Fields a role may not rewrite on update. Ownership stays where create put it,
    /// except for admins.
    pub fn locked_fields(&self, role: Role) -> impl Iterator<Item = &'static str> {
        let locked = match role {
            Role::Admin => [None, None],
            _ => [self.owner_field, self.author_field],
        };
        locked.into_iter().flatten()
    }
}

/// Screens that appear in the role's navigation, in catalog order.
pub fn visible_screens(catalog: &Catalog, role: Role) -> Vec<&'static Screen> {
    catalog
        .entries_for(role)
        .into_iter()
        .filter_map(|entry| SCREENS.iter().find(|screen| screen.path == entry.path))
        .collect()
}
