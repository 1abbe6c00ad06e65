use academy_portal::{
    SessionContext,
    models::{IdentityDraft, Role},
    session::{
        DISPLAY_NAME_KEY, EXPIRES_AT_KEY, FileIdentityStore, IdentityStore,
        MemoryIdentityStore, ROLE_KEY, SessionError, SessionFields, SessionId, USER_ID_KEY,
    },
};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

fn draft(role: &str, name: Option<&str>, id: &str) -> IdentityDraft {
    IdentityDraft {
        id: Some(id.to_string()),
        role: Some(role.to_string()),
        display_name: name.map(str::to_string),
        expires_at: None,
    }
}

fn stored_record(expires_at: DateTime<Utc>) -> SessionFields {
    SessionFields::from([
        (ROLE_KEY.to_string(), "admin".to_string()),
        (DISPLAY_NAME_KEY.to_string(), "Ana".to_string()),
        (USER_ID_KEY.to_string(), "u-1".to_string()),
        (EXPIRES_AT_KEY.to_string(), expires_at.to_rfc3339()),
    ])
}

fn stored_expiry(store: &dyn IdentityStore, session: SessionId) -> DateTime<Utc> {
    let fields = store.load(session).unwrap().expect("record stored");
    DateTime::parse_from_rfc3339(&fields[EXPIRES_AT_KEY])
        .unwrap()
        .with_timezone(&Utc)
}

fn temp_store_path() -> std::path::PathBuf {
    std::env::temp_dir().join(format!("academy-portal-sessions-{}.json", uuid::Uuid::new_v4()))
}

#[test]
fn test_set_then_get_identity() {
    let sessions = SessionContext::in_memory();
    let session = SessionId::generate();

    let identity = sessions
        .set_identity(session, draft("admin", Some("Ana"), "u-1"))
        .unwrap();
    assert_eq!(identity.role, Role::Admin);

    let read = sessions.get_identity(session).expect("identity stored");
    assert_eq!(read, identity);
    assert_eq!(read.display_name, "Ana");
    assert_eq!(read.id, "u-1");
}

#[test]
fn test_missing_display_name_stores_nothing() {
    let sessions = SessionContext::in_memory();
    let session = SessionId::generate();

    let err = sessions
        .set_identity(session, draft("student", None, "u-2"))
        .unwrap_err();
    assert!(matches!(err, SessionError::MissingField(DISPLAY_NAME_KEY)));
    assert_eq!(sessions.get_identity(session), None);
}

#[test]
fn test_blank_fields_count_as_missing() {
    let sessions = SessionContext::in_memory();
    let session = SessionId::generate();

    assert!(sessions.set_identity(session, draft("student", Some("  "), "u-3")).is_err());
    assert!(sessions.set_identity(session, draft("student", Some("Bo"), "")).is_err());
    assert_eq!(sessions.get_identity(session), None);
}

#[test]
fn test_unknown_role_is_rejected_on_write() {
    let sessions = SessionContext::in_memory();
    let session = SessionId::generate();

    let err = sessions
        .set_identity(session, draft("superuser", Some("Eve"), "u-4"))
        .unwrap_err();
    assert!(matches!(err, SessionError::UnknownRole(_)));
    assert_eq!(sessions.get_identity(session), None);
}

#[test]
fn test_failed_write_keeps_previous_identity_whole() {
    let sessions = SessionContext::in_memory();
    let session = SessionId::generate();
    sessions
        .set_identity(session, draft("instructor", Some("Caio"), "u-5"))
        .unwrap();

    assert!(sessions.set_identity(session, draft("admin", None, "u-6")).is_err());

    let read = sessions.get_identity(session).unwrap();
    assert_eq!(read.role, Role::Instructor);
    assert_eq!(read.id, "u-5");
}

#[test]
fn test_partial_store_state_reads_as_absent() {
    let store = Arc::new(MemoryIdentityStore::new());
    let sessions = SessionContext::new(store.clone());
    let session = SessionId::generate();

    // Role present, display name missing: a torn record from some other writer.
    store
        .replace(
            session,
            SessionFields::from([
                (ROLE_KEY.to_string(), "admin".to_string()),
                (USER_ID_KEY.to_string(), "u-7".to_string()),
            ]),
        )
        .unwrap();
    assert_eq!(sessions.get_identity(session), None);
}

#[test]
fn test_malformed_role_in_store_reads_as_absent() {
    let store = Arc::new(MemoryIdentityStore::new());
    let sessions = SessionContext::new(store.clone());
    let session = SessionId::generate();

    store
        .replace(
            session,
            SessionFields::from([
                (ROLE_KEY.to_string(), "root".to_string()),
                (DISPLAY_NAME_KEY.to_string(), "Mallory".to_string()),
                (USER_ID_KEY.to_string(), "u-8".to_string()),
            ]),
        )
        .unwrap();
    assert_eq!(sessions.get_identity(session), None);
}

#[test]
fn test_record_without_expiry_reads_as_absent() {
    let store = Arc::new(MemoryIdentityStore::new());
    let sessions = SessionContext::new(store.clone());
    let session = SessionId::generate();

    let mut fields = stored_record(Utc::now() + Duration::hours(1));
    fields.remove(EXPIRES_AT_KEY);
    store.replace(session, fields.clone()).unwrap();
    assert_eq!(sessions.get_identity(session), None);

    fields.insert(EXPIRES_AT_KEY.to_string(), "tomorrow".to_string());
    store.replace(session, fields).unwrap();
    assert_eq!(sessions.get_identity(session), None);
}

#[test]
fn test_expired_memory_session_is_absent_and_removed() {
    let store = Arc::new(MemoryIdentityStore::new());
    let sessions = SessionContext::new(store.clone());
    let session = SessionId::generate();

    store
        .replace(session, stored_record(Utc::now() - Duration::seconds(1)))
        .unwrap();
    assert_eq!(sessions.get_identity(session), None);
    assert!(store.load(session).unwrap().is_none());
}

#[test]
fn test_expired_file_session_is_absent_and_removed() {
    let path = temp_store_path();
    let session = SessionId::generate();
    let live = SessionId::generate();
    {
        let store = FileIdentityStore::open(&path).unwrap();
        store
            .replace(session, stored_record(Utc::now() - Duration::minutes(5)))
            .unwrap();
        store
            .replace(live, stored_record(Utc::now() + Duration::minutes(5)))
            .unwrap();
    }

    let store = Arc::new(FileIdentityStore::open(&path).unwrap());
    let sessions = SessionContext::new(store.clone());
    assert_eq!(sessions.get_identity(session), None);
    assert!(sessions.get_identity(live).is_some());

    // The removal reached the file, not just memory.
    let reopened = FileIdentityStore::open(&path).unwrap();
    assert!(reopened.load(session).unwrap().is_none());
    assert!(reopened.load(live).unwrap().is_some());

    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_configured_ttl_sets_expiry() {
    let store = Arc::new(MemoryIdentityStore::new());
    let sessions = SessionContext::new(store.clone()).with_ttl(Duration::minutes(15));
    let session = SessionId::generate();

    sessions
        .set_identity(session, draft("student", Some("Duda"), "u-11"))
        .unwrap();
    let expires_at = stored_expiry(store.as_ref(), session);
    assert!(expires_at > Utc::now() + Duration::minutes(14));
    assert!(expires_at <= Utc::now() + Duration::minutes(15));
}

#[test]
fn test_earlier_draft_expiry_wins_over_ttl() {
    let store = Arc::new(MemoryIdentityStore::new());
    let sessions = SessionContext::new(store.clone());
    let session = SessionId::generate();
    let token_expiry = Utc::now() + Duration::minutes(10);

    let mut draft = draft("student", Some("Duda"), "u-12");
    draft.expires_at = Some(token_expiry);
    sessions.set_identity(session, draft).unwrap();

    let stored = stored_expiry(store.as_ref(), session);
    assert_eq!(stored.timestamp(), token_expiry.timestamp());
    assert!(sessions.get_identity(session).is_some());
}

#[test]
fn test_zero_ttl_session_expires_immediately() {
    let store = Arc::new(MemoryIdentityStore::new());
    let sessions = SessionContext::new(store.clone()).with_ttl(Duration::zero());
    let session = SessionId::generate();

    sessions
        .set_identity(session, draft("admin", Some("Ana"), "u-13"))
        .unwrap();
    assert_eq!(sessions.get_identity(session), None);
    assert!(store.load(session).unwrap().is_none());
}

#[test]
fn test_clear_identity() {
    let sessions = SessionContext::in_memory();
    let session = SessionId::generate();
    sessions
        .set_identity(session, draft("student", Some("Duda"), "u-9"))
        .unwrap();

    sessions.clear_identity(session).unwrap();
    assert_eq!(sessions.get_identity(session), None);
    // Clearing twice is harmless.
    sessions.clear_identity(session).unwrap();
}

#[test]
fn test_sessions_are_isolated() {
    let sessions = SessionContext::in_memory();
    let a = SessionId::generate();
    let b = SessionId::generate();
    sessions.set_identity(a, draft("admin", Some("Ana"), "u-1")).unwrap();

    assert!(sessions.get_identity(a).is_some());
    assert_eq!(sessions.get_identity(b), None);
}

#[test]
fn test_file_store_survives_reopen() {
    let path = temp_store_path();
    let session = SessionId::generate();
    {
        let sessions = SessionContext::new(Arc::new(FileIdentityStore::open(&path).unwrap()));
        sessions
            .set_identity(session, draft("instructor", Some("Caio"), "u-10"))
            .unwrap();
    }

    let reopened = SessionContext::new(Arc::new(FileIdentityStore::open(&path).unwrap()));
    let identity = reopened.get_identity(session).expect("identity persisted");
    assert_eq!(identity.role, Role::Instructor);
    assert_eq!(identity.display_name, "Caio");

    reopened.clear_identity(session).unwrap();
    let after_clear = SessionContext::new(Arc::new(FileIdentityStore::open(&path).unwrap()));
    assert_eq!(after_clear.get_identity(session), None);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_file_store_opens_missing_file_empty() {
    let path = temp_store_path();
    let store = FileIdentityStore::open(&path).unwrap();
    assert!(store.load(SessionId::generate()).unwrap().is_none());
    assert!(!path.exists());
}

#[test]
fn test_session_id_parsing() {
    let session = SessionId::generate();
    let parsed: SessionId = session.to_string().parse().unwrap();
    assert_eq!(parsed, session);
    assert!("not-a-session".parse::<SessionId>().is_err());
}
