use super::*;

fn stored(token: &str, user_id: &str) -> StoredCredential {
    StoredCredential { token: token.to_owned(), user_id: user_id.to_owned() }
}

/// Per-test scratch path under the system temp dir.
fn scratch_path(name: &str) -> PathBuf {
    std::env::temp_dir()
        .join(format!("milaverse-credential-test-{}", std::process::id()))
        .join(name)
}

// =============================================================================
// Credential::parse
// =============================================================================

#[test]
fn parse_accepts_numeric_subject() {
    let cred = Credential::parse(&stored("abc", "42")).unwrap();
    assert_eq!(cred.token(), "abc");
    assert_eq!(cred.subject(), SubjectId(42));
}

#[test]
fn parse_trims_fields() {
    let cred = Credential::parse(&stored("  abc \n", " 7 ")).unwrap();
    assert_eq!(cred.token(), "abc");
    assert_eq!(cred.subject(), SubjectId(7));
}

#[test]
fn parse_rejects_empty_token() {
    assert_eq!(Credential::parse(&stored("", "42")), Err(CredentialError::EmptyToken));
    assert_eq!(Credential::parse(&stored("   ", "42")), Err(CredentialError::EmptyToken));
}

#[test]
fn parse_rejects_non_numeric_subject() {
    assert_eq!(
        Credential::parse(&stored("abc", "acme")),
        Err(CredentialError::InvalidSubject("acme".to_owned()))
    );
}

#[test]
fn parse_rejects_negative_subject() {
    assert!(matches!(
        Credential::parse(&stored("abc", "-1")),
        Err(CredentialError::InvalidSubject(_))
    ));
}

#[test]
fn parse_rejects_empty_subject() {
    assert!(matches!(
        Credential::parse(&stored("abc", "")),
        Err(CredentialError::InvalidSubject(_))
    ));
}

#[test]
fn debug_redacts_token() {
    let cred = Credential::new("super-secret", SubjectId(1));
    let rendered = format!("{cred:?}");
    assert!(!rendered.contains("super-secret"));
    assert!(rendered.contains("redacted"));
}

#[test]
fn to_stored_round_trips_subject_as_string() {
    let cred = Credential::new("abc", SubjectId(42));
    assert_eq!(cred.to_stored(), stored("abc", "42"));
}

#[test]
fn stored_credential_uses_user_id_camel_case() {
    let json = serde_json::to_value(stored("abc", "42")).unwrap();
    assert_eq!(json, serde_json::json!({ "token": "abc", "userId": "42" }));
}

// =============================================================================
// MemoryCredentialStore
// =============================================================================

#[test]
fn memory_store_starts_empty() {
    let store = MemoryCredentialStore::new();
    assert_eq!(store.get().unwrap(), None);
}

#[test]
fn memory_store_set_get_clear() {
    let store = MemoryCredentialStore::new();
    store.set(&Credential::new("abc", SubjectId(42))).unwrap();
    assert_eq!(store.get().unwrap(), Some(stored("abc", "42")));

    store.clear().unwrap();
    assert_eq!(store.get().unwrap(), None);
}

#[test]
fn memory_store_with_stored_keeps_malformed_contents() {
    let store = MemoryCredentialStore::with_stored(stored("abc", "not-a-number"));
    assert_eq!(store.get().unwrap(), Some(stored("abc", "not-a-number")));
}

// =============================================================================
// FileCredentialStore
// =============================================================================

#[test]
fn file_store_missing_file_is_empty() {
    let store = FileCredentialStore::new(scratch_path("missing/credential.json"));
    assert_eq!(store.get().unwrap(), None);
}

#[test]
fn file_store_set_creates_parent_dirs_and_persists() {
    let path = scratch_path("persist/nested/credential.json");
    let store = FileCredentialStore::new(&path);
    assert_eq!(store.path(), path.as_path());
    store.clear().unwrap();

    store.set(&Credential::new("abc", SubjectId(42))).unwrap();
    assert!(path.exists());

    let reopened = FileCredentialStore::new(&path);
    assert_eq!(reopened.get().unwrap(), Some(stored("abc", "42")));

    reopened.clear().unwrap();
    assert_eq!(reopened.get().unwrap(), None);
    assert!(!path.exists());
}

#[test]
fn file_store_clear_missing_file_succeeds() {
    let store = FileCredentialStore::new(scratch_path("clear-missing/credential.json"));
    store.clear().unwrap();
}

#[test]
fn file_store_corrupt_contents_error() {
    let path = scratch_path("corrupt/credential.json");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "{not json").unwrap();

    let store = FileCredentialStore::new(&path);
    assert!(matches!(store.get(), Err(StoreError::Corrupt(_))));
    store.clear().unwrap();
}

#[test]
fn file_store_blank_file_is_empty() {
    let path = scratch_path("blank/credential.json");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "  \n").unwrap();

    let store = FileCredentialStore::new(&path);
    assert_eq!(store.get().unwrap(), None);
    store.clear().unwrap();
}
