use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use serde_json::{Value, json};

use backoffice_activity::{ActivityType, InMemoryActivityLog};
use backoffice_auth::{Permission, Principal};
use backoffice_core::{DomainError, DomainResult, GroupId, PermissionId, UserId};
use backoffice_users::guard::ACCESS_DENIED;
use backoffice_users::{
    Collaborators, Filter, GroupRef, HashingConfig, HydrationRequest, InMemoryUserStore, OperationResult, Payload,
    PasswordNotifier, PermissionRef, PersistenceHandler, RequestParams, UserRecord, UsersConfig, UsersController,
    UsersError,
};
use backoffice_users::persistence::{ListQuery, Page};

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<(UserId, String)>>,
}

impl PasswordNotifier for RecordingNotifier {
    fn send_password(&self, user: &UserRecord, plain: &str) -> Result<(), anyhow::Error> {
        self.sent.lock().unwrap().push((user.id, plain.to_string()));
        Ok(())
    }
}

/// Store whose writes to one user fail.
struct FailingUpdates {
    inner: Arc<InMemoryUserStore>,
    broken: UserId,
}

impl PersistenceHandler for FailingUpdates {
    fn find(&self, filter: &[Filter]) -> DomainResult<Vec<UserRecord>> {
        self.inner.find(filter)
    }

    fn find_all(&self, query: &ListQuery) -> DomainResult<Page> {
        self.inner.find_all(query)
    }

    fn create(&self, user: &UserRecord) -> DomainResult<OperationResult> {
        self.inner.create(user)
    }

    fn update(&self, user: &UserRecord) -> DomainResult<OperationResult> {
        if user.id == self.broken {
            return Err(DomainError::invariant("disk full"));
        }
        self.inner.update(user)
    }

    fn remove(&self, users: &[UserRecord]) -> DomainResult<OperationResult> {
        self.inner.remove(users)
    }

    fn resolve_groups(&self, ids: &[GroupId]) -> DomainResult<Vec<GroupRef>> {
        self.inner.resolve_groups(ids)
    }

    fn resolve_permissions(&self, ids: &[PermissionId]) -> DomainResult<Vec<PermissionRef>> {
        self.inner.resolve_permissions(ids)
    }
}

struct Fixture {
    controller: UsersController,
    store: Arc<InMemoryUserStore>,
    activity: Arc<InMemoryActivityLog>,
    notifier: Arc<RecordingNotifier>,
}

fn fixture_with_root(users: Vec<UserRecord>, root_user_id: Option<UserId>) -> Fixture {
    backoffice_observability::init_for_tests();

    let config = UsersConfig {
        hashing: HashingConfig {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        },
        root_user_id,
        ..UsersConfig::default()
    };
    let store = Arc::new(InMemoryUserStore::new().with_users(users));
    let activity = Arc::new(InMemoryActivityLog::new());
    let notifier = Arc::new(RecordingNotifier::default());

    let collaborators = Collaborators::with_defaults(&config, store.clone(), notifier.clone())
        .unwrap()
        .with_activity_log(activity.clone());

    Fixture {
        controller: UsersController::new(&config, collaborators),
        store,
        activity,
        notifier,
    }
}

fn fixture(users: Vec<UserRecord>) -> Fixture {
    fixture_with_root(users, None)
}

fn user(name: &str) -> UserRecord {
    UserRecord::new(UserId::new(), name, format!("{name}@example.com"))
}

fn record(value: Value) -> Payload {
    value.as_object().cloned().unwrap()
}

fn manager() -> Principal {
    Principal::new(
        UserId::new(),
        [Permission::ManageUserProfiles, Permission::AccessBackendToolsSecuritySection],
    )
}

fn by_id(id: UserId) -> RequestParams {
    RequestParams::with_filter(vec![Filter::eq("id", id.to_string())])
}

#[test]
fn self_update_is_allowed_and_logged_as_profile_update() {
    let jdoe = user("jdoe");
    let fx = fixture(vec![jdoe.clone()]);
    let caller = Principal::unprivileged(jdoe.id);

    let params = RequestParams::with_record(record(json!({ "id": jdoe.id.to_string(), "firstName": "Johnny" })));
    let response = fx.controller.update(&caller, &params).unwrap();

    assert_eq!(response.operations.updated.len(), 1);
    assert_eq!(fx.store.get(jdoe.id).unwrap().first_name.as_deref(), Some("Johnny"));

    let entries = fx.activity.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].activity_type, ActivityType::ProfileUpdated);
    assert_eq!(entries[0].message, "Profile data is changed for user \"jdoe\".");
    assert_eq!(entries[0].author, jdoe.id);
}

#[test]
fn foreign_update_is_denied_before_validation() {
    let jdoe = user("jdoe");
    let fx = fixture(vec![jdoe.clone()]);
    let stranger = Principal::unprivileged(UserId::new());

    let params = RequestParams::with_record(record(json!({ "id": jdoe.id.to_string(), "email": "not-an-email" })));
    let err = fx.controller.update(&stranger, &params).unwrap_err();

    assert!(matches!(err, UsersError::AccessDenied));
    assert_eq!(fx.store.get(jdoe.id).unwrap(), jdoe);
    assert!(fx.activity.entries().is_empty());
}

#[test]
fn guarded_fields_are_reported_one_by_one() {
    let jdoe = user("jdoe");
    let fx = fixture(vec![jdoe.clone()]);
    let caller = Principal::unprivileged(jdoe.id);

    let params = RequestParams::with_record(record(json!({
        "id": jdoe.id.to_string(),
        "firstName": "John",
        "username": "root",
        "active": false,
    })));
    let Err(UsersError::ValidationFailed(errors)) = fx.controller.update(&caller, &params) else {
        panic!("expected field errors");
    };

    assert_eq!(errors.errors_for("username"), [ACCESS_DENIED]);
    assert_eq!(errors.errors_for("active"), [ACCESS_DENIED]);
    assert!(errors.errors_for("firstName").is_empty());
    assert_eq!(fx.store.get(jdoe.id).unwrap(), jdoe);
}

#[test]
fn activation_toggle_wins_over_password_change() {
    let jdoe = user("jdoe");
    let fx = fixture(vec![jdoe.clone()]);

    let params = RequestParams::with_record(record(json!({
        "id": jdoe.id.to_string(),
        "active": false,
        "plainPassword": "Newpass123",
    })));
    fx.controller.update(&manager(), &params).unwrap();

    let stored = fx.store.get(jdoe.id).unwrap();
    assert!(!stored.active);
    assert!(stored.has_password());

    let entries = fx.activity.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].activity_type, ActivityType::ProfileDisabled);
}

#[test]
fn own_password_change_is_logged_without_notification() {
    let jdoe = user("jdoe");
    let fx = fixture(vec![jdoe.clone()]);
    let caller = Principal::unprivileged(jdoe.id);

    let params = RequestParams::with_record(record(json!({ "id": jdoe.id.to_string(), "plainPassword": "Newpass123" })));
    fx.controller.update(&caller, &params).unwrap();

    assert!(fx.store.get(jdoe.id).unwrap().password_changed_at.is_some());
    assert_eq!(fx.activity.entries()[0].activity_type, ActivityType::PasswordChanged);
    assert!(fx.notifier.sent.lock().unwrap().is_empty());
}

#[test]
fn send_password_is_a_managed_field() {
    let jdoe = user("jdoe");
    let fx = fixture(vec![jdoe.clone()]);
    let params = RequestParams::with_record(record(json!({
        "id": jdoe.id.to_string(),
        "plainPassword": "Newpass123",
        "sendPassword": true,
    })));

    let caller = Principal::unprivileged(jdoe.id);
    let Err(UsersError::ValidationFailed(errors)) = fx.controller.update(&caller, &params) else {
        panic!("expected field errors");
    };
    assert_eq!(errors.errors_for("sendPassword"), [ACCESS_DENIED]);

    fx.controller.update(&manager(), &params).unwrap();
    assert_eq!(fx.notifier.sent.lock().unwrap().as_slice(), [(jdoe.id, "Newpass123".to_string())]);
}

#[test]
fn weak_password_on_update_is_a_field_error() {
    let jdoe = user("jdoe");
    let fx = fixture(vec![jdoe.clone()]);
    let caller = Principal::unprivileged(jdoe.id);

    let params = RequestParams::with_record(record(json!({ "id": jdoe.id.to_string(), "plainPassword": "short" })));
    let Err(UsersError::ValidationFailed(errors)) = fx.controller.update(&caller, &params) else {
        panic!("expected field errors");
    };

    assert_eq!(errors.errors_for("plainPassword"), ["The password must be at least 8 characters long."]);
    assert!(!fx.store.get(jdoe.id).unwrap().has_password());
    assert!(fx.activity.entries().is_empty());
}

#[test]
fn permissions_in_update_require_manage_permissions() {
    let jdoe = user("jdoe");
    let fx = fixture(vec![jdoe.clone()]);

    let params = RequestParams::with_record(record(json!({ "id": jdoe.id.to_string(), "permissions": [] })));
    assert!(matches!(fx.controller.update(&manager(), &params), Err(UsersError::AccessDenied)));

    let admin = Principal::new(UserId::new(), [Permission::ManageUserProfiles, Permission::ManagePermissions]);
    fx.controller.update(&admin, &params).unwrap();
}

#[test]
fn missing_target_is_hidden_from_non_managers() {
    let fx = fixture(vec![]);
    let ghost = Principal::unprivileged(UserId::new());

    let params = RequestParams::with_record(record(json!({ "id": ghost.id().to_string(), "firstName": "Casper" })));
    assert!(matches!(fx.controller.update(&ghost, &params), Err(UsersError::AccessDenied)));
    assert!(matches!(fx.controller.update(&manager(), &params), Err(UsersError::NotFound)));
}

#[test]
fn create_without_password_generates_one_silently() {
    let fx = fixture(vec![]);

    let params = RequestParams::with_record(record(json!({ "username": "newbie", "email": "newbie@example.com" })))
        .hydrate_with(HydrationRequest::profile("main-form"));
    let response = fx.controller.create(&manager(), &params).unwrap();

    assert_eq!(response.operations.created.len(), 1);
    let id: UserId = response.operations.created[0].id.parse().unwrap();
    let stored = fx.store.get(id).unwrap();
    assert!(stored.has_password());
    assert!(stored.active);

    assert_eq!(response.records[0]["username"], "newbie");
    let body = serde_json::to_string(&response).unwrap();
    assert!(!body.contains("assword"));
    assert!(!body.contains("argon2"));
    assert!(fx.notifier.sent.lock().unwrap().is_empty());
}

#[test]
fn create_with_send_password_notifies_the_new_user() {
    let fx = fixture(vec![]);

    let params = RequestParams::with_record(record(json!({
        "username": "newbie",
        "email": "newbie@example.com",
        "plainPassword": "Secret123",
        "sendPassword": "1",
    })));
    fx.controller.create(&manager(), &params).unwrap();

    let sent = fx.notifier.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].1, "Secret123");
}

#[test]
fn weak_password_on_create_fails_the_request() {
    let fx = fixture(vec![]);

    let params = RequestParams::with_record(record(json!({
        "username": "newbie",
        "email": "newbie@example.com",
        "plainPassword": "abc",
    })));
    let err = fx.controller.create(&manager(), &params).unwrap_err();

    assert!(matches!(err, UsersError::BadPassword(ref msg) if msg == "The password must be at least 8 characters long."));
    assert!(fx.store.is_empty());
}

#[test]
fn create_requires_manage_user_profiles() {
    let fx = fixture(vec![]);
    let params = RequestParams::with_record(record(json!({ "username": "newbie", "email": "newbie@example.com" })));

    let info_editor = Principal::new(UserId::new(), [Permission::ManageUserProfileInformation]);
    assert!(matches!(fx.controller.create(&info_editor, &params), Err(UsersError::AccessDenied)));
    assert!(fx.store.is_empty());
}

#[test]
fn create_reports_invalid_fields() {
    let fx = fixture(vec![]);
    let params = RequestParams::with_record(record(json!({ "username": "", "email": "nope" })));

    let Err(UsersError::ValidationFailed(errors)) = fx.controller.create(&manager(), &params) else {
        panic!("expected field errors");
    };
    assert_eq!(errors.errors_for("username"), ["This value should not be blank."]);
    assert_eq!(errors.errors_for("email"), ["This value is not a valid email address."]);
}

#[test]
fn batch_update_logs_one_event_per_record() {
    let (alice, bob) = (user("alice"), user("bob"));
    let fx = fixture(vec![alice.clone(), bob.clone()]);

    let params = RequestParams::with_records(vec![
        record(json!({ "id": alice.id.to_string(), "active": false })),
        record(json!({ "id": bob.id.to_string(), "firstName": "Robert" })),
    ]);
    let response = fx.controller.batch_update(&manager(), &params).unwrap();

    assert_eq!(response.operations.updated.len(), 2);
    assert!(!fx.store.get(alice.id).unwrap().active);
    assert_eq!(fx.store.get(bob.id).unwrap().first_name.as_deref(), Some("Robert"));

    let types: Vec<_> = fx.activity.entries().iter().map(|e| e.activity_type).collect();
    assert_eq!(types, [ActivityType::ProfileDisabled, ActivityType::ProfileUpdated]);
}

#[test]
fn batch_update_validates_every_record_before_writing() {
    let (alice, bob) = (user("alice"), user("bob"));
    let fx = fixture(vec![alice.clone(), bob.clone()]);

    let params = RequestParams::with_records(vec![
        record(json!({ "id": alice.id.to_string(), "firstName": "Alicia" })),
        record(json!({ "id": bob.id.to_string(), "email": "broken" })),
        record(json!({ "id": bob.id.to_string(), "plainPassword": "Secret123" })),
    ]);
    let Err(UsersError::ValidationFailed(errors)) = fx.controller.batch_update(&manager(), &params) else {
        panic!("expected field errors");
    };

    assert_eq!(errors.errors_for("records[1].email").len(), 1);
    assert_eq!(errors.errors_for("records[2].plainPassword").len(), 1);
    assert_eq!(fx.store.get(alice.id).unwrap(), alice);
    assert!(fx.activity.entries().is_empty());
}

#[test]
fn batch_update_rejects_a_record_listed_twice() {
    let alice = user("alice");
    let fx = fixture(vec![alice.clone()]);

    let params = RequestParams::with_records(vec![
        record(json!({ "id": alice.id.to_string(), "firstName": "Alicia" })),
        record(json!({ "id": alice.id.to_string(), "lastName": "Liddell" })),
    ]);
    let Err(UsersError::ValidationFailed(errors)) = fx.controller.batch_update(&manager(), &params) else {
        panic!("expected field errors");
    };

    assert_eq!(errors.errors_for("records[1].id"), ["This record appears more than once in the batch."]);
    assert!(errors.errors_for("records[0].id").is_empty());
    assert_eq!(fx.store.get(alice.id).unwrap(), alice);
    assert!(fx.activity.entries().is_empty());
}

#[test]
fn batch_update_keeps_usernames_unique() {
    let (alice, bob, carol) = (user("alice"), user("bob"), user("carol"));
    let fx = fixture(vec![alice.clone(), bob.clone(), carol.clone()]);

    let taken = RequestParams::with_records(vec![
        record(json!({ "id": carol.id.to_string(), "firstName": "Caroline" })),
        record(json!({ "id": bob.id.to_string(), "username": "ALICE" })),
    ]);
    let Err(UsersError::ValidationFailed(errors)) = fx.controller.batch_update(&manager(), &taken) else {
        panic!("expected field errors");
    };
    assert_eq!(errors.errors_for("records[1].username"), ["This value is already used."]);
    assert_eq!(fx.store.get(carol.id).unwrap(), carol);
    assert_eq!(fx.store.get(bob.id).unwrap(), bob);
    assert!(fx.activity.entries().is_empty());

    let clash = RequestParams::with_records(vec![
        record(json!({ "id": bob.id.to_string(), "username": "robin" })),
        record(json!({ "id": carol.id.to_string(), "username": "Robin" })),
    ]);
    let Err(UsersError::ValidationFailed(errors)) = fx.controller.batch_update(&manager(), &clash) else {
        panic!("expected field errors");
    };
    assert_eq!(errors.errors_for("records[0].username").len(), 1);
    assert_eq!(errors.errors_for("records[1].username").len(), 1);

    // Swapping names between records in the same batch is not a clash with the store.
    let rename = RequestParams::with_records(vec![
        record(json!({ "id": alice.id.to_string(), "username": "alison" })),
        record(json!({ "id": bob.id.to_string(), "username": "bobby" })),
    ]);
    fx.controller.batch_update(&manager(), &rename).unwrap();
    assert_eq!(fx.store.get(alice.id).unwrap().username, "alison");
    assert_eq!(fx.activity.entries().len(), 2);
}

#[test]
fn non_string_password_is_a_field_error() {
    let jdoe = user("jdoe");
    let fx = fixture(vec![jdoe.clone()]);
    let caller = Principal::unprivileged(jdoe.id);

    let params = RequestParams::with_record(record(json!({ "id": jdoe.id.to_string(), "plainPassword": 12345678 })));
    let Err(UsersError::ValidationFailed(errors)) = fx.controller.update(&caller, &params) else {
        panic!("expected field errors");
    };
    assert_eq!(errors.errors_for("plainPassword").len(), 1);
    assert!(fx.activity.entries().is_empty());

    let create = RequestParams::with_record(record(json!({
        "username": "newbie",
        "email": "newbie@example.com",
        "plainPassword": ["Secret123"],
        "sendPassword": {},
    })));
    let Err(UsersError::ValidationFailed(errors)) = fx.controller.create(&manager(), &create) else {
        panic!("expected field errors");
    };
    assert_eq!(errors.errors_for("plainPassword").len(), 1);
    assert_eq!(errors.errors_for("sendPassword").len(), 1);
    assert!(fx.notifier.sent.lock().unwrap().is_empty());
}

#[test]
fn password_is_sent_only_after_the_user_is_stored() {
    let fx = fixture(vec![user("taken")]);

    let params = RequestParams::with_record(record(json!({
        "username": "taken",
        "email": "other@example.com",
        "plainPassword": "Secret123",
        "sendPassword": true,
    })));
    let result = fx.controller.create(&manager(), &params);

    assert!(matches!(result, Err(UsersError::Domain(DomainError::Conflict(_)))));
    assert!(fx.notifier.sent.lock().unwrap().is_empty());
}

#[test]
fn default_collaborators_log_activity_through_tracing() {
    backoffice_observability::init_for_tests();
    let jdoe = user("jdoe");
    let config = UsersConfig {
        hashing: HashingConfig {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        },
        ..UsersConfig::default()
    };
    let store = Arc::new(InMemoryUserStore::new().with_users(vec![jdoe.clone()]));
    let collaborators =
        Collaborators::with_defaults(&config, store.clone(), Arc::new(RecordingNotifier::default())).unwrap();
    let controller = UsersController::new(&config, collaborators);

    let params = RequestParams::with_record(record(json!({ "id": jdoe.id.to_string(), "active": false })));
    controller.update(&manager(), &params).unwrap();

    assert!(!store.get(jdoe.id).unwrap().active);
}

#[test]
fn failed_batch_write_still_logs_the_stored_records() {
    backoffice_observability::init_for_tests();
    let (alice, bob) = (user("alice"), user("bob"));
    let config = UsersConfig {
        hashing: HashingConfig {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        },
        ..UsersConfig::default()
    };
    let store = Arc::new(InMemoryUserStore::new().with_users(vec![alice.clone(), bob.clone()]));
    let activity = Arc::new(InMemoryActivityLog::new());
    let persistence = Arc::new(FailingUpdates {
        inner: store.clone(),
        broken: bob.id,
    });
    let collaborators = Collaborators::with_defaults(&config, persistence, Arc::new(RecordingNotifier::default()))
        .unwrap()
        .with_activity_log(activity.clone());
    let controller = UsersController::new(&config, collaborators);

    let params = RequestParams::with_records(vec![
        record(json!({ "id": alice.id.to_string(), "active": false })),
        record(json!({ "id": bob.id.to_string(), "firstName": "Robert" })),
    ]);
    let result = controller.batch_update(&manager(), &params);

    assert!(matches!(result, Err(UsersError::Domain(DomainError::InvariantViolation(_)))));
    assert!(!store.get(alice.id).unwrap().active);
    assert_eq!(store.get(bob.id).unwrap(), bob);
    let logged: Vec<_> = activity.entries().iter().map(|e| e.activity_type).collect();
    assert_eq!(logged, [ActivityType::ProfileDisabled]);
}

#[test]
fn batch_update_has_no_self_edit_exception() {
    let jdoe = user("jdoe");
    let fx = fixture(vec![jdoe.clone()]);
    let caller = Principal::unprivileged(jdoe.id);

    let params = RequestParams::with_records(vec![record(json!({ "id": jdoe.id.to_string(), "firstName": "J" }))]);
    assert!(matches!(fx.controller.batch_update(&caller, &params), Err(UsersError::AccessDenied)));

    let single = RequestParams::with_record(record(json!({ "id": jdoe.id.to_string(), "firstName": "J" })));
    fx.controller.update(&caller, &single).unwrap();
}

#[test]
fn get_allows_own_record_and_hides_others() {
    let (jdoe, other) = (user("jdoe"), user("other"));
    let fx = fixture(vec![jdoe.clone(), other.clone()]);
    let caller = Principal::unprivileged(jdoe.id);

    let own = fx.controller.get(&caller, &by_id(jdoe.id)).unwrap();
    assert_eq!(own["username"], "jdoe");
    assert!(own.contains_key("meta"));
    assert!(!own.contains_key("isActive"));

    assert!(matches!(fx.controller.get(&caller, &by_id(other.id)), Err(UsersError::AccessDenied)));
    assert!(matches!(fx.controller.get(&manager(), &by_id(UserId::new())), Err(UsersError::NotFound)));
}

#[test]
fn list_filters_sorts_and_pages() {
    let users = ["dave", "carol", "bob", "alice"].map(user).to_vec();
    let fx = fixture(users);

    let mut params = RequestParams::with_filter(vec![Filter::new(
        "username",
        backoffice_users::Comparator::NotIn,
        json!(["dave"]),
    )]);
    params.start = Some(1);
    params.limit = Some(5);
    params.hydration = Some(HydrationRequest::profile("compact-list"));

    let response = fx.controller.list(&manager(), &params).unwrap();
    assert_eq!(response.total, 3);
    let names: Vec<_> = response.items.iter().map(|i| i["username"].clone()).collect();
    assert_eq!(names, [json!("bob"), json!("carol")]);
    assert!(response.items[0].contains_key("fullname"));

    let outsider = Principal::new(UserId::new(), [Permission::ManageUserProfiles]);
    assert!(matches!(fx.controller.list(&outsider, &params), Err(UsersError::AccessDenied)));
}

#[test]
fn list_rejects_groups_outside_the_profile() {
    let fx = fixture(vec![user("jdoe")]);
    let mut params = RequestParams::default();
    params.hydration = Some(HydrationRequest {
        profile: "modera-backend-security-group-groupusers".into(),
        group: vec!["list".into()],
    });

    assert!(matches!(fx.controller.list(&manager(), &params), Err(UsersError::Hydration(_))));
}

#[test]
fn remove_reports_each_user_and_protects_root() {
    let (root, jdoe) = (user("root"), user("jdoe"));
    let fx = fixture_with_root(vec![root.clone(), jdoe.clone()], Some(root.id));

    let removed = fx.controller.remove(&manager(), &by_id(jdoe.id)).unwrap();
    assert_eq!(removed.removed.len(), 1);
    assert_eq!(removed.removed[0].entity_class, "User");
    assert_eq!(removed.removed[0].id, jdoe.id.to_string());

    assert!(matches!(fx.controller.remove(&manager(), &by_id(root.id)), Err(UsersError::Domain(_))));
    assert!(fx.store.get(root.id).is_some());

    let unfiltered = RequestParams::default();
    assert!(matches!(fx.controller.remove(&manager(), &unfiltered), Err(UsersError::ValidationFailed(_))));
}

#[test]
fn generate_password_for_self_or_as_manager() {
    let (jdoe, other) = (user("jdoe"), user("other"));
    let fx = fixture(vec![jdoe.clone(), other.clone()]);
    let caller = Principal::unprivileged(jdoe.id);

    let own = fx.controller.generate_password(&caller, None).unwrap();
    assert_eq!(own.len(), 12);
    assert!(own.chars().any(|c| c.is_ascii_digit()));

    assert!(matches!(fx.controller.generate_password(&caller, Some(other.id)), Err(UsersError::AccessDenied)));
    assert!(matches!(
        fx.controller.generate_password(&manager(), Some(UserId::new())),
        Err(UsersError::AccessDenied)
    ));
    fx.controller.generate_password(&manager(), Some(other.id)).unwrap();

    assert!(!fx.store.get(jdoe.id).unwrap().has_password());
}

#[test]
fn rotation_is_never_due_for_root() {
    let mut jdoe = user("jdoe");
    jdoe.password_changed_at = Some(Utc::now() - Duration::days(365));
    let fx = fixture(vec![jdoe.clone()]);

    let plain = Principal::unprivileged(jdoe.id);
    assert!(fx.controller.is_password_rotation_needed(&plain).unwrap());

    let root = Principal::new(jdoe.id, [Permission::RootUser]);
    assert!(!fx.controller.is_password_rotation_needed(&root).unwrap());

    let impersonated = Principal::new(jdoe.id, [Permission::PreviousAdmin]);
    assert!(!fx.controller.is_password_rotation_needed(&impersonated).unwrap());

    // No stored record is needed to answer for an exempt caller.
    let unknown_root = Principal::new(UserId::new(), [Permission::RootUser]);
    assert!(!fx.controller.is_password_rotation_needed(&unknown_root).unwrap());
    let unknown = Principal::unprivileged(UserId::new());
    assert!(matches!(fx.controller.is_password_rotation_needed(&unknown), Err(UsersError::NotFound)));
}
