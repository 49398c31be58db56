//! Users endpoints: request pipelines chaining the action policy, field
//! guard, data mapping, validation, password gateway, side-effect dispatcher
//! and hydration.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::instrument;
use zeroize::Zeroizing;

use backoffice_activity::{ActivityLog, TracingActivityLog};
use backoffice_auth::{Permission, Principal, authorize_any};
use backoffice_core::UserId;

use crate::config::UsersConfig;
use crate::dispatcher::{Mutation, SideEffectDispatcher};
use crate::error::{UsersError, UsersResult};
use crate::guard::filter_write;
use crate::hydration::{self, HydrationRequest};
use crate::mapper::{check_password_fields, map_onto};
use crate::password::{
    Argon2Encoder, PasswordEncoder, PasswordError, PasswordGateway, PasswordNotifier, Plaintext,
};
use crate::payload::{Payload, PayloadExt, RequestParams, fields};
use crate::persistence::{ListQuery, OperationResult, PersistenceHandler};
use crate::policy::{CrudAction, authorize};
use crate::record::UserRecord;
use crate::service::{DefaultUserService, UserService};
use crate::validation::{EntityValidator, UserValidator, ValidationResult};

const DUPLICATE_RECORD: &str = "This record appears more than once in the batch.";
const USERNAME_TAKEN: &str = "This value is already used.";

/// One validated batch record, ready to be written.
struct BatchEntry {
    mutation: Mutation,
    user: UserRecord,
    renamed: bool,
}

const MANAGERS: [Permission; 2] = [
    Permission::ManageUserProfiles,
    Permission::ManageUserProfileInformation,
];

/// Everything the controller talks to, injected at construction.
#[derive(Clone)]
pub struct Collaborators {
    pub persistence: Arc<dyn PersistenceHandler>,
    pub validator: Arc<dyn EntityValidator>,
    pub user_service: Arc<dyn UserService>,
    pub activity: Arc<dyn ActivityLog>,
    pub encoder: Arc<dyn PasswordEncoder>,
    pub notifier: Arc<dyn PasswordNotifier>,
}

impl Collaborators {
    /// Default validator, user service, Argon2id encoder and tracing activity
    /// log around the given storage and notifier.
    pub fn with_defaults(
        config: &UsersConfig,
        persistence: Arc<dyn PersistenceHandler>,
        notifier: Arc<dyn PasswordNotifier>,
    ) -> Result<Self, PasswordError> {
        Ok(Self {
            user_service: Arc::new(DefaultUserService::new(persistence.clone(), config.root_user_id)),
            validator: Arc::new(UserValidator),
            encoder: Arc::new(Argon2Encoder::new(&config.hashing)?),
            activity: Arc::new(TracingActivityLog),
            persistence,
            notifier,
        })
    }

    pub fn with_activity_log(mut self, activity: Arc<dyn ActivityLog>) -> Self {
        self.activity = activity;
        self
    }
}

/// Response of create, update and batch update.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MutationResponse {
    #[serde(flatten)]
    pub operations: OperationResult,
    /// Touched records, hydrated when the request asked for a profile.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub records: Vec<Map<String, Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ListResponse {
    pub items: Vec<Map<String, Value>>,
    pub total: usize,
}

pub struct UsersController {
    persistence: Arc<dyn PersistenceHandler>,
    validator: Arc<dyn EntityValidator>,
    user_service: Arc<dyn UserService>,
    passwords: PasswordGateway,
    dispatcher: SideEffectDispatcher,
}

impl UsersController {
    pub fn new(config: &UsersConfig, collaborators: Collaborators) -> Self {
        let Collaborators {
            persistence,
            validator,
            user_service,
            activity,
            encoder,
            notifier,
        } = collaborators;

        Self {
            passwords: PasswordGateway::new(config.password.clone(), encoder, notifier),
            dispatcher: SideEffectDispatcher::new(user_service.clone(), activity),
            persistence,
            validator,
            user_service,
        }
    }

    pub fn passwords(&self) -> &PasswordGateway {
        &self.passwords
    }

    #[instrument(skip_all, fields(principal = %principal.id()), err)]
    pub fn create(&self, principal: &Principal, params: &RequestParams) -> UsersResult<MutationResponse> {
        ensure_allowed(CrudAction::Create, principal, params)?;

        let payload = params.record.clone().unwrap_or_default();
        let (user, plain) = self.map_new_user(&payload)?;
        let operations = self.persistence.create(&user)?;
        tracing::info!(user = %user.id, username = %user.username, "user created");

        if payload.is_truthy(fields::SEND_PASSWORD) {
            self.passwords.notify(&user, &plain)?;
        }

        respond(operations, [&user], params.hydration.as_ref())
    }

    /// Create-time mapping: a blank record filled from `payload`, validated,
    /// with a supplied or generated password set on it. The plaintext is
    /// handed back so it can be delivered once the record is stored.
    pub fn map_new_user(&self, payload: &Payload) -> UsersResult<(UserRecord, Plaintext)> {
        let mut user = UserRecord::blank();
        let mut errors = check_password_fields(payload);
        errors.merge(map_onto(payload, &mut user, self.persistence.as_ref())?);
        errors.merge(self.validator.validate(&user));
        if errors.has_errors() {
            return Err(errors.into());
        }

        let plain: Plaintext = match payload.non_empty_str(fields::PLAIN_PASSWORD) {
            Some(supplied) => Zeroizing::new(supplied.to_string()),
            None => Zeroizing::new(self.passwords.generate(Some(&user))),
        };
        self.passwords.encode_and_set(&mut user, &plain)?;

        Ok((user, plain))
    }

    #[instrument(skip_all, fields(principal = %principal.id()), err)]
    pub fn update(&self, principal: &Principal, params: &RequestParams) -> UsersResult<MutationResponse> {
        ensure_allowed(CrudAction::Update, principal, params)?;

        let Some(payload) = params.record.as_ref() else {
            return Err(general_error("No record given."));
        };
        let mut user = self.load_target(principal, payload)?;

        let (errors, plain) = self.validate_update(principal, &mut user, payload)?;
        if errors.has_errors() {
            return Err(errors.into());
        }

        let mutation = Mutation::classify(payload);
        let operations = self.commit(principal, mutation, &mut user)?;

        if let Some(plain) = plain.filter(|_| payload.is_truthy(fields::SEND_PASSWORD)) {
            self.passwords.notify(&user, &plain)?;
        }

        respond(operations, [&user], params.hydration.as_ref())
    }

    /// Update validator: field guard first (returning early on any denial),
    /// then data mapping, the entity validator and password encoding. BadPassword
    /// is reported on the `plainPassword` field. A newly set password is
    /// returned alongside the errors.
    pub fn validate_update(
        &self,
        principal: &Principal,
        user: &mut UserRecord,
        payload: &Payload,
    ) -> UsersResult<(ValidationResult, Option<Plaintext>)> {
        let guard = filter_write(principal, user, payload);
        if guard.has_errors() {
            return Ok((guard, None));
        }

        let mut errors = check_password_fields(payload);
        errors.merge(map_onto(payload, user, self.persistence.as_ref())?);
        errors.merge(self.validator.validate(user));
        if errors.has_errors() {
            return Ok((errors, None));
        }

        let Some(plain) = payload.non_empty_str(fields::PLAIN_PASSWORD) else {
            return Ok((errors, None));
        };
        let plain: Plaintext = Zeroizing::new(plain.to_string());
        match self.passwords.encode_and_set(user, &plain) {
            Ok(()) => Ok((errors, Some(plain))),
            Err(PasswordError::Bad(bad)) => {
                errors.add_field_error(fields::PLAIN_PASSWORD, bad.first_error());
                Ok((errors, None))
            }
            Err(other) => Err(other.into()),
        }
    }

    /// Every record is mapped and validated before any of them is written.
    /// A record may appear only once, and usernames must stay unique across
    /// the batch and the store.
    #[instrument(skip_all, fields(principal = %principal.id()), err)]
    pub fn batch_update(&self, principal: &Principal, params: &RequestParams) -> UsersResult<MutationResponse> {
        ensure_allowed(CrudAction::BatchUpdate, principal, params)?;

        let mut errors = ValidationResult::new();
        let mut prepared = Vec::new();
        let mut seen = HashSet::new();
        for (index, payload) in params.all_records().enumerate() {
            let mut user = self.load_target(principal, payload)?;

            let mut record_errors = ValidationResult::new();
            if !seen.insert(user.id) {
                record_errors.add_field_error(fields::ID, DUPLICATE_RECORD);
            }
            if payload.is_set(fields::PLAIN_PASSWORD) {
                record_errors.add_field_error(fields::PLAIN_PASSWORD, "Passwords cannot be changed in a batch update.");
            }
            record_errors.merge(map_onto(payload, &mut user, self.persistence.as_ref())?);
            record_errors.merge(self.validator.validate(&user));

            errors.merge_prefixed(&format!("records[{index}]"), record_errors);
            prepared.push(BatchEntry {
                mutation: Mutation::classify(payload),
                renamed: payload.is_set(fields::USERNAME),
                user,
            });
        }

        for (index, entry) in prepared.iter().enumerate().filter(|(_, e)| e.renamed) {
            let clash_in_batch = prepared
                .iter()
                .any(|other| other.user.id != entry.user.id && other.user.username.eq_ignore_ascii_case(&entry.user.username));
            let clash_in_store = self
                .persistence
                .find_by_username(&entry.user.username)?
                .iter()
                .any(|stored| !seen.contains(&stored.id));
            if clash_in_batch || clash_in_store {
                errors.add_field_error(format!("records[{index}].{}", fields::USERNAME), USERNAME_TAKEN);
            }
        }

        if errors.has_errors() {
            return Err(errors.into());
        }

        for entry in &mut prepared {
            self.dispatcher.before_persist(entry.mutation, &mut entry.user)?;
        }

        let mut operations = OperationResult::new();
        let mut written = 0;
        let mut failure = None;
        for entry in &prepared {
            match self.persistence.update(&entry.user) {
                Ok(result) => {
                    operations.merge(result);
                    written += 1;
                    tracing::info!(user = %entry.user.id, mutation = ?entry.mutation, "user updated");
                }
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            }
        }
        for entry in &prepared[..written] {
            self.dispatcher.after_persist(entry.mutation, &entry.user, principal);
        }
        if let Some(err) = failure {
            tracing::warn!(written, total = prepared.len(), %err, "batch update stopped after a failed write");
            return Err(err.into());
        }

        respond(operations, prepared.iter().map(|e| &e.user), params.hydration.as_ref())
    }

    /// First user matching the request filter.
    #[instrument(skip_all, fields(principal = %principal.id()), err)]
    pub fn get(&self, principal: &Principal, params: &RequestParams) -> UsersResult<Map<String, Value>> {
        ensure_allowed(CrudAction::Get, principal, params)?;

        let user = self
            .persistence
            .find(&params.filter)?
            .into_iter()
            .next()
            .ok_or(UsersError::NotFound)?;

        let request = hydration_or(params.hydration.as_ref(), "main-form");
        Ok(hydration::hydrate(&user, &request)?)
    }

    #[instrument(skip_all, fields(principal = %principal.id()), err)]
    pub fn list(&self, principal: &Principal, params: &RequestParams) -> UsersResult<ListResponse> {
        ensure_allowed(CrudAction::List, principal, params)?;

        let page = self.persistence.find_all(&ListQuery {
            filter: params.filter.clone(),
            start: params.start.unwrap_or(0),
            limit: params.limit,
        })?;

        let request = hydration_or(params.hydration.as_ref(), "list");
        let items = page
            .items
            .iter()
            .map(|user| hydration::hydrate(user, &request))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ListResponse {
            items,
            total: page.total,
        })
    }

    /// Removes every user matching the (required) filter.
    #[instrument(skip_all, fields(principal = %principal.id()), err)]
    pub fn remove(&self, principal: &Principal, params: &RequestParams) -> UsersResult<OperationResult> {
        ensure_allowed(CrudAction::Remove, principal, params)?;

        if params.filter.is_empty() {
            return Err(general_error("A filter is required to remove users."));
        }
        let users = self.persistence.find(&params.filter)?;
        self.remove_users(&users)
    }

    /// Batch-remove handler: one `removed` entry per entity.
    pub fn remove_users(&self, users: &[UserRecord]) -> UsersResult<OperationResult> {
        let result = self.user_service.remove(users)?;
        Ok(result)
    }

    /// Generate a password for the caller, or for `user_id` when given.
    ///
    /// The password is only returned, not stored.
    #[instrument(skip_all, fields(principal = %principal.id()), err)]
    pub fn generate_password(&self, principal: &Principal, user_id: Option<UserId>) -> UsersResult<Plaintext> {
        let target_id = user_id.unwrap_or_else(|| principal.id());
        let Some(user) = self.persistence.find_by_id(target_id)? else {
            return Err(UsersError::AccessDenied);
        };
        if !principal.is(&user.id) {
            backoffice_auth::authorize(principal, Permission::ManageUserProfiles)?;
        }

        Ok(Zeroizing::new(self.passwords.generate(Some(&user))))
    }

    #[instrument(skip_all, fields(principal = %principal.id()), err)]
    pub fn is_password_rotation_needed(&self, principal: &Principal) -> UsersResult<bool> {
        if PasswordGateway::rotation_exempt(principal) {
            return Ok(false);
        }
        let user = self.persistence.find_by_id(principal.id())?.ok_or(UsersError::NotFound)?;
        Ok(self.passwords.is_rotation_due(principal, &user))
    }

    /// Load the record a payload refers to. A miss is reported as
    /// `AccessDenied` unless the caller may manage profiles.
    fn load_target(&self, principal: &Principal, payload: &Payload) -> UsersResult<UserRecord> {
        let found = match payload.user_id(fields::ID) {
            Some(id) => self.persistence.find_by_id(id)?,
            None => None,
        };

        found.ok_or_else(|| match authorize_any(principal, &MANAGERS) {
            Ok(()) => UsersError::NotFound,
            Err(denied) => denied.into(),
        })
    }

    fn commit(&self, principal: &Principal, mutation: Mutation, user: &mut UserRecord) -> UsersResult<OperationResult> {
        self.dispatcher.before_persist(mutation, user)?;
        let operations = self.persistence.update(user)?;
        tracing::info!(user = %user.id, ?mutation, "user updated");
        self.dispatcher.after_persist(mutation, user, principal);
        Ok(operations)
    }
}

fn ensure_allowed(action: CrudAction, principal: &Principal, params: &RequestParams) -> UsersResult<()> {
    if authorize(action, principal, params) {
        Ok(())
    } else {
        Err(UsersError::AccessDenied)
    }
}

fn general_error(message: &str) -> UsersError {
    let mut result = ValidationResult::new();
    result.add_general_error(message);
    result.into()
}

fn hydration_or(requested: Option<&HydrationRequest>, profile: &str) -> HydrationRequest {
    requested.cloned().unwrap_or_else(|| HydrationRequest::profile(profile))
}

fn respond<'a>(
    operations: OperationResult,
    users: impl IntoIterator<Item = &'a UserRecord>,
    hydration: Option<&HydrationRequest>,
) -> UsersResult<MutationResponse> {
    let records = match hydration {
        Some(request) => users
            .into_iter()
            .map(|user| hydration::hydrate(user, request))
            .collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };

    Ok(MutationResponse { operations, records })
}
