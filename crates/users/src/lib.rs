//! `backoffice-users`: user administration endpoints for the backend tools.
//!
//! The reusable part is a small policy engine for entity mutation endpoints:
//! - [`policy`]: which principal may run which action
//! - [`hydration`]: which fields each response view exposes
//! - [`guard`]: which fields a non-privileged caller may write
//! - [`dispatcher`]: domain side effects and activity logging of an update
//! - [`password`]: strength, generation, hashing, delivery and rotation
//!
//! [`UsersController`] chains them into request pipelines. Storage, the
//! domain user service, the activity log, hashing and mail delivery are
//! injected collaborators.

pub mod config;
pub mod controller;
pub mod dispatcher;
pub mod error;
pub mod filter;
pub mod guard;
pub mod hydration;
pub mod mapper;
pub mod password;
pub mod payload;
pub mod persistence;
pub mod policy;
pub mod record;
pub mod service;
pub mod validation;

pub use config::{HashingConfig, LetterRequirement, PasswordPolicyConfig, UsersConfig};
pub use controller::{Collaborators, ListResponse, MutationResponse, UsersController};
pub use dispatcher::{Mutation, SideEffectDispatcher};
pub use error::{UsersError, UsersResult};
pub use filter::{Comparator, Filter};
pub use guard::filter_write;
pub use hydration::{HydrationError, HydrationGroup, HydrationRequest};
pub use password::{
    Argon2Encoder, BadPassword, PasswordEncoder, PasswordError, PasswordGateway, PasswordNotifier, Plaintext,
};
pub use payload::{Payload, RequestParams};
pub use persistence::{InMemoryUserStore, OperationResult, PersistenceHandler};
pub use policy::{ActionRule, CrudAction, action_rule, authorize};
pub use record::{Credential, GroupRef, PermissionRef, UserRecord, UserState};
pub use service::{DefaultUserService, UserService};
pub use validation::{EntityValidator, UserValidator, ValidationResult};
