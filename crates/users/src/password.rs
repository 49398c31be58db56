//! Password policy gateway: strength rules, generation, hashing, out-of-band
//! delivery and rotation.

use std::sync::Arc;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, Salt, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use chrono::{DateTime, Duration, Utc};
use rand::seq::SliceRandom;
use rand::{Rng, TryRngCore, rngs::OsRng};
use thiserror::Error;
use zeroize::Zeroizing;

use backoffice_auth::{Permission, Principal};

use crate::config::{HashingConfig, LetterRequirement, PasswordPolicyConfig};
use crate::record::{Credential, UserRecord};

/// Password rejected by the strength policy.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{}", .errors.join(" "))]
pub struct BadPassword {
    errors: Vec<String>,
}

impl BadPassword {
    pub fn new(errors: Vec<String>) -> Self {
        Self { errors }
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// The message shown next to the password field.
    pub fn first_error(&self) -> &str {
        self.errors.first().map(String::as_str).unwrap_or("Bad password.")
    }
}

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error(transparent)]
    Bad(#[from] BadPassword),

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("password notification failed: {0}")]
    Notification(String),
}

/// Turns plaintext into a stored credential and back-checks it.
pub trait PasswordEncoder: Send + Sync {
    fn encode(&self, plain: &str) -> Result<Credential, PasswordError>;

    fn verify(&self, plain: &str, credential: &Credential) -> Result<bool, PasswordError>;
}

/// Delivers a freshly set password to its owner (e-mail or similar).
pub trait PasswordNotifier: Send + Sync {
    fn send_password(&self, user: &UserRecord, plain: &str) -> Result<(), anyhow::Error>;
}

/// Argon2id encoder producing PHC strings.
#[derive(Clone)]
pub struct Argon2Encoder {
    argon2: Argon2<'static>,
}

impl Argon2Encoder {
    pub fn new(config: &HashingConfig) -> Result<Self, PasswordError> {
        let params = Params::new(config.memory_kib, config.iterations, config.parallelism, None)
            .map_err(|err| PasswordError::Hashing(format!("invalid Argon2 parameters: {err}")))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }
}

impl PasswordEncoder for Argon2Encoder {
    fn encode(&self, plain: &str) -> Result<Credential, PasswordError> {
        let mut salt_bytes = [0u8; Salt::RECOMMENDED_LENGTH];
        OsRng
            .try_fill_bytes(&mut salt_bytes)
            .map_err(|err| PasswordError::Hashing(err.to_string()))?;
        let salt = SaltString::encode_b64(&salt_bytes).map_err(|err| PasswordError::Hashing(err.to_string()))?;

        let hash = self
            .argon2
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|err| PasswordError::Hashing(err.to_string()))?;
        Ok(Credential::new(hash.to_string()))
    }

    fn verify(&self, plain: &str, credential: &Credential) -> Result<bool, PasswordError> {
        let parsed = PasswordHash::new(credential.as_phc()).map_err(|err| PasswordError::Hashing(err.to_string()))?;
        Ok(self.argon2.verify_password(plain.as_bytes(), &parsed).is_ok())
    }
}

const LOWERCASE: &[u8] = b"abcdefghijkmnopqrstuvwxyz";
const UPPERCASE: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ";
const DIGITS: &[u8] = b"23456789";

pub struct PasswordGateway {
    policy: PasswordPolicyConfig,
    encoder: Arc<dyn PasswordEncoder>,
    notifier: Arc<dyn PasswordNotifier>,
}

impl PasswordGateway {
    pub fn new(
        policy: PasswordPolicyConfig,
        encoder: Arc<dyn PasswordEncoder>,
        notifier: Arc<dyn PasswordNotifier>,
    ) -> Self {
        Self {
            policy,
            encoder,
            notifier,
        }
    }

    pub fn policy(&self) -> &PasswordPolicyConfig {
        &self.policy
    }

    /// Check `plain` against the strength rules, collecting every violation.
    pub fn check_strength(&self, plain: &str, owner: Option<&UserRecord>) -> Result<(), BadPassword> {
        let mut errors = Vec::new();

        if plain.chars().count() < self.policy.min_length {
            errors.push(format!(
                "The password must be at least {} characters long.",
                self.policy.min_length
            ));
        }

        if self.policy.number_required && !plain.chars().any(|c| c.is_ascii_digit()) {
            errors.push("The password must contain at least one number.".to_string());
        }

        let has_upper = plain.chars().any(char::is_uppercase);
        let has_lower = plain.chars().any(char::is_lowercase);
        match self.policy.letter_required {
            LetterRequirement::NotRequired => {}
            LetterRequirement::Any if !(has_upper || has_lower) => {
                errors.push("The password must contain at least one letter.".to_string());
            }
            LetterRequirement::Capital if !has_upper => {
                errors.push("The password must contain at least one capital letter.".to_string());
            }
            LetterRequirement::CapitalAndNonCapital if !(has_upper && has_lower) => {
                errors.push(
                    "The password must contain at least one capital and one non-capital letter.".to_string(),
                );
            }
            _ => {}
        }

        if let Some(owner) = owner {
            if !owner.username.is_empty() && plain.eq_ignore_ascii_case(&owner.username) {
                errors.push("The password must not match the username.".to_string());
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(BadPassword::new(errors)) }
    }

    /// Random password that satisfies the strength rules for `for_user`.
    pub fn generate(&self, for_user: Option<&UserRecord>) -> String {
        let length = self.policy.generated_length.max(self.policy.min_length).max(3);
        let alphabet: Vec<u8> = [LOWERCASE, UPPERCASE, DIGITS].concat();
        let mut rng = rand::rng();

        loop {
            let mut chars: Vec<char> = [LOWERCASE, UPPERCASE, DIGITS]
                .iter()
                .map(|set| set[rng.random_range(0..set.len())] as char)
                .collect();
            while chars.len() < length {
                chars.push(alphabet[rng.random_range(0..alphabet.len())] as char);
            }
            chars.shuffle(&mut rng);

            let candidate: String = chars.into_iter().collect();
            if self.check_strength(&candidate, for_user).is_ok() {
                return candidate;
            }
        }
    }

    /// Validate, hash and store `plain` on `user`.
    pub fn encode_and_set(&self, user: &mut UserRecord, plain: &str) -> Result<(), PasswordError> {
        self.check_strength(plain, Some(user))?;

        if let Some(current) = &user.credential {
            if self.encoder.verify(plain, current)? {
                return Err(BadPassword::new(vec![
                    "The new password must differ from the current one.".to_string(),
                ])
                .into());
            }
        }

        user.credential = Some(self.encoder.encode(plain)?);
        user.password_changed_at = Some(Utc::now());
        tracing::info!(user = %user.id, "password set");
        Ok(())
    }

    /// [`encode_and_set`](Self::encode_and_set), then deliver the plaintext to the user.
    pub fn encode_and_set_then_notify(&self, user: &mut UserRecord, plain: &str) -> Result<(), PasswordError> {
        self.encode_and_set(user, plain)?;
        self.notify(user, plain)
    }

    /// Deliver an already stored password to its owner.
    pub fn notify(&self, user: &UserRecord, plain: &str) -> Result<(), PasswordError> {
        self.notifier
            .send_password(user, plain)
            .map_err(|err| PasswordError::Notification(format!("{err:#}")))?;
        tracing::info!(user = %user.id, "password sent to user");
        Ok(())
    }

    /// Impersonating admins and the root user are never asked to rotate.
    pub fn rotation_exempt(principal: &Principal) -> bool {
        principal.is_granted_any(&[Permission::PreviousAdmin, Permission::RootUser])
    }

    pub fn is_rotation_due(&self, principal: &Principal, user: &UserRecord) -> bool {
        self.is_rotation_due_at(principal, user, Utc::now())
    }

    pub fn is_rotation_due_at(&self, principal: &Principal, user: &UserRecord, now: DateTime<Utc>) -> bool {
        if Self::rotation_exempt(principal) {
            return false;
        }

        let (Some(days), Some(changed_at)) = (self.policy.rotation_period_days, user.password_changed_at) else {
            return false;
        };

        now - changed_at >= Duration::days(i64::from(days))
    }
}

/// Plaintext kept only as long as the request needs it.
pub type Plaintext = Zeroizing<String>;
