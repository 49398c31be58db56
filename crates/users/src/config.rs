//! Configuration for the users endpoints.
//!
//! Values come from `BACKOFFICE_*` environment variables; anything missing or
//! unparsable falls back to the default (with a warning for the latter).

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use backoffice_core::UserId;

/// Which letters a password must contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LetterRequirement {
    NotRequired,
    #[default]
    Any,
    Capital,
    CapitalAndNonCapital,
}

impl FromStr for LetterRequirement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "not_required" | "none" | "false" => Ok(Self::NotRequired),
            "any" | "true" => Ok(Self::Any),
            "capital" => Ok(Self::Capital),
            "capital_and_non_capital" => Ok(Self::CapitalAndNonCapital),
            other => Err(format!("unknown letter requirement '{other}'")),
        }
    }
}

/// Password strength and rotation rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordPolicyConfig {
    pub min_length: usize,
    pub number_required: bool,
    pub letter_required: LetterRequirement,
    /// Days after which a password must be changed; `None` disables rotation.
    pub rotation_period_days: Option<u32>,
    pub generated_length: usize,
}

impl Default for PasswordPolicyConfig {
    fn default() -> Self {
        Self {
            min_length: 8,
            number_required: true,
            letter_required: LetterRequirement::Any,
            rotation_period_days: Some(90),
            generated_length: 12,
        }
    }
}

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HashingConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsersConfig {
    pub password: PasswordPolicyConfig,
    pub hashing: HashingConfig,
    /// The built-in super administrator, protected from removal and disabling.
    pub root_user_id: Option<UserId>,
}

impl UsersConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (environment, test fixtures, ...).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let rotation_days = parse_or(
            &lookup,
            "BACKOFFICE_PASSWORD_ROTATION_DAYS",
            defaults.password.rotation_period_days.unwrap_or(0),
        );

        Self {
            password: PasswordPolicyConfig {
                min_length: parse_or(&lookup, "BACKOFFICE_PASSWORD_MIN_LENGTH", defaults.password.min_length),
                number_required: parse_or(
                    &lookup,
                    "BACKOFFICE_PASSWORD_NUMBER_REQUIRED",
                    defaults.password.number_required,
                ),
                letter_required: parse_or(
                    &lookup,
                    "BACKOFFICE_PASSWORD_LETTER_REQUIRED",
                    defaults.password.letter_required,
                ),
                rotation_period_days: (rotation_days > 0).then_some(rotation_days),
                generated_length: parse_or(
                    &lookup,
                    "BACKOFFICE_GENERATED_PASSWORD_LENGTH",
                    defaults.password.generated_length,
                ),
            },
            hashing: HashingConfig {
                memory_kib: parse_or(&lookup, "BACKOFFICE_ARGON2_MEMORY_KIB", defaults.hashing.memory_kib),
                iterations: parse_or(&lookup, "BACKOFFICE_ARGON2_ITERATIONS", defaults.hashing.iterations),
                parallelism: parse_or(&lookup, "BACKOFFICE_ARGON2_PARALLELISM", defaults.hashing.parallelism),
            },
            root_user_id: lookup("BACKOFFICE_ROOT_USER_ID").and_then(|raw| match raw.parse() {
                Ok(id) => Some(id),
                Err(err) => {
                    tracing::warn!(%err, "BACKOFFICE_ROOT_USER_ID is not a valid id; ignoring");
                    None
                }
            }),
        }
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: core::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|err| {
            tracing::warn!(key, value = %raw, %err, "invalid configuration value; using default");
            default
        }),
    }
}
