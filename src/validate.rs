use std::fmt;

use crate::error::{DeployError, DeployResult};
use crate::settings::Settings;

/// A user-supplied identifier checked against settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Context,
    Service,
    Profile,
    Resource,
    Db,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Context => "context",
            Self::Service => "service",
            Self::Profile => "profile",
            Self::Resource => "resource",
            Self::Db => "db",
        })
    }
}

/// Valid values for `field`, in configured order.
#[must_use]
pub fn choices(settings: &Settings, field: Field) -> Vec<&str> {
    match field {
        Field::Context => settings.context_names(),
        Field::Service => as_strs(&settings.services),
        Field::Profile => as_strs(&settings.profiles),
        Field::Db => as_strs(&settings.dbs),
        Field::Resource => settings
            .spaces
            .as_ref()
            .map(|s| as_strs(&s.resources))
            .unwrap_or_default(),
    }
}

fn as_strs(values: &[String]) -> Vec<&str> {
    values.iter().map(String::as_str).collect()
}

/// Reject `value` unless it is one of the configured choices.
///
/// ```
/// use totoro::settings::Settings;
/// use totoro::validate::{Field, validate};
///
/// let settings = Settings::from_yaml("profiles: [all, web]").unwrap();
/// assert!(validate(&settings, Field::Profile, "web").is_ok());
///
/// let err = validate(&settings, Field::Profile, "db").unwrap_err();
/// assert_eq!(err.to_string(), "Invalid profile: db. Choose from all, web");
/// ```
pub fn validate(settings: &Settings, field: Field, value: &str) -> DeployResult<()> {
    let valid = choices(settings, field);
    if valid.contains(&value) {
        return Ok(());
    }
    Err(DeployError::InvalidField {
        field: field.to_string(),
        value: value.to_string(),
        choices: valid.into_iter().map(str::to_string).collect(),
    })
}
