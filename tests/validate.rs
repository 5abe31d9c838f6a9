use totoro::error::DeployError;
use totoro::settings::Settings;
use totoro::validate::{Field, choices, validate};

fn settings() -> Settings {
    Settings::from_yaml(
        "\
repository: portalacr.azurecr.io/portal
hosts:
  staging: deploy@10.0.0.4
  production: deploy@10.0.0.5
services: [web, worker, nginx]
profiles: [all, web]
dbs: [portal, analytics]
spaces:
  region_name: fra1
  endpoint_url: https://fra1.digitaloceanspaces.com
  bucket: backups
  prefix: portal
  resources: [db, translations, files]
  downloads_dir: downloads
",
    )
    .unwrap()
}

#[test]
fn accepts_configured_values() {
    let s = settings();
    assert!(validate(&s, Field::Service, "worker").is_ok());
    assert!(validate(&s, Field::Profile, "all").is_ok());
    assert!(validate(&s, Field::Db, "analytics").is_ok());
    assert!(validate(&s, Field::Resource, "translations").is_ok());
    assert!(validate(&s, Field::Context, "production").is_ok());
}

#[test]
fn default_context_is_always_valid() {
    assert!(validate(&settings(), Field::Context, "default").is_ok());
}

#[test]
fn context_choices_append_default() {
    assert_eq!(
        choices(&settings(), Field::Context),
        vec!["staging", "production", "default"]
    );
}

#[test]
fn context_choices_do_not_duplicate_default_host() {
    let s = Settings::from_yaml("hosts:\n  default: 1.2.3.4\n  production: 5.6.7.8\n").unwrap();
    assert_eq!(choices(&s, Field::Context), vec!["default", "production"]);
}

#[test]
fn rejection_carries_field_value_and_choices() {
    let err = validate(&settings(), Field::Service, "api").unwrap_err();
    match err {
        DeployError::InvalidField {
            field,
            value,
            choices,
        } => {
            assert_eq!(field, "service");
            assert_eq!(value, "api");
            assert_eq!(choices, vec!["web", "worker", "nginx"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn rejection_message_lists_choices_in_configured_order() {
    let err = validate(&settings(), Field::Resource, "logs").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid resource: logs. Choose from db, translations, files"
    );
}

#[test]
fn values_are_case_sensitive() {
    assert!(validate(&settings(), Field::Service, "Web").is_err());
}

#[test]
fn missing_spaces_section_rejects_every_resource() {
    let s = Settings::from_yaml("services: [web]").unwrap();
    let err = validate(&s, Field::Resource, "db").unwrap_err();
    assert_eq!(err.to_string(), "Invalid resource: db. Choose from ");
}

#[test]
fn field_names() {
    assert_eq!(Field::Context.to_string(), "context");
    assert_eq!(Field::Db.to_string(), "db");
}
