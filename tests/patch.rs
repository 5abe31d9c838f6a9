use totoro::error::DeployError;
use totoro::patch::{LinePatcher, Reserializer, SettingsWriter};
use totoro::settings::{DeploymentTarget, Settings};

fn target(host: &str, engine: &str, env_file: &str) -> DeploymentTarget {
    DeploymentTarget {
        host: host.into(),
        engine: engine.into(),
        env_file: env_file.into(),
    }
}

const DOCUMENT: &str = "\
# Totoro settings
repository: portalacr.azurecr.io/portal

hosts:
  default: 1.2.3.4   # dev box
  production: deploy@10.0.0.5

deployment_targets:
  main:
    host: production
    engine: master
    env_file: .envs/.env-production

# Backups
spaces:
  region_name: fra1
  endpoint_url: https://fra1.digitaloceanspaces.com
  bucket: backups
  prefix: portal
  resources: [db]
  downloads_dir: downloads
";

#[test]
fn inserts_at_end_of_section() {
    let patched = LinePatcher
        .append_target(DOCUMENT, "develop", &target("default", "develop", ".envs/.env-dev"))
        .unwrap();

    let expected = DOCUMENT.replace(
        "    env_file: .envs/.env-production\n\n# Backups",
        "    env_file: .envs/.env-production\n  \
         develop:\n    host: default\n    engine: develop\n    env_file: .envs/.env-dev\n\n# Backups",
    );
    assert_eq!(patched, expected);
}

#[test]
fn everything_outside_the_section_is_untouched() {
    let patched = LinePatcher
        .append_target(DOCUMENT, "develop", &target("default", "develop", ".envs/.env-dev"))
        .unwrap();

    let (before, _) = DOCUMENT.split_once("deployment_targets:").unwrap();
    let (_, after) = DOCUMENT.split_once("\n\n# Backups").unwrap();
    assert!(patched.starts_with(before));
    assert!(patched.ends_with(after));
}

#[test]
fn reloads_with_old_and_new_targets() {
    let patched = LinePatcher
        .append_target(DOCUMENT, "release-1", &target("default", "master", ".envs/.env-production"))
        .unwrap();

    let settings = Settings::from_yaml(&patched).unwrap();
    let tags: Vec<&str> = settings.deployment_targets.keys().map(String::as_str).collect();
    assert_eq!(tags, vec!["main", "release-1"]);
    assert_eq!(
        settings.deployment_target("release-1"),
        Some(&target("default", "master", ".envs/.env-production"))
    );
    assert_eq!(settings.hosts.len(), 2);
    assert_eq!(settings.spaces.unwrap().bucket, "backups");
}

#[test]
fn section_running_to_end_of_document() {
    let doc = "repository: r\ndeployment_targets:\n  main:\n    host: default\n    env_file: .env";
    let patched = LinePatcher
        .append_target(doc, "dev", &target("default", "master", ".env"))
        .unwrap();
    assert_eq!(
        patched,
        "repository: r\ndeployment_targets:\n  main:\n    host: default\n    env_file: .env\n  \
         dev:\n    host: default\n    engine: master\n    env_file: .env\n"
    );
}

#[test]
fn empty_inline_section_is_opened() {
    let doc = "hosts:\n  default: 1.2.3.4\ndeployment_targets: {}\nprofiles: [all]\n";
    let patched = LinePatcher
        .append_target(doc, "main", &target("default", "master", ".env"))
        .unwrap();
    assert_eq!(
        patched,
        "hosts:\n  default: 1.2.3.4\ndeployment_targets:\n  main:\n    host: default\n    \
         engine: master\n    env_file: .env\nprofiles: [all]\n"
    );
}

#[test]
fn null_section_is_opened() {
    let doc = "deployment_targets:\nprofiles: [all]\n";
    let patched = LinePatcher
        .append_target(doc, "main", &target("default", "master", ".env"))
        .unwrap();
    let settings = Settings::from_yaml(&patched).unwrap();
    assert_eq!(settings.deployment_targets.len(), 1);
    assert_eq!(settings.profiles, vec!["all"]);
}

#[test]
fn missing_section_is_appended() {
    let doc = "repository: r\nprofiles: [all]";
    let patched = LinePatcher
        .append_target(doc, "main", &target("default", "master", ".env"))
        .unwrap();
    assert_eq!(
        patched,
        "repository: r\nprofiles: [all]\ndeployment_targets:\n  main:\n    host: default\n    \
         engine: master\n    env_file: .env\n"
    );
}

#[test]
fn follows_existing_indentation() {
    let doc = "deployment_targets:\n    main:\n        host: default\n        env_file: .env\n";
    let patched = LinePatcher
        .append_target(doc, "dev", &target("default", "master", ".env"))
        .unwrap();
    assert!(patched.ends_with(
        "    dev:\n        host: default\n        engine: master\n        env_file: .env\n"
    ));
}

#[test]
fn indented_comments_stay_inside_the_section() {
    let doc = "deployment_targets:\n  main:\n    host: default\n    env_file: .env\n  # staging next\nspaces: null\n";
    let patched = LinePatcher
        .append_target(doc, "staging", &target("default", "master", ".env"))
        .unwrap();
    assert!(patched.contains("  # staging next\n  staging:\n"));
    assert!(patched.ends_with("spaces: null\n"));
}

#[test]
fn keeps_crlf_line_endings() {
    let doc = "deployment_targets:\r\n  main:\r\n    host: default\r\n    env_file: .env\r\nprofiles: [all]\r\n";
    let patched = LinePatcher
        .append_target(doc, "dev", &target("default", "master", ".env"))
        .unwrap();
    assert!(patched.contains("  dev:\r\n    host: default\r\n"));
    assert!(!patched.replace("\r\n", "").contains('\n'));
}

#[test]
fn values_needing_quotes_survive_reload() {
    let doc = "deployment_targets: {}\n";
    let patched = LinePatcher
        .append_target(doc, "yes", &target("default", "1.0", "envs/#prod"))
        .unwrap();
    let settings = Settings::from_yaml(&patched).unwrap();
    assert_eq!(
        settings.deployment_target("yes"),
        Some(&target("default", "1.0", "envs/#prod"))
    );
}

#[test]
fn inline_mapping_is_refused() {
    let doc = "deployment_targets: {main: {host: default, env_file: .env}}\n";
    let err = LinePatcher
        .append_target(doc, "dev", &target("default", "master", ".env"))
        .unwrap_err();
    assert!(matches!(err, DeployError::SettingsPatch(_)));
}

#[test]
fn existing_tag_is_refused() {
    let err = LinePatcher
        .append_target(DOCUMENT, "main", &target("default", "master", ".env"))
        .unwrap_err();
    assert!(matches!(err, DeployError::Other(_)));

    let err = Reserializer
        .append_target(DOCUMENT, "main", &target("default", "master", ".env"))
        .unwrap_err();
    assert!(matches!(err, DeployError::Other(_)));
}

#[test]
fn reserializer_handles_inline_mapping() {
    let doc = "repository: r\ndeployment_targets: {main: {host: default, env_file: .env}}\n";
    let patched = Reserializer
        .append_target(doc, "dev", &target("default", "develop", ".env.dev"))
        .unwrap();
    let settings = Settings::from_yaml(&patched).unwrap();
    assert_eq!(settings.repository, "r");
    assert_eq!(settings.deployment_targets.len(), 2);
    assert_eq!(settings.deployment_target("dev").unwrap().engine, "develop");
}

#[test]
fn reserializer_creates_missing_section() {
    let patched = Reserializer
        .append_target("repository: r\n", "main", &target("default", "master", ".env"))
        .unwrap();
    let settings = Settings::from_yaml(&patched).unwrap();
    assert_eq!(settings.deployment_target("main").unwrap().host, "default");
}

#[test]
fn numeric_tag_already_present_is_refused() {
    let doc = "deployment_targets:\n  1:\n    host: default\n    engine: master\n    env_file: .env\n";
    let new = target("default", "master", ".env");

    let err = LinePatcher.append_target(doc, "1", &new).unwrap_err();
    assert!(matches!(err, DeployError::Other(_)));
    assert!(Reserializer.append_target(doc, "1", &new).is_err());
}
