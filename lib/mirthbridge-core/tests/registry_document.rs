#![allow(missing_docs)]

use std::collections::BTreeSet;
use std::sync::Arc;

use mirthbridge_core::{OpenApiRegistry, RegistryError};
use rstest::rstest;

mod common;
pub use self::common::*;

fn set(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|value| (*value).to_string()).collect()
}

#[rstest]
fn test_domains_are_sorted_with_labels(registry: Arc<OpenApiRegistry>) {
    insta::assert_json_snapshot!(registry.list_domains(), @r#"
    [
      {
        "domain": "alerts",
        "label": "Alerts"
      },
      {
        "domain": "channels",
        "label": "Channels"
      },
      {
        "domain": "connector_services",
        "label": "Connector Services"
      },
      {
        "domain": "messages",
        "label": "Messages"
      },
      {
        "domain": "untagged",
        "label": "untagged"
      },
      {
        "domain": "users",
        "label": "Users"
      }
    ]
    "#);
    assert_eq!(registry.operation_count(), 11);
}

#[rstest]
fn test_actions_are_sorted(registry: Arc<OpenApiRegistry>) {
    let actions = registry
        .list_actions("channels")
        .into_iter()
        .map(|summary| summary.action)
        .collect::<Vec<_>>();

    assert_eq!(
        actions,
        vec!["createChannel", "getChannel", "getChannels", "removeChannel"]
    );
    assert!(registry.list_actions("reports").is_empty());
}

#[rstest]
fn test_operation_without_id_gets_fallback_action(registry: Arc<OpenApiRegistry>) {
    let operation = registry
        .get_operation("users", "get_users_userid_loggedin")
        .expect("fallback action registered");

    assert_eq!(operation.operation_id, "get_users_userid_loggedin");
    assert_eq!(operation.path, "/users/{userId}/loggedIn");
    assert_eq!(operation.required_path_params, set(&["userId"]));
}

#[rstest]
fn test_required_parameters_merge_path_item_and_operation(registry: Arc<OpenApiRegistry>) {
    let operation = registry
        .get_operation("messages", "getMessages")
        .expect("getMessages registered");

    assert_eq!(operation.required_path_params, set(&["channelId"]));
    assert_eq!(operation.required_query_params, set(&["limit"]));
    assert!(!operation.body_required);
}

#[rstest]
fn test_request_body_reference_is_resolved(registry: Arc<OpenApiRegistry>) {
    let operation = registry
        .get_operation("channels", "createChannel")
        .expect("createChannel registered");

    assert!(operation.body_required);
    assert_eq!(
        operation.request_media_types,
        vec!["application/json", "application/xml"]
    );
    assert_eq!(operation.body_schema_types, set(&["object"]));
    assert_eq!(operation.body_required_fields, set(&["id", "name"]));
    assert!(operation.expects_object_body());
}

#[rstest]
fn test_alternative_schemas_contribute_types(registry: Arc<OpenApiRegistry>) {
    let operation = registry
        .get_operation("alerts", "createAlert")
        .expect("createAlert registered");

    assert_eq!(operation.body_schema_types, set(&["array", "object"]));
    assert!(operation.body_required_fields.is_empty());

    let process = registry
        .get_operation("messages", "processMessage")
        .expect("processMessage registered");
    assert_eq!(process.request_media_types, vec!["text/plain"]);
    assert_eq!(process.body_schema_types, set(&["string"]));
}

#[rstest]
fn test_extension_keys_are_not_operations(registry: Arc<OpenApiRegistry>) {
    assert!(!registry.contains_domain("system"));
    assert!(registry.get_operation("untagged", "getInfo").is_some());
}

#[test]
fn test_load_reports_missing_file() {
    let result = OpenApiRegistry::load("does/not/exist/openapi.json");

    assert!(matches!(result, Err(RegistryError::Read { .. })));
}

#[test]
fn test_load_reports_invalid_json() -> anyhow::Result<()> {
    let dir = std::env::temp_dir().join(format!("mirthbridge-registry-{}", std::process::id()));
    std::fs::create_dir_all(&dir)?;
    let path = dir.join("invalid.json");
    std::fs::write(&path, "{ not json")?;

    let result = OpenApiRegistry::load(&path);

    assert!(matches!(result, Err(RegistryError::Parse { .. })));
    std::fs::remove_dir_all(&dir)?;
    Ok(())
}

#[rstest]
fn test_loading_twice_is_idempotent(registry: Arc<OpenApiRegistry>) -> anyhow::Result<()> {
    let again = OpenApiRegistry::load(openapi_fixture())?;

    assert_eq!(*registry, again);
    Ok(())
}
