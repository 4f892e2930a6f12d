#![allow(missing_docs)]

use std::sync::{Arc, Mutex};

use mirthbridge_core::{
    ApiClient, Dispatcher, ErrorKind, OpenApiRegistry, ProgressReporter, ToolError, ToolHost,
};
use rstest::rstest;
use serde_json::json;

mod common;
pub use self::common::*;

#[derive(Debug, Default)]
struct RecordingProgress {
    messages: Mutex<Vec<String>>,
}

impl ProgressReporter for RecordingProgress {
    async fn info(&self, message: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message.to_string());
        }
    }
}

fn host(upstream: &Upstream, registry: Arc<OpenApiRegistry>) -> ToolHost<Arc<ApiClient>> {
    let client = Arc::new(client_for(upstream));
    ToolHost::new(Dispatcher::new(registry, client))
}

#[rstest]
#[tokio::test]
async fn test_domain_tool_reaches_upstream(
    #[future] upstream: Upstream,
    registry: Arc<OpenApiRegistry>,
) -> anyhow::Result<()> {
    let upstream = upstream.await;
    let host = host(&upstream, registry);

    let envelope = host
        .call_domain_tool(
            "channels",
            json!({
                "action": "getChannel",
                "path_params": { "channelId": "adt inbound/1" },
                "query": { "status": ["SENT", "ERROR"], "limit": 5 },
                "headers_override": { "X-Trace-Id": "trace-42" }
            }),
        )
        .await?;

    insta::assert_json_snapshot!(envelope, @r#"
    {
      "status": 200,
      "domain": "channels",
      "action": "getChannel",
      "method": "GET",
      "path": "/channels/{channelId}",
      "data": {
        "id": "adt inbound/1",
        "name": "ADT Inbound",
        "query": "status=SENT&status=ERROR&limit=5",
        "trace": "trace-42",
        "requestedWith": "OpenAPI"
      },
      "error": null
    }
    "#);
    assert!(host.dispatcher().executor().is_authenticated());

    Ok(())
}

#[rstest]
#[tokio::test]
async fn test_json_body_is_forwarded(
    #[future] upstream: Upstream,
    registry: Arc<OpenApiRegistry>,
) -> anyhow::Result<()> {
    let upstream = upstream.await;
    let host = host(&upstream, registry);

    let result = host
        .call(
            "channels",
            json!({
                "action": "createChannel",
                "body": { "id": "c-1", "name": "Lab Results" }
            }),
        )
        .await?;

    assert_eq!(result["status"], 201);
    assert_eq!(result["data"]["created"]["name"], "Lab Results");
    assert_eq!(result["data"]["contentType"], "application/json");

    Ok(())
}

#[rstest]
#[case::missing_path_param(
    json!({ "action": "getChannel" }),
    400,
    ErrorKind::ValidationError
)]
#[case::missing_required_body_field(
    json!({ "action": "createChannel", "body": { "id": "c-1" } }),
    400,
    ErrorKind::MalformedBody
)]
#[case::body_not_an_object(
    json!({ "action": "createChannel", "body": "<channel/>" }),
    400,
    ErrorKind::MalformedBody
)]
#[case::unsupported_media_type(
    json!({
        "action": "createChannel",
        "body": { "id": "c-1", "name": "Lab" },
        "headers_override": { "Content-Type": "text/plain" }
    }),
    415,
    ErrorKind::UnsupportedMediaType
)]
#[case::unknown_action(
    json!({ "action": "deployChannels" }),
    404,
    ErrorKind::UnknownAction
)]
#[tokio::test]
async fn test_rejected_invocations_never_reach_upstream(
    #[future] upstream: Upstream,
    registry: Arc<OpenApiRegistry>,
    #[case] arguments: serde_json::Value,
    #[case] status: u16,
    #[case] kind: ErrorKind,
) -> anyhow::Result<()> {
    let upstream = upstream.await;
    let host = host(&upstream, registry);

    let envelope = host.call_domain_tool("channels", arguments).await?;

    assert_eq!(envelope.status, status);
    assert_eq!(envelope.error().map(|error| error.kind), Some(kind));
    assert_eq!(upstream.logins(), 0, "no session opened");
    assert_eq!(upstream.channel_calls(), 0);

    Ok(())
}

#[rstest]
#[tokio::test]
async fn test_progress_is_reported_before_execution(
    #[future] upstream: Upstream,
    registry: Arc<OpenApiRegistry>,
) -> anyhow::Result<()> {
    let upstream = upstream.await;
    let host = host(&upstream, registry);
    let progress = RecordingProgress::default();

    let envelope = host
        .call_domain_tool_with_progress(
            "channels",
            json!({ "action": "removeChannel", "path_params": { "channelId": 7 } }),
            &progress,
        )
        .await?;

    assert_eq!(envelope.status, 204);
    let messages = progress
        .messages
        .lock()
        .map(|messages| messages.clone())
        .unwrap_or_default();
    assert_eq!(
        messages,
        vec!["Dispatching channels.removeChannel -> DELETE /channels/{channelId}".to_string()]
    );

    Ok(())
}

#[rstest]
#[tokio::test]
async fn test_unknown_domain_tool_is_an_error(
    #[future] upstream: Upstream,
    registry: Arc<OpenApiRegistry>,
) -> anyhow::Result<()> {
    let upstream = upstream.await;
    let host = host(&upstream, registry);

    let result = host
        .call_domain_tool("reports", json!({ "action": "getReports" }))
        .await;

    assert!(matches!(result, Err(ToolError::UnknownTool { ref name }) if name == "reports"));
    let listing = host.list_actions("reports");
    assert!(listing.actions.is_empty());
    assert!(listing.error.is_some());

    Ok(())
}
