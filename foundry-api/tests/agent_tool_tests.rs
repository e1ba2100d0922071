//! Agent tools end to end: catalogue, submission, polling and results.

use foundry_api::tools::catalog::*;
use foundry_test_utils::*;
use serde_json::json;

#[path = "support/router.rs"]
mod router_support;
use router_support::{call_err, call_ok, router_for};

#[tokio::test]
async fn test_list_agents_reports_catalogue() {
    let harness = Harness::new().with_extraction_agents();
    let router = router_for(&harness);

    let listed = call_ok(&router, AGENTS_LIST_AGENTS, json!({})).await;
    assert_eq!(listed["count"], 2);
    assert_eq!(listed["agents"][0]["id"], "asst_case_study");
    assert_eq!(listed["agents"][0]["name"], "CaseStudyAgent");
}

#[tokio::test]
async fn test_invoke_poll_and_fetch_result() {
    let harness = Harness::new();
    harness.platform.add_agent("asst_helper", "Helper");
    harness
        .platform
        .script("asst_helper", RunScript::completes_with("All set."));
    let router = router_for(&harness);

    let handle = call_ok(
        &router,
        AGENTS_INVOKE_AGENT,
        json!({"agent_id": "asst_helper", "task": "Summarize", "file_context": "notes.md"}),
    )
    .await;
    let invocation_id = handle["invocation_id"].as_str().unwrap().to_string();
    assert_eq!(handle["agent_id"], "asst_helper");
    assert_eq!(
        harness.platform.submissions()[0].1,
        "Summarize\n\nAdditional context:\nnotes.md"
    );

    let mut seen = Vec::new();
    for _ in 0..3 {
        let status = call_ok(
            &router,
            AGENTS_GET_INVOCATION_STATUS,
            json!({"invocation_id": invocation_id}),
        )
        .await;
        assert_eq!(status["agent_id"], "asst_helper");
        assert!(status.get("submitted_at").is_some());
        seen.push(status["status"].as_str().unwrap().to_string());
    }
    assert_eq!(seen, ["queued", "in_progress", "completed"]);

    let result = call_ok(
        &router,
        AGENTS_GET_INVOCATION_RESULT,
        json!({"invocation_id": invocation_id}),
    )
    .await;
    assert_eq!(result["text"], "All set.");
    assert_eq!(result["file_references"], json!([]));
}

#[tokio::test]
async fn test_terminal_result_releases_the_handle() {
    let harness = Harness::new();
    harness.platform.add_agent("asst_helper", "Helper");
    harness
        .platform
        .script("asst_helper", RunScript::completes_with("Done."));
    let router = router_for(&harness);

    let handle = call_ok(
        &router,
        AGENTS_INVOKE_AGENT,
        json!({"agent_id": "asst_helper", "task": "Tidy up"}),
    )
    .await;
    let id = json!({"invocation_id": handle["invocation_id"]});
    assert_eq!(router.registered_handles().unwrap(), 1);

    for _ in 0..3 {
        call_ok(&router, AGENTS_GET_INVOCATION_STATUS, id.clone()).await;
    }
    call_ok(&router, AGENTS_GET_INVOCATION_RESULT, id.clone()).await;
    assert_eq!(router.registered_handles().unwrap(), 0);

    // The run is still reachable, just no longer attributed to its agent.
    let status = call_ok(&router, AGENTS_GET_INVOCATION_STATUS, id.clone()).await;
    assert_eq!(status["status"], "completed");
    assert!(status["agent_id"].is_null());
    let again = call_ok(&router, AGENTS_GET_INVOCATION_RESULT, id).await;
    assert_eq!(again["text"], "Done.");
}

#[tokio::test]
async fn test_pending_result_keeps_the_handle() {
    let harness = Harness::new();
    harness.platform.add_agent("asst_slow", "Slow");
    harness
        .platform
        .script("asst_slow", RunScript::statuses(&["queued", "in_progress"]));
    let router = router_for(&harness);

    let handle = call_ok(
        &router,
        AGENTS_INVOKE_AGENT,
        json!({"agent_id": "asst_slow", "task": "Wait"}),
    )
    .await;
    let id = json!({"invocation_id": handle["invocation_id"]});
    call_err(&router, AGENTS_GET_INVOCATION_RESULT, id.clone()).await;
    assert_eq!(router.registered_handles().unwrap(), 1);

    let status = call_ok(&router, AGENTS_GET_INVOCATION_STATUS, id).await;
    assert_eq!(status["agent_id"], "asst_slow");
}

#[tokio::test]
async fn test_result_before_completion_is_not_ready() {
    let harness = Harness::new();
    harness.platform.add_agent("asst_slow", "Slow");
    harness.platform.script(
        "asst_slow",
        RunScript::statuses(&["queued", "in_progress"]),
    );
    let router = router_for(&harness);

    let handle = call_ok(
        &router,
        AGENTS_INVOKE_AGENT,
        json!({"agent_id": "asst_slow", "task": "Wait"}),
    )
    .await;
    let err = call_err(
        &router,
        AGENTS_GET_INVOCATION_RESULT,
        json!({"invocation_id": handle["invocation_id"]}),
    )
    .await;
    assert_eq!(err.kind, ErrorKind::NotReady);
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_failed_run_reports_diagnostic() {
    let harness = Harness::new();
    harness.platform.add_agent("asst_broken", "Broken");
    harness
        .platform
        .script("asst_broken", RunScript::fails("rate limit exceeded"));
    let router = router_for(&harness);

    let handle = call_ok(
        &router,
        AGENTS_INVOKE_AGENT,
        json!({"agent_id": "asst_broken", "task": "Go"}),
    )
    .await;
    let id = json!({"invocation_id": handle["invocation_id"]});

    let status = call_ok(&router, AGENTS_GET_INVOCATION_STATUS, id.clone()).await;
    assert_eq!(status["status"], "queued");
    assert_eq!(status["is_terminal"], false);

    let err = call_err(&router, AGENTS_GET_INVOCATION_RESULT, id).await;
    assert_eq!(err.kind, ErrorKind::InvocationFailed);
    assert!(err.message.contains("rate limit exceeded"));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_ids_from_another_process_are_detached() {
    let harness = Harness::new();
    harness.platform.add_agent("asst_helper", "Helper");
    let issuing = router_for(&harness);
    let handle = call_ok(
        &issuing,
        AGENTS_INVOKE_AGENT,
        json!({"agent_id": "asst_helper", "task": "Ping"}),
    )
    .await;

    let other = router_for(&harness);
    let status = call_ok(
        &other,
        AGENTS_GET_INVOCATION_STATUS,
        json!({"invocation_id": handle["invocation_id"]}),
    )
    .await;
    assert_eq!(status["invocation_id"], handle["invocation_id"]);
    assert!(status["agent_id"].is_null());
    assert!(status.get("submitted_at").is_none());
}

#[tokio::test]
async fn test_bad_invocation_ids() {
    let router = router_for(&Harness::new());

    let err = call_err(
        &router,
        AGENTS_GET_INVOCATION_STATUS,
        json!({"invocation_id": "not-an-id"}),
    )
    .await;
    assert_eq!(err.kind, ErrorKind::InvalidInput);

    let err = call_err(
        &router,
        AGENTS_GET_INVOCATION_STATUS,
        json!({"invocation_id": "thread_gone::run_gone"}),
    )
    .await;
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_ids_with_path_characters_are_rejected_before_any_request() {
    let harness = Harness::new();
    let router = router_for(&harness);

    for bad in ["thread_1/../assistants::run_1", "t?x=1::r", "t::r#x"] {
        for tool in [AGENTS_GET_INVOCATION_STATUS, AGENTS_GET_INVOCATION_RESULT] {
            let err = call_err(&router, tool, json!({"invocation_id": bad})).await;
            assert_eq!(err.kind, ErrorKind::InvalidInput, "{tool} {bad}");
        }
    }
    assert_eq!(harness.platform.status_fetch_count(), 0);
}

#[tokio::test]
async fn test_submission_errors_keep_their_kind() {
    let harness = Harness::new();
    let router = router_for(&harness);

    let err = call_err(
        &router,
        AGENTS_INVOKE_AGENT,
        json!({"agent_id": "asst_ghost", "task": "Hello"}),
    )
    .await;
    assert_eq!(err.kind, ErrorKind::NotFound);

    let err = call_err(
        &router,
        AGENTS_INVOKE_AGENT,
        json!({"agent_id": "asst_ghost", "task": "   "}),
    )
    .await;
    assert_eq!(err.kind, ErrorKind::InvalidInput);

    harness.platform.set_unreachable(true);
    let err = call_err(&router, AGENTS_LIST_AGENTS, json!({})).await;
    assert_eq!(err.kind, ErrorKind::Transient);
    assert!(err.is_retryable());
}
