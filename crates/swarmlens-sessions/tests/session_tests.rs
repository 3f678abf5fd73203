use std::fs;
use std::path::Path;

use chrono::{DateTime, Duration, TimeZone, Utc};
use swarmlens_sessions::{
    EngineConfig, SessionStore, SessionsError, SourceFilter, SourceType, UNTITLED,
};
use tempfile::TempDir;

/// Helper: write a structured session directory.
fn write_structured(home: &Path, project: &str, session: &str, metadata: &str, log: Option<(&str, &str)>) {
    let dir = home
        .join(".claude-swarm")
        .join("sessions")
        .join(project)
        .join(session);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("session_metadata.json"), metadata).unwrap();
    if let Some((name, contents)) = log {
        fs::write(dir.join(name), contents).unwrap();
    }
}

/// Helper: drop a liveness marker for a structured session.
fn mark_running(home: &Path, session: &str) {
    let run = home.join(".claude-swarm").join("run");
    fs::create_dir_all(&run).unwrap();
    fs::write(run.join(session), "").unwrap();
}

/// Helper: write a conversation log.
fn write_conversation(home: &Path, project: &str, session: &str, contents: &str) {
    let dir = home.join(".claude").join("projects").join(project);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(format!("{}.jsonl", session)), contents).unwrap();
}

fn user_turn(uuid: &str, ts: &str, text: &str) -> String {
    serde_json::json!({
        "type": "user",
        "uuid": uuid,
        "timestamp": ts,
        "cwd": "/home/user/webapp",
        "message": {"role": "user", "content": text}
    })
    .to_string()
}

fn assistant_turn(uuid: &str, ts: &str) -> String {
    serde_json::json!({
        "type": "assistant",
        "uuid": uuid,
        "timestamp": ts,
        "message": {"role": "assistant", "content": [{"type": "text", "text": "On it."}]}
    })
    .to_string()
}

/// Helper: a home directory with both stores populated.
fn create_test_home() -> TempDir {
    let home = TempDir::new().unwrap();
    let root = home.path();

    // Structured session 1: running, NDJSON log with a signature-bearing event
    write_structured(
        root,
        "swarm-alpha",
        "sess-running",
        r#"{"swarm_name":"Alpha Team","start_directory":"/srv/alpha","timestamp":"2026-01-20T10:00:00Z"}"#,
        Some((
            "session.log.json",
            concat!(
                r#"{"timestamp":"2026-01-20T10:00:01Z","instance":"lead","event":{"type":"request","prompt":"plan"}}"#,
                "\n",
                r#"{"timestamp":"2026-01-20T10:00:02Z","instance":"lead","event":{"type":"assistant","message":{"content":[{"type":"thinking","signature":"EqQBCkYIBRgCKkBsignature-tail-that-is-long"}]}}}"#,
                "\n",
                r#"{"timestamp":"2026-01-20T10:00:03Z","instance":"#,
                "\n",
                r#"{"timestamp":"2026-01-20T10:00:04Z","instance":"backend","event":{"type":"result"}}"#,
                "\n",
            ),
        )),
    );
    mark_running(root, "sess-running");

    // Structured session 2: finished, legacy text log, title from the log
    write_structured(
        root,
        "swarm-alpha",
        "sess-legacy",
        r#"{"timestamp":"2026-01-22T09:00:00Z","root_directory":"/srv/beta"}"#,
        Some((
            "session.log",
            concat!(
                "Swarm starting up\n",
                r#"I, [2026-01-22T09:00:01.000000 #77]  INFO -- lead: {"type":"user","timestamp":"2026-01-22T09:00:01Z","message":{"content":"Ship the release notes"}}"#,
                "\n",
                r#"I, [2026-01-22T09:00:02.000000 #77]  INFO -- lead: {"type": broken"#,
                "}\n",
            ),
        )),
    );

    // Structured session 3: metadata is corrupt
    write_structured(root, "swarm-beta", "sess-corrupt", "{not json", None);

    // Structured session 4: directory without metadata
    fs::create_dir_all(
        root.join(".claude-swarm/sessions/swarm-beta/sess-empty-dir"),
    )
    .unwrap();

    // Conversation 1: summary titled
    write_conversation(
        root,
        "-home-user-webapp",
        "conv-summary",
        &[
            r#"{"type":"summary","summary":"Fix flaky login test","leafUuid":"l1"}"#.to_string(),
            user_turn("u1", "2026-01-21T08:00:00Z", "the login test is flaky"),
            assistant_turn("a1", "2026-01-21T08:00:05Z"),
        ]
        .join("\n"),
    );

    // Conversation 2: titled from first user message
    write_conversation(
        root,
        "-home-user-webapp",
        "conv-message",
        &[
            user_turn("u2", "2026-01-23T08:00:00Z", "# Add dark mode\nwith a toggle"),
            assistant_turn("a2", "2026-01-23T08:00:05Z"),
            user_turn("u3", "2026-01-23T08:01:00Z", "thanks"),
        ]
        .join("\n"),
    );

    // Conversation 3: warmup probe
    write_conversation(
        root,
        "-home-user-webapp",
        "conv-warmup",
        &[
            user_turn("u4", "2026-01-24T08:00:00Z", "Warmup"),
            assistant_turn("a4", "2026-01-24T08:00:01Z"),
        ]
        .join("\n"),
    );

    // Conversation 4: no turns at all
    write_conversation(
        root,
        "-home-user-other",
        "conv-no-turns",
        r#"{"type":"file-history-snapshot","messageId":"m1"}"#,
    );

    home
}

fn store_for(home: &TempDir) -> SessionStore {
    SessionStore::new(&EngineConfig::with_home(home.path().to_path_buf()))
}

/// A clock far enough ahead that no conversation log counts as recently written.
fn later() -> DateTime<Utc> {
    Utc::now() + Duration::hours(1)
}

// ============================================================
// Listing tests
// ============================================================

#[tokio::test]
async fn test_list_all_merges_both_stores() {
    let home = create_test_home();
    let store = store_for(&home);

    let records = store.list_sessions_at(SourceFilter::All, later()).await;
    let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();

    assert_eq!(
        ids,
        vec![
            "structured:swarm-alpha/sess-running",
            "conversation:-home-user-webapp/conv-message",
            "structured:swarm-alpha/sess-legacy",
            "conversation:-home-user-webapp/conv-summary",
        ]
    );
    assert!(records[0].active);
    assert!(records[1..].iter().all(|r| !r.active));
}

#[tokio::test]
async fn test_list_structured_record_fields() {
    let home = create_test_home();
    let store = store_for(&home);

    let records = store
        .list_sessions_at(SourceFilter::StructuredOnly, later())
        .await;
    assert_eq!(records.len(), 2);

    let running = &records[0];
    assert_eq!(running.source_type, SourceType::Structured);
    assert_eq!(running.project_key, "swarm-alpha");
    assert_eq!(running.session_key, "sess-running");
    assert_eq!(running.title, "Alpha Team");
    assert_eq!(
        running.start_time,
        Utc.with_ymd_and_hms(2026, 1, 20, 10, 0, 0).unwrap()
    );
    assert_eq!(running.message_count, None);
    assert_eq!(running.extra["start_directory"], "/srv/alpha");

    let legacy = &records[1];
    assert!(!legacy.active);
    assert_eq!(legacy.title, "Ship the release notes");
    assert_eq!(legacy.root_directory.as_deref(), Some("/srv/beta"));
}

#[tokio::test]
async fn test_list_conversation_record_fields() {
    let home = create_test_home();
    let store = store_for(&home);

    let records = store
        .list_sessions_at(SourceFilter::ConversationOnly, later())
        .await;
    assert_eq!(records.len(), 2);

    let message = &records[0];
    assert_eq!(message.title, "Add dark mode");
    assert_eq!(message.message_count, Some(3));
    assert_eq!(message.root_directory.as_deref(), Some("/home/user/webapp"));
    assert_eq!(
        message.start_time,
        Utc.with_ymd_and_hms(2026, 1, 23, 8, 0, 0).unwrap()
    );

    let summary = &records[1];
    assert_eq!(summary.title, "Fix flaky login test");
    assert_eq!(summary.message_count, Some(2));
}

#[tokio::test]
async fn test_warmup_session_excluded() {
    let home = create_test_home();
    let store = store_for(&home);

    let records = store
        .list_sessions_at(SourceFilter::ConversationOnly, later())
        .await;
    assert!(records.iter().all(|r| r.session_key != "conv-warmup"));
}

#[tokio::test]
async fn test_session_without_turns_excluded() {
    let home = create_test_home();
    let store = store_for(&home);

    let records = store.list_sessions_at(SourceFilter::All, later()).await;
    assert!(records.iter().all(|r| r.session_key != "conv-no-turns"));
}

#[tokio::test]
async fn test_broken_structured_sessions_skipped() {
    let home = create_test_home();
    let store = store_for(&home);

    let records = store
        .list_sessions_at(SourceFilter::StructuredOnly, later())
        .await;
    assert!(records.iter().all(|r| r.project_key != "swarm-beta"));
}

#[tokio::test]
async fn test_recent_conversation_is_active() {
    let home = create_test_home();
    let store = store_for(&home);

    let records = store
        .list_sessions_at(SourceFilter::ConversationOnly, Utc::now())
        .await;
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.active));
}

#[tokio::test]
async fn test_missing_store_contributes_nothing() {
    let home = TempDir::new().unwrap();
    write_conversation(
        home.path(),
        "-proj",
        "only",
        &[user_turn("u", "2026-01-01T00:00:00Z", "hello")].join("\n"),
    );
    let store = store_for(&home);

    let records = store.list_sessions_at(SourceFilter::All, later()).await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, "conversation:-proj/only");
}

#[tokio::test]
async fn test_empty_home_lists_nothing() {
    let home = TempDir::new().unwrap();
    let store = store_for(&home);

    assert!(store.list_sessions(SourceFilter::All).await.is_empty());
}

#[tokio::test]
async fn test_long_listing_interleaves_sources() {
    let home = TempDir::new().unwrap();
    let root = home.path();

    for n in 0..30 {
        let session = format!("swarm-{:02}", n);
        let metadata = format!(
            r#"{{"swarm_name":"swarm {}","timestamp":"2026-01-10T10:{:02}:00Z"}}"#,
            n, n
        );
        write_structured(root, "team", &session, &metadata, None);
        mark_running(root, &session);
    }
    for n in 0..5 {
        let ts = format!("2026-01-0{}T10:00:00Z", n + 1);
        write_conversation(
            root,
            "-proj",
            &format!("conv-{}", n),
            &[user_turn(&format!("u{}", n), &ts, "go")].join("\n"),
        );
    }
    let store = store_for(&home);

    let records = store.list_sessions_at(SourceFilter::All, Utc::now()).await;
    assert_eq!(records.len(), 35);
    assert!(records.iter().all(|r| r.active));

    let head: Vec<SourceType> = records[..10].iter().map(|r| r.source_type).collect();
    for (i, source) in head.iter().enumerate() {
        let expected = if i % 2 == 0 {
            SourceType::Structured
        } else {
            SourceType::Conversation
        };
        assert_eq!(*source, expected, "position {}", i);
    }
    assert!(records[10..]
        .iter()
        .all(|r| r.source_type == SourceType::Structured));
    assert_eq!(records[0].session_key, "swarm-29");
    assert_eq!(records[1].session_key, "conv-4");
}

// ============================================================
// Detail tests
// ============================================================

#[tokio::test]
async fn test_get_structured_session_events_in_file_order() {
    let home = create_test_home();
    let store = store_for(&home);

    let detail = store
        .get_session("structured:swarm-alpha/sess-running")
        .await
        .unwrap();

    assert_eq!(detail.id, "structured:swarm-alpha/sess-running");
    assert!(detail.metadata.active);
    assert_eq!(detail.events.len(), 3);

    let ids: Vec<&str> = detail.events.iter().map(|e| e.event_id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "2026-01-20T10:00:01Z-0",
            "EqQBCkYIBRgCKkBsignature-tail-that-i",
            "2026-01-20T10:00:04Z-3",
        ]
    );
    assert_eq!(detail.events[2].instance, "backend");
    assert_eq!(detail.events[2].kind, "result");
}

#[tokio::test]
async fn test_get_legacy_session_keeps_plain_lines() {
    let home = create_test_home();
    let store = store_for(&home);

    let detail = store
        .get_session("structured:swarm-alpha/sess-legacy")
        .await
        .unwrap();

    assert_eq!(detail.events.len(), 3);
    assert_eq!(detail.events[0].instance, "system");
    assert_eq!(detail.events[0].payload["message"], "Swarm starting up");
    assert_eq!(detail.events[1].instance, "lead");
    assert_eq!(detail.events[1].kind, "user");
    assert_eq!(detail.events[2].instance, "system");
    assert_eq!(detail.events[2].kind, "log");
}

#[tokio::test]
async fn test_get_conversation_session() {
    let home = create_test_home();
    let store = store_for(&home);

    let detail = store
        .get_session("conversation:-home-user-webapp/conv-summary")
        .await
        .unwrap();

    let instances: Vec<&str> = detail.events.iter().map(|e| e.instance.as_str()).collect();
    assert_eq!(instances, vec!["system", "user", "assistant"]);
    assert_eq!(detail.events[1].event_id, "u1");
    assert_eq!(detail.metadata.title, "Fix flaky login test");
}

#[tokio::test]
async fn test_get_warmup_session_still_readable() {
    let home = create_test_home();
    let store = store_for(&home);

    let detail = store
        .get_session("conversation:-home-user-webapp/conv-warmup")
        .await
        .unwrap();
    assert_eq!(detail.events.len(), 2);
}

#[tokio::test]
async fn test_event_ids_stable_across_reads() {
    let home = create_test_home();
    let store = store_for(&home);

    for id in [
        "structured:swarm-alpha/sess-running",
        "structured:swarm-alpha/sess-legacy",
        "conversation:-home-user-webapp/conv-message",
    ] {
        let first = store.get_session(id).await.unwrap();
        let second = store.get_session(id).await.unwrap();
        let a: Vec<_> = first.events.iter().map(|e| e.event_id.clone()).collect();
        let b: Vec<_> = second.events.iter().map(|e| e.event_id.clone()).collect();
        assert_eq!(a, b, "ids changed for {}", id);
    }
}

#[tokio::test]
async fn test_get_session_unknown_prefix_is_client_error() {
    let home = create_test_home();
    let store = store_for(&home);

    let err = store.get_session("gemini:proj/sess").await.unwrap_err();
    assert!(matches!(err, SessionsError::UnknownSourceType(_)));
    assert!(err.is_client_error());
}

#[tokio::test]
async fn test_get_session_missing_is_not_found() {
    let home = create_test_home();
    let store = store_for(&home);

    let err = store
        .get_session("structured:swarm-alpha/nope")
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let err = store
        .get_session("conversation:-home-user-webapp/nope")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_get_session_corrupt_metadata_is_server_error() {
    let home = create_test_home();
    let store = store_for(&home);

    let err = store
        .get_session("structured:swarm-beta/sess-corrupt")
        .await
        .unwrap_err();
    assert!(!err.is_client_error());
    assert!(!err.is_not_found());
}

#[tokio::test]
async fn test_structured_session_without_log_falls_back() {
    let home = TempDir::new().unwrap();
    write_structured(home.path(), "p", "s", r#"{"note":"no log yet"}"#, None);
    let store = store_for(&home);

    let records = store.list_sessions_at(SourceFilter::All, later()).await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].title, UNTITLED);
    assert!(records[0].start_time <= Utc::now());

    let detail = store.get_session("structured:p/s").await.unwrap();
    assert!(detail.events.is_empty());
}
