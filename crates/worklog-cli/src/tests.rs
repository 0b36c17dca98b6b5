use chrono::{Duration, NaiveDate, TimeZone, Utc};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use worklog_core::db::{
    Database, SessionRepository, SqliteSessionRepository, SqliteTagRepository, TagRepository,
};
use worklog_core::models::SessionInput;
use worklog_core::sync::MemoryRemoteStore;
use worklog_core::{OwnerId, Session, SyncConfig};

use crate::cli::{CompletionShell, SessionCommands, SyncCommands, TagCommands};
use crate::commands::common::{
    description_preview, format_relative_time, format_session_lines, format_sync_timestamp,
    format_tag_lines, mask_secret, open_database, tag_names, total_hours,
};
use crate::commands::completions::{render_completions, run_completions};
use crate::commands::config::{config_lines, run_config_init, ConfigInit};
use crate::commands::session::{edit_session, list_sessions, run_session, SessionEdit};
use crate::commands::sync::{format_sync_summary, run_sync, sync_status_lines, sync_with_remote};
use crate::commands::tag::run_tag;
use crate::error::CliError;

const OWNER: OwnerId = OwnerId::new(1);

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn configured() -> SyncConfig {
    SyncConfig {
        aws_access_key_id: "AKIDEXAMPLE".to_string(),
        aws_secret_access_key: "secret-key-1234".to_string(),
        profile_id: "profile-a".to_string(),
        ..SyncConfig::default()
    }
}

fn add_session(db: &Database, day: NaiveDate, hours: f64, description: &str) -> Session {
    SqliteSessionRepository::new(db.connection())
        .create(
            OWNER,
            SessionInput {
                date: day,
                hours,
                description: description.to_string(),
                notes: None,
                next_stage: None,
                tag_id: None,
            },
        )
        .unwrap()
}

#[test]
fn format_relative_time_units() {
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    assert_eq!(format_relative_time(now - Duration::seconds(30), now), "just now");
    assert_eq!(format_relative_time(now - Duration::minutes(2), now), "2m ago");
    assert_eq!(format_relative_time(now - Duration::hours(2), now), "2h ago");
    assert_eq!(format_relative_time(now - Duration::days(3), now), "3d ago");
    assert_eq!(format_relative_time(now + Duration::hours(1), now), "just now");
}

#[test]
fn format_sync_timestamp_returns_utc_label() {
    let at = Utc.with_ymd_and_hms(2024, 6, 1, 8, 30, 5).unwrap();
    assert_eq!(format_sync_timestamp(at), "2024-06-01 08:30:05 UTC");
}

#[test]
fn description_preview_truncates_with_ellipsis() {
    assert_eq!(description_preview("short", 10), "short");
    assert_eq!(description_preview("first   line\nsecond", 40), "first line");
    assert_eq!(description_preview("abcdefghijkl", 8), "abcde...");
}

#[test]
fn mask_secret_keeps_last_four_characters() {
    assert_eq!(mask_secret(""), "(not set)");
    assert_eq!(mask_secret("abc"), "***");
    assert_eq!(mask_secret("secret-key-1234"), "***********1234");
}

#[test]
fn tag_flow_creates_lists_and_deletes() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("worklog.db");

    run_tag(TagCommands::Add { name: " client-a ".to_string() }, OWNER, &db_path).unwrap();
    run_tag(TagCommands::Add { name: "internal".to_string() }, OWNER, &db_path).unwrap();

    let db = open_database(&db_path).unwrap();
    let repo = SqliteTagRepository::new(db.connection());
    let tags = repo.list_by_owner(OWNER, false).unwrap();
    assert_eq!(
        tags.iter().map(|tag| tag.name.as_str()).collect::<Vec<_>>(),
        vec!["client-a", "internal"]
    );
    let lines = format_tag_lines(&tags);
    assert!(lines[0].contains("client-a"));
    assert!(lines[0].contains("local"));

    let internal = tags[1].id;
    run_tag(TagCommands::Delete { id: internal.get() }, OWNER, &db_path).unwrap();

    assert_eq!(repo.list_by_owner(OWNER, false).unwrap().len(), 1);
    let all = repo.list_by_owner(OWNER, true).unwrap();
    assert_eq!(all.len(), 2);
    assert!(format_tag_lines(&all)[1].ends_with("deleted"));
}

#[test]
fn session_add_with_unknown_tag_fails() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("worklog.db");

    let error = run_session(
        SessionCommands::Add {
            date: Some(date(2024, 5, 1)),
            hours: 1.0,
            description: "Review".to_string(),
            notes: None,
            next_stage: None,
            tag: Some("missing".to_string()),
        },
        OWNER,
        &db_path,
    )
    .unwrap_err();

    assert!(matches!(error, CliError::TagNotFound(name) if name == "missing"));
}

#[test]
fn session_add_links_tag_and_rounds_hours() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("worklog.db");

    run_tag(TagCommands::Add { name: "client-a".to_string() }, OWNER, &db_path).unwrap();
    run_session(
        SessionCommands::Add {
            date: Some(date(2024, 5, 1)),
            hours: 1.3,
            description: "  Planning call ".to_string(),
            notes: Some("   ".to_string()),
            next_stage: Some("Draft estimate".to_string()),
            tag: Some("client-a".to_string()),
        },
        OWNER,
        &db_path,
    )
    .unwrap();

    let db = open_database(&db_path).unwrap();
    let sessions = list_sessions(&db, OWNER, Some(date(2024, 5, 1))).unwrap();
    assert_eq!(sessions.len(), 1);
    let session = &sessions[0];
    assert_eq!(session.hours, 1.5);
    assert_eq!(session.description, "Planning call");
    assert_eq!(session.notes, None);
    assert_eq!(session.next_stage.as_deref(), Some("Draft estimate"));

    let tags = tag_names(&db, OWNER).unwrap();
    let lines = format_session_lines(&sessions, &tags);
    assert!(lines[0].contains("#client-a"));
    assert!(lines[0].contains("2024-05-01"));
}

#[test]
fn list_sessions_filters_by_date_and_skips_deleted() {
    let dir = TempDir::new().unwrap();
    let db = Database::open(&dir.path().join("worklog.db")).unwrap();

    add_session(&db, date(2024, 5, 1), 2.0, "Morning");
    add_session(&db, date(2024, 5, 1), 1.5, "Afternoon");
    let other = add_session(&db, date(2024, 5, 2), 3.0, "Next day");
    SqliteSessionRepository::new(db.connection())
        .delete(other.id)
        .unwrap();

    let day = list_sessions(&db, OWNER, Some(date(2024, 5, 1))).unwrap();
    assert_eq!(day.len(), 2);
    assert_eq!(total_hours(&day), 3.5);

    assert!(list_sessions(&db, OWNER, Some(date(2024, 5, 2)))
        .unwrap()
        .is_empty());
    assert_eq!(list_sessions(&db, OWNER, None).unwrap().len(), 2);
}

#[test]
fn edit_session_merges_fields_and_clears_tag() {
    let dir = TempDir::new().unwrap();
    let db = Database::open(&dir.path().join("worklog.db")).unwrap();
    let tag = SqliteTagRepository::new(db.connection())
        .create(OWNER, "client-a")
        .unwrap();

    let repo = SqliteSessionRepository::new(db.connection());
    let session = repo
        .create(
            OWNER,
            SessionInput {
                date: date(2024, 5, 1),
                hours: 2.0,
                description: "Original".to_string(),
                notes: Some("keep me".to_string()),
                next_stage: None,
                tag_id: Some(tag.id),
            },
        )
        .unwrap();

    let edited = edit_session(
        &db,
        OWNER,
        session.id,
        SessionEdit {
            hours: Some(3.2),
            ..SessionEdit::default()
        },
    )
    .unwrap();
    assert_eq!(edited.hours, 3.0);
    assert_eq!(edited.description, "Original");
    assert_eq!(edited.notes.as_deref(), Some("keep me"));
    assert_eq!(edited.tag_id, Some(tag.id));
    assert!(edited.updated_at >= session.updated_at);

    let untagged = edit_session(
        &db,
        OWNER,
        session.id,
        SessionEdit {
            no_tag: true,
            ..SessionEdit::default()
        },
    )
    .unwrap();
    assert_eq!(untagged.tag_id, None);
    assert_eq!(untagged.tag_cloud_id, None);
}

#[test]
fn edit_session_rejects_other_owners() {
    let dir = TempDir::new().unwrap();
    let db = Database::open(&dir.path().join("worklog.db")).unwrap();
    let session = add_session(&db, date(2024, 5, 1), 1.0, "Mine");

    let error = edit_session(
        &db,
        OwnerId::new(2),
        session.id,
        SessionEdit::default(),
    )
    .unwrap_err();
    assert!(matches!(
        error,
        CliError::Core(worklog_core::Error::NotFound(_))
    ));
}

#[test]
fn config_init_merges_into_existing_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("worklog-sync.json");

    let first = run_config_init(
        &path,
        ConfigInit {
            access_key_id: Some("AKIDEXAMPLE".to_string()),
            secret_access_key: Some("secret-key-1234".to_string()),
            ..ConfigInit::default()
        },
    )
    .unwrap();
    assert!(!first.is_configured());

    let second = run_config_init(
        &path,
        ConfigInit {
            profile_id: Some(" profile-a ".to_string()),
            region: Some("   ".to_string()),
            ..ConfigInit::default()
        },
    )
    .unwrap();
    assert!(second.is_configured());
    assert_eq!(second.aws_access_key_id, "AKIDEXAMPLE");
    assert_eq!(second.profile_id, "profile-a");
    assert_eq!(second.aws_region, "us-east-1");

    let stored = SyncConfig::load_from_path(&path).unwrap();
    assert_eq!(stored, second);

    let lines = config_lines(&stored);
    assert!(lines.iter().any(|line| line.ends_with("***********1234")));
    assert!(!lines.iter().any(|line| line.contains("secret-key-1234")));
}

#[test]
fn config_init_rejects_endpoint_without_scheme() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("worklog-sync.json");

    let error = run_config_init(
        &path,
        ConfigInit {
            endpoint_url: Some("localhost:8000".to_string()),
            ..ConfigInit::default()
        },
    )
    .unwrap_err();

    assert!(matches!(error, CliError::Config(_)));
    assert!(!path.exists());
}

#[tokio::test(flavor = "current_thread")]
async fn sync_with_remote_uploads_local_records() {
    let dir = TempDir::new().unwrap();
    let db = Database::open(&dir.path().join("worklog.db")).unwrap();
    SqliteTagRepository::new(db.connection())
        .create(OWNER, "client-a")
        .unwrap();
    add_session(&db, date(2024, 5, 1), 2.0, "Build");

    let remote = MemoryRemoteStore::new();
    let result = sync_with_remote(&db, configured(), OWNER, &remote)
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.tags_uploaded, 1);
    assert_eq!(result.sessions_uploaded, 1);
    assert_eq!(remote.tags("profile-a").await.len(), 1);
    assert_eq!(remote.sessions("profile-a").await.len(), 1);

    let summary = format_sync_summary(&result);
    assert!(summary[0].starts_with("Sync completed at "));
    assert_eq!(summary[1], "Tags: 1 uploaded, 0 downloaded");
    assert_eq!(summary[2], "Sessions: 1 uploaded, 0 downloaded");

    let status = sync_status_lines(&db, configured(), OWNER).unwrap();
    assert_eq!(status[0], "Sync configured: profile 'profile-a' in us-east-1");
    assert!(status[1].starts_with("Last sync: "));
    assert!(status[1].ends_with("(just now)"));
}

#[tokio::test(flavor = "current_thread")]
async fn sync_with_remote_reports_failure() {
    let dir = TempDir::new().unwrap();
    let db = Database::open(&dir.path().join("worklog.db")).unwrap();
    add_session(&db, date(2024, 5, 1), 2.0, "Build");

    let remote = MemoryRemoteStore::new();
    remote.set_unavailable(true);

    let error = sync_with_remote(&db, configured(), OWNER, &remote)
        .await
        .unwrap_err();
    assert!(matches!(error, CliError::Sync(_)));

    let status = sync_status_lines(&db, configured(), OWNER).unwrap();
    assert_eq!(status[1], "Last sync: never");
}

#[tokio::test(flavor = "current_thread")]
async fn run_sync_requires_sync_configuration() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("worklog.db");
    let config_path = dir.path().join("worklog-sync.json");

    let error = run_sync(None, OWNER, &db_path, &config_path)
        .await
        .unwrap_err();
    assert!(matches!(error, CliError::SyncNotConfigured));

    let error = run_sync(Some(SyncCommands::Test), OWNER, &db_path, &config_path)
        .await
        .unwrap_err();
    assert!(matches!(error, CliError::SyncNotConfigured));
}

#[test]
fn run_completions_writes_bash_script_file() {
    let dir = TempDir::new().unwrap();
    let output_path = dir.path().join("worklog.bash");

    run_completions(CompletionShell::Bash, Some(&output_path)).unwrap();

    let script = std::fs::read_to_string(&output_path).unwrap();
    assert!(script.contains("_worklog()"));
    assert!(script.contains("complete -F _worklog"));
    assert!(script.contains(" default worklog"));
}

#[test]
fn render_completions_covers_worklog_subcommands() {
    let script = String::from_utf8(render_completions(CompletionShell::Zsh)).unwrap();
    assert!(script.contains("#compdef worklog"));
    for subcommand in ["tag", "session", "sync", "config"] {
        assert!(script.contains(subcommand), "missing {subcommand}");
    }
}
