//! Integration tests for submitting instructions through `App`.
//!
//! Uses a scripted parser so every test controls exactly what the
//! "model" answers and can inspect what it was sent.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::significant_drop_tightening)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use smartdo::app::{App, Notice, PARSE_FAILED};
use smartdo::parser::{ParseError, TaskParser};
use smartdo::store::{DEFAULT_TASKS_KEY, KeyValueStore, MemoryStore};
use smartdo::tasks::TaskManager;
use smartdo_proto::incoming::{ParseOutcome, TaskContext};

// ---------------------------------------------------------------------------
// Scripted parser
// ---------------------------------------------------------------------------

/// One recorded call.
#[derive(Debug, Clone)]
struct Call {
    instructions: String,
    context: Vec<TaskContext>,
}

/// Replays model texts in order and records what it was asked.
#[derive(Default)]
struct ScriptedParser {
    replies: Mutex<VecDeque<Result<String, ()>>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedParser {
    fn reply(self, text: &str) -> Self {
        self.replies.lock().push_back(Ok(text.to_string()));
        self
    }

    fn fail(self) -> Self {
        self.replies.lock().push_back(Err(()));
        self
    }
}

impl TaskParser for ScriptedParser {
    async fn parse(
        &self,
        instructions: &str,
        current: &[TaskContext],
        _now: DateTime<Utc>,
    ) -> Result<ParseOutcome, ParseError> {
        self.calls.lock().push(Call {
            instructions: instructions.to_string(),
            context: current.to_vec(),
        });
        let next = self.replies.lock().pop_front();
        match next {
            Some(Ok(text)) => Ok(ParseOutcome::from_model_text(&text)?),
            Some(Err(())) | None => Err(ParseError::EmptyResponse),
        }
    }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 16, 9, 0, 0).unwrap()
}

fn app(parser: ScriptedParser) -> (App<Arc<MemoryStore>, ScriptedParser>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let manager = TaskManager::load(Arc::clone(&store), DEFAULT_TASKS_KEY).unwrap();
    (App::new(manager, parser), store)
}

const FIRST_ANSWER: &str = r#"```json
{"tasks": [
  {"id": "NEW", "title": "Dentist", "dueDate": "2026-10-17T15:00:00.000Z", "priority": "Medium", "category": "Health"},
  {"id": "NEW", "title": "Move house", "priority": "High", "category": "Home",
   "subtasks": [{"id": "NEW", "title": "Pack", "subtasks": [{"id": "NEW", "title": "Books"}]}]}
]}
```"#;

// ===========================================================================
// Tests
// ===========================================================================

#[tokio::test]
async fn submit_merges_answer_and_persists() {
    let (mut app, store) = app(ScriptedParser::default().reply(FIRST_ANSWER));
    let notice = app.submit("dentist tomorrow 3pm, moving next month", now()).await;
    assert_eq!(notice, Some(Notice::success("List updated successfully.")));

    let tasks = app.manager().tasks();
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].title, "Dentist");
    assert_eq!(tasks[1].subtasks[0].subtasks[0].title, "Books");

    let stored = store.get(DEFAULT_TASKS_KEY).unwrap().unwrap();
    assert!(stored.contains("Dentist"));
}

#[tokio::test]
async fn parser_sees_current_list_with_nested_subtasks() {
    let (mut app, _) = app(
        ScriptedParser::default()
            .reply(FIRST_ANSWER)
            .reply(r#"{"tasks": []}"#),
    );
    app.submit("first", now()).await.unwrap();
    let move_id = app.manager().tasks()[1].id.to_string();
    app.submit("  second  ", now()).await.unwrap();

    let calls = app_calls(&app);
    assert_eq!(calls.len(), 2);
    assert!(calls[0].context.is_empty());
    assert_eq!(calls[1].instructions, "second");
    let moving = calls[1].context.iter().find(|c| c.id == move_id).unwrap();
    assert_eq!(moving.subtasks[0].title, "Pack");
    assert_eq!(moving.subtasks[0].subtasks[0].title, "Books");
    assert!(app.manager().tasks().is_empty());
}

fn app_calls(app: &App<Arc<MemoryStore>, ScriptedParser>) -> Vec<Call> {
    app.parser().calls.lock().clone()
}

#[tokio::test]
async fn failed_parse_keeps_list_and_allows_retry() {
    let (mut app, _) = app(
        ScriptedParser::default()
            .reply(FIRST_ANSWER)
            .fail()
            .reply("not json at all")
            .reply(r#"{"tasks": []}"#),
    );
    app.submit("first", now()).await.unwrap();
    let before = app.manager().tasks().to_vec();

    assert_eq!(
        app.submit("second", now()).await,
        Some(Notice::error(PARSE_FAILED))
    );
    assert_eq!(
        app.submit("third", now()).await,
        Some(Notice::error(PARSE_FAILED))
    );
    assert_eq!(app.manager().tasks(), before.as_slice());
    assert!(!app.is_processing());

    assert!(!app.submit("clear it all", now()).await.unwrap().is_error());
    assert!(app.manager().tasks().is_empty());
}

#[tokio::test]
async fn incomplete_items_are_skipped_not_admitted() {
    let answer = r#"{"tasks": [
        {"id": "NEW", "title": "Valid", "priority": "Low", "category": "Errands"},
        {"id": "NEW", "title": "No category", "priority": "Low"},
        {"id": "NEW", "priority": "High", "category": "Work"},
        {"id": "NEW", "title": "Odd priority", "priority": "Urgent", "category": "Work"}
    ]}"#;
    let (mut app, _) = app(ScriptedParser::default().reply(answer));
    let notice = app.submit("stuff", now()).await.unwrap();
    assert_eq!(
        notice,
        Notice::success("List updated successfully. Skipped 3 incomplete item(s).")
    );
    let titles: Vec<&str> = app.manager().tasks().iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["Valid"]);
}

#[tokio::test]
async fn blank_input_never_reaches_the_parser() {
    let (mut app, _) = app(ScriptedParser::default());
    assert_eq!(app.submit("   ", now()).await, None);
    assert!(app_calls(&app).is_empty());
}

#[test]
fn superseded_submission_is_dropped() {
    let (mut app, _) = app(ScriptedParser::default());
    let pending = app.begin_submit("slow request").unwrap();

    // Something else issues a newer request before the answer arrives.
    let _newer = app.manager_mut().begin_request();

    let outcome = ParseOutcome::from_model_text(FIRST_ANSWER).unwrap();
    assert_eq!(app.finish_submit(pending, Ok(outcome), now()), None);
    assert!(app.manager().tasks().is_empty());
    assert!(!app.is_processing());
}

#[tokio::test]
async fn subscribers_are_notified_after_submit() {
    let (mut app, _) = app(ScriptedParser::default().reply(FIRST_ANSWER));
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    app.manager_mut().subscribe(move |tasks| {
        counter.store(tasks.len(), Ordering::SeqCst);
    });
    app.submit("go", now()).await.unwrap();
    assert_eq!(seen.load(Ordering::SeqCst), 2);
}
