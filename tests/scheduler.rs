//! Runner behaviour against a scripted transport
//!
//! No network: every response (or transport failure) is queued up front
//! and every request the runner sends is recorded for inspection.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use apitest::cleanup::{Action, CleanupHandler};
use apitest::testing::Outcome;
use apitest::transport::{HttpRequest, HttpResponse, Transport};
use apitest::{Error, Result, Runner, TestSuite, Value};
use async_trait::async_trait;

/// Replays queued responses in order; answers `200 {}` once the queue is empty
#[derive(Clone, Default)]
struct Scripted {
    replies: Arc<Mutex<VecDeque<Result<HttpResponse>>>>,
    sent: Arc<Mutex<Vec<HttpRequest>>>,
    delay: Option<Duration>,
}

impl Scripted {
    fn reply(self, status: u16, body: &str) -> Self {
        self.replies.lock().unwrap().push_back(Ok(HttpResponse {
            status,
            headers: Default::default(),
            body: body.as_bytes().to_vec(),
        }));
        self
    }

    fn fail(self, reason: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(Error::Transport(reason.to_string())));
        self
    }

    fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn sent(&self) -> Vec<HttpRequest> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for Scripted {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.sent.lock().unwrap().push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Ok(HttpResponse {
                    status: 200,
                    headers: Default::default(),
                    body: b"{}".to_vec(),
                })
            })
    }
}

/// Records actions and fails the ones named in `failing`
#[derive(Clone, Default)]
struct RecordingCleanup {
    executed: Arc<Mutex<Vec<String>>>,
    failing: Vec<String>,
}

#[async_trait]
impl CleanupHandler for RecordingCleanup {
    async fn execute(&self, action: &Action) -> Result<()> {
        let label = match action {
            Action::Sql { sql } => sql.clone(),
            other => other.kind().to_string(),
        };
        self.executed.lock().unwrap().push(label.clone());
        if self.failing.contains(&label) {
            return Err(Error::cleanup(action.kind(), "database unavailable"));
        }
        Ok(())
    }
}

async fn run(yaml: &str, transport: &Scripted) -> apitest::RunReport {
    Runner::new(TestSuite::parse(yaml).unwrap(), Box::new(transport.clone()))
        .unwrap()
        .run()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_dependency_that_never_ran_is_skipped_without_sending() {
    let transport = Scripted::default();
    let report = run(
        r#"
suite: { name: deps }
scenarios:
  - name: orders
    testcases:
      - name: get order
        depends_on: create order
        request: { path: /orders/1 }
"#,
        &transport,
    )
    .await;

    let result = report.results.find("get order").unwrap();
    assert_eq!(result.outcome, Outcome::Skipped);
    assert!(!result.passed);
    assert_eq!(
        result.error.as_deref(),
        Some("dependency 'create order' has not run")
    );
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn test_failed_dependency_skips_dependents() {
    let transport = Scripted::default().reply(500, r#"{"code":1}"#);
    let report = run(
        r#"
suite: { name: deps }
scenarios:
  - name: users
    testcases:
      - name: create user
        request: { method: POST, path: /users }
        expect: { status_code: 201 }
  - name: profile
    testcases:
      - name: read user
        depends_on: create user
        request: { path: /users/1 }
      - name: health
        request: { path: /health }
"#,
        &transport,
    )
    .await;

    let results = report.results.results();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].outcome, Outcome::Failed);
    assert_eq!(results[1].outcome, Outcome::Skipped);
    assert_eq!(
        results[1].error.as_deref(),
        Some("dependency 'create user' did not pass")
    );
    assert_eq!(results[2].outcome, Outcome::Passed);
    assert_eq!(results[2].scenario, "profile");
    assert_eq!(transport.sent().len(), 2);
}

#[tokio::test]
async fn test_transport_failures_are_retried_with_fresh_identical_requests() {
    let transport = Scripted::default()
        .fail("connection refused")
        .fail("connection reset")
        .reply(201, r#"{"data":{"id":9}}"#);

    let report = run(
        r#"
suite: { name: retry, base_url: "http://svc" }
variables: { user: alice }
scenarios:
  - name: users
    testcases:
      - name: create user
        request:
          method: POST
          path: /users
          body: { name: "{{user}}", age: 30 }
        expect: { status_code: 201 }
        retry: { times: 3, interval: 10 }
"#,
        &transport,
    )
    .await;

    assert_eq!(report.results.results().len(), 1);
    assert!(report.results.has_passed("create user"));

    let sent = transport.sent();
    assert_eq!(sent.len(), 3);
    assert!(sent.iter().all(|r| r == &sent[0]));
    assert_eq!(
        String::from_utf8(sent[0].body.clone().unwrap()).unwrap(),
        r#"{"age":30,"name":"alice"}"#
    );
}

#[tokio::test]
async fn test_retries_exhausted_reports_transport_error() {
    let transport = Scripted::default().fail("timeout").fail("timeout");
    let report = run(
        r#"
suite: { name: retry }
scenarios:
  - name: a
    testcases:
      - name: flaky
        request: { path: /flaky }
        retry: { times: 2, interval: 0 }
"#,
        &transport,
    )
    .await;

    let result = report.results.find("flaky").unwrap();
    assert_eq!(result.outcome, Outcome::Failed);
    assert_eq!(result.error.as_deref(), Some("request failed: timeout"));
    assert!(result.response.is_none());
    assert_eq!(transport.sent().len(), 2);
}

#[tokio::test]
async fn test_unexpected_status_is_not_retried() {
    let transport = Scripted::default().reply(500, r#"{"code":500}"#);
    let report = run(
        r#"
suite: { name: retry }
scenarios:
  - name: a
    testcases:
      - name: broken
        request: { path: /broken }
        expect: { status_code: 200 }
        retry: { times: 3, interval: 0 }
"#,
        &transport,
    )
    .await;

    assert!(!report.results.has_passed("broken"));
    assert_eq!(transport.sent().len(), 1);
}

#[tokio::test]
async fn test_status_mismatch_short_circuits_assertions() {
    let transport = Scripted::default().reply(200, r#"{"data":{"id":1}}"#);
    let report = run(
        r#"
suite: { name: status }
scenarios:
  - name: a
    testcases:
      - name: missing user
        request: { path: /users/999 }
        expect:
          status_code: 404
          assertions:
            - { path: error.code, operator: equals, value: NOT_FOUND }
"#,
        &transport,
    )
    .await;

    let result = report.results.find("missing user").unwrap();
    assert_eq!(
        result.error.as_deref(),
        Some("status code mismatch: expected 404, got 200")
    );
    assert_eq!(result.response.as_ref().unwrap().status_code, 200);
}

#[tokio::test]
async fn test_large_integer_round_trips_through_capture_and_body() {
    let transport = Scripted::default()
        .reply(200, r#"{"data":{"order_id":123456789012345}}"#)
        .reply(200, r#"{"data":{"order_id":123456789012345}}"#);

    let report = run(
        r#"
suite: { name: ids }
scenarios:
  - name: orders
    testcases:
      - name: create order
        request: { method: POST, path: /orders }
        save: { order_id: data.order_id }
      - name: confirm order
        depends_on: create order
        request:
          method: PUT
          path: "/orders/{{order_id}}/confirm"
          body: { order_id: "{{order_id}}", note: "order {{order_id}}" }
        expect:
          response_body: { data: { order_id: 123456789012345 } }
          assertions:
            - { path: data.order_id, operator: equals, value: "{{order_id}}" }
            - { path: data.order_id, operator: greaterThan, value: 0 }
"#,
        &transport,
    )
    .await;

    assert!(report.results.has_passed("confirm order"), "{:?}", report.results);
    assert_eq!(
        report.variables.get("order_id"),
        Some(&Value::Int(123456789012345))
    );

    let sent = transport.sent();
    assert_eq!(sent[1].url, "/orders/123456789012345/confirm");
    assert_eq!(
        String::from_utf8(sent[1].body.clone().unwrap()).unwrap(),
        r#"{"note":"order 123456789012345","order_id":123456789012345}"#
    );
}

#[tokio::test]
async fn test_decode_failure_is_reported_with_raw_snapshot() {
    let transport = Scripted::default().reply(200, "<html>oops</html>");
    let report = run(
        r#"
suite: { name: decode }
scenarios:
  - name: a
    testcases:
      - { name: html, request: { path: / } }
"#,
        &transport,
    )
    .await;

    let result = report.results.find("html").unwrap();
    assert!(result
        .error
        .as_deref()
        .unwrap()
        .starts_with("parse response failed"));
    assert_eq!(
        result.response.as_ref().unwrap().body,
        Value::from("<html>oops</html>")
    );
}

#[tokio::test]
async fn test_empty_body_passes_when_nothing_is_asserted() {
    let transport = Scripted::default().reply(204, "");
    let report = run(
        r#"
suite: { name: empty }
scenarios:
  - name: a
    testcases:
      - { name: delete, request: { method: DELETE, path: /users/1 }, expect: { status_code: 204 } }
"#,
        &transport,
    )
    .await;

    assert!(report.results.has_passed("delete"));
}

#[tokio::test]
async fn test_setup_failure_aborts_before_any_case() {
    let transport = Scripted::default();
    let cleanup = RecordingCleanup {
        failing: vec!["TRUNCATE sessions".into()],
        ..Default::default()
    };

    let err = Runner::new(
        TestSuite::parse(
            r#"
suite:
  name: setup
  setup:
    - { type: sql, sql: TRUNCATE sessions }
  teardown:
    - { type: sql, sql: DELETE FROM users }
scenarios:
  - name: a
    testcases: [{ name: ping, request: { path: /ping } }]
"#,
        )
        .unwrap(),
        Box::new(transport.clone()),
    )
    .unwrap()
    .with_cleanup(Box::new(cleanup.clone()))
    .run()
    .await
    .unwrap_err();

    assert!(matches!(err, Error::Cleanup { .. }));
    assert!(transport.sent().is_empty());
    assert_eq!(*cleanup.executed.lock().unwrap(), vec!["TRUNCATE sessions"]);
}

#[tokio::test]
async fn test_teardown_failures_are_collected_and_keep_results() {
    let transport = Scripted::default()
        .reply(200, "{}")
        .reply(500, r#"{"message":"boom"}"#);
    let cleanup = RecordingCleanup {
        failing: vec!["DELETE FROM users".into()],
        ..Default::default()
    };

    let report = Runner::new(
        TestSuite::parse(
            r#"
suite:
  name: teardown
  teardown:
    - { type: sql, sql: DELETE FROM users }
    - type: api_call
      request: { method: POST, path: /reset }
    - { type: soft_delete_cleanup, table: orders }
scenarios:
  - name: a
    testcases: [{ name: ping, request: { path: /ping } }]
"#,
        )
        .unwrap(),
        Box::new(transport.clone()),
    )
    .unwrap()
    .with_cleanup(Box::new(cleanup.clone()))
    .run()
    .await
    .unwrap();

    assert!(report.results.has_passed("ping"));
    assert_eq!(report.teardown_errors.len(), 2);
    assert!(report.teardown_errors[1].contains("status 500"));
    assert_eq!(
        *cleanup.executed.lock().unwrap(),
        vec!["DELETE FROM users", "soft_delete_cleanup"]
    );
    assert_eq!(transport.sent()[1].url, "/reset");
}

#[tokio::test]
async fn test_run_deadline_times_out_remaining_cases() {
    let transport = Scripted::default().delayed(Duration::from_millis(500));

    let report = Runner::new(
        TestSuite::parse(
            r#"
suite: { name: deadline }
scenarios:
  - name: a
    testcases:
      - { name: slow, request: { path: /slow } }
      - { name: after, request: { path: /after } }
"#,
        )
        .unwrap(),
        Box::new(transport.clone()),
    )
    .unwrap()
    .with_deadline(Some(Duration::from_millis(50)))
    .run()
    .await
    .unwrap();

    let results = report.results.results();
    assert_eq!(results.len(), 2);
    assert!(results
        .iter()
        .all(|r| r.error.as_deref().is_some_and(|e| e.starts_with("Timed out"))));
    assert_eq!(transport.sent().len(), 1);
}

#[tokio::test]
async fn test_deadline_expiring_during_retry_interval_times_out() {
    let transport = Scripted::default().fail("connection refused");

    let report = Runner::new(
        TestSuite::parse(
            r#"
suite: { name: deadline }
scenarios:
  - name: a
    testcases:
      - name: flaky
        request: { path: /flaky }
        retry: { times: 2, interval: 1000 }
"#,
        )
        .unwrap(),
        Box::new(transport.clone()),
    )
    .unwrap()
    .with_deadline(Some(Duration::from_millis(50)))
    .run()
    .await
    .unwrap();

    let result = report.results.find("flaky").unwrap();
    assert_eq!(result.outcome, Outcome::Failed);
    assert!(result
        .error
        .as_deref()
        .is_some_and(|e| e.starts_with("Timed out")));
    assert_eq!(transport.sent().len(), 1);
}

#[tokio::test]
async fn test_unrepresentable_deadline_means_no_deadline() {
    let transport = Scripted::default();

    let report = Runner::new(
        TestSuite::parse(
            r#"
suite: { name: deadline }
scenarios:
  - name: a
    testcases:
      - { name: ping, request: { path: /ping } }
"#,
        )
        .unwrap(),
        Box::new(transport.clone()),
    )
    .unwrap()
    .with_deadline(Some(Duration::from_secs(u64::MAX)))
    .run()
    .await
    .unwrap();

    assert!(report.results.has_passed("ping"));
    assert_eq!(transport.sent().len(), 1);
}
