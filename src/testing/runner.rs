//! Test runner implementation
//!
//! Executes a suite's cases strictly in declaration order on one task.
//! Each case goes through dependency gating, request building, sending
//! (with retries on transport failures), decoding, validation and capture.
//! Every case yields exactly one [`TestResult`], whatever happens to it.

use std::future::Future;
use std::time::Duration;

use colored::Colorize;
use tokio::time::Instant;

use crate::cleanup::{Action, CleanupHandler};
use crate::common::{Error, Result};
use crate::engine::{Resolver, VariableStore};
use crate::transport::{HttpResponse, JsonDecoder, ResponseDecoder, Transport};
use crate::value::{path, Value};

use super::config::{Scenario, SuiteConfig, TestCase, TestSuite};
use super::results::{Outcome, ResponseSnapshot, ResultLog, TestResult};

/// Everything a finished run leaves behind
#[derive(Debug)]
pub struct RunReport {
    pub results: ResultLog,
    /// Variable bindings at the end of the run, captures included
    pub variables: VariableStore,
    /// Teardown failures; these never change case results
    pub teardown_errors: Vec<String>,
}

/// Drives one suite through a transport
pub struct Runner {
    suite: SuiteConfig,
    scenarios: Vec<Scenario>,
    transport: Box<dyn Transport>,
    decoder: Box<dyn ResponseDecoder>,
    cleanup: Option<Box<dyn CleanupHandler>>,
    variables: VariableStore,
    results: ResultLog,
    deadline: Option<Duration>,
    echo: bool,
}

impl Runner {
    /// Validate `suite` and prepare a runner for it
    pub fn new(suite: TestSuite, transport: Box<dyn Transport>) -> Result<Self> {
        suite.validate()?;

        let TestSuite {
            suite,
            variables,
            scenarios,
        } = suite;

        Ok(Self {
            suite,
            scenarios,
            transport,
            decoder: Box::new(JsonDecoder),
            cleanup: None,
            variables: VariableStore::new(variables),
            results: ResultLog::default(),
            deadline: None,
            echo: false,
        })
    }

    pub fn with_decoder(mut self, decoder: Box<dyn ResponseDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    /// Handler for setup/teardown actions other than `api_call`
    pub fn with_cleanup(mut self, handler: Box<dyn CleanupHandler>) -> Self {
        self.cleanup = Some(handler);
        self
    }

    /// Overall time limit for the cases, measured from the start of the run
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Print per-case progress lines to stdout
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Run setup, every case, then teardown.
    ///
    /// Fails only when a setup action fails; case failures are recorded in
    /// the report.
    pub async fn run(mut self) -> Result<RunReport> {
        // A limit too large to represent is no limit at all
        let deadline = self
            .deadline
            .and_then(|limit| Instant::now().checked_add(limit));

        tracing::info!(
            suite = %self.suite.name,
            scenarios = self.scenarios.len(),
            cases = self.scenarios.iter().map(|s| s.cases.len()).sum::<usize>(),
            "Running suite"
        );

        if self.echo {
            println!(
                "\n{} {}",
                "Running Suite:".blue().bold(),
                self.suite.name.white().bold()
            );
        }

        self.run_setup().await?;

        let scenarios = std::mem::take(&mut self.scenarios);
        for scenario in &scenarios {
            if self.echo {
                println!("\n{} {}", "Scenario:".cyan(), scenario.name);
                if let Some(desc) = &scenario.description {
                    println!("  {}", desc.dimmed());
                }
            }

            for case in &scenario.cases {
                let result = self.execute_case(&scenario.name, case, deadline).await;
                if self.echo {
                    echo_result(&result);
                }
                self.results.record(result);
            }
        }

        let teardown_errors = self.run_teardown().await;

        Ok(RunReport {
            results: self.results,
            variables: self.variables,
            teardown_errors,
        })
    }

    async fn run_setup(&self) -> Result<()> {
        if self.suite.setup.is_empty() {
            return Ok(());
        }
        if self.echo {
            println!("\n{}", "Setup:".cyan());
        }

        for action in &self.suite.setup {
            if let Err(e) = self.run_action(action).await {
                tracing::error!(action = action.kind(), error = %e, "Setup failed");
                if self.echo {
                    println!("  {} {}", "✗".red(), e);
                }
                return Err(e);
            }
            if self.echo {
                println!("  {} {}", "✓".green(), action.kind().dimmed());
            }
        }
        Ok(())
    }

    /// Run every teardown action, collecting failures instead of stopping
    async fn run_teardown(&self) -> Vec<String> {
        if !self.suite.teardown.is_empty() && self.echo {
            println!("\n{}", "Teardown:".cyan());
        }

        let mut errors = Vec::new();
        for action in &self.suite.teardown {
            match self.run_action(action).await {
                Ok(()) => {
                    if self.echo {
                        println!("  {} {}", "✓".green(), action.kind().dimmed());
                    }
                }
                Err(e) => {
                    tracing::warn!(action = action.kind(), error = %e, "Teardown action failed");
                    if self.echo {
                        println!("  {} {}", "✗".red(), e);
                    }
                    errors.push(e.to_string());
                }
            }
        }
        errors
    }

    async fn run_action(&self, action: &Action) -> Result<()> {
        match action {
            Action::ApiCall { request } => {
                let request = request
                    .build(&self.suite.base_url, &Resolver::new(&self.variables))
                    .map_err(|e| Error::cleanup(action.kind(), e.to_string()))?;

                tracing::debug!(method = %request.method, url = %request.url, "Running api_call action");

                let response = self
                    .transport
                    .send(request)
                    .await
                    .map_err(|e| Error::cleanup(action.kind(), e.to_string()))?;

                if response.status >= 400 {
                    return Err(Error::cleanup(
                        action.kind(),
                        format!(
                            "status {}: {}",
                            response.status,
                            String::from_utf8_lossy(&response.body)
                        ),
                    ));
                }
                Ok(())
            }
            other => match &self.cleanup {
                Some(handler) => handler.execute(other).await,
                None => Err(Error::cleanup(other.kind(), "no cleanup handler configured")),
            },
        }
    }

    async fn execute_case(
        &mut self,
        scenario: &str,
        case: &TestCase,
        deadline: Option<Instant>,
    ) -> TestResult {
        if let Some(dependency) = case.dependency() {
            if !self.results.has_passed(dependency) {
                let reason = if self.results.find(dependency).is_some() {
                    "did not pass"
                } else {
                    "has not run"
                };
                let err = Error::dependency(dependency, reason);
                tracing::warn!(case = %case.name, error = %err, "Skipping case");
                return TestResult::skipped(scenario, &case.name, &err);
            }
        }

        let started = Instant::now();

        if deadline.is_some_and(|at| started >= at) {
            let err = Error::Timeout("run deadline passed before the case started".into());
            tracing::warn!(case = %case.name, error = %err, "Case not sent");
            return TestResult::failed(scenario, &case.name, Duration::ZERO, &err, None);
        }

        let (snapshot, outcome) = self.perform(case, deadline).await;
        let duration = started.elapsed();

        let result = match outcome {
            Ok(()) => TestResult::passed(scenario, &case.name, duration, snapshot),
            Err(e) => TestResult::failed(scenario, &case.name, duration, &e, snapshot),
        };

        tracing::info!(
            case = %case.name,
            passed = result.passed,
            duration_ms = duration.as_millis() as u64,
            error = result.error.as_deref().unwrap_or(""),
            "Case finished"
        );
        result
    }

    /// Send, decode, check and capture. The snapshot is returned even when
    /// validation fails so the failure can be inspected.
    async fn perform(
        &mut self,
        case: &TestCase,
        deadline: Option<Instant>,
    ) -> (Option<ResponseSnapshot>, Result<()>) {
        let response = match self.send_with_retry(case, deadline).await {
            Ok(response) => response,
            Err(e) => return (None, Err(e)),
        };

        let HttpResponse {
            status,
            headers,
            body: raw,
        } = response;

        let body = match self.decoder.decode(&raw) {
            Ok(body) => body,
            Err(e) => {
                let snapshot = ResponseSnapshot {
                    status_code: status,
                    body: Value::String(String::from_utf8_lossy(&raw).into_owned()),
                    headers,
                };
                return (Some(snapshot), Err(e));
            }
        };

        let checked = case
            .expect
            .check(status, &body, &Resolver::new(&self.variables));

        if checked.is_ok() {
            self.capture(case, &body);
        }

        let snapshot = ResponseSnapshot {
            status_code: status,
            body,
            headers,
        };
        (Some(snapshot), checked)
    }

    async fn send_with_retry(
        &self,
        case: &TestCase,
        deadline: Option<Instant>,
    ) -> Result<HttpResponse> {
        let policy = case.retry_policy();
        let mut attempt = 1;

        loop {
            // Rebuilt per attempt so no request value is ever reused
            let request = case
                .request
                .build(&self.suite.base_url, &Resolver::new(&self.variables))?;

            tracing::debug!(
                case = %case.name,
                attempt,
                method = %request.method,
                url = %request.url,
                "Sending request"
            );

            match within(deadline, self.transport.send(request)).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && attempt < policy.attempts => {
                    tracing::warn!(
                        case = %case.name,
                        attempt,
                        max_attempts = policy.attempts,
                        error = %e,
                        "Request failed, retrying"
                    );
                    within(deadline, async {
                        tokio::time::sleep(policy.interval()).await;
                        Ok(())
                    })
                    .await?;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn capture(&mut self, case: &TestCase, body: &Value) {
        for (name, source) in &case.save {
            match path::lookup(body, source) {
                Some(value) => {
                    tracing::debug!(case = %case.name, variable = %name, kind = value.kind(), "Captured variable");
                    self.variables.capture(name, value.clone());
                }
                None => {
                    tracing::warn!(
                        case = %case.name,
                        variable = %name,
                        path = %source,
                        "Capture path not found in response, variable left unset"
                    );
                }
            }
        }
    }
}

/// Bound `fut` by the run deadline, if there is one
async fn within<T, F>(deadline: Option<Instant>, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match deadline {
        Some(at) => tokio::time::timeout_at(at, fut)
            .await
            .map_err(|_| Error::Timeout("run deadline exceeded".into()))?,
        None => fut.await,
    }
}

fn echo_result(result: &TestResult) {
    let ms = result.duration.as_millis();
    match result.outcome {
        Outcome::Passed => println!("  {} {} ({ms}ms)", "✓".green(), result.name),
        Outcome::Failed => println!(
            "  {} {} ({ms}ms): {}",
            "✗".red(),
            result.name,
            result.error.as_deref().unwrap_or_default()
        ),
        Outcome::Skipped => println!(
            "  {} {}: {}",
            "-".yellow(),
            result.name,
            result.error.as_deref().unwrap_or_default().dimmed()
        ),
    }
}
