use std::cell::RefCell;

use sitekit::pipeline::{Pipeline, PipelineState, Step, StepExecutor, StepStatus};
use sitekit::prompt::{ChoiceOption, Prompter};
use sitekit::report::Reporter;
use sitekit::runner::{Operation, StepResult};

struct Answer(bool);

impl Prompter for Answer {
    fn choice(&self, _question: &str, _options: &[ChoiceOption], default: Option<&str>) -> Option<String> {
        default.map(str::to_string)
    }

    fn confirm(&self, _question: &str) -> bool {
        self.0
    }
}

#[derive(Default)]
struct Captured {
    warnings: RefCell<Vec<String>>,
}

impl Reporter for Captured {
    fn title(&self, _text: &str) {}
    fn text(&self, _text: &str) {}
    fn notice(&self, _text: &str) {}
    fn success(&self, _text: &str) {}
    fn warning(&self, text: &str) {
        self.warnings.borrow_mut().push(text.to_string());
    }
    fn error(&self, _text: &str) {}
    fn table(&self, _headers: &[&str], _rows: &[Vec<String>]) {}
}

/// Fails the named steps, records every execution.
struct Failing {
    fail: &'static [&'static str],
    executed: RefCell<Vec<String>>,
}

impl Failing {
    fn new(fail: &'static [&'static str]) -> Self {
        Self {
            fail,
            executed: RefCell::new(Vec::new()),
        }
    }
}

impl StepExecutor for Failing {
    fn execute(&self, step: &Step) -> StepResult {
        self.executed.borrow_mut().push(step.name.clone());
        if self.fail.contains(&step.name.as_str()) {
            StepResult::failed(format!("{} broke", step.name))
        } else {
            StepResult::ok()
        }
    }

    fn context_name(&self, _step: &Step) -> String {
        "@self".to_string()
    }
}

fn step(name: &str, required: bool) -> Step {
    let operation = Operation::drush(name);
    if required {
        Step::required(name, name, operation)
    } else {
        Step::optional(name, name, operation)
    }
}

fn pipeline(steps: Vec<Step>) -> Pipeline {
    let mut pipeline = Pipeline::new("Proceed?");
    pipeline.extend(steps);
    pipeline
}

#[test]
fn steps_run_once_each_in_declared_order() {
    let pipeline = pipeline(vec![step("a", true), step("b", false), step("c", true)]);
    let executor = Failing::new(&[]);

    let outcome = pipeline.run(&Answer(true), &executor, &Captured::default());

    assert_eq!(outcome.state, PipelineState::Completed);
    assert_eq!(*executor.executed.borrow(), vec!["a", "b", "c"]);
    assert_eq!(outcome.executed(), vec!["a", "b", "c"]);
}

#[test]
fn required_failure_stops_everything_after_it() {
    let pipeline = pipeline(vec![step("a", true), step("b", true), step("c", false)]);
    let executor = Failing::new(&["b"]);

    let outcome = pipeline.run(&Answer(true), &executor, &Captured::default());

    assert_eq!(outcome.state, PipelineState::Aborted);
    assert_eq!(*executor.executed.borrow(), vec!["a", "b"]);

    let err = outcome.into_result().unwrap_err();
    assert_eq!(err.code.as_str(), "step.failed");
    assert_eq!(err.details["step"], "b");
    assert_eq!(err.details["context"], "@self");
}

#[test]
fn optional_failure_warns_with_hint_and_continues() {
    let pipeline = pipeline(vec![
        step("a", false).with_hint("Try again later"),
        step("b", true),
    ]);
    let executor = Failing::new(&["a"]);
    let reporter = Captured::default();

    let outcome = pipeline.run(&Answer(true), &executor, &reporter);

    assert_eq!(outcome.state, PipelineState::Completed);
    assert_eq!(outcome.report("a").unwrap().status, StepStatus::Warned);
    assert_eq!(outcome.report("b").unwrap().status, StepStatus::Succeeded);
    assert!(reporter.warnings.borrow().contains(&"Try again later".to_string()));
}

#[test]
fn declining_runs_nothing() {
    let pipeline = pipeline(vec![step("a", true), step("b", true)]);
    let executor = Failing::new(&[]);

    let outcome = pipeline.run(&Answer(false), &executor, &Captured::default());

    assert!(!outcome.confirmed);
    assert_eq!(outcome.state, PipelineState::Idle);
    assert!(executor.executed.borrow().is_empty());
    assert!(outcome.into_result().is_ok());
}

#[test]
fn skip_flag_means_no_execution() {
    let pipeline = pipeline(vec![step("a", true).skip_if(true), step("b", true)]);
    let executor = Failing::new(&[]);

    let outcome = pipeline.run(&Answer(true), &executor, &Captured::default());

    assert_eq!(*executor.executed.borrow(), vec!["b"]);
    assert_eq!(outcome.skipped, vec!["a"]);
    assert!(outcome.report("a").is_none());
}

#[test]
fn dependents_of_a_failed_step_are_skipped() {
    let pipeline = pipeline(vec![
        step("dump", false),
        step("drop", false).needs("dump"),
        step("import", false).needs("drop"),
        step("after", false),
    ]);
    let executor = Failing::new(&["dump"]);
    let reporter = Captured::default();

    let outcome = pipeline.run(&Answer(true), &executor, &reporter);

    assert_eq!(*executor.executed.borrow(), vec!["dump", "after"]);
    assert_eq!(outcome.report("drop").unwrap().status, StepStatus::Skipped);
    assert_eq!(outcome.report("import").unwrap().status, StepStatus::Skipped);
    assert!(reporter
        .warnings
        .borrow()
        .contains(&"Skipped drop: 'dump' did not succeed".to_string()));
}
