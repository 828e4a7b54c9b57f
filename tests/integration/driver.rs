//! Driver tests against a scripted engine

use std::sync::Arc;

use hookline::console::{
    ConsoleError, DriverState, EditorBridge, Engine, ErrorKind, ExecError, Execution, Iteration,
    LineSource, Repl, Snapshot, Transcript, UserError,
};
use indexmap::IndexMap;

use crate::common::Scripted;

/// `name = n` binds an integer, `boom` fails the integration, `bad`
/// raises a user error, anything else evaluates to its length.
#[derive(Debug, Default)]
struct FakeEngine {
    env: IndexMap<String, Arc<i64>>,
    executed: Vec<String>,
}

impl Engine for FakeEngine {
    type Value = i64;

    fn execute(
        &mut self,
        source: &str,
    ) -> Result<Execution<i64>, ExecError> {
        self.executed.push(source.to_string());
        match source.trim() {
            "boom" => Err(ExecError::Integration(anyhow::anyhow!("engine crashed"))),
            "bad" => Err(UserError::new(ErrorKind::Runtime, "bad input").into()),
            other => match other.split_once('=') {
                Some((name, value)) => {
                    let value = value.trim().parse().unwrap_or_default();
                    self.env.insert(name.trim().to_string(), Arc::new(value));
                    Ok(Execution::empty())
                }
                None => Ok(Execution::with_value(Arc::new(other.len() as i64))),
            },
        }
    }

    fn represent(
        &self,
        value: &i64,
    ) -> String {
        value.to_string()
    }

    fn environment(&self) -> Snapshot<i64> {
        self.env
            .iter()
            .map(|(k, v)| (k.clone(), Arc::clone(v)))
            .collect()
    }

    fn is_callable(
        &self,
        _value: &i64,
    ) -> bool {
        false
    }
}

fn repl() -> (Repl<FakeEngine>, LineSource, Transcript) {
    let transcript = Transcript::new();
    let source = LineSource::new(Arc::new(transcript.clone()));
    let bridge = EditorBridge::new(source.clone(), Scripted::new(&[]));
    let repl = Repl::new(FakeEngine::default(), source.clone(), bridge).with_prompt("> ");
    (repl, source, transcript)
}

#[tokio::test]
async fn test_prints_value_repr() {
    let (mut repl, source, transcript) = repl();
    source.paste("abc\n");
    let iteration = repl.step().await.unwrap();
    assert_eq!(
        iteration,
        Iteration::Executed {
            printed: Some("3".to_string()),
            recorded: None,
        }
    );
    assert_eq!(transcript.text(), "abc\n> 3\n");
    assert_eq!(repl.state(), DriverState::AwaitingLine);
}

#[tokio::test]
async fn test_blank_line_is_not_executed() {
    let (mut repl, source, _) = repl();
    source.paste("   \n");
    assert_eq!(repl.step().await.unwrap(), Iteration::Blank);
    assert!(repl.engine().executed.is_empty());
}

#[tokio::test]
async fn test_user_error_printed_and_loop_continues() {
    let (mut repl, source, transcript) = repl();
    source.paste("bad\nok\n");
    assert_eq!(
        repl.step().await.unwrap(),
        Iteration::UserError("RuntimeError: bad input".to_string())
    );
    assert!(transcript.text().ends_with("RuntimeError: bad input\n"));
    assert!(matches!(
        repl.step().await.unwrap(),
        Iteration::Executed { .. }
    ));
}

#[tokio::test]
async fn test_integration_error_is_fatal() {
    let (mut repl, source, _) = repl();
    source.paste("boom\nnever\n");
    assert!(matches!(
        repl.run().await,
        Err(ConsoleError::Integration(_))
    ));
    assert_eq!(repl.engine().executed, vec!["boom".to_string()]);
    assert_eq!(source.pending_len(), 1);
}

#[tokio::test]
async fn test_run_ends_cleanly_on_close() {
    let (mut repl, source, transcript) = repl();
    source.paste("a = 1\nxy\n");
    source.close();
    repl.run().await.unwrap();
    assert_eq!(transcript.text(), "a = 1\nxy\n> > 2\n> ");
    assert_eq!(repl.store().get("a"), Some("a = 1"));
}

#[tokio::test]
async fn test_rebinding_is_recorded() {
    let (mut repl, source, _) = repl();
    source.paste("a = 1\na = 1\n");
    repl.step().await.unwrap();
    let iteration = repl.step().await.unwrap();
    assert_eq!(
        iteration,
        Iteration::Executed {
            printed: None,
            recorded: Some("a".to_string()),
        }
    );
}
