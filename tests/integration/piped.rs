//! Piped host

use std::sync::Arc;

use hookline::console::Transcript;
use hookline::host::{piped, SessionOptions};
use hookline::util::config::UserConfig;

fn options(hooks: bool) -> SessionOptions {
    SessionOptions {
        config: UserConfig::default(),
        hooks,
    }
}

#[tokio::test]
async fn test_transcript_interleaves_input_and_output() {
    let transcript = Transcript::new();
    let input: &[u8] = b"x = 5\nx + 1\nprint('hi')\n";
    piped::run_with(options(false), input, Arc::new(transcript.clone()))
        .await
        .unwrap();
    assert_eq!(
        transcript.text(),
        ">>> x = 5\n>>> x + 1\n6\n>>> print('hi')\nhi\n>>> "
    );
}

#[tokio::test]
async fn test_user_errors_do_not_end_session() {
    let transcript = Transcript::new();
    let input: &[u8] = b"nope\n1 + 1";
    piped::run_with(options(false), input, Arc::new(transcript.clone()))
        .await
        .unwrap();
    assert_eq!(
        transcript.text(),
        ">>> nope\nNameError: name 'nope' is not defined\n>>> 1 + 1\n2\n>>> "
    );
}

#[tokio::test]
async fn test_hooks_without_editor_cancel() {
    let transcript = Transcript::new();
    let input: &[u8] = b"while True:\n7\n";
    piped::run_with(options(true), input, Arc::new(transcript.clone()))
        .await
        .unwrap();
    assert_eq!(transcript.text(), ">>> while True:\n>>> 7\n7\n>>> ");
}

#[tokio::test]
async fn test_empty_input() {
    let transcript = Transcript::new();
    let input: &[u8] = b"";
    piped::run_with(options(false), input, Arc::new(transcript.clone()))
        .await
        .unwrap();
    assert_eq!(transcript.text(), ">>> ");
}
