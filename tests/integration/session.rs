//! Full sessions against the reference engine

use std::sync::Arc;

use hookline::console::{DriverState, Engine, Iteration};

use crate::common::{session, Manual, Scripted};

#[tokio::test]
async fn test_new_binding_recorded() {
    let mut s = session(Scripted::new(&[]));
    s.source.paste("x = 5\n");
    assert_eq!(
        s.repl.step().await.unwrap(),
        Iteration::Executed {
            printed: None,
            recorded: Some("x".to_string()),
        }
    );
    assert_eq!(s.repl.store().get("x"), Some("x = 5"));
}

#[tokio::test]
async fn test_ambiguous_change_leaves_store() {
    let mut s = session(Scripted::new(&[]));
    s.source.paste("x = 5; y = 6\n");
    s.repl.step().await.unwrap();
    assert!(s.repl.store().is_empty());
    assert_eq!(s.repl.engine().environment().len(), 2);
}

#[tokio::test]
async fn test_removal_not_recorded() {
    let mut s = session(Scripted::new(&[]));
    s.source.paste("x = 1\ndel x\n");
    s.repl.step().await.unwrap();
    assert_eq!(
        s.repl.step().await.unwrap(),
        Iteration::Executed {
            printed: None,
            recorded: None,
        }
    );
    assert_eq!(s.repl.store().get("x"), Some("x = 1"));
}

#[tokio::test]
async fn test_bare_name_reopens_recorded_text() {
    let editor = Scripted::new(&[Some("x = 7")]);
    let mut s = session(editor.clone());
    s.source.paste("x = 5\nx\n");
    s.repl.step().await.unwrap();

    assert_eq!(
        s.repl.step().await.unwrap(),
        Iteration::Executed {
            printed: None,
            recorded: Some("x".to_string()),
        }
    );
    assert_eq!(*editor.seeds.lock(), vec!["x = 5".to_string()]);
    assert_eq!(s.repl.store().get("x"), Some("x = 7"));
}

#[tokio::test]
async fn test_bare_name_without_source_uses_repr() {
    let editor = Scripted::new(&[None]);
    let mut s = session(editor.clone());
    s.source.paste("x = 2; y = 'a'\ny\n");
    s.repl.step().await.unwrap();
    assert_eq!(s.repl.step().await.unwrap(), Iteration::Blank);
    assert_eq!(*editor.seeds.lock(), vec!["y = 'a'".to_string()]);
}

#[tokio::test]
async fn test_callable_without_source_passes_through() {
    let editor = Scripted::new(&[]);
    let mut s = session(editor.clone());
    s.source.paste("def f(): pass\nf\n");

    assert_eq!(
        s.repl.step().await.unwrap(),
        Iteration::Executed {
            printed: None,
            recorded: None,
        }
    );
    assert_eq!(
        s.repl.step().await.unwrap(),
        Iteration::Executed {
            printed: Some("<function f>".to_string()),
            recorded: None,
        }
    );
    assert!(editor.seeds.lock().is_empty());
}

#[tokio::test]
async fn test_callable_with_source_is_recorded() {
    let editor = Scripted::new(&[Some("def f(): return 3")]);
    let mut s = session(editor.clone());
    s.source.paste("f = 1\ndef f(): return 2\nf\nf()\n");

    s.repl.step().await.unwrap();
    assert_eq!(s.repl.store().get("f"), Some("f = 1"));

    assert_eq!(
        s.repl.step().await.unwrap(),
        Iteration::Executed {
            printed: None,
            recorded: Some("f".to_string()),
        }
    );
    assert_eq!(s.repl.store().get("f"), Some("def f(): return 2"));

    assert_eq!(
        s.repl.step().await.unwrap(),
        Iteration::Executed {
            printed: None,
            recorded: Some("f".to_string()),
        }
    );
    assert_eq!(*editor.seeds.lock(), vec!["def f(): return 2".to_string()]);
    assert_eq!(s.repl.store().get("f"), Some("def f(): return 3"));

    assert_eq!(
        s.repl.step().await.unwrap(),
        Iteration::Executed {
            printed: Some("3".to_string()),
            recorded: None,
        }
    );
}

#[tokio::test]
async fn test_block_opener_defers_until_editor_completes() {
    let editor = Arc::new(Manual::default());
    let mut s = session(editor.clone());
    s.source.paste("while True:\n");

    let iteration = {
        let step = s.repl.step();
        tokio::pin!(step);
        tokio::select! {
            biased;
            _ = &mut step => panic!("executed before the editor resolved"),
            _ = tokio::task::yield_now() => {}
        }

        let handle = editor.handles.lock()[0].clone();
        assert_eq!(handle.seed(), "while True:\n    ");
        assert!(s.source.is_suspended());

        handle.accept("n = 0\nwhile n < 3:\n    n = n + 1");
        step.await.unwrap()
    };
    assert_eq!(
        iteration,
        Iteration::Executed {
            printed: None,
            recorded: Some("n".to_string()),
        }
    );
    assert_eq!(s.repl.state(), DriverState::AwaitingLine);
    assert_eq!(
        s.repl.store().get("n"),
        Some("n = 0\nwhile n < 3:\n    n = n + 1")
    );
}

#[tokio::test]
async fn test_cancelled_editor_is_empty_input() {
    let mut s = session(Scripted::new(&[None]));
    s.source.paste("while True:\n");
    assert_eq!(s.repl.step().await.unwrap(), Iteration::Blank);
    assert_eq!(s.transcript.text(), "while True:\n>>> ");
    assert!(s.repl.engine().environment().is_empty());
}

#[tokio::test]
async fn test_user_error_printed() {
    let mut s = session(Scripted::new(&[]));
    s.source.paste("1 // 0\n");
    let iteration = s.repl.step().await.unwrap();
    let Iteration::UserError(message) = iteration else {
        panic!("expected a user error, got {:?}", iteration);
    };
    assert!(message.starts_with("ZeroDivisionError: "));
    assert!(s.transcript.text().ends_with(&format!("{}\n", message)));
}
