//! Property tests for the line source

use std::sync::Arc;

use hookline::console::{Key, LineSource, Transcript};
use proptest::prelude::*;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
}

fn source() -> LineSource {
    LineSource::new(Arc::new(Transcript::new()))
}

proptest! {
    #[test]
    fn pasted_lines_come_before_typed_ones(
        lines in prop::collection::vec("[a-z0-9 =+]{0,8}", 2..6),
        tail in "[a-z]{0,5}",
        typed in "[a-z]{1,5}",
        waiting in any::<bool>(),
    ) {
        let source = source();
        let rt = runtime();

        let first = waiting.then(|| source.next_line());
        source.paste(&format!("{}\n{}", lines.join("\n"), tail));
        prop_assert_eq!(source.current_line(), tail.clone());

        let mut read = Vec::new();
        if let Some(first) = first {
            read.push(rt.block_on(first).unwrap());
        }
        for c in typed.chars() {
            source.handle_key(Key::Char(c));
        }
        source.handle_key(Key::Enter);

        while read.len() < lines.len() {
            read.push(rt.block_on(source.next_line()).unwrap());
        }
        prop_assert_eq!(&read, &lines);
        prop_assert_eq!(
            rt.block_on(source.next_line()).unwrap(),
            format!("{}{}", tail, typed)
        );
    }

    #[test]
    fn concurrent_reads_share_one_request(
        readers in 1usize..8,
        line in "[a-z ]{0,10}",
    ) {
        let source = source();
        let rt = runtime();

        let pending: Vec<_> = (0..readers).map(|_| source.next_line()).collect();
        prop_assert!(source.has_outstanding_request());
        source.paste(&format!("{}\n", line));
        prop_assert!(!source.has_outstanding_request());

        for read in pending {
            prop_assert_eq!(rt.block_on(read).unwrap(), line.clone());
        }
        prop_assert_eq!(source.pending_len(), 0);
    }
}
