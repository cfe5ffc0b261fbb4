//! Property tests for the text and matching primitives.

use file_surgery::matcher::LiteralMatcher;
use file_surgery::text::{LineEnding, LineIndex};
use file_surgery::{Surgeon, SurgeryConfig, SurgeryOptions};
use proptest::prelude::*;
use std::fs;
use tempfile::TempDir;

fn text_with_breaks() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            4 => "[a-z ]{0,8}",
            1 => Just("\n".to_string()),
            1 => Just("\r\n".to_string()),
            1 => Just("\r".to_string()),
        ],
        0..24,
    )
    .prop_map(|parts| parts.concat())
}

proptest! {
    #[test]
    fn line_spans_tile_the_text(text in text_with_breaks()) {
        let index = LineIndex::new(&text);
        let mut cursor = 0;
        for span in index.spans() {
            prop_assert_eq!(span.start, cursor);
            prop_assert!(span.content_end <= span.end);
            cursor = span.end;
        }
        prop_assert_eq!(cursor, text.len());
    }

    #[test]
    fn every_offset_maps_into_its_line(text in text_with_breaks()) {
        let index = LineIndex::new(&text);
        for offset in 0..text.len() {
            let line = index.line_of(offset);
            let span = index.get(line).unwrap();
            prop_assert!(span.start <= offset && offset < span.end);
        }
    }

    #[test]
    fn applying_line_endings_is_idempotent(text in text_with_breaks()) {
        for eol in [LineEnding::Lf, LineEnding::Crlf] {
            let once = eol.apply(&text);
            prop_assert_eq!(eol.apply(&once), once);
        }
    }

    #[test]
    fn literal_spans_are_ordered_and_disjoint(
        text in "[ab]{0,40}",
        pattern in "[ab]{1,3}",
    ) {
        let spans = LiteralMatcher::default().spans(&text, &pattern).unwrap();
        for span in &spans {
            prop_assert_eq!(&text[span.clone()], pattern.as_str());
        }
        for pair in spans.windows(2) {
            prop_assert!(pair[0].end <= pair[1].start);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn replacing_a_word_with_itself_changes_nothing(
        lines in prop::collection::vec("[a-z]{1,6}( [a-z]{1,6}){0,3}", 1..6),
        pick in any::<prop::sample::Index>(),
    ) {
        let dir = TempDir::new().unwrap();
        let surgeon = Surgeon::new(
            SurgeryConfig::default().with_backup_dir(dir.path().join("backups")),
        );
        let path = dir.path().join("words.txt");
        let text = lines.join("\n") + "\n";
        fs::write(&path, &text).unwrap();

        let words: Vec<&str> = text.split_whitespace().collect();
        let word = words[pick.index(words.len())];

        let result = surgeon.replace(&path, word, word, &SurgeryOptions::default());

        prop_assert!(result.success, "{}", result.message);
        prop_assert_eq!(fs::read_to_string(&path).unwrap(), text);
        prop_assert!(surgeon.snapshots().list_snapshots(None).unwrap().is_empty());
    }

    #[test]
    fn replacing_an_indented_block_with_itself_changes_nothing(
        lines in prop::collection::vec((0usize..3, "[a-z]{1,6}( [a-z]{1,6}){0,2};?"), 2..7),
        start in any::<prop::sample::Index>(),
        len in 2usize..4,
        ext in prop_oneof![Just("txt"), Just("py"), Just("rs")],
    ) {
        let dir = TempDir::new().unwrap();
        let mut config = SurgeryConfig::default().with_backup_dir(dir.path().join("backups"));
        config.validate_syntax = false;
        let surgeon = Surgeon::new(config);
        let path = dir.path().join(format!("block.{ext}"));
        let rendered: Vec<String> = lines
            .iter()
            .map(|(depth, body)| format!("{}{body}", "    ".repeat(*depth)))
            .collect();
        let text = rendered.join("\n") + "\n";
        fs::write(&path, &text).unwrap();

        let first = start.index(rendered.len() - 1);
        let last = (first + len).min(rendered.len());
        let block = rendered[first..last].join("\n");
        let block = block.trim_start();

        let result = surgeon.replace(&path, block, block, &SurgeryOptions::default());

        prop_assert!(result.success, "{}", result.message);
        prop_assert_eq!(fs::read_to_string(&path).unwrap(), text);
        prop_assert!(surgeon.snapshots().list_snapshots(None).unwrap().is_empty());
    }
}
