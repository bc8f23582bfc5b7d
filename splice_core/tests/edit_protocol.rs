use splice_core::{
    apply_batch, decode, decode_as, encode_search_replace, validate, EditEncoding, EditOperation,
    FileEditBatch, MultiFileChangeSet,
};

const ABC: &str = "a\nb\nc\n";

#[test]
fn empty_batch_leaves_buffer_untouched() {
    for buffer in ["", "a", ABC, "no trailing newline\nsecond"] {
        let report = apply_batch(buffer, &[]);
        assert_eq!(report.buffer, buffer);
        assert!(report.succeeded.is_empty());
        assert!(report.failed.is_empty());
    }
}

#[test]
fn verified_single_line_replacement() {
    let edit = EditOperation::new(2, 2, "B").with_old_text("b");
    let report = apply_batch(ABC, &[edit]);
    assert_eq!(report.buffer, "a\nB\nc\n");
    assert!(report.is_complete());
}

#[test]
fn non_overlapping_edits_apply_in_any_order() {
    let first = EditOperation::new(1, 1, "X").with_old_text("a");
    let last = EditOperation::new(3, 3, "Z").with_old_text("c");

    let forward = apply_batch(ABC, &[first.clone(), last.clone()]);
    let backward = apply_batch(ABC, &[last, first]);

    assert_eq!(forward.buffer, "X\nb\nZ\n");
    assert_eq!(backward.buffer, forward.buffer);
}

#[test]
fn line_count_changes_do_not_disturb_edits_above() {
    let grow = EditOperation::new(3, 3, "c1\nc2\nc3");
    let shrink = EditOperation::new(1, 2, "ab");
    let report = apply_batch(ABC, &[shrink, grow]);
    assert_eq!(report.buffer, "ab\nc1\nc2\nc3\n");
}

#[test]
fn insertion_lands_above_a_replacement_of_the_same_line() {
    let insert = EditOperation::insertion(2, "X\n").with_id("insert");
    let replace = EditOperation::new(2, 2, "B").with_old_text("b").with_id("replace");

    let forward = apply_batch("a\nb\n", &[insert.clone(), replace.clone()]);
    let backward = apply_batch("a\nb\n", &[replace, insert]);

    assert_eq!(forward.buffer, "a\nX\nB\n");
    assert!(forward.is_complete());
    assert_eq!(backward.buffer, forward.buffer);
    assert!(backward.is_complete());
}

#[test]
fn stale_old_text_fails_only_that_edit() {
    let stale = EditOperation::new(1, 1, "X").with_old_text("not a").with_id("stale");
    let fine = EditOperation::new(3, 3, "Z").with_old_text("c").with_id("fine");
    let report = apply_batch(ABC, &[stale, fine]);
    assert_eq!(report.buffer, "a\nb\nZ\n");
    assert_eq!(report.succeeded, ["fine"]);
    assert_eq!(report.failed_ids().collect::<Vec<_>>(), ["stale"]);
}

#[test]
fn search_replace_round_trip_locates_original_span() {
    let buffer = "fn main() {\n    foo();\n}\n";
    let block = encode_search_replace(Some("src/main.rs"), "    foo();", "    bar();");

    let decoded = decode_as(EditEncoding::SearchReplace, &block, buffer).expect("decode");
    assert_eq!(decoded.edits.len(), 1);
    let edit = &decoded.edits[0];
    assert_eq!(edit.line_range(), (2, 2));
    assert_eq!(edit.new_text, "    bar();");
    assert_eq!(edit.file_name.as_deref(), Some("src/main.rs"));

    let report = apply_batch(buffer, &decoded.edits);
    assert_eq!(report.buffer, "fn main() {\n    bar();\n}\n");
}

#[test]
fn missing_search_text_yields_no_edits() {
    let block = encode_search_replace(None, "foo()", "bar()");
    let decoded = decode(&block, ABC).expect("search/replace markers are present");
    assert_eq!(decoded.encoding, EditEncoding::SearchReplace);
    assert!(decoded.edits.is_empty());
}

#[test]
fn structured_and_diff_responses_converge() {
    let structured = r#"```json
{"edits": [{"startLine": 2, "endLine": 2, "oldText": "b", "newText": "B"}]}
```"#;
    let diff = "--- a/abc.txt\n+++ b/abc.txt\n@@ -1,3 +1,3 @@\n a\n-b\n+B\n c\n";

    let from_json = decode(structured, ABC).expect("structured");
    let from_diff = decode(diff, ABC).expect("diff");
    assert_eq!(from_json.encoding, EditEncoding::Structured);
    assert_eq!(from_diff.encoding, EditEncoding::UnifiedDiff);

    assert_eq!(apply_batch(ABC, &from_json.edits).buffer, "a\nB\nc\n");
    assert_eq!(apply_batch(ABC, &from_diff.edits).buffer, "a\nB\nc\n");
}

#[test]
fn overlapping_ranges_conflict_and_adjacent_ranges_do_not() {
    let set = |first: (u32, u32), second: (u32, u32)| {
        let mut set = MultiFileChangeSet::new("pair");
        set.files = vec![FileEditBatch::new("A", "")
            .with_edit(EditOperation::new(first.0, first.1, "x"))
            .with_edit(EditOperation::new(second.0, second.1, "y"))];
        set
    };

    assert!(!validate(&set((1, 5), (3, 8))).valid);
    assert!(!validate(&set((3, 8), (1, 5))).valid);
    assert!(validate(&set((1, 5), (6, 10))).valid);
    assert!(validate(&set((6, 10), (1, 5))).valid);
}

#[test]
fn conflict_report_names_the_file() {
    let mut set = MultiFileChangeSet::new("conflict");
    set.files = vec![
        FileEditBatch::new("A", "")
            .with_edit(EditOperation::new(1, 3, "x"))
            .with_edit(EditOperation::new(2, 5, "y")),
        FileEditBatch::new("B", "").with_edit(EditOperation::new(2, 5, "z")),
    ];

    let report = validate(&set);
    assert!(!report.valid);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].starts_with("A:"));
    assert_eq!(report.conflicts[0].file_path, "A");
}
