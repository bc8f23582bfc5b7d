use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use splice_core::{
    annotate_dependencies, apply_change_set, decode_change_set, dry_run, extract_with,
    ApplyOptions, EditEncoding, EditOperation, Error, ExtractOptions, FileContext, FileEditBatch,
    Language, MultiFileChangeSet, SourceProvider, WorkspaceSource,
};
use tempfile::TempDir;

const A_TS: &str = "import { b } from './b';\n\nb();\n";
const B_TS: &str = "export function b() {\n  return 1;\n}\n";

const RESPONSE: &str = "Both files need a change.

src/a.ts
<<<<<<< SEARCH
b();
=======
b(2);
>>>>>>> REPLACE

src/b.ts
<<<<<<< SEARCH
export function b() {
  return 1;
=======
export function b(n: number) {
  return n;
>>>>>>> REPLACE
";

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(dir.path().join("src")).expect("mkdir");
        fs::write(dir.path().join("src/a.ts"), A_TS).expect("write a");
        fs::write(dir.path().join("src/b.ts"), B_TS).expect("write b");
        Self { dir }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.path(relative)).expect("read")
    }
}

type Loaded = (BTreeMap<String, String>, BTreeMap<String, FileContext>);

fn load(source: &WorkspaceSource) -> splice_core::Result<Loaded> {
    let mut originals = BTreeMap::new();
    let mut contexts = BTreeMap::new();
    for path in ["src/a.ts", "src/b.ts"] {
        let text = source.read(path)?;
        contexts.insert(
            path.to_owned(),
            extract_with(&text, Language::from_path(path), ExtractOptions::default()),
        );
        originals.insert(path.to_owned(), text);
    }
    Ok((originals, contexts))
}

#[test]
fn decoded_change_set_applies_across_files() -> splice_core::Result<()> {
    let workspace = Workspace::new();
    let source = WorkspaceSource::open(workspace.root())?;
    let (originals, contexts) = load(&source)?;

    let mut change_set = decode_change_set(RESPONSE, &originals, &[EditEncoding::SearchReplace])?;
    assert_eq!(change_set.paths().collect::<Vec<_>>(), ["src/a.ts", "src/b.ts"]);

    annotate_dependencies(&mut change_set, &contexts);
    assert_eq!(change_set.dependency_edges_touched, ["src/a.ts -> src/b.ts"]);

    let outcome = apply_change_set(&change_set, &source, ApplyOptions::default())?;
    assert!(outcome.is_complete());
    assert_eq!(outcome.tally(), (2, 0));
    assert_eq!(outcome.written, ["src/a.ts", "src/b.ts"]);

    assert_eq!(workspace.read("src/a.ts"), "import { b } from './b';\n\nb(2);\n");
    assert_eq!(
        workspace.read("src/b.ts"),
        "export function b(n: number) {\n  return n;\n}\n"
    );
    Ok(())
}

#[test]
fn dry_run_leaves_disk_alone() -> splice_core::Result<()> {
    let workspace = Workspace::new();
    let source = WorkspaceSource::open(workspace.root())?;
    let (originals, _) = load(&source)?;

    let change_set = decode_change_set(RESPONSE, &originals, &[EditEncoding::SearchReplace])?;
    let previews = dry_run(&change_set, ApplyOptions::default())?;

    assert_eq!(previews.len(), 2);
    assert!(previews[0].patch.contains("-b();"));
    assert!(previews[0].patch.contains("+b(2);"));
    assert!(previews[1].patch.contains("+  return n;"));
    assert_eq!(workspace.read("src/a.ts"), A_TS);
    assert_eq!(workspace.read("src/b.ts"), B_TS);
    Ok(())
}

#[test]
fn conflicting_change_set_touches_nothing() -> splice_core::Result<()> {
    let workspace = Workspace::new();
    let source = WorkspaceSource::open(workspace.root())?;

    let mut change_set = MultiFileChangeSet::new("overlap");
    change_set.files = vec![
        FileEditBatch::new("src/a.ts", A_TS).with_edit(EditOperation::new(3, 3, "c();")),
        FileEditBatch::new("src/b.ts", B_TS)
            .with_edit(EditOperation::new(1, 2, "x"))
            .with_edit(EditOperation::new(2, 3, "y")),
    ];

    let err = apply_change_set(&change_set, &source, ApplyOptions::default())
        .expect_err("conflict");
    match err {
        Error::Conflict { source } => {
            assert_eq!(source.errors.len(), 1);
            assert!(source.errors[0].starts_with("src/b.ts:"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(workspace.read("src/a.ts"), A_TS);
    assert_eq!(workspace.read("src/b.ts"), B_TS);
    Ok(())
}

#[test]
fn new_files_are_created() -> splice_core::Result<()> {
    let workspace = Workspace::new();
    let source = WorkspaceSource::open(workspace.root())?;

    let mut change_set = MultiFileChangeSet::new("add helper");
    change_set.files = vec![FileEditBatch::new("src/util/helper.ts", "")
        .with_edit(EditOperation::insertion(1, "export const helper = 1;\n"))];

    let outcome = apply_change_set(&change_set, &source, ApplyOptions::default())?;
    assert_eq!(outcome.written, ["src/util/helper.ts"]);
    assert_eq!(workspace.read("src/util/helper.ts"), "export const helper = 1;\n");
    Ok(())
}
