use splice_agents::ScriptedGateway;
use splice_core::{Config, EditSession, Error, MemorySource, RegistryError, SourceError};

const GREET: &str = "export function greet() {\n  return 'hi';\n}\n";

const RESPONSE: &str = r#"Sure, here is the change.

```json
{
  "summary": "friendlier greeting",
  "edits": [
    {
      "startLine": 2,
      "endLine": 2,
      "oldText": "  return 'hi';",
      "newText": "  return 'hello';",
      "description": "longer word"
    }
  ]
}
```"#;

#[test]
fn request_stages_then_accept_and_save() -> splice_core::Result<()> {
    let source = MemorySource::new([("src/greet.ts", GREET)]);
    let gateway = ScriptedGateway::new([RESPONSE]);
    let mut session = EditSession::open(&source, "src/greet.ts", Config::default())?;

    let staged = session.request(&gateway, "Say hello")?;
    assert_eq!(staged, ["edit-1"]);
    assert_eq!(session.highlights().len(), 1);
    assert!(!session.is_dirty());

    let prompts = gateway.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Say hello"));
    assert!(prompts[0].contains("2 |   return 'hi';"));

    session.accept_one("edit-1")?;
    assert!(session.pending().is_empty());
    assert_eq!(session.buffer(), "export function greet() {\n  return 'hello';\n}\n");
    assert!(session.diff()?.contains("+  return 'hello';"));

    assert!(session.save()?);
    assert!(!session.save()?);
    assert_eq!(source.snapshot()["src/greet.ts"], session.buffer());
    Ok(())
}

#[test]
fn unknown_ids_are_reported() -> splice_core::Result<()> {
    let source = MemorySource::new([("src/greet.ts", GREET)]);
    let mut session = EditSession::open(&source, "src/greet.ts", Config::default())?;

    let err = session.accept_one("nope").expect_err("unknown id");
    assert!(matches!(
        err,
        Error::Registry {
            source: RegistryError::UnknownEdit { .. }
        }
    ));
    Ok(())
}

#[test]
fn rejected_edits_leave_buffer_alone() -> splice_core::Result<()> {
    let source = MemorySource::new([("src/greet.ts", GREET)]);
    let mut session = EditSession::open(&source, "src/greet.ts", Config::default())?;

    let staged = session.stage_response(RESPONSE)?;
    session.reject_one(&staged[0])?;
    assert!(session.pending().is_empty());
    assert_eq!(session.buffer(), GREET);
    assert!(session.diff()?.is_empty());
    Ok(())
}

#[test]
fn restaging_replaces_pending_edits() -> splice_core::Result<()> {
    let source = MemorySource::new([("src/greet.ts", GREET)]);
    let mut session = EditSession::open(&source, "src/greet.ts", Config::default())?;

    session.stage_response(RESPONSE)?;
    session.stage_response(RESPONSE)?;
    assert_eq!(session.pending().len(), 1);
    Ok(())
}

#[test]
fn unreadable_response_keeps_pending_edits() -> splice_core::Result<()> {
    let source = MemorySource::new([("src/greet.ts", GREET)]);
    let mut session = EditSession::open(&source, "src/greet.ts", Config::default())?;

    session.stage_response(RESPONSE)?;
    let err = session
        .stage_response("I could not figure out what to change.")
        .expect_err("no encoding applies");
    assert!(matches!(err, Error::Decode { .. }));
    assert_eq!(session.pending().len(), 1);
    Ok(())
}

#[test]
fn save_refuses_to_overwrite_external_changes() -> splice_core::Result<()> {
    let source = MemorySource::new([("src/greet.ts", GREET)]);
    let mut session = EditSession::open(&source, "src/greet.ts", Config::default())?;

    session.stage_response(RESPONSE)?;
    let report = session.accept_all();
    assert!(report.is_complete());

    splice_core::SourceProvider::write(&source, "src/greet.ts", "// edited elsewhere\n")?;
    let err = session.save().expect_err("stale");
    assert!(matches!(
        err,
        Error::Source {
            source: SourceError::Stale { .. }
        }
    ));
    assert_eq!(source.snapshot()["src/greet.ts"], "// edited elsewhere\n");
    Ok(())
}

#[test]
fn switching_files_drops_pending_edits() -> splice_core::Result<()> {
    let source = MemorySource::new([("src/greet.ts", GREET), ("src/other.ts", "const x = 1;\n")]);
    let mut session = EditSession::open(&source, "src/greet.ts", Config::default())?;

    session.stage_response(RESPONSE)?;
    session.switch_file("src/other.ts")?;
    assert_eq!(session.path(), "src/other.ts");
    assert!(session.pending().is_empty());
    assert_eq!(session.context().symbols[0].name, "x");
    Ok(())
}
