//! End-to-end exercises of a builder session over the in-memory document
//! store.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use tessera_bus::{BuilderEvent, EventKind};
use tessera_common::{Designation, DocumentId, Section, SectionContent, SectionKind, SectionPatch};
use tessera_controller::{MemoryDocumentStore, PersistenceError};
use tessera_engine::{IdentityExpander, RecordingHost};
use tessera_session::{BuilderSession, SessionError};

fn open_session() -> BuilderSession {
    BuilderSession::open(
        DocumentId(1),
        "1.0.0",
        Box::new(MemoryDocumentStore::new()),
        Instant::now(),
    )
    .unwrap()
}

fn html_content(html: &str, js: &str) -> SectionContent {
    SectionContent::Html {
        html: html.to_string(),
        css: String::new(),
        js: js.to_string(),
    }
}

fn create_html(session: &mut BuilderSession, html: &str, title: &str) -> Section {
    session
        .create_section(
            SectionKind::Html,
            html_content(html, ""),
            Some(title),
            Designation::Library,
        )
        .unwrap()
}

/// Record every published kind for later assertions.
fn record_events(session: &mut BuilderSession, kind: EventKind) -> Rc<RefCell<u32>> {
    let count = Rc::new(RefCell::new(0u32));
    let counter = count.clone();
    session.bus().subscribe(kind, move |_| {
        *counter.borrow_mut() += 1;
        Ok(())
    });
    count
}

#[test]
fn test_save_round_trip_clears_dirty() {
    let mut session = open_session();
    let succeeded = record_events(&mut session, EventKind::SaveSucceeded);

    create_html(&mut session, "<h1>Hero</h1>", "Hero");
    create_html(&mut session, "<p>Body</p>", "Body");
    assert!(session.is_dirty());

    session.save().unwrap();
    assert!(!session.is_dirty());
    assert_eq!(*succeeded.borrow(), 1);
    assert_eq!(session.sections().len(), 2);
}

#[test]
fn test_reorder_then_undo_restores_original_order() {
    let mut session = open_session();
    let a = create_html(&mut session, "<p>a</p>", "A").id;
    let b = create_html(&mut session, "<p>b</p>", "B").id;
    let c = create_html(&mut session, "<p>c</p>", "C").id;

    let restored = record_events(&mut session, EventKind::HistoryRestored);

    session.reorder(&[c, a, b]).unwrap();
    assert_eq!(session.section_ids(), vec![c, a, b]);

    assert!(session.undo());
    assert_eq!(session.section_ids(), vec![a, b, c]);
    assert_eq!(*restored.borrow(), 1);

    assert!(session.redo());
    assert_eq!(session.section_ids(), vec![c, a, b]);
}

#[test]
fn test_failed_reorder_rolls_back_order() {
    let mut transport = MemoryDocumentStore::new();
    transport.fail_writes = Some(PersistenceError::Transport("offline".to_string()));
    let mut session = BuilderSession::open(
        DocumentId(1),
        "1.0.0",
        Box::new(transport),
        Instant::now(),
    )
    .unwrap();

    let a = create_html(&mut session, "<p>a</p>", "A").id;
    let b = create_html(&mut session, "<p>b</p>", "B").id;
    let failed = record_events(&mut session, EventKind::SaveFailed);

    assert!(session.reorder(&[b, a]).is_err());
    assert_eq!(session.section_ids(), vec![a, b]);
    assert_eq!(*failed.borrow(), 1);
}

#[test]
fn test_save_gate_blocks_isolated_global_access() {
    let mut session = open_session();
    let failed = record_events(&mut session, EventKind::SaveFailed);

    let section = session
        .create_section(
            SectionKind::Html,
            html_content("<p>widget</p>", "document.body.innerHTML = '';"),
            Some("Widget"),
            Designation::Library,
        )
        .unwrap();
    session
        .update_section(
            section.id,
            &SectionPatch {
                isolation_enabled: Some(true),
                ..SectionPatch::default()
            },
        )
        .unwrap();

    let err = session.save().unwrap_err();
    assert!(matches!(err, SessionError::Engine(_)));
    assert!(session.is_dirty());
    assert_eq!(*failed.borrow(), 1);
}

#[test]
fn test_render_and_pump_executes_rewritten_script() {
    let mut session = open_session();
    let mut host = RecordingHost::new();

    let section = session
        .create_section(
            SectionKind::Html,
            html_content("<p id=\"x\"></p>", "document.getElementById('x');"),
            None,
            Designation::Library,
        )
        .unwrap();
    session
        .update_section(
            section.id,
            &SectionPatch {
                isolation_enabled: Some(true),
                ..SectionPatch::default()
            },
        )
        .unwrap();

    let outcome = session.render(&mut host, &IdentityExpander, Instant::now());
    assert_eq!(outcome.rendered.len(), 1);
    assert!(outcome.skipped.is_empty());

    let runs = session.pump(&mut host, Instant::now());
    assert_eq!(runs.len(), 1);
    assert!(host.executed[0].js.contains("__scope.querySelector('#x')"));
}

#[test]
fn test_delete_section_tears_down_live_scopes() {
    let mut session = open_session();
    let mut host = RecordingHost::new();

    let id = create_html(&mut session, "<p>gone</p>", "Doomed").id;
    session.render(&mut host, &IdentityExpander, Instant::now());
    assert_eq!(host.mounted_count(), 1);

    session.delete_section(&mut host, id);
    assert!(session.sections().is_empty());
    assert_eq!(host.mounted_count(), 0);
}

#[test]
fn test_autosave_fires_only_when_dirty_and_due() {
    let start = Instant::now();
    let mut session = BuilderSession::open(
        DocumentId(1),
        "1.0.0",
        Box::new(MemoryDocumentStore::new()),
        start,
    )
    .unwrap();
    let autosaved = record_events(&mut session, EventKind::Autosaved);

    // Clean document: the timer fires but nothing saves.
    session.tick(start + Duration::from_secs(61));
    assert_eq!(*autosaved.borrow(), 0);

    create_html(&mut session, "<p>draft</p>", "Draft");
    session.tick(start + Duration::from_secs(100));
    assert_eq!(*autosaved.borrow(), 0); // next firing not due yet

    session.tick(start + Duration::from_secs(122));
    assert_eq!(*autosaved.borrow(), 1);
    assert!(!session.is_dirty());
}

#[test]
fn test_cancelled_autosave_stays_silent() {
    let start = Instant::now();
    let mut session = BuilderSession::open(
        DocumentId(1),
        "1.0.0",
        Box::new(MemoryDocumentStore::new()),
        start,
    )
    .unwrap();
    let autosaved = record_events(&mut session, EventKind::Autosaved);

    create_html(&mut session, "<p>draft</p>", "Draft");
    session.cancel_autosave();
    session.tick(start + Duration::from_secs(600));
    assert_eq!(*autosaved.borrow(), 0);
    assert!(session.is_dirty());
}

#[test]
fn test_export_import_round_trip() {
    let mut exporter = open_session();
    create_html(&mut exporter, "<h1>Hi</h1>", "Greeting");
    exporter
        .create_section(
            SectionKind::Shortcode,
            SectionContent::Shortcode("[gallery id=\"5\"]".to_string()),
            Some("Gallery"),
            Designation::Store,
        )
        .unwrap();
    let exported = exporter.export().unwrap();

    let mut importer = open_session();
    let count = importer.import(&exported).unwrap();
    assert_eq!(count, 2);

    let sections = importer.sections();
    assert_eq!(sections[0].title, "Greeting");
    assert_eq!(
        sections[0].content,
        html_content("<h1>Hi</h1>", "")
    );
    assert_eq!(sections[1].designation, Designation::Store);
    // Imported state counts as synced.
    assert!(!importer.is_dirty());
}

#[test]
fn test_legacy_import_forces_isolation_off() {
    let raw = r#"{
        "sections":[{"id":1,"type":"html","isolationEnabled":true,
                     "content":{"html":"PGgxPkhpPC9oMT4=","css":"","js":""}}],
        "version":"0.9.0",
        "lastModified":"2025-06-01T00:00:00Z",
        "checksum":""
    }"#;

    let mut session = open_session();
    assert_eq!(session.import(raw).unwrap(), 1);
    assert!(!session.sections()[0].isolation_enabled);
    match &session.sections()[0].content {
        SectionContent::Html { html, .. } => assert_eq!(html, "<h1>Hi</h1>"),
        other => panic!("unexpected content: {other:?}"),
    }
}

#[test]
fn test_change_designation() {
    let mut session = open_session();
    let id = create_html(&mut session, "<p>x</p>", "Movable").id;

    let updated = session.change_designation(id, Designation::Code).unwrap();
    assert_eq!(updated.designation, Designation::Code);
    assert_eq!(
        session.sections()[0].designation,
        Designation::Code
    );
}
