mod common;

use common::{count, Project, CMS_DOC};
use crudgen::generator::{generate_document, Phases};
use pretty_assertions::assert_eq;

fn with_hooks(doc: &str) -> String {
    doc.replace(
        "    tableTag: cms_article\n",
        "    tableTag: cms_article\n    hooks: {beforeCreating: true, afterDeleted: true}\n",
    )
}

#[test]
fn test_second_run_is_byte_identical() {
    let project = Project::new("cms", &with_hooks(CMS_DOC));
    let config = project.config();
    let first = generate_document(&project.doc, &config, Phases::ALL, false).unwrap();
    assert!(!first.bootstrapped.is_empty());
    let before = project.snapshot();

    let second = generate_document(&project.doc, &config, Phases::ALL, false).unwrap();
    assert!(second.bootstrapped.is_empty());
    assert_eq!(second.inserted(), 0);
    assert_eq!(project.snapshot(), before);
}

#[test]
fn test_hook_stubs_land_once_in_extension_file() {
    let project = Project::new("cms", &with_hooks(CMS_DOC));
    let config = project.config();
    generate_document(&project.doc, &config, Phases::ALL, false).unwrap();
    generate_document(&project.doc, &config, Phases::ALL, false).unwrap();

    let ext = project.read("src/stores/cms_x.rs");
    assert_eq!(count(&ext, "fn db_before_create_article("), 1);
    assert_eq!(count(&ext, "fn after_deleted_article("), 1);
    assert!(ext.contains("use super::cms_gen::*;"));
}

#[test]
fn test_hand_edits_survive_regeneration() {
    let project = Project::new("cms", &with_hooks(CMS_DOC));
    let config = project.config();
    generate_document(&project.doc, &config, Phases::ALL, false).unwrap();

    let ext = project.read("src/stores/cms_x.rs");
    let edited = ext.replace(
        "use super::cms_gen::*;",
        "use super::cms_gen::*;\n\n/// Slug of a title.\npub fn slugify(title: &str) -> String {\n    title.to_lowercase().replace(' ', \"-\")\n}",
    );
    project.write("src/stores/cms_x.rs", &edited);

    generate_document(&project.doc, &config, Phases::ALL, false).unwrap();
    assert_eq!(project.read("src/stores/cms_x.rs"), edited);
}

#[test]
fn test_new_store_field_appends_after_existing_fields() {
    let project = Project::new("cms", CMS_DOC);
    let config = project.config();
    generate_document(&project.doc, &config, Phases::ALL, false).unwrap();

    let wrap = project.read("src/stores/wrap.rs");
    let edited = wrap.replace(
        "    content_store: cms_gen::ContentStoreImpl,\n",
        "    content_store: cms_gen::ContentStoreImpl,\n    // search index client\n    search: Option<String>,\n",
    );
    assert_ne!(edited, wrap);
    project.write("src/stores/wrap.rs", &edited);

    let doc = CMS_DOC.replace(
        "    hodBread: [Article]\n",
        "    hodBread: [Article]\n  - name: auditStore\n    hodGL: [Article]\n",
    );
    project.set_doc(&doc);
    generate_document(&project.doc, &config, Phases::from_bits(3).unwrap(), false).unwrap();

    let wrap = project.read("src/stores/wrap.rs");
    let db = wrap.find("    db: OrmDb,").unwrap();
    let content = wrap.find("    content_store: cms_gen::ContentStoreImpl,").unwrap();
    let search = wrap.find("    search: Option<String>,").unwrap();
    let audit = wrap.find("    audit_store: cms_gen::AuditStoreImpl,").unwrap();
    assert!(db < content && content < search && search < audit);
    assert!(wrap.contains("// search index client"));
    assert_eq!(count(&wrap, "content_store: cms_gen::ContentStoreImpl,"), 1);
}

#[test]
fn test_broken_file_is_skipped_and_run_continues() {
    let project = Project::new("cms", CMS_DOC);
    let config = project.config();
    generate_document(&project.doc, &config, Phases::ALL, false).unwrap();

    project.write("src/stores/interfaces.rs", "pub trait Storage: Send + Sync {\n");
    std::fs::remove_file(project.root().join("src/web/api/handle_cms_gen.rs")).unwrap();

    let report = generate_document(&project.doc, &config, Phases::ALL, false).unwrap();
    assert_eq!(report.skipped.len(), 1);
    assert!(report.skipped[0].0.ends_with("interfaces.rs"));
    assert_eq!(
        project.read("src/stores/interfaces.rs"),
        "pub trait Storage: Send + Sync {\n"
    );
    assert!(project.exists("src/web/api/handle_cms_gen.rs"));
}
