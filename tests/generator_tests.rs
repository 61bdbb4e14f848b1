mod common;

use common::{count, Project, CMS_DOC};
use crudgen::generator::{generate_document, Phases};
use crudgen::GenError;
use pretty_assertions::assert_eq;

const TAXONOMY: &str = r#"
  - name: Category
    tableTag: cms_category
    fields:
      - name: comm.DefaultModel
      - name: Name
        type: string
        tags: {json: name, db: name}
        basic: true
"#;

fn with_taxonomy() -> String {
    CMS_DOC
        .replace("stores:\n", &format!("{}stores:\n", TAXONOMY.trim_start_matches('\n')))
        .replace(
            "    hodBread: [Article]\n",
            "    hodBread: [Article]\n    hodGL: [Article]\n  - name: taxonomyStore\n    hodGL: [Category]\n",
        )
}

#[test]
fn test_article_scenario_end_to_end() {
    let project = Project::new("cms", CMS_DOC);
    let report = generate_document(&project.doc, &project.config(), Phases::ALL, false).unwrap();
    assert_eq!(report.handles, 5);
    assert!(report.skipped.is_empty());

    let models = project.read("src/models/cms/cms_gen.rs");
    assert!(models.starts_with("// Code generated by crudgen. DO NOT EDIT.\n"));
    for ty in [
        "pub struct Article {",
        "pub struct ArticleBasic {",
        "pub struct ArticleSet {",
        "pub type Articles = Vec<Article>;",
    ] {
        assert!(models.contains(ty), "missing {ty}");
    }
    assert_eq!(
        project.read("src/models/cms/mod.rs").matches("pub mod cms_gen;").count(),
        1
    );

    let stores = project.read("src/stores/cms_gen.rs");
    assert!(stores.contains("pub struct ArticleSpec {"));
    assert!(stores.contains("pub trait ContentStore: Send + Sync {"));
    for func in [
        "list_article",
        "get_article",
        "create_article",
        "update_article",
        "delete_article",
    ] {
        assert_eq!(count(&stores, &format!("async fn {func}(")), 2, "{func}");
    }
    assert!(stores.contains("use crate::models::cms::cms_gen::*;"));

    let handles = project.read("src/web/api/handle_cms_gen.rs");
    for (verb, path) in [
        ("GET", "/cms/articles"),
        ("POST", "/cms/articles"),
        ("GET", "/cms/articles/{id}"),
        ("PUT", "/cms/articles/{id}"),
        ("DELETE", "/cms/articles/{id}"),
    ] {
        assert_eq!(
            count(&handles, &format!("\"{verb}\", \"{path}\",")),
            1,
            "{verb} {path}"
        );
    }
    assert!(project.read("src/web/api/mod.rs").contains("pub mod handle_cms_gen;"));
}

#[test]
fn test_aggregator_has_one_accessor_per_store() {
    let project = Project::new("cms", &with_taxonomy());
    let report = generate_document(&project.doc, &project.config(), Phases::ALL, false).unwrap();
    assert_eq!(report.handles, 5);

    let stores = project.read("src/stores/cms_gen.rs");
    assert_eq!(count(&stores, "async fn list_article("), 2);
    assert_eq!(count(&stores, "async fn get_article("), 2);
    assert_eq!(count(&stores, "async fn list_category("), 2);
    assert_eq!(count(&stores, "async fn create_category("), 0);
    assert_eq!(count(&stores, "pub struct ArticleSpec {"), 1);

    let interfaces = project.read("src/stores/interfaces.rs");
    assert_eq!(count(&interfaces, "fn content(&self)"), 1);
    assert_eq!(count(&interfaces, "fn taxonomy(&self)"), 1);

    let wrap = project.read("src/stores/wrap.rs");
    assert_eq!(count(&wrap, "content_store: cms_gen::ContentStoreImpl,"), 1);
    assert_eq!(count(&wrap, "taxonomy_store: cms_gen::TaxonomyStoreImpl,"), 1);
    assert_eq!(count(&wrap, "fn taxonomy(&self) -> &dyn cms_gen::TaxonomyStore {"), 1);

    let mods = project.read("src/stores/mod.rs");
    assert!(mods.contains("pub mod cms_gen;") && mods.contains("pub mod cms_x;"));
}

#[test]
fn test_failing_phase_keeps_earlier_output() {
    let doc = CMS_DOC.replace(
        "  uris:\n",
        "  handles:\n    - name: getBySlug\n      store: Content\n      method: GetBySlug\n      route: /cms/slugs/{id} [get]\n  uris:\n",
    );
    let project = Project::new("cms", &doc);
    let err = generate_document(&project.doc, &project.config(), Phases::ALL, false).unwrap_err();
    assert!(matches!(err, GenError::Resolution(_)));
    assert!(project.exists("src/models/cms/cms_gen.rs"));
    assert!(project.exists("src/stores/cms_gen.rs"));
    assert!(!project.exists("src/web/api/handle_cms_gen.rs"));
}

#[test]
fn test_web_phase_alone_reads_interface_description() {
    let project = Project::new("cms", CMS_DOC);
    let config = project.config();
    generate_document(&project.doc, &config, Phases::from_bits(3).unwrap(), false).unwrap();
    assert!(project.exists("src/stores/cms_iface.json"));
    assert!(!project.exists("src/web/api/handle_cms_gen.rs"));

    let report = generate_document(&project.doc, &config, Phases::from_bits(4).unwrap(), false)
        .unwrap();
    assert_eq!(report.handles, 5);
    let handles = project.read("src/web/api/handle_cms_gen.rs");
    assert!(handles.contains("api.sto.content().update_article(&ctx, &id, set).await"));
}

#[test]
fn test_web_phase_without_description_fails() {
    let project = Project::new("cms", CMS_DOC);
    let err = generate_document(
        &project.doc,
        &project.config(),
        Phases::from_bits(4).unwrap(),
        false,
    )
    .unwrap_err();
    assert!(!err.is_isolated());
}

#[test]
fn test_drop_removes_generated_files_of_selected_phases() {
    let project = Project::new("cms", CMS_DOC);
    let config = project.config();
    generate_document(&project.doc, &config, Phases::ALL, false).unwrap();

    let without_web = CMS_DOC.split("webapi:").next().unwrap().to_string();
    project.set_doc(&without_web);
    generate_document(&project.doc, &config, Phases::from_bits(4).unwrap(), true).unwrap();
    assert!(!project.exists("src/web/api/handle_cms_gen.rs"));
    assert!(project.exists("src/web/api/mod.rs"));
    assert!(project.exists("src/stores/cms_gen.rs"));
}

#[test]
fn test_no_stores_skips_store_phase() {
    let doc = CMS_DOC.split("stores:").next().unwrap().to_string();
    let project = Project::new("cms", &doc);
    let report = generate_document(&project.doc, &project.config(), Phases::ALL, false).unwrap();
    assert_eq!(report.written.len(), 1);
    assert!(!project.exists("src/stores"));
}

#[test]
fn test_invalid_document_is_a_schema_error() {
    let project = Project::new("cms", "modelpkg: cms\nmodels: []\n");
    let err = generate_document(&project.doc, &project.config(), Phases::ALL, false).unwrap_err();
    assert!(matches!(err, GenError::Schema(_)));
}
