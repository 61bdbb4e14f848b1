use super::annotation::QueryAnnotation;
use super::types::Document;
use crate::error::{GenError, Result};
use std::path::Path;

/// Loads and validates a document (YAML, or JSON for `.json` files).
///
/// The document name is the file stem; it names every generated file of this document.
///
/// # Errors
///
/// `Io` when the file cannot be read, `Yaml`/`Json` on syntax errors and `Schema` when the
/// content fails validation (see [`validate`]).
pub fn load_document(path: &Path) -> Result<Document> {
    let content = std::fs::read_to_string(path)?;
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();
    let is_json = path.extension().is_some_and(|e| e == "json");
    let doc = parse_document(&name, &content, is_json)?;
    tracing::info!(path = %path.display(), models = doc.models.len(), "document loaded");
    Ok(doc)
}

/// Parses and validates document text.
pub fn parse_document(name: &str, content: &str, is_json: bool) -> Result<Document> {
    let mut doc: Document = if is_json {
        serde_json::from_str(content)?
    } else {
        serde_yaml::from_str(content)?
    };
    doc.name = name.to_string();
    validate(&doc)?;
    Ok(doc)
}

/// Structural checks that must hold before anything is emitted.
pub fn validate(doc: &Document) -> Result<()> {
    if doc.name.is_empty() {
        return Err(GenError::schema("document name is empty"));
    }
    if doc.model_pkg.is_empty() {
        return Err(GenError::schema("empty modelpkg"));
    }
    if doc.models.is_empty() {
        return Err(GenError::schema("no models"));
    }
    for model in &doc.models {
        if model.name.is_empty() {
            return Err(GenError::schema("model without name"));
        }
        if model.fields.is_empty() {
            return Err(GenError::schema(format!(
                "model {} has no fields",
                model.name
            )));
        }
        for field in &model.fields {
            QueryAnnotation::parse(&field.query)
                .map_err(|e| GenError::schema(format!("{}.{}: {e}", model.name, field.name)))?;
        }
    }
    for e in &doc.enums {
        if e.values.is_empty() {
            return Err(GenError::schema(format!("enum {} has no values", e.name)));
        }
    }
    for spot in &doc.webapi.uris {
        if spot.model.is_empty() {
            return Err(GenError::schema("webapi uri mapping without model"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
modelpkg: cms
models:
  - name: Article
    fields:
      - name: Title
        type: string
"#;

    #[test]
    fn test_parse_minimal_document() {
        let doc = parse_document("cms", MINIMAL, false).unwrap();
        assert_eq!(doc.model_pkg, "cms");
        assert_eq!(doc.models[0].fields[0].name, "Title");
    }

    #[test]
    fn test_schema_errors() {
        let err = parse_document("cms", "models: []\n", false).unwrap_err();
        assert!(matches!(err, GenError::Schema(ref m) if m.contains("modelpkg")));

        let err = parse_document("cms", "modelpkg: cms\nmodels: []\n", false).unwrap_err();
        assert!(matches!(err, GenError::Schema(ref m) if m.contains("no models")));

        let no_fields = "modelpkg: cms\nmodels:\n  - name: Article\n";
        let err = parse_document("cms", no_fields, false).unwrap_err();
        assert!(matches!(err, GenError::Schema(ref m) if m.contains("Article")));
    }

    #[test]
    fn test_unknown_query_kind_is_rejected() {
        let doc = MINIMAL.replace("type: string", "type: string\n        query: fuzzy");
        assert!(matches!(
            parse_document("cms", &doc, false),
            Err(GenError::Schema(_))
        ));
    }

    #[test]
    fn test_load_json_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cms.json");
        std::fs::write(
            &path,
            r#"{"modelpkg":"cms","models":[{"name":"Article","fields":[{"name":"Title","type":"string"}]}]}"#,
        )
        .unwrap();
        let doc = load_document(&path).unwrap();
        assert_eq!(doc.name, "cms");
    }
}
