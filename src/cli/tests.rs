//! Unit tests for CLI commands

use crate::cli::commands::summary;
use crate::cli::{Cli, Commands};
use crate::document::{parse_document, resolve};
use crate::logging::LogFormat;
use clap::Parser;

#[test]
fn test_generate_defaults() {
    let cli = Cli::try_parse_from(["crudgen", "generate", "--doc", "cms.yaml"]).unwrap();
    assert_eq!(cli.log_format, LogFormat::Text);
    match cli.command {
        Commands::Generate {
            doc,
            phases,
            drop,
            config,
            output,
            no_fmt,
        } => {
            assert_eq!(doc.to_string_lossy(), "cms.yaml");
            assert_eq!(phases, 7);
            assert!(!drop && !no_fmt);
            assert!(config.is_none() && output.is_none());
        }
        _ => panic!("Expected Generate command"),
    }
}

#[test]
fn test_generate_with_flags() {
    let cli = Cli::try_parse_from([
        "crudgen",
        "generate",
        "--doc",
        "cms.yaml",
        "--phases",
        "3",
        "--drop",
        "--output",
        "out",
        "--no-fmt",
        "--log-format",
        "json",
    ])
    .unwrap();
    assert_eq!(cli.log_format, LogFormat::Json);
    match cli.command {
        Commands::Generate {
            phases,
            drop,
            output,
            no_fmt,
            ..
        } => {
            assert_eq!(phases, 3);
            assert!(drop && no_fmt);
            assert_eq!(output.unwrap().to_string_lossy(), "out");
        }
        _ => panic!("Expected Generate command"),
    }
}

#[test]
fn test_check_requires_doc() {
    assert!(Cli::try_parse_from(["crudgen", "check"]).is_err());
    assert!(Cli::try_parse_from(["crudgen", "check", "-d", "cms.yaml"]).is_ok());
}

#[test]
fn test_summary_lists_stores() {
    let doc = parse_document(
        "cms",
        r#"
modelpkg: cms
models:
  - name: Article
    tableTag: cms_article
    fields:
      - name: comm.DefaultModel
      - name: Title
        type: string
        tags: {json: title}
stores:
  - name: contentStore
    hodBread: [Article]
"#,
        false,
    )
    .unwrap();
    let text = summary(&resolve(doc).unwrap());
    assert!(text.starts_with("document cms (package cms)\n  models: 1\n"));
    assert!(text.contains("store contentStore"));
    assert!(text.contains(": 5 methods"));
}
