mod common;

use common::{Project, CMS_DOC};
use std::process::Command;

fn crudgen() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_crudgen"));
    cmd.env("RUST_LOG", "crudgen=warn");
    cmd
}

#[test]
fn test_cli_generate_writes_every_phase() {
    let project = Project::new("cms", CMS_DOC);
    let status = crudgen()
        .arg("generate")
        .arg("--doc")
        .arg(&project.doc)
        .arg("--output")
        .arg(project.root())
        .arg("--no-fmt")
        .status()
        .expect("run cli");
    assert!(status.success());
    assert!(project.exists("src/models/cms/cms_gen.rs"));
    assert!(project.exists("src/stores/cms_gen.rs"));
    assert!(project.exists("src/stores/cms_x.rs"));
    assert!(project.exists("src/web/api/handle_cms_gen.rs"));
}

#[test]
fn test_cli_reads_config_next_to_document() {
    let project = Project::new("cms", CMS_DOC);
    project.write(
        "docs/crudgen.toml",
        &format!(
            "output_root = {:?}\nmodels_dir = \"src/entities\"\nrustfmt = false\n",
            project.root().display().to_string()
        ),
    );
    let status = crudgen()
        .args(["generate", "--phases", "1", "--doc"])
        .arg(&project.doc)
        .status()
        .expect("run cli");
    assert!(status.success());
    assert!(project.exists("src/entities/cms/cms_gen.rs"));
    assert!(!project.exists("src/stores"));
}

#[test]
fn test_cli_fails_on_bad_phase_mask() {
    let project = Project::new("cms", CMS_DOC);
    let output = crudgen()
        .args(["generate", "--phases", "9", "--no-fmt", "--doc"])
        .arg(&project.doc)
        .arg("--output")
        .arg(project.root())
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid phase mask 9"));
    assert!(!project.exists("src"));
}

#[test]
fn test_cli_fails_on_invalid_document() {
    let project = Project::new("cms", "modelpkg: \"\"\nmodels: []\n");
    let status = crudgen()
        .args(["check", "--doc"])
        .arg(&project.doc)
        .status()
        .expect("run cli");
    assert!(!status.success());
}

#[test]
fn test_cli_check_prints_outline() {
    let project = Project::new("cms", CMS_DOC);
    let output = crudgen()
        .args(["check", "--doc"])
        .arg(&project.doc)
        .output()
        .expect("run cli");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("document cms (package cms)"));
    assert!(stdout.contains("store contentStore (ContentStore): 5 methods"));
    assert!(stdout.contains("web api: 1 uris, 0 handles"));
    assert!(!project.exists("src"));
}
