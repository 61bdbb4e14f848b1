//! # Generator Module
//!
//! Turns a resolved [`Schema`] into Rust sources: one fully generated file per phase, plus
//! long-lived files that are created once from a skeleton and afterwards only patched.
//!
//! ## Pipeline
//!
//! ```text
//! Schema ─► models phase ─► stores phase ─► web phase
//!              │                 │               │
//!        <doc>_gen.rs      <doc>_gen.rs     handle_<doc>_gen.rs
//!        mod.rs (patch)    <doc>_x.rs (patch)   mod.rs (patch)
//!                          wrap.rs, interfaces.rs (patch)
//!                          <doc>_iface.json ─────►┘ (when run alone)
//! ```
//!
//! Phases run in that order, each one selected by a bit of [`Phases`]. A [`RegistryBuilder`]
//! created for the run carries the store signatures from the stores phase to the web phase;
//! a web-only run loads them from the interface description the stores phase wrote.
//!
//! ## Failure model
//!
//! Generation is synchronous and file writes are not transactional. A failing phase stops
//! the run and leaves the output of earlier phases on disk. A hand-edited file that no longer
//! parses is skipped with a warning and does not stop anything; running the generator again
//! after fixing it converges, since patches only add what is missing.
//!
//! ## Bodies and templates
//!
//! Emitters pre-render item bodies with [`CodeWriter`]; the Askama templates under
//! `templates/` put the header, the `use` lines and the body together. Fully generated files
//! go through rustfmt when [`GenConfig::rustfmt`] is set.

mod code;
pub mod enums;
mod format;
pub mod layout;
pub mod model;
pub mod query;
pub mod registry;
pub mod store;
mod templates;
pub mod webapi;

pub use code::CodeWriter;
pub use format::{format_files, RUSTFMT_BIN_ENV};
pub use layout::OutputLayout;
pub use registry::{Handle, InterfaceDescription, MethodSig, RegistryBuilder, Route, StoreSig};
pub use templates::*;

use crate::config::GenConfig;
use crate::document::{load_document, resolve, Schema};
use crate::error::{GenError, Result};
use crate::patch::{probe, FilePatch, Member, PatchOutcome};
use askama::Template;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// Web package used when the document does not name one.
pub const DEFAULT_WEB_PKG: &str = "api";

/// Selection of generation phases, as the bitmask taken by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Phases(u8);

impl Phases {
    pub const MODELS: u8 = 1;
    pub const STORES: u8 = 2;
    pub const WEB: u8 = 4;
    pub const ALL: Phases = Phases(Self::MODELS | Self::STORES | Self::WEB);

    /// Accepts 1..=7.
    ///
    /// # Errors
    ///
    /// `Schema` for an empty mask or unknown bits.
    pub fn from_bits(bits: u8) -> Result<Self> {
        if bits == 0 || bits & !Self::ALL.0 != 0 {
            return Err(GenError::schema(format!(
                "invalid phase mask {bits}, expected 1 (models) | 2 (stores) | 4 (web)"
            )));
        }
        Ok(Self(bits))
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn models(self) -> bool {
        self.0 & Self::MODELS != 0
    }

    pub fn stores(self) -> bool {
        self.0 & Self::STORES != 0
    }

    pub fn web(self) -> bool {
        self.0 & Self::WEB != 0
    }
}

impl Default for Phases {
    fn default() -> Self {
        Self::ALL
    }
}

impl fmt::Display for Phases {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = [
            (self.models(), "models"),
            (self.stores(), "stores"),
            (self.web(), "web"),
        ]
        .into_iter()
        .filter_map(|(on, name)| on.then_some(name))
        .collect();
        f.write_str(&names.join("+"))
    }
}

/// What one run did to the output tree.
#[derive(Debug, Default)]
pub struct GenerateReport {
    /// Fully generated files, in write order
    pub written: Vec<PathBuf>,
    /// Skeleton files created by this run
    pub bootstrapped: Vec<PathBuf>,
    /// Patched files and what was inserted into them
    pub patched: Vec<(PathBuf, PatchOutcome)>,
    /// Files left alone because they could not be patched
    pub skipped: Vec<(PathBuf, String)>,
    /// Handles emitted by the web phase
    pub handles: usize,
}

impl GenerateReport {
    pub fn inserted(&self) -> usize {
        self.patched.iter().map(|(_, o)| o.inserted.len()).sum()
    }
}

/// Output and settings shared by the phases of one run.
struct Run<'a> {
    schema: &'a Schema,
    config: &'a GenConfig,
    layout: OutputLayout,
    registry: RegistryBuilder,
    report: GenerateReport,
}

/// Runs the selected phases for `schema`.
///
/// With `drop` set, the fully generated files of the selected phases are removed first.
///
/// # Errors
///
/// `Resolution` and `Emit` errors stop the run at the failing phase. Patch failures are
/// reported in [`GenerateReport::skipped`] instead.
pub fn generate(
    schema: &Schema,
    config: &GenConfig,
    phases: Phases,
    drop: bool,
) -> Result<GenerateReport> {
    let mut run = Run {
        schema,
        config,
        layout: OutputLayout::new(config, schema.name()),
        registry: RegistryBuilder::new(),
        report: GenerateReport::default(),
    };
    tracing::info!(document = %schema.name(), %phases, root = %config.output_root.display(), "generating");
    if drop {
        run.drop_generated(phases)?;
    }
    if phases.models() {
        run.models()?;
    }
    if phases.stores() {
        run.stores()?;
    }
    if phases.web() {
        run.web()?;
    }
    tracing::info!(
        written = run.report.written.len(),
        bootstrapped = run.report.bootstrapped.len(),
        inserted = run.report.inserted(),
        skipped = run.report.skipped.len(),
        "generation finished"
    );
    Ok(run.report)
}

/// Loads, resolves and generates the document at `doc_path`.
///
/// # Errors
///
/// Everything [`load_document`] and [`resolve`] report, then [`generate`]'s errors.
pub fn generate_document(
    doc_path: &Path,
    config: &GenConfig,
    phases: Phases,
    drop: bool,
) -> Result<GenerateReport> {
    let schema = resolve(load_document(doc_path)?)?;
    generate(&schema, config, phases, drop)
}

/// Package of the web handlers: `webapi.pkg` as a module name, or [`DEFAULT_WEB_PKG`].
pub fn web_pkg(schema: &Schema) -> String {
    let pkg = schema.doc.webapi.pkg.trim().replace('-', "_");
    if pkg.is_empty() {
        DEFAULT_WEB_PKG.to_string()
    } else {
        pkg
    }
}

fn normalized(rendered: &str) -> String {
    format!("{}\n", rendered.trim_end())
}

impl Run<'_> {
    fn drop_generated(&mut self, phases: Phases) -> Result<()> {
        let mut paths = Vec::new();
        if phases.models() {
            paths.push(self.layout.models_gen(&self.schema.doc.model_pkg));
        }
        if phases.stores() {
            paths.push(self.layout.stores_gen());
            paths.push(self.layout.iface_json());
        }
        if phases.web() {
            paths.push(self.layout.handles_gen(&web_pkg(self.schema)));
        }
        for path in paths.iter().filter(|p| p.exists()) {
            std::fs::remove_file(path).map_err(|e| GenError::emit(path, e))?;
            tracing::info!(path = %path.display(), "dropped");
        }
        Ok(())
    }

    /// `use` lines for the namespaces an emitter referred to.
    fn use_lines(&self, imports: &BTreeSet<String>) -> Result<Vec<String>> {
        imports
            .iter()
            .map(|ns| self.schema.qualifier.use_line(ns))
            .collect()
    }

    /// Glob imports of the generated models.
    fn model_uses(&self) -> Vec<String> {
        let models = self.layout.models_path(&self.schema.doc.model_pkg);
        vec![
            format!("use {models}::*;"),
            format!("use {models}::{}::*;", self.layout.models_gen_mod()),
        ]
    }

    fn write(&mut self, path: PathBuf, rendered: &str) -> Result<()> {
        write_generated(&path, &normalized(rendered))?;
        if self.config.rustfmt {
            format_files(std::slice::from_ref(&path))?;
        }
        self.report.written.push(path);
        Ok(())
    }

    fn bootstrap(&mut self, path: PathBuf, template: &impl Template) -> Result<()> {
        if write_bootstrap(&path, template)? {
            self.report.bootstrapped.push(path);
        }
        Ok(())
    }

    fn patch(&mut self, patch: FilePatch) -> Result<()> {
        if patch.is_empty() {
            return Ok(());
        }
        match patch.apply() {
            Ok(outcome) => {
                self.report.patched.push((patch.path().to_path_buf(), outcome));
                Ok(())
            }
            Err(err) if err.is_isolated() => {
                tracing::warn!(path = %patch.path().display(), error = %err, "file not patched");
                self.report
                    .skipped
                    .push((patch.path().to_path_buf(), err.to_string()));
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    fn ensure_module(&mut self, mod_file: PathBuf, module: &str) -> Result<()> {
        let mut patch = FilePatch::new(mod_file);
        patch.ensure(
            Member::Module {
                name: module.to_string(),
            },
            format!("pub mod {module};"),
        );
        self.patch(patch)
    }

    fn models(&mut self) -> Result<()> {
        let schema = self.schema;
        let pkg = schema.doc.model_pkg.as_str();
        let mut imports = BTreeSet::new();
        let mut w = CodeWriter::new();
        for e in &schema.doc.enums {
            enums::emit_enum(&mut w, e, &schema.qualifier)?;
            w.blank();
        }
        for m in &schema.doc.models {
            model::emit_model(&mut w, schema, m, &mut imports)?;
        }
        model::emit_oid_codes(&mut w, schema, &mut imports);

        let rendered = ModelsGenTemplate {
            header: &self.config.header,
            doc: schema.name(),
            uses: self.use_lines(&imports)?,
            body: w.finish(),
        }
        .render()?;
        self.write(self.layout.models_gen(pkg), &rendered)?;

        self.bootstrap(self.layout.models_mod(pkg), &ModelsModTemplate { pkg })?;
        self.ensure_module(self.layout.models_mod(pkg), &self.layout.models_gen_mod())
    }

    fn stores(&mut self) -> Result<()> {
        let schema = self.schema;
        if schema.stores.is_empty() {
            tracing::info!(document = %schema.name(), "no stores declared, store phase skipped");
            return Ok(());
        }
        let ext_path = self.layout.stores_x();
        let gen_mod = self.layout.stores_gen_mod();
        let ext_mod = self.layout.stores_x_mod();

        let mut imports = BTreeSet::new();
        let mut specs_done = BTreeSet::new();
        let mut w = CodeWriter::new();
        let mut ext = FilePatch::new(&ext_path);
        let mut wrap = FilePatch::new(self.layout.wrap());
        let mut interfaces = FilePatch::new(self.layout.interfaces());
        for s in &schema.stores {
            let probe = store::ExtProbe {
                has_new: self.probe_ext(&ext_path, &s.impl_name(), "new"),
                has_strap: self.probe_ext(&ext_path, &s.impl_name(), "strap"),
            };
            let out = store::emit_store(&mut w, schema, s, probe, &mut specs_done, &mut imports)?;
            self.registry.add_store(out.sig);
            for (member, code) in out.ext_members {
                ext.ensure(member, code);
            }
            for (member, code) in store::wrap_members(s, &gen_mod) {
                wrap.ensure(member, code);
            }
            for (member, code) in store::interface_members(s, &gen_mod) {
                interfaces.ensure(member, code);
            }
        }

        let mut uses = self.model_uses();
        uses.extend(self.use_lines(&imports)?);
        let rendered = StoresGenTemplate {
            header: &self.config.header,
            doc: schema.name(),
            ext_mod: &ext_mod,
            uses,
            body: w.finish(),
        }
        .render()?;
        self.write(self.layout.stores_gen(), &rendered)?;

        let iface = self.layout.iface_json();
        self.registry.write_description(&iface, schema.name())?;
        self.report.written.push(iface);

        let pgx_path = schema
            .qualifier
            .resolve("pgx")
            .ok_or_else(|| GenError::resolution("namespace pgx is not mapped"))?;
        let mut ext_uses = self.model_uses();
        ext_uses.push(schema.qualifier.use_line("pgx")?);
        self.bootstrap(self.layout.stores_mod(), &StoresModTemplate)?;
        self.bootstrap(self.layout.wrap(), &WrapTemplate { pgx_path: &pgx_path })?;
        self.bootstrap(self.layout.interfaces(), &InterfacesTemplate)?;
        self.bootstrap(
            ext_path,
            &StoresExtTemplate {
                doc: schema.name(),
                gen_mod: &gen_mod,
                uses: ext_uses,
            },
        )?;

        self.ensure_module(self.layout.stores_mod(), &gen_mod)?;
        self.ensure_module(self.layout.stores_mod(), &ext_mod)?;
        self.patch(ext)?;
        self.patch(interfaces)?;
        self.patch(wrap)
    }

    /// Whether the extension file defines `func` on `self_ty`; unreadable counts as absent.
    fn probe_ext(&self, path: &Path, self_ty: &str, func: &str) -> bool {
        let member = Member::ImplFn {
            self_ty: self_ty.to_string(),
            trait_name: None,
            func: func.to_string(),
        };
        probe(path, &member).unwrap_or_else(|err| {
            tracing::warn!(path = %path.display(), error = %err, "extension file not readable");
            false
        })
    }

    fn web(&mut self) -> Result<()> {
        let schema = self.schema;
        let webapi = &schema.doc.webapi;
        if webapi.uris.is_empty() && webapi.handles.is_empty() {
            tracing::info!(document = %schema.name(), "no web mapping, web phase skipped");
            return Ok(());
        }
        if !self.registry.has_stores() {
            self.registry.load_description(&self.layout.iface_json())?;
        }
        let pkg = web_pkg(schema);

        let mut w = CodeWriter::new();
        let before = self.registry.handles().len();
        webapi::emit_web(&mut w, schema, &mut self.registry)?;
        self.report.handles = self.registry.handles().len() - before;

        let mut uses = self.model_uses();
        uses.push(format!(
            "use {}::{}::*;",
            self.layout.stores_path(),
            self.layout.stores_gen_mod()
        ));
        let rendered = HandlesGenTemplate {
            header: &self.config.header,
            doc: schema.name(),
            uses,
            body: w.finish(),
        }
        .render()?;
        self.write(self.layout.handles_gen(&pkg), &rendered)?;

        let web_prelude = format!("{}::web::prelude", self.layout.runtime_prefix());
        let stores_path = self.layout.stores_path();
        self.bootstrap(
            self.layout.web_mod(&pkg),
            &WebModTemplate {
                pkg: &pkg,
                web_prelude: &web_prelude,
                stores_path: &stores_path,
            },
        )?;
        self.ensure_module(self.layout.web_mod(&pkg), &self.layout.handles_gen_mod())
    }
}
