//! Per-run registry of store method signatures, handles and routes.
//!
//! One [`RegistryBuilder`] is created for each run and passed by reference to the emitters.
//! The store phase records method signatures; the web phase reads them, either from the same
//! builder or, when the store phase did not run, from the interface description the store
//! phase wrote earlier (`<doc>_iface.json`).

use crate::document::Action;
use crate::error::{GenError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Version written to and accepted from interface descriptions.
pub const IFACE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

impl Param {
    pub fn new(name: &str, ty: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            ty: ty.into(),
        }
    }
}

/// Signature of one store method, as emitted in the store trait.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodSig {
    /// Document-style name (`ListArticle`)
    pub name: String,
    /// Rust name (`list_article`)
    pub func: String,
    pub action: Action,
    pub model: String,
    /// Parameters after `ctx`
    pub params: Vec<Param>,
    /// Success type inside `Result<..>`
    pub ret: String,
    #[serde(default)]
    pub simple: bool,
    /// Declared with explicit args/rets; implemented by hand
    #[serde(default)]
    pub custom: bool,
}

impl MethodSig {
    /// `async fn list_article(&self, ctx: &Context, spec: ArticleSpec) -> Result<(Articles, i64)>`
    pub fn declaration(&self) -> String {
        let mut params = String::from("&self, ctx: &Context");
        for p in &self.params {
            params.push_str(&format!(", {}: {}", p.name, p.ty));
        }
        format!("async fn {}({params}) -> Result<{}>", self.func, self.ret)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSig {
    pub name: String,
    pub iname: String,
    pub short_name: String,
    /// Accessor on the `Storage` trait (`content`)
    pub accessor: String,
    pub impl_name: String,
    pub methods: Vec<MethodSig>,
}

impl StoreSig {
    pub fn matches(&self, name: &str) -> bool {
        self.name == name || self.iname == name || self.short_name == name
    }
}

/// Content of `<doc>_iface.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceDescription {
    pub version: u32,
    #[serde(default)]
    pub document: String,
    pub stores: Vec<StoreSig>,
}

/// One generated HTTP endpoint.
#[derive(Debug, Clone)]
pub struct Handle {
    /// Route id (`cms-articles-id-put`)
    pub id: String,
    /// Permission id; empty when the route needs no permission
    pub perm_id: String,
    /// Handler function name
    pub func: String,
    pub verb: String,
    /// Documented route: `/cms/articles/{id} [put]`
    pub route: String,
    /// Registered path, without the web-wide uri prefix
    pub path: String,
    pub action: Action,
    pub model: String,
    /// Storage accessor of the bound store (`content`)
    pub accessor: String,
    pub method: MethodSig,
    pub need_auth: bool,
    pub need_perm: bool,
    pub hand_reg: bool,
    pub no_post: bool,
    pub batch: bool,
    pub summary: String,
    pub tags: String,
}

/// A registration entry: `(auth, verb, path, perm id, handler)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub need_auth: bool,
    pub verb: String,
    pub path: String,
    pub perm_id: String,
    pub handler: String,
}

#[derive(Debug, Default)]
pub struct RegistryBuilder {
    stores: Vec<StoreSig>,
    handles: Vec<Handle>,
    routes: Vec<Route>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a store; a store recorded twice keeps its latest signature.
    pub fn add_store(&mut self, store: StoreSig) {
        match self.stores.iter_mut().find(|s| s.name == store.name) {
            Some(existing) => *existing = store,
            None => self.stores.push(store),
        }
    }

    pub fn stores(&self) -> &[StoreSig] {
        &self.stores
    }

    pub fn has_stores(&self) -> bool {
        !self.stores.is_empty()
    }

    /// Looks up `store.method` by store name, interface name or short name.
    pub fn find_method(&self, store: &str, method: &str) -> Option<(&StoreSig, &MethodSig)> {
        self.stores
            .iter()
            .filter(|s| s.matches(store))
            .find_map(|s| {
                s.methods
                    .iter()
                    .find(|m| m.name == method || m.func == method)
                    .map(|m| (s, m))
            })
    }

    /// Every (store, method) pair targeting `model`, in store order.
    pub fn methods_for<'a>(
        &'a self,
        model: &'a str,
    ) -> impl Iterator<Item = (&'a StoreSig, &'a MethodSig)> + 'a {
        self.stores
            .iter()
            .flat_map(move |s| s.methods.iter().filter(move |m| m.model == model).map(move |m| (s, m)))
    }

    pub fn add_handle(&mut self, handle: Handle) {
        self.handles.push(handle);
    }

    pub fn handles(&self) -> &[Handle] {
        &self.handles
    }

    pub fn add_route(&mut self, route: Route) {
        self.routes.push(route);
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn description(&self, document: &str) -> InterfaceDescription {
        InterfaceDescription {
            version: IFACE_VERSION,
            document: document.to_string(),
            stores: self.stores.clone(),
        }
    }

    /// Writes the interface description as pretty JSON.
    pub fn write_description(&self, path: &Path, document: &str) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.description(document))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, format!("{json}\n")).map_err(|e| GenError::emit(path, e))?;
        Ok(())
    }

    /// Loads store signatures from an interface description.
    ///
    /// # Errors
    ///
    /// `Resolution` when the file is missing or carries an unsupported version.
    pub fn load_description(&mut self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(GenError::resolution(format!(
                "interface description {} not found, run the store phase first",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)?;
        let desc: InterfaceDescription = serde_json::from_str(&content)?;
        if desc.version != IFACE_VERSION {
            return Err(GenError::resolution(format!(
                "{}: unsupported interface description version {}",
                path.display(),
                desc.version
            )));
        }
        tracing::debug!(path = %path.display(), stores = desc.stores.len(), "interface description loaded");
        for store in desc.stores {
            self.add_store(store);
        }
        Ok(())
    }
}
