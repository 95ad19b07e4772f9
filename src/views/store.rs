//! Template collection loading and rendering.
//!
//! # Responsibilities
//! - Walk one or more template roots and register every `.html` file
//! - Namespace secondary roots by their last path segment
//! - Render templates by name from many tasks at once
//! - Reload on demand, or before every render in debug mode
//!
//! # Locking
//! - `collection` (RwLock): read by every render, written only to swap in a
//!   freshly built collection
//! - `source` (Mutex): serialises loads so two reloads never interleave their
//!   walks, and remembers the directory list and functions of the last
//!   successful load
//!
//! # Debug mode
//! Debug mode reloads before each render. Under concurrent traffic a render
//! may observe a collection swapped in by another request's reload between
//! its own reload and its lookup. This is accepted: debug mode is meant for
//! local development only.

use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::response::Html;
use minijinja::{Environment, Template};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use walkdir::WalkDir;

use crate::views::error::{ViewError, NOT_FOUND_BODY};
use crate::views::funcs::FuncMap;

const TEMPLATE_EXT: &str = "html";

/// Shared handle to a template collection. Clones refer to the same store.
#[derive(Clone, Default)]
pub struct ViewStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    collection: RwLock<Collection>,
    source: Mutex<Source>,
    debug: AtomicBool,
}

#[derive(Default)]
struct Source {
    dirs: Option<String>,
    funcs: FuncMap,
}

/// Every template found by one load, parsed into a single environment so
/// each template can include or extend any other by name.
struct Collection {
    env: Environment<'static>,
    names: BTreeSet<String>,
}

impl Default for Collection {
    fn default() -> Self {
        Self {
            env: Environment::new(),
            names: BTreeSet::new(),
        }
    }
}

impl Collection {
    fn build(dirs: &str, funcs: &FuncMap) -> Result<Self, ViewError> {
        let roots: Vec<&str> = split_dirs(dirs).collect();
        if roots.is_empty() {
            return Err(ViewError::NoDirectories);
        }

        let mut collection = Collection::default();
        funcs.apply(&mut collection.env);

        for (index, root) in roots.into_iter().enumerate() {
            let root = Path::new(root);
            let prefix = if index > 0 {
                root.file_name().map(|name| name.to_string_lossy().into_owned())
            } else {
                None
            };
            collection.add_root(root, prefix.as_deref())?;
        }
        Ok(collection)
    }

    fn add_root(&mut self, root: &Path, prefix: Option<&str>) -> Result<(), ViewError> {
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.map_err(|source| ViewError::Walk {
                root: root.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension().and_then(|ext| ext.to_str()) != Some(TEMPLATE_EXT)
            {
                continue;
            }

            let body = fs::read_to_string(path).map_err(|source| ViewError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            if body.is_empty() {
                return Err(ViewError::EmptyFile(path.to_path_buf()));
            }

            let name = template_name(root, path, prefix);
            self.env
                .add_template_owned(name.clone(), body)
                .map_err(|source| ViewError::Parse {
                    name: name.clone(),
                    source,
                })?;
            self.names.insert(name);
        }
        Ok(())
    }

    fn lookup(&self, name: &str) -> Result<Template<'_, '_>, ViewError> {
        if !self.names.contains(name) {
            return Err(ViewError::NotFound(name.to_string()));
        }
        self.env
            .get_template(name)
            .map_err(|source| ViewError::Render {
                name: name.to_string(),
                source,
            })
    }
}

impl ViewStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `.html` file under `dirs` (comma-separated roots) and
    /// replace the current collection.
    ///
    /// Templates are named by their path relative to their root; templates
    /// from the second root onwards are prefixed with that root's last path
    /// segment (`dirB/x.html`). On error the current collection is kept.
    pub fn load(&self, dirs: &str, funcs: FuncMap) -> Result<(), ViewError> {
        let mut source = self.inner.source.lock();
        let count = self.swap_in(Collection::build(dirs, &funcs)?);
        source.dirs = Some(dirs.to_string());
        source.funcs = funcs;
        tracing::info!(dirs = %dirs, templates = count, "Views loaded");
        Ok(())
    }

    /// Rebuild the collection from the last successfully loaded directories
    /// and functions.
    pub fn reload(&self) -> Result<(), ViewError> {
        let source = self.inner.source.lock();
        let dirs = source.dirs.as_deref().ok_or(ViewError::NotLoaded)?;
        let count = self.swap_in(Collection::build(dirs, &source.funcs)?);
        tracing::debug!(dirs = %dirs, templates = count, "Views reloaded");
        Ok(())
    }

    fn swap_in(&self, collection: Collection) -> usize {
        let count = collection.names.len();
        *self.inner.collection.write() = collection;
        count
    }

    /// Reload templates before every render. Development only.
    pub fn set_debug(&self, on: bool) {
        self.inner.debug.store(on, Ordering::Relaxed);
    }

    pub fn is_debug(&self) -> bool {
        self.inner.debug.load(Ordering::Relaxed)
    }

    /// Names of all loaded templates, sorted.
    pub fn names(&self) -> Vec<String> {
        self.inner.collection.read().names.iter().cloned().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.collection.read().names.contains(name)
    }

    /// Render template `name` with `ctx`.
    ///
    /// A missing template yields [`ViewError::NotFound`], whose response is
    /// a 500 carrying a fixed body.
    pub fn render<S: Serialize>(&self, name: &str, ctx: S) -> Result<Html<String>, ViewError> {
        self.refresh_for_debug()?;
        let collection = self.inner.collection.read();
        let template = collection.lookup(name)?;
        template
            .render(ctx)
            .map(Html)
            .map_err(|source| ViewError::Render {
                name: name.to_string(),
                source,
            })
    }

    /// Render template `name` straight into `out`.
    ///
    /// A missing template writes the fixed not-found body to `out` before
    /// returning [`ViewError::NotFound`].
    pub fn render_to<W: Write, S: Serialize>(
        &self,
        mut out: W,
        name: &str,
        ctx: S,
    ) -> Result<(), ViewError> {
        self.refresh_for_debug()?;
        let collection = self.inner.collection.read();
        let template = match collection.lookup(name) {
            Ok(template) => template,
            Err(err) => {
                if err.is_not_found() {
                    out.write_all(NOT_FOUND_BODY.as_bytes())
                        .map_err(ViewError::Write)?;
                }
                return Err(err);
            }
        };
        template
            .render_captured_to(ctx, out)
            .map(|_| ())
            .map_err(|source| ViewError::Render {
                name: name.to_string(),
                source,
            })
    }

    fn refresh_for_debug(&self) -> Result<(), ViewError> {
        if !self.is_debug() {
            return Ok(());
        }
        match self.reload() {
            Err(ViewError::NotLoaded) => Ok(()),
            other => other,
        }
    }
}

impl std::fmt::Debug for ViewStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewStore")
            .field("templates", &self.names())
            .field("debug", &self.is_debug())
            .finish()
    }
}

pub(crate) fn split_dirs(dirs: &str) -> impl Iterator<Item = &str> {
    dirs.split(',').map(str::trim).filter(|dir| !dir.is_empty())
}

/// `root/sub/file.html` → `sub/file.html`, or `prefix/sub/file.html` for
/// secondary roots. Separators are always `/`.
fn template_name(root: &Path, path: &Path, prefix: Option<&str>) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let mut parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if let Some(prefix) = prefix {
        parts.insert(0, prefix.to_string());
    }
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_split_dirs() {
        let dirs: Vec<&str> = split_dirs("views, themes/dark ,,").collect();
        assert_eq!(dirs, vec!["views", "themes/dark"]);
        assert_eq!(split_dirs(" , ").count(), 0);
    }

    #[test]
    fn test_template_name() {
        let root = PathBuf::from("views");
        assert_eq!(
            template_name(&root, &root.join("index.html"), None),
            "index.html"
        );
        assert_eq!(
            template_name(&root, &root.join("users").join("list.html"), None),
            "users/list.html"
        );
        assert_eq!(
            template_name(&root, &root.join("x.html"), Some("dark")),
            "dark/x.html"
        );
    }

    #[test]
    fn test_blank_dir_list_is_rejected() {
        let store = ViewStore::new();
        assert!(matches!(
            store.load(" ", FuncMap::new()),
            Err(ViewError::NoDirectories)
        ));
    }

    #[test]
    fn test_reload_before_load() {
        let store = ViewStore::new();
        assert!(matches!(store.reload(), Err(ViewError::NotLoaded)));
    }

    #[test]
    fn test_render_on_empty_store_is_not_found() {
        let store = ViewStore::new();
        let mut out = Vec::new();
        let err = store.render_to(&mut out, "index.html", ()).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(out, NOT_FOUND_BODY.as_bytes());
    }
}
