//! Template directory watcher for hot reload.

use std::path::PathBuf;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::views::store::{split_dirs, ViewStore};

/// Reloads a [`ViewStore`] whenever an `.html` file under one of its roots
/// changes. A failed reload keeps the current templates.
pub struct ViewWatcher {
    store: ViewStore,
    roots: Vec<PathBuf>,
}

impl ViewWatcher {
    /// Watch every root of the comma-separated `dirs` list.
    pub fn new(store: ViewStore, dirs: &str) -> Self {
        let roots = split_dirs(dirs).map(PathBuf::from).collect();
        Self { store, roots }
    }

    /// Start watching in the background. The returned watcher must be kept
    /// alive for as long as reloads are wanted.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let store = self.store.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if is_template_change(&event) {
                        match store.reload() {
                            Ok(()) => tracing::info!(paths = ?event.paths, "Templates reloaded"),
                            Err(e) => tracing::error!(
                                error = %e,
                                "Failed to reload templates. Keeping current templates."
                            ),
                        }
                    }
                }
                Err(e) => tracing::error!(error = ?e, "Template watch error"),
            },
            Config::default(),
        )?;

        for root in &self.roots {
            watcher.watch(root, RecursiveMode::Recursive)?;
        }

        tracing::info!(roots = ?self.roots, "Template watcher started");
        Ok(watcher)
    }
}

fn is_template_change(event: &Event) -> bool {
    let relevant = event.kind.is_modify() || event.kind.is_create() || event.kind.is_remove();
    relevant
        && event
            .paths
            .iter()
            .any(|path| path.extension().is_some_and(|ext| ext == "html"))
}
