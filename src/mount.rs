//! Sub-applications mounted under a path prefix.

use std::collections::HashMap;

use tracing::warn;

use crate::app::App;

#[derive(Default)]
pub(crate) struct MountTable {
    apps: HashMap<String, App>,
}

impl MountTable {
    /// Stores `app` under the already-normalized `base`, replacing any earlier
    /// application there.
    pub(crate) fn mount(&mut self, base: String, app: App) {
        if self.apps.insert(base.clone(), app).is_some() {
            warn!(base, "replacing the application previously mounted here");
        }
    }

    pub(crate) fn lookup(&self, base: &str) -> Option<&App> {
        self.apps.get(base)
    }

    pub(crate) fn contains(&self, base: &str) -> bool {
        self.apps.contains_key(base)
    }
}
