// Writable parameter files for runtime tuning

use super::tunables::{SharedTunables, Tunables};
use anyhow::{Context, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::PoisonError;

const ADJ_FILE: &str = "adj";
const MINFREE_FILE: &str = "minfree";
const DEBUG_LEVEL_FILE: &str = "debug_level";

/// A directory holding one file per tunable.
///
/// Files are re-read before each pass; a file whose contents changed since
/// the last read is applied to the shared tunables. Invalid contents are
/// reported and the previous value stays in effect.
pub struct ParamDir {
    path: PathBuf,
    last_adj: Option<String>,
    last_minfree: Option<String>,
    last_debug_level: Option<String>,
}

impl ParamDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last_adj: None,
            last_minfree: None,
            last_debug_level: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the directory and write the current values into it
    pub fn publish(&mut self, tunables: &Tunables) -> Result<()> {
        fs::create_dir_all(&self.path)
            .with_context(|| format!("Failed to create {}", self.path.display()))?;

        let adj = Tunables::format_array(&tunables.adj);
        let minfree = Tunables::format_array(&tunables.minfree);
        let debug_level = tunables.debug_level.to_string();

        self.write_param(ADJ_FILE, &adj)?;
        self.write_param(MINFREE_FILE, &minfree)?;
        self.write_param(DEBUG_LEVEL_FILE, &debug_level)?;

        self.last_adj = Some(adj);
        self.last_minfree = Some(minfree);
        self.last_debug_level = Some(debug_level);
        Ok(())
    }

    /// Apply changed parameter files to the shared tunables.
    ///
    /// Returns true when at least one value was updated.
    pub fn refresh(&mut self, shared: &SharedTunables) -> bool {
        let mut updated = Tunables::snapshot(shared);
        let mut changed = false;

        if let Some(text) = read_changed(&self.path.join(ADJ_FILE), &mut self.last_adj) {
            changed |= apply(ADJ_FILE, &text, |t| updated.set_adj(t));
        }
        if let Some(text) = read_changed(&self.path.join(MINFREE_FILE), &mut self.last_minfree) {
            changed |= apply(MINFREE_FILE, &text, |t| updated.set_minfree(t));
        }
        if let Some(text) = read_changed(
            &self.path.join(DEBUG_LEVEL_FILE),
            &mut self.last_debug_level,
        ) {
            changed |= apply(DEBUG_LEVEL_FILE, &text, |t| updated.set_debug_level(t));
        }

        if changed {
            log::info!(
                "Parameters updated: adj={} minfree={} debug_level={}",
                Tunables::format_array(&updated.adj),
                Tunables::format_array(&updated.minfree),
                updated.debug_level
            );
            *shared.write().unwrap_or_else(PoisonError::into_inner) = updated;
        }

        changed
    }

    fn write_param(&self, name: &str, value: &str) -> Result<()> {
        let path = self.path.join(name);
        fs::write(&path, format!("{value}\n"))
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}

/// Read a parameter file, returning its contents only if they differ from
/// the last contents seen
fn read_changed(path: &Path, last: &mut Option<String>) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(text) => {
            if last.as_deref() == Some(text.as_str()) {
                return None;
            }
            *last = Some(text.clone());
            Some(text)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => None,
        Err(e) => {
            log::warn!("Failed to read {}: {e}", path.display());
            None
        }
    }
}

fn apply<F>(name: &str, text: &str, set: F) -> bool
where
    F: FnOnce(&str) -> Result<()>,
{
    match set(text) {
        Ok(()) => true,
        Err(e) => {
            log::warn!("Ignoring parameter {name}: {e:#}");
            false
        }
    }
}
