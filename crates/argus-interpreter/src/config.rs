use std::collections::BTreeSet;

use rustc_hash::FxHashMap;

use argus_ir::Var;

/// Where the driver finds the globals a function may touch.
#[derive(Clone, Debug)]
pub enum UsedGlobals {
    /// One declared set used for every function.
    Declared(BTreeSet<Var>),
    /// Per-function results of the used-globals pre-analysis. The
    /// pre-analysis must cover every reachable function; a missing entry is
    /// fatal.
    PerFunction(FxHashMap<Var, BTreeSet<Var>>),
}

/// Engine options for one analysis run.
#[derive(Clone, Debug)]
pub struct ExecOpts {
    /// Depth bound per edge and frame-count bound per recursion site.
    pub bound: u32,
    /// Treat `Throw` terminators as no-ops.
    pub skip_throw: bool,
    /// Enable DNF splitting, summary application, and summary creation on
    /// returns.
    pub function_summaries: bool,
    pub globals: UsedGlobals,
}

impl Default for ExecOpts {
    fn default() -> Self {
        Self {
            bound: 1,
            skip_throw: false,
            function_summaries: false,
            globals: UsedGlobals::Declared(BTreeSet::new()),
        }
    }
}

/// String-keyed external configuration, JSON-backed.
///
/// The engine only reads the `"entry-points"` list, but the surface is the
/// generic lookup so callers can share one config object.
#[derive(Clone, Debug, Default)]
pub struct Config(serde_json::Map<String, serde_json::Value>);

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        Ok(Self(serde_json::from_str(text)?))
    }

    /// Convenience constructor for the common single-key case.
    pub fn with_entry_points(names: &[&str]) -> Self {
        let list = names
            .iter()
            .map(|n| serde_json::Value::String((*n).to_owned()))
            .collect();
        let mut map = serde_json::Map::new();
        map.insert("entry-points".to_owned(), serde_json::Value::Array(list));
        Self(map)
    }

    /// The list of strings at `key`; empty if absent or not a list.
    pub fn find_list(&self, key: &str) -> Vec<String> {
        self.0
            .get(key)
            .and_then(serde_json::Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(serde_json::Value::as_str)
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default()
    }
}
