//! Validated configuration trees

use serde_json::Value;

/// Transformed and validated configuration data.
///
/// Mirrors the registry that produced it: every visible attribute is present,
/// nested objects are mappings, subclass attributes are `{cls, config}`
/// records and subclass lists are sequences of them.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedConfig {
    root: Value,
}

impl LoadedConfig {
    pub(crate) fn new(root: Value) -> Self {
        Self { root }
    }

    pub fn as_value(&self) -> &Value {
        &self.root
    }

    pub fn into_value(self) -> Value {
        self.root
    }

    /// Node at a dotted path such as `storage.config.hooks[1].config.timeout`
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut node = &self.root;
        for part in path.split('.').filter(|p| !p.is_empty()) {
            let (key, indices) = match part.find('[') {
                Some(pos) => (&part[..pos], &part[pos..]),
                None => (part, ""),
            };
            if !key.is_empty() {
                node = node.get(key)?;
            }
            for index in indices.split('[').skip(1) {
                let index: usize = index.strip_suffix(']')?.parse().ok()?;
                node = node.get(index)?;
            }
        }
        Some(node)
    }

    /// Sub-tree at `path`, e.g. to feed a nested factory
    pub fn subtree(&self, path: &str) -> Option<LoadedConfig> {
        self.get(path).cloned().map(LoadedConfig::new)
    }
}

impl From<LoadedConfig> for Value {
    fn from(loaded: LoadedConfig) -> Self {
        loaded.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_paths() {
        let loaded = LoadedConfig::new(json!({
            "storage": {"cls": "Disk", "config": {"path": "/tmp"}},
            "hooks": [{"cls": "A", "config": {"n": 1}}, {"cls": "B", "config": {"n": 2}}],
            "grid": [[1, 2], [3, 4]]
        }));

        assert_eq!(loaded.get("storage.config.path"), Some(&json!("/tmp")));
        assert_eq!(loaded.get("hooks[1].config.n"), Some(&json!(2)));
        assert_eq!(loaded.get("grid[1][0]"), Some(&json!(3)));
        assert_eq!(loaded.get(""), Some(loaded.as_value()));
        assert_eq!(loaded.get("hooks[5]"), None);
        assert_eq!(loaded.get("hooks[x]"), None);
        assert_eq!(loaded.get("missing.key"), None);
    }

    #[test]
    fn test_subtree() {
        let loaded = LoadedConfig::new(json!({"db": {"port": 5432}}));
        let db = loaded.subtree("db").unwrap();
        assert_eq!(db.get("port"), Some(&json!(5432)));
        assert_eq!(Value::from(db), json!({"port": 5432}));
    }
}
