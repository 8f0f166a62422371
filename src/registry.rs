use crate::error::{DevsyncError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Component, Path};

const COMPAS_DEV: &str = "https://github.com/compas-dev";
const BLOCK_RESEARCH_GROUP: &str = "https://github.com/BlockResearchGroup";

const COMPAS_DEV_MODULES: &[&str] = &["compas", "compas_fea", "compas_viewers", "compas_fab"];

const BRG_MODULES: &[&str] = &[
    "compas_assembly",
    "compas_triangle",
    "compas_libigl",
    "compas_tna",
    "compas_pattern",
    "compas_rbe",
    "compas_ags",
    "compas_ghc",
    "compas_3gs",
    "compas_loadpath",
    "compas_fofin",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryEntry {
    pub name: String,
    pub url: String,
}

/// Owner and repository name of a hosted repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoCoordinates {
    pub owner: String,
    pub repo: String,
}

impl RepositoryEntry {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }

    /// Parses `https://host/OWNER/REPO`, tolerating a trailing `.git` or `/`.
    pub fn coordinates(&self) -> Result<RepoCoordinates> {
        let invalid = || DevsyncError::InvalidUrl(self.url.clone());

        let rest = self
            .url
            .strip_prefix("https://")
            .or_else(|| self.url.strip_prefix("http://"))
            .ok_or_else(invalid)?;
        let rest = rest.trim_end_matches('/');
        let rest = rest.strip_suffix(".git").unwrap_or(rest);

        let parts: Vec<&str> = rest.split('/').collect();
        match parts.as_slice() {
            [host, owner, repo] if !host.is_empty() && !owner.is_empty() && !repo.is_empty() => {
                Ok(RepoCoordinates {
                    owner: owner.to_string(),
                    repo: repo.to_string(),
                })
            }
            _ => Err(invalid()),
        }
    }
}

/// Ordered, immutable table of the modules making up the workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
    entries: Vec<RepositoryEntry>,
}

impl Registry {
    pub fn new(entries: Vec<RepositoryEntry>) -> Result<Self> {
        let mut seen = HashSet::new();
        for entry in &entries {
            if entry.name.trim().is_empty() {
                return Err(DevsyncError::Config(format!(
                    "module with url {} has an empty name",
                    entry.url
                )));
            }
            if !is_single_component(&entry.name) {
                return Err(DevsyncError::Config(format!(
                    "module name {:?} must be a single directory name",
                    entry.name
                )));
            }
            if !seen.insert(entry.name.as_str()) {
                return Err(DevsyncError::DuplicateModule(entry.name.clone()));
            }
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[RepositoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&RepositoryEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Restricts the registry to `names`, keeping registry order.
    pub fn select(&self, names: &[String]) -> Result<Self> {
        if let Some(unknown) = names.iter().find(|n| self.get(n).is_none()) {
            return Err(DevsyncError::UnknownModule(unknown.clone()));
        }
        let entries = self
            .entries
            .iter()
            .filter(|e| names.contains(&e.name))
            .cloned()
            .collect();
        Ok(Self { entries })
    }
}

// Names become directories next to the project root, so they may not
// escape the workspace.
fn is_single_component(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains(['/', '\\'])
}

impl Default for Registry {
    fn default() -> Self {
        let dev = COMPAS_DEV_MODULES.iter().map(|name| (COMPAS_DEV, name));
        let brg = BRG_MODULES.iter().map(|name| (BLOCK_RESEARCH_GROUP, name));
        let entries = dev
            .chain(brg)
            .map(|(prefix, name)| RepositoryEntry::new(*name, format!("{prefix}/{name}")))
            .collect();
        Self { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_order() {
        let registry = Registry::default();
        assert_eq!(registry.len(), 15);

        let names: Vec<&str> = registry.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names[0], "compas");
        assert_eq!(names[3], "compas_fab");
        assert_eq!(names[4], "compas_assembly");
        assert_eq!(names[14], "compas_fofin");

        assert_eq!(
            registry.get("compas_fea").map(|e| e.url.as_str()),
            Some("https://github.com/compas-dev/compas_fea")
        );
        assert_eq!(
            registry.get("compas_rbe").map(|e| e.url.as_str()),
            Some("https://github.com/BlockResearchGroup/compas_rbe")
        );
    }

    #[test]
    fn test_rejects_duplicate_names() {
        let result = Registry::new(vec![
            RepositoryEntry::new("alpha", "https://github.com/org/alpha"),
            RepositoryEntry::new("alpha", "https://github.com/other/alpha"),
        ]);
        assert!(matches!(result, Err(DevsyncError::DuplicateModule(n)) if n == "alpha"));
    }

    #[test]
    fn test_rejects_empty_name() {
        let result = Registry::new(vec![RepositoryEntry::new(" ", "https://github.com/org/x")]);
        assert!(matches!(result, Err(DevsyncError::Config(_))));
    }

    #[test]
    fn test_rejects_names_outside_workspace() {
        for name in ["/abs", "../x", "a/b", ".", "..", "alpha/"] {
            let result =
                Registry::new(vec![RepositoryEntry::new(name, "https://github.com/org/x")]);
            assert!(
                matches!(result, Err(DevsyncError::Config(_))),
                "{name} should be rejected"
            );
        }
        let ok = Registry::new(vec![RepositoryEntry::new(
            "compas_3gs",
            "https://github.com/org/x",
        )]);
        assert!(ok.is_ok());
    }

    #[test]
    fn test_select_keeps_registry_order() {
        let registry = Registry::default();
        let picked = registry
            .select(&["compas_tna".to_string(), "compas".to_string()])
            .unwrap();
        let names: Vec<&str> = picked.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["compas", "compas_tna"]);
    }

    #[test]
    fn test_select_unknown_module() {
        let registry = Registry::default();
        let result = registry.select(&["nope".to_string()]);
        assert!(matches!(result, Err(DevsyncError::UnknownModule(n)) if n == "nope"));
    }

    #[test]
    fn test_coordinates() {
        let entry = RepositoryEntry::new("alpha", "https://github.com/org/alpha");
        let coords = entry.coordinates().unwrap();
        assert_eq!(coords.owner, "org");
        assert_eq!(coords.repo, "alpha");

        let entry = RepositoryEntry::new("beta", "https://github.com/org/beta.git/");
        assert_eq!(entry.coordinates().unwrap().repo, "beta");
    }

    #[test]
    fn test_coordinates_invalid() {
        for url in [
            "git@github.com:org/alpha.git",
            "https://github.com/org",
            "https://github.com/org/alpha/tree/main",
            "https://github.com//alpha",
        ] {
            let entry = RepositoryEntry::new("x", url);
            assert!(
                matches!(entry.coordinates(), Err(DevsyncError::InvalidUrl(_))),
                "{url} should not parse"
            );
        }
    }
}
