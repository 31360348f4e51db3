//! Definition discovery: scan the blueprints tree for action definitions.
//!
//! Two layouts are recognized:
//! - internal:    `blueprints/<repo>/.github/actions/<name>/action.yml`
//! - marketplace: `blueprints/marketplace/<publisher>/<name>/action.yml`
//!
//! Both `action.yml` and `action.yaml` file names are accepted. Anything
//! else under the tree is ignored.

use std::path::{Path, PathBuf};

use anyhow::Result;
use walkdir::WalkDir;

use crate::models::SourceKind;

/// Top-level directories excluded from the internal scan.
const RESERVED_DIRS: [&str; 2] = ["marketplace", "marketplace_actions"];

/// A definition file found on disk, before parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredAction {
    pub action_id: String,
    pub path: PathBuf,
    pub kind: SourceKind,
    /// Remote origin (`host/owner/repo`) for marketplace actions.
    pub origin: Option<String>,
}

fn is_definition_file(name: &str) -> bool {
    name == "action.yml" || name == "action.yaml"
}

/// Walk the blueprints tree and classify every definition file found.
///
/// A missing blueprints directory yields an empty list with a warning, not
/// an error. Results are sorted by `action_id` for deterministic runs.
pub fn discover_actions(blueprints_dir: &Path) -> Result<Vec<DiscoveredAction>> {
    let mut actions = Vec::new();

    if !blueprints_dir.exists() {
        println!("warning: {} not found", blueprints_dir.display());
        return Ok(actions);
    }

    for entry in WalkDir::new(blueprints_dir) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if !is_definition_file(&name) {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(blueprints_dir)
            .unwrap_or(entry.path());
        if let Some(action) = classify(relative, entry.path()) {
            actions.push(action);
        }
    }

    actions.sort_by(|a, b| a.action_id.cmp(&b.action_id));
    Ok(actions)
}

/// Map a relative path to an action id, or None for paths that match
/// neither layout.
fn classify(relative: &Path, full_path: &Path) -> Option<DiscoveredAction> {
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();

    match parts.as_slice() {
        // marketplace/<publisher>/<name>/action.yml
        [top, publisher, name, _file] if top.as_str() == "marketplace" => Some(DiscoveredAction {
            action_id: format!("marketplace/{}/{}", publisher, name),
            path: full_path.to_path_buf(),
            kind: SourceKind::Marketplace,
            origin: Some(format!("github.com/{}/{}", publisher, name)),
        }),
        // <repo>/.github/actions/<name>/action.yml
        [repo, github, actions, name, _file]
            if github.as_str() == ".github"
                && actions.as_str() == "actions"
                && !RESERVED_DIRS.contains(&repo.as_str()) =>
        {
            Some(DiscoveredAction {
                action_id: format!("internal/{}/.github/actions/{}", repo, name),
                path: full_path.to_path_buf(),
                kind: SourceKind::Internal,
                origin: None,
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn discovers_both_layouts_sorted() {
        let tmp = tempfile::TempDir::new().unwrap();
        let root = tmp.path();
        write(root, "platform/.github/actions/setup/action.yml", "name: Setup");
        write(root, "marketplace/actions/checkout/action.yml", "name: Checkout");
        write(root, "marketplace/acme/deploy/action.yaml", "name: Deploy");

        let actions = discover_actions(root).unwrap();
        let ids: Vec<_> = actions.iter().map(|a| a.action_id.as_str()).collect();
        assert_eq!(
            ids,
            [
                "internal/platform/.github/actions/setup",
                "marketplace/acme/deploy",
                "marketplace/actions/checkout",
            ]
        );

        let checkout = &actions[2];
        assert_eq!(checkout.kind, SourceKind::Marketplace);
        assert_eq!(
            checkout.origin.as_deref(),
            Some("github.com/actions/checkout")
        );

        let internal = &actions[0];
        assert_eq!(internal.kind, SourceKind::Internal);
        assert_eq!(internal.origin, None);
    }

    #[test]
    fn ignores_files_outside_known_layouts() {
        let tmp = tempfile::TempDir::new().unwrap();
        let root = tmp.path();
        write(root, "platform/action.yml", "stray");
        write(root, "platform/.github/workflows/action.yml", "stray");
        write(root, "marketplace/acme/deploy/nested/action.yml", "too deep");
        write(root, "platform/.github/actions/setup/README.md", "docs");

        assert!(discover_actions(root).unwrap().is_empty());
    }

    #[test]
    fn reserved_dirs_are_not_internal_repos() {
        let tmp = tempfile::TempDir::new().unwrap();
        let root = tmp.path();
        write(
            root,
            "marketplace_actions/.github/actions/x/action.yml",
            "name: X",
        );

        assert!(discover_actions(root).unwrap().is_empty());
    }

    #[test]
    fn missing_blueprints_dir_is_empty_not_fatal() {
        let actions = discover_actions(Path::new("/nonexistent/blueprints")).unwrap();
        assert!(actions.is_empty());
    }
}
