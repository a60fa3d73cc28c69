use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A portfolio project with its outbound links keyed by kind
/// (`"repo"`, `"live"`, ...).
///
/// Project files may carry arbitrary extra fields; only `name` and `links`
/// are interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    #[serde(default)]
    pub links: BTreeMap<String, String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ProjectCatalog {
    List(Vec<Project>),
    Wrapped { projects: Vec<Project> },
}

impl Project {
    /// Parse a projects file, accepting either a top-level array or an
    /// object with a `projects` array.
    pub fn parse_list(raw: &str) -> serde_json::Result<Vec<Project>> {
        Ok(match serde_json::from_str(raw)? {
            ProjectCatalog::List(projects) => projects,
            ProjectCatalog::Wrapped { projects } => projects,
        })
    }
}

/// Who the assistant speaks about; drives the intro greeting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    pub name: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_top_level_array() {
        let projects = Project::parse_list(
            r#"[{"name":"Orbit","links":{"live":"https://orbit.test"},"stack":["rust"]}]"#,
        )
        .unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].links["live"], "https://orbit.test");
    }

    #[test]
    fn parse_wrapped_object() {
        let projects =
            Project::parse_list(r#"{"projects":[{"name":"Atlas"}]}"#).unwrap();
        assert_eq!(projects[0].name, "Atlas");
        assert!(projects[0].links.is_empty());
    }

    #[test]
    fn parse_rejects_other_shapes() {
        assert!(Project::parse_list(r#"{"name":"x"}"#).is_err());
    }
}
