//! File categorization heuristics
//!
//! Categories drive the dotted event taxonomy published on the bus:
//! a terraform file modification becomes `infrastructure.file.modified`,
//! a CI workflow deletion becomes `workflow.file.deleted`, and so on.

use std::path::Path;

use crate::change::FileChangeKind;

/// Coarse file category inferred from extension and path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileCategory {
    /// Terraform and other infrastructure-as-code sources
    Infrastructure,
    /// CI/CD workflow definitions
    Workflow,
    /// Container definitions (Dockerfiles, compose files)
    Container,
    /// Program source code
    SourceCode,
    /// Configuration files
    Configuration,
    /// Everything else
    Generic,
}

const SOURCE_EXTENSIONS: &[&str] = &[
    "rs", "py", "go", "js", "ts", "tsx", "jsx", "java", "kt", "c", "cc", "cpp", "h", "hpp", "rb",
    "sh", "bash",
];

const CONFIG_EXTENSIONS: &[&str] = &["yaml", "yml", "toml", "json", "ini", "conf", "env"];

impl FileCategory {
    /// Classify a path
    ///
    /// More specific categories win: a YAML file under a workflows directory
    /// is a workflow, not generic configuration; a `docker-compose.yml` is a
    /// container definition.
    pub fn classify(path: &Path) -> Self {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let lowered = path.to_string_lossy().to_ascii_lowercase();

        if matches!(extension.as_str(), "tf" | "tfvars" | "hcl")
            || component_present(&lowered, "terraform")
        {
            return FileCategory::Infrastructure;
        }

        if lowered.contains(".github/workflows")
            || (component_present(&lowered, "workflows")
                && matches!(extension.as_str(), "yml" | "yaml"))
        {
            return FileCategory::Workflow;
        }

        if name.starts_with("dockerfile")
            || name.starts_with("containerfile")
            || name.starts_with("docker-compose")
            || name == "compose.yml"
            || name == "compose.yaml"
        {
            return FileCategory::Container;
        }

        if SOURCE_EXTENSIONS.contains(&extension.as_str()) {
            return FileCategory::SourceCode;
        }

        if CONFIG_EXTENSIONS.contains(&extension.as_str()) || name.starts_with(".env") {
            return FileCategory::Configuration;
        }

        FileCategory::Generic
    }

    /// Taxonomy segment for this category
    pub fn tag(&self) -> &'static str {
        match self {
            FileCategory::Infrastructure => "infrastructure",
            FileCategory::Workflow => "workflow",
            FileCategory::Container => "container",
            FileCategory::SourceCode => "source",
            FileCategory::Configuration => "configuration",
            FileCategory::Generic => "generic",
        }
    }

    /// Dotted event type for a change of this category
    pub fn event_type(&self, kind: FileChangeKind) -> String {
        format!("{}.file.{}", self.tag(), kind.as_str())
    }
}

fn component_present(lowered_path: &str, component: &str) -> bool {
    lowered_path
        .split(['/', '\\'])
        .any(|part| part == component)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_terraform_classification() {
        assert_eq!(
            FileCategory::classify(&PathBuf::from("terraform/main.tf")),
            FileCategory::Infrastructure
        );
        assert_eq!(
            FileCategory::classify(&PathBuf::from("infra/vars.tfvars")),
            FileCategory::Infrastructure
        );
        assert_eq!(
            FileCategory::classify(&PathBuf::from("terraform/README.md")),
            FileCategory::Infrastructure
        );
    }

    #[test]
    fn test_workflow_classification() {
        assert_eq!(
            FileCategory::classify(&PathBuf::from(".github/workflows/ci.yml")),
            FileCategory::Workflow
        );
        assert_eq!(
            FileCategory::classify(&PathBuf::from("workflows/deploy.yaml")),
            FileCategory::Workflow
        );
    }

    #[test]
    fn test_container_classification() {
        assert_eq!(
            FileCategory::classify(&PathBuf::from("services/api/Dockerfile")),
            FileCategory::Container
        );
        assert_eq!(
            FileCategory::classify(&PathBuf::from("docker-compose.override.yml")),
            FileCategory::Container
        );
    }

    #[test]
    fn test_source_and_config_classification() {
        assert_eq!(
            FileCategory::classify(&PathBuf::from("src/main.rs")),
            FileCategory::SourceCode
        );
        assert_eq!(
            FileCategory::classify(&PathBuf::from("settings.toml")),
            FileCategory::Configuration
        );
        assert_eq!(
            FileCategory::classify(&PathBuf::from("notes.md")),
            FileCategory::Generic
        );
    }

    #[test]
    fn test_event_type_taxonomy() {
        assert_eq!(
            FileCategory::Infrastructure.event_type(FileChangeKind::Modified),
            "infrastructure.file.modified"
        );
        assert_eq!(
            FileCategory::Generic.event_type(FileChangeKind::Deleted),
            "generic.file.deleted"
        );
    }
}
