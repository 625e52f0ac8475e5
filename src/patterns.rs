//! Naming heuristics that tag declarations with an architectural role.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Architectural role inferred for a type or interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Controller,
    View,
    Service,
    Repository,
    Helper,
    UnitTest,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Controller => "Controller",
            Role::View => "View",
            Role::Service => "Service",
            Role::Repository => "Repository",
            Role::Helper => "Helper",
            Role::UnitTest => "UnitTest",
        }
    }

    pub fn layer(&self) -> Layer {
        match self {
            Role::Controller | Role::View => Layer::Presentation,
            Role::Service => Layer::Service,
            Role::Repository => Layer::DataAccess,
            Role::Helper => Layer::Utility,
            Role::UnitTest => Layer::Test,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Layer a role belongs to. Only the first three are architecture layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Layer {
    Presentation,
    Service,
    DataAccess,
    Utility,
    Test,
}

impl Layer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Layer::Presentation => "Presentation",
            Layer::Service => "Service",
            Layer::DataAccess => "Data Access",
            Layer::Utility => "Utility",
            Layer::Test => "Test",
        }
    }

    pub fn is_architectural(&self) -> bool {
        matches!(self, Layer::Presentation | Layer::Service | Layer::DataAccess)
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Ordered: the first rule with a matching fragment wins.
const ROLE_VOCABULARY: &[(Role, &[&str])] = &[
    (
        Role::Controller,
        &["Controller", "Handler", "Endpoint", "Resource", "Router", "Routes"],
    ),
    (
        Role::View,
        &["View", "Page", "Component", "Screen", "Widget", "Layout"],
    ),
    (
        Role::Service,
        &["Service", "Manager", "Provider", "UseCase", "Client"],
    ),
    (
        Role::Repository,
        &["Repository", "Dao", "DAO", "Store", "Gateway"],
    ),
    (Role::Helper, &["Helper", "Util", "Extensions"]),
];

const TEST_PROJECT_SUFFIXES: &[&str] = &[
    ".tests",
    ".test",
    ".unittests",
    ".integrationtests",
    ".specs",
    "_tests",
    "_test",
    "-tests",
    "-test",
    "-e2e",
];

/// Role of a declaration named `name`, declared in a file that is (or is not)
/// a test artifact.
pub fn classify_role(name: &str, in_test_file: bool) -> Option<Role> {
    if in_test_file || name.ends_with("Tests") || name.ends_with("Test") {
        return Some(Role::UnitTest);
    }

    ROLE_VOCABULARY
        .iter()
        .find(|(_, fragments)| fragments.iter().any(|f| name.contains(f)))
        .map(|(role, _)| *role)
}

/// Whether a project name follows a test-project naming convention
/// (`Foo.Tests`, `foo_test`, `web-e2e`, `tests`).
pub fn is_test_project_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    if lower == "tests" || lower == "test" {
        return true;
    }
    TEST_PROJECT_SUFFIXES.iter().any(|s| lower.ends_with(s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[parameterized(
        controller = { "OrderController", Some(Role::Controller) },
        handler = { "WebhookHandler", Some(Role::Controller) },
        view = { "ProfileView", Some(Role::View) },
        component = { "UserListComponent", Some(Role::View) },
        service = { "BillingService", Some(Role::Service) },
        manager = { "SessionManager", Some(Role::Service) },
        repository = { "UserRepository", Some(Role::Repository) },
        dao = { "AccountDAO", Some(Role::Repository) },
        helper = { "StringHelper", Some(Role::Helper) },
        test_suffix = { "BillingServiceTests", Some(Role::UnitTest) },
        plain = { "Invoice", None },
        review_is_not_view = { "Review", None },
    )]
    fn test_classify_role(name: &str, expected: Option<Role>) {
        assert_eq!(classify_role(name, false), expected);
    }

    #[test]
    fn test_first_matching_rule_wins() {
        // Controller rule precedes Service rule.
        assert_eq!(classify_role("ServiceController", false), Some(Role::Controller));
        assert_eq!(classify_role("ReportService", false), Some(Role::Service));
    }

    #[test]
    fn test_test_file_overrides_vocabulary() {
        assert_eq!(classify_role("OrderController", true), Some(Role::UnitTest));
        assert_eq!(classify_role("Fixture", true), Some(Role::UnitTest));
    }

    #[test]
    fn test_role_layers() {
        assert_eq!(Role::Controller.layer(), Layer::Presentation);
        assert_eq!(Role::View.layer(), Layer::Presentation);
        assert_eq!(Role::Repository.layer(), Layer::DataAccess);
        assert!(!Role::Helper.layer().is_architectural());
        assert!(Layer::Service.is_architectural());
    }

    #[parameterized(
        dotnet = { "Foo.Tests", true },
        dotnet_single = { "Foo.Test", true },
        integration = { "Shop.IntegrationTests", true },
        snake = { "billing_tests", true },
        kebab = { "web-e2e", true },
        bare = { "tests", true },
        library = { "Foo.Core", false },
        contains_test_word = { "testing-utils", false },
    )]
    fn test_is_test_project_name(name: &str, expected: bool) {
        assert_eq!(is_test_project_name(name), expected);
    }
}
