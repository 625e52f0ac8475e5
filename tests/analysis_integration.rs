//! Integration tests for whole-tree analysis
//!
//! Each test builds a small source tree in a temporary directory and runs the
//! default registry over it.

mod common;

use archscan::{AnalysisConfig, AnalyzerRegistry, Role};
use common::{analyze_tree, cargo_manifest, polyglot_tree, registry, write_file};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_empty_root_renders_minimal_views() {
    let dir = TempDir::new().unwrap();
    let analysis = analyze_tree(dir.path()).await;

    assert!(analysis.projects().is_empty());
    assert!(analysis.summary().ecosystems.is_empty());
    assert_eq!(analysis.summary().primary_ecosystem, None);
    assert_eq!(analysis.conventions().naming_style, "Unknown");

    let summary = analysis.summary_text();
    assert!(summary.starts_with("# Architecture Summary: fixture\n"));
    assert!(summary.contains("## Projects\n- None detected\n"));
    assert!(summary.contains("## Extension Points\n- None detected\n"));
    assert_eq!(
        analysis.summary_context().token_estimate,
        summary.chars().count().div_ceil(4)
    );
    assert!(analysis
        .full_context_text()
        .contains("## Projects\n- None detected\n"));
}

#[tokio::test]
async fn test_cargo_dependencies_keep_declaration_order() {
    let dir = TempDir::new().unwrap();
    write_file(
        dir.path(),
        "Cargo.toml",
        &cargo_manifest(
            "orders",
            "serde = \"1.0\"\ntokio = { version = \"1.28\", features = [\"full\"] }\n",
        ),
    );
    write_file(dir.path(), "src/lib.rs", "pub struct Order;\n");

    let analysis = analyze_tree(dir.path()).await;
    let project = &analysis.projects()[0];
    assert_eq!(project.name, "orders");
    assert_eq!(project.relative_dir, ".");
    assert_eq!(project.manifest_path, "Cargo.toml");
    let deps: Vec<_> = project
        .dependencies
        .iter()
        .map(|d| (d.name.as_str(), d.version.as_deref()))
        .collect();
    assert_eq!(deps, vec![("serde", Some("1.0")), ("tokio", Some("1.28"))]);
    assert!(analysis
        .full_context_text()
        .contains("Dependencies: serde 1.0, tokio 1.28\n"));
}

#[tokio::test]
async fn test_project_name_falls_back_to_directory() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "billing/Cargo.toml", "[package]\nversion = \"0.1.0\"\n");
    write_file(dir.path(), "scripts/requirements.txt", "requests==2.31.0\n# pinned\nclick\n");

    let analysis = analyze_tree(dir.path()).await;
    let names: Vec<_> = analysis.projects().iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["billing", "scripts"]);

    let scripts = &analysis.projects()[1];
    assert_eq!(scripts.ecosystem, "python");
    assert_eq!(scripts.root_namespace, "scripts");
    assert_eq!(scripts.namespaces, vec!["scripts"]);
    let deps: Vec<_> = scripts
        .dependencies
        .iter()
        .map(|d| (d.name.as_str(), d.version.as_deref()))
        .collect();
    assert_eq!(deps, vec![("requests", Some("==2.31.0")), ("click", None)]);
}

#[tokio::test]
async fn test_malformed_manifest_degrades() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "broken/Cargo.toml", "[package\nname = \"broken-crate\"\n");
    write_file(dir.path(), "broken/src/lib.rs", "pub struct Survivor;\n");

    let analysis = analyze_tree(dir.path()).await;
    assert_eq!(analysis.projects().len(), 1);
    let project = &analysis.projects()[0];
    assert_eq!(project.name, "broken");
    assert!(project.dependencies.is_empty());
    assert_eq!(project.types.len(), 1);
    assert_eq!(project.types[0].name, "Survivor");
    assert_eq!(project.types[0].source_file, "broken/src/lib.rs");
}

#[tokio::test]
async fn test_excluded_directories_contribute_nothing() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write_file(root, "Cargo.toml", &cargo_manifest("app", ""));
    write_file(root, "src/lib.rs", "pub struct Real;\n");
    write_file(root, "target/debug/build/gen.rs", "pub struct Ghost;\n");
    write_file(
        root,
        "node_modules/ui-kit/package.json",
        r#"{"name": "ui-kit", "dependencies": {"react": "18.2.0"}}"#,
    );
    write_file(root, "node_modules/ui-kit/Button.tsx", "export function Button() {}\n");
    write_file(
        root,
        "bin/Debug/Legacy.csproj",
        "<Project Sdk=\"Microsoft.NET.Sdk\"></Project>\n",
    );
    write_file(root, "obj/Generated.cs", "public class Generated {}\n");
    write_file(root, "__pycache__/pyproject.toml", "[project]\nname = \"cache\"\n");
    write_file(root, "__pycache__/cached.py", "class Cached:\n    pass\n");
    write_file(root, "tools/vendor/go.mod", "module example.com/vendored\n");

    let analysis = analyze_tree(root).await;
    assert_eq!(analysis.projects().len(), 1);
    let project = &analysis.projects()[0];
    assert_eq!(project.ecosystem, "rust");
    let types: Vec<_> = project.types.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(types, vec!["Real"]);
    assert_eq!(analysis.summary().ecosystems, vec!["rust"]);
}

#[tokio::test]
async fn test_exclusions_apply_only_to_their_own_ecosystem() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write_file(root, "Cargo.toml", &cargo_manifest("gateway", ""));
    write_file(root, "src/lib.rs", "pub struct GatewayService;\n");
    write_file(root, "src/bin/server.rs", "struct ApiHandler;\n\nfn main() {}\n");
    write_file(root, "src/build/plan.rs", "pub struct BuildPlanner;\n");
    write_file(root, "src/out/report.rs", "pub struct ReportWriter;\n");

    write_file(
        root,
        "Billing/Billing.csproj",
        "<Project Sdk=\"Microsoft.NET.Sdk\">\n  <PropertyGroup>\n    <TargetFramework>net8.0</TargetFramework>\n  </PropertyGroup>\n</Project>\n",
    );
    write_file(
        root,
        "Billing/Services/InvoiceService.cs",
        "namespace Billing.Services;\n\npublic class InvoiceService\n{\n}\n",
    );
    write_file(root, "Billing/bin/Debug/Stale.cs", "public class Stale {}\n");
    write_file(root, "Billing/obj/Generated.cs", "public class Generated {}\n");

    write_file(root, "svc/go.mod", "module example.com/gateway/svc\n\ngo 1.21\n");
    write_file(
        root,
        "svc/internal/build/planner.go",
        "package build\n\ntype Planner struct {\n\tSteps []string\n}\n",
    );

    let analysis = analyze_tree(root).await;
    let projects = analysis.projects();
    let ecosystems: Vec<_> = projects.iter().map(|p| p.ecosystem.as_str()).collect();
    assert_eq!(ecosystems, vec!["rust", "dotnet", "go"]);

    let rust_types: Vec<_> = projects[0].types.iter().map(|t| t.name.as_str()).collect();
    for name in ["GatewayService", "ApiHandler", "BuildPlanner", "ReportWriter"] {
        assert!(rust_types.contains(&name), "{} missing from {:?}", name, rust_types);
    }
    assert!(projects[0]
        .types
        .iter()
        .any(|t| t.source_file == "src/bin/server.rs"));

    let dotnet_types: Vec<_> = projects[1].types.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(dotnet_types, vec!["InvoiceService"]);

    let go_types: Vec<_> = projects[2].types.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(go_types, vec!["Planner"]);
}

#[tokio::test]
async fn test_nested_project_owns_its_sources() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write_file(root, "Cargo.toml", &cargo_manifest("host", ""));
    write_file(root, "src/lib.rs", "pub struct HostService;\n");
    write_file(root, "plugins/audit/Cargo.toml", &cargo_manifest("audit", ""));
    write_file(root, "plugins/audit/src/lib.rs", "pub struct AuditHandler;\n");

    let analysis = analyze_tree(root).await;
    let projects = analysis.projects();
    assert_eq!(projects.len(), 2);
    assert_eq!(projects[0].name, "host");
    assert_eq!(projects[1].name, "audit");
    assert_eq!(projects[1].relative_dir, "plugins/audit");

    assert_eq!(projects[0].types.len(), 1);
    assert_eq!(projects[0].types[0].name, "HostService");
    assert_eq!(projects[1].types.len(), 1);
    assert_eq!(projects[1].types[0].name, "AuditHandler");
    assert_eq!(projects[1].types[0].role, Some(Role::Controller));
}

#[tokio::test]
async fn test_test_projects_detected() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    let csproj = "<Project Sdk=\"Microsoft.NET.Sdk\">\n  <PropertyGroup>\n    <TargetFramework>net8.0</TargetFramework>\n  </PropertyGroup>\n</Project>\n";
    write_file(root, "src/Foo/Foo.csproj", csproj);
    write_file(root, "src/Foo/FooService.cs", "namespace Foo;\npublic class FooService {}\n");
    write_file(root, "tests/Foo.Tests/Foo.Tests.csproj", csproj);
    write_file(
        root,
        "tests/Foo.Tests/FooServiceFixture.cs",
        "using Xunit;\nnamespace Foo.Tests;\npublic class FooServiceFixture {}\n",
    );

    let analysis = analyze_tree(root).await;
    let projects = analysis.projects();
    assert_eq!(projects.len(), 2);
    assert!(!projects[0].is_test_project());
    assert!(projects[1].is_test_project());
    assert_eq!(projects[1].types[0].role, Some(Role::UnitTest));
    assert_eq!(analysis.summary().test_project_count, 1);
    assert!(analysis.summary_text().contains(
        "- Foo.Tests [Test] (dotnet): Automated tests verifying other projects\n"
    ));
    assert!(analysis.summary_text().contains("- dotnet (net8.0)\n"));
}

#[tokio::test]
async fn test_extension_points_capped_at_ten() {
    let dir = TempDir::new().unwrap();
    for i in 1..=12 {
        let name = format!("crate{:02}", i);
        write_file(
            dir.path(),
            &format!("{}/Cargo.toml", name),
            &cargo_manifest(&name, ""),
        );
        write_file(
            dir.path(),
            &format!("{}/src/lib.rs", name),
            "pub struct OrderController;\npub struct OrderService;\npub struct OrderRepository;\n",
        );
    }

    let analysis = analyze_tree(dir.path()).await;
    assert_eq!(analysis.projects().len(), 12);

    let points = &analysis.summary_context().extension_points;
    assert_eq!(points.len(), 10);
    assert_eq!(points[0].project, "crate01");
    assert_eq!(points[0].pattern, Role::Controller);
    assert_eq!(points[0].layer, "Presentation");
    assert_eq!(points[2].pattern, Role::Repository);
    assert_eq!(points[2].layer, "Data Access");
    assert_eq!(points[9].project, "crate04");
    assert_eq!(
        analysis.summary_context().architecture_layers,
        vec!["Presentation", "Service", "Data Access"]
    );
}

#[tokio::test]
async fn test_polyglot_projects_follow_registration_order() {
    let dir = polyglot_tree();
    let analysis = analyze_tree(dir.path()).await;

    let projects: Vec<_> = analysis
        .projects()
        .iter()
        .map(|p| (p.ecosystem.as_str(), p.name.as_str()))
        .collect();
    assert_eq!(
        projects,
        vec![
            ("rust", "backend"),
            ("dotnet", "Shop.Api"),
            ("python", "shop-tools"),
            ("go", "svc"),
            ("frontend", "shop-web"),
        ]
    );
    assert_eq!(
        analysis.summary().ecosystems,
        vec!["rust", "dotnet", "python", "go", "frontend"]
    );
    assert_eq!(analysis.summary().primary_ecosystem.as_deref(), Some("rust"));
    assert_eq!(analysis.conventions().naming_style, "snake_case");

    let controller = &analysis.projects()[1].types[0];
    assert_eq!(controller.name, "OrdersController");
    assert_eq!(controller.namespace, "Shop.Api.Controllers");
    assert_eq!(controller.supertypes, vec!["ControllerBase"]);
    assert_eq!((controller.start_line, controller.end_line), (3, 6));

    let gateway = &analysis.projects()[3].interfaces[0];
    assert_eq!(gateway.namespace, "example.com/shop/svc/internal/store");
    assert_eq!(gateway.role, Some(Role::Repository));

    let page = &analysis.projects()[4].types[0];
    assert_eq!(page.name, "CartPage");
    assert_eq!(page.role, Some(Role::View));

    let technologies = &analysis.summary_context().technologies;
    assert_eq!(
        technologies,
        &vec![
            "rust (edition 2021)".to_string(),
            "dotnet (net8.0)".to_string(),
            "python (python >=3.11)".to_string(),
            "go (go 1.21)".to_string(),
            "frontend (react ^18.2.0)".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_renderings_are_deterministic() {
    let dir = polyglot_tree();
    let first = analyze_tree(dir.path()).await;
    let second = analyze_tree(dir.path()).await;

    assert_eq!(first.summary_text(), second.summary_text());
    assert_eq!(first.full_context_text(), second.full_context_text());
    assert_eq!(first.projects(), second.projects());
}

#[tokio::test]
async fn test_detail_view_caps_declarations() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "Cargo.toml", &cargo_manifest("big", ""));
    let source: String = (0..50).map(|i| format!("pub struct Item{};\n", i)).collect();
    write_file(dir.path(), "src/lib.rs", &source);

    let config = AnalysisConfig {
        detail_declaration_cap: 40,
        ..AnalysisConfig::default()
    };
    let registry = AnalyzerRegistry::with_defaults(config).unwrap();
    let analysis = registry
        .analyze(dir.path(), "big", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(analysis.summary().type_count, 50);
    let detail = analysis.full_context_text();
    assert!(detail.contains("(showing 40 of 50 declarations)"));
    assert!(detail.contains("- big::Item39 (src/lib.rs:40-40)"));
    assert!(!detail.contains("Item40 "));
}

#[tokio::test]
async fn test_json_round_trip() {
    let dir = polyglot_tree();
    let analysis = analyze_tree(dir.path()).await;

    let json = analysis.to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["schema_version"], 1);
    assert_eq!(value["name"], "fixture");
    assert_eq!(value["projects"][0]["dependencies"][0]["name"], "serde");
    assert_eq!(value["summary"]["project_count"], 5);

    let restored: archscan::AggregateAnalysis = serde_json::from_str(&json).unwrap();
    assert_eq!(restored.summary_text(), analysis.summary_text());
    assert_eq!(restored.projects(), analysis.projects());
}

#[test]
fn test_blocking_analysis() {
    let dir = polyglot_tree();
    let analysis = registry()
        .analyze_blocking(dir.path(), "fixture", &CancellationToken::new())
        .unwrap();
    assert_eq!(analysis.projects().len(), 5);
}
