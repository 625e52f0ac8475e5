//! Fixture helpers shared by the integration tests.

#![allow(dead_code)]

use archscan::{AggregateAnalysis, AnalysisConfig, AnalyzerRegistry};
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

/// Writes `content` to `relative` under `root`, creating parent directories.
pub fn write_file(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

pub fn registry() -> AnalyzerRegistry {
    AnalyzerRegistry::with_defaults(AnalysisConfig::default()).unwrap()
}

pub async fn analyze_tree(root: &Path) -> AggregateAnalysis {
    registry()
        .analyze(root, "fixture", &CancellationToken::new())
        .await
        .unwrap()
}

pub fn cargo_manifest(name: &str, dependencies: &str) -> String {
    format!(
        "[package]\nname = \"{}\"\nversion = \"0.1.0\"\nedition = \"2021\"\n\n[dependencies]\n{}",
        name, dependencies
    )
}

/// Backend crate, ASP.NET project, Python tools, Go service and React app.
pub fn polyglot_tree() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    write_file(root, "backend/Cargo.toml", &cargo_manifest("backend", "serde = \"1.0\"\n"));
    write_file(
        root,
        "backend/src/lib.rs",
        "pub trait OrderRepository {\n    fn save(&self);\n}\n\npub struct OrderService;\n",
    );

    write_file(
        root,
        "Shop.Api/Shop.Api.csproj",
        r#"<Project Sdk="Microsoft.NET.Sdk.Web">
  <PropertyGroup>
    <TargetFramework>net8.0</TargetFramework>
  </PropertyGroup>
  <ItemGroup>
    <PackageReference Include="Serilog" Version="3.1.1" />
  </ItemGroup>
</Project>
"#,
    );
    write_file(
        root,
        "Shop.Api/Controllers/OrdersController.cs",
        "namespace Shop.Api.Controllers;\n\npublic class OrdersController : ControllerBase\n{\n    private readonly string _route = \"{id}\";\n}\n",
    );

    write_file(
        root,
        "tools/pyproject.toml",
        "[project]\nname = \"shop-tools\"\nrequires-python = \">=3.11\"\ndependencies = [\"requests>=2.31\"]\n",
    );
    write_file(
        root,
        "tools/src/shop_tools/export.py",
        "class ExportHelper:\n    pass\n",
    );

    write_file(root, "svc/go.mod", "module example.com/shop/svc\n\ngo 1.21\n");
    write_file(
        root,
        "svc/internal/store/store.go",
        "package store\n\ntype PaymentGateway interface {\n\tCharge(amount int) error\n}\n",
    );

    write_file(
        root,
        "web/package.json",
        r#"{"name": "shop-web", "dependencies": {"react": "^18.2.0"}}"#,
    );
    write_file(
        root,
        "web/src/pages/CartPage.tsx",
        "export function CartPage() {\n  return <main />;\n}\n",
    );

    dir
}
