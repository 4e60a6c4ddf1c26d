//! `report` 서브커맨드 출력

use aiexec_core::ScanReport;
use std::fmt::Write;

/// 요약, 카테고리별 컴포넌트 수, 실패 목록
pub fn render(report: &ScanReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Scanned at {}", report.scanned_at.format("%Y-%m-%d %H:%M:%S UTC"));
    let _ = writeln!(out, "{}", report.summary());

    if !report.registry.is_empty() {
        let _ = writeln!(out, "\nCategories:");
        for (category, components) in report.registry.iter() {
            let names: Vec<&str> = components.keys().map(String::as_str).collect();
            let _ = writeln!(out, "  {:<16} {:>3}  {}", category, components.len(), names.join(", "));
        }
    }

    if !report.missing_paths.is_empty() {
        let _ = writeln!(out, "\nMissing paths:");
        for path in &report.missing_paths {
            let _ = writeln!(out, "  {}", path.display());
        }
    }

    if !report.failures.is_empty() {
        let _ = writeln!(out, "\nFailures:");
        for failure in &report.failures {
            let _ = writeln!(out, "  {}", failure);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use aiexec_core::component::ComponentDiscovery;
    use aiexec_core::DiscoveryConfig;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_render_lists_failures_and_missing_paths() {
        let temp = TempDir::new().unwrap();
        let tools = temp.path().join("tools");
        std::fs::create_dir_all(&tools).unwrap();
        std::fs::write(tools.join("calc.json"), r#"{ "name": "Calc", "display_name": "Calc" }"#).unwrap();
        std::fs::write(tools.join("broken.json"), "{").unwrap();

        let discovery = ComponentDiscovery::new(DiscoveryConfig::default()).unwrap();
        let root = temp.path().to_string_lossy().into_owned();
        let report = discovery
            .scan(&[root, "/definitely/nonexistent/dir".to_string()])
            .await
            .unwrap();

        let output = render(&report);
        assert!(output.contains("1 components in 1 categories"));
        assert!(output.contains("Calc"));
        assert!(output.contains("Missing paths:"));
        assert!(output.contains("/definitely/nonexistent/dir"));
        assert!(output.contains("Failures:"));
        assert!(output.contains("broken.json"));
    }
}
