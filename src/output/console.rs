use crate::analysis::SummaryEntry;
use crate::ScanReport;

/// Render a scan report as a plain-text overview: packages, then their
/// dependencies, then the summary when there is one.
pub fn render(report: &ScanReport) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "\n  Scanned {} file(s) in {}\n\n",
        report.codebase.file_count(),
        report.codebase.root().name
    ));

    if report.packages.is_empty() {
        output.push_str("  No packages detected.\n");
    } else {
        output.push_str(&format!("  {} package(s):\n\n", report.packages.len()));
        for package in &report.packages {
            output.push_str(&format!(
                "  {:<48} {}\n",
                package.purl.as_deref().unwrap_or("-"),
                package.license_expression.as_deref().unwrap_or("-"),
            ));
            for path in &package.datafile_paths {
                output.push_str(&format!("           from {}\n", path));
            }
        }
    }

    let unowned = report
        .dependencies
        .iter()
        .filter(|d| d.for_package_uid.is_none())
        .count();
    output.push_str(&format!(
        "\n  {} dependenc{} ({} not tied to a package)\n",
        report.dependencies.len(),
        if report.dependencies.len() == 1 { "y" } else { "ies" },
        unowned
    ));
    for dependency in &report.dependencies {
        output.push_str(&format!(
            "    {:<44} {:<20} {}\n",
            dependency.purl,
            dependency.extracted_requirement.as_deref().unwrap_or("-"),
            dependency.scope.as_deref().unwrap_or("-"),
        ));
    }

    let errors: Vec<(&str, &String)> = report
        .codebase
        .resources()
        .flat_map(|r| r.scan_errors.iter().map(move |e| (r.path.as_str(), e)))
        .collect();
    if !errors.is_empty() {
        output.push_str(&format!("\n  {} scan error(s):\n", errors.len()));
        for (path, error) in errors {
            output.push_str(&format!("    {}: {}\n", path, error));
        }
    }

    if let Some(summary) = &report.summary {
        push_entries(&mut output, "Copyrights", &summary.copyrights);
        push_entries(&mut output, "Holders", &summary.holders);
        push_entries(&mut output, "Authors", &summary.authors);
    }

    output.push('\n');
    output
}

fn push_entries(output: &mut String, title: &str, entries: &[SummaryEntry]) {
    output.push_str(&format!("\n  {}:\n", title));
    for entry in entries {
        output.push_str(&format!(
            "    {:>4}  {}\n",
            entry.count,
            entry.value.as_deref().unwrap_or("(none)")
        ));
    }
}
