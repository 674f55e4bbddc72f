use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Result;
use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use crate::models::{Dependency, LicenseRisk, PolicyVerdict};

/// Render a colored terminal report.
pub fn render(deps: &[Dependency], projects: &[PathBuf], verbose: bool, quiet: bool) -> Result<()> {
    let total = deps.len();
    let count = |verdict: PolicyVerdict| deps.iter().filter(|d| d.verdict == verdict).count();
    let pass_count = count(PolicyVerdict::Pass);
    let warn_count = count(PolicyVerdict::Warn);
    let error_count = count(PolicyVerdict::Error);

    if quiet {
        println!(
            "Projects: {}  Total: {}  Pass: {}  Warn: {}  Error: {}",
            projects.len(),
            total,
            pass_count.to_string().green(),
            warn_count.to_string().yellow(),
            error_count.to_string().red(),
        );
        return Ok(());
    }

    println!(
        "\n {} v{}",
        "license-probe".bold(),
        env!("CARGO_PKG_VERSION")
    );
    for project in projects {
        println!(" Project: {}", project.display());
    }
    println!();

    println!(" ┌────────────────────────────────────────────────────┐");
    println!(" │  {:<48} │", "SUMMARY".bold());
    println!(" │  {:<48} │", format!("Total dependencies : {}", total));
    for (symbol, label, n, verdict) in [
        ("✓".green(), "Pass ", pass_count, PolicyVerdict::Pass),
        ("⚠".yellow(), "Warn ", warn_count, PolicyVerdict::Warn),
        ("✗".red(), "Error", error_count, PolicyVerdict::Error),
    ] {
        println!(
            " │  {:<48} │",
            format!(
                "{}  {}           : {:>4}  {}",
                symbol,
                label,
                n,
                summarize_licenses(deps, &verdict)
            )
        );
    }
    println!(" └────────────────────────────────────────────────────┘\n");

    if error_count > 0 {
        println!(" {} Dependencies requiring attention:\n", "[ERROR]".red().bold());
        render_table(deps, &PolicyVerdict::Error, projects.len() > 1);
        println!();
    }

    if warn_count > 0 {
        println!(" {} Dependencies with warnings:\n", "[WARN]".yellow().bold());
        render_table(deps, &PolicyVerdict::Warn, projects.len() > 1);
        println!();
    }

    if verbose && pass_count > 0 {
        println!(" {} All passing dependencies:\n", "[PASS]".green().bold());
        render_table(deps, &PolicyVerdict::Pass, projects.len() > 1);
        println!();
    }

    Ok(())
}

fn render_table(deps: &[Dependency], verdict_filter: &PolicyVerdict, show_project: bool) {
    let mut header = vec!["Name", "Version", "Manager", "Licenses", "Groups", "Risk", "Verdict"];
    if show_project {
        header.push("Project");
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            header
                .into_iter()
                .map(|h| Cell::new(h).add_attribute(Attribute::Bold)),
        );

    for dep in deps.iter().filter(|d| &d.verdict == verdict_filter) {
        let (verdict_str, verdict_color) = match dep.verdict {
            PolicyVerdict::Pass => ("✓ pass", Color::Green),
            PolicyVerdict::Warn => ("⚠ warn", Color::Yellow),
            PolicyVerdict::Error => ("✗ error", Color::Red),
        };

        let risk_color = match dep.risk {
            LicenseRisk::Permissive => Color::Green,
            LicenseRisk::WeakCopyleft => Color::Yellow,
            LicenseRisk::StrongCopyleft => Color::Red,
            LicenseRisk::Proprietary => Color::Magenta,
            LicenseRisk::Unknown => Color::DarkGrey,
        };

        let mut row = vec![
            Cell::new(&dep.name),
            Cell::new(&dep.version),
            Cell::new(&dep.package_manager),
            Cell::new(dep.license_names()),
            Cell::new(dep.groups.join(", ")),
            Cell::new(dep.risk.to_string()).fg(risk_color),
            Cell::new(verdict_str)
                .fg(verdict_color)
                .set_alignment(CellAlignment::Center),
        ];
        if show_project {
            row.push(Cell::new(dep.project.display()));
        }
        table.add_row(row);
    }

    println!("{}", table);
}

/// The three most common licenses among dependencies with `verdict`,
/// e.g. `[MIT (12), Apache-2.0 (4)]`.
fn summarize_licenses(deps: &[Dependency], verdict: &PolicyVerdict) -> String {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for dep in deps.iter().filter(|d| &d.verdict == verdict) {
        for license in &dep.licenses {
            *counts.entry(license.name().to_string()).or_insert(0) += 1;
        }
    }

    let mut pairs: Vec<(String, usize)> = counts.into_iter().collect();
    pairs.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let summary: Vec<String> = pairs
        .iter()
        .take(3)
        .map(|(lic, cnt)| format!("{} ({})", lic, cnt))
        .collect();

    if summary.is_empty() {
        String::new()
    } else {
        format!("[{}]", summary.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::license::License;

    fn dep(name: &str, licenses: &[&str], verdict: PolicyVerdict) -> Dependency {
        Dependency {
            name: name.to_string(),
            version: "1.0.0".to_string(),
            package_manager: "npm".to_string(),
            licenses: licenses.iter().map(|l| License::new(*l)).collect(),
            groups: Vec::new(),
            summary: String::new(),
            description: String::new(),
            homepage: String::new(),
            children: Vec::new(),
            project: PathBuf::from("/work/app"),
            risk: LicenseRisk::Unknown,
            verdict,
        }
    }

    #[test]
    fn test_summarize_licenses() {
        let deps = vec![
            dep("a", &["MIT"], PolicyVerdict::Pass),
            dep("b", &["MIT", "Apache-2.0"], PolicyVerdict::Pass),
            dep("c", &["ISC"], PolicyVerdict::Pass),
            dep("d", &["BSD-2-Clause"], PolicyVerdict::Pass),
            dep("e", &["GPL-3.0"], PolicyVerdict::Error),
        ];

        assert_eq!(
            summarize_licenses(&deps, &PolicyVerdict::Pass),
            "[MIT (2), Apache-2.0 (1), BSD-2-Clause (1)]"
        );
        assert_eq!(summarize_licenses(&deps, &PolicyVerdict::Error), "[GPL-3.0 (1)]");
        assert_eq!(summarize_licenses(&deps, &PolicyVerdict::Warn), "");
    }
}
