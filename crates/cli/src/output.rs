//! Rendering of the decoded package for the terminal or a file

use anyhow::{Context, Result};
use colored::Colorize;
use std::collections::HashMap;
use tabled::{Table, Tabled};

use mockprobe_core::domain::Package;

#[derive(Tabled)]
struct MethodRow {
    interface: String,
    method: String,
    signature: String,
}

/// Pretty JSON, newline-terminated
pub fn to_json(package: &Package) -> Result<String> {
    let mut json = serde_json::to_string_pretty(package).context("Failed to encode package")?;
    json.push('\n');
    Ok(json)
}

/// One row per method; interfaces without methods get a single empty row
pub fn to_table(package: &Package) -> String {
    let qualifiers = HashMap::new();
    let mut rows = Vec::new();

    for intf in &package.interfaces {
        if intf.methods.is_empty() {
            rows.push(MethodRow {
                interface: intf.name.clone(),
                method: String::new(),
                signature: String::new(),
            });
        }
        for method in &intf.methods {
            rows.push(MethodRow {
                interface: intf.name.clone(),
                method: method.name.clone(),
                signature: method.signature(&qualifiers, ""),
            });
        }
    }

    let mut out = format!("{} {}\n", "package".cyan().bold(), package.name);
    let imports = package.imports();
    if !imports.is_empty() {
        let imports: Vec<_> = imports.into_iter().collect();
        out.push_str(&format!("{} {}\n", "imports".cyan().bold(), imports.join(", ")));
    }
    out.push_str(&Table::new(rows).to_string());
    out.push('\n');
    out
}
