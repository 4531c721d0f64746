//! Schema diagram generator.
//!
//! Emits Graphviz DOT for the two-table schema; render with
//! `dot -Tpng schema.dot -o schema.png`. Column lists here mirror
//! `init_schema` and should change together with it.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

const DISTRICT_COLUMNS: &[(&str, &str)] = &[
    ("region_code", "TEXT PK"),
    ("sigungu_name", "TEXT"),
    ("addr_level1", "TEXT"),
    ("addr_level2", "TEXT"),
];

const TRADE_COLUMNS: &[(&str, &str)] = &[
    ("id", "INTEGER PK"),
    ("region_code", "TEXT FK"),
    ("contract_date", "DATE"),
    ("district_name", "TEXT"),
    ("district_code", "TEXT"),
    ("construction_year", "INTEGER"),
    ("address", "TEXT"),
    ("apt_name", "TEXT"),
    ("apt_section", "TEXT"),
    ("floor", "INTEGER"),
    ("area", "INTEGER"),
    ("price", "INTEGER"),
    ("price_unit", "REAL"),
    ("py", "INTEGER"),
    ("py_unit", "REAL"),
    ("created_at", "DATETIME"),
];

fn table_node(out: &mut String, name: &str, columns: &[(&str, &str)]) {
    let _ = writeln!(out, "  {name} [label=<");
    let _ = writeln!(
        out,
        "    <TABLE BORDER=\"0\" CELLBORDER=\"1\" CELLSPACING=\"0\">"
    );
    let _ = writeln!(
        out,
        "      <TR><TD COLSPAN=\"2\" BGCOLOR=\"lightgrey\"><B>{name}</B></TD></TR>"
    );
    for (column, column_type) in columns {
        let _ = writeln!(
            out,
            "      <TR><TD PORT=\"{column}\" ALIGN=\"LEFT\">{column}</TD><TD ALIGN=\"LEFT\">{column_type}</TD></TR>"
        );
    }
    let _ = writeln!(out, "    </TABLE>>];");
}

/// DOT source for the store schema.
#[must_use]
pub fn schema_diagram() -> String {
    let mut out = String::new();
    let _ = writeln!(out, "digraph apartment_trade_schema {{");
    let _ = writeln!(out, "  rankdir=LR;");
    let _ = writeln!(out, "  node [shape=plain fontname=\"Helvetica\"];");
    table_node(&mut out, "district_code", DISTRICT_COLUMNS);
    table_node(&mut out, "trade", TRADE_COLUMNS);
    let _ = writeln!(
        out,
        "  trade:region_code -> district_code:region_code [label=\"FK\"];"
    );
    let _ = writeln!(out, "}}");
    out
}

/// Writes the DOT source to `path`, creating parent directories.
pub fn write_diagram(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating diagram directory {parent:?}"))?;
    }
    std::fs::write(path, schema_diagram())
        .with_context(|| format!("writing schema diagram {path:?}"))?;
    info!(path = ?path, "Wrote schema diagram");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagram_contains_both_tables_and_the_fk_edge() {
        let dot = schema_diagram();
        assert!(dot.starts_with("digraph"));
        assert!(dot.contains("<B>district_code</B>"));
        assert!(dot.contains("<B>trade</B>"));
        assert!(dot.contains("trade:region_code -> district_code:region_code"));
    }

    #[test]
    fn trade_table_lists_every_stored_column() {
        let dot = schema_diagram();
        for (column, _) in TRADE_COLUMNS {
            assert!(dot.contains(&format!("PORT=\"{column}\"")), "missing {column}");
        }
    }

    #[test]
    fn write_diagram_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docs/erd/schema.dot");
        write_diagram(&path).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("digraph"));
    }
}
