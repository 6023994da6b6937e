//! tree command - Print managed-kind hierarchies

use crate::cli::Context;
use crate::core::store::{IndexEntry, ProjectStore};
use crate::core::types::ManagedKind;
use anyhow::Result;

/// Print the hierarchy of `kind`, or of every kind.
pub fn tree(ctx: &Context, kind: Option<ManagedKind>) -> Result<()> {
    let store = ctx.open_store()?;
    let kinds = match kind {
        Some(kind) => vec![kind],
        None => ManagedKind::ALL.to_vec(),
    };

    for (i, kind) in kinds.into_iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!("{}:", kind);
        for line in render(&store, kind) {
            println!("  {}", line);
        }
    }
    Ok(())
}

/// Render one kind's hierarchy as indented lines.
fn render(store: &ProjectStore, kind: ManagedKind) -> Vec<String> {
    let mut lines = Vec::new();
    if kind == ManagedKind::AssetFolder {
        let mut entries: Vec<&IndexEntry> = store.entries(kind).collect();
        entries.sort_by(|a, b| a.asset_path().cmp(&b.asset_path()));
        for entry in entries {
            let depth = entry.asset_path().map_or(0, |p| p.depth());
            let label = match entry.asset_path() {
                Some(path) if !path.is_root() => path.to_string(),
                _ => format!("<root> {}", entry.class),
            };
            lines.push(format!("{}{} {}", "  ".repeat(depth), label, entry.id));
        }
        return lines;
    }

    let mut roots: Vec<&IndexEntry> = store.index(kind).roots().collect();
    roots.sort_by(|a, b| (&a.name, &a.id).cmp(&(&b.name, &b.id)));
    for root in roots {
        walk(store, kind, root, 0, &mut lines);
    }
    lines
}

fn walk(
    store: &ProjectStore,
    kind: ManagedKind,
    entry: &IndexEntry,
    depth: usize,
    lines: &mut Vec<String>,
) {
    let name = if entry.name.is_empty() {
        entry.class.to_string()
    } else {
        entry.name.clone()
    };
    lines.push(format!("{}{} {}", "  ".repeat(depth), name, entry.id));

    let mut children = store.children(kind, &entry.id);
    children.sort_by(|a, b| (&a.name, &a.id).cmp(&(&b.name, &b.id)));
    for child in children {
        walk(store, kind, child, depth + 1, lines);
    }
}
