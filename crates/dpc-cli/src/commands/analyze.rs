use std::collections::BTreeSet;
use std::path::Path;

use dpc_core::{display_name, Catalog, ConnectionType, EntityType, FieldRef};

use crate::reader::read_catalog;

/// A lineage edge: `from` feeds `to`.
type Edge<'a> = (&'a str, &'a str, ConnectionType);

pub fn run_analyze(catalog_path: &Path, format: &str) -> Result<String, String> {
    let catalog = read_catalog(catalog_path)?;
    let edges = collect_edges(&catalog);

    match format {
        "dot" => Ok(render_dot(&catalog, &edges)),
        _ => Ok(render_mermaid(&catalog, &edges)),
    }
}

/// Entity-level edges from every well-formed reference to another catalog
/// entity. Self-references and references outside the catalog are left out.
fn collect_edges(catalog: &Catalog) -> Vec<Edge<'_>> {
    let mut edges: BTreeSet<Edge<'_>> = BTreeSet::new();

    for (key, entity) in catalog.iter() {
        for field in entity.fields.values() {
            for reference in field.references() {
                let Some(target) = FieldRef::parse(reference.raw) else {
                    continue;
                };
                let Some((source, _)) = catalog.entities.get_key_value(&target.entity) else {
                    continue;
                };
                if source != key {
                    edges.insert((source.as_str(), key, reference.connection_type));
                }
            }
        }
    }

    edges.into_iter().collect()
}

fn edge_label(kind: ConnectionType) -> &'static str {
    match kind {
        ConnectionType::Ref => "ref",
        ConnectionType::Calculation => "calc",
    }
}

fn render_mermaid(catalog: &Catalog, edges: &[Edge<'_>]) -> String {
    let mut lines = vec!["graph LR".to_string()];

    for (key, _) in catalog.iter() {
        let name = display_name(key);
        let node = match EntityType::from_key(key) {
            EntityType::Base => format!("{key}[{name}]"),
            EntityType::Cte => format!("{key}({name})"),
            EntityType::View => format!("{key}[[{name}]]"),
        };
        lines.push(format!("    {node}"));
    }

    for (from, to, kind) in edges {
        lines.push(format!("    {from} -->|{}| {to}", edge_label(*kind)));
    }

    lines.push(format!("%% {} entities, {} edges", catalog.len(), edges.len()));
    lines.join("\n")
}

fn render_dot(catalog: &Catalog, edges: &[Edge<'_>]) -> String {
    let mut lines = vec![
        "digraph DPC {".to_string(),
        "    rankdir=LR;".to_string(),
        "    node [shape=box, style=filled];".to_string(),
    ];

    for (key, _) in catalog.iter() {
        let fill = match EntityType::from_key(key) {
            EntityType::Base => "lightyellow",
            EntityType::Cte => "lightblue",
            EntityType::View => "palegreen",
        };
        lines.push(format!(
            "    \"{key}\" [label=\"{}\", fillcolor={fill}];",
            display_name(key)
        ));
    }

    for (from, to, kind) in edges {
        let style = match kind {
            ConnectionType::Ref => "color=black",
            ConnectionType::Calculation => "style=dashed, color=blue",
        };
        lines.push(format!(
            "    \"{from}\" -> \"{to}\" [label=\"{}\", {style}];",
            edge_label(*kind)
        ));
    }

    lines.push("}".to_string());
    lines.join("\n")
}
