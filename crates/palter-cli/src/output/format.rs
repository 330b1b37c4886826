use palter_core::{GraphSummary, ResourceGraph, ResourceType, Trap};
use palter_engage::EngagementStatus;
use palter_generate::ResponseSchema;

use super::OutputFormat;

pub fn format_status(status: &EngagementStatus, fmt: OutputFormat) -> String {
    match fmt {
        OutputFormat::Json => serde_json::to_string_pretty(status).unwrap_or_default(),
        OutputFormat::Text => format_status_text(status),
        OutputFormat::Markdown => format_status_markdown(status),
    }
}

fn format_status_text(status: &EngagementStatus) -> String {
    let mut out = String::new();
    out.push_str(&format!("Engagement: {} ({})\n", status.name, status.id));
    out.push_str(&format!("State:      {}\n", status.state));
    out.push_str(&format!(
        "Updated:    {}\n",
        status.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    if !status.target_stacks.is_empty() {
        out.push_str(&format!("Stacks:     {}\n", status.target_stacks.join(", ")));
    }
    if !status.stratagems.is_empty() {
        out.push_str(&format!("Stratagems: {}\n", status.stratagems.join(", ")));
    }
    if let Some(summary) = &status.graph {
        out.push_str(&summary_text(summary));
    }
    out
}

fn format_status_markdown(status: &EngagementStatus) -> String {
    let mut out = String::new();
    out.push_str(&format!("# Engagement {}\n\n", status.name));
    out.push_str(&format!("- **ID**: {}\n", status.id));
    out.push_str(&format!("- **State**: {}\n", status.state));
    out.push_str(&format!(
        "- **Updated**: {}\n",
        status.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    for stack in &status.target_stacks {
        out.push_str(&format!("- **Stack**: `{stack}`\n"));
    }
    if let Some(summary) = &status.graph {
        out.push('\n');
        out.push_str(&summary_markdown(summary));
    }
    out
}

pub fn format_graph(graph: &ResourceGraph, fmt: OutputFormat) -> String {
    match fmt {
        OutputFormat::Json => serde_json::to_string_pretty(graph).unwrap_or_default(),
        OutputFormat::Text => format_graph_text(graph),
        OutputFormat::Markdown => format_graph_markdown(graph),
    }
}

fn format_graph_text(graph: &ResourceGraph) -> String {
    if graph.is_empty() {
        return "No resources found.".to_string();
    }

    let mut out = String::new();
    for entry in graph.resources() {
        let marker = if entry.is_trap() { "trap" } else { "target" };
        out.push_str(&format!(
            "\u{25c6} {:<18} {:<6} {}\n",
            entry.resource().resource_type().as_str(),
            marker,
            entry.id()
        ));
    }
    out.push_str(&summary_text(&graph.summary()));
    out
}

fn format_graph_markdown(graph: &ResourceGraph) -> String {
    let mut out = String::from("| Type | Role | Identity |\n|------|------|----------|\n");
    for entry in graph.resources() {
        let marker = if entry.is_trap() { "trap" } else { "target" };
        out.push_str(&format!(
            "| {} | {} | `{}` |\n",
            entry.resource().resource_type().as_str(),
            marker,
            entry.id()
        ));
    }
    out.push('\n');
    out.push_str(&summary_markdown(&graph.summary()));
    out
}

fn summary_text(summary: &GraphSummary) -> String {
    let mut out = format!(
        "Graph:      {} targets, {} traps\n",
        summary.total_targets(),
        summary.total_traps()
    );
    for (resource_type, count) in &summary.traps {
        out.push_str(&format!("  {resource_type}: {count} traps\n"));
    }
    out
}

fn summary_markdown(summary: &GraphSummary) -> String {
    format!(
        "**{}** targets, **{}** traps\n",
        summary.total_targets(),
        summary.total_traps()
    )
}

pub fn format_schema(
    resource_type: ResourceType,
    schema: &ResponseSchema,
    fmt: OutputFormat,
) -> String {
    let json = serde_json::to_string_pretty(schema).unwrap_or_default();
    match fmt {
        OutputFormat::Json | OutputFormat::Text => json,
        OutputFormat::Markdown => format!("## {resource_type}\n\n```json\n{json}\n```\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use palter_core::{Bucket, ServiceAccount};

    fn sample_graph() -> ResourceGraph {
        let mut graph = ResourceGraph::new();
        graph
            .add(ServiceAccount {
                id: "sa-1".into(),
                name: "projects/p/serviceAccounts/sa-1@p.iam.gserviceaccount.com".into(),
                description: "deploys things".into(),
                email: "sa-1@p.iam.gserviceaccount.com".into(),
            })
            .unwrap();
        graph
            .add_trap(Bucket {
                name: "acme-billing-exports".into(),
                location: "us-central1".into(),
                storage_class: "STANDARD".into(),
            })
            .unwrap();
        graph
    }

    #[test]
    fn graph_text_marks_traps_and_targets() {
        let out = format_graph(&sample_graph(), OutputFormat::Text);
        assert!(out.contains("target"));
        assert!(out.contains("sa-1"));
        assert!(out.contains("acme-billing-exports"));
        assert!(out.contains("1 targets, 1 traps"));
    }

    #[test]
    fn empty_graph_text() {
        let out = format_graph(&ResourceGraph::new(), OutputFormat::Text);
        assert_eq!(out, "No resources found.");
    }

    #[test]
    fn graph_json_is_valid() {
        let out = format_graph(&sample_graph(), OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert!(value.is_object());
    }

    #[test]
    fn graph_markdown_has_table() {
        let out = format_graph(&sample_graph(), OutputFormat::Markdown);
        assert!(out.starts_with("| Type | Role | Identity |"));
        assert!(out.contains("`acme-billing-exports`"));
    }
}
