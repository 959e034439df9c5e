//! Agent roster inspection.

use anyhow::Result;
use comfy_table::{presets, Attribute, Cell, ContentArrangement, Table};
use serde::Serialize;

use crate::assistant::profile;
use crate::cli::output::{output, CommandOutput};
use crate::services::registry::AgentRegistry;

#[derive(Debug, Serialize)]
struct GraphRow {
    name: String,
    contract: String,
    tools: Vec<String>,
    connectors: Vec<String>,
    hands_off_to: Vec<String>,
}

#[derive(Debug, Serialize)]
struct GraphOutput {
    agents: Vec<GraphRow>,
}

impl CommandOutput for GraphOutput {
    fn to_human(&self) -> String {
        let mut table = Table::new();
        table
            .load_preset(presets::UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![
            Cell::new("Agent").add_attribute(Attribute::Bold),
            Cell::new("Contract").add_attribute(Attribute::Bold),
            Cell::new("Tools").add_attribute(Attribute::Bold),
            Cell::new("Connectors").add_attribute(Attribute::Bold),
            Cell::new("Hands off to").add_attribute(Attribute::Bold),
        ]);
        for row in &self.agents {
            table.add_row(vec![
                Cell::new(&row.name),
                Cell::new(&row.contract),
                Cell::new(row.tools.join(", ")),
                Cell::new(join_or_dash(&row.connectors)),
                Cell::new(join_or_dash(&row.hands_off_to)),
            ]);
        }
        table.to_string()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Execute the graph command.
pub fn execute(json_mode: bool) -> Result<()> {
    let mut registry = AgentRegistry::new();
    profile::install(&mut registry)?;

    let mut agents = Vec::new();
    for handle in registry.agents() {
        let spec = registry.spec(&handle)?;
        let hands_off_to = registry
            .handoff_targets(&handle)?
            .iter()
            .map(|target| target.name().to_string())
            .collect();
        agents.push(GraphRow {
            name: spec.name.clone(),
            contract: spec.contract.to_string(),
            tools: spec.tools.clone(),
            connectors: spec.connectors.clone(),
            hands_off_to,
        });
    }

    output(&GraphOutput { agents }, json_mode);
    Ok(())
}

fn join_or_dash(values: &[String]) -> String {
    if values.is_empty() {
        "-".to_string()
    } else {
        values.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::profile::{CALENDAR_AGENT, PLANNING_ORCHESTRATOR, REVIEWER_AGENT};

    fn rows() -> Vec<GraphRow> {
        let mut registry = AgentRegistry::new();
        profile::install(&mut registry).unwrap();
        registry
            .agents()
            .into_iter()
            .map(|handle| {
                let spec = registry.spec(&handle).unwrap();
                GraphRow {
                    name: spec.name.clone(),
                    contract: spec.contract.to_string(),
                    tools: spec.tools.clone(),
                    connectors: spec.connectors.clone(),
                    hands_off_to: registry
                        .handoff_targets(&handle)
                        .unwrap()
                        .iter()
                        .map(|target| target.name().to_string())
                        .collect(),
                }
            })
            .collect()
    }

    #[test]
    fn test_graph_covers_the_whole_roster() {
        let rows = rows();
        assert_eq!(rows.len(), 7);
        assert!(rows.iter().any(|r| r.name == CALENDAR_AGENT));
    }

    #[test]
    fn test_table_renders_reviewer_edges() {
        let table = GraphOutput { agents: rows() }.to_human();
        assert!(table.contains(REVIEWER_AGENT));
        assert!(table.contains(PLANNING_ORCHESTRATOR));
    }

    #[test]
    fn test_json_rendering_lists_agents() {
        let json = GraphOutput { agents: rows() }.to_json();
        assert_eq!(json["agents"].as_array().unwrap().len(), 7);
    }
}
