//! Pure functions for calculating provisioning plans.

use crate::types::{IndexSpec, TableSpec, TableState};

/// Planned changes to bring one table to its declared schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionPlan {
    /// Table doesn't exist, needs to be created.
    CreateTable,
    /// Table exists, these indexes need to be added.
    AddIndexes(Vec<IndexSpec>),
    /// Table matches the declared schema, no changes needed.
    UpToDate,
}

/// Pure function: calculate what changes are needed to reach the declared
/// schema.
pub fn provision_plan(current: Option<&TableState>, desired: &TableSpec) -> ProvisionPlan {
    match current {
        None => ProvisionPlan::CreateTable,
        Some(state) => {
            let existing: Vec<&str> = state.indexes.iter().map(|i| i.name.as_str()).collect();
            let missing: Vec<IndexSpec> = desired
                .indexes
                .iter()
                .filter(|index| !existing.contains(&index.name.as_str()))
                .cloned()
                .collect();
            if missing.is_empty() {
                ProvisionPlan::UpToDate
            } else {
                ProvisionPlan::AddIndexes(missing)
            }
        }
    }
}

/// Pure function: format a provisioning plan for the startup log.
pub fn format_plan(table: &str, plan: &ProvisionPlan) -> Vec<String> {
    match plan {
        ProvisionPlan::CreateTable => vec![format!("+ Create table: {table}")],
        ProvisionPlan::AddIndexes(indexes) => {
            let mut lines = vec![format!("~ Update table: {table}")];
            for index in indexes {
                lines.push(format!("  + Add index: {}", index.name));
            }
            lines
        }
        ProvisionPlan::UpToDate => vec![format!("= Table '{table}' is up to date")],
    }
}
