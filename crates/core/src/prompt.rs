//! Renders catalog rows into the compact stock block embedded in the LLM
//! system prompt.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::domain::catalog::{CatalogItem, CategoryClass};

#[derive(Clone, Debug, Default)]
pub struct PromptContextBuilder;

impl PromptContextBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Deterministic for a given item list and flag. Categories are emitted
    /// in class order (flower, piece, concentrate) and then by name; items keep
    /// their store order inside a category.
    pub fn build(&self, items: &[CatalogItem], include_secondary_categories: bool) -> String {
        let mut groups: BTreeMap<(CategoryClass, String), Vec<&CatalogItem>> = BTreeMap::new();
        for item in items {
            let class = item.category_class();
            if !class.is_primary() && !include_secondary_categories {
                continue;
            }
            let category = item.category.trim().to_lowercase();
            groups.entry((class, category)).or_default().push(item);
        }

        let mut output = String::new();
        for ((_, category), members) in &groups {
            if !output.is_empty() {
                output.push('\n');
            }
            let _ = writeln!(output, "## {category}");
            for item in members {
                output.push_str(&render_item(item, category));
                output.push('\n');
            }
        }
        output
    }
}

fn render_item(item: &CatalogItem, category: &str) -> String {
    let mut fields = vec![item.name.trim().to_string(), category.to_string()];
    fields.push(item.strain_type.as_str().to_string());

    let mut potency = Vec::new();
    if let Some(thc) = item.thc {
        potency.push(format!("THC {}%", thc.normalize()));
    }
    if let Some(cbg) = item.cbg {
        potency.push(format!("CBG {}%", cbg.normalize()));
    }
    if !potency.is_empty() {
        fields.push(potency.join(" "));
    }
    if item.in_house {
        fields.push("in-house".to_string());
    }

    format!("- {}", fields.join(" | "))
}
