use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, Row, Table};
use rulemancer::{ConstructBase, Fact, SlotDefault, SlotDefinition, SlotKind};

/// Outcome of asserting one test-pool file
pub struct TestOutcome {
    pub name: String,
    pub result: Result<usize, String>,
}

pub struct Formatter {}

impl Default for Formatter {
    fn default() -> Self {
        Self::new()
    }
}

impl Formatter {
    pub fn new() -> Self {
        Self {}
    }

    fn table(&self, headers: &[&str]) -> Table {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(Row::from(
            headers
                .iter()
                .map(|h| Cell::new(h).set_alignment(CellAlignment::Left))
                .collect::<Vec<_>>(),
        ));
        table
    }

    /// Templates, deffacts and rules, one table each
    pub fn format_inventory(&self, constructs: &ConstructBase) -> String {
        if constructs.is_empty() {
            return "No constructs loaded\n".to_string();
        }

        let mut output = String::new();

        if !constructs.templates().is_empty() {
            let mut table = self.table(&["Template", "Slots", "Comment"]);
            for template in constructs.templates() {
                let slots = template
                    .slots
                    .iter()
                    .map(format_slot)
                    .collect::<Vec<_>>()
                    .join("\n");
                table.add_row(Row::from(vec![
                    template.name.as_str(),
                    slots.as_str(),
                    template.comment.as_deref().unwrap_or(""),
                ]));
            }
            output.push_str(&format!("templates ({}):\n", constructs.templates().len()));
            output.push_str(&table.to_string());
            output.push_str("\n\n");
        }

        if !constructs.deffacts().is_empty() {
            let mut table = self.table(&["Deffacts", "Facts", "Comment"]);
            for deffacts in constructs.deffacts() {
                table.add_row(Row::from(vec![
                    Cell::new(&deffacts.name),
                    Cell::new(deffacts.facts.len()).set_alignment(CellAlignment::Right),
                    Cell::new(deffacts.comment.as_deref().unwrap_or("")),
                ]));
            }
            output.push_str(&format!("deffacts ({}):\n", constructs.deffacts().len()));
            output.push_str(&table.to_string());
            output.push_str("\n\n");
        }

        if !constructs.rules().is_empty() {
            let mut table = self.table(&["Rule", "Salience", "Conditions", "Actions", "Comment"]);
            for rule in constructs.rules() {
                table.add_row(Row::from(vec![
                    Cell::new(&rule.name),
                    Cell::new(rule.salience).set_alignment(CellAlignment::Right),
                    Cell::new(rule.conditions.len()).set_alignment(CellAlignment::Right),
                    Cell::new(rule.actions.len()).set_alignment(CellAlignment::Right),
                    Cell::new(rule.comment.as_deref().unwrap_or("")),
                ]));
            }
            output.push_str(&format!("rules ({}):\n", constructs.rules().len()));
            output.push_str(&table.to_string());
            output.push('\n');
        }

        output
    }

    /// One line per test file, then a pass/fail count
    pub fn format_test_summary(&self, outcomes: &[TestOutcome]) -> String {
        let mut table = self.table(&["Test", "Result"]);
        let mut failed = 0;
        for outcome in outcomes {
            let result = match &outcome.result {
                Ok(fired) => format!("ok ({} fired)", fired),
                Err(message) => {
                    failed += 1;
                    format!("FAILED: {}", message)
                }
            };
            table.add_row(Row::from(vec![outcome.name.as_str(), result.as_str()]));
        }

        format!(
            "{}\n{} passed, {} failed\n",
            table,
            outcomes.len() - failed,
            failed
        )
    }

    /// The fact dump, one pretty form per line
    pub fn format_facts(&self, dump: &str) -> String {
        if dump.is_empty() {
            "No facts\n".to_string()
        } else {
            dump.to_string()
        }
    }

    /// Facts as a table of ids and pretty forms
    pub fn format_facts_table<'a>(&self, facts: impl IntoIterator<Item = &'a Fact>) -> String {
        let mut table = self.table(&["Id", "Fact"]);
        for fact in facts {
            table.add_row(Row::from(vec![fact.id.to_string(), fact.pp_form()]));
        }
        table.to_string()
    }
}

fn format_slot(slot: &SlotDefinition) -> String {
    let kind = match slot.kind {
        SlotKind::Single => "slot",
        SlotKind::Multi => "multislot",
    };
    match &slot.default {
        SlotDefault::Derive => format!("{} {}", kind, slot.name),
        SlotDefault::Required => format!("{} {} (required)", kind, slot.name),
        SlotDefault::Value(values) => format!(
            "{} {} = {}",
            kind,
            slot.name,
            values
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(" ")
        ),
    }
}
