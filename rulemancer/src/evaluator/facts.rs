//! Turning written facts into stored fact fields
//!
//! Template facts get their slots in declaration order with defaults filled
//! in; ordered facts get their fields flattened.

use crate::error::RulemancerError;
use crate::fact::{FactFields, Slot};
use crate::semantic::{FactItem, FactSpec, SlotDefault, SlotKind, Template};
use crate::value::Value;
use crate::RulemancerResult;

/// Build the fields of a fact for `relation` from supplied slot groups.
pub(crate) fn template_fields(
    template: &Template,
    supplied: Vec<(String, Vec<Value>)>,
) -> RulemancerResult<FactFields> {
    for (i, (name, _)) in supplied.iter().enumerate() {
        if template.slot(name).is_none() {
            return Err(RulemancerError::runtime(format!(
                "Template '{}' has no slot '{}'",
                template.name, name
            )));
        }
        if supplied[..i].iter().any(|(other, _)| other == name) {
            return Err(RulemancerError::runtime(format!(
                "Slot '{}' of template '{}' is given more than once",
                name, template.name
            )));
        }
    }

    let mut slots = Vec::with_capacity(template.slots.len());
    for definition in &template.slots {
        let given = supplied
            .iter()
            .find(|(name, _)| name == &definition.name)
            .map(|(_, values)| values.clone());

        let values = match (given, &definition.default) {
            (Some(values), _) => values,
            (None, SlotDefault::Required) => {
                return Err(RulemancerError::runtime(format!(
                    "Slot '{}' of template '{}' is required",
                    definition.name, template.name
                )))
            }
            (None, SlotDefault::Value(values)) => values.clone(),
            (None, SlotDefault::Derive) => match definition.kind {
                SlotKind::Single => vec![Value::nil()],
                SlotKind::Multi => Vec::new(),
            },
        };

        let values: Vec<Value> = values.into_iter().flat_map(Value::into_fields).collect();
        let value = match definition.kind {
            SlotKind::Multi => Value::Multifield(values),
            SlotKind::Single => {
                if values.len() != 1 {
                    return Err(RulemancerError::runtime(format!(
                        "Slot '{}' of template '{}' holds exactly one value, got {}",
                        definition.name,
                        template.name,
                        values.len()
                    )));
                }
                values.into_iter().next().unwrap_or_else(Value::nil)
            }
        };

        slots.push(Slot {
            name: definition.name.clone(),
            value,
        });
    }

    Ok(FactFields::Template(slots))
}

pub(crate) fn ordered_fields(values: Vec<Value>) -> FactFields {
    FactFields::Ordered(values.into_iter().flat_map(Value::into_fields).collect())
}

/// Resolve a parsed fact (deffacts body or assert string) against templates.
pub(crate) fn spec_fields(
    spec: &FactSpec,
    template: Option<&Template>,
) -> RulemancerResult<FactFields> {
    match template {
        Some(template) => {
            let mut supplied = Vec::new();
            for item in &spec.items {
                match item {
                    FactItem::SlotGroup { name, values } => {
                        supplied.push((name.clone(), values.clone()))
                    }
                    FactItem::Field(value) => {
                        return Err(RulemancerError::runtime(format!(
                            "Template fact '{}' expects (slot value) groups, found {}",
                            spec.relation, value
                        )))
                    }
                }
            }
            template_fields(template, supplied)
        }
        None => {
            let mut values = Vec::new();
            for item in &spec.items {
                match item {
                    FactItem::Field(value) => values.push(value.clone()),
                    FactItem::SlotGroup { name, .. } => {
                        return Err(RulemancerError::runtime(format!(
                            "Relation '{}' has no deftemplate, so slot '{}' cannot be used",
                            spec.relation, name
                        )))
                    }
                }
            }
            Ok(ordered_fields(values))
        }
    }
}
