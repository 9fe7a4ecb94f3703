use crate::{
    config::CARDINALITY_TOLERANCE,
    definition::{Definition, FieldDef, VersionDefinition},
};

/// Strips the `[i]` ordinal suffix from an expanded array column name.
pub fn normalise(column: &str) -> &str {
    column.split_once('[').map_or(column, |(name, _)| name)
}

/// Sample column names for a field, `name[0]..name[n-1]` for arrays.
pub fn column_names(field: &FieldDef) -> Vec<String> {
    if field.array_length <= 1 {
        return vec![field.name.clone()];
    }
    (0..field.array_length)
        .map(|i| format!("{}[{i}]", field.name))
        .collect()
}

/// Sample columns from `candidate` that may correspond to `column`, an
/// unnamed field of `target`.
pub fn applicable_columns(
    definition: &Definition,
    target: &VersionDefinition,
    column: &FieldDef,
    candidate: &VersionDefinition,
) -> Vec<String> {
    let Some(datatype) = definition.field_type(&column.name) else {
        return Vec::new();
    };

    let mut result: Vec<&FieldDef> = Vec::with_capacity(candidate.fields.len());
    for def in &candidate.fields {
        if def.is_id || definition.field_type(&def.name) != Some(datatype) {
            continue;
        }
        if def.array_length.abs_diff(column.array_length) > CARDINALITY_TOLERANCE {
            continue;
        }
        // already named in the target revision
        if target.field(&def.name).is_some() {
            continue;
        }
        if column.is_relation && def.is_relation {
            result.clear();
            result.push(def);
            break;
        }
        result.push(def);
    }

    result.into_iter().flat_map(column_names).collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::definition::{ColumnDef, FieldType};

    fn field(name: &str, array_length: usize, is_relation: bool) -> FieldDef {
        FieldDef {
            array_length,
            is_relation,
            ..FieldDef::new(name)
        }
    }

    fn definition(types: &[(&str, FieldType)]) -> Definition {
        let columns = types
            .iter()
            .map(|(name, ty)| (name.to_string(), ColumnDef::new(*ty)))
            .collect::<BTreeMap<_, _>>();
        Definition {
            columns,
            versions: Vec::new(),
        }
    }

    #[test]
    fn normalise_strips_ordinals() {
        assert_eq!(normalise("Flags[3]"), "Flags");
        assert_eq!(normalise("Flags"), "Flags");
    }

    #[test]
    fn column_names_expand_arrays() {
        assert_eq!(column_names(&field("Name", 1, false)), vec!["Name"]);
        assert_eq!(
            column_names(&field("Flags", 3, false)),
            vec!["Flags[0]", "Flags[1]", "Flags[2]"]
        );
    }

    #[test]
    fn filters_by_type_cardinality_id_and_claimed_names() {
        let definition = definition(&[
            ("ID", FieldType::Int),
            ("Field_x", FieldType::Int),
            ("Health", FieldType::Int),
            ("Speed", FieldType::Float),
            ("Slots", FieldType::Int),
            ("Level", FieldType::Int),
            ("Title", FieldType::String),
        ]);
        let target = VersionDefinition {
            fields: vec![FieldDef::id("ID"), field("Field_x", 1, false), field("Level", 1, false)],
            ..Default::default()
        };
        let candidate = VersionDefinition {
            fields: vec![
                FieldDef::id("ID"),
                field("Health", 3, false),
                field("Speed", 1, false),
                field("Slots", 4, false),
                field("Level", 1, false),
                field("Title", 1, false),
            ],
            ..Default::default()
        };
        let columns = applicable_columns(&definition, &target, &target.fields[1], &candidate);
        assert_eq!(columns, vec!["Health[0]", "Health[1]", "Health[2]"]);
    }

    #[test]
    fn relation_fields_short_circuit() {
        let definition = definition(&[
            ("Field_x", FieldType::Int),
            ("Health", FieldType::Int),
            ("ParentID", FieldType::Int),
            ("Mana", FieldType::Int),
        ]);
        let target = VersionDefinition {
            fields: vec![field("Field_x", 1, true)],
            ..Default::default()
        };
        let candidate = VersionDefinition {
            fields: vec![
                field("Health", 1, false),
                field("ParentID", 1, true),
                field("Mana", 1, false),
            ],
            ..Default::default()
        };
        let columns = applicable_columns(&definition, &target, &target.fields[0], &candidate);
        assert_eq!(columns, vec!["ParentID"]);
    }
}
