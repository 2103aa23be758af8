// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

//! Turns coded e-Stat records into a readable table.
//!
//! Dimension columns are named `@<id>` and hold codes. Each `CLASS_OBJ`
//! entry maps those codes to labels and gives the dimension a display name.

use crate::estat::ClassObj;
use crate::table::Table;
use crate::Result;
use log::debug;
use std::collections::HashMap;

pub const DIMENSION_MARKER: &str = "@";
pub const UNIT_COLUMN: &str = "@unit";
pub const VALUE_COLUMN: &str = "$";
pub const UNIT_LABEL: &str = "単位";
pub const VALUE_LABEL: &str = "値";

/// Table column holding the codes of `class`.
pub fn column_name(class: &ClassObj) -> String {
    format!("{}{}", DIMENSION_MARKER, class.id)
}

pub fn code_to_label(class: &ClassObj) -> HashMap<String, String> {
    class
        .classes
        .iter()
        .map(|c| (c.code.clone(), c.name.clone()))
        .collect()
}

/// Replaces codes with labels, one dimension at a time in metadata order.
///
/// Fails with [`StatError::MissingColumn`](crate::StatError::MissingColumn)
/// if a dimension has no matching column. Running it twice is harmless:
/// labels are not codes, so the second pass matches nothing.
pub fn replace_codes_with_names(table: &mut Table, classes: &[ClassObj]) -> Result<()> {
    for class in classes {
        let column = column_name(class);
        let mapping = code_to_label(class);
        let replaced = table.replace_values(&column, &mapping)?;
        debug!(
            "Replaced codes — column={} labels={} cells={}",
            column,
            mapping.len(),
            replaced
        );
    }
    Ok(())
}

pub fn rename_map(classes: &[ClassObj]) -> HashMap<String, String> {
    let mut renames = HashMap::from([
        (UNIT_COLUMN.to_string(), UNIT_LABEL.to_string()),
        (VALUE_COLUMN.to_string(), VALUE_LABEL.to_string()),
    ]);
    for class in classes {
        renames.insert(column_name(class), class.name.clone());
    }
    renames
}

pub fn rename_columns_to_japanese(table: &mut Table, classes: &[ClassObj]) {
    table.rename_columns(&rename_map(classes));
}

pub fn normalize(table: &mut Table, classes: &[ClassObj]) -> Result<()> {
    replace_codes_with_names(table, classes)?;
    rename_columns_to_japanese(table, classes);
    Ok(())
}
