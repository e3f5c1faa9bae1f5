//! Load pipeline: rebuilds a field's value from its table.
//!
//! Leaves and fields with a codec are decoded by that codec. Fields below a
//! special ancestor (repeater rows) are decoded by the ancestor's codec.
//! Ordinary composites are rebuilt recursively into a map keyed by
//! sub-field key.

use std::collections::HashSet;

use acf_tables_core::{Field, SEPARATOR, qualify, split_repeater_item};
use serde_json::{Map, Value};
use tracing::debug;

use crate::codec::{CodecContext, LoadRequest, ParentColumn};
use crate::error::Result;

/// Loads the stored value of `field` for `content_id`.
///
/// `field` is the host's runtime copy: its `name` may already be qualified
/// by its ancestors (`faq_0_question`). A name equal to the declared one
/// resolves to the declared column. When the field's group cannot be
/// resolved, `previous` is returned unchanged.
pub fn load_field_value(
    ctx: &CodecContext<'_>,
    previous: Value,
    content_id: i64,
    field: &Field,
) -> Result<Value> {
    let known = ctx.provider.field(&field.key);
    let definition = known.unwrap_or(field);

    let table = ctx
        .provider
        .table_for(field)
        .or_else(|| known.and_then(|f| ctx.provider.table_for(f)));
    let Some(table) = table else {
        debug!(key = %field.key, "field group not resolvable; keeping previous value");
        return Ok(previous);
    };
    let runtime_name = (field.name != definition.name).then_some(field.name.as_str());

    // The field, then its ancestors up to the nearest special one.
    let mut lineage = vec![definition];
    let mut special = None;
    let mut seen = HashSet::from([definition.key.as_str()]);
    let mut next = field.parent.as_deref().or(definition.parent.as_deref());
    while let Some(key) = next {
        let Some(ancestor) = ctx.provider.field(key) else {
            break;
        };
        if !seen.insert(ancestor.key.as_str()) {
            break;
        }
        if ctx.codecs.is_special(&ancestor.kind) {
            special = Some(ancestor);
            break;
        }
        lineage.push(ancestor);
        next = ancestor.parent.as_deref();
    }

    if let Some(special) = special {
        lineage.reverse();
        return load_special_item(ctx, special, &lineage, runtime_name, table, content_id);
    }

    let column = match (runtime_name, lineage.get(1)) {
        (Some(name), Some(parent)) => qualify(&ctx.provider.column_name(parent), name),
        (Some(name), None) => name.to_string(),
        (None, _) => ctx.provider.column_name(definition),
    };

    if ctx.codecs.get(&definition.kind).is_some() || !definition.is_composite() {
        let request = LoadRequest {
            field: definition,
            table,
            column,
            content_id,
            parent: None,
        };
        return ctx
            .codecs
            .resolve(&definition.kind)
            .format_for_load(&request, ctx);
    }

    load_composite(ctx, definition, table, &column, content_id)
}

/// Loads a field stored inside a special ancestor's rows.
///
/// `lineage` runs from the ancestor's direct child down to the requested
/// field. The row index comes from the runtime name; the ancestor's codec
/// reads the direct child's entry and the rest of the path is taken apart
/// by sub-field key.
fn load_special_item(
    ctx: &CodecContext<'_>,
    special: &Field,
    lineage: &[&Field],
    runtime_name: Option<&str>,
    table: &str,
    content_id: i64,
) -> Result<Value> {
    let Some((item, below)) = lineage.split_first() else {
        return Ok(Value::Null);
    };
    let Some(name) = runtime_name else {
        debug!(key = %item.key, parent = %special.key, "row item requested without a row index");
        return Ok(Value::Null);
    };

    let special_column = ctx.provider.column_name(special);
    let Some((iteration, _)) = split_repeater_item(&qualify(&special_column, name), &special_column)
    else {
        debug!(runtime = name, parent = %special.key, "not a row item name");
        return Ok(Value::Null);
    };

    let request = LoadRequest {
        field: item,
        table,
        column: format!("{special_column}{SEPARATOR}{iteration}{SEPARATOR}{}", item.name),
        content_id,
        parent: Some(ParentColumn {
            field: special,
            column: special_column,
        }),
    };
    let mut value = ctx
        .codecs
        .resolve(&special.kind)
        .format_for_load(&request, ctx)?;
    for step in below {
        value = value.get(step.key.as_str()).cloned().unwrap_or(Value::Null);
    }
    Ok(value)
}

fn load_composite(
    ctx: &CodecContext<'_>,
    field: &Field,
    table: &str,
    column: &str,
    content_id: i64,
) -> Result<Value> {
    let mut values = Map::new();
    for sub in &field.sub_fields {
        let sub_column = format!("{column}{SEPARATOR}{}", sub.name);
        let value = if sub.is_composite() && ctx.codecs.get(&sub.kind).is_none() {
            load_composite(ctx, sub, table, &sub_column, content_id)?
        } else {
            let request = LoadRequest {
                field: sub,
                table,
                column: sub_column,
                content_id,
                parent: None,
            };
            ctx.codecs
                .resolve(&sub.kind)
                .format_for_load(&request, ctx)?
        };
        values.insert(sub.key.clone(), value);
    }
    Ok(Value::Object(values))
}
