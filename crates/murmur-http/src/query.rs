//! Rendering of typed list options into the store's query syntax.

use serde_json::Value;

use murmur_core::error::InvalidInputError;
use murmur_core::{Condition, Expand, Filter, ListOptions, Op, Result, Sort, SortDirection};

use crate::endpoints::{GetParams, ListParams};

/// Build the query parameters of a list request.
pub fn list_params(page: u32, per_page: u32, options: &ListOptions) -> Result<ListParams> {
    Ok(ListParams {
        page,
        per_page,
        filter: render_filter(&options.filter)?,
        sort: options.sort.as_ref().map(render_sort).transpose()?,
        expand: render_expand(&options.expand),
    })
}

pub fn get_params(expand: &[Expand]) -> GetParams {
    GetParams {
        expand: render_expand(expand),
    }
}

/// `a = "x" && b != 2`, or `None` for the match-all filter.
pub fn render_filter(filter: &Filter) -> Result<Option<String>> {
    if filter.is_empty() {
        return Ok(None);
    }

    let parts = filter
        .conditions()
        .iter()
        .map(render_condition)
        .collect::<Result<Vec<_>>>()?;

    Ok(Some(parts.join(" && ")))
}

fn render_condition(condition: &Condition) -> Result<String> {
    check_field(&condition.field)?;
    let op = match condition.op {
        Op::Eq => "=",
        Op::NotEq => "!=",
    };
    Ok(format!(
        "{} {} {}",
        condition.field,
        op,
        render_value(&condition.field, &condition.value)?
    ))
}

fn render_value(field: &str, value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(quote(s)),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok("null".to_string()),
        Value::Array(_) | Value::Object(_) => Err(InvalidInputError::Field {
            value: field.to_string(),
            reason: "filter values must be scalars".to_string(),
        }
        .into()),
    }
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

pub fn render_sort(sort: &Sort) -> Result<String> {
    check_field(&sort.field)?;
    Ok(match sort.direction {
        SortDirection::Asc => sort.field.clone(),
        SortDirection::Desc => format!("-{}", sort.field),
    })
}

fn render_expand(expand: &[Expand]) -> Option<String> {
    if expand.is_empty() {
        return None;
    }
    Some(expand.iter().map(Expand::key).collect::<Vec<_>>().join(","))
}

/// Field names are interpolated into the filter unquoted.
fn check_field(field: &str) -> Result<()> {
    let valid = !field.is_empty()
        && field
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');

    if valid {
        Ok(())
    } else {
        Err(InvalidInputError::Field {
            value: field.to_string(),
            reason: "field names may only contain letters, digits, '_' and '.'".to_string(),
        }
        .into())
    }
}
