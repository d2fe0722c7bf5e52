//! Builders for cypher syntax trees in their JSON form and translation shortcuts.

use pgcypher::config::TranslatorConfig;
use pgcypher::cypher::RegularQuery;
use pgcypher::translate::{self, InMemoryKindMapper, Translation, TranslationResult};
use serde_json::{json, Map, Value};

pub fn kinds() -> InMemoryKindMapper {
    InMemoryKindMapper::with_kinds(&[("User", 1), ("MemberOf", 2), ("Admin", 3), ("Group", 4)])
}

pub fn var(symbol: &str) -> Value {
    json!({ "variable": { "symbol": symbol } })
}

pub fn string(value: &str) -> Value {
    json!({ "literal": { "string": value } })
}

pub fn int(value: i64) -> Value {
    json!({ "literal": { "int": value } })
}

pub fn param(symbol: &str) -> Value {
    json!({ "parameter": { "symbol": symbol } })
}

pub fn prop(variable: &str, symbol: &str) -> Value {
    json!({ "property_lookup": { "atom": var(variable), "symbol": symbol } })
}

pub fn equals(left: Value, right: Value) -> Value {
    json!({ "comparison": { "left": left, "partials": [{ "operator": "equals", "right": right }] } })
}

pub fn function(name: &str, arguments: Vec<Value>) -> Value {
    json!({ "function_invocation": { "name": name, "arguments": arguments } })
}

fn symbol(variable: Option<&str>) -> Value {
    variable.map_or(Value::Null, |symbol| json!({ "symbol": symbol }))
}

pub fn node(variable: Option<&str>, kinds: &[&str]) -> Value {
    json!({ "node": { "variable": symbol(variable), "kinds": kinds } })
}

pub fn node_with_properties(variable: Option<&str>, kinds: &[&str], properties: &[(&str, Value)]) -> Value {
    let items: Vec<Value> = properties
        .iter()
        .map(|(key, value)| json!({ "key": key, "value": value }))
        .collect();

    json!({ "node": { "variable": symbol(variable), "kinds": kinds, "properties": { "map": items } } })
}

pub fn rel(variable: Option<&str>, kinds: &[&str], direction: &str) -> Value {
    json!({ "relationship": { "variable": symbol(variable), "kinds": kinds, "direction": direction } })
}

pub fn rel_range(kinds: &[&str], start: Option<i64>, end: Option<i64>) -> Value {
    json!({
        "relationship": {
            "kinds": kinds,
            "direction": "outbound",
            "range": { "start": start, "end": end }
        }
    })
}

pub fn pattern(elements: Vec<Value>) -> Value {
    json!({ "elements": elements })
}

pub fn match_clause(pattern: Vec<Value>, where_clause: Option<Value>) -> Value {
    json!({
        "match": {
            "pattern": pattern,
            "where_clause": where_clause.map(|expression| json!({ "expressions": [expression] }))
        }
    })
}

pub fn item(expression: Value, alias: Option<&str>) -> Value {
    json!({ "expression": expression, "binding": symbol(alias) })
}

pub fn projection(items: Vec<Value>) -> Value {
    json!({ "items": items })
}

pub fn single_part(reading: Vec<Value>, updating: Vec<Value>, projection: Option<Value>) -> Value {
    json!({
        "reading_clauses": reading,
        "updating_clauses": updating,
        "return_clause": projection.map(|projection| json!({ "projection": projection }))
    })
}

pub fn query(single_part: Value) -> RegularQuery {
    serde_json::from_value(json!({ "single_query": { "single_part": single_part } }))
        .expect("single part query should deserialize")
}

pub fn multi_part_query(parts: Vec<Value>, single_part: Value) -> RegularQuery {
    serde_json::from_value(json!({
        "single_query": { "multi_part": { "parts": parts, "single_part_query": single_part } }
    }))
    .expect("multi part query should deserialize")
}

pub fn with_part(reading: Vec<Value>, projection: Value, where_clause: Option<Value>) -> Value {
    json!({
        "reading_clauses": reading,
        "with": {
            "projection": projection,
            "where_clause": where_clause.map(|expression| json!({ "expressions": [expression] }))
        }
    })
}

pub fn translate_with(
    query: &RegularQuery,
    parameters: &Map<String, Value>,
    config: &TranslatorConfig,
) -> TranslationResult<Translation> {
    translate::translate(query, &kinds(), parameters, config)
}

pub fn try_translate(query: &RegularQuery) -> TranslationResult<Translation> {
    translate_with(query, &Map::new(), &TranslatorConfig::default())
}

pub fn sql(query: &RegularQuery) -> String {
    try_translate(query)
        .expect("query should translate")
        .to_sql(false)
        .expect("statement should render")
}
