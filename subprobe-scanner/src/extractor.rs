use crate::ast::Node;
use crate::result::{CandidateEndpoint, EndpointKind, Source};
use crate::store::ResultStore;
use crate::validate::{TargetDomain, clean_literal, normalize_candidate};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

/// A JSON string token, escapes included.
static JSON_STRING: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#""(?:[^"\\]|\\.)*""#).ok());

/// Validates `raw` and, if it passes, stores it under `source`.
/// Returns whether the value was accepted (stored or already present).
fn accept(raw: &str, source: Source, target: &TargetDomain, store: &mut ResultStore) -> bool {
    let cleaned = clean_literal(raw);
    if !target.accepts(cleaned) {
        return false;
    }
    let kind = EndpointKind::classify(cleaned);
    store.add_result(CandidateEndpoint::new(
        normalize_candidate(cleaned),
        kind,
        source,
    ));
    true
}

/// Every string in the serialized tree, structural metadata included.
fn scan_raw_literals(ast: &Node, target: &TargetDomain, store: &mut ResultStore) -> usize {
    let serialized = match serde_json::to_string(ast) {
        Ok(serialized) => serialized,
        Err(e) => {
            debug!("Could not serialize AST for literal scan: {}", e);
            return 0;
        }
    };
    let Some(pattern) = JSON_STRING.as_ref() else {
        return 0;
    };

    pattern
        .find_iter(&serialized)
        .filter_map(|token| serde_json::from_str::<String>(token.as_str()).ok())
        .filter(|literal| accept(literal, Source::Static, target, store))
        .count()
}

/// Call shapes that carry a URL, paired with the argument holding it.
fn match_call_shapes<'a>(callee: &Node, arguments: &'a [Node]) -> Vec<(Source, &'a Node)> {
    let mut matches = Vec::new();

    match callee {
        Node::Identifier { name } if name == "fetch" => {
            if let Some(url) = arguments.first() {
                matches.push((Source::Fetch, url));
            }
        }
        Node::MemberExpression {
            object, property, ..
        } => {
            if object.identifier_name() == Some("axios")
                && let Some(url) = arguments.first()
            {
                matches.push((Source::Axios, url));
            }
            // XMLHttpRequest.open(method, url)
            if property.identifier_name() == Some("open")
                && let Some(url) = arguments.get(1)
            {
                matches.push((Source::Xmlhttp, url));
            }
        }
        _ => {}
    }

    matches
}

fn scan_call_shapes(ast: &Node, target: &TargetDomain, store: &mut ResultStore) -> usize {
    let mut accepted = 0;

    for node in ast.breadth_first() {
        let Node::CallExpression { callee, arguments } = node else {
            continue;
        };
        for (source, argument) in match_call_shapes(callee, arguments) {
            if let Some(value) = argument.string_value()
                && accept(value, source, target, store)
            {
                accepted += 1;
            }
        }
    }

    accepted
}

/// Mines an AST for endpoint candidates and writes them to `store`.
///
/// Two heuristics run independently: a scan of every string in the
/// serialized tree (tagged `static`) and a structural scan for `fetch`,
/// `axios` and `XMLHttpRequest.open` calls. The same value found by both is
/// stored once per source. Returns the number of accepted candidates.
pub fn extract_js_info(ast: Option<&Node>, target: &TargetDomain, store: &mut ResultStore) -> usize {
    let Some(ast) = ast else {
        return 0;
    };

    let literals = scan_raw_literals(ast, target, store);
    let calls = scan_call_shapes(ast, target, store);
    debug!("Extracted {} literal and {} call-site candidates", literals, calls);

    literals + calls
}
