//! Bracket-notation query strings
//!
//! Decodes `filter[createdBy][name][startsWith]=ka&filter[id][in][]=1` into
//! nested JSON. Every leaf is a string; typing is left to the filter parser.
//!
//! - `a[]=x` appends to an array, `a[3]=x` writes an array index
//! - indices above [`ARRAY_LIMIT`] are plain object keys
//! - brackets past [`MAX_DEPTH`] stay in the key as literal text
//! - a key given more than once collects its values into an array

use serde_json::{Map, Value};

/// Highest bracket index still treated as an array position
pub const ARRAY_LIMIT: usize = 20;

/// Bracket segments decoded below the root key
pub const MAX_DEPTH: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Key {
    Name(String),
    Index(usize),
}

#[derive(Debug)]
enum Node {
    Leaf(Value),
    Branch(Vec<(Key, Node)>),
}

/// Decode a raw query string (without the leading `?`) into a JSON object
pub fn parse(raw: &str) -> Value {
    let mut root: Vec<(Key, Node)> = Vec::new();

    for pair in raw.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = match pair.split_once('=') {
            Some((key, value)) => (decode(key), decode(value)),
            None => (decode(pair), String::new()),
        };
        if key.is_empty() {
            continue;
        }

        let mut segments = split_key(&key).into_iter();
        let Some(first) = segments.next() else {
            continue;
        };
        let path: Vec<Key> = std::iter::once(Key::Name(first))
            .chain(segments.map(|s| segment_key(&s)))
            .collect();
        insert(&mut root, &path, Value::String(value));
    }

    let mut object = Map::new();
    for (key, node) in root {
        object.insert(key_text(&key), finish(node));
    }
    Value::Object(object)
}

fn decode(text: &str) -> String {
    let spaced = text.replace('+', " ");
    let bytes = urlencoding::decode_binary(spaced.as_bytes());
    String::from_utf8_lossy(&bytes).into_owned()
}

/// `a[b][c]` → `["a", "b", "c"]`
fn split_key(key: &str) -> Vec<String> {
    let open = match key.find('[') {
        Some(i) if i > 0 => i,
        _ => return vec![key.to_string()],
    };

    let mut segments = vec![key[..open].to_string()];
    let mut rest = &key[open..];
    while segments.len() <= MAX_DEPTH && rest.starts_with('[') {
        let Some(close) = rest.find(']') else {
            break;
        };
        segments.push(rest[1..close].to_string());
        rest = &rest[close + 1..];
    }
    if !rest.is_empty() {
        segments.push(rest.to_string());
    }
    segments
}

/// Empty segments are resolved to an index on insertion
fn segment_key(segment: &str) -> Key {
    match segment.parse::<usize>() {
        Ok(index) if index <= ARRAY_LIMIT && index.to_string() == segment => Key::Index(index),
        _ => Key::Name(segment.to_string()),
    }
}

fn key_text(key: &Key) -> String {
    match key {
        Key::Name(name) => name.clone(),
        Key::Index(index) => index.to_string(),
    }
}

fn next_index(entries: &[(Key, Node)]) -> usize {
    entries
        .iter()
        .filter_map(|(k, _)| match k {
            Key::Index(i) => Some(i + 1),
            Key::Name(_) => None,
        })
        .max()
        .unwrap_or(0)
}

fn insert(entries: &mut Vec<(Key, Node)>, path: &[Key], value: Value) {
    let Some((head, tail)) = path.split_first() else {
        return;
    };

    let head = match head {
        Key::Name(name) if name.is_empty() => Key::Index(next_index(entries)),
        other => other.clone(),
    };

    let position = entries.iter().position(|(k, _)| *k == head);
    if tail.is_empty() {
        match position {
            Some(i) => {
                if let Node::Leaf(existing) = &mut entries[i].1 {
                    match existing {
                        Value::Array(values) => values.push(value),
                        single => *single = Value::Array(vec![single.take(), value]),
                    }
                }
            }
            None => entries.push((head, Node::Leaf(value))),
        }
        return;
    }

    let index = match position {
        Some(i) => i,
        None => {
            entries.push((head, Node::Branch(Vec::new())));
            entries.len() - 1
        }
    };
    let node = &mut entries[index].1;
    if let Node::Leaf(_) = node {
        *node = Node::Branch(Vec::new());
    }
    if let Node::Branch(children) = node {
        insert(children, tail, value);
    }
}

fn finish(node: Node) -> Value {
    match node {
        Node::Leaf(value) => value,
        Node::Branch(mut entries) => {
            let all_indices = entries.iter().all(|(k, _)| matches!(k, Key::Index(_)));
            if all_indices {
                entries.sort_by_key(|(k, _)| match k {
                    Key::Index(i) => *i,
                    Key::Name(_) => usize::MAX,
                });
                Value::Array(entries.into_iter().map(|(_, n)| finish(n)).collect())
            } else {
                let mut object = Map::new();
                for (key, node) in entries {
                    object.insert(key_text(&key), finish(node));
                }
                Value::Object(object)
            }
        }
    }
}
