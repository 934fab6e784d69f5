//! CSV state loaders for the AVL engine.
//!
//! Two line shapes occur in state dumps:
//!
//! - **5-field** rows: up to four composite-key components and a value.
//!   Components may themselves be semicolon-separated; trailing empty fields
//!   are allowed. Each component level becomes one nesting level of the
//!   resulting tree, with the value attached at the deepest component.
//! - **11-field** rows: `(pointer, compositeKey, key, _, value, leftType,
//!   leftRef, rightType, rightRef, nestedType, nestedRef)`. A `*Type` of
//!   `"HASH"` with a `hash...`-prefixed ref designates an unresolved subtree
//!   placeholder. Rows reference earlier rows by pointer; the final row's
//!   pointer is the root.
//!
//! The dictionary form reuses the 11-field layout with plain numeric
//! `(left, right, upserts, deletes)` refs in fields 7-10.
//!
//! Lines are read to EOF. Malformed numerics fail with the offending line.

use std::collections::HashMap;
use std::io::BufRead;

use crate::error::{TreeError, TreeResult};
use crate::key::Word;
use crate::stats::Counters;
use crate::tracing_helpers::trace_log;

use super::dict::{Dict, DictLink};
use super::join::insert;
use super::node::{Link, Node};

fn parse_word(token: &str, line_no: usize) -> TreeResult<Word> {
    token
        .trim()
        .parse::<Word>()
        .map_err(|e| TreeError::Parse(format!("line {line_no}: bad number {token:?}: {e}")))
}

fn parse_pointer(token: &str, line_no: usize) -> TreeResult<i64> {
    token
        .trim()
        .parse::<i64>()
        .map_err(|e| TreeError::Parse(format!("line {line_no}: bad pointer {token:?}: {e}")))
}

fn parse_value(token: &str, line_no: usize) -> TreeResult<Option<Word>> {
    if token.is_empty() {
        Ok(None)
    } else {
        parse_word(token, line_no).map(Some)
    }
}

/// Resolve a `(type, ref)` pair against the pointer registry.
///
/// A `HASH`/`hash...` pair is an unresolved placeholder. A node is owned by
/// exactly one referencing row, so resolution removes it from the registry.
fn take_ref(
    registry: &mut HashMap<i64, Link>,
    kind: &str,
    reference: &str,
    line_no: usize,
) -> TreeResult<Link> {
    if kind == "HASH" && reference.starts_with("hash") {
        return Ok(None);
    }
    let p: i64 = parse_pointer(reference, line_no)?;
    Ok(registry.remove(&p).flatten())
}

/// Load a state tree from 11-field mapped CSV rows.
pub fn mapped_state_from_csv<R: BufRead>(reader: R) -> TreeResult<Link> {
    let mut registry: HashMap<i64, Link> = HashMap::new();
    let mut last_pointer: Option<i64> = None;

    for (idx, line) in reader.lines().enumerate() {
        let line: String = line?;
        let line_no: usize = idx + 1;
        if line.trim().is_empty() {
            continue;
        }

        let tokens: Vec<&str> = line.split(',').collect();
        if tokens.len() != 11 {
            return Err(TreeError::Parse(format!(
                "line {line_no}: expected 11 fields, got {}",
                tokens.len()
            )));
        }

        let p: i64 = parse_pointer(tokens[0], line_no)?;
        let key: Word = parse_word(tokens[2], line_no)?;
        let value: Option<Word> = parse_value(tokens[4], line_no)?;
        let left: Link = take_ref(&mut registry, tokens[5], tokens[6], line_no)?;
        let right: Link = take_ref(&mut registry, tokens[7], tokens[8], line_no)?;
        let nested: Link = take_ref(&mut registry, tokens[9], tokens[10], line_no)?;

        trace_log!(pointer = p, key, "mapped state row");
        registry.insert(p, Some(Node::new(key, value, left, right, nested)));
        last_pointer = Some(p);
    }

    Ok(last_pointer.and_then(|p| registry.remove(&p)).flatten())
}

/// Load a state-change dictionary from 11-field CSV rows.
///
/// Fields 7-10 carry plain numeric `(left, right, upserts, deletes)` refs.
pub fn state_changes_from_csv<R: BufRead>(reader: R) -> TreeResult<DictLink> {
    let mut registry: HashMap<i64, DictLink> = HashMap::new();
    let mut last_pointer: Option<i64> = None;

    for (idx, line) in reader.lines().enumerate() {
        let line: String = line?;
        let line_no: usize = idx + 1;
        if line.trim().is_empty() {
            continue;
        }

        let tokens: Vec<&str> = line.split(',').collect();
        if tokens.len() != 11 {
            return Err(TreeError::Parse(format!(
                "line {line_no}: expected 11 fields, got {}",
                tokens.len()
            )));
        }

        let p: i64 = parse_pointer(tokens[0], line_no)?;
        let key: Word = parse_word(tokens[2], line_no)?;
        let value: Option<Word> = parse_value(tokens[4], line_no)?;
        let mut resolve = |token: &str| -> TreeResult<DictLink> {
            let r: i64 = parse_pointer(token, line_no)?;
            Ok(registry.remove(&r).flatten())
        };
        let left: DictLink = resolve(tokens[7])?;
        let right: DictLink = resolve(tokens[8])?;
        let upserts: DictLink = resolve(tokens[9])?;
        let deletes: DictLink = resolve(tokens[10])?;

        trace_log!(pointer = p, key, "state change row");
        registry.insert(p, Some(Dict::new(key, value, left, right, upserts, deletes)));
        last_pointer = Some(p);
    }

    Ok(last_pointer.and_then(|p| registry.remove(&p)).flatten())
}

/// One parsed 5-field row: the composite-key components and the value.
struct CompositeRow {
    components: Vec<Word>,
    value: Word,
}

/// Load a nested state tree from 5-field composite-key CSV rows.
pub fn state_from_csv<R: BufRead>(reader: R) -> TreeResult<Link> {
    let mut rows: Vec<CompositeRow> = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line: String = line?;
        let line_no: usize = idx + 1;
        if line.trim().is_empty() {
            continue;
        }

        let tokens: Vec<&str> = line.split(',').collect();
        if tokens.len() != 5 {
            return Err(TreeError::Parse(format!(
                "line {line_no}: expected 5 fields, got {}",
                tokens.len()
            )));
        }

        let mut numbers: Vec<Word> = Vec::new();
        for token in tokens {
            if token.is_empty() {
                continue;
            }
            for sub in token.split(';') {
                numbers.push(parse_word(sub, line_no)?);
            }
        }
        if numbers.len() < 2 {
            return Err(TreeError::Parse(format!(
                "line {line_no}: need at least one key component and a value"
            )));
        }

        let value: Word = numbers.pop().expect("checked non-empty");
        rows.push(CompositeRow {
            components: numbers,
            value,
        });
    }

    rows.sort_by(|a, b| a.components.cmp(&b.components));
    trace_log!(rows = rows.len(), "building state tree from composite rows");

    let mut c = Counters::default();
    Ok(build_level(&rows, 0, &mut c))
}

/// Build one nesting level from rows sharing a component prefix.
///
/// Rows are sorted, so rows ending at this depth precede deeper rows with
/// the same component; the first ending row supplies the value.
fn build_level(rows: &[CompositeRow], depth: usize, c: &mut Counters) -> Link {
    let mut t: Link = None;
    let mut i: usize = 0;

    while i < rows.len() {
        let key: Word = rows[i].components[depth];
        let mut j: usize = i;
        while j < rows.len() && rows[j].components[depth] == key {
            j += 1;
        }
        let group: &[CompositeRow] = &rows[i..j];

        let enders: usize = group
            .iter()
            .take_while(|r| r.components.len() == depth + 1)
            .count();
        let value: Option<Word> = (enders > 0).then(|| group[0].value);
        let nested: Link = if enders < group.len() {
            build_level(&group[enders..], depth + 1, c)
        } else {
            None
        };

        t = insert(t, key, value, nested, c);
        i = j;
    }

    t
}
