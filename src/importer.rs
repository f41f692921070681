//! Chat-export import: converts an exported conversations JSON document into
//! `ConversationNode` trees.
//!
//! Accepted shapes:
//! - full export: `{ "conversations": [ ... ] }`
//! - a bare array of conversations
//! - a single conversation object carrying `mapping` (or legacy `messages`)
//!
//! Every shape decision falls back to something drawable. The only hard failure
//! is a document that is not JSON at all.
use std::collections::HashSet;
use std::path::Path;

use anyhow::Context;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::conversation::{ConversationNode, Speaker};

const EMPTY_LABEL: &str = "(empty)";
const NO_VISIBLE_LABEL: &str = "(no visible messages)";
const UNTITLED: &str = "Untitled conversation";

// ── Options / results ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportOptions {
    /// Keep only the conversation with this id.
    pub conversation_id: Option<String>,
    /// Keep `system` authored messages instead of splicing them out.
    pub include_system: bool,
    /// Keep `tool` / `function` authored messages instead of splicing them out.
    pub include_tool: bool,
}

impl ImportOptions {
    fn keeps(&self, role: &str) -> bool {
        match role {
            "user" | "assistant" => true,
            "system" => self.include_system,
            "tool" | "function" => self.include_tool,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportedConversation {
    pub title: String,
    pub id: String,
    /// Creation time formatted like message timestamps, empty if unknown.
    pub created: String,
    pub tree: ConversationNode,
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("not a valid JSON document: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("no conversations found in export")]
    NoConversations,
    #[error("conversation {0:?} not found in export")]
    ConversationNotFound(String),
}

// ── Entry points ──────────────────────────────────────────────────────────────

/// Parse raw file contents and convert every conversation in it.
pub fn import_str(raw: &str, opts: &ImportOptions) -> Result<Vec<ImportedConversation>, ImportError> {
    let doc: Value = serde_json::from_str(raw)?;
    let results = convert_export(&doc, opts);
    if results.is_empty() {
        return Err(match &opts.conversation_id {
            Some(id) => ImportError::ConversationNotFound(id.clone()),
            None => ImportError::NoConversations,
        });
    }
    tracing::info!(conversations = results.len(), "export imported");
    Ok(results)
}

/// Read an export file from disk and convert it.
pub async fn read_export(path: &Path, opts: &ImportOptions) -> anyhow::Result<Vec<ImportedConversation>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    import_str(&raw, opts).with_context(|| format!("Failed to import {}", path.display()))
}

/// Convert an already-parsed export document.
pub fn convert_export(doc: &Value, opts: &ImportOptions) -> Vec<ImportedConversation> {
    conversations_in(doc)
        .into_iter()
        .filter(|c| match &opts.conversation_id {
            Some(want) => conversation_id(c) == *want,
            None => true,
        })
        .map(|c| ImportedConversation {
            title: c
                .get("title")
                .and_then(Value::as_str)
                .filter(|t| !t.is_empty())
                .unwrap_or(UNTITLED)
                .to_string(),
            id: conversation_id(c),
            created: to_iso(c.get("create_time")),
            tree: convert_conversation(c, opts),
        })
        .collect()
}

fn conversations_in(doc: &Value) -> Vec<&Value> {
    if let Some(list) = doc.get("conversations").and_then(Value::as_array) {
        return list.iter().collect();
    }
    if let Some(list) = doc.as_array() {
        return list.iter().collect();
    }
    if doc.get("mapping").is_some() || doc.get("messages").is_some() {
        return vec![doc];
    }
    Vec::new()
}

fn conversation_id(conv: &Value) -> String {
    ["id", "conversation_id"]
        .iter()
        .find_map(|k| conv.get(*k).and_then(Value::as_str).filter(|s| !s.is_empty()))
        .unwrap_or_default()
        .to_string()
}

// ── Single conversation ───────────────────────────────────────────────────────

/// Convert one conversation object into a drawable tree.
pub fn convert_conversation(conv: &Value, opts: &ImportOptions) -> ConversationNode {
    let mapping = conv.get("mapping").and_then(Value::as_object).filter(|m| !m.is_empty());
    let Some(mapping) = mapping else {
        if let Some(messages) = conv.get("messages").and_then(Value::as_array) {
            return flat_messages_to_tree(messages, opts);
        }
        return ConversationNode::placeholder(EMPTY_LABEL);
    };

    let root_id = mapping
        .iter()
        .find(|(_, entry)| entry.get("parent").is_none_or(Value::is_null))
        .or_else(|| mapping.iter().next())
        .map(|(id, _)| id.as_str());

    let walker = MappingWalker { mapping, opts };
    root_id
        .and_then(|id| walker.build(id))
        .unwrap_or_else(|| ConversationNode::placeholder(NO_VISIBLE_LABEL))
}

struct MappingWalker<'a> {
    mapping: &'a Map<String, Value>,
    opts: &'a ImportOptions,
}

/// Work items of the post-order walk.
enum Step<'a> {
    Enter(&'a str),
    /// All `children` results of `id` are on top of the output stack.
    Exit { id: &'a str, children: usize },
}

impl<'a> MappingWalker<'a> {
    /// Post-order walk with an explicit stack: exports are mostly long linear
    /// chains, so the depth can reach the message count.
    fn build(&self, root: &'a str) -> Option<ConversationNode> {
        let mapping = self.mapping;
        // ids on the current root-to-node path, guards child lists that loop back
        let mut visiting: HashSet<&str> = HashSet::new();
        let mut done: Vec<Option<ConversationNode>> = Vec::new();
        let mut work = vec![Step::Enter(root)];

        while let Some(step) = work.pop() {
            match step {
                Step::Enter(id) => {
                    let Some(entry) = mapping.get(id) else {
                        done.push(None);
                        continue;
                    };
                    if !visiting.insert(id) {
                        tracing::warn!(node = id, "cycle in conversation mapping, skipping");
                        done.push(None);
                        continue;
                    }
                    let child_ids: Vec<&'a str> = entry
                        .get("children")
                        .and_then(Value::as_array)
                        .map(|ids| ids.iter().filter_map(Value::as_str).collect())
                        .unwrap_or_default();
                    work.push(Step::Exit { id, children: child_ids.len() });
                    work.extend(child_ids.into_iter().rev().map(Step::Enter));
                }
                Step::Exit { id, children } => {
                    let kids: Vec<ConversationNode> =
                        done.split_off(done.len().saturating_sub(children)).into_iter().flatten().collect();
                    visiting.remove(id);
                    done.push(self.finish(id, kids));
                }
            }
        }
        done.pop().flatten()
    }

    /// Turn one mapping entry plus its already built children into a node.
    fn finish(&self, id: &str, kids: Vec<ConversationNode>) -> Option<ConversationNode> {
        let entry = self.mapping.get(id)?;
        let msg = entry.get("message").filter(|m| !m.is_null());
        let role = msg
            .and_then(|m| m.pointer("/author/role"))
            .and_then(Value::as_str)
            .unwrap_or("assistant");
        let text = extract_text(msg);

        // Structural node, or an empty message with a single continuation: elide it.
        if msg.is_none() || (text.is_empty() && kids.len() == 1) {
            return hoist(kids);
        }

        if !self.opts.keeps(role) {
            tracing::debug!(node = id, role, "filtered message spliced out");
            return hoist(kids);
        }

        Some(ConversationNode {
            speaker: Speaker::from_role(role),
            text,
            timestamp: to_iso(msg.and_then(|m| m.get("create_time"))),
            children: kids,
        })
    }
}

/// Replace a dropped node by what remains below it: nothing, its single child,
/// or an empty container that keeps the branching.
fn hoist(mut kids: Vec<ConversationNode>) -> Option<ConversationNode> {
    match kids.len() {
        0 => None,
        1 => kids.pop(),
        _ => Some(ConversationNode::new(Speaker::Assistant, "", "").with_children(kids)),
    }
}

/// Very old exports: a flat `messages` array, chained in order.
fn flat_messages_to_tree(messages: &[Value], opts: &ImportOptions) -> ConversationNode {
    let kept: Vec<ConversationNode> = messages
        .iter()
        .filter_map(|m| {
            let role = m
                .pointer("/author/role")
                .or_else(|| m.get("role"))
                .and_then(Value::as_str)
                .unwrap_or("assistant");
            if !opts.keeps(role) {
                return None;
            }
            Some(ConversationNode::new(
                Speaker::from_role(role),
                extract_text(Some(m)),
                to_iso(m.get("create_time")),
            ))
        })
        .collect();

    kept.into_iter()
        .rev()
        .reduce(|child, parent| parent.with_children(vec![child]))
        .unwrap_or_else(|| ConversationNode::placeholder(EMPTY_LABEL))
}

// ── Field extraction ──────────────────────────────────────────────────────────

/// Pull human-readable text out of the many message content shapes.
///
/// Priority: `parts[]`, `text`, array of blocks (`text` / `string_value`),
/// bare string, `value`. Array pieces are joined with a blank line.
pub fn extract_text(msg: Option<&Value>) -> String {
    let Some(content) = msg.and_then(|m| m.get("content")) else {
        return String::new();
    };

    if let Some(parts) = content.get("parts").and_then(Value::as_array) {
        return join_blocks(parts.iter().filter_map(Value::as_str));
    }
    if let Some(text) = content.get("text").and_then(Value::as_str) {
        return text.to_string();
    }
    if let Some(blocks) = content.as_array() {
        return join_blocks(blocks.iter().map(|b| {
            ["text", "string_value"]
                .iter()
                .find_map(|k| b.get(*k).and_then(Value::as_str).filter(|s| !s.is_empty()))
                .unwrap_or("")
        }));
    }
    if let Some(s) = content.as_str() {
        return s.to_string();
    }
    if let Some(v) = content.get("value").and_then(Value::as_str) {
        return v.to_string();
    }
    String::new()
}

fn join_blocks<'a>(pieces: impl Iterator<Item = &'a str>) -> String {
    pieces.filter(|s| !s.is_empty()).collect::<Vec<_>>().join("\n\n")
}

/// Epoch seconds → `YYYY-MM-DD HH:MM:SSZ` (UTC). Missing, zero or invalid → empty.
pub fn to_iso(epoch: Option<&Value>) -> String {
    let secs = match epoch {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    let Some(secs) = secs.filter(|s| s.is_finite() && *s != 0.0) else {
        return String::new();
    };
    chrono::DateTime::from_timestamp_millis((secs * 1000.0) as i64)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%SZ").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn msg(role: &str, text: &str) -> Value {
        json!({ "author": { "role": role }, "content": { "parts": [text] } })
    }

    #[test]
    fn test_mapping_structural_root_elided() {
        let conv = json!({
            "id": "c1",
            "mapping": {
                "root": { "parent": null, "children": ["u"] },
                "u": { "parent": "root", "children": ["a"], "message": msg("user", "hi") },
                "a": { "parent": "u", "children": [], "message": msg("assistant", "hello") }
            }
        });
        let tree = convert_conversation(&conv, &ImportOptions::default());
        assert_eq!(tree.speaker, Speaker::User);
        assert_eq!(tree.text, "hi");
        assert_eq!(tree.children.len(), 1);
        assert_eq!(tree.children[0].speaker, Speaker::Assistant);
        assert_eq!(tree.children[0].text, "hello");
        assert!(tree.children[0].children.is_empty());
    }

    #[test]
    fn test_system_message_spliced_out() {
        let conv = json!({
            "mapping": {
                "r": { "parent": null, "children": ["u"] },
                "u": { "parent": "r", "children": ["s"], "message": msg("user", "q") },
                "s": { "parent": "u", "children": ["a"], "message": msg("system", "be nice") },
                "a": { "parent": "s", "children": [], "message": msg("assistant", "ans") }
            }
        });
        let tree = convert_conversation(&conv, &ImportOptions::default());
        assert_eq!(tree.text, "q");
        assert_eq!(tree.children.len(), 1);
        assert_eq!(tree.children[0].text, "ans");

        let opts = ImportOptions { include_system: true, ..Default::default() };
        let tree = convert_conversation(&conv, &opts);
        assert_eq!(tree.children[0].text, "be nice");
        assert_eq!(tree.children[0].speaker, Speaker::Assistant);
        assert_eq!(tree.children[0].children[0].text, "ans");
    }

    #[test]
    fn test_structural_node_with_branches_becomes_container() {
        let conv = json!({
            "mapping": {
                "r": { "parent": null, "children": ["a", "b"] },
                "a": { "parent": "r", "children": [], "message": msg("user", "one") },
                "b": { "parent": "r", "children": [], "message": msg("user", "two") }
            }
        });
        let tree = convert_conversation(&conv, &ImportOptions::default());
        assert_eq!(tree.text, "");
        assert_eq!(tree.children.len(), 2);
        assert_eq!(tree.children[1].text, "two");
    }

    #[test]
    fn test_filtered_leaf_dropped_and_placeholder() {
        let conv = json!({
            "mapping": {
                "r": { "parent": null, "children": ["t"] },
                "t": { "parent": "r", "children": [], "message": msg("tool", "ran") }
            }
        });
        let tree = convert_conversation(&conv, &ImportOptions::default());
        assert_eq!(tree.text, NO_VISIBLE_LABEL);
        assert!(tree.children.is_empty());

        let opts = ImportOptions { include_tool: true, ..Default::default() };
        assert_eq!(convert_conversation(&conv, &opts).text, "ran");
    }

    #[test]
    fn test_mapping_cycle_does_not_recurse_forever() {
        let conv = json!({
            "mapping": {
                "r": { "parent": null, "children": ["u"] },
                "u": { "parent": "r", "children": ["r"], "message": msg("user", "loop") }
            }
        });
        let tree = convert_conversation(&conv, &ImportOptions::default());
        assert_eq!(tree.text, "loop");
    }

    #[test]
    fn test_extract_text_shapes() {
        let parts = json!({ "content": { "parts": ["a", "b"] } });
        assert_eq!(extract_text(Some(&parts)), "a\n\nb");
        let plain = json!({ "content": "plain" });
        assert_eq!(extract_text(Some(&plain)), "plain");
        let empty = json!({ "content": {} });
        assert_eq!(extract_text(Some(&empty)), "");
        let text = json!({ "content": { "text": "t" } });
        assert_eq!(extract_text(Some(&text)), "t");
        let blocks = json!({ "content": [{ "text": "x" }, { "string_value": "y" }, {}] });
        assert_eq!(extract_text(Some(&blocks)), "x\n\ny");
        let value = json!({ "content": { "value": "v" } });
        assert_eq!(extract_text(Some(&value)), "v");
        assert_eq!(extract_text(None), "");
    }

    #[test]
    fn test_to_iso() {
        assert_eq!(to_iso(Some(&json!(0))), "");
        assert_eq!(to_iso(None), "");
        assert_eq!(to_iso(Some(&json!("nope"))), "");
        assert_eq!(to_iso(Some(&json!(1_700_000_000))), "2023-11-14 22:13:20Z");
        assert_eq!(to_iso(Some(&json!(1_700_000_000.5))), "2023-11-14 22:13:20Z");
    }

    #[test]
    fn test_flat_messages_chain() {
        let conv = json!({
            "messages": [
                { "role": "user", "content": "q1" },
                { "role": "system", "content": "hidden" },
                { "author": { "role": "assistant" }, "content": { "parts": ["a1"] } }
            ]
        });
        let tree = convert_conversation(&conv, &ImportOptions::default());
        assert_eq!(tree.text, "q1");
        assert_eq!(tree.children.len(), 1);
        assert_eq!(tree.children[0].text, "a1");

        let empty = json!({ "messages": [] });
        assert_eq!(convert_conversation(&empty, &ImportOptions::default()).text, EMPTY_LABEL);
        assert_eq!(convert_conversation(&json!({}), &ImportOptions::default()).text, EMPTY_LABEL);
    }

    #[test]
    fn test_export_shapes_and_filter() {
        let conv = |id: &str| json!({ "id": id, "title": format!("T {id}"), "create_time": 1_700_000_000, "messages": [{ "role": "user", "content": id }] });
        let wrapped = json!({ "conversations": [conv("a"), conv("b")] });
        let all = convert_export(&wrapped, &ImportOptions::default());
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].title, "T b");
        assert_eq!(all[0].created, "2023-11-14 22:13:20Z");

        let bare = json!([conv("a")]);
        assert_eq!(convert_export(&bare, &ImportOptions::default()).len(), 1);

        let single = json!({ "conversation_id": "z", "mapping": { "r": { "parent": null, "children": [], "message": msg("user", "solo") } } });
        let one = convert_export(&single, &ImportOptions::default());
        assert_eq!(one[0].id, "z");
        assert_eq!(one[0].title, UNTITLED);
        assert_eq!(one[0].tree.text, "solo");

        let opts = ImportOptions { conversation_id: Some("b".into()), ..Default::default() };
        let picked = convert_export(&wrapped, &opts);
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].id, "b");
    }

    #[tokio::test]
    async fn test_read_export_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conversations.json");
        let doc = json!([{ "title": "On disk", "messages": [msg("user", "hi")] }]);
        std::fs::write(&path, doc.to_string()).unwrap();
        let convs = read_export(&path, &ImportOptions::default()).await.unwrap();
        assert_eq!(convs[0].title, "On disk");

        let missing = read_export(&dir.path().join("nope.json"), &ImportOptions::default()).await;
        assert!(missing.unwrap_err().to_string().contains("Failed to read"));
    }

    #[test]
    fn test_import_str_errors() {
        assert!(matches!(import_str("{not json", &ImportOptions::default()), Err(ImportError::InvalidJson(_))));
        assert!(matches!(import_str("{}", &ImportOptions::default()), Err(ImportError::NoConversations)));
        let opts = ImportOptions { conversation_id: Some("x".into()), ..Default::default() };
        assert!(matches!(import_str("[]", &opts), Err(ImportError::ConversationNotFound(_))));
    }

    #[test]
    fn test_long_linear_mapping_on_worker_sized_stack() {
        let handle = std::thread::Builder::new()
            .stack_size(2 * 1024 * 1024)
            .spawn(|| {
                let turns = 5000;
                let mut mapping = Map::new();
                mapping.insert("root".into(), json!({ "parent": null, "children": ["m0"] }));
                for i in 0..turns {
                    let role = if i % 2 == 0 { "user" } else { "assistant" };
                    let parent = if i == 0 { "root".to_string() } else { format!("m{}", i - 1) };
                    let children: Vec<String> = if i + 1 < turns { vec![format!("m{}", i + 1)] } else { vec![] };
                    mapping.insert(
                        format!("m{i}"),
                        json!({ "parent": parent, "children": children, "message": msg(role, &format!("turn {i}")) }),
                    );
                }
                let conv = json!({ "title": "Long", "mapping": mapping });
                let tree = convert_conversation(&conv, &ImportOptions::default());
                (tree.text.clone(), tree.count())
            })
            .unwrap();
        let (first, count) = handle.join().unwrap();
        assert_eq!(first, "turn 0");
        assert_eq!(count, 5000);
    }
}
