//! Serialized outline tree, as handed over by the document parser.
//!
//! The parser emits a nested tree; [`crate::outline::Outline::from_source`]
//! flattens it into the arena the engine works on.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ExportError, ExportResult};
use super::timestamp::Timestamp;
use super::{Inline, TodoState};

/// One outline document (usually one file).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutlineSource {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Document category; the file stem is used when absent.
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub file_tags: Vec<String>,
    #[serde(default)]
    pub entries: Vec<EntrySource>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntrySource {
    #[serde(default)]
    pub title: Vec<Inline>,
    #[serde(default)]
    pub todo_keyword: Option<String>,
    #[serde(default)]
    pub todo_state: TodoState,
    #[serde(default)]
    pub priority: Option<i64>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    #[serde(default)]
    pub scheduled: Option<Timestamp>,
    #[serde(default)]
    pub deadline: Option<Timestamp>,
    #[serde(default)]
    pub body: Vec<SourceElement>,
    /// Child headlines. Ignored on inline tasks.
    #[serde(default)]
    pub children: Vec<EntrySource>,
    #[serde(default)]
    pub footnote_section: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SourceElement {
    Text { text: String },
    Timestamp(Timestamp),
    Diary { expression: String },
    InlineTask(EntrySource),
}

impl OutlineSource {
    pub fn new(entries: Vec<EntrySource>) -> Self {
        OutlineSource {
            entries,
            ..Default::default()
        }
    }

    /// Decode a parser's JSON output.
    pub fn from_json(json: &str) -> ExportResult<Self> {
        serde_json::from_str(json).map_err(|e| ExportError::Serialization(e.to_string()))
    }
}

impl EntrySource {
    pub fn new(title: &str) -> Self {
        EntrySource {
            title: vec![Inline::Text {
                text: title.to_string(),
            }],
            ..Default::default()
        }
    }

    pub fn todo(mut self, keyword: &str) -> Self {
        self.todo_keyword = Some(keyword.to_string());
        self.todo_state = TodoState::Active;
        self
    }

    pub fn done(mut self, keyword: &str) -> Self {
        self.todo_keyword = Some(keyword.to_string());
        self.todo_state = TodoState::Done;
        self
    }

    pub fn priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn tag(mut self, tag: &str) -> Self {
        self.tags.push(tag.to_string());
        self
    }

    pub fn property(mut self, key: &str, value: &str) -> Self {
        self.properties.insert(key.to_string(), value.to_string());
        self
    }

    pub fn scheduled(mut self, ts: Timestamp) -> Self {
        self.scheduled = Some(ts);
        self
    }

    pub fn deadline(mut self, ts: Timestamp) -> Self {
        self.deadline = Some(ts);
        self
    }

    pub fn title_timestamp(mut self, ts: Timestamp) -> Self {
        self.title.push(Inline::Timestamp(ts));
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.body.push(SourceElement::Text {
            text: text.to_string(),
        });
        self
    }

    pub fn timestamp(mut self, ts: Timestamp) -> Self {
        self.body.push(SourceElement::Timestamp(ts));
        self
    }

    pub fn diary(mut self, expression: &str) -> Self {
        self.body.push(SourceElement::Diary {
            expression: expression.to_string(),
        });
        self
    }

    pub fn inline_task(mut self, task: EntrySource) -> Self {
        self.body.push(SourceElement::InlineTask(task));
        self
    }

    pub fn child(mut self, child: EntrySource) -> Self {
        self.children.push(child);
        self
    }
}
