//! Outline document model.
//!
//! Entries live in an arena ([`Outline`]) and refer to each other through
//! [`EntryId`] indices. Parent and child links are explicit indices, so the
//! blocking walk can move up and sideways without back-references.

mod source;
mod timestamp;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use source::{EntrySource, OutlineSource, SourceElement};
pub use timestamp::{
    DiaryExpression, Repeater, RepeaterUnit, TimePoint, Timestamp, TimestampKind,
};

/// Position of an entry inside its [`Outline`], assigned in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryKind {
    Headline,
    InlineTask,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TodoState {
    #[default]
    None,
    Active,
    Done,
}

/// Rich title content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Inline {
    Text { text: String },
    Timestamp(Timestamp),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyElement {
    Text(String),
    Timestamp(Timestamp),
    Diary(DiaryExpression),
    InlineTask(EntryId),
}

/// A headline or inline task.
#[derive(Debug, Clone)]
pub struct OutlineEntry {
    pub kind: EntryKind,
    pub title: Vec<Inline>,
    pub todo_keyword: Option<String>,
    pub todo_state: TodoState,
    pub priority: Option<i64>,
    /// Tags set on this entry only.
    pub tags: Vec<String>,
    /// Property drawer, keys upper-cased.
    pub properties: BTreeMap<String, String>,
    pub scheduled: Option<Timestamp>,
    pub deadline: Option<Timestamp>,
    pub body: Vec<BodyElement>,
    pub footnote_section: bool,
    parent: Option<EntryId>,
    children: Vec<EntryId>,
}

impl OutlineEntry {
    pub fn is_headline(&self) -> bool {
        self.kind == EntryKind::Headline
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .get(&key.to_ascii_uppercase())
            .map(String::as_str)
    }

    pub fn is_active_todo(&self) -> bool {
        self.todo_state == TodoState::Active
    }

    /// True when the ORDERED property is set to anything but `nil`.
    pub fn is_ordered(&self) -> bool {
        self.property("ORDERED")
            .map(str::trim)
            .is_some_and(|v| !v.is_empty() && v != "nil")
    }

    /// APPT_WARNTIME, in minutes.
    pub fn warn_time(&self) -> Option<u32> {
        self.property("APPT_WARNTIME")
            .and_then(|v| v.trim().parse().ok())
    }

    /// Title rendered to plain text.
    pub fn title_text(&self) -> String {
        let mut text = String::new();
        for inline in &self.title {
            match inline {
                Inline::Text { text: t } => text.push_str(t),
                Inline::Timestamp(ts) => text.push_str(&ts.to_string()),
            }
        }
        text.trim().to_string()
    }

    /// Body rendered to plain text. Nested inline tasks are left out.
    pub fn body_text(&self) -> String {
        let mut text = String::new();
        for element in &self.body {
            match element {
                BodyElement::Text(t) => text.push_str(t),
                BodyElement::Timestamp(ts) => text.push_str(&ts.to_string()),
                BodyElement::Diary(d) => text.push_str(d.as_str()),
                BodyElement::InlineTask(_) => {}
            }
        }
        text
    }

    /// Timestamps in the title and the entry's own body.
    pub fn timestamps(&self) -> impl Iterator<Item = &Timestamp> {
        let title = self.title.iter().filter_map(|i| match i {
            Inline::Timestamp(ts) => Some(ts),
            Inline::Text { .. } => None,
        });
        let body = self.body.iter().filter_map(|e| match e {
            BodyElement::Timestamp(ts) => Some(ts),
            _ => None,
        });
        title.chain(body)
    }

    /// Diary expressions in the entry's own body.
    pub fn diary_expressions(&self) -> impl Iterator<Item = &DiaryExpression> {
        self.body.iter().filter_map(|e| match e {
            BodyElement::Diary(d) => Some(d),
            _ => None,
        })
    }
}

/// One parsed document flattened into an arena.
#[derive(Debug, Clone)]
pub struct Outline {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: String,
    pub file_tags: Vec<String>,
    entries: Vec<OutlineEntry>,
    roots: Vec<EntryId>,
}

impl Outline {
    /// Build the arena. `default_category` is used when the document sets
    /// none, normally the file stem.
    pub fn from_source(source: OutlineSource, default_category: &str) -> Self {
        let mut outline = Outline {
            title: source.title,
            description: source.description,
            category: source
                .category
                .unwrap_or_else(|| default_category.to_string()),
            file_tags: source.file_tags,
            entries: Vec::new(),
            roots: Vec::new(),
        };
        for entry in source.entries {
            let id = outline.insert(entry, EntryKind::Headline, None);
            outline.roots.push(id);
        }
        outline
    }

    fn insert(&mut self, source: EntrySource, kind: EntryKind, parent: Option<EntryId>) -> EntryId {
        let id = EntryId(self.entries.len());
        let EntrySource {
            title,
            todo_keyword,
            todo_state,
            priority,
            tags,
            properties,
            scheduled,
            deadline,
            body,
            children,
            footnote_section,
        } = source;

        let todo_state = match (&todo_keyword, todo_state) {
            (None, _) => TodoState::None,
            (Some(_), TodoState::None) => TodoState::Active,
            (Some(_), state) => state,
        };

        self.entries.push(OutlineEntry {
            kind,
            title,
            todo_keyword,
            todo_state,
            priority,
            tags,
            properties: properties
                .into_iter()
                .map(|(k, v)| (k.to_ascii_uppercase(), v))
                .collect(),
            scheduled,
            deadline,
            body: Vec::new(),
            footnote_section,
            parent,
            children: Vec::new(),
        });

        let mut elements = Vec::with_capacity(body.len());
        for element in body {
            elements.push(match element {
                SourceElement::Text { text } => BodyElement::Text(text),
                SourceElement::Timestamp(ts) => BodyElement::Timestamp(ts),
                SourceElement::Diary { expression } => {
                    BodyElement::Diary(DiaryExpression(expression))
                }
                SourceElement::InlineTask(task) => {
                    BodyElement::InlineTask(self.insert(task, EntryKind::InlineTask, Some(id)))
                }
            });
        }
        self.entries[id.0].body = elements;

        if kind == EntryKind::InlineTask {
            if !children.is_empty() {
                tracing::debug!(entry = id.0, "ignoring child headlines of an inline task");
            }
            return id;
        }

        let child_ids: Vec<EntryId> = children
            .into_iter()
            .map(|child| self.insert(child, EntryKind::Headline, Some(id)))
            .collect();
        self.entries[id.0].children = child_ids;
        id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Panics if `id` does not belong to this outline.
    pub fn entry(&self, id: EntryId) -> &OutlineEntry {
        &self.entries[id.0]
    }

    pub fn get(&self, id: EntryId) -> Option<&OutlineEntry> {
        self.entries.get(id.0)
    }

    /// Top-level headlines.
    pub fn roots(&self) -> &[EntryId] {
        &self.roots
    }

    pub fn parent(&self, id: EntryId) -> Option<EntryId> {
        self.entry(id).parent
    }

    /// Child headlines.
    pub fn children(&self, id: EntryId) -> &[EntryId] {
        &self.entry(id).children
    }

    /// Ancestors from the nearest parent up to the top-level headline.
    pub fn ancestors(&self, id: EntryId) -> impl Iterator<Item = EntryId> + '_ {
        std::iter::successors(self.parent(id), move |&p| self.parent(p))
    }

    /// Headlines before `id` under the same parent, nearest first.
    pub fn preceding_siblings(&self, id: EntryId) -> impl Iterator<Item = EntryId> + '_ {
        let siblings = match self.parent(id) {
            Some(p) => self.children(p),
            None => self.roots(),
        };
        let before = siblings
            .iter()
            .position(|&s| s == id)
            .map_or(&[][..], |idx| &siblings[..idx]);
        before.iter().rev().copied()
    }

    /// All headlines below `id`, depth first.
    pub fn descendants(&self, id: EntryId) -> Vec<EntryId> {
        let mut out = Vec::new();
        let mut stack: Vec<EntryId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Inline tasks nested in the body of `id`, including tasks nested
    /// inside those, in document order.
    pub fn inline_tasks(&self, id: EntryId) -> Vec<EntryId> {
        let mut out = Vec::new();
        for element in &self.entry(id).body {
            if let BodyElement::InlineTask(task) = element {
                out.push(*task);
                out.extend(self.inline_tasks(*task));
            }
        }
        out
    }

    /// Property value on the entry or its nearest ancestor carrying it.
    pub fn inherited_property(&self, id: EntryId, key: &str) -> Option<&str> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find_map(|e| self.entry(e).property(key))
    }

    /// File tags followed by ancestor tags, outermost first.
    pub fn inherited_tags(&self, id: EntryId) -> Vec<String> {
        let mut lineage: Vec<EntryId> = self.ancestors(id).collect();
        lineage.reverse();
        let tags = self
            .file_tags
            .iter()
            .chain(lineage.iter().flat_map(|&a| self.entry(a).tags.iter()));
        dedup(tags)
    }

    /// Inherited tags followed by the entry's own tags.
    pub fn all_tags(&self, id: EntryId) -> Vec<String> {
        let inherited = self.inherited_tags(id);
        dedup(inherited.iter().chain(self.entry(id).tags.iter()))
    }
}

fn dedup<'a>(tags: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        if !out.contains(tag) {
            out.push(tag.clone());
        }
    }
    out
}
