//! Authoring schema - the parsed form of the story markup.
//!
//! The markup parser itself lives outside this crate. It hands over one
//! record per `<Node>`/`<Choice>` element with the element's attributes;
//! everything is read into a fixed record type in a single serde step.
//!
//! Attribute reference:
//! - `id`: external key
//! - `node` / `choice`: comma-separated child keys
//! - `label`, `image`, `imageTitle`, `item`, `background`: strings
//! - `isRootNode`, `isGameOver`, `isEndOfChapter`, `isEndOfPart`: `"true"`/`"false"`

use serde::{Deserialize, Deserializer, Serialize};

use crate::node::{non_empty, NodeFlags, NodeId, NodeKind, StoryNode};

/// Element name of an authored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordTag {
    Node,
    Choice,
}

impl RecordTag {
    pub fn kind(&self) -> NodeKind {
        match self {
            RecordTag::Node => NodeKind::Story,
            RecordTag::Choice => NodeKind::Choice,
        }
    }
}

/// A single authored node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthoredRecord {
    pub tag: RecordTag,

    /// External key.
    pub id: String,

    #[serde(default)]
    pub text: String,

    #[serde(default)]
    pub label: Option<String>,

    /// Keys of story children.
    #[serde(rename = "node", default, deserialize_with = "key_list")]
    pub node_children: Vec<String>,

    /// Keys of choice children.
    #[serde(rename = "choice", default, deserialize_with = "key_list")]
    pub choice_children: Vec<String>,

    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub image_title: Option<String>,
    #[serde(default)]
    pub item: Option<String>,
    #[serde(default)]
    pub background: Option<String>,

    #[serde(default, deserialize_with = "literal_bool")]
    pub is_root_node: bool,
    #[serde(default, deserialize_with = "literal_bool")]
    pub is_game_over: bool,
    #[serde(default, deserialize_with = "literal_bool")]
    pub is_end_of_chapter: bool,
    #[serde(default, deserialize_with = "literal_bool")]
    pub is_end_of_part: bool,
}

impl AuthoredRecord {
    /// Create a record with the given tag and key.
    pub fn new(tag: RecordTag, key: impl Into<String>) -> Self {
        Self {
            tag,
            id: key.into(),
            text: String::new(),
            label: None,
            node_children: Vec::new(),
            choice_children: Vec::new(),
            image: None,
            image_title: None,
            item: None,
            background: None,
            is_root_node: false,
            is_game_over: false,
            is_end_of_chapter: false,
            is_end_of_part: false,
        }
    }

    /// Create a `<Node>` record.
    pub fn node(key: impl Into<String>) -> Self {
        Self::new(RecordTag::Node, key)
    }

    /// Create a `<Choice>` record.
    pub fn choice(key: impl Into<String>) -> Self {
        Self::new(RecordTag::Choice, key)
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Link story children by key.
    pub fn with_nodes<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.node_children.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Link choice children by key.
    pub fn with_choices<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choice_children.extend(keys.into_iter().map(Into::into));
        self
    }

    pub fn root(mut self) -> Self {
        self.is_root_node = true;
        self
    }

    pub fn game_over(mut self) -> Self {
        self.is_game_over = true;
        self
    }

    pub fn end_of_chapter(mut self) -> Self {
        self.is_end_of_chapter = true;
        self
    }

    pub fn end_of_part(mut self) -> Self {
        self.is_end_of_part = true;
        self
    }

    pub fn kind(&self) -> NodeKind {
        self.tag.kind()
    }

    pub fn flags(&self) -> NodeFlags {
        NodeFlags {
            is_root: self.is_root_node,
            is_game_over: self.is_game_over,
            is_end_of_chapter: self.is_end_of_chapter,
            is_end_of_part: self.is_end_of_part,
        }
    }

    /// All child keys: story children first, then choices.
    pub fn child_keys(&self) -> impl Iterator<Item = &str> {
        self.node_children
            .iter()
            .chain(self.choice_children.iter())
            .map(String::as_str)
    }

    /// Build a childless node carrying this record's content.
    pub fn to_node(&self, id: NodeId) -> StoryNode {
        let label = self
            .label
            .clone()
            .and_then(non_empty)
            .unwrap_or_else(|| self.id.clone());

        let mut node = StoryNode::with_id(id, self.id.clone(), self.kind())
            .with_label(label)
            .with_text(self.text.clone())
            .with_flags(self.flags());
        node.image = self.image.clone().and_then(non_empty);
        node.image_title = self.image_title.clone().and_then(non_empty);
        node.item = self.item.clone().and_then(non_empty);
        node.background = self.background.clone().and_then(non_empty);
        node
    }
}

/// The full parsed markup for one chapter.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthoredSource {
    pub records: Vec<AuthoredRecord>,
}

impl AuthoredSource {
    pub fn new(records: Vec<AuthoredRecord>) -> Self {
        Self { records }
    }

    /// Parse a JSON array of records.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AuthoredRecord> {
        self.records.iter()
    }
}

impl From<Vec<AuthoredRecord>> for AuthoredSource {
    fn from(records: Vec<AuthoredRecord>) -> Self {
        Self::new(records)
    }
}

impl FromIterator<AuthoredRecord> for AuthoredSource {
    fn from_iter<T: IntoIterator<Item = AuthoredRecord>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Markup booleans arrive as the literals `"true"`/`"false"`.
fn literal_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bool(bool),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Bool(value) => Ok(value),
        Raw::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" | "" => Ok(false),
            other => Err(serde::de::Error::custom(format!(
                "expected \"true\" or \"false\", found \"{other}\""
            ))),
        },
    }
}

/// Child keys arrive comma-separated; arrays are accepted too.
fn key_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Joined(String),
        List(Vec<String>),
    }

    let keys = match Raw::deserialize(deserializer)? {
        Raw::Joined(joined) => joined.split(',').map(str::to_string).collect(),
        Raw::List(list) => list,
    };

    Ok(keys
        .into_iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect())
}
