use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::foundation::error::{ThalaError, ThalaResult};

/// Generic, already-parsed scene descriptor element.
///
/// This mirrors a markup element: `text` is the character data before the first child and
/// `tail` is the character data following this element inside its parent. Only `speak` and
/// its inline `sub` children make use of `text`/`tail`.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Element {
    pub tag: String,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub tail: Option<String>,
    #[serde(default)]
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn tail(mut self, tail: impl Into<String>) -> Self {
        self.tail = Some(tail.into());
        self
    }

    pub fn child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    /// Parse an element tree from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> ThalaResult<Self> {
        serde_json::from_reader(r)
            .map_err(|e| ThalaError::parse(format!("parse scene JSON: {e}")))
    }

    /// Parse an element tree from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> ThalaResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            ThalaError::upstream(format!("open scene JSON '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }
}
