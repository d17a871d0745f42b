//! Minimal XML element tree with slash-path lookups.

use std::path::{Path, PathBuf};

use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::DescriptorError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    /// Local name, namespace prefix stripped.
    pub name: String,
    pub attributes: Vec<(String, String)>,
    /// Concatenated, trimmed character data directly inside this element.
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    fn from_start(start: &BytesStart<'_>) -> Self {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let attributes = start
            .attributes()
            .flatten()
            .map(|attr| {
                let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
                let value = attr
                    .unescape_value()
                    .map(|v| v.into_owned())
                    .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
                (key, value)
            })
            .collect();
        Self {
            name,
            attributes,
            text: String::new(),
            children: Vec::new(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn children_named<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a Element> + 'a {
        let name = name.to_owned();
        self.children.iter().filter(move |c| c.name == name)
    }

    /// First descendant reached by following `path` (`A/B/C`) from this
    /// element's children. Every branch is explored, in document order.
    pub fn find(&self, path: &str) -> Option<&Element> {
        let segments: Vec<&str> = split_path(path);
        find_first(self, &segments)
    }

    /// Every descendant matching `path`, in document order.
    pub fn find_all(&self, path: &str) -> Vec<&Element> {
        let segments: Vec<&str> = split_path(path);
        let mut out = Vec::new();
        collect_all(self, &segments, &mut out);
        out
    }

    /// Text of the first element at `path` that has non-empty text.
    pub fn text_at(&self, path: &str) -> Option<&str> {
        self.find_all(path)
            .into_iter()
            .map(|e| e.text.as_str())
            .find(|t| !t.is_empty())
    }
}

fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn find_first<'a>(element: &'a Element, segments: &[&str]) -> Option<&'a Element> {
    let Some((head, rest)) = segments.split_first() else {
        return Some(element);
    };
    element
        .children_named(head)
        .find_map(|child| find_first(child, rest))
}

fn collect_all<'a>(element: &'a Element, segments: &[&str], out: &mut Vec<&'a Element>) {
    let Some((head, rest)) = segments.split_first() else {
        out.push(element);
        return;
    };
    for child in element.children_named(head) {
        collect_all(child, rest, out);
    }
}

/// A parsed descriptor file.
#[derive(Debug, Clone)]
pub struct Descriptor {
    pub path: PathBuf,
    pub root: Element,
}

impl Descriptor {
    pub async fn read(path: &Path) -> Result<Self, DescriptorError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| DescriptorError::ReadFile {
                path: path.to_path_buf(),
                source: e,
            })?;
        Self::parse_bytes(&bytes, path)
    }

    pub fn read_blocking(path: &Path) -> Result<Self, DescriptorError> {
        let bytes = std::fs::read(path).map_err(|e| DescriptorError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse_bytes(&bytes, path)
    }

    pub fn parse_bytes(bytes: &[u8], path: &Path) -> Result<Self, DescriptorError> {
        let text = String::from_utf8_lossy(bytes);
        let text = text.strip_prefix('\u{feff}').unwrap_or(&text);
        Self::parse_str(text, path)
    }

    pub fn parse_str(xml: &str, path: &Path) -> Result<Self, DescriptorError> {
        let root = parse_tree(xml).map_err(|message| DescriptorError::Malformed {
            path: path.to_path_buf(),
            message,
        })?;
        let root = root.ok_or_else(|| DescriptorError::Empty {
            path: path.to_path_buf(),
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            root,
        })
    }

    /// Directory containing the descriptor; relative references resolve here.
    pub fn directory(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Lookup by a path whose first segment names the root element.
    pub fn find(&self, path: &str) -> Option<&Element> {
        let (root, rest) = self.split_root(path)?;
        if rest.is_empty() {
            return Some(root);
        }
        root.find(rest)
    }

    pub fn find_all(&self, path: &str) -> Vec<&Element> {
        match self.split_root(path) {
            Some((root, "")) => vec![root],
            Some((root, rest)) => root.find_all(rest),
            None => Vec::new(),
        }
    }

    pub fn text_at(&self, path: &str) -> Option<&str> {
        match self.split_root(path) {
            Some((root, "")) => Some(root.text.as_str()).filter(|t| !t.is_empty()),
            Some((root, rest)) => root.text_at(rest),
            None => None,
        }
    }

    fn split_root<'a>(&self, path: &'a str) -> Option<(&Element, &'a str)> {
        let path = path.trim_start_matches('/');
        let (head, rest) = path.split_once('/').unwrap_or((path, ""));
        (head == self.root.name).then_some((&self.root, rest))
    }
}

fn parse_tree(xml: &str) -> Result<Option<Element>, String> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                stack.push(Element::from_start(e));
            }
            Ok(Event::Empty(ref e)) => {
                let element = Element::from_start(e);
                attach(&mut stack, &mut root, element);
            }
            Ok(Event::End(_)) => {
                let Some(mut element) = stack.pop() else {
                    return Err("unexpected closing tag".to_string());
                };
                element.text = element.text.trim().to_string();
                attach(&mut stack, &mut root, element);
            }
            Ok(Event::Text(e)) => {
                if let Some(current) = stack.last_mut() {
                    let decoded = e.decode().map_err(|err| err.to_string())?;
                    current.text.push_str(&decoded);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(current) = stack.last_mut() {
                    current
                        .text
                        .push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if let Some(current) = stack.last_mut() {
                    if let Ok(Some(ch)) = e.resolve_char_ref() {
                        current.text.push(ch);
                    } else {
                        let name = e.decode().map_err(|err| err.to_string())?;
                        match resolve_predefined_entity(&name) {
                            Some(resolved) => current.text.push_str(resolved),
                            None => {
                                current.text.push('&');
                                current.text.push_str(&name);
                                current.text.push(';');
                            }
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(format!(
                    "XML parsing error at position {}: {}",
                    reader.error_position(),
                    e
                ));
            }
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err("unexpected end of document".to_string());
    }
    Ok(root)
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}
