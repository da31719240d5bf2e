//! Page tree traversal and page views.

use std::collections::HashSet;

use log::warn;

use super::Document;
use crate::error::{ReadError, ReadResult};
use crate::object::{Dictionary, ObjectId, PdfObject};

/// Page attributes a `/Page` may inherit from its `/Pages` ancestors.
pub const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// A leaf of the page tree plus whatever it inherits.
#[derive(Debug, Clone)]
pub(super) struct PageEntry {
    pub id: ObjectId,
    pub inherited: Dictionary,
}

/// Flatten the page tree rooted at `root` into document order.
///
/// Every node may be visited once; meeting a node again (a cycle or a node
/// shared between two parents) is a corrupt tree.
pub(super) fn collect(document: &Document, root: ObjectId) -> ReadResult<Vec<PageEntry>> {
    let mut pages = Vec::new();
    let mut visited = HashSet::new();
    let mut stack = vec![(root, Dictionary::new())];

    while let Some((id, inherited)) = stack.pop() {
        if !visited.insert(id) {
            return Err(ReadError::page_tree(format!(
                "node {id} appears more than once in the page tree"
            )));
        }

        let node = match document.get_object(id) {
            Ok(object) => object.as_dict().ok_or_else(|| {
                ReadError::page_tree(format!(
                    "node {id} is a {}, expected a dictionary",
                    object.kind()
                ))
            })?,
            Err(ReadError::DanglingReference(missing)) => {
                return Err(ReadError::page_tree(format!(
                    "page tree references missing object {missing}"
                )));
            }
            Err(err) => return Err(err),
        };

        if !is_intermediate(node) {
            pages.push(PageEntry { id, inherited });
            continue;
        }

        let mut inherited = inherited;
        for key in INHERITABLE_KEYS {
            if let Some(value) = node.get(key) {
                inherited.set(key, value.clone());
            }
        }

        let kids = match node.get(b"Kids") {
            Some(kids) => document.resolve(kids)?,
            None => return Err(ReadError::page_tree(format!("node {id} has no /Kids"))),
        };
        let kids = kids.as_array().ok_or_else(|| {
            ReadError::page_tree(format!("/Kids of node {id} is a {}", kids.kind()))
        })?;

        for kid in kids.iter().rev() {
            let kid = kid.as_reference().ok_or_else(|| {
                ReadError::page_tree(format!(
                    "/Kids of node {id} holds a {} instead of a reference",
                    kid.kind()
                ))
            })?;
            stack.push((kid, inherited.clone()));
        }
    }

    if let Ok(root_node) = document.get_dictionary(root)
        && let Some(count) = root_node.get(b"Count").and_then(PdfObject::as_i64)
        && usize::try_from(count).ok() != Some(pages.len())
    {
        warn!(
            "{}: page tree /Count is {count} but {} pages were found",
            document.label(),
            pages.len()
        );
    }

    Ok(pages)
}

fn is_intermediate(node: &Dictionary) -> bool {
    match node.type_name() {
        Some(b"Pages") => true,
        Some(b"Page") => false,
        _ => node.contains_key(b"Kids"),
    }
}

/// A page of a [`Document`], borrowed from it.
///
/// Nothing is copied: references inside the page still point into the
/// source document.
#[derive(Debug, Clone, Copy)]
pub struct Page<'a> {
    pub(super) document: &'a Document,
    pub(super) index: usize,
    pub(super) id: ObjectId,
    pub(super) dict: &'a Dictionary,
    pub(super) inherited: &'a Dictionary,
}

impl<'a> Page<'a> {
    /// 0-based position in the document.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Object id of the page dictionary.
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// The document this page belongs to.
    pub fn document(&self) -> &'a Document {
        self.document
    }

    /// The page dictionary as stored.
    pub fn dictionary(&self) -> &'a Dictionary {
        self.dict
    }

    /// Attributes inherited from ancestors that the page does not override.
    pub fn inherited(&self) -> impl Iterator<Item = (&'a [u8], &'a PdfObject)> + 'a {
        let own = self.dict;
        self.inherited
            .iter()
            .filter(move |(key, _)| !own.contains_key(key))
    }

    /// Look a key up on the page, then on its ancestors.
    pub fn get(&self, key: &[u8]) -> Option<&'a PdfObject> {
        self.dict.get(key).or_else(|| self.inherited.get(key))
    }

    /// The resource dictionary, resolved.
    pub fn resources(&self) -> ReadResult<Option<&'a Dictionary>> {
        match self.get(b"Resources") {
            Some(resources) => Ok(self.document.resolve(resources)?.as_dict()),
            None => Ok(None),
        }
    }

    /// `[llx lly urx ury]` of the media box.
    pub fn media_box(&self) -> ReadResult<Option<[f64; 4]>> {
        let Some(value) = self.get(b"MediaBox") else {
            return Ok(None);
        };
        let Some(items) = self.document.resolve(value)?.as_array() else {
            return Ok(None);
        };
        if items.len() != 4 {
            return Ok(None);
        }
        let mut rect = [0.0; 4];
        for (slot, item) in rect.iter_mut().zip(items) {
            match self.document.resolve(item)?.as_f64() {
                Some(value) => *slot = value,
                None => return Ok(None),
            }
        }
        Ok(Some(rect))
    }

    /// Width and height of the media box in points.
    pub fn dimensions(&self) -> ReadResult<Option<(f64, f64)>> {
        Ok(self
            .media_box()?
            .map(|[llx, lly, urx, ury]| ((urx - llx).abs(), (ury - lly).abs())))
    }

    /// Rotation in degrees, normalised to 0, 90, 180 or 270.
    pub fn rotation(&self) -> ReadResult<i64> {
        let Some(value) = self.get(b"Rotate") else {
            return Ok(0);
        };
        let degrees = self.document.resolve(value)?.as_i64().unwrap_or(0);
        Ok(degrees.rem_euclid(360) / 90 * 90)
    }

    /// Ids of the content streams, in drawing order.
    pub fn content_ids(&self) -> ReadResult<Vec<ObjectId>> {
        match self.dict.get(b"Contents") {
            None => Ok(Vec::new()),
            Some(PdfObject::Reference(id)) => match self.document.get_object(*id)? {
                PdfObject::Array(items) => Ok(items.iter().filter_map(PdfObject::as_reference).collect()),
                _ => Ok(vec![*id]),
            },
            Some(PdfObject::Array(items)) => {
                Ok(items.iter().filter_map(PdfObject::as_reference).collect())
            }
            Some(_) => Ok(Vec::new()),
        }
    }

    /// Decoded content stream bytes, concatenated in drawing order.
    pub fn content(&self) -> ReadResult<Vec<u8>> {
        let mut content = Vec::new();
        for id in self.content_ids()? {
            let Some(stream) = self.document.get_object(id)?.as_stream() else {
                continue;
            };
            content.extend_from_slice(stream.decoded_content()?);
        }
        Ok(content)
    }
}

/// Lazy iterator over the pages of a document.
#[derive(Debug, Clone)]
pub struct Pages<'a> {
    document: &'a Document,
    next: usize,
}

impl<'a> Pages<'a> {
    pub(super) fn new(document: &'a Document) -> Self {
        Self { document, next: 0 }
    }
}

impl<'a> Iterator for Pages<'a> {
    type Item = ReadResult<Page<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        let page = self.document.page(self.next)?;
        self.next += 1;
        Some(page)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.document.page_count().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Pages<'_> {}
