//! Parsed input documents.
//!
//! A [`Document`] owns the bytes of one PDF file together with its merged
//! cross-reference table. Objects are parsed the first time they are asked
//! for and cached for the lifetime of the document, so a document can be
//! shared read-only across threads once opened.

mod pages;
pub mod xref;

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, warn};

use crate::error::{ReadError, ReadResult};
use crate::object::{Dictionary, ObjectId, PdfObject};
use crate::parser::lexer::{Lexer, Token};
use crate::parser::objects::{find, parse_indirect_object, parse_object};

pub use pages::{INHERITABLE_KEYS, Page, Pages};
pub use xref::{XrefEntry, XrefTable};

use pages::PageEntry;

/// How far into the file the `%PDF-` header may start.
const HEADER_SEARCH_WINDOW: usize = 1024;

/// Nesting limit for lookups that trigger other lookups (indirect `/Length`,
/// object stream containers).
const MAX_LOOKUP_DEPTH: usize = 8;

/// Longest chain of references `resolve` will follow.
const MAX_REFERENCE_HOPS: usize = 32;

static NEXT_DOCUMENT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of an opened document.
///
/// Two documents opened from identical bytes still get distinct ids, which
/// keeps their objects apart when both are appended to one output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(u64);

impl DocumentId {
    fn next() -> Self {
        Self(NEXT_DOCUMENT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "doc#{}", self.0)
    }
}

/// A parsed, read-only PDF document.
pub struct Document {
    id: DocumentId,
    label: String,
    buffer: Vec<u8>,
    version: String,
    xref: XrefTable,
    trailer: Dictionary,
    cache: HashMap<u32, OnceLock<PdfObject>>,
    pages: Vec<PageEntry>,
}

impl Document {
    /// Parse a document from its bytes.
    pub fn open(bytes: Vec<u8>) -> ReadResult<Self> {
        Self::open_labeled(bytes, "<memory>")
    }

    /// Parse a document and remember a label (usually the file path) for messages.
    pub fn open_labeled(bytes: Vec<u8>, label: impl Into<String>) -> ReadResult<Self> {
        let label = label.into();
        let version = read_header(&bytes)?;
        let (xref, trailer) = xref::read_xref_chain(&bytes)?;

        if trailer.contains_key(b"Encrypt") {
            return Err(ReadError::EncryptedDocument);
        }

        for (number, entry) in xref.iter() {
            if let XrefEntry::InUse { offset, .. } = entry
                && offset >= bytes.len()
            {
                return Err(ReadError::CorruptXref(format!(
                    "object {number} is recorded at byte {offset}, beyond the end of the file ({} bytes)",
                    bytes.len()
                )));
            }
        }

        if let Some(size) = trailer.get(b"Size").and_then(PdfObject::as_i64)
            && let Some(max) = xref.max_number()
            && i64::from(max) >= size
        {
            warn!("{label}: trailer /Size {size} does not cover object {max}");
        }

        let cache = xref
            .live_numbers()
            .map(|number| (number, OnceLock::new()))
            .collect();

        let mut document = Self {
            id: DocumentId::next(),
            label,
            buffer: bytes,
            version,
            xref,
            trailer,
            cache,
            pages: Vec::new(),
        };

        let root = document.pages_root()?;
        document.pages = pages::collect(&document, root)?;
        debug!(
            "{}: PDF {} with {} objects and {} pages",
            document.label,
            document.version,
            document.object_count(),
            document.pages.len()
        );
        Ok(document)
    }

    /// Read and parse a file.
    pub fn load(path: impl AsRef<Path>) -> ReadResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        Self::open_labeled(bytes, path.display().to_string())
    }

    /// Process-unique id of this document.
    pub fn id(&self) -> DocumentId {
        self.id
    }

    /// Label used in messages.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Header version, e.g. `"1.7"`.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Size of the underlying file in bytes.
    pub fn byte_len(&self) -> usize {
        self.buffer.len()
    }

    /// The newest trailer dictionary.
    pub fn trailer(&self) -> &Dictionary {
        &self.trailer
    }

    /// The merged cross-reference table.
    pub fn xref(&self) -> &XrefTable {
        &self.xref
    }

    /// Number of live objects in the cross-reference table.
    pub fn object_count(&self) -> usize {
        self.cache.len()
    }

    /// The document catalog.
    pub fn catalog(&self) -> ReadResult<&Dictionary> {
        let root = self
            .trailer
            .get(b"Root")
            .and_then(PdfObject::as_reference)
            .ok_or_else(|| ReadError::CrossRef("trailer has no /Root reference".to_string()))?;
        self.get_dictionary(root)
    }

    /// The document information dictionary, if any.
    pub fn info(&self) -> Option<&Dictionary> {
        let info = self.trailer.get(b"Info")?;
        self.resolve(info).ok()?.as_dict()
    }

    /// Fetch an indirect object, parsing it on first access.
    pub fn get_object(&self, id: ObjectId) -> ReadResult<&PdfObject> {
        self.lookup(id, 0)
    }

    /// Fetch an indirect object that must be a dictionary (or a stream's dictionary).
    pub fn get_dictionary(&self, id: ObjectId) -> ReadResult<&Dictionary> {
        let object = self.get_object(id)?;
        object.as_dict().ok_or_else(|| {
            ReadError::syntax(
                self.offset_of(id.number),
                format!("object {id} is a {}, expected a dictionary", object.kind()),
            )
        })
    }

    /// Follow references until a direct object is reached.
    pub fn resolve<'a>(&'a self, object: &'a PdfObject) -> ReadResult<&'a PdfObject> {
        let mut current = object;
        for _ in 0..MAX_REFERENCE_HOPS {
            match current {
                PdfObject::Reference(id) => current = self.get_object(*id)?,
                direct => return Ok(direct),
            }
        }
        Err(ReadError::syntax(0, "reference chain too long"))
    }

    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Object ids of the pages in document order.
    pub fn page_ids(&self) -> impl ExactSizeIterator<Item = ObjectId> + '_ {
        self.pages.iter().map(|entry| entry.id)
    }

    /// Iterate pages in document order. Restartable and side-effect free.
    pub fn pages(&self) -> Pages<'_> {
        Pages::new(self)
    }

    /// Page at a 0-based index.
    pub fn page(&self, index: usize) -> Option<ReadResult<Page<'_>>> {
        let entry = self.pages.get(index)?;
        Some(self.get_dictionary(entry.id).map(|dict| Page {
            document: self,
            index,
            id: entry.id,
            dict,
            inherited: &entry.inherited,
        }))
    }

    fn pages_root(&self) -> ReadResult<ObjectId> {
        let catalog = self.catalog()?;
        match catalog.get(b"Pages") {
            Some(PdfObject::Reference(id)) => Ok(*id),
            Some(other) => Err(ReadError::page_tree(format!(
                "catalog /Pages is a {}, expected a reference",
                other.kind()
            ))),
            None => Err(ReadError::page_tree("catalog has no /Pages entry")),
        }
    }

    fn offset_of(&self, number: u32) -> usize {
        match self.xref.get(number) {
            Some(XrefEntry::InUse { offset, .. }) => offset,
            _ => 0,
        }
    }

    fn lookup(&self, id: ObjectId, depth: usize) -> ReadResult<&PdfObject> {
        let cell = self
            .cache
            .get(&id.number)
            .ok_or(ReadError::DanglingReference(id))?;
        if let Some(object) = cell.get() {
            self.check_generation(id)?;
            return Ok(object);
        }
        let object = self.load_object(id, depth)?;
        Ok(cell.get_or_init(|| object))
    }

    fn check_generation(&self, id: ObjectId) -> ReadResult<()> {
        let stored = match self.xref.get(id.number) {
            Some(XrefEntry::InUse { generation, .. }) => generation,
            Some(XrefEntry::Compressed { .. }) => 0,
            _ => return Err(ReadError::DanglingReference(id)),
        };
        if stored == id.generation {
            Ok(())
        } else {
            Err(ReadError::DanglingReference(id))
        }
    }

    fn load_object(&self, id: ObjectId, depth: usize) -> ReadResult<PdfObject> {
        if depth > MAX_LOOKUP_DEPTH {
            return Err(ReadError::CorruptXref(format!(
                "lookup of object {id} nested too deeply"
            )));
        }
        self.check_generation(id)?;

        match self.xref.get(id.number) {
            Some(XrefEntry::InUse { offset, .. }) => {
                let mut resolve_length = |length_id: ObjectId| self.resolve_length(length_id, depth);
                let (found, object) =
                    parse_indirect_object(&self.buffer, offset, &mut resolve_length)?;
                if found.number != id.number {
                    return Err(ReadError::CorruptXref(format!(
                        "cross-reference entry for object {} points at object {found}",
                        id.number
                    )));
                }
                Ok(object)
            }
            Some(XrefEntry::Compressed { container, index }) => {
                self.load_compressed(id, container, index, depth)
            }
            _ => Err(ReadError::DanglingReference(id)),
        }
    }

    fn resolve_length(&self, id: ObjectId, depth: usize) -> Option<i64> {
        if depth >= MAX_LOOKUP_DEPTH {
            return None;
        }
        self.lookup(id, depth + 1).ok()?.as_i64()
    }

    fn load_compressed(
        &self,
        id: ObjectId,
        container: u32,
        index: u32,
        depth: usize,
    ) -> ReadResult<PdfObject> {
        let Some(XrefEntry::InUse { generation, .. }) = self.xref.get(container) else {
            return Err(ReadError::CorruptXref(format!(
                "object {} lives in object stream {container}, which is not a plain object",
                id.number
            )));
        };
        let container_id = ObjectId::new(container, generation);
        let stream = self
            .lookup(container_id, depth + 1)?
            .as_stream()
            .filter(|stream| stream.dict.has_type(b"ObjStm"))
            .ok_or_else(|| {
                ReadError::CorruptXref(format!("object {container_id} is not an object stream"))
            })?;

        let count = stream.dict.get(b"N").and_then(PdfObject::as_i64).unwrap_or(0);
        let first = stream
            .dict
            .get(b"First")
            .and_then(PdfObject::as_i64)
            .and_then(|first| usize::try_from(first).ok())
            .ok_or_else(|| {
                ReadError::CorruptXref(format!("object stream {container_id} has no /First"))
            })?;
        let data = stream.decoded_content()?;

        let mut header = Lexer::new(data);
        let mut slot = None;
        for position in 0..count {
            let (Some(Token::Integer(number)), Some(Token::Integer(offset))) =
                (header.next_token()?, header.next_token()?)
            else {
                break;
            };
            if number == i64::from(id.number) {
                let exact = position == i64::from(index);
                slot = Some(offset);
                if exact {
                    break;
                }
            }
        }

        let offset = slot
            .and_then(|offset| usize::try_from(offset).ok())
            .ok_or(ReadError::DanglingReference(id))?;
        let mut lexer = Lexer::at(data, first.saturating_add(offset));
        parse_object(&mut lexer)
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("version", &self.version)
            .field("bytes", &self.buffer.len())
            .field("objects", &self.cache.len())
            .field("pages", &self.pages.len())
            .finish()
    }
}

pub(crate) fn read_header(buf: &[u8]) -> ReadResult<String> {
    let window = &buf[..buf.len().min(HEADER_SEARCH_WINDOW)];
    let start = find(window, b"%PDF-", 0)
        .ok_or_else(|| ReadError::syntax(0, "missing %PDF- header"))?;
    let version: String = window[start + 5..]
        .iter()
        .take_while(|byte| byte.is_ascii_digit() || **byte == b'.')
        .map(|byte| char::from(*byte))
        .collect();
    if version.is_empty() {
        return Err(ReadError::syntax(start, "header has no version number"));
    }
    Ok(version)
}
