//! Collects pages from many documents into one output file.

use std::collections::{HashMap, HashSet};

use log::debug;

use super::serialize;
use crate::config::{EmptyOutputPolicy, MergeOptions};
use crate::document::{Document, DocumentId};
use crate::error::{MergeError, ReadError, ReadResult, Result, ValidationError};
use crate::object::{Dictionary, ObjectId, PdfObject, StringFormat};

/// Object number reserved for the output page tree root.
const PAGES_ROOT: ObjectId = ObjectId::new(1, 0);

/// Lowest version written, since the output may carry features of any 1.x input.
const MIN_VERSION: (u32, u32) = (1, 4);

/// What one append changed in place, so a failure can undo it.
#[derive(Debug, Default)]
struct Journal {
    copied: Vec<(DocumentId, ObjectId)>,
    replaced: Vec<(ObjectId, Option<PdfObject>)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Open,
    Finalized,
}

/// Accumulates pages (with everything they reference) for one output document.
///
/// Objects are renumbered on the way in. An object reachable from several
/// appended pages of the same source document is copied once and shared.
///
/// ```no_run
/// use pdfmerge::{Document, OutputAccumulator};
///
/// # fn example(a: Vec<u8>, b: Vec<u8>) -> pdfmerge::Result<Vec<u8>> {
/// let a = Document::open(a).map_err(|e| pdfmerge::MergeError::read(0, "a.pdf", e))?;
/// let b = Document::open(b).map_err(|e| pdfmerge::MergeError::read(1, "b.pdf", e))?;
///
/// let mut output = OutputAccumulator::default();
/// output.append(&a, &[0, 1])?;
/// output.append(&b, &[0])?;
/// let bytes = output.finalize()?;
/// # Ok(bytes)
/// # }
/// ```
#[derive(Debug)]
pub struct OutputAccumulator {
    options: MergeOptions,
    /// Slot `n - 1` holds object `n`.
    objects: Vec<Option<PdfObject>>,
    copied: HashMap<(DocumentId, ObjectId), ObjectId>,
    page_refs: Vec<ObjectId>,
    placed_pages: HashSet<ObjectId>,
    version: (u32, u32),
    inputs: usize,
    state: State,
}

impl Default for OutputAccumulator {
    fn default() -> Self {
        Self::new(MergeOptions::default())
    }
}

impl OutputAccumulator {
    /// Create an empty accumulator.
    pub fn new(options: MergeOptions) -> Self {
        Self {
            options,
            objects: vec![None],
            copied: HashMap::new(),
            page_refs: Vec::new(),
            placed_pages: HashSet::new(),
            version: MIN_VERSION,
            inputs: 0,
            state: State::Open,
        }
    }

    /// Pages appended so far.
    pub fn page_count(&self) -> usize {
        self.page_refs.len()
    }

    /// Objects copied so far, not counting the page tree root.
    pub fn object_count(&self) -> usize {
        self.objects.iter().skip(1).filter(|slot| slot.is_some()).count()
    }

    /// Whether [`finalize`](Self::finalize) has been called.
    pub fn is_finalized(&self) -> bool {
        self.state == State::Finalized
    }

    /// Copy the pages at `page_indices` (0-based, in the given order) from `document`.
    ///
    /// Either every page is appended or, on error, nothing is.
    pub fn append(&mut self, document: &Document, page_indices: &[usize]) -> Result<usize> {
        self.append_input(self.inputs, document, page_indices)
    }

    /// Like [`append`](Self::append), reporting errors against input number `input`.
    pub(crate) fn append_input(
        &mut self,
        input: usize,
        document: &Document,
        page_indices: &[usize],
    ) -> Result<usize> {
        if self.state == State::Finalized {
            return Err(MergeError::InvalidState("append called after finalize"));
        }

        let page_count = document.page_count();
        if let Some(&index) = page_indices.iter().find(|&&index| index >= page_count) {
            return Err(ValidationError::PageIndexOutOfRange {
                input,
                index,
                page_count,
            }
            .into());
        }

        let objects_before = self.objects.len();
        let pages_before = self.page_refs.len();
        let mut journal = Journal::default();

        for &index in page_indices {
            if let Err(err) = self.import_page(document, index, &mut journal) {
                self.rollback(journal, objects_before, pages_before);
                return Err(MergeError::read(input, document.label(), err));
            }
        }

        self.inputs += 1;
        self.version = self.version.max(parse_version(document.version()));
        debug!(
            "appended {} pages from {} ({} new objects)",
            page_indices.len(),
            document.label(),
            self.objects.len() - objects_before
        );
        Ok(page_indices.len())
    }

    fn rollback(&mut self, journal: Journal, objects_before: usize, pages_before: usize) {
        for (id, previous) in journal.replaced.into_iter().rev() {
            if let Some(slot) = self.objects.get_mut(id.number as usize - 1) {
                *slot = previous;
            }
        }
        self.objects.truncate(objects_before);
        for key in journal.copied {
            self.copied.remove(&key);
        }
        for page in self.page_refs.drain(pages_before..) {
            self.placed_pages.remove(&page);
        }
    }

    /// Serialize the accumulated pages. Callable once.
    pub fn finalize(&mut self) -> Result<Vec<u8>> {
        if self.state == State::Finalized {
            return Err(MergeError::InvalidState("finalize called more than once"));
        }
        self.state = State::Finalized;

        if self.page_refs.is_empty() && self.options.empty_output == EmptyOutputPolicy::Reject {
            return Err(MergeError::EmptyOutput);
        }

        let mut objects = std::mem::take(&mut self.objects);

        let mut pages_root = Dictionary::new();
        pages_root.set("Type", PdfObject::name("Pages"));
        pages_root.set(
            "Kids",
            PdfObject::Array(self.page_refs.iter().copied().map(PdfObject::Reference).collect()),
        );
        pages_root.set("Count", self.page_refs.len());
        if let Some(slot) = objects.first_mut() {
            *slot = Some(PdfObject::Dictionary(pages_root));
        }

        let mut catalog = Dictionary::new();
        catalog.set("Type", PdfObject::name("Catalog"));
        catalog.set("Pages", PAGES_ROOT);
        objects.push(Some(PdfObject::Dictionary(catalog)));
        let mut trailer = Dictionary::new();
        trailer.set("Root", slot_id(objects.len()));

        if let Some(info) = self.info_dictionary() {
            objects.push(Some(PdfObject::Dictionary(info)));
            trailer.set("Info", slot_id(objects.len()));
        }

        let version = format!("{}.{}", self.version.0, self.version.1);
        debug!(
            "writing PDF {version} with {} pages and {} objects",
            self.page_refs.len(),
            objects.len()
        );

        let numbered = objects
            .iter()
            .enumerate()
            .filter_map(|(slot, object)| object.as_ref().map(|object| (slot_number(slot + 1), object)));
        Ok(serialize::write_file(&version, numbered, &trailer))
    }

    fn info_dictionary(&self) -> Option<Dictionary> {
        let mut info = Dictionary::new();
        if let Some(producer) = &self.options.producer {
            info.set("Producer", text_string(producer));
        }
        for (key, value) in self.options.metadata.entries() {
            info.set(key, text_string(value));
        }
        (!info.is_empty()).then_some(info)
    }

    fn import_page(
        &mut self,
        document: &Document,
        index: usize,
        journal: &mut Journal,
    ) -> ReadResult<()> {
        let page = document
            .page(index)
            .ok_or_else(|| ReadError::page_tree(format!("no page at index {index}")))??;

        let mut dict = page.dictionary().clone();
        for (key, value) in page.inherited() {
            dict.set(key, value.clone());
        }
        dict.remove(b"Parent");
        dict.remove(b"B");

        let key = (document.id(), page.id());
        let target = match self.copied.get(&key) {
            // Reached earlier through another object but never placed in the tree.
            Some(&existing) if !self.placed_pages.contains(&existing) => {
                let previous = self.objects.get(existing.number as usize - 1).cloned().flatten();
                journal.replaced.push((existing, previous));
                existing
            }
            Some(_) => self.allocate(),
            None => {
                let fresh = self.allocate();
                self.copied.insert(key, fresh);
                journal.copied.push(key);
                fresh
            }
        };

        let mut pending = Vec::new();
        let mut page_object = PdfObject::Dictionary(dict);
        page_object.remap_references(&mut |id| {
            self.map_reference(document.id(), id, &mut pending, journal)
        });
        if let Some(dict) = page_object.as_dict_mut() {
            dict.set("Parent", PAGES_ROOT);
        }
        self.store(target, page_object);
        self.page_refs.push(target);
        self.placed_pages.insert(target);

        while let Some(source) = pending.pop() {
            let Some(&target) = self.copied.get(&(document.id(), source)) else {
                continue;
            };
            let mut object = document.get_object(source)?.clone();
            if let Some(dict) = object.as_dict_mut()
                && (dict.has_type(b"Page") || dict.has_type(b"Pages"))
            {
                // Keep a stray page node from dragging its whole source tree along.
                dict.remove(b"Parent");
                dict.remove(b"B");
                if dict.has_type(b"Pages") {
                    dict.set("Kids", PdfObject::Array(Vec::new()));
                    dict.set("Count", PdfObject::Integer(0));
                }
            }
            object.remap_references(&mut |id| {
                self.map_reference(document.id(), id, &mut pending, journal)
            });
            self.store(target, object);
        }

        Ok(())
    }

    fn map_reference(
        &mut self,
        document: DocumentId,
        source: ObjectId,
        pending: &mut Vec<ObjectId>,
        journal: &mut Journal,
    ) -> ObjectId {
        let key = (document, source);
        if let Some(&target) = self.copied.get(&key) {
            return target;
        }
        let target = self.allocate();
        self.copied.insert(key, target);
        journal.copied.push(key);
        pending.push(source);
        target
    }

    fn allocate(&mut self) -> ObjectId {
        self.objects.push(None);
        slot_id(self.objects.len())
    }

    fn store(&mut self, id: ObjectId, object: PdfObject) {
        if let Some(slot) = self.objects.get_mut(id.number as usize - 1) {
            *slot = Some(object);
        }
    }
}

fn slot_number(number: usize) -> u32 {
    u32::try_from(number).unwrap_or(u32::MAX)
}

fn slot_id(number: usize) -> ObjectId {
    ObjectId::new(slot_number(number), 0)
}

fn parse_version(version: &str) -> (u32, u32) {
    let mut parts = version.split('.').map(|part| part.parse().unwrap_or(0));
    (parts.next().unwrap_or(1), parts.next().unwrap_or(0))
}

/// PDF text string: literal for ASCII, UTF-16BE with a byte order mark otherwise.
fn text_string(text: &str) -> PdfObject {
    if text.is_ascii() {
        return PdfObject::string_literal(text);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    PdfObject::String(bytes, StringFormat::Hexadecimal)
}
