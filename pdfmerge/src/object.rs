//! The PDF object model.
//!
//! Every value that can appear in a PDF file is a [`PdfObject`]. Containers
//! own their children; indirect objects are referred to by [`ObjectId`] and
//! resolved through the owning [`Document`](crate::document::Document).

use std::fmt;
use std::sync::OnceLock;

use indexmap::IndexMap;

use crate::error::DecodeError;
use crate::filters;

/// Identity of an indirect object: object number plus generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId {
    /// Object number.
    pub number: u32,
    /// Generation number.
    pub generation: u16,
}

impl ObjectId {
    /// Create an object id.
    pub const fn new(number: u32, generation: u16) -> Self {
        Self { number, generation }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} R", self.number, self.generation)
    }
}

/// How a string was spelled in the source, kept so it can be written back the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StringFormat {
    /// `( ... )`
    #[default]
    Literal,
    /// `< ... >`
    Hexadecimal,
}

/// A PDF value.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfObject {
    /// `null`
    Null,
    /// `true` / `false`
    Boolean(bool),
    /// Integer number.
    Integer(i64),
    /// Real number.
    Real(f64),
    /// Byte string with its original spelling.
    String(Vec<u8>, StringFormat),
    /// Name, stored without the leading slash and with `#xx` escapes decoded.
    Name(Vec<u8>),
    /// Ordered array.
    Array(Vec<PdfObject>),
    /// Dictionary.
    Dictionary(Dictionary),
    /// Stream: dictionary plus raw bytes.
    Stream(Stream),
    /// Indirect reference.
    Reference(ObjectId),
}

impl PdfObject {
    /// Build a name object from a string.
    pub fn name(name: &str) -> Self {
        Self::Name(name.as_bytes().to_vec())
    }

    /// Build a literal string object.
    pub fn string_literal(text: impl Into<Vec<u8>>) -> Self {
        Self::String(text.into(), StringFormat::Literal)
    }

    /// Integer value, if this is an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Numeric value of an integer or real.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(value) => Some(*value as f64),
            Self::Real(value) => Some(*value),
            _ => None,
        }
    }

    /// Name bytes, if this is a name.
    pub fn as_name(&self) -> Option<&[u8]> {
        match self {
            Self::Name(name) => Some(name),
            _ => None,
        }
    }

    /// Array items, if this is an array.
    pub fn as_array(&self) -> Option<&[PdfObject]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Dictionary view. Streams expose their dictionary.
    pub fn as_dict(&self) -> Option<&Dictionary> {
        match self {
            Self::Dictionary(dict) => Some(dict),
            Self::Stream(stream) => Some(&stream.dict),
            _ => None,
        }
    }

    /// Mutable dictionary view. Streams expose their dictionary.
    pub fn as_dict_mut(&mut self) -> Option<&mut Dictionary> {
        match self {
            Self::Dictionary(dict) => Some(dict),
            Self::Stream(stream) => Some(&mut stream.dict),
            _ => None,
        }
    }

    /// Stream, if this is one.
    pub fn as_stream(&self) -> Option<&Stream> {
        match self {
            Self::Stream(stream) => Some(stream),
            _ => None,
        }
    }

    /// Target of an indirect reference.
    pub fn as_reference(&self) -> Option<ObjectId> {
        match self {
            Self::Reference(id) => Some(*id),
            _ => None,
        }
    }

    /// Whether this is `null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short name of the variant, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Real(_) => "real",
            Self::String(..) => "string",
            Self::Name(_) => "name",
            Self::Array(_) => "array",
            Self::Dictionary(_) => "dictionary",
            Self::Stream(_) => "stream",
            Self::Reference(_) => "reference",
        }
    }

    /// Call `visit` for every reference reachable without resolving anything.
    pub fn for_each_reference(&self, visit: &mut impl FnMut(ObjectId)) {
        match self {
            Self::Reference(id) => visit(*id),
            Self::Array(items) => items.iter().for_each(|item| item.for_each_reference(visit)),
            Self::Dictionary(dict) => dict.for_each_reference(visit),
            Self::Stream(stream) => stream.dict.for_each_reference(visit),
            _ => {}
        }
    }

    /// Replace every directly contained reference with `map(reference)`.
    pub fn remap_references(&mut self, map: &mut impl FnMut(ObjectId) -> ObjectId) {
        match self {
            Self::Reference(id) => *id = map(*id),
            Self::Array(items) => items.iter_mut().for_each(|item| item.remap_references(map)),
            Self::Dictionary(dict) => dict.remap_references(map),
            Self::Stream(stream) => stream.dict.remap_references(map),
            _ => {}
        }
    }
}

impl From<bool> for PdfObject {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for PdfObject {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for PdfObject {
    fn from(value: i32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<usize> for PdfObject {
    fn from(value: usize) -> Self {
        Self::Integer(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f64> for PdfObject {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<ObjectId> for PdfObject {
    fn from(id: ObjectId) -> Self {
        Self::Reference(id)
    }
}

impl From<Dictionary> for PdfObject {
    fn from(dict: Dictionary) -> Self {
        Self::Dictionary(dict)
    }
}

impl From<Stream> for PdfObject {
    fn from(stream: Stream) -> Self {
        Self::Stream(stream)
    }
}

impl From<Vec<PdfObject>> for PdfObject {
    fn from(items: Vec<PdfObject>) -> Self {
        Self::Array(items)
    }
}

/// Dictionary keyed by name bytes. Keeps insertion order so output mirrors input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dictionary(IndexMap<Vec<u8>, PdfObject>);

impl Dictionary {
    /// Create an empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a key.
    pub fn get(&self, key: &[u8]) -> Option<&PdfObject> {
        self.0.get(key)
    }

    /// Look up a key for mutation.
    pub fn get_mut(&mut self, key: &[u8]) -> Option<&mut PdfObject> {
        self.0.get_mut(key)
    }

    /// Insert or replace a value. Replacing keeps the key's position.
    pub fn set(&mut self, key: impl Into<Vec<u8>>, value: impl Into<PdfObject>) {
        self.0.insert(key.into(), value.into());
    }

    /// Remove a key, keeping the order of the remaining entries.
    pub fn remove(&mut self, key: &[u8]) -> Option<PdfObject> {
        self.0.shift_remove(key)
    }

    /// Whether the key is present.
    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.0.contains_key(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the dictionary has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries in order.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &PdfObject)> {
        self.0.iter().map(|(key, value)| (key.as_slice(), value))
    }

    /// The `/Type` name, if present.
    pub fn type_name(&self) -> Option<&[u8]> {
        self.get(b"Type").and_then(PdfObject::as_name)
    }

    /// Whether `/Type` equals `name`.
    pub fn has_type(&self, name: &[u8]) -> bool {
        self.type_name() == Some(name)
    }

    fn for_each_reference(&self, visit: &mut impl FnMut(ObjectId)) {
        self.0.values().for_each(|value| value.for_each_reference(visit));
    }

    fn remap_references(&mut self, map: &mut impl FnMut(ObjectId) -> ObjectId) {
        self.0.values_mut().for_each(|value| value.remap_references(map));
    }
}

impl FromIterator<(Vec<u8>, PdfObject)> for Dictionary {
    fn from_iter<I: IntoIterator<Item = (Vec<u8>, PdfObject)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A stream object. Raw bytes are kept as read; decoding happens on first use.
#[derive(Clone)]
pub struct Stream {
    /// Stream dictionary.
    pub dict: Dictionary,
    raw: Vec<u8>,
    decoded: OnceLock<Vec<u8>>,
}

impl Stream {
    /// Create a stream from its dictionary and undecoded bytes.
    pub fn new(dict: Dictionary, raw: Vec<u8>) -> Self {
        Self {
            dict,
            raw,
            decoded: OnceLock::new(),
        }
    }

    /// The bytes exactly as stored in the file.
    pub fn raw_content(&self) -> &[u8] {
        &self.raw
    }

    /// Whether the stream declares any filter.
    pub fn is_filtered(&self) -> bool {
        self.dict.get(b"Filter").is_some_and(|filter| !filter.is_null())
    }

    /// Decoded bytes, computed once and cached. Failures are not cached.
    pub fn decoded_content(&self) -> Result<&[u8], DecodeError> {
        if let Some(decoded) = self.decoded.get() {
            return Ok(decoded);
        }
        let decoded = filters::decode(&self.dict, &self.raw)?;
        Ok(self.decoded.get_or_init(|| decoded))
    }
}

impl PartialEq for Stream {
    fn eq(&self, other: &Self) -> bool {
        self.dict == other.dict && self.raw == other.raw
    }
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("dict", &self.dict)
            .field("raw_len", &self.raw.len())
            .field("decoded", &self.decoded.get().is_some())
            .finish()
    }
}
