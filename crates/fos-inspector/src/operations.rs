//! Binary tree operations
//!
//! Wire layout, all words `u32` (little-endian once turned into bytes):
//!
//! ```text
//! batch     := renderer_id root_id op*
//! add-root  := ADD id ROOT profiling_supported has_owner_metadata
//! add-node  := ADD id element_type parent_id owner_id string string
//! remove    := REMOVE id
//! string    := byte_len byte*          (one byte per word, 0 = absent)
//! ```

use crate::element::ElementType;
use crate::NodeId;

/// Add opcode
pub const TREE_OPERATION_ADD: u32 = 1;
/// Remove opcode
pub const TREE_OPERATION_REMOVE: u32 = 2;
/// Words taken by the batch header
pub const HEADER_LEN: usize = 2;

/// One non-root node as reported to the remote side
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    pub id: NodeId,
    pub element_type: ElementType,
    pub parent_id: NodeId,
    pub owner_id: Option<NodeId>,
    pub display_name: Option<String>,
    pub key: Option<String>,
}

/// Decoded operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    AddRoot {
        id: NodeId,
        supports_profiling: bool,
        owner_metadata: bool,
    },
    AddNode(NodeRecord),
    Remove {
        id: NodeId,
    },
}

impl Operation {
    pub fn id(&self) -> NodeId {
        match self {
            Self::AddRoot { id, .. } | Self::Remove { id } => *id,
            Self::AddNode(record) => record.id,
        }
    }
}

/// Decoded batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationBatch {
    pub renderer_id: u32,
    pub root_id: NodeId,
    pub operations: Vec<Operation>,
}

/// Pending operations of one batch, header not yet written
#[derive(Debug, Clone, Default)]
pub struct OperationBuffer {
    words: Vec<u32>,
    count: usize,
}

impl OperationBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_add_root(&mut self, id: NodeId, supports_profiling: bool, owner_metadata: bool) {
        self.words.extend_from_slice(&[
            TREE_OPERATION_ADD,
            id.get(),
            ElementType::Root.as_u32(),
            u32::from(supports_profiling),
            u32::from(owner_metadata),
        ]);
        self.count += 1;
    }

    pub fn push_add_node(&mut self, record: &NodeRecord) {
        self.words.extend_from_slice(&[
            TREE_OPERATION_ADD,
            record.id.get(),
            record.element_type.as_u32(),
            record.parent_id.get(),
            record.owner_id.map_or(NodeId::NONE, NodeId::get),
        ]);
        self.push_string(record.display_name.as_deref());
        self.push_string(record.key.as_deref());
        self.count += 1;
    }

    pub fn push_remove(&mut self, id: NodeId) {
        self.words.extend_from_slice(&[TREE_OPERATION_REMOVE, id.get()]);
        self.count += 1;
    }

    fn push_string(&mut self, value: Option<&str>) {
        let bytes = value.unwrap_or_default().as_bytes();
        self.words.reserve(bytes.len() + 1);
        self.words.push(bytes.len() as u32);
        self.words.extend(bytes.iter().map(|&b| u32::from(b)));
    }

    /// Number of operations recorded
    pub fn operation_count(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Encoded body words
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// Header followed by body, in a single allocation
    pub fn finish(&self, renderer_id: u32, root_id: NodeId) -> Vec<u32> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.words.len());
        out.push(renderer_id);
        out.push(root_id.get());
        out.extend_from_slice(&self.words);
        out
    }
}

/// Serialize words as little-endian bytes
pub fn to_le_bytes(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}

/// Parse little-endian bytes back into words
pub fn from_le_bytes(bytes: &[u8]) -> Result<Vec<u32>, DecodeError> {
    if bytes.len() % 4 != 0 {
        return Err(DecodeError::Truncated { expected: "word", offset: bytes.len() / 4 });
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Decoding error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("Truncated buffer: expected {expected} at word {offset}")]
    Truncated { expected: &'static str, offset: usize },

    #[error("Unknown opcode {opcode} at word {offset}")]
    UnknownOpcode { opcode: u32, offset: usize },

    #[error("Unknown element type {value} at word {offset}")]
    UnknownElementType { value: u32, offset: usize },

    #[error("Zero node id at word {offset}")]
    ZeroId { offset: usize },

    #[error("String byte {value} out of range at word {offset}")]
    ByteOutOfRange { value: u32, offset: usize },

    #[error("Invalid UTF-8 string at word {offset}")]
    InvalidUtf8 { offset: usize },
}

struct WordReader<'a> {
    words: &'a [u32],
    pos: usize,
}

impl<'a> WordReader<'a> {
    fn next(&mut self, expected: &'static str) -> Result<u32, DecodeError> {
        let word = self
            .words
            .get(self.pos)
            .copied()
            .ok_or(DecodeError::Truncated { expected, offset: self.pos })?;
        self.pos += 1;
        Ok(word)
    }

    fn id(&mut self, expected: &'static str) -> Result<NodeId, DecodeError> {
        let offset = self.pos;
        NodeId::new(self.next(expected)?).ok_or(DecodeError::ZeroId { offset })
    }

    fn string(&mut self) -> Result<Option<String>, DecodeError> {
        let start = self.pos;
        let len = self.next("string length")? as usize;
        if len == 0 {
            return Ok(None);
        }
        if self.words.len() - self.pos < len {
            return Err(DecodeError::Truncated { expected: "string bytes", offset: self.words.len() });
        }
        let mut bytes = Vec::with_capacity(len);
        for (i, &word) in self.words[self.pos..self.pos + len].iter().enumerate() {
            let byte = u8::try_from(word)
                .map_err(|_| DecodeError::ByteOutOfRange { value: word, offset: self.pos + i })?;
            bytes.push(byte);
        }
        self.pos += len;
        String::from_utf8(bytes)
            .map(Some)
            .map_err(|_| DecodeError::InvalidUtf8 { offset: start })
    }

    fn done(&self) -> bool {
        self.pos >= self.words.len()
    }
}

/// Decode one emitted batch
pub fn decode_batch(words: &[u32]) -> Result<OperationBatch, DecodeError> {
    let mut reader = WordReader { words, pos: 0 };
    let renderer_id = reader.next("renderer id")?;
    let root_id = reader.id("root id")?;
    let mut operations = Vec::new();

    while !reader.done() {
        let offset = reader.pos;
        match reader.next("opcode")? {
            TREE_OPERATION_ADD => {
                let id = reader.id("node id")?;
                let type_offset = reader.pos;
                let raw_type = reader.next("element type")?;
                let element_type = ElementType::try_from(raw_type).map_err(|value| {
                    DecodeError::UnknownElementType { value, offset: type_offset }
                })?;
                if element_type == ElementType::Root {
                    let supports_profiling = reader.next("profiling flag")? != 0;
                    let owner_metadata = reader.next("owner metadata flag")? != 0;
                    operations.push(Operation::AddRoot { id, supports_profiling, owner_metadata });
                } else {
                    let parent_id = reader.id("parent id")?;
                    let owner_id = NodeId::new(reader.next("owner id")?);
                    let display_name = reader.string()?;
                    let key = reader.string()?;
                    operations.push(Operation::AddNode(NodeRecord {
                        id,
                        element_type,
                        parent_id,
                        owner_id,
                        display_name,
                        key,
                    }));
                }
            }
            TREE_OPERATION_REMOVE => {
                let id = reader.id("node id")?;
                operations.push(Operation::Remove { id });
            }
            opcode => return Err(DecodeError::UnknownOpcode { opcode, offset }),
        }
    }

    Ok(OperationBatch { renderer_id, root_id, operations })
}
