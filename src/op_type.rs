use std::fmt;
use std::sync::LazyLock;

use hashbrown::HashMap;
use serde::{Serialize, Serializer};

use crate::schema_decoder::{SchemaDecoder, UpdateMetadataDecoder};

static UPDATE_METADATA_REGISTRY: LazyLock<OperationTypeRegistry> =
    LazyLock::new(|| OperationTypeRegistry::from_decoder(&UpdateMetadataDecoder));

/// Result of resolving an operation type code.
///
/// Manifests produced by a newer schema can carry codes this registry has never seen; those
/// resolve to `Unknown` instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OperationTypeName {
    Known(&'static str),
    Unknown(i32),
}

impl OperationTypeName {
    pub fn is_known(&self) -> bool {
        matches!(self, OperationTypeName::Known(_))
    }
}

impl fmt::Display for OperationTypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationTypeName::Known(name) => f.write_str(name),
            OperationTypeName::Unknown(code) => write!(f, "UNKNOWN({code})"),
        }
    }
}

impl Serialize for OperationTypeName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Immutable two-way mapping between operation type codes and their schema names.
#[derive(Debug, Clone)]
pub struct OperationTypeRegistry {
    by_code: HashMap<i32, &'static str>,
    by_name: HashMap<&'static str, i32>,
}

impl OperationTypeRegistry {
    pub fn from_pairs(pairs: impl IntoIterator<Item = (i32, &'static str)>) -> Self {
        let pairs = pairs.into_iter();
        let (lower, _) = pairs.size_hint();
        let mut by_code = HashMap::with_capacity(lower);
        let mut by_name = HashMap::with_capacity(lower);

        for (code, name) in pairs {
            by_code.insert(code, name);
            by_name.insert(name, code);
        }

        OperationTypeRegistry { by_code, by_name }
    }

    pub fn from_decoder<D: SchemaDecoder>(decoder: &D) -> Self {
        Self::from_pairs(decoder.operation_types().iter().copied())
    }

    /// The process-wide registry for `update_metadata.proto`, built on first use.
    pub fn update_metadata() -> &'static OperationTypeRegistry {
        &UPDATE_METADATA_REGISTRY
    }

    pub fn name_for(&self, code: i32) -> OperationTypeName {
        match self.by_code.get(&code) {
            Some(name) => OperationTypeName::Known(*name),
            None => OperationTypeName::Unknown(code),
        }
    }

    pub fn code_for(&self, name: &str) -> Option<i32> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }

    /// All `(code, name)` pairs, ordered by code.
    pub fn entries(&self) -> Vec<(i32, &'static str)> {
        let mut entries: Vec<_> = self.by_code.iter().map(|(c, n)| (*c, *n)).collect();
        entries.sort_unstable();
        entries
    }
}
