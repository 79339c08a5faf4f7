//! Message types of the `update_metadata.proto` schema (package `chromeos_update_engine`).
//!
//! These are declared with `prost` derives rather than generated at build time, so the crate
//! builds without `protoc`. Field numbers and labels follow the upstream schema; fields removed
//! upstream (the pre-partition `install_operations`, kernel/rootfs info) are left out and will be
//! skipped as unknown fields when present.
//!
//! Only the subset of the schema needed to inspect a payload is modelled here. The semantics of
//! the operations themselves are not interpreted by this crate.

use serde::{Serialize, Serializer};

fn opt_bytes_as_hex<S: Serializer>(
    bytes: &Option<Vec<u8>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match bytes {
        Some(bytes) => {
            let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
            serializer.serialize_some(&hex)
        }
        None => serializer.serialize_none(),
    }
}

/// A contiguous run of blocks on a partition.
#[derive(Clone, Copy, PartialEq, Serialize, ::prost::Message)]
pub struct Extent {
    #[prost(uint64, optional, tag = "1")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_block: Option<u64>,
    #[prost(uint64, optional, tag = "2")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_blocks: Option<u64>,
}

/// The metadata signature block (and the payload signature stored in the data blobs).
#[derive(Clone, PartialEq, Serialize, ::prost::Message)]
pub struct Signatures {
    #[prost(message, repeated, tag = "1")]
    pub signatures: Vec<signatures::Signature>,
}

pub mod signatures {
    use super::opt_bytes_as_hex;
    use serde::Serialize;

    #[derive(Clone, PartialEq, Serialize, ::prost::Message)]
    pub struct Signature {
        /// Deprecated upstream, kept for old payloads.
        #[prost(uint32, optional, tag = "1")]
        #[serde(skip_serializing_if = "Option::is_none")]
        pub version: Option<u32>,
        #[prost(bytes = "vec", optional, tag = "2")]
        #[serde(
            serialize_with = "opt_bytes_as_hex",
            skip_serializing_if = "Option::is_none"
        )]
        pub data: Option<Vec<u8>>,
        #[prost(fixed32, optional, tag = "3")]
        #[serde(skip_serializing_if = "Option::is_none")]
        pub unpadded_signature_size: Option<u32>,
    }
}

#[derive(Clone, PartialEq, Serialize, ::prost::Message)]
pub struct PartitionInfo {
    #[prost(uint64, optional, tag = "1")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[prost(bytes = "vec", optional, tag = "2")]
    #[serde(
        serialize_with = "opt_bytes_as_hex",
        skip_serializing_if = "Option::is_none"
    )]
    pub hash: Option<Vec<u8>>,
}

#[derive(Clone, PartialEq, Serialize, ::prost::Message)]
pub struct InstallOperation {
    #[prost(enumeration = "install_operation::Type", required, tag = "1")]
    pub r#type: i32,
    /// Offset of the operation blob, relative to the end of the metadata signature.
    #[prost(uint64, optional, tag = "2")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_offset: Option<u64>,
    #[prost(uint64, optional, tag = "3")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_length: Option<u64>,
    #[prost(message, repeated, tag = "4")]
    pub src_extents: Vec<Extent>,
    #[prost(uint64, optional, tag = "5")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src_length: Option<u64>,
    #[prost(message, repeated, tag = "6")]
    pub dst_extents: Vec<Extent>,
    #[prost(uint64, optional, tag = "7")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dst_length: Option<u64>,
    #[prost(bytes = "vec", optional, tag = "8")]
    #[serde(
        serialize_with = "opt_bytes_as_hex",
        skip_serializing_if = "Option::is_none"
    )]
    pub data_sha256_hash: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "9")]
    #[serde(
        serialize_with = "opt_bytes_as_hex",
        skip_serializing_if = "Option::is_none"
    )]
    pub src_sha256_hash: Option<Vec<u8>>,
}

pub mod install_operation {
    /// `InstallOperation.Type`.
    ///
    /// `MOVE` and `BSDIFF` are deprecated upstream but still appear in old full payloads.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Type {
        Replace = 0,
        ReplaceBz = 1,
        Move = 2,
        Bsdiff = 3,
        SourceCopy = 4,
        SourceBsdiff = 5,
        Zero = 6,
        Discard = 7,
        ReplaceXz = 8,
        Puffdiff = 9,
        BrotliBsdiff = 10,
        Zucchini = 11,
        Lz4diffBsdiff = 12,
        Lz4diffPuffdiff = 13,
    }

    impl Type {
        /// Every declared value, in code order.
        pub const ALL: [Type; 14] = [
            Type::Replace,
            Type::ReplaceBz,
            Type::Move,
            Type::Bsdiff,
            Type::SourceCopy,
            Type::SourceBsdiff,
            Type::Zero,
            Type::Discard,
            Type::ReplaceXz,
            Type::Puffdiff,
            Type::BrotliBsdiff,
            Type::Zucchini,
            Type::Lz4diffBsdiff,
            Type::Lz4diffPuffdiff,
        ];

        /// The value name as written in the `.proto` file.
        pub const fn as_str_name(&self) -> &'static str {
            match self {
                Type::Replace => "REPLACE",
                Type::ReplaceBz => "REPLACE_BZ",
                Type::Move => "MOVE",
                Type::Bsdiff => "BSDIFF",
                Type::SourceCopy => "SOURCE_COPY",
                Type::SourceBsdiff => "SOURCE_BSDIFF",
                Type::Zero => "ZERO",
                Type::Discard => "DISCARD",
                Type::ReplaceXz => "REPLACE_XZ",
                Type::Puffdiff => "PUFFDIFF",
                Type::BrotliBsdiff => "BROTLI_BSDIFF",
                Type::Zucchini => "ZUCCHINI",
                Type::Lz4diffBsdiff => "LZ4DIFF_BSDIFF",
                Type::Lz4diffPuffdiff => "LZ4DIFF_PUFFDIFF",
            }
        }
    }
}

/// `(code, name)` for every declared `InstallOperation.Type`, in code order.
pub const OPERATION_TYPES: [(i32, &str); install_operation::Type::ALL.len()] = {
    let mut table = [(0, ""); install_operation::Type::ALL.len()];
    let mut i = 0;
    while i < table.len() {
        let ty = install_operation::Type::ALL[i];
        table[i] = (ty as i32, ty.as_str_name());
        i += 1;
    }
    table
};

#[derive(Clone, PartialEq, Serialize, ::prost::Message)]
pub struct CowMergeOperation {
    #[prost(enumeration = "cow_merge_operation::Type", optional, tag = "1")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#type: Option<i32>,
    #[prost(message, optional, tag = "2")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src_extent: Option<Extent>,
    #[prost(message, optional, tag = "3")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dst_extent: Option<Extent>,
    #[prost(uint32, optional, tag = "4")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src_offset: Option<u32>,
}

pub mod cow_merge_operation {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Type {
        CowCopy = 0,
        CowXor = 1,
        CowReplace = 2,
    }
}

#[derive(Clone, PartialEq, Serialize, ::prost::Message)]
pub struct PartitionUpdate {
    #[prost(string, required, tag = "1")]
    pub partition_name: String,
    #[prost(bool, optional, tag = "2")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_postinstall: Option<bool>,
    #[prost(string, optional, tag = "3")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postinstall_path: Option<String>,
    #[prost(string, optional, tag = "4")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filesystem_type: Option<String>,
    #[prost(message, repeated, tag = "5")]
    pub new_partition_signature: Vec<signatures::Signature>,
    #[prost(message, optional, tag = "6")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_partition_info: Option<PartitionInfo>,
    #[prost(message, optional, tag = "7")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_partition_info: Option<PartitionInfo>,
    #[prost(message, repeated, tag = "8")]
    pub operations: Vec<InstallOperation>,
    #[prost(bool, optional, tag = "9")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postinstall_optional: Option<bool>,
    #[prost(message, optional, tag = "10")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash_tree_data_extent: Option<Extent>,
    #[prost(message, optional, tag = "11")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash_tree_extent: Option<Extent>,
    #[prost(string, optional, tag = "12")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash_tree_algorithm: Option<String>,
    #[prost(bytes = "vec", optional, tag = "13")]
    #[serde(
        serialize_with = "opt_bytes_as_hex",
        skip_serializing_if = "Option::is_none"
    )]
    pub hash_tree_salt: Option<Vec<u8>>,
    #[prost(message, optional, tag = "14")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fec_data_extent: Option<Extent>,
    #[prost(message, optional, tag = "15")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fec_extent: Option<Extent>,
    #[prost(uint32, optional, tag = "16", default = "2")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fec_roots: Option<u32>,
    #[prost(string, optional, tag = "17")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[prost(message, repeated, tag = "18")]
    pub merge_operations: Vec<CowMergeOperation>,
    #[prost(uint64, optional, tag = "19")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimate_cow_size: Option<u64>,
}

#[derive(Clone, PartialEq, Serialize, ::prost::Message)]
pub struct DynamicPartitionGroup {
    #[prost(string, required, tag = "1")]
    pub name: String,
    #[prost(uint64, optional, tag = "2")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[prost(string, repeated, tag = "3")]
    pub partition_names: Vec<String>,
}

#[derive(Clone, PartialEq, Serialize, ::prost::Message)]
pub struct DynamicPartitionMetadata {
    #[prost(message, repeated, tag = "1")]
    pub groups: Vec<DynamicPartitionGroup>,
    #[prost(bool, optional, tag = "2")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_enabled: Option<bool>,
    #[prost(bool, optional, tag = "3")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vabc_enabled: Option<bool>,
    #[prost(string, optional, tag = "4")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vabc_compression_param: Option<String>,
    #[prost(uint32, optional, tag = "5")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cow_version: Option<u32>,
}

#[derive(Clone, PartialEq, Serialize, ::prost::Message)]
pub struct ApexInfo {
    #[prost(string, optional, tag = "1")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,
    #[prost(int64, optional, tag = "2")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
    #[prost(bool, optional, tag = "3")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_compressed: Option<bool>,
    #[prost(int64, optional, tag = "4")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decompressed_size: Option<i64>,
}

/// The payload manifest.
#[derive(Clone, PartialEq, Serialize, ::prost::Message)]
pub struct DeltaArchiveManifest {
    #[prost(uint32, optional, tag = "3", default = "4096")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_size: Option<u32>,
    /// Location of the payload signature, relative to the end of the metadata signature.
    #[prost(uint64, optional, tag = "4")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signatures_offset: Option<u64>,
    #[prost(uint64, optional, tag = "5")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signatures_size: Option<u64>,
    #[prost(uint32, optional, tag = "12", default = "0")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minor_version: Option<u32>,
    #[prost(message, repeated, tag = "13")]
    pub partitions: Vec<PartitionUpdate>,
    #[prost(int64, optional, tag = "14")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_timestamp: Option<i64>,
    #[prost(message, optional, tag = "15")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dynamic_partition_metadata: Option<DynamicPartitionMetadata>,
    #[prost(bool, optional, tag = "16")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial_update: Option<bool>,
    #[prost(message, repeated, tag = "17")]
    pub apex_info: Vec<ApexInfo>,
    #[prost(string, optional, tag = "18")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_patch_level: Option<String>,
}
