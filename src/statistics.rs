//! Per operation type and per partition summaries of a manifest.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::op_type::{OperationTypeName, OperationTypeRegistry};
use crate::payload_parser::ParsedPayload;
use crate::update_metadata::{DeltaArchiveManifest, Extent, InstallOperation};

const DEFAULT_BLOCK_SIZE: u32 = 4096;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OperationTypeStats {
    pub operations: u64,
    /// Destination blocks written by operations of this type.
    pub blocks: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartitionStats {
    pub name: String,
    pub operations: u64,
    pub blocks: u64,
    pub old_size: Option<u64>,
    pub new_size: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PayloadStatistics {
    pub block_size: u32,
    pub total_operations: u64,
    pub total_blocks: u64,
    pub by_operation_type: BTreeMap<OperationTypeName, OperationTypeStats>,
    pub partitions: Vec<PartitionStats>,
}

fn extent_blocks(extents: &[Extent]) -> u64 {
    extents
        .iter()
        .fold(0_u64, |acc, e| acc.saturating_add(e.num_blocks.unwrap_or(0)))
}

fn operation_blocks(op: &InstallOperation) -> u64 {
    extent_blocks(&op.dst_extents)
}

impl PayloadStatistics {
    pub fn from_manifest(
        manifest: &DeltaArchiveManifest,
        registry: &OperationTypeRegistry,
    ) -> Self {
        let mut by_operation_type: BTreeMap<OperationTypeName, OperationTypeStats> =
            BTreeMap::new();
        let mut partitions = Vec::with_capacity(manifest.partitions.len());
        let mut total_operations = 0_u64;
        let mut total_blocks = 0_u64;

        for partition in &manifest.partitions {
            let mut part_blocks = 0_u64;

            for op in &partition.operations {
                let blocks = operation_blocks(op);
                let entry = by_operation_type
                    .entry(registry.name_for(op.r#type))
                    .or_default();
                entry.operations += 1;
                entry.blocks = entry.blocks.saturating_add(blocks);
                part_blocks = part_blocks.saturating_add(blocks);
            }

            total_operations += partition.operations.len() as u64;
            total_blocks = total_blocks.saturating_add(part_blocks);

            partitions.push(PartitionStats {
                name: partition.partition_name.clone(),
                operations: partition.operations.len() as u64,
                blocks: part_blocks,
                old_size: partition.old_partition_info.as_ref().and_then(|i| i.size),
                new_size: partition.new_partition_info.as_ref().and_then(|i| i.size),
            });
        }

        PayloadStatistics {
            block_size: manifest.block_size.unwrap_or(DEFAULT_BLOCK_SIZE),
            total_operations,
            total_blocks,
            by_operation_type,
            partitions,
        }
    }
}

impl<S> ParsedPayload<DeltaArchiveManifest, S> {
    pub fn statistics(&self) -> PayloadStatistics {
        PayloadStatistics::from_manifest(&self.manifest, OperationTypeRegistry::update_metadata())
    }
}

/// One `NAME : N Blocks` line per operation type.
impl fmt::Display for PayloadStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, stats) in &self.by_operation_type {
            writeln!(f, "{name} : {} Blocks", stats.blocks)?;
        }
        Ok(())
    }
}
