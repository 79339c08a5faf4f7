#![forbid(unsafe_code)]
//! A parser for Android OTA `payload.bin` containers.
//!
//! The container is a short big-endian header followed by a protobuf encoded manifest and, for
//! major version 2, a protobuf encoded metadata signature block:
//!
//! ```no_run
//! use ota_payload::{OperationTypeRegistry, parse_payload};
//!
//! let data = std::fs::read("payload.bin").unwrap();
//! let payload = parse_payload(&data).unwrap();
//!
//! let registry = OperationTypeRegistry::update_metadata();
//! for partition in &payload.manifest.partitions {
//!     for op in &partition.operations {
//!         println!("{}: {}", partition.partition_name, registry.name_for(op.r#type));
//!     }
//! }
//! ```

pub use err::{PayloadError, PayloadStage, Result};
pub use op_type::{OperationTypeName, OperationTypeRegistry};
pub use payload_header::{
    BRILLO_MAJOR_PAYLOAD_VERSION, CHROMEOS_MAJOR_PAYLOAD_VERSION, PAYLOAD_MAGIC, PayloadHeader,
};
pub use payload_parser::{ParsedPayload, ParserSettings, PayloadParser, parse_payload};
pub use schema_decoder::{SchemaDecoder, UpdateMetadataDecoder};
pub use statistics::{OperationTypeStats, PartitionStats, PayloadStatistics};
pub use utils::PayloadCursor;

pub mod err;
pub mod update_metadata;

mod op_type;
mod payload_header;
mod payload_parser;
mod schema_decoder;
mod statistics;
mod utils;

#[cfg(test)]
use std::sync::Once;

#[cfg(test)]
static LOGGER_INIT: Once = Once::new();

// Rust runs the tests concurrently, so unless we synchronize logging access
// it will crash when attempting to run `cargo test` with some logging facilities.
#[cfg(test)]
pub fn ensure_env_logger_initialized() {
    use std::io::Write;

    LOGGER_INIT.call_once(|| {
        let mut builder = env_logger::Builder::from_default_env();
        builder
            .format(|buf, record| writeln!(buf, "[{}] - {}", record.level(), record.args()))
            .init();
    });
}
