mod byte_cursor;
pub(crate) mod bytes;

pub use self::byte_cursor::PayloadCursor;
