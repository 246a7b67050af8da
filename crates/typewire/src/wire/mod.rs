// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wire codec: byte cursors, the type-definition codec with its
//! per-connection cache, and the value payload codec.
//!
//! Nothing here performs I/O. Both directions operate over in-memory
//! buffers supplied by the transport layer, which owns framing, short-read
//! handling and retries. Decode failures poison the cursor; the transport
//! checks [`ReadCursor::good`] once per pass and resynchronizes or closes
//! the connection on failure.

mod cursor;
mod types;
mod values;

pub use cursor::{ReadCursor, WriteCursor};
pub use types::{
    decode_type, decode_type_or_null, encode_type, encode_type_literal, TypeStore,
    OP_CACHE_DEFINE, OP_CACHE_FETCH, OP_NULL_TYPE,
};
pub use values::{decode_value, encode_value};
