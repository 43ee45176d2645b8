//! # tlschema: TL schema compiler and binary layout engine
//!
//! Compiles TL (Type Language) schemas, the declaration language of MTProto,
//! into a runtime model that reads and writes the TL wire format in place.
//!
//! ## Schema language
//!
//! ```text
//! resPQ#05162463 nonce:int128 server_nonce:int128 pq:bytes
//!     server_public_key_fingerprints:Vector<long> = ResPQ;
//! message#1 flags:# out:flags.1?true reply_to:flags.3?int text:string = Message;
//! peerUser#59511722 user_id:long = Peer;
//! peerChat#36c6019a chat_id:long = Peer;
//! ---functions---
//! req_pq#60469778 nonce:int128 = ResPQ;
//! ```
//!
//! Constructors sharing a result type form a union (`Peer`), dispatched on
//! the leading 4-byte tag. `flags.N?T` fields exist on the wire only when bit
//! `N` of the named `#` field is set.
//!
//! ## Wire format
//!
//! - Little-endian. Boxed values carry a 4-byte constructor tag; bare values don't.
//! - `int` / `#` = 4 bytes, `long` / `double` = 8, `int128` = 16, `int256` = 32.
//! - `bytes` / `string`: 1-byte length (<= 253) or `0xFE` + 3-byte length,
//!   then data, zero-padded to a multiple of 4.
//! - `Vector<T>`: tag `0x1cb5c415`, 4-byte count, elements. `vector<T>` omits the tag.
//!
//! ## Two ways to use a schema
//!
//! - At runtime: [`Codec`] interprets the compiled [`Schema`]. It measures
//!   ([`Codec::size_of`]), decodes ([`Codec::read`]), views lazily
//!   ([`CombinatorView`]) and builds ([`Codec::build`], [`CombinatorWriter`]).
//! - Ahead of time: [`codegen::generate`] (and the `tlgen` binary) emits Rust
//!   source with one zero-copy view type per combinator, built on [`layout`].
//!
//! Decode errors from untrusted input are returned as [`TlError`] values;
//! nothing in the read path panics on malformed bytes.

pub mod ast;
pub mod codec;
pub mod codegen;
pub mod dump;
pub mod error;
pub mod layout;
pub mod lexer;
pub mod parser;
pub mod schema;
pub mod value;
pub mod view;

pub use ast::{Argument, CombinatorDeclaration, Conditional, TypeTerm};
pub use codec::{Codec, SizeInputs};
pub use codegen::{generate, GeneratorOptions};
pub use error::{Result, TlError};
pub use layout::{get_layout_profile, reset_layout_profile};
pub use parser::parse;
pub use schema::{FieldKind, FieldLayout, Schema, TypeGroup};
pub use value::{FieldValues, Object, Value};
pub use view::{CombinatorView, CombinatorWriter};

/// Compile schema text into a [`Schema`] (shorthand for [`Schema::compile`]).
pub fn parse_schema(source: &str) -> Result<Schema> {
    Schema::compile(source)
}
