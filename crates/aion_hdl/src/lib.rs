//! The value and shape algebra of the Aion hardware description layer.
//!
//! A design is described with [`Value`] expressions over [`Signal`]s and
//! [`Const`]s. Every value has a [`Shape`] (a width and a signedness) that is
//! inferred bit-exactly from its operands, and renders to a canonical
//! prefix-notation form such as `(+ (sig a) (const 4'd1))` that is stable
//! enough to compare against in tests.
//!
//! User types take part through the casting protocol in [`cast`]: anything
//! implementing [`ShapeCastable`] can stand in for a shape, and anything
//! implementing [`ValueCastable`] can stand in for a value. Construction-time
//! mistakes that are legal but suspicious are reported through the scoped
//! warning channel in [`warnings`].

#![warn(missing_docs)]

pub mod array;
pub mod cast;
pub mod const_value;
pub mod enums;
pub mod error;
pub mod format;
pub mod io;
pub mod ops;
pub mod repr;
pub mod shape;
pub mod signal;
pub mod slice;
pub mod stmt;
pub mod switch;
pub mod value;
pub mod warnings;

pub use array::{Array, ArrayProxy, Element, Record};
pub use cast::{ShapeCastable, ShapeLike, ValueCastable, ValueLike};
pub use const_value::Const;
pub use enums::{EnumMember, EnumType, MemberValue};
pub use error::{ErrorKind, HdlError, HdlResult};
pub use format::{Chunk, Format, FormatArg, FormatArray, FormatEnum, FormatLike, FormatStruct};
pub use io::{io_cat, IoConcat, IoLike, IoPort, IoSlice, IoValue};
pub use ops::{Op, Operator};
pub use shape::{bits_for, range, signed, unsigned, IntRange, Shape};
pub use signal::{Decoder, Signal, SignalBuilder};
pub use slice::{Index, Part, Slice};
pub use stmt::{Assign, Print, Property, PropertyKind, Statement, Switch};
pub use switch::{mux, normalize_patterns, Pattern, SwitchValue};
pub use value::{cat, ClockSignal, Concat, Initial, ResetSignal, Value};
