//! Closed enumerations presented to the shape and value casting machinery.
//!
//! An [`EnumType`] is a named, ordered set of `(name, value)` members. Member
//! values are usually integers, but may be any constant-castable expression, or
//! something else entirely (such as a string) that makes the enumeration
//! unusable as a shape. An enumeration declared with an explicit [`Shape`]
//! behaves like a typed enumeration: its members carry that shape wherever they
//! are cast, and it validates signal initializers against its own members.

use crate::error::{HdlError, HdlResult};
use crate::repr;
use crate::shape::Shape;
use crate::value::{Const, Value};
use num_bigint::BigInt;
use std::fmt;
use std::sync::Arc;

/// The value attached to an enumeration member.
#[derive(Clone, Debug)]
pub enum MemberValue {
    /// An integer.
    Int(BigInt),
    /// A value expression, usable only if it folds to a constant.
    Expr(Value),
    /// A string, which has no bit-vector interpretation.
    Str(String),
}

impl fmt::Display for MemberValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberValue::Int(v) => write!(f, "{v}"),
            MemberValue::Expr(v) => write!(f, "{v}"),
            MemberValue::Str(s) => f.write_str(&repr::quote(s)),
        }
    }
}

impl From<i64> for MemberValue {
    fn from(value: i64) -> Self {
        MemberValue::Int(value.into())
    }
}

impl From<i32> for MemberValue {
    fn from(value: i32) -> Self {
        MemberValue::Int(value.into())
    }
}

impl From<BigInt> for MemberValue {
    fn from(value: BigInt) -> Self {
        MemberValue::Int(value)
    }
}

impl From<Value> for MemberValue {
    fn from(value: Value) -> Self {
        MemberValue::Expr(value)
    }
}

impl From<&str> for MemberValue {
    fn from(value: &str) -> Self {
        MemberValue::Str(value.to_string())
    }
}

/// A closed enumeration type.
#[derive(Debug)]
pub struct EnumType {
    name: String,
    members: Vec<(String, MemberValue)>,
    shape: Option<Shape>,
}

impl EnumType {
    /// Creates an enumeration without a declared shape.
    pub fn new<N, V>(name: impl Into<String>, members: impl IntoIterator<Item = (N, V)>) -> Arc<EnumType>
    where
        N: Into<String>,
        V: Into<MemberValue>,
    {
        Arc::new(EnumType {
            name: name.into(),
            members: members
                .into_iter()
                .map(|(n, v)| (n.into(), v.into()))
                .collect(),
            shape: None,
        })
    }

    /// Creates an enumeration whose members are always cast to `shape`.
    pub fn with_shape<N, V>(
        name: impl Into<String>,
        shape: Shape,
        members: impl IntoIterator<Item = (N, V)>,
    ) -> Arc<EnumType>
    where
        N: Into<String>,
        V: Into<MemberValue>,
    {
        Arc::new(EnumType {
            name: name.into(),
            members: members
                .into_iter()
                .map(|(n, v)| (n.into(), v.into()))
                .collect(),
            shape: Some(shape),
        })
    }

    /// Returns the type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared shape, if the enumeration is typed.
    pub fn declared_shape(&self) -> Option<Shape> {
        self.shape
    }

    /// Returns the number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns `true` if the enumeration has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Looks a member up by name.
    pub fn member(self: &Arc<Self>, name: &str) -> Option<EnumMember> {
        self.members
            .iter()
            .position(|(n, _)| n == name)
            .map(|index| EnumMember {
                ty: Arc::clone(self),
                index,
            })
    }

    /// Iterates over the members in declaration order.
    pub fn members(self: &Arc<Self>) -> impl Iterator<Item = EnumMember> + '_ {
        (0..self.members.len()).map(move |index| EnumMember {
            ty: Arc::clone(self),
            index,
        })
    }

    /// Folds every member value to a constant.
    ///
    /// Fails if any member value is not constant-castable.
    pub fn const_members(&self) -> HdlResult<Vec<(String, Const)>> {
        self.members
            .iter()
            .map(|(name, value)| {
                let folded = member_const(value).ok_or_else(|| {
                    HdlError::type_error(
                        "Only enumerations whose members have constant-castable values can be \
                         used in Amaranth code",
                    )
                })?;
                Ok((name.clone(), folded))
            })
            .collect()
    }

    /// Returns `true` if every member value is constant-castable.
    pub fn is_castable(&self) -> bool {
        self.members.iter().all(|(_, v)| member_const(v).is_some())
    }

    /// Returns the shape members are cast to: the declared shape, or the
    /// narrowest shape holding every member value.
    pub fn shape(&self) -> HdlResult<Shape> {
        let members = self.const_members()?;
        Ok(self
            .shape
            .unwrap_or_else(|| Shape::unify(members.iter().map(|(_, c)| c.shape()))))
    }

    /// Resolves a signal initializer against a typed enumeration.
    ///
    /// No initializer selects the member whose value is zero. An initializer
    /// may name a member of this enumeration or give a member's value.
    pub fn const_value(self: &Arc<Self>, init: Option<&crate::cast::ValueLike>) -> HdlResult<Const> {
        use crate::cast::ValueLike;

        let shape = self.shape()?;
        let members = self.const_members()?;
        let wanted = match init {
            None => BigInt::from(0),
            Some(ValueLike::Member(m)) if Arc::ptr_eq(&m.ty, self) => {
                members[m.index].1.value().clone()
            }
            Some(ValueLike::Int(v)) => v.clone(),
            Some(other) => {
                return Err(HdlError::type_error(format!(
                    "{other} is not a member of {self}"
                )))
            }
        };
        members
            .iter()
            .find(|(_, c)| *c.value() == wanted)
            .map(|(_, c)| Const::with_shape(c.value().clone(), shape))
            .ok_or_else(|| HdlError::value_error(format!("{wanted} is not a valid {}", self.name)))
    }
}

impl fmt::Display for EnumType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<enum '{}'>", self.name)
    }
}

fn member_const(value: &MemberValue) -> Option<Const> {
    match value {
        MemberValue::Int(v) => Some(Const::of(v.clone())),
        MemberValue::Expr(v) => Const::cast(v.clone()).ok(),
        MemberValue::Str(_) => None,
    }
}

/// One member of an [`EnumType`].
#[derive(Clone, Debug)]
pub struct EnumMember {
    ty: Arc<EnumType>,
    index: usize,
}

impl EnumMember {
    /// Returns the enumeration this member belongs to.
    pub fn enum_type(&self) -> &Arc<EnumType> {
        &self.ty
    }

    /// Returns the member name.
    pub fn name(&self) -> &str {
        &self.ty.members[self.index].0
    }

    /// Returns the raw member value.
    pub fn value(&self) -> &MemberValue {
        &self.ty.members[self.index].1
    }

    /// Returns `true` if the member's enumeration has a declared shape.
    pub fn is_typed(&self) -> bool {
        self.ty.shape.is_some()
    }

    /// Casts the member to a constant in its enumeration's shape.
    pub fn to_const(&self) -> HdlResult<Const> {
        let shape = self.ty.shape()?;
        let folded = member_const(self.value()).ok_or_else(|| {
            HdlError::type_error(
                "Only enumerations whose members have constant-castable values can be used in \
                 Amaranth code",
            )
        })?;
        Ok(Const::with_shape(folded.value().clone(), shape))
    }
}

impl PartialEq for EnumMember {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.ty, &other.ty) && self.index == other.index
    }
}

impl Eq for EnumMember {}

impl fmt::Display for EnumMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}.{}: {}>", self.ty.name, self.name(), self.value())
    }
}
