//! Enum name tables
//!
//! Engine enums and flag sets are written to markup as bare names. A table
//! of `EnumEntry` pairs maps between the symbolic names and their values.

use crate::variable::Variable;

/// One name/value pair of an enum table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumEntry<T> {
    pub name: &'static str,
    pub value: T,
}

impl<T> EnumEntry<T> {
    pub const fn new(name: &'static str, value: T) -> Self {
        Self { name, value }
    }
}

/// Value registered under `name`
pub fn enum_value<T: Copy>(table: &[EnumEntry<T>], name: &str) -> Option<T> {
    table.iter().find(|e| e.name == name).map(|e| e.value)
}

pub fn enum_value_or<T: Copy>(table: &[EnumEntry<T>], name: &str, default: T) -> T {
    enum_value(table, name).unwrap_or(default)
}

/// First name registered for `value`
pub fn enum_name<T: Copy + PartialEq>(table: &[EnumEntry<T>], value: T) -> Option<&'static str> {
    table.iter().find(|e| e.value == value).map(|e| e.name)
}

impl Variable {
    /// Enum literal for `value`, if the table knows it
    pub fn from_enum<T: Copy + PartialEq>(table: &[EnumEntry<T>], value: T) -> Option<Variable> {
        enum_name(table, value).map(Variable::enum_name)
    }

    /// Value of an enum literal, or `default` when this is not an enum
    /// literal or the name is unknown
    pub fn to_enum<T: Copy>(&self, table: &[EnumEntry<T>], default: T) -> T {
        match self {
            Variable::Enum(Some(name)) => enum_value_or(table, name, default),
            _ => default,
        }
    }
}
