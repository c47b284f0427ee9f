//! Variant values
//!
//! A `Variable` is the scalar payload of a markup element and of engine
//! command parameters. It knows how to read itself from text (inferring its
//! kind from the lexical shape when it has none yet) and how to write itself
//! back.
//!
//! Parsing reports the number of bytes consumed; `0` means "nothing here",
//! which callers use both for malformed literals and for the end of a list.

use std::fmt;

/// Kind tag of a `Variable`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VarType {
    Undefined,
    Int,
    Dword,
    Bool,
    Float,
    String,
    Enum,
}

impl VarType {
    pub fn name(&self) -> &'static str {
        match self {
            VarType::Undefined => "undefined",
            VarType::Int => "int",
            VarType::Dword => "dword",
            VarType::Bool => "bool",
            VarType::Float => "float",
            VarType::String => "string",
            VarType::Enum => "enum",
        }
    }
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Text written for a string or enum value that was never set
pub const NULL_TEXT: &str = "(null)";

/// A typed scalar
#[derive(Debug, Clone, Default)]
pub enum Variable {
    #[default]
    Undefined,
    Int(i32),
    Dword(u32),
    Bool(bool),
    Float(f32),
    /// Quoted on output; `None` is an unset string
    String(Option<String>),
    /// Written bare on output; `None` is an unset name
    Enum(Option<String>),
}

// ============================================================================
// Character classes
// ============================================================================

/// Characters allowed in element names and enum literals
pub fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '-' | '.' | '?' | '@' | '_' | '`')
}

/// Characters that may legally follow a numeric literal
fn is_value_terminator(c: char) -> bool {
    c.is_whitespace() || matches!(c, ',' | '{' | '}' | ';' | '/')
}

fn digit_run(text: &str) -> usize {
    text.bytes().take_while(|b| b.is_ascii_digit()).count()
}

fn starts_with_digit(text: &str) -> bool {
    text.bytes().next().is_some_and(|b| b.is_ascii_digit())
}

/// `text` begins with `word` and the word is not the prefix of a longer name
fn starts_with_word(text: &str, word: &str) -> bool {
    text.starts_with(word) && !text[word.len()..].chars().next().is_some_and(is_name_char)
}

// ============================================================================
// Kind inference
// ============================================================================

/// Classify the digits-led tail of a number: float, int, or an enum literal
/// that merely starts with a digit.
fn classify_number(text: &str) -> VarType {
    let rest = &text[digit_run(text)..];
    match rest.chars().next() {
        Some('.') => VarType::Float,
        None => VarType::Int,
        Some(c) if is_value_terminator(c) => VarType::Int,
        Some(_) => VarType::Enum,
    }
}

/// Decide which kind `text` holds, from its first few characters
pub fn infer_kind(text: &str) -> VarType {
    let mut chars = text.chars();
    let first = chars.next();
    let second = chars.next();

    match first {
        Some('"') => VarType::String,
        Some(c) if c.is_ascii_digit() => {
            if second == Some('x') {
                VarType::Dword
            } else {
                classify_number(text)
            }
        }
        _ if starts_with_word(text, "true") || starts_with_word(text, "false") => VarType::Bool,
        Some('-') => {
            let rest = &text[1..];
            if starts_with_digit(rest) {
                // A fraction after the digits still makes it a float
                match classify_number(rest) {
                    VarType::Float => VarType::Float,
                    _ => VarType::Int,
                }
            } else if rest.starts_with('-') && starts_with_digit(&rest[1..]) {
                VarType::Int
            } else {
                VarType::Enum
            }
        }
        Some('.') if second.is_some_and(|c| c.is_ascii_digit()) => VarType::Float,
        _ => VarType::Enum,
    }
}

// ============================================================================
// Parsing with a fixed kind
// ============================================================================

fn parse_int(text: &str) -> Option<(i32, usize)> {
    let sign = usize::from(text.starts_with('-'));
    let digits = digit_run(&text[sign..]);
    if digits == 0 {
        return None;
    }
    let len = sign + digits;
    text[..len].parse().ok().map(|v| (v, len))
}

fn parse_dword(text: &str) -> Option<(u32, usize)> {
    if text.starts_with("0x") || text.starts_with("0X") {
        let hex = text[2..]
            .bytes()
            .take_while(|b| b.is_ascii_hexdigit())
            .count();
        if hex == 0 {
            return None;
        }
        let len = 2 + hex;
        u32::from_str_radix(&text[2..len], 16).ok().map(|v| (v, len))
    } else {
        let len = digit_run(text);
        if len == 0 {
            return None;
        }
        text[..len].parse().ok().map(|v| (v, len))
    }
}

fn parse_float(text: &str) -> Option<(f32, usize)> {
    let sign = usize::from(text.starts_with('-'));
    let whole = digit_run(&text[sign..]);
    let mut len = sign + whole;
    let mut fraction = 0;
    if text[len..].starts_with('.') {
        fraction = digit_run(&text[len + 1..]);
        len += 1 + fraction;
    }
    if whole + fraction == 0 {
        return None;
    }
    text[..len].parse().ok().map(|v| (v, len))
}

fn parse_bool(text: &str) -> Option<(bool, usize)> {
    if starts_with_word(text, "true") {
        Some((true, 4))
    } else if starts_with_word(text, "false") {
        Some((false, 5))
    } else {
        None
    }
}

fn parse_string(text: &str) -> Option<(String, usize)> {
    let body = text.strip_prefix('"')?;
    let end = body.find('"')?;
    Some((body[..end].to_string(), end + 2))
}

fn parse_name(text: &str) -> Option<(String, usize)> {
    let len: usize = text
        .chars()
        .take_while(|&c| is_name_char(c))
        .map(char::len_utf8)
        .sum();
    (len > 0).then(|| (text[..len].to_string(), len))
}

// ============================================================================
// Variable
// ============================================================================

impl Variable {
    pub fn string(value: impl Into<String>) -> Self {
        Variable::String(Some(value.into()))
    }

    pub fn enum_name(value: impl Into<String>) -> Self {
        Variable::Enum(Some(value.into()))
    }

    pub fn kind(&self) -> VarType {
        match self {
            Variable::Undefined => VarType::Undefined,
            Variable::Int(_) => VarType::Int,
            Variable::Dword(_) => VarType::Dword,
            Variable::Bool(_) => VarType::Bool,
            Variable::Float(_) => VarType::Float,
            Variable::String(_) => VarType::String,
            Variable::Enum(_) => VarType::Enum,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Variable::Undefined)
    }

    /// Empty value of the given kind (zero, false, or an unset string)
    pub fn empty_of(kind: VarType) -> Self {
        match kind {
            VarType::Undefined => Variable::Undefined,
            VarType::Int => Variable::Int(0),
            VarType::Dword => Variable::Dword(0),
            VarType::Bool => Variable::Bool(false),
            VarType::Float => Variable::Float(0.0),
            VarType::String => Variable::String(None),
            VarType::Enum => Variable::Enum(None),
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match *self {
            Variable::Int(v) => Some(v),
            Variable::Dword(v) => Some(v as i32),
            Variable::Float(v) => Some(v as i32),
            Variable::Bool(v) => Some(i32::from(v)),
            _ => None,
        }
    }

    pub fn as_dword(&self) -> Option<u32> {
        match *self {
            Variable::Dword(v) => Some(v),
            Variable::Int(v) => Some(v as u32),
            Variable::Float(v) => Some(v as u32),
            Variable::Bool(v) => Some(u32::from(v)),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match *self {
            Variable::Float(v) => Some(v),
            Variable::Int(v) => Some(v as f32),
            Variable::Dword(v) => Some(v as f32),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Variable::Bool(v) => Some(v),
            Variable::Int(v) => Some(v != 0),
            Variable::Dword(v) => Some(v != 0),
            _ => None,
        }
    }

    /// Text payload of a string or enum value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Variable::String(s) | Variable::Enum(s) => s.as_deref(),
            _ => None,
        }
    }

    /// Parse a value of exactly `kind` from the start of `text`.
    ///
    /// `VarType::Undefined` infers the kind first.
    pub fn parse_as(kind: VarType, text: &str) -> Option<(Variable, usize)> {
        match kind {
            VarType::Undefined => Self::parse_as(infer_kind(text), text),
            VarType::Int => parse_int(text).map(|(v, n)| (Variable::Int(v), n)),
            VarType::Dword => parse_dword(text).map(|(v, n)| (Variable::Dword(v), n)),
            VarType::Bool => parse_bool(text).map(|(v, n)| (Variable::Bool(v), n)),
            VarType::Float => parse_float(text).map(|(v, n)| (Variable::Float(v), n)),
            VarType::String => parse_string(text).map(|(v, n)| (Variable::String(Some(v)), n)),
            VarType::Enum => parse_name(text).map(|(v, n)| (Variable::Enum(Some(v)), n)),
        }
    }

    /// Read a value from the start of `text`, keeping the current kind if
    /// there is one. Returns bytes consumed; `0` leaves the value untouched.
    pub fn parse(&mut self, text: &str) -> usize {
        self.try_parse(text).unwrap_or(0)
    }

    /// `parse` with the "nothing here" case spelled out
    pub fn try_parse(&mut self, text: &str) -> Option<usize> {
        let (value, consumed) = Self::parse_as(self.kind(), text)?;
        *self = value;
        Some(consumed)
    }

    /// Parse a comma-separated parameter list such as `1, "two", three`.
    ///
    /// Stops quietly at the first position that does not hold a value and
    /// returns the values read plus the bytes consumed up to the last one.
    pub fn parse_list(text: &str) -> (Vec<Variable>, usize) {
        let mut values = Vec::new();
        let mut pos = 0;
        let mut cursor = skip_blanks(text, 0);

        loop {
            let mut value = Variable::Undefined;
            let Some(consumed) = value.try_parse(&text[cursor..]) else {
                break;
            };
            values.push(value);
            pos = cursor + consumed;

            let after = skip_blanks(text, pos);
            if !text[after..].starts_with(',') {
                break;
            }
            cursor = skip_blanks(text, after + 1);
        }

        (values, pos)
    }

    /// Markup text for this value.
    ///
    /// Reading it back infers the kind again, so an enum name spelled like
    /// another literal (`true`, `12`) comes back as that kind, and floats
    /// keep only what `format_float` prints.
    pub fn to_markup(&self) -> String {
        self.to_string()
    }
}

fn skip_blanks(text: &str, from: usize) -> usize {
    from + text[from..]
        .bytes()
        .take_while(|b| matches!(b, b' ' | b'\t'))
        .count()
}

/// Fixed-point with trailing zeros trimmed, keeping one digit after the point.
/// Six decimals, so magnitudes below 5e-7 print as `0.0`.
pub fn format_float(value: f32) -> String {
    let mut text = format!("{value:.6}");
    if text.contains('.') {
        while text.ends_with('0') && !text.ends_with(".0") {
            text.pop();
        }
    }
    text
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variable::Undefined => Ok(()),
            Variable::Int(v) => write!(f, "{v}"),
            Variable::Dword(v) => write!(f, "0x{v:X}"),
            Variable::Bool(v) => write!(f, "{v}"),
            Variable::Float(v) => f.write_str(&format_float(*v)),
            Variable::String(Some(s)) => write!(f, "\"{s}\""),
            Variable::Enum(Some(s)) => f.write_str(s),
            Variable::String(None) | Variable::Enum(None) => f.write_str(NULL_TEXT),
        }
    }
}

/// Equal only when both kind and payload match; floats compare bitwise
impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Variable::Undefined, Variable::Undefined) => true,
            (Variable::Int(a), Variable::Int(b)) => a == b,
            (Variable::Dword(a), Variable::Dword(b)) => a == b,
            (Variable::Bool(a), Variable::Bool(b)) => a == b,
            (Variable::Float(a), Variable::Float(b)) => a.to_bits() == b.to_bits(),
            (Variable::String(a), Variable::String(b)) => a == b,
            (Variable::Enum(a), Variable::Enum(b)) => a == b,
            _ => false,
        }
    }
}

impl From<i32> for Variable {
    fn from(v: i32) -> Self {
        Variable::Int(v)
    }
}

impl From<u32> for Variable {
    fn from(v: u32) -> Self {
        Variable::Dword(v)
    }
}

impl From<bool> for Variable {
    fn from(v: bool) -> Self {
        Variable::Bool(v)
    }
}

impl From<f32> for Variable {
    fn from(v: f32) -> Self {
        Variable::Float(v)
    }
}

impl From<&str> for Variable {
    fn from(v: &str) -> Self {
        Variable::string(v)
    }
}

impl From<String> for Variable {
    fn from(v: String) -> Self {
        Variable::String(Some(v))
    }
}
