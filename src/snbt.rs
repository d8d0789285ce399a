//! Stringified NBT (the `{X:3,Pos:[1.0D,2.0D,3.0D]}` textual form).
//!
//! Building Gadgets v0 templates are whole SNBT documents and v2 templates
//! embed one inside their JSON envelope, so both directions matter here.
//! Emission is deterministic: compound keys come out sorted.

use std::collections::HashMap;

use fastnbt::{ByteArray, IntArray, LongArray, Value};

use crate::error::{Result, SchemError};

/// Parse a single SNBT value. Trailing garbage is an error.
pub fn from_snbt(s: &str) -> Result<Value> {
    let mut parser = Parser {
        input: s.as_bytes(),
        pos: 0,
    };
    parser.skip_ws();
    let value = parser.parse_value()?;
    parser.skip_ws();
    if parser.pos != parser.input.len() {
        return Err(parser.err("trailing characters after value"));
    }
    Ok(value)
}

/// Render a tag as SNBT.
pub fn to_snbt(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Byte(v) => {
            out.push_str(&v.to_string());
            out.push('B');
        }
        Value::Short(v) => {
            out.push_str(&v.to_string());
            out.push('S');
        }
        Value::Int(v) => out.push_str(&v.to_string()),
        Value::Long(v) => {
            out.push_str(&v.to_string());
            out.push('L');
        }
        Value::Float(v) => {
            write_float(out, *v as f64);
            out.push('F');
        }
        Value::Double(v) => {
            write_float(out, *v);
            out.push('D');
        }
        Value::String(s) => quote_string(out, s),
        Value::ByteArray(arr) => {
            out.push_str("[B;");
            for (i, v) in arr.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&v.to_string());
                out.push('B');
            }
            out.push(']');
        }
        Value::IntArray(arr) => {
            out.push_str("[I;");
            for (i, v) in arr.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&v.to_string());
            }
            out.push(']');
        }
        Value::LongArray(arr) => {
            out.push_str("[L;");
            for (i, v) in arr.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&v.to_string());
                out.push('L');
            }
            out.push(']');
        }
        Value::List(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item);
            }
            out.push(']');
        }
        Value::Compound(map) => {
            out.push('{');
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_key(out, key);
                out.push(':');
                write_value(out, &map[*key]);
            }
            out.push('}');
        }
    }
}

fn write_float(out: &mut String, v: f64) {
    if v.is_finite() && v.fract() == 0.0 {
        out.push_str(&format!("{v:.1}"));
    } else {
        out.push_str(&v.to_string());
    }
}

fn is_bare_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '+')
}

fn write_key(out: &mut String, key: &str) {
    if !key.is_empty() && key.chars().all(is_bare_key_char) {
        out.push_str(key);
    } else {
        quote_string(out, key);
    }
}

fn quote_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl Parser<'_> {
    fn err(&self, message: impl Into<String>) -> SchemError {
        SchemError::Snbt {
            offset: self.pos,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, c: u8) -> Result<()> {
        if self.peek() == Some(c) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.err(format!("expected '{}'", c as char)))
        }
    }

    fn parse_value(&mut self) -> Result<Value> {
        match self.peek() {
            Some(b'{') => self.parse_compound(),
            Some(b'[') => self.parse_list_or_array(),
            Some(b'"' | b'\'') => Ok(Value::String(self.parse_quoted()?)),
            Some(_) => self.parse_number(),
            None => Err(self.err("unexpected end of input")),
        }
    }

    fn parse_compound(&mut self) -> Result<Value> {
        self.expect(b'{')?;
        let mut map = HashMap::new();
        self.skip_ws();
        if self.peek() == Some(b'}') {
            self.pos += 1;
            return Ok(Value::Compound(map));
        }
        loop {
            self.skip_ws();
            let key = self.parse_key()?;
            self.skip_ws();
            self.expect(b':')?;
            self.skip_ws();
            let value = self.parse_value()?;
            map.insert(key, value);
            self.skip_ws();
            match self.bump() {
                Some(b',') => continue,
                Some(b'}') => return Ok(Value::Compound(map)),
                _ => return Err(self.err("expected ',' or '}' in compound")),
            }
        }
    }

    fn parse_key(&mut self) -> Result<String> {
        if matches!(self.peek(), Some(b'"' | b'\'')) {
            return self.parse_quoted();
        }
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| is_bare_key_char(c as char))
        {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.err("expected compound key"));
        }
        Ok(String::from_utf8_lossy(&self.input[start..self.pos]).into_owned())
    }

    fn parse_list_or_array(&mut self) -> Result<Value> {
        self.expect(b'[')?;
        if let Some(kind @ (b'B' | b'I' | b'L')) = self.peek() {
            if self.input.get(self.pos + 1) == Some(&b';') {
                self.pos += 2;
                return self.parse_array(kind);
            }
        }
        let mut items = Vec::new();
        self.skip_ws();
        if self.peek() == Some(b']') {
            self.pos += 1;
            return Ok(Value::List(items));
        }
        loop {
            self.skip_ws();
            items.push(self.parse_value()?);
            self.skip_ws();
            match self.bump() {
                Some(b',') => continue,
                Some(b']') => return Ok(Value::List(items)),
                _ => return Err(self.err("expected ',' or ']' in list")),
            }
        }
    }

    fn parse_array(&mut self, kind: u8) -> Result<Value> {
        let mut bytes = Vec::new();
        let mut ints = Vec::new();
        let mut longs = Vec::new();
        self.skip_ws();
        if self.peek() == Some(b']') {
            self.pos += 1;
        } else {
            loop {
                self.skip_ws();
                let at = self.pos;
                match (kind, self.parse_number()?) {
                    (b'B', Value::Byte(v)) => bytes.push(v),
                    (b'I', Value::Int(v)) => ints.push(v),
                    (b'L', Value::Long(v)) => longs.push(v),
                    _ => {
                        self.pos = at;
                        return Err(self.err(format!(
                            "wrong element type in [{};...] array",
                            kind as char
                        )));
                    }
                }
                self.skip_ws();
                match self.bump() {
                    Some(b',') => continue,
                    Some(b']') => break,
                    _ => return Err(self.err("expected ',' or ']' in array")),
                }
            }
        }
        match kind {
            b'B' => Ok(Value::ByteArray(ByteArray::new(bytes))),
            b'I' => Ok(Value::IntArray(IntArray::new(ints))),
            b'L' => Ok(Value::LongArray(LongArray::new(longs))),
            _ => Err(self.err(format!("unknown array type '{}'", kind as char))),
        }
    }

    fn parse_quoted(&mut self) -> Result<String> {
        let quote = self.bump().ok_or_else(|| self.err("expected string"))?;
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.err("unterminated string")),
                Some(c) if c == quote => return Ok(out),
                Some(b'\\') => match self.bump() {
                    Some(b'"') => out.push('"'),
                    Some(b'\'') => out.push('\''),
                    Some(b'\\') => out.push('\\'),
                    Some(b'/') => out.push('/'),
                    Some(b'n') => out.push('\n'),
                    Some(b'r') => out.push('\r'),
                    Some(b't') => out.push('\t'),
                    Some(b'b') => out.push('\u{8}'),
                    Some(b'f') => out.push('\u{c}'),
                    Some(b'u') => {
                        let hex = self
                            .input
                            .get(self.pos..self.pos + 4)
                            .ok_or_else(|| self.err("truncated \\u escape"))?;
                        let code = std::str::from_utf8(hex)
                            .ok()
                            .and_then(|h| u32::from_str_radix(h, 16).ok())
                            .and_then(char::from_u32)
                            .ok_or_else(|| self.err("invalid \\u escape"))?;
                        self.pos += 4;
                        out.push(code);
                    }
                    _ => return Err(self.err("invalid escape sequence")),
                },
                Some(c) if c < 0x80 => out.push(c as char),
                Some(first) => {
                    // multi-byte utf-8: copy the full scalar
                    let start = self.pos - 1;
                    let width = utf8_width(first);
                    let end = start + width;
                    let chunk = self
                        .input
                        .get(start..end)
                        .and_then(|b| std::str::from_utf8(b).ok())
                        .ok_or_else(|| self.err("invalid utf-8 in string"))?;
                    out.push_str(chunk);
                    self.pos = end;
                }
            }
        }
    }

    fn parse_number(&mut self) -> Result<Value> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || matches!(c, b'+' | b'-' | b'.' | b'e' | b'E'))
        {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.err("expected a value"));
        }
        let token = std::str::from_utf8(&self.input[start..self.pos])
            .map_err(|_| self.err("invalid number"))?;

        let suffix = match self.peek() {
            Some(c @ (b'b' | b'B' | b's' | b'S' | b'l' | b'L' | b'f' | b'F' | b'd' | b'D')) => {
                self.pos += 1;
                Some(c.to_ascii_lowercase())
            }
            _ => None,
        };

        let bad = |p: &Self| p.err(format!("invalid numeric literal '{token}'"));
        match suffix {
            Some(b'b') => token.parse().map(Value::Byte).map_err(|_| bad(self)),
            Some(b's') => token.parse().map(Value::Short).map_err(|_| bad(self)),
            Some(b'l') => token.parse().map(Value::Long).map_err(|_| bad(self)),
            Some(b'f') => token.parse().map(Value::Float).map_err(|_| bad(self)),
            Some(b'd') => token.parse().map(Value::Double).map_err(|_| bad(self)),
            Some(_) => unreachable!("suffix set is closed"),
            None => {
                if token.contains(['.', 'e', 'E']) {
                    token.parse().map(Value::Double).map_err(|_| bad(self))
                } else if let Ok(v) = token.parse::<i32>() {
                    Ok(Value::Int(v))
                } else {
                    token.parse().map(Value::Long).map_err(|_| bad(self))
                }
            }
        }
    }
}

fn utf8_width(first: u8) -> usize {
    match first {
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        _ => 4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compound(pairs: &[(&str, Value)]) -> Value {
        Value::Compound(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn parse_suffixed_integers() {
        assert_eq!(from_snbt("34B").unwrap(), Value::Byte(34));
        assert_eq!(from_snbt("-20b").unwrap(), Value::Byte(-20));
        assert_eq!(from_snbt("31415S").unwrap(), Value::Short(31415));
        assert_eq!(from_snbt("-27183S").unwrap(), Value::Short(-27183));
        assert_eq!(from_snbt("31415926").unwrap(), Value::Int(31415926));
        assert_eq!(from_snbt("31415926L").unwrap(), Value::Long(31415926));
    }

    #[test]
    fn parse_floats_and_doubles() {
        assert_eq!(from_snbt("3.5F").unwrap(), Value::Float(3.5));
        assert_eq!(from_snbt("3.1415926D").unwrap(), Value::Double(3.1415926));
        // a bare decimal is a double
        assert_eq!(from_snbt("3.1415926").unwrap(), Value::Double(3.1415926));
    }

    #[test]
    fn bare_integer_overflowing_i32_becomes_long() {
        assert_eq!(from_snbt("3000000000").unwrap(), Value::Long(3000000000));
    }

    #[test]
    fn parse_quoted_strings() {
        assert_eq!(
            from_snbt(r#""Call me \"Ishmael\"""#).unwrap(),
            Value::String(r#"Call me "Ishmael""#.to_string())
        );
        assert_eq!(
            from_snbt(r#""Call me 'Ishmael'""#).unwrap(),
            Value::String("Call me 'Ishmael'".to_string())
        );
        assert_eq!(
            from_snbt("'single quoted'").unwrap(),
            Value::String("single quoted".to_string())
        );
    }

    #[test]
    fn parse_typed_arrays() {
        assert_eq!(
            from_snbt("[B;1B,2B,3B]").unwrap(),
            Value::ByteArray(fastnbt::ByteArray::new(vec![1, 2, 3]))
        );
        assert_eq!(
            from_snbt("[I;1,2,3]").unwrap(),
            Value::IntArray(fastnbt::IntArray::new(vec![1, 2, 3]))
        );
        assert_eq!(
            from_snbt("[L;1L,2L,3L]").unwrap(),
            Value::LongArray(fastnbt::LongArray::new(vec![1, 2, 3]))
        );
    }

    #[test]
    fn array_with_wrong_element_type_is_an_error() {
        assert!(from_snbt("[B;1,2]").is_err());
        assert!(from_snbt("[I;1B]").is_err());
    }

    #[test]
    fn parse_list_and_compound() {
        assert_eq!(
            from_snbt("[3.2D,64.5D,129.5D]").unwrap(),
            Value::List(vec![
                Value::Double(3.2),
                Value::Double(64.5),
                Value::Double(129.5)
            ])
        );
        assert_eq!(
            from_snbt("{X:3,Y:64,Z:129}").unwrap(),
            compound(&[
                ("X", Value::Int(3)),
                ("Y", Value::Int(64)),
                ("Z", Value::Int(129))
            ])
        );
        assert_eq!(from_snbt("[]").unwrap(), Value::List(vec![]));
        assert_eq!(from_snbt("{}").unwrap(), Value::Compound(HashMap::new()));
    }

    #[test]
    fn emit_matches_parsed_form() {
        let v = compound(&[
            (
                "Pos",
                Value::List(vec![
                    Value::Double(1.0),
                    Value::Double(2.0),
                    Value::Double(3.0),
                ]),
            ),
            (
                "Tags",
                Value::List(vec![
                    Value::String("a".to_string()),
                    Value::String("b".to_string()),
                ]),
            ),
        ]);
        let text = to_snbt(&v);
        insta::assert_snapshot!(text, @r#"{Pos:[1.0D,2.0D,3.0D],Tags:["a","b"]}"#);
        assert_eq!(from_snbt(&text).unwrap(), v);
    }

    #[test]
    fn emit_quotes_awkward_keys() {
        let v = compound(&[("has space", Value::Int(1))]);
        insta::assert_snapshot!(to_snbt(&v), @r#"{"has space":1}"#);
    }

    #[test]
    fn roundtrip_every_tag_kind() {
        let cases = [
            "34B",
            "31415S",
            "31415926",
            "31415926L",
            "3.5F",
            "3.2D",
            "\"text\"",
            "[B;1B,2B]",
            "[I;1,2]",
            "[L;1L,2L]",
            "[1,2,3]",
            "{A:1,B:\"two\"}",
        ];
        for case in cases {
            let parsed = from_snbt(case).unwrap();
            assert_eq!(to_snbt(&parsed), case, "emit of {case}");
            assert_eq!(from_snbt(&to_snbt(&parsed)).unwrap(), parsed);
        }
    }
}
