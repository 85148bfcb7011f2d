//! `<cstdio>` / `<stdio.h>`
//!
//! Console output and input go through the configured
//! [`Console`](crate::runtime::config::Console); `getchar` suspends the run
//! while no input is buffered. Files go through the configured
//! [`FileSystem`](crate::runtime::config::FileSystem) and are addressed by a
//! `FILE*` whose struct carries the handle.

use crate::interpreter::errors::Result;
use crate::interpreter::evaluator::{EvalFuture, Evaluator, NativeFn};
use crate::interpreter::library::Library;
use crate::runtime::format::{char_array_string, value_string};
use crate::runtime::types::{ArithKind, FunctionType, MemberType, StructType, Type};
use crate::runtime::value::{Data, Number, Place, PointerTarget, Slot, Store, Value};
use std::rc::Rc;

pub const EOF: i128 = -1;

pub struct Stdio;

impl Library for Stdio {
    fn load(&self, evaluator: &Evaluator) -> Result<()> {
        let file = evaluator.define_struct(StructType {
            name: "FILE".to_string(),
            members: vec![MemberType {
                name: "fd".to_string(),
                ty: Type::INT,
                readonly: false,
                default: None,
            }],
        });
        let file_ptr = Type::pointer_to(Type::Struct(file));
        let c_str = || Type::const_pointer_to(Type::CHAR);

        let natives: Vec<(&str, FunctionType, NativeFn)> = vec![
            (
                "printf",
                FunctionType::new(Type::INT, vec![c_str()]).variadic(),
                printf,
            ),
            ("puts", FunctionType::new(Type::INT, vec![c_str()]), puts),
            ("putchar", FunctionType::new(Type::INT, vec![Type::INT]), putchar),
            ("getchar", FunctionType::new(Type::INT, vec![]), getchar),
            (
                "fopen",
                FunctionType::new(file_ptr.clone(), vec![c_str(), c_str()]),
                fopen,
            ),
            (
                "fputs",
                FunctionType::new(Type::INT, vec![c_str(), file_ptr.clone()]),
                fputs,
            ),
            ("fgetc", FunctionType::new(Type::INT, vec![file_ptr.clone()]), fgetc),
            ("fclose", FunctionType::new(Type::INT, vec![file_ptr]), fclose),
        ];
        for (name, ty, native) in natives {
            evaluator.define_native(name, ty, native)?;
            evaluator.bind_namespace("std", name)?;
        }
        evaluator.define_typedef("size_t", Type::Arithmetic(ArithKind::UnsignedLong));
        Ok(())
    }
}

/// Text of a `char*` argument up to its terminator
fn c_string(ev: &Evaluator, value: &Value) -> Result<String> {
    if let Some(text) = char_array_string(value) {
        return Ok(text);
    }
    match value.pointer() {
        Some(PointerTarget::Normal(Some(Place::Element { store, index }))) => Ok(store
            .values()
            .iter()
            .skip(*index)
            .map_while(|v| v.as_int().filter(|c| *c != 0))
            .filter_map(|c| u32::try_from(c).ok().and_then(char::from_u32))
            .collect()),
        Some(PointerTarget::Normal(Some(place))) => Ok(place
            .load()
            .and_then(|v| v.as_int())
            .filter(|c| *c != 0)
            .and_then(|c| u32::try_from(c).ok().and_then(char::from_u32))
            .map(String::from)
            .unwrap_or_default()),
        Some(target) if target.is_null() => Err(ev.fault("null pointer passed as a string")),
        _ => Err(ev.fault(format!("{} is not a string", value_string(value)))),
    }
}

fn int_arg(ev: &Evaluator, args: &[Value], index: usize) -> Result<i128> {
    args.get(index)
        .and_then(Value::as_int)
        .ok_or_else(|| ev.fault("missing integer argument"))
}

/// Handle stored in the `FILE` a `FILE*` points to
fn file_handle(ev: &Evaluator, value: Option<&Value>) -> Result<i128> {
    let file = match value.and_then(Value::pointer) {
        Some(PointerTarget::Normal(Some(place))) => place.load(),
        _ => None,
    };
    file.as_ref()
        .and_then(Value::struct_store)
        .and_then(|store| store.get(0))
        .and_then(|fd| fd.as_int())
        .ok_or_else(|| ev.fault("invalid FILE pointer"))
}

fn printf(ev: &Evaluator, args: Vec<Value>) -> EvalFuture<'_, Value> {
    Box::pin(async move {
        let format = c_string(ev, args.first().ok_or_else(|| ev.fault("printf needs a format"))?)?;
        let text = format_printf(ev, &format, &args[1..])?;
        ev.config().console.write(&text);
        Ok(Value::int(ArithKind::Int, text.chars().count() as i128))
    })
}

fn puts(ev: &Evaluator, args: Vec<Value>) -> EvalFuture<'_, Value> {
    Box::pin(async move {
        let text = c_string(ev, &args[0])?;
        ev.config().console.write(&format!("{}\n", text));
        Ok(Value::int(ArithKind::Int, 1))
    })
}

fn putchar(ev: &Evaluator, args: Vec<Value>) -> EvalFuture<'_, Value> {
    Box::pin(async move {
        let code = int_arg(ev, &args, 0)?;
        if let Some(c) = u32::try_from(code).ok().and_then(char::from_u32) {
            ev.config().console.write(&c.to_string());
        }
        Ok(Value::int(ArithKind::Int, code))
    })
}

fn getchar(ev: &Evaluator, _args: Vec<Value>) -> EvalFuture<'_, Value> {
    Box::pin(async move {
        let code = match ev.read_char().await {
            Some(c) => i128::from(u32::from(c)),
            None => EOF,
        };
        Ok(Value::int(ArithKind::Int, code))
    })
}

fn fopen(ev: &Evaluator, args: Vec<Value>) -> EvalFuture<'_, Value> {
    Box::pin(async move {
        let name = c_string(ev, &args[0])?;
        let mode = c_string(ev, &args[1])?;
        let files = &ev.config().files;
        let opened = match mode.trim_end_matches(['b', '+']) {
            "r" => files.open(&name, false),
            "w" => {
                let opened = files.open(&name, true);
                files.clear(&name);
                opened
            }
            "a" => files.open(&name, true),
            other => return Err(ev.fault(format!("unknown file mode {}", other))),
        };

        let def = ev
            .struct_type("FILE")
            .ok_or_else(|| ev.fault("FILE is not defined"))?;
        let ty = Type::pointer_to(Type::Struct(Rc::clone(&def)));
        if !opened {
            tracing::debug!(file = %name, "fopen failed");
            return Ok(Value::null(ty));
        }
        let handle = ev.files.borrow_mut().open(&name);
        let file = Value::new(
            Type::Struct(def),
            Data::Struct(Store::new(vec![Value::int(ArithKind::Int, handle)])),
        );
        Ok(Value::new(
            ty,
            Data::Pointer(PointerTarget::Normal(Some(Place::Slot(Slot::new(file))))),
        ))
    })
}

fn fputs(ev: &Evaluator, args: Vec<Value>) -> EvalFuture<'_, Value> {
    Box::pin(async move {
        let text = c_string(ev, &args[0])?;
        let handle = file_handle(ev, args.get(1))?;
        let name = ev.files.borrow_mut().get_mut(handle).map(|file| file.name.clone());
        match name {
            Some(name) => {
                ev.config().files.write(&name, &text);
                Ok(Value::int(ArithKind::Int, 1))
            }
            None => Ok(Value::int(ArithKind::Int, EOF)),
        }
    })
}

fn fgetc(ev: &Evaluator, args: Vec<Value>) -> EvalFuture<'_, Value> {
    Box::pin(async move {
        let handle = file_handle(ev, args.first())?;
        let mut files = ev.files.borrow_mut();
        let Some(file) = files.get_mut(handle) else {
            return Ok(Value::int(ArithKind::Int, EOF));
        };
        let next = ev
            .config()
            .files
            .read(&file.name)
            .and_then(|contents| contents.chars().nth(file.position));
        let code = match next {
            Some(c) => {
                file.position += 1;
                i128::from(u32::from(c))
            }
            None => EOF,
        };
        Ok(Value::int(ArithKind::Int, code))
    })
}

fn fclose(ev: &Evaluator, args: Vec<Value>) -> EvalFuture<'_, Value> {
    Box::pin(async move {
        let handle = file_handle(ev, args.first())?;
        let closed = ev.files.borrow_mut().close(handle);
        match closed {
            Some(file) => {
                ev.config().files.close(&file.name);
                Ok(Value::int(ArithKind::Int, 0))
            }
            None => Ok(Value::int(ArithKind::Int, EOF)),
        }
    })
}

/// Parsed `%` conversion
#[derive(Debug, Default)]
struct Spec {
    left: bool,
    zero: bool,
    plus: bool,
    space: bool,
    width: usize,
    precision: Option<usize>,
}

impl Spec {
    /// Pad `body` (with its sign already applied) to the field width
    fn pad(&self, body: String, numeric: bool) -> String {
        let len = body.chars().count();
        if len >= self.width {
            return body;
        }
        let fill = self.width - len;
        if self.left {
            format!("{}{}", body, " ".repeat(fill))
        } else if self.zero && numeric {
            let sign_len = usize::from(body.starts_with(['-', '+', ' ']));
            let (sign, digits) = body.split_at(sign_len);
            format!("{}{}{}", sign, "0".repeat(fill), digits)
        } else {
            format!("{}{}", " ".repeat(fill), body)
        }
    }

    fn signed(&self, negative: bool, digits: String) -> String {
        if negative {
            format!("-{}", digits)
        } else if self.plus {
            format!("+{}", digits)
        } else if self.space {
            format!(" {}", digits)
        } else {
            digits
        }
    }
}

/// Expand a printf format against its arguments
pub fn format_printf(ev: &Evaluator, format: &str, args: &[Value]) -> Result<String> {
    let mut out = String::new();
    let mut chars = format.chars().peekable();
    let mut next_arg = args.iter();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        if chars.peek() == Some(&'%') {
            chars.next();
            out.push('%');
            continue;
        }

        let mut spec = Spec::default();
        while let Some(flag) = chars.peek().copied() {
            match flag {
                '-' => spec.left = true,
                '0' => spec.zero = true,
                '+' => spec.plus = true,
                ' ' => spec.space = true,
                '#' => {}
                _ => break,
            }
            chars.next();
        }
        while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
            spec.width = spec.width * 10 + d as usize;
            chars.next();
        }
        if chars.peek() == Some(&'.') {
            chars.next();
            let mut precision = 0;
            while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
                precision = precision * 10 + d as usize;
                chars.next();
            }
            spec.precision = Some(precision);
        }
        while matches!(chars.peek(), Some('h' | 'l' | 'L' | 'z')) {
            chars.next();
        }

        let conversion = chars
            .next()
            .ok_or_else(|| ev.fault("incomplete format specifier"))?;
        let arg = next_arg
            .next()
            .ok_or_else(|| ev.fault(format!("missing argument for %{}", conversion)))?;
        let text = match conversion {
            'd' | 'i' => {
                let v = integer(ev, arg)?;
                spec.pad(spec.signed(v < 0, v.unsigned_abs().to_string()), true)
            }
            'u' | 'x' | 'X' | 'o' => {
                let v = unsigned(ev, arg)?;
                let digits = match conversion {
                    'u' => v.to_string(),
                    'x' => format!("{:x}", v),
                    'X' => format!("{:X}", v),
                    _ => format!("{:o}", v),
                };
                spec.pad(digits, true)
            }
            'c' => {
                let code = integer(ev, arg)?;
                let c = u32::try_from(code)
                    .ok()
                    .and_then(char::from_u32)
                    .unwrap_or(char::REPLACEMENT_CHARACTER);
                spec.pad(c.to_string(), false)
            }
            's' => {
                let mut text = c_string(ev, arg)?;
                if let Some(precision) = spec.precision {
                    text = text.chars().take(precision).collect();
                }
                spec.pad(text, false)
            }
            'f' | 'F' | 'e' | 'E' | 'g' | 'G' => {
                let v = floating(ev, arg)?;
                let precision = spec.precision.unwrap_or(6);
                let digits = match conversion {
                    'f' | 'F' => format!("{:.*}", precision, v.abs()),
                    'e' => exponent(v.abs(), precision),
                    'E' => exponent(v.abs(), precision).to_uppercase(),
                    'g' => general(v.abs(), precision),
                    _ => general(v.abs(), precision).to_uppercase(),
                };
                spec.pad(spec.signed(v.is_sign_negative() && v != 0.0, digits), true)
            }
            'p' => spec.pad(value_string(arg), false),
            other => return Err(ev.fault(format!("unknown format specifier %{}", other))),
        };
        out.push_str(&text);
    }
    Ok(out)
}

fn integer(ev: &Evaluator, arg: &Value) -> Result<i128> {
    match arg.number() {
        Some(Number::Int(v)) => Ok(v),
        Some(Number::Float(v)) => Ok(v as i128),
        None => Err(ev.fault(format!("{} is not a number", value_string(arg)))),
    }
}

/// Two's-complement reading of a negative integer at its type's width
fn unsigned(ev: &Evaluator, arg: &Value) -> Result<u128> {
    let v = integer(ev, arg)?;
    if v >= 0 {
        return Ok(v as u128);
    }
    let kind = match arg.ty.arith() {
        Some(kind) if ev.config().limits.rank(kind) >= ev.config().limits.rank(ArithKind::Int) => kind,
        _ => ArithKind::Int,
    };
    let bits = ev.config().limits.get(kind).bytes * 8;
    Ok((v + (1i128 << bits)) as u128)
}

fn floating(ev: &Evaluator, arg: &Value) -> Result<f64> {
    arg.number()
        .map(Number::as_f64)
        .ok_or_else(|| ev.fault(format!("{} is not a number", value_string(arg))))
}

/// `%e`: one leading digit and a signed two-digit exponent
fn exponent(v: f64, precision: usize) -> String {
    let formatted = format!("{:.*e}", precision, v);
    match formatted.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{}e{}{:02}", mantissa, sign, exp.abs())
        }
        None => formatted,
    }
}

/// `%g`: shortest of `%e` and `%f` at the given significant digits
fn general(v: f64, precision: usize) -> String {
    let precision = precision.max(1);
    if v == 0.0 {
        return "0".to_string();
    }
    let exp = v.log10().floor() as i32;
    if exp < -4 || exp >= precision as i32 {
        let formatted = exponent(v, precision - 1);
        match formatted.split_once('e') {
            Some((mantissa, exp)) => format!("{}e{}", strip_zeros(mantissa), exp),
            None => formatted,
        }
    } else {
        let decimals = (precision as i32 - 1 - exp).max(0) as usize;
        strip_zeros(&format!("{:.*}", decimals, v)).to_string()
    }
}

fn strip_zeros(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::config::Config;
    use crate::runtime::Runtime;
    use pretty_assertions::assert_eq;

    fn evaluator() -> Evaluator {
        Evaluator::new(Runtime::new(Config::default()))
    }

    fn string(text: &str) -> Value {
        let mut chars: Vec<Value> = text
            .chars()
            .map(|c| Value::int(ArithKind::Char, i128::from(u32::from(c))))
            .collect();
        chars.push(Value::int(ArithKind::Char, 0));
        Value::new(
            Type::array_of(Type::CHAR, chars.len()),
            Data::Pointer(PointerTarget::Array {
                store: Some(Store::new(chars)),
                position: 0,
            }),
        )
    }

    #[test]
    fn test_integer_conversions() {
        let ev = evaluator();
        let args = [
            Value::int(ArithKind::Int, 42),
            Value::int(ArithKind::Int, -7),
            Value::int(ArithKind::Int, 255),
            Value::int(ArithKind::Int, -1),
        ];
        let text = format_printf(&ev, "%d|%5d|%x|%u", &args).unwrap();
        assert_eq!(text, "42|   -7|ff|4294967295");
    }

    #[test]
    fn test_padding_flags() {
        let ev = evaluator();
        let args = [Value::int(ArithKind::Int, -42), string("ab")];
        assert_eq!(format_printf(&ev, "[%06d][%-4s]", &args).unwrap(), "[-00042][ab  ]");
    }

    #[test]
    fn test_float_conversions() {
        let ev = evaluator();
        let args = [
            Value::float(ArithKind::Double, 3.14159),
            Value::float(ArithKind::Double, 1234.5),
            Value::float(ArithKind::Double, 0.25),
            Value::float(ArithKind::Double, 2.5),
        ];
        let text = format_printf(&ev, "%.2f %e %g %g", &args).unwrap();
        assert_eq!(text, "3.14 1.234500e+03 0.25 2.5");
    }

    #[test]
    fn test_chars_strings_and_percent() {
        let ev = evaluator();
        let args = [Value::int(ArithKind::Char, 'x' as i128), string("hello")];
        assert_eq!(format_printf(&ev, "%c %.3s 100%%", &args).unwrap(), "x hel 100%");
    }

    #[test]
    fn test_missing_argument_faults() {
        let ev = evaluator();
        let err = format_printf(&ev, "%d %d", &[Value::int(ArithKind::Int, 1)]).unwrap_err();
        assert_eq!(err.message, "missing argument for %d");
    }

    #[test]
    fn test_load_defines_functions_and_std_bindings() {
        let ev = evaluator();
        ev.load_library("cstdio").unwrap();
        ev.load_library("stdio.h").unwrap();
        assert!(ev.lookup("printf").is_some());
        assert!(ev.struct_type("FILE").is_some());
        let qualified = ["std".to_string(), "puts".to_string()];
        assert!(ev.namespaces.borrow().lookup(&qualified).is_some());
    }
}
