//! The `string` object type. Indexing is by code point throughout.

use crate::{
    bindings::new_callback,
    environment::Environment,
    error::{RunError, RunResult},
    gc::{Pool, Root},
    types::{Identifier, ObjectType, PurityType, Type},
};

fn chars(s: &str) -> Vec<char> {
    s.chars().collect()
}

/// `find` family result: code-point index, or -1 when absent.
fn found(index: Option<usize>) -> i64 {
    index.map_or(-1, |index| i64::try_from(index).unwrap_or(-1))
}

fn add_method<Args: 'static>(
    object_type: &Root<ObjectType>,
    pool: &Pool,
    name: &str,
    callback: impl crate::bindings::NativeFn<Args>,
) {
    object_type.value().add_field(
        Identifier::new(name),
        new_callback(pool, PurityType::PURE, callback).ptr(),
    );
}

pub fn register_string_type(pool: &Pool, environment: &Root<Environment>) {
    let string_type = ObjectType::new(pool, Type::String);
    add_method(&string_type, pool, "size", |s: String| chars(&s).len());
    add_method(&string_type, pool, "empty", |s: String| s.is_empty());
    add_method(&string_type, pool, "toint", |s: String| -> RunResult<i64> {
        s.trim()
            .parse::<i64>()
            .map_err(|error| RunError::Native(format!("toint: parse failure: {error}")))
    });
    add_method(&string_type, pool, "tolower", |s: String| s.to_lowercase());
    add_method(&string_type, pool, "toupper", |s: String| s.to_uppercase());
    add_method(&string_type, pool, "shell_escape", |s: String| {
        let mut output = String::with_capacity(s.len() + 2);
        output.push('\'');
        for c in s.chars() {
            if c == '\'' {
                output.push_str("'\\''");
            } else {
                output.push(c);
            }
        }
        output.push('\'');
        output
    });
    add_method(
        &string_type,
        pool,
        "substr",
        |s: String, pos: usize, len: usize| -> RunResult<String> {
            let chars = chars(&s);
            if pos + len > chars.len() {
                return Err(RunError::Native(
                    "substr: Invalid index (past end of string).".to_owned(),
                ));
            }
            Ok(chars[pos..pos + len].iter().collect())
        },
    );
    add_method(&string_type, pool, "starts_with", |s: String, prefix: String| {
        s.starts_with(&prefix)
    });
    add_method(
        &string_type,
        pool,
        "find",
        |s: String, pattern: String, start: usize| {
            let haystack = chars(&s);
            let needle = chars(&pattern);
            if needle.is_empty() {
                return found((start <= haystack.len()).then_some(start));
            }
            let index = (start..haystack.len().saturating_sub(needle.len() - 1))
                .find(|&index| haystack[index..index + needle.len()] == needle[..]);
            found(index)
        },
    );
    add_method(
        &string_type,
        pool,
        "find_first_of",
        |s: String, pattern: String, start: usize| {
            let haystack = chars(&s);
            let index = (start..haystack.len()).find(|&index| pattern.contains(haystack[index]));
            found(index)
        },
    );
    add_method(
        &string_type,
        pool,
        "find_first_not_of",
        |s: String, pattern: String, start: usize| {
            let haystack = chars(&s);
            let index = (start..haystack.len()).find(|&index| !pattern.contains(haystack[index]));
            found(index)
        },
    );
    add_method(
        &string_type,
        pool,
        "find_last_of",
        |s: String, pattern: String, start: usize| {
            let haystack = chars(&s);
            if haystack.is_empty() {
                return -1;
            }
            let from = start.min(haystack.len() - 1);
            let index = (0..=from).rev().find(|&index| pattern.contains(haystack[index]));
            found(index)
        },
    );
    add_method(
        &string_type,
        pool,
        "find_last_not_of",
        |s: String, pattern: String, start: usize| {
            let haystack = chars(&s);
            if haystack.is_empty() {
                return -1;
            }
            let from = start.min(haystack.len() - 1);
            let index = (0..=from)
                .rev()
                .find(|&index| !pattern.contains(haystack[index]));
            found(index)
        },
    );
    environment.value().define_type(string_type.ptr());
}
