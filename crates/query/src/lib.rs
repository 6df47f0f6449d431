//! Interactive prompts used by the demos.
//!
//! Every prompt is written to stderr so that stdout stays clean for machine-readable output. A
//! prompt repeats until its validator accepts the answer.

use std::fmt::Display;
use std::io::{stderr, stdin, BufRead, Write};
use std::str::FromStr;

fn parse_then<S, T: FromStr, F>(x: &str, validator: &F) -> Result<S, String>
where
    F: Fn(T) -> Result<S, String>,
    <T as FromStr>::Err: Display,
{
    x.parse::<T>()
        .map_err(|err| err.to_string())
        .and_then(validator)
}

/// Ask for a value. An empty answer yields `None`.
pub fn optional<S, T: FromStr, F>(prompt: &str, validator: F) -> Option<S>
where
    F: Fn(T) -> Result<S, String>,
    <T as FromStr>::Err: Display,
{
    inner(prompt, |x| {
        if x.is_empty() {
            Ok(None)
        } else {
            parse_then(x, &validator).map(Some)
        }
    })
}

/// Ask for a value. An empty answer is replaced by `default`, which goes through the same
/// validator.
pub fn with_default<S, T: FromStr, F>(prompt: &str, default: &str, validator: F) -> S
where
    F: Fn(T) -> Result<S, String>,
    <T as FromStr>::Err: Display,
{
    let prompt = format!("{prompt} (default: {default})");
    inner(&prompt, |x| {
        parse_then(if x.is_empty() { default } else { x }, &validator)
    })
}

pub fn raw<S, T: FromStr, F>(prompt: &str, validator: F) -> S
where
    F: Fn(T) -> Result<S, String>,
    <T as FromStr>::Err: Display,
{
    inner(prompt, |x| parse_then(x, &validator))
}

/// Ask for a comma or whitespace separated list, validating each element.
pub fn list<S, T: FromStr, F>(prompt: &str, validator: F) -> Vec<S>
where
    F: Fn(T) -> Result<S, String>,
    <T as FromStr>::Err: Display,
{
    inner(prompt, |x| {
        x.split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .map(|s| parse_then(s, &validator))
            .collect()
    })
}

pub fn yes_no(prompt: &str) -> bool {
    with_default(prompt, "y", |response: String| {
        if response.starts_with('y') || response.starts_with('n') {
            Ok(response.starts_with('y'))
        } else {
            Err(format!(
                "unrecognized response '{response}'. Should be '(y)es' or '(n)o'"
            ))
        }
    })
}

pub fn inner<S, F>(prompt: &str, validator: F) -> S
where
    F: for<'a> Fn(&'a str) -> Result<S, String>,
{
    let stdin = stdin();
    let mut lines = stdin.lock();
    loop {
        eprint!("{prompt} : ");
        // A failed flush only loses the prompt text, not the answer.
        let _ = stderr().flush();
        let mut input = String::new();
        match lines.read_line(&mut input) {
            Ok(0) => panic!("stdin closed while waiting for: {prompt}"),
            Ok(_) => {}
            Err(e) => panic!("Error reading for prompt {prompt}: {e}"),
        }
        match validator(input.trim()) {
            Ok(res) => return res,
            Err(e) => eprintln!("Invalid input: {e}. Try again"),
        }
    }
}
