//! Validator sets: pluggable predicates producing named error tags.
//!
//! A failing validator contributes one entry to the node's local
//! [`ValidationErrors`]: its tag mapped to a detail value (`true` for plain
//! flags, an object for validators that report bounds).

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use regex::Regex;
use serde_json::{json, Value};

/// Local errors of a single node, keyed by tag.
pub type ValidationErrors = BTreeMap<String, Value>;

pub trait Validator {
    /// Tag under which a failure is reported.
    fn tag(&self) -> &str;

    /// `None` when the value passes, otherwise the error detail.
    fn check(&self, value: &Value) -> Option<Value>;
}

/// Null, empty strings and empty arrays count as "no value".
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn length_of(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(items) => Some(items.len()),
        _ => None,
    }
}

fn number_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Required;

impl Validator for Required {
    fn tag(&self) -> &str {
        "required"
    }

    fn check(&self, value: &Value) -> Option<Value> {
        is_empty_value(value).then_some(Value::Bool(true))
    }
}

/// Passes only for boolean `true` (consent checkboxes).
#[derive(Debug, Clone, Copy)]
pub struct RequiredTrue;

impl Validator for RequiredTrue {
    fn tag(&self) -> &str {
        "required"
    }

    fn check(&self, value: &Value) -> Option<Value> {
        (value != &Value::Bool(true)).then_some(Value::Bool(true))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MinLength(pub usize);

impl Validator for MinLength {
    fn tag(&self) -> &str {
        "minLength"
    }

    fn check(&self, value: &Value) -> Option<Value> {
        if is_empty_value(value) {
            return None;
        }
        let actual = length_of(value)?;
        (actual < self.0).then(|| json!({ "requiredLength": self.0, "actualLength": actual }))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MaxLength(pub usize);

impl Validator for MaxLength {
    fn tag(&self) -> &str {
        "maxLength"
    }

    fn check(&self, value: &Value) -> Option<Value> {
        let actual = length_of(value)?;
        (actual > self.0).then(|| json!({ "requiredLength": self.0, "actualLength": actual }))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Min(pub f64);

impl Validator for Min {
    fn tag(&self) -> &str {
        "min"
    }

    fn check(&self, value: &Value) -> Option<Value> {
        if is_empty_value(value) {
            return None;
        }
        let actual = number_of(value)?;
        (actual < self.0).then(|| json!({ "min": self.0, "actual": actual }))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Max(pub f64);

impl Validator for Max {
    fn tag(&self) -> &str {
        "max"
    }

    fn check(&self, value: &Value) -> Option<Value> {
        if is_empty_value(value) {
            return None;
        }
        let actual = number_of(value)?;
        (actual > self.0).then(|| json!({ "max": self.0, "actual": actual }))
    }
}

/// Whole-string regex match. Empty values pass; pair with [`Required`].
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let mut anchored = String::with_capacity(pattern.len() + 2);
        if !pattern.starts_with('^') {
            anchored.push('^');
        }
        anchored.push_str(pattern);
        if !pattern.ends_with('$') {
            anchored.push('$');
        }
        Ok(Self {
            source: anchored.clone(),
            regex: Regex::new(&anchored)?,
        })
    }
}

impl Validator for Pattern {
    fn tag(&self) -> &str {
        "pattern"
    }

    fn check(&self, value: &Value) -> Option<Value> {
        let text = match value {
            Value::String(s) if !s.is_empty() => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        (!self.regex.is_match(&text))
            .then(|| json!({ "requiredPattern": self.source, "actualValue": text }))
    }
}

#[derive(Debug, Clone)]
pub struct Email {
    regex: Regex,
}

impl Default for Email {
    fn default() -> Self {
        Self {
            regex: Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*$")
                .expect("static email pattern compiles"),
        }
    }
}

impl Validator for Email {
    fn tag(&self) -> &str {
        "email"
    }

    fn check(&self, value: &Value) -> Option<Value> {
        match value {
            Value::String(s) if !s.is_empty() => {
                (!self.regex.is_match(s)).then_some(Value::Bool(true))
            }
            _ => None,
        }
    }
}

/// Ad-hoc validator built from a closure, used for cross-field rules.
#[derive(Clone)]
pub struct FnValidator {
    tag: String,
    check: Rc<dyn Fn(&Value) -> Option<Value>>,
}

impl FnValidator {
    pub fn new(tag: impl Into<String>, check: impl Fn(&Value) -> Option<Value> + 'static) -> Self {
        Self {
            tag: tag.into(),
            check: Rc::new(check),
        }
    }

    /// Fails with `true` whenever `predicate` returns false.
    pub fn predicate(tag: impl Into<String>, predicate: impl Fn(&Value) -> bool + 'static) -> Self {
        Self::new(tag, move |v| (!predicate(v)).then_some(Value::Bool(true)))
    }
}

impl fmt::Debug for FnValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnValidator").field("tag", &self.tag).finish_non_exhaustive()
    }
}

impl Validator for FnValidator {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn check(&self, value: &Value) -> Option<Value> {
        (self.check)(value)
    }
}

/// Ordered, shareable list of validators attached to one node.
#[derive(Clone, Default)]
pub struct ValidatorSet(Vec<Rc<dyn Validator>>);

impl ValidatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, validator: impl Validator + 'static) -> Self {
        self.0.push(Rc::new(validator));
        self
    }

    pub fn push(&mut self, validator: impl Validator + 'static) {
        self.0.push(Rc::new(validator));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn tags(&self) -> Vec<&str> {
        self.0.iter().map(|v| v.tag()).collect()
    }

    /// Run every validator; on duplicate tags the first failure wins.
    pub fn run(&self, value: &Value) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        for validator in &self.0 {
            if let Some(detail) = validator.check(value) {
                errors.entry(validator.tag().to_string()).or_insert(detail);
            }
        }
        errors
    }
}

impl fmt::Debug for ValidatorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.tags()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(json!(null), true)]
    #[case(json!(""), true)]
    #[case(json!([]), true)]
    #[case(json!(false), false)]
    #[case(json!(0), false)]
    #[case(json!({}), false)]
    #[case(json!("x"), false)]
    fn given_value_when_required_then_flags_only_empty(#[case] value: Value, #[case] fails: bool) {
        assert_eq!(Required.check(&value).is_some(), fails);
    }

    #[test]
    fn given_short_string_when_min_length_then_reports_lengths() {
        let detail = MinLength(3).check(&json!("ab")).unwrap();
        assert_eq!(detail, json!({ "requiredLength": 3, "actualLength": 2 }));
        assert!(MinLength(3).check(&json!("")).is_none());
    }

    #[test]
    fn given_number_out_of_bounds_when_min_max_then_reports_actual() {
        assert_eq!(Min(1.0).check(&json!(0)), Some(json!({ "min": 1.0, "actual": 0.0 })));
        assert!(Max(10.0).check(&json!(10)).is_none());
        assert!(Max(10.0).check(&json!(11)).is_some());
    }

    #[test]
    fn given_pattern_when_checking_then_matches_whole_string() {
        let pattern = Pattern::new("[A-Z]+").unwrap();
        assert!(pattern.check(&json!("ABC")).is_none());
        assert!(pattern.check(&json!("ABc")).is_some());
        assert!(pattern.check(&json!("")).is_none());
    }

    #[test]
    fn given_anchored_or_escaped_pattern_when_built_then_anchors_added_only_where_missing() {
        let anchored = Pattern::new("^[A-Z]+$").unwrap();
        assert_eq!(anchored.source, "^[A-Z]+$");

        let escaped = Pattern::new(r"price\$").unwrap();
        assert_eq!(escaped.source, r"^price\$");
        assert!(escaped.check(&json!("price$")).is_none());
        assert!(escaped.check(&json!("cost$")).is_some());
    }

    #[test]
    fn given_duplicate_tags_when_running_set_then_first_failure_kept() {
        let set = ValidatorSet::new()
            .with(FnValidator::new("custom", |_| Some(json!("first"))))
            .with(FnValidator::new("custom", |_| Some(json!("second"))));
        let errors = set.run(&json!(1));
        assert_eq!(errors.get("custom"), Some(&json!("first")));
    }

    #[test]
    fn given_invalid_address_when_email_then_flags() {
        assert!(Email::default().check(&json!("no-at-sign")).is_some());
        assert!(Email::default().check(&json!("c3po@tatooine.org")).is_none());
    }
}
