use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Well-known label holding the metric name.
pub const METRIC_NAME_LABEL: &str = "__name__";

/// Label is a name/value pair attached to a target or a sample.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub value: String,
}

impl Label {
    pub fn new<N: Into<String>, V: Into<String>>(name: N, value: V) -> Self {
        Label {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, enquote::enquote('"', &self.value))
    }
}

/// Labels is the complete label set of one target/sample.
///
/// Names are unique; equality ignores insertion order. The set is transient:
/// it lives for one relabeling pass, while the rule list it is evaluated
/// against is immutable and shared.
#[derive(Debug, Clone, Default, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Label>")]
pub struct Labels(Vec<Label>);

impl Labels {
    pub fn new() -> Self {
        Labels(Vec::new())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Labels(Vec::with_capacity(capacity))
    }

    /// Builds a label set from name/value pairs. A repeated name keeps the
    /// last value given for it.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut labels = Labels::new();
        for (name, value) in pairs {
            labels.set(name, value);
        }
        labels
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Label> {
        self.0.iter()
    }

    /// Returns the value of the label with the given name, if present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|label| label.name == name)
            .map(|label| label.value.as_str())
    }

    /// Returns the value of the label with the given name, or `""` if the
    /// label is absent.
    pub fn get_value(&self, name: &str) -> &str {
        self.get(name).unwrap_or("")
    }

    /// Sets the label `name` to `value`, overwriting an existing entry.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        for label in self.0.iter_mut() {
            if label.name == name {
                label.value = value;
                return;
            }
        }
        self.0.push(Label::new(name, value));
    }

    /// Removes the label with the given name, if present.
    pub fn remove(&mut self, name: &str) {
        self.0.retain(|label| label.name != name);
    }

    /// Keeps only the labels for which `pred` returns true.
    pub fn retain<F: FnMut(&Label) -> bool>(&mut self, pred: F) {
        self.0.retain(pred);
    }

    /// Joins the values of `names`, in the given order, with `separator`.
    ///
    /// An absent label contributes an empty segment rather than being
    /// skipped, so the separator count is determined by `names` alone. This
    /// matters for regexes matched against the concatenation.
    pub fn concat(&self, names: &[String], separator: &str) -> String {
        let mut dst = String::with_capacity(32);
        for (i, name) in names.iter().enumerate() {
            if i > 0 {
                dst.push_str(separator);
            }
            dst.push_str(self.get_value(name));
        }
        dst
    }

    /// Sorts the set by label name for deterministic serialization.
    pub fn sort(&mut self) {
        self.0.sort();
    }
}

impl PartialEq for Labels {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len()
            && self
                .0
                .iter()
                .all(|label| other.get(&label.name) == Some(label.value.as_str()))
    }
}

impl From<Vec<Label>> for Labels {
    fn from(mut labels: Vec<Label>) -> Self {
        // keep the last occurrence of a duplicated name
        let mut result = Labels::with_capacity(labels.len());
        for label in labels.drain(..) {
            result.set(&label.name, label.value);
        }
        result
    }
}

impl IntoIterator for Labels {
    type Item = Label;
    type IntoIter = std::vec::IntoIter<Label>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Labels {
    type Item = &'a Label;
    type IntoIter = std::slice::Iter<'a, Label>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

static LABEL_NAME_REGEX: OnceLock<Regex> = OnceLock::new();

fn label_name_regex() -> &'static Regex {
    LABEL_NAME_REGEX
        .get_or_init(|| Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").expect("BUG: invalid label name regex"))
}

/// Reports whether `name` is a valid Prometheus label name.
pub fn is_valid_label_name(name: &str) -> bool {
    label_name_regex().is_match(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_get_set_remove() {
        let mut labels = Labels::from_pairs([("job", "api"), ("env", "prod")]);
        assert_eq!(labels.get("job"), Some("api"));
        assert_eq!(labels.get("missing"), None);
        assert_eq!(labels.get_value("missing"), "");

        labels.set("job", "web");
        assert_eq!(labels.get("job"), Some("web"));
        assert_eq!(labels.len(), 2);

        labels.remove("env");
        assert_eq!(labels.get("env"), None);
        assert_eq!(labels.len(), 1);
    }

    #[test]
    fn test_deserialize_keeps_names_unique() -> anyhow::Result<()> {
        // A duplicated name in serialized input collapses to its last value,
        // same as repeated `set` calls.
        let labels: Labels = serde_yaml::from_str(
            r#"[{name: a, value: "1"}, {name: a, value: "2"}, {name: b, value: "3"}]"#,
        )?;
        assert_eq!(labels.len(), 2);
        assert_eq!(labels.get("a"), Some("2"));
        assert_eq!(labels, Labels::from_pairs([("a", "2"), ("b", "3")]));
        Ok(())
    }

    #[test]
    fn test_equality_ignores_order() {
        let a = Labels::from_pairs([("a", "1"), ("b", "2")]);
        let b = Labels::from_pairs([("b", "2"), ("a", "1")]);
        assert_eq!(a, b);

        let c = Labels::from_pairs([("a", "1"), ("b", "3")]);
        assert_ne!(a, c);
    }

    #[test]
    fn test_concat_absent_labels_contribute_empty_segment() {
        let labels = Labels::from_pairs([("a", "x"), ("c", "z")]);
        let names = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert_eq!(labels.concat(&names, ";"), "x;;z");
        assert_eq!(labels.concat(&names[..1], ";"), "x");
        assert_eq!(labels.concat(&[], ";"), "");
    }

    #[test_case("job", true)]
    #[test_case("__meta_foo", true)]
    #[test_case("_0", true)]
    #[test_case("0job", false)]
    #[test_case("job-name", false)]
    #[test_case("", false)]
    fn test_is_valid_label_name(name: &str, want: bool) {
        assert_eq!(is_valid_label_name(name), want, "name: {name}");
    }
}
