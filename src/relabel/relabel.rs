use std::fmt;
use std::fmt::Display;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::trace;
use xxhash_rust::xxh3::xxh3_64;

use crate::labels::{Label, Labels, METRIC_NAME_LABEL};
use crate::relabel::config::{ParsedConfigs, RelabelAction};
use crate::relabel::string_replacer::StringReplacer;

/// Result of applying a rule (or a whole rule list) to a label set.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The (possibly transformed) label set; relabeling continues.
    Labels(Labels),
    /// The target/sample is excluded; no further rule runs.
    Dropped,
}

impl Outcome {
    pub fn is_dropped(&self) -> bool {
        matches!(self, Outcome::Dropped)
    }

    /// Returns the surviving label set, or `None` on `Dropped`.
    pub fn into_labels(self) -> Option<Labels> {
        match self {
            Outcome::Labels(labels) => Some(labels),
            Outcome::Dropped => None,
        }
    }
}

/// DebugStep contains debug information about a single relabeling rule step.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct DebugStep {
    /// rule contains string representation of the rule step
    pub rule: String,

    /// r#in contains the input labels before the execution of the rule step
    pub r#in: String,

    /// out contains the output labels after the execution of the rule step
    pub out: String,
}

/// ParsedRelabelConfig contains a parsed and validated `relabel_config` rule.
///
/// See https://prometheus.io/docs/prometheus/latest/configuration/configuration/#relabel_config
#[derive(Debug, Clone)]
pub struct ParsedRelabelConfig {
    /// rule_original contains a human-readable representation of the rule,
    /// used in debug output and error context.
    pub rule_original: String,

    pub action: RelabelAction,
    pub source_labels: Vec<String>,
    pub separator: String,
    pub target_label: String,
    pub modulus: u64,
    pub replacement: String,

    /// The original (un-anchored) pattern text.
    pub regex: String,

    pub(crate) is_default_regex: bool,
    pub(crate) replacer: StringReplacer,
}

impl ParsedRelabelConfig {
    /// Applies the rule to `labels`, consuming the set and returning either
    /// the next state or a drop decision. Pure with respect to its inputs;
    /// safe to call concurrently against independent label sets.
    pub fn apply(&self, labels: Labels) -> Outcome {
        use RelabelAction::*;
        match self.action {
            Replace => self.replace(labels),
            Lowercase => self.lowercase(labels),
            Uppercase => self.uppercase(labels),
            Keep => self.keep(labels),
            Drop => self.handle_drop(labels),
            KeepEqual => self.keep_equal(labels),
            DropEqual => self.drop_equal(labels),
            HashMod => self.hashmod(labels),
            LabelMap => self.label_map(labels),
            LabelDrop => self.label_drop(labels),
            LabelKeep => self.label_keep(labels),
        }
    }

    /// Store the expanded `replacement` at `target_label` if `regex` matches
    /// `source_labels` joined with `separator`. An empty expansion result
    /// removes `target_label` instead.
    fn replace(&self, mut labels: Labels) -> Outcome {
        let buf = labels.concat(&self.source_labels, &self.separator);
        if self.is_default_regex {
            if self.replacement == "$1" {
                // Fast path for the rule that copies source label values to
                // the destination:
                // - source_labels: [...]
                //   target_label: foobar
                set_or_remove(&mut labels, &self.target_label, buf);
                return Outcome::Labels(labels);
            }
            if !self.replacer.has_capture_group_in_replacement() {
                // Fast path for the rule that sets a literal label value:
                // - target_label: foobar
                //   replacement: something-here
                set_or_remove(&mut labels, &self.target_label, self.replacement.clone());
                return Outcome::Labels(labels);
            }
        }
        match self.replacer.replace_full(&buf) {
            Some(value) => {
                set_or_remove(&mut labels, &self.target_label, value);
                Outcome::Labels(labels)
            }
            // Regex mismatch: no replacement takes place.
            None => Outcome::Labels(labels),
        }
    }

    /// Store the lowercased `source_labels` concatenation at `target_label`.
    fn lowercase(&self, mut labels: Labels) -> Outcome {
        let buf = labels.concat(&self.source_labels, &self.separator);
        labels.set(&self.target_label, buf.to_lowercase());
        Outcome::Labels(labels)
    }

    /// Store the uppercased `source_labels` concatenation at `target_label`.
    fn uppercase(&self, mut labels: Labels) -> Outcome {
        let buf = labels.concat(&self.source_labels, &self.separator);
        labels.set(&self.target_label, buf.to_uppercase());
        Outcome::Labels(labels)
    }

    /// Drop the entry unless `source_labels` joined with `separator`
    /// matches `regex`.
    fn keep(&self, labels: Labels) -> Outcome {
        let buf = labels.concat(&self.source_labels, &self.separator);
        if self.replacer.is_match(&buf) {
            Outcome::Labels(labels)
        } else {
            Outcome::Dropped
        }
    }

    /// Drop the entry if `source_labels` joined with `separator`
    /// matches `regex`.
    fn handle_drop(&self, labels: Labels) -> Outcome {
        let buf = labels.concat(&self.source_labels, &self.separator);
        if self.replacer.is_match(&buf) {
            Outcome::Dropped
        } else {
            Outcome::Labels(labels)
        }
    }

    /// Drop the entry unless `source_labels` joined with `separator` equals
    /// the current value of `target_label`.
    fn keep_equal(&self, labels: Labels) -> Outcome {
        let buf = labels.concat(&self.source_labels, &self.separator);
        if buf == labels.get_value(&self.target_label) {
            Outcome::Labels(labels)
        } else {
            Outcome::Dropped
        }
    }

    /// Drop the entry if `source_labels` joined with `separator` equals
    /// the current value of `target_label`.
    fn drop_equal(&self, labels: Labels) -> Outcome {
        let buf = labels.concat(&self.source_labels, &self.separator);
        if buf == labels.get_value(&self.target_label) {
            Outcome::Dropped
        } else {
            Outcome::Labels(labels)
        }
    }

    /// Store the hashmod of `source_labels` joined with `separator` at
    /// `target_label`.
    ///
    /// The hash is xxh3-64 of the UTF-8 bytes of the concatenation. The
    /// choice is frozen: shard assignments produced under it must stay
    /// stable across runs, platforms and releases.
    fn hashmod(&self, mut labels: Labels) -> Outcome {
        let buf = labels.concat(&self.source_labels, &self.separator);
        let hash_mod = xxh3_64(buf.as_bytes()) % self.modulus;
        labels.set(&self.target_label, hash_mod.to_string());
        Outcome::Labels(labels)
    }

    /// For every label whose name matches `regex`, add (or overwrite) a
    /// label named by the expanded `replacement`, carrying the same value.
    /// Matched originals are retained.
    fn label_map(&self, mut labels: Labels) -> Outcome {
        let mut mapped: Vec<(String, String)> = Vec::new();
        for label in labels.iter() {
            if let Some(name) = self.replacer.replace_full(&label.name) {
                if !name.is_empty() && name != label.name {
                    mapped.push((name, label.value.clone()));
                }
            }
        }
        for (name, value) in mapped {
            labels.set(&name, value);
        }
        Outcome::Labels(labels)
    }

    /// Remove every label whose name matches `regex`.
    fn label_drop(&self, mut labels: Labels) -> Outcome {
        labels.retain(|label| !self.replacer.is_match(&label.name));
        Outcome::Labels(labels)
    }

    /// Remove every label whose name does not match `regex`.
    fn label_keep(&self, mut labels: Labels) -> Outcome {
        labels.retain(|label| self.replacer.is_match(&label.name));
        Outcome::Labels(labels)
    }
}

impl Display for ParsedRelabelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.rule_original)
    }
}

fn set_or_remove(labels: &mut Labels, target_label: &str, value: String) {
    if value.is_empty() {
        labels.remove(target_label);
    } else {
        labels.set(target_label, value);
    }
}

impl ParsedConfigs {
    /// Applies the rule list to `labels`, strictly in list order. Each rule
    /// observes the effects of the previous ones; a drop decision
    /// short-circuits the remaining rules.
    pub fn apply(&self, labels: Labels) -> Outcome {
        let mut labels = labels;
        for prc in self.iter() {
            match prc.apply(labels) {
                Outcome::Labels(next) => labels = next,
                Outcome::Dropped => {
                    trace!(rule = %prc, "relabeling dropped target");
                    return Outcome::Dropped;
                }
            }
        }
        Outcome::Labels(labels)
    }

    /// Like [`apply`](Self::apply), additionally recording one
    /// [`DebugStep`] per executed rule.
    pub fn apply_debug(&self, labels: Labels) -> (Outcome, Vec<DebugStep>) {
        let mut steps = Vec::with_capacity(self.len());
        let mut in_str = labels_to_string(&labels);
        let mut labels = labels;
        for prc in self.iter() {
            match prc.apply(labels) {
                Outcome::Labels(next) => {
                    let out_str = labels_to_string(&next);
                    steps.push(DebugStep {
                        rule: prc.to_string(),
                        r#in: std::mem::replace(&mut in_str, out_str.clone()),
                        out: out_str,
                    });
                    labels = next;
                }
                Outcome::Dropped => {
                    steps.push(DebugStep {
                        rule: prc.to_string(),
                        r#in: in_str,
                        out: "<dropped>".to_string(),
                    });
                    return (Outcome::Dropped, steps);
                }
            }
        }
        (Outcome::Labels(labels), steps)
    }
}

/// Removes labels with empty values. The caller applies this after a full
/// relabeling pass; intermediate states keep empty values visible to
/// subsequent rules.
pub fn remove_empty_labels(labels: &mut Labels) {
    labels.retain(|label| !label.value.is_empty());
}

/// Removes labels with "__" in the beginning (except `__name__`), the final
/// step of target relabeling.
pub fn finalize_labels(labels: &mut Labels) {
    labels.retain(|label| !label.name.starts_with("__") || label.name == METRIC_NAME_LABEL);
}

/// Returns the Prometheus string representation for the given labels.
///
/// Labels in the returned string are sorted by name, while the `__name__`
/// label is put in front of the `{}` part.
pub fn labels_to_string(labels: &Labels) -> String {
    let mut rest: Vec<&Label> = Vec::with_capacity(labels.len());
    let mut mname = "";
    for label in labels {
        if label.name == METRIC_NAME_LABEL {
            mname = &label.value;
        } else {
            rest.push(label);
        }
    }
    rest.sort();
    if !mname.is_empty() && rest.is_empty() {
        return mname.to_string();
    }
    let mut b = String::with_capacity(mname.len() + rest.len() * 16 + 2);
    b.push_str(mname);
    b.push('{');
    for (i, label) in rest.iter().enumerate() {
        b.push_str(&label.name);
        b.push('=');
        b.push_str(&enquote::enquote('"', &label.value));
        if i + 1 < rest.len() {
            b.push(',');
        }
    }
    b.push('}');
    b
}

static UNSUPPORTED_LABEL_NAME_CHARS_REGEX: OnceLock<Regex> = OnceLock::new();
static UNSUPPORTED_METRIC_NAME_CHARS_REGEX: OnceLock<Regex> = OnceLock::new();

fn unsupported_label_name_chars_regex() -> &'static Regex {
    UNSUPPORTED_LABEL_NAME_CHARS_REGEX
        .get_or_init(|| Regex::new(r"[^a-zA-Z0-9_]").expect("BUG: invalid label name chars regex"))
}

fn unsupported_metric_name_chars_regex() -> &'static Regex {
    UNSUPPORTED_METRIC_NAME_CHARS_REGEX
        .get_or_init(|| Regex::new(r"[^a-zA-Z0-9_:]").expect("BUG: invalid metric name chars regex"))
}

pub fn is_valid_metric_name(name: &str) -> bool {
    !name.is_empty() && !unsupported_metric_name_chars_regex().is_match(name)
}

/// sanitize_label_name replaces chars unsupported by Prometheus in label
/// names with `_`.
///
/// See https://prometheus.io/docs/concepts/data_model/#metric-names-and-labels
pub fn sanitize_label_name(name: &str) -> String {
    unsupported_label_name_chars_regex()
        .replace_all(name, "_")
        .to_string()
}

/// sanitize_metric_name replaces chars unsupported by Prometheus in metric
/// names with `_`.
pub fn sanitize_metric_name(name: &str) -> String {
    unsupported_metric_name_chars_regex()
        .replace_all(name, "_")
        .to_string()
}
