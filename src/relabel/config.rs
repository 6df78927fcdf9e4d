use std::fmt;
use std::fmt::Display;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, ValidationError};
use crate::labels::is_valid_label_name;
use crate::relabel::relabel::ParsedRelabelConfig;
use crate::relabel::string_replacer::StringReplacer;

/// Default `regex` applied when the field is absent from the configuration.
pub const DEFAULT_REGEX_FOR_RELABEL_CONFIG: &str = "(.*)";

const DEFAULT_SEPARATOR: &str = ";";
const DEFAULT_REPLACEMENT: &str = "$1";

/// The relabeling action performed by one rule.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelabelAction {
    #[default]
    Replace,
    Lowercase,
    Uppercase,
    Keep,
    Drop,
    KeepEqual,
    DropEqual,
    HashMod,
    LabelMap,
    LabelDrop,
    LabelKeep,
}

impl RelabelAction {
    /// Actions that write their result to `target_label`.
    pub(crate) fn requires_target_label(&self) -> bool {
        use RelabelAction::*;
        matches!(
            self,
            Replace | Lowercase | Uppercase | HashMod | KeepEqual | DropEqual
        )
    }

    /// Actions for which `regex` must be set explicitly; the default
    /// pattern never stands in for a missing field here.
    pub(crate) fn requires_regex(&self) -> bool {
        use RelabelAction::*;
        matches!(self, Keep | Drop | LabelMap | LabelDrop | LabelKeep)
    }
}

impl Display for RelabelAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use RelabelAction::*;
        match self {
            Replace => write!(f, "replace"),
            Lowercase => write!(f, "lowercase"),
            Uppercase => write!(f, "uppercase"),
            Keep => write!(f, "keep"),
            Drop => write!(f, "drop"),
            KeepEqual => write!(f, "keepequal"),
            DropEqual => write!(f, "dropequal"),
            HashMod => write!(f, "hashmod"),
            LabelMap => write!(f, "labelmap"),
            LabelDrop => write!(f, "labeldrop"),
            LabelKeep => write!(f, "labelkeep"),
        }
    }
}

impl FromStr for RelabelAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use RelabelAction::*;
        match s.to_lowercase().as_str() {
            "replace" => Ok(Replace),
            "lowercase" => Ok(Lowercase),
            "uppercase" => Ok(Uppercase),
            "keep" => Ok(Keep),
            "drop" => Ok(Drop),
            "keepequal" | "keep_equal" => Ok(KeepEqual),
            "dropequal" | "drop_equal" => Ok(DropEqual),
            "hashmod" => Ok(HashMod),
            "labelmap" | "label_map" => Ok(LabelMap),
            "labeldrop" | "label_drop" => Ok(LabelDrop),
            "labelkeep" | "label_keep" => Ok(LabelKeep),
            _ => Err(format!("unknown action: {}", s)),
        }
    }
}

/// RelabelConfig represents one raw `relabel_config` entry.
///
/// See https://prometheus.io/docs/prometheus/latest/configuration/configuration/#relabel_config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelabelConfig {
    #[serde(default)]
    pub source_labels: Vec<String>,

    #[serde(default = "default_separator")]
    pub separator: String,

    #[serde(default)]
    pub target_label: String,

    /// `None` means the field was absent from the configuration, which is
    /// distinct from an explicitly empty pattern.
    #[serde(default)]
    pub regex: Option<String>,

    #[serde(default)]
    pub modulus: u64,

    #[serde(default = "default_replacement")]
    pub replacement: String,

    #[serde(default)]
    pub action: RelabelAction,
}

fn default_separator() -> String {
    DEFAULT_SEPARATOR.to_string()
}

fn default_replacement() -> String {
    DEFAULT_REPLACEMENT.to_string()
}

impl Default for RelabelConfig {
    fn default() -> Self {
        RelabelConfig {
            source_labels: vec![],
            separator: default_separator(),
            target_label: String::new(),
            regex: None,
            modulus: 0,
            replacement: default_replacement(),
            action: RelabelAction::default(),
        }
    }
}

impl Display for RelabelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "action={}, source_labels={:?}, separator={:?}, target_label={:?}, regex={:?}, modulus={}, replacement={:?}",
            self.action,
            self.source_labels,
            self.separator,
            self.target_label,
            self.regex.as_deref().unwrap_or(DEFAULT_REGEX_FOR_RELABEL_CONFIG),
            self.modulus,
            self.replacement,
        )
    }
}

impl RelabelConfig {
    /// Validates this rule and compiles it into an executable form.
    ///
    /// `index` is the rule's position in its list and is reported in every
    /// error so the operator can find the offending entry.
    pub fn compile(&self, index: usize) -> Result<ParsedRelabelConfig, ValidationError> {
        if self.action.requires_target_label() && self.target_label.is_empty() {
            return Err(ValidationError::MissingTargetLabel {
                rule: index,
                action: self.action.to_string(),
            });
        }
        if self.action.requires_regex() && self.regex.is_none() {
            return Err(ValidationError::MissingRegex {
                rule: index,
                action: self.action.to_string(),
            });
        }
        if self.action == RelabelAction::HashMod && self.modulus == 0 {
            return Err(ValidationError::NonPositiveModulus { rule: index });
        }
        if !self.target_label.is_empty() && !is_valid_label_name(&self.target_label) {
            return Err(ValidationError::InvalidLabelName {
                rule: index,
                field: "target_label",
                name: self.target_label.clone(),
            });
        }
        for name in &self.source_labels {
            if !is_valid_label_name(name) {
                return Err(ValidationError::InvalidLabelName {
                    rule: index,
                    field: "source_labels",
                    name: name.clone(),
                });
            }
        }

        let pattern = self
            .regex
            .as_deref()
            .unwrap_or(DEFAULT_REGEX_FOR_RELABEL_CONFIG);
        // The pattern is anchored on both ends; rule authors un-anchor with
        // an explicit `.*pattern.*`.
        let regex_anchored =
            Regex::new(&format!("^(?:{pattern})$")).map_err(|e| ValidationError::InvalidRegex {
                rule: index,
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })?;

        Ok(ParsedRelabelConfig {
            rule_original: self.to_string(),
            action: self.action,
            source_labels: self.source_labels.clone(),
            separator: self.separator.clone(),
            target_label: self.target_label.clone(),
            modulus: self.modulus,
            replacement: self.replacement.clone(),
            regex: pattern.to_string(),
            is_default_regex: is_default_regex(pattern),
            replacer: StringReplacer::new(regex_anchored, self.replacement.clone()),
        })
    }
}

// Exactly the default pattern: an explicit `.*` matches the same inputs but
// has no capture group, so `$1` expands differently and must take the
// substitution path.
fn is_default_regex(pattern: &str) -> bool {
    pattern == DEFAULT_REGEX_FOR_RELABEL_CONFIG
}

/// ParsedConfigs is an ordered, validated relabel rule list, immutable and
/// safe to evaluate concurrently against independent label sets.
#[derive(Debug, Clone)]
pub struct ParsedConfigs(pub Vec<ParsedRelabelConfig>);

impl ParsedConfigs {
    /// Validates and compiles `configs`. Fails on the first malformed rule;
    /// a failing list is rejected wholesale.
    pub fn parse(configs: &[RelabelConfig]) -> Result<Self, ValidationError> {
        let mut parsed = Vec::with_capacity(configs.len());
        for (i, config) in configs.iter().enumerate() {
            parsed.push(config.compile(i)?);
        }
        Ok(ParsedConfigs(parsed))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ParsedRelabelConfig> {
        self.0.iter()
    }
}

impl Display for ParsedConfigs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for prc in &self.0 {
            writeln!(f, "{}", prc)?;
        }
        Ok(())
    }
}

/// Checks the structural invariants of `configs` without keeping the
/// compiled rules around.
pub fn validate_relabel_configs(configs: &[RelabelConfig]) -> Result<(), ValidationError> {
    for (i, config) in configs.iter().enumerate() {
        config.compile(i)?;
    }
    Ok(())
}

/// Parses and validates relabel configs from YAML data of the form carried
/// by `relabel_configs` / `metric_relabel_configs` sections.
pub fn parse_relabel_configs_data(data: &str) -> Result<ParsedConfigs, ConfigError> {
    let configs: Vec<RelabelConfig> = serde_yaml::from_str(data)?;
    let parsed = ParsedConfigs::parse(&configs)?;
    debug!(rules = parsed.len(), "loaded relabel configs");
    Ok(parsed)
}
