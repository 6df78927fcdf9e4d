//! Prometheus-compatible label relabeling.
//!
//! The crate validates relabel rule lists once at configuration-load time
//! and then applies them, in order, to transient label sets. A validated
//! [`ParsedConfigs`] is immutable and safe to share across threads; applying
//! it never fails, the worst outcome being [`Outcome::Dropped`].
//!
//! ```
//! use promrelabel::{parse_relabel_configs_data, Labels, Outcome};
//!
//! let configs = parse_relabel_configs_data(
//!     r#"
//! - action: drop
//!   source_labels: [env]
//!   regex: "test"
//! - source_labels: [job, instance]
//!   separator: "/"
//!   target_label: endpoint
//! "#,
//! )
//! .unwrap();
//!
//! let labels = Labels::from_pairs([("job", "api"), ("instance", "host1:9100")]);
//! match configs.apply(labels) {
//!     Outcome::Labels(labels) => assert_eq!(labels.get("endpoint"), Some("api/host1:9100")),
//!     Outcome::Dropped => unreachable!(),
//! }
//! ```

mod duration;
mod error;
mod labels;
mod relabel;

pub use duration::parse_duration;
pub use error::{ConfigError, FormatError, ValidationError};
pub use labels::{is_valid_label_name, Label, Labels, METRIC_NAME_LABEL};
pub use relabel::*;
