//! Config validation: unknown-key detection with Levenshtein suggestions
//! and range checks.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Warnings never break existing configs.

use std::collections::HashSet;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

/// Upper bound on widening retries: the window doubles on each one.
pub const MAX_RETRIES_LIMIT: u32 = 8;

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for `MonitorConfig`.
///
/// Must be kept in step with the structs in `monitor_config.rs`.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [vessels]
        "vessels",
        "vessels.ids",
        // [influx]
        "influx",
        "influx.url",
        "influx.database",
        "influx.retention_policy",
        "influx.measurement",
        "influx.topic_prefix",
        "influx.username",
        "influx.password",
        "influx.timeout_secs",
        // [analysis]
        "analysis",
        "analysis.acceptable_delta",
        "analysis.max_temperature",
        "analysis.window_points",
        "analysis.group_minutes",
        "analysis.max_retries",
        // [alerts]
        "alerts",
        "alerts.dry_run",
        "alerts.credentials_path",
        "alerts.notify_on_no_data",
        "alerts.sms_endpoint",
        "alerts.timeout_secs",
        // [storage]
        "storage",
        "storage.data_dir",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// For example, a table `{ a = { b = 1, c = 2 } }` yields:
/// `["a", "a.b", "a.c"]`
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
///
/// Ties resolve to the alphabetically first key so suggestions are stable.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|&k| (levenshtein(unknown, k), k))
        .filter(|(dist, _)| *dist <= 3)
        .min()
        .map(|(_, k)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// This does NOT fail on unknown keys, it only warns.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // parse errors are handled by serde later
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

// ============================================================================
// Range Validation
// ============================================================================

/// Validate value ranges on a parsed `MonitorConfig`.
///
/// Returns (errors, warnings): errors must prevent the run, warnings are
/// suspicious but not fatal.
pub fn validate_ranges(config: &super::MonitorConfig) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let a = &config.analysis;

    if a.max_retries > MAX_RETRIES_LIMIT {
        errors.push(format!(
            "analysis.max_retries = {} exceeds the limit of {MAX_RETRIES_LIMIT}",
            a.max_retries
        ));
    }

    if a.window_points == 1 {
        warnings.push(ValidationWarning {
            field: "analysis.window_points".to_string(),
            message: "analysis.window_points = 1 disables the convergence check \
                      (a single sample has no trend)"
                .to_string(),
            suggestion: None,
        });
    }

    if a.acceptable_delta > 5.0 {
        warnings.push(ValidationWarning {
            field: "analysis.acceptable_delta".to_string(),
            message: format!(
                "analysis.acceptable_delta = {:.2} is unusually large (typical 0.2-2 °C)",
                a.acceptable_delta
            ),
            suggestion: None,
        });
    }

    if let Some(max) = a.max_temperature {
        if !(0.0..=40.0).contains(&max) {
            warnings.push(ValidationWarning {
                field: "analysis.max_temperature".to_string(),
                message: format!(
                    "analysis.max_temperature = {max:.1} is outside the typical fermentation range (0-40 °C)"
                ),
                suggestion: None,
            });
        }
    }

    if a.group_minutes > 60 {
        warnings.push(ValidationWarning {
            field: "analysis.group_minutes".to_string(),
            message: format!(
                "analysis.group_minutes = {} makes each bucket longer than an hour",
                a.group_minutes
            ),
            suggestion: None,
        });
    }

    (errors, warnings)
}

// ============================================================================
// Tests
// ============================================================================
