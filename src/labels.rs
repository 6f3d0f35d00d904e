// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Maps a container's Docker labels to the list of [`RecordIntent`]s it
//! declares.
//!
//! Label grammar, per record type `T` (`A` or `CNAME`):
//!
//! - Base form: `{prefix}.{T}.name`, `{prefix}.{T}.value`.
//! - Aliased form: `{prefix}.{T}.{alias}.name`, `{prefix}.{T}.{alias}.value`,
//!   where `alias` is any token distinct from `name`, `value`, and `force`.
//!
//! A container may declare a base record and any number of aliased records
//! of the same type at once — aliases namespace otherwise-conflicting
//! declarations on a single container. The builder never returns an error:
//! malformed declarations are logged and dropped, matching the original
//! `record_builder`'s behavior of degrading a single bad label pair rather
//! than failing the whole container.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::{debug, error, warn};

use crate::config::Config;
use crate::intent::RecordIntent;
use crate::record::{Record, RecordType};

const NAME: &str = "name";
const VALUE: &str = "value";
const FORCE: &str = "force";
const ENABLED: &str = "enabled";

#[derive(Default)]
struct BaseFields {
    name: Option<String>,
    value: Option<String>,
    force: Option<bool>,
}

#[derive(Default)]
struct AliasedFields {
    name: Option<String>,
    value: Option<String>,
    force: Option<bool>,
}

/// Builds the list of [`RecordIntent`]s a container's labels declare.
///
/// Returns an empty list if the `{prefix}.enabled` label is not
/// (case-insensitively) `"true"`, or if the container declares nothing
/// that survives validation.
pub fn build_record_intents(
    config: &Config,
    container_id: &str,
    container_name: &str,
    created: DateTime<Utc>,
    labels: &HashMap<String, String>,
) -> Vec<RecordIntent> {
    let prefix = &config.docker_label_prefix;

    let enabled_key = format!("{prefix}.{ENABLED}");
    let enabled = labels
        .get(&enabled_key)
        .is_some_and(|v| v.eq_ignore_ascii_case("true"));
    if !enabled {
        return Vec::new();
    }

    let global_force = labels
        .get(&format!("{prefix}.{FORCE}"))
        .is_some_and(|v| v.eq_ignore_ascii_case("true"));

    let mut base: HashMap<RecordType, BaseFields> = HashMap::new();
    let mut aliased: HashMap<RecordType, HashMap<String, AliasedFields>> = HashMap::new();
    let mut warned_types: HashSet<String> = HashSet::new();

    for (label, value) in labels {
        let parts: Vec<&str> = label.split('.').collect();
        if parts.first() != Some(&prefix.as_str()) || parts.len() < 3 {
            continue;
        }
        let type_token = parts[1];
        if type_token == FORCE || type_token == ENABLED {
            continue;
        }
        let Ok(record_type) = type_token.parse::<RecordType>() else {
            if warned_types.insert(type_token.to_string()) {
                warn!(
                    "[labels] unsupported record type '{}' in label '{}'",
                    type_token, label
                );
            }
            continue;
        };

        match parts.len() {
            3 => {
                let field = parts[2];
                let entry = base.entry(record_type).or_default();
                match field {
                    NAME => entry.name = Some(value.clone()),
                    VALUE => entry.value = Some(value.clone()),
                    FORCE => entry.force = Some(value.eq_ignore_ascii_case("true")),
                    _ => {}
                }
            }
            4 => {
                let alias = parts[2];
                if alias == NAME || alias == VALUE || alias == FORCE {
                    continue;
                }
                let field = parts[3];
                let entry = aliased
                    .entry(record_type)
                    .or_default()
                    .entry(alias.to_string())
                    .or_default();
                match field {
                    NAME => entry.name = Some(value.clone()),
                    VALUE => entry.value = Some(value.clone()),
                    FORCE => entry.force = Some(value.eq_ignore_ascii_case("true")),
                    _ => {}
                }
            }
            _ => debug!("[labels] ignoring deeply nested label '{}'", label),
        }
    }

    let mut records: Vec<(Record, bool)> = Vec::new();

    for (record_type, fields) in &base {
        if !config.allowed_record_types.contains(record_type) {
            continue;
        }
        let prefix_label = format!("{prefix}.{record_type}");
        if let Some(record) = build_one(
            config,
            *record_type,
            &prefix_label,
            fields.name.as_deref(),
            fields.value.as_deref(),
        ) {
            records.push((record, fields.force.unwrap_or(global_force)));
        }
    }

    for (record_type, aliases) in &aliased {
        if !config.allowed_record_types.contains(record_type) {
            continue;
        }
        for (alias, fields) in aliases {
            let prefix_label = format!("{prefix}.{record_type}.{alias}");
            if let Some(record) = build_one(
                config,
                *record_type,
                &prefix_label,
                fields.name.as_deref(),
                fields.value.as_deref(),
            ) {
                records.push((record, fields.force.unwrap_or(global_force)));
            }
        }
    }

    records
        .into_iter()
        .map(|(record, force)| RecordIntent {
            record,
            hostname: config.hostname.clone(),
            container_id: container_id.to_string(),
            container_name: container_name.to_string(),
            created,
            force,
        })
        .collect()
}

/// Applies the A/CNAME defaulting and error-logging rules to one base or
/// aliased declaration, returning the constructed record if it survives.
fn build_one(
    config: &Config,
    record_type: RecordType,
    prefix_label: &str,
    name: Option<&str>,
    value: Option<&str>,
) -> Option<Record> {
    let Some(name) = name else {
        match value {
            Some(value) => error!(
                "[labels] {}.value={} label found with no matching {}.name pair",
                prefix_label, value, prefix_label
            ),
            None => error!("[labels] {}.name label missing", prefix_label),
        }
        return None;
    };

    let built = match record_type {
        RecordType::A => {
            let value = match value {
                Some(v) => v.to_string(),
                None => {
                    warn!(
                        "[labels] {}.name={} label found with no matching {}.value pair, using configured host IP {} as default",
                        prefix_label, name, prefix_label, config.host_ip
                    );
                    config.host_ip.to_string()
                }
            };
            Record::new_a(name, &value)
        }
        RecordType::Cname => {
            let Some(value) = value else {
                error!(
                    "[labels] {}.name={} label found with no matching {}.value pair",
                    prefix_label, name, prefix_label
                );
                return None;
            };
            Record::new_cname(name, value)
        }
    };

    match built {
        Ok(record) => Some(record),
        Err(e) => {
            warn!("[labels] invalid {} record {}: {}", record_type, name, e);
            None
        }
    }
}
