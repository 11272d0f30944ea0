//! Parses and hand-validates the declarative policy document into an
//! immutable `PolicyConfig`.
//!
//! Validation follows a parse-then-validate split: `serde_json` does
//! the structural deserialization (wrong types or missing required
//! keys fail here, surfaced as `IoError::Json`), then `validate_policy`
//! checks the semantic rules a JSON Schema can't express on its own
//! (exact ranking-rule sequence, stage/join-key cross-references).

use std::path::Path;

use mentoralloc_core::policy::{ChannelRule, PolicyConfig, RankingRule, StageName, TraceStageDescriptor, JOIN_KEY_COUNT};

use crate::IoError;

/// The major.minor prefix every policy document must declare. Patch
/// versions (`1.0.3`, `1.0.7`, ...) are accepted.
pub const EXPECTED_POLICY_MAJOR_MINOR: &str = "1.0";

/// Parse and validate a policy document from a JSON string, returning
/// the typed config alongside its content digest.
#[cfg(feature = "hash")]
pub fn load_policy_str(s: &str) -> Result<(PolicyConfig, String), IoError> {
    let policy: PolicyConfig = serde_json::from_str(s)?;
    validate_policy(&policy)?;
    let digest = crate::hasher::policy_digest(&policy)?;
    Ok((policy, digest))
}

/// Parse and validate a policy document without computing a digest
/// (for callers built without the `hash` feature).
pub fn parse_policy_str(s: &str) -> Result<PolicyConfig, IoError> {
    let policy: PolicyConfig = serde_json::from_str(s)?;
    validate_policy(&policy)?;
    Ok(policy)
}

/// Load and validate a policy document from disk.
#[cfg(feature = "hash")]
pub fn load_policy_file<P: AsRef<Path>>(path: P) -> Result<(PolicyConfig, String), IoError> {
    let text = std::fs::read_to_string(path)?;
    load_policy_str(&text)
}

/// Run every structural validation rule from the policy's declared
/// shape. All failures are reported as `IoError::PolicyInvalid` —
/// fatal, aborting the run before any allocation.
pub fn validate_policy(policy: &PolicyConfig) -> Result<(), IoError> {
    validate_version(&policy.version)?;
    validate_join_keys(&policy.join_keys)?;
    validate_ranking_rules(&policy.ranking_rules)?;
    validate_trace_stages(&policy.trace_stages, &policy.join_keys)?;
    validate_allocation_channels(&policy.allocation_channels)?;
    Ok(())
}

fn validate_version(version: &str) -> Result<(), IoError> {
    let expected_prefix = format!("{EXPECTED_POLICY_MAJOR_MINOR}.");
    if version == EXPECTED_POLICY_MAJOR_MINOR || version.starts_with(&expected_prefix) {
        Ok(())
    } else {
        Err(IoError::PolicyInvalid(format!(
            "version '{version}' does not match the expected major.minor '{EXPECTED_POLICY_MAJOR_MINOR}'"
        )))
    }
}

fn validate_join_keys(join_keys: &[String; JOIN_KEY_COUNT]) -> Result<(), IoError> {
    if join_keys.iter().any(|k| k.trim().is_empty()) {
        return Err(IoError::PolicyInvalid("join_keys must not contain an empty name".into()));
    }
    let mut seen = std::collections::BTreeSet::new();
    for k in join_keys {
        if !seen.insert(k.as_str()) {
            return Err(IoError::PolicyInvalid(format!("join_keys must be distinct; '{k}' is declared twice")));
        }
    }
    Ok(())
}

fn validate_ranking_rules(rules: &[RankingRule; 3]) -> Result<(), IoError> {
    if *rules == RankingRule::FIXED_SEQUENCE {
        Ok(())
    } else {
        Err(IoError::PolicyInvalid(
            "ranking_rules must equal the fixed sequence [min_occupancy_ratio, min_allocations_new, min_mentor_id] in that order".into(),
        ))
    }
}

fn validate_trace_stages(
    stages: &[TraceStageDescriptor; 8],
    join_keys: &[String; JOIN_KEY_COUNT],
) -> Result<(), IoError> {
    for (i, expected_name) in StageName::FIXED_ORDER.iter().enumerate() {
        let stage = &stages[i];
        if stage.name != *expected_name {
            return Err(IoError::PolicyInvalid(format!(
                "trace_stages[{i}] must be '{}', found '{}'",
                expected_name.as_str(),
                stage.name.as_str()
            )));
        }
        if stage.source_column.trim().is_empty() {
            return Err(IoError::PolicyInvalid(format!(
                "trace_stages[{i}] ('{}') has an empty source_column",
                expected_name.as_str()
            )));
        }
        if stage.drop_reason.trim().is_empty() {
            return Err(IoError::PolicyInvalid(format!(
                "trace_stages[{i}] ('{}') has an empty drop_reason",
                expected_name.as_str()
            )));
        }
    }

    // type and group both source from the same join key (one-to-many
    // mapping is declared behavior, not a policy bug — spec §4.1).
    if stages[0].source_column != stages[1].source_column {
        return Err(IoError::PolicyInvalid(format!(
            "trace_stages[0] (type) and trace_stages[1] (group) must share a source_column, found '{}' and '{}'",
            stages[0].source_column, stages[1].source_column
        )));
    }

    // The first six stages are join-key driven; their source_column
    // must name a declared join key. `school` and `capacity_gate` are
    // not join-key columns and are exempt.
    for stage in &stages[..6] {
        if !join_keys.contains(&stage.source_column) {
            return Err(IoError::PolicyInvalid(format!(
                "trace_stages source_column '{}' is not one of the declared join_keys",
                stage.source_column
            )));
        }
    }

    Ok(())
}

fn validate_allocation_channels(channels: &[ChannelRule]) -> Result<(), IoError> {
    if channels.is_empty() {
        Err(IoError::PolicyInvalid("allocation_channels must declare at least one rule".into()))
    } else {
        Ok(())
    }
}
