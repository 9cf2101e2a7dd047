use anyhow::{bail, Context};
use glam::Vec2;

use crate::registry::UpdatePolicy;
use crate::scene_graph::NodeTemplate;

pub const QUEUE_CAPACITY_VAR: &str = "ROOMSCENE_QUEUE_CAPACITY";
pub const UPDATE_POLICY_VAR: &str = "ROOMSCENE_UPDATE_POLICY";
pub const PENDING_CAPACITY_VAR: &str = "ROOMSCENE_PENDING_CAPACITY";

#[derive(Debug, Clone, Default)]
pub struct QueueConfig {
    /// Maximum number of pending tasks. `None` never blocks producers.
    pub capacity: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct FocusConfig {
    /// Distance in front of the camera while no surface is found.
    pub distance: f32,
    /// Hit-test location in normalized view coordinates.
    pub screen_center: Vec2,
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            distance: 0.5,
            screen_center: Vec2::new(0.5, 0.5),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub queue: QueueConfig,
    pub update_policy: UpdatePolicy,
    pub focus: FocusConfig,
    pub template: NodeTemplate,
}

impl PipelineConfig {
    /// Defaults overridden by `ROOMSCENE_*` environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Some(value) = lookup(QUEUE_CAPACITY_VAR) {
            config.queue.capacity = Some(parse_capacity(QUEUE_CAPACITY_VAR, &value)?);
        }

        let pending_capacity = match lookup(PENDING_CAPACITY_VAR) {
            Some(value) => parse_capacity(PENDING_CAPACITY_VAR, &value)?,
            None => UpdatePolicy::DEFAULT_PENDING_CAPACITY,
        };

        if let Some(value) = lookup(UPDATE_POLICY_VAR) {
            config.update_policy = match value.to_ascii_lowercase().as_str() {
                "drop" => UpdatePolicy::Drop,
                "buffer" => UpdatePolicy::Buffer {
                    capacity: pending_capacity,
                },
                other => bail!("{UPDATE_POLICY_VAR} must be `drop` or `buffer`, got {other:?}"),
            };
        } else if let UpdatePolicy::Buffer { capacity } = &mut config.update_policy {
            *capacity = pending_capacity;
        }

        Ok(config)
    }
}

/// Capacities are positive; an unbounded queue is spelled by leaving the
/// variable unset.
fn parse_capacity(name: &str, value: &str) -> anyhow::Result<usize> {
    let capacity: usize = value
        .parse()
        .with_context(|| format!("{name} is not a number: {value:?}"))?;
    if capacity == 0 {
        bail!("{name} must be at least 1");
    }
    Ok(capacity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_buffer_stale_updates_on_an_unbounded_queue() {
        let config = PipelineConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.queue.capacity, None);
        assert_eq!(
            config.update_policy,
            UpdatePolicy::Buffer {
                capacity: UpdatePolicy::DEFAULT_PENDING_CAPACITY
            }
        );
    }

    #[test]
    fn env_overrides_are_applied() {
        let config = PipelineConfig::from_lookup(lookup(&[
            (QUEUE_CAPACITY_VAR, "16"),
            (UPDATE_POLICY_VAR, "Drop"),
        ]))
        .unwrap();
        assert_eq!(config.queue.capacity, Some(16));
        assert_eq!(config.update_policy, UpdatePolicy::Drop);

        let config = PipelineConfig::from_lookup(lookup(&[(PENDING_CAPACITY_VAR, "4")])).unwrap();
        assert_eq!(config.update_policy, UpdatePolicy::Buffer { capacity: 4 });
    }

    #[test]
    fn malformed_values_are_rejected() {
        assert!(PipelineConfig::from_lookup(lookup(&[(QUEUE_CAPACITY_VAR, "lots")])).is_err());
        assert!(PipelineConfig::from_lookup(lookup(&[(UPDATE_POLICY_VAR, "keep")])).is_err());
    }

    #[test]
    fn zero_capacities_are_rejected() {
        let error = PipelineConfig::from_lookup(lookup(&[(QUEUE_CAPACITY_VAR, "0")])).unwrap_err();
        assert!(error.to_string().contains(QUEUE_CAPACITY_VAR));
        assert!(PipelineConfig::from_lookup(lookup(&[(PENDING_CAPACITY_VAR, "0")])).is_err());
    }
}
