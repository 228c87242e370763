//! Plan-time checks on universe cluster changes
//!
//! Declared user intents are laid over the recorded ones before comparing,
//! so an attribute the configuration leaves out counts as unchanged.

use crate::models::{ClusterType, UserIntent};

use super::config::ClusterConfig;

/// Effective intent of each cluster type
#[derive(Debug, Default)]
struct Intents {
    primary: Option<UserIntent>,
    read_replica: Option<UserIntent>,
    count: usize,
}

impl Intents {
    fn collect(clusters: &[ClusterConfig], base: Option<&Intents>) -> Self {
        let mut intents = Intents {
            count: clusters.len(),
            ..Default::default()
        };
        for cluster in clusters {
            let declared = UserIntent::from(&cluster.user_intent);
            let recorded = base.and_then(|b| b.get(cluster.cluster_type));
            let effective = match recorded {
                Some(recorded) => recorded.overlay(&declared).unwrap_or(declared),
                None => declared,
            };
            match cluster.cluster_type {
                ClusterType::Primary => intents.primary = Some(effective),
                ClusterType::Async => intents.read_replica = Some(effective),
            }
        }
        intents
    }

    fn get(&self, cluster_type: ClusterType) -> Option<&UserIntent> {
        match cluster_type {
            ClusterType::Primary => self.primary.as_ref(),
            ClusterType::Async => self.read_replica.as_ref(),
        }
    }
}

/// Check a cluster list (and the change from `old`, when recorded) against
/// what the platform can apply. Returns every violated rule.
pub fn validate_clusters(old: Option<&[ClusterConfig]>, new: &[ClusterConfig]) -> Vec<String> {
    let mut errors = Vec::new();

    let primaries = new
        .iter()
        .filter(|c| c.cluster_type == ClusterType::Primary)
        .count();
    if primaries != 1 {
        errors.push("Universe must have exactly one PRIMARY cluster".to_string());
    }
    if new.len() - primaries > 1 {
        errors.push("Cannot have more than 1 Read only cluster".to_string());
    }

    let old = old.filter(|clusters| !clusters.is_empty());
    let old_intents = old.map(|clusters| Intents::collect(clusters, None));
    let new_intents = Intents::collect(new, old_intents.as_ref());

    if let Some(old_intents) = &old_intents {
        errors.extend(transition_errors(old_intents, &new_intents));
    }
    errors.extend(pairing_errors(&new_intents, old_intents.is_some()));
    errors
}

fn transition_errors(old: &Intents, new: &Intents) -> Vec<String> {
    let mut errors = Vec::new();

    if old.count < new.count {
        errors.push("Cannot add Read Replica to existing universe".to_string());
    }

    if let (Some(old), Some(new)) = (&old.primary, &new.primary) {
        if old.systemd() && !new.systemd() {
            errors.push("Cannot disable SystemD".to_string());
        }
        if new.volume_size() < old.volume_size() {
            errors.push("Cannot decrease Volume Size of nodes in Primary Cluster".to_string());
        }
        if old.instance_type() == new.instance_type() && old.num_volumes() != new.num_volumes() {
            errors.push(
                "Cannot change number of volumes per node without change in instance type in Primary Cluster"
                    .to_string(),
            );
        }
    }

    if let (Some(old), Some(new)) = (&old.read_replica, &new.read_replica) {
        if new.volume_size() < old.volume_size() {
            errors.push("Cannot decrease Volume Size of nodes in Read Replica Cluster".to_string());
        }
        if old.instance_type() == new.instance_type()
            && (old.num_volumes() != new.num_volumes() || old.volume_size() != new.volume_size())
        {
            errors.push(
                "Cannot change number of volumes or volume size per node without change in instance type in Read Replica Cluster"
                    .to_string(),
            );
        }
    }

    errors
}

/// Settings the read replica has to share with the primary cluster
fn pairing_errors(new: &Intents, has_old: bool) -> Vec<String> {
    let mut errors = Vec::new();
    let (Some(primary), Some(replica)) = (&new.primary, &new.read_replica) else {
        return errors;
    };

    match (&primary.universe_name, &replica.universe_name) {
        (Some(p), Some(r)) if p.is_empty() || r.is_empty() => {
            errors.push("Universe name cannot be empty".to_string());
        }
        (Some(p), Some(r)) if p != r => {
            errors.push(
                "Cannot have different universe names for Primary and Read Only clusters"
                    .to_string(),
            );
        }
        (Some(_), Some(_)) => {}
        _ => errors.push("Universe name cannot be empty".to_string()),
    }

    if has_old && primary.software_version() != replica.software_version() {
        errors.push(
            "Cannot have different software versions for Primary and Read Only clusters"
                .to_string(),
        );
    }
    if primary.systemd() != replica.systemd() {
        errors.push(
            "Cannot have different systemD settings for Primary and Read Only clusters"
                .to_string(),
        );
    }
    if primary.master_gflags() != replica.master_gflags()
        || primary.tserver_gflags() != replica.tserver_gflags()
    {
        errors.push(
            "Cannot have different Gflags settings for Primary and Read Only clusters".to_string(),
        );
    }
    if primary.node_to_node_encrypt() != replica.node_to_node_encrypt()
        || primary.client_to_node_encrypt() != replica.client_to_node_encrypt()
    {
        errors.push(
            "Cannot have different TLS settings for Primary and Read Only clusters".to_string(),
        );
    }

    errors
}
