//! Presence snapshotter
//!
//! Groups members by their current activity label. Every name already on
//! the policy's known-activity list gets a bucket even with zero current
//! players, so previously-rostered roles are still considered for removal.
//! Labels never seen before are discoveries: appended to the known list in
//! discovery order.

use roled_types::{Member, Policy};
use std::collections::HashMap;

/// One activity and the members currently engaged in it.
#[derive(Debug, Clone)]
pub struct ActivityBucket {
    /// Raw activity label, not alias-resolved.
    pub activity: String,
    pub members: Vec<Member>,
}

/// Pass-scoped grouping of members by activity. Iteration order is the
/// known-activity order followed by discovery order; never persisted.
#[derive(Debug, Clone, Default)]
pub struct ActivityGroups {
    buckets: Vec<ActivityBucket>,
}

impl ActivityGroups {
    pub fn iter(&self) -> impl Iterator<Item = &ActivityBucket> {
        self.buckets.iter()
    }

    pub fn get(&self, activity: &str) -> Option<&ActivityBucket> {
        self.buckets.iter().find(|b| b.activity == activity)
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

/// Compute the activity snapshot for one community.
///
/// Appends discovered labels to `policy.known_activities`; the returned bool
/// says whether the policy changed so the caller can persist it. Discovery
/// of an ignored member's activity is not logged, but the bucket is created
/// regardless of ignore status.
pub fn compute_activity_groups(policy: &mut Policy, members: &[Member]) -> (ActivityGroups, bool) {
    let mut buckets: Vec<ActivityBucket> = policy
        .known_activities
        .iter()
        .map(|activity| ActivityBucket {
            activity: activity.clone(),
            members: Vec::new(),
        })
        .collect();
    let mut index: HashMap<String, usize> = buckets
        .iter()
        .enumerate()
        .map(|(i, b)| (b.activity.clone(), i))
        .collect();

    let mut changed = false;
    for member in members {
        let Some(activity) = member.activity.as_deref() else {
            continue;
        };
        if activity.is_empty() {
            continue;
        }

        match index.get(activity) {
            Some(&i) => buckets[i].members.push(member.clone()),
            None => {
                if !policy.is_ignored(&member.name) {
                    tracing::info!(activity, member = %member.name, "discovered new activity");
                }
                index.insert(activity.to_string(), buckets.len());
                buckets.push(ActivityBucket {
                    activity: activity.to_string(),
                    members: vec![member.clone()],
                });
                policy.known_activities.push(activity.to_string());
                changed = true;
            }
        }
    }

    (ActivityGroups { buckets }, changed)
}
