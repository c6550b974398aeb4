//! Reconciliation passes
//!
//! One pass covers a single community: snapshot member activities, resolve
//! each activity to a role by display name, then diff owed memberships
//! against held memberships. Role existence is resolved before membership
//! ops for the same activity, because those ops reference the (possibly
//! just-created) role. The engine only ever removes roles *from members*;
//! deleting a role outright is the `remove` command's job.

use crate::error::EngineResult;
use crate::snapshot::{compute_activity_groups, ActivityGroups};
use roled_gateway::{attempt, Gateway};
use roled_store::SettingsStore;
use roled_types::{code_block, ChannelId, CommunityId, Member, Policy, RemoteOp, RemoteRole};
use std::sync::Arc;

/// Drives reconciliation passes against the gateway.
pub struct Reconciler {
    store: Arc<dyn SettingsStore>,
    gateway: Arc<dyn Gateway>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn SettingsStore>, gateway: Arc<dyn Gateway>) -> Self {
        Self { store, gateway }
    }

    /// Run one reconciliation pass for a community.
    ///
    /// A disabled policy is a no-op pass, not an error. With `narrate_to`
    /// set (a loud, user-triggered pass) every newly issued op is echoed to
    /// that channel; idempotent no-ops never narrate. Remote failures are
    /// logged and skipped; the pass is not transactional and the next pass
    /// corrects partial application.
    pub async fn reconcile(
        &self,
        community: &CommunityId,
        narrate_to: Option<&ChannelId>,
    ) -> EngineResult<Vec<RemoteOp>> {
        let mut policy = self.store.get(community).await?;
        if !policy.enabled {
            return Ok(Vec::new());
        }

        let Some(members) = attempt("list_members", self.gateway.list_members(community)).await
        else {
            return Ok(Vec::new());
        };
        let Some(roles) = attempt("list_roles", self.gateway.list_roles(community)).await else {
            return Ok(Vec::new());
        };

        let (groups, discovered) = compute_activity_groups(&mut policy, &members);
        if discovered {
            self.store.set(community, policy.clone()).await?;
        }

        let mut issued = Vec::new();
        for bucket in groups.iter() {
            let role_name = policy.display_name(&bucket.activity).to_string();
            let num_players = bucket.members.len();
            let eligible = policy.is_eligible(&bucket.activity, num_players);

            // First match in enumeration order is canonical when duplicate
            // names exist.
            let mut role = roles.iter().find(|r| r.name == role_name).cloned();
            if role.is_none() {
                if !eligible {
                    continue;
                }
                let created = attempt(
                    "create_role",
                    self.gateway.create_role(community, &role_name, true),
                )
                .await;
                let Some(created) = created else {
                    continue;
                };
                tracing::info!(community = %community, role = %role_name, "created role");
                let op = RemoteOp::CreateRole {
                    name: role_name.clone(),
                    hoisted: true,
                };
                self.narrate(narrate_to, &op).await;
                issued.push(op);
                role = Some(created);
            }
            let Some(role) = role else {
                continue;
            };

            for member in &members {
                let in_group = bucket.members.iter().any(|m| m.id == member.id);
                let owed = in_group && !policy.is_ignored(&member.name) && eligible;
                let held = member.holds(&role.id);

                if owed && !held {
                    // A pass spans many remote ops with real latency and the
                    // policy may be disabled by a concurrent command mid-pass:
                    // re-fetch the live enabled flag before every assign.
                    if !self.store.get(community).await?.enabled {
                        tracing::info!(
                            community = %community,
                            "policy disabled mid-pass, suppressing assign"
                        );
                        continue;
                    }
                    if attempt(
                        "assign_role",
                        self.gateway.assign_role(community, &member.id, &role.id),
                    )
                    .await
                    .is_some()
                    {
                        tracing::info!(
                            community = %community,
                            role = %role.name,
                            member = %member.name,
                            "assigned role"
                        );
                        let op = RemoteOp::AssignRole {
                            member: member.id.clone(),
                            member_name: member.name.clone(),
                            role: role.id.clone(),
                            role_name: role.name.clone(),
                        };
                        self.narrate(narrate_to, &op).await;
                        issued.push(op);
                    }
                } else if !owed && held {
                    if attempt(
                        "unassign_role",
                        self.gateway.unassign_role(community, &member.id, &role.id),
                    )
                    .await
                    .is_some()
                    {
                        tracing::info!(
                            community = %community,
                            role = %role.name,
                            member = %member.name,
                            "removed role"
                        );
                        let op = RemoteOp::UnassignRole {
                            member: member.id.clone(),
                            member_name: member.name.clone(),
                            role: role.id.clone(),
                            role_name: role.name.clone(),
                        };
                        self.narrate(narrate_to, &op).await;
                        issued.push(op);
                    }
                }
            }
        }

        Ok(issued)
    }

    async fn narrate(&self, channel: Option<&ChannelId>, op: &RemoteOp) {
        if let Some(channel) = channel {
            attempt(
                "send_message",
                self.gateway
                    .send_message(channel, &code_block(&op.to_string())),
            )
            .await;
        }
    }
}

/// Compute the unassign ops that strip every role this policy currently
/// manages from every member holding it.
///
/// Used by the `disable` command so that disabling is visibly immediate
/// instead of waiting for the next scheduled pass.
pub fn removal_ops(
    policy: &Policy,
    roles: &[RemoteRole],
    groups: &ActivityGroups,
    members: &[Member],
) -> Vec<RemoteOp> {
    let mut ops = Vec::new();
    for bucket in groups.iter() {
        let display = policy.display_name(&bucket.activity);
        let Some(role) = roles.iter().find(|r| r.name == display) else {
            continue;
        };
        for member in members {
            if member.holds(&role.id) {
                ops.push(RemoteOp::UnassignRole {
                    member: member.id.clone(),
                    member_name: member.name.clone(),
                    role: role.id.clone(),
                    role_name: role.name.clone(),
                });
            }
        }
    }
    ops
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use roled_gateway::MemoryGateway;
    use roled_store::{MemoryStore, StoreResult};
    use roled_types::{Member, UserId};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn member(id: &str, name: &str, activity: Option<&str>) -> Member {
        Member {
            id: UserId::new(id),
            name: name.to_string(),
            activity: activity.map(String::from),
            role_ids: Vec::new(),
        }
    }

    async fn setup(policy: Policy) -> (Arc<MemoryStore>, Arc<MemoryGateway>, Reconciler, CommunityId)
    {
        let community = CommunityId::new("c1");
        let store = Arc::new(MemoryStore::new());
        store.set(&community, policy).await.unwrap();
        let gateway = Arc::new(MemoryGateway::new());
        gateway.add_community(community.clone()).await;
        let reconciler = Reconciler::new(store.clone(), gateway.clone());
        (store, gateway, reconciler, community)
    }

    fn enabled_policy() -> Policy {
        Policy {
            enabled: true,
            ..Policy::default()
        }
    }

    #[tokio::test]
    async fn test_chess_scenario() {
        let (_, gateway, reconciler, community) = setup(enabled_policy()).await;
        gateway.add_member(&community, member("1", "A", Some("Chess"))).await;
        gateway.add_member(&community, member("2", "B", Some("Chess"))).await;
        gateway.add_member(&community, member("3", "C", Some("Chess"))).await;

        let ops = reconciler.reconcile(&community, None).await.unwrap();
        // One create plus three assigns
        assert_eq!(ops.len(), 4);
        let role = gateway.role_named(&community, "Chess").await.unwrap();
        for id in ["1", "2", "3"] {
            let m = gateway.member(&community, &UserId::new(id)).await.unwrap();
            assert!(m.holds(&role.id));
        }

        // C stops playing: only C is unassigned, the role survives
        gateway.set_activity(&community, &UserId::new("3"), None).await;
        let ops = reconciler.reconcile(&community, None).await.unwrap();
        assert_eq!(ops.len(), 1);
        assert!(matches!(&ops[0], RemoteOp::UnassignRole { member_name, .. } if member_name == "C"));
        assert!(gateway.role_named(&community, "Chess").await.is_some());
        assert!(gateway
            .member(&community, &UserId::new("1"))
            .await
            .unwrap()
            .holds(&role.id));
    }

    #[tokio::test]
    async fn test_second_pass_is_idempotent() {
        let (_, gateway, reconciler, community) = setup(enabled_policy()).await;
        gateway.add_member(&community, member("1", "A", Some("Chess"))).await;
        gateway.add_member(&community, member("2", "B", Some("Chess"))).await;

        let first = reconciler.reconcile(&community, None).await.unwrap();
        assert!(!first.is_empty());
        let second = reconciler.reconcile(&community, None).await.unwrap();
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn test_disabled_policy_is_noop() {
        let (_, gateway, reconciler, community) = setup(Policy::default()).await;
        gateway.add_member(&community, member("1", "A", Some("Chess"))).await;
        gateway.add_member(&community, member("2", "B", Some("Chess"))).await;

        let ops = reconciler.reconcile(&community, None).await.unwrap();
        assert!(ops.is_empty());
        assert!(gateway.role_named(&community, "Chess").await.is_none());
    }

    #[tokio::test]
    async fn test_threshold_boundary() {
        let mut policy = enabled_policy();
        policy.player_threshold = 3;
        let (_, gateway, reconciler, community) = setup(policy).await;
        gateway.add_member(&community, member("1", "A", Some("Chess"))).await;
        gateway.add_member(&community, member("2", "B", Some("Chess"))).await;

        // Two players, threshold three: nothing happens
        let ops = reconciler.reconcile(&community, None).await.unwrap();
        assert!(ops.is_empty());

        // Exactly at the threshold: role appears
        gateway.add_member(&community, member("3", "C", Some("Chess"))).await;
        let ops = reconciler.reconcile(&community, None).await.unwrap();
        assert_eq!(ops.len(), 4);
    }

    #[tokio::test]
    async fn test_allow_listed_bypasses_threshold() {
        let mut policy = enabled_policy();
        policy.player_threshold = 5;
        policy.allow_list.push("Chess".into());
        let (_, gateway, reconciler, community) = setup(policy).await;
        gateway.add_member(&community, member("1", "A", Some("Chess"))).await;

        let ops = reconciler.reconcile(&community, None).await.unwrap();
        assert_eq!(ops.len(), 2);
        assert!(gateway.role_named(&community, "Chess").await.is_some());
    }

    #[tokio::test]
    async fn test_denied_activity_unassigned_but_role_kept() {
        let mut policy = enabled_policy();
        policy.player_threshold = 1;
        let (store, gateway, reconciler, community) = setup(policy.clone()).await;
        gateway.add_member(&community, member("1", "A", Some("Chess"))).await;
        reconciler.reconcile(&community, None).await.unwrap();
        let role = gateway.role_named(&community, "Chess").await.unwrap();

        policy.known_activities = store.get(&community).await.unwrap().known_activities;
        policy.deny_list.push("Chess".into());
        store.set(&community, policy).await.unwrap();

        let ops = reconciler.reconcile(&community, None).await.unwrap();
        assert_eq!(ops.len(), 1);
        assert!(matches!(&ops[0], RemoteOp::UnassignRole { .. }));
        // The engine never deletes roles
        assert!(gateway.role_named(&community, "Chess").await.is_some());
        assert!(!gateway
            .member(&community, &UserId::new("1"))
            .await
            .unwrap()
            .holds(&role.id));
    }

    #[tokio::test]
    async fn test_alias_names_the_role() {
        let mut policy = enabled_policy();
        policy.player_threshold = 1;
        policy.aliases.insert("CSGO".into(), "Counter-Strike".into());
        let (_, gateway, reconciler, community) = setup(policy).await;
        gateway.add_member(&community, member("1", "A", Some("CSGO"))).await;

        reconciler.reconcile(&community, None).await.unwrap();
        assert!(gateway.role_named(&community, "CSGO").await.is_none());
        assert!(gateway
            .role_named(&community, "Counter-Strike")
            .await
            .is_some());
    }

    #[tokio::test]
    async fn test_ignored_member_never_assigned_and_gets_stripped() {
        let mut policy = enabled_policy();
        policy.player_threshold = 1;
        policy.ignored_users.insert("B".into());
        let (_, gateway, reconciler, community) = setup(policy).await;
        gateway.add_member(&community, member("1", "A", Some("Chess"))).await;
        gateway.add_member(&community, member("2", "B", Some("Chess"))).await;

        reconciler.reconcile(&community, None).await.unwrap();
        let role = gateway.role_named(&community, "Chess").await.unwrap();
        assert!(gateway
            .member(&community, &UserId::new("1"))
            .await
            .unwrap()
            .holds(&role.id));
        assert!(!gateway
            .member(&community, &UserId::new("2"))
            .await
            .unwrap()
            .holds(&role.id));
    }

    #[tokio::test]
    async fn test_create_failure_skips_but_self_heals() {
        let mut policy = enabled_policy();
        policy.player_threshold = 1;
        let (_, gateway, reconciler, community) = setup(policy).await;
        gateway.add_member(&community, member("1", "A", Some("Chess"))).await;

        gateway.fail_on("create_role").await;
        let ops = reconciler.reconcile(&community, None).await.unwrap();
        assert!(ops.is_empty());

        gateway.clear_failures().await;
        let ops = reconciler.reconcile(&community, None).await.unwrap();
        assert_eq!(ops.len(), 2);
    }

    #[tokio::test]
    async fn test_assign_failure_does_not_abort_pass() {
        let mut policy = enabled_policy();
        policy.player_threshold = 1;
        let (_, gateway, reconciler, community) = setup(policy).await;
        gateway.add_member(&community, member("1", "A", Some("Chess"))).await;

        gateway.fail_on("assign_role").await;
        let ops = reconciler.reconcile(&community, None).await.unwrap();
        // Role created, assignment skipped: an accepted partial state
        assert_eq!(ops.len(), 1);
        assert!(matches!(&ops[0], RemoteOp::CreateRole { .. }));

        gateway.clear_failures().await;
        let ops = reconciler.reconcile(&community, None).await.unwrap();
        assert_eq!(ops.len(), 1);
        assert!(matches!(&ops[0], RemoteOp::AssignRole { .. }));
    }

    #[tokio::test]
    async fn test_loud_pass_narrates_only_new_ops() {
        let (_, gateway, reconciler, community) = setup(enabled_policy()).await;
        gateway.add_member(&community, member("1", "A", Some("Chess"))).await;
        gateway.add_member(&community, member("2", "B", Some("Chess"))).await;

        let channel = ChannelId::new("general");
        reconciler.reconcile(&community, Some(&channel)).await.unwrap();
        let sent = gateway.sent_messages().await;
        assert_eq!(sent.len(), 3);
        assert!(sent[0].1.contains("Created role Chess"));

        // Steady state narrates nothing
        reconciler.reconcile(&community, Some(&channel)).await.unwrap();
        assert_eq!(gateway.sent_messages().await.len(), 3);
    }

    #[tokio::test]
    async fn test_silent_pass_sends_nothing() {
        let (_, gateway, reconciler, community) = setup(enabled_policy()).await;
        gateway.add_member(&community, member("1", "A", Some("Chess"))).await;
        gateway.add_member(&community, member("2", "B", Some("Chess"))).await;

        reconciler.reconcile(&community, None).await.unwrap();
        assert!(gateway.sent_messages().await.is_empty());
    }

    #[tokio::test]
    async fn test_discovery_is_persisted() {
        let (store, gateway, reconciler, community) = setup(enabled_policy()).await;
        gateway.add_member(&community, member("1", "A", Some("Chess"))).await;

        reconciler.reconcile(&community, None).await.unwrap();
        let policy = store.get(&community).await.unwrap();
        assert_eq!(policy.known_activities, vec!["Chess".to_string()]);
    }

    /// Store double that reports the policy as disabled from the second read
    /// on, simulating a `disable` command landing mid-pass.
    struct DisablingStore {
        policy: Policy,
        reads: AtomicUsize,
    }

    #[async_trait]
    impl SettingsStore for DisablingStore {
        async fn get(&self, _community: &CommunityId) -> StoreResult<Policy> {
            let mut policy = self.policy.clone();
            if self.reads.fetch_add(1, Ordering::SeqCst) > 0 {
                policy.enabled = false;
            }
            Ok(policy)
        }

        async fn set(&self, _community: &CommunityId, _policy: Policy) -> StoreResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_mid_pass_disable_suppresses_assigns() {
        let community = CommunityId::new("c1");
        let store = Arc::new(DisablingStore {
            policy: enabled_policy(),
            reads: AtomicUsize::new(0),
        });
        let gateway = Arc::new(MemoryGateway::new());
        gateway.add_member(&community, member("1", "A", Some("Chess"))).await;
        gateway.add_member(&community, member("2", "B", Some("Chess"))).await;

        let reconciler = Reconciler::new(store, gateway.clone());
        let ops = reconciler.reconcile(&community, None).await.unwrap();

        // The role create went out before the disable landed; every assign
        // after the fresh enabled re-read is suppressed.
        assert_eq!(ops.len(), 1);
        assert!(matches!(&ops[0], RemoteOp::CreateRole { .. }));
        let role = gateway.role_named(&community, "Chess").await.unwrap();
        assert!(!gateway
            .member(&community, &UserId::new("1"))
            .await
            .unwrap()
            .holds(&role.id));
    }

    #[tokio::test]
    async fn test_removal_ops_cover_all_holders() {
        let mut policy = Policy::default();
        policy.known_activities = vec!["Chess".into()];

        let role = RemoteRole {
            id: roled_types::RoleId::new("10"),
            name: "Chess".into(),
            created_at: chrono::Utc::now(),
        };
        let mut a = member("1", "A", Some("Chess"));
        a.role_ids.push(role.id.clone());
        let mut b = member("2", "B", None);
        b.role_ids.push(role.id.clone());
        let c = member("3", "C", None);
        let members = vec![a, b, c];

        let (groups, _) = compute_activity_groups(&mut policy, &members);
        let ops = removal_ops(&policy, std::slice::from_ref(&role), &groups, &members);
        assert_eq!(ops.len(), 2);
        assert!(ops
            .iter()
            .all(|op| matches!(op, RemoteOp::UnassignRole { .. })));
    }
}
