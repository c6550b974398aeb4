//! Pure policy command handlers
//!
//! Each handler maps the current policy (plus whatever remote state the
//! command needs) to a [`CommandOutcome`]: an optionally mutated policy,
//! reply lines for the invoking channel and remote ops for the router to
//! execute. Handlers never touch the store or the gateway themselves.

use crate::parser::strip_quotes;
use roled_engine::{compute_activity_groups, removal_ops};
use roled_types::{Member, Policy, RemoteOp, RemoteRole, RoleId};
use std::collections::HashMap;

/// Result of a command handler.
#[derive(Debug, Default)]
pub struct CommandOutcome {
    /// Mutated policy to persist, or `None` when nothing changed.
    pub policy: Option<Policy>,
    /// Reply lines for the invoking channel.
    pub replies: Vec<String>,
    /// Remote ops for the router to execute.
    pub ops: Vec<RemoteOp>,
}

impl CommandOutcome {
    fn reply_only(text: impl Into<String>) -> Self {
        Self {
            policy: None,
            replies: vec![text.into()],
            ops: Vec::new(),
        }
    }
}

/// `enable` — turn reconciliation on.
pub fn enable(policy: &Policy) -> CommandOutcome {
    if policy.enabled {
        return CommandOutcome::reply_only("Already enabled. Use 'ig~disable' to turn off.");
    }
    let mut policy = policy.clone();
    policy.enabled = true;
    CommandOutcome {
        policy: Some(policy),
        replies: vec![
            "Enabling automatic role assignments based on current activity. Turn off with 'ig~disable'.".into(),
        ],
        ops: Vec::new(),
    }
}

/// `disable` — turn reconciliation off and immediately strip every managed
/// role from every member holding it, instead of waiting for the next
/// scheduled pass.
pub fn disable(policy: &Policy, roles: &[RemoteRole], members: &[Member]) -> CommandOutcome {
    if !policy.enabled {
        return CommandOutcome::reply_only("Already disabled. Use 'ig~enable' to turn on.");
    }
    let mut policy = policy.clone();
    policy.enabled = false;

    let (groups, _) = compute_activity_groups(&mut policy, members);
    let ops = removal_ops(&policy, roles, &groups, members);

    CommandOutcome {
        policy: Some(policy),
        replies: vec![
            "Disabling automatic role assignments and removing roles from members. Turn on again with 'ig~enable'.".into(),
        ],
        ops,
    }
}

/// `list` — report allow list, deny list, aliases and live activity counts.
pub fn list(policy: &Policy, members: &[Member]) -> CommandOutcome {
    let mut replies = Vec::new();

    let mut msg = String::from("Whitelist:\n");
    if policy.allow_list.is_empty() {
        msg.push_str("* No activities in whitelist. Add some with 'ig~add [Activity name]'");
    } else {
        for name in &policy.allow_list {
            msg.push_str(&format!(" * '{}'\n", name));
        }
    }
    replies.push(msg);

    let mut msg = String::from("Blacklist:\n");
    if policy.deny_list.is_empty() {
        msg.push_str("* No activities in blacklist. Add some with 'ig~remove [Activity name]'");
    } else {
        for name in &policy.deny_list {
            msg.push_str(&format!(" * '{}'\n", name));
        }
    }
    replies.push(msg);

    let mut msg = String::from("Aliases:\n");
    if policy.aliases.is_empty() {
        msg.push_str(
            "* No aliases. Add some with 'ig~alias [Actual activity name] >> [New name]'",
        );
    } else {
        for (source, display) in &policy.aliases {
            msg.push_str(&format!(" * '{}'  >  '{}'\n", source, display));
        }
    }
    replies.push(msg);

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for member in members {
        if let Some(activity) = member.activity.as_deref() {
            if !activity.is_empty() {
                *counts.entry(activity).or_default() += 1;
            }
        }
    }
    let mut counts: Vec<_> = counts.into_iter().collect();
    counts.sort_by_key(|(_, n)| *n);
    let mut msg = String::from("Current activities:\n");
    for (activity, n) in counts {
        msg.push_str(&format!(" * '{}' ({})\n", activity, n));
    }
    replies.push(msg);

    CommandOutcome {
        policy: None,
        replies,
        ops: Vec::new(),
    }
}

/// `add` — allow-list a name, removing it from the deny list if present.
pub fn add(policy: &Policy, args: &str) -> CommandOutcome {
    let name = strip_quotes(args);
    if name.is_empty() {
        return CommandOutcome::reply_only(
            "Incorrect syntax for add command. Should be: 'ig~add [Activity name]' (without square brackets).",
        );
    }

    let mut policy = policy.clone();
    let mut replies = Vec::new();
    if policy.add_to_allow_list(name) {
        replies.push(format!("Adding '{}' to the whitelist", name));
    } else {
        replies.push(format!("'{}' is already on the whitelist", name));
    }
    if policy.remove_from_deny_list(name) {
        replies.push(format!("Removing '{}' from the blacklist", name));
    }

    CommandOutcome {
        policy: Some(policy),
        replies,
        ops: Vec::new(),
    }
}

/// `remove` — deny-list a name, removing it from the allow list, and delete
/// its remote role entirely if one exists by that exact name.
pub fn remove(policy: &Policy, args: &str, roles: &[RemoteRole]) -> CommandOutcome {
    let name = strip_quotes(args);
    if name.is_empty() {
        return CommandOutcome::reply_only(
            "Incorrect syntax for remove command. Should be: 'ig~remove [Activity name]' (without square brackets).",
        );
    }

    let mut policy = policy.clone();
    let mut replies = Vec::new();
    let mut ops = Vec::new();
    if policy.add_to_deny_list(name) {
        replies.push(format!("Adding '{}' to the blacklist", name));
    } else {
        replies.push(format!("'{}' is already on the blacklist", name));
    }
    if policy.remove_from_allow_list(name) {
        replies.push(format!("Removing '{}' from the whitelist", name));
    }

    if let Some(role) = roles.iter().find(|r| r.name == name) {
        ops.push(RemoteOp::DeleteRole {
            role: role.id.clone(),
            role_name: role.name.clone(),
        });
        replies.push(format!("Deleting '{}' role", name));
    }

    CommandOutcome {
        policy: Some(policy),
        replies,
        ops,
    }
}

/// `alias` — map a source name to a display name and rename the existing
/// remote role. The rename targets the role named with the *old* display
/// name, which differs from the raw source name when replacing an alias.
pub fn alias(policy: &Policy, args: &str, roles: &[RemoteRole]) -> CommandOutcome {
    let parts: Vec<&str> = args.split(">>").collect();
    if parts.len() != 2 || parts[0].trim().is_empty() || parts[1].trim().is_empty() {
        return CommandOutcome::reply_only(
            "Incorrect syntax for alias command. Should be: 'ig~alias [Actual activity name] >> [New name]' (without square brackets).",
        );
    }
    let source = strip_quotes(parts[0]).to_string();
    let display = strip_quotes(parts[1]).to_string();

    let mut policy = policy.clone();
    let mut replies = Vec::new();
    let old_display = match policy.aliases.get(&source) {
        Some(previous) => {
            replies.push(format!(
                "'{}' already has an alias ('{}'), it will be replaced with '{}'.",
                source, previous, display
            ));
            previous.clone()
        }
        None => {
            replies.push(format!("'{}' will now be shown as '{}'.", source, display));
            source.clone()
        }
    };
    policy.aliases.insert(source, display.clone());

    let mut ops = Vec::new();
    if let Some(role) = roles.iter().find(|r| r.name == old_display) {
        ops.push(RemoteOp::RenameRole {
            role: role.id.clone(),
            old_name: old_display,
            new_name: display,
        });
    }

    CommandOutcome {
        policy: Some(policy),
        replies,
        ops,
    }
}

/// `movetotop` — reorder a name to the front of the allow list and/or the
/// known-activity list.
pub fn move_to_top(policy: &Policy, args: &str) -> CommandOutcome {
    let name = strip_quotes(args);
    let mut updated = policy.clone();
    if updated.move_to_top(name) {
        CommandOutcome {
            policy: Some(updated),
            replies: vec![format!("Moving '{}' to the top!", name)],
            ops: Vec::new(),
        }
    } else {
        CommandOutcome::reply_only(format!(
            "Can't find '{}' on either the activity list or whitelist. Make sure you use the original activity name, not an alias.",
            name
        ))
    }
}

/// `playerthreshold` — set the minimum player count. Non-numeric input is a
/// syntax error and mutates nothing.
pub fn player_threshold(policy: &Policy, args: &str) -> CommandOutcome {
    let value = strip_quotes(args);
    match value.parse::<u32>() {
        Ok(threshold) => {
            let mut policy = policy.clone();
            policy.player_threshold = threshold;
            CommandOutcome {
                policy: Some(policy),
                replies: vec![format!(
                    "Threshold set! Only activities with {} or more current players will be included.",
                    threshold
                )],
                ops: Vec::new(),
            }
        }
        Err(_) => CommandOutcome::reply_only(
            "That doesn't make any sense. Expected input is 'ig~playerthreshold X' where X is a number.",
        ),
    }
}

/// `clearwhitelist` — empty the allow list.
pub fn clear_whitelist(policy: &Policy) -> CommandOutcome {
    let mut policy = policy.clone();
    policy.allow_list.clear();
    CommandOutcome {
        policy: Some(policy),
        replies: vec!["Clearing the whitelist.".into()],
        ops: Vec::new(),
    }
}

/// `whitelistonly` — toggle the whitelist-only flag.
pub fn whitelist_only(policy: &Policy) -> CommandOutcome {
    let mut policy = policy.clone();
    policy.whitelist_only = !policy.whitelist_only;
    let reply = if policy.whitelist_only {
        "Now only whitelisted activities will be shown.".to_string()
    } else {
        format!(
            "Now all activities will be shown, as long as they have at least {} players. Whitelisted activities will always show.",
            policy.player_threshold
        )
    };
    CommandOutcome {
        policy: Some(policy),
        replies: vec![reply],
        ops: Vec::new(),
    }
}

/// `ignore` — toggle a member name in the ignored set.
pub fn ignore(policy: &Policy, args: &str) -> CommandOutcome {
    let name = strip_quotes(args);
    if name.is_empty() {
        return CommandOutcome::reply_only(
            "Incorrect syntax for ignore command. Should be: 'ig~ignore [Member name]' (without square brackets).",
        );
    }
    toggle_ignore(policy, name)
}

/// `ignoreme` — toggle the invoking member in the ignored set. Open to
/// anyone regardless of the required-role gate.
pub fn ignore_me(policy: &Policy, author_name: &str) -> CommandOutcome {
    toggle_ignore(policy, author_name)
}

fn toggle_ignore(policy: &Policy, name: &str) -> CommandOutcome {
    let mut policy = policy.clone();
    let reply = if policy.toggle_ignored(name) {
        format!("Ignoring user \"{}\".", name)
    } else {
        format!("\"{}\" was previously ignored and will now be watched.", name)
    };
    CommandOutcome {
        policy: Some(policy),
        replies: vec![reply],
        ops: Vec::new(),
    }
}

/// `listroles` — report all remote roles sorted by creation time.
pub fn list_roles(roles: &[RemoteRole]) -> CommandOutcome {
    let header = format!("ID{}\"Name\"  (Creation Date)", " ".repeat(18));
    let separator = "=".repeat(header.len());
    let mut lines = vec![header, separator];

    let mut sorted: Vec<_> = roles.iter().collect();
    sorted.sort_by_key(|r| r.created_at);
    for role in sorted {
        lines.push(format!(
            "{}  \"{}\"  (Created on {})",
            role.id,
            role.name,
            role.created_at.format("%Y/%m/%d")
        ));
    }
    CommandOutcome::reply_only(lines.join("\n"))
}

/// `restrict` — gate most commands behind a role the caller already holds.
pub fn restrict(
    policy: &Policy,
    args: &str,
    roles: &[RemoteRole],
    author_role_ids: &[RoleId],
) -> CommandOutcome {
    let role_id = strip_quotes(args);
    if role_id.is_empty() {
        return CommandOutcome::reply_only(
            "You need to specify the id of the role. Use 'ig~listroles' to see the IDs of all roles, then do 'ig~restrict 123456789101112131'",
        );
    }
    let Some(role) = roles.iter().find(|r| r.id.as_str() == role_id) else {
        return CommandOutcome::reply_only(format!(
            "{} is not a valid id of any existing role. Use 'ig~listroles' to see the IDs of all roles.",
            role_id
        ));
    };
    if !author_role_ids.contains(&role.id) {
        return CommandOutcome::reply_only(
            "You need to have this role yourself in order to restrict commands to it.",
        );
    }

    let mut policy = policy.clone();
    policy.required_role_id = Some(role.id.clone());
    CommandOutcome {
        policy: Some(policy),
        replies: vec![format!(
            "From now on, most commands will be restricted to users with the \"{}\" role.",
            role.name
        )],
        ops: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use roled_types::UserId;

    fn member(id: &str, name: &str, activity: Option<&str>) -> Member {
        Member {
            id: UserId::new(id),
            name: name.to_string(),
            activity: activity.map(String::from),
            role_ids: Vec::new(),
        }
    }

    fn role(id: &str, name: &str) -> RemoteRole {
        RemoteRole {
            id: RoleId::new(id),
            name: name.to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_enable_is_idempotent_in_reply() {
        let outcome = enable(&Policy::default());
        assert!(outcome.policy.as_ref().unwrap().enabled);

        let enabled = Policy {
            enabled: true,
            ..Policy::default()
        };
        let outcome = enable(&enabled);
        assert!(outcome.policy.is_none());
        assert!(outcome.replies[0].starts_with("Already enabled"));
    }

    #[test]
    fn test_disable_strips_all_managed_roles_immediately() {
        let mut policy = Policy {
            enabled: true,
            ..Policy::default()
        };
        policy.known_activities = vec!["Chess".into()];

        let chess = role("10", "Chess");
        let mut a = member("1", "A", Some("Chess"));
        a.role_ids.push(chess.id.clone());
        let mut b = member("2", "B", None);
        b.role_ids.push(chess.id.clone());
        let members = vec![a, b];

        let outcome = disable(&policy, std::slice::from_ref(&chess), &members);
        assert!(!outcome.policy.as_ref().unwrap().enabled);
        // Every (member, role) pair is unassigned within the same command
        // invocation, not deferred to the next scheduled pass.
        assert_eq!(outcome.ops.len(), 2);
        assert!(outcome
            .ops
            .iter()
            .all(|op| matches!(op, RemoteOp::UnassignRole { .. })));
    }

    #[test]
    fn test_disable_when_already_disabled() {
        let outcome = disable(&Policy::default(), &[], &[]);
        assert!(outcome.policy.is_none());
        assert!(outcome.ops.is_empty());
        assert!(outcome.replies[0].starts_with("Already disabled"));
    }

    #[test]
    fn test_add_removes_from_deny_list() {
        let mut policy = Policy::default();
        policy.deny_list.push("Chess".into());

        let outcome = add(&policy, "Chess");
        let updated = outcome.policy.unwrap();
        assert_eq!(updated.allow_list, vec!["Chess".to_string()]);
        assert!(updated.deny_list.is_empty());
        assert_eq!(outcome.replies.len(), 2);
    }

    #[test]
    fn test_add_requires_name() {
        let outcome = add(&Policy::default(), "  ");
        assert!(outcome.policy.is_none());
        assert!(outcome.replies[0].starts_with("Incorrect syntax"));
    }

    #[test]
    fn test_remove_deletes_remote_role_even_when_held() {
        let mut policy = Policy::default();
        policy.allow_list.push("Chess".into());

        let outcome = remove(&policy, "Chess", &[role("10", "Chess")]);
        let updated = outcome.policy.unwrap();
        assert_eq!(updated.deny_list, vec!["Chess".to_string()]);
        assert!(updated.allow_list.is_empty());
        assert_eq!(outcome.ops.len(), 1);
        assert!(matches!(
            &outcome.ops[0],
            RemoteOp::DeleteRole { role_name, .. } if role_name == "Chess"
        ));
    }

    #[test]
    fn test_remove_without_remote_role_emits_no_op() {
        let outcome = remove(&Policy::default(), "Chess", &[]);
        assert!(outcome.policy.is_some());
        assert!(outcome.ops.is_empty());
    }

    #[test]
    fn test_alias_renames_role_by_old_display_name() {
        // "CSGO" already shows as "Counter-Strike"; replacing the alias must
        // rename the role currently called "Counter-Strike", not "CSGO".
        let mut policy = Policy::default();
        policy
            .aliases
            .insert("CSGO".into(), "Counter-Strike".into());
        let roles = vec![role("10", "Counter-Strike")];

        let outcome = alias(&policy, "CSGO >> CS2", &roles);
        let updated = outcome.policy.unwrap();
        assert_eq!(updated.aliases["CSGO"], "CS2");
        assert_eq!(outcome.ops.len(), 1);
        assert!(matches!(
            &outcome.ops[0],
            RemoteOp::RenameRole { old_name, new_name, .. }
                if old_name == "Counter-Strike" && new_name == "CS2"
        ));
        assert!(outcome.replies[0].contains("already has an alias"));
    }

    #[test]
    fn test_alias_syntax_error() {
        let outcome = alias(&Policy::default(), "no separator", &[]);
        assert!(outcome.policy.is_none());
        assert!(outcome.replies[0].starts_with("Incorrect syntax"));
    }

    #[test]
    fn test_player_threshold_rejects_non_numeric() {
        let outcome = player_threshold(&Policy::default(), "lots");
        assert!(outcome.policy.is_none());
        assert!(outcome.replies[0].starts_with("That doesn't make any sense"));

        let outcome = player_threshold(&Policy::default(), "4");
        assert_eq!(outcome.policy.unwrap().player_threshold, 4);
    }

    #[test]
    fn test_move_to_top_reports_missing_name() {
        let outcome = move_to_top(&Policy::default(), "Chess");
        assert!(outcome.policy.is_none());
        assert!(outcome.replies[0].starts_with("Can't find"));
    }

    #[test]
    fn test_whitelist_only_toggles() {
        let outcome = whitelist_only(&Policy::default());
        let updated = outcome.policy.unwrap();
        assert!(updated.whitelist_only);

        let outcome = whitelist_only(&updated);
        assert!(!outcome.policy.unwrap().whitelist_only);
    }

    #[test]
    fn test_ignore_me_toggles_author() {
        let outcome = ignore_me(&Policy::default(), "alice");
        let updated = outcome.policy.unwrap();
        assert!(updated.is_ignored("alice"));

        let outcome = ignore_me(&updated, "alice");
        assert!(!outcome.policy.unwrap().is_ignored("alice"));
    }

    #[test]
    fn test_list_roles_sorted_by_creation() {
        let mut newer = role("2", "B");
        newer.created_at = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let older = role("1", "A");

        let outcome = list_roles(&[newer, older]);
        let reply = &outcome.replies[0];
        assert!(reply.find("\"A\"").unwrap() < reply.find("\"B\"").unwrap());
        assert!(reply.contains("Created on 2024/01/01"));
    }

    #[test]
    fn test_restrict_requires_holding_the_role() {
        let roles = vec![role("10", "Admin")];

        let outcome = restrict(&Policy::default(), "10", &roles, &[]);
        assert!(outcome.policy.is_none());
        assert!(outcome.replies[0].starts_with("You need to have this role"));

        let outcome = restrict(&Policy::default(), "10", &roles, &[RoleId::new("10")]);
        assert_eq!(
            outcome.policy.unwrap().required_role_id,
            Some(RoleId::new("10"))
        );
    }

    #[test]
    fn test_restrict_unknown_role_id() {
        let outcome = restrict(&Policy::default(), "99", &[role("10", "Admin")], &[]);
        assert!(outcome.policy.is_none());
        assert!(outcome.replies[0].contains("not a valid id"));
    }

    #[test]
    fn test_list_counts_current_activities() {
        let members = vec![
            member("1", "A", Some("Chess")),
            member("2", "B", Some("Chess")),
            member("3", "C", Some("Go")),
            member("4", "D", None),
        ];
        let outcome = list(&Policy::default(), &members);
        assert_eq!(outcome.replies.len(), 4);
        let activities = &outcome.replies[3];
        assert!(activities.contains("'Chess' (2)"));
        assert!(activities.contains("'Go' (1)"));
    }
}
