//! Per-community reconciliation policy
//!
//! A [`Policy`] is the single persisted document for a community. It is read
//! fully and written fully on every mutation; there is no partial-field
//! update. Callers read-modify-write the whole structure.

use crate::RoleId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Current policy document version. Older documents deserialize with field
/// defaults filled in.
pub const POLICY_VERSION: u32 = 1;

/// Per-community reconciliation policy.
///
/// All fields are enumerated here and defaulted at provisioning time; a
/// policy document is never partially shaped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Document version
    #[serde(default = "default_version")]
    pub version: u32,

    /// Whether reconciliation runs for this community
    #[serde(default)]
    pub enabled: bool,

    /// Activities that always qualify for a role, regardless of player
    /// count. Ordered; `movetotop` reorders it.
    #[serde(default)]
    pub allow_list: Vec<String>,

    /// Activities that never qualify, unless also allow-listed (allow wins)
    #[serde(default)]
    pub deny_list: Vec<String>,

    /// Activity name to display name. One alias per source name,
    /// overwritable. The display name is what the remote role is called.
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,

    /// Every activity ever observed, in discovery order. Append-only except
    /// explicit reordering via `movetotop`.
    #[serde(default)]
    pub known_activities: Vec<String>,

    /// Member names exempt from role assignment and discovery logging
    #[serde(default)]
    pub ignored_users: BTreeSet<String>,

    /// Minimum concurrent players for an activity to qualify
    #[serde(default = "default_player_threshold")]
    pub player_threshold: u32,

    /// When set, only allow-listed activities qualify
    #[serde(default)]
    pub whitelist_only: bool,

    /// When set, most commands are restricted to holders of this role
    #[serde(default)]
    pub required_role_id: Option<RoleId>,
}

fn default_version() -> u32 {
    POLICY_VERSION
}

fn default_player_threshold() -> u32 {
    2
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            version: POLICY_VERSION,
            enabled: false,
            allow_list: Vec::new(),
            deny_list: Vec::new(),
            aliases: BTreeMap::new(),
            known_activities: Vec::new(),
            ignored_users: BTreeSet::new(),
            player_threshold: default_player_threshold(),
            whitelist_only: false,
            required_role_id: None,
        }
    }
}

impl Policy {
    /// Alias-resolved display name for an activity. The display name is the
    /// join key against remote roles.
    pub fn display_name<'a>(&'a self, activity: &'a str) -> &'a str {
        self.aliases.get(activity).map(String::as_str).unwrap_or(activity)
    }

    /// Whether the activity (by raw or display name) is on the allow list.
    pub fn is_allowed(&self, activity: &str) -> bool {
        let display = self.display_name(activity);
        self.allow_list.iter().any(|a| a == activity || a == display)
    }

    /// Whether the activity (by raw or display name) is on the deny list.
    pub fn is_denied(&self, activity: &str) -> bool {
        let display = self.display_name(activity);
        self.deny_list.iter().any(|d| d == activity || d == display)
    }

    /// Whether an activity with `num_players` current players qualifies for
    /// role creation and assignment.
    ///
    /// An allow-listed activity always qualifies, even when it also appears
    /// on the deny list (allow wins) and regardless of player count or the
    /// whitelist-only flag.
    pub fn is_eligible(&self, activity: &str, num_players: usize) -> bool {
        if self.is_allowed(activity) {
            return true;
        }
        !self.is_denied(activity)
            && !self.whitelist_only
            && num_players >= self.player_threshold as usize
    }

    /// Whether a member (by name) is exempt from role management.
    pub fn is_ignored(&self, member_name: &str) -> bool {
        self.ignored_users.contains(member_name)
    }

    /// Add a name to the allow list. Returns false if it was already there.
    pub fn add_to_allow_list(&mut self, name: &str) -> bool {
        if self.allow_list.iter().any(|a| a == name) {
            return false;
        }
        self.allow_list.push(name.to_string());
        true
    }

    /// Add a name to the deny list. Returns false if it was already there.
    pub fn add_to_deny_list(&mut self, name: &str) -> bool {
        if self.deny_list.iter().any(|d| d == name) {
            return false;
        }
        self.deny_list.push(name.to_string());
        true
    }

    /// Remove a name from the allow list. Returns true if it was present.
    pub fn remove_from_allow_list(&mut self, name: &str) -> bool {
        let before = self.allow_list.len();
        self.allow_list.retain(|a| a != name);
        self.allow_list.len() != before
    }

    /// Remove a name from the deny list. Returns true if it was present.
    pub fn remove_from_deny_list(&mut self, name: &str) -> bool {
        let before = self.deny_list.len();
        self.deny_list.retain(|d| d != name);
        self.deny_list.len() != before
    }

    /// Move a name to the front of the allow list and/or the known-activity
    /// list. Returns true if the name was found on either.
    pub fn move_to_top(&mut self, name: &str) -> bool {
        let mut moved = false;
        if self.remove_from_allow_list(name) {
            self.allow_list.insert(0, name.to_string());
            moved = true;
        }
        if let Some(pos) = self.known_activities.iter().position(|a| a == name) {
            let entry = self.known_activities.remove(pos);
            self.known_activities.insert(0, entry);
            moved = true;
        }
        moved
    }

    /// Toggle a member name in the ignored set. Returns true if the name is
    /// now ignored.
    pub fn toggle_ignored(&mut self, member_name: &str) -> bool {
        if self.ignored_users.remove(member_name) {
            false
        } else {
            self.ignored_users.insert(member_name.to_string());
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = Policy::default();
        assert!(!policy.enabled);
        assert_eq!(policy.player_threshold, 2);
        assert!(policy.allow_list.is_empty());
        assert!(policy.required_role_id.is_none());
    }

    #[test]
    fn test_old_document_fills_defaults() {
        // A pre-versioning document with only some fields present
        let policy: Policy = serde_json::from_str(r#"{"enabled": true}"#).unwrap();
        assert!(policy.enabled);
        assert_eq!(policy.version, POLICY_VERSION);
        assert_eq!(policy.player_threshold, 2);
        assert!(policy.known_activities.is_empty());
    }

    #[test]
    fn test_display_name_resolution() {
        let mut policy = Policy::default();
        policy.aliases.insert("CSGO".into(), "Counter-Strike".into());
        assert_eq!(policy.display_name("CSGO"), "Counter-Strike");
        assert_eq!(policy.display_name("Chess"), "Chess");
    }

    #[test]
    fn test_allow_matches_display_name() {
        let mut policy = Policy::default();
        policy.aliases.insert("CSGO".into(), "Counter-Strike".into());
        policy.allow_list.push("Counter-Strike".into());
        assert!(policy.is_allowed("CSGO"));
    }

    #[test]
    fn test_threshold_boundary() {
        let mut policy = Policy::default();
        policy.player_threshold = 3;
        assert!(policy.is_eligible("Chess", 3));
        assert!(!policy.is_eligible("Chess", 2));
    }

    #[test]
    fn test_below_threshold_allowed_is_eligible() {
        let mut policy = Policy::default();
        policy.player_threshold = 3;
        policy.allow_list.push("Chess".into());
        assert!(policy.is_eligible("Chess", 0));
    }

    #[test]
    fn test_allow_wins_over_deny() {
        let mut policy = Policy::default();
        policy.allow_list.push("Chess".into());
        policy.deny_list.push("Chess".into());
        assert!(policy.is_eligible("Chess", 0));
    }

    #[test]
    fn test_denied_not_eligible() {
        let mut policy = Policy::default();
        policy.deny_list.push("Chess".into());
        assert!(!policy.is_eligible("Chess", 100));
    }

    #[test]
    fn test_whitelist_only_excludes_unlisted() {
        let mut policy = Policy::default();
        policy.whitelist_only = true;
        policy.allow_list.push("Chess".into());
        assert!(policy.is_eligible("Chess", 0));
        assert!(!policy.is_eligible("Go", 100));
    }

    #[test]
    fn test_move_to_top() {
        let mut policy = Policy::default();
        policy.allow_list = vec!["A".into(), "B".into(), "C".into()];
        policy.known_activities = vec!["A".into(), "B".into(), "C".into()];
        assert!(policy.move_to_top("C"));
        assert_eq!(policy.allow_list[0], "C");
        assert_eq!(policy.known_activities[0], "C");
        assert!(!policy.move_to_top("missing"));
    }

    #[test]
    fn test_toggle_ignored() {
        let mut policy = Policy::default();
        assert!(policy.toggle_ignored("alice"));
        assert!(policy.is_ignored("alice"));
        assert!(!policy.toggle_ignored("alice"));
        assert!(!policy.is_ignored("alice"));
    }
}
