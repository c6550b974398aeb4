//! Command dispatch
//!
//! The router connects parsed commands to their handlers: it enforces the
//! required-role gate, fetches whatever remote state a handler needs,
//! persists the mutated policy, executes emitted ops through the
//! fire-and-continue wrapper and echoes replies to the invoking channel.
//! Policy-mutating commands push a loud reconcile trigger so the change is
//! applied immediately rather than on the next scheduled pass.

use crate::error::CommandResult;
use crate::handlers;
use crate::handlers::CommandOutcome;
use crate::parser::parse;
use roled_gateway::{attempt, Gateway};
use roled_store::SettingsStore;
use roled_types::{code_block, CommunityId, MessageEvent, ReconcileRequest, RemoteOp};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Routes inbound messages to command handlers.
pub struct CommandRouter {
    store: Arc<dyn SettingsStore>,
    gateway: Arc<dyn Gateway>,
    reconcile_tx: mpsc::Sender<ReconcileRequest>,
}

impl CommandRouter {
    pub fn new(
        store: Arc<dyn SettingsStore>,
        gateway: Arc<dyn Gateway>,
        reconcile_tx: mpsc::Sender<ReconcileRequest>,
    ) -> Self {
        Self {
            store,
            gateway,
            reconcile_tx,
        }
    }

    /// Handle one inbound message. Non-command text is ignored; restricted
    /// commands from members without the required role are silently dropped.
    pub async fn handle_message(&self, message: &MessageEvent) -> CommandResult<()> {
        let Some(command) = parse(&message.text) else {
            return Ok(());
        };

        let policy = self.store.get(&message.community).await?;
        let gate_passed = policy
            .required_role_id
            .as_ref()
            .map_or(true, |required| message.author_role_ids.contains(required));

        let outcome = match command.name.as_str() {
            // Open to anyone regardless of the required-role gate
            "ignoreme" => handlers::ignore_me(&policy, &message.author_name),

            _ if !gate_passed => return Ok(()),

            "enable" => handlers::enable(&policy),
            "disable" => {
                let Some(roles) = self.fetch_roles(&message.community).await else {
                    return Ok(());
                };
                let Some(members) = self.fetch_members(&message.community).await else {
                    return Ok(());
                };
                handlers::disable(&policy, &roles, &members)
            }
            "list" => {
                let Some(members) = self.fetch_members(&message.community).await else {
                    return Ok(());
                };
                handlers::list(&policy, &members)
            }
            "add" => handlers::add(&policy, &command.args),
            "remove" => {
                let Some(roles) = self.fetch_roles(&message.community).await else {
                    return Ok(());
                };
                handlers::remove(&policy, &command.args, &roles)
            }
            "alias" => {
                let Some(roles) = self.fetch_roles(&message.community).await else {
                    return Ok(());
                };
                handlers::alias(&policy, &command.args, &roles)
            }
            "movetotop" => handlers::move_to_top(&policy, &command.args),
            "playerthreshold" => handlers::player_threshold(&policy, &command.args),
            "clearwhitelist" => handlers::clear_whitelist(&policy),
            "whitelistonly" => handlers::whitelist_only(&policy),
            "ignore" => handlers::ignore(&policy, &command.args),
            "listroles" => {
                let Some(roles) = self.fetch_roles(&message.community).await else {
                    return Ok(());
                };
                handlers::list_roles(&roles)
            }
            "restrict" => {
                let Some(roles) = self.fetch_roles(&message.community).await else {
                    return Ok(());
                };
                handlers::restrict(&policy, &command.args, &roles, &message.author_role_ids)
            }
            _ => return Ok(()),
        };

        self.apply(&command.name, message, outcome).await
    }

    async fn apply(
        &self,
        command: &str,
        message: &MessageEvent,
        outcome: CommandOutcome,
    ) -> CommandResult<()> {
        let mutated = outcome.policy.is_some();
        if let Some(policy) = outcome.policy {
            self.store.set(&message.community, policy).await?;
            tracing::info!(
                community = %message.community,
                command,
                author = %message.author_name,
                "policy updated"
            );
        }

        for reply in &outcome.replies {
            attempt(
                "send_message",
                self.gateway.send_message(&message.channel, &code_block(reply)),
            )
            .await;
        }

        for op in &outcome.ops {
            self.execute(&message.community, op).await;
        }

        // disable already performed its own removal pass
        if mutated && command != "disable" {
            let _ = self
                .reconcile_tx
                .send(ReconcileRequest {
                    community: message.community.clone(),
                    channel: Some(message.channel.clone()),
                })
                .await;
        }

        Ok(())
    }

    async fn execute(&self, community: &CommunityId, op: &RemoteOp) {
        tracing::info!(community = %community, op = %op, "executing command op");
        match op {
            RemoteOp::CreateRole { name, hoisted } => {
                attempt(
                    "create_role",
                    self.gateway.create_role(community, name, *hoisted),
                )
                .await;
            }
            RemoteOp::AssignRole { member, role, .. } => {
                attempt(
                    "assign_role",
                    self.gateway.assign_role(community, member, role),
                )
                .await;
            }
            RemoteOp::UnassignRole { member, role, .. } => {
                attempt(
                    "unassign_role",
                    self.gateway.unassign_role(community, member, role),
                )
                .await;
            }
            RemoteOp::DeleteRole { role, .. } => {
                attempt("delete_role", self.gateway.delete_role(community, role)).await;
            }
            RemoteOp::RenameRole { role, new_name, .. } => {
                attempt(
                    "rename_role",
                    self.gateway.rename_role(community, role, new_name),
                )
                .await;
            }
        }
    }

    async fn fetch_roles(
        &self,
        community: &CommunityId,
    ) -> Option<Vec<roled_types::RemoteRole>> {
        attempt("list_roles", self.gateway.list_roles(community)).await
    }

    async fn fetch_members(&self, community: &CommunityId) -> Option<Vec<roled_types::Member>> {
        attempt("list_members", self.gateway.list_members(community)).await
    }
}
