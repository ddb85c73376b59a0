//! Owner-authorization gate for privileged group commands.
//!
//! A privileged command runs only when the invoking message is self-sent
//! or its sender's normalized identity equals the configured owner.
//! Anyone else gets a fixed private rejection and the command counts as
//! handled, so the dispatcher stops there.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::{
    config::Config,
    domain::Jid,
    events::{MembershipAction, MessageEvent},
    mute::MuteRegistry,
    ports::{ChatClient, SendOptions},
    roster::RosterCache,
};

const PRIVILEGED: &[&str] = &[
    "stalkall",
    "stalk",
    "kick",
    "mute",
    "unmute",
    "muteall",
    "unmuteall",
];

const UNAUTHORIZED_NOTICE: &str = "Owner-only command. Nice try though 😂";
const KICK_TAUNT: &str = "You just lucky to be alive 😂";
const MUTE_ADVISORY: &str = "You deserve to keep your mouth shut 🤐";
const MUTEALL_ADVISORY: &str = "🔇 Not admin, can only delete my own messages";

pub struct CommandGate {
    cfg: Arc<Config>,
    client: Arc<dyn ChatClient>,
    roster: Arc<RosterCache>,
    mutes: Arc<MuteRegistry>,
    shutdown: CancellationToken,
    fan_outs: Mutex<Vec<JoinHandle<()>>>,
}

impl CommandGate {
    pub fn new(
        cfg: Arc<Config>,
        client: Arc<dyn ChatClient>,
        roster: Arc<RosterCache>,
        mutes: Arc<MuteRegistry>,
    ) -> Self {
        Self {
            cfg,
            client,
            roster,
            mutes,
            shutdown: CancellationToken::new(),
            fan_outs: Mutex::new(Vec::new()),
        }
    }

    /// Dispatch one command invocation.
    ///
    /// Returns `true` when this gate owns the command (authorized or not),
    /// so the caller skips any default fallthrough.
    pub async fn on_command(&self, msg: &MessageEvent, command: &str, args: &[String]) -> bool {
        // All current privileged commands target the mentioned member; the
        // raw argument tail is accepted for interface stability.
        let _ = args;

        if !msg.chat.is_group() || !PRIVILEGED.contains(&command) {
            return false;
        }

        let authorized =
            msg.from_self || msg.sender.normalized() == self.cfg.owner_number;
        if !authorized {
            self.try_send(&msg.sender, UNAUTHORIZED_NOTICE, SendOptions::default())
                .await;
            return true;
        }

        let bot_is_admin = self.roster.is_bot_admin(&msg.chat).await;
        let mentioned = msg.mentioned.clone();

        match command {
            "stalkall" => self.stalk_all(&msg.chat).await,

            "stalk" => {
                if let Some(target) = mentioned {
                    self.try_send(&target, &self.cfg.stalk_message, SendOptions::default())
                        .await;
                }
            }

            "kick" => {
                if let Some(target) = mentioned {
                    if bot_is_admin {
                        if let Err(e) = self
                            .client
                            .update_membership(
                                &msg.chat,
                                &[target],
                                MembershipAction::Remove,
                            )
                            .await
                        {
                            eprintln!("[GATE] kick failed in {}: {e}", msg.chat);
                        }
                    } else {
                        self.try_send(&target, KICK_TAUNT, SendOptions::default())
                            .await;
                    }
                }
            }

            "mute" => {
                if let Some(target) = mentioned {
                    self.mutes.mute_member(&msg.chat, &target).await;
                    if !bot_is_admin {
                        // Mute is recorded anyway; enforcement stays advisory
                        // until the bot gains admin rights.
                        self.try_send(&msg.chat, MUTE_ADVISORY, SendOptions::mentioning(target))
                            .await;
                    }
                }
            }

            "unmute" => {
                if let Some(target) = mentioned {
                    self.mutes.unmute_member(&msg.chat, &target).await;
                }
            }

            "muteall" => {
                self.mutes.set_group_muted(&msg.chat, true).await;
                if !bot_is_admin {
                    self.try_send(&msg.chat, MUTEALL_ADVISORY, SendOptions::default())
                        .await;
                }
            }

            "unmuteall" => {
                self.mutes.set_group_muted(&msg.chat, false).await;
                self.mutes.clear_group(&msg.chat).await;
            }

            _ => return false,
        }

        true
    }

    /// Cancel in-flight fan-outs (at the next pacing point) and wait for
    /// their tasks to finish. For host-process shutdown.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.drain_fan_outs().await;
    }

    /// Paced fan-out to every non-bot roster member.
    ///
    /// Forces a fresh roster fetch, then sends sequentially from a spawned
    /// task with a fixed inter-send delay, so one slow fan-out never blocks
    /// the handling of unrelated events.
    async fn stalk_all(&self, group: &Jid) {
        self.roster.invalidate(group).await;
        let snapshot = match self.roster.get(group).await {
            Ok(s) => s,
            Err(e) => {
                eprintln!("[GATE] stalkall roster fetch failed: {e}");
                return;
            }
        };

        let identity = self.client.identity();
        let targets: Vec<Jid> = snapshot
            .members
            .iter()
            .map(|m| m.jid.clone())
            .filter(|jid| !identity.matches(jid))
            .collect();

        let client = self.client.clone();
        let text = self.cfg.stalk_message.clone();
        let delay = self.cfg.stalk_delay;
        let cancel = self.shutdown.clone();
        let handle = tokio::spawn(async move {
            for (i, target) in targets.iter().enumerate() {
                if let Err(e) = client.send_text(target, &text, SendOptions::default()).await {
                    eprintln!("[GATE] stalk send to {target} failed: {e}");
                }
                if i + 1 < targets.len() {
                    tokio::select! {
                      _ = cancel.cancelled() => {
                        println!("[GATE] stalkall fan-out cancelled");
                        return;
                      }
                      _ = sleep(delay) => {}
                    }
                }
            }
        });

        self.fan_outs.lock().await.push(handle);
    }

    async fn drain_fan_outs(&self) {
        let handles: Vec<_> = self.fan_outs.lock().await.drain(..).collect();
        for handle in handles {
            let _ = handle.await;
        }
    }

    async fn try_send(&self, to: &Jid, text: &str, opts: SendOptions) {
        if let Err(e) = self.client.send_text(to, text, opts).await {
            eprintln!("[GATE] send to {to} failed: {e}");
        }
    }
}
