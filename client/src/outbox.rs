//! Record of every write the provider issued and how it ended.

use antisoup_shared::{
    moderation::BattleAction, AddAdmin, CommentStatus, CreateComment, PublishBattle, ReactionKind,
    Side, SystemConfig, TopicUpdate,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CreateBattle(PublishBattle),
    ModerateBattle { id: String, action: BattleAction },
    Vote { battle_id: String, side: Side },
    React { battle_id: String, kind: ReactionKind },
    AddComment(CreateComment),
    UpdateCommentStatus { id: String, status: CommentStatus },
    CreateTopic { name: String },
    UpdateTopic { id: String, update: TopicUpdate },
    AddAdmin(AddAdmin),
    RemoveAdmin { id: String },
    UpdateSystemConfig(SystemConfig),
}

impl Command {
    pub fn label(&self) -> &'static str {
        match self {
            Command::CreateBattle(_) => "create_battle",
            Command::ModerateBattle { .. } => "moderate_battle",
            Command::Vote { .. } => "vote",
            Command::React { .. } => "react",
            Command::AddComment(_) => "add_comment",
            Command::UpdateCommentStatus { .. } => "update_comment_status",
            Command::CreateTopic { .. } => "create_topic",
            Command::UpdateTopic { .. } => "update_topic",
            Command::AddAdmin(_) => "add_admin",
            Command::RemoveAdmin { .. } => "remove_admin",
            Command::UpdateSystemConfig(_) => "update_system_config",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandState {
    Pending,
    Confirmed,
    /// Applied to the mirror only; carries the last remote error.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub seq: u64,
    pub command: Command,
    pub state: CommandState,
}

#[derive(Debug, Default)]
pub struct Outbox {
    entries: Vec<Entry>,
    next_seq: u64,
}

impl Outbox {
    pub fn record(&mut self, command: Command) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push(Entry {
            seq,
            command,
            state: CommandState::Pending,
        });
        seq
    }

    pub fn mark(&mut self, seq: u64, state: CommandState) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.seq == seq) {
            entry.state = state;
        }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Failed commands in issuance order.
    pub fn failed(&self) -> impl Iterator<Item = &Entry> {
        self.entries
            .iter()
            .filter(|e| matches!(e.state, CommandState::Failed(_)))
    }

    pub fn failed_count(&self) -> usize {
        self.failed().count()
    }

    /// Drops confirmed entries, keeping anything still owed to the service.
    pub fn prune_confirmed(&mut self) {
        self.entries.retain(|e| e.state != CommandState::Confirmed);
    }
}
