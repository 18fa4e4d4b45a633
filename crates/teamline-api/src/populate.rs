//! Builders that turn raw table rows into the populated DTOs the REST and
//! realtime surfaces both emit. The sender/creator/member projections are
//! denormalized here so the client never has to chase user ids.

use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use teamline_db::Database;
use teamline_db::models::{ChannelRow, MessageRow, ReactionRow, UserRow};
use teamline_types::models::{Channel, Message, MessageKind, Reaction, UserSummary};

pub fn user_summary(row: &UserRow) -> Result<UserSummary> {
    Ok(UserSummary {
        id: parse_uuid(&row.id, "user id")?,
        username: row.username.clone(),
        email: row.email.clone(),
        avatar: row.avatar.clone(),
        status: row.status.clone(),
    })
}

/// Populate a single message: sender projection plus grouped reactions.
pub fn message(db: &Database, row: &MessageRow) -> Result<Message> {
    let sender = db
        .get_user(&row.sender_id)?
        .with_context(|| format!("sender {} missing for message {}", row.sender_id, row.id))?;
    let reactions = group_reactions(db.reactions_for_message(&row.id)?)?;
    build_message(row, user_summary(&sender)?, reactions)
}

/// Populate a page of messages with two batch queries instead of 2N lookups.
pub fn messages_page(db: &Database, rows: Vec<MessageRow>) -> Result<Vec<Message>> {
    let message_ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
    let reaction_rows = db.reactions_for_messages(&message_ids)?;

    let mut reactions_by_message: HashMap<String, Vec<ReactionRow>> = HashMap::new();
    for r in reaction_rows {
        reactions_by_message.entry(r.message_id.clone()).or_default().push(r);
    }

    let mut senders: HashMap<String, UserSummary> = HashMap::new();
    let mut messages = Vec::with_capacity(rows.len());
    for row in rows {
        let sender = match senders.get(&row.sender_id) {
            Some(s) => s.clone(),
            None => {
                let user = db.get_user(&row.sender_id)?.with_context(|| {
                    format!("sender {} missing for message {}", row.sender_id, row.id)
                })?;
                let summary = user_summary(&user)?;
                senders.insert(row.sender_id.clone(), summary.clone());
                summary
            }
        };
        let reactions =
            group_reactions(reactions_by_message.remove(&row.id).unwrap_or_default())?;
        messages.push(build_message(&row, sender, reactions)?);
    }
    Ok(messages)
}

/// Populate a channel: creator projection plus the member list in join order.
pub fn channel(db: &Database, row: &ChannelRow) -> Result<Channel> {
    let creator = db
        .get_user(&row.created_by)?
        .with_context(|| format!("creator {} missing for channel {}", row.created_by, row.id))?;
    let members = db
        .channel_members(&row.id)?
        .iter()
        .map(user_summary)
        .collect::<Result<Vec<_>>>()?;

    Ok(Channel {
        id: parse_uuid(&row.id, "channel id")?,
        name: row.name.clone(),
        description: row.description.clone(),
        is_private: row.private,
        members,
        created_by: user_summary(&creator)?,
        created_at: parse_timestamp(&row.created_at)?,
        updated_at: parse_timestamp(&row.updated_at)?,
    })
}

fn build_message(row: &MessageRow, sender: UserSummary, reactions: Vec<Reaction>) -> Result<Message> {
    Ok(Message {
        id: parse_uuid(&row.id, "message id")?,
        content: row.content.clone(),
        channel_id: parse_uuid(&row.channel_id, "channel id")?,
        sender,
        kind: row
            .kind
            .parse::<MessageKind>()
            .map_err(|e| anyhow::anyhow!(e))?,
        is_edited: row.edited,
        reactions,
        created_at: parse_timestamp(&row.created_at)?,
        updated_at: parse_timestamp(&row.updated_at)?,
    })
}

/// Collapse reaction rows into emoji groups, preserving first-seen emoji
/// order. The UNIQUE(message, user, emoji) constraint already guarantees at
/// most one entry per (emoji, user) pair.
fn group_reactions(rows: Vec<ReactionRow>) -> Result<Vec<Reaction>> {
    let mut groups: Vec<Reaction> = Vec::new();
    for row in rows {
        let user_id = parse_uuid(&row.user_id, "reaction user id")?;
        match groups.iter_mut().find(|g| g.emoji == row.emoji) {
            Some(group) => group.users.push(user_id),
            None => groups.push(Reaction {
                emoji: row.emoji,
                users: vec![user_id],
            }),
        }
    }
    Ok(groups)
}

fn parse_uuid(raw: &str, what: &str) -> Result<Uuid> {
    raw.parse()
        .with_context(|| format!("corrupt {what}: {raw}"))
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite's datetime('now') default stores "YYYY-MM-DD HH:MM:SS"
            // without a timezone. Parse as naive UTC and convert.
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .with_context(|| format!("corrupt timestamp: {raw}"))
}
