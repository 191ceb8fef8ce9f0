use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::database::Stream;
use crate::global::GlobalState;
use crate::rooms::{self, RoomApi};

/// What the media server reported for one room during a sweep.
#[derive(Debug, Clone, Copy)]
pub struct RoomObservation {
    pub host_connected: bool,
    pub viewer_count: i32,
}

impl RoomObservation {
    pub fn from_participants(participants: &[rooms::Participant], owner_id: Uuid) -> Self {
        Self {
            host_connected: rooms::host_present(participants, owner_id),
            viewer_count: rooms::viewer_count(participants, owner_id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamUpdate {
    pub stream_id: Uuid,
    pub is_live: bool,
    pub viewer_count: i32,
}

#[derive(Debug, Default, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepStats {
    pub total_streams: usize,
    pub live_streams_found: usize,
    pub updated_streams: usize,
    pub active_rooms: usize,
}

/// A stream is live only when its room exists and the owner is connected.
/// Offline streams carry a zero count regardless of remaining occupancy.
fn desired_state(observation: Option<&RoomObservation>) -> (bool, i32) {
    match observation {
        Some(obs) if obs.host_connected => (true, obs.viewer_count.max(0)),
        _ => (false, 0),
    }
}

/// Plans one sweep. Pure: takes the stored streams and the per-room
/// observations, returns the writes needed to make the stored state match.
/// Rooms whose membership query failed are skipped entirely so a transient
/// error cannot flip a live stream offline.
pub fn plan_sweep(
    streams: &[Stream],
    observations: &HashMap<String, RoomObservation>,
    unreachable_rooms: &HashSet<String>,
    active_rooms: usize,
) -> (Vec<StreamUpdate>, SweepStats) {
    let mut updates = Vec::new();
    let mut stats = SweepStats {
        total_streams: streams.len(),
        active_rooms,
        ..Default::default()
    };

    for stream in streams {
        if unreachable_rooms.contains(&stream.room_name) {
            continue;
        }

        let (is_live, viewer_count) = desired_state(observations.get(&stream.room_name));

        if is_live {
            stats.live_streams_found += 1;
        }

        if stream.is_live != is_live || stream.viewer_count != viewer_count {
            updates.push(StreamUpdate {
                stream_id: stream.id,
                is_live,
                viewer_count,
            });
        }
    }

    stats.updated_streams = updates.len();

    (updates, stats)
}

/// Runs one reconciliation pass. Serialized behind the global sweep lock so
/// the scheduled loop and the manual sync endpoint cannot interleave.
pub async fn sweep(global: &Arc<GlobalState>) -> anyhow::Result<SweepStats> {
    let _guard = global.sweep_lock.lock().await;

    let streams: Vec<Stream> = sqlx::query_as("SELECT * FROM streams")
        .fetch_all(global.db.as_ref())
        .await?;

    let active: HashSet<String> = global
        .rooms
        .list_rooms()
        .await?
        .into_iter()
        .map(|room| room.name)
        .collect();

    let mut observations = HashMap::new();
    let mut unreachable_rooms = HashSet::new();

    for stream in &streams {
        if !active.contains(&stream.room_name) {
            continue;
        }

        match global.rooms.list_participants(&stream.room_name).await {
            Ok(participants) => {
                observations.insert(
                    stream.room_name.clone(),
                    RoomObservation::from_participants(&participants, stream.user_id),
                );
            }
            Err(err) => {
                tracing::warn!(room = %stream.room_name, error = %err, "failed to list participants, skipping stream this pass");
                unreachable_rooms.insert(stream.room_name.clone());
            }
        }
    }

    let (updates, mut stats) = plan_sweep(&streams, &observations, &unreachable_rooms, active.len());

    let mut applied = 0;
    for update in &updates {
        let result = sqlx::query(
            "UPDATE streams SET is_live = $1, viewer_count = $2, updated_at = NOW() WHERE id = $3",
        )
        .bind(update.is_live)
        .bind(update.viewer_count)
        .bind(update.stream_id)
        .execute(global.db.as_ref())
        .await;

        match result {
            Ok(_) => applied += 1,
            Err(err) => {
                tracing::warn!(stream_id = %update.stream_id, error = %err, "failed to apply stream update, skipping this pass");
            }
        }
    }

    stats.updated_streams = applied;

    tracing::debug!(
        total = stats.total_streams,
        live = stats.live_streams_found,
        updated = stats.updated_streams,
        rooms = stats.active_rooms,
        "sweep complete"
    );

    Ok(stats)
}

/// The scheduled sweep loop. Runs until the shutdown context fires.
pub async fn run(global: Arc<GlobalState>) -> anyhow::Result<()> {
    if !global.config.reconciler.enabled {
        tracing::info!("reconciler disabled");
        global.ctx.done().await;
        return Ok(());
    }

    let mut interval = tokio::time::interval(std::time::Duration::from_secs(
        global.config.reconciler.interval_secs.max(1),
    ));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = global.ctx.done() => {
                return Ok(());
            }
            _ = interval.tick() => {
                if let Err(err) = sweep(&global).await {
                    tracing::error!(error = %err, "sweep failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests;
