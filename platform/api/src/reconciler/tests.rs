use super::*;

fn stream(room: &str, is_live: bool, viewer_count: i32) -> Stream {
    Stream {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        room_name: room.to_string(),
        is_live,
        viewer_count,
        ..Default::default()
    }
}

fn apply(streams: &mut [Stream], updates: &[StreamUpdate]) {
    for update in updates {
        let stream = streams
            .iter_mut()
            .find(|s| s.id == update.stream_id)
            .expect("update for unknown stream");
        stream.is_live = update.is_live;
        stream.viewer_count = update.viewer_count;
    }
}

#[test]
fn test_no_room_goes_offline() {
    let streams = vec![stream("room-a", true, 12)];

    let (updates, stats) = plan_sweep(&streams, &HashMap::new(), &HashSet::new(), 0);

    assert_eq!(updates.len(), 1);
    assert!(!updates[0].is_live);
    assert_eq!(updates[0].viewer_count, 0);
    assert_eq!(stats.live_streams_found, 0);
    assert_eq!(stats.updated_streams, 1);
    assert_eq!(stats.total_streams, 1);
}

#[test]
fn test_owner_present_counts_viewers() {
    let streams = vec![stream("room-a", false, 0)];
    let mut observations = HashMap::new();
    observations.insert(
        "room-a".to_string(),
        RoomObservation {
            host_connected: true,
            viewer_count: 3,
        },
    );

    let (updates, stats) = plan_sweep(&streams, &observations, &HashSet::new(), 1);

    assert_eq!(updates.len(), 1);
    assert!(updates[0].is_live);
    assert_eq!(updates[0].viewer_count, 3);
    assert_eq!(stats.live_streams_found, 1);
    assert_eq!(stats.active_rooms, 1);
}

#[test]
fn test_owner_absent_forces_offline() {
    // The room still has viewers, but the owner disconnected.
    let streams = vec![stream("room-a", true, 5)];
    let mut observations = HashMap::new();
    observations.insert(
        "room-a".to_string(),
        RoomObservation {
            host_connected: false,
            viewer_count: 5,
        },
    );

    let (updates, stats) = plan_sweep(&streams, &observations, &HashSet::new(), 1);

    assert_eq!(updates.len(), 1);
    assert!(!updates[0].is_live);
    assert_eq!(updates[0].viewer_count, 0);
    assert_eq!(stats.live_streams_found, 0);
}

#[test]
fn test_sweep_idempotent() {
    let mut streams = vec![
        stream("room-a", false, 0),
        stream("room-b", true, 2),
        stream("room-c", true, 9),
    ];

    let mut observations = HashMap::new();
    observations.insert(
        "room-a".to_string(),
        RoomObservation {
            host_connected: true,
            viewer_count: 1,
        },
    );
    observations.insert(
        "room-b".to_string(),
        RoomObservation {
            host_connected: true,
            viewer_count: 7,
        },
    );

    let (updates, stats) = plan_sweep(&streams, &observations, &HashSet::new(), 2);
    assert_eq!(stats.updated_streams, 3);
    apply(&mut streams, &updates);

    // Second pass over unchanged media state plans nothing.
    let (updates, stats) = plan_sweep(&streams, &observations, &HashSet::new(), 2);
    assert!(updates.is_empty());
    assert_eq!(stats.updated_streams, 0);
    assert_eq!(stats.live_streams_found, 2);
}

#[test]
fn test_unreachable_room_is_skipped() {
    let streams = vec![stream("room-a", true, 4), stream("room-b", true, 1)];
    let mut unreachable = HashSet::new();
    unreachable.insert("room-a".to_string());

    let (updates, stats) = plan_sweep(&streams, &HashMap::new(), &unreachable, 1);

    // room-a keeps its stored state this pass; room-b goes offline.
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].stream_id, streams[1].id);
    assert!(!updates[0].is_live);
    assert_eq!(stats.total_streams, 2);
}

#[test]
fn test_stale_count_refreshed_while_live() {
    let streams = vec![stream("room-a", true, 2)];
    let mut observations = HashMap::new();
    observations.insert(
        "room-a".to_string(),
        RoomObservation {
            host_connected: true,
            viewer_count: 6,
        },
    );

    let (updates, _) = plan_sweep(&streams, &observations, &HashSet::new(), 1);

    assert_eq!(updates.len(), 1);
    assert!(updates[0].is_live);
    assert_eq!(updates[0].viewer_count, 6);
}
