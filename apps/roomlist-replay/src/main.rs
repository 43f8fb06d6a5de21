mod config;
mod logging;
mod script;
mod thumbnails;

use std::{
    env,
    error::Error,
    sync::Arc,
    time::{Duration, Instant},
};

use config::ReplayConfig;
use roomlist_core::{EventStream, ImageCache, RoomListEvent};
use roomlist_platform::DiskImageCache;
use roomlist_view::RoomListView;
use script::{ReplayStep, apply_step, load_script};
use serde::Serialize;
use thumbnails::FsThumbnailClient;
use tokio::sync::broadcast::error::TryRecvError;
use tracing::{debug, info, warn};

/// Ticks spent after the last step so in-flight fetches and deferred sorts land.
const SETTLE_TICKS: u32 = 4;

#[derive(Debug, Serialize)]
struct ReplaySummary {
    order: Vec<String>,
    visible: Vec<VisibleRoom>,
    selected_room_id: Option<String>,
    total_unread: u64,
}

#[derive(Debug, Serialize)]
struct VisibleRoom {
    room_id: String,
    name: String,
}

fn main() -> Result<(), Box<dyn Error>> {
    logging::init();

    let config = ReplayConfig::from_env(env::args().nth(1))?;
    info!(
        script = %config.script_path.display(),
        data_dir = %config.data_dir.display(),
        sort_delay_ms = config.sort_delay_ms,
        "starting roomlist-replay"
    );
    let steps = load_script(&config.script_path)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("roomlist-replay")
        .build()?;

    let cache = Arc::new(DiskImageCache::with_capacity(
        &config.data_dir,
        config.cache_capacity_bytes,
    )?);
    let client = FsThumbnailClient::new(&config.thumbnail_dir, runtime.handle().clone());
    let mut view = RoomListView::new(
        Arc::clone(&cache) as Arc<dyn ImageCache>,
        Arc::new(client),
        config.room_list_settings(),
    );
    let mut events = view.subscribe();

    runtime.block_on(replay(&mut view, &mut events, steps, config.tick_ms));

    let summary = ReplaySummary {
        order: view.display_order().to_vec(),
        visible: view
            .visible_rooms()
            .into_iter()
            .map(|entry| VisibleRoom {
                room_id: entry.room_id.clone(),
                name: entry.display_name().to_owned(),
            })
            .collect(),
        selected_room_id: view.selected_room_id().map(str::to_owned),
        total_unread: view.total_unread(),
    };
    drop(view);
    drop(runtime);
    cache.flush()?;
    info!(size_bytes = cache.total_size_bytes(), "image cache flushed");

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

async fn replay(
    view: &mut RoomListView,
    events: &mut EventStream,
    steps: Vec<ReplayStep>,
    tick_ms: u64,
) {
    let started = Instant::now();
    let tick = Duration::from_millis(tick_ms);

    for step in steps {
        debug!(step = step.kind(), "applying replay step");
        if let ReplayStep::Wait { ms } = step {
            run_scheduler(view, events, &started, Duration::from_millis(ms), tick).await;
            continue;
        }
        apply_step(view, step, elapsed_ms(&started));
        if let Some(room_id) = view.take_scroll_request() {
            debug!(%room_id, "scroll selected room into view");
        }
        if let Some(due_at_ms) = view.next_sort_deadline_ms() {
            debug!(due_at_ms, "deferred sort armed");
        } else if view.is_sort_pending() {
            debug!("sort deferred while pointer is over the list");
        }
        view.drain_avatar_updates();
        log_events(events);
    }

    run_scheduler(view, events, &started, tick * SETTLE_TICKS, tick).await;
}

async fn run_scheduler(
    view: &mut RoomListView,
    events: &mut EventStream,
    started: &Instant,
    duration: Duration,
    tick: Duration,
) {
    let deadline = Instant::now() + duration;
    let mut interval = tokio::time::interval(tick);
    loop {
        interval.tick().await;
        if view.poll_sort(elapsed_ms(started)) {
            debug!("deferred sort ran");
        }
        view.drain_avatar_updates();
        log_events(events);
        if Instant::now() >= deadline {
            break;
        }
    }
}

fn log_events(events: &mut EventStream) {
    loop {
        match events.try_recv() {
            Ok(event) => log_event(&event),
            Err(TryRecvError::Lagged(skipped)) => {
                warn!(skipped, "room list event subscriber lagged");
            }
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
}

fn log_event(event: &RoomListEvent) {
    match event {
        RoomListEvent::SelectionChanged { room_id } => info!(%room_id, "selection changed"),
        RoomListEvent::AvatarChanged { room_id, avatar } => info!(
            %room_id,
            width = avatar.width,
            height = avatar.height,
            "avatar changed"
        ),
        RoomListEvent::TotalUnreadChanged { total } => info!(total, "total unread changed"),
        RoomListEvent::OrderChanged { order } => info!(order = ?order, "room order changed"),
        RoomListEvent::LeaveRequested { room_id } => info!(%room_id, "leave requested"),
        RoomListEvent::JoinRequested { room_alias } => info!(%room_alias, "join requested"),
        RoomListEvent::InviteAccepted { room_id } => info!(%room_id, "invite accepted"),
        RoomListEvent::InviteDeclined { room_id } => info!(%room_id, "invite declined"),
    }
}

fn elapsed_ms(started: &Instant) -> u64 {
    started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64
}
