//! Widget lifecycle: the ABSENT/ACTIVE state machine per widget kind,
//! refresh-task ownership, and the drag plumbing.
//!
//! All per-page mutable state lives in [`WidgetLifecycle`] — one instance
//! per page load, owned by the content runtime. The enabled flags are the
//! single source of truth: a kind's refresh task exists exactly while its
//! flag is true.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use skylight_core::{clock, Coordinates, Settings, StoreError, SyncStore};
use skylight_weather::{ForecastClient, WeatherSnapshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::drag::DragController;
use crate::surface::{OverlaySurface, WidgetContent, WidgetKind};
use crate::viewport::{default_position, widget_size, PixelPoint, Viewport, WidgetFrame};

/// Content-side weather cadence. The background refresher runs its own
/// 30-minute loop on top of this; the two are deliberately uncoordinated.
pub const WEATHER_REFRESH_INTERVAL: Duration = Duration::from_secs(15 * 60);
/// Clock cadence.
pub const CLOCK_TICK: Duration = Duration::from_secs(1);

/// Collaborators shared with the spawned refresh tasks.
struct Shared<S> {
    store: Arc<SyncStore>,
    forecast: ForecastClient,
    surface: Arc<S>,
}

/// A live widget: its drag state and its refresh task. Dropping the
/// instance aborts the task.
struct WidgetInstance {
    drag: DragController,
    refresh: JoinHandle<()>,
}

impl Drop for WidgetInstance {
    fn drop(&mut self) {
        self.refresh.abort();
    }
}

/// Per-page widget state machine.
pub struct WidgetLifecycle<S: OverlaySurface + 'static> {
    shared: Arc<Shared<S>>,
    viewport: Viewport,
    settings: Settings,
    weather: Option<WidgetInstance>,
    time: Option<WidgetInstance>,
}

impl<S: OverlaySurface + 'static> WidgetLifecycle<S> {
    pub fn new(
        store: Arc<SyncStore>,
        forecast: ForecastClient,
        surface: Arc<S>,
        viewport: Viewport,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                store,
                forecast,
                surface,
            }),
            viewport,
            settings: Settings::default(),
            weather: None,
            time: None,
        }
    }

    /// Read persisted settings and bring widgets up accordingly.
    pub fn initialize(&mut self) -> Result<(), StoreError> {
        let settings = self.shared.store.settings()?;
        self.apply_settings(settings);
        Ok(())
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn is_active(&self, kind: WidgetKind) -> bool {
        self.instance(kind).is_some()
    }

    /// Current on-page position of an active widget.
    pub fn position_of(&self, kind: WidgetKind) -> Option<PixelPoint> {
        self.instance(kind).map(|i| i.drag.position())
    }

    /// Run the state machine against a new settings object.
    ///
    /// enabled && absent  → create (mount, restore position, start task)
    /// !enabled && active → destroy (abort task, unmount)
    /// active, flag same  → re-apply transparency only
    pub fn apply_settings(&mut self, settings: Settings) {
        self.settings = settings;
        for kind in WidgetKind::ALL {
            let enabled = match kind {
                WidgetKind::Weather => self.settings.widget_enabled,
                WidgetKind::Time => self.settings.time_enabled,
            };
            if enabled && !self.is_active(kind) {
                self.create(kind);
            } else if !enabled && self.is_active(kind) {
                self.destroy(kind);
            } else if self.is_active(kind) {
                self.shared
                    .surface
                    .set_opacity(kind, self.settings.transparency);
            }
        }
    }

    /// Tear everything down (page unload).
    pub fn shutdown(&mut self) {
        for kind in WidgetKind::ALL {
            if self.is_active(kind) {
                self.destroy(kind);
            }
        }
    }

    fn create(&mut self, kind: WidgetKind) {
        if self.is_active(kind) {
            return;
        }
        let size = widget_size(kind);
        let position = match self.shared.store.widget_position(kind.position_key()) {
            Ok(Some(saved)) => self.viewport.clamp(PixelPoint::from(saved), size),
            Ok(None) => default_position(kind, self.settings.anchor, self.viewport),
            Err(e) => {
                tracing::warn!("Could not read saved position for {:?}: {}", kind, e);
                default_position(kind, self.settings.anchor, self.viewport)
            }
        };

        self.shared.surface.mount(
            kind,
            WidgetFrame {
                position,
                opacity: self.settings.transparency,
            },
        );

        let refresh = match kind {
            WidgetKind::Weather => spawn_weather_loop(Arc::clone(&self.shared)),
            WidgetKind::Time => spawn_clock_loop(Arc::clone(&self.shared)),
        };

        *self.instance_mut(kind) = Some(WidgetInstance {
            drag: DragController::new(position, size),
            refresh,
        });
        tracing::debug!("{:?} widget created", kind);
    }

    fn destroy(&mut self, kind: WidgetKind) {
        if let Some(instance) = self.instance_mut(kind).take() {
            instance.refresh.abort();
            self.shared.surface.unmount(kind);
            tracing::debug!("{:?} widget removed", kind);
        }
    }

    fn instance(&self, kind: WidgetKind) -> Option<&WidgetInstance> {
        match kind {
            WidgetKind::Weather => self.weather.as_ref(),
            WidgetKind::Time => self.time.as_ref(),
        }
    }

    fn instance_mut(&mut self, kind: WidgetKind) -> &mut Option<WidgetInstance> {
        match kind {
            WidgetKind::Weather => &mut self.weather,
            WidgetKind::Time => &mut self.time,
        }
    }

    // ---- pointer input ---------------------------------------------------

    pub fn pointer_down(&mut self, kind: WidgetKind, pointer: PixelPoint) {
        if let Some(instance) = self.instance_mut(kind).as_mut() {
            instance.drag.pointer_down(pointer);
        }
    }

    pub fn pointer_move(&mut self, kind: WidgetKind, pointer: PixelPoint) {
        let viewport = self.viewport;
        if let Some(instance) = self.instance_mut(kind).as_mut() {
            if let Some(position) = instance.drag.pointer_move(pointer, viewport) {
                self.shared.surface.set_position(kind, position);
            }
        }
    }

    /// End a drag gesture. This is the only path that persists a widget
    /// position.
    pub fn pointer_up(&mut self, kind: WidgetKind) -> Result<(), StoreError> {
        let released = self
            .instance_mut(kind)
            .as_mut()
            .and_then(|instance| instance.drag.pointer_up());
        if let Some(position) = released {
            self.shared
                .store
                .set_widget_position(kind.position_key(), position)?;
        }
        Ok(())
    }

    /// The viewport changed size; pull any out-of-bounds widget back in.
    /// Runtime-only — the corrected position is not persisted.
    pub fn viewport_resized(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        for kind in WidgetKind::ALL {
            if let Some(instance) = self.instance_mut(kind).as_mut() {
                if let Some(position) = instance.drag.viewport_resized(viewport) {
                    self.shared.surface.set_position(kind, position);
                }
            }
        }
    }

    // ---- weather rendering ----------------------------------------------

    /// Fetch and render now (location change, manual refresh).
    pub async fn render_weather_now(&self) {
        if self.is_active(WidgetKind::Weather) {
            render_weather(&self.shared).await;
        }
    }

    /// Render the cache-warmed snapshot if one exists; otherwise do
    /// nothing. Used when the store's cached weather changes under us —
    /// fetching again would repeat the write that triggered this.
    pub async fn render_cached(&self) {
        if !self.is_active(WidgetKind::Weather) {
            return;
        }
        match WeatherSnapshot::load(&self.shared.store) {
            Ok(Some(snapshot)) => render_snapshot(&self.shared, &snapshot),
            Ok(None) => {}
            Err(e) => tracing::warn!("Could not read cached weather: {}", e),
        }
    }

    /// Render the cached snapshot, fetching only when the cache is empty.
    pub async fn render_cached_or_fetch(&self) {
        if !self.is_active(WidgetKind::Weather) {
            return;
        }
        match WeatherSnapshot::load(&self.shared.store) {
            Ok(Some(snapshot)) => render_snapshot(&self.shared, &snapshot),
            Ok(None) => render_weather(&self.shared).await,
            Err(e) => {
                tracing::warn!("Could not read cached weather: {}", e);
                render_weather(&self.shared).await;
            }
        }
    }
}

fn spawn_weather_loop<S: OverlaySurface + 'static>(shared: Arc<Shared<S>>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(WEATHER_REFRESH_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            render_weather(&shared).await;
        }
    })
}

fn spawn_clock_loop<S: OverlaySurface + 'static>(shared: Arc<Shared<S>>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(CLOCK_TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            clock_tick(&shared);
        }
    })
}

/// One weather render: re-derive everything from the store, fetch,
/// display. Failures degrade to the placeholder and never escape.
async fn render_weather<S: OverlaySurface>(shared: &Shared<S>) {
    let state = fetch_state(shared);
    let (coordinates, is_celsius) = match state {
        Ok(state) => state,
        Err(e) => {
            tracing::warn!("Could not resolve weather state: {}", e);
            shared
                .surface
                .set_content(WidgetKind::Weather, WidgetContent::unavailable());
            return;
        }
    };

    match shared.forecast.fetch_current(coordinates).await {
        Ok(conditions) => shared.surface.set_content(
            WidgetKind::Weather,
            WidgetContent::from_conditions(conditions, is_celsius),
        ),
        Err(e) => {
            tracing::warn!("Weather fetch failed: {}", e);
            shared
                .surface
                .set_content(WidgetKind::Weather, WidgetContent::unavailable());
        }
    }
}

/// Active coordinates + unit, re-read from full store state every time.
fn fetch_state<S>(shared: &Shared<S>) -> Result<(Coordinates, bool), StoreError> {
    let settings = shared.store.settings()?;
    let active = shared.store.active_location()?;
    Ok((active.coordinates, settings.is_celsius))
}

fn render_snapshot<S: OverlaySurface>(shared: &Shared<S>, snapshot: &WeatherSnapshot) {
    let is_celsius = shared
        .store
        .settings()
        .map(|s| s.is_celsius)
        .unwrap_or(false);
    shared.surface.set_content(
        WidgetKind::Weather,
        WidgetContent::from_conditions(snapshot.conditions(), is_celsius),
    );
}

fn clock_tick<S: OverlaySurface>(shared: &Shared<S>) {
    let timezone = shared
        .store
        .active_location()
        .map(|active| active.timezone)
        .unwrap_or(None);
    shared.surface.set_content(
        WidgetKind::Time,
        WidgetContent::Clock {
            time: clock::format_time(Utc::now(), timezone),
        },
    );
}
