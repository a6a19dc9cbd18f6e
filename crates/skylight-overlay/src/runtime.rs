//! The content runtime: one per page, reacting to store changes and
//! direct messages.

use std::sync::Arc;

use skylight_core::store::keys;
use skylight_core::{ContextBus, Envelope, Payload, Settings, StoreError, StoreEvent, SyncStore, TabId};
use skylight_weather::ForecastClient;
use tokio::sync::{broadcast, mpsc};

use crate::lifecycle::WidgetLifecycle;
use crate::surface::OverlaySurface;
use crate::viewport::Viewport;

/// Wires one page's widgets to the store subscription and the tab
/// mailbox, and dispatches both into the lifecycle.
pub struct ContentRuntime<S: OverlaySurface + 'static> {
    store: Arc<SyncStore>,
    widgets: WidgetLifecycle<S>,
    events: broadcast::Receiver<StoreEvent>,
    mailbox: mpsc::UnboundedReceiver<Envelope>,
    tab: TabId,
}

impl<S: OverlaySurface + 'static> ContentRuntime<S> {
    /// Register with the bus, subscribe to the store, and bring widgets
    /// up from persisted settings.
    pub fn connect(
        store: Arc<SyncStore>,
        bus: &ContextBus,
        forecast: ForecastClient,
        surface: Arc<S>,
        viewport: Viewport,
    ) -> Result<Self, StoreError> {
        let (tab, mailbox) = bus.register();
        let events = store.subscribe();
        let mut widgets = WidgetLifecycle::new(Arc::clone(&store), forecast, surface, viewport);
        widgets.initialize()?;
        tracing::info!("Content runtime connected as tab {}", tab);
        Ok(Self {
            store,
            widgets,
            events,
            mailbox,
            tab,
        })
    }

    pub fn tab_id(&self) -> TabId {
        self.tab
    }

    pub fn widgets(&self) -> &WidgetLifecycle<S> {
        &self.widgets
    }

    pub fn widgets_mut(&mut self) -> &mut WidgetLifecycle<S> {
        &mut self.widgets
    }

    /// Event loop. Returns when both the mailbox and the store event
    /// channel are gone.
    pub async fn run(&mut self) {
        loop {
            tokio::select! {
                envelope = self.mailbox.recv() => match envelope {
                    Some(envelope) => self.handle_envelope(envelope).await,
                    None => break,
                },
                event = self.events.recv() => match event {
                    Ok(event) => self.handle_store_event(&event).await,
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!("Missed {} store events; resyncing", missed);
                        self.resync().await;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
        self.widgets.shutdown();
    }

    /// A direct message from another context.
    pub async fn handle_envelope(&mut self, envelope: Envelope) {
        let Envelope { payload, ack } = envelope;
        let success = match payload {
            Payload::UpdateSettings(settings) => {
                self.widgets.apply_settings(settings);
                true
            }
            Payload::LocationUpdated(_) => {
                // The clock re-reads the active timezone on its next tick;
                // only the weather render needs a push.
                self.widgets.render_weather_now().await;
                true
            }
            Payload::RefreshWeather => {
                self.widgets.render_cached_or_fetch().await;
                true
            }
        };
        if let Some(ack) = ack {
            let _ = ack.send(success);
        }
    }

    /// A store change from any context. Always re-reads full state
    /// rather than applying the delta.
    pub async fn handle_store_event(&mut self, event: &StoreEvent) {
        if event.touches_any(&Settings::store_keys()) {
            match self.store.settings() {
                Ok(settings) => self.widgets.apply_settings(settings),
                Err(e) => tracing::warn!("Could not re-read settings: {}", e),
            }
        }
        if event.touches_any(&keys::LOCATION_KEYS) {
            self.widgets.render_weather_now().await;
        }
        if event.touches(keys::LAST_WEATHER_DATA) {
            self.widgets.render_cached().await;
        }
    }

    async fn resync(&mut self) {
        match self.store.settings() {
            Ok(settings) => self.widgets.apply_settings(settings),
            Err(e) => tracing::warn!("Could not re-read settings: {}", e),
        }
        self.widgets.render_cached_or_fetch().await;
    }
}
