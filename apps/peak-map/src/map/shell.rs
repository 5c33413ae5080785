use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::{EditorAction, EditorKey, MapEvent, MapWidget, Marker, ShellInput, TileLayer};
use crate::editor::{CancelOutcome, PeakEditor, Popup};
use crate::error::EditorError;
use crate::peak::{LatLng, Peak, PeakId};
use crate::repository::PeakRepository;
use crate::store::SharedMarkerStore;
use crate::sync::{SyncOutcome, ViewportSync};

/// What an editor action did to the marker it was aimed at.
enum Applied {
    Kept,
    Discarded,
    Saved(Peak),
    Deleted(PeakId),
}

/// Owns the widget and every editor. Inputs are handled one at a time; only
/// viewport loads run in the background.
pub struct MapShell<W, R> {
    widget: W,
    repo: Arc<R>,
    store: SharedMarkerStore,
    sync: ViewportSync<R>,
    pending: Option<PeakEditor>,
    editors: BTreeMap<PeakId, PeakEditor>,
}

impl<W: MapWidget, R: PeakRepository> MapShell<W, R> {
    pub fn new(mut widget: W, repo: Arc<R>, store: SharedMarkerStore, tiles: &TileLayer) -> Self {
        widget.set_tile_layer(tiles);
        let sync = ViewportSync::new(repo.clone(), store.clone());
        Self {
            widget,
            repo,
            store,
            sync,
            pending: None,
            editors: BTreeMap::new(),
        }
    }

    /// Reports the widget's current viewport as ready.
    pub async fn start(&mut self) {
        let viewport = self.widget.viewport();
        self.handle(ShellInput::Map(MapEvent::Ready { viewport })).await;
    }

    pub fn widget(&self) -> &W {
        &self.widget
    }

    pub fn store(&self) -> &SharedMarkerStore {
        &self.store
    }

    pub fn sync(&self) -> &ViewportSync<R> {
        &self.sync
    }

    pub fn pending(&self) -> Option<&PeakEditor> {
        self.pending.as_ref()
    }

    pub fn editor(&self, id: PeakId) -> Option<&PeakEditor> {
        self.editors.get(&id)
    }

    pub async fn handle(&mut self, input: ShellInput) {
        match input {
            ShellInput::Map(event) => self.on_map_event(event),
            ShellInput::Editor { key, action } => {
                if let Err(err) = self.on_editor_action(key, &action).await {
                    tracing::warn!(?key, ?action, error = %err, "peak editor action failed");
                    self.widget.notify_error(&err.to_string());
                }
            }
        }
        self.render().await;
    }

    fn on_map_event(&mut self, event: MapEvent) {
        match event {
            MapEvent::Ready { viewport } => {
                self.widget.follow(&viewport);
                self.sync.map_ready(&viewport);
            }
            MapEvent::MoveEnd { viewport } | MapEvent::ZoomEnd { viewport } => {
                self.widget.follow(&viewport);
                self.sync.viewport_settled(&viewport);
            }
            MapEvent::Click { position } => {
                let editor = PeakEditor::create_at(position);
                self.fly_to(editor.position());
                if self.pending.replace(editor).is_some() {
                    tracing::debug!("pending marker moved");
                }
            }
            MapEvent::LocationFound { position } => self.fly_to(position),
        }
    }

    /// Flies at the current zoom, then loads the viewport the flight ended on.
    fn fly_to(&mut self, position: LatLng) {
        let zoom = self.widget.viewport().zoom;
        self.widget.fly_to(position, zoom);
        let viewport = self.widget.viewport();
        self.sync.viewport_settled(&viewport);
    }

    async fn on_editor_action(
        &mut self,
        key: EditorKey,
        action: &EditorAction,
    ) -> Result<(), EditorError> {
        let repo = self.repo.clone();
        let store = self.store.clone();
        let editor = match key {
            EditorKey::Pending => self
                .pending
                .as_mut()
                .ok_or(EditorError::NoPendingMarker)?,
            EditorKey::Peak(id) => match self.editors.entry(id) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let peak = store
                        .lock()
                        .await
                        .get(id)
                        .cloned()
                        .ok_or(EditorError::UnknownPeak(id))?;
                    entry.insert(PeakEditor::for_peak(peak))
                }
            },
        };
        let result = apply(editor, action, repo.as_ref(), &store).await;

        match key {
            EditorKey::Pending => {
                if matches!(result, Ok(Applied::Discarded | Applied::Saved(_))) {
                    self.pending = None;
                }
            }
            EditorKey::Peak(id) => {
                let done = matches!(result, Ok(Applied::Deleted(_)))
                    || self.editors.get(&id).is_some_and(|e| !e.is_editing());
                if done {
                    self.editors.remove(&id);
                }
            }
        }

        match result? {
            Applied::Saved(peak) => tracing::info!(id = peak.id, name = %peak.name, "peak saved"),
            Applied::Deleted(id) => tracing::info!(id, "peak deleted"),
            Applied::Kept | Applied::Discarded => {}
        }
        Ok(())
    }

    /// Redraws every stored peak plus the pending marker.
    pub async fn render(&mut self) {
        let mut markers: Vec<Marker> = {
            let store = self.store.lock().await;
            store
                .iter()
                .map(|peak| Marker {
                    id: Some(peak.id),
                    position: peak.position(),
                    popup: match self.editors.get(&peak.id) {
                        Some(editor) => editor.popup(),
                        None => Popup::for_peak(peak),
                    },
                })
                .collect()
        };
        if let Some(pending) = &self.pending {
            markers.push(Marker {
                id: None,
                position: pending.position(),
                popup: pending.popup(),
            });
        }
        self.widget.render_markers(&markers);
    }

    async fn on_sync_outcome(&mut self, outcome: &SyncOutcome) {
        match outcome {
            SyncOutcome::Merged { added, .. } if *added > 0 => self.render().await,
            SyncOutcome::Merged { .. } => {}
            SyncOutcome::Failed { error, .. } => {
                let message = format!("could not load peaks: {error}");
                self.widget.notify_error(&message);
            }
            SyncOutcome::Lost { error } => {
                let message = format!("could not load peaks: {error}");
                self.widget.notify_error(&message);
            }
        }
    }

    /// Waits for every in-flight viewport load and applies the results.
    pub async fn settle(&mut self) -> Vec<SyncOutcome> {
        let outcomes = self.sync.wait_idle().await;
        for outcome in &outcomes {
            self.on_sync_outcome(outcome).await;
        }
        outcomes
    }

    /// Handles inputs until the sender side closes, then lets pending loads
    /// finish.
    pub async fn run(mut self, mut inputs: mpsc::Receiver<ShellInput>) -> Self {
        loop {
            tokio::select! {
                input = inputs.recv() => match input {
                    Some(input) => self.handle(input).await,
                    None => break,
                },
                Some(outcome) = self.sync.next_outcome() => {
                    self.on_sync_outcome(&outcome).await;
                }
            }
        }
        self.settle().await;
        self
    }
}

async fn apply<R: PeakRepository>(
    editor: &mut PeakEditor,
    action: &EditorAction,
    repo: &R,
    store: &SharedMarkerStore,
) -> Result<Applied, EditorError> {
    match action {
        EditorAction::BeginUpdate => editor.begin_update()?,
        EditorAction::SetName { value } => editor.set_name(value.clone())?,
        EditorAction::SetAltitude { value } => editor.set_altitude(value.clone())?,
        EditorAction::Cancel => {
            if editor.cancel()? == CancelOutcome::DiscardPending {
                return Ok(Applied::Discarded);
            }
        }
        EditorAction::Save => return Ok(Applied::Saved(editor.save(repo, store).await?)),
        EditorAction::Delete => return Ok(Applied::Deleted(editor.delete(repo, store).await?)),
    }
    Ok(Applied::Kept)
}
