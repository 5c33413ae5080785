use serde::Serialize;

use crate::error::EditorError;
use crate::peak::{Altitude, LatLng, Peak, PeakId, PeakInput};
use crate::repository::PeakRepository;
use crate::store::SharedMarkerStore;

/// Form fields while a marker is being edited. Free text, kept as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeakDraft {
    pub name: String,
    pub altitude: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorMode {
    Viewing,
    Editing { draft: PeakDraft },
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditorTarget {
    /// A clicked position with no server record yet.
    Pending(LatLng),
    Existing(Peak),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The pending marker is gone; nothing was ever stored.
    DiscardPending,
    BackToViewing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PopupAction {
    Cancel,
    Save,
    Delete,
    Update,
}

/// What a marker's popup shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Popup {
    pub title: String,
    pub editable: bool,
    pub name: String,
    pub altitude: String,
    pub lat: f64,
    pub lon: f64,
    pub actions: Vec<PopupAction>,
}

impl Popup {
    /// Read-only popup of a stored peak.
    pub fn for_peak(peak: &Peak) -> Self {
        Self {
            title: peak.name.clone(),
            editable: false,
            name: peak.name.clone(),
            altitude: peak.altitude.to_string(),
            lat: peak.lat,
            lon: peak.lon,
            actions: vec![PopupAction::Delete, PopupAction::Update],
        }
    }
}

/// Form state machine behind one marker's popup.
#[derive(Debug, Clone)]
pub struct PeakEditor {
    target: EditorTarget,
    mode: EditorMode,
}

impl PeakEditor {
    /// Creation mode: editing straight away, at `position` rounded for storage.
    pub fn create_at(position: LatLng) -> Self {
        Self {
            target: EditorTarget::Pending(position.rounded()),
            mode: EditorMode::Editing {
                draft: PeakDraft::default(),
            },
        }
    }

    /// Update mode: read-only until `begin_update`.
    pub fn for_peak(peak: Peak) -> Self {
        Self {
            target: EditorTarget::Existing(peak),
            mode: EditorMode::Viewing,
        }
    }

    pub fn target(&self) -> &EditorTarget {
        &self.target
    }

    pub fn mode(&self) -> &EditorMode {
        &self.mode
    }

    pub fn id(&self) -> Option<PeakId> {
        match &self.target {
            EditorTarget::Pending(_) => None,
            EditorTarget::Existing(peak) => Some(peak.id),
        }
    }

    pub fn position(&self) -> LatLng {
        match &self.target {
            EditorTarget::Pending(position) => *position,
            EditorTarget::Existing(peak) => peak.position(),
        }
    }

    pub fn is_creating(&self) -> bool {
        matches!(self.target, EditorTarget::Pending(_))
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.mode, EditorMode::Editing { .. })
    }

    fn state_name(&self) -> &'static str {
        match (&self.target, &self.mode) {
            (EditorTarget::Pending(_), _) => "creating",
            (_, EditorMode::Editing { .. }) => "editing",
            (_, EditorMode::Viewing) => "viewing",
        }
    }

    fn invalid(&self, action: &'static str) -> EditorError {
        EditorError::InvalidTransition {
            action,
            state: self.state_name(),
        }
    }

    fn draft_mut(&mut self, action: &'static str) -> Result<&mut PeakDraft, EditorError> {
        let state = self.state_name();
        match &mut self.mode {
            EditorMode::Editing { draft } => Ok(draft),
            EditorMode::Viewing => Err(EditorError::InvalidTransition { action, state }),
        }
    }

    pub fn begin_update(&mut self) -> Result<(), EditorError> {
        match (&self.target, &self.mode) {
            (EditorTarget::Existing(peak), EditorMode::Viewing) => {
                let draft = PeakDraft {
                    name: peak.name.clone(),
                    altitude: peak.altitude.to_string(),
                };
                self.mode = EditorMode::Editing { draft };
                Ok(())
            }
            _ => Err(self.invalid("update")),
        }
    }

    pub fn set_name(&mut self, value: impl Into<String>) -> Result<(), EditorError> {
        self.draft_mut("edit the name")?.name = value.into();
        Ok(())
    }

    pub fn set_altitude(&mut self, value: impl Into<String>) -> Result<(), EditorError> {
        self.draft_mut("edit the altitude")?.altitude = value.into();
        Ok(())
    }

    /// Drops the draft. Never touches the store.
    pub fn cancel(&mut self) -> Result<CancelOutcome, EditorError> {
        if !self.is_editing() {
            return Err(self.invalid("cancel"));
        }
        self.mode = EditorMode::Viewing;
        Ok(match self.target {
            EditorTarget::Pending(_) => CancelOutcome::DiscardPending,
            EditorTarget::Existing(_) => CancelOutcome::BackToViewing,
        })
    }

    /// Sends the draft to the repository and, once it is accepted, installs
    /// the server's record in the store. On failure the editor keeps editing
    /// with the draft intact and the store is untouched.
    pub async fn save<R: PeakRepository>(
        &mut self,
        repo: &R,
        store: &SharedMarkerStore,
    ) -> Result<Peak, EditorError> {
        let draft = match &self.mode {
            EditorMode::Editing { draft } => draft.clone(),
            EditorMode::Viewing => return Err(self.invalid("save")),
        };
        let saved = match &self.target {
            EditorTarget::Pending(position) => {
                let input = PeakInput {
                    name: draft.name,
                    altitude: Altitude::new(draft.altitude),
                    lat: position.lat,
                    lon: position.lon,
                };
                repo.create(input).await?
            }
            EditorTarget::Existing(peak) => {
                let edited = Peak {
                    name: draft.name,
                    altitude: Altitude::new(draft.altitude),
                    ..peak.clone()
                };
                repo.update(edited).await?
            }
        };
        store.lock().await.replace(saved.clone());
        self.target = EditorTarget::Existing(saved.clone());
        self.mode = EditorMode::Viewing;
        Ok(saved)
    }

    /// Deletes the peak on the server, then drops it from the store.
    pub async fn delete<R: PeakRepository>(
        &mut self,
        repo: &R,
        store: &SharedMarkerStore,
    ) -> Result<PeakId, EditorError> {
        let id = match (&self.target, &self.mode) {
            (EditorTarget::Existing(peak), EditorMode::Viewing) => peak.id,
            _ => return Err(self.invalid("delete")),
        };
        repo.delete(id).await?;
        store.lock().await.remove(id);
        Ok(id)
    }

    pub fn popup(&self) -> Popup {
        let position = self.position();
        match &self.mode {
            EditorMode::Editing { draft } => Popup {
                title: if self.is_creating() {
                    "Create a peak:".to_string()
                } else {
                    "Update a peak:".to_string()
                },
                editable: true,
                name: draft.name.clone(),
                altitude: draft.altitude.clone(),
                lat: position.lat,
                lon: position.lon,
                actions: vec![PopupAction::Cancel, PopupAction::Save],
            },
            EditorMode::Viewing => match &self.target {
                EditorTarget::Existing(peak) => Popup::for_peak(peak),
                EditorTarget::Pending(_) => Popup {
                    title: String::new(),
                    editable: false,
                    name: String::new(),
                    altitude: String::new(),
                    lat: position.lat,
                    lon: position.lon,
                    actions: Vec::new(),
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MarkerStore;
    use crate::test_support::{peak, FakeRepository, RepoCall};
    use reqwest::StatusCode;

    #[tokio::test]
    async fn create_flow_calls_repository_once_and_appends() {
        let repo = FakeRepository::new();
        repo.set_next_id(42);
        let store = MarkerStore::shared();

        let mut editor = PeakEditor::create_at(LatLng::new(45.832_62, 6.865_18));
        assert!(editor.is_editing());
        assert_eq!(editor.id(), None);
        editor.set_name("Mont Blanc").unwrap();
        editor.set_altitude("4808").unwrap();

        assert!(store.lock().await.is_empty());
        let created = editor.save(&repo, &store).await.unwrap();

        assert_eq!(
            repo.calls(),
            vec![RepoCall::Create(PeakInput {
                name: "Mont Blanc".to_string(),
                altitude: Altitude::new("4808"),
                lat: 45.8326,
                lon: 6.8652,
            })]
        );
        assert_eq!(created.id, 42);
        assert_eq!(store.lock().await.snapshot(), vec![created]);
        assert_eq!(editor.id(), Some(42));
        assert!(!editor.is_editing());
    }

    #[tokio::test]
    async fn cancel_creation_discards_without_store_mutation() {
        let repo = FakeRepository::new();
        let store = MarkerStore::shared();
        let mut editor = PeakEditor::create_at(LatLng::new(1.0, 2.0));
        editor.set_name("Draft").unwrap();

        assert_eq!(editor.cancel().unwrap(), CancelOutcome::DiscardPending);
        assert!(store.lock().await.is_empty());
        assert!(repo.calls().is_empty());
    }

    #[tokio::test]
    async fn update_flow_merges_draft_onto_existing_record() {
        let original = peak(1, "Snowdon");
        let repo = FakeRepository::with_peaks([original.clone()]);
        let store = MarkerStore::shared();
        store.lock().await.merge([original.clone()]);

        let mut editor = PeakEditor::for_peak(original.clone());
        assert!(!editor.is_editing());
        editor.begin_update().unwrap();
        assert_eq!(
            editor.mode(),
            &EditorMode::Editing {
                draft: PeakDraft {
                    name: "Snowdon".to_string(),
                    altitude: "100".to_string(),
                }
            }
        );
        editor.set_name("Yr Wyddfa").unwrap();
        editor.set_altitude("1085").unwrap();

        let updated = editor.save(&repo, &store).await.unwrap();

        assert_eq!(updated.id, 1);
        assert_eq!(updated.lat, original.lat);
        assert_eq!(updated.name, "Yr Wyddfa");
        let stored = store.lock().await.snapshot();
        assert_eq!(stored, vec![updated]);
    }

    #[tokio::test]
    async fn cancel_update_restores_read_only_view() {
        let original = peak(1, "Snowdon");
        let store = MarkerStore::shared();
        store.lock().await.merge([original.clone()]);

        let mut editor = PeakEditor::for_peak(original.clone());
        editor.begin_update().unwrap();
        editor.set_name("typo").unwrap();

        assert_eq!(editor.cancel().unwrap(), CancelOutcome::BackToViewing);
        assert_eq!(editor.popup().name, "Snowdon");
        assert_eq!(store.lock().await.get(1), Some(&original));
    }

    #[tokio::test]
    async fn failed_save_keeps_draft_and_store() {
        let original = peak(1, "Snowdon");
        let repo = FakeRepository::with_peaks([original.clone()]);
        repo.fail_next(StatusCode::BAD_REQUEST);
        let store = MarkerStore::shared();
        store.lock().await.merge([original.clone()]);

        let mut editor = PeakEditor::for_peak(original.clone());
        editor.begin_update().unwrap();
        editor.set_altitude("not a number").unwrap();

        let err = editor.save(&repo, &store).await.unwrap_err();

        assert!(matches!(err, EditorError::Repository(_)));
        assert!(editor.is_editing());
        assert_eq!(editor.popup().altitude, "not a number");
        assert_eq!(store.lock().await.snapshot(), vec![original]);
    }

    #[tokio::test]
    async fn rejected_delete_leaves_store_unchanged() {
        let original = peak(1, "Snowdon");
        let repo = FakeRepository::with_peaks([original.clone()]);
        repo.fail_next(StatusCode::INTERNAL_SERVER_ERROR);
        let store = MarkerStore::shared();
        store.lock().await.merge([original.clone()]);

        let mut editor = PeakEditor::for_peak(original.clone());
        let err = editor.delete(&repo, &store).await.unwrap_err();

        assert!(matches!(
            err,
            EditorError::Repository(ref inner) if inner.status() == Some(StatusCode::INTERNAL_SERVER_ERROR)
        ));
        assert_eq!(store.lock().await.snapshot(), vec![original]);
    }

    #[tokio::test]
    async fn delete_removes_from_store() {
        let original = peak(1, "Snowdon");
        let repo = FakeRepository::with_peaks([original.clone(), peak(2, "Tryfan")]);
        let store = MarkerStore::shared();
        store.lock().await.merge([original.clone(), peak(2, "Tryfan")]);

        let mut editor = PeakEditor::for_peak(original);
        assert_eq!(editor.delete(&repo, &store).await.unwrap(), 1);

        let ids: Vec<PeakId> = store.lock().await.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![2]);
        assert_eq!(repo.calls(), vec![RepoCall::Delete(1)]);
    }

    #[tokio::test]
    async fn invalid_transitions_change_nothing() {
        let repo = FakeRepository::new();
        let store = MarkerStore::shared();

        let mut viewing = PeakEditor::for_peak(peak(1, "Snowdon"));
        assert!(viewing.set_name("x").is_err());
        assert!(viewing.cancel().is_err());
        assert!(viewing.save(&repo, &store).await.is_err());

        let mut editing = PeakEditor::for_peak(peak(1, "Snowdon"));
        editing.begin_update().unwrap();
        assert!(editing.begin_update().is_err());
        assert!(matches!(
            editing.delete(&repo, &store).await,
            Err(EditorError::InvalidTransition { action: "delete", state: "editing" })
        ));

        let mut creating = PeakEditor::create_at(LatLng::new(0.0, 0.0));
        assert!(creating.begin_update().is_err());
        assert!(creating.delete(&repo, &store).await.is_err());

        assert!(repo.calls().is_empty());
        assert!(store.lock().await.is_empty());
    }

    #[test]
    fn popup_reflects_mode() {
        let creating = PeakEditor::create_at(LatLng::new(51.505_01, -0.09));
        let popup = creating.popup();
        assert_eq!(popup.title, "Create a peak:");
        assert!(popup.editable);
        assert_eq!(popup.lat, 51.505);
        assert_eq!(popup.actions, vec![PopupAction::Cancel, PopupAction::Save]);

        let mut existing = PeakEditor::for_peak(peak(3, "Helvellyn"));
        let popup = existing.popup();
        assert_eq!(popup.title, "Helvellyn");
        assert!(!popup.editable);
        assert_eq!(popup.actions, vec![PopupAction::Delete, PopupAction::Update]);

        existing.begin_update().unwrap();
        assert_eq!(existing.popup().title, "Update a peak:");
    }
}
