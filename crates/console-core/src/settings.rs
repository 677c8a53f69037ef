use serde::Serialize;

use crate::api::KeyMap;
use crate::outcome::RequestFailure;

pub const MASKED_VALUE: &str = "********";
pub const NOT_SET_TEXT: &str = "Not set";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingsView {
    #[default]
    ReadOnly,
    Editing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettingEntry {
    pub name: String,
    /// Masked in the read-only view, the raw draft value while editing.
    pub display: String,
    pub is_set: bool,
}

#[must_use]
pub fn mask_value(value: &str) -> &'static str {
    if value.is_empty() {
        NOT_SET_TEXT
    } else {
        MASKED_VALUE
    }
}

/// Credential map shown in Settings mode, with a draft copy for editing.
#[derive(Debug, Clone, Default)]
pub struct SettingsState {
    keys: KeyMap,
    draft: KeyMap,
    view: SettingsView,
    loaded: bool,
    loading: bool,
    saving: bool,
    load_error: Option<RequestFailure>,
    save_error: Option<RequestFailure>,
}

impl SettingsState {
    #[must_use]
    pub fn view(&self) -> SettingsView {
        self.view
    }

    #[must_use]
    pub fn keys(&self) -> &KeyMap {
        &self.keys
    }

    #[must_use]
    pub fn draft(&self) -> &KeyMap {
        &self.draft
    }

    #[must_use]
    pub fn loaded(&self) -> bool {
        self.loaded
    }

    #[must_use]
    pub fn loading(&self) -> bool {
        self.loading
    }

    #[must_use]
    pub fn saving(&self) -> bool {
        self.saving
    }

    #[must_use]
    pub fn load_error(&self) -> Option<&RequestFailure> {
        self.load_error.as_ref()
    }

    #[must_use]
    pub fn save_error(&self) -> Option<&RequestFailure> {
        self.save_error.as_ref()
    }

    /// Returns false when a load is already outstanding.
    pub fn begin_load(&mut self) -> bool {
        if self.loading {
            return false;
        }
        self.loading = true;
        true
    }

    pub fn complete_load(&mut self, result: Result<KeyMap, RequestFailure>) {
        self.loading = false;
        match result {
            Ok(keys) => {
                self.keys = keys;
                self.loaded = true;
                self.load_error = None;
            }
            Err(failure) => self.load_error = Some(failure),
        }
    }

    pub fn edit(&mut self) -> bool {
        if self.view == SettingsView::Editing || self.saving {
            return false;
        }
        self.draft = self.keys.clone();
        self.save_error = None;
        self.view = SettingsView::Editing;
        true
    }

    pub fn cancel_edit(&mut self) -> bool {
        if self.view != SettingsView::Editing || self.saving {
            return false;
        }
        self.draft.clear();
        self.save_error = None;
        self.view = SettingsView::ReadOnly;
        true
    }

    /// Updates or adds a draft value. Only valid while editing.
    pub fn set_value(&mut self, name: &str, value: &str) -> bool {
        let name = name.trim();
        if self.view != SettingsView::Editing || self.saving || name.is_empty() {
            return false;
        }
        self.draft.insert(name.to_string(), value.to_string());
        true
    }

    /// Takes the whole draft map for submission.
    pub fn begin_save(&mut self) -> Option<KeyMap> {
        if self.view != SettingsView::Editing || self.saving {
            return None;
        }
        self.saving = true;
        Some(self.draft.clone())
    }

    /// Any completion returns to the read-only view showing the submitted
    /// map. A failure is recorded but does not roll the map back.
    pub fn complete_save(&mut self, result: Result<(), RequestFailure>) {
        self.saving = false;
        self.keys = std::mem::take(&mut self.draft);
        self.save_error = result.err();
        self.view = SettingsView::ReadOnly;
    }

    #[must_use]
    pub fn entries(&self) -> Vec<SettingEntry> {
        match self.view {
            SettingsView::ReadOnly => self
                .keys
                .iter()
                .map(|(name, value)| SettingEntry {
                    name: name.clone(),
                    display: mask_value(value).to_string(),
                    is_set: !value.is_empty(),
                })
                .collect(),
            SettingsView::Editing => self
                .draft
                .iter()
                .map(|(name, value)| SettingEntry {
                    name: name.clone(),
                    display: value.clone(),
                    is_set: !value.is_empty(),
                })
                .collect(),
        }
    }
}
