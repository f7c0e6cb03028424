pub mod preferences;

pub use preferences::{
    AssistPreferences, EditorPreferences, Preferences, PreferencesError, PreferencesStore,
};
