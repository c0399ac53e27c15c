mod preferences;

pub use preferences::{PreferenceStore, MOCK_MODE_KEY};
