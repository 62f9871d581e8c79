use anyhow::{Context as _, Result};

use policy_store::PolicyStore;
use scanner::CancelToken;

use crate::settings::{self, Settings};

/// Everything a command needs, constructed once per invocation and passed
/// explicitly. There is no process-wide state.
pub struct AdminContext {
    pub settings: Settings,
    pub store: PolicyStore,
    pub cancel: CancelToken,
}

impl AdminContext {
    pub fn bootstrap() -> Result<Self> {
        let settings = Settings::load()?;
        let policies_dir = settings::policies_dir()?;
        let store = PolicyStore::open(&policies_dir, settings.active_policy.as_deref())
            .with_context(|| {
                format!("failed opening policy store at {}", policies_dir.display())
            })?;
        Ok(Self {
            settings,
            store,
            cancel: CancelToken::new(),
        })
    }

    /// Mirror the store's active pointer back into settings and persist.
    pub fn finish(mut self) -> Result<()> {
        self.settings.active_policy = Some(self.store.active_name().to_string());
        self.settings.save()
    }
}
