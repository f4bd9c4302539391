use crate::HeronServerConfig;

use heron_jobs::TaskManager;

pub struct AppState<C, P> {
    pub manager: TaskManager<C, P>,
    pub config: HeronServerConfig,
}

impl<C, P> Clone for AppState<C, P> {
    fn clone(&self) -> Self {
        Self {
            manager: self.manager.clone(),
            config: self.config.clone(),
        }
    }
}
