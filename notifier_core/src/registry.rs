use crate::error::RegistryError;
use crate::plugin::RendererPlugin;
use crate::settings::PluginSettings;
use tracing::{debug, info};

pub const DEFAULT_PLUGIN_ID: &str = "Default";

/// Owns every renderer plugin and tracks which one is current.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Box<dyn RendererPlugin>>,
    current: Option<usize>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, plugin: Box<dyn RendererPlugin>) -> Result<(), RegistryError> {
        if self.position(plugin.id()).is_some() {
            return Err(RegistryError::DuplicatePlugin(plugin.id().to_string()));
        }
        debug!(plugin = plugin.id(), "registered renderer plugin");
        self.plugins.push(plugin);
        Ok(())
    }

    /// Makes `id` the current plugin. Unknown ids leave the selection as it
    /// was; callers decide what to fall back to.
    pub fn select_current(
        &mut self,
        id: &str,
        settings: &PluginSettings,
    ) -> Result<(), RegistryError> {
        let index = self
            .position(id)
            .ok_or_else(|| RegistryError::UnknownPlugin(id.to_string()))?;
        if self.current == Some(index) {
            return Ok(());
        }
        if let Some(previous) = self.current.take() {
            self.plugins[previous].deactivate();
        }
        self.plugins[index].activate(settings);
        self.current = Some(index);
        info!(plugin = id, "selected renderer plugin");
        Ok(())
    }

    pub fn current(&self) -> Option<&dyn RendererPlugin> {
        self.current.map(|i| self.plugins[i].as_ref())
    }

    pub fn current_mut(&mut self) -> Option<&mut (dyn RendererPlugin + 'static)> {
        let index = self.current?;
        Some(self.plugins[index].as_mut())
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current().map(|p| p.id())
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.plugins.iter().map(|p| p.id())
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Deactivates and releases every plugin. Safe to call more than once.
    pub fn dispose_all(&mut self) {
        if let Some(current) = self.current.take() {
            self.plugins[current].deactivate();
        }
        for mut plugin in self.plugins.drain(..) {
            plugin.dispose();
        }
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.plugins.iter().position(|p| p.id() == id)
    }
}

impl Drop for PluginRegistry {
    fn drop(&mut self) {
        self.dispose_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::KindMask;
    use crate::plugin::Notification;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct TracePlugin {
        id: &'static str,
        log: Rc<RefCell<Vec<String>>>,
    }

    impl RendererPlugin for TracePlugin {
        fn id(&self) -> &str {
            self.id
        }
        fn default_active_kinds(&self) -> KindMask {
            KindMask::ALL
        }
        fn render(&mut self, _notification: &Notification) {}
        fn activate(&mut self, _settings: &PluginSettings) {
            self.log.borrow_mut().push(format!("activate {}", self.id));
        }
        fn deactivate(&mut self) {
            self.log.borrow_mut().push(format!("deactivate {}", self.id));
        }
        fn dispose(&mut self) {
            self.log.borrow_mut().push(format!("dispose {}", self.id));
        }
    }

    fn registry_with(ids: &[&'static str]) -> (PluginRegistry, Rc<RefCell<Vec<String>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut registry = PluginRegistry::new();
        for &id in ids {
            registry
                .register(Box::new(TracePlugin { id, log: Rc::clone(&log) }))
                .unwrap();
        }
        (registry, log)
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let (mut registry, log) = registry_with(&["Default"]);
        let err = registry
            .register(Box::new(TracePlugin { id: "Default", log }))
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicatePlugin("Default".into()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unknown_selection_keeps_previous_current() {
        let (mut registry, _log) = registry_with(&["Default", "Other"]);
        assert!(registry.current().is_none());
        registry.select_current("Other", &PluginSettings::default()).unwrap();

        let err = registry
            .select_current("Missing", &PluginSettings::default())
            .unwrap_err();
        assert_eq!(err, RegistryError::UnknownPlugin("Missing".into()));
        assert_eq!(registry.current_id(), Some("Other"));
    }

    #[test]
    fn switching_deactivates_previous_and_dispose_releases_all() {
        let (mut registry, log) = registry_with(&["A", "B"]);
        registry.select_current("A", &PluginSettings::default()).unwrap();
        registry.select_current("B", &PluginSettings::default()).unwrap();
        registry.dispose_all();
        registry.dispose_all();

        assert_eq!(
            *log.borrow(),
            vec![
                "activate A",
                "deactivate A",
                "activate B",
                "deactivate B",
                "dispose A",
                "dispose B"
            ]
        );
        assert!(registry.current().is_none());
        assert!(registry.is_empty());
    }
}
