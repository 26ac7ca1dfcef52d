#![allow(dead_code)]

use notifier_core::{
    ClientError, ClientEvent, ControlClient, DisconnectInfo, EventListener, KindMask, MainLoop,
    Notification, PluginRegistry, ReconnectPolicy, RendererPlugin, Settings,
    SettingsHandle,
};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

pub const FAST_POLICY: ReconnectPolicy = ReconnectPolicy {
    poll_interval: Duration::from_millis(10),
    polls_per_attempt: 3,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// Connects and fires Connected.
    Accept,
    /// Returns an error without touching the connection.
    Refuse,
    /// Accepts the call, then the server closes with the given code.
    CloseWith(u16),
}

pub struct MockClient {
    connected: AtomicBool,
    outcomes: Mutex<VecDeque<ConnectOutcome>>,
    fallback: Mutex<ConnectOutcome>,
    listeners: Mutex<Vec<EventListener>>,
    scene_collection: Mutex<Result<String, ClientError>>,
    profile: Mutex<Result<String, ClientError>>,
    pub connect_calls: AtomicUsize,
    pub disconnect_calls: AtomicUsize,
}

impl MockClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            connected: AtomicBool::new(false),
            outcomes: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(ConnectOutcome::Accept),
            listeners: Mutex::new(Vec::new()),
            scene_collection: Mutex::new(Ok("Main Collection".to_string())),
            profile: Mutex::new(Ok("Streaming".to_string())),
            connect_calls: AtomicUsize::new(0),
            disconnect_calls: AtomicUsize::new(0),
        })
    }

    /// Queues outcomes for the next connect calls, in order.
    pub fn script(&self, outcomes: &[ConnectOutcome]) {
        self.outcomes.lock().unwrap().extend(outcomes.iter().copied());
    }

    /// Outcome once the script has run out.
    pub fn set_fallback(&self, outcome: ConnectOutcome) {
        *self.fallback.lock().unwrap() = outcome;
    }

    pub fn set_scene_collection(&self, result: Result<String, ClientError>) {
        *self.scene_collection.lock().unwrap() = result;
    }

    pub fn fire(&self, event: ClientEvent) {
        for listener in self.listeners.lock().unwrap().iter() {
            listener(&event);
        }
    }

    /// The server side goes away with `code`.
    pub fn drop_connection(&self, code: u16) {
        self.connected.store(false, Ordering::SeqCst);
        self.fire(ClientEvent::Disconnected(DisconnectInfo::new(code)));
    }

    pub fn connects(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }
}

impl ControlClient for MockClient {
    fn connect(&self, _address: &str, _credential: &str) -> Result<(), ClientError> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| *self.fallback.lock().unwrap());
        match outcome {
            ConnectOutcome::Accept => {
                if !self.connected.swap(true, Ordering::SeqCst) {
                    self.fire(ClientEvent::Connected);
                }
                Ok(())
            }
            ConnectOutcome::Refuse => Err(ClientError::Refused("mock".to_string())),
            ConnectOutcome::CloseWith(code) => {
                self.fire(ClientEvent::Disconnected(DisconnectInfo::new(code)));
                Ok(())
            }
        }
    }

    fn disconnect(&self) {
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        if self.connected.swap(false, Ordering::SeqCst) {
            self.fire(ClientEvent::Disconnected(DisconnectInfo::new(1000)));
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn current_scene_collection(&self) -> Result<String, ClientError> {
        self.scene_collection.lock().unwrap().clone()
    }

    fn current_profile(&self) -> Result<String, ClientError> {
        self.profile.lock().unwrap().clone()
    }

    fn subscribe(&self, listener: EventListener) {
        self.listeners.lock().unwrap().push(listener);
    }
}

pub type Rendered = Rc<RefCell<Vec<Notification>>>;

/// Records every notification it is asked to render.
pub struct RecordingRenderer {
    id: &'static str,
    mask: KindMask,
    rendered: Rendered,
}

impl RecordingRenderer {
    pub fn new(id: &'static str, mask: KindMask) -> (Self, Rendered) {
        let rendered = Rendered::default();
        (
            Self {
                id,
                mask,
                rendered: Rc::clone(&rendered),
            },
            rendered,
        )
    }
}

impl RendererPlugin for RecordingRenderer {
    fn id(&self) -> &str {
        self.id
    }

    fn default_active_kinds(&self) -> KindMask {
        self.mask
    }

    fn render(&mut self, notification: &Notification) {
        self.rendered.borrow_mut().push(notification.clone());
    }
}

pub struct Harness {
    pub client: Arc<MockClient>,
    pub settings: SettingsHandle,
    pub main_loop: MainLoop,
    pub rendered: Rendered,
}

/// A main loop with a single recording renderer registered as "Default".
pub fn harness(settings: Settings, mask: KindMask) -> Harness {
    harness_with_policy(settings, mask, FAST_POLICY)
}

pub fn harness_with_policy(settings: Settings, mask: KindMask, policy: ReconnectPolicy) -> Harness {
    let client = MockClient::new();
    let settings = SettingsHandle::in_memory(settings);
    let (renderer, rendered) = RecordingRenderer::new("Default", mask);
    let mut plugins = PluginRegistry::new();
    plugins.register(Box::new(renderer)).unwrap();
    let main_loop = MainLoop::new(client.clone(), settings.clone(), plugins, policy);
    Harness {
        client,
        settings,
        main_loop,
        rendered,
    }
}

impl Harness {
    /// Connects explicitly and processes the resulting events.
    pub fn connect(&mut self) {
        self.main_loop.supervisor().connect_with_saved().unwrap();
        self.main_loop.tick();
    }

    pub fn titles(&self) -> Vec<String> {
        self.rendered.borrow().iter().map(|n| n.title.clone()).collect()
    }

    /// Pumps the main loop until `done` holds or `timeout` elapses.
    pub fn pump_until(&mut self, timeout: Duration, mut done: impl FnMut(&Harness) -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if done(self) {
                return true;
            }
            self.main_loop.pump(Duration::from_millis(5));
        }
        done(self)
    }
}
