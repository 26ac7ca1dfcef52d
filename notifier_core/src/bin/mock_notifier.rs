use anyhow::Context;
use clap::Parser;
use notifier_core::protocol::generic_codes;
use notifier_core::{
    ClientError, ClientEvent, ControlClient, DefaultRenderer, DisconnectInfo, EventListener,
    MainLoop, OutputState, PluginRegistry, ReconnectPolicy, SettingsHandle, TrayStatus,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

const SETTINGS_ENV: &str = "OBS_NOTIFIER_SETTINGS";
const SCRIPT_STEP: Duration = Duration::from_millis(400);

#[derive(Parser, Debug)]
#[command(name = "mock_notifier")]
struct Args {
    /// Settings file; falls back to $OBS_NOTIFIER_SETTINGS, then in-memory defaults.
    #[arg(long, value_name = "PATH")]
    settings: Option<PathBuf>,

    #[arg(long)]
    address: Option<String>,

    #[arg(long)]
    password: Option<String>,

    #[arg(long)]
    run_for_ms: Option<u64>,

    #[arg(long, default_value_t = 500)]
    poll_ms: u64,

    /// Connect attempts refused after the simulated drop.
    #[arg(long, default_value_t = 2)]
    fail_connects: u32,

    /// Drop the connection once, this long after startup.
    #[arg(long)]
    drop_after_ms: Option<u64>,
}

/// Stands in for a streaming application: accepts connections, plays a
/// scripted event stream and can drop the link on demand.
struct SimulatedClient {
    connected: AtomicBool,
    refuse_remaining: AtomicU32,
    refuse_after_drop: u32,
    listeners: Mutex<Vec<EventListener>>,
}

impl SimulatedClient {
    fn new(refuse_after_drop: u32) -> Self {
        Self {
            connected: AtomicBool::new(false),
            refuse_remaining: AtomicU32::new(0),
            refuse_after_drop,
            listeners: Mutex::new(Vec::new()),
        }
    }

    fn fire(&self, event: &ClientEvent) {
        let Ok(listeners) = self.listeners.lock() else {
            return;
        };
        for listener in listeners.iter() {
            listener(event);
        }
    }

    fn drop_connection(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            self.refuse_remaining
                .store(self.refuse_after_drop, Ordering::SeqCst);
            self.fire(&ClientEvent::Disconnected(DisconnectInfo::new(
                generic_codes::ENDPOINT_UNAVAILABLE,
            )));
        }
    }
}

impl ControlClient for SimulatedClient {
    fn connect(&self, address: &str, _password: &str) -> Result<(), ClientError> {
        let refused = self
            .refuse_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(ClientError::Refused(address.to_string()));
        }
        if !self.connected.swap(true, Ordering::SeqCst) {
            self.fire(&ClientEvent::Connected);
        }
        Ok(())
    }

    fn disconnect(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            self.fire(&ClientEvent::Disconnected(DisconnectInfo::new(
                generic_codes::NORMAL_CLOSURE,
            )));
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn current_scene_collection(&self) -> Result<String, ClientError> {
        if self.is_connected() {
            Ok("Mock Collection".to_string())
        } else {
            Err(ClientError::NotConnected)
        }
    }

    fn current_profile(&self) -> Result<String, ClientError> {
        if self.is_connected() {
            Ok("Mock Profile".to_string())
        } else {
            Err(ClientError::NotConnected)
        }
    }

    fn subscribe(&self, listener: EventListener) {
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.push(listener);
        }
    }
}

fn script() -> Vec<ClientEvent> {
    vec![
        ClientEvent::SceneChanged {
            scene_name: "Gameplay".to_string(),
        },
        ClientEvent::RecordingStateChanged {
            state: OutputState::Started,
        },
        ClientEvent::SourceMuteStateChanged {
            source_name: "Mic/Aux".to_string(),
            muted: true,
        },
        ClientEvent::ReplayBufferStateChanged {
            state: OutputState::Saved,
        },
        ClientEvent::ProfileChanged,
        ClientEvent::RecordingStateChanged {
            state: OutputState::Stopped,
        },
    ]
}

fn spawn_script(
    client: Arc<SimulatedClient>,
    drop_after: Option<Duration>,
    stop: Arc<AtomicBool>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let events = script();
        let start = Instant::now();
        let mut dropped = false;
        let mut step = 0usize;
        while !stop.load(Ordering::Relaxed) {
            thread::sleep(SCRIPT_STEP);
            if let Some(after) = drop_after {
                if !dropped && start.elapsed() >= after {
                    dropped = true;
                    client.drop_connection();
                    continue;
                }
            }
            if client.is_connected() {
                client.fire(&events[step % events.len()]);
                step += 1;
            }
        }
    })
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let settings_path = args
        .settings
        .clone()
        .or_else(|| std::env::var_os(SETTINGS_ENV).map(PathBuf::from));
    let settings = match &settings_path {
        Some(path) => SettingsHandle::load(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => SettingsHandle::default(),
    };
    if let Some(address) = args.address.clone() {
        settings.update(|s| s.server_address = address);
    }
    if let Some(password) = args.password.clone() {
        settings.update(|s| s.password = password);
    }

    let policy = ReconnectPolicy {
        poll_interval: Duration::from_millis(args.poll_ms),
        ..ReconnectPolicy::default()
    };

    let client = Arc::new(SimulatedClient::new(args.fail_connects));
    let mut plugins = PluginRegistry::new();
    plugins.register(Box::new(DefaultRenderer::new()))?;

    let mut main_loop = MainLoop::new(client.clone(), settings, plugins, policy);
    let states = main_loop.supervisor().subscribe_state();

    if !main_loop.restore_connection() {
        // Already reported through the main loop; keep running so the
        // reconnect behaviour can still be observed.
        let _ = main_loop.supervisor().connect_with_saved();
    }

    let stop = Arc::new(AtomicBool::new(false));
    let script = spawn_script(
        Arc::clone(&client),
        args.drop_after_ms.map(Duration::from_millis),
        Arc::clone(&stop),
    );

    let run_for = args.run_for_ms.map(Duration::from_millis);
    let start = Instant::now();
    loop {
        main_loop.pump(Duration::from_millis(33));

        for state in states.try_iter() {
            let status = TrayStatus::for_state(state);
            println!("[{}] {}", status.icon, status.tooltip.replace('\n', " "));
        }
        for report in main_loop.take_reports() {
            eprintln!("{}: {}", report.title, report.message);
        }

        if main_loop.exit_requested() {
            break;
        }
        if let Some(max) = run_for {
            if start.elapsed() >= max {
                break;
            }
        }
    }

    stop.store(true, Ordering::Relaxed);
    if script.join().is_err() {
        eprintln!("event script thread panicked");
    }
    main_loop.shutdown();
    Ok(())
}
