//! Device - the firmware main loop and its configuration.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::board::{DEFAULT_PLAYER_NAME, Engine, PlayerName};
use crate::diff::DiffNotifier;
use crate::events::{GameEvent, GameObserver, PacketDirection, TracingObserver};
use crate::protocol::{
    DEFAULT_ANIM_STEP_MS, DEFAULT_FRAME_GAP_MS, DEFAULT_FRAME_TIMEOUT_MS, RxLine, RxStats,
};
use crate::state::{HandleResult, HandlerContext, Pacing, handle_frame};
use crate::storage::{FlashInterface, PersistenceStore};
use crate::transport::{Clock, SerialPort, TransportError};

/// Sleep between empty polls of the receive line.
const IDLE_POLL_MS: u32 = 1;

/// Configuration for the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirmwareConfig {
    /// Idle gap that discards a partial frame.
    pub frame_timeout_ms: u32,
    /// Pause between cell frames.
    pub frame_gap_ms: u32,
    /// Pause after each animation step.
    pub anim_step_ms: u32,
    /// Bytes parked while flash is busy (0 = drop them).
    pub rx_queue_depth: usize,
    /// Fixed RNG seed for reproducible boards.
    pub seed: Option<u64>,
    /// File-backed flash image. In-memory flash when unset.
    pub flash_image: Option<String>,
    /// Player name before the host sends one.
    pub default_player_name: String,
}

impl Default for FirmwareConfig {
    fn default() -> Self {
        Self {
            frame_timeout_ms: DEFAULT_FRAME_TIMEOUT_MS,
            frame_gap_ms: DEFAULT_FRAME_GAP_MS,
            anim_step_ms: DEFAULT_ANIM_STEP_MS,
            rx_queue_depth: 0,
            seed: None,
            flash_image: None,
            default_player_name: DEFAULT_PLAYER_NAME.to_string(),
        }
    }
}

impl FirmwareConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: FirmwareConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn pacing(&self) -> Pacing {
        Pacing {
            frame_gap_ms: self.frame_gap_ms,
            anim_step_ms: self.anim_step_ms,
        }
    }
}

/// Counters kept by the main loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceStats {
    /// Frames taken off the receive line.
    pub frames_handled: u32,
    /// Frames answered with the checksum diagnostic.
    pub checksum_errors: u32,
    /// Games ended by deadlock or by the host.
    pub games_over: u32,
    /// Receive-side counters.
    pub rx: RxStats,
}

/// The firmware: engine, store and the serial protocol around them.
pub struct Device<S: SerialPort, F: FlashInterface, C: Clock, O: GameObserver> {
    config: FirmwareConfig,
    serial: S,
    clock: C,
    observer: Arc<O>,
    rx: Arc<RxLine>,
    engine: Engine,
    store: PersistenceStore<F>,
    notifier: DiffNotifier,
    stats: DeviceStats,
}

impl<S: SerialPort, F: FlashInterface, C: Clock> Device<S, F, C, TracingObserver> {
    /// Create a device with the default tracing observer.
    pub fn new(config: FirmwareConfig, serial: S, flash: F, clock: C) -> Self {
        Self::with_observer(config, serial, flash, clock, Arc::new(TracingObserver))
    }
}

impl<S: SerialPort, F: FlashInterface, C: Clock, O: GameObserver> Device<S, F, C, O> {
    /// Create a device with a custom observer. A fresh board is dealt.
    pub fn with_observer(
        config: FirmwareConfig,
        serial: S,
        flash: F,
        clock: C,
        observer: Arc<O>,
    ) -> Self {
        let rx = Arc::new(RxLine::with_config(
            config.frame_timeout_ms,
            config.rx_queue_depth,
        ));
        let mut engine = Engine::new(config.seed);
        engine.set_player_name(PlayerName::new(&config.default_player_name));
        info!(
            seed = ?config.seed,
            timeout_ms = config.frame_timeout_ms,
            "Device initialized"
        );
        Self {
            config,
            serial,
            clock,
            observer,
            rx,
            engine,
            store: PersistenceStore::new(flash),
            notifier: DiffNotifier::default(),
            stats: DeviceStats::default(),
        }
    }

    /// Producer end of the receive line.
    pub fn rx_line(&self) -> Arc<RxLine> {
        Arc::clone(&self.rx)
    }

    pub fn config(&self) -> &FirmwareConfig {
        &self.config
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    pub fn store(&self) -> &PersistenceStore<F> {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn stats(&self) -> DeviceStats {
        DeviceStats {
            rx: self.rx.stats(),
            ..self.stats
        }
    }

    /// Handle the waiting frame, if any. Returns `None` when the line had
    /// nothing ready.
    pub fn poll(&mut self) -> Result<Option<HandleResult>> {
        let Some(raw) = self.rx.pending() else {
            return Ok(None);
        };
        self.stats.frames_handled += 1;
        self.observer.on_event(&GameEvent::Packet {
            direction: PacketDirection::Rx,
            data: raw.to_vec(),
        });

        let serial = ObservableSerial {
            inner: &self.serial,
            observer: self.observer.as_ref(),
        };
        let mut ctx = HandlerContext {
            serial: &serial,
            clock: &self.clock,
            observer: self.observer.as_ref(),
            rx: &self.rx,
            engine: &mut self.engine,
            store: &mut self.store,
            notifier: &mut self.notifier,
            pacing: self.config.pacing(),
        };
        let result = handle_frame(&raw, &mut ctx);
        // The buffer goes back to the producer whatever happened.
        self.rx.release();

        let result = result?;
        match result {
            HandleResult::Rejected => self.stats.checksum_errors += 1,
            HandleResult::GameOver { score, rank } => {
                self.stats.games_over += 1;
                debug!(score, rank = ?rank, "Game over handled");
            }
            HandleResult::Continue => {}
        }
        Ok(Some(result))
    }

    /// Poll until `shutdown` is set. Handler errors are logged and the loop
    /// keeps going.
    #[instrument(skip_all)]
    pub fn run(&mut self, shutdown: &AtomicBool) -> DeviceStats {
        info!("Main loop started");
        while !shutdown.load(Ordering::Acquire) {
            match self.poll() {
                Ok(Some(_)) => {}
                Ok(None) => self.clock.delay_ms(IDLE_POLL_MS),
                Err(e) => warn!(error = %e, "Frame handling failed"),
            }
        }
        let stats = self.stats();
        info!(frames = stats.frames_handled, games = stats.games_over, "Main loop stopped");
        stats
    }
}

/// Serial wrapper that emits packet events.
struct ObservableSerial<'a, S: SerialPort, O: GameObserver> {
    inner: &'a S,
    observer: &'a O,
}

impl<S: SerialPort, O: GameObserver> SerialPort for ObservableSerial<'_, S, O> {
    fn send(&self, bytes: &[u8]) -> Result<(), TransportError> {
        let res = self.inner.send(bytes);
        if res.is_ok() {
            self.observer.on_event(&GameEvent::Packet {
                direction: PacketDirection::Tx,
                data: bytes.to_vec(),
            });
        }
        res
    }
}
