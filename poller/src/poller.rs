use crate::client::ReadingSink;
use crate::errors::Result;
use crate::reader::read_measurement;
use crate::reading::{epoch_seconds, DeviceId, Measurement, MeasurementReading, Measurements};
use crate::registers::RegisterMap;
use crate::transport::RegisterTransport;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Fixed timing of the poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTiming {
    /// Sleep between cycles. Not adjusted for how long the cycle took.
    pub interval: Duration,
    /// Pause after every register read, to stay under the meters' request rate.
    pub read_pause: Duration,
}

impl Default for PollTiming {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            read_pause: Duration::from_millis(200),
        }
    }
}

/// Where the poller is in its loop. `device` and `measurement` index into the
/// configured device list and [`Measurement::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Connecting,
    Reading { device: usize, measurement: usize },
    Delivering { device: usize },
    Sleeping,
    Stopped,
}

/// Polls every configured meter behind one gateway connection, one register
/// group at a time, and hands each assembled reading to the sink.
///
/// Driven one transition at a time by [`Poller::step`]; [`Poller::run`] loops
/// it until the poller stops.
pub struct Poller<T, S> {
    transport: T,
    sink: S,
    registers: RegisterMap,
    devices: Vec<DeviceId>,
    timing: PollTiming,
    state: PollState,
    pending: Measurements,
    ever_connected: bool,
    cycle: u64,
    steps: u64,
}

impl<T, S> Poller<T, S>
where
    T: RegisterTransport,
    S: ReadingSink,
{
    pub fn new(
        transport: T,
        sink: S,
        registers: RegisterMap,
        devices: Vec<DeviceId>,
        timing: PollTiming,
    ) -> Self {
        Self {
            transport,
            sink,
            registers,
            devices,
            timing,
            state: PollState::Idle,
            pending: Measurements::default(),
            ever_connected: false,
            cycle: 0,
            steps: 0,
        }
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    /// Number of completed sleeps, i.e. the index of the cycle in progress.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Number of transitions taken so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    #[cfg(test)]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    #[cfg(test)]
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Connects to the gateway. Fails if the very first connection cannot be
    /// established; the poller is then stopped.
    pub async fn start(&mut self) -> Result<()> {
        while matches!(self.state, PollState::Idle | PollState::Connecting) {
            self.step().await?;
        }
        Ok(())
    }

    /// Runs the loop until the poller stops. Only a startup connection failure
    /// ends it with an error; cancel the future to stop it otherwise.
    pub async fn run(&mut self) -> Result<()> {
        while self.state != PollState::Stopped {
            self.step().await?;
        }
        Ok(())
    }

    /// Performs one state transition.
    pub async fn step(&mut self) -> Result<()> {
        self.steps += 1;

        let state = self.state;
        self.state = match state {
            PollState::Idle => PollState::Connecting,
            PollState::Connecting => self.connect().await?,
            PollState::Reading {
                device,
                measurement,
            } => self.read(device, measurement).await,
            PollState::Delivering { device } => self.deliver(device).await,
            PollState::Sleeping => self.sleep().await,
            PollState::Stopped => PollState::Stopped,
        };

        Ok(())
    }

    /// Closes the gateway connection and stops the poller.
    pub async fn shutdown(&mut self) {
        if let Err(e) = self.transport.close().await {
            warn!("Error closing gateway connection: {}", e);
        }
        self.state = PollState::Stopped;
        info!(
            "Poller stopped after {} cycles ({} steps)",
            self.cycle(),
            self.steps()
        );
    }

    async fn connect(&mut self) -> Result<PollState> {
        match self.transport.connect().await {
            Ok(()) => {
                if self.ever_connected {
                    info!("Reconnected to gateway");
                }
                self.ever_connected = true;
                Ok(self.first_read())
            }
            Err(e) if !self.ever_connected => {
                error!("Could not connect to gateway: {}", e);
                self.state = PollState::Stopped;
                Err(e)
            }
            Err(e) => {
                warn!("Reconnect failed, skipping cycle {}: {}", self.cycle, e);
                Ok(PollState::Sleeping)
            }
        }
    }

    fn first_read(&mut self) -> PollState {
        self.pending = Measurements::default();
        if self.devices.is_empty() {
            PollState::Sleeping
        } else {
            PollState::Reading {
                device: 0,
                measurement: 0,
            }
        }
    }

    async fn read(&mut self, device: usize, measurement: usize) -> PollState {
        let device_id = self.devices[device];
        let kind = Measurement::ALL[measurement];
        let group = self.registers.group(kind);

        let value = read_measurement(&mut self.transport, device_id, group, kind.label()).await;
        self.pending.set(kind, value);

        if !self.timing.read_pause.is_zero() {
            tokio::time::sleep(self.timing.read_pause).await;
        }

        if measurement + 1 < Measurement::ALL.len() {
            PollState::Reading {
                device,
                measurement: measurement + 1,
            }
        } else {
            PollState::Delivering { device }
        }
    }

    async fn deliver(&mut self, device: usize) -> PollState {
        let device_id = self.devices[device];
        let measurements = std::mem::take(&mut self.pending);
        let reading = MeasurementReading::new(device_id, epoch_seconds(), measurements);

        if reading.present_count() == 0 {
            warn!("Meter {}: no measurement could be read", device_id);
        } else {
            info!("Meter {}: {}", device_id, reading.summary());
        }

        // The sink logs its own failures; the reading is dropped either way.
        if let Err(e) = self.sink.deliver(&reading).await {
            debug!("Dropping reading for meter {}: {}", device_id, e);
        }

        if device + 1 < self.devices.len() {
            PollState::Reading {
                device: device + 1,
                measurement: 0,
            }
        } else {
            PollState::Sleeping
        }
    }

    async fn sleep(&mut self) -> PollState {
        debug!("Cycle {} complete, sleeping {:?}", self.cycle, self.timing.interval);
        tokio::time::sleep(self.timing.interval).await;
        self.cycle += 1;

        if self.transport.is_connected() {
            self.first_read()
        } else {
            warn!("Gateway connection lost, reconnecting");
            PollState::Connecting
        }
    }
}
