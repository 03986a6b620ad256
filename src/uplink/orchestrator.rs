// src/uplink/orchestrator.rs

use super::{
    config::{UplinkConfig, WakePolicy},
    flags::OperatingFlags,
    fsm::{decide, entry_action, indication, Decision, EntryAction, Inputs, SensorPoll, UplinkState},
    payload::{PayloadEncoder, PayloadInputs},
    platform::{MeasurementSource, Platform, SendRequest},
    signal::{TxDoneSignal, TxOutcome},
    sleep::{choose_sleep_depth, SleepDepth, SleepEnvironment},
};
use crate::common::{
    timing::{deadline_reached, ms_until, CycleTimer, MEASUREMENT_INTERVAL_MIN_S},
    types::Measurement,
};

/// Upper bound on transitions handled by one `evaluate` call.
const MAX_STEPS_PER_EVALUATE: usize = 16;

/// Shortest accepted uplink period, seconds.
const MIN_TX_CYCLE_S: u32 = MEASUREMENT_INTERVAL_MIN_S as u32;

/// Uplink period of a fixed wake policy, ms. Zero when following the sensor.
fn policy_period_ms(policy: WakePolicy) -> u32 {
    match policy {
        WakePolicy::FixedCycle { period_secs } => {
            period_secs.max(MIN_TX_CYCLE_S).saturating_mul(1000)
        }
        WakePolicy::SensorInterval => 0,
    }
}

/// Drives the measure, send, sleep cycle.
///
/// Cooperative: call [`UplinkOrchestrator::poll`] from the main loop. Nothing
/// here blocks except the platform's deep sleep and the sensor's few
/// milliseconds of bus delay.
pub struct UplinkOrchestrator<'s, S, P>
where
    S: MeasurementSource,
    P: Platform,
{
    sensor: S,
    platform: P,
    signal: &'s TxDoneSignal,
    config: UplinkConfig,
    encoder: PayloadEncoder,

    state: UplinkState,
    /// Entry action of `state` has not run yet.
    entry_pending: bool,
    running: bool,
    active: bool,

    activate_requested: bool,
    deactivate_requested: bool,
    exit_requested: bool,

    settle_deadline: u32,
    /// When the last reading was taken or failed. The next cycle wakes no
    /// sooner than one sensor interval later.
    measured_at: Option<u32>,
    /// Last reading of this cycle, `None` when invalid.
    measurement: Option<Measurement>,
    sensor_ok: bool,
    sleep_announced: bool,

    uplink_timer: CycleTimer,
    /// Uplinks left on a temporary cycle set by `set_tx_cycle`.
    tx_cycle_remaining: Option<u32>,
    last_tx: Option<TxOutcome>,
    uplink_count: u32,
}

impl<'s, S, P> UplinkOrchestrator<'s, S, P>
where
    S: MeasurementSource,
    P: Platform,
{
    pub fn new(sensor: S, platform: P, signal: &'s TxDoneSignal, config: UplinkConfig) -> Self {
        let now = platform.now_ms();
        let period_ms = policy_period_ms(config.wake_policy);
        UplinkOrchestrator {
            sensor,
            platform,
            signal,
            encoder: PayloadEncoder::new(config.format_id),
            config,
            state: UplinkState::Initial,
            entry_pending: true,
            running: false,
            active: false,
            activate_requested: false,
            deactivate_requested: false,
            exit_requested: false,
            settle_deadline: now,
            measured_at: None,
            measurement: None,
            sensor_ok: false,
            sleep_announced: false,
            uplink_timer: CycleTimer::new(now, period_ms),
            tx_cycle_remaining: None,
            last_tx: None,
            uplink_count: 0,
        }
    }

    // --- Lifecycle ---

    /// Starts the sensor and settles into `Inactive`. A failed sensor start is
    /// logged and retried on the next wake.
    pub fn begin(&mut self) {
        if self.running {
            return;
        }
        self.running = true;
        self.exit_requested = false;
        self.state = UplinkState::Initial;
        self.entry_pending = true;
        self.measured_at = None;
        self.restart_sensor();
        self.uplink_timer.retrigger(self.platform.now_ms());
        self.evaluate();
    }

    /// Drives the machine into `Final` and stops the sensor.
    pub fn end(&mut self) {
        if !self.running {
            return;
        }
        self.exit_requested = true;
        self.evaluate();
        self.running = false;
    }

    /// Requests activation (`true`) or deactivation (`false`). The latest
    /// request replaces any pending opposite one.
    pub fn request_active(&mut self, enable: bool) {
        self.activate_requested = enable;
        self.deactivate_requested = !enable;
        if self.running {
            self.evaluate();
        }
    }

    /// Main-loop hook: evaluates while active or while an activation is pending.
    pub fn poll(&mut self) {
        if self.running && (self.active || self.activate_requested) {
            self.evaluate();
        }
    }

    /// Temporarily uplinks every `secs` seconds for the next `count` uplinks,
    /// then reverts to the configured wake policy. `secs` is raised to the
    /// sensor's shortest interval.
    pub fn set_tx_cycle(&mut self, secs: u32, count: u32) {
        let now = self.platform.now_ms();
        if count == 0 {
            self.revert_tx_cycle(now);
            return;
        }
        let secs = secs.max(MIN_TX_CYCLE_S);
        log::info!("uplink: tx cycle {}s for {} uplinks", secs, count);
        self.uplink_timer.set_period(now, secs.saturating_mul(1000));
        self.tx_cycle_remaining = Some(count);
    }

    pub fn set_operating_flags(&mut self, flags: OperatingFlags) {
        self.config.flags = flags;
    }

    // --- Evaluation ---

    /// Runs entry actions and transitions until the state is stable.
    pub fn evaluate(&mut self) {
        for _ in 0..MAX_STEPS_PER_EVALUATE {
            if self.entry_pending {
                self.entry_pending = false;
                self.run_entry(entry_action(self.state));
            }

            let inputs = self.gather_inputs();
            match decide(self.state, &inputs) {
                Decision::Stay => return,
                Decision::Goto(next) => self.enter(next),
                Decision::Accept(next) => {
                    self.activate_requested = false;
                    self.deactivate_requested = false;
                    self.enter(next);
                }
                Decision::Sleep => {
                    if !self.sleep() {
                        return;
                    }
                }
            }
        }
        log::warn!("uplink: evaluate did not settle in {}", self.state);
    }

    fn enter(&mut self, next: UplinkState) {
        log::debug!("uplink: {} -> {}", self.state, next);
        self.state = next;
        self.entry_pending = true;
    }

    fn gather_inputs(&mut self) -> Inputs {
        let now = self.platform.now_ms();
        let mut inputs = Inputs {
            exit_requested: self.exit_requested,
            activate_requested: self.activate_requested,
            deactivate_requested: self.deactivate_requested,
            ..Inputs::default()
        };
        let interrupted = inputs.exit_requested || inputs.deactivate_requested;

        match self.state {
            UplinkState::Wake => {
                inputs.settle_elapsed = deadline_reached(now, self.settle_deadline);
            }
            UplinkState::Measure if !interrupted => {
                inputs.sensor = self.poll_sensor();
            }
            UplinkState::Transmit => {
                if let Some(outcome) = self.signal.take() {
                    self.on_tx_done(outcome, now);
                    inputs.tx_done = Some(outcome.is_success());
                }
            }
            UplinkState::Sleeping => {
                let remaining = self.ms_until_wake(now);
                inputs.wake_due = remaining <= self.config.wake_lead_ms;
                inputs.sleep_worthwhile = remaining > self.config.sleep_threshold_ms;
            }
            _ => {}
        }
        inputs
    }

    fn poll_sensor(&mut self) -> SensorPoll {
        match self.sensor.read_measurement() {
            Ok(m) => {
                self.measurement = Some(m);
                self.measured_at = Some(self.platform.now_ms());
                SensorPoll::Ready
            }
            Err(nb::Error::WouldBlock) => SensorPoll::Pending,
            Err(nb::Error::Other(e)) => {
                self.measured_at = Some(self.platform.now_ms());
                let class = S::classify(&e);
                log::warn!("uplink: sensor read failed ({:?}): {:?}", class, e);
                SensorPoll::Failed(class)
            }
        }
    }

    fn run_entry(&mut self, action: EntryAction) {
        if let Some(status) = indication(self.state) {
            self.platform.indicate(status);
        }
        match action {
            EntryAction::None => {}
            EntryAction::Deactivate => {
                self.active = false;
                self.platform.quiesce();
            }
            EntryAction::ArmSettle => {
                self.active = true;
                let now = self.platform.now_ms();
                if !self.sensor_ok {
                    self.restart_sensor();
                }
                self.settle_deadline = now.wrapping_add(self.config.settle_ms);
            }
            EntryAction::BeginMeasurement => self.measurement = None,
            EntryAction::QuiesceSensor => self.sensor.quiesce(),
            EntryAction::StartTransmit => self.start_transmit(),
            EntryAction::EnterSleeping => self.sleep_announced = false,
            EntryAction::Shutdown => {
                self.active = false;
                self.sensor.stop();
                log::info!("uplink: stopped");
            }
        }
    }

    // --- Transmit ---

    fn start_transmit(&mut self) {
        let inputs = PayloadInputs {
            battery_volts: self.platform.battery_volts(),
            boot_count: self.platform.boot_count(),
            measurement: self.measurement,
        };
        let payload = self.encoder.encode(&inputs);
        let request = SendRequest {
            confirmed: self.config.flags.confirmed_uplink(),
            port: self.config.port,
        };

        self.signal.arm();
        if !self.platform.send(&payload, request, self.signal) {
            log::warn!("uplink: transport refused the payload");
            self.signal.complete(false);
        }
    }

    fn on_tx_done(&mut self, outcome: TxOutcome, now: u32) {
        self.last_tx = Some(outcome);
        self.uplink_count = self.uplink_count.wrapping_add(1);
        if !outcome.is_success() {
            log::warn!("uplink: send failed");
        }

        self.uplink_timer.retrigger(now);
        if let Some(left) = self.tx_cycle_remaining {
            if left <= 1 {
                self.revert_tx_cycle(now);
            } else {
                self.tx_cycle_remaining = Some(left - 1);
            }
        }
    }

    fn revert_tx_cycle(&mut self, now: u32) {
        self.tx_cycle_remaining = None;
        let period_ms = policy_period_ms(self.config.wake_policy);
        self.uplink_timer.set_period(now, period_ms);
    }

    // --- Sleep ---

    fn ms_until_wake(&self, now: u32) -> u32 {
        let fixed = self.tx_cycle_remaining.is_some()
            || matches!(self.config.wake_policy, WakePolicy::FixedCycle { .. });
        if fixed {
            return self.uplink_timer.remaining(now);
        }
        // A failing sensor may look due at once; keep one interval between uplinks.
        let spacing = self.measured_at.map_or(0, |at| {
            ms_until(now, at.wrapping_add(self.sensor.interval_ms()))
        });
        if self.sensor_ok {
            self.sensor.ms_to_next_measurement().max(spacing)
        } else {
            spacing
        }
    }

    /// Sleeps once. Returns `true` after a deep sleep, when everything time
    /// related has to be looked at again.
    fn sleep(&mut self) -> bool {
        let now = self.platform.now_ms();
        let sleep_ms = self
            .ms_until_wake(now)
            .saturating_sub(self.config.wake_lead_ms);
        let secs = sleep_ms / 1000;

        let flags = self.config.flags;
        let env = SleepEnvironment {
            deep_sleep_test: flags.deep_sleep_test(),
            console_attached: self.platform.console_attached(),
            deep_sleep_disabled: flags.deep_sleep_disabled(),
            unattended: flags.unattended(),
        };
        let depth = choose_sleep_depth(secs, &env);

        if !self.sleep_announced {
            self.sleep_announced = true;
            match depth {
                SleepDepth::Deep => log::info!("uplink: using deep sleep"),
                SleepDepth::Light => log::info!("uplink: using light sleep"),
            }
        }

        match depth {
            SleepDepth::Light => {
                self.platform.light_sleep(sleep_ms);
                false
            }
            SleepDepth::Deep if secs == 0 => false,
            SleepDepth::Deep => {
                self.sensor.stop();
                self.platform.prepare_deep_sleep();
                self.platform.deep_sleep(secs);
                self.platform.recover_from_deep_sleep();
                self.restart_sensor();
                true
            }
        }
    }

    fn restart_sensor(&mut self) {
        match self.sensor.start() {
            Ok(()) => self.sensor_ok = true,
            Err(e) => {
                log::warn!("uplink: sensor start failed: {:?}", e);
                self.sensor_ok = false;
            }
        }
    }

    // --- Accessors ---

    pub fn state(&self) -> UplinkState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn sensor_ok(&self) -> bool {
        self.sensor_ok
    }

    /// Reading of the current cycle, if it was valid.
    pub fn measurement(&self) -> Option<&Measurement> {
        self.measurement.as_ref()
    }

    pub fn last_tx_outcome(&self) -> Option<TxOutcome> {
        self.last_tx
    }

    pub fn uplink_count(&self) -> u32 {
        self.uplink_count
    }

    pub fn config(&self) -> &UplinkConfig {
        &self.config
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    /// Tears the orchestrator down, handing back sensor and platform.
    pub fn release(self) -> (S, P) {
        (self.sensor, self.platform)
    }
}
