// src/uplink/fsm.rs

//! Transition table of the uplink cycle, as pure functions.
//!
//! [`decide`] looks at one state and one snapshot of [`Inputs`]; it never
//! touches hardware. The orchestrator gathers the inputs, applies the
//! decision, and runs [`entry_action`] exactly once per state entered.

use core::fmt;

use super::platform::UplinkStatus;
use crate::common::error::ErrorClass;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum UplinkState {
    Initial,
    Inactive,
    Wake,
    Measure,
    SleepSensor,
    Transmit,
    Sleeping,
    Final,
}

impl UplinkState {
    pub const fn name(self) -> &'static str {
        match self {
            UplinkState::Initial => "Initial",
            UplinkState::Inactive => "Inactive",
            UplinkState::Wake => "Wake",
            UplinkState::Measure => "Measure",
            UplinkState::SleepSensor => "SleepSensor",
            UplinkState::Transmit => "Transmit",
            UplinkState::Sleeping => "Sleeping",
            UplinkState::Final => "Final",
        }
    }

    /// States that honor a deactivate request.
    pub const fn observes_deactivate(self) -> bool {
        matches!(self, UplinkState::Wake | UplinkState::Measure | UplinkState::Sleeping)
    }
}

impl fmt::Display for UplinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of polling the sensor while measuring.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum SensorPoll {
    /// Not polled, or still busy.
    #[default]
    Pending,
    /// A reading was fetched.
    Ready,
    /// The poll failed with an error of this class.
    Failed(ErrorClass),
}

/// One evaluation's snapshot of everything the table can react to.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct Inputs {
    pub exit_requested: bool,
    pub activate_requested: bool,
    pub deactivate_requested: bool,
    pub settle_elapsed: bool,
    pub sensor: SensorPoll,
    /// `Some(success)` once the transport reported completion.
    pub tx_done: Option<bool>,
    /// The next reading is close enough to wake for.
    pub wake_due: bool,
    /// Enough time remains to be worth sleeping.
    pub sleep_worthwhile: bool,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Decision {
    Stay,
    Goto(UplinkState),
    /// Like `Goto`, and both pending activate/deactivate requests are cleared.
    Accept(UplinkState),
    /// Remain in `Sleeping` and run the sleep policy now.
    Sleep,
}

pub fn decide(state: UplinkState, inputs: &Inputs) -> Decision {
    if inputs.exit_requested && state != UplinkState::Final {
        return Decision::Goto(UplinkState::Final);
    }
    if inputs.deactivate_requested && state.observes_deactivate() {
        return Decision::Accept(UplinkState::Inactive);
    }

    match state {
        UplinkState::Initial => Decision::Goto(UplinkState::Inactive),
        UplinkState::Inactive if inputs.activate_requested => Decision::Accept(UplinkState::Wake),
        UplinkState::Inactive => Decision::Stay,
        UplinkState::Wake if inputs.settle_elapsed => Decision::Goto(UplinkState::Measure),
        UplinkState::Wake => Decision::Stay,
        UplinkState::Measure => match inputs.sensor {
            SensorPoll::Pending | SensorPoll::Failed(ErrorClass::Busy) => Decision::Stay,
            SensorPoll::Ready => Decision::Goto(UplinkState::SleepSensor),
            SensorPoll::Failed(ErrorClass::State) => Decision::Goto(UplinkState::Inactive),
            SensorPoll::Failed(_) => Decision::Goto(UplinkState::SleepSensor),
        },
        UplinkState::SleepSensor => Decision::Goto(UplinkState::Transmit),
        UplinkState::Transmit if inputs.tx_done.is_some() => Decision::Goto(UplinkState::Sleeping),
        UplinkState::Transmit => Decision::Stay,
        UplinkState::Sleeping if inputs.wake_due => Decision::Goto(UplinkState::Wake),
        UplinkState::Sleeping if inputs.sleep_worthwhile => Decision::Sleep,
        UplinkState::Sleeping => Decision::Stay,
        UplinkState::Final => Decision::Stay,
    }
}

/// Work done once on entering a state.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum EntryAction {
    None,
    /// Mark inactive and quiesce hardware.
    Deactivate,
    /// Arm the settle timer.
    ArmSettle,
    /// Invalidate the last measurement.
    BeginMeasurement,
    QuiesceSensor,
    /// Build the payload and hand it to the transport.
    StartTransmit,
    /// Re-arm the one-shot sleep announcement.
    EnterSleeping,
    Shutdown,
}

pub const fn entry_action(state: UplinkState) -> EntryAction {
    match state {
        UplinkState::Initial => EntryAction::None,
        UplinkState::Inactive => EntryAction::Deactivate,
        UplinkState::Wake => EntryAction::ArmSettle,
        UplinkState::Measure => EntryAction::BeginMeasurement,
        UplinkState::SleepSensor => EntryAction::QuiesceSensor,
        UplinkState::Transmit => EntryAction::StartTransmit,
        UplinkState::Sleeping => EntryAction::EnterSleeping,
        UplinkState::Final => EntryAction::Shutdown,
    }
}

/// What the status indicator shows while in `state`.
pub const fn indication(state: UplinkState) -> Option<UplinkStatus> {
    match state {
        UplinkState::Initial => None,
        UplinkState::Inactive => Some(UplinkStatus::Idle),
        UplinkState::Wake => Some(UplinkStatus::WarmingUp),
        UplinkState::Measure => Some(UplinkStatus::Measuring),
        UplinkState::SleepSensor => Some(UplinkStatus::Settling),
        UplinkState::Transmit => Some(UplinkStatus::Sending),
        UplinkState::Sleeping => Some(UplinkStatus::Sleeping),
        UplinkState::Final => Some(UplinkStatus::Off),
    }
}
