//! Debounced three-button input state machine.
//!
//! Each button runs `Released → Pressed → Released`. A press is accepted
//! on the first poll that sees the button down while the previous accepted
//! press of the same button is at least [`DEBOUNCE_MS`] old; its short
//! action fires right then. Buttons with a long action additionally latch
//! the hold start and fire the long action once when the hold reaches
//! [`LONG_PRESS_MS`]. A long press therefore always follows the short
//! action of the same hold.
//!
//! | Button | Short press      | Long press (3 s)                        |
//! |--------|------------------|-----------------------------------------|
//! | Mode   | cycle mode       | —                                       |
//! | Reset  | reset session    | reset today                             |
//! | Select | show diagnostics | prompt, then factory reset if held 2 s  |

use heapless::Vec;

use super::{DEBOUNCE_MS, FACTORY_RESET_CONFIRM_MS, LONG_PRESS_MS};

/// Physical buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Button {
    Mode,
    Reset,
    Select,
}

/// Pressed state of the three buttons for one poll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ButtonInputs {
    pub mode: bool,
    pub reset: bool,
    pub select: bool,
}

impl ButtonInputs {
    /// No button pressed.
    pub const RELEASED: Self = Self {
        mode: false,
        reset: false,
        select: false,
    };

    /// Build from raw pin levels. Inputs are active-low with pull-ups, so a
    /// low level (`false`) means pressed.
    pub fn from_levels(mode_high: bool, reset_high: bool, select_high: bool) -> Self {
        Self {
            mode: !mode_high,
            reset: !reset_high,
            select: !select_high,
        }
    }

    pub fn is_pressed(&self, button: Button) -> bool {
        match button {
            Button::Mode => self.mode,
            Button::Reset => self.reset,
            Button::Select => self.select,
        }
    }
}

/// Per-button event produced by [`ButtonState::update()`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonEvent {
    Press,
    LongPress,
}

/// Debounce and hold tracking for one button.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ButtonState {
    last_accepted_ms: Option<u64>,
    pressed: bool,
    has_long_press: bool,
    hold_started_ms: Option<u64>,
    long_handled: bool,
}

impl ButtonState {
    /// Button with a short action only.
    pub const fn short_only() -> Self {
        Self::new(false)
    }

    /// Button with both a short and a long action.
    pub const fn with_long_press() -> Self {
        Self::new(true)
    }

    const fn new(has_long_press: bool) -> Self {
        Self {
            last_accepted_ms: None,
            pressed: false,
            has_long_press,
            hold_started_ms: None,
            long_handled: false,
        }
    }

    /// `true` between an accepted press and the following release.
    #[cfg(test)]
    pub(crate) fn is_pressed(&self) -> bool {
        self.pressed
    }

    /// Feed one poll sample.
    pub fn update(&mut self, down: bool, now_ms: u64) -> Vec<ButtonEvent, 2> {
        let mut events = Vec::new();

        if down {
            let debounced = self
                .last_accepted_ms
                .map_or(true, |last| now_ms.saturating_sub(last) >= DEBOUNCE_MS);
            if !self.pressed && debounced {
                self.pressed = true;
                self.last_accepted_ms = Some(now_ms);
                let _ = events.push(ButtonEvent::Press);
            }
        } else {
            self.pressed = false;
        }

        if self.has_long_press {
            if down {
                match self.hold_started_ms {
                    None => self.hold_started_ms = Some(now_ms),
                    Some(start) => {
                        if !self.long_handled && now_ms.saturating_sub(start) >= LONG_PRESS_MS {
                            self.long_handled = true;
                            let _ = events.push(ButtonEvent::LongPress);
                        }
                    }
                }
            } else {
                self.hold_started_ms = None;
                self.long_handled = false;
            }
        }

        events
    }
}

/// Actions requested by the buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    CycleMode,
    ResetSession,
    ResetToday,
    /// Not bound to a button; available to callers of
    /// [`MeterController::execute()`](super::MeterController::execute).
    ResetMonth,
    ShowDiagnostics,
    /// Select held past the long-press threshold; confirmation window opens.
    PromptFactoryReset,
    /// Select still held when the confirmation window closed.
    FactoryReset,
}

/// Commands produced by one poll, in dispatch order.
pub type Commands = Vec<Command, 6>;

/// State machine for the mode, reset and select buttons.
#[derive(Debug, Clone, Copy)]
pub struct ButtonFsm {
    mode: ButtonState,
    reset: ButtonState,
    select: ButtonState,
    confirm_deadline_ms: Option<u64>,
}

impl Default for ButtonFsm {
    fn default() -> Self {
        Self::new()
    }
}

impl ButtonFsm {
    pub const fn new() -> Self {
        Self {
            mode: ButtonState::short_only(),
            reset: ButtonState::with_long_press(),
            select: ButtonState::with_long_press(),
            confirm_deadline_ms: None,
        }
    }

    /// `true` while a factory reset waits for confirmation.
    pub fn confirmation_pending(&self) -> bool {
        self.confirm_deadline_ms.is_some()
    }

    /// Sample all buttons once and translate their events into commands.
    pub fn poll(&mut self, now_ms: u64, inputs: ButtonInputs) -> Commands {
        let mut commands = Commands::new();

        for event in self.mode.update(inputs.mode, now_ms) {
            if event == ButtonEvent::Press {
                let _ = commands.push(Command::CycleMode);
            }
        }

        for event in self.reset.update(inputs.reset, now_ms) {
            let _ = commands.push(match event {
                ButtonEvent::Press => Command::ResetSession,
                ButtonEvent::LongPress => Command::ResetToday,
            });
        }

        // A pending confirmation re-samples the select button: release
        // anywhere in the window cancels, holding to the end confirms.
        if let Some(deadline) = self.confirm_deadline_ms {
            if !inputs.select {
                self.confirm_deadline_ms = None;
                #[cfg(feature = "defmt")]
                defmt::debug!("Factory reset cancelled");
            } else if now_ms >= deadline {
                self.confirm_deadline_ms = None;
                let _ = commands.push(Command::FactoryReset);
            }
        }

        for event in self.select.update(inputs.select, now_ms) {
            match event {
                ButtonEvent::Press => {
                    let _ = commands.push(Command::ShowDiagnostics);
                }
                ButtonEvent::LongPress => {
                    self.confirm_deadline_ms = Some(now_ms + FACTORY_RESET_CONFIRM_MS);
                    let _ = commands.push(Command::PromptFactoryReset);
                }
            }
        }

        commands
    }
}

// ── Unit Tests ───────────────────────────────────────────────────────
