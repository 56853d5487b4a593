//! SSD1306 wrapper in async buffered-graphics mode.

use display_interface_i2c::I2CInterface;
use embedded_hal_async::i2c::I2c;
use ssd1306::{
    mode::BufferedGraphicsModeAsync, prelude::*, I2CDisplayInterface, Ssd1306Async,
};

use aquameter::accounting::Frame;

use crate::error::OledError;
use crate::layout::{render_frame, TextLayout};

/// Concrete display type used internally by [`OledDriver`].
type Display<I2C> = Ssd1306Async<
    I2CInterface<I2C>,
    DisplaySize128x64,
    BufferedGraphicsModeAsync<DisplaySize128x64>,
>;

/// Async driver for an SSD1306 128×64 OLED over I2C.
///
/// # Lifecycle
///
/// 1. [`OledDriver::new()`] — builds the driver without any I2C traffic.
/// 2. [`OledDriver::init()`] — sends the SSD1306 initialisation sequence.
/// 3. [`OledDriver::draw()`] — renders a frame and flushes it.
pub struct OledDriver<I2C> {
    display: Display<I2C>,
    initialized: bool,
}

impl<I2C> OledDriver<I2C>
where
    I2C: I2c,
{
    /// Construct an uninitialised driver.
    ///
    /// # Arguments
    /// * `i2c` — I2C device (a shared-bus handle on the meter board).
    /// * `address` — 7-bit I2C device address (typically `0x3C`).
    pub fn new(i2c: I2C, address: u8) -> Self {
        let interface = I2CDisplayInterface::new_custom_address(i2c, address);
        let display = Ssd1306Async::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
            .into_buffered_graphics_mode();

        Self {
            display,
            initialized: false,
        }
    }

    /// Send the initialisation sequence and blank the panel.
    ///
    /// # Errors
    ///
    /// Returns [`OledError::InitializationFailed`] if the controller does not
    /// respond, or [`OledError::Display`] if the first flush fails.
    pub async fn init(&mut self) -> Result<(), OledError> {
        self.display
            .init()
            .await
            .map_err(|_| OledError::InitializationFailed)?;
        self.initialized = true;

        self.display.clear_buffer();
        self.display.flush().await?;
        Ok(())
    }

    /// Replace the panel contents with `frame`.
    ///
    /// The whole buffer is cleared and redrawn; the flush (~20 ms at
    /// 400 kHz) is the only I2C traffic.
    ///
    /// # Errors
    ///
    /// Returns [`OledError::NotInitialized`] before a successful
    /// [`init()`](Self::init), or [`OledError::Display`] on a bus failure.
    pub async fn draw(&mut self, frame: &Frame, layout: &TextLayout) -> Result<(), OledError> {
        if !self.initialized {
            return Err(OledError::NotInitialized);
        }

        self.display.clear_buffer();
        render_frame(&mut self.display, frame, layout)?;
        self.display.flush().await?;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}
