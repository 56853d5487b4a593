//! [`FrameSink`] implementation for the OLED.

use embedded_hal_async::i2c::I2c;

use aquameter::accounting::{Frame, FrameSink};

use crate::driver::OledDriver;
use crate::error::OledError;
use crate::layout::TextLayout;

/// Shows meter frames on an [`OledDriver`].
///
/// A frame identical to the one on the panel is not redrawn. Draw errors
/// are logged and swallowed: the meter keeps counting with a dead display.
pub struct OledSink<I2C> {
    driver: OledDriver<I2C>,
    layout: TextLayout,
    shown: Option<Frame>,
}

impl<I2C> OledSink<I2C>
where
    I2C: I2c,
{
    pub fn new(driver: OledDriver<I2C>, layout: TextLayout) -> Self {
        Self {
            driver,
            layout,
            shown: None,
        }
    }

    /// Initialise the panel. Until this succeeds every frame is dropped.
    pub async fn init(&mut self) -> Result<(), OledError> {
        self.driver.init().await?;
        self.shown = None;

        #[cfg(feature = "defmt")]
        defmt::info!("OLED initialised");
        Ok(())
    }

    /// Frame currently on the panel, if any.
    pub fn shown(&self) -> Option<&Frame> {
        self.shown.as_ref()
    }
}

impl<I2C> FrameSink for OledSink<I2C>
where
    I2C: I2c,
{
    async fn show(&mut self, frame: &Frame) {
        if self.shown.as_ref() == Some(frame) {
            return;
        }

        match self.driver.draw(frame, &self.layout).await {
            Ok(()) => self.shown = Some(frame.clone()),
            Err(_e) => {
                #[cfg(feature = "defmt")]
                defmt::error!("OLED draw failed: {}", _e);
            }
        }
    }
}
