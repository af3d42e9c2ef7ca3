//! Device input passthrough (§4.2): exposes one channel of the driver's live
//! input block directly as a signal source.

use va_core::{PlanarBlock, Sample};

use crate::source::SignalSource;

pub struct DeviceInputSource {
    id: String,
    device_channel: usize,
    last_block: Vec<Sample>,
}

impl DeviceInputSource {
    pub fn new(id: impl Into<String>, device_channel: usize) -> Self {
        Self { id: id.into(), device_channel, last_block: Vec::new() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl SignalSource for DeviceInputSource {
    fn fetch_block(&mut self, _channel: usize, output: &mut [Sample]) {
        let take = output.len().min(self.last_block.len());
        output[..take].copy_from_slice(&self.last_block[..take]);
        output[take..].fill(0.0);
    }

    fn accept_device_input(&mut self, device_input: &PlanarBlock) {
        self.last_block.clear();
        if self.device_channel < device_input.num_channels() {
            self.last_block.extend_from_slice(device_input.channel(self.device_channel));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_through_the_bound_device_channel() {
        let mut src = DeviceInputSource::new("deviceinput0", 1);
        let mut block = PlanarBlock::new(2, 4);
        block.channel_mut(1).copy_from_slice(&[0.1, 0.2, 0.3, 0.4]);
        src.accept_device_input(&block);

        let mut out = vec![0.0; 4];
        src.fetch_block(0, &mut out);
        assert_eq!(out, [0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn out_of_range_channel_is_silence() {
        let mut src = DeviceInputSource::new("deviceinput0", 5);
        let block = PlanarBlock::new(2, 4);
        src.accept_device_input(&block);

        let mut out = vec![1.0; 4];
        src.fetch_block(0, &mut out);
        assert_eq!(out, [0.0; 4]);
    }
}
