//! Network-stream passthrough (§4.2): a bounded ring buffer fed by an
//! external producer thread (the network receive path, out of scope here —
//! see §1), drained one block at a time on the audio thread. Underruns are
//! filled with silence and counted rather than ever blocking.

use rtrb::Consumer;

use va_core::Sample;

use crate::source::SignalSource;

pub struct NetworkStreamSource {
    id: String,
    consumer: Consumer<Sample>,
    underrun_count: u64,
}

impl NetworkStreamSource {
    pub fn new(id: impl Into<String>, consumer: Consumer<Sample>) -> Self {
        Self { id: id.into(), consumer, underrun_count: 0 }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn underrun_count(&self) -> u64 {
        self.underrun_count
    }
}

impl SignalSource for NetworkStreamSource {
    fn fetch_block(&mut self, _channel: usize, output: &mut [Sample]) {
        let mut underran = false;
        for slot in output.iter_mut() {
            *slot = match self.consumer.pop() {
                Ok(sample) => sample,
                Err(_) => {
                    underran = true;
                    0.0
                }
            };
        }
        if underran {
            self.underrun_count += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn underrun_fills_silence_and_counts() {
        let (mut producer, consumer) = rtrb::RingBuffer::<Sample>::new(4);
        producer.push(1.0).unwrap();
        producer.push(2.0).unwrap();
        let mut src = NetworkStreamSource::new("netstream0", consumer);

        let mut out = [0.0; 4];
        src.fetch_block(0, &mut out);
        assert_eq!(out, [1.0, 2.0, 0.0, 0.0]);
        assert_eq!(src.underrun_count(), 1);
    }
}
