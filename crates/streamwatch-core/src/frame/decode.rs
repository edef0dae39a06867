//! Packet loop shared by in-process decoders.

use std::fmt::Display;

use tracing::debug;

/// A decoder fed one compressed packet at a time.
pub(crate) trait PacketDecoder {
    type Packet;
    type Error: Display;

    fn send(&mut self, packet: &Self::Packet) -> Result<(), Self::Error>;

    /// Pull a decoded frame into the decoder's own buffer. Returns `true` if
    /// one was available.
    fn receive(&mut self) -> bool;

    /// Signal end of input so buffered frames are flushed.
    fn finish(&mut self) -> Result<(), Self::Error>;
}

/// Feed `packets` until the decoder yields its first frame.
///
/// Packets the decoder rejects are skipped; live streams joined mid-GOP often
/// start with a few. The attempt fails only once input runs out with nothing
/// decoded, and the error then carries the last decoder complaint.
pub(crate) fn decode_first<D, I>(url: &str, decoder: &mut D, packets: I) -> Result<(), String>
where
    D: PacketDecoder,
    I: IntoIterator<Item = D::Packet>,
{
    let mut last_error: Option<String> = None;
    let mut skipped = 0usize;

    for packet in packets {
        if let Err(e) = decoder.send(&packet) {
            skipped += 1;
            debug!(url, error = %e, "Decoder rejected packet, skipping");
            last_error = Some(e.to_string());
        }
        if decoder.receive() {
            if skipped > 0 {
                debug!(url, skipped, "Decoded a frame after skipping packets");
            }
            return Ok(());
        }
    }

    if let Err(e) = decoder.finish() {
        last_error = Some(e.to_string());
    } else if decoder.receive() {
        return Ok(());
    }

    Err(match last_error {
        Some(e) => format!(
            "stream ended before a frame was decoded ({} packets rejected, last error: {})",
            skipped, e
        ),
        None => "stream ended before a frame was decoded".into(),
    })
}
