//! # Texture Attach
//!
//! Detached decoding of raster payloads for paintable nodes.
//!
//! ## Lifecycle
//! 1. The builder issues a ticket for the node and spawns the decode on the
//!    `rayon` pool. Construction does not wait.
//! 2. The worker posts the outcome through a `crossbeam-channel`.
//! 3. The scene drains the channel on its own thread
//!    ([`Scene::pump_textures`](crate::Scene::pump_textures) or
//!    [`Scene::finish_textures`](crate::Scene::finish_textures)) and swaps the
//!    texture into the live display handle.
//!
//! A result is applied only if the node is still alive and still holds the
//! ticket it was issued for. Destroying or retyping a node therefore turns
//! its in-flight decode into a no-op.

use crate::node::NodeId;
use crossbeam_channel::{unbounded, Receiver, Sender};
use psd_data::RasterData;
use thiserror::Error;

/// Where a paintable node's real texture stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureState {
    /// No raster payload (or decoding disabled): the placeholder stays.
    None,
    Pending,
    Ready,
    Failed,
}

/// Notification produced when a decode result is drained.
#[derive(Debug, Clone, PartialEq)]
pub enum TextureEvent {
    Ready(NodeId),
    Failed { node: NodeId, reason: String },
    /// The node was destroyed or retyped before the result arrived.
    Discarded(NodeId),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TextureError {
    #[error("pixel buffer holds {actual} bytes, {width}x{height} RGBA needs {expected}")]
    SizeMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("{width}x{height} RGBA does not fit in memory")]
    Oversized { width: u32, height: u32 },
    #[error("renderer rejected a {width}x{height} texture")]
    Rejected { width: u32, height: u32 },
}

/// Straight RGBA pixels, validated against their dimensions.
#[derive(Debug, Clone)]
pub struct DecodedRaster {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

pub(crate) fn decode_raster(raster: &RasterData) -> Result<DecodedRaster, TextureError> {
    let expected = raster.expected_len().ok_or(TextureError::Oversized {
        width: raster.width,
        height: raster.height,
    })?;
    let mismatch = TextureError::SizeMismatch {
        width: raster.width,
        height: raster.height,
        expected,
        actual: raster.data.len(),
    };
    // `from_raw` accepts oversized buffers; trailing bytes mean a corrupt layer.
    if raster.data.len() != expected {
        return Err(mismatch);
    }
    let image = image::RgbaImage::from_raw(raster.width, raster.height, raster.data.to_vec())
        .ok_or(mismatch)?;
    let (width, height) = image.dimensions();
    Ok(DecodedRaster {
        width,
        height,
        pixels: image.into_raw(),
    })
}

pub(crate) struct TextureJob {
    pub node: NodeId,
    pub ticket: u64,
    pub result: Result<DecodedRaster, TextureError>,
}

pub(crate) struct TextureQueue {
    tx: Sender<TextureJob>,
    rx: Receiver<TextureJob>,
    next_ticket: u64,
    in_flight: usize,
}

impl TextureQueue {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self {
            tx,
            rx,
            next_ticket: 0,
            in_flight: 0,
        }
    }

    /// Spawns the decode and returns the ticket the result will carry.
    pub fn schedule(&mut self, node: NodeId, raster: RasterData) -> u64 {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.in_flight += 1;

        let tx = self.tx.clone();
        rayon::spawn(move || {
            let result = decode_raster(&raster);
            // The scene may already be gone; nothing to report to then.
            let _ = tx.send(TextureJob {
                node,
                ticket,
                result,
            });
        });
        ticket
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn try_next(&mut self) -> Option<TextureJob> {
        let job = self.rx.try_recv().ok()?;
        self.in_flight -= 1;
        Some(job)
    }

    /// Blocks for the next result, or returns `None` when nothing is in flight.
    pub fn next_blocking(&mut self) -> Option<TextureJob> {
        if self.in_flight == 0 {
            return None;
        }
        let job = self.rx.recv().ok()?;
        self.in_flight -= 1;
        Some(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_checks_buffer_length() {
        let good = RasterData {
            width: 2,
            height: 1,
            data: vec![255u8; 8].into(),
        };
        let decoded = decode_raster(&good).unwrap();
        assert_eq!((decoded.width, decoded.height), (2, 1));
        assert_eq!(decoded.pixels.len(), 8);

        let short = RasterData {
            width: 2,
            height: 2,
            data: vec![0u8; 3].into(),
        };
        assert_eq!(
            decode_raster(&short).unwrap_err(),
            TextureError::SizeMismatch {
                width: 2,
                height: 2,
                expected: 16,
                actual: 3
            }
        );

        let huge = RasterData {
            width: u32::MAX,
            height: u32::MAX,
            data: vec![0u8; 4].into(),
        };
        assert_eq!(
            decode_raster(&huge).unwrap_err(),
            TextureError::Oversized {
                width: u32::MAX,
                height: u32::MAX
            }
        );
    }
}
