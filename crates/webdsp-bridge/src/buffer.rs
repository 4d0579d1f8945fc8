//! Pre-allocated audio block regions.
//!
//! The host writes input samples into the input region and reads results from
//! the output region. Each `run` slices both regions into per-channel views of
//! `frames` samples, channel `i` starting at byte `i * frames * 4`. Nothing is
//! copied or allocated per call.

use crate::error::{BridgeError, Result};

/// Size of each region in bytes (16384 frames of 32-bit float samples).
pub const BLOCK_REGION_BYTES: usize = 65536;

pub const BYTES_PER_SAMPLE: usize = std::mem::size_of::<f32>();

/// Capacity of each region in samples.
pub const REGION_SAMPLES: usize = BLOCK_REGION_BYTES / BYTES_PER_SAMPLE;

/// The two fixed-capacity byte regions shared with the host.
pub struct BufferRegions {
    input: Box<[f32]>,
    output: Box<[f32]>,
}

impl Default for BufferRegions {
    fn default() -> Self {
        Self::new()
    }
}

impl BufferRegions {
    pub fn new() -> Self {
        Self {
            input: vec![0.0f32; REGION_SAMPLES].into_boxed_slice(),
            output: vec![0.0f32; REGION_SAMPLES].into_boxed_slice(),
        }
    }

    pub fn capacity_bytes(&self) -> usize {
        BLOCK_REGION_BYTES
    }

    /// Check that a block layout fits in both regions.
    pub fn check_fits(frames: usize, num_inputs: usize, num_outputs: usize) -> Result<()> {
        let channels = num_inputs.max(num_outputs);
        let needed = frames
            .checked_mul(BYTES_PER_SAMPLE)
            .and_then(|bytes| bytes.checked_mul(channels));

        match needed {
            Some(bytes) if bytes <= BLOCK_REGION_BYTES => Ok(()),
            _ => Err(BridgeError::BlockTooLarge {
                frames,
                channels,
                capacity: BLOCK_REGION_BYTES,
            }),
        }
    }

    /// Largest block size the regions can hold for a given channel layout.
    pub fn max_frames(num_inputs: usize, num_outputs: usize) -> usize {
        REGION_SAMPLES / num_inputs.max(num_outputs).max(1)
    }

    /// Build the per-call views. RT-safe.
    pub fn views(
        &mut self,
        frames: usize,
        num_inputs: usize,
        num_outputs: usize,
    ) -> Result<AudioBlock<'_>> {
        Self::check_fits(frames, num_inputs, num_outputs)?;

        Ok(AudioBlock {
            input: &self.input[..frames * num_inputs],
            output: &mut self.output[..frames * num_outputs],
            frames,
            num_inputs,
            num_outputs,
        })
    }

    /// Host-side write of one input channel for a block of `data.len()` frames.
    pub fn write_input_channel(&mut self, channel: usize, data: &[f32]) -> Result<()> {
        let frames = data.len();
        Self::check_fits(frames, channel + 1, 0)?;
        let offset = channel * frames;
        self.input[offset..offset + frames].copy_from_slice(data);
        Ok(())
    }

    /// Host-side read of one output channel. Returns the number of samples copied.
    pub fn read_output_channel_into(
        &self,
        channel: usize,
        frames: usize,
        output: &mut [f32],
    ) -> Result<usize> {
        Self::check_fits(frames, 0, channel + 1)?;
        let offset = channel * frames;
        let count = frames.min(output.len());
        output[..count].copy_from_slice(&self.output[offset..offset + count]);
        Ok(count)
    }

    pub fn input_region_mut(&mut self) -> &mut [f32] {
        &mut self.input
    }

    pub fn output_region(&self) -> &[f32] {
        &self.output
    }

    /// Base address of the input region, for hosts that write through module memory.
    pub fn input_ptr(&mut self) -> *mut f32 {
        self.input.as_mut_ptr()
    }

    /// Base address of the output region.
    pub fn output_ptr(&mut self) -> *mut f32 {
        self.output.as_mut_ptr()
    }
}

/// Views over the regions for one `run` call.
///
/// The borrow on [`BufferRegions`] ends with the call, so views cannot
/// outlive it.
pub struct AudioBlock<'a> {
    input: &'a [f32],
    output: &'a mut [f32],
    frames: usize,
    num_inputs: usize,
    num_outputs: usize,
}

impl<'a> AudioBlock<'a> {
    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn num_inputs(&self) -> usize {
        self.num_inputs
    }

    pub fn num_outputs(&self) -> usize {
        self.num_outputs
    }

    /// Panics if `channel >= num_inputs()`.
    pub fn input(&self, channel: usize) -> &[f32] {
        assert!(channel < self.num_inputs, "input channel out of range");
        &self.input[channel * self.frames..(channel + 1) * self.frames]
    }

    /// Panics if `channel >= num_outputs()`.
    pub fn output(&self, channel: usize) -> &[f32] {
        assert!(channel < self.num_outputs, "output channel out of range");
        &self.output[channel * self.frames..(channel + 1) * self.frames]
    }

    /// Panics if `channel >= num_outputs()`.
    pub fn output_mut(&mut self, channel: usize) -> &mut [f32] {
        assert!(channel < self.num_outputs, "output channel out of range");
        &mut self.output[channel * self.frames..(channel + 1) * self.frames]
    }

    /// Input and output of the same channel, for in-place style processing.
    pub fn io_mut(&mut self, channel: usize) -> (&[f32], &mut [f32]) {
        assert!(channel < self.num_inputs, "input channel out of range");
        assert!(channel < self.num_outputs, "output channel out of range");
        let range = channel * self.frames..(channel + 1) * self.frames;
        (&self.input[range.clone()], &mut self.output[range])
    }

    pub fn inputs(&self) -> impl Iterator<Item = &[f32]> + '_ {
        let frames = self.frames;
        (0..self.num_inputs).map(move |ch| &self.input[ch * frames..(ch + 1) * frames])
    }

    pub fn outputs_mut(&mut self) -> impl Iterator<Item = &mut [f32]> + '_ {
        // chunks of zero length are not allowed; an empty block yields nothing
        self.output.chunks_mut(self.frames.max(1))
    }

    /// Zero all output channels.
    pub fn clear_outputs(&mut self) {
        self.output.fill(0.0);
    }
}
