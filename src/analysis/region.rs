//! Shared output region read by consumers through offset/length descriptors.

use bytemuck::{Pod, Zeroable};
use std::ops::Range;

/// Offset and length of one block inside a [`SpectrumRegion`], in `f32`s.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct Segment {
    pub offset: u32,
    pub len: u32,
}

impl Segment {
    pub fn range(&self) -> Range<usize> {
        let start = self.offset as usize;
        start..start + self.len as usize
    }

    fn end(&self) -> u32 {
        self.offset + self.len
    }
}

/// Block layout of the region, laid out so it can be handed over as raw bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct RegionLayout {
    pub magnitudes: Segment,
    pub bins: Segment,
    pub bars: Segment,
}

impl RegionLayout {
    pub fn new(num_bins: usize, bar_count: usize) -> Self {
        let magnitudes = Segment {
            offset: 0,
            len: num_bins as u32,
        };
        let bins = Segment {
            offset: magnitudes.end(),
            len: num_bins as u32,
        };
        let bars = Segment {
            offset: bins.end(),
            len: bar_count as u32,
        };
        Self {
            magnitudes,
            bins,
            bars,
        }
    }

    pub fn total_len(&self) -> usize {
        self.bars.end() as usize
    }
}

#[derive(Clone, Debug)]
pub struct SpectrumRegion {
    data: Vec<f32>,
    layout: RegionLayout,
}

impl SpectrumRegion {
    pub fn new(num_bins: usize, bar_count: usize) -> Self {
        let layout = RegionLayout::new(num_bins, bar_count);
        Self {
            data: vec![0.0; layout.total_len()],
            layout,
        }
    }

    pub fn layout(&self) -> &RegionLayout {
        &self.layout
    }

    /// Reallocate for new dimensions. Returns `false` if nothing changed.
    pub fn resize(&mut self, num_bins: usize, bar_count: usize) -> bool {
        let layout = RegionLayout::new(num_bins, bar_count);
        if layout == self.layout {
            return false;
        }
        log::debug!("Reallocating spectrum region: {} bins, {} bars", num_bins, bar_count);
        self.layout = layout;
        self.data = vec![0.0; layout.total_len()];
        true
    }

    pub fn read(&self, segment: Segment) -> &[f32] {
        &self.data[segment.range()]
    }

    pub fn magnitudes(&self) -> &[f32] {
        self.read(self.layout.magnitudes)
    }

    pub fn bins(&self) -> &[f32] {
        self.read(self.layout.bins)
    }

    pub fn bars(&self) -> &[f32] {
        self.read(self.layout.bars)
    }

    pub fn split_mut(&mut self) -> (&mut [f32], &mut [f32], &mut [f32]) {
        let (magnitudes, rest) = self.data.split_at_mut(self.layout.magnitudes.len as usize);
        let (bins, bars) = rest.split_at_mut(self.layout.bins.len as usize);
        (magnitudes, bins, bars)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_contiguous() {
        let layout = RegionLayout::new(1024, 64);
        assert_eq!(layout.magnitudes, Segment { offset: 0, len: 1024 });
        assert_eq!(layout.bins, Segment { offset: 1024, len: 1024 });
        assert_eq!(layout.bars, Segment { offset: 2048, len: 64 });
        assert_eq!(layout.total_len(), 2112);
        assert_eq!(bytemuck::bytes_of(&layout).len(), 24);
    }

    #[test]
    fn writes_are_visible_by_segment() {
        let mut region = SpectrumRegion::new(4, 2);
        {
            let (mags, bins, bars) = region.split_mut();
            mags.fill(1.0);
            bins.fill(2.0);
            bars.copy_from_slice(&[0.25, 0.5]);
        }
        assert_eq!(region.magnitudes(), &[1.0; 4]);
        assert_eq!(region.bins(), &[2.0; 4]);
        assert_eq!(region.read(region.layout().bars), &[0.25, 0.5]);
        assert_eq!(region.as_bytes().len(), 10 * 4);
        assert_eq!(&region.as_bytes()[32..36], &0.25f32.to_ne_bytes());
    }

    #[test]
    fn resize_only_when_dimensions_change() {
        let mut region = SpectrumRegion::new(8, 4);
        region.split_mut().0.fill(3.0);
        assert!(!region.resize(8, 4));
        assert_eq!(region.magnitudes(), &[3.0; 8]);
        assert!(region.resize(16, 4));
        assert_eq!(region.as_slice().len(), 36);
        assert!(region.as_slice().iter().all(|&v| v == 0.0));
    }
}
