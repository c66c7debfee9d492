//! DepthFrame - 标注阶段流转的数据单元
//!
//! 同时定义标注器交付帧的下游元数据处理步骤。

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{DepthUnits, MetadataDocument};

/// 每个原始深度采样的字节数 (Z16)
pub const DEPTH_SAMPLE_SIZE: usize = 2;

/// 深度帧
///
/// 原始数据为按行排列的小端 16 位深度计数。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepthFrame {
    /// 所属流
    pub stream_id: String,

    /// 设备帧计数
    pub frame_number: u64,

    /// 采集时间戳 (秒)
    pub timestamp: f64,

    /// 图像宽度 (像素)
    pub width: u32,

    /// 图像高度 (像素)
    pub height: u32,

    /// 原始 Z16 数据
    pub data: Bytes,

    /// 处理过程中附加的数据
    #[serde(default)]
    pub additional_data: AdditionalData,
}

/// 各处理阶段填写的附加数据
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AdditionalData {
    /// 深度单位；标注阶段运行前为 `None`
    pub depth_units: Option<DepthUnits>,

    /// 是否随帧收到元数据文档
    pub metadata_received: bool,
}

impl DepthFrame {
    /// Create a frame with no auxiliary data set
    pub fn new(stream_id: impl Into<String>, frame_number: u64, width: u32, height: u32, data: Bytes) -> Self {
        Self {
            stream_id: stream_id.into(),
            frame_number,
            timestamp: 0.0,
            width,
            height,
            data,
            additional_data: AdditionalData::default(),
        }
    }

    /// Frame without pixel data, used when only the auxiliary fields matter
    pub fn empty(stream_id: impl Into<String>, frame_number: u64) -> Self {
        Self::new(stream_id, frame_number, 0, 0, Bytes::new())
    }

    /// Builder-style timestamp setter
    pub fn with_timestamp(mut self, timestamp: f64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Depth scale attached to this frame
    #[inline]
    pub fn depth_units(&self) -> Option<DepthUnits> {
        self.additional_data.depth_units
    }

    /// Raw depth count at pixel (x, y)
    pub fn raw_at(&self, x: u32, y: u32) -> Option<u16> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * DEPTH_SAMPLE_SIZE;
        let bytes = self.data.get(offset..offset + DEPTH_SAMPLE_SIZE)?;
        Some(u16::from_le(bytemuck::pod_read_unaligned(bytes)))
    }

    /// Distance in meters at pixel (x, y)
    ///
    /// `None` when the coordinates are out of range or depth units are not set yet.
    pub fn distance_at(&self, x: u32, y: u32) -> Option<f32> {
        let units = self.depth_units()?;
        self.raw_at(x, y).map(|raw| units.to_meters(raw))
    }
}

/// Downstream per-frame metadata processing.
///
/// Invoked by the annotator after depth units have been written to the frame.
pub trait FrameMetadataStep: Send + Sync {
    /// Frame arrived without a metadata document
    fn add_no_metadata(&self, frame: &mut DepthFrame);

    /// Frame arrived with a metadata document; the document is consumed
    fn add_frame_metadata(&self, frame: &mut DepthFrame, metadata: MetadataDocument);
}

/// Step that does nothing beyond recording that metadata was seen
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughStep;

impl FrameMetadataStep for PassThroughStep {
    fn add_no_metadata(&self, _frame: &mut DepthFrame) {}

    fn add_frame_metadata(&self, frame: &mut DepthFrame, _metadata: MetadataDocument) {
        frame.additional_data.metadata_received = true;
    }
}
