//! 相机路径动画
//!
//! 关键帧存储、按通道的插值策略、相机路径聚合以及 XML 持久化。

mod campath;
mod campath_file;
pub mod channel_view;
pub mod interpolation;
mod keyframe;
mod keyframe_map;
mod notifier;

pub use campath::CamPath;
pub use channel_view::ChannelView;
pub use interpolation::{DoubleInterp, Interpolation, QuaternionInterp};
pub use keyframe::{CamPathValue, Channel, ChannelTangents, TangentMode};
pub use keyframe_map::{Iter, KeyTime, KeyframeMap};
pub use notifier::{ChangeNotifier, ListenerId};
