//! 相机路径 XML 文件读写
//!
//! 文件结构：
//! ```xml
//! <campath positionInterp="linear" offset="1.500000" hold="">
//!   <points>
//!     <p t="0.000000" x=".." y=".." z=".." fov=".." rx=".." ry=".." rz=".."
//!        qw=".." qx=".." qy=".." qz=".." tx_in=".." tx_mode_in="auto" tx_w_in=".." ... selected=""/>
//!   </points>
//! </campath>
//! ```
//! 根元素上的插值方法为默认值、偏移为 0、hold 为 false 时省略对应属性。
//! 读取时四元数优先于欧拉角。

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use glam::{DQuat, DVec3};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::config::CamPathConfig;
use crate::math::EulerAngles;
use crate::{CamPathError, Result};

use super::campath::{CamPath, CamPathDocument};
use super::interpolation::{DoubleInterp, QuaternionInterp};
use super::keyframe::{CamPathValue, Channel, TangentMode};
use super::keyframe_map::KeyframeMap;

const ROOT: &[u8] = b"campath";
const POINTS: &[u8] = b"points";
const POINT: &[u8] = b"p";

const COORDINATE_NOTE: &str = "\n\
Quake coordinates: x forward, y left, z up.\n\
rx (roll), ry (pitch), rz (yaw) are Euler angles in degrees, applied roll first, then pitch, then yaw, right-hand rule.\n\
qw, qx, qy, qz hold the same orientation as a quaternion and take precedence when present.\n\
Reading needs either rx, ry, rz or qw, qx, qy, qz.\n";

impl CamPath {
    /// 保存为 XML 文件
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let xml = self.to_xml_string()?;
        fs::write(path, xml)?;
        log::info!("相机路径已保存: {} 个关键帧 -> {}", self.len(), path.display());
        Ok(())
    }

    /// 从 XML 文件加载，失败时保持当前内容不变
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let xml = fs::read_to_string(path)?;
        self.from_xml_str(&xml)?;
        log::info!("相机路径已加载: {} 个关键帧 <- {}", self.len(), path.display());
        Ok(())
    }

    pub fn to_xml_string(&self) -> Result<String> {
        write_document(&self.to_document(), self.config())
    }

    /// 解析 XML 并整体替换当前内容，解析失败时不做任何修改
    pub fn from_xml_str(&mut self, xml: &str) -> Result<()> {
        let document = parse_document(xml, self.config())?;
        self.apply_document(document);
        Ok(())
    }
}

// ========== 写入 ==========

fn write_err<E: std::fmt::Display>(e: E) -> CamPathError {
    CamPathError::XmlWrite(e.to_string())
}

fn write_document(document: &CamPathDocument, config: &CamPathConfig) -> Result<String> {
    let precision = config.float_precision;
    let number = |v: f64| format!("{:.*}", precision, v);

    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
        .map_err(write_err)?;

    let mut root = BytesStart::new("campath");
    if document.position_method != DoubleInterp::Default {
        root.push_attribute(("positionInterp", document.position_method.as_str()));
    }
    if document.rotation_method != QuaternionInterp::Default {
        root.push_attribute(("rotationInterp", document.rotation_method.as_str()));
    }
    if document.fov_method != DoubleInterp::Default {
        root.push_attribute(("fovInterp", document.fov_method.as_str()));
    }
    if document.offset != 0.0 {
        root.push_attribute(("offset", number(document.offset).as_str()));
    }
    if document.hold {
        root.push_attribute(("hold", ""));
    }
    writer.write_event(Event::Start(root)).map_err(write_err)?;

    writer
        .write_event(Event::Start(BytesStart::new("points")))
        .map_err(write_err)?;
    writer
        .write_event(Event::Comment(BytesText::from_escaped(COORDINATE_NOTE)))
        .map_err(write_err)?;

    for (time, value) in document.map.iter() {
        let angles = value.angles();
        let q = value.rotation;

        let mut attributes: Vec<(String, String)> = vec![
            ("t".into(), number(time)),
            ("x".into(), number(value.position.x)),
            ("y".into(), number(value.position.y)),
            ("z".into(), number(value.position.z)),
            ("fov".into(), number(value.fov)),
            ("rx".into(), number(angles.roll)),
            ("ry".into(), number(angles.pitch)),
            ("rz".into(), number(angles.yaw)),
            ("qw".into(), number(q.w)),
            ("qx".into(), number(q.x)),
            ("qy".into(), number(q.y)),
            ("qz".into(), number(q.z)),
        ];

        for channel in Channel::ALL {
            let prefix = channel.attribute_prefix();
            let tan = value.tangents(channel);
            attributes.push((format!("{}_in", prefix), number(tan.slope_in)));
            attributes.push((format!("{}_out", prefix), number(tan.slope_out)));
            attributes.push((format!("{}_mode_in", prefix), tan.mode_in.as_str().to_string()));
            attributes.push((format!("{}_mode_out", prefix), tan.mode_out.as_str().to_string()));
            attributes.push((format!("{}_w_in", prefix), number(tan.weight_in)));
            attributes.push((format!("{}_w_out", prefix), number(tan.weight_out)));
        }

        if value.selected {
            attributes.push(("selected".into(), String::new()));
        }

        let mut point = BytesStart::new("p");
        for (key, val) in &attributes {
            point.push_attribute((key.as_str(), val.as_str()));
        }
        writer.write_event(Event::Empty(point)).map_err(write_err)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("points")))
        .map_err(write_err)?;
    writer
        .write_event(Event::End(BytesEnd::new("campath")))
        .map_err(write_err)?;

    String::from_utf8(writer.into_inner()).map_err(write_err)
}

// ========== 读取 ==========

fn parse_err<E: std::fmt::Display>(e: E) -> CamPathError {
    CamPathError::XmlParse(e.to_string())
}

/// 元素属性表（已反转义）
struct Attributes(HashMap<String, String>);

impl Attributes {
    fn from_element(element: &BytesStart<'_>) -> Result<Self> {
        let mut map = HashMap::new();
        for attr in element.attributes() {
            let attr = attr.map_err(parse_err)?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value().map_err(parse_err)?.into_owned();
            map.insert(key, value);
        }
        Ok(Self(map))
    }

    fn has(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    fn number(&self, name: &str) -> Result<Option<f64>> {
        match self.get(name) {
            None => Ok(None),
            Some(raw) => raw.trim().parse::<f64>().map(Some).map_err(|_| {
                CamPathError::Format(format!("invalid number in attribute {}: {:?}", name, raw))
            }),
        }
    }

    /// 切线属性，先找完整前缀（tx_in），再找短前缀（x_in）
    fn tangent(&self, channel: Channel, suffix: &str) -> Option<(String, &str)> {
        [channel.attribute_prefix(), channel.short_prefix()]
            .into_iter()
            .map(|prefix| format!("{}_{}", prefix, suffix))
            .find_map(|name| self.get(&name).map(|v| (name.clone(), v)))
    }

    fn tangent_number(&self, channel: Channel, suffix: &str) -> Result<Option<f64>> {
        match self.tangent(channel, suffix) {
            None => Ok(None),
            Some((name, _)) => self.number(&name),
        }
    }
}

fn parse_method<T>(attrs: &Attributes, name: &str) -> T
where
    T: std::str::FromStr<Err = CamPathError> + Default,
{
    match attrs.get(name) {
        None => T::default(),
        Some(raw) => raw.parse().unwrap_or_else(|e: CamPathError| {
            log::warn!("{}: {}，使用默认值", name, e);
            T::default()
        }),
    }
}

fn parse_root(attrs: &Attributes, document: &mut CamPathDocument) -> Result<()> {
    document.position_method = parse_method(attrs, "positionInterp");
    document.rotation_method = parse_method(attrs, "rotationInterp");
    document.fov_method = parse_method(attrs, "fovInterp");
    document.offset = attrs.number("offset")?.unwrap_or(0.0);
    document.hold = attrs.has("hold");
    Ok(())
}

/// 解析单个 `p` 元素，没有 `t` 时返回 None
fn parse_point(attrs: &Attributes, config: &CamPathConfig) -> Result<Option<(f64, CamPathValue)>> {
    let Some(time) = attrs.number("t")? else {
        log::warn!("跳过缺少 t 属性的关键帧");
        return Ok(None);
    };

    let position = DVec3::new(
        attrs.number("x")?.unwrap_or(0.0),
        attrs.number("y")?.unwrap_or(0.0),
        attrs.number("z")?.unwrap_or(0.0),
    );
    let fov = attrs.number("fov")?.unwrap_or(config.default_fov);
    let selected = attrs.has("selected");

    let quat = (
        attrs.number("qw")?,
        attrs.number("qx")?,
        attrs.number("qy")?,
        attrs.number("qz")?,
    );
    let mut value = match quat {
        (Some(w), Some(x), Some(y), Some(z)) => {
            CamPathValue::from_quat(position, DQuat::from_xyzw(x, y, z, w), fov, selected)
        }
        _ => {
            let angles = EulerAngles::new(
                attrs.number("ry")?.unwrap_or(0.0),
                attrs.number("rz")?.unwrap_or(0.0),
                attrs.number("rx")?.unwrap_or(0.0),
            );
            let mut value = CamPathValue::from_euler(position, angles, fov);
            value.selected = selected;
            value
        }
    };

    for channel in Channel::ALL {
        let tan = value.tangents_mut(channel);
        if let Some(slope) = attrs.tangent_number(channel, "in")? {
            tan.slope_in = slope;
        }
        if let Some(slope) = attrs.tangent_number(channel, "out")? {
            tan.slope_out = slope;
        }
        if let Some(weight) = attrs.tangent_number(channel, "w_in")? {
            tan.weight_in = weight;
        }
        if let Some(weight) = attrs.tangent_number(channel, "w_out")? {
            tan.weight_out = weight;
        }
        if let Some(mode) = parse_tangent_mode(attrs, channel, "mode_in") {
            tan.mode_in = mode;
        }
        if let Some(mode) = parse_tangent_mode(attrs, channel, "mode_out") {
            tan.mode_out = mode;
        }
    }

    Ok(Some((time, value)))
}

fn parse_tangent_mode(attrs: &Attributes, channel: Channel, suffix: &str) -> Option<TangentMode> {
    let (name, raw) = attrs.tangent(channel, suffix)?;
    match raw.parse() {
        Ok(mode) => Some(mode),
        Err(e) => {
            log::warn!("{}: {}", name, e);
            None
        }
    }
}

/// 解析完整文档，不修改任何已有路径
pub(crate) fn parse_document(xml: &str, config: &CamPathConfig) -> Result<CamPathDocument> {
    let mut reader = Reader::from_str(xml);
    let mut document = CamPathDocument::default();
    let mut map = KeyframeMap::new();

    // 当前打开的元素路径
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut found_root = false;
    let mut found_points = false;

    loop {
        let event = reader.read_event().map_err(parse_err)?;
        let (element, is_empty) = match &event {
            Event::Start(e) => (e, false),
            Event::Empty(e) => (e, true),
            Event::End(_) => {
                stack.pop();
                continue;
            }
            Event::Eof => break,
            _ => continue,
        };

        let name = element.name().as_ref().to_vec();
        let in_root = stack.len() == 1 && stack[0] == ROOT;
        let in_points = stack.len() == 2 && stack[0] == ROOT && stack[1] == POINTS;

        if stack.is_empty() && name == ROOT && !found_root {
            found_root = true;
            parse_root(&Attributes::from_element(element)?, &mut document)?;
        } else if in_root && name == POINTS {
            found_points = true;
        } else if in_points && name == POINT {
            let attrs = Attributes::from_element(element)?;
            if let Some((time, value)) = parse_point(&attrs, config)? {
                map.insert(time, value);
            }
        }

        if !is_empty {
            stack.push(name);
        }
    }

    // 截断的文件读到 Eof 时仍有未闭合的元素
    if let Some(open) = stack.last() {
        return Err(CamPathError::XmlParse(format!(
            "unexpected end of document, <{}> is not closed",
            String::from_utf8_lossy(open)
        )));
    }
    if !found_root {
        return Err(CamPathError::Format("missing campath element".to_string()));
    }
    if !found_points {
        return Err(CamPathError::Format("missing points element".to_string()));
    }

    document.map = map;
    Ok(document)
}
