// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 关键点录制回放
//! Replay recorded pose/tracking output from JSON Lines
//!
//! 每行一帧:
//! ```text
//! {"frame": 0, "keypoints": {"right_hip": [x, y], "26": [x, y, conf]}}
//! {"detections": [{"id": 1, "bbox": [x1, y1, x2, y2], "label": "person", "keypoints": {...}}]}
//! {"size": [640, 480], "keypoints": {"nose": [0.5, 0.2, 0.9]}}
//! ```
//! 带 `size` 的行坐标为归一化坐标 (0-1), 读取时换算为像素。

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::detection::{BBox, IdentitySource, TrackedDetection, PERSON_LABEL};
use crate::pose::{Keypoints, Landmark, Point2, PoseSource};

// ========== 行格式 ==========

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPoint {
    Xy([f32; 2]),
    Xyc([f32; 3]),
}

impl RawPoint {
    fn parts(&self) -> (f32, f32, f32) {
        match *self {
            RawPoint::Xy([x, y]) => (x, y, 1.0),
            RawPoint::Xyc([x, y, c]) => (x, y, c),
        }
    }
}

#[derive(Deserialize)]
struct RawDetection {
    id: u32,
    bbox: [f32; 4],
    #[serde(default = "default_label")]
    label: String,
    #[serde(default)]
    confidence: Option<f32>,
    #[serde(default)]
    keypoints: BTreeMap<String, RawPoint>,
}

fn default_label() -> String {
    PERSON_LABEL.to_string()
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawFrame {
    #[serde(default)]
    frame: Option<u64>,
    #[serde(default)]
    size: Option<[u32; 2]>,
    #[serde(default)]
    keypoints: Option<BTreeMap<String, RawPoint>>,
    #[serde(default)]
    detections: Option<Vec<RawDetection>>,
}

/// 回放的一帧
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordedFrame {
    pub index: u64,
    /// 整帧关键点 (单人模式)
    pub keypoints: Option<Keypoints>,
    /// 追踪结果及其关键点 (多人模式)
    pub detections: Option<Vec<(TrackedDetection, Keypoints)>>,
}

impl RecordedFrame {
    /// 从一行 JSON 解析, `fallback_index` 用于未写 `frame` 的行
    pub fn parse(line: &str, fallback_index: u64) -> Result<Self> {
        let raw: RawFrame = serde_json::from_str(line)?;
        let size = raw.size;

        let keypoints = raw
            .keypoints
            .map(|points| convert_keypoints(&points, size))
            .transpose()?;

        let detections = raw
            .detections
            .map(|dets| {
                dets.into_iter()
                    .map(|d| {
                        let [x1, y1, x2, y2] = d.bbox;
                        let mut bbox = BBox::new(x1, y1, x2, y2);
                        if let Some(conf) = d.confidence {
                            bbox.confidence = conf;
                        }
                        let kps = convert_keypoints(&d.keypoints, size)?;
                        Ok((TrackedDetection::new(d.id, bbox, d.label), kps))
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .transpose()?;

        Ok(Self {
            index: raw.frame.unwrap_or(fallback_index),
            keypoints,
            detections,
        })
    }

    pub fn is_multi(&self) -> bool {
        self.detections.is_some()
    }
}

fn convert_keypoints(points: &BTreeMap<String, RawPoint>, size: Option<[u32; 2]>) -> Result<Keypoints> {
    let mut resolved = Vec::with_capacity(points.len());
    for (name, point) in points {
        let Some(landmark) = Landmark::from_name(name) else {
            bail!("未知关键点: {}", name);
        };
        let (x, y, c) = point.parts();
        resolved.push((landmark, x, y, c));
    }

    Ok(match size {
        Some([w, h]) => Keypoints::from_normalized(
            resolved.into_iter().map(|(lm, x, y, c)| (lm.index(), x, y, c)),
            w,
            h,
        ),
        None => {
            let mut kps = Keypoints::new();
            for (lm, x, y, c) in resolved {
                kps.insert(lm, Point2::new_with_conf(x, y, c));
            }
            kps
        }
    })
}

// ========== 回放源 ==========

/// JSON Lines 回放源, 空行跳过
pub struct ReplaySource<R: BufRead> {
    lines: Lines<R>,
    line_no: usize,
    frames: u64,
}

impl<R: BufRead> ReplaySource<R> {
    pub fn from_reader(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
            frames: 0,
        }
    }
}

impl ReplaySource<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("无法打开回放文件 {}", path.display()))?;
        Ok(Self::from_reader(BufReader::new(file)))
    }
}

impl<R: BufRead> Iterator for ReplaySource<R> {
    type Item = Result<RecordedFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_no += 1;
            if line.trim().is_empty() {
                continue;
            }

            let parsed = RecordedFrame::parse(&line, self.frames)
                .with_context(|| format!("第 {} 行解析失败", self.line_no));
            self.frames += 1;
            return Some(parsed);
        }
    }
}

/// 把录制数据当作姿态估计器和追踪器
#[derive(Clone, Copy, Debug, Default)]
pub struct ReplayCollaborator;

impl PoseSource<RecordedFrame> for ReplayCollaborator {
    fn keypoints(
        &mut self,
        frame: &RecordedFrame,
        subject: Option<&TrackedDetection>,
    ) -> Result<Keypoints> {
        match subject {
            None => frame
                .keypoints
                .clone()
                .with_context(|| format!("第 {} 帧没有关键点", frame.index)),
            Some(det) => frame
                .detections
                .iter()
                .flatten()
                .find(|(d, _)| d.id == det.id)
                .map(|(_, kps)| kps.clone())
                .with_context(|| format!("第 {} 帧没有主体 #{}", frame.index, det.id)),
        }
    }
}

impl IdentitySource<RecordedFrame> for ReplayCollaborator {
    fn detections(&mut self, frame: &RecordedFrame) -> Result<Vec<TrackedDetection>> {
        Ok(frame
            .detections
            .iter()
            .flatten()
            .map(|(d, _)| d.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Cursor;

    #[test]
    fn test_parse_solo_frame() {
        let frame =
            RecordedFrame::parse(r#"{"frame": 4, "keypoints": {"right_hip": [1, 2], "26": [3, 4, 0.5]}}"#, 0)
                .unwrap();
        assert_eq!(frame.index, 4);
        assert!(!frame.is_multi());
        let kps = frame.keypoints.unwrap();
        assert_eq!(kps.len(), 2);
        assert_eq!(kps.get(Landmark::RightHip).unwrap().confidence(), 1.0);
        let knee = kps.get(Landmark::RightKnee).unwrap();
        assert_eq!((knee.x(), knee.y(), knee.confidence()), (3.0, 4.0, 0.5));
    }

    #[test]
    fn test_parse_normalized() {
        let frame = RecordedFrame::parse(r#"{"size": [640, 480], "keypoints": {"nose": [0.5, 0.25, 0.9]}}"#, 7)
            .unwrap();
        assert_eq!(frame.index, 7);
        let nose = *frame.keypoints.unwrap().get(Landmark::Nose).unwrap();
        assert_eq!((nose.x(), nose.y()), (320.0, 120.0));
    }

    #[test]
    fn test_parse_detections() {
        let line = r#"{"detections": [
            {"id": 3, "bbox": [0, 10, 100, 210], "keypoints": {"left_wrist": [5, 6]}},
            {"id": 4, "bbox": [0, 0, 1, 1], "label": "dog", "confidence": 0.4}
        ]}"#
        .replace('\n', " ");
        let frame = RecordedFrame::parse(&line, 0).unwrap();
        let dets = frame.detections.as_ref().unwrap();
        assert_eq!(dets.len(), 2);
        assert!(dets[0].0.is_label(PERSON_LABEL));
        assert_eq!(dets[0].0.bbox.center(), (50.0, 110.0));
        assert_eq!(dets[1].0.bbox.confidence, 0.4);
        assert!(dets[1].1.is_empty());
    }

    #[test]
    fn test_parse_errors() {
        assert!(RecordedFrame::parse(r#"{"keypoints": {"elbow": [1, 2]}}"#, 0).is_err());
        assert!(RecordedFrame::parse(r#"{"keypoints": {"nose": [1]}}"#, 0).is_err());
        assert!(RecordedFrame::parse(r#"{"keypoint": {}}"#, 0).is_err());
    }

    #[test]
    fn test_source_skips_blank_lines() {
        let data = "{\"keypoints\": {}}\n\n   \n{\"frame\": 9}\nnot json\n";
        let mut source = ReplaySource::from_reader(Cursor::new(data));
        assert_matches!(source.next(), Some(Ok(RecordedFrame { index: 0, .. })));
        assert_matches!(source.next(), Some(Ok(RecordedFrame { index: 9, .. })));
        let err = source.next().unwrap().unwrap_err();
        assert!(err.to_string().contains("第 5 行"));
        assert!(source.next().is_none());
    }

    #[test]
    fn test_collaborator() {
        let frame = RecordedFrame::parse(
            r#"{"detections": [{"id": 1, "bbox": [0, 0, 10, 10], "keypoints": {"nose": [1, 1]}}]}"#,
            0,
        )
        .unwrap();
        let mut replay = ReplayCollaborator;
        let dets = replay.detections(&frame).unwrap();
        assert_eq!(dets.len(), 1);
        assert_eq!(replay.keypoints(&frame, Some(&dets[0])).unwrap().len(), 1);
        assert!(replay.keypoints(&frame, None).is_err());

        let missing = TrackedDetection::new(2, BBox::new(0.0, 0.0, 1.0, 1.0), "person");
        assert!(replay.keypoints(&frame, Some(&missing)).is_err());
    }
}
