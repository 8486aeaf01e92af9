use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Rect};

/// A step of the landmark pipeline that fills in part of a [`LandMarks`] record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    /// Face bounding box.
    Face,
    /// Pupils and eye boxes.
    Eyes,
    /// Lip corners, centres and contours.
    Lips,
    /// Crown and chin points, estimated or supplied.
    CrownChin,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Face => "face",
            Stage::Eyes => "eyes",
            Stage::Lips => "lips",
            Stage::CrownChin => "crown/chin",
        };
        f.write_str(name)
    }
}

/// Rotation that brings the photo upright. Serialized as degrees (0, 90, -90, 180).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum Rotation {
    /// No rotation (0).
    #[default]
    Upright,
    /// 90 degrees clockwise.
    Clockwise,
    /// 90 degrees counter-clockwise (-90).
    CounterClockwise,
    /// 180 degrees.
    UpsideDown,
}

impl From<Rotation> for i32 {
    fn from(rotation: Rotation) -> i32 {
        match rotation {
            Rotation::Upright => 0,
            Rotation::Clockwise => 90,
            Rotation::CounterClockwise => -90,
            Rotation::UpsideDown => 180,
        }
    }
}

impl TryFrom<i32> for Rotation {
    type Error = String;

    fn try_from(degrees: i32) -> Result<Self, Self::Error> {
        match degrees {
            0 => Ok(Rotation::Upright),
            90 => Ok(Rotation::Clockwise),
            -90 => Ok(Rotation::CounterClockwise),
            180 | -180 => Ok(Rotation::UpsideDown),
            other => Err(format!("unsupported image rotation: {other}")),
        }
    }
}

/// Facial landmarks accumulated for one image.
///
/// "Left" and "right" refer to image coordinates (smaller x is left). Fields
/// that no stage has filled in stay at zero; use [`LandMarks::has`] rather than
/// inspecting coordinates to know which stages produced data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LandMarks {
    /// Centre of the left pupil.
    pub eye_left_pupil: Point,
    /// Centre of the right pupil.
    pub eye_right_pupil: Point,
    /// Search box of the left eye.
    pub left_eye_rect: Rect,
    /// Search box of the right eye.
    pub right_eye_rect: Rect,

    /// Top of the upper lip at the mouth centre.
    pub lip_upper_center: Point,
    /// Bottom of the lower lip at the mouth centre.
    pub lip_lower_center: Point,
    /// Left mouth corner.
    pub lip_left_corner: Point,
    /// Right mouth corner.
    pub lip_right_corner: Point,
    /// Upper lip outline, left to right.
    pub upper_lip_contour: Vec<Point>,
    /// Lower lip outline, left to right.
    pub lower_lip_contour: Vec<Point>,
    /// Search box of the mouth.
    pub mouth_rect: Rect,

    /// Face bounding box.
    pub face_rect: Rect,

    /// Top of the head.
    pub crown_point: Point,
    /// Bottom of the chin.
    pub chin_point: Point,

    /// Rotation that brings the photo upright.
    pub image_rotation: Rotation,

    completed_stages: Vec<Stage>,
}

impl LandMarks {
    /// Seed a record with manually annotated crown and chin points.
    ///
    /// The pipeline skips crown/chin estimation for a record built this way.
    pub fn with_crown_chin(mut self, crown: Point, chin: Point) -> Self {
        self.crown_point = crown;
        self.chin_point = chin;
        self.mark(Stage::CrownChin);
        self
    }

    /// Whether `stage` has populated its fields.
    pub fn has(&self, stage: Stage) -> bool {
        self.completed_stages.contains(&stage)
    }

    /// Stages completed so far, in completion order.
    pub fn completed_stages(&self) -> &[Stage] {
        &self.completed_stages
    }

    pub(crate) fn mark(&mut self, stage: Stage) {
        if !self.has(stage) {
            self.completed_stages.push(stage);
        }
    }

    /// Serialize as camelCase JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
