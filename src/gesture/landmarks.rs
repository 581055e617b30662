//! Body keypoints produced by a pose classifier.

/// Keypoints the gesture logic reads, indexed like the 33-point
/// MediaPipe Pose topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoseLandmark {
    Nose,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
}

impl PoseLandmark {
    /// Index of this keypoint within a full pose landmark list.
    pub const fn index(self) -> usize {
        match self {
            PoseLandmark::Nose => 0,
            PoseLandmark::LeftShoulder => 11,
            PoseLandmark::RightShoulder => 12,
            PoseLandmark::LeftElbow => 13,
            PoseLandmark::RightElbow => 14,
            PoseLandmark::LeftWrist => 15,
            PoseLandmark::RightWrist => 16,
        }
    }
}

/// Number of keypoints in a full pose.
pub const POSE_LANDMARK_COUNT: usize = 33;

/// One keypoint in normalized image coordinates.
///
/// `x` grows to the right and `y` grows downward, both in `[0, 1]`.
/// `visibility` is the classifier's confidence that the point is present
/// and correctly placed.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub visibility: f32,
}

impl Landmark {
    pub const fn new(x: f32, y: f32, visibility: f32) -> Self {
        Self { x, y, visibility }
    }
}

/// Ordered keypoints for one detected person.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LandmarkSet {
    points: Vec<Landmark>,
}

impl LandmarkSet {
    /// Wraps a classifier's landmark list.
    pub fn from_points(points: Vec<Landmark>) -> Self {
        Self { points }
    }

    /// Builds a full pose where only nose and wrists are visible.
    pub fn upper_body(nose: Landmark, left_wrist: Landmark, right_wrist: Landmark) -> Self {
        let mut points = vec![Landmark::default(); POSE_LANDMARK_COUNT];
        points[PoseLandmark::Nose.index()] = nose;
        points[PoseLandmark::LeftWrist.index()] = left_wrist;
        points[PoseLandmark::RightWrist.index()] = right_wrist;
        Self { points }
    }

    /// Returns the requested keypoint if the classifier produced it.
    pub fn get(&self, landmark: PoseLandmark) -> Option<&Landmark> {
        self.points.get(landmark.index())
    }

    pub fn points(&self) -> &[Landmark] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upper_body_places_points() {
        let set = LandmarkSet::upper_body(
            Landmark::new(0.5, 0.4, 0.9),
            Landmark::new(0.3, 0.2, 0.8),
            Landmark::new(0.7, 0.6, 0.7),
        );

        assert_eq!(set.len(), POSE_LANDMARK_COUNT);
        assert_eq!(set.get(PoseLandmark::Nose).unwrap().y, 0.4);
        assert_eq!(set.get(PoseLandmark::LeftWrist).unwrap().x, 0.3);
        assert_eq!(set.get(PoseLandmark::RightWrist).unwrap().visibility, 0.7);
        assert_eq!(set.get(PoseLandmark::LeftShoulder).unwrap().visibility, 0.0);
    }

    #[test]
    fn test_short_list_missing_wrists() {
        let set = LandmarkSet::from_points(vec![Landmark::new(0.5, 0.5, 1.0)]);
        assert!(set.get(PoseLandmark::Nose).is_some());
        assert!(set.get(PoseLandmark::LeftWrist).is_none());
    }
}
